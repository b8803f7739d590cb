mod common;

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use activator_agent::funding::FundingManager;
use common::{ADDRESS, FakeFaucet, FakeNode};
use tokio::sync::watch;

fn funding() -> FundingManager {
    FundingManager::new(Duration::from_secs(60))
}

#[tokio::test(start_paused = true)]
async fn empty_account_gets_exactly_one_faucet_request() {
    let node = FakeNode::new(ADDRESS);
    let faucet = FakeFaucet::default();

    funding().ensure_funded(&node, &faucet, ADDRESS).await;

    assert_eq!(faucet.request_count(), 1);
    assert_eq!(faucet.requests.lock().unwrap()[0], ADDRESS);
}

#[tokio::test(start_paused = true)]
async fn funded_account_gets_no_faucet_request() {
    let node = FakeNode::new(ADDRESS);
    node.balance.store(500, Ordering::SeqCst);
    let faucet = FakeFaucet::default();

    funding().ensure_funded(&node, &faucet, ADDRESS).await;

    assert_eq!(faucet.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn unreadable_balance_skips_the_faucet() {
    let node = FakeNode::new(ADDRESS);
    node.fail_account.store(true, Ordering::SeqCst);
    let faucet = FakeFaucet::default();

    funding().ensure_funded(&node, &faucet, ADDRESS).await;

    assert_eq!(faucet.request_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn faucet_failure_is_not_fatal() {
    let node = FakeNode::new(ADDRESS);
    let faucet = FakeFaucet::default();
    faucet.fail.store(true, Ordering::SeqCst);

    funding().ensure_funded(&node, &faucet, ADDRESS).await;

    assert_eq!(faucet.request_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn wait_for_stake_returns_once_the_threshold_is_reached() {
    let node = Arc::new(FakeNode::new(ADDRESS));
    node.balance.store(100, Ordering::SeqCst);
    let (_tx, mut shutdown) = watch::channel(false);

    let depositor = {
        let node = node.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(150)).await;
            node.balance.store(1_000, Ordering::SeqCst);
        }
    };

    let funding = funding();
    let waiter = funding.wait_for_stake(&*node, ADDRESS, 1_000, &mut shutdown);
    let (reached, _) = tokio::join!(waiter, depositor);

    assert!(reached);
    assert!(node.balance.load(Ordering::SeqCst) >= 1_000);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_the_stake_wait() {
    let node = FakeNode::new(ADDRESS);
    node.balance.store(100, Ordering::SeqCst);

    let (tx, mut shutdown) = watch::channel(false);
    let stopper = async move {
        tokio::time::sleep(Duration::from_secs(90)).await;
        tx.send(true).unwrap();
    };

    let funding = funding();
    let waiter = funding.wait_for_stake(&node, ADDRESS, 1_000, &mut shutdown);
    let (reached, _) = tokio::join!(waiter, stopper);

    assert!(!reached);
}
