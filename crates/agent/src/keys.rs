//! Validator identity and key material.
//!
//! Key material comes from the textual dump files the node tooling
//! produces (`Address:`, `Private Key:`, `Public Key:` prefixed lines).
//! Inability to load the identity is the one fatal error in the whole
//! system: without it there is nothing to activate.

use std::fs;
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyRole {
    /// Private key of the operating account, imported into the wallet.
    AddressPrivate,
    /// Schnorr signing key the validator signs blocks with.
    Signing,
    /// BLS voting key used in the validator's votes.
    Voting,
    /// Address transaction fees are paid from.
    Fee,
}

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("failed to read key file {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("no `{prefix}` entry in key file {path}")]
    MissingEntry {
        prefix: &'static str,
        path: PathBuf,
    },
}

/// Capability to load key material by role, decoupling file format
/// parsing from the activation logic.
pub trait KeyProvider {
    fn load(&self, role: KeyRole) -> Result<String, KeyError>;
}

/// Reads key material from the node tooling's key dump files.
pub struct FileKeyProvider {
    /// Account dump with `Address:` and `Private Key:` lines.
    address_file: PathBuf,
    /// Signing key dump with a `Private Key:` line.
    signing_file: PathBuf,
    /// BLS key dump with a `Public Key:` line.
    voting_file: PathBuf,
}

impl FileKeyProvider {
    pub fn new(
        address_file: impl Into<PathBuf>,
        signing_file: impl Into<PathBuf>,
        voting_file: impl Into<PathBuf>,
    ) -> Self {
        Self {
            address_file: address_file.into(),
            signing_file: signing_file.into(),
            voting_file: voting_file.into(),
        }
    }

    fn extract(&self, path: &PathBuf, prefix: &'static str) -> Result<String, KeyError> {
        let contents = fs::read_to_string(path).map_err(|source| KeyError::Read {
            path: path.clone(),
            source,
        })?;
        contents
            .lines()
            .find_map(|line| {
                // Tolerates comment markers and indentation before the
                // prefix, e.g. `# Public Key:`.
                line.split_once(prefix)
                    .map(|(_, rest)| rest.trim().to_string())
            })
            .filter(|value| !value.is_empty())
            .ok_or(KeyError::MissingEntry {
                prefix,
                path: path.clone(),
            })
    }
}

impl KeyProvider for FileKeyProvider {
    fn load(&self, role: KeyRole) -> Result<String, KeyError> {
        match role {
            KeyRole::AddressPrivate => self.extract(&self.address_file, "Private Key:"),
            KeyRole::Signing => self.extract(&self.signing_file, "Private Key:"),
            KeyRole::Voting => self.extract(&self.voting_file, "Public Key:"),
            KeyRole::Fee => self.extract(&self.address_file, "Address:"),
        }
    }
}

/// The validator's identity, immutable once loaded.
#[derive(Clone)]
pub struct ValidatorIdentity {
    /// Operating account address; also used as reward and fee address.
    pub address: String,
    /// Private key of the operating account. Never logged.
    pub account_key: String,
    pub signing_key: String,
    pub voting_key: String,
    pub fee_address: String,
}

impl ValidatorIdentity {
    pub fn load(provider: &impl KeyProvider) -> Result<Self, KeyError> {
        let address = provider.load(KeyRole::Fee)?;
        Ok(Self {
            fee_address: address.clone(),
            address,
            account_key: provider.load(KeyRole::AddressPrivate)?,
            signing_key: provider.load(KeyRole::Signing)?,
            voting_key: provider.load(KeyRole::Voting)?,
        })
    }
}

impl std::fmt::Debug for ValidatorIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidatorIdentity")
            .field("address", &self.address)
            .field("fee_address", &self.fee_address)
            .field("account_key", &"<redacted>")
            .field("signing_key", &"<redacted>")
            .field("voting_key", &"<redacted>")
            .finish()
    }
}
