//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::{constants, AssetLockError, Result};

/// Digest used to check an HTLC preimage against the locked hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFunction {
    #[default]
    Sha256,
    Sha512,
}

/// Configuration for one lock engine instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Digest applied to claim preimages.
    pub hash_function: HashFunction,
    /// Minimum seconds between lock time and expiry.
    pub min_lock_duration_secs: u64,
    /// Maximum seconds between lock time and expiry.
    pub max_lock_duration_secs: u64,
    /// Maximum records returned by an enumeration query.
    pub max_query_results: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hash_function: HashFunction::default(),
            min_lock_duration_secs: constants::DEFAULT_MIN_LOCK_DURATION_SECS,
            max_lock_duration_secs: constants::DEFAULT_MAX_LOCK_DURATION_SECS,
            max_query_results: constants::DEFAULT_MAX_QUERY_RESULTS,
        }
    }
}

impl EngineConfig {
    /// Check the bounds are consistent.
    pub fn validate(&self) -> Result<()> {
        if self.max_lock_duration_secs == 0 {
            return Err(AssetLockError::Configuration(
                "max_lock_duration_secs must be > 0".into(),
            ));
        }
        if self.min_lock_duration_secs > self.max_lock_duration_secs {
            return Err(AssetLockError::Configuration(format!(
                "min_lock_duration_secs ({}) exceeds max_lock_duration_secs ({})",
                self.min_lock_duration_secs, self.max_lock_duration_secs
            )));
        }
        if self.max_query_results == 0 {
            return Err(AssetLockError::Configuration(
                "max_query_results must be > 0".into(),
            ));
        }
        Ok(())
    }
}
