//! # Lock mechanisms
//!
//! A lock is parameterised by a *mechanism*. Each mechanism defines a lock
//! payload (the condition under which the asset is released) and a claim
//! payload (the evidence a recipient presents to satisfy it).
//!
//! Only HTLC is defined today:
//!
//! ```text
//!   lock  = { hash_digest, expiry_secs }
//!   claim = { preimage }            where digest(preimage) == hash_digest
//! ```
//!
//! New mechanisms add a variant to [`LockMechanism`], [`LockDescriptor`]
//! and [`ClaimDescriptor`], plus their codec arms. No operation path changes.
//!
//! On the wire a descriptor travels as an envelope ([`EncodedLock`] /
//! [`EncodedClaim`]): the mechanism tag plus an opaque payload.

use serde::{Deserialize, Serialize};

/// Supported lock mechanisms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockMechanism {
    /// Hash time-locked contract.
    Htlc,
}

impl std::fmt::Display for LockMechanism {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Htlc => write!(f, "HTLC"),
        }
    }
}

/// HTLC lock parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcLock {
    /// Digest the claimant's preimage must hash to. Must be non-empty.
    #[serde(with = "crate::serde_hex")]
    pub hash_digest: Vec<u8>,
    /// Unix time (seconds) after which the lock can no longer be claimed.
    pub expiry_secs: u64,
}

/// HTLC claim evidence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HtlcClaim {
    #[serde(with = "crate::serde_hex")]
    pub preimage: Vec<u8>,
}

/// Mechanism-tagged lock condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockDescriptor {
    Htlc(HtlcLock),
}

impl LockDescriptor {
    /// Convenience constructor for an HTLC lock.
    #[must_use]
    pub fn htlc(hash_digest: impl Into<Vec<u8>>, expiry_secs: u64) -> Self {
        Self::Htlc(HtlcLock {
            hash_digest: hash_digest.into(),
            expiry_secs,
        })
    }

    #[must_use]
    pub fn mechanism(&self) -> LockMechanism {
        match self {
            Self::Htlc(_) => LockMechanism::Htlc,
        }
    }

    /// Unix time (seconds) after which the lock expires.
    #[must_use]
    pub fn expiry_secs(&self) -> u64 {
        match self {
            Self::Htlc(htlc) => htlc.expiry_secs,
        }
    }
}

/// Mechanism-tagged claim evidence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimDescriptor {
    Htlc(HtlcClaim),
}

impl ClaimDescriptor {
    /// Convenience constructor for an HTLC claim.
    #[must_use]
    pub fn htlc(preimage: impl Into<Vec<u8>>) -> Self {
        Self::Htlc(HtlcClaim {
            preimage: preimage.into(),
        })
    }

    #[must_use]
    pub fn mechanism(&self) -> LockMechanism {
        match self {
            Self::Htlc(_) => LockMechanism::Htlc,
        }
    }
}

/// Wire envelope of a [`LockDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedLock {
    pub mechanism: LockMechanism,
    #[serde(with = "crate::serde_hex")]
    pub payload: Vec<u8>,
}

/// Wire envelope of a [`ClaimDescriptor`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedClaim {
    pub mechanism: LockMechanism,
    #[serde(with = "crate::serde_hex")]
    pub payload: Vec<u8>,
}

/// Random HTLC preimage for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
#[derive(Debug, Clone)]
pub struct HtlcSecret(pub [u8; 32]);

#[cfg(any(test, feature = "test-helpers"))]
impl HtlcSecret {
    pub fn random() -> Self {
        Self(rand::random::<[u8; 32]>())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn claim(&self) -> ClaimDescriptor {
        ClaimDescriptor::htlc(self.0.to_vec())
    }
}
