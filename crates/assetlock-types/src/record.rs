//! Registry state: lock records and fungible pool balances.
//!
//! ## Lock lifecycle (per asset key)
//!
//! ```text
//!   ┌──────────┐   lock    ┌────────┐   claim   ┌─────────┐
//!   │ UNLOCKED ├──────────▶│ LOCKED ├──────────▶│ CLAIMED │
//!   └──────────┘           └───┬────┘           └─────────┘
//!        ▲                     │ unlock
//!        └─────────────────────┘
//! ```
//!
//! A [`LockRecord`] exists exactly while its key is LOCKED. Both exits
//! delete the record; they differ only in what happens to fungible units
//! (see [`LockExit`]).

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Identity, LockId, LockMechanism};

/// Fungible or non-fungible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    NonFungible,
    Fungible,
}

/// Registry key of a lock record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LockKey {
    /// A discrete asset, addressed by `(type, id)`.
    NonFungible { asset_type: String, asset_id: String },
    /// A quantity of a fungible type, addressed by the id allocated at lock time.
    Fungible { asset_type: String, lock_id: LockId },
}

impl LockKey {
    #[must_use]
    pub fn non_fungible(asset_type: impl Into<String>, asset_id: impl Into<String>) -> Self {
        Self::NonFungible {
            asset_type: asset_type.into(),
            asset_id: asset_id.into(),
        }
    }

    #[must_use]
    pub fn fungible(asset_type: impl Into<String>, lock_id: LockId) -> Self {
        Self::Fungible {
            asset_type: asset_type.into(),
            lock_id,
        }
    }

    #[must_use]
    pub fn asset_type(&self) -> &str {
        match self {
            Self::NonFungible { asset_type, .. } | Self::Fungible { asset_type, .. } => asset_type,
        }
    }

    #[must_use]
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::NonFungible { .. } => AssetKind::NonFungible,
            Self::Fungible { .. } => AssetKind::Fungible,
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonFungible {
                asset_type,
                asset_id,
            } => write!(f, "{asset_type}:{asset_id}"),
            Self::Fungible {
                asset_type,
                lock_id,
            } => write!(f, "{asset_type}#{}", lock_id.0),
        }
    }
}

/// How a LOCKED key leaves that state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LockExit {
    /// The locker took the asset back. Fungible units return to the unlocked pool.
    Unlocked,
    /// The recipient presented valid claim evidence. Fungible units leave
    /// the pool for good; ownership moves on the external ledger.
    Claimed,
}

impl fmt::Display for LockExit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlocked => write!(f, "UNLOCKED"),
            Self::Claimed => write!(f, "CLAIMED"),
        }
    }
}

/// An active lock. Owned exclusively by the lock registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    pub key: LockKey,
    /// Units held by the lock. Always 1 for non-fungible assets.
    pub num_units: u64,
    pub locker: Identity,
    pub recipient: Identity,
    pub mechanism: LockMechanism,
    /// Codec-encoded lock payload for `mechanism`.
    #[serde(with = "crate::serde_hex")]
    pub lock_payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

/// Per-type accounting of a fungible pool.
///
/// Invariant: `unlocked_units <= total_units`. Locked units are derived.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleBalance {
    pub asset_type: String,
    pub total_units: u64,
    pub unlocked_units: u64,
}

impl FungibleBalance {
    #[must_use]
    pub fn new(asset_type: impl Into<String>) -> Self {
        Self {
            asset_type: asset_type.into(),
            total_units: 0,
            unlocked_units: 0,
        }
    }

    /// `total - unlocked`: units held by live locks or already claimed.
    #[must_use]
    pub fn locked_units(&self) -> u64 {
        self.total_units - self.unlocked_units
    }

    /// A type counts as declared once any units were added for it.
    #[must_use]
    pub fn is_declared(&self) -> bool {
        self.total_units > 0
    }
}

/// Read-only projection of a lock record returned by enumeration queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedAssetView {
    pub key: LockKey,
    pub num_units: u64,
    pub locker: Identity,
    pub recipient: Identity,
    pub mechanism: LockMechanism,
    pub expiry_secs: u64,
}

impl LockedAssetView {
    #[must_use]
    pub fn from_record(record: &LockRecord, expiry_secs: u64) -> Self {
        Self {
            key: record.key.clone(),
            num_units: record.num_units,
            locker: record.locker.clone(),
            recipient: record.recipient.clone(),
            mechanism: record.mechanism,
            expiry_secs,
        }
    }

    #[must_use]
    pub fn kind(&self) -> AssetKind {
        self.key.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display() {
        assert_eq!(LockKey::non_fungible("bond", "A001").to_string(), "bond:A001");
        assert_eq!(LockKey::fungible("cbdc", LockId(3)).to_string(), "cbdc#3");
    }

    #[test]
    fn key_kind_and_type() {
        let key = LockKey::fungible("cbdc", LockId(1));
        assert_eq!(key.kind(), AssetKind::Fungible);
        assert_eq!(key.asset_type(), "cbdc");
    }

    #[test]
    fn balance_locked_is_derived() {
        let balance = FungibleBalance {
            asset_type: "cbdc".into(),
            total_units: 10_000,
            unlocked_units: 9_000,
        };
        assert_eq!(balance.locked_units(), 1_000);
        assert!(balance.is_declared());
        assert!(!FungibleBalance::new("gold").is_declared());
    }

    #[test]
    fn record_serializes_tagged_key() {
        let record = LockRecord {
            key: LockKey::non_fungible("bond", "A001"),
            num_units: 1,
            locker: "Alice".into(),
            recipient: "Bob".into(),
            mechanism: LockMechanism::Htlc,
            lock_payload: vec![0xab],
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["key"]["kind"], "non_fungible");
        assert_eq!(json["lock_payload"], "ab");
        let back: LockRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
