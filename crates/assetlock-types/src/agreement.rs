//! Exchange agreements: what a counterparty asks the engine to lock,
//! unlock, claim or look up.
//!
//! A non-fungible agreement names one discrete asset by `(type, id)`.
//! A fungible agreement names a quantity of an asset type.

use serde::{Deserialize, Serialize};

use crate::Identity;

/// Agreement over a single, discrete (non-fungible) asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetExchangeAgreement {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub id: String,
    pub recipient: Identity,
    pub locker: Identity,
}

impl AssetExchangeAgreement {
    #[must_use]
    pub fn new(
        asset_type: impl Into<String>,
        id: impl Into<String>,
        recipient: impl Into<Identity>,
        locker: impl Into<Identity>,
    ) -> Self {
        Self {
            asset_type: asset_type.into(),
            id: id.into(),
            recipient: recipient.into(),
            locker: locker.into(),
        }
    }
}

/// Agreement over `num_units` units of a fungible asset type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FungibleAssetExchangeAgreement {
    #[serde(rename = "type")]
    pub asset_type: String,
    pub num_units: u64,
    pub recipient: Identity,
    pub locker: Identity,
}

impl FungibleAssetExchangeAgreement {
    #[must_use]
    pub fn new(
        asset_type: impl Into<String>,
        num_units: u64,
        recipient: impl Into<Identity>,
        locker: impl Into<Identity>,
    ) -> Self {
        Self {
            asset_type: asset_type.into(),
            num_units,
            recipient: recipient.into(),
            locker: locker.into(),
        }
    }
}

/// The two counterparties named by an agreement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parties {
    pub locker: Identity,
    pub recipient: Identity,
}

impl Parties {
    #[must_use]
    pub fn new(locker: impl Into<Identity>, recipient: impl Into<Identity>) -> Self {
        Self {
            locker: locker.into(),
            recipient: recipient.into(),
        }
    }

    /// Whether `identity` is one of the two parties.
    #[must_use]
    pub fn involves(&self, identity: &Identity) -> bool {
        &self.locker == identity || &self.recipient == identity
    }
}

/// Common view over both agreement kinds.
pub trait Agreement {
    fn asset_type(&self) -> &str;
    fn locker(&self) -> &Identity;
    fn recipient(&self) -> &Identity;

    fn parties(&self) -> Parties {
        Parties {
            locker: self.locker().clone(),
            recipient: self.recipient().clone(),
        }
    }
}

impl Agreement for AssetExchangeAgreement {
    fn asset_type(&self) -> &str {
        &self.asset_type
    }

    fn locker(&self) -> &Identity {
        &self.locker
    }

    fn recipient(&self) -> &Identity {
        &self.recipient
    }
}

impl Agreement for FungibleAssetExchangeAgreement {
    fn asset_type(&self) -> &str {
        &self.asset_type
    }

    fn locker(&self) -> &Identity {
        &self.locker
    }

    fn recipient(&self) -> &Identity {
        &self.recipient
    }
}

/// Fixture agreements for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl AssetExchangeAgreement {
    /// `bond/A001`, locked by Alice for Bob.
    pub fn dummy() -> Self {
        Self::new("bond", "A001", "Bob", "Alice")
    }
}

#[cfg(any(test, feature = "test-helpers"))]
impl FungibleAssetExchangeAgreement {
    /// 1000 units of `cbdc`, locked by Alice for Bob.
    pub fn dummy() -> Self {
        Self::new("cbdc", 1000, "Bob", "Alice")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parties_involve_both_sides() {
        let agreement = AssetExchangeAgreement::dummy();
        let parties = agreement.parties();
        assert!(parties.involves(&Identity::from("Alice")));
        assert!(parties.involves(&Identity::from("Bob")));
        assert!(!parties.involves(&Identity::from("Carol")));
    }

    #[test]
    fn type_field_uses_wire_name() {
        let json = serde_json::to_value(FungibleAssetExchangeAgreement::dummy()).unwrap();
        assert_eq!(json["type"], "cbdc");
        assert_eq!(json["num_units"], 1000);
        assert_eq!(json["locker"], "Alice");
    }
}
