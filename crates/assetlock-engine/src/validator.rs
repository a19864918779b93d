//! Agreement validator: structural checks performed before any registry access.
//!
//! Side-effect free. Lock, unlock and claim need both parties named; a
//! query may leave one side unset, which the identity gate then fills in
//! with the caller.

use assetlock_types::{
    Agreement, AssetExchangeAgreement, AssetLockError, FungibleAssetExchangeAgreement, Result,
};

use crate::identity_gate::Operation;

/// Validate a non-fungible agreement for `operation`.
///
/// # Errors
/// `MissingField` naming the first empty field.
pub fn validate_asset(agreement: &AssetExchangeAgreement, operation: Operation) -> Result<()> {
    validate_asset_type(&agreement.asset_type)?;
    if agreement.id.is_empty() {
        return Err(AssetLockError::MissingField { field: "id" });
    }
    validate_identities(agreement, operation)
}

/// Validate a fungible agreement for `operation`.
///
/// # Errors
/// `MissingField` naming the first empty or zero field.
pub fn validate_fungible(
    agreement: &FungibleAssetExchangeAgreement,
    operation: Operation,
) -> Result<()> {
    validate_asset_type(&agreement.asset_type)?;
    validate_units(agreement.num_units)?;
    validate_identities(agreement, operation)
}

pub fn validate_asset_type(asset_type: &str) -> Result<()> {
    if asset_type.is_empty() {
        return Err(AssetLockError::MissingField { field: "type" });
    }
    Ok(())
}

pub fn validate_units(num_units: u64) -> Result<()> {
    if num_units == 0 {
        return Err(AssetLockError::MissingField { field: "num_units" });
    }
    Ok(())
}

fn validate_identities(agreement: &impl Agreement, operation: Operation) -> Result<()> {
    let recipient_unset = agreement.recipient().is_unset();
    let locker_unset = agreement.locker().is_unset();
    match operation {
        Operation::Query if !(recipient_unset && locker_unset) => Ok(()),
        _ if recipient_unset => Err(AssetLockError::MissingField { field: "recipient" }),
        Operation::Lock | Operation::Unlock | Operation::Claim if locker_unset => {
            Err(AssetLockError::MissingField { field: "locker" })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assetlock_types::Identity;

    #[test]
    fn complete_agreement_passes_every_operation() {
        let agreement = AssetExchangeAgreement::dummy();
        for op in [
            Operation::Lock,
            Operation::Unlock,
            Operation::Claim,
            Operation::Query,
        ] {
            assert!(validate_asset(&agreement, op).is_ok(), "{op:?}");
        }
    }

    #[test]
    fn empty_type_or_id_rejected() {
        let mut agreement = AssetExchangeAgreement::dummy();
        agreement.asset_type.clear();
        assert!(matches!(
            validate_asset(&agreement, Operation::Lock),
            Err(AssetLockError::MissingField { field: "type" })
        ));

        let mut agreement = AssetExchangeAgreement::dummy();
        agreement.id.clear();
        assert!(matches!(
            validate_asset(&agreement, Operation::Query),
            Err(AssetLockError::MissingField { field: "id" })
        ));
    }

    #[test]
    fn zero_units_rejected() {
        let mut agreement = FungibleAssetExchangeAgreement::dummy();
        agreement.num_units = 0;
        assert!(matches!(
            validate_fungible(&agreement, Operation::Lock),
            Err(AssetLockError::MissingField { field: "num_units" })
        ));
    }

    #[test]
    fn mutations_require_recipient() {
        let mut agreement = AssetExchangeAgreement::dummy();
        agreement.recipient = Identity::unset();
        for op in [Operation::Lock, Operation::Unlock, Operation::Claim] {
            assert!(matches!(
                validate_asset(&agreement, op),
                Err(AssetLockError::MissingField { field: "recipient" })
            ));
        }
    }

    #[test]
    fn mutations_require_locker() {
        let mut agreement = FungibleAssetExchangeAgreement::dummy();
        agreement.locker = Identity::unset();
        for op in [Operation::Lock, Operation::Unlock, Operation::Claim] {
            assert!(matches!(
                validate_fungible(&agreement, op),
                Err(AssetLockError::MissingField { field: "locker" })
            ));
        }
        assert!(validate_fungible(&agreement, Operation::Query).is_ok());
    }

    #[test]
    fn query_needs_one_party() {
        let mut agreement = AssetExchangeAgreement::dummy();
        agreement.locker = Identity::unset();
        assert!(validate_asset(&agreement, Operation::Query).is_ok());
        agreement.recipient = Identity::unset();
        assert!(validate_asset(&agreement, Operation::Query).is_err());
    }
}
