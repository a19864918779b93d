//! Identity gate: decides whether the caller may act on a lock.
//!
//! Pure: the caller identity is passed in explicitly and compared against
//! the agreement and, for unlock/claim, the stored [`LockRecord`].
//!
//! - **Lock**: the caller is the locker; locking to oneself is rejected.
//! - **Unlock**: only the recorded locker.
//! - **Claim**: only the recorded recipient, and the agreement must name
//!   the recorded locker.
//! - **Query**: a caller that is neither party gets [`Decision::Deny`],
//!   which the manager reports as "not locked" rather than as an error.

use assetlock_types::{AssetLockError, Identity, LockRecord, Parties, Result};

/// The operation being authorized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Lock,
    Unlock,
    Claim,
    Query,
}

/// Outcome of a successful authorization check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    /// The caller may not see this lock. Only produced for queries.
    Deny,
}

/// Fill in the unset side of a query's parties with the caller.
///
/// # Errors
/// `MissingField` if both sides are unset.
pub fn resolve_query_parties(caller: &Identity, parties: &Parties) -> Result<Parties> {
    match (parties.locker.is_unset(), parties.recipient.is_unset()) {
        (true, true) => Err(AssetLockError::MissingField { field: "recipient" }),
        (true, false) => Ok(Parties::new(caller.clone(), parties.recipient.clone())),
        (false, true) => Ok(Parties::new(parties.locker.clone(), caller.clone())),
        (false, false) => Ok(parties.clone()),
    }
}

/// Authorize `caller` to perform `operation`.
///
/// `record` is the existing lock for unlock and claim; it is ignored for
/// lock and query.
///
/// # Errors
/// - `InvalidAgreement` for a self-lock or a query naming the same party twice
/// - `Unauthorized` when the caller or agreement disagrees with the record
/// - `Internal` if unlock/claim is authorized without a record
pub fn authorize(
    caller: &Identity,
    parties: &Parties,
    operation: Operation,
    record: Option<&LockRecord>,
) -> Result<Decision> {
    match operation {
        Operation::Lock => authorize_lock(caller, parties),
        Operation::Unlock => authorize_unlock(caller, parties, require_record(record)?),
        Operation::Claim => authorize_claim(caller, parties, require_record(record)?),
        Operation::Query => authorize_query(caller, parties),
    }
}

fn require_record(record: Option<&LockRecord>) -> Result<&LockRecord> {
    record.ok_or_else(|| AssetLockError::Internal("authorization requires a lock record".into()))
}

fn authorize_lock(caller: &Identity, parties: &Parties) -> Result<Decision> {
    if !parties.locker.is_unset() && &parties.locker != caller {
        return Err(AssetLockError::unauthorized(format!(
            "{caller} cannot lock on behalf of {}",
            parties.locker
        )));
    }
    if &parties.recipient == caller {
        return Err(AssetLockError::invalid_agreement(format!(
            "recipient and locker are both {caller}"
        )));
    }
    Ok(Decision::Allow)
}

fn authorize_unlock(caller: &Identity, parties: &Parties, record: &LockRecord) -> Result<Decision> {
    if &record.locker != caller {
        return Err(AssetLockError::unauthorized(format!(
            "{} is locked by {}, not {caller}",
            record.key, record.locker
        )));
    }
    if !parties.locker.is_unset() && parties.locker != record.locker {
        return Err(AssetLockError::unauthorized(format!(
            "agreement names locker {}, lock is held by {}",
            parties.locker, record.locker
        )));
    }
    if parties.recipient != record.recipient {
        return Err(AssetLockError::unauthorized(format!(
            "{} is locked for {}, not {}",
            record.key, record.recipient, parties.recipient
        )));
    }
    Ok(Decision::Allow)
}

fn authorize_claim(caller: &Identity, parties: &Parties, record: &LockRecord) -> Result<Decision> {
    if &record.recipient != caller {
        return Err(AssetLockError::unauthorized(format!(
            "{} is locked for {}, not {caller}",
            record.key, record.recipient
        )));
    }
    if !parties.recipient.is_unset() && &parties.recipient != caller {
        return Err(AssetLockError::unauthorized(format!(
            "{caller} cannot claim on behalf of {}",
            parties.recipient
        )));
    }
    if parties.locker != record.locker {
        return Err(AssetLockError::unauthorized(format!(
            "{} is locked by {}, not {}",
            record.key, record.locker, parties.locker
        )));
    }
    Ok(Decision::Allow)
}

fn authorize_query(caller: &Identity, parties: &Parties) -> Result<Decision> {
    if parties.locker == parties.recipient {
        return Err(AssetLockError::invalid_agreement(format!(
            "recipient and locker are both {}",
            parties.locker
        )));
    }
    if parties.involves(caller) {
        Ok(Decision::Allow)
    } else {
        Ok(Decision::Deny)
    }
}
