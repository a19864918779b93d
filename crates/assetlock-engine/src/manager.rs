//! Lock lifecycle manager: the public operation surface.
//!
//! Every request runs the same pipeline and touches registry state only
//! at the very end:
//!
//! ```text
//! binding check → AgreementValidator → codec payload check → registry lookup
//!     → IdentityGate → mechanism check (expiry / preimage)
//!     → LedgerService::invoke → LockRegistry write
//! ```
//!
//! Any failure before the final write leaves the registry untouched; a
//! failure from the ledger collaborator aborts the operation the same way.
//!
//! The caller identity is an explicit argument of every operation that
//! needs one.

use std::sync::Arc;

use assetlock_types::{
    Agreement, AssetExchangeAgreement, AssetLockError, ClaimDescriptor, ContractId, EngineConfig,
    FungibleAssetExchangeAgreement, FungibleBalance, Identity, LockDescriptor, LockExit, LockId,
    LockKey, LockRecord, LockedAssetView, Parties, Result, constants::ledger_fn,
};

use crate::clock::{SystemTimeSource, TimeSource};
use crate::identity_gate::{self, Decision, Operation};
use crate::ledger::LedgerService;
use crate::query::LockQueries;
use crate::registry::LockRegistry;
use crate::validator;
use crate::LockCodec;

/// Orchestrates lock, unlock, claim and query requests against one registry.
pub struct AssetLockManager<L: LedgerService> {
    registry: LockRegistry,
    ledger: L,
    clock: Arc<dyn TimeSource>,
    codec: LockCodec,
    config: EngineConfig,
}

impl<L: LedgerService> AssetLockManager<L> {
    /// Create a manager reading wall-clock time.
    ///
    /// # Errors
    /// `Configuration` if `config` is inconsistent.
    pub fn new(ledger: L, config: EngineConfig) -> Result<Self> {
        Self::with_time_source(ledger, config, Arc::new(SystemTimeSource))
    }

    /// Create a manager with an explicit time source.
    ///
    /// # Errors
    /// `Configuration` if `config` is inconsistent.
    pub fn with_time_source(
        ledger: L,
        config: EngineConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            registry: LockRegistry::new(),
            ledger,
            clock,
            codec: LockCodec::new(config.hash_function),
            config,
        })
    }

    #[must_use]
    pub fn registry(&self) -> &LockRegistry {
        &self.registry
    }

    #[must_use]
    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut L {
        &mut self.ledger
    }

    #[must_use]
    pub fn codec(&self) -> LockCodec {
        self.codec
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Re-check the fungible balance invariants.
    pub fn verify_balances(&self) -> Result<()> {
        self.registry.verify_balances()
    }

    // =================================================================
    // Lock
    // =================================================================

    /// Lock a non-fungible asset for `agreement.recipient`, with `caller` as locker.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `MissingField`, `InvalidAgreement`,
    /// `Unauthorized`, `Expired`, `AlreadyLocked`, `Ledger`.
    pub fn lock_asset(
        &mut self,
        caller: &Identity,
        agreement: &AssetExchangeAgreement,
        lock: &LockDescriptor,
    ) -> Result<bool> {
        self.try_lock_asset(caller, agreement, lock)
            .inspect_err(|err| reject("LockAsset", caller, err))
    }

    fn try_lock_asset(
        &mut self,
        caller: &Identity,
        agreement: &AssetExchangeAgreement,
        lock: &LockDescriptor,
    ) -> Result<bool> {
        let contract = self.storage_contract()?;
        validator::validate_asset(agreement, Operation::Lock)?;
        identity_gate::authorize(caller, &agreement.parties(), Operation::Lock, None)?;
        self.check_lock_terms(lock)?;
        self.registry
            .ensure_asset_unlocked(&agreement.asset_type, &agreement.id)?;

        let record = self.new_record(
            LockKey::non_fungible(&agreement.asset_type, &agreement.id),
            1,
            caller,
            &agreement.recipient,
            lock,
        )?;
        self.delegate(&contract, ledger_fn::LOCK_ASSET, &[serde_json::to_vec(&record)?])?;
        self.registry.insert_asset_lock(record)?;

        tracing::info!(
            asset_type = %agreement.asset_type,
            asset_id = %agreement.id,
            locker = %caller,
            recipient = %agreement.recipient,
            expiry = lock.expiry_secs(),
            "asset locked"
        );
        Ok(true)
    }

    /// Lock `agreement.num_units` units of a fungible type.
    ///
    /// Returns the id that addresses this lock in later calls.
    ///
    /// # Errors
    /// As [`Self::lock_asset`], with `InsufficientBalance` in place of
    /// `AlreadyLocked`.
    pub fn lock_fungible_asset(
        &mut self,
        caller: &Identity,
        agreement: &FungibleAssetExchangeAgreement,
        lock: &LockDescriptor,
    ) -> Result<LockId> {
        self.try_lock_fungible_asset(caller, agreement, lock)
            .inspect_err(|err| reject("LockFungibleAsset", caller, err))
    }

    fn try_lock_fungible_asset(
        &mut self,
        caller: &Identity,
        agreement: &FungibleAssetExchangeAgreement,
        lock: &LockDescriptor,
    ) -> Result<LockId> {
        let contract = self.storage_contract()?;
        validator::validate_fungible(agreement, Operation::Lock)?;
        identity_gate::authorize(caller, &agreement.parties(), Operation::Lock, None)?;
        self.check_lock_terms(lock)?;
        self.registry
            .ensure_available(&agreement.asset_type, agreement.num_units)?;

        let record = self.new_record(
            LockKey::fungible(&agreement.asset_type, self.registry.next_lock_id()),
            agreement.num_units,
            caller,
            &agreement.recipient,
            lock,
        )?;
        self.delegate(
            &contract,
            ledger_fn::LOCK_FUNGIBLE_ASSET,
            &[serde_json::to_vec(&record)?],
        )?;
        let lock_id = self.registry.insert_fungible_lock(record)?;
        self.debug_check_balances();

        tracing::info!(
            asset_type = %agreement.asset_type,
            %lock_id,
            units = agreement.num_units,
            locker = %caller,
            recipient = %agreement.recipient,
            expiry = lock.expiry_secs(),
            "fungible asset locked"
        );
        Ok(lock_id)
    }

    // =================================================================
    // Unlock
    // =================================================================

    /// Release a non-fungible lock back to its locker.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `MissingField`, `NotLocked`, `Unauthorized`, `Ledger`.
    pub fn unlock_asset(
        &mut self,
        caller: &Identity,
        agreement: &AssetExchangeAgreement,
    ) -> Result<bool> {
        self.try_unlock_asset(caller, agreement)
            .inspect_err(|err| reject("UnlockAsset", caller, err))
    }

    fn try_unlock_asset(
        &mut self,
        caller: &Identity,
        agreement: &AssetExchangeAgreement,
    ) -> Result<bool> {
        let contract = self.storage_contract()?;
        validator::validate_asset(agreement, Operation::Unlock)?;
        let record = self.require_asset_lock(agreement)?;
        identity_gate::authorize(caller, &agreement.parties(), Operation::Unlock, Some(record))?;

        let key = serde_json::to_vec(&record.key)?;
        self.delegate(&contract, ledger_fn::UNLOCK_ASSET, &[key])?;
        self.registry
            .remove_asset_lock(&agreement.asset_type, &agreement.id)?;

        log_exit(LockExit::Unlocked, &agreement.asset_type, &agreement.id, caller);
        Ok(true)
    }

    /// Release a fungible lock; its units return to the unlocked pool.
    ///
    /// # Errors
    /// As [`Self::unlock_asset`], plus `InvalidAgreement` if the agreement's
    /// type or units differ from the lock.
    pub fn unlock_fungible_asset(
        &mut self,
        caller: &Identity,
        lock_id: LockId,
        agreement: &FungibleAssetExchangeAgreement,
    ) -> Result<bool> {
        self.try_unlock_fungible_asset(caller, lock_id, agreement)
            .inspect_err(|err| reject("UnlockFungibleAsset", caller, err))
    }

    fn try_unlock_fungible_asset(
        &mut self,
        caller: &Identity,
        lock_id: LockId,
        agreement: &FungibleAssetExchangeAgreement,
    ) -> Result<bool> {
        let contract = self.storage_contract()?;
        validator::validate_fungible(agreement, Operation::Unlock)?;
        let record = self.require_fungible_lock(lock_id)?;
        identity_gate::authorize(caller, &agreement.parties(), Operation::Unlock, Some(record))?;
        ensure_terms_match(record, agreement)?;

        let key = serde_json::to_vec(&record.key)?;
        self.delegate(&contract, ledger_fn::UNLOCK_FUNGIBLE_ASSET, &[key])?;
        self.registry
            .remove_fungible_lock(lock_id, LockExit::Unlocked)?;
        self.debug_check_balances();

        log_exit(
            LockExit::Unlocked,
            &agreement.asset_type,
            &lock_id.to_string(),
            caller,
        );
        Ok(true)
    }

    // =================================================================
    // Claim
    // =================================================================

    /// Claim a non-fungible lock as its recipient.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `MissingField`, `NotLocked`, `Unauthorized`,
    /// `Expired`, `UnsupportedMechanism`, `InvalidPreimage`, `Ledger`.
    pub fn claim_asset(
        &mut self,
        caller: &Identity,
        agreement: &AssetExchangeAgreement,
        claim: &ClaimDescriptor,
    ) -> Result<bool> {
        self.try_claim_asset(caller, agreement, claim)
            .inspect_err(|err| reject("ClaimAsset", caller, err))
    }

    fn try_claim_asset(
        &mut self,
        caller: &Identity,
        agreement: &AssetExchangeAgreement,
        claim: &ClaimDescriptor,
    ) -> Result<bool> {
        let contract = self.storage_contract()?;
        validator::validate_asset(agreement, Operation::Claim)?;
        self.codec.validate_claim(claim)?;
        let record = self.require_asset_lock(agreement)?;
        identity_gate::authorize(caller, &agreement.parties(), Operation::Claim, Some(record))?;
        self.check_claim(record, claim)?;

        let args = [
            serde_json::to_vec(&record.key)?,
            serde_json::to_vec(&self.codec.encode_claim(claim)?)?,
        ];
        self.delegate(&contract, ledger_fn::CLAIM_ASSET, &args)?;
        self.registry
            .remove_asset_lock(&agreement.asset_type, &agreement.id)?;

        log_exit(LockExit::Claimed, &agreement.asset_type, &agreement.id, caller);
        Ok(true)
    }

    /// Claim a fungible lock as its recipient. Units are not returned to the pool.
    ///
    /// # Errors
    /// As [`Self::claim_asset`], plus `InvalidAgreement` if the agreement's
    /// type or units differ from the lock.
    pub fn claim_fungible_asset(
        &mut self,
        caller: &Identity,
        lock_id: LockId,
        agreement: &FungibleAssetExchangeAgreement,
        claim: &ClaimDescriptor,
    ) -> Result<bool> {
        self.try_claim_fungible_asset(caller, lock_id, agreement, claim)
            .inspect_err(|err| reject("ClaimFungibleAsset", caller, err))
    }

    fn try_claim_fungible_asset(
        &mut self,
        caller: &Identity,
        lock_id: LockId,
        agreement: &FungibleAssetExchangeAgreement,
        claim: &ClaimDescriptor,
    ) -> Result<bool> {
        let contract = self.storage_contract()?;
        validator::validate_fungible(agreement, Operation::Claim)?;
        self.codec.validate_claim(claim)?;
        let record = self.require_fungible_lock(lock_id)?;
        identity_gate::authorize(caller, &agreement.parties(), Operation::Claim, Some(record))?;
        ensure_terms_match(record, agreement)?;
        self.check_claim(record, claim)?;

        let args = [
            serde_json::to_vec(&record.key)?,
            serde_json::to_vec(&self.codec.encode_claim(claim)?)?,
        ];
        self.delegate(&contract, ledger_fn::CLAIM_FUNGIBLE_ASSET, &args)?;
        self.registry
            .remove_fungible_lock(lock_id, LockExit::Claimed)?;
        self.debug_check_balances();

        log_exit(
            LockExit::Claimed,
            &agreement.asset_type,
            &lock_id.to_string(),
            caller,
        );
        Ok(true)
    }

    // =================================================================
    // Lock status
    // =================================================================

    /// Whether a live, unexpired lock matches the agreement.
    ///
    /// An unset `locker` or `recipient` is taken to be the caller. A caller
    /// that is neither party always gets `false`.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `MissingField`, `InvalidAgreement`.
    pub fn is_asset_locked(
        &self,
        caller: &Identity,
        agreement: &AssetExchangeAgreement,
    ) -> Result<bool> {
        self.storage_contract()?;
        validator::validate_asset(agreement, Operation::Query)?;
        let Some(parties) = visible_parties(caller, &agreement.parties())? else {
            return Ok(false);
        };
        let locked = match self
            .registry
            .asset_lock(&agreement.asset_type, &agreement.id)
        {
            Some(record) => self.is_live_for(record, &parties)?,
            None => false,
        };
        tracing::debug!(
            asset_type = %agreement.asset_type,
            asset_id = %agreement.id,
            locked,
            "asset lock status"
        );
        Ok(locked)
    }

    /// Whether fungible lock `lock_id` is live, unexpired and matches the agreement.
    ///
    /// # Errors
    /// As [`Self::is_asset_locked`].
    pub fn is_fungible_asset_locked(
        &self,
        caller: &Identity,
        lock_id: LockId,
        agreement: &FungibleAssetExchangeAgreement,
    ) -> Result<bool> {
        self.storage_contract()?;
        validator::validate_fungible(agreement, Operation::Query)?;
        let Some(parties) = visible_parties(caller, &agreement.parties())? else {
            return Ok(false);
        };
        let locked = match self.registry.fungible_lock(lock_id) {
            Some(record) if ensure_terms_match(record, agreement).is_ok() => {
                self.is_live_for(record, &parties)?
            }
            _ => false,
        };
        tracing::debug!(%lock_id, locked, "fungible lock status");
        Ok(locked)
    }

    /// Seconds until the matching lock expires (0 once expired).
    ///
    /// # Errors
    /// `InteropNotConfigured`, `MissingField`, `InvalidAgreement`,
    /// `Unauthorized` for a third-party caller, `NotLocked`.
    pub fn get_asset_time_to_release(
        &self,
        caller: &Identity,
        agreement: &AssetExchangeAgreement,
    ) -> Result<u64> {
        self.storage_contract()?;
        validator::validate_asset(agreement, Operation::Query)?;
        let parties = party_to(caller, &agreement.parties())?;
        let record = self
            .registry
            .asset_lock(&agreement.asset_type, &agreement.id)
            .filter(|record| held_by(record, &parties))
            .ok_or_else(|| AssetLockError::NotLocked {
                key: LockKey::non_fungible(&agreement.asset_type, &agreement.id).to_string(),
            })?;
        self.time_to_release(record)
    }

    /// Seconds until fungible lock `lock_id` expires (0 once expired).
    ///
    /// # Errors
    /// As [`Self::get_asset_time_to_release`], plus `InvalidAgreement` if
    /// the agreement's type or units differ from the lock.
    pub fn get_fungible_asset_time_to_release(
        &self,
        caller: &Identity,
        lock_id: LockId,
        agreement: &FungibleAssetExchangeAgreement,
    ) -> Result<u64> {
        self.storage_contract()?;
        validator::validate_fungible(agreement, Operation::Query)?;
        let parties = party_to(caller, &agreement.parties())?;
        let record = self
            .registry
            .fungible_lock(lock_id)
            .filter(|record| held_by(record, &parties))
            .ok_or_else(|| AssetLockError::NotLocked {
                key: lock_id.to_string(),
            })?;
        ensure_terms_match(record, agreement)?;
        self.time_to_release(record)
    }

    // =================================================================
    // Fungible pool accounting
    // =================================================================

    /// Declare `num_units` more units of `asset_type`.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `MissingField`, `BalanceOverflow`, `Ledger`.
    pub fn add_fungible_asset_count(&mut self, asset_type: &str, num_units: u64) -> Result<bool> {
        self.try_add_fungible_asset_count(asset_type, num_units)
            .inspect_err(|err| {
                tracing::warn!(
                    asset_type,
                    units = num_units,
                    %err,
                    "AddFungibleAssetCount rejected"
                );
            })
    }

    fn try_add_fungible_asset_count(&mut self, asset_type: &str, num_units: u64) -> Result<bool> {
        let contract = self.storage_contract()?;
        validator::validate_asset_type(asset_type)?;
        validator::validate_units(num_units)?;
        self.registry.ensure_can_add(asset_type, num_units)?;

        let args = [
            asset_type.as_bytes().to_vec(),
            num_units.to_string().into_bytes(),
        ];
        self.delegate(&contract, ledger_fn::ADD_FUNGIBLE_ASSET_COUNT, &args)?;
        let balance = self.registry.add_units(asset_type, num_units)?;

        tracing::info!(
            asset_type,
            units = num_units,
            total = balance.total_units,
            unlocked = balance.unlocked_units,
            "fungible units declared"
        );
        Ok(true)
    }

    /// Total units ever declared for `asset_type`.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `MissingField`, `UnknownAssetType`.
    pub fn get_total_fungible_asset_count(&self, asset_type: &str) -> Result<u64> {
        Ok(self.declared_balance(asset_type)?.total_units)
    }

    /// Units of `asset_type` not held by any lock.
    ///
    /// # Errors
    /// As [`Self::get_total_fungible_asset_count`].
    pub fn get_unlocked_fungible_asset_count(&self, asset_type: &str) -> Result<u64> {
        Ok(self.declared_balance(asset_type)?.unlocked_units)
    }

    /// `total - unlocked` for `asset_type`.
    ///
    /// # Errors
    /// As [`Self::get_total_fungible_asset_count`].
    pub fn get_total_fungible_locked_assets(&self, asset_type: &str) -> Result<u64> {
        Ok(self.declared_balance(asset_type)?.locked_units())
    }

    // =================================================================
    // Enumeration
    // =================================================================

    /// All locks held by `locker` for `recipient`.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `InvalidQuery`.
    pub fn get_all_locked_assets(
        &self,
        recipient: &Identity,
        locker: &Identity,
    ) -> Result<Vec<LockedAssetView>> {
        self.storage_contract()?;
        self.queries().all_locked_assets(recipient, locker)
    }

    /// Non-fungible locks held by `locker` for `recipient`.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `InvalidQuery`.
    pub fn get_all_non_fungible_locked_assets(
        &self,
        recipient: &Identity,
        locker: &Identity,
    ) -> Result<Vec<LockedAssetView>> {
        self.storage_contract()?;
        self.queries().non_fungible_locked_assets(recipient, locker)
    }

    /// Fungible locks held by `locker` for `recipient`.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `InvalidQuery`.
    pub fn get_all_fungible_locked_assets(
        &self,
        recipient: &Identity,
        locker: &Identity,
    ) -> Result<Vec<LockedAssetView>> {
        self.storage_contract()?;
        self.queries().fungible_locked_assets(recipient, locker)
    }

    /// Every lock expiring at or before `timestamp_secs`.
    ///
    /// # Errors
    /// `InteropNotConfigured`, `InvalidQuery`.
    pub fn get_all_assets_locked_until(&self, timestamp_secs: u64) -> Result<Vec<LockedAssetView>> {
        self.storage_contract()?;
        self.queries().locked_until(timestamp_secs)
    }

    // =================================================================
    // Internals
    // =================================================================

    fn queries(&self) -> LockQueries<'_> {
        LockQueries::new(&self.registry, self.codec, self.config.max_query_results)
    }

    fn storage_contract(&self) -> Result<ContractId> {
        self.ledger
            .storage_contract_id()
            .ok_or(AssetLockError::InteropNotConfigured)
    }

    fn delegate(&mut self, contract: &ContractId, function: &str, args: &[Vec<u8>]) -> Result<()> {
        self.ledger.invoke(contract, function, args)?;
        tracing::debug!(%contract, function, "state delegated to storage contract");
        Ok(())
    }

    fn declared_balance(&self, asset_type: &str) -> Result<&FungibleBalance> {
        self.storage_contract()?;
        validator::validate_asset_type(asset_type)?;
        self.registry.declared_balance(asset_type)
    }

    fn require_asset_lock(&self, agreement: &AssetExchangeAgreement) -> Result<&LockRecord> {
        self.registry
            .asset_lock(&agreement.asset_type, &agreement.id)
            .ok_or_else(|| AssetLockError::NotLocked {
                key: LockKey::non_fungible(&agreement.asset_type, &agreement.id).to_string(),
            })
    }

    fn require_fungible_lock(&self, lock_id: LockId) -> Result<&LockRecord> {
        self.registry
            .fungible_lock(lock_id)
            .ok_or_else(|| AssetLockError::NotLocked {
                key: lock_id.to_string(),
            })
    }

    fn new_record(
        &self,
        key: LockKey,
        num_units: u64,
        locker: &Identity,
        recipient: &Identity,
        lock: &LockDescriptor,
    ) -> Result<LockRecord> {
        let encoded = self.codec.encode_lock(lock)?;
        Ok(LockRecord {
            key,
            num_units,
            locker: locker.clone(),
            recipient: recipient.clone(),
            mechanism: encoded.mechanism,
            lock_payload: encoded.payload,
            created_at: self.clock.now(),
        })
    }

    /// Payload completeness plus the expiry window.
    fn check_lock_terms(&self, lock: &LockDescriptor) -> Result<()> {
        self.codec.validate_lock(lock)?;
        let now_secs = self.clock.now_secs();
        let expiry_secs = lock.expiry_secs();
        let earliest = now_secs.saturating_add(self.config.min_lock_duration_secs);
        if expiry_secs <= earliest {
            return Err(AssetLockError::Expired {
                expiry_secs,
                now_secs,
            });
        }
        let latest = now_secs.saturating_add(self.config.max_lock_duration_secs);
        if expiry_secs > latest {
            return Err(AssetLockError::invalid_agreement(format!(
                "expiry {expiry_secs} is beyond the maximum lock duration (latest {latest})"
            )));
        }
        Ok(())
    }

    /// Lock must be unexpired and `claim` must open it.
    fn check_claim(&self, record: &LockRecord, claim: &ClaimDescriptor) -> Result<()> {
        let lock = self.codec.decode_record(record)?;
        let now_secs = self.clock.now_secs();
        if now_secs >= lock.expiry_secs() {
            return Err(AssetLockError::Expired {
                expiry_secs: lock.expiry_secs(),
                now_secs,
            });
        }
        self.codec.verify_claim(&lock, claim)
    }

    /// Held by `parties` and not yet expired.
    ///
    /// # Errors
    /// `Codec` if the stored lock payload can't be decoded.
    fn is_live_for(&self, record: &LockRecord, parties: &Parties) -> Result<bool> {
        if !held_by(record, parties) {
            return Ok(false);
        }
        let expiry_secs = self.codec.decode_record(record)?.expiry_secs();
        Ok(self.clock.now_secs() < expiry_secs)
    }

    fn time_to_release(&self, record: &LockRecord) -> Result<u64> {
        let expiry_secs = self.codec.decode_record(record)?.expiry_secs();
        Ok(expiry_secs.saturating_sub(self.clock.now_secs()))
    }

    fn debug_check_balances(&self) {
        debug_assert!(
            self.registry.verify_balances().is_ok(),
            "fungible balance invariant violated"
        );
    }
}

/// Resolved parties, or `None` if the caller may not see the lock.
fn visible_parties(caller: &Identity, parties: &Parties) -> Result<Option<Parties>> {
    let parties = identity_gate::resolve_query_parties(caller, parties)?;
    match identity_gate::authorize(caller, &parties, Operation::Query, None)? {
        Decision::Allow => Ok(Some(parties)),
        Decision::Deny => {
            tracing::debug!(%caller, "lock hidden from non-party caller");
            Ok(None)
        }
    }
}

/// Resolved parties; a non-party caller is an error.
fn party_to(caller: &Identity, parties: &Parties) -> Result<Parties> {
    visible_parties(caller, parties)?.ok_or_else(|| {
        AssetLockError::unauthorized(format!("{caller} is not a party to this agreement"))
    })
}

fn held_by(record: &LockRecord, parties: &Parties) -> bool {
    record.locker == parties.locker && record.recipient == parties.recipient
}

fn ensure_terms_match(
    record: &LockRecord,
    agreement: &FungibleAssetExchangeAgreement,
) -> Result<()> {
    if record.key.asset_type() != agreement.asset_type || record.num_units != agreement.num_units {
        return Err(AssetLockError::invalid_agreement(format!(
            "{} holds {} units, agreement names {} units of {}",
            record.key, record.num_units, agreement.num_units, agreement.asset_type
        )));
    }
    Ok(())
}

fn reject(operation: &'static str, caller: &Identity, err: &AssetLockError) {
    tracing::warn!(operation, %caller, %err, "request rejected");
}

fn log_exit(exit: LockExit, asset_type: &str, asset: &str, caller: &Identity) {
    tracing::info!(%exit, asset_type, asset, by = %caller, "lock released");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTimeSource;
    use crate::ledger::InMemoryLedger;
    use assetlock_types::HtlcSecret;

    const NOW: i64 = 1_700_000_000;
    const EXPIRY: u64 = 1_700_000_060;

    fn alice() -> Identity {
        Identity::from("Alice")
    }

    fn bob() -> Identity {
        Identity::from("Bob")
    }

    fn manager() -> (AssetLockManager<InMemoryLedger>, Arc<ManualTimeSource>) {
        let clock = Arc::new(ManualTimeSource::at(NOW));
        let mgr = AssetLockManager::with_time_source(
            InMemoryLedger::bound(ContractId::new("interopcc")),
            EngineConfig::default(),
            clock.clone(),
        )
        .unwrap();
        (mgr, clock)
    }

    fn funded() -> (AssetLockManager<InMemoryLedger>, Arc<ManualTimeSource>) {
        let (mut mgr, clock) = manager();
        mgr.add_fungible_asset_count("cbdc", 10_000).unwrap();
        (mgr, clock)
    }

    #[test]
    fn rejects_invalid_config() {
        let cfg = EngineConfig {
            max_query_results: 0,
            ..EngineConfig::default()
        };
        assert!(AssetLockManager::new(InMemoryLedger::new(), cfg).is_err());
    }

    #[test]
    fn unbound_ledger_checked_first() {
        let mut mgr =
            AssetLockManager::new(InMemoryLedger::new(), EngineConfig::default()).unwrap();
        // Even a malformed agreement reports the missing binding.
        let mut agreement = AssetExchangeAgreement::dummy();
        agreement.asset_type.clear();
        let lock = LockDescriptor::htlc(Vec::new(), 0);
        let err = mgr.lock_asset(&alice(), &agreement, &lock).unwrap_err();
        assert!(matches!(err, AssetLockError::InteropNotConfigured));
        assert!(matches!(
            mgr.is_asset_locked(&alice(), &agreement),
            Err(AssetLockError::InteropNotConfigured)
        ));
        assert!(matches!(
            mgr.get_total_fungible_asset_count("cbdc"),
            Err(AssetLockError::InteropNotConfigured)
        ));
    }

    #[test]
    fn lock_then_query() {
        let (mut mgr, _) = manager();
        let secret = HtlcSecret::random();
        let lock = mgr.codec().htlc_lock(secret.as_bytes(), EXPIRY);
        let agreement = AssetExchangeAgreement::dummy();

        assert!(!mgr.is_asset_locked(&alice(), &agreement).unwrap());
        assert!(mgr.lock_asset(&alice(), &agreement, &lock).unwrap());
        assert!(mgr.is_asset_locked(&alice(), &agreement).unwrap());
        assert!(mgr.is_asset_locked(&bob(), &agreement).unwrap());
        assert_eq!(mgr.ledger().count(ledger_fn::LOCK_ASSET), 1);
    }

    #[test]
    fn double_lock_fails() {
        let (mut mgr, _) = manager();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = AssetExchangeAgreement::dummy();
        mgr.lock_asset(&alice(), &agreement, &lock).unwrap();
        let err = mgr.lock_asset(&alice(), &agreement, &lock).unwrap_err();
        assert!(matches!(err, AssetLockError::AlreadyLocked { .. }));
        assert_eq!(mgr.ledger().count(ledger_fn::LOCK_ASSET), 1);
    }

    #[test]
    fn lock_rejects_empty_hash_and_past_expiry() {
        let (mut mgr, _) = manager();
        let agreement = AssetExchangeAgreement::dummy();
        let err = mgr
            .lock_asset(&alice(), &agreement, &LockDescriptor::htlc(Vec::new(), EXPIRY))
            .unwrap_err();
        assert!(matches!(err, AssetLockError::MissingField { .. }));

        let past = mgr.codec().htlc_lock(b"s", 1_699_999_999);
        let err = mgr.lock_asset(&alice(), &agreement, &past).unwrap_err();
        assert!(matches!(err, AssetLockError::Expired { .. }));

        let too_far = mgr.codec().htlc_lock(b"s", EXPIRY + 30 * 24 * 3600);
        let err = mgr.lock_asset(&alice(), &agreement, &too_far).unwrap_err();
        assert!(matches!(err, AssetLockError::InvalidAgreement { .. }));
        assert!(mgr.registry().is_empty());
    }

    #[test]
    fn self_lock_rejected() {
        let (mut mgr, _) = manager();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = AssetExchangeAgreement::new("bond", "A001", "Alice", "Alice");
        let err = mgr.lock_asset(&alice(), &agreement, &lock).unwrap_err();
        assert!(matches!(err, AssetLockError::InvalidAgreement { .. }));
    }

    #[test]
    fn ledger_failure_aborts_without_mutation() {
        let (mut mgr, _) = funded();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        mgr.ledger_mut().fail_on(ledger_fn::LOCK_FUNGIBLE_ASSET);
        let err = mgr
            .lock_fungible_asset(&alice(), &FungibleAssetExchangeAgreement::dummy(), &lock)
            .unwrap_err();
        assert!(matches!(err, AssetLockError::Ledger { .. }));
        assert_eq!(mgr.get_unlocked_fungible_asset_count("cbdc").unwrap(), 10_000);
        assert_eq!(mgr.registry().next_lock_id(), LockId(1));
    }

    #[test]
    fn unlock_by_locker_only() {
        let (mut mgr, _) = manager();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = AssetExchangeAgreement::dummy();
        let err = mgr.unlock_asset(&alice(), &agreement).unwrap_err();
        assert!(matches!(err, AssetLockError::NotLocked { .. }));

        mgr.lock_asset(&alice(), &agreement, &lock).unwrap();
        let err = mgr.unlock_asset(&bob(), &agreement).unwrap_err();
        assert!(matches!(err, AssetLockError::Unauthorized { .. }));
        assert!(mgr.is_asset_locked(&alice(), &agreement).unwrap());

        assert!(mgr.unlock_asset(&alice(), &agreement).unwrap());
        assert!(!mgr.is_asset_locked(&alice(), &agreement).unwrap());
    }

    #[test]
    fn claim_checks_preimage_and_expiry() {
        let (mut mgr, clock) = manager();
        let secret = HtlcSecret::random();
        let lock = mgr.codec().htlc_lock(secret.as_bytes(), EXPIRY);
        let agreement = AssetExchangeAgreement::dummy();
        mgr.lock_asset(&alice(), &agreement, &lock).unwrap();

        let wrong = ClaimDescriptor::htlc(b"guess".to_vec());
        let err = mgr.claim_asset(&bob(), &agreement, &wrong).unwrap_err();
        assert!(matches!(err, AssetLockError::InvalidPreimage));

        let err = mgr
            .claim_asset(&alice(), &agreement, &secret.claim())
            .unwrap_err();
        assert!(matches!(err, AssetLockError::Unauthorized { .. }));

        clock.advance(60);
        let err = mgr
            .claim_asset(&bob(), &agreement, &secret.claim())
            .unwrap_err();
        assert!(matches!(err, AssetLockError::Expired { .. }));
        assert!(mgr.registry().asset_lock("bond", "A001").is_some());

        // The locker can still take the asset back after expiry.
        assert!(mgr.unlock_asset(&alice(), &agreement).unwrap());
    }

    #[test]
    fn claim_success_removes_lock() {
        let (mut mgr, _) = manager();
        let secret = HtlcSecret::random();
        let lock = mgr.codec().htlc_lock(secret.as_bytes(), EXPIRY);
        let agreement = AssetExchangeAgreement::dummy();
        mgr.lock_asset(&alice(), &agreement, &lock).unwrap();
        assert!(mgr.claim_asset(&bob(), &agreement, &secret.claim()).unwrap());
        assert!(!mgr.is_asset_locked(&alice(), &agreement).unwrap());
        assert_eq!(mgr.ledger().count(ledger_fn::CLAIM_ASSET), 1);
    }

    #[test]
    fn fungible_lock_accounting() {
        let (mut mgr, _) = funded();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = FungibleAssetExchangeAgreement::dummy();
        let id = mgr.lock_fungible_asset(&alice(), &agreement, &lock).unwrap();
        assert_eq!(mgr.get_total_fungible_asset_count("cbdc").unwrap(), 10_000);
        assert_eq!(mgr.get_total_fungible_locked_assets("cbdc").unwrap(), 1_000);
        assert_eq!(mgr.get_unlocked_fungible_asset_count("cbdc").unwrap(), 9_000);
        assert!(mgr.is_fungible_asset_locked(&alice(), id, &agreement).unwrap());

        assert!(mgr.unlock_fungible_asset(&alice(), id, &agreement).unwrap());
        assert_eq!(mgr.get_unlocked_fungible_asset_count("cbdc").unwrap(), 10_000);
        assert!(!mgr.is_fungible_asset_locked(&alice(), id, &agreement).unwrap());
        mgr.verify_balances().unwrap();
    }

    #[test]
    fn fungible_insufficient_balance() {
        let (mut mgr, _) = funded();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = FungibleAssetExchangeAgreement::new("cbdc", 10_001, "Bob", "Alice");
        let err = mgr
            .lock_fungible_asset(&alice(), &agreement, &lock)
            .unwrap_err();
        assert!(matches!(err, AssetLockError::InsufficientBalance { .. }));
        assert_eq!(mgr.get_unlocked_fungible_asset_count("cbdc").unwrap(), 10_000);
        assert_eq!(mgr.ledger().invocations().len(), 1);
    }

    #[test]
    fn fungible_terms_must_match_lock() {
        let (mut mgr, _) = funded();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = FungibleAssetExchangeAgreement::dummy();
        let id = mgr.lock_fungible_asset(&alice(), &agreement, &lock).unwrap();

        let other = FungibleAssetExchangeAgreement::new("cbdc", 999, "Bob", "Alice");
        let err = mgr.unlock_fungible_asset(&alice(), id, &other).unwrap_err();
        assert!(matches!(err, AssetLockError::InvalidAgreement { .. }));
        assert!(!mgr.is_fungible_asset_locked(&alice(), id, &other).unwrap());
    }

    #[test]
    fn fungible_claim_keeps_units_out_of_pool() {
        let (mut mgr, _) = funded();
        let secret = HtlcSecret::random();
        let lock = mgr.codec().htlc_lock(secret.as_bytes(), EXPIRY);
        let agreement = FungibleAssetExchangeAgreement::dummy();
        let id = mgr.lock_fungible_asset(&alice(), &agreement, &lock).unwrap();

        assert!(
            mgr.claim_fungible_asset(&bob(), id, &agreement, &secret.claim())
                .unwrap()
        );
        assert_eq!(mgr.get_unlocked_fungible_asset_count("cbdc").unwrap(), 9_000);
        assert_eq!(mgr.get_total_fungible_locked_assets("cbdc").unwrap(), 1_000);
        assert!(mgr.registry().fungible_lock(id).is_none());
        mgr.verify_balances().unwrap();
    }

    #[test]
    fn add_count_validation() {
        let (mut mgr, _) = manager();
        assert!(matches!(
            mgr.add_fungible_asset_count("", 10),
            Err(AssetLockError::MissingField { field: "type" })
        ));
        assert!(matches!(
            mgr.add_fungible_asset_count("cbdc", 0),
            Err(AssetLockError::MissingField { field: "num_units" })
        ));
        assert!(matches!(
            mgr.get_total_fungible_asset_count("cbdc"),
            Err(AssetLockError::UnknownAssetType(_))
        ));
        assert!(mgr.ledger().invocations().is_empty());
    }

    #[test]
    fn query_privacy_and_defaulting() {
        let (mut mgr, _) = manager();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = AssetExchangeAgreement::dummy();
        mgr.lock_asset(&alice(), &agreement, &lock).unwrap();

        let carol = Identity::from("Carol");
        assert!(!mgr.is_asset_locked(&carol, &agreement).unwrap());

        let mut implicit_locker = agreement.clone();
        implicit_locker.locker = Identity::unset();
        assert!(mgr.is_asset_locked(&alice(), &implicit_locker).unwrap());

        let mut implicit_recipient = agreement.clone();
        implicit_recipient.recipient = Identity::unset();
        // Recipient defaults to Alice, who is also the locker.
        assert!(matches!(
            mgr.is_asset_locked(&alice(), &implicit_recipient),
            Err(AssetLockError::InvalidAgreement { .. })
        ));
    }

    #[test]
    fn expired_lock_reads_as_unlocked() {
        let (mut mgr, clock) = manager();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = AssetExchangeAgreement::dummy();
        mgr.lock_asset(&alice(), &agreement, &lock).unwrap();
        assert_eq!(mgr.get_asset_time_to_release(&alice(), &agreement).unwrap(), 60);
        clock.advance(60);
        assert!(!mgr.is_asset_locked(&alice(), &agreement).unwrap());
        assert_eq!(mgr.get_asset_time_to_release(&alice(), &agreement).unwrap(), 0);
    }

    #[test]
    fn time_to_release_requires_party() {
        let (mut mgr, _) = manager();
        let lock = mgr.codec().htlc_lock(b"s", EXPIRY);
        let agreement = AssetExchangeAgreement::dummy();
        assert!(matches!(
            mgr.get_asset_time_to_release(&alice(), &agreement),
            Err(AssetLockError::NotLocked { .. })
        ));
        mgr.lock_asset(&alice(), &agreement, &lock).unwrap();
        assert!(matches!(
            mgr.get_asset_time_to_release(&Identity::from("Carol"), &agreement),
            Err(AssetLockError::Unauthorized { .. })
        ));
    }

    #[test]
    fn lock_window_bounds() {
        let clock = Arc::new(ManualTimeSource::at(NOW));
        let cfg = EngineConfig {
            min_lock_duration_secs: 30,
            max_lock_duration_secs: 3_600,
            ..EngineConfig::default()
        };
        let mut mgr = AssetLockManager::with_time_source(
            InMemoryLedger::bound(ContractId::new("interopcc")),
            cfg,
            clock,
        )
        .unwrap();
        let now = u64::try_from(NOW).unwrap();
        let codec = mgr.codec();
        let bond = |id: &str| AssetExchangeAgreement::new("bond", id, "Bob", "Alice");

        let err = mgr
            .lock_asset(&alice(), &bond("A001"), &codec.htlc_lock(b"s", now + 30))
            .unwrap_err();
        assert!(matches!(
            err,
            AssetLockError::Expired { expiry_secs, .. } if expiry_secs == now + 30
        ));
        assert!(mgr.registry().is_empty());

        assert!(
            mgr.lock_asset(&alice(), &bond("A001"), &codec.htlc_lock(b"s", now + 31))
                .unwrap()
        );
        assert!(
            mgr.lock_asset(&alice(), &bond("A002"), &codec.htlc_lock(b"s", now + 3_600))
                .unwrap()
        );
        let err = mgr
            .lock_asset(&alice(), &bond("A003"), &codec.htlc_lock(b"s", now + 3_601))
            .unwrap_err();
        assert!(matches!(err, AssetLockError::InvalidAgreement { .. }));
        assert_eq!(mgr.registry().len(), 2);
    }

    #[test]
    fn undecodable_payload_surfaces_on_status() {
        let (mut mgr, _) = manager();
        mgr.registry
            .insert_asset_lock(LockRecord {
                key: LockKey::non_fungible("bond", "A001"),
                num_units: 1,
                locker: alice(),
                recipient: bob(),
                mechanism: assetlock_types::LockMechanism::Htlc,
                lock_payload: b"not json".to_vec(),
                created_at: chrono::Utc::now(),
            })
            .unwrap();
        let err = mgr
            .is_asset_locked(&alice(), &AssetExchangeAgreement::dummy())
            .unwrap_err();
        assert!(matches!(err, AssetLockError::Codec(_)));
        // Non-parties still get a plain `false` without touching the payload.
        assert!(
            !mgr.is_asset_locked(&Identity::from("Carol"), &AssetExchangeAgreement::dummy())
                .unwrap()
        );
    }
}
