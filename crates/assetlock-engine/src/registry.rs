//! Lock registry: the authoritative lock state.
//!
//! Owns three tables:
//! - non-fungible locks keyed by `(type, id)`
//! - fungible locks keyed by a monotonically allocated [`LockId`]
//! - fungible pool balances (`total`, `unlocked`) per asset type
//!
//! Every mutation is atomic: either the full operation succeeds or the
//! registry is unchanged. Invariant for every asset type:
//!
//! ```text
//! 0 <= unlocked <= total
//! total - unlocked == Σ(live fungible lock units) + Σ(claimed units)
//! ```

use std::collections::{BTreeMap, HashMap};

use assetlock_types::{
    AssetLockError, FungibleBalance, LockExit, LockId, LockKey, LockRecord, Result,
};

/// Explicitly owned lock state. Independent registries never share data.
#[derive(Debug)]
pub struct LockRegistry {
    /// Non-fungible locks by `(type, id)`.
    asset_locks: BTreeMap<(String, String), LockRecord>,
    /// Fungible locks by lock id.
    fungible_locks: BTreeMap<LockId, LockRecord>,
    /// Per-type fungible pool accounting.
    balances: HashMap<String, FungibleBalance>,
    /// Units that left the pool through a claim, per type.
    claimed_units: HashMap<String, u64>,
    /// Id handed to the next fungible lock.
    next_lock_id: LockId,
}

impl LockRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            asset_locks: BTreeMap::new(),
            fungible_locks: BTreeMap::new(),
            balances: HashMap::new(),
            claimed_units: HashMap::new(),
            next_lock_id: LockId::FIRST,
        }
    }

    // =================================================================
    // Non-fungible locks
    // =================================================================

    #[must_use]
    pub fn asset_lock(&self, asset_type: &str, asset_id: &str) -> Option<&LockRecord> {
        self.asset_locks
            .get(&(asset_type.to_string(), asset_id.to_string()))
    }

    /// # Errors
    /// `AlreadyLocked` if a record exists for `(asset_type, asset_id)`.
    pub fn ensure_asset_unlocked(&self, asset_type: &str, asset_id: &str) -> Result<()> {
        if self.asset_lock(asset_type, asset_id).is_some() {
            return Err(AssetLockError::AlreadyLocked {
                key: LockKey::non_fungible(asset_type, asset_id).to_string(),
            });
        }
        Ok(())
    }

    /// Store a new non-fungible lock.
    ///
    /// # Errors
    /// - `AlreadyLocked` if the key is taken
    /// - `Internal` if `record` is not keyed as non-fungible
    pub fn insert_asset_lock(&mut self, record: LockRecord) -> Result<()> {
        let LockKey::NonFungible {
            asset_type,
            asset_id,
        } = &record.key
        else {
            return Err(AssetLockError::Internal(format!(
                "{} is not a non-fungible key",
                record.key
            )));
        };
        self.ensure_asset_unlocked(asset_type, asset_id)?;
        self.asset_locks
            .insert((asset_type.clone(), asset_id.clone()), record);
        Ok(())
    }

    /// Delete a non-fungible lock (unlock or claim).
    ///
    /// # Errors
    /// `NotLocked` if no record exists.
    pub fn remove_asset_lock(&mut self, asset_type: &str, asset_id: &str) -> Result<LockRecord> {
        self.asset_locks
            .remove(&(asset_type.to_string(), asset_id.to_string()))
            .ok_or_else(|| AssetLockError::NotLocked {
                key: LockKey::non_fungible(asset_type, asset_id).to_string(),
            })
    }

    // =================================================================
    // Fungible locks
    // =================================================================

    #[must_use]
    pub fn fungible_lock(&self, lock_id: LockId) -> Option<&LockRecord> {
        self.fungible_locks.get(&lock_id)
    }

    /// The id the next fungible lock will receive.
    #[must_use]
    pub fn next_lock_id(&self) -> LockId {
        self.next_lock_id
    }

    /// # Errors
    /// `InsufficientBalance` if fewer than `num_units` are unlocked.
    pub fn ensure_available(&self, asset_type: &str, num_units: u64) -> Result<()> {
        let available = self
            .balances
            .get(asset_type)
            .map_or(0, |balance| balance.unlocked_units);
        if available < num_units {
            return Err(AssetLockError::InsufficientBalance {
                asset_type: asset_type.to_string(),
                requested: num_units,
                available,
            });
        }
        Ok(())
    }

    /// Store a new fungible lock and move its units out of the unlocked pool.
    ///
    /// The record must carry the id returned by [`Self::next_lock_id`].
    ///
    /// # Errors
    /// - `InsufficientBalance` if the pool can't cover `record.num_units`
    /// - `Internal` if the key is not fungible or carries a stale lock id
    pub fn insert_fungible_lock(&mut self, record: LockRecord) -> Result<LockId> {
        let LockKey::Fungible {
            asset_type,
            lock_id,
        } = &record.key
        else {
            return Err(AssetLockError::Internal(format!(
                "{} is not a fungible key",
                record.key
            )));
        };
        if *lock_id != self.next_lock_id {
            return Err(AssetLockError::Internal(format!(
                "expected {}, record carries {lock_id}",
                self.next_lock_id
            )));
        }
        self.ensure_available(asset_type, record.num_units)?;

        // Checked above: the balance exists and covers num_units.
        if let Some(balance) = self.balances.get_mut(asset_type) {
            balance.unlocked_units -= record.num_units;
        }
        let lock_id = *lock_id;
        self.fungible_locks.insert(lock_id, record);
        self.next_lock_id = lock_id.next();
        Ok(lock_id)
    }

    /// Delete a fungible lock. On [`LockExit::Unlocked`] its units return to
    /// the unlocked pool; on [`LockExit::Claimed`] they stay out of it.
    ///
    /// # Errors
    /// - `NotLocked` if no record exists
    /// - `Internal` if restoring would break `unlocked <= total`
    pub fn remove_fungible_lock(&mut self, lock_id: LockId, exit: LockExit) -> Result<LockRecord> {
        let record = self
            .fungible_locks
            .get(&lock_id)
            .ok_or_else(|| AssetLockError::NotLocked {
                key: lock_id.to_string(),
            })?;
        let asset_type = record.key.asset_type().to_string();
        let num_units = record.num_units;

        match exit {
            LockExit::Unlocked => {
                let balance = self.balances.get_mut(&asset_type).ok_or_else(|| {
                    AssetLockError::Internal(format!("no pool for locked type {asset_type}"))
                })?;
                let restored = balance
                    .unlocked_units
                    .checked_add(num_units)
                    .filter(|restored| *restored <= balance.total_units)
                    .ok_or_else(|| {
                        AssetLockError::Internal(format!(
                            "restoring {num_units} units of {asset_type} exceeds total"
                        ))
                    })?;
                balance.unlocked_units = restored;
            }
            LockExit::Claimed => {
                *self.claimed_units.entry(asset_type).or_insert(0) += num_units;
            }
        }

        self.fungible_locks
            .remove(&lock_id)
            .ok_or_else(|| AssetLockError::Internal(format!("{lock_id} vanished")))
    }

    // =================================================================
    // Balances
    // =================================================================

    /// # Errors
    /// `BalanceOverflow` if adding `num_units` would overflow the pool.
    pub fn ensure_can_add(&self, asset_type: &str, num_units: u64) -> Result<()> {
        let total = self
            .balances
            .get(asset_type)
            .map_or(0, |balance| balance.total_units);
        total
            .checked_add(num_units)
            .map(|_| ())
            .ok_or_else(|| AssetLockError::BalanceOverflow {
                asset_type: asset_type.to_string(),
            })
    }

    /// Declare `num_units` more units of `asset_type` (total and unlocked).
    ///
    /// # Errors
    /// `BalanceOverflow` with no change if either counter would overflow.
    pub fn add_units(&mut self, asset_type: &str, num_units: u64) -> Result<&FungibleBalance> {
        self.ensure_can_add(asset_type, num_units)?;
        let balance = self
            .balances
            .entry(asset_type.to_string())
            .or_insert_with(|| FungibleBalance::new(asset_type));
        // unlocked <= total, so neither addition can overflow past the check.
        balance.total_units += num_units;
        balance.unlocked_units += num_units;
        Ok(balance)
    }

    #[must_use]
    pub fn balance(&self, asset_type: &str) -> Option<&FungibleBalance> {
        self.balances.get(asset_type)
    }

    /// Balance of a type that has units declared.
    ///
    /// # Errors
    /// `UnknownAssetType` if nothing was ever declared for `asset_type`.
    pub fn declared_balance(&self, asset_type: &str) -> Result<&FungibleBalance> {
        self.balances
            .get(asset_type)
            .filter(|balance| balance.is_declared())
            .ok_or_else(|| AssetLockError::UnknownAssetType(asset_type.to_string()))
    }

    /// Units of `asset_type` that left the pool through claims.
    #[must_use]
    pub fn claimed_units(&self, asset_type: &str) -> u64 {
        self.claimed_units.get(asset_type).copied().unwrap_or(0)
    }

    // =================================================================
    // Enumeration
    // =================================================================

    /// Non-fungible locks in `(type, id)` order.
    pub fn asset_locks(&self) -> impl Iterator<Item = &LockRecord> {
        self.asset_locks.values()
    }

    /// Fungible locks in lock-id order.
    pub fn fungible_locks(&self) -> impl Iterator<Item = &LockRecord> {
        self.fungible_locks.values()
    }

    /// All locks: non-fungible first, then fungible.
    pub fn records(&self) -> impl Iterator<Item = &LockRecord> {
        self.asset_locks().chain(self.fungible_locks())
    }

    /// Number of live locks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.asset_locks.len() + self.fungible_locks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // =================================================================
    // Invariants
    // =================================================================

    /// Re-derive every pool's locked units from the lock table.
    ///
    /// # Errors
    /// `Internal` describing the first broken invariant.
    pub fn verify_balances(&self) -> Result<()> {
        let mut live: HashMap<&str, u64> = HashMap::new();
        for record in self.fungible_locks.values() {
            let asset_type = record.key.asset_type();
            if !self.balances.contains_key(asset_type) {
                return Err(AssetLockError::Internal(format!(
                    "{} locks units of undeclared type",
                    record.key
                )));
            }
            *live.entry(asset_type).or_insert(0) += record.num_units;
        }

        for (asset_type, balance) in &self.balances {
            if balance.unlocked_units > balance.total_units {
                return Err(AssetLockError::Internal(format!(
                    "{asset_type}: unlocked {} exceeds total {}",
                    balance.unlocked_units, balance.total_units
                )));
            }
            let expected = live.get(asset_type.as_str()).copied().unwrap_or(0)
                + self.claimed_units(asset_type);
            if balance.locked_units() != expected {
                return Err(AssetLockError::Internal(format!(
                    "{asset_type}: locked {} != live + claimed {expected}",
                    balance.locked_units()
                )));
            }
        }
        Ok(())
    }
}

impl Default for LockRegistry {
    fn default() -> Self {
        Self::new()
    }
}
