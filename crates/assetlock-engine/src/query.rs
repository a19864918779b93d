//! Query & enumeration service: read-only views over the registry.
//!
//! Listing queries are scoped to one `(recipient, locker)` pair; both must
//! be given and must differ. Results come back in registry order
//! (non-fungible by key, fungible by lock id) and are capped at
//! `max_results`.

use assetlock_types::{AssetLockError, Identity, LockRecord, LockedAssetView, Result};

use crate::{LockCodec, LockRegistry};

/// Borrowed read-only view of a registry.
pub struct LockQueries<'a> {
    registry: &'a LockRegistry,
    codec: LockCodec,
    max_results: usize,
}

impl<'a> LockQueries<'a> {
    #[must_use]
    pub fn new(registry: &'a LockRegistry, codec: LockCodec, max_results: usize) -> Self {
        Self {
            registry,
            codec,
            max_results,
        }
    }

    /// Every lock (fungible and non-fungible) held by `locker` for `recipient`.
    pub fn all_locked_assets(
        &self,
        recipient: &Identity,
        locker: &Identity,
    ) -> Result<Vec<LockedAssetView>> {
        validate_pair(recipient, locker)?;
        self.collect(
            self.registry
                .records()
                .filter(|record| held_between(record, recipient, locker)),
        )
    }

    /// Non-fungible locks held by `locker` for `recipient`.
    pub fn non_fungible_locked_assets(
        &self,
        recipient: &Identity,
        locker: &Identity,
    ) -> Result<Vec<LockedAssetView>> {
        validate_pair(recipient, locker)?;
        self.collect(
            self.registry
                .asset_locks()
                .filter(|record| held_between(record, recipient, locker)),
        )
    }

    /// Fungible locks held by `locker` for `recipient`.
    pub fn fungible_locked_assets(
        &self,
        recipient: &Identity,
        locker: &Identity,
    ) -> Result<Vec<LockedAssetView>> {
        validate_pair(recipient, locker)?;
        self.collect(
            self.registry
                .fungible_locks()
                .filter(|record| held_between(record, recipient, locker)),
        )
    }

    /// Every lock whose expiry is at or before `timestamp_secs`.
    ///
    /// # Errors
    /// `InvalidQuery` for a zero timestamp.
    pub fn locked_until(&self, timestamp_secs: u64) -> Result<Vec<LockedAssetView>> {
        if timestamp_secs == 0 {
            return Err(AssetLockError::invalid_query("timestamp must be > 0"));
        }
        let mut views = Vec::new();
        for record in self.registry.records() {
            let view = self.view(record)?;
            if view.expiry_secs <= timestamp_secs {
                views.push(view);
            }
        }
        Ok(self.cap(views))
    }

    fn collect<'r>(
        &self,
        records: impl Iterator<Item = &'r LockRecord>,
    ) -> Result<Vec<LockedAssetView>> {
        let views = records
            .map(|record| self.view(record))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.cap(views))
    }

    fn view(&self, record: &LockRecord) -> Result<LockedAssetView> {
        let expiry_secs = self.codec.decode_record(record)?.expiry_secs();
        Ok(LockedAssetView::from_record(record, expiry_secs))
    }

    fn cap(&self, mut views: Vec<LockedAssetView>) -> Vec<LockedAssetView> {
        if views.len() > self.max_results {
            tracing::warn!(
                matched = views.len(),
                max_results = self.max_results,
                "query result truncated"
            );
            views.truncate(self.max_results);
        }
        views
    }
}

fn validate_pair(recipient: &Identity, locker: &Identity) -> Result<()> {
    if recipient.is_unset() || locker.is_unset() {
        return Err(AssetLockError::invalid_query(
            "both recipient and locker must be supplied",
        ));
    }
    if recipient == locker {
        return Err(AssetLockError::invalid_query(format!(
            "recipient and locker are both {recipient}"
        )));
    }
    Ok(())
}

fn held_between(record: &LockRecord, recipient: &Identity, locker: &Identity) -> bool {
    &record.recipient == recipient && &record.locker == locker
}
