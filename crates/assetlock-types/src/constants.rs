//! System-wide constants for the AssetLock engine.

/// Default minimum distance (seconds) between lock time and HTLC expiry.
/// Zero means any strictly-future expiry is accepted.
pub const DEFAULT_MIN_LOCK_DURATION_SECS: u64 = 0;

/// Default maximum distance (seconds) between lock time and HTLC expiry (one week).
pub const DEFAULT_MAX_LOCK_DURATION_SECS: u64 = 7 * 24 * 60 * 60;

/// Default cap on the number of records returned by one enumeration query.
pub const DEFAULT_MAX_QUERY_RESULTS: usize = 10_000;

/// Ledger function names used when delegating state to the storage contract.
pub mod ledger_fn {
    pub const LOCK_ASSET: &str = "LockAsset";
    pub const LOCK_FUNGIBLE_ASSET: &str = "LockFungibleAsset";
    pub const UNLOCK_ASSET: &str = "UnlockAsset";
    pub const UNLOCK_FUNGIBLE_ASSET: &str = "UnlockFungibleAsset";
    pub const CLAIM_ASSET: &str = "ClaimAsset";
    pub const CLAIM_FUNGIBLE_ASSET: &str = "ClaimFungibleAsset";
    pub const ADD_FUNGIBLE_ASSET_COUNT: &str = "AddFungibleAssetCount";
}
