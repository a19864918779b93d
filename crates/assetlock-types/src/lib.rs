//! # assetlock-types
//!
//! Shared types, errors, and configuration for the **AssetLock** exchange engine.
//!
//! This crate is the leaf dependency of the workspace. It defines:
//!
//! - **Identifiers**: [`Identity`], [`ContractId`], [`LockId`]
//! - **Agreements**: [`AssetExchangeAgreement`], [`FungibleAssetExchangeAgreement`], [`Parties`]
//! - **Mechanisms**: [`LockMechanism`], [`LockDescriptor`], [`ClaimDescriptor`], [`HtlcLock`], [`HtlcClaim`]
//! - **Registry state**: [`LockKey`], [`LockRecord`], [`FungibleBalance`], [`LockedAssetView`]
//! - **Configuration**: [`EngineConfig`], [`HashFunction`]
//! - **Errors**: [`AssetLockError`] with `AL_ERR_` prefix codes
//! - **Constants**: defaults and ledger function names

pub mod agreement;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod mechanism;
pub mod record;

mod serde_hex;

pub use agreement::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use mechanism::*;
pub use record::*;

// Constants are accessed via `assetlock_types::constants::FOO`
// (not re-exported to avoid name collisions).
