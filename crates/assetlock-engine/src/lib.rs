//! # assetlock-engine
//!
//! **Lock lifecycle plane**: agreement validation, identity gating, HTLC
//! payload handling, the lock registry, and the operation surface that
//! ties them together.
//!
//! ## Architecture
//!
//! 1. **validator**: structural checks on agreements (required fields per operation)
//! 2. **identity_gate**: caller-vs-record authorization, query party defaulting
//! 3. **LockCodec**: lock/claim envelopes, HTLC digest and preimage verification
//! 4. **LockRegistry**: live locks and fungible balances, with atomic transitions
//! 5. **LockQueries**: read-only enumeration by party pair or expiry
//! 6. **AssetLockManager**: runs the pipeline below for every request
//!
//! ## Request Flow
//!
//! ```text
//! caller → LedgerService binding → validator → LockCodec.validate_*
//!     → LockRegistry lookup → identity_gate → expiry / preimage check
//!     → LedgerService.invoke → LockRegistry write
//! ```
//!
//! Nothing is written to the registry unless every earlier step succeeds.

pub mod clock;
pub mod codec;
pub mod identity_gate;
pub mod ledger;
pub mod manager;
pub mod query;
pub mod registry;
pub mod validator;

pub use clock::{ManualTimeSource, SystemTimeSource, TimeSource};
pub use codec::LockCodec;
pub use identity_gate::{Decision, Operation};
pub use ledger::{InMemoryLedger, Invocation, LedgerService};
pub use manager::AssetLockManager;
pub use query::LockQueries;
pub use registry::LockRegistry;
