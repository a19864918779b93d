//! Ledger/storage collaborator port.
//!
//! The engine keeps its authoritative lock state in a [`LockRegistry`]
//! but delegates durable persistence to a storage contract on the host
//! ledger. Every mutating operation makes exactly one synchronous
//! [`LedgerService::invoke`] call after validation and before the registry
//! write; an error from the collaborator aborts the operation untouched.
//!
//! [`InMemoryLedger`] is the in-process implementation used by tests and
//! local tooling.
//!
//! [`LockRegistry`]: crate::LockRegistry

use std::collections::HashSet;

use assetlock_types::{AssetLockError, ContractId, Result};

/// Capability interface to the host ledger.
pub trait LedgerService {
    /// The storage contract bound to this engine, if any.
    fn storage_contract_id(&self) -> Option<ContractId>;

    /// Synchronous cross-contract call.
    ///
    /// # Errors
    /// Any error aborts the calling operation.
    fn invoke(&mut self, contract: &ContractId, function: &str, args: &[Vec<u8>])
    -> Result<Vec<u8>>;
}

/// One recorded call against [`InMemoryLedger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub contract: ContractId,
    pub function: String,
    pub args: Vec<Vec<u8>>,
}

/// In-process ledger: records invocations and can be told to fail.
#[derive(Debug, Default)]
pub struct InMemoryLedger {
    contract: Option<ContractId>,
    invocations: Vec<Invocation>,
    failing: HashSet<String>,
}

impl InMemoryLedger {
    /// Create a ledger with no storage contract bound.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a ledger already bound to `contract`.
    #[must_use]
    pub fn bound(contract: ContractId) -> Self {
        Self {
            contract: Some(contract),
            ..Self::default()
        }
    }

    pub fn bind(&mut self, contract: ContractId) {
        self.contract = Some(contract);
    }

    pub fn unbind(&mut self) {
        self.contract = None;
    }

    /// Make every subsequent call to `function` fail.
    pub fn fail_on(&mut self, function: &str) {
        self.failing.insert(function.to_string());
    }

    pub fn clear_failures(&mut self) {
        self.failing.clear();
    }

    /// All successful invocations, oldest first.
    #[must_use]
    pub fn invocations(&self) -> &[Invocation] {
        &self.invocations
    }

    /// Number of successful invocations of `function`.
    #[must_use]
    pub fn count(&self, function: &str) -> usize {
        self.invocations
            .iter()
            .filter(|inv| inv.function == function)
            .count()
    }
}

impl LedgerService for InMemoryLedger {
    fn storage_contract_id(&self) -> Option<ContractId> {
        self.contract.clone()
    }

    fn invoke(
        &mut self,
        contract: &ContractId,
        function: &str,
        args: &[Vec<u8>],
    ) -> Result<Vec<u8>> {
        if self.contract.as_ref() != Some(contract) {
            return Err(AssetLockError::Ledger {
                function: function.to_string(),
                reason: format!("{contract} is not bound"),
            });
        }
        if self.failing.contains(function) {
            return Err(AssetLockError::Ledger {
                function: function.to_string(),
                reason: "injected failure".into(),
            });
        }
        self.invocations.push(Invocation {
            contract: contract.clone(),
            function: function.to_string(),
            args: args.to_vec(),
        });
        Ok(Vec::new())
    }
}
