//! Run-time configuration for a VM instance.
//!
//! Grounded on `vm.rs::VmConfig` in the teacher crate: a small, `Copy`-able
//! bag of switches threaded through `VMState` rather than read from globals.

/// Resolves the Open Question in spec §9 about `vmErrorFlag` handling.
///
/// The source leaves `handleVirtualMachineError` defined but unused, which
/// the spec calls out as an ambiguity we must not silently guess at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VmErrorPolicy {
    /// Preserve the source VM's present behavior: a vm-error only causes a
    /// switch to the next strand, the erroring strand is abandoned.
    #[default]
    NextThreadOnly,
    /// Hand the error to `Ctxt::vm_error` and resume the same strand.
    DelegateToCtxt,
}

/// Tunables for a `BytecodeVM`-equivalent run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VmConfig {
    /// When set, the dispatch loop emits a `tracing::trace!` per opcode and
    /// appends human-readable lines to `VMState::debug_info`.
    pub trace: bool,
    /// Resolution of the vm-error Open Question (spec §9).
    pub vm_error_policy: VmErrorPolicy,
    /// Optional fuel limit. Not part of the spec's control-flow contract;
    /// purely a host/test safety net against runaway loops. `None` means
    /// unbounded, matching the spec's documented termination condition
    /// (empty pools with no pending signals).
    pub max_steps: Option<u64>,
}

impl Default for VmConfig {
    fn default() -> Self {
        Self {
            trace: false,
            vm_error_policy: VmErrorPolicy::default(),
            max_steps: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_source_behavior() {
        assert_eq!(VmConfig::default().vm_error_policy, VmErrorPolicy::NextThreadOnly);
    }
}
