//! Local hypervisor discovery.
//!
//! Backends are tried in registry order and the first whose executable
//! resolves on `PATH` wins. Finding none is not fatal: callers report
//! [`OpsError::NoHypervisor`] and carry on.

mod qemu;

use camino::Utf8Path;
use tracing::debug;

use crate::error::OpsError;

pub use qemu::{QEMU_BINARY, Qemu};

/// A local virtual machine monitor able to boot a raw image.
pub trait Hypervisor: Send {
    /// Executable this backend drives.
    fn name(&self) -> &str;

    /// Boots `image`, forwarding host `port` to the guest.
    ///
    /// # Errors
    ///
    /// Returns [`OpsError::Hypervisor`] when the VM cannot be started or is
    /// already running.
    fn start(&mut self, image: &Utf8Path, port: u16) -> Result<(), OpsError>;

    /// Stops the VM. Does nothing when no VM is running.
    fn stop(&mut self);
}

type Constructor = fn(&str) -> Box<dyn Hypervisor>;

/// Known backends in preference order.
const REGISTRY: [(&str, Constructor); 1] = [(QEMU_BINARY, qemu::boxed)];

/// Returns the first registered hypervisor whose executable is installed.
#[must_use]
pub fn select_hypervisor() -> Option<Box<dyn Hypervisor>> {
    select_hypervisor_with(|program| which::which(program).is_ok())
}

/// Like [`select_hypervisor`], deciding availability with `lookup`.
#[must_use]
pub fn select_hypervisor_with(lookup: impl Fn(&str) -> bool) -> Option<Box<dyn Hypervisor>> {
    REGISTRY
        .iter()
        .find(|(program, _)| lookup(program))
        .map(|(program, construct)| {
            debug!(hypervisor = program, "selected hypervisor");
            construct(program)
        })
}

/// Selects a hypervisor or reports that none is installed.
///
/// # Errors
///
/// Returns [`OpsError::NoHypervisor`] when no registered executable is found.
pub fn require_hypervisor(
    lookup: impl Fn(&str) -> bool,
) -> Result<Box<dyn Hypervisor>, OpsError> {
    select_hypervisor_with(lookup).ok_or(OpsError::NoHypervisor)
}
