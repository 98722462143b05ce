//! QEMU backend.

use std::ffi::OsString;
use std::process::{Child, Command, Stdio};

use camino::Utf8Path;
use tracing::{info, warn};

use super::Hypervisor;
use crate::error::OpsError;

/// Executable probed for on `PATH`.
pub const QEMU_BINARY: &str = "qemu-system-x86_64";

const GUEST_MEMORY: &str = "2G";

pub(super) fn boxed(program: &str) -> Box<dyn Hypervisor> {
    Box::new(Qemu::new(program))
}

/// Runs an image under `qemu-system-x86_64` with user-mode networking.
///
/// The VM is killed on [`Hypervisor::stop`] and when the handle is dropped.
#[derive(Debug)]
pub struct Qemu {
    program: String,
    child: Option<Child>,
}

impl Qemu {
    /// Creates a handle that launches `program`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            child: None,
        }
    }

    /// Returns `true` while a VM started by this handle is running.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.child.is_some()
    }

    /// Command-line arguments booting `image` with `port` forwarded.
    #[must_use]
    pub fn args(image: &Utf8Path, port: u16) -> Vec<OsString> {
        [
            String::from("-drive"),
            format!("file={image},format=raw,if=virtio"),
            String::from("-netdev"),
            format!("user,id=n0,hostfwd=tcp::{port}-:{port}"),
            String::from("-device"),
            String::from("virtio-net,netdev=n0"),
            String::from("-m"),
            String::from(GUEST_MEMORY),
            String::from("-nographic"),
            String::from("-no-reboot"),
        ]
        .into_iter()
        .map(OsString::from)
        .collect()
    }
}

impl Hypervisor for Qemu {
    fn name(&self) -> &str {
        &self.program
    }

    fn start(&mut self, image: &Utf8Path, port: u16) -> Result<(), OpsError> {
        if self.child.is_some() {
            return Err(OpsError::Hypervisor(format!(
                "{} is already running",
                self.program
            )));
        }
        let child = Command::new(&self.program)
            .args(Self::args(image, port))
            .stdin(Stdio::null())
            .spawn()
            .map_err(|err| OpsError::Hypervisor(format!("failed to start {}: {err}", self.program)))?;
        info!(pid = child.id(), %image, port, "started VM");
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        if let Err(err) = child.kill() {
            warn!(pid = child.id(), error = %err, "failed to kill VM");
        }
        if let Err(err) = child.wait() {
            warn!(pid = child.id(), error = %err, "failed to reap VM");
        }
    }
}

impl Drop for Qemu {
    fn drop(&mut self) {
        self.stop();
    }
}
