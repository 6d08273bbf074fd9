//! Device backends.
//!
//! A [`Backend`] acquires handles; a [`Device`] is one open handle. The native
//! backend is chosen at build time through `serialport` (TTY on unix, COM on
//! Windows). [`ScriptedBackend`] replays byte chunks from memory for tests.

mod native;
mod scripted;

pub use native::{discover_ports, NativeBackend, NativeDevice};
pub use scripted::{ScriptStats, ScriptedBackend, ScriptedDevice};

use super::{Result, SerialConfig};

pub trait Backend {
    /// Acquire an exclusive read+write handle for `port_name`. The handle is
    /// not configured yet; the channel applies the config right after.
    fn open(&self, port_name: &str) -> Result<Box<dyn Device>>;
}

/// One open device handle. Errors are already translated; end-of-data is
/// reported as `Ok(0)` from [`Device::read`].
pub trait Device: Send {
    /// Push line discipline, timeouts and buffer hints to the device.
    fn apply(&mut self, config: &SerialConfig) -> Result<()>;

    /// Single underlying read into `buf`. Never transfers more than
    /// `buf.len()` bytes.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize>;

    /// Single underlying write; returns the number of bytes accepted.
    fn write(&mut self, buf: &[u8]) -> Result<usize>;

    /// Discard received but unread input.
    fn purge_input(&mut self) -> Result<()>;

    fn close(self: Box<Self>) -> Result<()>;
}
