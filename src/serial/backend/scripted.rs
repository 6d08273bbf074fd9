//! In-memory backend replaying scripted byte chunks.
//!
//! Exposed unconditionally so integration tests and downstream crates can
//! drive a [`crate::serial::SerialChannel`] without hardware. Each queued
//! chunk models bytes arriving on the line; a read takes from the chunk that
//! has already arrived (the "driver buffer") before the next one is pulled
//! in. Purging drops only the driver buffer.

use std::collections::{HashSet, VecDeque};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Backend, Device};
use crate::serial::translate::{translate_control_error, translate_io_error};
use crate::serial::{LineSettings, Result, SerialConfig};

/// Call counters for one scripted backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScriptStats {
    pub opens: usize,
    pub closes: usize,
    pub applies: usize,
    pub reads: usize,
    pub writes: usize,
    pub purges: usize,
    pub open_handles: usize,
}

#[derive(Default)]
struct ScriptState {
    ports: HashSet<String>,
    incoming: VecDeque<Vec<u8>>,
    driver_buffer: VecDeque<u8>,
    written: Vec<u8>,
    write_limit: Option<usize>,
    open_errors: VecDeque<io::Error>,
    apply_errors: VecDeque<io::Error>,
    read_errors: VecDeque<io::Error>,
    write_errors: VecDeque<io::Error>,
    purge_errors: VecDeque<io::Error>,
    read_requests: Vec<usize>,
    applied: Vec<LineSettings>,
    stats: ScriptStats,
}

#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_port(port_name: &str) -> Self {
        let backend = Self::new();
        backend.add_port(port_name);
        backend
    }

    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn add_port(&self, port_name: &str) {
        self.state().ports.insert(port_name.to_string());
    }

    /// Queue one chunk of line traffic. A read returns at most one chunk.
    pub fn push_incoming(&self, chunk: impl Into<Vec<u8>>) {
        self.state().incoming.push_back(chunk.into());
    }

    /// Cap the number of bytes a single write accepts.
    pub fn limit_writes(&self, limit: Option<usize>) {
        self.state().write_limit = limit;
    }

    pub fn fail_next_open(&self, err: io::Error) {
        self.state().open_errors.push_back(err);
    }

    pub fn fail_next_apply(&self, err: io::Error) {
        self.state().apply_errors.push_back(err);
    }

    pub fn fail_next_read(&self, err: io::Error) {
        self.state().read_errors.push_back(err);
    }

    pub fn fail_next_write(&self, err: io::Error) {
        self.state().write_errors.push_back(err);
    }

    pub fn fail_next_purge(&self, err: io::Error) {
        self.state().purge_errors.push_back(err);
    }

    pub fn written(&self) -> Vec<u8> {
        self.state().written.clone()
    }

    /// Sizes requested by each underlying read, in order.
    pub fn read_requests(&self) -> Vec<usize> {
        self.state().read_requests.clone()
    }

    /// Every configuration pushed to a device, in order.
    pub fn applied(&self) -> Vec<LineSettings> {
        self.state().applied.clone()
    }

    /// Bytes still waiting on the line or in the driver buffer.
    pub fn pending_incoming(&self) -> usize {
        let state = self.state();
        state.driver_buffer.len() + state.incoming.iter().map(Vec::len).sum::<usize>()
    }

    pub fn stats(&self) -> ScriptStats {
        self.state().stats
    }
}

impl Backend for ScriptedBackend {
    fn open(&self, port_name: &str) -> Result<Box<dyn Device>> {
        let mut state = self.state();
        if let Some(err) = state.open_errors.pop_front() {
            return Err(translate_control_error(port_name, err));
        }
        if !state.ports.contains(port_name) {
            return Err(translate_control_error(
                port_name,
                io::Error::new(io::ErrorKind::NotFound, "no such scripted port"),
            ));
        }
        state.stats.opens += 1;
        state.stats.open_handles += 1;
        Ok(Box::new(ScriptedDevice {
            name: port_name.to_string(),
            state: Arc::clone(&self.state),
        }))
    }
}

pub struct ScriptedDevice {
    name: String,
    state: Arc<Mutex<ScriptState>>,
}

impl ScriptedDevice {
    fn state(&self) -> MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Device for ScriptedDevice {
    fn apply(&mut self, config: &SerialConfig) -> Result<()> {
        let mut state = self.state();
        state.stats.applies += 1;
        if let Some(err) = state.apply_errors.pop_front() {
            return Err(translate_control_error(&self.name, err));
        }
        state.applied.push(config.settings());
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        let mut state = self.state();
        state.stats.reads += 1;
        state.read_requests.push(buf.len());
        if let Some(err) = state.read_errors.pop_front() {
            return match translate_io_error(&self.name, err) {
                Some(err) => Err(err),
                None => Ok(0),
            };
        }
        if state.driver_buffer.is_empty() {
            match state.incoming.pop_front() {
                Some(chunk) => state.driver_buffer.extend(chunk),
                None => return Ok(0),
            }
        }
        let n = buf.len().min(state.driver_buffer.len());
        for (dst, src) in buf.iter_mut().zip(state.driver_buffer.drain(..n)) {
            *dst = src;
        }
        Ok(n)
    }

    fn write(&mut self, buf: &[u8]) -> Result<usize> {
        let mut state = self.state();
        state.stats.writes += 1;
        if let Some(err) = state.write_errors.pop_front() {
            return match translate_io_error(&self.name, err) {
                Some(err) => Err(err),
                None => Ok(0),
            };
        }
        let n = state.write_limit.map_or(buf.len(), |limit| limit.min(buf.len()));
        state.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn purge_input(&mut self) -> Result<()> {
        let mut state = self.state();
        state.stats.purges += 1;
        if let Some(err) = state.purge_errors.pop_front() {
            return Err(translate_control_error(&self.name, err));
        }
        state.driver_buffer.clear();
        Ok(())
    }

    fn close(self: Box<Self>) -> Result<()> {
        let mut state = self.state();
        state.stats.closes += 1;
        state.stats.open_handles = state.stats.open_handles.saturating_sub(1);
        Ok(())
    }
}
