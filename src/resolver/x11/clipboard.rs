//! X11 clipboard provider — `ConvertSelection` against the selection owner.
//!
//! The owner answers with a `SelectionNotify`; the data lands in a
//! property on our window. Large payloads arrive through the INCR
//! protocol as a series of `PropertyNotify` chunks ending in an empty one.
//!
//! Events are awaited by polling the connection fd in short slices until
//! the configured deadline passes.

use std::os::fd::{AsRawFd, BorrowedFd};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use x11rb::connection::Connection;
use x11rb::protocol::Event;
use x11rb::protocol::xproto::{self, Atom, AtomEnum, ConnectionExt as _, Window};
use x11rb::rust_connection::RustConnection;

use super::{Atoms, X11FormatRegistry, X11Shared};
use crate::resolver::{ClipboardFormat, ClipboardProvider, FormatRegistry, ResolverError, Selection};

/// Upper bound on a single poll wait, so the deadline is rechecked.
const POLL_SLICE_MS: u16 = 100;

/// X11 implementation of `ClipboardProvider`.
pub struct X11ClipboardProvider {
    conn: Arc<RustConnection>,
    window: Window,
    atoms: Atoms,
    selection: Atom,
    timeout: Duration,
    registry: X11FormatRegistry,
    /// Conversions share one transfer property, so they run one at a time.
    transfer: Mutex<()>,
}

/// Progress of a single conversion.
enum Transfer {
    /// Waiting for the owner's `SelectionNotify`.
    Requested,
    /// INCR in progress; chunks appended so far.
    Incremental(Vec<u8>),
}

impl X11ClipboardProvider {
    /// Connect to the display and prepare to read `selection`.
    pub fn connect(selection: Selection, timeout: Duration) -> Result<Self, ResolverError> {
        let shared = X11Shared::connect()?;
        let registry = X11FormatRegistry::new(Arc::clone(&shared.conn));
        let selection = registry.register(selection.x11_name())?.id();

        Ok(Self {
            conn: shared.conn,
            window: shared.window,
            atoms: shared.atoms,
            selection,
            timeout,
            registry,
            transfer: Mutex::new(()),
        })
    }

    /// Convert the selection to `target` and collect the result.
    ///
    /// `Ok(None)` when the owner refuses the conversion (property `NONE`)
    /// or nobody owns the selection.
    fn convert(&self, target: Atom) -> Result<Option<Vec<u8>>, ResolverError> {
        let _guard = self.transfer.lock().unwrap_or_else(|e| e.into_inner());

        self.conn
            .convert_selection(
                self.window,
                self.selection,
                target,
                self.atoms.transfer,
                x11rb::CURRENT_TIME,
            )
            .map_err(|e| ResolverError::Clipboard(format!("convert_selection: {e}")))?;
        self.flush()?;

        let deadline = Instant::now() + self.timeout;
        let mut state = Transfer::Requested;

        loop {
            // Replies fetched meanwhile may have queued events; drain first.
            while let Some(event) = self
                .conn
                .poll_for_event()
                .map_err(|e| ResolverError::Clipboard(format!("X11 connection error: {e}")))?
            {
                if let Some(done) = self.handle_event(event, target, &mut state)? {
                    return Ok(done);
                }
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ResolverError::Timeout(self.timeout));
            }
            self.wait_readable(remaining)?;
        }
    }

    /// Advance the transfer with one event.
    ///
    /// Returns `Some(result)` once the conversion is finished.
    fn handle_event(
        &self,
        event: Event,
        target: Atom,
        state: &mut Transfer,
    ) -> Result<Option<Option<Vec<u8>>>, ResolverError> {
        match event {
            Event::SelectionNotify(notify) if matches!(state, Transfer::Requested) => {
                if !answers_request(&notify, self.window, self.selection, target) {
                    return Ok(None);
                }
                if notify.property == u32::from(AtomEnum::NONE) {
                    tracing::debug!(target, "selection owner refused conversion");
                    return Ok(Some(None));
                }

                let reply = self.take_property()?;
                if reply.type_ == self.atoms.incr {
                    // Deleting the property tells the owner to start sending chunks.
                    tracing::debug!(target, "INCR transfer started");
                    *state = Transfer::Incremental(Vec::new());
                    return Ok(None);
                }
                if reply.type_ != target {
                    tracing::debug!(target, type_ = reply.type_, "owner replied with another type");
                }
                Ok(Some(Some(reply.value)))
            }
            Event::PropertyNotify(notify) => {
                let Transfer::Incremental(buf) = state else {
                    return Ok(None);
                };
                if notify.window != self.window
                    || notify.atom != self.atoms.transfer
                    || notify.state != xproto::Property::NEW_VALUE
                {
                    return Ok(None);
                }

                let reply = self.take_property()?;
                if reply.value.is_empty() {
                    tracing::debug!(target, bytes = buf.len(), "INCR transfer complete");
                    return Ok(Some(Some(std::mem::take(buf))));
                }
                buf.extend_from_slice(&reply.value);
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    /// Read and delete the transfer property in one request.
    fn take_property(&self) -> Result<xproto::GetPropertyReply, ResolverError> {
        let reply = self
            .conn
            .get_property(
                true,
                self.window,
                self.atoms.transfer,
                AtomEnum::ANY,
                0,
                u32::MAX,
            )
            .map_err(|e| ResolverError::Clipboard(format!("get_property: {e}")))?
            .reply()
            .map_err(|e| ResolverError::Clipboard(format!("get_property reply: {e}")))?;
        self.flush()?;
        Ok(reply)
    }

    fn flush(&self) -> Result<(), ResolverError> {
        self.conn
            .flush()
            .map_err(|e| ResolverError::Clipboard(format!("flush: {e}")))
    }

    /// Block until the connection fd is readable or `remaining` elapses.
    fn wait_readable(&self, remaining: Duration) -> Result<(), ResolverError> {
        let raw_fd = self.conn.stream().as_raw_fd();
        // SAFETY: raw_fd is the X11 connection fd, valid while conn is alive.
        let borrowed = unsafe { BorrowedFd::borrow_raw(raw_fd) };
        let mut fds = [PollFd::new(borrowed, PollFlags::POLLIN)];

        let slice = remaining.as_millis().min(u128::from(POLL_SLICE_MS)) as u16;
        match poll(&mut fds, PollTimeout::from(slice.max(1))) {
            Ok(_) | Err(nix::Error::EINTR) => Ok(()),
            Err(e) => Err(ResolverError::Clipboard(format!("poll error on X11 fd: {e}"))),
        }
    }
}

impl ClipboardProvider for X11ClipboardProvider {
    fn registry(&self) -> &dyn FormatRegistry {
        &self.registry
    }

    fn read(&self, format: &ClipboardFormat) -> Result<Option<Vec<u8>>, ResolverError> {
        let payload = self.convert(format.id())?;
        tracing::debug!(
            format = format.name(),
            atom = format.id(),
            bytes = payload.as_ref().map(Vec::len),
            "X11 selection read"
        );
        Ok(payload)
    }

    fn formats(&self) -> Result<Vec<String>, ResolverError> {
        let Some(raw) = self.convert(self.atoms.targets)? else {
            return Ok(Vec::new());
        };

        let mut names = Vec::new();
        for atom in decode_atoms(&raw) {
            names.push(self.registry.atom_name(atom)?);
        }
        Ok(names)
    }
}

/// Split a format-32 `ATOM` property value into atoms.
fn decode_atoms(raw: &[u8]) -> Vec<Atom> {
    raw.chunks_exact(4)
        .map(|c| u32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
        .filter(|&atom| atom != x11rb::NONE)
        .collect()
}

/// Whether `notify` answers our conversion of `selection` to `target`.
///
/// A late answer to an earlier, timed-out conversion does not.
fn answers_request(
    notify: &xproto::SelectionNotifyEvent,
    window: Window,
    selection: Atom,
    target: Atom,
) -> bool {
    notify.requestor == window && notify.selection == selection && notify.target == target
}
