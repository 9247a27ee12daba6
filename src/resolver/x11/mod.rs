//! X11 platform adapters — selection conversion and atom registry.
//!
//! Both adapters share an `Arc<RustConnection>` created by
//! [`X11Shared::connect`]. Formats are X11 atoms; reading a format is a
//! `ConvertSelection` request answered by the selection owner.

pub mod clipboard;
pub mod registry;

use std::sync::Arc;

use x11rb::connection::Connection;
use x11rb::protocol::xproto::{self, Atom, ConnectionExt as _, Window};
use x11rb::rust_connection::RustConnection;

pub use clipboard::X11ClipboardProvider;
pub use registry::X11FormatRegistry;

use super::ResolverError;

/// Property our window receives converted selections into.
const TRANSFER_PROPERTY: &[u8] = b"SHEETCLIP_TRANSFER";

/// Pre-interned atoms the selection protocol needs.
#[derive(Debug, Clone, Copy)]
pub struct Atoms {
    pub targets: Atom,
    pub incr: Atom,
    pub transfer: Atom,
}

/// Shared X11 connection state.
///
/// Created once via `X11Shared::connect()`, then cloned (via `Arc`)
/// into each adapter.
pub struct X11Shared {
    /// Shared X11 connection.
    pub conn: Arc<RustConnection>,
    /// Invisible window that acts as the requestor for conversions.
    pub window: Window,
    pub atoms: Atoms,
}

impl X11Shared {
    /// Connect to the X11 display, create the requestor window and
    /// intern the protocol atoms.
    pub fn connect() -> Result<Self, ResolverError> {
        let (conn, screen_num) = RustConnection::connect(None)
            .map_err(|e| ResolverError::Clipboard(format!("X11 connect failed: {e}")))?;

        let screen = conn.setup().roots.get(screen_num).ok_or_else(|| {
            ResolverError::Clipboard(format!("X11 screen {screen_num} does not exist"))
        })?;
        let (root, root_visual) = (screen.root, screen.root_visual);

        let window = conn
            .generate_id()
            .map_err(|e| ResolverError::Clipboard(format!("generate_id: {e}")))?;

        let _ = conn.create_window(
            x11rb::COPY_DEPTH_FROM_PARENT,
            window,
            root,
            0,
            0,
            1,
            1,
            0,
            xproto::WindowClass::INPUT_OUTPUT,
            root_visual,
            // PROPERTY_CHANGE drives INCR transfers.
            &xproto::CreateWindowAux::new().event_mask(xproto::EventMask::PROPERTY_CHANGE),
        )
        .map_err(|e| ResolverError::Clipboard(format!("create_window: {e}")))?;

        let atoms = Atoms {
            targets: intern(&conn, b"TARGETS")?,
            incr: intern(&conn, b"INCR")?,
            transfer: intern(&conn, TRANSFER_PROPERTY)?,
        };

        conn.flush()
            .map_err(|e| ResolverError::Clipboard(format!("flush: {e}")))?;

        tracing::debug!(screen = screen_num, window, "connected to X11 display");

        Ok(Self {
            conn: Arc::new(conn),
            window,
            atoms,
        })
    }
}

/// Intern `name`, creating the atom if it does not exist.
fn intern(conn: &RustConnection, name: &[u8]) -> Result<Atom, ResolverError> {
    Ok(conn
        .intern_atom(false, name)
        .map_err(|e| ResolverError::Registry(format!("intern_atom: {e}")))?
        .reply()
        .map_err(|e| ResolverError::Registry(format!("intern_atom reply: {e}")))?
        .atom)
}
