//! X11 format registry — clipboard formats are atoms.
//!
//! `InternAtom` with `only_if_exists` is the lookup, without it the
//! registration. The server already deduplicates by name; the local cache
//! saves the round trip on repeat reads.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use x11rb::NONE;
use x11rb::protocol::xproto::{Atom, ConnectionExt as _};
use x11rb::rust_connection::RustConnection;

use crate::resolver::{ClipboardFormat, FormatRegistry, ResolverError};

pub struct X11FormatRegistry {
    conn: Arc<RustConnection>,
    cache: Mutex<HashMap<String, Atom>>,
}

impl X11FormatRegistry {
    pub fn new(conn: Arc<RustConnection>) -> Self {
        Self {
            conn,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cached(&self, name: &str) -> Option<Atom> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(name)
            .copied()
    }

    fn remember(&self, name: &str, atom: Atom) {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string(), atom);
    }

    fn intern(&self, name: &str, only_if_exists: bool) -> Result<Atom, ResolverError> {
        Ok(self
            .conn
            .intern_atom(only_if_exists, name.as_bytes())
            .map_err(|e| ResolverError::Registry(format!("intern_atom {name:?}: {e}")))?
            .reply()
            .map_err(|e| ResolverError::Registry(format!("intern_atom reply: {e}")))?
            .atom)
    }

    /// Reverse lookup, used to name the owner's TARGETS.
    pub fn atom_name(&self, atom: Atom) -> Result<String, ResolverError> {
        let reply = self
            .conn
            .get_atom_name(atom)
            .map_err(|e| ResolverError::Registry(format!("get_atom_name {atom}: {e}")))?
            .reply()
            .map_err(|e| ResolverError::Registry(format!("get_atom_name reply: {e}")))?;
        Ok(String::from_utf8_lossy(&reply.name).into_owned())
    }
}

impl FormatRegistry for X11FormatRegistry {
    fn lookup(&self, name: &str) -> Result<Option<ClipboardFormat>, ResolverError> {
        if let Some(atom) = self.cached(name) {
            return Ok(Some(ClipboardFormat::new(name, atom)));
        }

        let atom = self.intern(name, true)?;
        if atom == NONE {
            return Ok(None);
        }

        self.remember(name, atom);
        Ok(Some(ClipboardFormat::new(name, atom)))
    }

    fn register(&self, name: &str) -> Result<ClipboardFormat, ResolverError> {
        if let Some(atom) = self.cached(name) {
            return Ok(ClipboardFormat::new(name, atom));
        }

        let atom = self.intern(name, false)?;
        tracing::debug!(format = name, atom, "registered X11 format atom");
        self.remember(name, atom);
        Ok(ClipboardFormat::new(name, atom))
    }
}
