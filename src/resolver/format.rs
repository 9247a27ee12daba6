//! Clipboard format handles and the registries that hand them out.
//!
//! A format is only a name both sides agree on. Registries turn the name
//! into a handle the clipboard backend understands, creating it on first
//! use, and never hand out two different handles for the same name.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use super::ResolverError;

/// Format name a spreadsheet application uses for copied tables.
pub const XML_SPREADSHEET: &str = "XML Spreadsheet";

/// Handle for a named clipboard format.
///
/// `id` is backend-specific (an X11 atom, or a local counter value).
/// Handles from the same registry compare equal iff they name the same
/// format.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClipboardFormat {
    name: String,
    id: u32,
}

impl ClipboardFormat {
    pub fn new(name: impl Into<String>, id: u32) -> Self {
        Self {
            name: name.into(),
            id,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Lookup-or-create table of clipboard formats.
pub trait FormatRegistry: Send + Sync {
    /// Return the handle for `name` if it is already registered.
    fn lookup(&self, name: &str) -> Result<Option<ClipboardFormat>, ResolverError>;

    /// Register `name`, returning the existing handle if there is one.
    fn register(&self, name: &str) -> Result<ClipboardFormat, ResolverError>;

    /// Look `name` up, registering it when nobody has yet.
    fn resolve(&self, name: &str) -> Result<ClipboardFormat, ResolverError> {
        if let Some(format) = self.lookup(name)? {
            return Ok(format);
        }
        tracing::debug!(format = name, "format not registered yet, creating it");
        self.register(name)
    }
}

/// In-process format registry.
///
/// Ids are allocated from 1 upward in registration order. Used by the
/// backends that address formats by name (`xclip`, the in-memory
/// clipboard), where the id only has to be stable within the process.
#[derive(Debug, Default)]
pub struct LocalFormatRegistry {
    formats: Mutex<HashMap<String, u32>>,
}

impl LocalFormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry, created on first access.
    pub fn global() -> &'static LocalFormatRegistry {
        static GLOBAL: OnceLock<LocalFormatRegistry> = OnceLock::new();
        GLOBAL.get_or_init(LocalFormatRegistry::new)
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, u32>> {
        // A panic while holding the lock cannot leave the map half-updated.
        self.formats.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl FormatRegistry for LocalFormatRegistry {
    fn lookup(&self, name: &str) -> Result<Option<ClipboardFormat>, ResolverError> {
        Ok(self
            .table()
            .get(name)
            .map(|&id| ClipboardFormat::new(name, id)))
    }

    fn register(&self, name: &str) -> Result<ClipboardFormat, ResolverError> {
        let mut table = self.table();
        let next = table.len() as u32 + 1;
        let id = *table.entry(name.to_string()).or_insert(next);
        Ok(ClipboardFormat::new(name, id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_unknown_is_none() {
        let registry = LocalFormatRegistry::new();
        assert_eq!(registry.lookup(XML_SPREADSHEET).unwrap(), None);
    }

    #[test]
    fn resolve_creates_then_finds() {
        let registry = LocalFormatRegistry::new();
        let created = registry.resolve(XML_SPREADSHEET).unwrap();
        let found = registry.lookup(XML_SPREADSHEET).unwrap();
        assert_eq!(found, Some(created));
    }

    #[test]
    fn resolve_twice_yields_equal_handles() {
        let registry = LocalFormatRegistry::new();
        let a = registry.resolve(XML_SPREADSHEET).unwrap();
        let b = registry.resolve(XML_SPREADSHEET).unwrap();
        assert_eq!(a, b);
        assert_eq!(registry.table().len(), 1);
    }

    #[test]
    fn register_existing_keeps_id() {
        let registry = LocalFormatRegistry::new();
        let first = registry.register("HTML Format").unwrap();
        let again = registry.register("HTML Format").unwrap();
        assert_eq!(first.id(), again.id());
    }

    #[test]
    fn distinct_names_get_distinct_ids() {
        let registry = LocalFormatRegistry::new();
        let a = registry.resolve("HTML Format").unwrap();
        let b = registry.resolve(XML_SPREADSHEET).unwrap();
        assert_ne!(a.id(), b.id());
        assert_eq!(b.name(), XML_SPREADSHEET);
    }

    #[test]
    fn concurrent_resolve_registers_once() {
        let registry = std::sync::Arc::new(LocalFormatRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = std::sync::Arc::clone(&registry);
                std::thread::spawn(move || registry.resolve(XML_SPREADSHEET).unwrap())
            })
            .collect();

        let formats: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(formats.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(registry.table().len(), 1);
    }

    #[test]
    fn global_is_shared() {
        let a = LocalFormatRegistry::global().resolve("sheetclip-test-global").unwrap();
        let b = LocalFormatRegistry::global().resolve("sheetclip-test-global").unwrap();
        assert_eq!(a, b);
        assert!(std::ptr::eq(
            LocalFormatRegistry::global(),
            LocalFormatRegistry::global()
        ));
    }
}
