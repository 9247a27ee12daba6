//! In-memory clipboard — payloads keyed by format name.
//!
//! Backs `read --input <file>` and the reader tests. Formats are handed
//! out by a private [`LocalFormatRegistry`].

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Mutex;

use super::{ClipboardFormat, ClipboardProvider, FormatRegistry, LocalFormatRegistry, ResolverError};

#[derive(Debug, Default)]
pub struct MemoryClipboard {
    registry: LocalFormatRegistry,
    contents: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clipboard holding a single payload under `format_name`.
    pub fn with_payload(format_name: &str, payload: impl Into<Vec<u8>>) -> Self {
        let clipboard = Self::new();
        clipboard.put(format_name, payload);
        clipboard
    }

    /// Clipboard holding the bytes of `path` under `format_name`.
    ///
    /// The file is taken as-is, terminator included, so a payload saved
    /// with `sheetclip dump > file` reads back identically.
    pub fn from_file(format_name: &str, path: &Path) -> std::io::Result<Self> {
        let payload = std::fs::read(path)?;
        tracing::debug!(
            path = %path.display(),
            bytes = payload.len(),
            "loaded clipboard payload from file"
        );
        Ok(Self::with_payload(format_name, payload))
    }

    /// Store `payload` under `format_name`, replacing any previous content.
    pub fn put(&self, format_name: &str, payload: impl Into<Vec<u8>>) {
        self.contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(format_name.to_string(), payload.into());
    }
}

impl ClipboardProvider for MemoryClipboard {
    fn registry(&self) -> &dyn FormatRegistry {
        &self.registry
    }

    fn read(&self, format: &ClipboardFormat) -> Result<Option<Vec<u8>>, ResolverError> {
        Ok(self
            .contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(format.name())
            .cloned())
    }

    fn formats(&self) -> Result<Vec<String>, ResolverError> {
        Ok(self
            .contents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::format::XML_SPREADSHEET;

    #[test]
    fn read_missing_format_is_none() {
        let clipboard = MemoryClipboard::with_payload("UTF8_STRING", b"hello".to_vec());
        let format = clipboard.registry().resolve(XML_SPREADSHEET).unwrap();
        assert_eq!(clipboard.read(&format).unwrap(), None);
    }

    #[test]
    fn read_present_format() {
        let clipboard = MemoryClipboard::with_payload(XML_SPREADSHEET, b"<a/>\0".to_vec());
        let format = clipboard.registry().resolve(XML_SPREADSHEET).unwrap();
        assert_eq!(clipboard.read(&format).unwrap(), Some(b"<a/>\0".to_vec()));
    }

    #[test]
    fn empty_payload_is_present() {
        let clipboard = MemoryClipboard::with_payload(XML_SPREADSHEET, Vec::new());
        let format = clipboard.registry().resolve(XML_SPREADSHEET).unwrap();
        assert_eq!(clipboard.read(&format).unwrap(), Some(Vec::new()));
    }

    #[test]
    fn formats_lists_sorted_names() {
        let clipboard = MemoryClipboard::new();
        clipboard.put(XML_SPREADSHEET, b"x".to_vec());
        clipboard.put("HTML Format", b"y".to_vec());
        assert_eq!(
            clipboard.formats().unwrap(),
            vec!["HTML Format".to_string(), XML_SPREADSHEET.to_string()]
        );
    }

    #[test]
    fn from_file_keeps_terminator() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.xml");
        std::fs::write(&path, b"<a/>\0").unwrap();

        let clipboard = MemoryClipboard::from_file(XML_SPREADSHEET, &path).unwrap();
        let format = clipboard.registry().resolve(XML_SPREADSHEET).unwrap();
        assert_eq!(clipboard.read(&format).unwrap(), Some(b"<a/>\0".to_vec()));
    }

    #[test]
    fn from_file_missing_path() {
        let err = MemoryClipboard::from_file(XML_SPREADSHEET, Path::new("/nonexistent/payload"))
            .unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
