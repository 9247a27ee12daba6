//! Spreadsheet clipboard reader — fetch, strip the terminator, parse.
//!
//! Spreadsheet applications put their "XML Spreadsheet" payload on the
//! clipboard followed by a single NUL byte. The NUL makes XML parsers
//! fail, so exactly one trailing byte is dropped before parsing. No
//! specification of the format has been found: the terminator is a
//! heuristic and a payload without it loses its last real byte.
//!
//! Every failure ends at the reader boundary as a [`ReadOutcome`]
//! variant. Nothing here panics or propagates.

use std::sync::OnceLock;

use crate::resolver::{ClipboardFormat, ClipboardProvider, FormatRegistry, ResolverError};
use crate::xml::{self, Document, ParseFailure};

/// A clipboard payload with its trailing terminator byte removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SanitizedPayload {
    bytes: Vec<u8>,
    removed: Option<u8>,
}

impl SanitizedPayload {
    /// Bytes handed to the XML parser.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The byte that was dropped, `None` if the raw payload was empty.
    pub fn removed(&self) -> Option<u8> {
        self.removed
    }

    /// Whether the dropped byte was the expected NUL terminator.
    pub fn terminator_was_nul(&self) -> bool {
        self.removed == Some(0)
    }
}

/// Drop the final byte of `raw`, whatever it is.
///
/// An empty payload stays empty.
pub fn strip_terminator(mut raw: Vec<u8>) -> SanitizedPayload {
    let removed = raw.pop();
    SanitizedPayload {
        bytes: raw,
        removed,
    }
}

/// Result of one clipboard read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// The clipboard holds nothing under the format.
    Absent,
    /// Content was present and parsed as XML.
    Parsed {
        document: Document,
        payload: SanitizedPayload,
    },
    /// Content was present but did not parse.
    ParseFailed {
        reason: ParseFailure,
        payload: SanitizedPayload,
    },
    /// The clipboard could not be queried at all.
    Unavailable(ResolverError),
}

/// Reads one named format from a clipboard provider.
///
/// The format handle is resolved on first use and reused afterwards.
pub struct SpreadsheetReader {
    clipboard: Box<dyn ClipboardProvider>,
    format_name: String,
    format: OnceLock<ClipboardFormat>,
}

impl SpreadsheetReader {
    pub fn new(clipboard: Box<dyn ClipboardProvider>, format_name: impl Into<String>) -> Self {
        Self {
            clipboard,
            format_name: format_name.into(),
            format: OnceLock::new(),
        }
    }

    pub fn format_name(&self) -> &str {
        &self.format_name
    }

    /// Handle for the configured format, looked up or registered once.
    pub fn format(&self) -> Result<&ClipboardFormat, ResolverError> {
        if let Some(format) = self.format.get() {
            return Ok(format);
        }
        // Registries are idempotent, so a racing initializer resolves the
        // same handle and either value may win.
        let resolved = self.clipboard.registry().resolve(&self.format_name)?;
        tracing::debug!(
            format = resolved.name(),
            id = resolved.id(),
            "resolved clipboard format"
        );
        Ok(self.format.get_or_init(|| resolved))
    }

    /// Read, sanitize and parse the clipboard content.
    pub fn read(&self) -> ReadOutcome {
        match self.read_raw() {
            Ok(raw) => Self::interpret(raw),
            Err(e) => {
                tracing::warn!(format = %self.format_name, error = %e, "clipboard unavailable");
                ReadOutcome::Unavailable(e)
            }
        }
    }

    /// The payload exactly as the clipboard returned it.
    pub fn read_raw(&self) -> Result<Option<Vec<u8>>, ResolverError> {
        let format = self.format()?;
        self.clipboard.read(format)
    }

    /// Names of all formats the clipboard currently offers.
    pub fn formats(&self) -> Result<Vec<String>, ResolverError> {
        self.clipboard.formats()
    }

    /// Turn a raw payload into an outcome.
    pub fn interpret(raw: Option<Vec<u8>>) -> ReadOutcome {
        let Some(raw) = raw else {
            tracing::debug!("format not present on the clipboard");
            return ReadOutcome::Absent;
        };

        let payload = strip_terminator(raw);
        if !payload.terminator_was_nul() {
            tracing::warn!(
                removed = ?payload.removed(),
                "payload did not end in a NUL terminator; its last byte was dropped anyway"
            );
        }

        match xml::parse(payload.bytes()) {
            Ok(document) => {
                tracing::debug!(
                    bytes = payload.bytes().len(),
                    root = document.root().name(),
                    "parsed clipboard XML"
                );
                ReadOutcome::Parsed { document, payload }
            }
            Err(reason) => {
                tracing::warn!(error = %reason, bytes = payload.bytes().len(), "clipboard XML did not parse");
                ReadOutcome::ParseFailed { reason, payload }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::resolver::format::XML_SPREADSHEET;
    use crate::resolver::{LocalFormatRegistry, MemoryClipboard};

    fn reader_with(payload: &[u8]) -> SpreadsheetReader {
        SpreadsheetReader::new(
            Box::new(MemoryClipboard::with_payload(XML_SPREADSHEET, payload.to_vec())),
            XML_SPREADSHEET,
        )
    }

    /// Provider whose registry counts registrations.
    struct Counting {
        registry: CountingRegistry,
        payload: Option<Vec<u8>>,
    }

    struct CountingRegistry {
        inner: LocalFormatRegistry,
        registrations: Arc<AtomicUsize>,
    }

    impl FormatRegistry for CountingRegistry {
        fn lookup(&self, name: &str) -> Result<Option<ClipboardFormat>, ResolverError> {
            self.inner.lookup(name)
        }

        fn register(&self, name: &str) -> Result<ClipboardFormat, ResolverError> {
            self.registrations.fetch_add(1, Ordering::SeqCst);
            self.inner.register(name)
        }
    }

    impl ClipboardProvider for Counting {
        fn registry(&self) -> &dyn FormatRegistry {
            &self.registry
        }

        fn read(&self, _format: &ClipboardFormat) -> Result<Option<Vec<u8>>, ResolverError> {
            Ok(self.payload.clone())
        }

        fn formats(&self) -> Result<Vec<String>, ResolverError> {
            Ok(Vec::new())
        }
    }

    /// Provider whose transport always fails.
    struct Broken;

    impl ClipboardProvider for Broken {
        fn registry(&self) -> &dyn FormatRegistry {
            LocalFormatRegistry::global()
        }

        fn read(&self, _format: &ClipboardFormat) -> Result<Option<Vec<u8>>, ResolverError> {
            Err(ResolverError::Clipboard("display went away".into()))
        }

        fn formats(&self) -> Result<Vec<String>, ResolverError> {
            Err(ResolverError::Clipboard("display went away".into()))
        }
    }

    // -- strip_terminator --

    #[test]
    fn strip_drops_exactly_last_byte() {
        let payload = strip_terminator(b"<a/>\0".to_vec());
        assert_eq!(payload.bytes(), b"<a/>");
        assert_eq!(payload.removed(), Some(0));
        assert!(payload.terminator_was_nul());
    }

    #[test]
    fn strip_drops_last_byte_of_every_length() {
        for len in 1..16usize {
            let raw: Vec<u8> = (0..len as u8).map(|b| b + 1).collect();
            let payload = strip_terminator(raw.clone());
            assert_eq!(payload.bytes(), &raw[..len - 1]);
            assert_eq!(payload.removed(), raw.last().copied());
        }
    }

    #[test]
    fn strip_empty_does_not_panic() {
        let payload = strip_terminator(Vec::new());
        assert!(payload.bytes().is_empty());
        assert_eq!(payload.removed(), None);
        assert!(!payload.terminator_was_nul());
    }

    // -- read --

    #[test]
    fn absent_format() {
        let reader = SpreadsheetReader::new(
            Box::new(MemoryClipboard::with_payload("UTF8_STRING", b"A\tB".to_vec())),
            XML_SPREADSHEET,
        );
        assert!(matches!(reader.read(), ReadOutcome::Absent));
    }

    #[test]
    fn round_trip_document() {
        let outcome = reader_with(b"<a><b>1</b></a>\0").read();
        let ReadOutcome::Parsed { document, payload } = outcome else {
            panic!("expected Parsed, got {outcome:?}");
        };

        assert_eq!(payload.bytes(), b"<a><b>1</b></a>");
        let root = document.root();
        assert_eq!(root.name(), "a");
        let children: Vec<_> = root.elements().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].name(), "b");
        assert_eq!(children[0].text(), "1");
    }

    #[test]
    fn malformed_document() {
        let outcome = reader_with(b"<a><b>1</b>\0").read();
        let ReadOutcome::ParseFailed { reason, payload } = outcome else {
            panic!("expected ParseFailed, got {outcome:?}");
        };
        assert!(matches!(reason, ParseFailure::Malformed(_)));
        assert!(payload.terminator_was_nul());
    }

    #[test]
    fn missing_terminator_loses_last_character() {
        let outcome = reader_with(b"<a/>").read();
        let ReadOutcome::ParseFailed { reason, payload } = outcome else {
            panic!("expected ParseFailed, got {outcome:?}");
        };

        assert_eq!(payload.bytes(), b"<a/");
        assert_eq!(payload.removed(), Some(b'>'));
        assert!(!payload.terminator_was_nul());
        assert!(matches!(reason, ParseFailure::Malformed(_)));
    }

    #[test]
    fn empty_payload_fails_to_parse() {
        let outcome = reader_with(b"").read();
        assert!(matches!(
            outcome,
            ReadOutcome::ParseFailed {
                reason: ParseFailure::Empty,
                ..
            }
        ));
    }

    #[test]
    fn terminator_only_payload_fails_to_parse() {
        let outcome = reader_with(b"\0").read();
        let ReadOutcome::ParseFailed { reason, payload } = outcome else {
            panic!("expected ParseFailed, got {outcome:?}");
        };
        assert_eq!(reason, ParseFailure::Empty);
        assert!(payload.terminator_was_nul());
    }

    #[test]
    fn transport_error_is_unavailable() {
        let reader = SpreadsheetReader::new(Box::new(Broken), XML_SPREADSHEET);
        assert!(matches!(
            reader.read(),
            ReadOutcome::Unavailable(ResolverError::Clipboard(_))
        ));
    }

    #[test]
    fn format_resolved_once_across_reads() {
        let registrations = Arc::new(AtomicUsize::new(0));
        let provider = Counting {
            registry: CountingRegistry {
                inner: LocalFormatRegistry::new(),
                registrations: Arc::clone(&registrations),
            },
            payload: Some(b"<a/>\0".to_vec()),
        };
        let reader = SpreadsheetReader::new(Box::new(provider), XML_SPREADSHEET);

        let first = reader.format().unwrap().clone();
        assert!(matches!(reader.read(), ReadOutcome::Parsed { .. }));
        assert!(matches!(reader.read(), ReadOutcome::Parsed { .. }));
        assert_eq!(reader.format().unwrap(), &first);
        assert_eq!(registrations.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn absent_raw_is_none() {
        let provider = Counting {
            registry: CountingRegistry {
                inner: LocalFormatRegistry::new(),
                registrations: Arc::new(AtomicUsize::new(0)),
            },
            payload: None,
        };
        let reader = SpreadsheetReader::new(Box::new(provider), XML_SPREADSHEET);
        assert!(matches!(reader.read(), ReadOutcome::Absent));
        assert_eq!(reader.read_raw().unwrap(), None);
    }

    #[test]
    fn read_raw_keeps_terminator() {
        let reader = reader_with(b"<a/>\0");
        assert_eq!(reader.read_raw().unwrap(), Some(b"<a/>\0".to_vec()));
    }

    #[test]
    fn interpret_none_is_absent() {
        assert!(matches!(SpreadsheetReader::interpret(None), ReadOutcome::Absent));
    }
}
