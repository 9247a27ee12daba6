//! Resolver abstraction — pluggable clipboard adapters.
//!
//! Everything platform-specific (format registration, selection
//! conversion, spawning `xclip`) lives behind two traits. The reader only
//! ever talks to a [`ClipboardProvider`] and the [`FormatRegistry`] it
//! exposes.

pub mod clipboard;
pub mod format;
pub mod memory;
pub mod x11;
pub mod xclip;

use std::time::Duration;

pub use clipboard::ClipboardProvider;
pub use format::{ClipboardFormat, FormatRegistry, LocalFormatRegistry};
pub use memory::MemoryClipboard;
pub use x11::X11ClipboardProvider;
pub use xclip::XclipClipboardProvider;

/// Errors returned by resolver adapters.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    /// Format lookup or registration failed (e.g. `InternAtom` request
    /// lost with the display connection).
    #[error("registry: {0}")]
    Registry(String),

    /// Clipboard transport failed (e.g. xclip not found, X11 connection
    /// error, unexpected reply type).
    #[error("clipboard: {0}")]
    Clipboard(String),

    /// The selection owner did not answer within the configured timeout.
    #[error("timed out after {0:?} waiting for the selection owner")]
    Timeout(Duration),
}

/// Which X selection to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Selection {
    #[default]
    Clipboard,
    Primary,
}

impl Selection {
    /// Name used by both the X11 atom table and `xclip -selection`.
    pub fn x11_name(self) -> &'static str {
        match self {
            Selection::Clipboard => "CLIPBOARD",
            Selection::Primary => "PRIMARY",
        }
    }
}

/// Clipboard backend chosen on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Backend {
    /// Talk to the X server directly.
    #[default]
    X11,
    /// Shell out to `xclip`.
    Xclip,
}

/// Open the clipboard provider for `backend`.
pub fn connect(
    backend: Backend,
    selection: Selection,
    timeout: Duration,
) -> Result<Box<dyn ClipboardProvider>, ResolverError> {
    let provider: Box<dyn ClipboardProvider> = match backend {
        Backend::X11 => Box::new(X11ClipboardProvider::connect(selection, timeout)?),
        Backend::Xclip => Box::new(XclipClipboardProvider::new(selection)),
    };
    tracing::debug!(?backend, ?selection, "clipboard provider ready");
    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_names() {
        assert_eq!(Selection::Clipboard.x11_name(), "CLIPBOARD");
        assert_eq!(Selection::Primary.x11_name(), "PRIMARY");
    }

    #[test]
    fn timeout_error_mentions_duration() {
        let err = ResolverError::Timeout(Duration::from_millis(1500));
        assert!(err.to_string().contains("1.5s"));
    }
}
