//! ClipboardProvider trait — read-only system clipboard access by format.

use super::{ClipboardFormat, FormatRegistry, ResolverError};

/// Reads typed content from the system clipboard.
///
/// `Send + Sync` is required because `watch` moves the provider into a
/// blocking task on every tick.
pub trait ClipboardProvider: Send + Sync {
    /// Registry that hands out the format handles this provider accepts.
    fn registry(&self) -> &dyn FormatRegistry;

    /// Read the clipboard content stored under `format`.
    ///
    /// `Ok(None)` means the clipboard holds nothing under that format.
    /// It is never reported as an empty vector.
    fn read(&self, format: &ClipboardFormat) -> Result<Option<Vec<u8>>, ResolverError>;

    /// Names of the formats the current clipboard owner offers.
    fn formats(&self) -> Result<Vec<String>, ResolverError>;
}
