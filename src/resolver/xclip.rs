//! xclip clipboard provider — read typed selections via `xclip -t`.
//!
//! Fallback for hosts where talking to the X server directly is not an
//! option. `xclip` addresses targets by name, so format handles come
//! from the process-wide [`LocalFormatRegistry`].

use std::process::{Command, Output, Stdio};

use super::{
    ClipboardFormat, ClipboardProvider, FormatRegistry, LocalFormatRegistry, ResolverError,
    Selection,
};

/// Target name xclip uses to list the owner's formats.
const TARGETS: &str = "TARGETS";

/// X11 implementation of `ClipboardProvider` via `xclip`.
pub struct XclipClipboardProvider {
    selection: Selection,
}

impl XclipClipboardProvider {
    pub fn new(selection: Selection) -> Self {
        Self { selection }
    }

    /// Arguments for reading `target` out of the configured selection.
    fn read_args(&self, target: &str) -> Vec<String> {
        vec![
            "-selection".into(),
            self.selection.x11_name().to_ascii_lowercase(),
            "-t".into(),
            target.into(),
            "-o".into(),
        ]
    }

    fn run(&self, target: &str) -> Result<Output, ResolverError> {
        Command::new("xclip")
            .args(self.read_args(target))
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ResolverError::Clipboard(format!("failed to spawn xclip -o: {e}")))
    }
}

/// Interpret the result of `xclip -t <target> -o`.
///
/// xclip exits non-zero with "target ... not available" when the owner
/// does not offer the target, or when nobody owns the selection. That is
/// an absent format, not a failure.
fn interpret_output(output: Output) -> Result<Option<Vec<u8>>, ResolverError> {
    if output.status.success() {
        return Ok(Some(output.stdout));
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    if stderr.contains("not available") {
        tracing::debug!(stderr = %stderr.trim(), "xclip: target not offered");
        return Ok(None);
    }

    Err(ResolverError::Clipboard(format!(
        "xclip -o exited with status {}: {}",
        output.status,
        stderr.trim()
    )))
}

impl ClipboardProvider for XclipClipboardProvider {
    fn registry(&self) -> &dyn FormatRegistry {
        LocalFormatRegistry::global()
    }

    fn read(&self, format: &ClipboardFormat) -> Result<Option<Vec<u8>>, ResolverError> {
        let payload = interpret_output(self.run(format.name())?)?;
        tracing::debug!(
            format = format.name(),
            bytes = payload.as_ref().map(Vec::len),
            "xclip read"
        );
        Ok(payload)
    }

    fn formats(&self) -> Result<Vec<String>, ResolverError> {
        let listing = interpret_output(self.run(TARGETS)?)?.unwrap_or_default();
        Ok(String::from_utf8_lossy(&listing)
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;

    fn output(code: i32, stdout: &[u8], stderr: &[u8]) -> Output {
        Output {
            // Wait status layout: exit code in the second byte.
            status: ExitStatus::from_raw(code << 8),
            stdout: stdout.to_vec(),
            stderr: stderr.to_vec(),
        }
    }

    #[test]
    fn read_args_for_clipboard() {
        let provider = XclipClipboardProvider::new(Selection::Clipboard);
        assert_eq!(
            provider.read_args("XML Spreadsheet"),
            vec!["-selection", "clipboard", "-t", "XML Spreadsheet", "-o"]
        );
    }

    #[test]
    fn read_args_for_primary() {
        let provider = XclipClipboardProvider::new(Selection::Primary);
        assert_eq!(provider.read_args(TARGETS)[1], "primary");
    }

    #[test]
    fn success_returns_stdout() {
        let payload = interpret_output(output(0, b"<a/>\0", b"")).unwrap();
        assert_eq!(payload, Some(b"<a/>\0".to_vec()));
    }

    #[test]
    fn target_not_available_is_absent() {
        let payload = interpret_output(output(
            1,
            b"",
            b"Error: target XML Spreadsheet not available\n",
        ))
        .unwrap();
        assert_eq!(payload, None);
    }

    #[test]
    fn other_failure_is_error() {
        let err = interpret_output(output(1, b"", b"Error: Can't open display: :0\n")).unwrap_err();
        assert!(matches!(err, ResolverError::Clipboard(_)));
        assert!(err.to_string().contains("Can't open display"));
    }
}
