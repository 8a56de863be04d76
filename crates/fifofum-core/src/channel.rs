//! Channel and pipe-name handling.
//!
//! Channel names travel on the wire as the prefix of `channel:body` messages,
//! so they must never contain a colon. Spaces are replaced as well so names
//! stay usable as DOM element ids in the browser.

use std::path::Path;

/// Replace every colon and space in `name` with an underscore.
pub fn sanitize(name: &str) -> String {
    name.replace([':', ' '], "_")
}

/// True when `arg` is one of the reserved tokens selecting standard
/// input (for reading) or standard output (for the input-echo target).
pub fn is_stdio_token(arg: &str) -> bool {
    matches!(arg, "-" | "_")
}

/// Derive the channel name for a pipe from its filesystem path:
/// basename with the extension stripped, then sanitized.
///
/// The stdio tokens are passed through sanitization unchanged, so a
/// stdin-backed source gets the token itself as its name.
pub fn source_name(path: &str) -> String {
    let stem = Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(path);
    sanitize(stem)
}
