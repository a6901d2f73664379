//! Canonical host resolution.

/// Pick the host to render for.
///
/// The forwarded value replaces `default_host` only when it is byte-for-byte
/// equal to one of the `trusted` hosts. Header values may carry non-ASCII
/// bytes, so the comparison is done on raw bytes.
pub fn resolve_host<'a>(
    default_host: &'a str,
    forwarded: Option<&[u8]>,
    trusted: &'a [String],
) -> &'a str {
    forwarded
        .and_then(|value| trusted.iter().find(|h| h.as_bytes() == value))
        .map_or(default_host, String::as_str)
}
