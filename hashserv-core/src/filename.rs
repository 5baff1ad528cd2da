//! Upload filename handling.
//!
//! The caller-supplied name never becomes a storage key; it only labels the
//! staged file, so it is reduced to a conservative ASCII subset first.

use unicode_normalization::UnicodeNormalization;

/// Longest sanitized name kept for a staged file, leaving room for the
/// unique prefix within a 255 byte path component.
pub const MAX_FILENAME_LEN: usize = 200;

const WINDOWS_DEVICE_NAMES: &[&str] = &[
    "CON", "AUX", "COM1", "COM2", "COM3", "COM4", "LPT1", "LPT2", "LPT3", "PRN", "NUL",
];

/// Reduce `name` to a single safe path component.
///
/// The name is NFKD-decomposed and reduced to ASCII, path separators become
/// spaces, whitespace runs become `_`, anything outside `[A-Za-z0-9_.-]` is
/// dropped and leading or trailing `.`/`_` are trimmed. The result may be
/// empty.
pub fn secure_filename(name: &str) -> String {
    let spaced: String = name
        .nfkd()
        .filter(char::is_ascii)
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let filtered: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();

    let trimmed = filtered.trim_matches(|c| c == '.' || c == '_').to_string();

    let stem = trimmed.split('.').next().unwrap_or_default();
    if WINDOWS_DEVICE_NAMES
        .iter()
        .any(|device| device.eq_ignore_ascii_case(stem))
    {
        return format!("_{}", trimmed);
    }

    trimmed
}

/// Cut an already sanitized name to at most `max_len` bytes, keeping its
/// extension when the extension itself fits.
pub fn truncate_filename(name: &str, max_len: usize) -> String {
    if name.len() <= max_len {
        return name.to_string();
    }

    let cut = |text: &str, len: usize| -> String { text.chars().take(len).collect() };

    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && ext.len() + 1 < max_len => {
            format!("{}.{}", cut(stem, max_len - ext.len() - 1), ext)
        }
        _ => cut(name, max_len),
    }
}

/// Text after the last `.`, if there is one.
pub fn extension_of(name: &str) -> Option<&str> {
    name.rsplit_once('.').map(|(_, ext)| ext)
}

/// Whether `name` carries one of the `allowed` extensions. An empty list
/// accepts any name.
pub fn is_allowed(name: &str, allowed: &[String]) -> bool {
    if allowed.is_empty() {
        return true;
    }

    match extension_of(name) {
        Some(ext) => allowed.iter().any(|candidate| candidate == ext),
        None => false,
    }
}
