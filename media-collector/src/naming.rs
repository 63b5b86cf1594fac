//! Deterministic output file names.
//!
//! Names follow `"{owner} - {title}[_{kind}].{ext}"`, sanitized so they are
//! legal on Windows, Linux and macOS. Invalid characters become `!`, the
//! same replacement earlier releases wrote, so existing outputs are found.

use crate::media::StreamKind;

/// Characters that are invalid in Windows filenames
const WINDOWS_INVALID_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Stand-in for characters a filename cannot hold
const REPLACEMENT: char = '!';

/// Byte budget of `"{owner} - {title}"`; common filesystems stop at 255 bytes
/// per name and the kind suffix and extension still have to fit.
const MAX_STEM_BYTES: usize = 200;

/// Longest extension kept from a pass-through format
const MAX_EXTENSION_BYTES: usize = 16;

/// Windows reserved filenames (case-insensitive)
const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Container extension for a mime hint: `mp4` and `flv` are recognized by
/// substring, anything else is passed through unchanged.
pub fn normalize_extension(format: &str) -> &str {
    if format.contains("mp4") {
        "mp4"
    } else if format.contains("flv") {
        "flv"
    } else {
        format
    }
}

/// Name of a temporary track (`kind` set) or of the merged file (`kind` unset).
///
/// Long titles are cut on a character boundary before the suffix and the
/// extension are appended, so both always survive.
pub fn output_file_name(owner: &str, title: &str, kind: Option<StreamKind>, format: &str) -> String {
    let stem = sanitize_filename(&format!("{owner} - {title}"));
    let stem = truncate_bytes(&stem, MAX_STEM_BYTES).trim_end_matches([' ', '.']);
    let suffix = kind.map(|k| format!("_{}", k.label())).unwrap_or_default();
    let ext = sanitize_filename(truncate_bytes(normalize_extension(format), MAX_EXTENSION_BYTES));
    if format.is_empty() {
        return sanitize_filename(&format!("{stem}{suffix}"));
    }
    sanitize_filename(&format!("{stem}{suffix}.{ext}"))
}

/// Longest prefix of `s` that fits in `max` bytes without splitting a char.
fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Sanitize a string for use in filenames across all platforms.
///
/// Control and Windows-invalid characters become `!` (runs collapse into one),
/// leading and trailing spaces and dots are trimmed, reserved device names
/// get a `_` prefix, and an empty result becomes `unnamed`.
pub fn sanitize_filename(input: &str) -> String {
    if input.is_empty() {
        return "unnamed".to_string();
    }

    let mut result = String::with_capacity(input.len());
    let mut last_was_replacement = false;

    for c in input.chars() {
        if c.is_control() || WINDOWS_INVALID_CHARS.contains(&c) {
            if !last_was_replacement {
                result.push(REPLACEMENT);
                last_was_replacement = true;
            }
        } else {
            result.push(c);
            last_was_replacement = false;
        }
    }

    let trimmed = result.trim_matches(|c| c == ' ' || c == '.');
    if trimmed.is_empty() {
        return "unnamed".to_string();
    }

    let upper = trimmed.to_uppercase();
    for reserved in WINDOWS_RESERVED_NAMES {
        if upper == *reserved || upper.starts_with(&format!("{reserved}.")) {
            return format!("_{trimmed}");
        }
    }

    trimmed.to_string()
}
