//! Human-readable byte sizes for error details.

/// Binary-prefixed units, largest first
const UNITS: &[(u64, &str)] = &[
    (1 << 50, " PB"),
    (1 << 40, " TB"),
    (1 << 30, " GB"),
    (1 << 20, " MB"),
    (1 << 10, " KB"),
];

/// Format a byte count using the largest fitting binary unit.
///
/// The amount is truncated, not rounded: 12_400_000 bytes is "11 MB".
/// Only the byte scale distinguishes singular and plural.
pub fn pretty_size(bytes: u64) -> String {
    for &(factor, suffix) in UNITS {
        if bytes >= factor {
            return format!("{}{}", bytes / factor, suffix);
        }
    }

    if bytes == 1 {
        "1 byte".to_string()
    } else {
        format!("{} bytes", bytes)
    }
}
