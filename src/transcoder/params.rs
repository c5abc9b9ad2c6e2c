//! Transformation directive parsing
//!
//! Directives travel in the first path segment of a request:
//!
//! ```text
//! /format(webp):size(200,200):quality(80)/https://example.com/photo.jpg
//! ```
//!
//! The segment is a colon-separated list of `name` or `name(value)` tokens.
//! Key names are not validated here; unknown keys pass through and are
//! ignored by the stages that consume the options.

use std::collections::BTreeMap;
use std::fmt;

use super::error::DirectiveError;

/// Separator between directives
const DIRECTIVE_SEPARATOR: char = ':';

pub const FORMAT_KEY: &str = "format";
pub const SIZE_KEY: &str = "size";
pub const QUALITY_KEY: &str = "quality";

/// Output image format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputFormat {
    Jpeg,
    Png,
    WebP,
}

impl OutputFormat {
    /// Map a normalized (uppercase, alias-resolved) name to a format
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "JPEG" => Some(OutputFormat::Jpeg),
            "PNG" => Some(OutputFormat::Png),
            "WEBP" => Some(OutputFormat::WebP),
            _ => None,
        }
    }

    /// Lowercase name, as used in media types
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::WebP => "webp",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::WebP => "image/webp",
        }
    }

    /// Whether the encoding is lossy and honors `quality(...)`
    pub fn is_lossy(&self) -> bool {
        matches!(self, Self::Jpeg | Self::WebP)
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uppercase a requested format name and resolve the `JPG` alias
pub fn normalize_format_name(raw: &str) -> String {
    let upper = raw.trim().to_uppercase();
    if upper == "JPG" {
        "JPEG".to_string()
    } else {
        upper
    }
}

/// Target bounding box for shrink-to-fit resizing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub width: u32,
    pub height: u32,
}

impl BoundingBox {
    /// Parse `W,H` where both parts are positive integers.
    ///
    /// Anything else (missing comma, non-numeric or zero parts) yields `None`;
    /// callers treat that as "no resize requested".
    pub fn parse(value: &str) -> Option<Self> {
        let (w, h) = value.split_once(',')?;
        let width: u32 = w.trim().parse().ok()?;
        let height: u32 = h.trim().parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }
}

/// Parsed directive set for one request.
///
/// Maps directive name to an optional value. Bare directives (`name`) are
/// recorded without a value; they are no-ops for the recognized keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformOptions {
    entries: BTreeMap<String, Option<String>>,
}

impl TransformOptions {
    /// Tokenize a directive segment.
    ///
    /// Only the first parenthesized group of a token is its value; nested,
    /// unbalanced or repeated parentheses are rejected. Empty names and
    /// empty values degrade to an absent entry.
    pub fn parse(segment: &str) -> Result<Self, DirectiveError> {
        let mut entries = BTreeMap::new();

        for token in segment.split(DIRECTIVE_SEPARATOR) {
            if token.is_empty() {
                continue;
            }

            match parse_token(token)? {
                Some((name, Some(value))) => {
                    entries.insert(name.to_string(), Some(value.to_string()));
                }
                Some((name, None)) => {
                    entries.entry(name.to_string()).or_insert(None);
                }
                None => {}
            }
        }

        Ok(Self { entries })
    }

    /// Value of a directive, if it was given one
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).and_then(|v| v.as_deref())
    }

    /// Whether the directive appeared at all, valued or bare
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    /// Requested format, normalized (`jpg` → `JPEG`)
    pub fn format(&self) -> Option<String> {
        self.get(FORMAT_KEY).map(normalize_format_name)
    }

    /// Requested bounding box; malformed values are ignored
    pub fn size(&self) -> Option<BoundingBox> {
        self.get(SIZE_KEY).and_then(BoundingBox::parse)
    }

    /// Requested quality clamped to 0-100; unparsable values are ignored
    pub fn quality(&self) -> Option<u8> {
        self.get(QUALITY_KEY)
            .and_then(|q| q.trim().parse::<i64>().ok())
            .map(|q| q.clamp(0, 100) as u8)
    }
}

/// Split one token into name and optional value
fn parse_token(token: &str) -> Result<Option<(&str, Option<&str>)>, DirectiveError> {
    let open = match token.find('(') {
        Some(open) => open,
        None => {
            if token.contains(')') {
                return Err(DirectiveError::Unbalanced {
                    token: token.to_string(),
                });
            }
            return Ok(Some((token, None)));
        }
    };

    let name = &token[..open];
    if name.contains(')') {
        return Err(DirectiveError::Unbalanced {
            token: token.to_string(),
        });
    }

    let rest = &token[open + 1..];
    let close = rest.find(')').ok_or_else(|| DirectiveError::Unbalanced {
        token: token.to_string(),
    })?;

    let value = &rest[..close];
    if value.contains('(') {
        return Err(DirectiveError::Nested {
            token: token.to_string(),
        });
    }

    let trailing = &rest[close + 1..];
    if trailing.contains('(') {
        return Err(DirectiveError::Nested {
            token: token.to_string(),
        });
    }
    if trailing.contains(')') {
        return Err(DirectiveError::Unbalanced {
            token: token.to_string(),
        });
    }
    // Plain text after the group is ignored; only the first group counts

    if name.is_empty() || value.is_empty() {
        return Ok(None);
    }

    Ok(Some((name, Some(value))))
}
