// Constants module - centralized default values for configuration
//
// Every default the gateway falls back to when a config key is omitted
// lives here, so the YAML defaults and the tests agree on one source.

// =============================================================================
// Server defaults
// =============================================================================

/// Default bind address
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8000;

/// Default value of the Access-Control-Allow-Origin response header
pub const DEFAULT_CORS_ALLOW_ORIGIN: &str = "*";

// =============================================================================
// Fetch defaults
// =============================================================================

/// URL schemes the gateway will fetch from
pub const DEFAULT_ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Upstream content types accepted as image sources
pub const DEFAULT_ALLOWED_CONTENT_TYPES: &[&str] = &[
    "image/png",
    "image/jpeg",
    "image/heif",
    "image/heic",
    "image/webp",
];

/// Maximum declared upstream payload size (about 11.8 MB)
pub const DEFAULT_MAX_FILE_SIZE: u64 = 12_400_000;

/// Upstream fetch timeout in seconds
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 15;

/// Fallback length header exposed by CDNs that omit Content-Length
pub const VENDOR_LENGTH_HEADER: &str = "x-full-image-content-length";

// =============================================================================
// Transcode defaults
// =============================================================================

/// Output encodings a client may request
pub const DEFAULT_ALLOWED_OUTPUT_FORMATS: &[&str] = &["JPG", "JPEG", "PNG", "WEBP"];

/// Output encoding used when no `format(...)` directive is given
pub const DEFAULT_OUTPUT_FORMAT: &str = "PNG";

/// WebP quality used when `quality(...)` is absent or unparsable
pub const DEFAULT_WEBP_QUALITY: u8 = 75;

/// WebP encoder method; 6 is the slowest, smallest-output setting
pub const WEBP_OPTIMIZED_METHOD: i32 = 6;

// =============================================================================
// Logging defaults
// =============================================================================

/// Host header value used by the internal test harness; excluded from logs
pub const DEFAULT_EXCLUDED_LOG_HOST: &str = "testserver";
