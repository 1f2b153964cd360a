//! UltraDNS API constants

use std::time::Duration;

/// Production API root. Overridable per session for staging or tests.
pub const DEFAULT_BASE_URL: &str = "https://api.ultradns.com";

/// Token endpoint path, appended to the base URL for both grant types.
pub const TOKEN_PATH: &str = "/authorization/token";

/// HTTP timeout used when none is configured. Also the default expiry margin.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);
