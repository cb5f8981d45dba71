/// Service identity reported by the health endpoint
pub const SERVICE_NAME: &str = "lapor-core";

/// Default page number for pagination
pub const DEFAULT_PAGE: i64 = 1;

/// Default page size for pagination
pub const DEFAULT_PAGE_SIZE: i64 = 10;

/// Maximum page size allowed
pub const MAX_PAGE_SIZE: i64 = 100;

/// Key prefix for cached list pages
pub const REPORTS_CACHE_PREFIX: &str = "reports";
