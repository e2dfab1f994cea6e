// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display and the user agent)
pub const APP_NAME: &str = "Velora";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "velora";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".velora";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "velora.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "VELORA_CONFIG";

// =============================================================================
// Environment Variables
// =============================================================================

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "VELORA_LOG";

/// Environment variable for the backend API base URL
pub const ENV_API_BASE_URL: &str = "VELORA_API_BASE_URL";

/// Environment variable for the admin back-office origin
pub const ENV_ADMIN_ORIGIN: &str = "VELORA_ADMIN_ORIGIN";

/// Environment variable for the staff back-office origin
pub const ENV_STAFF_ORIGIN: &str = "VELORA_STAFF_ORIGIN";

/// Environment variable for the customer portal origin
pub const ENV_CUSTOMER_ORIGIN: &str = "VELORA_CUSTOMER_ORIGIN";

/// Environment variable for the idle timeout in seconds
pub const ENV_IDLE_TIMEOUT_SECS: &str = "VELORA_IDLE_TIMEOUT_SECS";

/// Environment variable to force a credential storage backend
pub const ENV_CREDENTIAL_BACKEND: &str = "VELORA_CREDENTIAL_BACKEND";

/// Environment variable to override the data directory
pub const ENV_DATA_DIR: &str = "VELORA_DATA_DIR";

// =============================================================================
// Backend API
// =============================================================================

/// Default backend API base URL (development)
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Login endpoint path, relative to the API base
pub const API_LOGIN_PATH: &str = "/login";

/// Identity endpoint path, relative to the API base
pub const API_ME_PATH: &str = "/me";

/// Logout notification endpoint path, relative to the API base
pub const API_LOGOUT_PATH: &str = "/logout";

/// Envelope status value the backend uses for success
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// HTTP request timeout in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Application Origins
// =============================================================================

/// Default admin back-office origin (development)
pub const DEFAULT_ADMIN_ORIGIN: &str = "http://localhost:3003";

/// Default staff back-office origin (development)
pub const DEFAULT_STAFF_ORIGIN: &str = "http://localhost:3002";

/// Default customer portal origin (development)
pub const DEFAULT_CUSTOMER_ORIGIN: &str = "http://localhost:3000";

// =============================================================================
// Session
// =============================================================================

/// Default idle timeout before forced logout (30 minutes)
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 30 * 60;

/// Default credential TTL in days
pub const DEFAULT_SESSION_TTL_DAYS: i64 = 7;

/// Login entry point path within every application
pub const LOGIN_PATH: &str = "/login";

/// Query parameter carrying the one-shot handoff token
pub const TOKEN_QUERY_PARAM: &str = "token";

// =============================================================================
// Credential Storage
// =============================================================================

/// Filename for the file-backed credential vault
pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// Storage key for the shared (role-less) credential scope
pub const SHARED_SCOPE_KEY: &str = "token";

// =============================================================================
// User-Visible Messages
// =============================================================================
// The product UI is Vietnamese; these are the inline strings the screens
// show. Logs stay English.

/// Fallback message for a rejected login
pub const MSG_LOGIN_FAILED: &str = "Đăng nhập thất bại";

/// Message for a login with a role outside the known set
pub const MSG_INVALID_ROLE: &str = "Vai trò không hợp lệ";

/// Message when the backend cannot be reached
pub const MSG_SERVER_UNREACHABLE: &str = "Lỗi kết nối server";
