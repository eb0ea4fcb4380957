//! Server configuration, loaded from environment variables at startup.

/// Origins allowed by default so the Vite / CRA dev servers work out of the box.
const DEFAULT_CORS_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://localhost:3000"];

/// Runtime configuration for aide-server.
///
/// Every field has a sensible default so the server works out-of-the-box
/// without any environment variables set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:5001"`).
    pub bind_address: String,

    /// SQLite database URL (default: `"sqlite://aide.db"`).
    pub database_url: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,sqlx=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Hosted LLM API key. `None` puts the assistant into placeholder mode.
    pub anthropic_api_key: Option<String>,

    /// Base URL of the Anthropic Messages API.
    pub anthropic_base_url: String,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Upper bound on generated tokens per reply.
    pub max_tokens: u32,

    /// Number of most recent conversation messages sent as prompt context,
    /// the new user message included. Never below 1.
    pub history_window: u32,

    /// Request timeout for the hosted LLM call, in seconds.
    pub llm_timeout_secs: u64,

    /// Origins allowed by the CORS layer. A single `"*"` allows any origin.
    pub cors_allowed_origins: Vec<String>,

    /// Override for the Chrome `History` database path.
    pub chrome_history_path: Option<String>,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_docs: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("AIDE_BIND", "0.0.0.0:5001"),
            database_url: env_or("AIDE_DATABASE_URL", "sqlite://aide.db"),
            log_level: env_or("AIDE_LOG", "info"),
            log_json: env_flag("AIDE_LOG_JSON", false),
            anthropic_api_key: env_opt("ANTHROPIC_API_KEY"),
            anthropic_base_url: env_or("ANTHROPIC_BASE_URL", "https://api.anthropic.com"),
            model: env_or("AIDE_MODEL", "claude-sonnet-4-5-20250929"),
            max_tokens: parse_env("AIDE_MAX_TOKENS", 2048),
            history_window: history_window(env_opt("AIDE_HISTORY_WINDOW").as_deref()),
            llm_timeout_secs: parse_env("AIDE_LLM_TIMEOUT_SECS", 60),
            cors_allowed_origins: cors_origins(
                env_opt("AIDE_CORS_ORIGINS").as_deref(),
                env_opt("FRONTEND_URL").as_deref(),
            ),
            chrome_history_path: env_opt("AIDE_CHROME_HISTORY"),
            enable_docs: env_flag("AIDE_ENABLE_DOCS", true),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5001".into(),
            database_url: "sqlite://aide.db".into(),
            log_level: "info".into(),
            log_json: false,
            anthropic_api_key: None,
            anthropic_base_url: "https://api.anthropic.com".into(),
            model: "claude-sonnet-4-5-20250929".into(),
            max_tokens: 2048,
            history_window: 20,
            llm_timeout_secs: 60,
            cors_allowed_origins: cors_origins(None, None),
            chrome_history_path: None,
            enable_docs: true,
        }
    }
}

/// Resolve the CORS origin list.
///
/// An explicit comma-separated list replaces the defaults; otherwise the
/// defaults are used plus the frontend URL when one is set.
fn cors_origins(explicit: Option<&str>, frontend_url: Option<&str>) -> Vec<String> {
    if let Some(list) = explicit {
        let parsed: Vec<String> = list
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        if !parsed.is_empty() {
            return parsed;
        }
    }

    let mut origins: Vec<String> = DEFAULT_CORS_ORIGINS.iter().map(|s| (*s).to_owned()).collect();
    if let Some(url) = frontend_url {
        let url = url.trim().trim_end_matches('/');
        if !url.is_empty() && !origins.iter().any(|o| o == url) {
            origins.push(url.to_owned());
        }
    }
    origins
}

/// Parse `AIDE_HISTORY_WINDOW`; unparsable values use the default of 20 and
/// zero is raised to 1 so the provider always receives the new message.
fn history_window(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.parse::<u32>().ok()).unwrap_or(20).max(1)
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Unset and blank values are both treated as absent.
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
