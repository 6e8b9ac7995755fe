//! Runtime configuration (environment / `.env`) and the two flat JSON files
//! the dashboard persists: quick-login targets and the last session.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::MonitorError;
use crate::log::app_log;
use crate::model::DEFAULT_DOMAIN_ID;
use crate::session::{CookieSet, SessionState};
use crate::transport::DEFAULT_TIMEOUT;

const URLS_FILE: &str = "login_urls.json";
const SESSION_FILE: &str = "session.json";

/// Trim, default the scheme to https, drop trailing slashes.
pub fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{}", trimmed)
    }
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Settings read from `SYSMON_*` variables. Call `dotenvy::dotenv()` first if
/// a `.env` file should count.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub base_url: Option<String>,
    pub user_id: Option<String>,
    pub password: Option<String>,
    pub domain_id: String,
    pub timeout: Duration,
    pub config_dir: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_id: None,
            password: None,
            domain_id: DEFAULT_DOMAIN_ID.to_string(),
            timeout: DEFAULT_TIMEOUT,
            config_dir: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, MonitorError> {
        let timeout = match env_var("SYSMON_TIMEOUT_SECS") {
            Some(v) => {
                let secs: u64 = v
                    .parse()
                    .map_err(|_| MonitorError::config(format!("SYSMON_TIMEOUT_SECS is not a number: {}", v)))?;
                if secs == 0 {
                    return Err(MonitorError::config("SYSMON_TIMEOUT_SECS must be positive"));
                }
                Duration::from_secs(secs)
            }
            None => DEFAULT_TIMEOUT,
        };
        Ok(Self {
            base_url: env_var("SYSMON_BASE_URL").map(|u| normalize_base_url(&u)),
            user_id: env_var("SYSMON_USER_ID"),
            password: env_var("SYSMON_PASSWORD"),
            domain_id: env_var("SYSMON_DOMAIN_ID").unwrap_or_else(|| DEFAULT_DOMAIN_ID.to_string()),
            timeout,
            config_dir: env_var("SYSMON_CONFIG_DIR").map(PathBuf::from),
        })
    }

    /// Explicit override first, then the platform config directory.
    pub fn config_store(&self) -> Option<ConfigStore> {
        match &self.config_dir {
            Some(dir) => Some(ConfigStore::new(dir)),
            None => ConfigStore::default_location(),
        }
    }
}

// ---------------------------------------------------------------------------
// Persisted files
// ---------------------------------------------------------------------------

/// One quick-login entry from the options dialog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginTarget {
    pub name: String,
    pub url: String,
    pub id: String,
    pub password: String,
}

/// Last successful session, for resuming without logging in again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSession {
    pub base_url: String,
    pub cookies: CookieSet,
    #[serde(default)]
    pub page_name: String,
}

impl SavedSession {
    pub fn from_state(state: &SessionState, page_name: impl Into<String>) -> Option<Self> {
        Some(Self {
            base_url: state.base_url()?.to_string(),
            cookies: state.cookies().clone(),
            page_name: page_name.into(),
        })
    }

    pub fn into_state(self) -> Result<SessionState, MonitorError> {
        SessionState::new(self.base_url, self.cookies)
    }
}

/// Directory holding `login_urls.json` and `session.json`. Plain overwrite,
/// no locking; last writer wins.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    dir: PathBuf,
}

impl ConfigStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn default_location() -> Option<Self> {
        directories::ProjectDirs::from("com", "SysMon", "SysMonPro")
            .map(|d| Self::new(d.config_dir()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Missing or unreadable file yields an empty list.
    pub fn load_login_targets(&self) -> Vec<LoginTarget> {
        self.read_json(URLS_FILE).unwrap_or_default()
    }

    pub fn save_login_targets(&self, targets: &[LoginTarget]) -> Result<(), MonitorError> {
        self.write_json(URLS_FILE, targets)
    }

    pub fn load_session(&self) -> Option<SavedSession> {
        self.read_json(SESSION_FILE)
    }

    pub fn save_session(&self, session: &SavedSession) -> Result<(), MonitorError> {
        self.write_json(SESSION_FILE, session)
    }

    pub fn clear_session(&self) {
        let path = self.dir.join(SESSION_FILE);
        if path.exists() {
            if let Err(e) = std::fs::remove_file(&path) {
                app_log(Level::WARN, format!("Could not remove {}: {}", path.display(), e));
            }
        }
    }

    fn read_json<T: for<'de> Deserialize<'de>>(&self, file: &str) -> Option<T> {
        let path = self.dir.join(file);
        let data = std::fs::read_to_string(&path).ok()?;
        match serde_json::from_str(&data) {
            Ok(v) => Some(v),
            Err(e) => {
                app_log(Level::WARN, format!("Ignoring corrupt {}: {}", path.display(), e));
                None
            }
        }
    }

    fn write_json<T: Serialize + ?Sized>(&self, file: &str, value: &T) -> Result<(), MonitorError> {
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| MonitorError::config(format!("{}: {}", self.dir.display(), e)))?;
        let path = self.dir.join(file);
        let data = serde_json::to_string_pretty(value).map_err(|e| MonitorError::config(e.to_string()))?;
        std::fs::write(&path, data).map_err(|e| MonitorError::config(format!("{}: {}", path.display(), e)))
    }
}
