//! Shared domain types for the log dashboard (used by the clients, the
//! filter, the search engine and whatever UI sits on top).

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Wire format for `opOccurDttm*` fields.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Tenant code used when the operator leaves the domain blank.
pub const DEFAULT_DOMAIN_ID: &str = "OKC";

// ---------------------------------------------------------------------------
// Login
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginRequest {
    pub url: String,
    pub user_id: String,
    pub password: String,
    pub domain_id: String,
}

impl LoginRequest {
    pub fn new(url: impl Into<String>, user_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_id: user_id.into(),
            password: password.into(),
            domain_id: DEFAULT_DOMAIN_ID.to_string(),
        }
    }

    /// Blank input keeps the default tenant.
    pub fn with_domain(mut self, domain_id: impl Into<String>) -> Self {
        let domain_id = domain_id.into();
        let domain_id = domain_id.trim();
        if !domain_id.is_empty() {
            self.domain_id = domain_id.to_string();
        }
        self
    }
}

// ---------------------------------------------------------------------------
// Log search condition
// ---------------------------------------------------------------------------

/// Time window and GUID keyword for one log-list query. Always `start <= end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSearchCondition {
    start: NaiveDateTime,
    end: NaiveDateTime,
    keyword: String,
}

/// `0001-01-01 00:00:00`
pub fn earliest() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .unwrap_or(NaiveDate::MIN)
        .and_time(NaiveTime::default())
}

/// `9999-12-31 23:59:59`
pub fn latest() -> NaiveDateTime {
    let date = NaiveDate::from_ymd_opt(9999, 12, 31).unwrap_or(NaiveDate::MAX);
    date.and_hms_opt(23, 59, 59)
        .unwrap_or_else(|| date.and_time(NaiveTime::default()))
}

impl LogSearchCondition {
    /// An inverted range is not an error: it silently becomes "no time
    /// filter".
    pub fn new(start: NaiveDateTime, end: NaiveDateTime, keyword: impl Into<String>) -> Self {
        let (start, end) = if start > end {
            (earliest(), latest())
        } else {
            (start, end)
        };
        Self {
            start,
            end,
            keyword: keyword.into().trim().to_string(),
        }
    }

    /// Build from the `YYYY-MM-DD HH:MM:SS` strings the operator typed. Parse
    /// failures fall back to the unrestricted range, same as an inverted one.
    pub fn from_literal(start: &str, end: &str, keyword: impl Into<String>) -> Self {
        let parsed = NaiveDateTime::parse_from_str(start.trim(), DATETIME_FORMAT)
            .and_then(|s| NaiveDateTime::parse_from_str(end.trim(), DATETIME_FORMAT).map(|e| (s, e)));
        match parsed {
            Ok((s, e)) => Self::new(s, e, keyword),
            Err(_) => Self::unrestricted(keyword),
        }
    }

    pub fn unrestricted(keyword: impl Into<String>) -> Self {
        Self::new(earliest(), latest(), keyword)
    }

    /// Whole calendar day, `00:00:00` through `23:59:59`.
    pub fn for_day(day: NaiveDate, keyword: impl Into<String>) -> Self {
        let start = day.and_time(NaiveTime::default());
        let end = day.and_hms_opt(23, 59, 59).unwrap_or(start);
        Self::new(start, end, keyword)
    }

    pub fn start(&self) -> NaiveDateTime {
        self.start
    }

    pub fn end(&self) -> NaiveDateTime {
        self.end
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn is_unrestricted(&self) -> bool {
        self.start == earliest() && self.end == latest()
    }

    pub fn start_literal(&self) -> String {
        self.start.format(DATETIME_FORMAT).to_string()
    }

    pub fn end_literal(&self) -> String {
        self.end.format(DATETIME_FORMAT).to_string()
    }
}

// ---------------------------------------------------------------------------
// Log record
// ---------------------------------------------------------------------------

/// One service-log row, normalized from the server's `serviceLogList` entry.
/// Only [`crate::service_log::normalize_entry`] builds these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: NaiveDateTime,
    pub guid: String,
    pub user_ip: String,
    pub is_error: bool,
    pub application: String,
    pub service: String,
    pub operation: String,
    /// Pretty-printed server entry.
    pub raw_input: String,
    pub raw_output: String,
    /// Synthesized multi-line text shown in the detail view and searched by
    /// [`crate::search`].
    pub detail_log: String,
}

impl LogRecord {
    pub fn status_label(&self) -> &'static str {
        if self.is_error { "FAIL" } else { "OK" }
    }

    pub fn timestamp_literal(&self) -> String {
        self.timestamp.format(DATETIME_FORMAT).to_string()
    }
}
