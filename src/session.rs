//! Session state: base URL plus the cookie set that authenticates it.
//!
//! The state is an immutable value. A login swaps the whole thing; nothing
//! ever merges cookies from two sessions.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::MonitorError;

/// Cookie name -> value, ordered so the `Cookie` header is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CookieSet(BTreeMap<String, String>);

impl CookieSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Parse a `Cookie` request header (`a=1; b=2`). Fragments without `=`
    /// are ignored.
    pub fn parse_header(header: &str) -> Self {
        let pairs = header.split(';').filter_map(|part| {
            let (name, value) = part.trim().split_once('=')?;
            let name = name.trim();
            if name.is_empty() {
                return None;
            }
            Some((name.to_string(), value.trim().to_string()))
        });
        Self(pairs.collect())
    }

    /// Render as a `Cookie` request header value.
    pub fn to_header_value(&self) -> String {
        self.0
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Builder-style union; entries in `other` win. Only used while
    /// assembling a single jar, never across sessions.
    pub fn union(mut self, other: CookieSet) -> Self {
        self.0.extend(other.0);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Where the authenticated session lives and what proves it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    base_url: Option<String>,
    cookies: CookieSet,
}

impl SessionState {
    /// Build an authenticated state. Both a base URL and at least one cookie
    /// are required; anything less is not a session.
    pub fn new(base_url: impl Into<String>, cookies: CookieSet) -> Result<Self, MonitorError> {
        let base_url = crate::config::normalize_base_url(&base_url.into());
        if base_url.is_empty() {
            return Err(MonitorError::config("base URL is required for a session"));
        }
        if cookies.is_empty() {
            return Err(MonitorError::NotAuthenticated);
        }
        Ok(Self {
            base_url: Some(base_url),
            cookies,
        })
    }

    pub fn is_authenticated(&self) -> bool {
        self.base_url.is_some() && !self.cookies.is_empty()
    }

    pub fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub fn cookies(&self) -> &CookieSet {
        &self.cookies
    }
}

/// Owner of the current session. Lives on the interactive context; background
/// work only ever sees a [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct SessionStore {
    current: Arc<SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the session atomically. On error the previous session is
    /// left untouched.
    pub fn set(&mut self, base_url: impl Into<String>, cookies: CookieSet) -> Result<(), MonitorError> {
        let next = SessionState::new(base_url, cookies)?;
        self.replace(next);
        Ok(())
    }

    pub fn replace(&mut self, state: SessionState) {
        self.current = Arc::new(state);
    }

    pub fn clear(&mut self) {
        self.current = Arc::new(SessionState::default());
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.is_authenticated()
    }

    pub fn snapshot(&self) -> Arc<SessionState> {
        Arc::clone(&self.current)
    }
}
