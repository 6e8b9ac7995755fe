//! Hand-written RPC requests: send an operator-edited JSON payload to any
//! admin endpoint with the current session cookies.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde_json::{Value, json};
use tracing::Level;

use crate::error::MonitorError;
use crate::log::app_log;
use crate::service_log::{LOG_LIST_PATH, PAGE_SIZE};
use crate::session::SessionState;
use crate::transport::{RpcHeader, RpcTransport};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub success: bool,
    /// Pretty-printed when the body is JSON, otherwise as received. For
    /// failures, the error text.
    pub body: String,
}

impl RawResponse {
    fn failed(e: &MonitorError) -> Self {
        Self {
            success: false,
            body: e.to_string(),
        }
    }
}

/// Default payload for the log-list service, covering the day of `now`.
pub fn template_payload(now: NaiveDateTime) -> String {
    let day = now.format("%Y-%m-%d");
    let template = json!({
        "header": RpcHeader::admin("OnlineLogService", "getServiceLogList"),
        "OnlineLogSearchConditionOMM": {
            "pageCount": PAGE_SIZE.to_string(),
            "pageNum": "1",
            "opOccurDttmStart": format!("{} 00:00:00", day),
            "opOccurDttmEnd": format!("{} 23:59:59", day),
        }
    });
    serde_json::to_string_pretty(&template).unwrap_or_default()
}

/// Default target URL for a session.
pub fn default_url(session: &SessionState) -> Option<String> {
    session.base_url().map(|b| format!("{}{}", b, LOG_LIST_PATH))
}

#[derive(Clone)]
pub struct RawRequestClient {
    transport: Arc<dyn RpcTransport>,
}

impl RawRequestClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Never fails; problems come back as `success: false` with a message.
    pub async fn send(&self, session: &SessionState, url: &str, payload: &str) -> RawResponse {
        match self.try_send(session, url, payload).await {
            Ok(resp) => {
                app_log(
                    if resp.success { Level::INFO } else { Level::WARN },
                    format!("Raw request -> {} ({})", url, if resp.success { "ok" } else { "failed" }),
                );
                resp
            }
            Err(e) => {
                app_log(Level::WARN, format!("Raw request -> {} failed: {}", url, e));
                RawResponse::failed(&e)
            }
        }
    }

    async fn try_send(&self, session: &SessionState, url: &str, payload: &str) -> Result<RawResponse, MonitorError> {
        let url = url.trim();
        if url.is_empty() {
            return Err(MonitorError::config("URL is empty"));
        }
        if !session.is_authenticated() {
            return Err(MonitorError::NotAuthenticated);
        }
        let body: Value = serde_json::from_str(payload.trim())
            .map_err(|e| MonitorError::protocol(format!("payload is not valid JSON: {}", e)))?;

        let response = self.transport.post_json(url, session.cookies(), &body).await?;
        let text = match serde_json::from_str::<Value>(&response.body) {
            Ok(v) => serde_json::to_string_pretty(&v).unwrap_or(response.body.clone()),
            Err(_) => response.body.clone(),
        };
        Ok(RawResponse {
            success: response.is_success(),
            body: text,
        })
    }
}
