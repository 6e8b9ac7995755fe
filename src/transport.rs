//! HTTP seam for the BXM admin RPC endpoints.
//!
//! Clients talk to an [`RpcTransport`] so tests can count and script calls;
//! [`ReqwestTransport`] is the real thing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Url;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::redirect::Policy;
use serde::Serialize;

use crate::error::MonitorError;
use crate::session::CookieSet;

/// Fixed per-call timeout for login and log-list requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

const MAX_REDIRECTS: usize = 10;

/// `header` block every BXM admin RPC body starts with.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcHeader<'a> {
    pub application: &'a str,
    pub lang_cd: &'a str,
    pub service: &'a str,
    pub operation: &'a str,
}

impl<'a> RpcHeader<'a> {
    pub fn admin(service: &'a str, operation: &'a str) -> Self {
        Self {
            application: "bxmAdmin",
            lang_cd: "ko",
            service,
            operation,
        }
    }
}

/// Raw outcome of one POST. Status is not interpreted here.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcResponse {
    pub status: u16,
    pub body: String,
    /// Every cookie in the jar after the exchange, redirects included.
    pub cookies: CookieSet,
}

impl RpcResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turn a non-2xx response into [`MonitorError::Status`].
    pub fn error_for_status(self, url: &str) -> Result<Self, MonitorError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(MonitorError::Status {
                status: self.status,
                url: url.to_string(),
            })
        }
    }
}

#[async_trait]
pub trait RpcTransport: Send + Sync {
    /// POST `body` as JSON to `url`, sending `cookies`.
    async fn post_json(
        &self,
        url: &str,
        cookies: &CookieSet,
        body: &serde_json::Value,
    ) -> Result<RpcResponse, MonitorError>;
}

/// reqwest-backed transport. Each call gets its own cookie jar so cookies
/// from different sessions never share storage.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    timeout: Duration,
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn classify(&self, e: reqwest::Error) -> MonitorError {
        if e.is_timeout() {
            MonitorError::Timeout(self.timeout)
        } else {
            MonitorError::from(e)
        }
    }
}

#[async_trait]
impl RpcTransport for ReqwestTransport {
    async fn post_json(
        &self,
        url: &str,
        cookies: &CookieSet,
        body: &serde_json::Value,
    ) -> Result<RpcResponse, MonitorError> {
        let target = Url::parse(url)
            .map_err(|e| MonitorError::config(format!("invalid url '{}': {}", url, e)))?;

        // The jar only decides what gets sent on each hop; what was received
        // is collected from the responses themselves.
        let jar = Arc::new(Jar::default());
        for (name, value) in cookies.iter() {
            jar.add_cookie_str(&format!("{}={}; Path=/", name, value), &target);
        }

        let client = reqwest::Client::builder()
            .cookie_provider(Arc::clone(&jar))
            .redirect(Policy::none())
            .timeout(self.timeout)
            .build()
            .map_err(|e| MonitorError::Network(e.to_string()))?;

        let payload = serde_json::to_vec(body)?;
        let mut captured = cookies.clone();
        let mut current = target;
        let mut resend_body = true;
        let mut hops = 0;
        loop {
            let request = if resend_body {
                client
                    .post(current.clone())
                    .header(CONTENT_TYPE, JSON_CONTENT_TYPE)
                    .body(payload.clone())
            } else {
                client.get(current.clone())
            };
            let response = request
                .header(ACCEPT, "application/json")
                .send()
                .await
                .map_err(|e| self.classify(e))?;
            captured = captured.union(received_cookies(&response));

            if let Some(next) = redirect_target(&current, &response) {
                if hops == MAX_REDIRECTS {
                    return Err(MonitorError::Network(format!("too many redirects from {}", url)));
                }
                hops += 1;
                // 307/308 repeat the POST; every other redirect becomes a GET.
                let status = response.status().as_u16();
                resend_body = resend_body && matches!(status, 307 | 308);
                current = next;
                continue;
            }

            let status = response.status().as_u16();
            let body = response.text().await.map_err(|e| self.classify(e))?;
            return Ok(RpcResponse {
                status,
                body,
                cookies: captured,
            });
        }
    }
}

/// `Set-Cookie` values of one response, whatever their path or domain.
/// Cookies being deleted (`Max-Age=0`) are left out.
fn received_cookies(response: &reqwest::Response) -> CookieSet {
    CookieSet::from_pairs(
        response
            .cookies()
            .filter(|c| c.max_age() != Some(Duration::ZERO))
            .map(|c| (c.name().to_string(), c.value().to_string())),
    )
}

fn redirect_target(current: &Url, response: &reqwest::Response) -> Option<Url> {
    if !response.status().is_redirection() {
        return None;
    }
    let location = response.headers().get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_header_shape() {
        let header = serde_json::to_value(RpcHeader::admin("OnlineLogService", "getServiceLogList")).unwrap();
        assert_eq!(
            header,
            serde_json::json!({
                "application": "bxmAdmin",
                "langCd": "ko",
                "service": "OnlineLogService",
                "operation": "getServiceLogList"
            })
        );
    }

    #[test]
    fn error_for_status_passes_2xx_only() {
        let ok = RpcResponse {
            status: 204,
            body: String::new(),
            cookies: CookieSet::new(),
        };
        assert!(ok.clone().error_for_status("u").is_ok());

        let bad = RpcResponse { status: 503, ..ok };
        assert_eq!(
            bad.error_for_status("https://bxm.example.com/bxmAdmin/json"),
            Err(MonitorError::Status {
                status: 503,
                url: "https://bxm.example.com/bxmAdmin/json".into()
            })
        );
    }
}
