//! Login RPC: credentials in, session cookie jar out.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::Level;

use crate::config::normalize_base_url;
use crate::error::MonitorError;
use crate::log::app_log;
use crate::model::LoginRequest;
use crate::session::{CookieSet, SessionState};
use crate::transport::{RpcHeader, RpcTransport};

pub const LOGIN_PATH: &str = "/bxmAdmin/json/login";

/// `ResponseCode.code` value the server uses for a successful login.
const LOGIN_OK_CODE: i64 = 100;

// ---------------------------------------------------------------------------
// Request body
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct LoginBody<'a> {
    header: RpcHeader<'a>,
    #[serde(rename = "LoginOMM")]
    login: LoginOmm<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginOmm<'a> {
    user_id: &'a str,
    user_pwd: &'a str,
    lang: &'a str,
    domain_id: &'a str,
}

fn login_succeeded(json: &Value) -> bool {
    json.pointer("/ResponseCode/code").and_then(Value::as_i64) == Some(LOGIN_OK_CODE)
        || json.pointer("/header/returnCode").and_then(Value::as_str) == Some("0")
}

fn rejection_message(json: &Value) -> String {
    json.pointer("/header/returnMessage")
        .and_then(Value::as_str)
        .filter(|m| !m.is_empty())
        .unwrap_or("Unknown Error")
        .to_string()
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Stateless login client. Every failure comes back as a [`MonitorError`]
/// whose `Display` is fit to show the operator as-is.
#[derive(Clone)]
pub struct AuthClient {
    transport: Arc<dyn RpcTransport>,
}

impl AuthClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<CookieSet, MonitorError> {
        let result = self.try_login(request).await;
        match &result {
            Ok(cookies) => app_log(
                Level::INFO,
                format!("Login: {} OK ({} cookies)", request.user_id, cookies.len()),
            ),
            Err(e) => app_log(Level::WARN, format!("Login: {} failed: {}", request.user_id, e)),
        }
        result
    }

    /// [`login`](Self::login) packaged as a ready-to-install session.
    pub async fn login_session(&self, request: &LoginRequest) -> Result<SessionState, MonitorError> {
        let cookies = self.login(request).await?;
        SessionState::new(request.url.as_str(), cookies)
    }

    async fn try_login(&self, request: &LoginRequest) -> Result<CookieSet, MonitorError> {
        let base = normalize_base_url(&request.url);
        if base.is_empty() {
            return Err(MonitorError::config("login URL is empty"));
        }
        let url = format!("{}{}", base, LOGIN_PATH);
        app_log(Level::INFO, format!("Login: POST {} (domain {})", url, request.domain_id));

        let body = serde_json::to_value(LoginBody {
            header: RpcHeader::admin("AuthorityService", "loginOperation"),
            login: LoginOmm {
                user_id: &request.user_id,
                user_pwd: &request.password,
                lang: "ko",
                domain_id: &request.domain_id,
            },
        })?;

        let response = self
            .transport
            .post_json(&url, &CookieSet::new(), &body)
            .await?
            .error_for_status(&url)?;

        let json: Value = serde_json::from_str(&response.body)?;
        if !login_succeeded(&json) {
            return Err(MonitorError::Auth(rejection_message(&json)));
        }
        if response.cookies.is_empty() {
            return Err(MonitorError::protocol(
                "login accepted but the server issued no session cookie",
            ));
        }
        Ok(response.cookies)
    }
}
