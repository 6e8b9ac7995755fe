#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{Value, json};

use sysmon::CookieSet;
use sysmon::MonitorError;
use sysmon::transport::{RpcResponse, RpcTransport};

/// Replays queued responses in order and counts calls.
#[derive(Default)]
pub struct FakeTransport {
    responses: Mutex<VecDeque<RpcResponse>>,
    calls: Mutex<Vec<(String, CookieSet, Value)>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, status: u16, body: Value, cookies: CookieSet) {
        self.responses.lock().unwrap().push_back(RpcResponse {
            status,
            body: body.to_string(),
            cookies,
        });
    }

    pub fn calls(&self) -> Vec<(String, CookieSet, Value)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl RpcTransport for FakeTransport {
    async fn post_json(&self, url: &str, cookies: &CookieSet, body: &Value) -> Result<RpcResponse, MonitorError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.to_string(), cookies.clone(), body.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| MonitorError::Network("connection refused".into()))
    }
}

pub fn session_cookie() -> CookieSet {
    CookieSet::from_pairs([("JSESSIONID", "node01xyz")])
}

pub fn login_ok() -> Value {
    json!({"ResponseCode": {"code": 100}, "header": {"returnCode": "0"}})
}

pub fn log_page() -> Value {
    json!({"ServiceLogListOMM": {"serviceLogList": [
        {
            "opOccurDttm": "2025-03-10 09:15:00",
            "guid": "20250310091500-A",
            "sendUserIp": "10.0.0.5",
            "opErrYn": "N",
            "bxmAppId": "CMN",
            "svcNm": "AuthService",
            "opNm": "Login",
            "nodeName": "was01",
            "opElapsedMills": 12
        },
        {
            "opOccurDttm": "2025-03-10 09:16:30",
            "guid": "20250310091630-B",
            "sendUserIp": "10.0.0.9",
            "opErrYn": "Y",
            "bxmAppId": "PAY",
            "svcNm": "PaymentGateway",
            "opNm": "Approve",
            "nodeName": "was02",
            "opElapsedMills": "3100",
            "msgType": "Timeout from upstream"
        },
        {"guid": "no-timestamp"}
    ]}})
}
