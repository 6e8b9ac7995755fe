//! Log-list RPC (`OnlineLogService.getServiceLogList`) and mapping of its
//! entries to [`LogRecord`].

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::Level;

use crate::error::MonitorError;
use crate::log::app_log;
use crate::model::{DATETIME_FORMAT, LogRecord, LogSearchCondition};
use crate::session::SessionState;
use crate::transport::{RpcHeader, RpcTransport};

pub const LOG_LIST_PATH: &str = "/bxmAdmin/json";

/// Rows requested per query. Only page 1 is ever fetched, so anything past
/// the first 100 matching rows is not shown.
pub const PAGE_SIZE: u32 = 100;

const RAW_OUTPUT_PLACEHOLDER: &str = "Detail API required";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct LogListBody<'a> {
    header: RpcHeader<'a>,
    #[serde(rename = "OnlineLogSearchConditionOMM")]
    condition: SearchConditionOmm<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchConditionOmm<'a> {
    op_occur_dttm_start: String,
    op_occur_dttm_end: String,
    page_count: String,
    page_num: &'a str,
    guid: &'a str,
    svc_nm: &'a str,
    op_nm: &'a str,
    bxm_app_id: &'a str,
    node_name: &'a str,
    send_user_ip: &'a str,
}

impl<'a> SearchConditionOmm<'a> {
    fn from_condition(condition: &'a LogSearchCondition) -> Self {
        Self {
            op_occur_dttm_start: condition.start_literal(),
            op_occur_dttm_end: condition.end_literal(),
            page_count: PAGE_SIZE.to_string(),
            page_num: "1",
            guid: condition.keyword(),
            svc_nm: "",
            op_nm: "",
            bxm_app_id: "",
            node_name: "",
            send_user_ip: "",
        }
    }
}

/// One `serviceLogList` element. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawServiceLog {
    op_occur_dttm: Option<String>,
    guid: Option<String>,
    send_user_ip: Option<String>,
    op_err_yn: Option<String>,
    bxm_app_id: Option<String>,
    svc_nm: Option<String>,
    op_nm: Option<String>,
    node_name: Option<String>,
    /// Number or numeric string depending on server version.
    op_elapsed_mills: Option<Value>,
    msg_type: Option<String>,
}

// ---------------------------------------------------------------------------
// Normalizer
// ---------------------------------------------------------------------------

fn parse_occur_dttm(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    [DATETIME_FORMAT, "%Y-%m-%d %H:%M:%S%.f", "%Y%m%d%H%M%S%3f", "%Y%m%d%H%M%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

fn elapsed_text(v: Option<&Value>) -> String {
    match v {
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        _ => "0".to_string(),
    }
}

/// Map one raw entry to a [`LogRecord`]. `None` for entries that are not
/// objects, have mistyped fields, or carry no parseable `opOccurDttm`.
pub fn normalize_entry(entry: &Value) -> Option<LogRecord> {
    if !entry.is_object() {
        return None;
    }
    let raw: RawServiceLog = serde_json::from_value(entry.clone()).ok()?;
    let timestamp = parse_occur_dttm(raw.op_occur_dttm.as_deref()?)?;
    let is_error = raw.op_err_yn.as_deref() == Some("Y");

    let detail_log = format!(
        "[INFO] Node: {}\n[INFO] Elapsed: {}ms\n[INFO] Message: {}\n{}",
        raw.node_name.as_deref().unwrap_or("N/A"),
        elapsed_text(raw.op_elapsed_mills.as_ref()),
        raw.msg_type.as_deref().unwrap_or(""),
        if is_error {
            "[ERROR] Transaction Failed"
        } else {
            "[INFO] Transaction Success"
        }
    );

    Some(LogRecord {
        timestamp,
        guid: raw.guid.unwrap_or_default(),
        user_ip: raw.send_user_ip.unwrap_or_default(),
        is_error,
        application: raw.bxm_app_id.unwrap_or_default(),
        service: raw.svc_nm.unwrap_or_default(),
        operation: raw.op_nm.unwrap_or_default(),
        raw_input: serde_json::to_string_pretty(entry).unwrap_or_default(),
        raw_output: RAW_OUTPUT_PLACEHOLDER.to_string(),
        detail_log,
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Result of one fetch. `diagnostic` is set when the call failed; `records`
/// is then empty, matching what [`LogClient::get_logs`] reports.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogFetch {
    pub records: Vec<LogRecord>,
    pub diagnostic: Option<MonitorError>,
    /// Entries dropped by the normalizer.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct LogClient {
    transport: Arc<dyn RpcTransport>,
}

impl LogClient {
    pub fn new(transport: Arc<dyn RpcTransport>) -> Self {
        Self { transport }
    }

    /// Never fails: any error yields an empty list (and is logged). Use
    /// [`fetch`](Self::fetch) to tell "no rows" from "request failed".
    pub async fn get_logs(&self, session: &SessionState, condition: &LogSearchCondition) -> Vec<LogRecord> {
        self.fetch(session, condition).await.records
    }

    pub async fn fetch(&self, session: &SessionState, condition: &LogSearchCondition) -> LogFetch {
        match self.try_fetch(session, condition).await {
            Ok((records, skipped)) => {
                app_log(
                    Level::INFO,
                    format!("Logs: {} records ({} skipped)", records.len(), skipped),
                );
                LogFetch {
                    records,
                    diagnostic: None,
                    skipped,
                }
            }
            Err(e) => {
                app_log(Level::ERROR, format!("Logs: request failed: {}", e));
                LogFetch {
                    records: Vec::new(),
                    diagnostic: Some(e),
                    skipped: 0,
                }
            }
        }
    }

    async fn try_fetch(
        &self,
        session: &SessionState,
        condition: &LogSearchCondition,
    ) -> Result<(Vec<LogRecord>, usize), MonitorError> {
        let base = match session.base_url() {
            Some(base) if session.is_authenticated() => base,
            _ => return Err(MonitorError::NotAuthenticated),
        };
        let url = format!("{}{}", base, LOG_LIST_PATH);
        app_log(
            Level::INFO,
            format!(
                "Logs: POST {} [{} ~ {}] guid='{}'",
                url,
                condition.start_literal(),
                condition.end_literal(),
                condition.keyword()
            ),
        );

        let body = serde_json::to_value(LogListBody {
            header: RpcHeader::admin("OnlineLogService", "getServiceLogList"),
            condition: SearchConditionOmm::from_condition(condition),
        })?;

        let response = self
            .transport
            .post_json(&url, session.cookies(), &body)
            .await?
            .error_for_status(&url)?;
        let json: Value = serde_json::from_str(&response.body)?;

        let Some(entries) = json
            .pointer("/ServiceLogListOMM/serviceLogList")
            .and_then(Value::as_array)
        else {
            return Ok((Vec::new(), 0));
        };

        let mut records = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        for (i, entry) in entries.iter().enumerate() {
            match normalize_entry(entry) {
                Some(record) => records.push(record),
                None => {
                    skipped += 1;
                    app_log(Level::WARN, format!("Logs: skipping malformed entry #{}", i));
                }
            }
        }
        Ok((records, skipped))
    }
}
