//! Client-side filtering of the fetched page: time window plus a free-text
//! query over the identifying columns.

use chrono::NaiveDateTime;

use crate::model::{LogRecord, LogSearchCondition};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogFilter {
    window: Option<(NaiveDateTime, NaiveDateTime)>,
    query: String,
}

impl LogFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inclusive window. Inverted bounds disable time filtering.
    pub fn with_window(mut self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        self.window = (start <= end).then_some((start, end));
        self
    }

    /// Same window the server query used; unrestricted conditions add none.
    pub fn from_condition(condition: &LogSearchCondition) -> Self {
        if condition.is_unrestricted() {
            Self::new()
        } else {
            Self::new().with_window(condition.start(), condition.end())
        }
    }

    /// Case-insensitive substring over GUID, user IP, application, service
    /// and operation.
    pub fn with_query(mut self, query: &str) -> Self {
        self.query = query.trim().to_lowercase();
        self
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_none() && self.query.is_empty()
    }

    pub fn matches(&self, record: &LogRecord) -> bool {
        if let Some((start, end)) = self.window {
            if record.timestamp < start || record.timestamp > end {
                return false;
            }
        }
        if self.query.is_empty() {
            return true;
        }
        [
            &record.guid,
            &record.user_ip,
            &record.application,
            &record.service,
            &record.operation,
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&self.query))
    }

    /// Matching records, in their original order.
    pub fn apply<'a>(&self, records: &'a [LogRecord]) -> Vec<&'a LogRecord> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DATETIME_FORMAT;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, DATETIME_FORMAT).unwrap()
    }

    fn record(ts: &str, guid: &str, service: &str) -> LogRecord {
        LogRecord {
            timestamp: dt(ts),
            guid: guid.into(),
            user_ip: "192.168.1.150".into(),
            is_error: false,
            application: "CMN".into(),
            service: service.into(),
            operation: "Login".into(),
            raw_input: String::new(),
            raw_output: String::new(),
            detail_log: String::new(),
        }
    }

    fn page() -> Vec<LogRecord> {
        vec![
            record("2025-01-01 09:00:00", "AAA-1", "AuthService"),
            record("2025-01-01 12:00:00", "BBB-2", "PaymentGateway"),
            record("2025-01-02 08:00:00", "CCC-3", "DataSync"),
        ]
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let records = page();
        assert!(LogFilter::new().is_empty());
        assert_eq!(LogFilter::new().apply(&records).len(), 3);
    }

    #[test]
    fn window_is_inclusive() {
        let records = page();
        let filter = LogFilter::new().with_window(dt("2025-01-01 09:00:00"), dt("2025-01-01 12:00:00"));
        let guids: Vec<_> = filter.apply(&records).iter().map(|r| r.guid.as_str()).collect();
        assert_eq!(guids, ["AAA-1", "BBB-2"]);
    }

    #[test]
    fn inverted_window_is_ignored() {
        let records = page();
        let filter = LogFilter::new().with_window(dt("2025-01-02 00:00:00"), dt("2025-01-01 00:00:00"));
        assert!(filter.is_empty());
        assert_eq!(filter.apply(&records).len(), 3);
    }

    #[test]
    fn query_is_trimmed_and_case_insensitive() {
        let records = page();
        let by_service = LogFilter::new().with_query("  payment ");
        assert_eq!(by_service.apply(&records)[0].guid, "BBB-2");

        let by_guid = LogFilter::new().with_query("ccc");
        assert_eq!(by_guid.apply(&records).len(), 1);

        let by_ip = LogFilter::new().with_query("168.1.150");
        assert_eq!(by_ip.apply(&records).len(), 3);

        assert!(LogFilter::new().with_query("nope").apply(&records).is_empty());
    }

    #[test]
    fn unrestricted_condition_adds_no_window() {
        let cond = LogSearchCondition::from_literal("2025-01-02 00:00:00", "2025-01-01 00:00:00", "");
        assert!(LogFilter::from_condition(&cond).is_empty());

        let day = LogSearchCondition::from_literal("2025-01-01 00:00:00", "2025-01-01 23:59:59", "");
        let records = page();
        assert_eq!(LogFilter::from_condition(&day).apply(&records).len(), 2);
    }
}
