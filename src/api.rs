//! Dashboard state owned by the interactive context, bridging UI actions to
//! the background clients.
//!
//! Actions (`begin_*`) only start work. Results arrive through
//! [`Dashboard::pump`] / [`Dashboard::next_events`], which is the only place
//! the session, the record list and the search state are changed.

use std::sync::Arc;

use tracing::Level;

use crate::auth::AuthClient;
use crate::config::{AppConfig, ConfigStore, LoginTarget, SavedSession};
use crate::error::MonitorError;
use crate::filter::LogFilter;
use crate::log::app_log;
use crate::model::{LogRecord, LogSearchCondition, LoginRequest};
use crate::raw::{RawRequestClient, RawResponse};
use crate::search::{LogSearch, SearchOutcome};
use crate::service_log::{LogClient, LogFetch};
use crate::session::{CookieSet, SessionState, SessionStore};
use crate::task::{TaskEvent, TaskRunner, TaskSlot};
use crate::transport::{ReqwestTransport, RpcTransport};

/// Page recorded in `session.json` for resume.
pub const PAGE_NAME: &str = "system_log";

/// What a background task hands back.
#[derive(Debug)]
pub enum TaskOutput {
    Login(Result<SessionState, MonitorError>),
    Logs(LogFetch),
    Raw(RawResponse),
}

/// What the UI should react to after a pump.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardEvent {
    Busy(TaskSlot),
    Idle(TaskSlot),
    LoggedIn { base_url: String },
    LoginFailed { message: String },
    /// `count` may be zero both for "no rows" and for a failed request; see
    /// [`Dashboard::last_fetch_error`].
    LogsLoaded { count: usize },
    RawResponse(RawResponse),
    TaskAborted { slot: TaskSlot, reason: String },
}

pub struct Dashboard {
    auth: AuthClient,
    logs: LogClient,
    raw: RawRequestClient,
    runner: TaskRunner<TaskOutput>,
    store: Option<ConfigStore>,

    session: SessionStore,
    /// Session the in-flight fetch was started with.
    fetch_session: Option<Arc<SessionState>>,
    records: Vec<LogRecord>,
    last_fetch_error: Option<MonitorError>,
    filter: LogFilter,
    selected: Option<usize>,
    search: LogSearch,
}

impl Dashboard {
    pub fn new(
        transport: Arc<dyn RpcTransport>,
        runner: TaskRunner<TaskOutput>,
        store: Option<ConfigStore>,
    ) -> Self {
        Self {
            auth: AuthClient::new(Arc::clone(&transport)),
            logs: LogClient::new(Arc::clone(&transport)),
            raw: RawRequestClient::new(transport),
            runner,
            store,
            session: SessionStore::new(),
            fetch_session: None,
            records: Vec::new(),
            last_fetch_error: None,
            filter: LogFilter::new(),
            selected: None,
            search: LogSearch::new(),
        }
    }

    /// Real transport with the configured timeout, on the current runtime.
    pub fn from_config(config: &AppConfig) -> Result<Self, MonitorError> {
        let transport: Arc<dyn RpcTransport> = Arc::new(ReqwestTransport::with_timeout(config.timeout));
        Ok(Self::new(transport, TaskRunner::current()?, config.config_store()))
    }

    // -----------------------------------------------------------------------
    // Read side
    // -----------------------------------------------------------------------

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.records
    }

    /// Rows passing the active filter, each with its index into
    /// [`records`](Self::records) for [`select_record`](Self::select_record).
    pub fn visible_records(&self) -> Vec<(usize, &LogRecord)> {
        self.records
            .iter()
            .enumerate()
            .filter(|(_, r)| self.filter.matches(r))
            .collect()
    }

    pub fn selected(&self) -> Option<&LogRecord> {
        self.selected.and_then(|i| self.records.get(i))
    }

    pub fn search(&self) -> &LogSearch {
        &self.search
    }

    pub fn is_busy(&self, slot: TaskSlot) -> bool {
        self.runner.is_busy(slot)
    }

    /// Why the last fetch came back empty, if it failed.
    pub fn last_fetch_error(&self) -> Option<&MonitorError> {
        self.last_fetch_error.as_ref()
    }

    pub fn config_store(&self) -> Option<&ConfigStore> {
        self.store.as_ref()
    }

    /// Quick-login entries; empty when nothing is configured.
    pub fn login_targets(&self) -> Vec<LoginTarget> {
        self.store
            .as_ref()
            .map(ConfigStore::load_login_targets)
            .unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub fn begin_login(&mut self, request: LoginRequest) -> Result<(), MonitorError> {
        let auth = self.auth.clone();
        self.runner.spawn(TaskSlot::Login, async move {
            TaskOutput::Login(auth.login_session(&request).await)
        })
    }

    /// Install cookies captured by an embedded browser.
    pub fn capture_session(&mut self, base_url: &str, cookies: CookieSet) -> Result<(), MonitorError> {
        let state = SessionState::new(base_url, cookies)?;
        self.install_session(state);
        Ok(())
    }

    /// Restore `session.json`, if it holds a usable session.
    pub fn resume_last_session(&mut self) -> bool {
        let Some(saved) = self.store.as_ref().and_then(ConfigStore::load_session) else {
            return false;
        };
        match saved.into_state() {
            Ok(state) => {
                app_log(
                    Level::INFO,
                    format!("Resumed session for {}", state.base_url().unwrap_or_default()),
                );
                self.session.replace(state);
                true
            }
            Err(e) => {
                app_log(Level::WARN, format!("Saved session unusable: {}", e));
                false
            }
        }
    }

    pub fn logout(&mut self) {
        self.session.clear();
        if let Some(store) = &self.store {
            store.clear_session();
        }
        self.reset_results();
        app_log(Level::INFO, "Logged out");
    }

    fn install_session(&mut self, state: SessionState) {
        if let Some(store) = &self.store {
            if let Some(saved) = SavedSession::from_state(&state, PAGE_NAME) {
                if let Err(e) = store.save_session(&saved) {
                    app_log(Level::WARN, format!("Could not save session: {}", e));
                }
            }
        }
        self.session.replace(state);
    }

    // -----------------------------------------------------------------------
    // Logs, filter, search
    // -----------------------------------------------------------------------

    pub fn begin_fetch(&mut self, condition: LogSearchCondition) -> Result<(), MonitorError> {
        let logs = self.logs.clone();
        let session = self.session.snapshot();
        let held = Arc::clone(&session);
        self.runner.spawn(TaskSlot::LogFetch, async move {
            TaskOutput::Logs(logs.fetch(&session, &condition).await)
        })?;
        self.fetch_session = Some(held);
        Ok(())
    }

    pub fn set_filter(&mut self, filter: LogFilter) {
        self.filter = filter;
    }

    /// Show record `index` (an index into [`records`](Self::records), as
    /// paired by [`visible_records`](Self::visible_records)) in the detail
    /// view; search restarts on its text.
    pub fn select_record(&mut self, index: usize) -> Option<&LogRecord> {
        let record = self.records.get(index)?;
        self.search.load(record.detail_log.clone());
        self.selected = Some(index);
        self.records.get(index)
    }

    /// Same as [`select_record`](Self::select_record), keyed by GUID.
    pub fn select_guid(&mut self, guid: &str) -> Option<&LogRecord> {
        let index = self.records.iter().position(|r| r.guid == guid)?;
        self.select_record(index)
    }

    pub fn set_search_term(&mut self, term: &str) {
        self.search.set_term(term);
    }

    pub fn find_next(&mut self, forward: bool) -> SearchOutcome {
        if forward {
            self.search.find_next()
        } else {
            self.search.find_previous()
        }
    }

    fn reset_results(&mut self) {
        self.records.clear();
        self.selected = None;
        self.search.clear();
        self.last_fetch_error = None;
    }

    // -----------------------------------------------------------------------
    // Raw request
    // -----------------------------------------------------------------------

    pub fn begin_raw_request(&mut self, url: String, payload: String) -> Result<(), MonitorError> {
        let raw = self.raw.clone();
        let session = self.session.snapshot();
        self.runner.spawn(TaskSlot::RawRequest, async move {
            TaskOutput::Raw(raw.send(&session, &url, &payload).await)
        })
    }

    // -----------------------------------------------------------------------
    // Awaiting from async code
    // -----------------------------------------------------------------------

    /// Log in and apply the outcome before returning.
    pub async fn login_and_wait(&mut self, request: LoginRequest) -> Result<(), MonitorError> {
        self.begin_login(request)?;
        let mut failure = None;
        while let Some(events) = self.next_events().await {
            for event in events {
                match event {
                    DashboardEvent::LoginFailed { message } => failure = Some(MonitorError::Auth(message)),
                    DashboardEvent::TaskAborted {
                        slot: TaskSlot::Login,
                        reason,
                    } => failure = Some(MonitorError::Network(reason)),
                    _ => {}
                }
            }
        }
        failure.map_or(Ok(()), Err)
    }

    /// Fetch and apply the page before returning. If the fetch fails and
    /// `relogin` is given, log in with it and fetch once more; a resumed
    /// session whose cookies have expired recovers this way.
    pub async fn fetch_and_wait(
        &mut self,
        condition: LogSearchCondition,
        relogin: Option<LoginRequest>,
    ) -> Result<&[LogRecord], MonitorError> {
        self.begin_fetch(condition.clone())?;
        self.settle().await;

        if let Some(request) = relogin {
            if let Some(e) = self.last_fetch_error.clone() {
                app_log(Level::WARN, format!("Fetch failed ({}); logging in again", e));
                self.login_and_wait(request).await?;
                self.begin_fetch(condition)?;
                self.settle().await;
            }
        }

        match &self.last_fetch_error {
            Some(e) => Err(e.clone()),
            None => Ok(&self.records),
        }
    }

    async fn settle(&mut self) {
        while self.next_events().await.is_some() {}
    }

    // -----------------------------------------------------------------------
    // Delivery
    // -----------------------------------------------------------------------

    /// Apply everything that has arrived so far without blocking.
    pub fn pump(&mut self) -> Vec<DashboardEvent> {
        let mut out = Vec::new();
        while let Some(event) = self.runner.try_next() {
            out.extend(self.apply(event));
        }
        out
    }

    /// Wait for the next task event and apply it. `None` when idle.
    pub async fn next_events(&mut self) -> Option<Vec<DashboardEvent>> {
        let event = self.runner.next().await?;
        Some(self.apply(event))
    }

    fn apply(&mut self, event: TaskEvent<TaskOutput>) -> Vec<DashboardEvent> {
        let (slot, output) = match event {
            TaskEvent::Started(slot) => return vec![DashboardEvent::Busy(slot)],
            TaskEvent::Aborted { slot, reason } => {
                app_log(Level::ERROR, format!("{} task aborted: {}", slot, reason));
                if slot == TaskSlot::LogFetch {
                    self.fetch_session = None;
                }
                return vec![
                    DashboardEvent::Idle(slot),
                    DashboardEvent::TaskAborted { slot, reason },
                ];
            }
            TaskEvent::Finished { slot, output } => (slot, output),
        };

        let mut out = vec![DashboardEvent::Idle(slot)];
        match output {
            TaskOutput::Login(Ok(state)) => {
                let base_url = state.base_url().unwrap_or_default().to_string();
                self.install_session(state);
                out.push(DashboardEvent::LoggedIn { base_url });
            }
            TaskOutput::Login(Err(e)) => {
                self.session.clear();
                if let Some(store) = &self.store {
                    store.clear_session();
                }
                self.reset_results();
                out.push(DashboardEvent::LoginFailed {
                    message: e.to_string(),
                });
            }
            TaskOutput::Logs(fetch) => {
                let started_with = self.fetch_session.take();
                let current = self.session.snapshot();
                if started_with.is_some_and(|s| !Arc::ptr_eq(&s, &current)) {
                    app_log(Level::INFO, "Discarding log page fetched with a replaced session");
                    return out;
                }
                self.reset_results();
                self.records = fetch.records;
                self.last_fetch_error = fetch.diagnostic;
                out.push(DashboardEvent::LogsLoaded {
                    count: self.records.len(),
                });
            }
            TaskOutput::Raw(resp) => out.push(DashboardEvent::RawResponse(resp)),
        }
        out
    }
}
