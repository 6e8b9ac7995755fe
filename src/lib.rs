//! Core of the BXM admin log dashboard: session login, service-log retrieval
//! and normalization, detail-view search and highlighting, and background
//! task delivery to an interactive front end.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod filter;
pub mod log;
pub mod model;
pub mod raw;
pub mod search;
pub mod service_log;
pub mod session;
pub mod task;
pub mod transport;

pub use api::{Dashboard, DashboardEvent, TaskOutput};
pub use error::MonitorError;
pub use model::{LogRecord, LogSearchCondition, LoginRequest};
pub use session::{CookieSet, SessionState, SessionStore};
