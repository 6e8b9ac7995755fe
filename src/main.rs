//! Headless front end: log in (or resume), fetch today's service log and
//! print it. Settings come from `SYSMON_*` variables or a `.env` file.

use chrono::Local;
use tracing_subscriber::EnvFilter;

use sysmon::config::AppConfig;
use sysmon::search::{HighlightKind, LogSearch};
use sysmon::{Dashboard, LogRecord, LogSearchCondition, LoginRequest, MonitorError};

// ============================================================================
// Entry
// ============================================================================

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sysmon=info")))
        .init();

    if let Err(e) = run().await {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), MonitorError> {
    let config = AppConfig::from_env()?;
    let mut dashboard = Dashboard::from_config(&config)?;

    // A resumed session may be stale; keep the credentials for one retry.
    let relogin = if dashboard.resume_last_session() {
        login_request(&config).ok()
    } else {
        dashboard.login_and_wait(login_request(&config)?).await?;
        None
    };

    let today = LogSearchCondition::for_day(Local::now().date_naive(), "");
    print_table(dashboard.fetch_and_wait(today, relogin).await?);

    if let Some(index) = dashboard.records().iter().position(|r| r.is_error) {
        if let Some(record) = dashboard.select_record(index) {
            println!("\nFirst failure ({}):", record.guid);
        }
        print_error_lines(dashboard.search());
    }
    Ok(())
}

fn login_request(config: &AppConfig) -> Result<LoginRequest, MonitorError> {
    let missing = |name: &str| MonitorError::config(format!("{} is not set", name));
    let url = config.base_url.clone().ok_or_else(|| missing("SYSMON_BASE_URL"))?;
    let user = config.user_id.clone().ok_or_else(|| missing("SYSMON_USER_ID"))?;
    let password = config.password.clone().ok_or_else(|| missing("SYSMON_PASSWORD"))?;
    Ok(LoginRequest::new(url, user, password).with_domain(config.domain_id.clone()))
}

// ============================================================================
// Output
// ============================================================================

fn print_table(records: &[LogRecord]) {
    println!(
        "{:<19}  {:<7}  {:<15}  {:<10}  {:<24}  {:<24}  GUID",
        "TIME", "STATUS", "USER IP", "APP", "SERVICE", "OPERATION"
    );
    for r in records {
        println!(
            "{:<19}  {:<7}  {:<15}  {:<10}  {:<24}  {:<24}  {}",
            r.timestamp_literal(),
            r.status_label(),
            r.user_ip,
            r.application,
            r.service,
            r.operation,
            r.guid
        );
    }
    println!("{} record(s)", records.len());
}

fn print_error_lines(search: &LogSearch) {
    for span in search.highlights().iter().filter(|h| h.kind == HighlightKind::Error) {
        println!("  ! {}", &search.text()[span.start..span.end]);
    }
}
