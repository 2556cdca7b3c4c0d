//! Command-line client for KIPRIS patent search and analytics.
//!
//! Usage:
//!     patentflow summary "삼성전자" --start 20230101 --end 20231231
//!     patentflow search "삼성전자" --start 20230101 --end 20231231 --page 2
//!     patentflow advanced "LG전자" --start 20220101 --end 20221231 --title 배터리 --status 등록
//!     patentflow detail 1020230012345
//!     patentflow health

use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use patentflow_analytics::AnalyticsConfig;
use patentflow_backend_kipris::{KiprisBackend, KiprisConfig, PatentRegistry};
use patentflow_fetch::FetchConfig;
use patentflow_model::{PatentRecord, RegistrationStatus, SearchPage, SearchQuery};
use patentflow_report::{render_record, render_search_page, render_summary, SummaryView};
use patentflow_service::{PatentService, ServiceConfig};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "patentflow")]
#[command(about = "Search and summarize KIPRIS patent applications")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// KIPRIS API base URL
    #[arg(long, env = "KIPRIS_BASE_URL", default_value = "http://plus.kipris.or.kr", global = true)]
    base_url: String,

    /// KIPRIS service key
    #[arg(long, env = "KIPRIS_API_KEY", hide_env_values = true, default_value = "", global = true)]
    service_key: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30", global = true)]
    timeout_secs: u64,

    /// Concurrent page requests per batch
    #[arg(long, default_value = "5", global = true)]
    concurrency: usize,

    /// Pause before each batch, in milliseconds
    #[arg(long, default_value = "200", global = true)]
    batch_delay_ms: u64,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Summary statistics for an applicant over a date range
    Summary {
        /// Applicant name
        applicant: String,

        /// First application date (YYYYMMDD)
        #[arg(long)]
        start: String,

        /// Last application date (YYYYMMDD)
        #[arg(long)]
        end: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// One page of applications for an applicant
    Search {
        applicant: String,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        #[arg(short, long, default_value = "1")]
        page: u32,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Search with title and status filters
    Advanced {
        applicant: String,

        #[arg(long)]
        start: String,

        #[arg(long)]
        end: String,

        /// Invention title keyword
        #[arg(long)]
        title: Option<String>,

        /// Status label (등록, 거절, ...) or code (R, J, ...)
        #[arg(long)]
        status: Option<String>,

        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Fetch every page instead of one
        #[arg(long)]
        all: bool,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Show a single application
    Detail {
        application_number: String,

        #[arg(short, long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Check registry health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for results
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patentflow=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(base_url = %cli.base_url, timeout_secs = cli.timeout_secs, "Using KIPRIS backend");

    let backend = KiprisBackend::new(KiprisConfig {
        base_url: cli.base_url.clone(),
        service_key: cli.service_key.clone(),
        timeout_secs: cli.timeout_secs,
        ..Default::default()
    })?;

    let fetch = FetchConfig {
        concurrency_limit: cli.concurrency,
        batch_delay: Duration::from_millis(cli.batch_delay_ms),
        ..Default::default()
    };
    let config = ServiceConfig {
        summary_fetch: fetch.clone(),
        analytics: AnalyticsConfig::default(),
        ..Default::default()
    };
    let service = PatentService::new(Arc::new(backend), config);

    match cli.command {
        Commands::Summary {
            applicant,
            start,
            end,
            format,
        } => {
            let query = SearchQuery::new(applicant, start, end);
            run_summary(&service, &query, format).await?;
        }
        Commands::Search {
            applicant,
            start,
            end,
            page,
            format,
        } => {
            let query = SearchQuery::new(applicant, start, end);
            patentflow_query::validate(&query)?;
            let result = service
                .basic_search(&query.applicant, &query.start_date, &query.end_date, page)
                .await?;
            emit(format, &result, || render_search_page(&result))?;
        }
        Commands::Advanced {
            applicant,
            start,
            end,
            title,
            status,
            page,
            all,
            format,
        } => {
            let mut query = SearchQuery::new(applicant, start, end);
            if let Some(title) = title {
                query = query.with_title(title);
            }
            if let Some(status) = status {
                query = query.with_status(parse_status(&status)?);
            }
            run_advanced(&service, &query, page, all.then_some(&fetch), format).await?;
        }
        Commands::Detail {
            application_number,
            format,
        } => {
            let record = service.detail(&application_number).await?;
            emit(format, &record, || render_record(&record))?;
        }
        Commands::Health => {
            run_health(&service).await?;
        }
    }

    Ok(())
}

/// Print `value` as JSON, or the text rendering.
fn emit<T: Serialize>(format: Format, value: &T, text: impl FnOnce() -> String) -> Result<()> {
    match format {
        Format::Json => println!("{}", serde_json::to_string_pretty(value)?),
        Format::Text => print!("{}", text()),
    }
    Ok(())
}

fn parse_status(raw: &str) -> Result<RegistrationStatus> {
    let status = match RegistrationStatus::from_label(raw) {
        RegistrationStatus::Unspecified => RegistrationStatus::from_code(raw),
        status => status,
    };
    if status == RegistrationStatus::Unspecified {
        let known: Vec<String> = RegistrationStatus::known()
            .map(|s| format!("{} ({})", s.label(), s.code()))
            .collect();
        bail!("Unknown status '{}', expected one of: {}", raw, known.join(", "));
    }
    Ok(status)
}

async fn run_summary(
    service: &PatentService<KiprisBackend>,
    query: &SearchQuery,
    format: Format,
) -> Result<()> {
    patentflow_query::validate(query)?;

    let summary = service.summarize_query(query).await?;
    let view = SummaryView::new(query, summary);
    emit(format, &view, || render_summary(&view))
}

async fn run_advanced(
    service: &PatentService<KiprisBackend>,
    query: &SearchQuery,
    page: u32,
    fetch_all: Option<&FetchConfig>,
    format: Format,
) -> Result<()> {
    patentflow_query::validate(query)?;

    match fetch_all {
        Some(fetch) => {
            let page = collected_page(service.collect_all(query, fetch).await?);
            emit(format, &page, || render_search_page(&page))
        }
        None => {
            let result = service.advanced_search(query, page).await?;
            emit(format, &result, || render_search_page(&result))
        }
    }
}

/// A complete result set presented as a single page.
fn collected_page(records: Vec<PatentRecord>) -> SearchPage {
    SearchPage {
        total: records.len() as u64,
        page: 1,
        total_pages: 1,
        patents: records,
    }
}

async fn run_health(service: &PatentService<KiprisBackend>) -> Result<()> {
    let name = service.registry().name();
    match service.health_check().await {
        Ok(()) => {
            println!("{name}: OK");
            Ok(())
        }
        Err(e) => bail!("{name}: FAILED: {e}"),
    }
}
