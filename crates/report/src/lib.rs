//! Presentation of search and summary results.
//!
//! Reshapes a `SummaryResult` into the dashboard payload the web front end
//! consumes, and renders summaries, search pages and single records as
//! plain text for the terminal.

use patentflow_model::{MonthlyCount, PatentRecord, RecentPatent, SearchPage, SearchQuery, SummaryResult};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Widest bar drawn in the monthly trend chart.
const BAR_WIDTH: u64 = 30;

/// Dashboard view of a summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    pub applicant: String,
    pub period: Period,
    pub statistics: Statistics,
    pub ipc_distribution: Vec<IpcShare>,
    pub status_distribution: Vec<StatusShare>,
    pub monthly_trend: Vec<MonthlyCount>,
    pub recent_patents: Vec<RecentPatent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    pub start_date: String,
    pub end_date: String,
}

/// Headline numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Statistics {
    pub total_patents: u64,
    /// Trailing six-month average
    pub monthly_average: f64,
    /// Percent of applications with status 등록
    pub registration_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpcShare {
    pub ipc_code: String,
    pub ipc_kor_name: String,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusShare {
    pub status: String,
    pub count: u64,
    pub percent: f64,
}

impl SummaryView {
    /// Build the dashboard view for `query` from its summary.
    pub fn new(query: &SearchQuery, summary: SummaryResult) -> Self {
        let registration_rate = summary.registration_rate();

        let mut status_distribution: Vec<StatusShare> = summary
            .status_counts
            .iter()
            .map(|(status, &count)| StatusShare {
                status: status.clone(),
                count,
                percent: summary.status_percent.get(status).copied().unwrap_or(0.0),
            })
            .collect();
        status_distribution.sort_by(|a, b| b.count.cmp(&a.count));

        Self {
            applicant: query.applicant.clone(),
            period: Period {
                start_date: query.start_date.clone(),
                end_date: query.end_date.clone(),
            },
            statistics: Statistics {
                total_patents: summary.total_count,
                monthly_average: summary.avg_monthly_count,
                registration_rate,
            },
            ipc_distribution: summary
                .top_classifications
                .into_iter()
                .map(|c| IpcShare {
                    ipc_code: c.code,
                    ipc_kor_name: c.name,
                    count: c.count,
                })
                .collect(),
            status_distribution,
            monthly_trend: summary.monthly_trend,
            recent_patents: summary.recent_patents,
        }
    }
}

fn bar(count: u64, max: u64) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "#".repeat(width as usize)
}

/// Render a summary view as a terminal report.
pub fn render_summary(view: &SummaryView) -> String {
    let mut out = String::new();
    let stats = &view.statistics;

    let _ = writeln!(out, "Applicant: {}", view.applicant);
    let _ = writeln!(out, "Period: {} ~ {}", view.period.start_date, view.period.end_date);
    let _ = writeln!(out, "---");
    let _ = writeln!(out, "Total patents: {}", stats.total_patents);
    let _ = writeln!(out, "Monthly average (last 6 months): {:.2}", stats.monthly_average);
    let _ = writeln!(out, "Registration rate: {:.2}%", stats.registration_rate);

    if stats.total_patents == 0 {
        let _ = writeln!(out, "\nNo applications found for this period.");
        return out;
    }

    let _ = writeln!(out, "\nStatus:");
    for share in &view.status_distribution {
        let _ = writeln!(out, "  {:<12} {:>6} ({:.2}%)", share.status, share.count, share.percent);
    }

    let _ = writeln!(out, "\nTop IPC:");
    for (i, ipc) in view.ipc_distribution.iter().enumerate() {
        let _ = writeln!(out, "  {}. {} {} ({})", i + 1, ipc.ipc_code, ipc.ipc_kor_name, ipc.count);
    }

    let _ = writeln!(out, "\nMonthly trend:");
    let max = view.monthly_trend.iter().map(|m| m.count).max().unwrap_or(0);
    for month in &view.monthly_trend {
        let _ = writeln!(out, "  {} {:>5} {}", month.month, month.count, bar(month.count, max));
    }

    let _ = writeln!(out, "\nRecent applications:");
    for patent in &view.recent_patents {
        let _ = writeln!(
            out,
            "  {} {} [{}] {}",
            patent.application_date,
            patent.application_number,
            patent.ipc_main.as_deref().unwrap_or("-"),
            patent.invention_title.as_deref().unwrap_or("(untitled)")
        );
    }

    out
}

/// Render one page of search results.
pub fn render_search_page(page: &SearchPage) -> String {
    let mut out = String::new();

    for (i, record) in page.patents.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}. {} ({})",
            i + 1,
            record.invention_title.as_deref().unwrap_or("(untitled)"),
            record.application_number
        );
        let _ = writeln!(
            out,
            "   Applicant: {} | Filed: {} | Status: {}",
            record.applicant_name,
            record.application_date,
            if record.register_status.is_empty() { "-" } else { record.register_status.as_str() }
        );
    }

    let _ = writeln!(out, "---");
    let _ = writeln!(
        out,
        "Page {} of {} ({} results)",
        page.page, page.total_pages, page.total
    );
    out
}

/// Render every known field of a single record.
pub fn render_record(record: &PatentRecord) -> String {
    let mut out = String::new();
    let fields: [(&str, Option<&str>); 13] = [
        ("Application number", Some(record.application_number.as_str())),
        ("Title", record.invention_title.as_deref()),
        ("Applicant", Some(record.applicant_name.as_str())),
        ("Application date", Some(record.application_date.as_str())),
        ("Status", Some(record.register_status.as_str())),
        ("IPC", Some(record.ipc_number.as_str())),
        ("Open date", record.open_date.as_deref()),
        ("Open number", record.open_number.as_deref()),
        ("Publication date", record.publication_date.as_deref()),
        ("Publication number", record.publication_number.as_deref()),
        ("Registration date", record.register_date.as_deref()),
        ("Registration number", record.register_number.as_deref()),
        ("Drawing", record.drawing.as_deref()),
    ];

    for (label, value) in fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            let _ = writeln!(out, "{label:<20} {value}");
        }
    }
    if let Some(text) = &record.abstract_text {
        let _ = writeln!(out, "\n{text}");
    }
    out
}
