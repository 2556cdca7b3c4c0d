//! Summary statistics over a complete patent result set.
//!
//! Pure computation: status distribution, monthly filing trend, trailing
//! monthly average, top IPC classifications and the most recent filings.
//! An empty input is a valid summary with every facet empty or zero.

use patentflow_classify::{korean_name, main_code, resolve};
use patentflow_model::{ClassificationCount, MonthlyCount, PatentRecord, RecentPatent, SummaryResult};
use std::collections::{BTreeMap, HashMap};

/// Bucket for records without a status label.
pub const OTHER_STATUS: &str = "other";

/// Configuration for summary analysis.
#[derive(Debug, Clone)]
pub struct AnalyticsConfig {
    /// Number of classifications to keep
    pub top_classifications: usize,
    /// Number of recent filings to keep
    pub recent_patents: usize,
    /// Months averaged at the end of the trend
    pub trailing_months: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            top_classifications: 5,
            recent_patents: 3,
            trailing_months: 6,
        }
    }
}

/// Summarize `items` with the default configuration.
pub fn analyze(items: &[PatentRecord]) -> SummaryResult {
    analyze_with(items, &AnalyticsConfig::default())
}

/// Summarize `items`.
pub fn analyze_with(items: &[PatentRecord], config: &AnalyticsConfig) -> SummaryResult {
    let total_count = items.len() as u64;
    let status_counts = status_counts(items);
    let status_percent = status_percent(&status_counts, total_count);
    let monthly_trend = monthly_trend(items);
    let avg_monthly_count = trailing_average(&monthly_trend, config.trailing_months);

    SummaryResult {
        total_count,
        status_counts,
        status_percent,
        monthly_trend,
        top_classifications: top_classifications(items, config.top_classifications),
        recent_patents: recent_patents(items, config.recent_patents),
        avg_monthly_count,
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Count records per status label, empty labels under [`OTHER_STATUS`].
pub fn status_counts(items: &[PatentRecord]) -> BTreeMap<String, u64> {
    let mut counts = BTreeMap::new();
    for record in items {
        let status = record.register_status.trim();
        let key = if status.is_empty() { OTHER_STATUS } else { status };
        *counts.entry(key.to_string()).or_insert(0) += 1;
    }
    counts
}

/// Percentage of `total` per status. Empty when `total` is zero.
pub fn status_percent(counts: &BTreeMap<String, u64>, total: u64) -> BTreeMap<String, f64> {
    if total == 0 {
        return BTreeMap::new();
    }
    counts
        .iter()
        .map(|(status, &count)| {
            let percent = count as f64 / total as f64 * 100.0;
            (status.clone(), round2(percent))
        })
        .collect()
}

/// `YYYY-MM` from a `YYYYMMDD` date; `None` if the first six characters are
/// not digits.
pub fn month_key(application_date: &str) -> Option<String> {
    let prefix = application_date.trim().get(..6)?;
    if !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{}-{}", &prefix[..4], &prefix[4..]))
}

/// Applications per month, ascending by month.
///
/// Records with malformed dates still count toward the total but not here.
pub fn monthly_trend(items: &[PatentRecord]) -> Vec<MonthlyCount> {
    let mut months: BTreeMap<String, u64> = BTreeMap::new();
    for record in items {
        if let Some(month) = month_key(&record.application_date) {
            *months.entry(month).or_insert(0) += 1;
        }
    }
    // BTreeMap iterates in lexical order, which is chronological for YYYY-MM
    months
        .into_iter()
        .map(|(month, count)| MonthlyCount { month, count })
        .collect()
}

/// Mean count over the last `months` trend entries, 0 for an empty trend.
pub fn trailing_average(trend: &[MonthlyCount], months: usize) -> f64 {
    let window = &trend[trend.len().saturating_sub(months.max(1))..];
    if window.is_empty() {
        return 0.0;
    }
    let sum: u64 = window.iter().map(|m| m.count).sum();
    round2(sum as f64 / window.len() as f64)
}

/// Most frequent main IPC codes, descending by count.
///
/// Ties keep the order in which codes were first seen. Records without a
/// usable code are skipped.
pub fn top_classifications(items: &[PatentRecord], limit: usize) -> Vec<ClassificationCount> {
    let mut counts: Vec<(String, u64)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in items {
        let Some(code) = main_code(&record.ipc_number) else {
            continue;
        };
        match index.get(&code) {
            Some(&idx) => counts[idx].1 += 1,
            None => {
                index.insert(code.clone(), counts.len());
                counts.push((code, 1));
            }
        }
    }

    // stable sort keeps first-seen order among equal counts
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(limit);

    counts
        .into_iter()
        .map(|(code, count)| ClassificationCount {
            name: korean_name(&code).to_string(),
            code,
            count,
        })
        .collect()
}

/// Newest filings first, by numeric application date.
pub fn recent_patents(items: &[PatentRecord], limit: usize) -> Vec<RecentPatent> {
    let mut ordered: Vec<&PatentRecord> = items.iter().collect();
    ordered.sort_by(|a, b| b.application_date_value().cmp(&a.application_date_value()));

    ordered
        .into_iter()
        .take(limit)
        .map(|record| {
            let (ipc_main, ipc_name) = resolve(&record.ipc_number);
            RecentPatent {
                application_number: record.application_number.clone(),
                applicant_name: record.applicant_name.clone(),
                invention_title: record.invention_title.clone(),
                application_date: record.application_date.clone(),
                register_status: record.register_status.clone(),
                ipc_main,
                ipc_name: ipc_name.to_string(),
            }
        })
        .collect()
}
