//! Core domain model for patentflow patent analytics.
//!
//! This crate defines the fundamental types used throughout the system:
//! - `SearchQuery`: applicant + application date range (+ optional filters)
//! - `PatentRecord`: a patent record as returned by the KIPRIS registry
//! - `RegistrationStatus`: the closed set of registry status labels
//! - `Page` / `SearchPage`: one page of registry results
//! - `SummaryResult`: aggregate statistics over a complete result set

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Registration status of a patent application.
///
/// The registry reports statuses as Korean labels in records but expects a
/// single-letter code when filtering. Both directions go through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistrationStatus {
    /// 공개 (laid open)
    Published,
    /// 취하
    Withdrawn,
    /// 소멸
    Extinguished,
    /// 포기
    Abandoned,
    /// 무효
    Invalidated,
    /// 거절
    Rejected,
    /// 등록
    Registered,
    /// No status given, or a label we do not know
    Unspecified,
}

/// (status, Korean label, upstream code)
static STATUS_TABLE: [(RegistrationStatus, &str, &str); 7] = [
    (RegistrationStatus::Published, "공개", "A"),
    (RegistrationStatus::Withdrawn, "취하", "C"),
    (RegistrationStatus::Extinguished, "소멸", "F"),
    (RegistrationStatus::Abandoned, "포기", "G"),
    (RegistrationStatus::Invalidated, "무효", "I"),
    (RegistrationStatus::Rejected, "거절", "J"),
    (RegistrationStatus::Registered, "등록", "R"),
];

impl Default for RegistrationStatus {
    fn default() -> Self {
        Self::Unspecified
    }
}

impl RegistrationStatus {
    /// All statuses that have a label and code.
    pub fn known() -> impl Iterator<Item = RegistrationStatus> {
        STATUS_TABLE.iter().map(|(status, _, _)| *status)
    }

    /// Parse a Korean status label as it appears in registry records.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim();
        STATUS_TABLE
            .iter()
            .find(|(_, l, _)| *l == label)
            .map(|(status, _, _)| *status)
            .unwrap_or_default()
    }

    /// Parse a single-letter upstream status code.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim();
        STATUS_TABLE
            .iter()
            .find(|(_, _, c)| c.eq_ignore_ascii_case(code))
            .map(|(status, _, _)| *status)
            .unwrap_or_default()
    }

    /// Korean label, empty for `Unspecified`.
    pub fn label(&self) -> &'static str {
        STATUS_TABLE
            .iter()
            .find(|(status, _, _)| status == self)
            .map(|(_, label, _)| *label)
            .unwrap_or("")
    }

    /// Upstream filter code, empty for `Unspecified`.
    pub fn code(&self) -> &'static str {
        STATUS_TABLE
            .iter()
            .find(|(status, _, _)| status == self)
            .map(|(_, _, code)| *code)
            .unwrap_or("")
    }
}

/// A patent record as returned by the registry.
///
/// Dates are the registry's `YYYYMMDD` strings. `ipc_number` is the raw
/// pipe-delimited classification list; the first entry is the primary one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatentRecord {
    pub application_number: String,

    #[serde(default)]
    pub applicant_name: String,

    #[serde(default)]
    pub application_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invention_title: Option<String>,

    /// Pipe-delimited IPC codes, e.g. `G06F 17/30|H04L 29/06`
    #[serde(default)]
    pub ipc_number: String,

    /// Korean status label (`등록`, `거절`, ...), possibly empty
    #[serde(default)]
    pub register_status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_number: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub register_number: Option<String>,

    /// Abstract text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abstract_text: Option<String>,

    /// Representative drawing URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drawing: Option<String>,
}

impl PatentRecord {
    /// Create a minimal record for testing.
    pub fn new(application_number: impl Into<String>, application_date: impl Into<String>) -> Self {
        Self {
            application_number: application_number.into(),
            application_date: application_date.into(),
            ..Default::default()
        }
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.register_status = status.into();
        self
    }

    pub fn with_ipc(mut self, ipc_number: impl Into<String>) -> Self {
        self.ipc_number = ipc_number.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.invention_title = Some(title.into());
        self
    }

    pub fn with_applicant(mut self, applicant: impl Into<String>) -> Self {
        self.applicant_name = applicant.into();
        self
    }

    /// Typed view of the status label.
    pub fn status(&self) -> RegistrationStatus {
        RegistrationStatus::from_label(&self.register_status)
    }

    /// Application date as a number; malformed dates sort as 0.
    pub fn application_date_value(&self) -> u64 {
        self.application_date.trim().parse().unwrap_or(0)
    }
}

/// Query parameters for a registry search.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    /// Applicant name to search for
    pub applicant: String,

    /// First application date, `YYYYMMDD`
    pub start_date: String,

    /// Last application date, `YYYYMMDD`
    pub end_date: String,

    /// Invention title filter (advanced search)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invention_title: Option<String>,

    /// Status filter (advanced search)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<RegistrationStatus>,
}

impl SearchQuery {
    pub fn new(
        applicant: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            applicant: applicant.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            ..Default::default()
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.invention_title = Some(title.into());
        self
    }

    pub fn with_status(mut self, status: RegistrationStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// The combined `start~end` filter the registry expects.
    pub fn date_range(&self) -> String {
        format!("{}~{}", self.start_date, self.end_date)
    }
}

/// One page of registry results, normalized from the XML envelope.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub items: Vec<PatentRecord>,
    pub total_count: u64,
    pub page_size: u32,
    pub page_no: u32,
}

impl Page {
    /// Number of pages needed to cover `total_count`.
    pub fn total_pages(&self) -> u32 {
        total_pages(self.total_count, self.page_size)
    }
}

/// `ceil(total_count / page_size)`, with a zero page size treated as one.
pub fn total_pages(total_count: u64, page_size: u32) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = total_count.div_ceil(page_size);
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// A single page of search results as handed to callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage {
    pub total: u64,
    pub page: u32,
    pub total_pages: u32,
    pub patents: Vec<PatentRecord>,
}

impl From<Page> for SearchPage {
    fn from(page: Page) -> Self {
        Self {
            total: page.total_count,
            page: page.page_no,
            total_pages: page.total_pages(),
            patents: page.items,
        }
    }
}

/// Number of applications filed in one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyCount {
    /// `YYYY-MM`
    pub month: String,
    pub count: u64,
}

/// Count of records sharing a main IPC code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationCount {
    pub code: String,
    /// Korean category name, or the unknown sentinel
    pub name: String,
    pub count: u64,
}

/// Condensed view of a recent filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentPatent {
    pub application_number: String,
    pub applicant_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invention_title: Option<String>,
    pub application_date: String,
    pub register_status: String,
    /// Main IPC code (first four characters of the primary code)
    pub ipc_main: Option<String>,
    pub ipc_name: String,
}

/// Aggregate statistics over a complete result set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryResult {
    pub total_count: u64,
    pub status_counts: BTreeMap<String, u64>,
    /// Percent of `total_count`, rounded to two decimals
    pub status_percent: BTreeMap<String, f64>,
    /// Ascending by month
    pub monthly_trend: Vec<MonthlyCount>,
    /// Descending by count, at most five entries by default
    pub top_classifications: Vec<ClassificationCount>,
    /// Newest first, at most three entries by default
    pub recent_patents: Vec<RecentPatent>,
    /// Mean of the trailing six months of the trend
    pub avg_monthly_count: f64,
}

impl SummaryResult {
    /// Share of registered (`등록`) applications, in percent.
    pub fn registration_rate(&self) -> f64 {
        self.status_percent
            .get(RegistrationStatus::Registered.label())
            .copied()
            .unwrap_or(0.0)
    }
}
