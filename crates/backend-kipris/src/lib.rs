//! KIPRIS registry backend implementation.
//!
//! Provides the `PatentRegistry` trait and its KIPRIS implementation.
//! One call fetches one page; retries and pagination belong to callers.
//! The registry answers in XML, and the envelope is normalized into a
//! `Page` right here so nothing downstream sees its irregular shape.

use patentflow_model::{Page, PatentRecord, SearchQuery};
use patentflow_query::{DetailRequest, KiprisDialect, PageRequest, QueryDialect, QueryError, QueryParams};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;

/// Result code KIPRIS puts in the envelope header on success.
const SUCCESS_CODE: &str = "00";

/// Errors from registry operations.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Registry rejected request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

/// Trait for patent registries (KIPRIS, test fakes, ...).
pub trait PatentRegistry {
    /// Fetch one page of results for `query`.
    fn fetch_page(
        &self,
        query: &SearchQuery,
        page_no: u32,
        page_size: u32,
    ) -> impl Future<Output = Result<Page, UpstreamError>> + Send;

    /// Look up a single record; `None` when the registry has no match.
    fn fetch_detail(
        &self,
        application_number: &str,
    ) -> impl Future<Output = Result<Option<PatentRecord>, UpstreamError>> + Send;

    /// Check if the registry answers with a well-formed envelope.
    fn health_check(&self) -> impl Future<Output = Result<(), UpstreamError>> + Send;

    /// Get the registry name for logging.
    fn name(&self) -> &'static str;
}

/// KIPRIS backend configuration.
#[derive(Debug, Clone)]
pub struct KiprisConfig {
    /// Base URL of the KIPRIS Plus API
    pub base_url: String,
    /// Path of the advanced search operation
    pub search_path: String,
    /// Issued API key, sent as `ServiceKey`
    pub service_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for KiprisConfig {
    fn default() -> Self {
        Self {
            base_url: "http://plus.kipris.or.kr".to_string(),
            search_path: "/kipo-api/kipi/patUtiModInfoSearchSevice/getAdvancedSearch".to_string(),
            service_key: String::new(),
            timeout_secs: 30,
        }
    }
}

impl KiprisConfig {
    fn search_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.search_path.trim_start_matches('/')
        )
    }
}

/// KIPRIS registry backend.
pub struct KiprisBackend {
    config: KiprisConfig,
    client: reqwest::Client,
    dialect: KiprisDialect,
}

impl KiprisBackend {
    /// Create a new KIPRIS backend.
    pub fn new(config: KiprisConfig) -> Result<Self, UpstreamError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| UpstreamError::Client(e.to_string()))?;

        Ok(Self {
            config,
            client,
            dialect: KiprisDialect,
        })
    }

    pub fn config(&self) -> &KiprisConfig {
        &self.config
    }

    /// Send one GET to the search endpoint and return the raw XML body.
    async fn get_xml(&self, params: &QueryParams) -> Result<String, UpstreamError> {
        let response = self
            .client
            .get(self.config.search_url())
            .query(params)
            .query(&[("ServiceKey", self.config.service_key.as_str())])
            .send()
            .await
            .map_err(|e| UpstreamError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "KIPRIS returned non-success status");
            return Err(UpstreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .text()
            .await
            .map_err(|e| UpstreamError::Connection(e.to_string()))
    }
}

impl PatentRegistry for KiprisBackend {
    async fn fetch_page(
        &self,
        query: &SearchQuery,
        page_no: u32,
        page_size: u32,
    ) -> Result<Page, UpstreamError> {
        let params = self.dialect.translate(&PageRequest {
            query,
            page_no,
            page_size,
        })?;

        tracing::debug!(
            applicant = %query.applicant,
            range = %query.date_range(),
            page_no,
            page_size,
            "Fetching KIPRIS page"
        );

        let xml = self.get_xml(&params).await?;
        parse_envelope(&xml, page_no, page_size)
    }

    async fn fetch_detail(
        &self,
        application_number: &str,
    ) -> Result<Option<PatentRecord>, UpstreamError> {
        let params = self.dialect.translate(&DetailRequest { application_number })?;

        tracing::debug!(application_number, "Fetching KIPRIS detail");

        let xml = self.get_xml(&params).await?;
        let page = parse_envelope(&xml, 1, 1)?;
        Ok(page.items.into_iter().next())
    }

    async fn health_check(&self) -> Result<(), UpstreamError> {
        let check_query = SearchQuery::new("health-check", "20000101", "20000101");
        self.fetch_page(&check_query, 1, 1).await.map(|_| ())
    }

    fn name(&self) -> &'static str {
        "kipris"
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    header: Option<Header>,
    #[serde(default)]
    body: Option<Body>,
    #[serde(default)]
    count: Option<Count>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Header {
    #[serde(default)]
    result_code: Option<String>,
    #[serde(default)]
    result_msg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Body {
    #[serde(default)]
    items: Option<Items>,
}

/// `<items>` holds zero, one or many `<item>` elements; all three land here
/// as a plain sequence.
#[derive(Debug, Deserialize)]
struct Items {
    #[serde(default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Count {
    #[serde(default)]
    num_of_rows: Option<String>,
    #[serde(default)]
    page_no: Option<String>,
    #[serde(default)]
    total_count: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Item {
    #[serde(default)]
    application_number: Option<String>,
    #[serde(default)]
    applicant_name: Option<String>,
    #[serde(default)]
    application_date: Option<String>,
    #[serde(default)]
    invention_title: Option<String>,
    #[serde(default)]
    ipc_number: Option<String>,
    #[serde(default)]
    register_status: Option<String>,
    #[serde(default)]
    open_date: Option<String>,
    #[serde(default)]
    open_number: Option<String>,
    #[serde(default)]
    publication_date: Option<String>,
    #[serde(default)]
    publication_number: Option<String>,
    #[serde(default)]
    register_date: Option<String>,
    #[serde(default)]
    register_number: Option<String>,
    #[serde(default)]
    astrt_cont: Option<String>,
    #[serde(default)]
    drawing: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<Item> for PatentRecord {
    fn from(item: Item) -> Self {
        Self {
            application_number: non_empty(item.application_number).unwrap_or_default(),
            applicant_name: non_empty(item.applicant_name).unwrap_or_default(),
            application_date: non_empty(item.application_date).unwrap_or_default(),
            invention_title: non_empty(item.invention_title),
            ipc_number: non_empty(item.ipc_number).unwrap_or_default(),
            register_status: non_empty(item.register_status).unwrap_or_default(),
            open_date: non_empty(item.open_date),
            open_number: non_empty(item.open_number),
            publication_date: non_empty(item.publication_date),
            publication_number: non_empty(item.publication_number),
            register_date: non_empty(item.register_date),
            register_number: non_empty(item.register_number),
            abstract_text: non_empty(item.astrt_cont),
            drawing: non_empty(item.drawing),
        }
    }
}

fn parse_number<T: std::str::FromStr>(
    field: &str,
    value: Option<String>,
    default: T,
) -> Result<T, UpstreamError> {
    match non_empty(value) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|_| UpstreamError::Parse(format!("{field} is not a number: '{raw}'"))),
    }
}

/// Parse a KIPRIS XML envelope into a `Page`.
///
/// Missing count fields fall back to 0 / the requested page size / the
/// requested page number. A body that is not a KIPRIS envelope at all is an
/// error, never an empty page.
pub fn parse_envelope(xml: &str, page_no: u32, page_size: u32) -> Result<Page, UpstreamError> {
    let envelope: Envelope =
        quick_xml::de::from_str(xml).map_err(|e| UpstreamError::Parse(e.to_string()))?;

    // An HTML error page can still carry a <body>; require a header or count.
    if envelope.header.is_none() && envelope.count.is_none() {
        return Err(UpstreamError::Parse("Missing response envelope".to_string()));
    }

    if let Some(header) = envelope.header {
        if let Some(code) = non_empty(header.result_code) {
            if code != SUCCESS_CODE {
                return Err(UpstreamError::Rejected {
                    code,
                    message: non_empty(header.result_msg).unwrap_or_default(),
                });
            }
        }
    }

    let items: Vec<PatentRecord> = envelope
        .body
        .and_then(|body| body.items)
        .map(|items| items.item.into_iter().map(PatentRecord::from).collect())
        .unwrap_or_default();

    let (total_count, page_size, page_no) = match envelope.count {
        Some(count) => (
            parse_number("totalCount", count.total_count, 0u64)?,
            parse_number("numOfRows", count.num_of_rows, page_size)?,
            parse_number("pageNo", count.page_no, page_no)?,
        ),
        None => (0, page_size, page_no),
    };

    Ok(Page {
        items,
        total_count,
        page_size,
        page_no,
    })
}
