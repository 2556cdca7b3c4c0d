//! Patent search and analytics service.
//!
//! The entry point callers use: single-page searches, detail lookups and
//! the summary pipeline (fetch every page, then analyze). Errors from the
//! registry propagate unchanged inside `ServiceError::Upstream`.

use patentflow_analytics::{analyze_with, AnalyticsConfig};
use patentflow_backend_kipris::{PatentRegistry, UpstreamError};
use patentflow_fetch::{FetchConfig, PagedFetcher};
use patentflow_model::{PatentRecord, SearchPage, SearchQuery, SummaryResult};
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("No patent with application number {application_number}")]
    NotFound { application_number: String },
}

/// Configuration for the service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Paging used by the summary pipeline
    pub summary_fetch: FetchConfig,
    /// Rows per page for basic and advanced search
    pub search_page_size: u32,
    pub analytics: AnalyticsConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            summary_fetch: FetchConfig::default(),
            search_page_size: 20,
            analytics: AnalyticsConfig::default(),
        }
    }
}

pub struct PatentService<R> {
    registry: Arc<R>,
    config: ServiceConfig,
}

impl<R> PatentService<R>
where
    R: PatentRegistry + Send + Sync + 'static,
{
    pub fn new(registry: Arc<R>, config: ServiceConfig) -> Self {
        Self { registry, config }
    }

    pub fn registry(&self) -> &R {
        &self.registry
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Summary statistics for every application of `applicant` filed
    /// between `start_date` and `end_date` (`YYYYMMDD`, inclusive).
    pub async fn summarize(
        &self,
        applicant: &str,
        start_date: &str,
        end_date: &str,
    ) -> Result<SummaryResult, ServiceError> {
        self.summarize_query(&SearchQuery::new(applicant, start_date, end_date))
            .await
    }

    /// Like [`summarize`](Self::summarize), for an arbitrary query.
    pub async fn summarize_query(&self, query: &SearchQuery) -> Result<SummaryResult, ServiceError> {
        let items = self.collect_all(query, &self.config.summary_fetch).await?;
        let summary = analyze_with(&items, &self.config.analytics);

        tracing::info!(
            applicant = %query.applicant,
            total_count = summary.total_count,
            months = summary.monthly_trend.len(),
            "Summary computed"
        );

        Ok(summary)
    }

    /// Every record matching `query`, fetched in batches per `fetch`.
    pub async fn collect_all(
        &self,
        query: &SearchQuery,
        fetch: &FetchConfig,
    ) -> Result<Vec<PatentRecord>, ServiceError> {
        let fetcher = PagedFetcher::new(Arc::clone(&self.registry), fetch.clone());
        Ok(fetcher.fetch_all(query).await?)
    }

    /// One page of applications by applicant and date range.
    pub async fn basic_search(
        &self,
        applicant: &str,
        start_date: &str,
        end_date: &str,
        page: u32,
    ) -> Result<SearchPage, ServiceError> {
        let query = SearchQuery::new(applicant, start_date, end_date);
        self.search_page(&query, page).await
    }

    /// One page of applications, honoring title and status filters.
    pub async fn advanced_search(
        &self,
        query: &SearchQuery,
        page: u32,
    ) -> Result<SearchPage, ServiceError> {
        self.search_page(query, page).await
    }

    async fn search_page(&self, query: &SearchQuery, page: u32) -> Result<SearchPage, ServiceError> {
        let page = self
            .registry
            .fetch_page(query, page.max(1), self.config.search_page_size)
            .await?;
        Ok(SearchPage::from(page))
    }

    /// The record with `application_number`.
    pub async fn detail(&self, application_number: &str) -> Result<PatentRecord, ServiceError> {
        self.registry
            .fetch_detail(application_number)
            .await?
            .ok_or_else(|| ServiceError::NotFound {
                application_number: application_number.to_string(),
            })
    }

    pub async fn health_check(&self) -> Result<(), ServiceError> {
        Ok(self.registry.health_check().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentflow_model::Page;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    /// Registry over a fixed record list.
    struct FixtureRegistry {
        records: Vec<PatentRecord>,
        fail: bool,
    }

    impl PatentRegistry for FixtureRegistry {
        async fn fetch_page(
            &self,
            _query: &SearchQuery,
            page_no: u32,
            page_size: u32,
        ) -> Result<Page, UpstreamError> {
            if self.fail {
                return Err(UpstreamError::Connection("connection refused".to_string()));
            }
            let items = self
                .records
                .chunks(page_size as usize)
                .nth(page_no as usize - 1)
                .map(<[PatentRecord]>::to_vec)
                .unwrap_or_default();
            Ok(Page {
                items,
                total_count: self.records.len() as u64,
                page_size,
                page_no,
            })
        }

        async fn fetch_detail(
            &self,
            application_number: &str,
        ) -> Result<Option<PatentRecord>, UpstreamError> {
            Ok(self
                .records
                .iter()
                .find(|r| r.application_number == application_number)
                .cloned())
        }

        async fn health_check(&self) -> Result<(), UpstreamError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fixture"
        }
    }

    fn records(n: usize) -> Vec<PatentRecord> {
        (0..n)
            .map(|i| {
                let status = if i % 3 == 0 { "등록" } else { "거절" };
                PatentRecord::new(format!("{i:013}"), format!("2023{:02}15", i % 12 + 1))
                    .with_status(status)
                    .with_ipc("G06F 17/30")
            })
            .collect()
    }

    fn service(records: Vec<PatentRecord>, fail: bool) -> PatentService<FixtureRegistry> {
        let config = ServiceConfig {
            summary_fetch: FetchConfig {
                batch_delay: Duration::from_millis(1),
                ..FetchConfig::default()
            },
            ..ServiceConfig::default()
        };
        PatentService::new(Arc::new(FixtureRegistry { records, fail }), config)
    }

    #[tokio::test(start_paused = true)]
    async fn test_summarize_spans_all_pages() {
        let service = service(records(250), false);
        let summary = service.summarize("ACME", "20230101", "20231231").await.unwrap();

        assert_eq!(summary.total_count, 250);
        assert_eq!(summary.status_counts.values().sum::<u64>(), 250);
        assert_eq!(summary.monthly_trend.len(), 12);
        assert_eq!(summary.top_classifications[0].code, "G06F");
        assert_eq!(summary.top_classifications[0].count, 250);
        assert_eq!(summary.registration_rate(), 33.6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_summarize_empty_result() {
        let service = service(Vec::new(), false);
        let summary = service.summarize("ACME", "20230101", "20231231").await.unwrap();

        assert_eq!(summary, SummaryResult::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_summarize_propagates_upstream_error() {
        let service = service(records(10), true);
        let result = service.summarize("ACME", "20230101", "20231231").await;

        assert!(matches!(
            result,
            Err(ServiceError::Upstream(UpstreamError::Connection(_)))
        ));
    }

    #[tokio::test]
    async fn test_basic_search_single_page() {
        let service = service(records(45), false);
        let page = service.basic_search("ACME", "20230101", "20231231", 3).await.unwrap();

        assert_eq!(page.total, 45);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.patents.len(), 5);
    }

    #[tokio::test]
    async fn test_page_zero_is_first_page() {
        let service = service(records(45), false);
        let query = SearchQuery::new("ACME", "20230101", "20231231");
        let page = service.advanced_search(&query, 0).await.unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.patents.len(), 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_all_with_search_paging() {
        let service = service(records(45), false);
        let query = SearchQuery::new("ACME", "20230101", "20231231");
        let fetch = FetchConfig {
            page_size: 20,
            concurrency_limit: 2,
            batch_delay: Duration::ZERO,
            ..FetchConfig::default()
        };

        let items = service.collect_all(&query, &fetch).await.unwrap();
        assert_eq!(items.len(), 45);
    }

    #[tokio::test]
    async fn test_detail() {
        let service = service(records(5), false);

        let record = service.detail("0000000000002").await.unwrap();
        assert_eq!(record.application_number, "0000000000002");

        match service.detail("9999999999999").await {
            Err(ServiceError::NotFound { application_number }) => {
                assert_eq!(application_number, "9999999999999");
            }
            other => panic!("expected not found, got {other:?}"),
        }
    }
}
