//! Paginated retrieval of complete result sets.
//!
//! `PagedFetcher` reads page 1 to learn the total count, then requests the
//! remaining pages in batches of at most `concurrency_limit` concurrent
//! calls, sleeping `batch_delay` before each batch to stay under the
//! registry's rate limit. Any failed page fails the whole fetch.

use patentflow_backend_kipris::{PatentRegistry, UpstreamError};
use patentflow_model::{total_pages, Page, PatentRecord, SearchQuery};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Configuration for paginated fetches.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Rows requested per page
    pub page_size: u32,
    /// Maximum concurrent page requests in one batch
    pub concurrency_limit: usize,
    /// Pause before each batch after page 1
    pub batch_delay: Duration,
    /// Largest page count accepted from the registry's `totalCount`
    pub max_pages: u32,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            page_size: 100,
            concurrency_limit: 5,
            batch_delay: Duration::from_millis(200),
            max_pages: 10_000,
        }
    }
}

/// Split pages `2..=total_pages` into batches of at most `concurrency_limit`.
///
/// Batches are produced lazily, one range at a time.
pub fn plan_batches(
    total_pages: u32,
    concurrency_limit: usize,
) -> impl Iterator<Item = RangeInclusive<u32>> {
    let step = u32::try_from(concurrency_limit.max(1)).unwrap_or(u32::MAX);
    (2..=total_pages)
        .step_by(step as usize)
        .map(move |start| start..=start.saturating_add(step - 1).min(total_pages))
}

/// Drives a registry until every page of a query has been retrieved.
pub struct PagedFetcher<R> {
    registry: Arc<R>,
    config: FetchConfig,
}

impl<R> PagedFetcher<R>
where
    R: PatentRegistry + Send + Sync + 'static,
{
    pub fn new(registry: Arc<R>, config: FetchConfig) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Retrieve every record for `query`, in page order.
    pub async fn fetch_all(&self, query: &SearchQuery) -> Result<Vec<PatentRecord>, UpstreamError> {
        let page_size = self.config.page_size.max(1);

        let first = self.registry.fetch_page(query, 1, page_size).await?;
        let pages = total_pages(first.total_count, page_size);
        if pages > self.config.max_pages {
            return Err(UpstreamError::Parse(format!(
                "totalCount {} needs {} pages, more than the limit of {}",
                first.total_count, pages, self.config.max_pages
            )));
        }

        tracing::info!(
            registry = self.registry.name(),
            applicant = %query.applicant,
            total_count = first.total_count,
            total_pages = pages,
            "Fetching complete result set"
        );

        let mut items = first.items;
        if pages <= 1 {
            return Ok(items);
        }

        let step = u32::try_from(self.config.concurrency_limit.max(1)).unwrap_or(u32::MAX);
        let batch_count = (pages - 1).div_ceil(step);
        for (idx, batch) in plan_batches(pages, self.config.concurrency_limit).enumerate() {
            if !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }

            tracing::debug!(batch = idx + 1, of = batch_count, pages = ?batch, "Fetching batch");

            for page in self.fetch_batch(query, batch, page_size).await? {
                items.extend(page.items);
            }
        }

        Ok(items)
    }

    /// Fetch `pages` concurrently; results come back sorted by page number.
    async fn fetch_batch(
        &self,
        query: &SearchQuery,
        pages: RangeInclusive<u32>,
        page_size: u32,
    ) -> Result<Vec<Page>, UpstreamError> {
        let mut joins = JoinSet::new();
        for page_no in pages {
            let registry = Arc::clone(&self.registry);
            let query = query.clone();
            joins.spawn(async move {
                let result = registry.fetch_page(&query, page_no, page_size).await;
                (page_no, result)
            });
        }

        let mut fetched = Vec::with_capacity(joins.len());
        while let Some(joined) = joins.join_next().await {
            let (page_no, result) = joined
                .map_err(|e| UpstreamError::Connection(format!("page task failed: {e}")))?;
            match result {
                Ok(page) => fetched.push((page_no, page)),
                Err(err) => {
                    tracing::warn!(page_no, error = %err, "Page fetch failed, aborting batch");
                    joins.abort_all();
                    return Err(err);
                }
            }
        }

        fetched.sort_by_key(|(page_no, _)| *page_no);
        Ok(fetched.into_iter().map(|(_, page)| page).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// In-memory registry serving `total` records in stable pages.
    struct FakeRegistry {
        total: u64,
        fail_page: Option<u32>,
        panic_page: Option<u32>,
        calls: Mutex<Vec<u32>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeRegistry {
        fn new(total: u64) -> Self {
            Self {
                total,
                fail_page: None,
                panic_page: None,
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        fn failing_on(mut self, page_no: u32) -> Self {
            self.fail_page = Some(page_no);
            self
        }

        fn panicking_on(mut self, page_no: u32) -> Self {
            self.panic_page = Some(page_no);
            self
        }

        fn calls(&self) -> Vec<u32> {
            let mut calls = self.calls.lock().unwrap().clone();
            calls.sort_unstable();
            calls
        }
    }

    impl PatentRegistry for FakeRegistry {
        async fn fetch_page(
            &self,
            _query: &SearchQuery,
            page_no: u32,
            page_size: u32,
        ) -> Result<Page, UpstreamError> {
            self.calls.lock().unwrap().push(page_no);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            // Lower pages finish last so arrival order differs from page order.
            tokio::time::sleep(Duration::from_millis(u64::from(50 - page_no % 50))).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.panic_page == Some(page_no) {
                panic!("registry crashed on page {page_no}");
            }
            if self.fail_page == Some(page_no) {
                return Err(UpstreamError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }

            let start = u64::from(page_no - 1) * u64::from(page_size);
            let end = (start + u64::from(page_size)).min(self.total);
            let items = (start..end)
                .map(|i| PatentRecord::new(format!("{i:013}"), "20230105"))
                .collect();

            Ok(Page {
                items,
                total_count: self.total,
                page_size,
                page_no,
            })
        }

        async fn fetch_detail(
            &self,
            _application_number: &str,
        ) -> Result<Option<PatentRecord>, UpstreamError> {
            Ok(None)
        }

        async fn health_check(&self) -> Result<(), UpstreamError> {
            Ok(())
        }

        fn name(&self) -> &'static str {
            "fake"
        }
    }

    fn query() -> SearchQuery {
        SearchQuery::new("ACME", "20230101", "20231231")
    }

    fn numbers(items: &[PatentRecord]) -> Vec<String> {
        items.iter().map(|r| r.application_number.clone()).collect()
    }

    fn batches(total_pages: u32, concurrency_limit: usize) -> Vec<Vec<u32>> {
        plan_batches(total_pages, concurrency_limit)
            .map(|batch| batch.collect())
            .collect()
    }

    #[test]
    fn test_plan_batches() {
        assert_eq!(batches(0, 5), Vec::<Vec<u32>>::new());
        assert_eq!(batches(1, 5), Vec::<Vec<u32>>::new());
        assert_eq!(batches(3, 5), vec![vec![2, 3]]);
        assert_eq!(
            batches(12, 5),
            vec![vec![2, 3, 4, 5, 6], vec![7, 8, 9, 10, 11], vec![12]]
        );
        assert_eq!(batches(3, 0), vec![vec![2], vec![3]]);
    }

    #[test]
    fn test_plan_batches_is_lazy_at_the_page_limit() {
        let mut plan = plan_batches(u32::MAX, 5);
        assert_eq!(plan.next(), Some(2..=6));
        assert_eq!(plan.next(), Some(7..=11));

        let last = plan_batches(u32::MAX, usize::MAX).last();
        assert_eq!(last, Some(2..=u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_all_three_pages() {
        let registry = Arc::new(FakeRegistry::new(250));
        let fetcher = PagedFetcher::new(Arc::clone(&registry), FetchConfig::default());

        let items = fetcher.fetch_all(&query()).await.unwrap();

        assert_eq!(registry.calls(), vec![1, 2, 3]);
        assert_eq!(items.len(), 250);
        let expected: Vec<String> = (0..250u64).map(|i| format!("{i:013}")).collect();
        assert_eq!(numbers(&items), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_page_has_no_delay() {
        let registry = Arc::new(FakeRegistry::new(40));
        let fetcher = PagedFetcher::new(Arc::clone(&registry), FetchConfig::default());

        let start = Instant::now();
        let items = fetcher.fetch_all(&query()).await.unwrap();

        assert_eq!(items.len(), 40);
        assert_eq!(registry.calls(), vec![1]);
        assert!(start.elapsed() < Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_results() {
        let registry = Arc::new(FakeRegistry::new(0));
        let fetcher = PagedFetcher::new(Arc::clone(&registry), FetchConfig::default());

        let items = fetcher.fetch_all(&query()).await.unwrap();

        assert!(items.is_empty());
        assert_eq!(registry.calls(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_batches_are_bounded_and_paced() {
        let registry = Arc::new(FakeRegistry::new(1_150));
        let fetcher = PagedFetcher::new(Arc::clone(&registry), FetchConfig::default());

        let start = Instant::now();
        let items = fetcher.fetch_all(&query()).await.unwrap();

        assert_eq!(items.len(), 1_150);
        assert_eq!(registry.calls(), (1..=12).collect::<Vec<u32>>());
        assert_eq!(registry.max_in_flight.load(Ordering::SeqCst), 5);
        // three batches (5, 5, 1 pages), each preceded by the pacing delay
        assert!(start.elapsed() >= Duration::from_millis(600));

        let expected: Vec<String> = (0..1_150u64).map(|i| format!("{i:013}")).collect();
        assert_eq!(numbers(&items), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_concurrency() {
        let registry = Arc::new(FakeRegistry::new(100));
        let config = FetchConfig {
            page_size: 20,
            concurrency_limit: 2,
            batch_delay: Duration::ZERO,
            ..FetchConfig::default()
        };
        let fetcher = PagedFetcher::new(Arc::clone(&registry), config);

        let items = fetcher.fetch_all(&query()).await.unwrap();

        assert_eq!(items.len(), 100);
        assert_eq!(registry.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_page_fails_everything() {
        let registry = Arc::new(FakeRegistry::new(1_000).failing_on(4));
        let fetcher = PagedFetcher::new(Arc::clone(&registry), FetchConfig::default());

        let result = fetcher.fetch_all(&query()).await;

        assert!(matches!(result, Err(UpstreamError::Status { status: 500, .. })));
        // pages after the failing batch are never requested
        assert!(registry.calls().iter().all(|&page| page <= 6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_page_failure() {
        let registry = Arc::new(FakeRegistry::new(250).failing_on(1));
        let fetcher = PagedFetcher::new(Arc::clone(&registry), FetchConfig::default());

        assert!(fetcher.fetch_all(&query()).await.is_err());
        assert_eq!(registry.calls(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_absurd_total_count_is_rejected() {
        let registry = Arc::new(FakeRegistry::new(u64::MAX));
        let fetcher = PagedFetcher::new(Arc::clone(&registry), FetchConfig::default());

        let result = fetcher.fetch_all(&query()).await;

        assert!(matches!(result, Err(UpstreamError::Parse(_))));
        assert_eq!(registry.calls(), vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_page_limit_is_inclusive() {
        let registry = Arc::new(FakeRegistry::new(300));
        let config = FetchConfig {
            max_pages: 3,
            ..FetchConfig::default()
        };
        let fetcher = PagedFetcher::new(Arc::clone(&registry), config);
        assert_eq!(fetcher.fetch_all(&query()).await.unwrap().len(), 300);

        let registry = Arc::new(FakeRegistry::new(301));
        let config = FetchConfig {
            max_pages: 3,
            ..FetchConfig::default()
        };
        let fetcher = PagedFetcher::new(Arc::clone(&registry), config);
        assert!(matches!(
            fetcher.fetch_all(&query()).await,
            Err(UpstreamError::Parse(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicked_page_task_fails_everything() {
        let registry = Arc::new(FakeRegistry::new(500).panicking_on(3));
        let fetcher = PagedFetcher::new(Arc::clone(&registry), FetchConfig::default());

        let result = fetcher.fetch_all(&query()).await;

        assert!(matches!(result, Err(UpstreamError::Connection(_))));
    }
}
