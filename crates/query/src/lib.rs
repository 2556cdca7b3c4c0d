//! Query translation and validation.
//!
//! Converts abstract `SearchQuery` values into backend-specific request
//! parameters:
//! - KIPRIS advanced-search query string
//! - Detail lookup by application number

use patentflow_model::SearchQuery;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("Empty applicant name")]
    EmptyApplicant,
    #[error("Invalid date '{0}', expected YYYYMMDD")]
    InvalidDate(String),
    #[error("Start date {start} is after end date {end}")]
    InvertedRange { start: String, end: String },
    #[error("Page number and page size must be at least 1")]
    InvalidPage,
    #[error("Empty application number")]
    EmptyApplicationNumber,
}

/// A request for one page of search results.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    pub query: &'a SearchQuery,
    pub page_no: u32,
    pub page_size: u32,
}

/// A request for a single record by application number.
#[derive(Debug, Clone, Copy)]
pub struct DetailRequest<'a> {
    pub application_number: &'a str,
}

/// Trait for translating requests to backend-specific syntax.
pub trait QueryDialect<Request> {
    /// The output type (query parameters, a query string, ...)
    type Output;

    /// Translate a request to this dialect
    fn translate(&self, request: &Request) -> Result<Self::Output, QueryError>;
}

/// Ordered `(name, value)` pairs, ready for `reqwest::RequestBuilder::query`.
pub type QueryParams = Vec<(&'static str, String)>;

/// KIPRIS `getAdvancedSearch` parameter generator.
///
/// The service key is appended by the backend, not here.
#[derive(Debug, Default)]
pub struct KiprisDialect;

impl QueryDialect<PageRequest<'_>> for KiprisDialect {
    type Output = QueryParams;

    fn translate(&self, request: &PageRequest<'_>) -> Result<QueryParams, QueryError> {
        validate(request.query)?;
        if request.page_no == 0 || request.page_size == 0 {
            return Err(QueryError::InvalidPage);
        }

        let query = request.query;
        let mut params = vec![
            ("applicant", query.applicant.trim().to_string()),
            ("patent", "true".to_string()),
            ("applicationDate", query.date_range()),
        ];

        if let Some(title) = query.invention_title.as_deref().map(str::trim) {
            if !title.is_empty() {
                params.push(("inventionTitle", title.to_string()));
            }
        }

        if let Some(status) = query.status {
            let code = status.code();
            if !code.is_empty() {
                params.push(("lastvalue", code.to_string()));
            }
        }

        params.push(("numOfRows", request.page_size.to_string()));
        params.push(("pageNo", request.page_no.to_string()));

        Ok(params)
    }
}

impl QueryDialect<DetailRequest<'_>> for KiprisDialect {
    type Output = QueryParams;

    fn translate(&self, request: &DetailRequest<'_>) -> Result<QueryParams, QueryError> {
        let number = request.application_number.trim();
        if number.is_empty() {
            return Err(QueryError::EmptyApplicationNumber);
        }
        Ok(vec![("applicationNumber", number.to_string())])
    }
}

/// Check that a query is well formed before it is sent upstream.
pub fn validate(query: &SearchQuery) -> Result<(), QueryError> {
    if query.applicant.trim().is_empty() {
        return Err(QueryError::EmptyApplicant);
    }
    validate_date(&query.start_date)?;
    validate_date(&query.end_date)?;
    if query.start_date > query.end_date {
        return Err(QueryError::InvertedRange {
            start: query.start_date.clone(),
            end: query.end_date.clone(),
        });
    }
    Ok(())
}

/// `YYYYMMDD` with a plausible month and day.
pub fn validate_date(date: &str) -> Result<(), QueryError> {
    let invalid = || QueryError::InvalidDate(date.to_string());

    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let month: u32 = date[4..6].parse().map_err(|_| invalid())?;
    let day: u32 = date[6..8].parse().map_err(|_| invalid())?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentflow_model::RegistrationStatus;
    use pretty_assertions::assert_eq;

    fn param<'a>(params: &'a QueryParams, name: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_kipris_basic() {
        let query = SearchQuery::new("삼성전자", "20230101", "20231231");
        let request = PageRequest { query: &query, page_no: 2, page_size: 100 };
        let params = KiprisDialect.translate(&request).unwrap();

        assert_eq!(param(&params, "applicant"), Some("삼성전자"));
        assert_eq!(param(&params, "applicationDate"), Some("20230101~20231231"));
        assert_eq!(param(&params, "numOfRows"), Some("100"));
        assert_eq!(param(&params, "pageNo"), Some("2"));
        assert_eq!(param(&params, "patent"), Some("true"));
        assert_eq!(param(&params, "inventionTitle"), None);
        assert_eq!(param(&params, "lastvalue"), None);
    }

    #[test]
    fn test_kipris_advanced() {
        let query = SearchQuery::new("LG전자", "20220101", "20221231")
            .with_title(" 배터리 ")
            .with_status(RegistrationStatus::Registered);
        let request = PageRequest { query: &query, page_no: 1, page_size: 20 };
        let params = KiprisDialect.translate(&request).unwrap();

        assert_eq!(param(&params, "inventionTitle"), Some("배터리"));
        assert_eq!(param(&params, "lastvalue"), Some("R"));
    }

    #[test]
    fn test_unspecified_status_omitted() {
        let query = SearchQuery::new("LG전자", "20220101", "20221231")
            .with_status(RegistrationStatus::Unspecified);
        let request = PageRequest { query: &query, page_no: 1, page_size: 20 };
        let params = KiprisDialect.translate(&request).unwrap();
        assert_eq!(param(&params, "lastvalue"), None);
    }

    #[test]
    fn test_invalid_page() {
        let query = SearchQuery::new("LG전자", "20220101", "20221231");
        let request = PageRequest { query: &query, page_no: 0, page_size: 20 };
        assert_eq!(KiprisDialect.translate(&request), Err(QueryError::InvalidPage));
    }

    #[test]
    fn test_detail() {
        let request = DetailRequest { application_number: " 1020230012345 " };
        let params = KiprisDialect.translate(&request).unwrap();
        assert_eq!(params, vec![("applicationNumber", "1020230012345".to_string())]);

        let empty = DetailRequest { application_number: "" };
        assert_eq!(KiprisDialect.translate(&empty), Err(QueryError::EmptyApplicationNumber));
    }

    #[test]
    fn test_empty_applicant_error() {
        let query = SearchQuery::new("   ", "20230101", "20231231");
        assert!(matches!(validate(&query), Err(QueryError::EmptyApplicant)));
    }

    #[test]
    fn test_date_validation() {
        assert!(validate_date("20230105").is_ok());
        assert!(validate_date("2023-01-05").is_err());
        assert!(validate_date("20231301").is_err());
        assert!(validate_date("20230100").is_err());
        assert!(validate_date("2023010").is_err());
    }

    #[test]
    fn test_inverted_range() {
        let query = SearchQuery::new("삼성전자", "20231231", "20230101");
        assert!(matches!(validate(&query), Err(QueryError::InvertedRange { .. })));
    }
}
