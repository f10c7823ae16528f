//! Public paginated REST listing (`ListObjectsV2` XML documents).
//!
//! The document is matched by element local name, so
//! `<ListBucketResult xmlns="...">`, `<s3:Key>` and a bare `<Key>` all parse
//! to the same page. `<Error>` documents are mapped to typed failures.

use std::time::Duration;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument, warn};

use super::{IndexError, IndexResult, ObjectIndexStrategy, StrategyKind};

/// Pages fetched before giving up on a single prefix.
pub const DEFAULT_MAX_PAGES: usize = 50;

/// One page of a listing document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    pub keys: Vec<String>,
    pub is_truncated: bool,
    pub next_token: Option<String>,
}

/// Lists a prefix through the bucket's anonymous REST endpoint.
#[derive(Clone)]
pub struct IndexDocumentStrategy {
    client: Client,
    endpoint: String,
    max_pages: usize,
}

impl IndexDocumentStrategy {
    /// `endpoint` is the bucket base URL, e.g. `https://noaa-goes16.s3.amazonaws.com`.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> IndexResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| IndexError::Rejected(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    async fn fetch_page(&self, prefix: &str, token: Option<&str>) -> IndexResult<ListingPage> {
        let url = format!("{}/", self.endpoint);
        let mut query = vec![("list-type", "2"), ("prefix", prefix)];
        if let Some(token) = token {
            query.push(("continuation-token", token));
        }

        let response = self
            .client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| IndexError::Unreachable(format!("GET {}: {}", url, e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| IndexError::Unreachable(format!("reading listing body: {}", e)))?;

        match parse_listing_document(&body) {
            Ok(page) if status.is_success() => Ok(page),
            // An <Error> document explains the failure better than the status
            Err(err @ (IndexError::NotFound(_) | IndexError::Rejected(_))) => Err(err),
            Err(err) if status.is_success() => Err(err),
            _ => Err(classify_status(status, prefix)),
        }
    }
}

#[async_trait]
impl ObjectIndexStrategy for IndexDocumentStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::IndexDocument
    }

    #[instrument(skip(self), fields(strategy = "index_document", endpoint = %self.endpoint))]
    async fn list(&self, prefix: &str) -> IndexResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut token: Option<String> = None;

        for page_number in 1..=self.max_pages {
            let page = self.fetch_page(prefix, token.as_deref()).await?;
            debug!(page = page_number, count = page.keys.len(), "Fetched listing page");
            keys.extend(page.keys);

            if !page.is_truncated {
                return Ok(keys);
            }
            match page.next_token {
                Some(next) => token = Some(next),
                None => {
                    return Err(IndexError::Malformed(
                        "truncated listing without continuation token".to_string(),
                    ))
                }
            }
        }

        warn!(
            max_pages = self.max_pages,
            count = keys.len(),
            "Listing page limit reached, returning partial listing"
        );
        Ok(keys)
    }
}

fn classify_status(status: StatusCode, prefix: &str) -> IndexError {
    match status {
        StatusCode::NOT_FOUND => IndexError::NotFound(prefix.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::MOVED_PERMANENTLY
        | StatusCode::BAD_REQUEST => IndexError::Rejected(format!("HTTP {}", status)),
        _ => IndexError::Unreachable(format!("HTTP {}", status)),
    }
}

/// Map an S3 `<Error><Code>` to a failure class.
fn classify_error_code(code: &str, message: &str) -> IndexError {
    let detail = format!("{}: {}", code, message);
    match code {
        "NoSuchBucket" | "NoSuchKey" => IndexError::NotFound(detail),
        "AccessDenied"
        | "AllAccessDisabled"
        | "InvalidAccessKeyId"
        | "SignatureDoesNotMatch"
        | "AuthorizationHeaderMalformed"
        | "PermanentRedirect"
        | "InvalidBucketName"
        | "InvalidArgument" => IndexError::Rejected(detail),
        _ => IndexError::Unreachable(detail),
    }
}

/// Parse a `ListBucketResult` (or `Error`) document by local element names.
pub fn parse_listing_document(xml: &str) -> IndexResult<ListingPage> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<String> = Vec::new();
    let mut root: Option<String> = None;
    let mut page = ListingPage::default();
    let mut error_code: Option<String> = None;
    let mut error_message = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if root.is_none() {
                    root = Some(name.clone());
                }
                stack.push(name);
            }
            Ok(Event::End(_)) => {
                stack.pop();
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| IndexError::Malformed(format!("bad text: {}", e)))?;
                let current = stack.last().map(String::as_str);
                let parent = stack.len().checked_sub(2).and_then(|i| stack.get(i));

                match (parent.map(String::as_str), current) {
                    (Some("Contents"), Some("Key")) => page.keys.push(text.into_owned()),
                    (_, Some("IsTruncated")) => {
                        page.is_truncated = text.trim().eq_ignore_ascii_case("true")
                    }
                    (_, Some("NextContinuationToken")) => {
                        page.next_token = Some(text.into_owned())
                    }
                    (Some("Error"), Some("Code")) => error_code = Some(text.into_owned()),
                    (Some("Error"), Some("Message")) => error_message = text.into_owned(),
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(IndexError::Malformed(format!(
                    "XML parsing error at position {}: {:?}",
                    reader.buffer_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    match root.as_deref() {
        Some("ListBucketResult") => Ok(page),
        Some("Error") => Err(classify_error_code(
            error_code.as_deref().unwrap_or("Unknown"),
            &error_message,
        )),
        Some(other) => Err(IndexError::Malformed(format!(
            "unexpected root element <{}>",
            other
        ))),
        None => Err(IndexError::Malformed("empty listing document".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{error_document, hour_listing, listing_document, DocumentStyle};

    #[test]
    fn test_styles_parse_identically() {
        let keys = hour_listing(2025, 365, 18, "M6", &[2, 13]);
        let pages: Vec<ListingPage> = [
            DocumentStyle::Namespaced,
            DocumentStyle::Prefixed,
            DocumentStyle::Bare,
        ]
        .into_iter()
        .map(|style| parse_listing_document(&listing_document(&keys, false, None, style)).unwrap())
        .collect();

        assert_eq!(pages[0].keys, keys);
        assert_eq!(pages[0], pages[1]);
        assert_eq!(pages[1], pages[2]);
        assert!(!pages[0].is_truncated);
    }

    #[test]
    fn test_truncated_page_reports_token() {
        let keys = vec!["a/1.nc".to_string()];
        let doc = listing_document(&keys, true, Some("1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM="), DocumentStyle::Namespaced);
        let page = parse_listing_document(&doc).unwrap();
        assert!(page.is_truncated);
        assert_eq!(
            page.next_token.as_deref(),
            Some("1ueGcxLPRx1Tr/XYExHnhbYLgveDs2J/wm36Hy4vbOwM=")
        );
    }

    #[test]
    fn test_empty_listing() {
        let page = parse_listing_document(&listing_document(&[], false, None, DocumentStyle::Bare))
            .unwrap();
        assert!(page.keys.is_empty());
    }

    #[test]
    fn test_error_documents_are_typed() {
        let err = parse_listing_document(&error_document("NoSuchBucket", "gone")).unwrap_err();
        assert!(matches!(err, IndexError::NotFound(_)));

        let err = parse_listing_document(&error_document("AccessDenied", "nope")).unwrap_err();
        assert!(matches!(err, IndexError::Rejected(_)));

        let err = parse_listing_document(&error_document("SlowDown", "busy")).unwrap_err();
        assert!(matches!(err, IndexError::Unreachable(_)));
    }

    #[test]
    fn test_garbage_is_malformed() {
        assert!(matches!(
            parse_listing_document("").unwrap_err(),
            IndexError::Malformed(_)
        ));
        assert!(matches!(
            parse_listing_document("<html><body>hi</body></html>").unwrap_err(),
            IndexError::Malformed(_)
        ));
        assert!(matches!(
            parse_listing_document("<ListBucketResult><Key>x</Wrong>").unwrap_err(),
            IndexError::Malformed(_)
        ));
    }

    #[test]
    fn test_key_outside_contents_ignored() {
        let doc = "<ListBucketResult><Key>stray</Key><Contents><Key>real</Key></Contents></ListBucketResult>";
        assert_eq!(parse_listing_document(doc).unwrap().keys, vec!["real"]);
    }

    #[test]
    fn test_status_classification() {
        assert!(classify_status(StatusCode::NOT_FOUND, "p").is_not_found());
        assert!(matches!(
            classify_status(StatusCode::FORBIDDEN, "p"),
            IndexError::Rejected(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE, "p"),
            IndexError::Unreachable(_)
        ));
    }
}
