//! AWS SDK client configured for unsigned requests.

use async_trait::async_trait;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::list_objects_v2::{ListObjectsV2Error, ListObjectsV2Output};
use tracing::{debug, instrument, warn};

use super::document::DEFAULT_MAX_PAGES;
use super::{IndexError, IndexResult, ObjectIndexStrategy, StrategyKind};

/// Lists a prefix with `ListObjectsV2` through the SDK.
#[derive(Clone)]
pub struct SdkStrategy {
    client: aws_sdk_s3::Client,
    bucket: String,
    max_pages: usize,
}

impl SdkStrategy {
    /// Client for a public bucket; no credentials are looked up or sent.
    pub async fn anonymous(bucket: impl Into<String>, region: impl Into<String>) -> Self {
        let aws_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.into()))
            .no_credentials()
            .load()
            .await;

        Self::with_client(aws_sdk_s3::Client::new(&aws_config), bucket)
    }

    pub fn with_client(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

#[async_trait]
impl ObjectIndexStrategy for SdkStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Sdk
    }

    #[instrument(skip(self), fields(strategy = "sdk", bucket = %self.bucket))]
    async fn list(&self, prefix: &str) -> IndexResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        for page_number in 1..=self.max_pages {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(ref token) = continuation_token {
                request = request.continuation_token(token.clone());
            }

            let response = request.send().await.map_err(classify_sdk_error)?;

            let (page_keys, next) = keys_from_output(&response);
            debug!(page = page_number, count = page_keys.len(), "Fetched SDK listing page");
            keys.extend(page_keys);

            match next {
                Some(token) => continuation_token = Some(token),
                None => return Ok(keys),
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

/// Keys of one page and the token for the next, if the page was truncated.
pub fn keys_from_output(output: &ListObjectsV2Output) -> (Vec<String>, Option<String>) {
    let keys = output
        .contents()
        .iter()
        .filter_map(|object| object.key().map(str::to_string))
        .collect();

    let next = if output.is_truncated() == Some(true) {
        output.next_continuation_token().map(str::to_string)
    } else {
        None
    };

    (keys, next)
}

fn classify_sdk_error<R>(err: SdkError<ListObjectsV2Error, R>) -> IndexError
where
    R: std::fmt::Debug,
{
    let detail = DisplayErrorContext(&err).to_string();
    match &err {
        SdkError::ServiceError(service) => {
            let inner = service.err();
            if inner.is_no_such_bucket() {
                return IndexError::NotFound(detail);
            }
            match inner.code() {
                Some("NoSuchKey") => IndexError::NotFound(detail),
                Some("AccessDenied")
                | Some("AllAccessDisabled")
                | Some("PermanentRedirect")
                | Some("AuthorizationHeaderMalformed")
                | Some("InvalidBucketName") => IndexError::Rejected(detail),
                _ => IndexError::Unreachable(detail),
            }
        }
        SdkError::ConstructionFailure(_) => IndexError::Rejected(detail),
        SdkError::ResponseError(_) => IndexError::Malformed(detail),
        _ => IndexError::Unreachable(detail),
    }
}
