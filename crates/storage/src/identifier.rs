//! Object identifier normalization.
//!
//! Listing backends report keys in different shapes: bare keys, `s3://`
//! URIs, virtual-hosted HTTPS URLs or path-style URLs. Every identifier is
//! first reduced to its bucket-relative key and then rendered in the form a
//! consumer needs, so normalizing an already normalized identifier is a
//! no-op.

use serde::{Deserialize, Serialize};

/// Addressing form expected by a consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingForm {
    /// `ABI-L2-CMIPF/2025/365/18/OR_...nc`
    BucketRelative,
    /// `s3://bucket/ABI-L2-CMIPF/...`
    S3Uri,
    /// `https://bucket.s3.amazonaws.com/ABI-L2-CMIPF/...`
    HttpsUrl,
}

/// Strip any scheme, host or bucket prefix from `identifier`.
pub fn bucket_relative_key<'a>(identifier: &'a str, bucket: &str) -> &'a str {
    let mut rest = identifier.trim();

    if let Some(after) = rest.strip_prefix("s3://") {
        rest = after;
        rest = strip_bucket(rest, bucket);
    } else if let Some(after) = rest
        .strip_prefix("https://")
        .or_else(|| rest.strip_prefix("http://"))
    {
        // Host is either `<bucket>.s3[.<region>].amazonaws.com` or a
        // path-style endpoint followed by the bucket
        let (host, path) = after.split_once('/').unwrap_or((after, ""));
        rest = path;
        if !host.starts_with(&format!("{}.", bucket)) {
            rest = strip_bucket(rest, bucket);
        }
    } else {
        rest = rest.trim_start_matches('/');
        rest = strip_bucket(rest, bucket);
    }

    rest.trim_start_matches('/')
}

fn strip_bucket<'a>(path: &'a str, bucket: &str) -> &'a str {
    let path = path.trim_start_matches('/');
    match path.strip_prefix(bucket) {
        Some(after) if after.starts_with('/') => &after[1..],
        Some("") => "",
        _ => path,
    }
}

/// Render `identifier` in `form` for `bucket`.
///
/// ```
/// use storage::{normalize_identifier, AddressingForm};
///
/// let key = "ABI-L2-CMIPF/2025/365/18/OR_x.nc";
/// let uri = normalize_identifier(key, "noaa-goes16", AddressingForm::S3Uri);
/// assert_eq!(uri, "s3://noaa-goes16/ABI-L2-CMIPF/2025/365/18/OR_x.nc");
/// assert_eq!(normalize_identifier(&uri, "noaa-goes16", AddressingForm::S3Uri), uri);
/// ```
pub fn normalize_identifier(identifier: &str, bucket: &str, form: AddressingForm) -> String {
    let key = bucket_relative_key(identifier, bucket);
    match form {
        AddressingForm::BucketRelative => key.to_string(),
        AddressingForm::S3Uri => format!("s3://{}/{}", bucket, key),
        AddressingForm::HttpsUrl => format!("https://{}.s3.amazonaws.com/{}", bucket, key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUCKET: &str = "noaa-goes16";
    const KEY: &str =
        "ABI-L2-CMIPF/2025/365/18/OR_ABI-L2-CMIPF-M6C13_G16_s20253651800205_e20253651809513_c20253651809580.nc";

    fn inputs() -> Vec<String> {
        vec![
            KEY.to_string(),
            format!("/{}", KEY),
            format!("{}/{}", BUCKET, KEY),
            format!("s3://{}/{}", BUCKET, KEY),
            format!("https://{}.s3.amazonaws.com/{}", BUCKET, KEY),
            format!("https://{}.s3.us-east-1.amazonaws.com/{}", BUCKET, KEY),
            format!("https://s3.amazonaws.com/{}/{}", BUCKET, KEY),
        ]
    }

    #[test]
    fn test_every_shape_reduces_to_key() {
        for input in inputs() {
            assert_eq!(bucket_relative_key(&input, BUCKET), KEY, "input {}", input);
        }
    }

    #[test]
    fn test_normalization_is_idempotent() {
        for form in [
            AddressingForm::BucketRelative,
            AddressingForm::S3Uri,
            AddressingForm::HttpsUrl,
        ] {
            for input in inputs() {
                let once = normalize_identifier(&input, BUCKET, form);
                let twice = normalize_identifier(&once, BUCKET, form);
                assert_eq!(once, twice, "{:?} on {}", form, input);
            }
        }
    }

    #[test]
    fn test_forms_render() {
        assert_eq!(
            normalize_identifier(KEY, BUCKET, AddressingForm::HttpsUrl),
            format!("https://noaa-goes16.s3.amazonaws.com/{}", KEY)
        );
        // A product directory that happens to share the bucket's prefix is kept
        assert_eq!(
            bucket_relative_key("noaa-goes16x/a.nc", BUCKET),
            "noaa-goes16x/a.nc"
        );
    }
}
