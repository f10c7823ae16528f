//! Archive fixtures: object names, hour listings and index documents.

/// Public archive bucket used throughout the tests.
pub const BUCKET: &str = "noaa-goes16";

/// Full-disk Cloud and Moisture Imagery product.
pub const PRODUCT: &str = "ABI-L2-CMIPF";

/// Object key for one ABI granule.
///
/// `marker` is the scan-mode marker (`"M3"` or `"M6"`), `band` the channel
/// number and `minute_second` the `MMSSt` part of the start stamp.
///
/// ```
/// use test_utils::abi_object_key;
///
/// let key = abi_object_key(2025, 365, 18, "M6", 13, "00205");
/// assert_eq!(
///     key,
///     "ABI-L2-CMIPF/2025/365/18/OR_ABI-L2-CMIPF-M6C13_G16_s20253651800205_e20253651809513_c20253651809580.nc"
/// );
/// ```
pub fn abi_object_key(
    year: i32,
    day_of_year: u32,
    hour: u32,
    marker: &str,
    band: u8,
    minute_second: &str,
) -> String {
    format!(
        "{product}/{year}/{doy:03}/{hour:02}/{name}",
        product = PRODUCT,
        year = year,
        doy = day_of_year,
        hour = hour,
        name = abi_object_name(year, day_of_year, hour, marker, band, minute_second),
    )
}

/// File name part of [`abi_object_key`].
pub fn abi_object_name(
    year: i32,
    day_of_year: u32,
    hour: u32,
    marker: &str,
    band: u8,
    minute_second: &str,
) -> String {
    let stamp = format!("{}{:03}{:02}", year, day_of_year, hour);
    format!(
        "OR_{}-{}C{:02}_G16_s{}{}_e{}09513_c{}09580.nc",
        PRODUCT, marker, band, stamp, minute_second, stamp, stamp
    )
}

/// A realistic hour listing: every channel in `bands` at the 00, 10, 20,
/// 30, 40 and 50 minute marks, plus a stray non-imagery object.
pub fn hour_listing(year: i32, day_of_year: u32, hour: u32, marker: &str, bands: &[u8]) -> Vec<String> {
    let mut keys = Vec::new();
    for minute in ["00", "10", "20", "30", "40", "50"] {
        for &band in bands {
            keys.push(abi_object_key(
                year,
                day_of_year,
                hour,
                marker,
                band,
                &format!("{}205", minute),
            ));
        }
    }
    keys.push(format!(
        "{}/{}/{:03}/{:02}/README.txt",
        PRODUCT, year, day_of_year, hour
    ));
    keys
}

/// How element names are written in a generated listing document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentStyle {
    /// Default S3 namespace on the root element
    Namespaced,
    /// Namespace bound to a prefix (`s3:Key`)
    Prefixed,
    /// No namespace at all
    Bare,
}

/// A `ListBucketResult` document listing `keys`.
pub fn listing_document(
    keys: &[String],
    truncated: bool,
    next_token: Option<&str>,
    style: DocumentStyle,
) -> String {
    let (open_root, p) = match style {
        DocumentStyle::Namespaced => (
            r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">"#.to_string(),
            "",
        ),
        DocumentStyle::Prefixed => (
            r#"<s3:ListBucketResult xmlns:s3="http://s3.amazonaws.com/doc/2006-03-01/">"#
                .to_string(),
            "s3:",
        ),
        DocumentStyle::Bare => ("<ListBucketResult>".to_string(), ""),
    };

    let mut doc = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    doc.push('\n');
    doc.push_str(&open_root);
    doc.push_str(&format!("<{p}Name>{}</{p}Name>", BUCKET, p = p));
    doc.push_str(&format!("<{p}KeyCount>{}</{p}KeyCount>", keys.len(), p = p));
    doc.push_str(&format!(
        "<{p}IsTruncated>{}</{p}IsTruncated>",
        truncated,
        p = p
    ));
    if let Some(token) = next_token {
        doc.push_str(&format!(
            "<{p}NextContinuationToken>{}</{p}NextContinuationToken>",
            token,
            p = p
        ));
    }
    for key in keys {
        doc.push_str(&format!(
            "<{p}Contents><{p}Key>{}</{p}Key><{p}Size>27000000</{p}Size>\
             <{p}StorageClass>STANDARD</{p}StorageClass></{p}Contents>",
            key,
            p = p
        ));
    }
    doc.push_str(&format!("</{p}ListBucketResult>", p = p));
    doc
}

/// An S3 `<Error>` document.
pub fn error_document(code: &str, message: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>{}</Code><Message>{}</Message><RequestId>TESTREQUEST</RequestId></Error>"#,
        code, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_key_layout() {
        let key = abi_object_key(2025, 1, 0, "M3", 2, "00205");
        assert!(key.starts_with("ABI-L2-CMIPF/2025/001/00/OR_ABI-L2-CMIPF-M3C02_G16_s2025001000"));
        assert!(key.ends_with(".nc"));
    }

    #[test]
    fn test_hour_listing_counts() {
        let keys = hour_listing(2025, 365, 18, "M6", &[2, 13]);
        assert_eq!(keys.len(), 6 * 2 + 1);
        assert_eq!(keys.iter().filter(|k| k.contains("M6C13")).count(), 6);
    }

    #[test]
    fn test_listing_document_styles() {
        let keys = vec!["a/b.nc".to_string()];
        let doc = listing_document(&keys, true, Some("tok"), DocumentStyle::Prefixed);
        assert!(doc.contains("<s3:Key>a/b.nc</s3:Key>"));
        assert!(doc.contains("<s3:NextContinuationToken>tok</s3:NextContinuationToken>"));

        let doc = listing_document(&keys, false, None, DocumentStyle::Bare);
        assert!(doc.contains("<Key>a/b.nc</Key>"));
        assert!(doc.contains("<IsTruncated>false</IsTruncated>"));
        assert!(!doc.contains("xmlns"));
    }
}
