//! Request header customization

use std::collections::BTreeMap;

use axum::http::HeaderMap;

use crate::error::Result;
use crate::fetcher::transport::OutgoingRequest;
use crate::models::requests::parse_header;
use crate::models::CacheRequest;

/// Merges `custom` over `base`.
///
/// Returns `None` when no custom headers are configured, meaning the request
/// should go out unmodified. A custom header replaces every value `base`
/// carries under the same name.
pub fn custom_headers(
    base: &HeaderMap,
    custom: Option<&BTreeMap<String, String>>,
) -> Result<Option<HeaderMap>> {
    let Some(custom) = custom else {
        return Ok(None);
    };

    let mut merged = base.clone();
    for (name, value) in custom {
        let (name, value) = parse_header(name, value)?;
        merged.insert(name, value);
    }
    Ok(Some(merged))
}

/// Builds the request that is actually sent for `request`.
pub fn build_outgoing(
    request: &CacheRequest,
    custom: Option<&BTreeMap<String, String>>,
) -> Result<OutgoingRequest> {
    let headers = match custom_headers(&request.headers, custom)? {
        Some(merged) => merged,
        None => request.headers.clone(),
    };

    Ok(OutgoingRequest {
        method: request.method.clone(),
        url: request.url.clone(),
        headers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchCacheError;

    #[test]
    fn test_no_custom_headers() {
        let base = HeaderMap::new();
        assert!(custom_headers(&base, None).unwrap().is_none());
    }

    #[test]
    fn test_custom_headers_override_and_merge() {
        let request = CacheRequest::get("https://example.com/")
            .unwrap()
            .with_header("accept", "text/html")
            .unwrap()
            .with_header("x-version", "1")
            .unwrap();
        let custom = BTreeMap::from([
            ("x-version".to_string(), "2".to_string()),
            ("x-auth".to_string(), "secret".to_string()),
        ]);

        let outgoing = build_outgoing(&request, Some(&custom)).unwrap();
        assert_eq!(outgoing.headers.get("accept").unwrap(), "text/html");
        assert_eq!(outgoing.headers.get("x-auth").unwrap(), "secret");
        let versions: Vec<_> = outgoing.headers.get_all("x-version").iter().collect();
        assert_eq!(versions, vec!["2"]);
    }

    #[test]
    fn test_unmodified_without_custom() {
        let request = CacheRequest::get("https://example.com/")
            .unwrap()
            .with_header("accept", "text/html")
            .unwrap();

        let outgoing = build_outgoing(&request, None).unwrap();
        assert_eq!(outgoing.headers, request.headers);
        assert_eq!(outgoing.url, request.url);
    }

    #[test]
    fn test_invalid_custom_header() {
        let custom = BTreeMap::from([("x-bad".to_string(), "line\nbreak".to_string())]);
        let result = custom_headers(&HeaderMap::new(), Some(&custom));
        assert!(matches!(result, Err(FetchCacheError::InvalidRequest(_))));
    }
}
