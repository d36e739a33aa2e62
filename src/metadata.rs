//! Request metadata: everything about a call except its body.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::collections::HashMap;
use url::Url;

/// Metadata for an individual exchange.
///
/// The method and URL are kept as given and only validated when an attempt is
/// built, so a malformed value surfaces as a construction error of the exchange.
/// Headers set here apply to this call only and take precedence over the
/// client's default headers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMetadata {
    /// The HTTP method (GET, POST, etc.).
    pub method: String,

    /// The absolute request URL. It may already carry a query string.
    pub url: String,

    /// Query parameters added to the URL's existing query string.
    pub query_params: HashMap<String, String>,

    /// Outgoing headers for this call.
    pub headers: HashMap<String, String>,
}

impl RequestMetadata {
    /// Creates a new `RequestMetadata` with the given method and URL.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            query_params: HashMap::new(),
            headers: HashMap::new(),
        }
    }

    /// Adds a header to the request, replacing an earlier value of the same name.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Adds multiple headers to the request.
    pub fn with_headers(mut self, headers: impl IntoIterator<Item = (String, String)>) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Adds a query parameter to the request.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.insert(key.into(), value.into());
        self
    }

    /// Adds multiple query parameters to the request.
    pub fn with_query_params(
        mut self,
        params: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.query_params.extend(params);
        self
    }

    pub(crate) fn parse_method(&self) -> Result<Method> {
        Method::from_bytes(self.method.as_bytes())
            .map_err(|e| Error::invalid_request(format!("invalid method {:?}: {}", self.method, e)))
    }

    /// Parses the URL and appends the query parameters to whatever query it
    /// already carries.
    pub(crate) fn effective_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| Error::invalid_request(format!("invalid URL {:?}: {}", self.url, e)))?;

        if !self.query_params.is_empty() {
            let mut params: Vec<_> = self.query_params.iter().collect();
            params.sort();
            url.query_pairs_mut().extend_pairs(params);
        }

        Ok(url)
    }

    /// Layers this call's headers over `defaults`.
    pub(crate) fn header_map(&self, defaults: &HeaderMap) -> Result<HeaderMap> {
        let mut headers = defaults.clone();
        for (name, value) in &self.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| Error::invalid_request(format!("invalid header name {name:?}: {e}")))?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| {
                Error::invalid_request(format!("invalid value for header {name}: {e}"))
            })?;
            headers.insert(name, value);
        }
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_query_params_merge_with_existing_query() {
        let url = RequestMetadata::new("GET", "https://x/y?a=1")
            .with_query_param("b", "2")
            .effective_url()
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("a".to_string(), "1".to_string())));
        assert!(pairs.contains(&("b".to_string(), "2".to_string())));
        assert_eq!(pairs.len(), 2);
    }

    #[test]
    fn test_no_params_leaves_url_untouched() {
        let url = RequestMetadata::new("GET", "https://x/y?a=1")
            .effective_url()
            .unwrap();
        assert_eq!(url.as_str(), "https://x/y?a=1");
    }

    #[test]
    fn test_params_are_encoded() {
        let url = RequestMetadata::new("GET", "https://x/y")
            .with_query_param("q", "a b&c")
            .effective_url()
            .unwrap();
        assert_eq!(url.query(), Some("q=a+b%26c"));
    }

    #[test]
    fn test_malformed_url_and_method() {
        let err = RequestMetadata::new("GET", "not a url")
            .effective_url()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
        assert_eq!(err.stage(), "HTTP/Request");

        let err = RequestMetadata::new("GE T", "https://x/")
            .parse_method()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }

    #[test]
    fn test_call_headers_override_defaults() {
        let mut defaults = HeaderMap::new();
        defaults.insert("x-token", HeaderValue::from_static("default"));
        defaults.insert("user-agent", HeaderValue::from_static("httpwrap"));

        let headers = RequestMetadata::new("GET", "https://x/")
            .with_header("X-Token", "call")
            .header_map(&defaults)
            .unwrap();

        assert_eq!(headers.get("x-token").unwrap(), "call");
        assert_eq!(headers.get("user-agent").unwrap(), "httpwrap");
    }

    #[test]
    fn test_invalid_header_is_construction_error() {
        let err = RequestMetadata::new("GET", "https://x/")
            .with_header("bad header", "v")
            .header_map(&HeaderMap::new())
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Construction);
    }
}
