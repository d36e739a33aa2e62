//! Results of the raw and JSON exchange layers.
//!
//! Response headers are captured from the attempt that completed, keeping only
//! the first value of each header name.

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use std::collections::BTreeMap;
use std::time::Duration;

/// Captured response headers: lower-case header name to its first value.
pub type Headers = BTreeMap<String, String>;

/// Builds the captured header map, keeping the first value per name.
///
/// Values that are not valid UTF-8 are decoded lossily.
pub(crate) fn capture_headers(headers: &HeaderMap) -> Headers {
    let mut captured = Headers::new();
    for name in headers.keys() {
        if let Some(value) = headers.get(name) {
            captured.insert(
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            );
        }
    }
    captured
}

/// The result of a successful raw exchange.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers, first value per name.
    pub headers: Headers,

    /// The response body bytes.
    pub body: Bytes,

    /// The time from the first attempt until the body was read.
    pub latency: Duration,

    /// The number of attempts made, `1` if the first attempt succeeded.
    pub attempts: usize,
}

impl RawResponse {
    /// Returns a header value by (case-insensitive) name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use httpwrap::RawResponse;
    /// # use http::StatusCode;
    /// # use std::time::Duration;
    /// let mut headers = httpwrap::Headers::new();
    /// headers.insert("content-type".to_string(), "application/json".to_string());
    ///
    /// let response = RawResponse {
    ///     status: StatusCode::OK,
    ///     headers,
    ///     body: bytes::Bytes::new(),
    ///     latency: Duration::from_millis(5),
    ///     attempts: 1,
    /// };
    ///
    /// assert_eq!(response.header("Content-Type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` if the exchange needed more than one attempt.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }
}

/// The result of a successful JSON exchange.
///
/// # Type Parameters
///
/// * `T` - The type the response body was deserialized into
#[derive(Debug, Clone)]
pub struct JsonResponse<T> {
    /// The deserialized body, or `None` if the response had no body.
    pub data: Option<T>,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers, first value per name.
    pub headers: Headers,

    /// The raw response body as received.
    pub raw_body: Bytes,

    /// The time from the first round trip until the accepted response was decoded.
    pub latency: Duration,

    /// The number of full round trips made. Retries inside the raw layer are not counted.
    pub attempts: usize,
}

impl<T> JsonResponse<T> {
    /// Maps the response data to a different type, preserving the metadata.
    pub fn map<U, F>(self, f: F) -> JsonResponse<U>
    where
        F: FnOnce(T) -> U,
    {
        JsonResponse {
            data: self.data.map(f),
            status: self.status,
            headers: self.headers,
            raw_body: self.raw_body,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns a header value by (case-insensitive) name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Returns `true` if the exchange needed more than one round trip.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn test_capture_keeps_first_value() {
        let mut headers = HeaderMap::new();
        headers.append("set-cookie", HeaderValue::from_static("a=1"));
        headers.append("set-cookie", HeaderValue::from_static("b=2"));
        headers.insert("x-single", HeaderValue::from_static("one"));

        let captured = capture_headers(&headers);

        assert_eq!(captured.len(), 2);
        assert_eq!(captured["set-cookie"], "a=1");
        assert_eq!(captured["x-single"], "one");
    }

    #[test]
    fn test_capture_decodes_opaque_values_lossily() {
        let mut headers = HeaderMap::new();
        headers.insert("x-bin", HeaderValue::from_bytes(b"ok\xff").unwrap());

        let captured = capture_headers(&headers);
        assert_eq!(captured["x-bin"], "ok\u{fffd}");
    }

    #[test]
    fn test_json_response_map() {
        let response = JsonResponse {
            data: Some(21),
            status: StatusCode::OK,
            headers: Headers::new(),
            raw_body: Bytes::from_static(b"21"),
            latency: Duration::from_millis(1),
            attempts: 2,
        };

        let doubled = response.map(|n| n * 2);
        assert_eq!(doubled.data, Some(42));
        assert!(doubled.was_retried());
    }
}
