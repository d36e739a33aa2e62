//! HTTP client with two layers of retries.
//!
//! [`Client::exchange_raw`] sends bytes and retries transport failures.
//! [`Client::exchange_json`] wraps it, serializing the request and decoding the
//! response, and retries whole round trips whose status code is not acceptable.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    error::Cause,
    metadata::RequestMetadata,
    response::{capture_headers, Headers},
    retry::{RetryOnTransport, RetryOnUnacceptableStatus, RetryPolicy},
    Error, JsonResponse, RawResponse, Result,
};
use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// The set of status codes the JSON layer accepts.
///
/// An empty set accepts every code.
///
/// # Examples
///
/// ```
/// use httpwrap::AcceptableCodes;
/// use http::StatusCode;
///
/// assert!(AcceptableCodes::any().accepts(StatusCode::IM_A_TEAPOT));
///
/// let codes: AcceptableCodes = [200, 201].into_iter().collect();
/// assert!(codes.accepts(StatusCode::CREATED));
/// assert!(!codes.accepts(StatusCode::INTERNAL_SERVER_ERROR));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptableCodes(BTreeSet<u16>);

impl AcceptableCodes {
    /// Accept every status code.
    pub fn any() -> Self {
        Self::default()
    }

    /// Adds a code to the set.
    pub fn insert(&mut self, code: u16) {
        self.0.insert(code);
    }

    /// Returns `true` if `status` is acceptable.
    pub fn accepts(&self, status: StatusCode) -> bool {
        self.0.is_empty() || self.0.contains(&status.as_u16())
    }

    /// Returns `true` if no code was configured, i.e. every code is accepted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates over the configured codes in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<u16> for AcceptableCodes {
    fn from_iter<I: IntoIterator<Item = u16>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// An HTTP client that retries failed exchanges.
///
/// The client holds no per-call state: outgoing headers travel with each
/// call's [`RequestMetadata`] and captured response headers come back in the
/// result. Clones share the same configuration and transport, and a single
/// client can serve concurrent calls.
///
/// # Examples
///
/// ```no_run
/// use httpwrap::{Client, RequestMetadata};
/// use serde::{Deserialize, Serialize};
/// use std::time::Duration;
///
/// #[derive(Serialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), httpwrap::Error> {
/// let client = Client::builder()
///     .retries(3)
///     .retry_delay(Duration::from_millis(250))
///     .acceptable_codes([200, 201])
///     .build()?;
///
/// let metadata = RequestMetadata::new("POST", "https://api.example.com/users")
///     .with_header("Authorization", "Bearer token");
/// let request = CreateUser { name: "Alice".to_string() };
///
/// if let Some(created) = client.exchange_json::<_, User>(&metadata, &request).await? {
///     println!("created {:?} after {} round trips", created.status, created.attempts);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http_client: reqwest::Client,
    default_headers: HeaderMap,
    transport_retry: RetryPolicy,
    status_retry: RetryPolicy,
    acceptable_codes: AcceptableCodes,
    timeout: Option<Duration>,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The policy the raw layer applies to transport failures.
    pub fn transport_retry(&self) -> RetryPolicy {
        self.inner.transport_retry
    }

    /// The policy the JSON layer applies to unacceptable status codes.
    pub fn status_retry(&self) -> RetryPolicy {
        self.inner.status_retry
    }

    /// The status codes the JSON layer accepts.
    pub fn acceptable_codes(&self) -> &AcceptableCodes {
        &self.inner.acceptable_codes
    }

    /// Sends `body` as-is and returns the status, headers and body of the response.
    ///
    /// Each attempt builds a fresh request. A malformed method, URL or header
    /// fails immediately; connection failures and failed body reads are retried
    /// according to [`Client::transport_retry`]. Any status code counts as a
    /// successful exchange at this layer.
    ///
    /// Returns `Ok(None)` when the policy allows no attempts.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use httpwrap::{Client, RequestMetadata};
    ///
    /// # async fn example() -> Result<(), httpwrap::Error> {
    /// let client = Client::builder().retries(2).build()?;
    /// let metadata = RequestMetadata::new("PUT", "https://example.com/blob?v=1")
    ///     .with_query_param("overwrite", "true");
    ///
    /// if let Some(response) = client.exchange_raw(&metadata, b"raw bytes".to_vec()).await? {
    ///     println!("{} ({} bytes)", response.status, response.body.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn exchange_raw(
        &self,
        metadata: &RequestMetadata,
        body: impl Into<Bytes>,
    ) -> Result<Option<RawResponse>> {
        let body = body.into();
        let start_time = Instant::now();

        let completed = self
            .inner
            .transport_retry
            .run(&RetryOnTransport, |attempt| {
                self.attempt_raw(metadata, body.clone(), attempt)
            })
            .await
            .map_err(|e| e.context("Client", "exchange_raw"))?;

        Ok(completed.map(|completed| {
            let (status, headers, body) = completed.value;
            let latency = start_time.elapsed();

            tracing::info!(
                status = status.as_u16(),
                latency_ms = latency.as_millis(),
                attempts = completed.attempts,
                "Received HTTP response"
            );

            RawResponse {
                status,
                headers,
                body,
                latency,
                attempts: completed.attempts,
            }
        }))
    }

    /// Executes a single raw attempt.
    async fn attempt_raw(
        &self,
        metadata: &RequestMetadata,
        body: Bytes,
        attempt: usize,
    ) -> Result<(StatusCode, Headers, Bytes)> {
        let method = metadata.parse_method()?;
        let url = metadata.effective_url()?;
        let headers = metadata.header_map(&self.inner.default_headers)?;

        tracing::debug!(
            method = %method,
            url = %url,
            attempt = attempt,
            "Executing HTTP request"
        );

        let mut request = self.inner.http_client.request(method, url).headers(headers);

        if let Some(timeout) = self.inner.timeout {
            request = request.timeout(timeout);
        }

        if !body.is_empty() {
            request = request.body(body);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_builder() {
                Error::invalid_request(e.to_string())
            } else {
                Error::new(Cause::Network(e))
            }
        })?;

        let status = response.status();
        let headers = capture_headers(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::new(Cause::BodyRead(e)))?;

        Ok((status, headers, body))
    }

    /// Serializes `body` to JSON, exchanges it and decodes the response.
    ///
    /// Every round trip re-serializes the request and goes through
    /// [`Client::exchange_raw`], which retries transport failures on its own.
    /// An error coming back from it ends the exchange; this layer only repeats
    /// round trips whose status code is outside [`Client::acceptable_codes`],
    /// according to [`Client::status_retry`]. When those retries run out the
    /// returned error carries the last status code.
    ///
    /// The body is decoded only when it is non-empty, before the status code is
    /// checked. Serialization and deserialization failures are never retried.
    /// `Content-Type: application/json` is sent unless a content type was set.
    ///
    /// Returns `Ok(None)` when either policy allows no attempts.
    pub async fn exchange_json<Req, Res>(
        &self,
        metadata: &RequestMetadata,
        body: &Req,
    ) -> Result<Option<JsonResponse<Res>>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let start_time = Instant::now();
        let metadata = self.with_json_content_type(metadata);

        let completed = self
            .inner
            .status_retry
            .run(&RetryOnUnacceptableStatus, |attempt| {
                self.attempt_json::<Req, Res>(&metadata, body, attempt)
            })
            .await
            .map_err(|e| e.context("Client", "exchange_json"))?;

        Ok(completed.and_then(|completed| {
            let attempts = completed.attempts;
            completed.value.map(|(raw, data)| JsonResponse {
                data,
                status: raw.status,
                headers: raw.headers,
                raw_body: raw.body,
                latency: start_time.elapsed(),
                attempts,
            })
        }))
    }

    /// Executes a single JSON round trip.
    async fn attempt_json<Req, Res>(
        &self,
        metadata: &RequestMetadata,
        body: &Req,
        attempt: usize,
    ) -> Result<Option<(RawResponse, Option<Res>)>>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body).map_err(|e| Error::new(Cause::Serialization(e)))?;

        tracing::debug!(
            url = %metadata.url,
            attempt = attempt,
            bytes = payload.len(),
            "Sending JSON request"
        );

        let Some(raw) = self.exchange_raw(metadata, payload).await? else {
            return Ok(None);
        };

        let data = if raw.body.is_empty() {
            None
        } else {
            match serde_json::from_slice::<Res>(&raw.body) {
                Ok(data) => Some(data),
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        status = raw.status.as_u16(),
                        "Failed to deserialize response"
                    );
                    return Err(Error::new(Cause::Deserialization {
                        status: raw.status,
                        raw_response: String::from_utf8_lossy(&raw.body).into_owned(),
                        source: e,
                    }));
                }
            }
        };

        if !self.inner.acceptable_codes.accepts(raw.status) {
            return Err(Error::new(Cause::UnacceptableStatus {
                status: raw.status,
                raw_response: String::from_utf8_lossy(&raw.body).into_owned(),
            }));
        }

        Ok(Some((raw, data)))
    }

    fn with_json_content_type<'a>(
        &self,
        metadata: &'a RequestMetadata,
    ) -> Cow<'a, RequestMetadata> {
        let has_content_type = self.inner.default_headers.contains_key(CONTENT_TYPE)
            || metadata
                .headers
                .keys()
                .any(|name| name.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));

        if has_content_type {
            Cow::Borrowed(metadata)
        } else {
            Cow::Owned(
                metadata
                    .clone()
                    .with_header(CONTENT_TYPE.as_str(), "application/json"),
            )
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// A fresh builder makes zero attempts; set [`ClientBuilder::retries`] to a
/// positive ceiling before use.
///
/// # Examples
///
/// ```no_run
/// use httpwrap::{ClientBuilder, RetryPolicy};
/// use std::time::Duration;
///
/// # fn example() -> Result<(), httpwrap::Error> {
/// let client = ClientBuilder::new()
///     .retries(2)
///     .retry_delay(Duration::from_secs(1))
///     .status_retry(RetryPolicy::new(5, Duration::from_millis(200)))
///     .acceptable_code(200)
///     .default_header("User-Agent", "my-app/1.0")?
///     .timeout(Duration::from_secs(30))
///     .cookie_store(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    default_headers: HeaderMap,
    transport_retry: RetryPolicy,
    status_retry: RetryPolicy,
    acceptable_codes: AcceptableCodes,
    timeout: Option<Duration>,
    cookie_store: bool,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            default_headers: HeaderMap::new(),
            transport_retry: RetryPolicy::default(),
            status_retry: RetryPolicy::default(),
            acceptable_codes: AcceptableCodes::any(),
            timeout: None,
            cookie_store: false,
            http_client: None,
        }
    }

    /// Sets the attempt ceiling of both layers.
    pub fn retries(mut self, max_attempts: usize) -> Self {
        self.transport_retry.max_attempts = max_attempts;
        self.status_retry.max_attempts = max_attempts;
        self
    }

    /// Sets the delay between attempts of both layers.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.transport_retry.delay = delay;
        self.status_retry.delay = delay;
        self
    }

    /// Sets the policy of the raw layer alone.
    pub fn transport_retry(mut self, policy: RetryPolicy) -> Self {
        self.transport_retry = policy;
        self
    }

    /// Sets the policy of the JSON layer alone.
    pub fn status_retry(mut self, policy: RetryPolicy) -> Self {
        self.status_retry = policy;
        self
    }

    /// Adds a code to the acceptable set.
    pub fn acceptable_code(mut self, code: u16) -> Self {
        self.acceptable_codes.insert(code);
        self
    }

    /// Replaces the acceptable set. An empty set accepts every code.
    pub fn acceptable_codes(mut self, codes: impl IntoIterator<Item = u16>) -> Self {
        self.acceptable_codes = codes.into_iter().collect();
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the timeout of each attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Keeps cookies across requests of the built transport.
    ///
    /// Ignored when a transport is supplied with [`ClientBuilder::http_client`].
    pub fn cookie_store(mut self, enabled: bool) -> Self {
        self.cookie_store = enabled;
        self
    }

    /// Uses an existing `reqwest::Client` as the transport, sharing its
    /// connection pool and cookie store.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .cookie_store(self.cookie_store)
                .build()
                .map_err(|e| {
                    Error::configuration(format!("Failed to build HTTP client: {}", e))
                })?,
        };

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                default_headers: self.default_headers,
                transport_retry: self.transport_retry,
                status_retry: self.status_retry,
                acceptable_codes: self.acceptable_codes,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_both_layers() {
        let client = Client::builder()
            .retries(3)
            .retry_delay(Duration::from_millis(50))
            .build()
            .unwrap();

        let expected = RetryPolicy::new(3, Duration::from_millis(50));
        assert_eq!(client.transport_retry(), expected);
        assert_eq!(client.status_retry(), expected);
        assert!(client.acceptable_codes().is_empty());
    }

    #[test]
    fn test_layer_policies_are_independent() {
        let client = Client::builder()
            .retries(3)
            .status_retry(RetryPolicy::new(1, Duration::ZERO))
            .acceptable_codes([201, 200])
            .acceptable_code(204)
            .build()
            .unwrap();

        assert_eq!(client.transport_retry().max_attempts, 3);
        assert_eq!(client.status_retry().max_attempts, 1);
        assert_eq!(
            client.acceptable_codes().iter().collect::<Vec<_>>(),
            vec![200, 201, 204]
        );
    }

    #[test]
    fn test_invalid_default_header() {
        let err = Client::builder()
            .default_header("bad header", "x")
            .err()
            .unwrap();
        assert_eq!(err.kind(), crate::ErrorKind::Configuration);
    }

    #[test]
    fn test_json_content_type_added_once() {
        let client = Client::builder().build().unwrap();

        let plain = RequestMetadata::new("POST", "https://x/");
        let with_json = client.with_json_content_type(&plain);
        assert_eq!(
            with_json.headers.get("content-type").map(String::as_str),
            Some("application/json")
        );

        let explicit =
            RequestMetadata::new("POST", "https://x/").with_header("Content-Type", "text/plain");
        assert!(matches!(client.with_json_content_type(&explicit), Cow::Borrowed(_)));
    }
}
