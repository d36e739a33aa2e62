//! Plain request/response messages for callers that want byte-level control.
//!
//! A [`RequestMessage`] is a complete description of one call; the client turns
//! it into a raw exchange and answers with a [`ResponseMessage`].

use crate::{Client, Headers, RequestMetadata, Result};
use bytes::Bytes;
use http::StatusCode;
use std::collections::HashMap;

/// One call: method, URL, query parameters, headers and raw body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestMessage {
    /// The HTTP method.
    pub method: String,
    /// The absolute request URL.
    pub url: String,
    /// Query parameters added to the URL's existing query string.
    pub url_params: HashMap<String, String>,
    /// Outgoing headers for this call.
    pub headers: HashMap<String, String>,
    /// The request body. Empty means no body.
    pub body: Bytes,
}

/// The answer to a [`RequestMessage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    /// The HTTP status code.
    pub code: StatusCode,
    /// The response headers, first value per name.
    pub headers: Headers,
    /// The response body.
    pub body: Bytes,
}

impl RequestMessage {
    /// Creates a message without parameters, headers or body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            ..Self::default()
        }
    }

    fn metadata(&self) -> RequestMetadata {
        RequestMetadata::new(self.method.clone(), self.url.clone())
            .with_query_params(self.url_params.clone())
            .with_headers(self.headers.clone())
    }
}

impl Client {
    /// Performs the raw exchange described by `message`.
    ///
    /// The message's headers apply to this call only, on top of the client's
    /// default headers. Errors are returned with this operation added to their
    /// trace. Returns `Ok(None)` when the client allows no attempts.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use httpwrap::{Client, RequestMessage};
    ///
    /// # async fn example() -> Result<(), httpwrap::Error> {
    /// let client = Client::builder().retries(2).build()?;
    ///
    /// let mut message = RequestMessage::new("POST", "https://example.com/echo");
    /// message.headers.insert("Content-Type".into(), "text/plain".into());
    /// message.body = "hello".into();
    ///
    /// if let Some(response) = client.process_message(&message).await? {
    ///     println!("{} {:?}", response.code, response.body);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn process_message(
        &self,
        message: &RequestMessage,
    ) -> Result<Option<ResponseMessage>> {
        let response = self
            .exchange_raw(&message.metadata(), message.body.clone())
            .await
            .map_err(|e| e.context("Client", "process_message"))?;

        Ok(response.map(|response| ResponseMessage {
            code: response.status,
            headers: response.headers,
            body: response.body,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_carries_every_field() {
        let mut message = RequestMessage::new("DELETE", "https://x/items?id=1");
        message.url_params.insert("force".into(), "true".into());
        message.headers.insert("X-Trace".into(), "abc".into());

        let metadata = message.metadata();
        assert_eq!(metadata.method, "DELETE");
        assert_eq!(metadata.url, "https://x/items?id=1");
        assert_eq!(metadata.query_params["force"], "true");
        assert_eq!(metadata.headers["X-Trace"], "abc");
    }
}
