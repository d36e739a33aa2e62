//! JSON documents read and written by the `httpwrap` command-line tool.
//!
//! Input:
//!
//! ```json
//! {
//!     "Method": "POST",
//!     "URL": "https://example.com/items?page=1",
//!     "URLParams": {"limit": 10},
//!     "Headers": {"Content-Type": "application/json"},
//!     "Body": {"name": "widget"}
//! }
//! ```
//!
//! Output is `{Code, CodeText, Headers, BodyJSON}` when the response body is a
//! JSON object and `{Code, CodeText, Headers, BodyRaw}` otherwise, pretty-printed
//! with tabs.

use crate::{Headers, RequestMessage, ResponseMessage};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::HashMap;

/// A request description as read from a file.
#[derive(Debug, Deserialize)]
pub struct RequestDocument {
    #[serde(rename = "Method")]
    pub method: String,

    #[serde(rename = "URL")]
    pub url: String,

    /// Scalar values are sent as their textual form.
    #[serde(rename = "URLParams", default)]
    pub url_params: Option<HashMap<String, Value>>,

    #[serde(rename = "Headers", default)]
    pub headers: Option<HashMap<String, String>>,

    /// Sent verbatim as the request body.
    #[serde(rename = "Body", default)]
    pub body: Option<Box<RawValue>>,
}

impl RequestDocument {
    /// Parses a request document.
    pub fn from_slice(data: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(data)
    }

    /// Converts the document into a message for [`crate::Client::process_message`].
    pub fn into_message(self) -> RequestMessage {
        let url_params = self
            .url_params
            .unwrap_or_default()
            .into_iter()
            .map(|(name, value)| (name, param_text(value)))
            .collect();

        RequestMessage {
            method: self.method,
            url: self.url,
            url_params,
            headers: self.headers.unwrap_or_default(),
            body: self
                .body
                .map(|raw| Bytes::copy_from_slice(raw.get().as_bytes()))
                .unwrap_or_default(),
        }
    }
}

fn param_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

/// A response description as printed by the tool.
#[derive(Debug, Serialize, PartialEq)]
pub struct ResponseDocument {
    #[serde(rename = "Code")]
    pub code: u16,

    /// The canonical reason phrase, empty for unknown codes.
    #[serde(rename = "CodeText")]
    pub code_text: String,

    #[serde(rename = "Headers")]
    pub headers: Headers,

    #[serde(rename = "BodyRaw", skip_serializing_if = "Option::is_none")]
    pub body_raw: Option<String>,

    #[serde(rename = "BodyJSON", skip_serializing_if = "Option::is_none")]
    pub body_json: Option<Value>,
}

impl ResponseDocument {
    /// Renders the document as JSON indented with tabs.
    pub fn to_pretty_string(&self) -> serde_json::Result<String> {
        let mut out = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"\t");
        let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
        self.serialize(&mut serializer)?;
        String::from_utf8(out).map_err(|e| {
            serde_json::Error::io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }
}

impl From<ResponseMessage> for ResponseDocument {
    fn from(message: ResponseMessage) -> Self {
        let (body_raw, body_json) = match serde_json::from_slice::<Value>(&message.body) {
            Ok(value @ Value::Object(_)) => (None, Some(value)),
            _ => (
                Some(String::from_utf8_lossy(&message.body).into_owned()),
                None,
            ),
        };

        Self {
            code: message.code.as_u16(),
            code_text: message
                .code
                .canonical_reason()
                .unwrap_or_default()
                .to_string(),
            headers: message.headers,
            body_raw,
            body_json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_request_document_into_message() {
        let doc = RequestDocument::from_slice(
            br#"{
                "Method": "POST",
                "URL": "https://example.com/items?page=1",
                "URLParams": {"limit": 10, "q": "rust", "exact": true},
                "Headers": {"X-Api-Key": "k"},
                "Body": {"name": "widget", "tags": [1, 2]}
            }"#,
        )
        .unwrap();

        let message = doc.into_message();
        assert_eq!(message.method, "POST");
        assert_eq!(message.url, "https://example.com/items?page=1");
        assert_eq!(message.url_params["limit"], "10");
        assert_eq!(message.url_params["q"], "rust");
        assert_eq!(message.url_params["exact"], "true");
        assert_eq!(message.headers["X-Api-Key"], "k");
        assert_eq!(
            message.body,
            Bytes::from_static(br#"{"name": "widget", "tags": [1, 2]}"#)
        );
    }

    #[test]
    fn test_minimal_request_document() {
        let data = br#"{"Method": "GET", "URL": "https://x/", "Headers": null}"#;
        let message = RequestDocument::from_slice(data).unwrap().into_message();

        assert!(message.url_params.is_empty());
        assert!(message.headers.is_empty());
        assert!(message.body.is_empty());
    }

    #[test]
    fn test_json_object_body_is_rendered_as_json() {
        let mut headers = Headers::new();
        headers.insert("content-type".into(), "application/json".into());

        let doc = ResponseDocument::from(ResponseMessage {
            code: StatusCode::CREATED,
            headers,
            body: Bytes::from_static(br#"{"id":7}"#),
        });

        assert_eq!(doc.code, 201);
        assert_eq!(doc.code_text, "Created");
        assert_eq!(doc.body_json, Some(serde_json::json!({"id": 7})));
        assert_eq!(doc.body_raw, None);

        let rendered = doc.to_pretty_string().unwrap();
        assert_eq!(
            rendered,
            "{\n\t\"Code\": 201,\n\t\"CodeText\": \"Created\",\n\t\"Headers\": {\n\t\t\"content-type\": \"application/json\"\n\t},\n\t\"BodyJSON\": {\n\t\t\"id\": 7\n\t}\n}"
        );
    }

    #[test]
    fn test_non_ascii_body_renders_verbatim() {
        let doc = ResponseDocument::from(ResponseMessage {
            code: StatusCode::OK,
            headers: Headers::new(),
            body: Bytes::from("grüße, 世界"),
        });

        assert_eq!(
            doc.to_pretty_string().unwrap(),
            "{\n\t\"Code\": 200,\n\t\"CodeText\": \"OK\",\n\t\"Headers\": {},\n\t\"BodyRaw\": \"grüße, 世界\"\n}"
        );
    }

    #[test]
    fn test_non_object_body_is_rendered_raw() {
        let doc = ResponseDocument::from(ResponseMessage {
            code: StatusCode::from_u16(599).unwrap(),
            headers: Headers::new(),
            body: Bytes::from_static(b"[1,2]"),
        });

        assert_eq!(doc.code_text, "");
        assert_eq!(doc.body_raw.as_deref(), Some("[1,2]"));
        assert_eq!(doc.body_json, None);
    }
}
