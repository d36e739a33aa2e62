//! # httpwrap - a retrying HTTP request/response wrapper
//!
//! httpwrap performs HTTP exchanges on top of `reqwest` and retries them in two
//! independent layers:
//!
//! - the **raw layer** ([`Client::exchange_raw`]) sends bytes and retries
//!   transport failures (connection errors, failed body reads);
//! - the **JSON layer** ([`Client::exchange_json`]) serializes a request value,
//!   goes through the raw layer, decodes the response and repeats the whole
//!   round trip while the status code is outside the configured acceptable set.
//!
//! Both layers make at most a fixed number of attempts with a constant delay in
//! between. [`Client::process_message`] drives the raw layer from a plain
//! [`RequestMessage`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use httpwrap::{Client, RequestMetadata};
//! use serde::{Deserialize, Serialize};
//! use std::time::Duration;
//!
//! #[derive(Serialize)]
//! struct Search {
//!     query: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct Results {
//!     items: Vec<String>,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), httpwrap::Error> {
//!     let client = Client::builder()
//!         .retries(3)
//!         .retry_delay(Duration::from_millis(500))
//!         .acceptable_codes([200])
//!         .build()?;
//!
//!     let metadata = RequestMetadata::new("POST", "https://api.example.com/search")
//!         .with_query_param("limit", "10");
//!     let search = Search { query: "rust".to_string() };
//!
//!     if let Some(response) = client.exchange_json::<_, Results>(&metadata, &search).await? {
//!         println!("{} results", response.data.map_or(0, |r| r.items.len()));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Errors
//!
//! Every error carries an [`ErrorKind`], the stage it originated in and the
//! operations it propagated through:
//!
//! ```no_run
//! use httpwrap::{Client, ErrorKind, RequestMetadata};
//!
//! # async fn example() -> Result<(), httpwrap::Error> {
//! # let client = Client::builder().retries(1).build()?;
//! let metadata = RequestMetadata::new("GET", "https://api.example.com/health");
//! match client.exchange_raw(&metadata, Vec::new()).await {
//!     Ok(response) => println!("{:?}", response.map(|r| r.status)),
//!     Err(e) if e.kind() == ErrorKind::Transport => {
//!         eprintln!("unreachable after {} attempts: {}", e.attempts(), e);
//!     }
//!     Err(e) => eprintln!("{}", e),
//! }
//! # Ok(())
//! # }
//! ```

mod client;
pub mod document;
mod error;
mod message;
pub mod metadata;
mod response;
pub mod retry;

pub use client::{AcceptableCodes, Client, ClientBuilder};
pub use error::{Cause, Error, ErrorKind, Frame, Result};
pub use message::{RequestMessage, ResponseMessage};
pub use metadata::RequestMetadata;
pub use response::{Headers, JsonResponse, RawResponse};
pub use retry::{RetryPolicy, RetryPredicate};
