pub mod connectors;
pub mod detect;
pub mod error;
pub mod feed;
pub mod http;
pub mod links;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use connectors::{Connector, ConnectorRegistry, FetchContext};
pub use detect::{detect_ats, DetectedAts};
pub use error::{FetchError, Result};
pub use http::{HttpClient, HttpFetch, RetryPolicy};
pub use links::{extract_job_links, JobLink};
