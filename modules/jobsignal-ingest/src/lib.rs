pub mod cache_store;
pub mod directory;
pub mod pipeline;
pub mod query;
pub mod service;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod verification;

pub use cache_store::CacheStore;
pub use directory::{load_directory, parse_directory};
pub use query::{JobView, JobsQuery};
pub use service::{IngestError, IngestOutcome, JobsService};
pub use verification::classify;
