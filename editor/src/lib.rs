//! Client side of the job description recommender.
//!
//! [`RecommenderClient`] wraps the server's HTTP API; [`display`] holds the
//! selector formatting used by the `jdrec-editor` binary.

pub mod client;
pub mod display;
pub mod error;

pub use client::{DEFAULT_SERVER_URL, Recommendation, RecommenderClient, SaveResult};
pub use error::{ClientError, Result};
