//! HTTP surface for the job description recommender.
//!
//! | Route | Body | Response |
//! |-------|------|----------|
//! | `POST /reload_data/` | none | `{"status", "message"}` |
//! | `POST /recommend_job_description/` | `{"position_name", "k"?}` | `{"recommendations": [{"title", "jd"}]}` |
//! | `POST /upsert_job_description/` | `{"title", "jd", "force"?}` | `{"status", "message", "replaced", "count"}` |
//! | `GET /health` | none | `{"status", "service", "version", ...}` |
//!
//! Failures are returned as `{"detail": "<message>"}`; a save whose reindex
//! failed adds `"stale_index": true`.

pub mod config;
pub mod error;
pub mod routes;
pub mod server;

pub use config::ServerConfig;
pub use error::{ApiError, ErrorBody};
pub use server::{AppState, build_router, run};
