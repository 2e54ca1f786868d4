//! Customs classification service
//!
//! REST front end for the orchestration engine:
//! - job registry and checkpoint inspection
//! - the orchestrate entry point (start or resume a job)
//! - clarification answers and operator abort
//!
//! Runs are single-flight per job within one process.

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use api::{build_router, create_router, AppState};
pub use config::ServiceConfig;
pub use error::{ApiError, ApiResult, ServiceError, ServiceResult};
pub use server::Server;
