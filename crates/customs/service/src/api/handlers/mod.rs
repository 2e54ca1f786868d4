//! REST API handlers

mod health;
mod jobs;

pub use health::*;
pub use jobs::*;
