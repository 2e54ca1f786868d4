//! HTTP adapter for the external classification agents
//!
//! [`HttpAgentInvoker`] implements the engine's `AgentInvoker` seam: it
//! posts the job context, current facts and any corrective flags to the
//! agent responsible for an action, then maps the agent's answer onto the
//! fixed fact keys with [`normalize_response`].

#![deny(unsafe_code)]

mod config;
mod invoker;
mod normalize;

pub use config::{AgentPaths, AgentsConfig};
pub use invoker::{AgentsError, HttpAgentInvoker};
pub use normalize::normalize_response;
