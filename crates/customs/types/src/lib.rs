//! Customs Classification Domain Types
//!
//! A classification job turns a free-text product description into a
//! Harmonized System code by chaining calls to external agents. This crate
//! holds the state those calls accumulate and the pure reducers that evolve it.
//!
//! # Key Concepts
//!
//! - **ConversationState**: the per-job record. It holds the round log, the
//!   current facts, the confidence trajectory and the lifecycle status.
//! - **Facts**: named intermediate results (product profile, legal research,
//!   decision, validation, ...). Each is either absent or a structured value.
//! - **Action**: the next step chosen by the decision table, optionally
//!   carrying a `SpecificRequest` with feedback and enforcement flags.
//! - **Round**: one executed action, immutable once appended.
//! - **ValidationIssue**: a typed quality-check failure that drives
//!   self-healing.
//!
//! # Design Principles
//!
//! 1. Reducers consume a state and return the next one; nothing mutates in place.
//! 2. Terminal states reject every further mutation.
//! 3. Issue categories form a closed enumeration, never free-text matching.

#![deny(unsafe_code)]

mod action;
mod errors;
mod facts;
mod gri;
mod issue;
mod job;
mod round;
mod state;
mod summary;

pub use action::*;
pub use errors::*;
pub use facts::*;
pub use gri::*;
pub use issue::*;
pub use job::*;
pub use round::*;
pub use state::*;
pub use summary::*;
