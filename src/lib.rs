//! signalbrain - adaptive trade-recommendation learning core
//!
//! Feature extraction, chart-pattern recognition, a small online-
//! trained scoring network, strategy performance tracking and the
//! trade lifecycle that closes the loop from surfaced opportunity to
//! observed outcome to model update.
//!
//! Entry point is [`engine::LearningEngine`] with a pluggable
//! [`store::ModelStore`]. The engine is single-writer by design; see
//! the engine module docs for the concurrency contract.

pub mod config;
pub mod engine;
pub mod error;
pub mod features;
pub mod lifecycle;
pub mod model;
pub mod network;
pub mod patterns;
pub mod ranking;
pub mod store;
pub mod strategy;
pub mod types;

pub use engine::LearningEngine;
pub use error::{CoreError, CoreResult};
pub use store::{FileStore, MemoryStore, ModelStore};
