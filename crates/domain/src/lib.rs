//! crosspost domain crate
//!
//! Core logic of the multi-platform publishing orchestrator, following
//! hexagonal architecture:
//! - `model`: Domain entities and value objects
//! - `requirements`: Static per-platform constraint table
//! - `validation`: Shared content checks against the requirements table
//! - `media`: URL and media-type helpers
//! - `ports`: Trait definitions for external dependencies (adapters)
//! - `registry`: Adapter instance cache keyed by credential fingerprint
//! - `usecases`: Adaptation, retry, and publish orchestration

pub mod media;
pub mod model;
pub mod ports;
pub mod registry;
pub mod requirements;
pub mod usecases;
pub mod validation;

pub use model::*;
pub use ports::*;
pub use registry::{AdapterRegistry, RegistryKey};
pub use requirements::ContentRequirements;
pub use usecases::adapt::{AdaptConfig, AdaptError, ContentAdapter};
pub use usecases::publish::PublishOrchestrator;
pub use usecases::retry::{RetryController, RetryOutcome};
