//! Move selection for service-backed seats.
//!
//! The catalog lists every selectable player. Seats bound to a hosted
//! model go through the [`MoveSelector`] trait; engine-backed seats are
//! driven directly over UCI by the match loop and never touch this crate
//! beyond their catalog entry.

pub mod catalog;
pub mod llm;
pub mod traits;

#[cfg(any(test, feature = "mock"))]
pub mod scripted;

pub use catalog::{find_by_model, EngineSettings, Player, PlayerKind, Provider, CATALOG};
pub use llm::LlmSelector;
pub use traits::{MoveSelector, SelectionRequest, SelectorError};

#[cfg(any(test, feature = "mock"))]
pub use scripted::{Reply, ScriptedSelector};
