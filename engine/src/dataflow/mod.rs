//! Core dataflow primitives for reactive state management.
//!
//! These containers are independent of table semantics and form the basis
//! for every piece of reactive state in the engine:
//!
//! - **[`Relay`]** - type-safe event streaming over simple channels
//! - **[`State`]** - single-value reactive cell with a pristine marker and
//!   deduplicated asynchronous population
//! - **[`MultiState`]** - keyed collection of lazily-created cells
//! - **[`Task`]** / **[`TaskHandle`]** - droppable observer tasks
//!
//! All state transitions go through `put`/`clear`; observers share cells by
//! subscription, never by mutating a cached reference.

pub mod relay;
pub mod state_cell;
pub mod state_map;
pub mod task;

pub use relay::{Relay, RelayError, relay, shared_relay};
pub use state_cell::State;
pub use state_map::MultiState;
pub use task::{Task, TaskHandle};
