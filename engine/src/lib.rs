//! Client-side reactive table-state synchronization engine.
//!
//! Keeps a work-item list view (filters, sort, grouping, pagination, columns,
//! timeline visibility, row selection) consistent with a remote query
//! resource while avoiding redundant round-trips and races between
//! concurrently-updating observers.
//!
//! # Architecture
//!
//! - **[`dataflow`]** - reactive cell primitives ([`State`], [`MultiState`],
//!   [`Relay`], droppable tasks)
//! - **[`states::States`]** - the explicit context object holding every cell;
//!   constructed once and passed by `Arc`, never looked up ambiently
//! - **[`work_items::WorkItemCache`]** - identity-keyed entity cache with
//!   dirty-aware merge and request deduplication
//! - **[`table`]** - one aspect cell per table facet plus the row selection
//!   engine
//! - **[`checksum::QueryChecksum`]** - the fingerprint gate deciding when the
//!   local and authoritative query state have diverged
//! - **[`controller::TableController`]** - subscribes to every aspect and
//!   serializes concurrent triggers into single reloads
//!
//! Data flows one way in (aspect mutation → controller → outgoing fetch) and
//! one way out (fetch result → entity cache → aspect states → subscribers).

pub mod checksum;
pub mod controller;
pub mod dataflow;
pub mod error;
pub mod loading;
pub mod notifications;
pub mod resources;
pub mod states;
pub mod table;
pub mod work_items;

pub use checksum::{ChecksumRecord, QueryChecksum};
pub use controller::{ControllerPhase, RouteParams, TableController};
pub use dataflow::{MultiState, Relay, State, Task, TaskHandle, relay, shared_relay};
pub use error::EngineError;
pub use loading::LoadingIndicator;
pub use notifications::{Notification, NotificationKind, Notifications};
pub use resources::WorkItemApi;
pub use states::{States, TableStates};
pub use table::selection::{RowSelection, TableRow, TableSelection};
pub use work_items::WorkItemCache;
