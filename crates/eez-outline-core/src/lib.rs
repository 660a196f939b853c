//! Core systems for eez-outline.
//!
//! This crate provides the foundation the view-models are built on:
//!
//! - **Signal/Slot System**: explicit listener registration, used in place of
//!   automatic dependency tracking to tell views that derived state is stale
//! - **Logging**: `tracing` targets per subsystem, perf spans, and a text
//!   renderer for debugging tree-shaped view-models
//!
//! # Signal Example
//!
//! ```
//! use eez_outline_core::Signal;
//!
//! let changed = Signal::<u32>::new();
//! let conn_id = changed.connect(|generation| {
//!     println!("document generation {}", generation);
//! });
//! changed.emit(1);
//! changed.disconnect(conn_id);
//! ```

pub mod logging;
pub mod signal;

pub use logging::{DebugTree, PerfSpan, TreeDebug, TreeFormatOptions, TreeStyle};
pub use signal::{ConnectionId, Signal};
