//! Core state machine types.
//!
//! This module contains the per-state data model of the engine:
//! - Identity requirements via the [`StateId`] and [`TriggerId`] traits
//! - The immutable [`Transition`] record passed to enter/exit hooks
//! - The [`StateRepresentation`] holding one state's transition table,
//!   super-state link, and registered hooks

mod representation;
mod state;
mod transition;

pub use representation::{EntryDataProducer, ExitDataConsumer, StateRepresentation};
pub use state::{StateId, TriggerId};
pub use transition::Transition;
