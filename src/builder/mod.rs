//! Authoring surface for declaring states.
//!
//! States are declared through [`StateConfiguration`] handles obtained
//! from [`StateMachine::configure`](crate::StateMachine::configure):
//! transitions, ignored triggers, sub-state links, entry/exit actions,
//! and entry/exit payload plumbing.

pub mod configuration;
pub mod error;

pub use configuration::StateConfiguration;
pub use error::HierarchyError;
