//! Trellis: a hierarchical finite state machine engine.
//!
//! Trellis drives state transitions over caller-supplied, opaque state and
//! trigger values. Callers declare per-state transition tables, optional
//! super-state (parent/child) links, and entry/exit hooks through a fluent
//! configuration surface, then fire triggers at the machine façade.
//!
//! # Core Concepts
//!
//! - **States and triggers**: any `Clone + Eq + Hash + Debug` value,
//!   via the blanket [`StateId`] and [`TriggerId`] traits
//! - **Configuration**: one [`StateConfiguration`] per state, declaring
//!   transitions, ignored triggers, sub-states, and hooks
//! - **Firing**: triggers are processed through a FIFO queue, so a fire
//!   made from inside an entry/exit hook is deferred until the current
//!   transition completes instead of recursing
//! - **Hierarchy**: super-state links answer "is the machine logically in
//!   state X" when X is an ancestor of the concrete current state
//!
//! # Example
//!
//! ```rust
//! use trellis::StateMachine;
//!
//! #[derive(Clone, PartialEq, Eq, Hash, Debug)]
//! enum Phase {
//!     Idle,
//!     Running,
//!     Paused,
//! }
//!
//! #[derive(Clone, PartialEq, Eq, Hash, Debug)]
//! enum Input {
//!     Start,
//!     Pause,
//! }
//!
//! let machine = StateMachine::new(Phase::Idle);
//! machine
//!     .configure(Phase::Idle, None)
//!     .add_transition(Input::Start, Phase::Running);
//! machine
//!     .configure(Phase::Running, None)
//!     .add_transition(Input::Pause, Phase::Paused)
//!     .add_entry_action(|| println!("running"));
//! machine.configure(Phase::Paused, None);
//!
//! machine.fire(Input::Start).unwrap();
//! machine.fire(Input::Pause).unwrap();
//! assert!(machine.is_in_state(&Phase::Paused));
//! ```
//!
//! The machine is single-threaded: share it through an
//! `Rc<StateMachine<_, _>>` when hooks need to fire triggers back into it.

pub mod builder;
pub mod controller;
pub mod core;
pub mod machine;

// Re-export the public surface
pub use crate::builder::{HierarchyError, StateConfiguration};
pub use crate::controller::{EmptyEnterData, EmptyExitData, EnterData, ExitData, StateController};
pub use crate::core::{StateId, StateRepresentation, Transition, TriggerId};
pub use crate::machine::{FireError, StateMachine};
