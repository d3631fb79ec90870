//! Marker traits for caller-supplied state and trigger identities.
//!
//! The engine never interprets the meaning of a state or trigger value;
//! it only stores them, compares them, and uses them as map keys. Both
//! traits are blanket-implemented, so any `Clone + Eq + Hash + Debug`
//! type qualifies without boilerplate.

use std::fmt::Debug;
use std::hash::Hash;

/// Identity of one machine state.
///
/// States are opaque values distinguishing one position in the machine
/// from another. They are cloned into transition tables and error values,
/// compared for equality, and hashed as map keys; `Debug` is required so
/// errors and trace events can render them.
///
/// # Example
///
/// ```rust
/// use trellis::StateId;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum Phase {
///     Idle,
///     Running,
/// }
///
/// fn assert_state_id<S: StateId>() {}
/// assert_state_id::<Phase>();
/// ```
pub trait StateId: Clone + Eq + Hash + Debug + 'static {}

impl<S> StateId for S where S: Clone + Eq + Hash + Debug + 'static {}

/// Identity of one trigger (event) value.
///
/// Triggers key each state's transition table, so the requirements mirror
/// [`StateId`]. Blanket-implemented like `StateId`.
pub trait TriggerId: Clone + Eq + Hash + Debug + 'static {}

impl<T> TriggerId for T where T: Clone + Eq + Hash + Debug + 'static {}
