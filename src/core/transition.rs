//! The transition record handed to enter/exit hooks.

use serde::{Deserialize, Serialize};

use super::state::{StateId, TriggerId};

/// Immutable description of one in-flight transition.
///
/// A record is constructed fresh for every firing, passed by reference to
/// the exit hooks of the source state and the enter hooks of the
/// destination state, and discarded afterwards. It has no identity beyond
/// its three fields.
///
/// # Example
///
/// ```rust
/// use trellis::Transition;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum Phase {
///     Idle,
///     Running,
/// }
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum Input {
///     Start,
/// }
///
/// let transition = Transition::new(Phase::Idle, Phase::Running, Input::Start);
/// assert_eq!(transition.source, Phase::Idle);
/// assert_eq!(transition.destination, Phase::Running);
/// assert_eq!(transition.trigger, Input::Start);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition<S: StateId, T: TriggerId> {
    /// The state being exited.
    pub source: S,
    /// The state being entered.
    pub destination: S,
    /// The trigger that caused the transition.
    pub trigger: T,
}

impl<S: StateId, T: TriggerId> Transition<S, T> {
    /// Build a record for one firing.
    pub fn new(source: S, destination: S, trigger: T) -> Self {
        Self {
            source,
            destination,
            trigger,
        }
    }
}
