//! Firing errors surfaced by the machine façade.

use thiserror::Error;

use crate::core::{StateId, TriggerId};

/// Errors raised while firing a trigger.
///
/// All failures are synchronous and occur before any state mutation: the
/// current state is unchanged when an error is returned. Pending deferred
/// triggers are discarded on failure so the machine stays usable.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FireError<S: StateId, T: TriggerId> {
    #[error("trigger `{trigger:?}` is not configured for state `{state:?}`")]
    UnsupportedTrigger { state: S, trigger: T },

    #[error("state `{0:?}` is not configured, no representation exists for it")]
    UnconfiguredState(S),
}
