//! Configuration errors for the authoring surface.

use thiserror::Error;

use crate::core::StateId;

/// Errors raised while declaring super-state relationships.
///
/// Super-state links must form a forest; a link that would close a loop is
/// rejected at configuration time rather than risking a non-terminating
/// hierarchy walk later.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum HierarchyError<S: StateId> {
    #[error("state `{0:?}` cannot be its own super-state")]
    SelfParent(S),

    #[error("making `{child:?}` a sub-state of `{parent:?}` would create a super-state cycle")]
    Cycle { parent: S, child: S },
}
