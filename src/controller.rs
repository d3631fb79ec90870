//! The collaborator contract invoked on state entry and exit.
//!
//! A controller is an optional capability bound to a state when it is
//! first configured. The machine calls `on_entered` after resolving the
//! entry payload and `on_exited` while leaving the state; the controller
//! may fire triggers back into the machine from either hook (those fires
//! are deferred and processed after the current transition completes).

use std::any::Any;

/// Payload handed to [`StateController::on_entered`].
///
/// Payloads are opaque to the engine: any owned `'static` value qualifies,
/// and the receiving side downcasts to the concrete type it expects.
pub type EnterData = Box<dyn Any>;

/// Payload returned from [`StateController::on_exited`].
pub type ExitData = Box<dyn Any>;

/// Entry payload used when a state has no entry-data producer.
pub struct EmptyEnterData;

/// Exit payload for controllers with nothing to report.
pub struct EmptyExitData;

/// Capability provider bound to a state representation.
///
/// The representation holds the controller behind a shared handle and
/// never assumes exclusive ownership of it.
///
/// # Example
///
/// ```rust
/// use trellis::{EmptyExitData, EnterData, ExitData, StateController};
///
/// struct DoorController;
///
/// impl StateController for DoorController {
///     fn on_entered(&self, _data: EnterData) {
///         // react to the state being entered
///     }
///
///     fn on_exited(&self) -> ExitData {
///         Box::new(EmptyExitData)
///     }
/// }
/// ```
pub trait StateController {
    /// Called while entering the bound state, with the payload produced by
    /// the state's entry-data producer (or [`EmptyEnterData`] if none is
    /// registered).
    fn on_entered(&self, data: EnterData);

    /// Called while exiting the bound state. The returned payload is handed
    /// to the state's exit-data consumer, if one is registered.
    fn on_exited(&self) -> ExitData;
}
