//! Fluent authoring surface for one state.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::builder::error::HierarchyError;
use crate::controller::{EnterData, ExitData, StateController};
use crate::core::{StateId, StateRepresentation, Transition, TriggerId};

/// Declarative handle over exactly one [`StateRepresentation`].
///
/// A configuration is obtained from
/// [`StateMachine::configure`](crate::StateMachine::configure) and is the
/// only way to mutate a state's transition table, hierarchy link, and
/// hooks. Cloning a configuration clones the handle, not the state: all
/// clones front the same representation, which is how repeated `configure`
/// calls return "the same" configuration.
///
/// Every operation returns `&Self` so declarations chain:
///
/// ```rust
/// use trellis::StateMachine;
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
///     Heartbeat,
/// }
///
/// let machine = StateMachine::new(Phase::Idle);
/// machine
///     .configure(Phase::Idle, None)
///     .add_transition(Input::Start, Phase::Running)
///     .add_exit_action(|| println!("leaving idle"));
/// machine
///     .configure(Phase::Running, None)
///     .ignore(Input::Heartbeat)
///     .add_entry_action(|| println!("running"));
/// ```
#[derive(Clone)]
pub struct StateConfiguration<S: StateId, T: TriggerId> {
    representation: Rc<RefCell<StateRepresentation<S, T>>>,
}

impl<S: StateId, T: TriggerId> StateConfiguration<S, T> {
    pub(crate) fn new(state: S, controller: Option<Rc<dyn StateController>>) -> Self {
        Self {
            representation: Rc::new(RefCell::new(StateRepresentation::new(state, controller))),
        }
    }

    /// The identity this configuration authors.
    pub fn state(&self) -> S {
        self.representation.borrow().state().clone()
    }

    /// Shared handle to the owned representation, for hierarchy-aware
    /// queries such as
    /// [`includes`](crate::core::StateRepresentation::includes).
    pub fn representation(&self) -> Rc<RefCell<StateRepresentation<S, T>>> {
        Rc::clone(&self.representation)
    }

    /// Declare that firing `trigger` from this state moves the machine to
    /// `target`. Re-declaring the same trigger overwrites the previous
    /// target silently. The target does not need to be configured yet;
    /// that is checked at firing time.
    pub fn add_transition(&self, trigger: T, target: S) -> &Self {
        self.representation.borrow_mut().add_transition(trigger, target);
        self
    }

    /// Declare that `trigger` is accepted in this state but causes no
    /// transition: firing it succeeds without invoking any exit or entry
    /// hooks and without changing the current state.
    pub fn ignore(&self, trigger: T) -> &Self {
        self.representation.borrow_mut().ignore(trigger);
        self
    }

    /// Make `sub` a sub-state of this state, so hierarchy queries on `sub`
    /// include this state and its ancestors.
    ///
    /// Rejects a link that would make a state its own ancestor; the
    /// super-state graph must remain a forest. A sub-state has at most one
    /// parent, so re-declaring replaces the previous link.
    pub fn add_sub_state(&self, sub: &StateConfiguration<S, T>) -> Result<&Self, HierarchyError<S>> {
        let parent_state = self.state();
        let child_state = sub.state();
        if parent_state == child_state {
            return Err(HierarchyError::SelfParent(child_state));
        }

        // if the prospective child already sits above us, the link would
        // close a loop
        let mut ancestor = self.representation.borrow().super_state();
        while let Some(weak) = ancestor {
            let Some(parent) = weak.upgrade() else {
                break;
            };
            let parent = parent.borrow();
            if *parent.state() == child_state {
                return Err(HierarchyError::Cycle {
                    parent: parent_state,
                    child: child_state,
                });
            }
            ancestor = parent.super_state();
        }

        sub.representation
            .borrow_mut()
            .set_super_state(Rc::downgrade(&self.representation));
        Ok(self)
    }

    /// Register an action invoked each time this state is entered, after
    /// the bound controller has been notified. Actions run in registration
    /// order.
    pub fn add_entry_action<F>(&self, action: F) -> &Self
    where
        F: Fn() + 'static,
    {
        self.representation.borrow_mut().add_entry_action(Box::new(action));
        self
    }

    /// Register an action invoked each time this state is exited, after
    /// the controller and exit-data consumer have run.
    pub fn add_exit_action<F>(&self, action: F) -> &Self
    where
        F: Fn() + 'static,
    {
        self.representation.borrow_mut().add_exit_action(Box::new(action));
        self
    }

    /// Set the producer that builds the payload handed to the bound
    /// controller's `on_entered`. Without a producer the controller
    /// receives an [`EmptyEnterData`](crate::EmptyEnterData). Replaces any
    /// previous producer.
    pub fn set_entry_data<F>(&self, producer: F) -> &Self
    where
        F: Fn(&Transition<S, T>) -> EnterData + 'static,
    {
        self.representation.borrow_mut().set_entry_data(Box::new(producer));
        self
    }

    /// Set the consumer that receives the controller's exit payload
    /// together with the transition record. Replaces any previous
    /// consumer.
    pub fn set_exit_data<F>(&self, consumer: F) -> &Self
    where
        F: Fn(ExitData, &Transition<S, T>) + 'static,
    {
        self.representation.borrow_mut().set_exit_data(Box::new(consumer));
        self
    }
}

impl<S: StateId, T: TriggerId> fmt::Debug for StateConfiguration<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateConfiguration")
            .field("state", self.representation.borrow().state())
            .finish()
    }
}
