//! Per-state bookkeeping: transition table, hierarchy link, hooks.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use crate::controller::{EmptyEnterData, EmptyExitData, EnterData, ExitData, StateController};
use crate::core::state::{StateId, TriggerId};
use crate::core::transition::Transition;

/// Callback producing the payload fed to a controller's `on_entered`.
pub type EntryDataProducer<S, T> = Box<dyn Fn(&Transition<S, T>) -> EnterData>;

/// Callback consuming a controller's exit payload alongside the record of
/// the transition that caused the exit.
pub type ExitDataConsumer<S, T> = Box<dyn Fn(ExitData, &Transition<S, T>)>;

type Action = Box<dyn Fn()>;

/// Everything the machine knows about one configured state.
///
/// A representation is created once, on the first `configure` call for its
/// identity, and lives as long as the owning machine. It is mutated only
/// through the owning [`StateConfiguration`](crate::StateConfiguration);
/// the machine façade reads it during firing.
///
/// The super-state link is a weak back-pointer: representations form a
/// forest, parents do not own children and children do not own parents.
pub struct StateRepresentation<S: StateId, T: TriggerId> {
    state: S,
    super_state: Option<Weak<RefCell<StateRepresentation<S, T>>>>,
    transitions: HashMap<T, Option<S>>,
    controller: Option<Rc<dyn StateController>>,
    entry_actions: Vec<Action>,
    exit_actions: Vec<Action>,
    entry_data: Option<EntryDataProducer<S, T>>,
    exit_data: Option<ExitDataConsumer<S, T>>,
}

impl<S: StateId, T: TriggerId> StateRepresentation<S, T> {
    pub(crate) fn new(state: S, controller: Option<Rc<dyn StateController>>) -> Self {
        Self {
            state,
            super_state: None,
            transitions: HashMap::new(),
            controller,
            entry_actions: Vec::new(),
            exit_actions: Vec::new(),
            entry_data: None,
            exit_data: None,
        }
    }

    /// The identity this representation stands for.
    pub fn state(&self) -> &S {
        &self.state
    }

    /// True if this state's own transition table contains `trigger`.
    ///
    /// Triggers registered via `ignore` count as handled even though they
    /// map to no destination.
    pub fn can_handle(&self, trigger: &T) -> bool {
        self.transitions.contains_key(trigger)
    }

    /// The destination configured for `trigger`, if the trigger is present
    /// and maps to one. Returns `None` both for unknown triggers and for
    /// ignored ones; callers that need to distinguish use [`can_handle`]
    /// first.
    ///
    /// [`can_handle`]: Self::can_handle
    pub fn transition_target(&self, trigger: &T) -> Option<&S> {
        self.transitions.get(trigger).and_then(|target| target.as_ref())
    }

    /// The set of triggers currently configured on this state. Always
    /// exactly the key set of the transition table.
    pub fn permitted_triggers(&self) -> Vec<T> {
        self.transitions.keys().cloned().collect()
    }

    /// True if `candidate` is this state or any state up the super-state
    /// chain.
    ///
    /// The walk carries a visited set so a malformed (cyclic) chain
    /// terminates with `false` instead of looping. Configuration rejects
    /// cycles, so the guard only matters for hand-built hierarchies.
    pub fn includes(&self, candidate: &S) -> bool {
        if self.state == *candidate {
            return true;
        }

        let mut seen = vec![self.state.clone()];
        let mut ancestor = self.super_state.clone();
        while let Some(weak) = ancestor {
            let Some(parent) = weak.upgrade() else {
                break;
            };
            let parent = parent.borrow();
            if *parent.state() == *candidate {
                return true;
            }
            if seen.contains(parent.state()) {
                break;
            }
            seen.push(parent.state().clone());
            ancestor = parent.super_state.clone();
        }
        false
    }

    /// Run the entry side of a transition: feed the produced payload (or
    /// an empty one) to the bound controller, then run each registered
    /// entry action in registration order. Without a controller the
    /// payload step is skipped entirely.
    pub fn on_enter(&self, transition: &Transition<S, T>) {
        if let Some(controller) = &self.controller {
            let data: EnterData = match &self.entry_data {
                Some(producer) => producer(transition),
                None => Box::new(EmptyEnterData),
            };
            controller.on_entered(data);
        }
        for action in &self.entry_actions {
            action();
        }
    }

    /// Run the exit side of a transition: collect the controller's exit
    /// payload, hand it to the exit-data consumer together with the
    /// transition record, then run each registered exit action.
    pub fn on_exit(&self, transition: &Transition<S, T>) {
        let exit_payload = self.controller.as_ref().map(|controller| controller.on_exited());
        if let Some(consumer) = &self.exit_data {
            let payload = exit_payload.unwrap_or_else(|| Box::new(EmptyExitData));
            consumer(payload, transition);
        }
        for action in &self.exit_actions {
            action();
        }
    }

    pub(crate) fn add_transition(&mut self, trigger: T, target: S) {
        // last write wins on duplicate triggers
        self.transitions.insert(trigger, Some(target));
    }

    pub(crate) fn ignore(&mut self, trigger: T) {
        self.transitions.insert(trigger, None);
    }

    pub(crate) fn add_entry_action(&mut self, action: Action) {
        self.entry_actions.push(action);
    }

    pub(crate) fn add_exit_action(&mut self, action: Action) {
        self.exit_actions.push(action);
    }

    pub(crate) fn set_entry_data(&mut self, producer: EntryDataProducer<S, T>) {
        self.entry_data = Some(producer);
    }

    pub(crate) fn set_exit_data(&mut self, consumer: ExitDataConsumer<S, T>) {
        self.exit_data = Some(consumer);
    }

    pub(crate) fn set_super_state(&mut self, parent: Weak<RefCell<StateRepresentation<S, T>>>) {
        self.super_state = Some(parent);
    }

    pub(crate) fn super_state(&self) -> Option<Weak<RefCell<StateRepresentation<S, T>>>> {
        self.super_state.clone()
    }
}
