//! The state machine façade and its trigger-firing protocol.

pub mod error;

pub use error::FireError;

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::rc::Rc;

use tracing::debug;

use crate::builder::StateConfiguration;
use crate::controller::StateController;
use crate::core::{StateId, StateRepresentation, Transition, TriggerId};

/// Hierarchical finite state machine over caller-supplied state and
/// trigger values.
///
/// The machine owns one [`StateConfiguration`] per configured state, the
/// current-state value, and a FIFO of pending triggers. All operations
/// take `&self`: interior mutability lets entry/exit hooks holding an
/// `Rc<StateMachine>` clone fire triggers back into the machine. Such
/// nested fires are never processed inline; they are queued and drained
/// after the current transition completes, in the order they were fired.
///
/// The machine is single-threaded by design and provides no internal
/// synchronization.
///
/// # Example
///
/// ```rust
/// use trellis::StateMachine;
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum Phase {
///     Idle,
///     Running,
///     Paused,
/// }
///
/// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
/// enum Input {
///     Start,
///     Pause,
///     Resume,
/// }
///
/// let machine = StateMachine::new(Phase::Idle);
/// machine
///     .configure(Phase::Idle, None)
///     .add_transition(Input::Start, Phase::Running);
/// machine
///     .configure(Phase::Running, None)
///     .add_transition(Input::Pause, Phase::Paused);
/// machine
///     .configure(Phase::Paused, None)
///     .add_transition(Input::Resume, Phase::Running);
///
/// machine.fire(Input::Start).unwrap();
/// machine.fire(Input::Pause).unwrap();
/// assert!(machine.is_in_state(&Phase::Paused));
///
/// machine.fire(Input::Resume).unwrap();
/// assert_eq!(machine.current_state(), Phase::Running);
/// ```
pub struct StateMachine<S: StateId, T: TriggerId> {
    configurations: RefCell<HashMap<S, StateConfiguration<S, T>>>,
    current: RefCell<S>,
    queue: RefCell<VecDeque<T>>,
    firing: Cell<bool>,
    observer: RefCell<Option<Rc<dyn Fn()>>>,
}

impl<S: StateId, T: TriggerId> StateMachine<S, T> {
    /// Create a machine resting in `initial`. The initial state needs no
    /// configuration until a trigger is fired from it.
    pub fn new(initial: S) -> Self {
        Self {
            configurations: RefCell::new(HashMap::new()),
            current: RefCell::new(initial),
            queue: RefCell::new(VecDeque::new()),
            firing: Cell::new(false),
            observer: RefCell::new(None),
        }
    }

    /// Fetch or create the configuration for `state`.
    ///
    /// The first call for a given identity creates its representation and
    /// binds `controller` to it; later calls return a handle to the
    /// existing configuration and leave the original controller in place,
    /// ignoring the argument.
    pub fn configure(
        &self,
        state: S,
        controller: Option<Rc<dyn StateController>>,
    ) -> StateConfiguration<S, T> {
        self.configurations
            .borrow_mut()
            .entry(state.clone())
            .or_insert_with(|| StateConfiguration::new(state, controller))
            .clone()
    }

    /// The state the machine currently rests in.
    pub fn current_state(&self) -> S {
        self.current.borrow().clone()
    }

    /// Flat equality check against the current state. Ancestors of the
    /// current state do not count; for hierarchy-aware containment use the
    /// representation's [`includes`](StateRepresentation::includes):
    ///
    /// ```rust
    /// use trellis::StateMachine;
    ///
    /// #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    /// enum Mode {
    ///     Online,
    ///     Syncing,
    /// }
    ///
    /// let machine: StateMachine<Mode, u8> = StateMachine::new(Mode::Syncing);
    /// let online = machine.configure(Mode::Online, None);
    /// let syncing = machine.configure(Mode::Syncing, None);
    /// online.add_sub_state(&syncing).unwrap();
    ///
    /// assert!(!machine.is_in_state(&Mode::Online));
    /// let current = machine.state_representation(&machine.current_state()).unwrap();
    /// assert!(current.borrow().includes(&Mode::Online));
    /// ```
    pub fn is_in_state(&self, state: &S) -> bool {
        *self.current.borrow() == *state
    }

    /// True if the current state's own transition table handles `trigger`.
    /// Returns false when the current state was never configured.
    pub fn can_fire(&self, trigger: &T) -> bool {
        self.state_representation(&self.current_state())
            .map(|rep| rep.borrow().can_handle(trigger))
            .unwrap_or(false)
    }

    /// The triggers configured on the current state, in no particular
    /// order. Empty when the current state was never configured.
    pub fn permitted_triggers(&self) -> Vec<T> {
        self.state_representation(&self.current_state())
            .map(|rep| rep.borrow().permitted_triggers())
            .unwrap_or_default()
    }

    /// The representation backing `state`, or
    /// [`FireError::UnconfiguredState`] if it was never configured.
    pub fn state_representation(
        &self,
        state: &S,
    ) -> Result<Rc<RefCell<StateRepresentation<S, T>>>, FireError<S, T>> {
        self.configurations
            .borrow()
            .get(state)
            .map(StateConfiguration::representation)
            .ok_or_else(|| FireError::UnconfiguredState(state.clone()))
    }

    /// Register the transition observer, replacing any previous one. The
    /// observer runs once per transition, before the exit/enter hooks and
    /// before the current state changes.
    pub fn on_transitioned<F>(&self, observer: F)
    where
        F: Fn() + 'static,
    {
        *self.observer.borrow_mut() = Some(Rc::new(observer));
    }

    /// Fire `trigger` against the current state.
    ///
    /// The trigger is enqueued; if no firing is in progress the queue is
    /// drained immediately, otherwise this call returns at once and the
    /// in-progress drain picks the trigger up after the current transition
    /// completes. Each drained trigger causes at most one transition:
    /// exit hooks on the source state, then enter hooks on the destination
    /// state, then the current-state commit.
    ///
    /// Errors from deferred triggers surface from the outermost `fire`
    /// call; a nested `fire` made inside a hook always returns `Ok`.
    pub fn fire(&self, trigger: T) -> Result<(), FireError<S, T>> {
        self.queue.borrow_mut().push_back(trigger);
        if self.firing.get() {
            // nested call from inside a hook, the active drain handles it
            return Ok(());
        }

        self.firing.set(true);
        let result = self.drain_queue();
        self.firing.set(false);
        result
    }

    /// Process queued triggers head-first until the queue empties. On
    /// failure the remaining queue is discarded so the machine does not
    /// wedge with stale triggers.
    fn drain_queue(&self) -> Result<(), FireError<S, T>> {
        loop {
            let next = self.queue.borrow().front().cloned();
            let Some(trigger) = next else {
                return Ok(());
            };

            if let Err(error) = self.fire_trigger(&trigger) {
                self.queue.borrow_mut().clear();
                return Err(error);
            }
            self.queue.borrow_mut().pop_front();
        }
    }

    /// Run the transition algorithm for one trigger. Both failure cases
    /// are checked before any hook runs or any state changes.
    fn fire_trigger(&self, trigger: &T) -> Result<(), FireError<S, T>> {
        let source = self.current_state();
        let source_rep = self.state_representation(&source)?;

        if !source_rep.borrow().can_handle(trigger) {
            return Err(FireError::UnsupportedTrigger {
                state: source,
                trigger: trigger.clone(),
            });
        }

        // a permitted trigger with no destination is a deliberate no-op:
        // no hooks run and the state does not change
        let destination = source_rep.borrow().transition_target(trigger).cloned();
        let Some(destination) = destination else {
            return Ok(());
        };

        let destination_rep = self.state_representation(&destination)?;

        let observer = self.observer.borrow().clone();
        if let Some(observer) = observer {
            observer();
        }

        let transition = Transition::new(source, destination.clone(), trigger.clone());
        source_rep.borrow().on_exit(&transition);
        destination_rep.borrow().on_enter(&transition);
        *self.current.borrow_mut() = destination;

        debug!(
            source = ?transition.source,
            destination = ?transition.destination,
            trigger = ?transition.trigger,
            "transition committed"
        );
        Ok(())
    }
}

impl<S: StateId, T: TriggerId> fmt::Display for StateMachine<S, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "current state: {:?} | permitted triggers: ", self.current.borrow())?;
        for (index, trigger) in self.permitted_triggers().iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{trigger:?}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{EmptyExitData, EnterData, ExitData};

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    enum Phase {
        Idle,
        Running,
        Paused,
        Stopped,
    }

    #[derive(Clone, PartialEq, Eq, Hash, Debug)]
    enum Input {
        Start,
        Pause,
        Resume,
        Stop,
        Heartbeat,
    }

    type Log = Rc<RefCell<Vec<String>>>;

    fn log() -> Log {
        Rc::new(RefCell::new(Vec::new()))
    }

    fn push(log: &Log, entry: impl Into<String>) {
        log.borrow_mut().push(entry.into());
    }

    /// Idle --Start--> Running --Pause--> Paused --Resume--> Running, with
    /// every exit/enter appended to `events`.
    fn scenario_machine(events: &Log) -> StateMachine<Phase, Input> {
        let machine = StateMachine::new(Phase::Idle);

        let transitions = [
            (Phase::Idle, Input::Start, Phase::Running),
            (Phase::Running, Input::Pause, Phase::Paused),
            (Phase::Paused, Input::Resume, Phase::Running),
        ];
        for (state, trigger, target) in transitions {
            let config = machine.configure(state.clone(), None);
            config.add_transition(trigger, target);

            let enter_log = Rc::clone(events);
            let enter_state = state.clone();
            config.add_entry_action(move || {
                enter_log.borrow_mut().push(format!("enter {enter_state:?}"));
            });
            let exit_log = Rc::clone(events);
            config.add_exit_action(move || {
                exit_log.borrow_mut().push(format!("exit {state:?}"));
            });
        }
        machine
    }

    #[test]
    fn fires_a_configured_transition() {
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);
        machine.configure(Phase::Running, None);

        machine.fire(Input::Start).unwrap();
        assert_eq!(machine.current_state(), Phase::Running);
        assert!(machine.is_in_state(&Phase::Running));
    }

    #[test]
    fn unsupported_trigger_fails_without_mutation() {
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);

        let error = machine.fire(Input::Pause).unwrap_err();
        assert_eq!(
            error,
            FireError::UnsupportedTrigger {
                state: Phase::Idle,
                trigger: Input::Pause,
            }
        );
        assert_eq!(machine.current_state(), Phase::Idle);
    }

    #[test]
    fn firing_from_an_unconfigured_state_fails() {
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);

        let error = machine.fire(Input::Start).unwrap_err();
        assert_eq!(error, FireError::UnconfiguredState(Phase::Idle));
    }

    #[test]
    fn unconfigured_destination_fails_before_any_hook() {
        let events = log();
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        let idle = machine.configure(Phase::Idle, None);
        idle.add_transition(Input::Start, Phase::Running);
        let exit_log = Rc::clone(&events);
        idle.add_exit_action(move || push(&exit_log, "exit Idle"));

        let error = machine.fire(Input::Start).unwrap_err();
        assert_eq!(error, FireError::UnconfiguredState(Phase::Running));
        assert_eq!(machine.current_state(), Phase::Idle);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn scenario_walkthrough_orders_exit_before_enter() {
        let events = log();
        let machine = scenario_machine(&events);

        assert!(machine.fire(Input::Pause).is_err());

        machine.fire(Input::Start).unwrap();
        machine.fire(Input::Pause).unwrap();
        machine.fire(Input::Resume).unwrap();

        assert_eq!(machine.current_state(), Phase::Running);
        assert_eq!(
            *events.borrow(),
            vec![
                "exit Idle",
                "enter Running",
                "exit Running",
                "enter Paused",
                "exit Paused",
                "enter Running",
            ]
        );
    }

    #[test]
    fn ignored_trigger_is_a_silent_noop() {
        let events = log();
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Running);
        let running = machine.configure(Phase::Running, None);
        running.ignore(Input::Heartbeat);
        let exit_log = Rc::clone(&events);
        running.add_exit_action(move || push(&exit_log, "exit"));
        let enter_log = Rc::clone(&events);
        running.add_entry_action(move || push(&enter_log, "enter"));

        machine.fire(Input::Heartbeat).unwrap();

        assert_eq!(machine.current_state(), Phase::Running);
        assert!(events.borrow().is_empty());
    }

    #[test]
    fn nested_fire_is_deferred_until_enter_completes() {
        let events = log();
        let machine = Rc::new(scenario_machine(&events));

        // a second entry action on Running that immediately pauses; it must
        // run after Running's full enter sequence, not inside it
        let nested = Rc::clone(&machine);
        let nested_log = Rc::clone(&events);
        machine.configure(Phase::Running, None).add_entry_action(move || {
            push(&nested_log, "firing Pause from enter");
            nested.fire(Input::Pause).unwrap();
        });

        machine.fire(Input::Start).unwrap();

        assert_eq!(machine.current_state(), Phase::Paused);
        assert_eq!(
            *events.borrow(),
            vec![
                "exit Idle",
                "enter Running",
                "firing Pause from enter",
                "exit Running",
                "enter Paused",
            ]
        );
    }

    #[test]
    fn nested_fires_drain_in_fifo_order() {
        let machine: Rc<StateMachine<Phase, Input>> = Rc::new(StateMachine::new(Phase::Idle));
        let order = log();

        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);
        machine
            .configure(Phase::Paused, None)
            .add_transition(Input::Stop, Phase::Stopped);
        machine.configure(Phase::Stopped, None);

        let running = machine.configure(Phase::Running, None);
        running.add_transition(Input::Pause, Phase::Paused);
        let nested = Rc::clone(&machine);
        running.add_entry_action(move || {
            nested.fire(Input::Pause).unwrap();
            nested.fire(Input::Stop).unwrap();
        });

        let observer_machine = Rc::clone(&machine);
        let observer_log = Rc::clone(&order);
        machine.on_transitioned(move || {
            push(&observer_log, format!("leaving {:?}", observer_machine.current_state()));
        });

        machine.fire(Input::Start).unwrap();

        assert_eq!(machine.current_state(), Phase::Stopped);
        assert_eq!(
            *order.borrow(),
            vec!["leaving Idle", "leaving Running", "leaving Paused"]
        );
    }

    #[test]
    fn observer_runs_before_the_state_commits() {
        let machine: Rc<StateMachine<Phase, Input>> = Rc::new(StateMachine::new(Phase::Idle));
        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);
        machine.configure(Phase::Running, None);

        let seen = Rc::new(RefCell::new(None));
        let observer_machine = Rc::clone(&machine);
        let observer_seen = Rc::clone(&seen);
        machine.on_transitioned(move || {
            *observer_seen.borrow_mut() = Some(observer_machine.current_state());
        });

        machine.fire(Input::Start).unwrap();
        assert_eq!(*seen.borrow(), Some(Phase::Idle));
    }

    #[test]
    fn on_transitioned_replaces_the_previous_observer() {
        let events = log();
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);
        machine.configure(Phase::Running, None);

        let first = Rc::clone(&events);
        machine.on_transitioned(move || push(&first, "first"));
        let second = Rc::clone(&events);
        machine.on_transitioned(move || push(&second, "second"));

        machine.fire(Input::Start).unwrap();
        assert_eq!(*events.borrow(), vec!["second"]);
    }

    #[test]
    fn duplicate_configure_returns_the_same_configuration() {
        struct Tracking {
            log: Log,
            label: &'static str,
        }

        impl crate::controller::StateController for Tracking {
            fn on_entered(&self, _data: EnterData) {
                push(&self.log, format!("{} entered", self.label));
            }

            fn on_exited(&self) -> ExitData {
                Box::new(EmptyExitData)
            }
        }

        let events = log();
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);

        let first = machine.configure(
            Phase::Running,
            Some(Rc::new(Tracking {
                log: Rc::clone(&events),
                label: "original",
            })),
        );
        let second = machine.configure(
            Phase::Running,
            Some(Rc::new(Tracking {
                log: Rc::clone(&events),
                label: "replacement",
            })),
        );

        assert!(Rc::ptr_eq(&first.representation(), &second.representation()));

        machine.fire(Input::Start).unwrap();
        assert_eq!(*events.borrow(), vec!["original entered"]);
    }

    #[test]
    fn controller_enter_data_flows_from_the_producer() {
        struct Expecting {
            log: Log,
        }

        impl crate::controller::StateController for Expecting {
            fn on_entered(&self, data: EnterData) {
                let record = data
                    .downcast_ref::<Transition<Phase, Input>>()
                    .expect("producer payload");
                push(&self.log, format!("entered via {:?}", record.trigger));
            }

            fn on_exited(&self) -> ExitData {
                Box::new(EmptyExitData)
            }
        }

        let events = log();
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);
        machine
            .configure(Phase::Running, Some(Rc::new(Expecting { log: Rc::clone(&events) })))
            .set_entry_data(|transition| -> EnterData { Box::new(transition.clone()) });

        machine.fire(Input::Start).unwrap();
        assert_eq!(*events.borrow(), vec!["entered via Start"]);
    }

    #[test]
    fn controller_exit_data_reaches_the_consumer() {
        struct Reporting;

        impl crate::controller::StateController for Reporting {
            fn on_entered(&self, _data: EnterData) {}

            fn on_exited(&self) -> ExitData {
                Box::new(31u32)
            }
        }

        let events = log();
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        let idle = machine.configure(Phase::Idle, Some(Rc::new(Reporting)));
        idle.add_transition(Input::Start, Phase::Running);
        let consumer_log = Rc::clone(&events);
        idle.set_exit_data(move |data, transition| {
            let value = data.downcast_ref::<u32>().copied().unwrap_or(0);
            push(
                &consumer_log,
                format!("left for {:?} with {value}", transition.destination),
            );
        });
        machine.configure(Phase::Running, None);

        machine.fire(Input::Start).unwrap();
        assert_eq!(*events.borrow(), vec!["left for Running with 31"]);
    }

    #[test]
    fn error_during_drain_discards_pending_triggers() {
        let machine: Rc<StateMachine<Phase, Input>> = Rc::new(StateMachine::new(Phase::Idle));
        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);

        let running = machine.configure(Phase::Running, None);
        running.add_transition(Input::Pause, Phase::Paused);
        let nested = Rc::clone(&machine);
        running.add_entry_action(move || {
            // Stop is not permitted in Running; queued behind it, Pause
            // must be dropped when the drain fails
            nested.fire(Input::Stop).unwrap();
            nested.fire(Input::Pause).unwrap();
        });
        machine.configure(Phase::Paused, None);

        let error = machine.fire(Input::Start).unwrap_err();
        assert_eq!(
            error,
            FireError::UnsupportedTrigger {
                state: Phase::Running,
                trigger: Input::Stop,
            }
        );
        assert_eq!(machine.current_state(), Phase::Running);

        // the machine is not wedged: a fresh fire still works
        machine.fire(Input::Pause).unwrap();
        assert_eq!(machine.current_state(), Phase::Paused);
    }

    #[test]
    fn can_fire_and_permitted_triggers_follow_the_current_state() {
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        assert!(!machine.can_fire(&Input::Start));
        assert!(machine.permitted_triggers().is_empty());

        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running)
            .ignore(Input::Heartbeat);

        assert!(machine.can_fire(&Input::Start));
        assert!(machine.can_fire(&Input::Heartbeat));
        assert!(!machine.can_fire(&Input::Stop));
        assert_eq!(machine.permitted_triggers().len(), 2);
    }

    #[test]
    fn hierarchy_queries_reach_through_the_representation() {
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Paused);
        let running = machine.configure(Phase::Running, None);
        let paused = machine.configure(Phase::Paused, None);
        running.add_sub_state(&paused).unwrap();

        assert!(!machine.is_in_state(&Phase::Running));
        let current = machine.state_representation(&machine.current_state()).unwrap();
        assert!(current.borrow().includes(&Phase::Running));
        assert!(!current.borrow().includes(&Phase::Idle));
    }

    #[test]
    fn display_lists_state_and_triggers() {
        let machine: StateMachine<Phase, Input> = StateMachine::new(Phase::Idle);
        machine
            .configure(Phase::Idle, None)
            .add_transition(Input::Start, Phase::Running);

        let rendered = machine.to_string();
        assert_eq!(rendered, "current state: Idle | permitted triggers: Start");
    }
}
