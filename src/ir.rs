// Copyright 2025 Cornell University
// released under MIT License

use crate::errors::{AutomatonError, AutomatonResult};
use cranelift_entity::{entity_impl, PrimaryMap};
use log::{debug, trace};
use rustc_hash::{FxHashMap, FxHashSet};
use std::ops::Index;

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct StateId(u32);
entity_impl!(StateId, "state");

#[derive(Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TransitionId(u32);
entity_impl!(TransitionId, "transition");

/// Direction of a port
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum Dir {
    In,
    Out,
}

/// The kind of a transition, derived from the trailing marker of its label
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum TransitionKind {
    /// `name?`
    Input,
    /// `name!`
    Output,
    /// `name;`
    Internal,
}

impl TransitionKind {
    pub fn marker(self) -> char {
        match self {
            TransitionKind::Input => '?',
            TransitionKind::Output => '!',
            TransitionKind::Internal => ';',
        }
    }

    pub fn from_marker(marker: char) -> Option<Self> {
        match marker {
            '?' => Some(TransitionKind::Input),
            '!' => Some(TransitionKind::Output),
            ';' => Some(TransitionKind::Internal),
            _ => None,
        }
    }

    /// Port direction backing a visible transition, `None` for internal ones
    pub fn dir(self) -> Option<Dir> {
        match self {
            TransitionKind::Input => Some(Dir::In),
            TransitionKind::Output => Some(Dir::Out),
            TransitionKind::Internal => None,
        }
    }
}

/// Splits `label` into its base name and kind.
pub fn parse_label(label: &str) -> AutomatonResult<(&str, TransitionKind)> {
    let invalid = || AutomatonError::InvalidLabel {
        label: label.to_string(),
    };
    let marker = label.chars().last().ok_or_else(invalid)?;
    let kind = TransitionKind::from_marker(marker).ok_or_else(invalid)?;
    let name = &label[..label.len() - marker.len_utf8()];
    if name.is_empty() {
        return Err(invalid());
    }
    Ok((name, kind))
}

/// Builds the label for a base name and kind, e.g. `("a", Input)` ↦ `a?`
pub fn make_label(name: &str, kind: TransitionKind) -> String {
    format!("{name}{}", kind.marker())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    name: String,
    /// transitions ending in this state
    incoming: Vec<TransitionId>,
    /// transitions starting in this state
    outgoing: Vec<TransitionId>,
    /// transient states must be left immediately (see `ComposeOptions`)
    transient: bool,
}

impl State {
    fn new(name: String) -> Self {
        Self {
            name,
            incoming: Vec::default(),
            outgoing: Vec::default(),
            transient: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn incoming(&self) -> &[TransitionId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[TransitionId] {
        &self.outgoing
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    source: StateId,
    destination: StateId,
    /// label without the trailing marker
    name: String,
    kind: TransitionKind,
}

impl Transition {
    pub fn source(&self) -> StateId {
        self.source
    }

    pub fn destination(&self) -> StateId {
        self.destination
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TransitionKind {
        self.kind
    }

    pub fn label(&self) -> String {
        make_label(&self.name, self.kind)
    }

    /// Compares against a full label without allocating.
    pub fn has_label(&self, label: &str) -> bool {
        match parse_label(label) {
            Ok((name, kind)) => kind == self.kind && name == self.name,
            Err(_) => false,
        }
    }
}

/// A finite automaton with input, output and internal transitions.
///
/// States and transitions live in arenas indexed by `StateId` and
/// `TransitionId`. Removed entries are tombstoned so that handles stay
/// stable while pruning; every query skips removed entries.
///
/// Ports (for input and output names) and parameters (for internal names)
/// form the contract of the automaton towards its environment. A transition
/// is only consistent if its base name is backed by one of them, see
/// `checks::check`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InterfaceAutomaton {
    name: String,
    states: PrimaryMap<StateId, Option<State>>,
    transitions: PrimaryMap<TransitionId, Option<Transition>>,
    by_name: FxHashMap<String, StateId>,
    initial: Option<StateId>,
    ports: FxHashMap<String, Dir>,
    parameters: FxHashSet<String>,
}

impl InterfaceAutomaton {
    pub fn new(name: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl ToString) {
        self.name = name.to_string();
    }

    pub fn add_state(&mut self, name: impl ToString) -> AutomatonResult<StateId> {
        let name = name.to_string();
        if self.by_name.contains_key(&name) {
            return Err(self.duplicate(name));
        }
        let id = self.states.push(Some(State::new(name.clone())));
        self.by_name.insert(name, id);
        Ok(id)
    }

    /// Adds a transition from `source` to `destination`. The kind is derived
    /// from the trailing marker of `label`. Internal transitions get their
    /// parameter synthesized; input and output transitions expect a port,
    /// which `add_ports` can create from the existing labels.
    pub fn add_transition(
        &mut self,
        source: StateId,
        destination: StateId,
        label: &str,
    ) -> AutomatonResult<TransitionId> {
        self.live_state(source)?;
        self.live_state(destination)?;
        let (name, kind) = parse_label(label)?;
        if kind == TransitionKind::Internal {
            self.parameters.insert(name.to_string());
        }
        let id = self.transitions.push(Some(Transition {
            source,
            destination,
            name: name.to_string(),
            kind,
        }));
        self.state_mut(source).outgoing.push(id);
        self.state_mut(destination).incoming.push(id);
        trace!(
            "{}: added {} --{}--> {}",
            self.name,
            self[source].name,
            label,
            self[destination].name
        );
        Ok(id)
    }

    /// Changes the label of a transition, re-deriving its kind.
    pub fn set_label(&mut self, transition: TransitionId, label: &str) -> AutomatonResult<()> {
        self.live_transition(transition)?;
        let (name, kind) = parse_label(label)?;
        if kind == TransitionKind::Internal {
            self.parameters.insert(name.to_string());
        }
        if let Some(Some(tran)) = self.transitions.get_mut(transition) {
            tran.name = name.to_string();
            tran.kind = kind;
        }
        Ok(())
    }

    pub fn remove_transition(&mut self, transition: TransitionId) -> AutomatonResult<()> {
        self.live_transition(transition)?;
        if let Some(tran) = self.transitions[transition].take() {
            self.state_mut(tran.source)
                .outgoing
                .retain(|t| *t != transition);
            self.state_mut(tran.destination)
                .incoming
                .retain(|t| *t != transition);
        }
        Ok(())
    }

    /// Removes `state` together with all of its incoming and outgoing transitions.
    /// Removing the initial state leaves the automaton without one.
    pub fn remove_state(&mut self, state: StateId) -> AutomatonResult<()> {
        self.live_state(state)?;
        let mut attached: Vec<TransitionId> = self[state].incoming.clone();
        attached.extend(self[state].outgoing.iter().copied());
        attached.sort();
        attached.dedup();
        for tran in attached {
            self.remove_transition(tran)?;
        }
        if let Some(removed) = self.states[state].take() {
            self.by_name.remove(&removed.name);
            debug!("{}: removed state {}", self.name, removed.name);
        }
        if self.initial == Some(state) {
            self.initial = None;
        }
        Ok(())
    }

    /// Removes every state and transition. Ports and parameters are kept.
    pub fn clear(&mut self) {
        self.states.clear();
        self.transitions.clear();
        self.by_name.clear();
        self.initial = None;
    }

    pub fn set_initial_state(&mut self, state: StateId) -> AutomatonResult<()> {
        self.live_state(state)?;
        self.initial = Some(state);
        Ok(())
    }

    pub fn initial_state(&self) -> AutomatonResult<StateId> {
        self.initial
            .ok_or_else(|| AutomatonError::MissingInitialState {
                automaton: self.name.clone(),
            })
    }

    pub fn set_transient(&mut self, state: StateId, transient: bool) -> AutomatonResult<()> {
        self.live_state(state)?;
        self.state_mut(state).transient = transient;
        Ok(())
    }

    pub fn state_id(&self, name: &str) -> Option<StateId> {
        self.by_name.get(name).copied()
    }

    pub fn contains_state(&self, state: StateId) -> bool {
        matches!(self.states.get(state), Some(Some(_)))
    }

    /// Live states in insertion order
    pub fn states(&self) -> impl Iterator<Item = StateId> + '_ {
        self.states
            .iter()
            .filter_map(|(id, state)| state.as_ref().map(|_| id))
    }

    /// Live transitions in insertion order
    pub fn transitions(&self) -> impl Iterator<Item = TransitionId> + '_ {
        self.transitions
            .iter()
            .filter_map(|(id, tran)| tran.as_ref().map(|_| id))
    }

    pub fn state_count(&self) -> usize {
        self.states().count()
    }

    pub fn transition_count(&self) -> usize {
        self.transitions().count()
    }

    pub fn is_empty(&self) -> bool {
        self.states().next().is_none()
    }

    pub fn add_port(&mut self, name: impl ToString, dir: Dir) -> AutomatonResult<()> {
        let name = name.to_string();
        if self.ports.contains_key(&name) {
            return Err(self.duplicate(name));
        }
        self.ports.insert(name, dir);
        Ok(())
    }

    pub fn remove_port(&mut self, name: &str) -> Option<Dir> {
        self.ports.remove(name)
    }

    pub fn port(&self, name: &str) -> Option<Dir> {
        self.ports.get(name).copied()
    }

    pub fn ports(&self) -> impl Iterator<Item = (&str, Dir)> + '_ {
        self.ports.iter().map(|(name, dir)| (name.as_str(), *dir))
    }

    /// Creates the ports of all input and output transitions that do not
    /// have one yet. Existing ports are left alone.
    pub fn add_ports(&mut self) {
        let missing: Vec<(String, Dir)> = self
            .transitions
            .values()
            .flatten()
            .filter_map(|tran| tran.kind.dir().map(|dir| (tran.name.clone(), dir)))
            .collect();
        for (name, dir) in missing {
            self.ports.entry(name).or_insert(dir);
        }
    }

    pub fn add_parameter(&mut self, name: impl ToString) -> AutomatonResult<()> {
        let name = name.to_string();
        if !self.parameters.insert(name.clone()) {
            return Err(self.duplicate(name));
        }
        Ok(())
    }

    pub fn remove_parameter(&mut self, name: &str) -> bool {
        self.parameters.remove(name)
    }

    pub fn has_parameter(&self, name: &str) -> bool {
        self.parameters.contains(name)
    }

    pub fn parameters(&self) -> impl Iterator<Item = &str> + '_ {
        self.parameters.iter().map(String::as_str)
    }

    /// Names of input transitions, recomputed from the labels on every call
    pub fn input_names(&self) -> FxHashSet<String> {
        self.transition_names(TransitionKind::Input)
    }

    /// Names of output transitions, recomputed from the labels on every call
    pub fn output_names(&self) -> FxHashSet<String> {
        self.transition_names(TransitionKind::Output)
    }

    /// Names of internal transitions, recomputed from the labels on every call
    pub fn internal_names(&self) -> FxHashSet<String> {
        self.transition_names(TransitionKind::Internal)
    }

    fn transition_names(&self, kind: TransitionKind) -> FxHashSet<String> {
        self.transitions
            .values()
            .flatten()
            .filter(|tran| tran.kind == kind)
            .map(|tran| tran.name.clone())
            .collect()
    }

    /// Names of the input ports
    pub fn input_port_names(&self) -> FxHashSet<String> {
        self.port_names(Dir::In)
    }

    /// Names of the output ports
    pub fn output_port_names(&self) -> FxHashSet<String> {
        self.port_names(Dir::Out)
    }

    fn port_names(&self, dir: Dir) -> FxHashSet<String> {
        self.ports
            .iter()
            .filter(|(_, d)| **d == dir)
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// An automaton is closed if it has neither input nor output ports.
    pub fn is_closed(&self) -> bool {
        self.ports.is_empty()
    }

    pub(crate) fn live_state(&self, state: StateId) -> AutomatonResult<()> {
        if self.contains_state(state) {
            Ok(())
        } else {
            Err(AutomatonError::UnknownState {
                automaton: self.name.clone(),
                state,
            })
        }
    }

    fn live_transition(&self, transition: TransitionId) -> AutomatonResult<()> {
        if matches!(self.transitions.get(transition), Some(Some(_))) {
            Ok(())
        } else {
            Err(AutomatonError::UnknownTransition {
                automaton: self.name.clone(),
                transition,
            })
        }
    }

    fn state_mut(&mut self, state: StateId) -> &mut State {
        match self.states.get_mut(state) {
            Some(Some(s)) => s,
            _ => panic!("{}: {state} was removed", self.name),
        }
    }

    fn duplicate(&self, name: String) -> AutomatonError {
        AutomatonError::DuplicateName {
            automaton: self.name.clone(),
            name,
        }
    }
}

impl Index<StateId> for InterfaceAutomaton {
    type Output = State;

    fn index(&self, index: StateId) -> &Self::Output {
        match &self.states[index] {
            Some(state) => state,
            None => panic!("{}: {index} was removed", self.name),
        }
    }
}

impl Index<&StateId> for InterfaceAutomaton {
    type Output = State;

    fn index(&self, index: &StateId) -> &Self::Output {
        &self[*index]
    }
}

impl Index<TransitionId> for InterfaceAutomaton {
    type Output = Transition;

    fn index(&self, index: TransitionId) -> &Self::Output {
        match &self.transitions[index] {
            Some(tran) => tran,
            None => panic!("{}: {index} was removed", self.name),
        }
    }
}

impl Index<&TransitionId> for InterfaceAutomaton {
    type Output = Transition;

    fn index(&self, index: &TransitionId) -> &Self::Output {
        &self[*index]
    }
}

impl Index<&str> for InterfaceAutomaton {
    type Output = State;

    fn index(&self, index: &str) -> &Self::Output {
        let index = self.by_name[index];
        &self[index]
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    /// Builds an automaton from `(source, label, destination)` triples.
    /// The first state is initial; ports are synthesized from the labels.
    pub fn build(name: &str, states: &[&str], transitions: &[(&str, &str, &str)]) -> InterfaceAutomaton {
        let mut a = InterfaceAutomaton::new(name);
        for state in states {
            a.add_state(*state).unwrap();
        }
        if let Some(first) = states.first() {
            let initial = a.state_id(first).unwrap();
            a.set_initial_state(initial).unwrap();
        }
        for (src, label, dst) in transitions {
            let src = a.state_id(src).unwrap();
            let dst = a.state_id(dst).unwrap();
            a.add_transition(src, dst, label).unwrap();
        }
        a.add_ports();
        a
    }

    /// `s0 --a!--> s1`
    pub fn build_sender() -> InterfaceAutomaton {
        build("sender", &["s0", "s1"], &[("s0", "a!", "s1")])
    }

    /// `t0 --a?--> t1`
    pub fn build_receiver() -> InterfaceAutomaton {
        build("receiver", &["t0", "t1"], &[("t0", "a?", "t1")])
    }

    /// The producer side of a small request/response protocol.
    /// `msg` is sent, then either `ack` or `nack` is accepted.
    pub fn build_comp() -> InterfaceAutomaton {
        build(
            "comp",
            &["0", "1", "2", "3", "4", "5", "6"],
            &[
                ("0", "msg?", "1"),
                ("1", "send!", "2"),
                ("2", "ack?", "3"),
                ("2", "nack?", "4"),
                ("3", "ok!", "0"),
                ("4", "send!", "5"),
                ("5", "ack?", "3"),
                ("5", "nack?", "6"),
                ("6", "fail!", "0"),
            ],
        )
    }

    /// A user that declares `fail` as an input but only ever accepts `ok`
    pub fn build_user() -> InterfaceAutomaton {
        let mut user = build(
            "user",
            &["0", "1"],
            &[("0", "msg!", "1"), ("1", "ok?", "0")],
        );
        user.add_port("fail", Dir::In).unwrap();
        user
    }

    #[test]
    fn labels_derive_kinds() {
        assert_eq!(parse_label("a?"), Ok(("a", TransitionKind::Input)));
        assert_eq!(parse_label("req!"), Ok(("req", TransitionKind::Output)));
        assert_eq!(parse_label("tau;"), Ok(("tau", TransitionKind::Internal)));
        assert!(matches!(parse_label("a"), Err(AutomatonError::InvalidLabel { .. })));
        assert!(matches!(parse_label("?"), Err(AutomatonError::InvalidLabel { .. })));
        assert!(matches!(parse_label(""), Err(AutomatonError::InvalidLabel { .. })));
        assert_eq!(make_label("x", TransitionKind::Internal), "x;");
    }

    #[test]
    fn duplicate_state_names_are_rejected() {
        let mut a = InterfaceAutomaton::new("a");
        a.add_state("s").unwrap();
        let err = a.add_state("s").unwrap_err();
        assert_eq!(
            err,
            AutomatonError::DuplicateName {
                automaton: "a".to_string(),
                name: "s".to_string()
            }
        );
    }

    #[test]
    fn invalid_label_adds_nothing() {
        let mut a = InterfaceAutomaton::new("a");
        let s = a.add_state("s").unwrap();
        assert!(a.add_transition(s, s, "loop").is_err());
        assert_eq!(a.transition_count(), 0);
        assert!(a[s].outgoing().is_empty());
    }

    #[test]
    fn internal_transitions_synthesize_parameters() {
        let mut a = InterfaceAutomaton::new("a");
        let s = a.add_state("s").unwrap();
        let t = a.add_state("t").unwrap();
        a.add_transition(s, t, "tau;").unwrap();
        a.add_transition(t, s, "tau;").unwrap();
        assert!(a.has_parameter("tau"));
        assert_eq!(a.parameters().count(), 1);
        assert!(a.is_closed());
    }

    #[test]
    fn add_ports_is_idempotent() {
        let mut a = build_comp();
        let before: Vec<(String, Dir)> = {
            let mut p: Vec<_> = a.ports().map(|(n, d)| (n.to_string(), d)).collect();
            p.sort_by(|x, y| x.0.cmp(&y.0));
            p
        };
        a.add_ports();
        let mut after: Vec<_> = a.ports().map(|(n, d)| (n.to_string(), d)).collect();
        after.sort_by(|x, y| x.0.cmp(&y.0));
        assert_eq!(before, after);
        assert_eq!(a.port("msg"), Some(Dir::In));
        assert_eq!(a.port("send"), Some(Dir::Out));
        assert_eq!(a.port("fail"), Some(Dir::Out));
    }

    #[test]
    fn add_ports_keeps_existing_ports() {
        let mut a = InterfaceAutomaton::new("a");
        let s = a.add_state("s").unwrap();
        a.add_port("x", Dir::Out).unwrap();
        a.add_transition(s, s, "x?").unwrap();
        a.add_ports();
        assert_eq!(a.port("x"), Some(Dir::Out));
    }

    #[test]
    fn name_sets_follow_relabeling() {
        let mut a = InterfaceAutomaton::new("a");
        let s = a.add_state("s").unwrap();
        let t = a.add_state("t").unwrap();
        let tran = a.add_transition(s, t, "go?").unwrap();
        assert!(a.input_names().contains("go"));
        a.set_label(tran, "go;").unwrap();
        assert!(a.input_names().is_empty());
        assert!(a.internal_names().contains("go"));
        assert_eq!(a[tran].kind(), TransitionKind::Internal);
        assert_eq!(a[tran].label(), "go;");
        assert!(a[tran].has_label("go;"));
        assert!(!a[tran].has_label("go?"));
        assert!(a.set_label(tran, "go").is_err());
        assert_eq!(a[tran].label(), "go;");
    }

    #[test]
    fn remove_state_severs_transitions() {
        let mut a = build_comp();
        let two = a.state_id("2").unwrap();
        let transitions = a.transition_count();
        a.remove_state(two).unwrap();
        assert_eq!(a.transition_count(), transitions - 3);
        assert!(!a.contains_state(two));
        assert!(a.state_id("2").is_none());
        let one = a.state_id("1").unwrap();
        assert!(a[one].outgoing().is_empty());
        assert!(a.remove_state(two).is_err());
    }

    #[test]
    fn removing_the_initial_state_unsets_it() {
        let mut a = build_sender();
        let s0 = a.initial_state().unwrap();
        a.remove_state(s0).unwrap();
        assert!(matches!(
            a.initial_state(),
            Err(AutomatonError::MissingInitialState { .. })
        ));
        assert_eq!(a.state_count(), 1);
        assert_eq!(a.transition_count(), 0);
    }

    #[test]
    fn self_loops_are_removed_once() {
        let mut a = InterfaceAutomaton::new("a");
        let s = a.add_state("s").unwrap();
        let t = a.add_state("t").unwrap();
        a.add_transition(s, s, "x;").unwrap();
        a.add_transition(t, s, "y;").unwrap();
        a.remove_state(s).unwrap();
        assert_eq!(a.transition_count(), 0);
        assert!(a[t].outgoing().is_empty());
    }

    #[test]
    fn closed_means_no_ports() {
        assert!(!build_sender().is_closed());
        let a = build("closed", &["s"], &[("s", "tau;", "s")]);
        assert!(a.is_closed());
        assert!(!a.is_empty());
        assert!(InterfaceAutomaton::new("e").is_empty());
    }

    #[test]
    fn create_protocol_automata() {
        let comp = build_comp();
        assert_eq!(comp.state_count(), 7);
        assert_eq!(comp.transition_count(), 9);
        assert_eq!(comp["2"].outgoing().len(), 2);
        let user = build_user();
        assert_eq!(user.initial_state().unwrap(), user.state_id("0").unwrap());
    }
}
