// Copyright 2025 Cornell University
// released under MIT License

//! # State queries
//! Closures and enabled-label sets used by composition and simulation.

use crate::errors::{AutomatonError, AutomatonResult};
use crate::ir::{InterfaceAutomaton, StateId, TransitionKind};
use rustc_hash::FxHashSet;

impl InterfaceAutomaton {
    /// States reachable from `state` through internal transitions only,
    /// including `state` itself.
    pub fn epsilon_closure(&self, state: StateId) -> FxHashSet<StateId> {
        let mut closure = FxHashSet::default();
        closure.insert(state);
        let mut frontier = vec![state];
        while let Some(current) = frontier.pop() {
            for tran in self[current].outgoing() {
                let tran = &self[tran];
                if tran.kind() == TransitionKind::Internal && closure.insert(tran.destination()) {
                    frontier.push(tran.destination());
                }
            }
        }
        closure
    }

    /// Labels of the outgoing transitions of `state` with the given kind
    pub fn transition_labels_from(&self, state: StateId, kind: TransitionKind) -> FxHashSet<String> {
        self[state]
            .outgoing()
            .iter()
            .map(|t| &self[t])
            .filter(|t| t.kind() == kind)
            .map(|t| t.label())
            .collect()
    }

    /// Input labels enabled in every state of the epsilon-closure of `state`.
    /// An input is only externally enabled if no internal move can disable it.
    pub fn externally_enabled_input_labels(&self, state: StateId) -> FxHashSet<String> {
        let mut labels = self.transition_labels_from(state, TransitionKind::Input);
        for other in self.epsilon_closure(state) {
            if other != state {
                let enabled = self.transition_labels_from(other, TransitionKind::Input);
                labels.retain(|l| enabled.contains(l));
            }
        }
        labels
    }

    /// Output labels enabled in any state of the epsilon-closure of `state`.
    pub fn externally_enabled_output_labels(&self, state: StateId) -> FxHashSet<String> {
        let mut labels = FxHashSet::default();
        for other in self.epsilon_closure(state) {
            labels.extend(self.transition_labels_from(other, TransitionKind::Output));
        }
        labels
    }

    /// Destinations of transitions labelled `label` leaving any state in the
    /// epsilon-closure of `state`. The label is expected to be externally
    /// enabled at `state`; this is not checked.
    pub fn externally_enabled_destinations(&self, state: StateId, label: &str) -> FxHashSet<StateId> {
        self.epsilon_closure(state)
            .into_iter()
            .flat_map(|source| self.destinations(source, label))
            .collect()
    }

    /// Destinations of the transitions labelled `label` leaving `state`.
    /// More than one for nondeterministic automata, empty if none exists.
    pub fn destinations(&self, state: StateId, label: &str) -> Vec<StateId> {
        let mut out: Vec<StateId> = self[state]
            .outgoing()
            .iter()
            .map(|t| &self[t])
            .filter(|t| t.has_label(label))
            .map(|t| t.destination())
            .collect();
        out.sort();
        out.dedup();
        out
    }

    /// States without outgoing transitions. Only meaningful for closed automata.
    pub fn deadlock_states(&self) -> AutomatonResult<FxHashSet<StateId>> {
        if !self.is_closed() {
            return Err(AutomatonError::NotClosed {
                automaton: self.name().to_string(),
            });
        }
        Ok(self
            .states()
            .filter(|s| self[s].outgoing().is_empty())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::tests::{build, build_comp};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn ids(a: &InterfaceAutomaton, names: &[&str]) -> FxHashSet<StateId> {
        names.iter().map(|n| a.state_id(n).unwrap()).collect()
    }

    fn labels(names: &[&str]) -> FxHashSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    /// ```text
    /// s0 --x;--> s1 --y;--> s2
    ///  |          |          |
    ///  a?         a?,b?      a?,o!
    /// ```
    fn build_chain() -> InterfaceAutomaton {
        build(
            "chain",
            &["s0", "s1", "s2", "d"],
            &[
                ("s0", "x;", "s1"),
                ("s1", "y;", "s2"),
                ("s0", "a?", "d"),
                ("s1", "a?", "d"),
                ("s1", "b?", "d"),
                ("s2", "a?", "d"),
                ("s2", "o!", "d"),
                ("d", "z;", "s0"),
            ],
        )
    }

    #[test]
    fn epsilon_closure_follows_internal_transitions_only() {
        let a = build_chain();
        let s0 = a.state_id("s0").unwrap();
        assert_eq!(a.epsilon_closure(s0), ids(&a, &["s0", "s1", "s2"]));
        let d = a.state_id("d").unwrap();
        assert_eq!(a.epsilon_closure(d), ids(&a, &["d", "s0", "s1", "s2"]));
    }

    #[test]
    fn externally_enabled_inputs_intersect_outputs_union() {
        let a = build_chain();
        let s0 = a.state_id("s0").unwrap();
        let s1 = a.state_id("s1").unwrap();
        assert_eq!(a.externally_enabled_input_labels(s0), labels(&["a?"]));
        assert_eq!(a.externally_enabled_input_labels(s1), labels(&["a?"]));
        assert_eq!(a.externally_enabled_output_labels(s0), labels(&["o!"]));
        let s2 = a.state_id("s2").unwrap();
        assert_eq!(a.externally_enabled_input_labels(s2), labels(&["a?"]));
        // `d` has no inputs itself, so nothing is externally enabled
        let d = a.state_id("d").unwrap();
        assert!(a.externally_enabled_input_labels(d).is_empty());
        assert_eq!(a.externally_enabled_output_labels(d), labels(&["o!"]));
    }

    #[test]
    fn externally_enabled_destinations_span_the_closure() {
        let mut a = build_chain();
        let s0 = a.state_id("s0").unwrap();
        let s2 = a.state_id("s2").unwrap();
        let e = a.add_state("e").unwrap();
        a.add_transition(s2, e, "o!").unwrap();
        assert_eq!(a.externally_enabled_destinations(s0, "o!"), ids(&a, &["d", "e"]));
        assert!(a.destinations(s0, "o!").is_empty());
        assert_eq!(a.destinations(s2, "o!").len(), 2);
    }

    #[test]
    fn deadlock_requires_a_closed_automaton() {
        let open = build_comp();
        assert!(matches!(
            open.deadlock_states(),
            Err(AutomatonError::NotClosed { .. })
        ));

        let closed = build(
            "closed",
            &["a", "b", "c"],
            &[("a", "x;", "b"), ("a", "y;", "c"), ("c", "z;", "a")],
        );
        assert_eq!(closed.deadlock_states().unwrap(), ids(&closed, &["b"]));
    }

    #[test]
    fn random_closures_are_closed_under_internal_steps() {
        let mut rng = StdRng::seed_from_u64(0x1a);
        for _ in 0..50 {
            let n = rng.gen_range(1..8);
            let mut a = InterfaceAutomaton::new("random");
            let states: Vec<StateId> = (0..n)
                .map(|i| a.add_state(format!("s{i}")).unwrap())
                .collect();
            for _ in 0..rng.gen_range(0..20) {
                let src = states[rng.gen_range(0..n)];
                let dst = states[rng.gen_range(0..n)];
                let label = match rng.gen_range(0..3) {
                    0 => "i?",
                    1 => "o!",
                    _ => "t;",
                };
                a.add_transition(src, dst, label).unwrap();
            }
            for s in a.states() {
                let closure = a.epsilon_closure(s);
                assert!(closure.contains(&s));
                for member in &closure {
                    for tran in a[member].outgoing() {
                        let tran = &a[tran];
                        if tran.kind() == TransitionKind::Internal {
                            assert!(closure.contains(&tran.destination()));
                        }
                    }
                }
            }
        }
    }
}
