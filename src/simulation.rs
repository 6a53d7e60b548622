// Copyright 2025 Cornell University
// released under MIT License

//! # Alternating simulation
//! Computes the maximal alternating simulation between a *super* and a *sub*
//! automaton: the super state must accept at least the inputs of the sub
//! state and may only emit outputs that the sub state emits, recursively.

use crate::checks::check;
use crate::errors::AutomatonResult;
use crate::ir::{InterfaceAutomaton, StateId, TransitionKind};
use log::{debug, info};
use rustc_hash::{FxHashMap, FxHashSet};

/// A state of the super automaton paired with a state of the sub automaton
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct StatePair {
    pub super_state: StateId,
    pub sub_state: StateId,
}

impl StatePair {
    pub fn new(super_state: StateId, sub_state: StateId) -> Self {
        Self {
            super_state,
            sub_state,
        }
    }

    pub fn first(&self) -> StateId {
        self.super_state
    }

    pub fn second(&self) -> StateId {
        self.sub_state
    }
}

/// Externally enabled labels of one state, computed once per state.
#[derive(Debug, Default)]
struct Enabled {
    inputs: FxHashSet<String>,
    outputs: FxHashSet<String>,
}

fn enabled_labels(automaton: &InterfaceAutomaton) -> FxHashMap<StateId, Enabled> {
    automaton
        .states()
        .map(|s| {
            let enabled = Enabled {
                inputs: automaton.externally_enabled_input_labels(s),
                outputs: automaton.externally_enabled_output_labels(s),
            };
            (s, enabled)
        })
        .collect()
}

/// The sub state accepts every input the super state accepts, and the super
/// state may emit every output the sub state emits.
fn condition1(super_enabled: &Enabled, sub_enabled: &Enabled) -> bool {
    sub_enabled.inputs.is_superset(&super_enabled.inputs)
        && super_enabled.outputs.is_superset(&sub_enabled.outputs)
}

/// For every externally enabled input of the super state and every
/// externally enabled output of the sub state, each move of the sub state is
/// matched by a move of the super state into a pair of `relation`.
fn condition2(
    super_aut: &InterfaceAutomaton,
    sub: &InterfaceAutomaton,
    pair: StatePair,
    super_enabled: &Enabled,
    sub_enabled: &Enabled,
    relation: &FxHashSet<StatePair>,
) -> bool {
    super_enabled
        .inputs
        .iter()
        .chain(sub_enabled.outputs.iter())
        .all(|label| {
            let super_dests = super_aut.externally_enabled_destinations(pair.super_state, label);
            sub.externally_enabled_destinations(pair.sub_state, label)
                .into_iter()
                .all(|sub_dest| {
                    super_dests
                        .iter()
                        .any(|super_dest| relation.contains(&StatePair::new(*super_dest, sub_dest)))
                })
        })
}

/// Computes the maximal alternating simulation from `super_aut` to `sub`.
///
/// Starts from all pairs that satisfy the enabled-label condition, then
/// removes the pairs whose moves cannot be matched until nothing changes.
/// Every round only removes pairs, so there are at most
/// `|states(super_aut)| * |states(sub)|` rounds.
pub fn compute_alternating_simulation(
    super_aut: &InterfaceAutomaton,
    sub: &InterfaceAutomaton,
) -> AutomatonResult<FxHashSet<StatePair>> {
    check(super_aut)?;
    check(sub)?;

    let super_enabled = enabled_labels(super_aut);
    let sub_enabled = enabled_labels(sub);

    let mut relation: FxHashSet<StatePair> = FxHashSet::default();
    for s in super_aut.states() {
        for t in sub.states() {
            if condition1(&super_enabled[&s], &sub_enabled[&t]) {
                relation.insert(StatePair::new(s, t));
            }
        }
    }
    debug!(
        "simulation of {} by {}: {} initial candidates",
        sub.name(),
        super_aut.name(),
        relation.len()
    );

    let mut round = 0;
    loop {
        // all pairs of a round are judged against the same relation
        let failing: Vec<StatePair> = relation
            .iter()
            .copied()
            .filter(|pair| {
                !condition2(
                    super_aut,
                    sub,
                    *pair,
                    &super_enabled[&pair.super_state],
                    &sub_enabled[&pair.sub_state],
                    &relation,
                )
            })
            .collect();
        if failing.is_empty() {
            break;
        }
        round += 1;
        debug!("round {round}: removing {} pairs", failing.len());
        for pair in failing {
            relation.remove(&pair);
        }
    }

    info!(
        "alternating simulation of {} by {}: {} pairs after {round} rounds",
        sub.name(),
        super_aut.name(),
        relation.len()
    );
    Ok(relation)
}

/// Restricts `relation` to the pairs reachable from the pair of initial
/// states. A step either takes the same input or output label on both sides
/// or an internal transition on one side while the other side stays put, and
/// only pairs of `relation` are admitted. Empty if the initial pair is not in
/// `relation`.
pub fn reachable_alternating_simulation(
    relation: &FxHashSet<StatePair>,
    super_aut: &InterfaceAutomaton,
    sub: &InterfaceAutomaton,
) -> AutomatonResult<FxHashSet<StatePair>> {
    let initial = StatePair::new(super_aut.initial_state()?, sub.initial_state()?);
    let mut reachable = FxHashSet::default();
    if !relation.contains(&initial) {
        return Ok(reachable);
    }
    reachable.insert(initial);
    let mut frontier = vec![initial];

    let mut admit = |pair: StatePair, frontier: &mut Vec<StatePair>| {
        if relation.contains(&pair) && reachable.insert(pair) {
            frontier.push(pair);
        }
    };

    while let Some(current) = frontier.pop() {
        for tran in super_aut[current.super_state].outgoing() {
            let tran = &super_aut[tran];
            if tran.kind() == TransitionKind::Internal {
                admit(StatePair::new(tran.destination(), current.sub_state), &mut frontier);
            } else {
                for sub_dest in sub.destinations(current.sub_state, &tran.label()) {
                    admit(StatePair::new(tran.destination(), sub_dest), &mut frontier);
                }
            }
        }
        for tran in sub[current.sub_state].outgoing() {
            let tran = &sub[tran];
            if tran.kind() == TransitionKind::Internal {
                admit(StatePair::new(current.super_state, tran.destination()), &mut frontier);
            }
        }
    }
    Ok(reachable)
}
