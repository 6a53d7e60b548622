// Copyright 2025 Cornell University
// released under MIT License

//! # Pruning
//! Removes the states of a product that are illegal or can be forced into an
//! illegal state, and the states that are no longer reachable afterwards.

use crate::errors::AutomatonResult;
use crate::ir::{InterfaceAutomaton, StateId, TransitionKind};
use itertools::Itertools;
use log::{debug, info};
use rustc_hash::FxHashSet;

/// Extends `illegal` backwards over output and internal transitions and
/// removes every state of the result. Inputs do not propagate: whether an
/// input occurs is up to the environment. Returns the removed states.
pub fn prune_illegal_states(
    automaton: &mut InterfaceAutomaton,
    illegal: &FxHashSet<StateId>,
) -> AutomatonResult<FxHashSet<StateId>> {
    let mut illegal: FxHashSet<StateId> = illegal
        .iter()
        .copied()
        .filter(|s| automaton.contains_state(*s))
        .collect();
    let mut frontier: Vec<StateId> = illegal.iter().copied().collect();

    while let Some(current) = frontier.pop() {
        for tran in automaton[current].incoming() {
            let tran = &automaton[tran];
            if tran.kind() != TransitionKind::Input && illegal.insert(tran.source()) {
                debug!(
                    "{}: {} is illegal since it can reach {} through {}",
                    automaton.name(),
                    automaton[tran.source()].name(),
                    automaton[current].name(),
                    tran.label()
                );
                frontier.push(tran.source());
            }
        }
    }

    for state in illegal.iter().sorted() {
        automaton.remove_state(*state)?;
    }
    Ok(illegal)
}

/// Removes every state that cannot be reached from the initial state. Without
/// an initial state nothing is reachable and the automaton is cleared.
/// Returns the number of removed states.
pub fn remove_unreachable_states(automaton: &mut InterfaceAutomaton) -> AutomatonResult<usize> {
    let Ok(initial) = automaton.initial_state() else {
        let count = automaton.state_count();
        automaton.clear();
        debug!("{}: no initial state, removed all {count} states", automaton.name());
        return Ok(count);
    };

    let mut reachable = FxHashSet::default();
    reachable.insert(initial);
    let mut frontier = vec![initial];
    while let Some(current) = frontier.pop() {
        for tran in automaton[current].outgoing() {
            let dest = automaton[tran].destination();
            if reachable.insert(dest) {
                frontier.push(dest);
            }
        }
    }

    let unreachable: Vec<StateId> = automaton
        .states()
        .filter(|s| !reachable.contains(s))
        .collect();
    for state in &unreachable {
        automaton.remove_state(*state)?;
    }
    Ok(unreachable.len())
}

/// Illegal-state pruning followed by unreachable-state removal. Returns the
/// total number of removed states.
pub fn prune(automaton: &mut InterfaceAutomaton, illegal: &FxHashSet<StateId>) -> AutomatonResult<usize> {
    let illegal = prune_illegal_states(automaton, illegal)?.len();
    let unreachable = remove_unreachable_states(automaton)?;
    info!(
        "{}: pruned {illegal} illegal and {unreachable} unreachable states",
        automaton.name()
    );
    Ok(illegal + unreachable)
}
