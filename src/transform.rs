// Copyright 2025 Cornell University
// released under MIT License

//! # Transformations
//! In-place rewrites of an automaton that keep its behavior observable
//! through the remaining interface.

use crate::checks::check;
use crate::errors::{AutomatonError, AutomatonResult};
use crate::ir::{make_label, parse_label, InterfaceAutomaton, StateId, TransitionId, TransitionKind};
use crate::product::NAME_CONNECTOR;
use itertools::Itertools;
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};

impl InterfaceAutomaton {
    /// Splices out every non-initial state whose only incoming and only
    /// outgoing transitions are internal. The two transitions are replaced by
    /// one internal transition labelled `<incoming>_<outgoing>;`.
    /// Returns the number of removed states.
    ///
    /// Splicing keeps the number of incoming and outgoing transitions of all
    /// other states, so a single pass leaves no candidates behind. States with
    /// an internal self-loop are never spliced.
    pub fn combine_internal_transitions(&mut self) -> AutomatonResult<usize> {
        let initial = self.initial_state().ok();
        let candidates: Vec<StateId> = self.states().collect();
        let mut combined = 0;

        for state in candidates {
            if Some(state) == initial {
                continue;
            }
            let (incoming, outgoing) = (self[state].incoming(), self[state].outgoing());
            if incoming.len() != 1 || outgoing.len() != 1 {
                continue;
            }
            let (inc, out) = (&self[incoming[0]], &self[outgoing[0]]);
            if inc.kind() != TransitionKind::Internal || out.kind() != TransitionKind::Internal {
                continue;
            }
            if inc.source() == state {
                continue;
            }
            let (source, destination) = (inc.source(), out.destination());
            let label = make_label(
                &format!("{}{NAME_CONNECTOR}{}", inc.name(), out.name()),
                TransitionKind::Internal,
            );
            debug!("{}: splicing out {} as {label}", self.name(), self[state].name());
            self.remove_state(state)?;
            self.add_transition(source, destination, &label)?;
            combined += 1;
        }
        Ok(combined)
    }

    /// Hides every input and output name that is not part of the interface of
    /// `other`: their transitions become internal and their ports are removed.
    pub fn project(&mut self, other: &InterfaceAutomaton) -> AutomatonResult<()> {
        check(self)?;
        check(other)?;

        let visible: FxHashSet<String> = other.ports().map(|(name, _)| name.to_string()).collect();
        let hidden: FxHashSet<String> = self
            .ports()
            .map(|(name, _)| name)
            .filter(|name| !visible.contains(*name))
            .map(str::to_string)
            .collect();

        let relabel: Vec<(TransitionId, String)> = self
            .transitions()
            .filter(|t| self[t].kind() != TransitionKind::Internal && hidden.contains(self[t].name()))
            .map(|t| (t, make_label(self[t].name(), TransitionKind::Internal)))
            .collect();
        for (tran, label) in relabel {
            self.set_label(tran, &label)?;
        }
        for name in hidden.iter().sorted() {
            self.remove_port(name);
        }
        debug!(
            "{}: hid [{}] when projecting onto {}",
            self.name(),
            hidden.iter().sorted().join(", "),
            other.name()
        );
        Ok(())
    }

    /// Renames transition base names according to `names`, keeping each
    /// transition's kind. Ports and parameters are renamed with them, ports
    /// without any transition included. Fails without changing anything if
    /// a new name is not a valid base name or if two ports or two parameters
    /// would end up with the same name.
    pub fn rename_transition_labels(&mut self, names: &FxHashMap<String, String>) -> AutomatonResult<()> {
        for new in names.values() {
            parse_label(&make_label(new, TransitionKind::Internal))?;
        }
        let ports = renamed(
            self.name(),
            self.ports().map(|(name, dir)| (name.to_string(), dir)).collect(),
            names,
        )?;
        let parameters = renamed(
            self.name(),
            self.parameters().map(|name| (name.to_string(), ())).collect(),
            names,
        )?;
        let relabel: Vec<(TransitionId, String)> = self
            .transitions()
            .filter_map(|t| {
                let tran = &self[t];
                names
                    .get(tran.name())
                    .map(|new| (t, make_label(new, tran.kind())))
            })
            .collect();

        for (old, _, _) in &ports {
            self.remove_port(old);
        }
        for (_, new, dir) in ports {
            self.add_port(new, dir)?;
        }
        for (old, _, _) in &parameters {
            self.remove_parameter(old);
        }
        for (_, new, _) in parameters {
            self.add_parameter(new)?;
        }
        for (tran, label) in relabel {
            self.set_label(tran, &label)?;
        }
        Ok(())
    }
}

/// Applies `names` to a list of `(name, payload)` entries, failing if two
/// entries end up with the same name.
fn renamed<T>(
    automaton: &str,
    entries: Vec<(String, T)>,
    names: &FxHashMap<String, String>,
) -> AutomatonResult<Vec<(String, String, T)>> {
    let mut seen = FxHashSet::default();
    let mut out = Vec::with_capacity(entries.len());
    for (old, payload) in entries.into_iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        let new = names.get(&old).cloned().unwrap_or_else(|| old.clone());
        if !seen.insert(new.clone()) {
            return Err(AutomatonError::DuplicateName {
                automaton: automaton.to_string(),
                name: new,
            });
        }
        out.push((old, new, payload));
    }
    Ok(out)
}
