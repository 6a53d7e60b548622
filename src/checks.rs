// Copyright 2025 Cornell University
// released under MIT License

//! # Static checks
//! Consistency of a single automaton and composability of two automata.

use crate::errors::{AutomatonError, AutomatonResult, CompositionError, CompositionResult};
use crate::ir::{Dir, InterfaceAutomaton, TransitionKind};
use itertools::Itertools;
use log::debug;
use rustc_hash::FxHashSet;

/// Sorted intersection, used for deterministic error messages
fn overlap(a: &FxHashSet<String>, b: &FxHashSet<String>) -> Vec<String> {
    a.intersection(b).cloned().sorted().collect()
}

/// Checks that (1) every input transition has an input port, every output
/// transition has an output port and every internal transition has a
/// parameter, and (2) input, output and internal names do not overlap.
pub fn check(automaton: &InterfaceAutomaton) -> AutomatonResult<()> {
    for tran in automaton.transitions() {
        let tran = &automaton[tran];
        match tran.kind().dir() {
            Some(dir) => {
                if automaton.port(tran.name()) != Some(dir) {
                    return Err(AutomatonError::MissingPort {
                        automaton: automaton.name().to_string(),
                        label: tran.label(),
                        dir,
                    });
                }
            }
            None => {
                if !automaton.has_parameter(tran.name()) {
                    return Err(AutomatonError::MissingParameter {
                        automaton: automaton.name().to_string(),
                        label: tran.label(),
                    });
                }
            }
        }
    }

    let inputs = automaton.input_port_names();
    let outputs = automaton.output_port_names();
    let internals = automaton.internal_names();
    let pairs = [
        (TransitionKind::Input, &inputs, TransitionKind::Output, &outputs),
        (TransitionKind::Input, &inputs, TransitionKind::Internal, &internals),
        (TransitionKind::Output, &outputs, TransitionKind::Internal, &internals),
    ];
    for (first, first_names, second, second_names) in pairs {
        let names = overlap(first_names, second_names);
        if !names.is_empty() {
            return Err(AutomatonError::OverlappingNames {
                automaton: automaton.name().to_string(),
                first,
                second,
                names,
            });
        }
    }
    Ok(())
}

/// Fails if `a` and `b` cannot be composed: internal names of either side
/// may not appear anywhere in the other, and the two sides may not share
/// inputs or outputs. Names that are an input on one side and an output on
/// the other are shared and become internal in the composition.
pub fn check_composable(a: &InterfaceAutomaton, b: &InterfaceAutomaton) -> CompositionResult<()> {
    for (this, that) in [(a, b), (b, a)] {
        let internals = this.internal_names();
        let visible: FxHashSet<String> = that
            .input_port_names()
            .into_iter()
            .chain(that.output_port_names())
            .chain(that.internal_names())
            .collect();
        let names = overlap(&internals, &visible);
        if !names.is_empty() {
            return Err(CompositionError::OverlappingInternal {
                first: this.name().to_string(),
                second: that.name().to_string(),
                names,
            });
        }
    }

    let names = overlap(&a.input_port_names(), &b.input_port_names());
    if !names.is_empty() {
        return Err(CompositionError::OverlappingInput {
            first: a.name().to_string(),
            second: b.name().to_string(),
            names,
        });
    }

    let names = overlap(&a.output_port_names(), &b.output_port_names());
    if !names.is_empty() {
        return Err(CompositionError::OverlappingOutput {
            first: a.name().to_string(),
            second: b.name().to_string(),
            names,
        });
    }
    Ok(())
}

/// Input, output and internal names of the composition of two automata
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompositionNames {
    pub inputs: FxHashSet<String>,
    pub outputs: FxHashSet<String>,
    pub internals: FxHashSet<String>,
    /// names that are an input of one side and an output of the other
    pub shared: FxHashSet<String>,
}

impl CompositionNames {
    pub fn new(a: &InterfaceAutomaton, b: &InterfaceAutomaton) -> Self {
        let (a_in, a_out) = (a.input_port_names(), a.output_port_names());
        let (b_in, b_out) = (b.input_port_names(), b.output_port_names());

        let shared: FxHashSet<String> = a_in
            .intersection(&b_out)
            .chain(a_out.intersection(&b_in))
            .cloned()
            .collect();

        let inputs = a_in
            .iter()
            .chain(b_in.iter())
            .filter(|n| !shared.contains(*n))
            .cloned()
            .collect();
        let outputs = a_out
            .iter()
            .chain(b_out.iter())
            .filter(|n| !shared.contains(*n))
            .cloned()
            .collect();
        let internals = a
            .internal_names()
            .into_iter()
            .chain(b.internal_names())
            .chain(shared.iter().cloned())
            .collect();

        debug!(
            "composition of {} and {}: shared names [{}]",
            a.name(),
            b.name(),
            shared.iter().sorted().join(", ")
        );
        Self {
            inputs,
            outputs,
            internals,
            shared,
        }
    }

    pub fn is_shared(&self, name: &str) -> bool {
        self.shared.contains(name)
    }

    /// Direction of the port the composition gets for `name`, if any
    pub fn port_dir(&self, name: &str) -> Option<Dir> {
        if self.inputs.contains(name) {
            Some(Dir::In)
        } else if self.outputs.contains(name) {
            Some(Dir::Out)
        } else {
            None
        }
    }
}
