// Copyright 2025 Cornell University
// released under MIT License

use std::fmt;
use std::io::Write;

use itertools::Itertools;
use rustc_hash::FxHashSet;

use crate::ir::*;
use crate::simulation::StatePair;

impl fmt::Display for Dir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dir::In => write!(f, "in"),
            Dir::Out => write!(f, "out"),
        }
    }
}

impl fmt::Display for TransitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionKind::Input => write!(f, "input"),
            TransitionKind::Output => write!(f, "output"),
            TransitionKind::Internal => write!(f, "internal"),
        }
    }
}

fn sorted_names(names: impl IntoIterator<Item = impl AsRef<str>>) -> Vec<String> {
    names
        .into_iter()
        .map(|n| n.as_ref().to_string())
        .sorted()
        .collect()
}

/// Lists ports, parameters and transitions. Names are sorted, states and
/// transitions appear in insertion order.
impl fmt::Display for InterfaceAutomaton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "automaton {} {{", self.name())?;
        for dir in [Dir::In, Dir::Out] {
            let ports = sorted_names(self.ports().filter(|(_, d)| *d == dir).map(|(n, _)| n));
            if !ports.is_empty() {
                writeln!(f, "  {dir} {}", ports.join(", "))?;
            }
        }
        let parameters = sorted_names(self.parameters());
        if !parameters.is_empty() {
            writeln!(f, "  param {}", parameters.join(", "))?;
        }
        if let Ok(initial) = self.initial_state() {
            writeln!(f, "  initial {}", self[initial].name())?;
        }
        let transient = self
            .states()
            .filter(|s| self[s].is_transient())
            .map(|s| self[s].name())
            .join(", ");
        if !transient.is_empty() {
            writeln!(f, "  transient {transient}")?;
        }
        for state in self.states() {
            let outgoing = self[state].outgoing();
            if outgoing.is_empty() {
                writeln!(f, "  {}", self[state].name())?;
            }
            for tran in outgoing {
                let tran = &self[tran];
                writeln!(
                    f,
                    "  {} --{}--> {}",
                    self[state].name(),
                    tran.label(),
                    self[tran.destination()].name()
                )?;
            }
        }
        write!(f, "}}")
    }
}

/// Writes a summary: counts followed by the sorted input, output and
/// internal names.
pub fn serialize_info(out: &mut impl Write, automaton: &InterfaceAutomaton) -> std::io::Result<()> {
    let inputs = sorted_names(automaton.input_port_names());
    let outputs = sorted_names(automaton.output_port_names());
    let internals = sorted_names(automaton.internal_names());

    writeln!(out, "{}", automaton.name())?;
    writeln!(out, "  {} states", automaton.state_count())?;
    writeln!(out, "  {} transitions", automaton.transition_count())?;
    writeln!(out, "  {} input names", inputs.len())?;
    writeln!(out, "  {} output names", outputs.len())?;
    writeln!(out, "  {} internal transition names", internals.len())?;
    for (title, names) in [
        ("Input Names", inputs),
        ("Output Names", outputs),
        ("Internal Transition Names", internals),
    ] {
        writeln!(out, "  {title}:")?;
        for name in names {
            writeln!(out, "    {name}")?;
        }
    }
    Ok(())
}

/// Writes one `(super, sub)` line per pair, sorted by state names.
pub fn serialize_relation(
    out: &mut impl Write,
    relation: &FxHashSet<StatePair>,
    super_aut: &InterfaceAutomaton,
    sub: &InterfaceAutomaton,
) -> std::io::Result<()> {
    let lines = relation
        .iter()
        .map(|pair| {
            (
                super_aut[pair.super_state].name(),
                sub[pair.sub_state].name(),
            )
        })
        .sorted();
    for (s, t) in lines {
        writeln!(out, "({s}, {t})")?;
    }
    Ok(())
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::errors::AutomatonError;
    use crate::ir::tests::{build, build_comp, build_sender, build_user};
    use crate::product::{compose, ComposeOptions};
    use crate::simulation::compute_alternating_simulation;

    fn info(automaton: &InterfaceAutomaton) -> String {
        let mut out = Vec::new();
        serialize_info(&mut out, automaton).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn info_of_comp() {
        insta::assert_snapshot!(info(&build_comp()), @r"
        comp
          7 states
          9 transitions
          3 input names
          3 output names
          0 internal transition names
          Input Names:
            ack
            msg
            nack
          Output Names:
            fail
            ok
            send
          Internal Transition Names:
        ");
    }

    #[test]
    fn info_of_composition() {
        let composed = compose(&build_comp(), &build_user(), ComposeOptions::default()).unwrap();
        insta::assert_snapshot!(info(&composed), @r"
        comp_user
          6 states
          7 transitions
          2 input names
          1 output names
          2 internal transition names
          Input Names:
            ack
            nack
          Output Names:
            send
          Internal Transition Names:
            msg
            ok
        ");
    }

    #[test]
    fn display_composition() {
        let composed = compose(&build_comp(), &build_user(), ComposeOptions::default()).unwrap();
        insta::assert_snapshot!(composed.to_string(), @r"
        automaton comp_user {
          in ack, nack
          out send
          param msg, ok
          initial 0_0
          0_0 --msg;--> 1_1
          1_1 --send!--> 2_1
          2_1 --ack?--> 3_1
          2_1 --nack?--> 4_1
          3_1 --ok;--> 0_0
          4_1 --send!--> 5_1
          5_1 --ack?--> 3_1
        }
        ");
    }

    #[test]
    fn display_lists_deadlocks_and_transient_states() {
        let mut a = build_sender();
        let s0 = a.state_id("s0").unwrap();
        a.set_transient(s0, true).unwrap();
        insta::assert_snapshot!(a.to_string(), @r"
        automaton sender {
          out a
          initial s0
          transient s0
          s0 --a!--> s1
          s1
        }
        ");
    }

    #[test]
    fn relation_lines_are_sorted() {
        let super_aut = build("super", &["s"], &[("s", "o!", "s")]);
        let sub = build("sub", &["t", "u"], &[("t", "x;", "u")]);
        let relation = compute_alternating_simulation(&super_aut, &sub).unwrap();
        let mut out = Vec::new();
        serialize_relation(&mut out, &relation, &super_aut, &sub).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r"
        (s, t)
        (s, u)
        ");
    }

    #[test]
    fn error_messages_name_kinds_and_directions() {
        let err = AutomatonError::MissingPort {
            automaton: "a".to_string(),
            label: "go?".to_string(),
            dir: Dir::In,
        };
        assert_eq!(
            err.to_string(),
            "a: the transition `go?` does not have a corresponding in port"
        );
        let err = AutomatonError::OverlappingNames {
            automaton: "a".to_string(),
            first: TransitionKind::Input,
            second: TransitionKind::Internal,
            names: vec!["x".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "a: the names for input and internal transitions overlap: [\"x\"]"
        );
    }
}
