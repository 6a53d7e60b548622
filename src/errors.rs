// Copyright 2025 Cornell University
// released under MIT License

use crate::ir::{Dir, StateId, TransitionId, TransitionKind};
use thiserror::Error;

/// Errors raised while building, checking or querying a single automaton
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AutomatonError {
    /// A state, port or parameter with this name already exists
    #[error("the name `{name}` is already used in automaton `{automaton}`")]
    DuplicateName { automaton: String, name: String },

    /// Labels must be a non-empty base name followed by `?`, `!` or `;`
    #[error("the label `{label}` does not end with `?`, `!` or `;` after a non-empty name")]
    InvalidLabel { label: String },

    /// An input or output transition without a port of the right direction
    #[error("{automaton}: the transition `{label}` does not have a corresponding {dir} port")]
    MissingPort {
        automaton: String,
        label: String,
        dir: Dir,
    },

    /// An internal transition without a backing parameter
    #[error("{automaton}: the transition `{label}` does not have a corresponding parameter")]
    MissingParameter { automaton: String, label: String },

    /// Names of two transition kinds overlap inside one automaton
    #[error("{automaton}: the names for {first} and {second} transitions overlap: {names:?}")]
    OverlappingNames {
        automaton: String,
        first: TransitionKind,
        second: TransitionKind,
        names: Vec<String>,
    },

    /// The initial state is unset or was removed
    #[error("automaton `{automaton}` does not have an initial state")]
    MissingInitialState { automaton: String },

    /// Deadlock is only defined for automata without ports
    #[error("deadlock can only be checked on a closed automaton, but `{automaton}` has ports")]
    NotClosed { automaton: String },

    #[error("{automaton}: {state} does not refer to a live state")]
    UnknownState { automaton: String, state: StateId },

    #[error("{automaton}: {transition} does not refer to a live transition")]
    UnknownTransition {
        automaton: String,
        transition: TransitionId,
    },
}

/// Errors raised while composing two automata. Illegal product states are
/// not errors: they are reported through `ProductResult` and pruned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompositionError {
    #[error(transparent)]
    Automaton(#[from] AutomatonError),

    /// Internal names of `first` collide with a visible or internal name of `second`
    #[error("`{first}` is not composable with `{second}`: the internal transitions of `{first}` overlap with the transitions of `{second}`: {names:?}")]
    OverlappingInternal {
        first: String,
        second: String,
        names: Vec<String>,
    },

    #[error("`{first}` is not composable with `{second}`: the input transitions of the two overlap: {names:?}")]
    OverlappingInput {
        first: String,
        second: String,
        names: Vec<String>,
    },

    #[error("`{first}` is not composable with `{second}`: the output transitions of the two overlap: {names:?}")]
    OverlappingOutput {
        first: String,
        second: String,
        names: Vec<String>,
    },

    /// Transient states may only emit or move internally
    #[error("transient state `{state}` in `{automaton}` has input transition `{label}`")]
    TransientInput {
        automaton: String,
        state: String,
        label: String,
    },

    #[error("cannot compute product since both states are transient: `{first}` and `{second}`")]
    BothTransient { first: String, second: String },
}

pub type AutomatonResult<T> = Result<T, AutomatonError>;
pub type CompositionResult<T> = Result<T, CompositionError>;
