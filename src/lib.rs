// Copyright 2025 Cornell University
// released under MIT License

//! Interface automata: composition with illegal-state pruning, and
//! alternating simulation between two automata.

pub mod analysis;
pub mod checks;
pub mod errors;
pub mod ir;
pub mod product;
pub mod prune;
pub mod serialize;
pub mod simulation;
pub mod transform;

pub use errors::{AutomatonError, AutomatonResult, CompositionError, CompositionResult};
pub use ir::{Dir, InterfaceAutomaton, StateId, TransitionId, TransitionKind};
pub use product::{compose, product, ComposeOptions, ProductResult};
pub use simulation::{compute_alternating_simulation, reachable_alternating_simulation, StatePair};
