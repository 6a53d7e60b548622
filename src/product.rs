// Copyright 2025 Cornell University
// released under MIT License

//! # Product construction
//! Computes the synchronized product of two interface automata by frontier
//! exploration over pairs of states, collecting the illegal pairs: pairs in
//! which one side emits a shared output that the other side cannot accept.

use crate::checks::{check, check_composable, CompositionNames};
use crate::errors::{CompositionError, CompositionResult};
use crate::ir::{make_label, Dir, InterfaceAutomaton, StateId, TransitionKind};
use crate::prune::prune;
use itertools::Itertools;
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

/// Separator used for product state and automaton names
pub const NAME_CONNECTOR: &str = "_";

/// Options for `product` and `compose`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComposeOptions {
    /// When set, a pair in which one state is transient only explores the
    /// transient side. Transient states may not have input transitions.
    pub consider_transient: bool,
}

impl ComposeOptions {
    pub fn with_transient(mut self, consider_transient: bool) -> Self {
        self.consider_transient = consider_transient;
        self
    }
}

/// The product automaton along with the illegal states found while building it
#[derive(Debug, Clone)]
pub struct ProductResult {
    pub automaton: InterfaceAutomaton,
    pub illegal_states: FxHashSet<StateId>,
    pub names: CompositionNames,
    /// maps each product state to its `(state in a, state in b)` pair
    origins: FxHashMap<StateId, (StateId, StateId)>,
}

impl ProductResult {
    pub fn origin(&self, state: StateId) -> Option<(StateId, StateId)> {
        self.origins.get(&state).copied()
    }
}

/// Which of the two operands a transition is taken from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Left,
    Right,
}

impl Side {
    /// Orders a `(this side, other side)` pair as `(a, b)`.
    fn join(self, this: StateId, other: StateId) -> (StateId, StateId) {
        match self {
            Side::Left => (this, other),
            Side::Right => (other, this),
        }
    }

    fn split(self, (a, b): (StateId, StateId)) -> (StateId, StateId) {
        self.join(a, b)
    }
}

struct ProductBuilder<'a> {
    a: &'a InterfaceAutomaton,
    b: &'a InterfaceAutomaton,
    names: CompositionNames,
    product: InterfaceAutomaton,
    pairs: FxHashMap<(StateId, StateId), StateId>,
    origins: FxHashMap<StateId, (StateId, StateId)>,
    frontier: VecDeque<((StateId, StateId), StateId)>,
    illegal: FxHashSet<StateId>,
}

impl<'a> ProductBuilder<'a> {
    fn new(a: &'a InterfaceAutomaton, b: &'a InterfaceAutomaton, names: CompositionNames) -> Self {
        let name = format!("{}{NAME_CONNECTOR}{}", a.name(), b.name());
        Self {
            a,
            b,
            names,
            product: InterfaceAutomaton::new(name),
            pairs: FxHashMap::default(),
            origins: FxHashMap::default(),
            frontier: VecDeque::new(),
            illegal: FxHashSet::default(),
        }
    }

    fn operands(&self, side: Side) -> (&'a InterfaceAutomaton, &'a InterfaceAutomaton) {
        match side {
            Side::Left => (self.a, self.b),
            Side::Right => (self.b, self.a),
        }
    }

    /// Returns the product state for `pair`, creating it and adding it to the
    /// frontier if it does not exist yet. States are keyed by their pair, so
    /// a clash of the synthesized names only changes the name.
    fn state(&mut self, pair: (StateId, StateId)) -> CompositionResult<StateId> {
        if let Some(id) = self.pairs.get(&pair) {
            return Ok(*id);
        }
        let base = format!(
            "{}{NAME_CONNECTOR}{}",
            self.a[pair.0].name(),
            self.b[pair.1].name()
        );
        let mut name = base.clone();
        let mut suffix = 2;
        while self.product.state_id(&name).is_some() {
            name = format!("{base}{NAME_CONNECTOR}{suffix}");
            suffix += 1;
        }
        if name != base {
            warn!("product state name {base} is already taken, using {name}");
        }
        let id = self.product.add_state(name)?;
        self.pairs.insert(pair, id);
        self.origins.insert(id, pair);
        self.frontier.push_back((pair, id));
        Ok(id)
    }

    fn add(&mut self, from: StateId, pair: (StateId, StateId), label: &str) -> CompositionResult<()> {
        let to = self.state(pair)?;
        self.product.add_transition(from, to, label)?;
        Ok(())
    }

    /// Extends the frontier with the outgoing transitions of one side of
    /// `pair`. Returns `true` if `current` turned out to be illegal, in which
    /// case exploration of this pair stops.
    ///
    /// Shared transitions are materialized from the side that holds the
    /// input, so they are not added twice. When only the transient side is
    /// explored, its shared outputs are materialized right away instead.
    fn explore(
        &mut self,
        side: Side,
        pair: (StateId, StateId),
        current: StateId,
        transient: bool,
    ) -> CompositionResult<bool> {
        let (this, other) = self.operands(side);
        let (this_state, other_state) = side.split(pair);

        for tran in this[this_state].outgoing() {
            let tran = &this[tran];
            let name = tran.name();
            let dest = tran.destination();
            match tran.kind() {
                TransitionKind::Input => {
                    if transient {
                        return Err(CompositionError::TransientInput {
                            automaton: this.name().to_string(),
                            state: this[this_state].name().to_string(),
                            label: tran.label(),
                        });
                    }
                    if self.names.inputs.contains(name) {
                        self.add(current, side.join(dest, other_state), &tran.label())?;
                    } else {
                        // shared: only fires together with a matching output
                        let output = make_label(name, TransitionKind::Output);
                        let internal = make_label(name, TransitionKind::Internal);
                        for other_dest in other.destinations(other_state, &output) {
                            self.add(current, side.join(dest, other_dest), &internal)?;
                        }
                    }
                }
                TransitionKind::Output => {
                    if self.names.outputs.contains(name) {
                        self.add(current, side.join(dest, other_state), &tran.label())?;
                    } else {
                        let input = make_label(name, TransitionKind::Input);
                        let matching = other.destinations(other_state, &input);
                        if matching.is_empty() {
                            debug!(
                                "{}: {} cannot be accepted, marking {} illegal",
                                self.product.name(),
                                tran.label(),
                                self.product[current].name()
                            );
                            return Ok(true);
                        }
                        if transient {
                            let internal = make_label(name, TransitionKind::Internal);
                            for other_dest in matching {
                                self.add(current, side.join(dest, other_dest), &internal)?;
                            }
                        }
                    }
                }
                TransitionKind::Internal => {
                    self.add(current, side.join(dest, other_state), &tran.label())?;
                }
            }
        }
        Ok(false)
    }

    fn run(mut self, options: ComposeOptions) -> CompositionResult<ProductResult> {
        let initial = self.state((self.a.initial_state()?, self.b.initial_state()?))?;
        self.product.set_initial_state(initial)?;

        while let Some((pair, current)) = self.frontier.pop_front() {
            let p_transient = options.consider_transient && self.a[pair.0].is_transient();
            let q_transient = options.consider_transient && self.b[pair.1].is_transient();
            let illegal = match (p_transient, q_transient) {
                (false, false) => {
                    self.explore(Side::Left, pair, current, false)?
                        || self.explore(Side::Right, pair, current, false)?
                }
                (true, false) => self.explore(Side::Left, pair, current, true)?,
                (false, true) => self.explore(Side::Right, pair, current, true)?,
                (true, true) => {
                    return Err(CompositionError::BothTransient {
                        first: self.a[pair.0].name().to_string(),
                        second: self.b[pair.1].name().to_string(),
                    })
                }
            };
            if illegal {
                self.illegal.insert(current);
            }
        }

        info!(
            "product {}: {} states, {} transitions, {} illegal",
            self.product.name(),
            self.product.state_count(),
            self.product.transition_count(),
            self.illegal.len()
        );
        Ok(ProductResult {
            automaton: self.product,
            illegal_states: self.illegal,
            names: self.names,
            origins: self.origins,
        })
    }
}

/// Builds the product of `a` and `b` without pruning. Both automata are
/// checked for consistency and composability first; no product is built if
/// either check fails.
pub fn product(
    a: &InterfaceAutomaton,
    b: &InterfaceAutomaton,
    options: ComposeOptions,
) -> CompositionResult<ProductResult> {
    check(a)?;
    check(b)?;
    check_composable(a, b)?;
    let names = CompositionNames::new(a, b);
    ProductBuilder::new(a, b, names).run(options)
}

/// Composes `a` and `b`: builds the product, prunes the illegal states and
/// the states that became unreachable, and gives the result the input and
/// output ports of the composition.
pub fn compose(
    a: &InterfaceAutomaton,
    b: &InterfaceAutomaton,
    options: ComposeOptions,
) -> CompositionResult<InterfaceAutomaton> {
    let ProductResult {
        mut automaton,
        illegal_states,
        names,
        ..
    } = product(a, b, options)?;
    prune(&mut automaton, &illegal_states)?;

    for name in names.inputs.iter().sorted() {
        automaton.add_port(name, Dir::In)?;
    }
    for name in names.outputs.iter().sorted() {
        automaton.add_port(name, Dir::Out)?;
    }
    info!(
        "composition {}: {} states, {} transitions",
        automaton.name(),
        automaton.state_count(),
        automaton.transition_count()
    );
    Ok(automaton)
}
