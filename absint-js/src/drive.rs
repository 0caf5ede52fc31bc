//! Fixed-point exploration of the reachable configuration set.

use std::collections::VecDeque;

use ahash::AHashSet;
use tracing::debug;
use tracing::debug_span;

use crate::alloc::AllocPolicy;
use crate::alloc::ConcreteAlloc;
use crate::error::AbortReason;
use crate::expr::Expr;
use crate::machine::inject;
use crate::machine::successors;
use crate::machine::Outcome;
use crate::machine::State;

/// Exploration budget: `fuel` is the number of configurations the driver may
/// expand, `None` for unbounded.
///
/// Exhaustion is not an error — [`Analysis::out_of_fuel`] reports it and the
/// partial result is returned. Unbounded exploration terminates exactly when
/// the allocation policy keeps the address space finite (or the program
/// happens to halt).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
  pub fuel: Option<u64>,
}

impl Budget {
  pub fn unlimited() -> Budget {
    Budget { fuel: None }
  }

  pub fn with_fuel(fuel: u64) -> Budget {
    Budget { fuel: Some(fuel) }
  }
}

/// The least fixed point of the step relation from some initial
/// configuration.
#[derive(Debug, Clone)]
pub struct Analysis {
  /// Terminal outcomes: every `Done` configuration and every abort reason
  /// reached by some branch. Never contains `Next`.
  pub outcomes: AHashSet<Outcome>,
  /// Every configuration seen, including the initial one. This is the
  /// input to downstream analyses.
  pub visited: AHashSet<State>,
  pub out_of_fuel: bool,
}

impl Analysis {
  /// The quiescent configurations among the outcomes.
  pub fn done_states(&self) -> impl Iterator<Item = &State> + '_ {
    self.outcomes.iter().filter_map(|outcome| match outcome {
      Outcome::Done(state) => Some(state),
      _ => None,
    })
  }

  /// The abort reasons among the outcomes.
  pub fn aborts(&self) -> impl Iterator<Item = AbortReason> + '_ {
    self.outcomes.iter().filter_map(|outcome| match outcome {
      Outcome::Abort(reason) => Some(*reason),
      _ => None,
    })
  }
}

/// Close the step relation under successor from `initial`.
///
/// A worklist algorithm with a visited set keyed by structural equality of
/// configurations: the successor graph is a graph, not a tree, and under a
/// finite allocation policy it has cycles, so memoization is what makes the
/// fixed point terminate. Fuel is charged once per expanded configuration.
pub fn reachable(initial: State, policy: &dyn AllocPolicy, budget: Budget) -> Analysis {
  let span = debug_span!("reachable");
  let _enter = span.enter();

  let mut visited = AHashSet::new();
  visited.insert(initial.clone());
  let mut worklist = VecDeque::from([initial]);
  let mut outcomes = AHashSet::new();
  let mut fuel = budget.fuel;
  let mut out_of_fuel = false;

  while let Some(state) = worklist.pop_front() {
    if let Some(fuel) = &mut fuel {
      if *fuel == 0 {
        out_of_fuel = true;
        break;
      }
      *fuel -= 1;
    }

    for outcome in successors(&state, policy) {
      match outcome {
        Outcome::Next(next) => {
          if !visited.contains(&next) {
            visited.insert(next.clone());
            worklist.push_back(next);
          }
        }
        terminal => {
          outcomes.insert(terminal);
        }
      }
    }
  }

  debug!(
    visited = visited.len(),
    outcomes = outcomes.len(),
    out_of_fuel,
    "reachable set closed"
  );
  Analysis {
    outcomes,
    visited,
    out_of_fuel,
  }
}

/// Concrete-mode convenience: evaluate `expr` with fresh allocation and no
/// bound. Diverging programs diverge; bound them with [`reachable`] and a
/// fuel budget instead.
pub fn run(expr: Expr) -> Analysis {
  reachable(inject(expr), &ConcreteAlloc, Budget::unlimited())
}
