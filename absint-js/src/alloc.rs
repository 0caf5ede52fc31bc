//! Allocation and time policies: the knobs that turn the one machine into a
//! concrete interpreter or a finite abstract interpreter.
//!
//! Both hooks are pure functions of the current configuration and
//! continuation. That determinism is load-bearing: the reachable set is only
//! well-defined if re-stepping a configuration always allocates the same
//! address and produces the same time.

use crate::kont::Kont;
use crate::machine::State;
use crate::store::Addr;
use crate::store::Time;

/// Decides where the next storable goes and what the next time is.
///
/// The step relation calls `alloc` at most once per rule application (for
/// the continuation frame, heap cell, or child promise that rule creates)
/// and `tick` exactly once per successor.
pub trait AllocPolicy {
  fn alloc(&self, state: &State, kont: &Kont) -> Addr;
  fn tick(&self, state: &State, kont: &Kont) -> Time;
}

/// Globally fresh allocation: the concrete interpreter.
///
/// Addresses are derived from the time counter, which starts at 1 (address 0
/// holds the initial empty continuation) and strictly increases, so every
/// allocation is fresh and every store cell stays a singleton.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConcreteAlloc;

impl AllocPolicy for ConcreteAlloc {
  fn alloc(&self, state: &State, _kont: &Kont) -> Addr {
    Addr(state.time.0)
  }

  fn tick(&self, state: &State, _kont: &Kont) -> Time {
    Time(state.time.0 + 1)
  }
}

/// Monovariant abstraction: every allocation collapses to one address and
/// time never advances.
///
/// With a single-point address domain the store joins everything that is
/// ever allocated, so the reachable configuration set is finite for every
/// program, including ones the concrete machine diverges on.
#[derive(Debug, Clone, Copy)]
pub struct MonovariantAlloc {
  pub target: Addr,
}

impl Default for MonovariantAlloc {
  fn default() -> Self {
    // Address 0 is the initial continuation; keep the collapsed heap off it
    // so the empty continuation stays recognizable in small examples.
    MonovariantAlloc { target: Addr(1) }
  }
}

impl AllocPolicy for MonovariantAlloc {
  fn alloc(&self, _state: &State, _kont: &Kont) -> Addr {
    self.target
  }

  fn tick(&self, state: &State, _kont: &Kont) -> Time {
    state.time
  }
}

/// Syntactic-site abstraction: allocations are bucketed by a hash of the
/// current control expression into a fixed-width address window.
///
/// A coarse stand-in for k-CFA-style polyvariance: distinct program points
/// tend to get distinct abstract addresses, while the domain stays finite.
/// A given `SiteAlloc` value is deterministic; the bucketing (like every
/// address) is not stable across instances.
#[derive(Debug, Clone, Default)]
pub struct SiteAlloc {
  width: u64,
  hasher: ahash::RandomState,
}

impl SiteAlloc {
  pub fn new(width: u64) -> SiteAlloc {
    SiteAlloc {
      width: width.max(1),
      hasher: ahash::RandomState::new(),
    }
  }
}

impl AllocPolicy for SiteAlloc {
  fn alloc(&self, state: &State, _kont: &Kont) -> Addr {
    let bucket = self.hasher.hash_one(&state.ctrl) % self.width.max(1);
    Addr(1 + bucket)
  }

  fn tick(&self, state: &State, _kont: &Kont) -> Time {
    state.time
  }
}
