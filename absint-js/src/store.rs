//! The store: a join-semilattice from addresses to sets of storables.
//!
//! Continuations live in the same store as values (the `*` of CESK*), keyed
//! by [`Addr`]. Writes always join ([`Store::weak_update`]): the cell at an
//! address only ever grows. Under a fresh allocator every write lands in an
//! empty cell and the join degenerates to plain insertion, which is what
//! makes the same store work for both the concrete and the abstract machine.

use serde::Deserialize;
use serde::Serialize;
use std::collections::BTreeMap;
use std::collections::BTreeSet;

use crate::env::Env;
use crate::expr::Expr;
use crate::kont::Kont;

/// A store address. Opaque: used only for identity; not stable across runs.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Addr(pub u64);

/// Machine time. Consumed only by allocation policies; the concrete policy
/// derives fresh addresses from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Time(pub u64);

/// What a store cell can hold: a continuation or a closed value.
///
/// The two kinds share an address space. In concrete execution a given
/// address only ever holds one kind; an abstract allocator may merge them,
/// and the step relation aborts the branches where the kinds disagree with
/// the use site.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Storable {
  Kont(Kont),
  Value(Expr, Env),
}

/// Address → set-of-storables mapping with join-on-write.
///
/// Backed by ordered collections so that whole configurations can be hashed
/// and compared structurally by the fixed-point driver.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Store {
  cells: BTreeMap<Addr, BTreeSet<Storable>>,
}

impl Store {
  pub fn new() -> Store {
    Store::default()
  }

  /// The full cell at `addr`, or `None` if the address was never written.
  pub fn lookup(&self, addr: Addr) -> Option<&BTreeSet<Storable>> {
    self.cells.get(&addr)
  }

  /// Join `storable` into the cell at `addr`.
  ///
  /// This is the only write operation: the new cell is the union of the old
  /// cell and the singleton. There is no strong update.
  pub fn weak_update(&mut self, addr: Addr, storable: Storable) {
    self.cells.entry(addr).or_default().insert(storable);
  }

  /// Lattice order: every cell of `other` is a subset of the same cell here.
  pub fn covers(&self, other: &Store) -> bool {
    other.cells.iter().all(|(addr, cell)| {
      self
        .cells
        .get(addr)
        .is_some_and(|ours| cell.is_subset(ours))
    })
  }

  pub fn iter(&self) -> impl Iterator<Item = (Addr, &BTreeSet<Storable>)> {
    self.cells.iter().map(|(addr, cell)| (*addr, cell))
  }

  pub fn len(&self) -> usize {
    self.cells.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cells.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn weak_update_joins_instead_of_replacing() {
    let mut store = Store::new();
    store.weak_update(Addr(1), Storable::Value(Expr::cst("a"), Env::default()));
    store.weak_update(Addr(1), Storable::Value(Expr::cst("b"), Env::default()));
    assert_eq!(store.lookup(Addr(1)).map(|cell| cell.len()), Some(2));
  }

  #[test]
  fn covers_is_per_address_inclusion() {
    let mut small = Store::new();
    small.weak_update(Addr(1), Storable::Kont(Kont::Empty));

    let mut big = small.clone();
    big.weak_update(Addr(1), Storable::Value(Expr::cst("x"), Env::default()));
    big.weak_update(Addr(2), Storable::Kont(Kont::Empty));

    assert!(big.covers(&small));
    assert!(!small.covers(&big));
    assert!(big.covers(&big));
  }
}
