//! Promise states, reaction tables, links, and the two drain queues.
//!
//! A promise is a store address with an attached state machine:
//!
//! ```text
//! (absent) --promisify--> Pending --settle(Fulfilled v)--> Fulfilled  [terminal]
//!                                \--settle(Rejected v)---> Rejected   [terminal]
//! ```
//!
//! While pending, an address accumulates ordered fulfill/reject reaction
//! lists and an ordered link list. Settling is once-only: it drains all three
//! lists and hands the matching-polarity reactions and the links back to the
//! machine, which turns them into queue entries. Registration order is
//! preserved end to end because reaction execution order is observable.

use std::collections::BTreeMap;
use std::mem;

use crate::env::Env;
use crate::expr::Expr;
use crate::store::Addr;

/// The settlement of a promise: the value it was fulfilled or rejected with,
/// together with the environment that closed that value.
///
/// The environment is what lets a handler body interpret the settled value in
/// its original scope rather than the scope of the drain site. Queues carry
/// `PromiseValue`, not [`PromiseState`], so a pending promise can never be
/// queued.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PromiseValue {
  Fulfilled(Expr, Env),
  Rejected(Expr, Env),
}

impl PromiseValue {
  pub fn value(&self) -> &Expr {
    match self {
      PromiseValue::Fulfilled(value, _) | PromiseValue::Rejected(value, _) => value,
    }
  }

  pub fn env(&self) -> &Env {
    match self {
      PromiseValue::Fulfilled(_, env) | PromiseValue::Rejected(_, env) => env,
    }
  }
}

/// The state of a promisified address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PromiseState {
  Pending,
  Settled(PromiseValue),
}

/// A registered handler together with the child promise its result settles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Reaction {
  pub handler: Expr,
  pub child: Addr,
}

/// A pending link propagation: `value` must be forwarded to `target`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueuedLink {
  pub value: PromiseValue,
  pub target: Addr,
}

/// A pending reaction: `handler` must be applied to `value`, settling `child`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueuedReaction {
  pub value: PromiseValue,
  pub handler: Expr,
  pub child: Addr,
}

// Links may be registered on an address that was never promisified, so the
// state is optional independently of the lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
struct PromiseSlot {
  state: Option<PromiseState>,
  fulfill_reactions: Vec<Reaction>,
  reject_reactions: Vec<Reaction>,
  links: Vec<Addr>,
}

/// Per-address promise bookkeeping: state, reaction lists, and links.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PromiseTable {
  slots: BTreeMap<Addr, PromiseSlot>,
}

impl PromiseTable {
  pub fn new() -> PromiseTable {
    PromiseTable::default()
  }

  /// Make `addr` a pending promise if it has no promise state yet. Idempotent:
  /// an already-pending or settled address is left unchanged.
  pub fn promisify(&mut self, addr: Addr) {
    self
      .slots
      .entry(addr)
      .or_default()
      .state
      .get_or_insert(PromiseState::Pending);
  }

  /// The promise state of `addr`, or `None` if it was never promisified.
  pub fn state(&self, addr: Addr) -> Option<&PromiseState> {
    self.slots.get(&addr).and_then(|slot| slot.state.as_ref())
  }

  /// Settle a pending promise, draining its slot.
  ///
  /// Returns the matching-polarity reactions and the links, both in
  /// registration order; the opposite-polarity reactions are dropped. If the
  /// address is not a pending promise this is a no-op returning empty lists.
  pub fn settle(&mut self, addr: Addr, value: PromiseValue) -> (Vec<Reaction>, Vec<Addr>) {
    let Some(slot) = self.slots.get_mut(&addr) else {
      return (Vec::new(), Vec::new());
    };
    if slot.state != Some(PromiseState::Pending) {
      return (Vec::new(), Vec::new());
    }

    let fulfill = mem::take(&mut slot.fulfill_reactions);
    let reject = mem::take(&mut slot.reject_reactions);
    let links = mem::take(&mut slot.links);
    let matching = match value {
      PromiseValue::Fulfilled(..) => fulfill,
      PromiseValue::Rejected(..) => reject,
    };
    slot.state = Some(PromiseState::Settled(value));
    (matching, links)
  }

  pub fn add_fulfill_reaction(&mut self, addr: Addr, reaction: Reaction) {
    self.slots.entry(addr).or_default().fulfill_reactions.push(reaction);
  }

  pub fn add_reject_reaction(&mut self, addr: Addr, reaction: Reaction) {
    self.slots.entry(addr).or_default().reject_reactions.push(reaction);
  }

  pub fn add_link(&mut self, addr: Addr, target: Addr) {
    self.slots.entry(addr).or_default().links.push(target);
  }

  pub fn fulfill_reactions(&self, addr: Addr) -> &[Reaction] {
    self
      .slots
      .get(&addr)
      .map_or(&[], |slot| slot.fulfill_reactions.as_slice())
  }

  pub fn reject_reactions(&self, addr: Addr) -> &[Reaction] {
    self
      .slots
      .get(&addr)
      .map_or(&[], |slot| slot.reject_reactions.as_slice())
  }

  pub fn links(&self, addr: Addr) -> &[Addr] {
    self.slots.get(&addr).map_or(&[], |slot| slot.links.as_slice())
  }

  /// All promisified addresses with their states.
  pub fn iter_states(&self) -> impl Iterator<Item = (Addr, &PromiseState)> {
    self
      .slots
      .iter()
      .filter_map(|(addr, slot)| slot.state.as_ref().map(|state| (*addr, state)))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn fulfilled(s: &str) -> PromiseValue {
    PromiseValue::Fulfilled(Expr::cst(s), Env::default())
  }

  #[test]
  fn settle_drains_matching_reactions_in_order() {
    let mut table = PromiseTable::new();
    table.promisify(Addr(1));
    table.add_fulfill_reaction(Addr(1), Reaction { handler: Expr::cst("f1"), child: Addr(10) });
    table.add_fulfill_reaction(Addr(1), Reaction { handler: Expr::cst("f2"), child: Addr(11) });
    table.add_reject_reaction(Addr(1), Reaction { handler: Expr::cst("r"), child: Addr(12) });
    table.add_link(Addr(1), Addr(20));

    let (reactions, links) = table.settle(Addr(1), fulfilled("v"));
    assert_eq!(
      reactions.iter().map(|r| r.child).collect::<Vec<_>>(),
      vec![Addr(10), Addr(11)]
    );
    assert_eq!(links, vec![Addr(20)]);

    // The slot is drained: reject reactions are gone too, not just returned.
    assert!(table.fulfill_reactions(Addr(1)).is_empty());
    assert!(table.reject_reactions(Addr(1)).is_empty());
    assert!(table.links(Addr(1)).is_empty());
  }

  #[test]
  fn settle_is_once_only() {
    let mut table = PromiseTable::new();
    table.promisify(Addr(1));
    let _ = table.settle(Addr(1), fulfilled("first"));
    let (reactions, links) = table.settle(Addr(1), fulfilled("second"));
    assert!(reactions.is_empty() && links.is_empty());
    assert_eq!(
      table.state(Addr(1)),
      Some(&PromiseState::Settled(fulfilled("first")))
    );
  }

  #[test]
  fn linking_does_not_promisify() {
    let mut table = PromiseTable::new();
    table.add_link(Addr(1), Addr(2));
    assert_eq!(table.state(Addr(1)), None);
    assert_eq!(table.links(Addr(1)), &[Addr(2)]);
  }
}
