//! Configurations and the small-step transition relation.
//!
//! One relation serves both execution modes: with a fresh allocator every
//! configuration has exactly one successor (a concrete interpreter); with a
//! finite allocator a store cell can hold several storables and [`step`]
//! returns one successor per reading, which the driver explores exhaustively.
//!
//! Dispatch is a pattern match on the pair (current control, current
//! continuation). The continuation is an explicit argument fetched from the
//! store — no host call stack is involved — so [`successors`] is the
//! entry point that resolves a configuration's continuation pointer and fans
//! out over everything stored there.
//!
//! Deferred promise work runs at two points, ahead of the structural rules so
//! that concrete execution stays deterministic:
//! - the queued link propagations are spliced in front of any non-value
//!   control, all at once as one earliest-first `Seq` chain;
//! - when a value reaches the empty continuation, reactions pop one entry per
//!   step and the link queue drains as one chain, each running as an ordinary
//!   `Resolve`/`Reject` program fragment. Only a value at the empty
//!   continuation with both queues empty is `Done`.
//!
//! Both link-drain sites consume the entire queue because settlement order is
//! observable: an entry left queued behind a just-spliced, not-yet-run chain
//! would be spliced around that chain on the following step and run ahead of
//! it, reversing registration order.

use std::collections::VecDeque;

use tracing::trace;

use crate::alloc::AllocPolicy;
use crate::env::Env;
use crate::error::AbortReason;
use crate::expr::Expr;
use crate::kont::Kont;
use crate::promise::PromiseState;
use crate::promise::PromiseTable;
use crate::promise::PromiseValue;
use crate::promise::QueuedLink;
use crate::promise::QueuedReaction;
use crate::promise::Reaction;
use crate::store::Addr;
use crate::store::Storable;
use crate::store::Store;
use crate::store::Time;

/// A machine configuration.
///
/// Configurations are immutable: every rule clones and rebuilds, so states
/// already placed in a visited set are never disturbed. `kont` is the address
/// of the current continuation in `store`, not the continuation itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct State {
  pub ctrl: Expr,
  pub env: Env,
  pub store: Store,
  pub promises: PromiseTable,
  pub link_queue: VecDeque<QueuedLink>,
  pub reaction_queue: VecDeque<QueuedReaction>,
  pub kont: Addr,
  pub time: Time,
}

impl State {
  /// Successor with new control, environment, continuation pointer, and
  /// time; store, promises, and queues are carried over.
  fn succ(&self, ctrl: Expr, env: Env, kont: Addr, time: Time) -> State {
    State {
      ctrl,
      env,
      kont,
      time,
      ..self.clone()
    }
  }
}

/// The result of one transition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Outcome {
  Next(State),
  /// Quiescent: a value at the empty continuation with no queued work.
  Done(State),
  /// This exploration branch is over; sibling branches continue.
  Abort(AbortReason),
}

/// The initial configuration: address 0 holds the empty continuation, all
/// tables are empty, and time starts at 1.
pub fn inject(expr: Expr) -> State {
  let mut store = Store::new();
  store.weak_update(Addr(0), Storable::Kont(Kont::Empty));
  State {
    ctrl: expr,
    env: Env::new(),
    store,
    promises: PromiseTable::new(),
    link_queue: VecDeque::new(),
    reaction_queue: VecDeque::new(),
    kont: Addr(0),
    time: Time(1),
  }
}

/// Expand a configuration by every continuation stored at its continuation
/// pointer.
///
/// A stored value under the pointer is a type confusion (possible only under
/// abstraction) and aborts that reading; a missing cell aborts outright.
pub fn successors(state: &State, policy: &dyn AllocPolicy) -> Vec<Outcome> {
  let Some(cell) = state.store.lookup(state.kont) else {
    return abort(AbortReason::UnboundAddress);
  };
  cell
    .iter()
    .flat_map(|storable| match storable {
      Storable::Kont(kont) => step(state, kont, policy),
      Storable::Value(..) => abort(AbortReason::NonKontStorable),
    })
    .collect()
}

/// One transition of the machine under the continuation `kont`.
pub fn step(state: &State, kont: &Kont, policy: &dyn AllocPolicy) -> Vec<Outcome> {
  let time = policy.tick(state, kont);
  if state.ctrl.is_value() {
    apply_kont(state, kont, time, policy)
  } else {
    // E-Link-Loop: the queued link propagations are injected at the current
    // hole without disturbing the continuation. The whole queue is spliced
    // as one chain: splicing entries one at a time would let the next step
    // wrap the second entry around the not-yet-run first one and reverse
    // their order.
    if !state.link_queue.is_empty() {
      let spliced = state
        .link_queue
        .iter()
        .rev()
        .fold(state.ctrl.clone(), |rest, link| {
          Expr::seq(settle_expr(&link.value, link.target), rest)
        });
      let mut next = state.succ(spliced, state.env.clone(), state.kont, time);
      next.link_queue.clear();
      return vec![Outcome::Next(next)];
    }
    decompose(state, kont, time, policy)
  }
}

fn abort(reason: AbortReason) -> Vec<Outcome> {
  trace!(%reason, "exploration branch aborted");
  vec![Outcome::Abort(reason)]
}

/// The `Resolve`/`Reject` fragment that forwards a settlement to `target`.
fn settle_expr(value: &PromiseValue, target: Addr) -> Expr {
  match value {
    PromiseValue::Fulfilled(v, _) => Expr::resolve(Expr::Ptr(target), v.clone()),
    PromiseValue::Rejected(v, _) => Expr::reject(Expr::Ptr(target), v.clone()),
  }
}

/// The fragment that runs a queued reaction: apply the handler to the
/// settled value and settle the child promise with the result.
fn reaction_expr(reaction: &QueuedReaction) -> Expr {
  let call = Expr::app(reaction.handler.clone(), reaction.value.value().clone());
  match reaction.value {
    PromiseValue::Fulfilled(..) => Expr::resolve(Expr::Ptr(reaction.child), call),
    PromiseValue::Rejected(..) => Expr::reject(Expr::Ptr(reaction.child), call),
  }
}

/// A value has reached the empty continuation: drain queued work, or halt.
///
/// The value itself is discarded by a drain — its role was only to finish
/// the turn. Reactions pop one at a time, each running to quiescence before
/// the next, in the environment carried by its queued promise value so
/// handler arguments resolve in their original scope. Link propagations
/// drain wholesale into one earliest-first chain (as in the non-value
/// splice), evaluated in the first-queued settlement's environment; leaving
/// the tail queued would hand it to the non-value splice, which runs the
/// freshly drained chain first and reverses queue order.
fn drain_or_done(state: &State, time: Time) -> Vec<Outcome> {
  if let Some(reaction) = state.reaction_queue.front() {
    let mut next = state.succ(
      reaction_expr(reaction),
      reaction.value.env().clone(),
      state.kont,
      time,
    );
    next.reaction_queue.pop_front();
    return vec![Outcome::Next(next)];
  }
  if let Some(front) = state.link_queue.front() {
    let last = state.link_queue.back().unwrap_or(front);
    let chain = state
      .link_queue
      .iter()
      .rev()
      .skip(1)
      .fold(settle_expr(&last.value, last.target), |rest, link| {
        Expr::seq(settle_expr(&link.value, link.target), rest)
      });
    let mut next = state.succ(chain, front.value.env().clone(), state.kont, time);
    next.link_queue.clear();
    return vec![Outcome::Next(next)];
  }
  vec![Outcome::Done(state.clone())]
}

/// Successor that pushes `frame` at a fresh address and focuses `ctrl`.
fn push_frame(state: &State, addr: Addr, frame: Kont, ctrl: Expr, env: Env, time: Time) -> State {
  let mut next = state.succ(ctrl, env, addr, time);
  next.store.weak_update(addr, Storable::Kont(frame));
  next
}

/// First operand done: save it in a `…2` frame and focus the second operand
/// in the environment that closed it.
fn shift_to_second(
  state: &State,
  kont: &Kont,
  make_frame: fn(Expr, Env, Addr) -> Kont,
  second: &Expr,
  second_env: &Env,
  ret: Addr,
  time: Time,
  policy: &dyn AllocPolicy,
) -> Vec<Outcome> {
  let addr = policy.alloc(state, kont);
  let frame = make_frame(state.ctrl.clone(), state.env.clone(), ret);
  vec![Outcome::Next(push_frame(
    state,
    addr,
    frame,
    second.clone(),
    second_env.clone(),
    time,
  ))]
}

fn apply_kont(state: &State, kont: &Kont, time: Time, policy: &dyn AllocPolicy) -> Vec<Outcome> {
  let value = &state.ctrl;
  match kont {
    Kont::Empty => drain_or_done(state, time),

    Kont::App1(operand, operand_env, ret) => shift_to_second(
      state, kont, Kont::App2, operand, operand_env, *ret, time, policy,
    ),

    // The beta step: bind the operand value at a fresh address and enter
    // the body.
    Kont::App2(func, func_env, ret) => {
      let Expr::Abs(param, body) = func else {
        return abort(AbortReason::NotAFunction);
      };
      let addr = policy.alloc(state, kont);
      let mut next = state.succ((**body).clone(), func_env.bind(*param, addr), *ret, time);
      next
        .store
        .weak_update(addr, Storable::Value(value.clone(), state.env.clone()));
      vec![Outcome::Next(next)]
    }

    Kont::Ref(ret) => {
      let addr = policy.alloc(state, kont);
      let mut next = state.succ(Expr::Ptr(addr), state.env.clone(), *ret, time);
      next
        .store
        .weak_update(addr, Storable::Value(value.clone(), state.env.clone()));
      vec![Outcome::Next(next)]
    }

    Kont::Deref(ret) => {
      let Expr::Ptr(addr) = value else {
        return abort(AbortReason::NotAPointer);
      };
      let Some(cell) = state.store.lookup(*addr) else {
        return abort(AbortReason::UnboundAddress);
      };
      cell
        .iter()
        .map(|storable| match storable {
          Storable::Value(v, env) => {
            Outcome::Next(state.succ(v.clone(), env.clone(), *ret, time))
          }
          Storable::Kont(_) => Outcome::Abort(AbortReason::NonValueStorable),
        })
        .collect()
    }

    Kont::Seq(second, second_env, ret) => {
      vec![Outcome::Next(state.succ(
        second.clone(),
        second_env.clone(),
        *ret,
        time,
      ))]
    }

    Kont::Promisify(ret) => {
      let Expr::Ptr(addr) = value else {
        return abort(AbortReason::NotAPointer);
      };
      let mut next = state.succ(Expr::undef(), state.env.clone(), *ret, time);
      next.promises.promisify(*addr);
      vec![Outcome::Next(next)]
    }

    Kont::Resolve1(arg, arg_env, ret) => shift_to_second(
      state, kont, Kont::Resolve2, arg, arg_env, *ret, time, policy,
    ),
    Kont::Reject1(arg, arg_env, ret) => shift_to_second(
      state, kont, Kont::Reject2, arg, arg_env, *ret, time, policy,
    ),
    Kont::OnResolve1(arg, arg_env, ret) => shift_to_second(
      state, kont, Kont::OnResolve2, arg, arg_env, *ret, time, policy,
    ),
    Kont::OnReject1(arg, arg_env, ret) => shift_to_second(
      state, kont, Kont::OnReject2, arg, arg_env, *ret, time, policy,
    ),
    Kont::Link1(arg, arg_env, ret) => shift_to_second(
      state, kont, Kont::Link2, arg, arg_env, *ret, time, policy,
    ),

    Kont::Resolve2(target, _, ret) => {
      settle_step(state, target, *ret, time, PromiseValue::Fulfilled)
    }
    Kont::Reject2(target, _, ret) => {
      settle_step(state, target, *ret, time, PromiseValue::Rejected)
    }

    Kont::OnResolve2(target, _, ret) => {
      register_step(state, kont, target, *ret, time, policy, Polarity::Fulfill)
    }
    Kont::OnReject2(target, _, ret) => {
      register_step(state, kont, target, *ret, time, policy, Polarity::Reject)
    }

    Kont::Link2(parent, _, ret) => {
      let Expr::Ptr(parent_addr) = parent else {
        return abort(AbortReason::NotAPointer);
      };
      let Expr::Ptr(target_addr) = value else {
        return abort(AbortReason::NotAPointer);
      };
      let mut next = state.succ(Expr::undef(), state.env.clone(), *ret, time);
      next.promises.add_link(*parent_addr, *target_addr);
      vec![Outcome::Next(next)]
    }
  }
}

/// `Resolve`/`Reject` with both operands evaluated: settle once, queue the
/// drained links and reactions in registration order, yield `Undef`.
fn settle_step(
  state: &State,
  target: &Expr,
  ret: Addr,
  time: Time,
  make_value: fn(Expr, Env) -> PromiseValue,
) -> Vec<Outcome> {
  let Expr::Ptr(addr) = target else {
    return abort(AbortReason::NotAPointer);
  };
  if state.promises.state(*addr).is_none() {
    return abort(AbortReason::PromiseMisuse);
  }

  let mut next = state.succ(Expr::undef(), state.env.clone(), ret, time);
  let value = make_value(state.ctrl.clone(), state.env.clone());
  let (reactions, links) = next.promises.settle(*addr, value.clone());
  for link_target in links {
    next.link_queue.push_back(QueuedLink {
      value: value.clone(),
      target: link_target,
    });
  }
  for reaction in reactions {
    next.reaction_queue.push_back(QueuedReaction {
      value: value.clone(),
      handler: reaction.handler,
      child: reaction.child,
    });
  }
  vec![Outcome::Next(next)]
}

#[derive(Clone, Copy)]
enum Polarity {
  Fulfill,
  Reject,
}

/// `OnResolve`/`OnReject` with both operands evaluated.
///
/// On a pending promise the handler is registered; on a settlement of the
/// matching polarity the reaction is queued directly. Either way a fresh
/// pending child promise is the result. A settlement of the opposite
/// polarity registers nothing and yields `Undef`.
fn register_step(
  state: &State,
  kont: &Kont,
  target: &Expr,
  ret: Addr,
  time: Time,
  policy: &dyn AllocPolicy,
  polarity: Polarity,
) -> Vec<Outcome> {
  let Expr::Ptr(addr) = target else {
    return abort(AbortReason::NotAPointer);
  };
  let handler = state.ctrl.clone();

  match state.promises.state(*addr) {
    None => abort(AbortReason::PromiseMisuse),

    Some(PromiseState::Pending) => {
      let child = policy.alloc(state, kont);
      let mut next = state.succ(Expr::Ptr(child), state.env.clone(), ret, time);
      next.promises.promisify(child);
      let reaction = Reaction { handler, child };
      match polarity {
        Polarity::Fulfill => next.promises.add_fulfill_reaction(*addr, reaction),
        Polarity::Reject => next.promises.add_reject_reaction(*addr, reaction),
      }
      vec![Outcome::Next(next)]
    }

    Some(PromiseState::Settled(value)) => {
      let matching = matches!(
        (polarity, value),
        (Polarity::Fulfill, PromiseValue::Fulfilled(..))
          | (Polarity::Reject, PromiseValue::Rejected(..))
      );
      if !matching {
        return vec![Outcome::Next(state.succ(
          Expr::undef(),
          state.env.clone(),
          ret,
          time,
        ))];
      }
      let child = policy.alloc(state, kont);
      let mut next = state.succ(Expr::Ptr(child), state.env.clone(), ret, time);
      next.promises.promisify(child);
      next.reaction_queue.push_back(QueuedReaction {
        value: value.clone(),
        handler,
        child,
      });
      vec![Outcome::Next(next)]
    }
  }
}

fn decompose(state: &State, kont: &Kont, time: Time, policy: &dyn AllocPolicy) -> Vec<Outcome> {
  // Helper for the rules that focus a subexpression under a new frame.
  let focus = |first: &Expr, frame: Kont| {
    let addr = policy.alloc(state, kont);
    vec![Outcome::Next(push_frame(
      state,
      addr,
      frame,
      first.clone(),
      state.env.clone(),
      time,
    ))]
  };

  match &state.ctrl {
    Expr::Var(var) => {
      let Some(addr) = state.env.lookup(*var) else {
        return abort(AbortReason::UnboundVariable);
      };
      let Some(cell) = state.store.lookup(addr) else {
        return abort(AbortReason::UnboundAddress);
      };
      cell
        .iter()
        .map(|storable| match storable {
          Storable::Value(v, env) => {
            Outcome::Next(state.succ(v.clone(), env.clone(), state.kont, time))
          }
          Storable::Kont(_) => Outcome::Abort(AbortReason::NonValueStorable),
        })
        .collect()
    }

    Expr::App(func, arg) => focus(
      func,
      Kont::App1((**arg).clone(), state.env.clone(), state.kont),
    ),
    Expr::Ref(e) => focus(e, Kont::Ref(state.kont)),
    Expr::Deref(e) => focus(e, Kont::Deref(state.kont)),
    Expr::Seq(first, second) => focus(
      first,
      Kont::Seq((**second).clone(), state.env.clone(), state.kont),
    ),
    Expr::Promisify(e) => focus(e, Kont::Promisify(state.kont)),
    Expr::Resolve(promise, value) => focus(
      promise,
      Kont::Resolve1((**value).clone(), state.env.clone(), state.kont),
    ),
    Expr::Reject(promise, value) => focus(
      promise,
      Kont::Reject1((**value).clone(), state.env.clone(), state.kont),
    ),
    Expr::OnResolve(promise, handler) => focus(
      promise,
      Kont::OnResolve1((**handler).clone(), state.env.clone(), state.kont),
    ),
    Expr::OnReject(promise, handler) => focus(
      promise,
      Kont::OnReject1((**handler).clone(), state.env.clone(), state.kont),
    ),
    Expr::Link(parent, child) => focus(
      parent,
      Kont::Link1((**child).clone(), state.env.clone(), state.kont),
    ),

    Expr::Abs(..) | Expr::Cst(..) | Expr::Ptr(..) => {
      unreachable!("values are dispatched through apply_kont")
    }
  }
}
