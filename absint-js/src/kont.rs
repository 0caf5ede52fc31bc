//! Store-allocated continuations.
//!
//! A continuation is an evaluation context reified as data. Every variant
//! except [`Kont::Empty`] carries the address of its parent continuation, so
//! the "rest of the computation" is a chain of store cells rather than a host
//! call stack. Two-argument operations get two frames: the `…1` frame holds
//! the not-yet-evaluated second operand with its closing environment, the
//! `…2` frame holds the already-computed first value with the environment
//! that closed it.

use crate::env::Env;
use crate::expr::Expr;
use crate::store::Addr;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Kont {
  /// The initial continuation: a value delivered here ends the turn.
  Empty,
  /// Evaluating the operator of an application; payload is the operand.
  App1(Expr, Env, Addr),
  /// Evaluating the operand; payload is the operator value.
  App2(Expr, Env, Addr),
  Ref(Addr),
  Deref(Addr),
  /// Evaluating the first half of a sequence; payload is the second half.
  Seq(Expr, Env, Addr),
  Promisify(Addr),
  Resolve1(Expr, Env, Addr),
  Resolve2(Expr, Env, Addr),
  Reject1(Expr, Env, Addr),
  Reject2(Expr, Env, Addr),
  OnResolve1(Expr, Env, Addr),
  OnResolve2(Expr, Env, Addr),
  OnReject1(Expr, Env, Addr),
  OnReject2(Expr, Env, Addr),
  Link1(Expr, Env, Addr),
  Link2(Expr, Env, Addr),
}
