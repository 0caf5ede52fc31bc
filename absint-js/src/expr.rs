//! Syntax of the promise calculus.
//!
//! The language is a lambda calculus with string constants, first-class heap
//! addresses, mutable references, sequencing, and promise operations. The AST
//! is a closed tagged sum; the machine dispatches by pattern matching on it,
//! so there is deliberately no visitor or virtual-dispatch layer.

use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;

use crate::store::Addr;

/// A variable. Opaque: used only for identity (binding and lookup).
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Var(pub u32);

/// An expression of the promise calculus.
///
/// The values of the language are exactly `Abs`, `Cst`, and `Ptr`; see
/// [`Expr::is_value`]. `Ptr` does not occur in source programs — it is
/// introduced by reduction (`Ref`) and by promise operations — but keeping it
/// in the one expression type means a machine configuration's control is
/// always just an `Expr`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Expr {
  Var(Var),
  Abs(Var, Box<Expr>),
  App(Box<Expr>, Box<Expr>),
  /// String constant.
  Cst(Arc<str>),
  /// A heap address as a first-class value.
  Ptr(Addr),
  /// Allocate a fresh cell holding the value of the subexpression.
  Ref(Box<Expr>),
  /// Read a cell through a `Ptr`.
  Deref(Box<Expr>),
  /// Evaluate the first subexpression for effect, discard, run the second.
  Seq(Box<Expr>, Box<Expr>),
  /// Turn the addressed cell into a pending promise (idempotent).
  Promisify(Box<Expr>),
  /// Fulfill a pending promise with a value.
  Resolve(Box<Expr>, Box<Expr>),
  /// Reject a pending promise with a value.
  Reject(Box<Expr>, Box<Expr>),
  /// Register a fulfill handler; evaluates to the child promise.
  OnResolve(Box<Expr>, Box<Expr>),
  /// Register a reject handler; evaluates to the child promise.
  OnReject(Box<Expr>, Box<Expr>),
  /// Forward the first promise's settlement to the second.
  Link(Box<Expr>, Box<Expr>),
}

impl Expr {
  /// Whether this expression is a value (a finished computation).
  pub fn is_value(&self) -> bool {
    matches!(self, Expr::Abs(..) | Expr::Cst(..) | Expr::Ptr(..))
  }

  pub fn var(v: u32) -> Expr {
    Expr::Var(Var(v))
  }

  pub fn abs(param: Var, body: Expr) -> Expr {
    Expr::Abs(param, Box::new(body))
  }

  pub fn app(func: Expr, arg: Expr) -> Expr {
    Expr::App(Box::new(func), Box::new(arg))
  }

  pub fn cst(s: &str) -> Expr {
    Expr::Cst(Arc::from(s))
  }

  /// The unit-like result of effect-only operations.
  pub fn undef() -> Expr {
    Expr::cst("Undef")
  }

  pub fn ref_(e: Expr) -> Expr {
    Expr::Ref(Box::new(e))
  }

  pub fn deref(e: Expr) -> Expr {
    Expr::Deref(Box::new(e))
  }

  pub fn seq(first: Expr, second: Expr) -> Expr {
    Expr::Seq(Box::new(first), Box::new(second))
  }

  pub fn promisify(e: Expr) -> Expr {
    Expr::Promisify(Box::new(e))
  }

  pub fn resolve(promise: Expr, value: Expr) -> Expr {
    Expr::Resolve(Box::new(promise), Box::new(value))
  }

  pub fn reject(promise: Expr, value: Expr) -> Expr {
    Expr::Reject(Box::new(promise), Box::new(value))
  }

  pub fn on_resolve(promise: Expr, handler: Expr) -> Expr {
    Expr::OnResolve(Box::new(promise), Box::new(handler))
  }

  pub fn on_reject(promise: Expr, handler: Expr) -> Expr {
    Expr::OnReject(Box::new(promise), Box::new(handler))
  }

  pub fn link(parent: Expr, child: Expr) -> Expr {
    Expr::Link(Box::new(parent), Box::new(child))
  }
}
