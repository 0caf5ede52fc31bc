//! An abstract CESK* machine for a promise-flavored lambda calculus.
//!
//! This crate is the evaluation core for analyses over a small language with
//! ECMAScript-shaped promises. It provides:
//! - A first-order machine state: continuations are data stored in the same
//!   address space as values (the `*` of CESK*), so a configuration is a
//!   plain hashable record ([`State`], [`Kont`], [`Store`])
//! - A join-only store ([`Store::weak_update`]) whose cells hold *sets* of
//!   storables
//! - Promise bookkeeping with settle-once states, ordered reaction/link
//!   tables, and FIFO drain queues ([`PromiseTable`], [`QueuedReaction`],
//!   [`QueuedLink`])
//! - Pluggable allocation/time policies ([`AllocPolicy`]): fresh allocation
//!   gives a deterministic concrete interpreter, a finite policy gives a
//!   sound abstract interpreter over the same step relation
//! - The small-step relation ([`step`], [`successors`]) and a worklist
//!   fixed-point driver ([`reachable`], [`run`])
//!
//! # Concrete vs. abstract
//!
//! Nothing in the step relation knows which mode it is in. Under
//! [`ConcreteAlloc`] every store cell is a singleton and every configuration
//! has one successor; under [`MonovariantAlloc`] or [`SiteAlloc`] cells join
//! and [`step`] returns one successor per reading. The driver explores them
//! all, memoizing on structural equality, and the reachable set is finite
//! whenever the address domain is.
//!
//! # Errors
//!
//! The machine has no host error channel: a branch that goes wrong yields
//! [`Outcome::Abort`] with an [`AbortReason`] and sibling branches continue.
//! The library never panics on malformed programs.

mod alloc;
mod drive;
mod env;
mod error;
mod expr;
mod kont;
mod machine;
mod promise;
mod store;

pub use crate::alloc::AllocPolicy;
pub use crate::alloc::ConcreteAlloc;
pub use crate::alloc::MonovariantAlloc;
pub use crate::alloc::SiteAlloc;
pub use crate::drive::reachable;
pub use crate::drive::run;
pub use crate::drive::Analysis;
pub use crate::drive::Budget;
pub use crate::env::Env;
pub use crate::error::AbortReason;
pub use crate::expr::Expr;
pub use crate::expr::Var;
pub use crate::kont::Kont;
pub use crate::machine::inject;
pub use crate::machine::step;
pub use crate::machine::successors;
pub use crate::machine::Outcome;
pub use crate::machine::State;
pub use crate::promise::PromiseState;
pub use crate::promise::PromiseTable;
pub use crate::promise::PromiseValue;
pub use crate::promise::QueuedLink;
pub use crate::promise::QueuedReaction;
pub use crate::promise::Reaction;
pub use crate::store::Addr;
pub use crate::store::Storable;
pub use crate::store::Store;
pub use crate::store::Time;
