use thiserror::Error;

/// Why an exploration branch aborted.
///
/// Aborts are data, not host errors: the step relation yields
/// [`Outcome::Abort`](crate::Outcome::Abort) and the branch ends there while
/// sibling branches continue. The first three variants are reachable from
/// well-formed programs; the rest are structurally impossible in concrete
/// execution and show up only for malformed input or when an abstraction
/// merges incompatible storables into one address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum AbortReason {
  /// The environment lacks the referenced variable.
  #[error("Unbound variable")]
  UnboundVariable,
  /// A stored continuation was used where a value was required.
  #[error("Non-value storable")]
  NonValueStorable,
  /// A promise operation on an address that was never promisified.
  #[error("Promise misuse")]
  PromiseMisuse,
  /// A read from an address the store has never seen.
  #[error("Unbound address")]
  UnboundAddress,
  /// The continuation pointer resolved to a stored value.
  #[error("Non-continuation storable")]
  NonKontStorable,
  /// The operator position of an application held a non-function value.
  #[error("Applied a non-function")]
  NotAFunction,
  /// A heap or promise operation on a non-pointer value.
  #[error("Expected a pointer")]
  NotAPointer,
}
