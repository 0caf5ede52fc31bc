//! Heap references: allocation, dereference, and the abort paths around them.

use absint_js::{AbortReason, Addr, Expr, Outcome, Storable, Var, run};

#[test]
fn deref_of_ref_reads_back_the_stored_value() {
  let program = Expr::deref(Expr::ref_(Expr::cst("x")));
  let analysis = run(program);
  assert_eq!(analysis.outcomes.len(), 1);

  let done = analysis.done_states().next().expect("one Done outcome");
  assert_eq!(done.ctrl, Expr::cst("x"));

  // Exactly one address holds the stored value, closed by the empty
  // environment (the rest of the store is continuation frames).
  let value_cells = done
    .store
    .iter()
    .filter(|(_, cell)| {
      cell
        .iter()
        .any(|s| matches!(s, Storable::Value(v, env) if *v == Expr::cst("x") && env.is_empty()))
    })
    .count();
  assert_eq!(value_cells, 1);
}

#[test]
fn ref_evaluates_to_a_pointer_at_the_stored_cell() {
  let analysis = run(Expr::ref_(Expr::cst("cell")));
  let done = analysis.done_states().next().expect("one Done outcome");
  let Expr::Ptr(addr) = done.ctrl else {
    panic!("Ref should evaluate to a pointer, got {:?}", done.ctrl);
  };
  let cell = done.store.lookup(addr).expect("the pointee cell exists");
  assert!(cell
    .iter()
    .any(|s| matches!(s, Storable::Value(v, _) if *v == Expr::cst("cell"))));
}

#[test]
fn deref_of_a_continuation_address_aborts() {
  // Address 0 always holds the initial empty continuation.
  let program = Expr::deref(Expr::Ptr(Addr(0)));
  let analysis = run(program);
  assert_eq!(
    analysis.outcomes.into_iter().collect::<Vec<_>>(),
    vec![Outcome::Abort(AbortReason::NonValueStorable)]
  );
}

#[test]
fn deref_of_an_unallocated_address_aborts() {
  let program = Expr::deref(Expr::Ptr(Addr(999)));
  let analysis = run(program);
  assert!(analysis.aborts().any(|r| r == AbortReason::UnboundAddress));
}

#[test]
fn deref_of_a_non_pointer_aborts() {
  let program = Expr::deref(Expr::cst("not a pointer"));
  let analysis = run(program);
  assert!(analysis.aborts().any(|r| r == AbortReason::NotAPointer));
}

#[test]
fn stored_values_are_closed_by_their_defining_environment() {
  // (λx. (λp. (deref p) "_") (ref (λy. x))) "captured" — the closure stored
  // in the cell keeps its binding of x even though the deref site has left
  // that scope.
  let program = Expr::app(
    Expr::abs(
      Var(0),
      Expr::app(
        Expr::abs(Var(1), Expr::app(Expr::deref(Expr::var(1)), Expr::cst("_"))),
        Expr::ref_(Expr::abs(Var(2), Expr::var(0))),
      ),
    ),
    Expr::cst("captured"),
  );
  let analysis = run(program);
  assert_eq!(analysis.outcomes.len(), 1);
  let done = analysis.done_states().next().expect("one Done outcome");
  assert_eq!(done.ctrl, Expr::cst("captured"));
}
