use absint_js::{Budget, ConcreteAlloc, Expr, MonovariantAlloc, Outcome, Var, inject, reachable, successors};
use proptest::prelude::*;

fn arb_expr() -> impl Strategy<Value = Expr> {
  let leaf = prop_oneof![
    (0u32..3).prop_map(Expr::var),
    "[a-z]{1,4}".prop_map(|s| Expr::cst(&s)),
  ];
  leaf.prop_recursive(4, 24, 2, |inner| {
    prop_oneof![
      ((0u32..3), inner.clone()).prop_map(|(v, body)| Expr::abs(Var(v), body)),
      (inner.clone(), inner.clone()).prop_map(|(f, a)| Expr::app(f, a)),
      inner.clone().prop_map(Expr::ref_),
      inner.clone().prop_map(Expr::deref),
      (inner.clone(), inner.clone()).prop_map(|(a, b)| Expr::seq(a, b)),
      inner.clone().prop_map(Expr::promisify),
      (inner.clone(), inner.clone()).prop_map(|(p, v)| Expr::resolve(p, v)),
      (inner.clone(), inner.clone()).prop_map(|(p, v)| Expr::reject(p, v)),
      (inner.clone(), inner.clone()).prop_map(|(p, h)| Expr::on_resolve(p, h)),
      (inner.clone(), inner.clone()).prop_map(|(p, h)| Expr::on_reject(p, h)),
      (inner.clone(), inner).prop_map(|(a, b)| Expr::link(a, b)),
    ]
  })
}

proptest! {
  #[test]
  fn abstract_exploration_never_panics(e in arb_expr()) {
    let _ = reachable(
      inject(e),
      &MonovariantAlloc::default(),
      Budget::with_fuel(2_000),
    );
  }

  #[test]
  fn concrete_exploration_has_at_most_one_terminal(e in arb_expr()) {
    let analysis = reachable(inject(e), &ConcreteAlloc, Budget::with_fuel(2_000));
    if analysis.out_of_fuel {
      prop_assert!(analysis.outcomes.is_empty());
    } else {
      prop_assert_eq!(analysis.outcomes.len(), 1);
    }
  }

  #[test]
  fn stores_are_monotone_along_generated_programs(e in arb_expr()) {
    let analysis = reachable(inject(e), &ConcreteAlloc, Budget::with_fuel(300));
    for state in &analysis.visited {
      for outcome in successors(state, &ConcreteAlloc) {
        if let Outcome::Next(next) = outcome {
          prop_assert!(next.store.covers(&state.store));
        }
      }
    }
  }
}
