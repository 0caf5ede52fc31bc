//! Concrete-mode evaluation of the lambda-calculus fragment.

use absint_js::{AbortReason, Expr, Outcome, Var, run};

fn single_done(analysis: &absint_js::Analysis) -> &absint_js::State {
  assert_eq!(
    analysis.outcomes.len(),
    1,
    "concrete evaluation must produce exactly one terminal outcome"
  );
  analysis
    .done_states()
    .next()
    .expect("the single terminal outcome should be Done")
}

#[test]
fn identity_application_reduces_to_the_argument() {
  let program = Expr::app(Expr::abs(Var(0), Expr::var(0)), Expr::cst("hi"));
  let analysis = run(program);
  assert_eq!(single_done(&analysis).ctrl, Expr::cst("hi"));
}

#[test]
fn k_combinator_returns_its_first_argument() {
  let k = Expr::abs(Var(0), Expr::abs(Var(1), Expr::var(0)));
  let program = Expr::app(Expr::app(k, Expr::cst("a")), Expr::cst("b"));
  let analysis = run(program);
  assert_eq!(single_done(&analysis).ctrl, Expr::cst("a"));
}

#[test]
fn a_value_program_is_immediately_done() {
  let identity = Expr::abs(Var(0), Expr::var(0));
  let analysis = run(identity);
  let done = single_done(&analysis);
  assert!(matches!(done.ctrl, Expr::Abs(..)));
}

#[test]
fn sequencing_discards_the_first_result() {
  let program = Expr::seq(Expr::cst("a"), Expr::cst("b"));
  let analysis = run(program);
  assert_eq!(single_done(&analysis).ctrl, Expr::cst("b"));
}

#[test]
fn closures_capture_their_defining_scope() {
  // (λx. (λy. x) "ignored") "kept" — the inner body's x must resolve through
  // the closure's environment, not the call-site environment.
  let program = Expr::app(
    Expr::abs(
      Var(0),
      Expr::app(Expr::abs(Var(1), Expr::var(0)), Expr::cst("ignored")),
    ),
    Expr::cst("kept"),
  );
  let analysis = run(program);
  assert_eq!(single_done(&analysis).ctrl, Expr::cst("kept"));
}

#[test]
fn unbound_variable_aborts() {
  let analysis = run(Expr::var(7));
  assert_eq!(
    analysis.outcomes.into_iter().collect::<Vec<_>>(),
    vec![Outcome::Abort(AbortReason::UnboundVariable)]
  );
}

#[test]
fn unbound_variable_inside_a_body_aborts() {
  let program = Expr::app(Expr::abs(Var(0), Expr::var(1)), Expr::cst("x"));
  let analysis = run(program);
  assert!(analysis.aborts().any(|r| r == AbortReason::UnboundVariable));
  assert_eq!(analysis.outcomes.len(), 1);
}

#[test]
fn applying_a_string_aborts() {
  let program = Expr::app(Expr::cst("not a function"), Expr::cst("x"));
  let analysis = run(program);
  assert!(analysis.aborts().any(|r| r == AbortReason::NotAFunction));
}

#[test]
fn concrete_runs_have_exactly_one_terminal_outcome() {
  let programs = vec![
    Expr::cst("just a value"),
    Expr::app(Expr::abs(Var(0), Expr::var(0)), Expr::cst("hi")),
    Expr::seq(Expr::cst("a"), Expr::seq(Expr::cst("b"), Expr::cst("c"))),
    Expr::deref(Expr::ref_(Expr::cst("x"))),
    Expr::var(3),
    Expr::app(Expr::cst("bad"), Expr::cst("x")),
  ];
  for program in programs {
    let analysis = run(program.clone());
    assert_eq!(analysis.outcomes.len(), 1, "program {program:?}");
    assert!(!analysis.out_of_fuel);
  }
}
