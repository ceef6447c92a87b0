//! Symbolic equivalence by evaluation at sample points.
//!
//! Two expressions are taken to be equal when they agree to a relative
//! tolerance at every point where both can be evaluated, with a small
//! allowance for rounding lost when large terms cancel. Every symbol is
//! sampled log-uniformly on [1e-3, 1e3], which lets `sqrt(n**2)` equal `n`
//! and reaches domains such as `sqrt(x - 5)`. Points are fixed, so verdicts
//! are reproducible.

use std::collections::BTreeMap;

use autocheck_core::{BoxError, Simplifier, Value};
use tracing::debug;

use crate::error::{ExprError, ExprResult};
use crate::expr::Expr;

const LOG_LOWER: f64 = -3.0 * std::f64::consts::LN_10;
const LOG_UPPER: f64 = 3.0 * std::f64::consts::LN_10;

/// Multiple of the largest cancelled operand that may differ by rounding.
const CANCELLATION: f64 = 1024.0 * f64::EPSILON;

#[derive(Debug, Clone)]
pub struct SamplingSimplifier {
    /// Number of sample points.
    pub samples: usize,
    /// Points where both sides must be finite for a verdict.
    pub min_points: usize,
    /// Relative agreement required at each point.
    pub tolerance: f64,
}

impl Default for SamplingSimplifier {
    fn default() -> Self {
        Self {
            samples: 32,
            min_points: 3,
            tolerance: 1e-9,
        }
    }
}

impl SamplingSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Equivalence of two parsed expressions.
    pub fn equivalent_exprs(&self, expected: &Expr, answer: &Expr) -> ExprResult<bool> {
        if answer.is_logical() || expected.is_logical() {
            return Err(ExprError::UnsupportedOperand {
                op: "-",
                lhs: answer.head().to_string(),
                rhs: expected.head().to_string(),
            });
        }

        let mut symbols = expected.free_symbols();
        symbols.extend(answer.free_symbols());

        let mut evaluated = 0;
        let mut agree = true;

        for k in 0..self.samples {
            let env: BTreeMap<String, f64> = symbols
                .iter()
                .enumerate()
                .map(|(j, name)| (name.clone(), sample(k, j)))
                .collect();
            let mut scale = 0.0;
            let a = answer.eval_scaled(&env, &mut scale)?;
            let e = expected.eval_scaled(&env, &mut scale)?;
            if !a.is_finite() || !e.is_finite() {
                continue;
            }
            evaluated += 1;

            let allowed = self.tolerance * a.abs().max(e.abs()) + CANCELLATION * scale;
            if (a - e).abs() > allowed {
                debug!(a, e, "disagree at {env:?}");
                agree = false;
                break;
            }
        }

        if agree && evaluated < self.min_points {
            return Err(ExprError::NoSamplePoints);
        }
        debug!(evaluated, agree, "sampled {answer} against {expected}");
        Ok(agree)
    }
}

impl Simplifier for SamplingSimplifier {
    fn equivalent(&self, expected: &Value, answer: &Value) -> Result<bool, BoxError> {
        let (e, a) = match (as_expr(expected), as_expr(answer)) {
            (Some(e), Some(a)) => (e, a),
            _ => {
                return Err(ExprError::UnsupportedOperand {
                    op: "-",
                    lhs: answer.type_name().to_string(),
                    rhs: expected.type_name().to_string(),
                }
                .into())
            }
        };
        Ok(self.equivalent_exprs(&e, &a)?)
    }
}

/// Numbers and expressions from this crate; anything else is not arithmetic.
fn as_expr(value: &Value) -> Option<Expr> {
    match value {
        Value::Bool(b) => Some(Expr::Int(i64::from(*b))),
        Value::Int(i) => Some(Expr::Int(*i)),
        Value::Float(x) => Some(Expr::Float(*x)),
        Value::Symbolic(s) => s.as_any().downcast_ref::<Expr>().cloned(),
        _ => None,
    }
}

/// Positive coordinate of symbol `j` at point `k`, from a Weyl sequence with
/// a distinct irrational step per symbol, mapped log-uniformly.
fn sample(k: usize, j: usize) -> f64 {
    let step = (nth_prime(j) as f64).sqrt().fract();
    let u = (0.5 + (k + 1) as f64 * step).fract();
    (LOG_LOWER + u * (LOG_UPPER - LOG_LOWER)).exp()
}

fn nth_prime(n: usize) -> u64 {
    let mut count = 0;
    let mut candidate = 1;
    while count <= n {
        candidate += 1;
        if (2..candidate).take_while(|d| d * d <= candidate).all(|d| candidate % d != 0) {
            count += 1;
        }
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::sym;
    use autocheck_core::{CheckOptions, Session};

    fn equivalent(expected: &str, answer: &str) -> bool {
        SamplingSimplifier::new()
            .equivalent(&sym(expected).unwrap(), &sym(answer).unwrap())
            .unwrap()
    }

    fn session() -> Session<Vec<u8>> {
        Session::new(Vec::new()).with_simplifier(SamplingSimplifier::new())
    }

    fn take_output(session: &mut Session<Vec<u8>>) -> String {
        String::from_utf8(std::mem::take(session.output_mut())).unwrap()
    }

    #[test]
    fn test_nth_prime() {
        let primes: Vec<u64> = (0..6).map(nth_prime).collect();
        assert_eq!(primes, vec![2, 3, 5, 7, 11, 13]);
    }

    #[test]
    fn test_samples_are_positive_and_distinct() {
        let a: Vec<f64> = (0..32).map(|k| sample(k, 0)).collect();
        let b: Vec<f64> = (0..32).map(|k| sample(k, 1)).collect();
        assert!(a.iter().chain(&b).all(|x| *x >= 1e-3 && *x <= 1e3));
        assert!(a.iter().any(|x| *x < 0.1));
        assert!(a.iter().any(|x| *x > 10.0));
        assert_ne!(a, b);
    }

    #[test]
    fn test_polynomials() {
        assert!(equivalent("n*(n - 1)/2", "(n**2 - n)/2"));
        assert!(!equivalent("n*(n - 1)/2", "n**2"));
        assert!(equivalent("(x + y)**2", "x**2 + 2*x*y + y**2"));
        assert!(!equivalent("(x + y)**2", "x**2 + y**2"));
    }

    #[test]
    fn test_simplify_floats() {
        assert!(equivalent("Rational(2, 3)**n", "(2/3)**n"));
        assert!(!equivalent("Rational(2, 3)**n", "0.6667**n"));
        assert!(equivalent("x/2", "0.5*x"));
    }

    #[test]
    fn test_simplify_sqrts() {
        assert!(equivalent("sqrt(2/pi/n)", "1/sqrt(pi*n/2)"));
        assert!(equivalent("sqrt((x - 1)*(x + 1))", "(x**2 - 1)**0.5"));
        assert!(equivalent("sqrt(n**2)", "n"));
    }

    #[test]
    fn test_undefined_functions() {
        assert!(equivalent("ϕ((x - μ)/σ)", "ϕ(x/σ - μ/σ)"));
        assert!(!equivalent("ϕ((x - μ)/σ)", "ϕ(x - μ/σ)"));
        assert!(!equivalent("ϕ(x)", "ψ(x)"));
    }

    #[test]
    fn test_numbers_against_expressions() {
        let s = SamplingSimplifier::new();
        assert!(s.equivalent(&Value::Int(6), &sym("2*3").unwrap()).unwrap());
        assert!(s.equivalent(&sym("pi/2").unwrap(), &sym("asin(1)").unwrap()).unwrap());
    }

    #[test]
    fn test_xor_is_rejected() {
        let err = SamplingSimplifier::new()
            .equivalent(&sym("n*(n + 1)").unwrap(), &sym("n^2 + n").unwrap())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operand type(s) for -: 'Xor' and 'Mul'"
        );
    }

    #[test]
    fn test_text_is_rejected() {
        let err = SamplingSimplifier::new()
            .equivalent(&sym("n").unwrap(), &Value::Text("n squared".into()))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "unsupported operand type(s) for -: 'str' and 'Symbol'"
        );
    }

    #[test]
    fn test_small_magnitudes_are_distinguished() {
        assert!(!equivalent("x/10**12", "2*x/10**12"));
        assert!(!equivalent("0", "1e-10"));
        assert!(!equivalent("(1/2)**40", "(1/2)**41"));
        assert!(equivalent("x/10**12", "x*1e-12"));
        assert!(equivalent("0", "x - x"));
        assert!(equivalent("1", "sin(x)**2 + cos(x)**2"));

        let mut s = session();
        let result = s.check_symbolic(sym("1e-10").unwrap(), sym("0").unwrap(), CheckOptions::new());
        assert!(!result.passed());
    }

    #[test]
    fn test_large_magnitudes_compare_relatively() {
        assert!(equivalent("2**(n + 1)", "2*2**n"));
        assert!(equivalent("exp(x)*exp(y)", "exp(x + y)"));
        assert!(!equivalent("2**(n + 1)", "2**n + 1"));
    }

    #[test]
    fn test_cancellation_of_large_terms() {
        assert!(equivalent("(x + 1)**2 - x**2", "2*x + 1"));
        assert!(equivalent("(x + y)*(x - y)", "x**2 - y**2"));
    }

    #[test]
    fn test_shifted_domains() {
        assert!(equivalent("sqrt(x - 5)", "(x - 5)**0.5"));
        assert!(!equivalent("sqrt(x - 5)", "sqrt(x - 6)"));
        assert!(equivalent("log(x - 4)", "ln(x - 4)"));
        assert!(!equivalent("log(x - 4)", "log(x - 3)"));
    }

    #[test]
    fn test_booleans_as_integers() {
        let s = SamplingSimplifier::new();
        assert!(s.equivalent(&Value::Bool(true), &sym("x/x").unwrap()).unwrap());
        assert!(!s.equivalent(&Value::Bool(false), &sym("1").unwrap()).unwrap());
    }

    #[test]
    fn test_nowhere_defined() {
        let err = SamplingSimplifier::new()
            .equivalent_exprs(
                &Expr::parse("sqrt(-x)").unwrap(),
                &Expr::parse("sqrt(-x)").unwrap(),
            )
            .unwrap_err();
        assert_eq!(err, ExprError::NoSamplePoints);

        // finite at too few points for a verdict
        let single = SamplingSimplifier {
            samples: 1,
            ..SamplingSimplifier::new()
        };
        let err = single
            .equivalent_exprs(&Expr::parse("x").unwrap(), &Expr::parse("x").unwrap())
            .unwrap_err();
        assert_eq!(err, ExprError::NoSamplePoints);
    }

    #[test]
    fn test_check_symbolic() {
        let mut s = session();
        s.check_symbolic(sym("n*(n - 1)/2").unwrap(), sym("(n**2 - n)/2").unwrap(), CheckOptions::new());
        assert_eq!(take_output(&mut s), "✅ Success!\n");
        s.check_symbolic(sym("n*(n - 1)/2").unwrap(), sym("n**2").unwrap(), CheckOptions::new());
        assert_eq!(
            take_output(&mut s),
            "❌ This answer is incorrect.\nI got this input\n\nn**2\n\n\
             but was expecting something else. Please try again.\n"
        );
    }

    #[test]
    fn test_incorrect_exponents_hint() {
        let mut s = session();
        let result = s.check_symbolic(
            sym("n*(n + 1)").unwrap(),
            sym("n^2 + n").unwrap(),
            CheckOptions::new(),
        );
        assert_eq!(
            result.error(),
            Some("unsupported operand type(s) for -: 'Xor' and 'Mul'")
        );
        assert!(take_output(&mut s).ends_with(
            "⚠️ HINT: It looks like you need to use ** to raise to a power (and not ^).\n"
        ));

        let result = s.check_symbolic(
            sym("n*(n + 1)").unwrap(),
            sym("n**2 + n").unwrap(),
            CheckOptions::new(),
        );
        assert!(result.passed());
    }

    #[test]
    fn test_missing_answer_hint() {
        let mut s = session();
        let result = s.check_symbolic(sym("n").unwrap(), Value::Missing, CheckOptions::new());
        assert_eq!(
            result.error(),
            Some("unsupported operand type(s) for -: 'Missing' and 'Symbol'")
        );
        assert!(take_output(&mut s)
            .ends_with("⚠️ HINT: It looks like you didn't enter an answer.\n"));
    }
}
