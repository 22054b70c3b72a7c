use std::ops::{Add, Mul, Sub};

use nalgebra::Vector3;

/// Default finite-difference step, in stored position units.
pub const DEFAULT_EPSILON: f64 = 1e-2;

/// One inverse-power term of a scalar potential: `coefficient * r^power`
/// where `r` is the distance from `origin` to the evaluation point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldTerm {
    pub power: f64,
    pub coefficient: f64,
    pub origin: Vector3<f64>,
}

impl FieldTerm {
    pub fn new(power: f64, coefficient: f64, origin: Vector3<f64>) -> Self {
        Self {
            power,
            coefficient,
            origin,
        }
    }

    /// The additive identity term `(0, 0, origin)`.
    pub fn null() -> Self {
        Self::new(0.0, 0.0, Vector3::zeros())
    }

    fn negated(&self) -> Self {
        Self::new(self.power, -self.coefficient, self.origin)
    }
}

/// A scalar potential defined as a sum of inverse-power terms.
///
/// The algebra is strictly persistent: `+`, `-` and scalar `*` always build
/// a fresh term list, so fields derived from a shared base never alias each
/// other's terms.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarField {
    pub terms: Vec<FieldTerm>,
}

impl ScalarField {
    pub fn new(terms: Vec<FieldTerm>) -> Self {
        Self { terms }
    }

    /// A field that evaluates to zero everywhere.
    pub fn null() -> Self {
        Self::new(vec![FieldTerm::null()])
    }

    /// Evaluates the potential at `position`.
    ///
    /// Evaluation at a term origin with a negative power divides by zero;
    /// callers must keep bodies from exactly coinciding.
    pub fn evaluate(&self, position: Vector3<f64>) -> f64 {
        self.terms
            .iter()
            .map(|term| {
                let r = (term.origin - position).norm();
                term.coefficient * r.powf(term.power)
            })
            .sum()
    }

    /// Central finite-difference gradient with step `epsilon` per axis.
    pub fn gradient(&self, position: Vector3<f64>, epsilon: f64) -> Vector3<f64> {
        let mut gradient = Vector3::zeros();
        for axis in 0..3 {
            let mut forward = position;
            let mut backward = position;
            forward[axis] += epsilon / 2.0;
            backward[axis] -= epsilon / 2.0;
            gradient[axis] = (self.evaluate(forward) - self.evaluate(backward)) / epsilon;
        }
        gradient
    }

    /// Acceleration of a test particle in this potential (negative gradient).
    pub fn acceleration(&self, position: Vector3<f64>, epsilon: f64) -> Vector3<f64> {
        -self.gradient(position, epsilon)
    }

    /// Converts a potential whose coefficients are expressed in meters into
    /// one expressed in stored units of `10^n` meters, such that gradients
    /// taken in stored units yield accelerations in stored units per second
    /// squared. Each term picks up a factor `10^(n (power - 2))`; for the
    /// gravitational `power = -1` term this is the familiar `10^(-3n)`.
    pub fn rescale(&self, n: i32) -> Self {
        let terms = self
            .terms
            .iter()
            .map(|term| {
                FieldTerm::new(
                    term.power,
                    term.coefficient * 10f64.powf(n as f64 * (term.power - 2.0)),
                    term.origin,
                )
            })
            .collect();
        Self::new(terms)
    }
}

impl Add for ScalarField {
    type Output = ScalarField;

    fn add(self, other: ScalarField) -> ScalarField {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().copied());
        ScalarField::new(terms)
    }
}

impl Sub for ScalarField {
    type Output = ScalarField;

    /// Term-wise cancel-or-negate: a term present in the receiver is
    /// removed, any other is appended with its coefficient negated.
    fn sub(self, other: ScalarField) -> ScalarField {
        let mut terms = self.terms.clone();
        for term in &other.terms {
            if let Some(found) = terms.iter().position(|t| t == term) {
                terms.remove(found);
            } else {
                terms.push(term.negated());
            }
        }
        ScalarField::new(terms)
    }
}

impl Mul<f64> for ScalarField {
    type Output = ScalarField;

    fn mul(self, scalar: f64) -> ScalarField {
        let terms = self
            .terms
            .iter()
            .map(|term| FieldTerm::new(term.power, scalar * term.coefficient, term.origin))
            .collect();
        ScalarField::new(terms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    fn sample_points() -> Vec<Vector3<f64>> {
        vec![
            Vector3::new(1.0, 2.0, 3.0),
            Vector3::new(-4.0, 0.5, 0.0),
            Vector3::new(10.0, -10.0, 5.0),
        ]
    }

    #[test]
    fn null_term_is_additive_identity() {
        let field = ScalarField::new(vec![FieldTerm::new(-1.0, 3.0, Vector3::zeros())]);
        let summed = field.clone() + ScalarField::null();
        for p in sample_points() {
            assert!((summed.evaluate(p) - field.evaluate(p)).abs() < TOLERANCE);
        }
    }

    #[test]
    fn addition_commutes_to_tolerance() {
        let a = ScalarField::new(vec![FieldTerm::new(-1.0, 2.0, Vector3::new(1.0, 0.0, 0.0))]);
        let b = ScalarField::new(vec![FieldTerm::new(-2.0, 5.0, Vector3::new(0.0, 1.0, 0.0))]);
        let ab = a.clone() + b.clone();
        let ba = b + a;
        for p in sample_points() {
            assert!((ab.evaluate(p) - ba.evaluate(p)).abs() < TOLERANCE);
        }
    }

    #[test]
    fn addition_associates_to_tolerance() {
        let a = ScalarField::new(vec![FieldTerm::new(-1.0, 2.0, Vector3::new(1.0, 0.0, 0.0))]);
        let b = ScalarField::new(vec![FieldTerm::new(-2.0, 5.0, Vector3::new(0.0, 1.0, 0.0))]);
        let c = ScalarField::new(vec![FieldTerm::new(1.0, 0.5, Vector3::new(0.0, 0.0, 1.0))]);
        let left = (a.clone() + b.clone()) + c.clone();
        let right = a + (b + c);
        for p in sample_points() {
            assert!((left.evaluate(p) - right.evaluate(p)).abs() < TOLERANCE);
        }
    }

    #[test]
    fn subtracting_present_term_removes_it() {
        let term = FieldTerm::new(-1.0, 2.0, Vector3::zeros());
        let other = FieldTerm::new(-2.0, 1.0, Vector3::new(1.0, 1.0, 1.0));
        let combined = ScalarField::new(vec![term, other]);
        let difference = combined - ScalarField::new(vec![term]);
        assert_eq!(difference.terms, vec![other]);
    }

    #[test]
    fn subtracting_absent_term_appends_negation() {
        let term = FieldTerm::new(-1.0, 2.0, Vector3::zeros());
        let absent = FieldTerm::new(-2.0, 1.0, Vector3::new(1.0, 1.0, 1.0));
        let difference = ScalarField::new(vec![term]) - ScalarField::new(vec![absent]);
        assert_eq!(difference.terms, vec![term, absent.negated()]);
    }

    #[test]
    fn operators_never_mutate_operands() {
        let a = ScalarField::new(vec![FieldTerm::new(-1.0, 2.0, Vector3::zeros())]);
        let b = ScalarField::new(vec![FieldTerm::new(-1.0, 2.0, Vector3::zeros())]);
        let a_terms = a.terms.clone();
        let b_terms = b.terms.clone();
        let _ = a.clone() + b.clone();
        let _ = a.clone() - b.clone();
        let _ = a.clone() * 3.0;
        assert_eq!(a.terms, a_terms);
        assert_eq!(b.terms, b_terms);
    }

    #[test]
    fn gradient_matches_analytic_inverse_distance() {
        // phi = -1/r has gradient r_hat / r^2 (pointing away from origin).
        let field = ScalarField::new(vec![FieldTerm::new(-1.0, -1.0, Vector3::zeros())]);
        let p = Vector3::new(3.0, 4.0, 0.0);
        let r: f64 = p.norm();
        let expected = p / r.powi(3);
        let gradient = field.gradient(p, 1e-4);
        assert!((gradient - expected).norm() < 1e-6);
    }
}
