//! LP value types and the engine capability.
//! - Col, Row: engine-side handles
//! - LinExpr: ordered (column, coefficient) terms, built by operator syntax
//! - Constraint: an inequality as a wholesale-replaceable value
//! - LpEngine: what the solver backend must provide
use std::collections::BTreeMap;

/// Column handle issued by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Col(pub usize);

/// Row handle issued by an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Row(pub usize);

/// A linear expression over engine columns.
/// Terms are kept in the order they were accumulated; the same column may
/// appear more than once and is summed by [merged_terms](LinExpr::merged_terms).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinExpr {
    terms: Vec<(Col, f64)>,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn push(&mut self, col: Col, coef: f64) {
        self.terms.push((col, coef));
    }
    pub fn terms(&self) -> &[(Col, f64)] {
        &self.terms
    }
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
    /// Collapse duplicated columns, summing their coefficients.
    pub fn merged_terms(&self) -> BTreeMap<Col, f64> {
        let mut merged = BTreeMap::new();
        for &(col, coef) in self.terms.iter() {
            *merged.entry(col).or_insert(0f64) += coef;
        }
        merged
    }
    pub fn le(self, rhs: f64) -> Constraint {
        Constraint {
            expr: self,
            rel: Rel::Le,
            rhs,
        }
    }
    pub fn ge(self, rhs: f64) -> Constraint {
        Constraint {
            expr: self,
            rel: Rel::Ge,
            rhs,
        }
    }
}

impl From<Col> for LinExpr {
    fn from(col: Col) -> Self {
        LinExpr {
            terms: vec![(col, 1f64)],
        }
    }
}

impl std::ops::Sub for Col {
    type Output = LinExpr;
    fn sub(self, rhs: Col) -> LinExpr {
        LinExpr {
            terms: vec![(self, 1f64), (rhs, -1f64)],
        }
    }
}

impl std::ops::Mul<Col> for f64 {
    type Output = LinExpr;
    fn mul(self, rhs: Col) -> LinExpr {
        LinExpr {
            terms: vec![(rhs, self)],
        }
    }
}

impl std::ops::Mul<LinExpr> for f64 {
    type Output = LinExpr;
    fn mul(self, mut rhs: LinExpr) -> LinExpr {
        for term in rhs.terms.iter_mut() {
            term.1 *= self;
        }
        rhs
    }
}

impl std::ops::Neg for LinExpr {
    type Output = LinExpr;
    fn neg(self) -> LinExpr {
        -1f64 * self
    }
}

impl std::ops::Add for LinExpr {
    type Output = LinExpr;
    fn add(mut self, rhs: LinExpr) -> LinExpr {
        self.terms.extend(rhs.terms);
        self
    }
}

impl std::ops::Sub for LinExpr {
    type Output = LinExpr;
    fn sub(self, rhs: LinExpr) -> LinExpr {
        self + (-rhs)
    }
}

impl std::ops::Add<Col> for LinExpr {
    type Output = LinExpr;
    fn add(mut self, rhs: Col) -> LinExpr {
        self.terms.push((rhs, 1f64));
        self
    }
}

impl std::ops::Sub<Col> for LinExpr {
    type Output = LinExpr;
    fn sub(mut self, rhs: Col) -> LinExpr {
        self.terms.push((rhs, -1f64));
        self
    }
}

impl std::ops::AddAssign for LinExpr {
    fn add_assign(&mut self, rhs: LinExpr) {
        self.terms.extend(rhs.terms);
    }
}

/// Relational operator of a constraint row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rel {
    Le,
    Ge,
}

/// An inequality row as an owned value. Rewriting a row replaces this value
/// wholesale, never by incremental arithmetic on engine-internal state.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub expr: LinExpr,
    pub rel: Rel,
    pub rhs: f64,
}

/// Terminal status of a failed solve. There is no retry; the whole session
/// must be discarded once a solve fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    Infeasible,
    Unbounded,
    Aborted,
}

impl std::fmt::Display for SolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            SolveError::Infeasible => write!(f, "the linear program is infeasible"),
            SolveError::Unbounded => write!(f, "the linear program is unbounded"),
            SolveError::Aborted => write!(f, "the solve was aborted"),
        }
    }
}

impl std::error::Error for SolveError {}

/// The backend capability. Minimization is assumed throughout.
/// `primal`, `dual`, and `objective_value` are meaningful only after a
/// successful `solve`; `set_row` must not invalidate other rows or columns.
pub trait LpEngine {
    fn add_col(&mut self) -> Col;
    fn set_col_bounds(&mut self, col: Col, lower: f64, upper: f64);
    fn add_row(&mut self, constraint: Constraint) -> Row;
    /// Rewrite an existing row in place.
    fn set_row(&mut self, row: Row, constraint: Constraint);
    fn set_objective(&mut self, objective: LinExpr);
    fn solve(&mut self) -> Result<(), SolveError>;
    fn objective_value(&self) -> f64;
    fn primal(&self, col: Col) -> f64;
    fn dual(&self, row: Row) -> f64;
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn col_arithmetic() {
        let (a, b) = (Col(0), Col(1));
        let expr = b - a;
        assert_eq!(expr.terms(), &[(b, 1f64), (a, -1f64)]);
        let expr = 1.5 * b - 1.5 * a - Col(2);
        assert_eq!(expr.terms(), &[(b, 1.5), (a, -1.5), (Col(2), -1f64)]);
    }
    #[test]
    fn accumulate_and_scale() {
        let mut obj = LinExpr::new();
        obj += 2.0 * (Col(1) - Col(0));
        obj += 3.0 * (Col(3) - Col(2));
        let merged = obj.merged_terms();
        assert_eq!(merged[&Col(0)], -2.0);
        assert_eq!(merged[&Col(1)], 2.0);
        assert_eq!(merged[&Col(2)], -3.0);
        assert_eq!(merged[&Col(3)], 3.0);
    }
    #[test]
    fn merged_terms_sums_duplicates() {
        let mut expr = LinExpr::new();
        expr.push(Col(7), 1.0);
        expr.push(Col(7), 2.5);
        expr.push(Col(1), -1.0);
        let merged = expr.merged_terms();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[&Col(7)], 3.5);
        assert_eq!(merged[&Col(1)], -1.0);
    }
    #[test]
    fn inequality_value() {
        let row = (Col(1) - Col(0)).le(-0.1);
        assert_eq!(row.rel, Rel::Le);
        assert_eq!(row.rhs, -0.1);
        let row = LinExpr::from(Col(4)).ge(0.0);
        assert_eq!(row.rel, Rel::Ge);
        assert_eq!(row.expr.terms(), &[(Col(4), 1f64)]);
    }
}
