//! Sparse linear program builder and solver adapter
//!
//! Models are assembled as plain data (variables with bounds and objective
//! coefficients, rows as sparse term lists) so they can be inspected and
//! logged, then lowered onto `minilp` for the simplex solve.

use minilp::{ComparisonOp, LinearExpr, OptimizationDirection, Problem};
use std::fmt;

/// Handle to a variable inside a [`LinearModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VarId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Maximize,
    Minimize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOp {
    Le,
    Ge,
    Eq,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub objective: f64,
    pub lower: f64,
    pub upper: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub name: String,
    pub terms: Vec<(VarId, f64)>,
    pub op: RowOp,
    pub rhs: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub name: String,
    pub sense: Sense,
    pub variables: Vec<Variable>,
    pub rows: Vec<Row>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSolution {
    values: Vec<f64>,
    objective: f64,
}

impl ModelSolution {
    pub fn value(&self, var: VarId) -> f64 {
        self.values[var.0]
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SolveFailure {
    Infeasible,
    Unbounded,
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveFailure::Infeasible => f.write_str("problem is infeasible"),
            SolveFailure::Unbounded => f.write_str("problem is unbounded"),
        }
    }
}

/// Incrementally assembles a [`LinearModel`]
#[derive(Debug, Clone)]
pub struct ModelBuilder {
    model: LinearModel,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>, sense: Sense) -> Self {
        Self {
            model: LinearModel {
                name: name.into(),
                sense,
                variables: Vec::new(),
                rows: Vec::new(),
            },
        }
    }

    pub fn add_variable(&mut self, name: impl Into<String>, objective: f64, (lower, upper): (f64, f64)) -> VarId {
        self.model.variables.push(Variable {
            name: name.into(),
            objective,
            lower,
            upper,
        });
        VarId(self.model.variables.len() - 1)
    }

    /// Rows without terms are dropped.
    pub fn add_row(&mut self, name: impl Into<String>, terms: Vec<(VarId, f64)>, op: RowOp, rhs: f64) {
        if terms.is_empty() {
            return;
        }
        self.model.rows.push(Row {
            name: name.into(),
            terms,
            op,
            rhs,
        });
    }

    pub fn build(self) -> LinearModel {
        self.model
    }
}

impl LinearModel {
    pub fn variable(&self, var: VarId) -> &Variable {
        &self.variables[var.0]
    }

    pub fn row(&self, name: &str) -> Option<&Row> {
        self.rows.iter().find(|r| r.name == name)
    }

    pub fn solve(&self) -> Result<ModelSolution, SolveFailure> {
        let direction = match self.sense {
            Sense::Maximize => OptimizationDirection::Maximize,
            Sense::Minimize => OptimizationDirection::Minimize,
        };
        let mut problem = Problem::new(direction);

        let vars: Vec<minilp::Variable> = self
            .variables
            .iter()
            .map(|v| problem.add_var(v.objective, (v.lower, v.upper)))
            .collect();

        for row in &self.rows {
            let mut expr = LinearExpr::empty();
            for (var, coeff) in &row.terms {
                expr.add(vars[var.0], *coeff);
            }
            let op = match row.op {
                RowOp::Le => ComparisonOp::Le,
                RowOp::Ge => ComparisonOp::Ge,
                RowOp::Eq => ComparisonOp::Eq,
            };
            problem.add_constraint(expr, op, row.rhs);
        }

        let solution = problem.solve().map_err(|e| match e {
            minilp::Error::Infeasible => SolveFailure::Infeasible,
            minilp::Error::Unbounded => SolveFailure::Unbounded,
        })?;

        Ok(ModelSolution {
            values: vars.iter().map(|v| solution[*v]).collect(),
            objective: solution.objective(),
        })
    }
}

impl fmt::Display for LinearModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sense = match self.sense {
            Sense::Maximize => "max",
            Sense::Minimize => "min",
        };
        write!(f, "{} [{}]:", self.name, sense)?;
        for v in &self.variables {
            write!(f, " {}*{} in [{}, {}];", v.objective, v.name, v.lower, v.upper)?;
        }
        for row in &self.rows {
            let op = match row.op {
                RowOp::Le => "<=",
                RowOp::Ge => ">=",
                RowOp::Eq => "=",
            };
            let terms: Vec<String> = row
                .terms
                .iter()
                .map(|(var, c)| format!("{}*{}", c, self.variables[var.0].name))
                .collect();
            write!(f, " {}: {} {} {};", row.name, terms.join(" + "), op, row.rhs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solves_small_maximization() {
        // max 3x + 2y  s.t. x + y <= 4, x <= 3
        let mut builder = ModelBuilder::new("toy", Sense::Maximize);
        let x = builder.add_variable("x", 3.0, (0.0, 3.0));
        let y = builder.add_variable("y", 2.0, (0.0, f64::INFINITY));
        builder.add_row("cap", vec![(x, 1.0), (y, 1.0)], RowOp::Le, 4.0);
        let model = builder.build();

        let solution = model.solve().unwrap();
        assert!((solution.value(x) - 3.0).abs() < 1e-9);
        assert!((solution.value(y) - 1.0).abs() < 1e-9);
        assert!((solution.objective() - 11.0).abs() < 1e-9);
    }

    #[test]
    fn test_reports_infeasible() {
        let mut builder = ModelBuilder::new("bad", Sense::Maximize);
        let x = builder.add_variable("x", 1.0, (0.0, 10.0));
        builder.add_row("floor", vec![(x, 1.0)], RowOp::Ge, 20.0);
        assert_eq!(builder.build().solve().unwrap_err(), SolveFailure::Infeasible);
    }

    #[test]
    fn test_empty_rows_are_dropped() {
        let mut builder = ModelBuilder::new("m", Sense::Maximize);
        builder.add_variable("x", 1.0, (0.0, 1.0));
        builder.add_row("nothing", Vec::new(), RowOp::Le, 1.0);
        let model = builder.build();
        assert!(model.rows.is_empty());
        assert!(model.to_string().contains("1*x in [0, 1]"));
    }
}
