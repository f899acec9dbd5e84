//! Declarative calculations evaluated at render time.

use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::domain::catalog::{ConditionSpec, ConfigurationError, FormulaSpec};
use crate::domain::foundation::{FactValue, Facts};

/// Accumulator every formula returns.
pub const OUTCOME: &str = "OUTCOME";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Add,
    Sub,
    Multi,
    Div,
    Equals,
    IsGreater,
    /// Keeps the first operand.
    PassThrough,
}

impl Operation {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "add" => Self::Add,
            "sub" => Self::Sub,
            "multi" => Self::Multi,
            "div" => Self::Div,
            "equals" => Self::Equals,
            "isgreater" => Self::IsGreater,
            _ => Self::PassThrough,
        }
    }

    fn apply(self, a: f64, b: f64) -> f64 {
        match self {
            Self::Add => a + b,
            Self::Sub => a - b,
            Self::Multi => a * b,
            Self::Div if b == 0.0 => {
                warn!(dividend = a, "Division by zero in formula, using 0");
                0.0
            }
            Self::Div => a / b,
            Self::Equals => bool_value(a == b),
            Self::IsGreater => bool_value(a > b),
            Self::PassThrough => a,
        }
    }

    /// Left fold of the operation across all operands.
    fn fold(self, operands: impl IntoIterator<Item = f64>) -> f64 {
        let mut operands = operands.into_iter();
        let Some(first) = operands.next() else {
            return 0.0;
        };
        operands.fold(first, |acc, next| self.apply(acc, next))
    }
}

fn bool_value(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(f64),
    Var(String),
}

impl From<&FactValue> for Operand {
    fn from(value: &FactValue) -> Self {
        match value {
            FactValue::Number(n) => Operand::Literal(*n),
            FactValue::Text(s) => s
                .trim()
                .parse::<f64>()
                .map(Operand::Literal)
                .unwrap_or_else(|_| Operand::Var(s.clone())),
            other => Operand::Var(other.as_key()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub order: f64,
    pub op: Operation,
    pub operands: Vec<Operand>,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub var: String,
    pub equals: FactValue,
    pub set: String,
    pub then: f64,
    pub otherwise: f64,
}

impl From<&ConditionSpec> for Condition {
    fn from(spec: &ConditionSpec) -> Self {
        Self {
            var: spec.var.clone(),
            equals: spec.equals.clone(),
            set: spec.set.clone(),
            then: spec.then,
            otherwise: spec.otherwise,
        }
    }
}

/// A named calculation: inputs, conditional flags and ordered steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Formula {
    name: String,
    req_vars: Vec<String>,
    optional_vars: Vec<String>,
    conditions: Vec<Condition>,
    steps: Vec<Step>,
    writeto: String,
    persist_value: bool,
}

impl Formula {
    /// Parses step keys (`"<order>,<op>"`) and sorts steps by numeric order.
    pub fn from_spec(name: &str, spec: &FormulaSpec) -> Result<Self, ConfigurationError> {
        let mut steps = spec
            .steps
            .iter()
            .map(|(key, (operands, target))| {
                let malformed = || ConfigurationError::MalformedStepKey {
                    formula: name.to_string(),
                    key: key.clone(),
                };
                let (order, op) = key.split_once(',').ok_or_else(malformed)?;
                let order = order.trim().parse::<f64>().map_err(|_| malformed())?;
                Ok(Step {
                    order,
                    op: Operation::parse(op),
                    operands: operands.iter().map(Operand::from).collect(),
                    target: target.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;
        steps.sort_by(|a, b| a.order.total_cmp(&b.order));

        Ok(Self {
            name: name.to_string(),
            req_vars: spec.req_vars.clone(),
            optional_vars: spec.optional_vars.clone(),
            conditions: spec.conditions.iter().map(Condition::from).collect(),
            steps,
            writeto: spec.writeto.clone(),
            persist_value: spec.persist_value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn writeto(&self) -> &str {
        &self.writeto
    }

    pub fn persist_value(&self) -> bool {
        self.persist_value
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Runs the formula against `facts`.
    ///
    /// Returns `None` when a required input is missing. The result is the
    /// final `OUTCOME` rounded to two decimals.
    pub fn evaluate(&self, facts: &Facts) -> Option<f64> {
        let mut vars: BTreeMap<String, f64> = BTreeMap::new();

        for name in &self.req_vars {
            let Some(value) = facts.lookup(name) else {
                warn!(formula = %self.name, var = %name, "Required formula input missing, skipping");
                return None;
            };
            vars.insert(name.clone(), self.numeric(name, value));
        }
        for name in &self.optional_vars {
            let value = facts
                .lookup(name)
                .map(|v| self.numeric(name, v))
                .unwrap_or(0.0);
            vars.insert(name.clone(), value);
        }

        for condition in &self.conditions {
            let met = match facts.lookup(&condition.var) {
                Some(value) => value.as_key() == condition.equals.as_key(),
                None => {
                    warn!(formula = %self.name, var = %condition.var, "Condition input missing");
                    false
                }
            };
            let value = if met { condition.then } else { condition.otherwise };
            vars.insert(condition.set.clone(), value);
        }

        vars.insert(OUTCOME.to_string(), 0.0);
        for step in &self.steps {
            let operands: Vec<f64> = step
                .operands
                .iter()
                .map(|operand| match operand {
                    Operand::Literal(n) => *n,
                    Operand::Var(name) => vars
                        .get(name)
                        .copied()
                        .or_else(|| facts.lookup(name).and_then(FactValue::as_number))
                        .unwrap_or(0.0),
                })
                .collect();
            let result = step.op.fold(operands);
            vars.insert(step.target.clone(), result);
        }

        let outcome = round2(vars.get(OUTCOME).copied().unwrap_or(0.0));
        debug!(formula = %self.name, outcome, "Formula evaluated");
        Some(outcome)
    }

    fn numeric(&self, name: &str, value: &FactValue) -> f64 {
        value.as_number().unwrap_or_else(|| {
            warn!(formula = %self.name, var = name, value = %value, "Non-numeric formula input, using 0");
            0.0
        })
    }
}

fn round2(n: f64) -> f64 {
    (n * 100.0).round() / 100.0
}
