//! Tabular dataset model: variables, rows, and the missing-value rule.
//!
//! A [`Dataset`] is a row-major table of scalar [`Value`]s described by
//! [`Variable`] metadata (measurement level, role, value labels, declared
//! missing codes). The engine never mutates a dataset; every analysis is a
//! pure function over it.
//!
//! The single most important invariant lives here: a value counts as
//! missing for a variable iff it is null/empty **or** string-equal to one
//! of that variable's declared missing codes. Every test handler and the
//! variable classifier apply this rule through the same methods, so a row
//! excluded by one analysis is excluded by all of them.
//!
//! # Example
//!
//! ```
//! use autostat::dataset::{Dataset, Variable, MeasurementLevel, Value};
//!
//! let vars = vec![
//!     Variable::new("age", MeasurementLevel::Scale),
//!     Variable::new("gender", MeasurementLevel::Nominal),
//! ];
//! let rows = vec![
//!     Dataset::row(&[("age", Value::Number(25.0)), ("gender", Value::text("M"))]),
//!     Dataset::row(&[("age", Value::Null), ("gender", Value::text("F"))]),
//! ];
//! let ds = Dataset::new(vars, rows).unwrap();
//!
//! let age = ds.variable("age").unwrap();
//! assert_eq!(ds.numeric_observations(age), vec![25.0]);
//! assert_eq!(ds.missing_count(age), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

// ── Value ─────────────────────────────────────────────────────────────

/// A single cell value: a number, a string, or null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Numeric value.
    Number(f64),
    /// String value.
    Text(String),
    /// Explicit null.
    Null,
}

impl Value {
    /// Convenience constructor for text values.
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }

    /// Interprets the value as a number if possible.
    ///
    /// Numeric strings parse (`"42"`, `" 3.5 "`); non-finite numbers and
    /// everything else yield `None`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            Self::Number(_) | Self::Null => None,
            Self::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Canonical display string used for category labels and for comparing
    /// against declared missing codes.
    ///
    /// Integral numbers render without a decimal point (`2` not `2.0`), so
    /// a missing code declared as `"99"` matches both `Value::Number(99.0)`
    /// and `Value::Text("99")`.
    pub fn display(&self) -> String {
        match self {
            Self::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{n}")
                }
            }
            Self::Text(s) => s.clone(),
            Self::Null => String::new(),
        }
    }

    /// Returns `true` for null or whitespace-only text.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.trim().is_empty(),
            Self::Number(n) => n.is_nan(),
        }
    }
}

// ── Variable metadata ─────────────────────────────────────────────────

/// Measurement level of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementLevel {
    /// Unordered categories.
    Nominal,
    /// Ordered categories.
    Ordinal,
    /// Continuous numeric.
    Scale,
}

impl MeasurementLevel {
    /// Returns `true` for nominal or ordinal levels.
    pub fn is_categorical(self) -> bool {
        matches!(self, Self::Nominal | Self::Ordinal)
    }
}

impl std::fmt::Display for MeasurementLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Nominal => write!(f, "nominal"),
            Self::Ordinal => write!(f, "ordinal"),
            Self::Scale => write!(f, "scale"),
        }
    }
}

/// Analysis role assigned to a variable by the dataset author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableRole {
    /// No declared role.
    #[default]
    None,
    /// Predictor/input variable.
    Input,
    /// Preferred outcome variable.
    Target,
    /// Identifier column, excluded from analysis suggestions.
    Id,
}

/// Metadata describing one column of the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    /// Unique key used in rows and selections.
    pub name: String,
    /// Display name.
    pub label: String,
    /// Measurement level (nominal / ordinal / scale).
    pub level: MeasurementLevel,
    /// Storage kind, informational only (e.g. "numeric", "string").
    pub variable_type: String,
    /// Declared analysis role.
    pub role: VariableRole,
    /// Mapping from raw code to display label (e.g. "1" → "Male").
    pub value_labels: BTreeMap<String, String>,
    /// Values (beyond empty/null) treated as missing, compared as strings.
    pub missing_codes: BTreeSet<String>,
    /// Whether automatic suggestion may pick this variable. Default: true.
    pub include_in_analysis: bool,
}

impl Variable {
    /// Creates a variable with the given name and level; the label defaults
    /// to the name.
    pub fn new(name: impl Into<String>, level: MeasurementLevel) -> Self {
        let name = name.into();
        let variable_type = match level {
            MeasurementLevel::Scale => "numeric".to_string(),
            _ => "string".to_string(),
        };
        Self {
            label: name.clone(),
            name,
            level,
            variable_type,
            role: VariableRole::None,
            value_labels: BTreeMap::new(),
            missing_codes: BTreeSet::new(),
            include_in_analysis: true,
        }
    }

    /// Sets the display label.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the declared role.
    pub fn role(mut self, role: VariableRole) -> Self {
        self.role = role;
        self
    }

    /// Declares missing codes (raw string forms).
    pub fn missing_codes<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.missing_codes = codes.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a raw-code → display-label mapping.
    pub fn value_label(mut self, code: impl Into<String>, label: impl Into<String>) -> Self {
        self.value_labels.insert(code.into(), label.into());
        self
    }

    /// Excludes the variable from automatic suggestion.
    pub fn exclude_from_analysis(mut self) -> Self {
        self.include_in_analysis = false;
        self
    }

    /// Display label for a raw category value, falling back to the raw form.
    pub fn display_label(&self, raw: &str) -> String {
        self.value_labels
            .get(raw)
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }
}

// ── Rows and question groups ──────────────────────────────────────────

/// One observation: a mapping from variable name to scalar value.
pub type Row = BTreeMap<String, Value>;

/// A named set of variables sharing a survey-style origin (checkbox,
/// matrix, or ranking question).
///
/// Used only as a *preference* when suggesting variable pairs — membership
/// never changes eligibility, only candidate ordering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionGroup {
    /// Group name.
    pub name: String,
    /// Member variable names.
    pub members: Vec<String>,
}

// ── Dataset ───────────────────────────────────────────────────────────

/// An immutable in-memory table plus its variable metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    variables: Vec<Variable>,
    rows: Vec<Row>,
    #[serde(default)]
    question_groups: Vec<QuestionGroup>,
}

impl Dataset {
    /// Creates a dataset, validating that variable names are unique.
    pub fn new(variables: Vec<Variable>, rows: Vec<Row>) -> Result<Self, EngineError> {
        let mut seen = BTreeSet::new();
        for v in &variables {
            if !seen.insert(v.name.as_str()) {
                return Err(EngineError::DuplicateVariable {
                    name: v.name.clone(),
                });
            }
        }
        Ok(Self {
            variables,
            rows,
            question_groups: Vec::new(),
        })
    }

    /// Attaches question groups (suggestion-ordering hints).
    pub fn with_question_groups(mut self, groups: Vec<QuestionGroup>) -> Self {
        self.question_groups = groups;
        self
    }

    /// Builds a row from `(name, value)` pairs.
    pub fn row(pairs: &[(&str, Value)]) -> Row {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    /// All variables in declaration order.
    pub fn variables(&self) -> &[Variable] {
        &self.variables
    }

    /// All rows.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Question groups attached to this dataset.
    pub fn question_groups(&self) -> &[QuestionGroup] {
        &self.question_groups
    }

    /// Number of rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Looks up a variable by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Looks up a variable by name, or returns a contract error.
    pub fn require_variable(&self, name: &str) -> Result<&Variable, EngineError> {
        self.variable(name).ok_or_else(|| EngineError::UnknownVariable {
            name: name.to_string(),
        })
    }

    /// The value of `var` in row `idx` (`Null` when the row lacks the key).
    pub fn value_at(&self, idx: usize, var: &Variable) -> &Value {
        static NULL: Value = Value::Null;
        self.rows
            .get(idx)
            .and_then(|r| r.get(&var.name))
            .unwrap_or(&NULL)
    }

    // ── The missing rule ─────────────────────────────────────────

    /// The dataset-wide missing rule: null/empty, or string-equal to one of
    /// the variable's declared missing codes.
    pub fn is_missing(&self, var: &Variable, value: &Value) -> bool {
        if value.is_empty() {
            return true;
        }
        !var.missing_codes.is_empty() && var.missing_codes.contains(&value.display())
    }

    /// Number of rows missing for `var` under the missing rule.
    pub fn missing_count(&self, var: &Variable) -> usize {
        (0..self.rows.len())
            .filter(|&i| self.is_missing(var, self.value_at(i, var)))
            .count()
    }

    /// Missing percentage (0–100) for `var`; 0 for an empty dataset.
    pub fn missing_percent(&self, var: &Variable) -> f64 {
        if self.rows.is_empty() {
            return 0.0;
        }
        100.0 * self.missing_count(var) as f64 / self.rows.len() as f64
    }

    // ── Observation extraction ───────────────────────────────────

    /// Non-missing numeric observations for `var`, in row order.
    ///
    /// Values that are non-missing but not interpretable as numbers are
    /// skipped.
    pub fn numeric_observations(&self, var: &Variable) -> Vec<f64> {
        (0..self.rows.len())
            .filter_map(|i| {
                let v = self.value_at(i, var);
                if self.is_missing(var, v) {
                    None
                } else {
                    v.as_number()
                }
            })
            .collect()
    }

    /// Non-missing category observations (raw display strings) for `var`,
    /// in row order.
    pub fn category_observations(&self, var: &Variable) -> Vec<String> {
        (0..self.rows.len())
            .filter_map(|i| {
                let v = self.value_at(i, var);
                if self.is_missing(var, v) {
                    None
                } else {
                    Some(v.display())
                }
            })
            .collect()
    }

    /// Distinct non-missing categories of `var`, in order of first
    /// appearance.
    pub fn distinct_categories(&self, var: &Variable) -> Vec<String> {
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for cat in self.category_observations(var) {
            if seen.insert(cat.clone()) {
                out.push(cat);
            }
        }
        out
    }

    /// Pairwise-complete numeric observations for two variables.
    pub fn paired_numeric(&self, a: &Variable, b: &Variable) -> Vec<(f64, f64)> {
        (0..self.rows.len())
            .filter_map(|i| {
                let va = self.value_at(i, a);
                let vb = self.value_at(i, b);
                if self.is_missing(a, va) || self.is_missing(b, vb) {
                    return None;
                }
                Some((va.as_number()?, vb.as_number()?))
            })
            .collect()
    }

    /// Pairwise-complete category observations for two variables.
    pub fn paired_categories(&self, a: &Variable, b: &Variable) -> Vec<(String, String)> {
        (0..self.rows.len())
            .filter_map(|i| {
                let va = self.value_at(i, a);
                let vb = self.value_at(i, b);
                if self.is_missing(a, va) || self.is_missing(b, vb) {
                    return None;
                }
                Some((va.display(), vb.display()))
            })
            .collect()
    }

    /// Numeric outcome observations split by the categories of a grouping
    /// variable (pairwise-complete), group order by first appearance.
    pub fn grouped_numeric(&self, group: &Variable, outcome: &Variable) -> Vec<(String, Vec<f64>)> {
        let mut order: Vec<String> = Vec::new();
        let mut buckets: BTreeMap<String, Vec<f64>> = BTreeMap::new();
        for i in 0..self.rows.len() {
            let g = self.value_at(i, group);
            let y = self.value_at(i, outcome);
            if self.is_missing(group, g) || self.is_missing(outcome, y) {
                continue;
            }
            let Some(y) = y.as_number() else { continue };
            let key = g.display();
            if !buckets.contains_key(&key) {
                order.push(key.clone());
            }
            buckets.entry(key).or_default().push(y);
        }
        order
            .into_iter()
            .map(|k| {
                let vals = buckets.remove(&k).unwrap_or_default();
                (k, vals)
            })
            .collect()
    }

    /// Listwise-complete numeric rows across all given variables.
    ///
    /// Each returned inner vector holds one value per variable, in the
    /// order given; rows missing (or non-numeric) for any variable are
    /// dropped entirely.
    pub fn listwise_numeric(&self, vars: &[&Variable]) -> Vec<Vec<f64>> {
        (0..self.rows.len())
            .filter_map(|i| {
                let mut out = Vec::with_capacity(vars.len());
                for var in vars {
                    let v = self.value_at(i, var);
                    if self.is_missing(var, v) {
                        return None;
                    }
                    out.push(v.as_number()?);
                }
                Some(out)
            })
            .collect()
    }

    /// Listwise-complete rows where the first variable is categorical and
    /// the rest are numeric (used by regression with a categorical
    /// outcome).
    pub fn listwise_category_numeric(
        &self,
        cat: &Variable,
        vars: &[&Variable],
    ) -> Vec<(String, Vec<f64>)> {
        (0..self.rows.len())
            .filter_map(|i| {
                let c = self.value_at(i, cat);
                if self.is_missing(cat, c) {
                    return None;
                }
                let mut out = Vec::with_capacity(vars.len());
                for var in vars {
                    let v = self.value_at(i, var);
                    if self.is_missing(var, v) {
                        return None;
                    }
                    out.push(v.as_number()?);
                }
                Some((c.display(), out))
            })
            .collect()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────
