//! # autostat
//!
//! Automatic statistical test selection and computation for tabular
//! survey data.
//!
//! autostat lets a caller point a test identifier at an in-memory
//! dataset and get back a complete, interpreted result: the engine picks
//! suitable variables, validates feasibility, computes the statistics,
//! and assembles a table, chart description, and plain-language insight.
//! Every run is a pure, synchronous function of its inputs; expected
//! infeasibility (wrong variable types, too few complete cases) comes
//! back as a structured not-applicable result rather than an error.
//!
//! ## Modules
//!
//! - [`dataset`] — Tabular data model (Dataset, Variable, Value) and the
//!   dataset-wide missing-value rule
//! - [`loader`] — CSV parsing with measurement-level inference
//! - [`classify`] — Variable classification and per-test suggestion
//! - [`engine`] — Test identifiers and dispatch (`run_test`)
//! - [`descriptive`] — Frequencies, descriptives, missing summary
//! - [`association`] — Crosstab with chi-square and Fisher's exact,
//!   Pearson / Spearman correlation
//! - [`group`] — Independent t-test, one-way ANOVA with post-hoc,
//!   Mann-Whitney U / Kruskal-Wallis
//! - [`regression`] — OLS linear regression, logistic regression (IRLS)
//! - [`paired`] — Paired t-test
//! - [`pca`] — Principal component analysis by power iteration
//! - [`numeric`] — Numerical primitives and probability approximations
//! - [`output`] — Result tables, charts, insights, effect sizes
//! - [`error`] — Error types
//!
//! ## Quick Start
//!
//! ```
//! use autostat::loader::CsvLoader;
//! use autostat::engine::{run_test, TestId};
//!
//! let csv = "x,y\n1,2\n2,4\n3,6\n4,8\n5,10\n";
//! let ds = CsvLoader::new().load_str(csv).unwrap();
//!
//! let result = run_test(TestId::PearsonCorrelation, &ds, &[]).unwrap();
//! assert!(result.insight.contains("r = 1.000"));
//! assert!(result.insight.contains("p < 0.001"));
//! ```

pub mod association;
pub mod classify;
pub mod dataset;
pub mod descriptive;
pub mod engine;
pub mod error;
pub mod group;
pub mod loader;
pub mod numeric;
pub mod output;
pub mod paired;
pub mod pca;
pub mod regression;

pub use classify::{suggest_all, suggest_variables, SuggestedVariable, SuggestedVars};
pub use dataset::{Dataset, MeasurementLevel, Value, Variable, VariableRole};
pub use engine::{run_test, run_test_by_name, TestId};
pub use error::EngineError;
pub use output::{TestResult, TestTable};
