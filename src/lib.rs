//! # Variscope
//!
//! A variation-analysis engine for manufacturing quality data: process
//! capability statistics, one-way ANOVA, regression model selection, and a
//! recursive drill-down that attributes outcome variation to the factors
//! that explain it.
//!
//! ## Overview
//!
//! Variscope is the computation core behind an interactive variation
//! investigation tool. It has no I/O surface of its own: callers feed it an
//! ordered table of rows and read back plain result values, which the
//! presentation layers render as charts, tables, and a navigable "mindmap"
//! of drill nodes.
//!
//! This library provides:
//! - Descriptive statistics, natural control limits, and the Cp/Cpk
//!   capability family against optional spec limits
//! - One-way ANOVA with eta-squared effect size and plain-language insights
//! - Linear/quadratic OLS with model selection and strength classification
//! - A greedy drill-down engine that repeatedly partitions the dataset by
//!   the factor explaining the most outcome variation, with branch
//!   navigation, filter replay, interaction detection, and an annotatable
//!   investigation narrative
//!
//! ## Quick Start
//!
//! ```rust
//! use variscope::capability::{process_stats, SpecLimits};
//!
//! let limits = SpecLimits::new(Some(13.0), Some(7.0)).unwrap();
//! let stats = process_stats(&[9.0, 10.0, 11.0], &limits);
//!
//! assert!((stats.mean - 10.0).abs() < 1e-12);
//! assert!((stats.cp.unwrap() - 1.0).abs() < 1e-10);   // centered process
//! assert!((stats.cpk.unwrap() - 1.0).abs() < 1e-10);
//! ```
//!
//! Partitioning an outcome by a factor:
//!
//! ```rust
//! use variscope::anova::{one_way_anova, AnovaConfig};
//! use variscope::table::{DataRow, Table, Value};
//!
//! let rows = vec![
//!     ("A", 20.0), ("A", 21.0), ("A", 22.0),
//!     ("B", 40.0), ("B", 41.0), ("B", 42.0),
//! ]
//! .into_iter()
//! .map(|(machine, cycle_time)| {
//!     let mut row = DataRow::new();
//!     row.insert("machine".into(), Value::Text(machine.into()));
//!     row.insert("cycle_time".into(), Value::Number(cycle_time));
//!     row
//! })
//! .collect();
//! let table = Table::new(rows);
//!
//! let result = one_way_anova(&table, "cycle_time", "machine", &AnovaConfig::default())
//!     .unwrap()
//!     .unwrap();
//! assert!(result.is_significant);
//! assert!(result.insight.contains("best"));
//! ```
//!
//! ## Design Philosophy
//!
//! - **Results are data**: "not computable" conditions (too few groups,
//!   zero variance) come back as `None`/`Option` fields so the UI can
//!   render an explicit "not enough data" state; only caller bugs raise
//!   errors
//! - **Deterministic**: identical inputs and action sequences produce
//!   bit-identical trees and filtered sets, so persisted sessions replay
//!   exactly
//! - **Synchronous and self-contained**: pure in-memory computation, no
//!   hidden global state, no background work
//!
//! ## Features
//!
//! - `serde`: Enable serialization/deserialization of result and session
//!   data types

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod anova;
pub mod capability;
pub mod dist;
pub mod drill;
pub mod error;
pub mod insight;
pub mod regression;
pub mod table;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::anova::{one_way_anova, AnovaConfig, AnovaResult, GroupStat, ALPHA};
    pub use crate::capability::{
        process_stats, spec_status, ProcessStats, SpecLimits, SpecStatus,
    };
    pub use crate::drill::{
        DrillConfig, DrillNode, DrillSession, DrillTree, FactorKind, FactorScore,
        InteractionEdge, Narrative, NarrativeStep, NodeId,
    };
    pub use crate::error::{Error, Result};
    pub use crate::insight::{format_p_value, ComparisonDirection, Goal};
    pub use crate::regression::{
        fit_regression, FitStats, RecommendedFit, RegressionResult, Strength,
        QUADRATIC_R2_MARGIN,
    };
    pub use crate::table::{DataRow, FilterAction, Table, Value};
}

// Re-export commonly used items at crate root
pub use anova::{one_way_anova, AnovaResult};
pub use capability::{process_stats, spec_status, ProcessStats, SpecLimits, SpecStatus};
pub use drill::{DrillConfig, DrillSession, NodeId};
pub use error::{Error, Result};
pub use regression::{fit_regression, RegressionResult};
pub use table::{DataRow, FilterAction, Table, Value};
