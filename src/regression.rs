//! Linear and quadratic regression with model selection.
//!
//! Fits ordinary least squares models of an outcome against one numeric
//! predictor, compares the straight-line and quadratic fits, classifies the
//! strength of the chosen model, and produces a plain-language insight.
//!
//! Model selection and strength bucketing use pinned product constants:
//! the quadratic fit is recommended only when it improves R² by more than
//! [`QUADRATIC_R2_MARGIN`], and strength tiers follow fixed R² cut points
//! (see [`Strength::from_r_squared`]).

use ndarray::Array2;

use crate::anova::ALPHA;
use crate::dist::{f_distribution_p_value, t_distribution_p_value};
use crate::error::{Error, Result};
use crate::insight::format_p_value;
use crate::table::Table;

/// Minimum R² improvement required to prefer the quadratic fit.
pub const QUADRATIC_R2_MARGIN: f64 = 0.05;

/// Which fitted model is recommended for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RecommendedFit {
    /// The straight-line fit.
    Linear,
    /// The quadratic fit.
    Quadratic,
}

/// Ordinal strength rating of the recommended fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Strength {
    /// R² below 0.10: no usable relationship.
    None,
    /// R² in [0.10, 0.30).
    Weak,
    /// R² in [0.30, 0.60).
    Moderate,
    /// R² in [0.60, 0.85).
    Strong,
    /// R² of 0.85 or above.
    VeryStrong,
}

impl Strength {
    /// Bucket an R² value into a strength tier.
    ///
    /// Cut points: 0.10 / 0.30 / 0.60 / 0.85.
    #[must_use]
    pub fn from_r_squared(r_squared: f64) -> Self {
        if r_squared < 0.10 {
            Self::None
        } else if r_squared < 0.30 {
            Self::Weak
        } else if r_squared < 0.60 {
            Self::Moderate
        } else if r_squared < 0.85 {
            Self::Strong
        } else {
            Self::VeryStrong
        }
    }

    /// Star count for visual display (0 through 4).
    #[must_use]
    pub fn stars(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Weak => 1,
            Self::Moderate => 2,
            Self::Strong => 3,
            Self::VeryStrong => 4,
        }
    }

    /// Lowercase qualifier used in insight templates.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "no",
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::VeryStrong => "very strong",
        }
    }
}

/// Statistics of one fitted model.
///
/// Both fits share this shape: the straight line reports its slope, the
/// quadratic fit reports `slope: None` and carries its full coefficient
/// vector instead.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FitStats {
    /// Slope of the straight-line fit; `None` for the quadratic fit.
    pub slope: Option<f64>,
    /// Intercept (constant term).
    pub intercept: f64,
    /// Coefficient of determination.
    pub r_squared: f64,
    /// p-value of the model test (slope t-test for the line, overall
    /// F-test for the quadratic).
    pub p_value: f64,
    /// Whether `p_value < 0.05`.
    pub is_significant: bool,
    /// Coefficient vector, lowest order first.
    pub coefficients: Vec<f64>,
}

/// Result of fitting and comparing both models.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RegressionResult {
    /// Predictor column name.
    pub x_column: String,
    /// Outcome column name.
    pub y_column: String,
    /// Number of valid observations used.
    pub n: usize,
    /// The straight-line fit.
    pub linear: FitStats,
    /// The quadratic fit; `None` with fewer than 3 points or a singular
    /// design (fewer than 3 distinct x values).
    pub quadratic: Option<FitStats>,
    /// Which fit to display.
    pub recommended_fit: RecommendedFit,
    /// Strength tier of the recommended fit.
    pub strength: Strength,
    /// Plain-language summary of the relationship.
    pub insight: String,
}

/// Fit linear and quadratic models of `y_column` against `x_column`.
///
/// Rows where either value is not a finite number are dropped.
///
/// # Errors
/// * [`Error::UnknownColumn`] if either column is absent from every row.
/// * [`Error::InsufficientData`] with fewer than 2 valid points — unlike
///   the grouped statistics, a regression request over unusable data is a
///   hard failure rather than a silent zero fit.
pub fn fit_regression(table: &Table, x_column: &str, y_column: &str) -> Result<RegressionResult> {
    if !table.has_column(x_column) {
        return Err(Error::unknown_column(x_column));
    }
    if !table.has_column(y_column) {
        return Err(Error::unknown_column(y_column));
    }

    let indices = table.all_indices();
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for &i in &indices {
        if let (Some(x), Some(y)) = (
            table.value(i, x_column).as_number(),
            table.value(i, y_column).as_number(),
        ) {
            xs.push(x);
            ys.push(y);
        }
    }

    fit_series(&xs, &ys, x_column, y_column)
}

/// Core fit over pre-extracted series. Shared with the drill-down engine.
pub(crate) fn fit_series(
    xs: &[f64],
    ys: &[f64],
    x_column: &str,
    y_column: &str,
) -> Result<RegressionResult> {
    let n = xs.len();
    if n < 2 {
        return Err(Error::InsufficientData { needed: 2, got: n });
    }

    let linear = fit_linear(xs, ys);
    let quadratic = fit_quadratic(xs, ys);

    let recommended_fit = match &quadratic {
        Some(q) if q.r_squared > linear.r_squared + QUADRATIC_R2_MARGIN => {
            RecommendedFit::Quadratic
        }
        _ => RecommendedFit::Linear,
    };

    let chosen_r2 = match recommended_fit {
        RecommendedFit::Linear => linear.r_squared,
        RecommendedFit::Quadratic => quadratic.as_ref().map_or(0.0, |q| q.r_squared),
    };
    let strength = Strength::from_r_squared(chosen_r2);

    let insight = build_insight(
        x_column,
        y_column,
        &linear,
        quadratic.as_ref(),
        recommended_fit,
        strength,
    );

    Ok(RegressionResult {
        x_column: x_column.to_owned(),
        y_column: y_column.to_owned(),
        n,
        linear,
        quadratic,
        recommended_fit,
        strength,
        insight,
    })
}

// Straight-line OLS. A predictor with zero spread yields the flat fit
// (slope 0, R² 0) rather than an error; a constant outcome yields R² 0
// since there is no variation to explain.
fn fit_linear(xs: &[f64], ys: &[f64]) -> FitStats {
    let n = xs.len();
    let nf = n as f64;
    let x_mean = xs.iter().sum::<f64>() / nf;
    let y_mean = ys.iter().sum::<f64>() / nf;

    let ss_x: f64 = xs.iter().map(|&x| (x - x_mean).powi(2)).sum();
    let ss_tot: f64 = ys.iter().map(|&y| (y - y_mean).powi(2)).sum();

    if ss_x < 1e-300 || ss_tot < 1e-300 {
        let intercept = y_mean;
        return FitStats {
            slope: Some(0.0),
            intercept,
            r_squared: 0.0,
            p_value: 1.0,
            is_significant: false,
            coefficients: vec![intercept, 0.0],
        };
    }

    let cov: f64 = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| (x - x_mean) * (y - y_mean))
        .sum();
    let slope = cov / ss_x;
    let intercept = y_mean - slope * x_mean;

    let ss_res: f64 = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| {
            let fit = intercept + slope * x;
            (y - fit).powi(2)
        })
        .sum();

    let r_squared = (1.0 - ss_res / ss_tot).clamp(0.0, 1.0);

    // Two-tailed t-test on the slope
    let p_value = if n < 3 {
        1.0 // no residual degrees of freedom
    } else {
        let df = n - 2;
        let mse = ss_res / df as f64;
        let se = (mse / ss_x).sqrt();
        if se < 1e-300 {
            if slope.abs() < 1e-300 {
                1.0
            } else {
                0.0 // exact fit with a real slope
            }
        } else {
            t_distribution_p_value(slope / se, df)
        }
    };

    FitStats {
        slope: Some(slope),
        intercept,
        r_squared,
        p_value,
        is_significant: p_value < ALPHA,
        coefficients: vec![intercept, slope],
    }
}

// Quadratic least squares on [1, x, x²] via the 3x3 normal equations.
// Returns None with fewer than 3 points or a singular design.
fn fit_quadratic(xs: &[f64], ys: &[f64]) -> Option<FitStats> {
    let n = xs.len();
    if n < 3 {
        return None;
    }

    let nf = n as f64;
    let s1: f64 = xs.iter().sum();
    let s2: f64 = xs.iter().map(|&x| x * x).sum();
    let s3: f64 = xs.iter().map(|&x| x * x * x).sum();
    let s4: f64 = xs.iter().map(|&x| x * x * x * x).sum();
    let t0: f64 = ys.iter().sum();
    let t1: f64 = xs.iter().zip(ys.iter()).map(|(&x, &y)| x * y).sum();
    let t2: f64 = xs.iter().zip(ys.iter()).map(|(&x, &y)| x * x * y).sum();

    let xtx = Array2::from_shape_vec((3, 3), vec![nf, s1, s2, s1, s2, s3, s2, s3, s4]).ok()?;
    let coefficients = cholesky_solve(&xtx, &[t0, t1, t2])?;
    let (b0, b1, b2) = (coefficients[0], coefficients[1], coefficients[2]);

    let y_mean = t0 / nf;
    let ss_tot: f64 = ys.iter().map(|&y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = xs
        .iter()
        .zip(ys.iter())
        .map(|(&x, &y)| {
            let fit = b0 + b1 * x + b2 * x * x;
            (y - fit).powi(2)
        })
        .sum();

    let r_squared = if ss_tot < 1e-300 {
        0.0
    } else {
        (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
    };

    // Overall F-test at (2, n-3)
    let p_value = if n < 4 || ss_tot < 1e-300 {
        1.0
    } else if ss_res < 1e-300 {
        0.0 // exact fit
    } else {
        let df = n - 3;
        let f = ((ss_tot - ss_res) / 2.0) / (ss_res / df as f64);
        f_distribution_p_value(f, 2, df)
    };

    Some(FitStats {
        slope: None,
        intercept: b0,
        r_squared,
        p_value,
        is_significant: p_value < ALPHA,
        coefficients,
    })
}

// Solve A x = b for symmetric positive-definite A via Cholesky.
// Returns None when A is not positive definite (singular design).
fn cholesky_solve(a: &Array2<f64>, b: &[f64]) -> Option<Vec<f64>> {
    let n = b.len();
    let mut l = Array2::<f64>::zeros((n, n));

    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[[i, j]];
            for k in 0..j {
                sum -= l[[i, k]] * l[[j, k]];
            }
            if i == j {
                if sum <= 1e-12 {
                    return None;
                }
                l[[i, j]] = sum.sqrt();
            } else {
                l[[i, j]] = sum / l[[j, j]];
            }
        }
    }

    // Forward substitution: L z = b
    let mut z = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for k in 0..i {
            sum -= l[[i, k]] * z[k];
        }
        z[i] = sum / l[[i, i]];
    }

    // Back substitution: L' x = z
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = z[i];
        for k in (i + 1)..n {
            sum -= l[[k, i]] * x[k];
        }
        x[i] = sum / l[[i, i]];
    }

    Some(x)
}

fn build_insight(
    x_column: &str,
    y_column: &str,
    linear: &FitStats,
    quadratic: Option<&FitStats>,
    recommended: RecommendedFit,
    strength: Strength,
) -> String {
    if strength == Strength::None {
        return format!(
            "No meaningful relationship between {x_column} and {y_column} (R² = {:.2})",
            linear.r_squared
        );
    }

    let direction = if linear.slope.unwrap_or(0.0) >= 0.0 {
        "positive"
    } else {
        "negative"
    };

    match (recommended, quadratic) {
        (RecommendedFit::Quadratic, Some(q)) => format!(
            "{} curved relationship between {x_column} and {y_column} with an overall \
             {direction} trend: the quadratic fit (R² = {:.2}) improves on the straight \
             line (R² = {:.2})",
            capitalize(strength.label()),
            q.r_squared,
            linear.r_squared
        ),
        _ => format!(
            "{} {direction} relationship between {x_column} and {y_column} \
             (R² = {:.2}, p {})",
            capitalize(strength.label()),
            linear.r_squared,
            format_p_value(linear.p_value)
        ),
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{DataRow, Value};

    fn make_table(points: &[(f64, f64)]) -> Table {
        Table::new(
            points
                .iter()
                .map(|&(x, y)| {
                    let mut row = DataRow::new();
                    row.insert("speed".into(), Value::Number(x));
                    row.insert("wear".into(), Value::Number(y));
                    row
                })
                .collect(),
        )
    }

    #[test]
    fn test_perfect_linear_fit() {
        // y = 2x + 1
        let table = make_table(&[
            (1.0, 3.0),
            (2.0, 5.0),
            (3.0, 7.0),
            (4.0, 9.0),
            (5.0, 11.0),
            (6.0, 13.0),
        ]);
        let result = fit_regression(&table, "speed", "wear").unwrap();

        assert!((result.linear.slope.unwrap() - 2.0).abs() < 1e-10);
        assert!((result.linear.intercept - 1.0).abs() < 1e-10);
        assert!((result.linear.r_squared - 1.0).abs() < 1e-10);
        assert_eq!(result.recommended_fit, RecommendedFit::Linear);
        assert_eq!(result.strength, Strength::VeryStrong);
        assert!(result.linear.is_significant);
        assert!(result.insight.contains("positive"));
        assert!(result.insight.contains("Very strong"));
    }

    #[test]
    fn test_negative_slope_direction() {
        let table = make_table(&[(1.0, 10.0), (2.0, 8.0), (3.0, 6.1), (4.0, 3.9), (5.0, 2.0)]);
        let result = fit_regression(&table, "speed", "wear").unwrap();
        assert!(result.linear.slope.unwrap() < 0.0);
        assert!(result.insight.contains("negative"));
    }

    #[test]
    fn test_quadratic_preferred_for_curved_data() {
        // y = x², symmetric around 0: the line explains nothing
        let table = make_table(&[
            (-3.0, 9.0),
            (-2.0, 4.0),
            (-1.0, 1.0),
            (0.0, 0.0),
            (1.0, 1.0),
            (2.0, 4.0),
            (3.0, 9.0),
        ]);
        let result = fit_regression(&table, "speed", "wear").unwrap();

        let quad = result.quadratic.as_ref().unwrap();
        assert!(quad.r_squared > 0.99);
        assert!(result.linear.r_squared < 0.01);
        assert_eq!(result.recommended_fit, RecommendedFit::Quadratic);
        assert!(quad.slope.is_none());
        assert_eq!(quad.coefficients.len(), 3);
        assert!((quad.coefficients[2] - 1.0).abs() < 1e-6);
        assert!(result.insight.contains("curved"));
    }

    #[test]
    fn test_marginal_improvement_keeps_linear() {
        // Nearly linear data: the quadratic fit cannot beat the margin
        let table = make_table(&[
            (1.0, 2.1),
            (2.0, 3.9),
            (3.0, 6.2),
            (4.0, 7.8),
            (5.0, 10.1),
        ]);
        let result = fit_regression(&table, "speed", "wear").unwrap();
        assert_eq!(result.recommended_fit, RecommendedFit::Linear);
    }

    #[test]
    fn test_too_few_points_is_error() {
        let table = make_table(&[(1.0, 2.0)]);
        let result = fit_regression(&table, "speed", "wear");
        assert_eq!(result.unwrap_err(), Error::InsufficientData { needed: 2, got: 1 });
    }

    #[test]
    fn test_two_points_no_quadratic_no_significance() {
        let table = make_table(&[(1.0, 2.0), (2.0, 4.0)]);
        let result = fit_regression(&table, "speed", "wear").unwrap();
        assert!(result.quadratic.is_none());
        assert_eq!(result.linear.p_value, 1.0);
        assert!(!result.linear.is_significant);
    }

    #[test]
    fn test_non_finite_rows_dropped() {
        let table = make_table(&[
            (1.0, 3.0),
            (f64::NAN, 100.0),
            (2.0, 5.0),
            (3.0, f64::INFINITY),
            (3.0, 7.0),
            (4.0, 9.0),
        ]);
        let result = fit_regression(&table, "speed", "wear").unwrap();
        assert_eq!(result.n, 4);
        assert!((result.linear.slope.unwrap() - 2.0).abs() < 1e-10);
    }

    #[test]
    fn test_unknown_column_is_error() {
        let table = make_table(&[(1.0, 2.0), (2.0, 4.0)]);
        assert_eq!(
            fit_regression(&table, "pressure", "wear").unwrap_err(),
            Error::unknown_column("pressure")
        );
    }

    #[test]
    fn test_constant_predictor_yields_flat_fit() {
        let table = make_table(&[(2.0, 1.0), (2.0, 5.0), (2.0, 9.0)]);
        let result = fit_regression(&table, "speed", "wear").unwrap();
        assert_eq!(result.linear.slope, Some(0.0));
        assert_eq!(result.linear.r_squared, 0.0);
        assert_eq!(result.linear.p_value, 1.0);
        assert!(result.quadratic.is_none()); // singular design
        assert_eq!(result.strength, Strength::None);
        assert!(result.insight.contains("No meaningful relationship"));
    }

    #[test]
    fn test_noisy_flat_data_not_significant() {
        let table = make_table(&[
            (1.0, 5.0),
            (2.0, 5.2),
            (3.0, 4.9),
            (4.0, 5.1),
            (5.0, 5.0),
            (6.0, 4.8),
            (7.0, 5.3),
            (8.0, 5.0),
        ]);
        let result = fit_regression(&table, "speed", "wear").unwrap();
        assert!(!result.linear.is_significant);
        assert_eq!(result.strength, Strength::None);
    }

    #[test]
    fn test_strength_cut_points() {
        assert_eq!(Strength::from_r_squared(0.0), Strength::None);
        assert_eq!(Strength::from_r_squared(0.09), Strength::None);
        assert_eq!(Strength::from_r_squared(0.10), Strength::Weak);
        assert_eq!(Strength::from_r_squared(0.29), Strength::Weak);
        assert_eq!(Strength::from_r_squared(0.30), Strength::Moderate);
        assert_eq!(Strength::from_r_squared(0.59), Strength::Moderate);
        assert_eq!(Strength::from_r_squared(0.60), Strength::Strong);
        assert_eq!(Strength::from_r_squared(0.84), Strength::Strong);
        assert_eq!(Strength::from_r_squared(0.85), Strength::VeryStrong);
        assert_eq!(Strength::from_r_squared(1.0), Strength::VeryStrong);
    }

    #[test]
    fn test_stars_mapping() {
        assert_eq!(Strength::None.stars(), 0);
        assert_eq!(Strength::Weak.stars(), 1);
        assert_eq!(Strength::Moderate.stars(), 2);
        assert_eq!(Strength::Strong.stars(), 3);
        assert_eq!(Strength::VeryStrong.stars(), 4);
    }

    #[test]
    fn test_cholesky_solve_identity() {
        let a = Array2::from_shape_vec((3, 3), vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0])
            .unwrap();
        let x = cholesky_solve(&a, &[3.0, 4.0, 5.0]).unwrap();
        assert!((x[0] - 3.0).abs() < 1e-12);
        assert!((x[1] - 4.0).abs() < 1e-12);
        assert!((x[2] - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_cholesky_rejects_singular() {
        let a = Array2::from_shape_vec((3, 3), vec![1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0])
            .unwrap();
        assert!(cholesky_solve(&a, &[1.0, 1.0, 1.0]).is_none());
    }
}
