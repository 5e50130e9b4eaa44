//! Integration tests for module exports.
//!
//! Verify that the public modules and types downstream crates depend
//! on are exported and accessible via absolute paths.

/// Types re-exported at the crate root.
#[test]
fn test_root_reexports() {
    use scengen_core::{
        ConfigurationError, Currency, CurrencyPair, Curve, DimensionError, EngineError, FlatCurve,
        NumericalError, TimeGrid, YieldCurve,
    };

    let _usd = Currency::USD;
    let pair = CurrencyPair::new(Currency::EUR, Currency::USD);
    assert!(!pair.is_identity());

    let grid = TimeGrid::uniform(1.0, 4).unwrap();
    assert_eq!(grid.len(), 5);

    let curve = Curve::Flat(FlatCurve::new(0.02));
    assert!(curve.discount_factor(1.0).unwrap() < 1.0);

    let err: EngineError = ConfigurationError::MissingParameter {
        key: "factors".to_string(),
    }
    .into();
    let _ = format!("{err}");
    let _: EngineError = NumericalError::NonFinite {
        context: "test".to_string(),
    }
    .into();
    let _: EngineError = DimensionError::IndexOutOfRange {
        what: "test".to_string(),
        index: 1,
        len: 0,
    }
    .into();
}

/// Time grid accessible via its full module path.
#[test]
fn test_types_module_exports() {
    use scengen_core::types::time::TimeGrid;
    use scengen_core::types::{Currency, CurrencyPair};

    let grid = TimeGrid::new(vec![0.0, 0.5, 1.0]).unwrap();
    assert_eq!(grid.n_steps(), 2);
    assert_eq!(grid.time(1), 0.5);
    assert_eq!(grid.horizon(), 1.0);
    assert_eq!(grid.index_of(0.5), Some(1));

    let pair = CurrencyPair::new(Currency::GBP, Currency::JPY);
    assert_eq!(pair.inverse().base, Currency::JPY);

    for currency in [
        Currency::USD,
        Currency::EUR,
        Currency::GBP,
        Currency::JPY,
        Currency::CHF,
    ] {
        assert_eq!(currency.code().len(), 3);
    }
}

/// Error taxonomy accessible and convertible into the umbrella type.
#[test]
fn test_error_types_exports() {
    use scengen_core::market_data::error::CurveError;
    use scengen_core::types::error::{
        ConfigurationError, DimensionError, EngineError, NumericalError,
    };

    let _config = ConfigurationError::OutOfDomain {
        key: "n_paths".to_string(),
        value: 0.0,
        constraint: "must be > 0".to_string(),
    };
    let _numerical = NumericalError::SingularBasis { rows: 4, cols: 8 };
    let _dimension = DimensionError::LengthMismatch {
        what: "increments".to_string(),
        got: 1,
        expected: 2,
    };
    let _: EngineError = CurveError::InvalidMaturity { t: -1.0 }.into();
}

/// Curve implementations usable through the trait and the enum.
#[test]
fn test_market_data_module_exports() {
    use scengen_core::market_data::curves::{Curve, FlatCurve, InterpolatedCurve, YieldCurve};

    let flat = FlatCurve::new(0.05_f64);
    let df = flat.discount_factor(1.0).unwrap();
    assert!(df > 0.0 && df < 1.0);
    assert!((flat.forward_rate(1.0, 2.0).unwrap() - 0.05).abs() < 1e-12);

    let interpolated = InterpolatedCurve::new(vec![(1.0, 0.02), (5.0, 0.03)]).unwrap();
    assert!(interpolated.zero_rate(2.0).unwrap() > 0.02);

    let curve = Curve::from_pillars(vec![(1.0, 0.02), (5.0, 0.03)]).unwrap();
    assert!(curve.instantaneous_forward(2.0).unwrap().is_finite());
}

/// Math helpers reachable both through the submodule and the
/// `math::` re-exports.
#[test]
fn test_math_module_exports() {
    use scengen_core::math::{
        cholesky_factor, correlation_from_rows, inverse_normal_cdf, validate_correlation,
    };

    let matrix = correlation_from_rows(&[vec![1.0, 0.5], vec![0.5, 1.0]]).unwrap();
    validate_correlation(&matrix).unwrap();
    let factor = cholesky_factor(&matrix).unwrap();
    assert!((factor[(0, 0)] - 1.0).abs() < 1e-12);

    assert!((inverse_normal_cdf(0.5)).abs() < 1e-9);
    let _ = scengen_core::math::normal::inverse_normal_cdf(0.975);
}
