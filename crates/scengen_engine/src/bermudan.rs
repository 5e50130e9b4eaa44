//! Bermudan instruments with a two-phase fit lifecycle.
//!
//! A [`BermudanInstrument`] is configuration only: exercise dates,
//! the underlying legs entered on exercise, and the regression setup.
//! Calibration consumes it and returns a sealed [`FittedBermudan`]
//! whose regression functions are written once during backward
//! induction and read-only for every subsequent valuation pass, so
//! valuing an unfit instrument is not expressible.
//!
//! Calibration and valuation may share the same simulation; the
//! resulting foresight bias is an accepted approximation of the
//! single-simulation AMC scheme, not a correctness guarantee.

use rayon::prelude::*;
use tracing::{debug, info};

use scengen_core::types::error::{ConfigurationError, EngineError};
use scengen_models::Simulation;

use crate::amc::{fit_regression, RegressionBasis, RegressionFn};
use crate::cashflows::Leg;
use crate::context::{CurveKey, MarketContext};

/// Long/short position in the option.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Position {
    /// Holder of the exercise right: values enter with factor +1.
    Long,
    /// Writer of the exercise right: values enter with factor -1.
    Short,
}

impl Position {
    /// Multiplicative factor of the position.
    #[inline]
    pub fn factor(&self) -> f64 {
        match self {
            Position::Long => 1.0,
            Position::Short => -1.0,
        }
    }
}

/// Observable, path-dependent quantity used as a regression variable.
///
/// Closed variant set so regression inputs stay reproducible from
/// the instrument definition alone.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum RegressorSpec {
    /// The simulated short rate at the observation time.
    ShortRate,
    /// Zero-coupon bond `P(t, t + tenor)` on the discount curve.
    ZeroBondRatio {
        /// Bond tenor in years.
        tenor: f64,
    },
    /// Mark-to-market value of the exercise's underlying legs.
    UnderlyingValue,
}

/// A single exercise opportunity.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct Exercise {
    /// Exercise time; must lie exactly on the simulation grid.
    pub time: f64,
    /// Legs entered upon exercise.
    pub underlying: Vec<Leg>,
    /// Regression variables observed at this exercise.
    pub regressors: Vec<RegressorSpec>,
}

/// Unfit Bermudan instrument: configuration inspection only.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct BermudanInstrument {
    exercises: Vec<Exercise>,
    position: Position,
    discount_key: CurveKey,
    basis: RegressionBasis,
}

impl BermudanInstrument {
    /// Creates a validated instrument.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::InvalidInstrument`] for an empty
    /// exercise schedule, non-increasing exercise times, an exercise
    /// without underlying legs or regressors, or an invalid basis.
    pub fn new(
        exercises: Vec<Exercise>,
        position: Position,
        discount_key: CurveKey,
        basis: RegressionBasis,
    ) -> Result<Self, EngineError> {
        basis.validate()?;
        if exercises.is_empty() {
            return Err(ConfigurationError::InvalidInstrument(
                "bermudan instrument has no exercise dates".to_string(),
            )
            .into());
        }
        for pair in exercises.windows(2) {
            if pair[1].time <= pair[0].time {
                return Err(ConfigurationError::InvalidInstrument(format!(
                    "exercise times must be strictly increasing: {} then {}",
                    pair[0].time, pair[1].time
                ))
                .into());
            }
        }
        for ex in &exercises {
            if ex.underlying.is_empty() {
                return Err(ConfigurationError::InvalidInstrument(format!(
                    "exercise at {} has no underlying legs",
                    ex.time
                ))
                .into());
            }
            if ex.regressors.is_empty() {
                return Err(ConfigurationError::InvalidInstrument(format!(
                    "exercise at {} has no regression variables",
                    ex.time
                ))
                .into());
            }
        }
        Ok(Self {
            exercises,
            position,
            discount_key,
            basis,
        })
    }

    /// The exercise schedule.
    #[inline]
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    /// Long/short position.
    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Regression basis used at calibration.
    #[inline]
    pub fn basis(&self) -> &RegressionBasis {
        &self.basis
    }

    /// The discounting context key.
    #[inline]
    pub fn discount_key(&self) -> &CurveKey {
        &self.discount_key
    }

    /// Calibrates the continuation-value regressions by backward
    /// induction over the exercise schedule and seals the result.
    ///
    /// Exercise dates are processed latest-first (each date's fit
    /// needs the already-updated policy values of all later dates);
    /// within a date the per-path work runs in parallel.
    ///
    /// # Errors
    ///
    /// - [`ConfigurationError::InvalidInstrument`] if an exercise
    ///   time does not lie on the simulation grid
    /// - [`NumericalError`](scengen_core::types::error::NumericalError)
    ///   from a singular regression fit
    pub fn calibrate(
        self,
        sim: &Simulation,
        context: &MarketContext,
    ) -> Result<FittedBermudan, EngineError> {
        let exercise_indices = self
            .exercises
            .iter()
            .map(|ex| {
                sim.grid().index_of(ex.time).ok_or_else(|| {
                    ConfigurationError::InvalidInstrument(format!(
                        "exercise time {} is not on the simulation grid",
                        ex.time
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let n_paths = sim.n_paths();
        let n_ex = self.exercises.len();
        debug!(n_exercises = n_ex, n_paths, "calibrating bermudan regressions");

        // Deflated value of the exercise policy from the last date
        // backwards. At the final date the continuation is zero, so
        // the policy is exercise-if-positive.
        let last_idx = exercise_indices[n_ex - 1];
        let mut policy: Vec<f64> = (0..n_paths)
            .into_par_iter()
            .map(|p| {
                let intrinsic = deflated_underlying(
                    &self.exercises[n_ex - 1].underlying,
                    sim,
                    context,
                    p,
                    last_idx,
                )?;
                Ok(intrinsic.max(0.0))
            })
            .collect::<Result<Vec<_>, EngineError>>()?;

        let mut continuations: Vec<RegressionFn> = Vec::with_capacity(n_ex.saturating_sub(1));
        for i in (0..n_ex - 1).rev() {
            let t_idx = exercise_indices[i];
            let exercise = &self.exercises[i];
            let xs: Vec<Vec<f64>> = (0..n_paths)
                .into_par_iter()
                .map(|p| regressor_values(exercise, &self.discount_key, sim, context, p, t_idx))
                .collect::<Result<_, EngineError>>()?;
            let fitted = fit_regression(&xs, &policy, &self.basis)?;

            let updated: Vec<f64> = (0..n_paths)
                .into_par_iter()
                .map(|p| {
                    let intrinsic =
                        deflated_underlying(&exercise.underlying, sim, context, p, t_idx)?;
                    let continuation = fitted.evaluate(&xs[p]);
                    if intrinsic > 0.0 && intrinsic > continuation {
                        Ok(intrinsic)
                    } else {
                        Ok(policy[p])
                    }
                })
                .collect::<Result<_, EngineError>>()?;
            policy = updated;
            continuations.push(fitted);
        }
        continuations.reverse();

        info!(n_exercises = n_ex, "bermudan calibration complete");
        Ok(FittedBermudan {
            instrument: self,
            exercise_indices,
            continuations,
        })
    }
}

/// Calibrated, sealed Bermudan instrument.
///
/// Regression functions are fixed at construction; every method is
/// `&self` and valuation is a pure function of (simulation, context).
#[derive(Clone, Debug)]
pub struct FittedBermudan {
    instrument: BermudanInstrument,
    exercise_indices: Vec<usize>,
    continuations: Vec<RegressionFn>,
}

impl FittedBermudan {
    /// The underlying configuration.
    #[inline]
    pub fn instrument(&self) -> &BermudanInstrument {
        &self.instrument
    }

    /// Grid indices of the exercise dates.
    #[inline]
    pub fn exercise_indices(&self) -> &[usize] {
        &self.exercise_indices
    }

    /// Estimated deflated continuation value at exercise `i` (zero at
    /// the final date, where no continuation exists).
    pub(crate) fn continuation(&self, i: usize, vars: &[f64]) -> f64 {
        if i + 1 == self.exercise_indices.len() {
            0.0
        } else {
            self.continuations[i].evaluate(vars)
        }
    }

    /// Regression variables of exercise `i` observed at (path, grid
    /// time).
    pub(crate) fn regressors_at(
        &self,
        i: usize,
        sim: &Simulation,
        context: &MarketContext,
        path: usize,
        time_idx: usize,
    ) -> Result<Vec<f64>, EngineError> {
        regressor_values(
            &self.instrument.exercises[i],
            &self.instrument.discount_key,
            sim,
            context,
            path,
            time_idx,
        )
    }

    /// Deflated intrinsic value of exercise `i` at its own date.
    pub(crate) fn deflated_intrinsic(
        &self,
        i: usize,
        sim: &Simulation,
        context: &MarketContext,
        path: usize,
    ) -> Result<f64, EngineError> {
        deflated_underlying(
            &self.instrument.exercises[i].underlying,
            sim,
            context,
            path,
            self.exercise_indices[i],
        )
    }

    /// Undeflated value of exercise `i`'s underlying legs at (path,
    /// grid time).
    pub(crate) fn underlying_value(
        &self,
        i: usize,
        sim: &Simulation,
        context: &MarketContext,
        path: usize,
        time_idx: usize,
    ) -> Result<f64, EngineError> {
        underlying_value(
            &self.instrument.exercises[i].underlying,
            sim,
            context,
            path,
            time_idx,
        )
    }

    /// Runs the exercise state machine along one path: visits the
    /// exercise dates in increasing order and returns the index of
    /// the first date where the deflated intrinsic value is positive
    /// and exceeds the estimated continuation, or `None` when the
    /// instrument expires unexercised.
    pub fn exercise_index(
        &self,
        sim: &Simulation,
        context: &MarketContext,
        path: usize,
    ) -> Result<Option<usize>, EngineError> {
        for i in 0..self.exercise_indices.len() {
            let t_idx = self.exercise_indices[i];
            let intrinsic = self.deflated_intrinsic(i, sim, context, path)?;
            if intrinsic <= 0.0 {
                continue;
            }
            let vars = self.regressors_at(i, sim, context, path, t_idx)?;
            if intrinsic > self.continuation(i, &vars) {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }
}

fn underlying_value(
    legs: &[Leg],
    sim: &Simulation,
    context: &MarketContext,
    path: usize,
    time_idx: usize,
) -> Result<f64, EngineError> {
    let mut total = 0.0;
    for leg in legs {
        total += leg.value(sim, context, path, time_idx)?;
    }
    Ok(total)
}

fn deflated_underlying(
    legs: &[Leg],
    sim: &Simulation,
    context: &MarketContext,
    path: usize,
    time_idx: usize,
) -> Result<f64, EngineError> {
    let value = underlying_value(legs, sim, context, path, time_idx)?;
    Ok(value / sim.numeraire(path, time_idx))
}

fn regressor_values(
    exercise: &Exercise,
    discount_key: &CurveKey,
    sim: &Simulation,
    context: &MarketContext,
    path: usize,
    time_idx: usize,
) -> Result<Vec<f64>, EngineError> {
    let t = sim.grid().time(time_idx);
    let mut out = Vec::with_capacity(exercise.regressors.len());
    for spec in &exercise.regressors {
        let value = match spec {
            RegressorSpec::ShortRate => context.short_rate(sim, path, time_idx)?,
            RegressorSpec::ZeroBondRatio { tenor } => {
                context.zero_bond(discount_key, sim, path, time_idx, t + tenor)?
            }
            RegressorSpec::UnderlyingValue => {
                underlying_value(&exercise.underlying, sim, context, path, time_idx)?
            }
        };
        out.push(value);
    }
    Ok(out)
}
