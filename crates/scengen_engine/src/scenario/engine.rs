//! The scenario engine: fills a cube of path-wise MTM values.

use rayon::prelude::*;
use tracing::{debug, info};

use scengen_core::types::error::{
    ConfigurationError, EngineError, NumericalError,
};
use scengen_core::types::{Currency, CurrencyPair};
use scengen_models::Simulation;

use crate::amc::fit_regression;
use crate::bermudan::FittedBermudan;
use crate::cashflows::{Leg, MtmLeg};
use crate::context::MarketContext;

use super::cube::ScenarioCube;

/// One column of the scenario cube: a (composite) instrument with an
/// alias label.
#[derive(Clone, Debug)]
pub enum ScenarioLeg {
    /// Plain legs netted into one value, e.g. the two legs of a swap.
    Swap {
        /// Cube alias.
        alias: String,
        /// Constituent legs.
        legs: Vec<Leg>,
    },
    /// Mark-to-market cross-currency legs.
    MtmSwap {
        /// Cube alias.
        alias: String,
        /// Constituent resettable legs.
        legs: Vec<MtmLeg>,
    },
    /// A calibrated Bermudan instrument.
    Bermudan {
        /// Cube alias.
        alias: String,
        /// The sealed, regression-fitted instrument.
        instrument: FittedBermudan,
    },
}

impl ScenarioLeg {
    /// The cube alias of this leg.
    pub fn alias(&self) -> &str {
        match self {
            ScenarioLeg::Swap { alias, .. }
            | ScenarioLeg::MtmSwap { alias, .. }
            | ScenarioLeg::Bermudan { alias, .. } => alias,
        }
    }
}

/// Produces the scenario cube for a portfolio: the mark-to-market
/// value of every leg at every (path, time) pair.
///
/// With a numeraire currency set, values are FX-converted into that
/// currency at the simulated observation point; otherwise each leg
/// reports undiscounted native-currency units. Given already-fitted
/// instruments this is a pure function of its inputs; the only side
/// effect is the cube allocation.
///
/// # Errors
///
/// [`ConfigurationError`] for an empty portfolio, plus any
/// resolution, dimension or numerical error from the constituent
/// valuations.
pub fn scenarios(
    portfolio: &[ScenarioLeg],
    sim: &Simulation,
    context: &MarketContext,
    numeraire: Option<Currency>,
) -> Result<ScenarioCube, EngineError> {
    if portfolio.is_empty() {
        return Err(ConfigurationError::InvalidInstrument(
            "scenario portfolio is empty".to_string(),
        )
        .into());
    }
    let n_paths = sim.n_paths();
    let n_times = sim.grid().len();
    let n_legs = portfolio.len();
    debug!(n_legs, n_paths, n_times, "generating scenario cube");

    // Per-leg [path][time] planes, interleaved into the cube at the
    // end.
    let mut planes = Vec::with_capacity(n_legs);
    for leg in portfolio {
        let plane = match leg {
            ScenarioLeg::Swap { legs, .. } => swap_plane(legs, sim, context, numeraire)?,
            ScenarioLeg::MtmSwap { legs, .. } => mtm_plane(legs, sim, context, numeraire)?,
            ScenarioLeg::Bermudan { instrument, .. } => {
                bermudan_plane(instrument, sim, context, numeraire)?
            }
        };
        planes.push(plane);
    }

    let mut values = vec![0.0; n_paths * n_times * n_legs];
    for (l, plane) in planes.iter().enumerate() {
        for pt in 0..n_paths * n_times {
            values[pt * n_legs + l] = plane[pt];
        }
    }

    let aliases = portfolio.iter().map(|l| l.alias().to_string()).collect();
    info!(n_legs, n_paths, "scenario cube complete");
    ScenarioCube::new(sim.grid().clone(), n_paths, aliases, values)
}

fn conversion(
    native: Currency,
    numeraire: Option<Currency>,
    context: &MarketContext,
    sim: &Simulation,
    path: usize,
    time_idx: usize,
) -> Result<f64, EngineError> {
    match numeraire {
        Some(target) if target != native => {
            context.fx(CurrencyPair::new(native, target), sim, path, time_idx)
        }
        _ => Ok(1.0),
    }
}

fn swap_plane(
    legs: &[Leg],
    sim: &Simulation,
    context: &MarketContext,
    numeraire: Option<Currency>,
) -> Result<Vec<f64>, EngineError> {
    let n_times = sim.grid().len();
    let rows: Vec<Vec<f64>> = (0..sim.n_paths())
        .into_par_iter()
        .map(|p| {
            let mut row = vec![0.0; n_times];
            for (t, slot) in row.iter_mut().enumerate() {
                let mut total = 0.0;
                for leg in legs {
                    let v = leg.value(sim, context, p, t)?;
                    total += v * conversion(leg.currency(), numeraire, context, sim, p, t)?;
                }
                *slot = total;
            }
            Ok(row)
        })
        .collect::<Result<_, EngineError>>()?;
    Ok(rows.into_iter().flatten().collect())
}

fn mtm_plane(
    legs: &[MtmLeg],
    sim: &Simulation,
    context: &MarketContext,
    numeraire: Option<Currency>,
) -> Result<Vec<f64>, EngineError> {
    let n_times = sim.grid().len();
    let rows: Vec<Vec<f64>> = (0..sim.n_paths())
        .into_par_iter()
        .map(|p| {
            let mut row = vec![0.0; n_times];
            for (t, slot) in row.iter_mut().enumerate() {
                let mut total = 0.0;
                for leg in legs {
                    let v = leg.value(sim, context, p, t)?;
                    total +=
                        v * conversion(leg.leg().currency(), numeraire, context, sim, p, t)?;
                }
                *slot = total;
            }
            Ok(row)
        })
        .collect::<Result<_, EngineError>>()?;
    Ok(rows.into_iter().flatten().collect())
}

/// Bermudan MTM plane via the per-path exercise state machine.
///
/// Each path walks `NotYetExercised -> Exercised(i) | Expired` using
/// the calibrated continuation estimates. Before its exercise (or
/// expiry) a path's MTM is the conditional expectation of the
/// realized deflated policy payoff, estimated by a cross-sectional
/// regression over the still-live paths at each grid time and scaled
/// back by the path's numeraire; afterwards the path is valued on
/// the post-exercise underlying legs alone.
fn bermudan_plane(
    instrument: &FittedBermudan,
    sim: &Simulation,
    context: &MarketContext,
    numeraire: Option<Currency>,
) -> Result<Vec<f64>, EngineError> {
    let n_paths = sim.n_paths();
    let n_times = sim.grid().len();
    let position = instrument.instrument().position().factor();
    let native = instrument.instrument().discount_key().currency;
    let exercise_indices = instrument.exercise_indices();
    let last_ex_idx = *exercise_indices.last().unwrap_or(&0);

    // Forward pass: decision and realized deflated payoff per path.
    let decisions: Vec<Option<usize>> = (0..n_paths)
        .into_par_iter()
        .map(|p| instrument.exercise_index(sim, context, p))
        .collect::<Result<_, EngineError>>()?;
    let payoffs: Vec<f64> = (0..n_paths)
        .into_par_iter()
        .map(|p| match decisions[p] {
            Some(i) => instrument.deflated_intrinsic(i, sim, context, p),
            None => Ok(0.0),
        })
        .collect::<Result<_, EngineError>>()?;

    let mut plane = vec![0.0; n_paths * n_times];
    for t in 0..n_times {
        // The next decision still ahead of this grid time; none left
        // means every live path has expired.
        let next_exercise = exercise_indices.iter().position(|&idx| idx > t);

        let live: Vec<usize> = (0..n_paths)
            .filter(|&p| match decisions[p] {
                Some(i) => exercise_indices[i] > t,
                None => t <= last_ex_idx,
            })
            .collect();

        let continuation = match next_exercise {
            Some(i) if !live.is_empty() => {
                Some(live_estimates(instrument, i, &live, &payoffs, sim, context, t)?)
            }
            _ => None,
        };
        let live_lookup: std::collections::HashMap<usize, f64> = match &continuation {
            Some(est) => live.iter().copied().zip(est.iter().copied()).collect(),
            None => std::collections::HashMap::new(),
        };

        let row: Vec<f64> = (0..n_paths)
            .into_par_iter()
            .map(|p| {
                let value = match decisions[p] {
                    Some(i) if exercise_indices[i] <= t => {
                        instrument.underlying_value(i, sim, context, p, t)?
                    }
                    _ => match live_lookup.get(&p) {
                        Some(&estimate) => estimate * sim.numeraire(p, t),
                        // Expired or past the final date unexercised.
                        None => 0.0,
                    },
                };
                let fx = conversion(native, numeraire, context, sim, p, t)?;
                Ok(position * fx * value)
            })
            .collect::<Result<_, EngineError>>()?;
        for (p, &v) in row.iter().enumerate() {
            plane[p * n_times + t] = v;
        }
    }
    Ok(plane)
}

/// Regression estimates of the deflated continuation payoff for the
/// live paths at one grid time.
///
/// When the cross-section is degenerate (too few live paths, or all
/// regressors identical as at time 0) the estimate falls back to the
/// live-path mean, which is the unconditional MC estimator.
fn live_estimates(
    instrument: &FittedBermudan,
    next_exercise: usize,
    live: &[usize],
    payoffs: &[f64],
    sim: &Simulation,
    context: &MarketContext,
    time_idx: usize,
) -> Result<Vec<f64>, EngineError> {
    let xs: Vec<Vec<f64>> = live
        .par_iter()
        .map(|&p| instrument.regressors_at(next_exercise, sim, context, p, time_idx))
        .collect::<Result<_, EngineError>>()?;
    let ys: Vec<f64> = live.iter().map(|&p| payoffs[p]).collect();

    match fit_regression(&xs, &ys, instrument.instrument().basis()) {
        Ok(fitted) => Ok(xs.iter().map(|vars| fitted.evaluate(vars)).collect()),
        Err(EngineError::Numerical(NumericalError::SingularBasis { .. })) => {
            let mean = ys.iter().sum::<f64>() / ys.len() as f64;
            debug!(time_idx, n_live = live.len(), "degenerate cross-section, using mean");
            Ok(vec![mean; live.len()])
        }
        Err(e) => Err(e),
    }
}
