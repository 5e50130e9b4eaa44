//! The scenario cube: path-wise, time-wise valuations per leg.

use scengen_core::types::error::{DimensionError, EngineError};
use scengen_core::types::TimeGrid;

/// Alias given to the netted leg produced by aggregation.
pub const NETTING_ALIAS: &str = "netting_set";

/// Immutable 3-dimensional array of valuations indexed by
/// (path, time, leg), with leg aliases and the time grid as parallel
/// metadata.
///
/// Derived cubes (aggregated, collateral-adjusted) are new objects;
/// a cube is never mutated in place after production.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ScenarioCube {
    grid: TimeGrid,
    n_paths: usize,
    aliases: Vec<String>,
    // Flattened [path][time][leg].
    values: Vec<f64>,
}

impl ScenarioCube {
    /// Creates a cube from flattened `[path][time][leg]` values.
    ///
    /// # Errors
    ///
    /// [`DimensionError::LengthMismatch`] if the value array does not
    /// hold `n_paths * grid.len() * aliases.len()` entries.
    pub fn new(
        grid: TimeGrid,
        n_paths: usize,
        aliases: Vec<String>,
        values: Vec<f64>,
    ) -> Result<Self, EngineError> {
        let expected = n_paths * grid.len() * aliases.len();
        if values.len() != expected {
            return Err(DimensionError::LengthMismatch {
                what: "scenario cube values".to_string(),
                got: values.len(),
                expected,
            }
            .into());
        }
        Ok(Self {
            grid,
            n_paths,
            aliases,
            values,
        })
    }

    /// Number of simulated paths.
    #[inline]
    pub fn n_paths(&self) -> usize {
        self.n_paths
    }

    /// Number of legs.
    #[inline]
    pub fn n_legs(&self) -> usize {
        self.aliases.len()
    }

    /// The valuation time grid.
    #[inline]
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Leg alias labels, in cube order.
    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Valuation at (path, time index, leg index).
    #[inline]
    pub fn value(&self, path: usize, time_idx: usize, leg: usize) -> f64 {
        self.values[(path * self.grid.len() + time_idx) * self.aliases.len() + leg]
    }

    /// One leg's values as `[path][time]` rows, the shape the
    /// exposure reductions consume.
    ///
    /// # Errors
    ///
    /// [`DimensionError::IndexOutOfRange`] for an unknown leg index.
    pub fn leg_paths(&self, leg: usize) -> Result<Vec<Vec<f64>>, EngineError> {
        if leg >= self.n_legs() {
            return Err(DimensionError::IndexOutOfRange {
                what: "scenario cube leg".to_string(),
                index: leg,
                len: self.n_legs(),
            }
            .into());
        }
        Ok((0..self.n_paths)
            .map(|p| (0..self.grid.len()).map(|t| self.value(p, t, leg)).collect())
            .collect())
    }

    /// Index of a leg by alias.
    pub fn leg_index(&self, alias: &str) -> Option<usize> {
        self.aliases.iter().position(|a| a == alias)
    }

    /// Aggregates the legs into a netted value per (path, time).
    ///
    /// With `keep_gross` the constituent legs are kept and the netted
    /// leg is appended under [`NETTING_ALIAS`]; otherwise the result
    /// holds the netted leg alone. Either way a new cube is returned.
    pub fn aggregate(&self, keep_gross: bool) -> ScenarioCube {
        let n_times = self.grid.len();
        let n_legs = self.n_legs();
        let netted: Vec<f64> = (0..self.n_paths * n_times)
            .map(|pt| {
                (0..n_legs)
                    .map(|l| self.values[pt * n_legs + l])
                    .sum::<f64>()
            })
            .collect();

        if keep_gross {
            let mut aliases = self.aliases.clone();
            aliases.push(NETTING_ALIAS.to_string());
            let mut values = Vec::with_capacity(self.n_paths * n_times * (n_legs + 1));
            for pt in 0..self.n_paths * n_times {
                values.extend_from_slice(&self.values[pt * n_legs..(pt + 1) * n_legs]);
                values.push(netted[pt]);
            }
            ScenarioCube {
                grid: self.grid.clone(),
                n_paths: self.n_paths,
                aliases,
                values,
            }
        } else {
            ScenarioCube {
                grid: self.grid.clone(),
                n_paths: self.n_paths,
                aliases: vec![NETTING_ALIAS.to_string()],
                values: netted,
            }
        }
    }

    /// Returns a new cube with one extra leg appended from
    /// `[path][time]` values.
    ///
    /// # Errors
    ///
    /// [`DimensionError::LengthMismatch`] if `leg_values` does not
    /// hold one value per (path, time) pair.
    pub fn with_appended_leg(
        &self,
        alias: impl Into<String>,
        leg_values: &[f64],
    ) -> Result<ScenarioCube, EngineError> {
        let n_times = self.grid.len();
        if leg_values.len() != self.n_paths * n_times {
            return Err(DimensionError::LengthMismatch {
                what: "appended leg values".to_string(),
                got: leg_values.len(),
                expected: self.n_paths * n_times,
            }
            .into());
        }
        let n_legs = self.n_legs();
        let mut aliases = self.aliases.clone();
        aliases.push(alias.into());
        let mut values = Vec::with_capacity(self.n_paths * n_times * (n_legs + 1));
        for pt in 0..self.n_paths * n_times {
            values.extend_from_slice(&self.values[pt * n_legs..(pt + 1) * n_legs]);
            values.push(leg_values[pt]);
        }
        Ok(ScenarioCube {
            grid: self.grid.clone(),
            n_paths: self.n_paths,
            aliases,
            values,
        })
    }
}
