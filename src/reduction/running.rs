/*
Copyright 2021, 2022 Jakub Lewandowski

This file is part of Gridded Data Mathematics (GridMath).

Gridded Data Mathematics (GridMath) is a free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation; either version 3 of the License, or
(at your option) any later version.

Gridded Data Mathematics (GridMath) is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with Gridded Data Mathematics (GridMath). If not, see https://www.gnu.org/licenses/.
*/

//! Running (moving window) averages along the time axis.
//!
//! For odd window lengths the window is centred on the averaged step,
//! for even lengths it extends one step further forward than backward.

use crate::errors::GridError;
use crate::grid::{Grid, GridAxis};
use crate::Float;
use log::debug;
use std::str::FromStr;

/// Treatment of window slots which fall outside the series.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EdgePolicy {
    /// Steps whose window does not fit in the series are missing.
    SetMissing,

    /// The series is reflected about its first and last step.
    SymmetricReflect,

    /// The series is treated as periodic.
    Cyclic,
}

impl Default for EdgePolicy {
    fn default() -> Self {
        EdgePolicy::SetMissing
    }
}

impl FromStr for EdgePolicy {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "missing" | "set_missing" | "0" => Ok(EdgePolicy::SetMissing),
            "symmetric" | "reflect" | "1" => Ok(EdgePolicy::SymmetricReflect),
            "cyclic" | "periodic" | "-1" => Ok(EdgePolicy::Cyclic),
            _ => Err(GridError::Value("unknown edge policy, use missing, symmetric or cyclic")),
        }
    }
}

impl EdgePolicy {
    /// Position in a series of `len` steps used for window slot `k`.
    fn resolve(self, k: i64, len: i64) -> Option<usize> {
        let last = len - 1;

        let k = match self {
            _ if (0..len).contains(&k) => k,
            EdgePolicy::SetMissing => return None,
            EdgePolicy::SymmetricReflect if k < 0 => -k,
            EdgePolicy::SymmetricReflect => 2 * last - k,
            EdgePolicy::Cyclic if k < 0 => k + len,
            EdgePolicy::Cyclic => k - len,
        };

        // windows are never longer than the series, so one reflection suffices
        if (0..len).contains(&k) {
            Some(k as usize)
        } else {
            None
        }
    }
}

/// Running average with equal weights over `length` time steps.
pub fn running_average(grid: &Grid, length: usize, edge: EdgePolicy) -> Result<Grid, GridError> {
    if length == 0 {
        return Err(GridError::Value("running average window cannot be empty"));
    }

    weighted_running_average(grid, &vec![1.0; length], edge)
}

/// Running average with weights applied by position in the window.
///
/// Missing values inside the window are skipped and the remaining
/// weights renormalised. Grids without time axis are returned unchanged.
pub fn weighted_running_average(
    grid: &Grid,
    weights: &[Float],
    edge: EdgePolicy,
) -> Result<Grid, GridError> {
    let length = weights.len();

    if length == 0 {
        return Err(GridError::Value("running average window cannot be empty"));
    }

    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(GridError::Value("running average weights must be finite and non-negative"));
    }

    if !grid.is_time_sequence() || length == 1 {
        return Ok(grid.clone());
    }

    let steps = grid.domain_length(GridAxis::Time);
    if length > steps {
        return Err(GridError::Value(
            "running average window is longer than the series",
        ));
    }

    debug!("Running average of {} over {} steps with {:?} edges", grid.name(), length, edge);

    let half = (length / 2) as i64;
    let even = if length % 2 == 0 { 1 } else { 0 };
    let n = steps as i64;

    let values = grid.map_lanes(GridAxis::Time, |input, mut output| {
        for t in 0..n {
            let start = t + even - half;

            let mut sum = 0.0;
            let mut weight_sum = 0.0;
            let mut outside = false;

            for (slot, weight) in weights.iter().enumerate() {
                match edge.resolve(start + slot as i64, n) {
                    Some(k) if !input[k].is_nan() => {
                        sum += weight * input[k];
                        weight_sum += weight;
                    }
                    Some(_) => (),
                    None => outside = true,
                }
            }

            output[t as usize] = if outside || weight_sum == 0.0 {
                Float::NAN
            } else {
                sum / weight_sum
            };
        }
    });

    grid.with_values(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use float_cmp::approx_eq;
    use ndarray::Axis;

    fn lane(grid: &Grid) -> Vec<Float> {
        grid.values().lanes(Axis(0)).into_iter().next().unwrap().to_vec()
    }

    fn ramp(count: usize) -> Grid {
        series("T", "K", unit_domain(1, 1), monthly_times(2000, 1, count), |t, _, _| t as Float)
    }

    #[test]
    fn edges_are_missing() {
        let averaged = running_average(&ramp(5), 3, EdgePolicy::SetMissing).unwrap();
        let values = lane(&averaged);

        assert!(values[0].is_nan());
        assert_eq!(&values[1..4], &[1.0, 2.0, 3.0]);
        assert!(values[4].is_nan());
    }

    #[test]
    fn symmetric_and_cyclic_edges() {
        let symmetric = lane(&running_average(&ramp(4), 3, EdgePolicy::SymmetricReflect).unwrap());
        assert!(approx_eq!(Float, symmetric[0], 2.0 / 3.0, ulps = 2));
        assert!(approx_eq!(Float, symmetric[3], 7.0 / 3.0, ulps = 2));

        let cyclic = lane(&running_average(&ramp(4), 3, "cyclic".parse().unwrap()).unwrap());
        assert!(approx_eq!(Float, cyclic[0], 4.0 / 3.0, ulps = 2));
        assert!(approx_eq!(Float, cyclic[3], 5.0 / 3.0, ulps = 2));
    }

    #[test]
    fn even_window_leans_forward() {
        let averaged = lane(&running_average(&ramp(6), 4, EdgePolicy::SetMissing).unwrap());

        assert!(averaged[0].is_nan());
        assert_eq!(averaged[1], 1.5);
        assert_eq!(averaged[3], 3.5);
        assert!(averaged[4].is_nan());
    }

    #[test]
    fn weights_and_missing_values() {
        let grid = series("T", "K", unit_domain(1, 1), monthly_times(2000, 1, 5), |t, _, _| {
            if t == 2 {
                Float::NAN
            } else {
                t as Float
            }
        });

        let averaged = lane(&weighted_running_average(&grid, &[1.0, 2.0, 1.0], EdgePolicy::SetMissing).unwrap());
        assert!(approx_eq!(Float, averaged[1], 2.0 / 3.0, ulps = 2));
        assert_eq!(averaged[2], 2.0);
        // (2 * 3 + 4) / 3
        assert!(approx_eq!(Float, averaged[3], 10.0 / 3.0, ulps = 2));
    }

    #[test]
    fn window_limits() {
        assert!(matches!(
            running_average(&ramp(3), 4, EdgePolicy::Cyclic),
            Err(GridError::Value(_))
        ));
        assert!(running_average(&ramp(3), 0, EdgePolicy::Cyclic).is_err());

        let unchanged = running_average(&ramp(3), 1, EdgePolicy::SetMissing).unwrap();
        assert_eq!(lane(&unchanged), vec![0.0, 1.0, 2.0]);
    }
}
