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

//! Statistics across ensemble members.
//!
//! Every reduction removes the ensemble axis and leaves
//! the other axes intact. Grids which are not ensembles
//! are returned unchanged.

use super::{nan_max, nan_mean, nan_min, nan_std};
use crate::errors::GridError;
use crate::grid::{Grid, GridAxis};
use crate::Float;
use log::debug;
use ndarray::ArrayView1;
use rustc_hash::FxHashMap;

fn over_members<F>(grid: &Grid, name: Option<&str>, f: F) -> Result<Grid, GridError>
where
    F: Fn(ArrayView1<Float>) -> Float + Sync + Send,
{
    if !grid.is_ensemble() {
        return Ok(grid.clone());
    }

    debug!(
        "Reducing {} members of {}",
        grid.domain_length(GridAxis::Ensemble),
        grid.name()
    );

    let values = grid.reduce_lanes(GridAxis::Ensemble, f);
    let reduced = grid.with_domain(grid.domain_without(GridAxis::Ensemble), values)?;

    Ok(match name {
        Some(suffix) => reduced.rename(&format!("{}_{}", grid.name(), suffix), None),
        None => reduced,
    })
}

pub fn ens_mean(grid: &Grid) -> Result<Grid, GridError> {
    over_members(grid, None, nan_mean)
}

/// Population standard deviation of the members.
pub fn ens_stdev(grid: &Grid) -> Result<Grid, GridError> {
    over_members(grid, Some("stdev"), nan_std)
}

pub fn ens_min(grid: &Grid) -> Result<Grid, GridError> {
    over_members(grid, None, nan_min)
}

pub fn ens_max(grid: &Grid) -> Result<Grid, GridError> {
    over_members(grid, None, nan_max)
}

/// Spread between the largest and smallest member.
pub fn ens_range(grid: &Grid) -> Result<Grid, GridError> {
    over_members(grid, Some("range"), |lane| nan_max(lane.view()) - nan_min(lane))
}

/// Percentile `p` (in %) of the members at every point.
///
/// Uses the `p * (n + 1) / 100` position with linear interpolation
/// between order statistics, positions outside the sample take
/// the smallest or the largest member.
pub fn ens_percentile(grid: &Grid, p: Float) -> Result<Grid, GridError> {
    if !(p > 0.0 && p <= 100.0) {
        return Err(GridError::Value("percentile must be in (0, 100]"));
    }

    over_members(grid, None, |lane| percentile(lane, p))
}

fn percentile(lane: ArrayView1<Float>, p: Float) -> Float {
    let mut sorted: Vec<Float> = lane.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(Float::total_cmp);

    let n = sorted.len();
    match n {
        0 => return Float::NAN,
        1 => return sorted[0],
        _ => (),
    }

    let position = p * (n + 1) as Float / 100.0;

    if position < 1.0 {
        sorted[0]
    } else if position >= n as Float {
        sorted[n - 1]
    } else {
        let lower = position.floor();
        let fraction = position - lower;
        let i = lower as usize - 1;

        sorted[i] + fraction * (sorted[i + 1] - sorted[i])
    }
}

/// Most frequent member value, the first one encountered on ties.
pub fn ens_mode(grid: &Grid) -> Result<Grid, GridError> {
    over_members(grid, None, mode)
}

fn mode(lane: ArrayView1<Float>) -> Float {
    let mut counts: FxHashMap<u64, usize> = FxHashMap::default();
    for v in lane.iter().filter(|v| !v.is_nan()) {
        *counts.entry(v.to_bits()).or_insert(0) += 1;
    }

    let mut best = Float::NAN;
    let mut best_count = 0;
    for v in lane.iter().filter(|v| !v.is_nan()) {
        let count = counts[&v.to_bits()];
        if count > best_count {
            best = *v;
            best_count = count;
        }
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use float_cmp::approx_eq;
    use ndarray::array;

    #[test]
    fn member_statistics() {
        let grid = ensemble("T", "K", unit_domain(2, 2), &[1.0, 2.0, Float::NAN, 6.0]);

        let mean = ens_mean(&grid).unwrap();
        assert!(!mean.is_ensemble());
        assert_eq!(mean.shape(), [1, 1, 1, 2, 2]);
        assert!(mean.values().iter().all(|v| *v == 3.0));

        assert!(ens_min(&grid).unwrap().values().iter().all(|v| *v == 1.0));
        assert!(ens_max(&grid).unwrap().values().iter().all(|v| *v == 6.0));

        let range = ens_range(&grid).unwrap();
        assert_eq!(range.name(), "T_range");
        assert!(range.values().iter().all(|v| *v == 5.0));

        let spread = ens_stdev(&grid).unwrap();
        assert!(spread
            .values()
            .iter()
            .all(|v| approx_eq!(Float, *v, (14.0_f64 / 3.0).sqrt(), ulps = 4)));
    }

    #[test]
    fn percentiles() {
        let lane = array![4.0, 1.0, 3.0, 2.0];

        assert_eq!(percentile(lane.view(), 50.0), 2.5);
        assert_eq!(percentile(lane.view(), 10.0), 1.0);
        assert_eq!(percentile(lane.view(), 90.0), 4.0);
        assert_eq!(percentile(array![7.0].view(), 30.0), 7.0);

        let grid = ensemble("T", "K", unit_domain(1, 1), &[4.0, 1.0, 3.0, 2.0]);
        assert_eq!(ens_percentile(&grid, 40.0).unwrap().values()[[0, 0, 0, 0, 0]], 2.0);
        assert!(matches!(ens_percentile(&grid, 0.0), Err(GridError::Value(_))));
        assert!(ens_percentile(&grid, 100.5).is_err());
    }

    #[test]
    fn most_frequent_member() {
        assert_eq!(mode(array![3.0, 1.0, 1.0, 3.0, 2.0].view()), 3.0);
        assert_eq!(mode(array![Float::NAN, 2.0, 5.0, 5.0].view()), 5.0);
        assert!(mode(array![Float::NAN].view()).is_nan());

        let plain = field("T", "K", unit_domain(2, 2), |x, _| x);
        assert_eq!(ens_mode(&plain).unwrap().values(), plain.values());
    }
}
