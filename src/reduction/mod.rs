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

//! Reductions of grids along time, ensemble, level and horizontal axes.
//!
//! Statistics skip missing values. A lane with no valid values
//! reduces to a missing value.

pub mod axis;
pub mod climatology;
pub mod ensemble;
mod probability;
pub mod running;
pub mod time;
pub mod vertical;

pub use axis::{along_axis, over_levels, AxisStat};
pub use climatology::{
    climatology_monthly, daily_anomaly, daily_climatology, monthly_anomaly, ClimatologyStat,
};
pub use ensemble::{
    ens_max, ens_mean, ens_min, ens_mode, ens_percentile, ens_range, ens_stdev,
};
pub use probability::{ens_probability, Combinator};
pub use running::{running_average, weighted_running_average, EdgePolicy};

use crate::Float;
use ndarray::ArrayView1;

fn valid<'a>(lane: &'a ArrayView1<Float>) -> impl Iterator<Item = Float> + 'a {
    lane.iter().copied().filter(|v| !v.is_nan())
}

pub(crate) fn nan_sum(lane: ArrayView1<Float>) -> Float {
    let (sum, count) = valid(&lane).fold((0.0, 0), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        Float::NAN
    } else {
        sum
    }
}

pub(crate) fn nan_mean(lane: ArrayView1<Float>) -> Float {
    let (sum, count) = valid(&lane).fold((0.0, 0), |(s, c), v| (s + v, c + 1));

    if count == 0 {
        Float::NAN
    } else {
        sum / count as Float
    }
}

/// Population standard deviation.
pub(crate) fn nan_std(lane: ArrayView1<Float>) -> Float {
    let mean = nan_mean(lane.view());

    if mean.is_nan() {
        return Float::NAN;
    }

    let (sum, count) = valid(&lane).fold((0.0, 0), |(s, c), v| (s + (v - mean).powi(2), c + 1));

    (sum / count as Float).sqrt()
}

// Float::min and Float::max return the other operand for NaN
pub(crate) fn nan_min(lane: ArrayView1<Float>) -> Float {
    lane.iter().copied().fold(Float::NAN, Float::min)
}

pub(crate) fn nan_max(lane: ArrayView1<Float>) -> Float {
    lane.iter().copied().fold(Float::NAN, Float::max)
}
