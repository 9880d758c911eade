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

//! Unweighted statistics over the levels or along a horizontal axis.

use super::{nan_max, nan_mean, nan_min, nan_sum};
use crate::errors::GridError;
use crate::grid::{Grid, GridAxis};
use crate::Float;
use log::debug;
use ndarray::ArrayView1;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum AxisStat {
    Average,
    Sum,
    Min,
    Max,
}

impl AxisStat {
    fn name(self) -> &'static str {
        match self {
            AxisStat::Average => "average",
            AxisStat::Sum => "sum",
            AxisStat::Min => "min",
            AxisStat::Max => "max",
        }
    }

    fn apply(self, lane: ArrayView1<Float>) -> Float {
        match self {
            AxisStat::Average => nan_mean(lane),
            AxisStat::Sum => nan_sum(lane),
            AxisStat::Min => nan_min(lane),
            AxisStat::Max => nan_max(lane),
        }
    }
}

impl FromStr for AxisStat {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "average" | "mean" => Ok(AxisStat::Average),
            "sum" => Ok(AxisStat::Sum),
            "min" => Ok(AxisStat::Min),
            "max" => Ok(AxisStat::Max),
            _ => Err(GridError::Value("unknown statistic, use average, sum, min or max")),
        }
    }
}

/// Statistic over all levels of every column, named `<name>_<stat>`.
///
/// A grid without levels is treated as a single level column.
pub fn over_levels(grid: &Grid, stat: AxisStat) -> Result<Grid, GridError> {
    debug!(
        "Computing {} of {} over {} levels",
        stat.name(),
        grid.name(),
        grid.domain_length(GridAxis::Level).max(1)
    );

    let values = grid.reduce_lanes(GridAxis::Level, |column| stat.apply(column));
    let name = format!("{}_{}", grid.name(), stat.name());

    Ok(grid
        .with_domain(grid.domain_without(GridAxis::Level), values)?
        .rename(&name, None))
}

/// Replaces every row (`X`) or column (`Y`) by its statistic,
/// keeping missing points missing. Named `<name>_<axis><stat>`,
/// for example `T_Xaverage` for the zonal mean.
pub fn along_axis(grid: &Grid, axis: GridAxis, stat: AxisStat) -> Result<Grid, GridError> {
    if axis != GridAxis::X && axis != GridAxis::Y {
        return Err(GridError::Value("statistics along an axis need the x or y axis"));
    }

    let values = grid.map_lanes(axis, |lane, mut output| {
        let result = stat.apply(lane);
        for (out, v) in output.iter_mut().zip(lane) {
            *out = if v.is_nan() { Float::NAN } else { result };
        }
    });

    let name = format!("{}_{}{}", grid.name(), axis.name().to_uppercase(), stat.name());

    Ok(grid.with_values(values)?.rename(&name, None))
}
