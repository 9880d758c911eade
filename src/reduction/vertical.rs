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

//! Slices, layers and integrals along the vertical axis.

use crate::algebra;
use crate::constants::GRAVITY;
use crate::errors::{GridError, SearchError};
use crate::grid::{Grid, GridAxis, LevelAxis};
use crate::units::{parse_unit, Unit};
use crate::Float;
use log::debug;
use ndarray::Zip;

fn level_axis(grid: &Grid) -> Result<&LevelAxis, GridError> {
    grid.levels().ok_or(GridError::MissingAxis("level"))
}

/// Horizontal slice at `level`, interpolated linearly
/// between the enclosing levels when not on the axis.
pub fn slice_at_level(grid: &Grid, level: Float) -> Result<Grid, GridError> {
    let levels = level_axis(grid)?;

    if let Some(i) = levels.index_of(level) {
        return grid.get_sample(GridAxis::Level, i);
    }

    let (lower, upper, weight) = levels.bracket(level).map_err(|e| match e {
        GridError::Search(SearchError::OutOfBounds) => {
            let first = levels.values()[0];
            let last = levels.values()[levels.len() - 1];
            // beyond the first level or beyond the last one
            let index = if (level - first).abs() < (level - last).abs() { -1 } else { levels.len() as i64 };

            GridError::IndexOutOfRange {
                axis: "level",
                index,
                length: levels.len(),
            }
        }
        other => other,
    })?;

    debug!(
        "Interpolating {} to level {} between levels {} and {}",
        grid.name(),
        level,
        levels.values()[lower],
        levels.values()[upper]
    );

    let below = grid.get_sample(GridAxis::Level, lower)?;
    let above = grid.get_sample(GridAxis::Level, upper)?;

    let mut values = below.values().clone();
    Zip::from(&mut values)
        .and(above.values())
        .par_for_each(|a, &b| *a += weight * (b - *a));

    below.with_values(values)
}

fn layer_name(grid: &Grid, tag: &str, top: Float, bottom: Float) -> String {
    format!("{}_{}_{}-{}", grid.name(), tag, top, bottom)
}

/// Slices at two levels given in `level_unit`, or in the unit
/// of the level axis when `None`.
fn layer_slices(
    grid: &Grid,
    top: Float,
    bottom: Float,
    level_unit: Option<&Unit>,
) -> Result<(Grid, Grid), GridError> {
    let (top, bottom) = match level_unit {
        Some(unit) => {
            let conversion = unit.conversion_to(level_axis(grid)?.unit())?;
            (conversion.apply(top), conversion.apply(bottom))
        }
        None => (top, bottom),
    };

    Ok((slice_at_level(grid, top)?, slice_at_level(grid, bottom)?))
}

/// Mean of the slices at two levels.
pub fn layer_average(
    grid: &Grid,
    top: Float,
    bottom: Float,
    level_unit: Option<&Unit>,
) -> Result<Grid, GridError> {
    let (upper, lower) = layer_slices(grid, top, bottom, level_unit)?;
    let sum = algebra::add(&upper, &lower)?;

    Ok(algebra::scale(&sum, 0.5).rename(&layer_name(grid, "LAV", top, bottom), None))
}

/// Slice at `top` minus slice at `bottom`.
pub fn layer_difference(
    grid: &Grid,
    top: Float,
    bottom: Float,
    level_unit: Option<&Unit>,
) -> Result<Grid, GridError> {
    let (upper, lower) = layer_slices(grid, top, bottom, level_unit)?;
    let difference = algebra::sub(&upper, &lower)?;

    Ok(difference.rename(&layer_name(grid, "LDF", top, bottom), None))
}

/// Thickness represented by every level: half the distance between
/// its neighbours, or the distance to the only neighbour at the ends.
fn level_thickness(levels: &[Float]) -> Vec<Float> {
    let n = levels.len();

    if n < 2 {
        return vec![1.0; n];
    }

    (0..n)
        .map(|i| match i {
            0 => (levels[1] - levels[0]).abs(),
            _ if i == n - 1 => (levels[n - 2] - levels[n - 1]).abs(),
            _ => (levels[i + 1] - levels[i - 1]).abs() / 2.0,
        })
        .collect()
}

/// Mean over the column weighted by the thickness of levels.
///
/// Missing values are skipped and the weights renormalised.
pub fn vertical_weighted_average(grid: &Grid) -> Result<Grid, GridError> {
    let weights = level_thickness(level_axis(grid)?.values());

    let values = grid.reduce_lanes(GridAxis::Level, |column| {
        let (sum, weight) = column
            .iter()
            .zip(&weights)
            .filter(|(v, _)| !v.is_nan())
            .fold((0.0, 0.0), |(s, w), (v, dw)| (s + v * dw, w + dw));

        if weight == 0.0 {
            Float::NAN
        } else {
            sum / weight
        }
    });

    grid.with_domain(grid.domain_without(GridAxis::Level), values)
}

fn column_integral(grid: &Grid, factor: Float) -> Result<Grid, GridError> {
    let levels = level_axis(grid)?;
    let weights = level_thickness(levels.values());

    let values = grid.reduce_lanes(GridAxis::Level, |column| {
        column.iter().zip(&weights).map(|(v, dz)| v * dz).sum::<Float>() * factor
    });

    Ok(grid
        .with_domain(grid.domain_without(GridAxis::Level), values)?
        .rename(
            &format!("{}_vertical_integral", grid.name()),
            Some(grid.unit().mul(levels.unit())),
        ))
}

/// Sum of values times level thickness over the column.
pub fn vertical_integral(grid: &Grid) -> Result<Grid, GridError> {
    column_integral(grid, 1.0)
}

/// Mass weighted column integral `1/g * sum(value * dp)`,
/// levels must be expressed in pressure units.
pub fn pressure_vertical_integral(grid: &Grid) -> Result<Grid, GridError> {
    if !level_axis(grid)?.unit().is_compatible(&parse_unit("Pa")?) {
        return Err(GridError::Value("levels of pressure integral must be pressures"));
    }

    let integral = column_integral(grid, 1.0 / GRAVITY)?;
    let acceleration = Unit::metre().div(&Unit::second().powi(2)?);
    let unit = integral.unit().div(&acceleration);
    let name = integral.name().to_string();

    Ok(integral.rename(&name, Some(unit)))
}
