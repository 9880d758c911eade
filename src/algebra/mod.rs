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

//! Elementwise grid algebra.
//!
//! Binary operators resample the right operand onto the spatial domain
//! of the left one when the domains differ and broadcast non-spatial
//! axes present in only one operand. Units are carried through:
//! additive operators convert the right operand to the left operand's
//! unit, multiplicative ones combine units.
//!
//! [`rescale`] does not clamp values outside the input range.
//! To keep the output within bounds mask the input first:
//! `rescale(mul(mask(x, Lt, t, 0), x), 0, t, 0, 10)`.

mod composite;
mod random;
mod resample;
mod smooth;

pub use composite::{combine_rgb, compose_rgb, ChannelScaling, ColorComposite, ProductPreset};
pub use random::{fill_normal, fill_uniform};
pub use resample::{resample_grid, Interpolation};
pub use smooth::{smooth, Smoother};

use crate::errors::GridError;
use crate::grid::{CoordinateKind, Grid, GridAxis, Parameter, StackedAxis};
use crate::units::{Conversion, Unit};
use crate::Float;
use log::debug;
use ndarray::{Array2, Zip};
use std::borrow::Cow;
use std::str::FromStr;

/// Comparison applied by masks and ensemble probabilities.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Comparator {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparator {
    pub fn test(self, value: Float, threshold: Float) -> bool {
        match self {
            Comparator::Lt => value < threshold,
            Comparator::Le => value <= threshold,
            Comparator::Gt => value > threshold,
            Comparator::Ge => value >= threshold,
            Comparator::Eq => value == threshold,
            Comparator::Ne => value != threshold,
        }
    }
}

impl FromStr for Comparator {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "lt" | "<" => Ok(Comparator::Lt),
            "le" | "<=" => Ok(Comparator::Le),
            "gt" | ">" => Ok(Comparator::Gt),
            "ge" | ">=" => Ok(Comparator::Ge),
            "eq" | "==" | "=" => Ok(Comparator::Eq),
            "ne" | "!=" => Ok(Comparator::Ne),
            _ => Err(GridError::Value("unknown comparison operator")),
        }
    }
}

#[derive(Copy, Clone, Debug)]
enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Atan2,
}

impl BinaryOp {
    fn apply(self, a: Float, b: Float) -> Float {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Atan2 => a.atan2(b),
        }
    }
}

/// Returns `source` on the spatial domain of `target`, resampling if needed.
pub(crate) fn aligned<'a>(
    target: &Grid,
    source: &'a Grid,
    mode: Interpolation,
) -> Result<Cow<'a, Grid>, GridError> {
    if source.spatial().matches(target.spatial()) {
        Ok(Cow::Borrowed(source))
    } else {
        debug!(
            "Resampling {} onto domain of {} with {:?}",
            source.name(),
            target.name(),
            mode
        );
        Ok(Cow::Owned(resample_grid(source, target.spatial(), mode)?))
    }
}

fn combine(a: &Grid, b: &Grid, mode: Interpolation, op: BinaryOp) -> Result<Grid, GridError> {
    let b = aligned(a, b, mode)?;

    let (unit, conversion) = match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Atan2 if a.unit().is_promiscuous() => {
            (b.unit().clone(), Conversion::identity())
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Atan2 => {
            (a.unit().clone(), b.unit().conversion_to(a.unit())?)
        }
        BinaryOp::Mul => (a.unit().mul(b.unit()), Conversion::identity()),
        BinaryOp::Div => (a.unit().div(b.unit()), Conversion::identity()),
    };

    let unit = match op {
        BinaryOp::Atan2 => Unit::radian(),
        _ => unit,
    };

    let domain = a.domain().broadcast(b.domain())?;
    let shape = domain.shape();

    let left = a
        .values()
        .broadcast(shape)
        .ok_or(GridError::DomainMismatch("left operand cannot be broadcast"))?;
    let right = b
        .values()
        .broadcast(shape)
        .ok_or(GridError::DomainMismatch("right operand cannot be broadcast"))?;

    let values = Zip::from(&left)
        .and(&right)
        .par_map_collect(|&x, &y| op.apply(x, conversion.apply(y)));

    Grid::new(Parameter::new(a.name(), unit), domain, values)
}

pub fn add(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    add_with(a, b, Interpolation::default())
}

pub fn sub(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    sub_with(a, b, Interpolation::default())
}

pub fn mul(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    mul_with(a, b, Interpolation::default())
}

pub fn div(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    div_with(a, b, Interpolation::default())
}

pub fn atan2(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    atan2_with(a, b, Interpolation::default())
}

pub fn add_with(a: &Grid, b: &Grid, mode: Interpolation) -> Result<Grid, GridError> {
    combine(a, b, mode, BinaryOp::Add)
}

pub fn sub_with(a: &Grid, b: &Grid, mode: Interpolation) -> Result<Grid, GridError> {
    combine(a, b, mode, BinaryOp::Sub)
}

pub fn mul_with(a: &Grid, b: &Grid, mode: Interpolation) -> Result<Grid, GridError> {
    combine(a, b, mode, BinaryOp::Mul)
}

pub fn div_with(a: &Grid, b: &Grid, mode: Interpolation) -> Result<Grid, GridError> {
    combine(a, b, mode, BinaryOp::Div)
}

pub fn atan2_with(a: &Grid, b: &Grid, mode: Interpolation) -> Result<Grid, GridError> {
    combine(a, b, mode, BinaryOp::Atan2)
}

pub fn scale(grid: &Grid, factor: Float) -> Grid {
    grid.map(|v| v * factor)
}

pub fn offset(grid: &Grid, shift: Float) -> Grid {
    grid.map(|v| v + shift)
}

pub fn negate(grid: &Grid) -> Grid {
    grid.map(|v| -v)
}

pub fn abs(grid: &Grid) -> Grid {
    grid.map(Float::abs)
}

/// Raises values to `power`; units follow integer powers,
/// other powers of dimensional quantities drop the unit.
/// So do integer powers beyond the exponent range of units.
pub fn powf(grid: &Grid, power: Float) -> Grid {
    let unit = if power.fract() == 0.0 {
        grid.unit().powi(power as i32).unwrap_or_else(|e| {
            debug!("Unit of {} dropped: {}", grid.name(), e);
            Unit::promiscuous()
        })
    } else if grid.unit().is_dimensionless() {
        grid.unit().clone()
    } else {
        debug!("Unit of {} dropped by fractional power {}", grid.name(), power);
        Unit::promiscuous()
    };

    grid.map(|v| v.powf(power)).rename(grid.name(), Some(unit))
}

pub fn sqrt(grid: &Grid) -> Grid {
    let unit = grid.unit().root(2).unwrap_or_else(Unit::promiscuous);

    grid.map(Float::sqrt).rename(grid.name(), Some(unit))
}

pub fn sin(grid: &Grid) -> Result<Grid, GridError> {
    let radians = grid.convert_to(&Unit::radian())?;

    Ok(radians
        .map(Float::sin)
        .rename(grid.name(), Some(Unit::dimensionless())))
}

pub fn cos(grid: &Grid) -> Result<Grid, GridError> {
    let radians = grid.convert_to(&Unit::radian())?;

    Ok(radians
        .map(Float::cos)
        .rename(grid.name(), Some(Unit::dimensionless())))
}

/// Arcus sine in radians, values outside [-1, 1] give missing values.
pub fn asin(grid: &Grid) -> Result<Grid, GridError> {
    let ratio = grid.convert_to(&Unit::dimensionless())?;

    Ok(ratio
        .map(Float::asin)
        .rename(grid.name(), Some(Unit::radian())))
}

/// Returns a grid holding 1 where `comparator` holds against `threshold`
/// and `fill` elsewhere, missing values stay missing.
///
/// The mask has no unit, so multiplying a grid by its mask keeps the grid unit.
pub fn mask(grid: &Grid, comparator: Comparator, threshold: Float, fill: Float) -> Grid {
    grid.map(|v| {
        if v.is_nan() {
            v
        } else if comparator.test(v, threshold) {
            1.0
        } else {
            fill
        }
    })
    .rename(&format!("{}_mask", grid.name()), Some(Unit::promiscuous()))
}

/// Keeps values passing the comparison and replaces the others by `fill`.
pub fn mask_values(grid: &Grid, comparator: Comparator, threshold: Float, fill: Float) -> Grid {
    grid.map(|v| {
        if v.is_nan() || comparator.test(v, threshold) {
            v
        } else {
            fill
        }
    })
}

/// Limits values to `[lower, upper]`.
pub fn clip(grid: &Grid, lower: Float, upper: Float) -> Result<Grid, GridError> {
    if !(lower.is_finite() && upper.is_finite()) || lower > upper {
        return Err(GridError::Value("clipping bounds must be finite and ordered"));
    }

    Ok(grid.map(|v| if v.is_nan() { v } else { v.clamp(lower, upper) }))
}

/// Maps `[in_min, in_max]` linearly onto `[out_min, out_max]`.
/// Values outside the input range are extrapolated, not clamped.
pub fn rescale(
    grid: &Grid,
    in_min: Float,
    in_max: Float,
    out_min: Float,
    out_max: Float,
) -> Result<Grid, GridError> {
    if in_min == in_max || !in_min.is_finite() || !in_max.is_finite() {
        return Err(GridError::Value("rescale input range must be finite and non-empty"));
    }

    let factor = (out_max - out_min) / (in_max - in_min);

    Ok(grid
        .map(|v| out_min + (v - in_min) * factor)
        .rename(grid.name(), Some(Unit::dimensionless())))
}

/// Gamma correction to the 0-255 range: `255 * rescale(x, in_min, in_max, 0, 1) ^ (1 / gamma)`.
///
/// Input outside the range gives values outside 0-255
/// (or missing for negative bases), clip first to avoid it.
pub fn gamma(grid: &Grid, in_min: Float, in_max: Float, gamma: Float) -> Result<Grid, GridError> {
    if !(gamma > 0.0) || !gamma.is_finite() {
        return Err(GridError::Value("gamma must be positive"));
    }

    let unit_range = rescale(grid, in_min, in_max, 0.0, 1.0)?;
    let exponent = 1.0 / gamma;

    Ok(unit_range.map(|v| 255.0 * v.powf(exponent)))
}

/// Applies a function to every value of the grid.
pub fn apply_to_range<F>(grid: &Grid, f: F) -> Grid
where
    F: Fn(Float) -> Float + Sync + Send,
{
    grid.map(f)
}

/// Applies a grid operator separately to every sample along a
/// time, level or ensemble axis and restores the axis.
pub fn apply_to_samples<F>(grid: &Grid, axis: GridAxis, f: F) -> Result<Grid, GridError>
where
    F: Fn(&Grid) -> Result<Grid, GridError>,
{
    let coordinates = match axis {
        GridAxis::Time => grid.times().cloned().map(StackedAxis::Time),
        GridAxis::Level => grid.levels().cloned().map(StackedAxis::Levels),
        GridAxis::Ensemble => grid.ensemble().cloned().map(StackedAxis::Ensemble),
        GridAxis::Y | GridAxis::X => {
            return Err(GridError::Value("operators cannot be applied along spatial axes"))
        }
    };

    let coordinates = match coordinates {
        Some(coordinates) => coordinates,
        None => return f(grid),
    };

    let samples = (0..grid.domain_length(axis))
        .map(|i| f(&grid.get_sample(axis, i)?))
        .collect::<Result<Vec<_>, _>>()?;

    Grid::stack(&samples, coordinates)
}

/// Squared difference of two grids.
pub fn mse(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    let difference = sub(a, b)?;
    let squared = mul(&difference, &difference)?;

    Ok(squared.rename(&format!("{}_MSE", a.name()), None))
}

/// Absolute difference of two grids.
pub fn mae(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    let difference = sub(a, b)?;

    Ok(abs(&difference).rename(&format!("{}_MAE", a.name()), None))
}

/// Area weights of horizontal points, `cos(latitude)` on lon/lat domains.
fn area_weights(grid: &Grid) -> Array2<Float> {
    let spatial = grid.spatial();

    Array2::from_shape_fn((spatial.ny(), spatial.nx()), |(j, _)| {
        match spatial.kind() {
            CoordinateKind::LonLat => spatial.y()[j].to_radians().cos(),
            CoordinateKind::Cartesian => 1.0,
        }
    })
}

/// Replaces every horizontal field with its area-weighted mean,
/// missing values do not contribute.
pub fn spatial_mean(grid: &Grid) -> Result<Grid, GridError> {
    let weights = area_weights(grid);
    let spatial = grid.spatial();

    let values = grid.map_planes((spatial.ny(), spatial.nx()), |field, mut output| {
        let (sum, total) = Zip::from(&field)
            .and(&weights)
            .fold((0.0, 0.0), |(sum, total), &v, &w| {
                if v.is_nan() {
                    (sum, total)
                } else {
                    (sum + v * w, total + w)
                }
            });

        let mean = if total > 0.0 { sum / total } else { Float::NAN };
        output.fill(mean);
    })?;

    grid.with_values(values)
}

/// Deviation of values from the spatial mean of their field.
pub fn deviation_xy(grid: &Grid) -> Result<Grid, GridError> {
    let mean = spatial_mean(grid)?;
    sub(grid, &mean)
}
