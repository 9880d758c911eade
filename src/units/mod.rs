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

//! Physical units attached to grid parameters.
//!
//! A [`Unit`] is stored as exponents of the seven SI base dimensions
//! together with a scale and an additive offset relative to the coherent
//! SI unit, so any two units with equal dimensions are convertible.
//! A *promiscuous* unit is a marker for values without physical meaning
//! (ratios, statistics, masks): it is compatible with every other unit
//! in additive operations and transparent in multiplicative ones.

mod parser;

use crate::errors::UnitError;
use crate::grid::Grid;
use crate::Float;
use float_cmp::approx_eq;
use log::{debug, warn};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

pub use parser::parse_unit;

/// Exponents of SI base dimensions in order: metre, kilogram, second,
/// kelvin, ampere, mole, candela.
pub type Dimensions = [i8; 7];

pub(crate) const DIMENSIONLESS: Dimensions = [0; 7];

#[derive(Clone, Debug, Serialize)]
pub struct Unit {
    symbol: String,
    dimensions: Dimensions,
    scale: Float,
    offset: Float,
    promiscuous: bool,
}

/// Linear transformation of values between two compatible units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Conversion {
    factor: Float,
    shift: Float,
}

impl Conversion {
    pub fn identity() -> Self {
        Conversion {
            factor: 1.0,
            shift: 0.0,
        }
    }

    pub fn apply(&self, value: Float) -> Float {
        value * self.factor + self.shift
    }

    pub fn is_identity(&self) -> bool {
        self.factor == 1.0 && self.shift == 0.0
    }
}

impl Unit {
    pub fn new(symbol: &str, dimensions: Dimensions, scale: Float, offset: Float) -> Self {
        Unit {
            symbol: symbol.to_string(),
            dimensions,
            scale,
            offset,
            promiscuous: false,
        }
    }

    pub fn dimensionless() -> Self {
        Unit::new("1", DIMENSIONLESS, 1.0, 0.0)
    }

    pub fn promiscuous() -> Self {
        Unit {
            symbol: String::new(),
            dimensions: DIMENSIONLESS,
            scale: 1.0,
            offset: 0.0,
            promiscuous: true,
        }
    }

    pub fn metre() -> Self {
        Unit::new("m", [1, 0, 0, 0, 0, 0, 0], 1.0, 0.0)
    }

    pub fn second() -> Self {
        Unit::new("s", [0, 0, 1, 0, 0, 0, 0], 1.0, 0.0)
    }

    pub fn kelvin() -> Self {
        Unit::new("K", [0, 0, 0, 1, 0, 0, 0], 1.0, 0.0)
    }

    pub fn radian() -> Self {
        Unit::new("rad", DIMENSIONLESS, 1.0, 0.0)
    }

    pub fn degree() -> Self {
        Unit::new("degree", DIMENSIONLESS, std::f64::consts::PI / 180.0, 0.0)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    pub fn scale(&self) -> Float {
        self.scale
    }

    pub fn offset(&self) -> Float {
        self.offset
    }

    pub fn is_promiscuous(&self) -> bool {
        self.promiscuous
    }

    pub fn is_dimensionless(&self) -> bool {
        self.dimensions == DIMENSIONLESS
    }

    /// Units are compatible when values of one can be expressed in the other.
    pub fn is_compatible(&self, other: &Unit) -> bool {
        self.promiscuous || other.promiscuous || self.dimensions == other.dimensions
    }

    /// Returns the same unit displayed with a different symbol.
    pub fn with_symbol(mut self, symbol: &str) -> Self {
        self.symbol = symbol.to_string();
        self
    }

    pub fn mul(&self, other: &Unit) -> Unit {
        if self.promiscuous {
            return other.clone();
        }
        if other.promiscuous {
            return self.clone();
        }

        let dimensions = match combine(&self.dimensions, &other.dimensions, i8::checked_add) {
            Some(d) => d,
            None => {
                warn!("Product of {} and {} exceeds exponent range, unit dropped", self, other);
                return Unit::promiscuous();
            }
        };

        let symbol = match (self.symbol.as_str(), other.symbol.as_str()) {
            ("1", s) | (s, "1") => s.to_string(),
            (a, b) => format!("{} {}", a, wrap_compound(b)),
        };

        Unit::new(&symbol, dimensions, self.scale * other.scale, 0.0)
    }

    pub fn div(&self, other: &Unit) -> Unit {
        if other.promiscuous {
            return self.clone();
        }
        if self.promiscuous {
            return Unit::dimensionless().div(other);
        }

        let dimensions = match combine(&self.dimensions, &other.dimensions, i8::checked_sub) {
            Some(d) => d,
            None => {
                warn!("Quotient of {} and {} exceeds exponent range, unit dropped", self, other);
                return Unit::promiscuous();
            }
        };

        let symbol = match (self.symbol.as_str(), other.symbol.as_str()) {
            (a, "1") => a.to_string(),
            (a, b) => format!("{}/{}", a, wrap_compound(b)),
        };

        Unit::new(&symbol, dimensions, self.scale / other.scale, 0.0)
    }

    /// Integer power of the unit.
    ///
    /// Fails when an exponent leaves the range of [`Dimensions`].
    pub fn powi(&self, n: i32) -> Result<Unit, UnitError> {
        if self.promiscuous || n == 1 {
            return Ok(self.clone());
        }
        if n == 0 {
            return Ok(Unit::dimensionless());
        }

        let out_of_range = || UnitError::Exponent(self.symbol.clone(), n);
        let factor = i8::try_from(n).map_err(|_| out_of_range())?;

        let mut dimensions = DIMENSIONLESS;
        for (i, d) in dimensions.iter_mut().enumerate() {
            *d = self.dimensions[i].checked_mul(factor).ok_or_else(out_of_range)?;
        }

        let symbol = if self.symbol.chars().all(char::is_alphabetic) {
            format!("{}{}", self.symbol, n)
        } else {
            format!("({})^{}", self.symbol, n)
        };

        Ok(Unit::new(&symbol, dimensions, self.scale.powi(n), 0.0))
    }

    /// Returns the n-th root of the unit if all dimension exponents are divisible by n.
    pub fn root(&self, n: i32) -> Option<Unit> {
        if self.promiscuous {
            return Some(self.clone());
        }
        let divisor = i8::try_from(n).ok().filter(|n| *n > 0)?;
        if self.dimensions.iter().any(|d| d % divisor != 0) {
            return None;
        }

        let mut dimensions = DIMENSIONLESS;
        for (i, d) in dimensions.iter_mut().enumerate() {
            *d = self.dimensions[i] / divisor;
        }

        let symbol = format!("({})^(1/{})", self.symbol, n);
        Some(Unit::new(
            &symbol,
            dimensions,
            self.scale.powf(1.0 / n as Float),
            0.0,
        ))
    }

    /// Computes the transformation of values from `self` to `to`.
    pub fn conversion_to(&self, to: &Unit) -> Result<Conversion, UnitError> {
        if self.promiscuous || to.promiscuous {
            return Ok(Conversion::identity());
        }

        if self.dimensions != to.dimensions {
            return Err(UnitError::Incompatible(
                self.symbol.clone(),
                to.symbol.clone(),
            ));
        }

        Ok(Conversion {
            factor: self.scale / to.scale,
            shift: (self.offset - to.offset) / to.scale,
        })
    }

    pub fn convert(&self, value: Float, to: &Unit) -> Result<Float, UnitError> {
        Ok(self.conversion_to(to)?.apply(value))
    }
}

fn combine(a: &Dimensions, b: &Dimensions, op: fn(i8, i8) -> Option<i8>) -> Option<Dimensions> {
    let mut dimensions = DIMENSIONLESS;
    for (i, d) in dimensions.iter_mut().enumerate() {
        *d = op(a[i], b[i])?;
    }
    Some(dimensions)
}

fn wrap_compound(symbol: &str) -> String {
    if symbol.contains(|c: char| c == ' ' || c == '/') {
        format!("({})", symbol)
    } else {
        symbol.to_string()
    }
}

/// Units are equal when they describe the same quantity on the same scale;
/// the display symbol is not compared.
impl PartialEq for Unit {
    fn eq(&self, other: &Self) -> bool {
        self.promiscuous == other.promiscuous
            && self.dimensions == other.dimensions
            && approx_eq!(Float, self.scale, other.scale, ulps = 4)
            && approx_eq!(Float, self.offset, other.offset, ulps = 4)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.promiscuous {
            write!(f, "(no unit)")
        } else {
            write!(f, "{}", self.symbol)
        }
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_unit(s)
    }
}

/// Converts single value between units.
pub fn convert(value: Float, from: &Unit, to: &Unit) -> Result<Float, UnitError> {
    from.convert(value, to)
}

pub fn unit_of(grid: &Grid) -> Unit {
    grid.unit().clone()
}

/// Replaces the unit of the grid with promiscuous marker without changing values.
pub fn strip_unit(grid: &Grid) -> Grid {
    grid.rename(grid.name(), Some(Unit::promiscuous()))
}

/// Alias of [`strip_unit`] under the name used by scripts.
pub fn no_unit(grid: &Grid) -> Grid {
    strip_unit(grid)
}

/// Multiplies grid values by `factor` and relabels them with `unit`.
///
/// No dimensional check is made, the caller asserts that
/// `factor` expresses the old unit in the new one.
pub fn create_new_unit(grid: &Grid, unit: Unit, factor: Float) -> Grid {
    debug!(
        "Relabelling {} from {} to {} with factor {}",
        grid.name(),
        grid.unit(),
        unit,
        factor
    );

    grid.map(|v| v * factor).rename(grid.name(), Some(unit))
}
