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

//! Coordinate axes of grids.
//!
//! The spatial domain is always present, time, level and ensemble
//! axes are optional. Constructors validate the axes so that
//! operators can rely on monotonic coordinates.

use super::bisection;
use crate::errors::GridError;
use crate::units::Unit;
use crate::Float;
use chrono::{Datelike, NaiveDateTime};
use float_cmp::approx_eq;
use ndarray::Array2;
use rustc_hash::FxHashSet;
use serde::Serialize;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum CoordinateKind {
    /// x and y in metres
    Cartesian,
    /// x as longitude and y as latitude, both in degrees
    LonLat,
}

/// Horizontal domain of a grid.
///
/// Optional rotation holds, for every point, the angle (radians,
/// counter-clockwise) between true east and the grid x axis.
/// Grids without rotation have axes aligned with east and north.
#[derive(Clone, Debug, Serialize)]
pub struct SpatialDomain {
    kind: CoordinateKind,
    x: Vec<Float>,
    y: Vec<Float>,
    #[serde(skip)]
    rotation: Option<Arc<Array2<Float>>>,
}

impl SpatialDomain {
    pub fn new(kind: CoordinateKind, x: Vec<Float>, y: Vec<Float>) -> Result<Self, GridError> {
        check_monotonic(&x, "x coordinates must be finite and strictly monotonic")?;
        check_monotonic(&y, "y coordinates must be finite and strictly monotonic")?;

        if kind == CoordinateKind::LonLat && y.iter().any(|lat| lat.abs() > 90.0) {
            return Err(GridError::Value("latitudes must lie within [-90, 90]"));
        }

        Ok(SpatialDomain {
            kind,
            x,
            y,
            rotation: None,
        })
    }

    /// Creates a regular domain from origin, spacing and number of points.
    pub fn uniform(
        kind: CoordinateKind,
        (x0, dx, nx): (Float, Float, usize),
        (y0, dy, ny): (Float, Float, usize),
    ) -> Result<Self, GridError> {
        let x = (0..nx).map(|i| x0 + i as Float * dx).collect();
        let y = (0..ny).map(|j| y0 + j as Float * dy).collect();

        SpatialDomain::new(kind, x, y)
    }

    /// Attaches grid-to-true rotation angles with shape `(ny, nx)`.
    pub fn with_rotation(mut self, angles: Array2<Float>) -> Result<Self, GridError> {
        if angles.dim() != (self.ny(), self.nx()) {
            return Err(GridError::DomainMismatch(
                "rotation angles must have (ny, nx) shape",
            ));
        }

        self.rotation = Some(Arc::new(angles));
        Ok(self)
    }

    pub fn kind(&self) -> CoordinateKind {
        self.kind
    }

    pub fn x(&self) -> &[Float] {
        &self.x
    }

    pub fn y(&self) -> &[Float] {
        &self.y
    }

    pub fn nx(&self) -> usize {
        self.x.len()
    }

    pub fn ny(&self) -> usize {
        self.y.len()
    }

    pub fn rotation(&self) -> Option<&Array2<Float>> {
        self.rotation.as_deref()
    }

    /// Two domains match when they have the same kind and coordinates.
    pub fn matches(&self, other: &SpatialDomain) -> bool {
        self.kind == other.kind
            && same_coordinates(&self.x, &other.x)
            && same_coordinates(&self.y, &other.y)
    }
}

fn same_coordinates(a: &[Float], b: &[Float]) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|(p, q)| approx_eq!(Float, *p, *q, epsilon = 1e-9, ulps = 4))
}

fn check_monotonic(coords: &[Float], reason: &'static str) -> Result<(), GridError> {
    if coords.is_empty() || coords.iter().any(|c| !c.is_finite()) {
        return Err(GridError::Value(reason));
    }

    let ascending = coords.windows(2).all(|w| w[0] < w[1]);
    let descending = coords.windows(2).all(|w| w[0] > w[1]);

    if ascending || descending {
        Ok(())
    } else {
        Err(GridError::Value(reason))
    }
}

/// Strictly increasing sequence of valid times.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TimeAxis {
    times: Vec<NaiveDateTime>,
}

impl TimeAxis {
    pub fn new(times: Vec<NaiveDateTime>) -> Result<Self, GridError> {
        if times.is_empty() {
            return Err(GridError::Value("time axis cannot be empty"));
        }

        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(GridError::Value("times must be strictly increasing"));
        }

        Ok(TimeAxis { times })
    }

    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn first(&self) -> NaiveDateTime {
        self.times[0]
    }

    /// Zero-based calendar month of the first time.
    pub fn start_month(&self) -> usize {
        self.times[0].month0() as usize
    }

    pub(crate) fn select(&self, indices: &[usize]) -> Result<Self, GridError> {
        TimeAxis::new(indices.iter().map(|&i| self.times[i]).collect())
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
pub enum LevelKind {
    Pressure,
    Height,
    PotentialTemperature,
    Generic,
}

/// Vertical coordinate of a grid.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LevelAxis {
    kind: LevelKind,
    values: Vec<Float>,
    unit: Unit,
}

impl LevelAxis {
    pub fn new(kind: LevelKind, values: Vec<Float>, unit: Unit) -> Result<Self, GridError> {
        check_monotonic(&values, "levels must be finite and strictly monotonic")?;

        Ok(LevelAxis { kind, values, unit })
    }

    pub fn kind(&self) -> LevelKind {
        self.kind
    }

    pub fn values(&self) -> &[Float] {
        &self.values
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn index_of(&self, level: Float) -> Option<usize> {
        self.values
            .iter()
            .position(|l| approx_eq!(Float, *l, level, epsilon = 1e-9, ulps = 4))
    }

    /// Levels enclosing `level` and the interpolation weight of the second one.
    pub fn bracket(&self, level: Float) -> Result<(usize, usize, Float), GridError> {
        Ok(bisection::bracket(&self.values, level)?)
    }
}

/// Identifiers of ensemble members.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EnsembleAxis {
    members: Vec<String>,
}

impl EnsembleAxis {
    pub fn new(members: Vec<String>) -> Result<Self, GridError> {
        if members.is_empty() {
            return Err(GridError::Value("ensemble needs at least one member"));
        }

        let unique: FxHashSet<&str> = members.iter().map(String::as_str).collect();
        if unique.len() != members.len() {
            return Err(GridError::Value("ensemble member identifiers must be unique"));
        }

        Ok(EnsembleAxis { members })
    }

    /// Ensemble with members named `0`, `1`, ...
    pub fn numbered(count: usize) -> Result<Self, GridError> {
        EnsembleAxis::new((0..count).map(|i| i.to_string()).collect())
    }

    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Full domain of a grid.
///
/// Values of a grid are stored with axes (time, member, level, y, x)
/// and absent optional axes have length 1.
#[derive(Clone, Debug, Serialize)]
pub struct Domain {
    pub spatial: SpatialDomain,
    pub time: Option<TimeAxis>,
    pub levels: Option<LevelAxis>,
    pub ensemble: Option<EnsembleAxis>,
}

impl Domain {
    pub fn spatial(spatial: SpatialDomain) -> Self {
        Domain {
            spatial,
            time: None,
            levels: None,
            ensemble: None,
        }
    }

    pub fn with_time(mut self, time: TimeAxis) -> Self {
        self.time = Some(time);
        self
    }

    pub fn with_levels(mut self, levels: LevelAxis) -> Self {
        self.levels = Some(levels);
        self
    }

    pub fn with_ensemble(mut self, ensemble: EnsembleAxis) -> Self {
        self.ensemble = Some(ensemble);
        self
    }

    pub fn shape(&self) -> [usize; 5] {
        [
            self.time.as_ref().map_or(1, TimeAxis::len),
            self.ensemble.as_ref().map_or(1, EnsembleAxis::len),
            self.levels.as_ref().map_or(1, LevelAxis::len),
            self.spatial.ny(),
            self.spatial.nx(),
        ]
    }

    /// Merges non-spatial axes of two domains for broadcasting operations.
    ///
    /// Axes present in only one domain are taken from it,
    /// axes present in both must be identical.
    pub(crate) fn broadcast(&self, other: &Domain) -> Result<Domain, GridError> {
        let time = merge_axis(&self.time, &other.time, "time axes of operands differ")?;
        let levels = merge_axis(&self.levels, &other.levels, "level axes of operands differ")?;
        let ensemble = merge_axis(
            &self.ensemble,
            &other.ensemble,
            "ensemble axes of operands differ",
        )?;

        Ok(Domain {
            spatial: self.spatial.clone(),
            time,
            levels,
            ensemble,
        })
    }
}

fn merge_axis<T: Clone + PartialEq>(
    a: &Option<T>,
    b: &Option<T>,
    reason: &'static str,
) -> Result<Option<T>, GridError> {
    match (a, b) {
        (Some(a), Some(b)) if a != b => Err(GridError::DomainMismatch(reason)),
        (Some(a), _) => Ok(Some(a.clone())),
        (None, b) => Ok(b.clone()),
    }
}
