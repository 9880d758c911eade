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

//! Grid value model.
//!
//! [`Grid`] is a value type: cloning it is cheap as the values are
//! shared through [`Arc`] and every mutation goes through
//! [`Arc::make_mut`], so a grid returned by an operator never changes
//! when another grid sharing its storage is modified.
//!
//! Values are kept in a single [`Array5`] with axes ordered
//! (time, member, level, y, x). Optional axes which are absent
//! from the domain have length 1. Missing values are `NaN`.

pub mod bisection;
pub mod domain;
mod vector;

#[cfg(test)]
pub(crate) mod testing;

pub use domain::{
    CoordinateKind, Domain, EnsembleAxis, LevelAxis, LevelKind, SpatialDomain, TimeAxis,
};
pub use vector::{Frame, VectorGrid};

use crate::errors::GridError;
use crate::units::Unit;
use crate::Float;
use log::{debug, warn};
use ndarray::parallel::prelude::*;
use ndarray::{
    concatenate, Array2, Array3, Array5, ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2,
    Axis, Slice, Zip,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum GridAxis {
    Time,
    Ensemble,
    Level,
    Y,
    X,
}

impl GridAxis {
    pub(crate) fn axis(self) -> Axis {
        match self {
            GridAxis::Time => Axis(0),
            GridAxis::Ensemble => Axis(1),
            GridAxis::Level => Axis(2),
            GridAxis::Y => Axis(3),
            GridAxis::X => Axis(4),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GridAxis::Time => "time",
            GridAxis::Ensemble => "ensemble",
            GridAxis::Level => "level",
            GridAxis::Y => "y",
            GridAxis::X => "x",
        }
    }
}

/// Coordinates of an axis created by [`Grid::stack`].
#[derive(Clone, Debug)]
pub enum StackedAxis {
    Time(TimeAxis),
    Levels(LevelAxis),
    Ensemble(EnsembleAxis),
}

impl StackedAxis {
    fn grid_axis(&self) -> GridAxis {
        match self {
            StackedAxis::Time(_) => GridAxis::Time,
            StackedAxis::Levels(_) => GridAxis::Level,
            StackedAxis::Ensemble(_) => GridAxis::Ensemble,
        }
    }

    fn len(&self) -> usize {
        match self {
            StackedAxis::Time(t) => t.len(),
            StackedAxis::Levels(l) => l.len(),
            StackedAxis::Ensemble(e) => e.len(),
        }
    }
}

/// Physical quantity represented by grid values.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Parameter {
    name: String,
    unit: Unit,
}

impl Parameter {
    pub fn new(name: &str, unit: Unit) -> Self {
        Parameter {
            name: name.to_string(),
            unit,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &Unit {
        &self.unit
    }
}

#[derive(Clone, Debug)]
pub struct Grid {
    parameter: Parameter,
    domain: Domain,
    values: Arc<Array5<Float>>,
}

impl Grid {
    pub fn new(parameter: Parameter, domain: Domain, values: Array5<Float>) -> Result<Self, GridError> {
        if values.shape() != domain.shape() {
            return Err(GridError::DomainMismatch(
                "shape of values does not match the domain",
            ));
        }

        let values = if values.is_standard_layout() {
            values
        } else {
            values.as_standard_layout().into_owned()
        };

        Ok(Grid {
            parameter,
            domain,
            values: Arc::new(values),
        })
    }

    /// Creates a grid of a single horizontal field with shape `(ny, nx)`.
    pub fn from_field(
        parameter: Parameter,
        spatial: SpatialDomain,
        field: Array2<Float>,
    ) -> Result<Self, GridError> {
        let (ny, nx) = field.dim();
        let values = field.into_shape((1, 1, 1, ny, nx))?;

        Grid::new(parameter, Domain::spatial(spatial), values)
    }

    /// Creates a grid with the same parameter and domain as `template`
    /// and all values equal to `value`.
    pub fn fill_constant(template: &Grid, value: Float) -> Grid {
        Grid {
            parameter: template.parameter.clone(),
            domain: template.domain.clone(),
            values: Arc::new(Array5::from_elem(template.values.raw_dim(), value)),
        }
    }

    pub fn parameter(&self) -> &Parameter {
        &self.parameter
    }

    pub fn name(&self) -> &str {
        &self.parameter.name
    }

    pub fn unit(&self) -> &Unit {
        &self.parameter.unit
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn spatial(&self) -> &SpatialDomain {
        &self.domain.spatial
    }

    pub fn times(&self) -> Option<&TimeAxis> {
        self.domain.time.as_ref()
    }

    pub fn levels(&self) -> Option<&LevelAxis> {
        self.domain.levels.as_ref()
    }

    pub fn ensemble(&self) -> Option<&EnsembleAxis> {
        self.domain.ensemble.as_ref()
    }

    pub fn values(&self) -> &Array5<Float> {
        &self.values
    }

    /// Mutable access to values, copying the storage if it is shared.
    pub fn values_mut(&mut self) -> &mut Array5<Float> {
        Arc::make_mut(&mut self.values)
    }

    pub fn shape(&self) -> [usize; 5] {
        self.domain.shape()
    }

    pub fn is_time_sequence(&self) -> bool {
        self.domain.time.is_some()
    }

    pub fn is_ensemble(&self) -> bool {
        self.domain.ensemble.is_some()
    }

    pub fn has_levels(&self) -> bool {
        self.domain.levels.is_some()
    }

    pub fn has_axis(&self, axis: GridAxis) -> bool {
        match axis {
            GridAxis::Time => self.is_time_sequence(),
            GridAxis::Ensemble => self.is_ensemble(),
            GridAxis::Level => self.has_levels(),
            GridAxis::Y | GridAxis::X => true,
        }
    }

    /// Number of samples along the axis, 0 for absent optional axes.
    pub fn domain_length(&self, axis: GridAxis) -> usize {
        if self.has_axis(axis) {
            self.values.len_of(axis.axis())
        } else {
            0
        }
    }

    /// Returns a grid with the same parameter on a new domain.
    pub(crate) fn with_domain(&self, domain: Domain, values: Array5<Float>) -> Result<Grid, GridError> {
        Grid::new(self.parameter.clone(), domain, values)
    }

    /// Returns a grid with the same parameter and domain but new values.
    pub(crate) fn with_values(&self, values: Array5<Float>) -> Result<Grid, GridError> {
        Grid::new(self.parameter.clone(), self.domain.clone(), values)
    }

    /// Domain of the grid with one optional axis removed.
    pub(crate) fn domain_without(&self, axis: GridAxis) -> Domain {
        let mut domain = self.domain.clone();
        match axis {
            GridAxis::Time => domain.time = None,
            GridAxis::Ensemble => domain.ensemble = None,
            GridAxis::Level => domain.levels = None,
            GridAxis::Y | GridAxis::X => (),
        }
        domain
    }

    fn check_index(&self, axis: GridAxis, index: usize) -> Result<(), GridError> {
        if axis == GridAxis::Y || axis == GridAxis::X {
            return Err(GridError::Value("spatial axes cannot be sampled"));
        }

        if !self.has_axis(axis) {
            return Err(GridError::MissingAxis(axis.name()));
        }

        let length = self.values.len_of(axis.axis());
        if index >= length {
            return Err(GridError::IndexOutOfRange {
                axis: axis.name(),
                index: index as i64,
                length,
            });
        }

        Ok(())
    }

    /// Extracts a single time, level or ensemble sample,
    /// the returned grid does not have the sampled axis.
    pub fn get_sample(&self, axis: GridAxis, index: usize) -> Result<Grid, GridError> {
        self.check_index(axis, index)?;

        let values = self
            .values
            .slice_axis(axis.axis(), Slice::from(index..index + 1))
            .to_owned();

        self.with_domain(self.domain_without(axis), values)
    }

    /// Returns n-th time step of the grid.
    ///
    /// Negative `n` is clamped to the first step and grids without
    /// time axis are returned unchanged.
    pub fn time_step(&self, n: i64) -> Result<Grid, GridError> {
        if !self.is_time_sequence() {
            return Ok(self.clone());
        }

        let n = if n < 0 {
            warn!("Time step {} requested for {}, using first step instead", n, self.name());
            0
        } else {
            n as usize
        };

        self.get_sample(GridAxis::Time, n)
    }

    /// Returns a new grid with one sample replaced by `sample`.
    ///
    /// The sample must not have the replaced axis, must lie on the
    /// same spatial domain and its values are converted to the grid unit.
    pub fn set_sample(&self, axis: GridAxis, index: usize, sample: &Grid) -> Result<Grid, GridError> {
        self.check_index(axis, index)?;

        if sample.has_axis(axis) {
            return Err(GridError::DomainMismatch(
                "sample must not have the replaced axis",
            ));
        }

        if !sample.spatial().matches(self.spatial()) {
            return Err(GridError::DomainMismatch(
                "sample spatial domain differs from the grid",
            ));
        }

        let slot_domain = self.domain_without(axis);
        if slot_domain.broadcast(&sample.domain)?.shape() != slot_domain.shape() {
            return Err(GridError::DomainMismatch(
                "sample has axes absent from the grid",
            ));
        }

        let conversion = sample.unit().conversion_to(self.unit())?;

        let mut slot_shape = self.shape();
        slot_shape[axis.axis().index()] = 1;
        let source = sample
            .values
            .broadcast(slot_shape)
            .ok_or(GridError::DomainMismatch("sample cannot fill the grid slot"))?;

        let mut result = self.clone();
        result
            .values_mut()
            .slice_axis_mut(axis.axis(), Slice::from(index..index + 1))
            .zip_mut_with(&source, |target, &value| *target = conversion.apply(value));

        Ok(result)
    }

    /// Returns the grid with a new parameter name and optionally a new unit.
    /// Values are not converted, for conversion see [`Grid::convert_to`].
    pub fn rename(&self, name: &str, unit: Option<Unit>) -> Grid {
        let unit = unit.unwrap_or_else(|| self.unit().clone());

        Grid {
            parameter: Parameter::new(name, unit),
            domain: self.domain.clone(),
            values: Arc::clone(&self.values),
        }
    }

    /// Expresses grid values in another compatible unit.
    pub fn convert_to(&self, unit: &Unit) -> Result<Grid, GridError> {
        let conversion = self.unit().conversion_to(unit)?;

        if conversion.is_identity() {
            return Ok(self.rename(self.name(), Some(unit.clone())));
        }

        Ok(self
            .map(|v| conversion.apply(v))
            .rename(self.name(), Some(unit.clone())))
    }

    /// Applies `f` to every value, keeping parameter and domain.
    pub fn map<F>(&self, f: F) -> Grid
    where
        F: Fn(Float) -> Float + Sync + Send,
    {
        let mut values = Array5::<Float>::zeros(self.values.raw_dim());
        Zip::from(&mut values)
            .and(&*self.values)
            .par_for_each(|out, &v| *out = f(v));

        Grid {
            parameter: self.parameter.clone(),
            domain: self.domain.clone(),
            values: Arc::new(values),
        }
    }

    /// Remainder of division of every value by `n`, with the sign of `n`.
    pub fn modulo(&self, n: Float) -> Result<Grid, GridError> {
        if n == 0.0 || !n.is_finite() {
            return Err(GridError::Value("modulo divisor must be finite and non-zero"));
        }

        Ok(self.map(move |v| v - n * (v / n).floor()))
    }

    /// Builds a grid along a new axis from samples lacking that axis.
    ///
    /// All samples must share the spatial domain and the remaining axes,
    /// their values are converted to the unit of the first sample.
    pub fn stack(samples: &[Grid], coordinates: StackedAxis) -> Result<Grid, GridError> {
        let first = samples
            .first()
            .ok_or(GridError::Value("cannot stack an empty list of samples"))?;

        if samples.len() != coordinates.len() {
            return Err(GridError::DomainMismatch(
                "number of samples differs from the length of stacked axis",
            ));
        }

        let axis = coordinates.grid_axis();
        let mut converted = Vec::with_capacity(samples.len());

        for sample in samples {
            if sample.has_axis(axis) {
                return Err(GridError::DomainMismatch(
                    "stacked samples must not have the stacked axis",
                ));
            }

            if !sample.spatial().matches(first.spatial())
                || sample.domain.time != first.domain.time
                || sample.domain.levels != first.domain.levels
                || sample.domain.ensemble != first.domain.ensemble
            {
                return Err(GridError::DomainMismatch(
                    "stacked samples must have identical domains",
                ));
            }

            converted.push(sample.convert_to(first.unit())?);
        }

        let views: Vec<_> = converted.iter().map(|g| g.values.view()).collect();
        let values = concatenate(axis.axis(), &views)?;

        let mut domain = first.domain.clone();
        match coordinates {
            StackedAxis::Time(t) => domain.time = Some(t),
            StackedAxis::Levels(l) => domain.levels = Some(l),
            StackedAxis::Ensemble(e) => domain.ensemble = Some(e),
        }

        debug!("Stacked {} samples of {} along {} axis", samples.len(), first.name(), axis.name());

        Grid::new(first.parameter.clone(), domain, values)
    }

    /// Reduces every lane along `axis` to a single value,
    /// the axis is kept with length 1.
    pub(crate) fn reduce_lanes<F>(&self, axis: GridAxis, f: F) -> Array5<Float>
    where
        F: Fn(ArrayView1<Float>) -> Float + Sync + Send,
    {
        let ax = axis.axis();

        Zip::from(self.values.lanes(ax))
            .par_map_collect(|lane| f(lane))
            .insert_axis(ax)
    }

    /// Transforms every lane along `axis` into a lane of the same length.
    pub(crate) fn map_lanes<F>(&self, axis: GridAxis, f: F) -> Array5<Float>
    where
        F: Fn(ArrayView1<Float>, ArrayViewMut1<Float>) + Sync + Send,
    {
        let ax = axis.axis();
        let mut result = Array5::<Float>::zeros(self.values.raw_dim());

        Zip::from(result.lanes_mut(ax))
            .and(self.values.lanes(ax))
            .par_for_each(|output, input| f(input, output));

        result
    }

    /// Transforms every horizontal field of the grid into a field of
    /// shape `(ny, nx)`, returns values with the non-spatial axes preserved.
    pub(crate) fn map_planes<F>(&self, (ny, nx): (usize, usize), f: F) -> Result<Array5<Float>, GridError>
    where
        F: Fn(ArrayView2<Float>, ArrayViewMut2<Float>) + Sync + Send,
    {
        let [nt, ne, nz, ny_in, nx_in] = self.shape();
        let planes = nt * ne * nz;

        let source = self.values.view().into_shape((planes, ny_in, nx_in))?;
        let mut result = Array3::<Float>::zeros((planes, ny, nx));

        result
            .axis_iter_mut(Axis(0))
            .into_par_iter()
            .zip(source.axis_iter(Axis(0)).into_par_iter())
            .for_each(|(output, input)| f(input, output));

        Ok(result.into_shape((nt, ne, nz, ny, nx))?)
    }

    /// Selects samples along `axis` in the given order.
    pub(crate) fn select(&self, axis: GridAxis, indices: &[usize]) -> Array5<Float> {
        self.values.select(axis.axis(), indices)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn rejects_inconsistent_shape() {
        let spatial = unit_domain(3, 2);
        let domain = Domain::spatial(spatial);
        let values = Array5::<Float>::zeros((1, 1, 1, 3, 2));

        assert!(matches!(
            Grid::new(Parameter::new("T", Unit::kelvin()), domain, values),
            Err(GridError::DomainMismatch(_))
        ));
    }

    #[test]
    fn samples_and_bounds() {
        let times = monthly_times(2000, 1, 4);
        let grid = series("T", "K", unit_domain(3, 2), times, |t, _, _| t as Float);

        assert!(grid.is_time_sequence());
        assert_eq!(grid.domain_length(GridAxis::Time), 4);
        assert_eq!(grid.domain_length(GridAxis::Ensemble), 0);
        assert_eq!(grid.domain_length(GridAxis::X), 3);

        let third = grid.get_sample(GridAxis::Time, 2).unwrap();
        assert!(!third.is_time_sequence());
        assert!(third.values().iter().all(|v| *v == 2.0));

        assert!(matches!(
            grid.get_sample(GridAxis::Time, 4),
            Err(GridError::IndexOutOfRange { axis: "time", index: 4, length: 4 })
        ));
        assert!(matches!(
            grid.get_sample(GridAxis::Level, 0),
            Err(GridError::MissingAxis("level"))
        ));
    }

    #[test]
    fn negative_time_step_is_clamped() {
        init_logger();

        let times = monthly_times(2000, 1, 3);
        let grid = series("T", "K", unit_domain(2, 2), times, |t, _, _| 10.0 + t as Float);

        let first = grid.time_step(-5).unwrap();
        assert!(first.values().iter().all(|v| *v == 10.0));
        assert!(grid.time_step(3).is_err());
    }

    #[test]
    fn set_sample_copies_on_write() {
        let times = monthly_times(2000, 1, 3);
        let grid = series("T", "K", unit_domain(2, 2), times, |_, _, _| 280.0);
        let replacement = field("T", "degC", unit_domain(2, 2), |_, _| 10.0);

        let updated = grid.set_sample(GridAxis::Time, 1, &replacement).unwrap();

        assert!(grid.values().iter().all(|v| *v == 280.0));
        let second = updated.get_sample(GridAxis::Time, 1).unwrap();
        assert!(second
            .values()
            .iter()
            .all(|v| approx_eq!(Float, *v, 283.15, epsilon = 1e-9)));

        let clone = updated.clone();
        let mut modified = updated.clone();
        modified.values_mut().fill(0.0);
        assert!(approx_eq!(Float, clone.values()[[1, 0, 0, 0, 0]], 283.15, epsilon = 1e-9));
    }

    #[test]
    fn set_sample_checks_units() {
        let times = monthly_times(2000, 1, 2);
        let grid = series("T", "K", unit_domain(2, 2), times, |_, _, _| 280.0);
        let wrong = field("u", "m/s", unit_domain(2, 2), |_, _| 1.0);

        assert!(matches!(
            grid.set_sample(GridAxis::Time, 0, &wrong),
            Err(GridError::Unit(_))
        ));
    }

    #[test]
    fn stack_and_rename() {
        let spatial = unit_domain(2, 2);
        let members: Vec<Grid> = (0..3)
            .map(|m| field("T", "K", spatial.clone(), move |_, _| m as Float))
            .collect();

        let stacked = Grid::stack(
            &members,
            StackedAxis::Ensemble(EnsembleAxis::numbered(3).unwrap()),
        )
        .unwrap();

        assert_eq!(stacked.shape(), [1, 3, 1, 2, 2]);
        assert_eq!(stacked.values()[[0, 2, 0, 1, 1]], 2.0);

        let renamed = stacked.rename("temperature", None);
        assert_eq!(renamed.name(), "temperature");
        assert_eq!(renamed.unit(), &Unit::kelvin());

        assert!(Grid::stack(
            &members,
            StackedAxis::Ensemble(EnsembleAxis::numbered(2).unwrap())
        )
        .is_err());
    }

    #[test]
    fn constant_and_modulo() {
        let grid = field("lon", "degrees", unit_domain(2, 1), |x, _| 350.0 + 20.0 * x);
        let wrapped = grid.modulo(360.0).unwrap();

        assert!(approx_eq!(Float, wrapped.values()[[0, 0, 0, 0, 0]], 350.0, ulps = 2));
        assert!(approx_eq!(Float, wrapped.values()[[0, 0, 0, 0, 1]], 10.0, epsilon = 1e-9));
        assert!(grid.modulo(0.0).is_err());

        let constant = Grid::fill_constant(&grid, 7.0);
        assert!(constant.values().iter().all(|v| *v == 7.0));
        assert_eq!(constant.name(), "lon");
    }
}
