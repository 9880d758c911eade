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

//! Gridded Data Mathematics (GridMath) is the computational core
//! of a meteorological visualisation macro language.
//!
//! It treats a spatiotemporal grid (a field over a spatial domain,
//! optionally indexed by time, vertical level and ensemble member,
//! carrying a named parameter with physical unit) as a first-class value
//! and provides the operators that combine, reduce, resample and
//! transform such grids: unit-aware algebra, kinematic operators,
//! climatologies and anomalies, running averages, ensemble statistics,
//! vertical reductions and RGB band composites.
//!
//! Every operator is a pure function returning a new [`Grid`].
//! Reading data from files and writing results is left to the host
//! through the [`engine::GridSource`] trait and public accessors.

pub mod algebra;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod grid;
pub mod kinematics;
pub mod reduction;
pub mod units;

#[cfg(test)]
mod super_tests;

pub use engine::{Config, Engine, GridSource};
pub use errors::{ConfigError, EngineError, GridError, SearchError, UnitError};
pub use grid::{Domain, Frame, Grid, GridAxis, Parameter, SpatialDomain, VectorGrid};
pub use units::Unit;

/// Floating point type used for all grid values and coordinates.
pub type Float = f64;
