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

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Error while reading configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Error while creating ThreadPool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Grid operation failed: {0}")]
    Grid(#[from] GridError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot open configuration file: {0}")]
    CantOpenFile(#[from] std::io::Error),

    #[error("Cannot deserialize configuration: {0}")]
    CantDeserialize(#[from] serde_yaml::Error),

    #[error("Configuration component is out of bounds {0}")]
    OutOfBounds(&'static str),

    #[error("Product {0} has no preset in configuration")]
    UnknownProduct(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("Unit {0} cannot be converted to {1}")]
    Incompatible(String, String),

    #[error("Cannot parse unit {0:?}: {1}")]
    Parse(String, &'static str),

    #[error("Power {1} of unit {0} exceeds the exponent range")]
    Exponent(String, i32),
}

/// Errors returned by grid operators.
///
/// `Logic`, `NotImplemented` and `Value` are raised by degenerate
/// parameter combinations, the remaining variants by the grids themselves.
#[derive(Error, Debug)]
pub enum GridError {
    #[error("Unit error: {0}")]
    Unit(#[from] UnitError),

    #[error("Index {index} is out of range of {axis} axis with length {length}")]
    IndexOutOfRange {
        axis: &'static str,
        index: i64,
        length: usize,
    },

    #[error("Time axis has invalid cadence: {0}")]
    InvalidCadence(String),

    #[error("Grid domains do not match: {0}")]
    DomainMismatch(&'static str),

    #[error("Vector grids are expressed in different frames, convert them explicitly first")]
    FrameMismatch,

    #[error("Grid has no {0} axis")]
    MissingAxis(&'static str),

    #[error("Logically inconsistent request: {0}")]
    Logic(&'static str),

    #[error("Operation is not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("Invalid value: {0}")]
    Value(&'static str),

    #[error("Coordinate search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Array has invalid shape: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchError {
    #[error("Searched array is empty")]
    EmptyArray,

    #[error("Searched value is out of array bounds")]
    OutOfBounds,
}
