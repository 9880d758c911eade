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

//! Builders of synthetic grids shared by unit tests.

use super::{CoordinateKind, Domain, EnsembleAxis, Grid, Parameter, SpatialDomain, TimeAxis};
use crate::units::parse_unit;
use crate::Float;
use chrono::{NaiveDate, NaiveDateTime};
use ndarray::Array5;

pub(crate) fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub(crate) fn date(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap()
}

/// Cartesian domain with unit spacing starting at the origin.
pub(crate) fn unit_domain(nx: usize, ny: usize) -> SpatialDomain {
    SpatialDomain::uniform(CoordinateKind::Cartesian, (0.0, 1.0, nx), (0.0, 1.0, ny)).unwrap()
}

/// Consecutive first days of month.
pub(crate) fn monthly_times(year: i32, month: u32, count: usize) -> TimeAxis {
    let times = (0..count)
        .map(|i| {
            let months = (month - 1) as usize + i;
            date(year + (months / 12) as i32, (months % 12) as u32 + 1, 1)
        })
        .collect();

    TimeAxis::new(times).unwrap()
}

/// Consecutive days starting at given date.
pub(crate) fn daily_times(start: NaiveDateTime, count: usize) -> TimeAxis {
    let times = (0..count)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect();

    TimeAxis::new(times).unwrap()
}

/// Single field with values `f(x, y)`.
pub(crate) fn field<F>(name: &str, unit: &str, spatial: SpatialDomain, f: F) -> Grid
where
    F: Fn(Float, Float) -> Float,
{
    let (nx, ny) = (spatial.nx(), spatial.ny());
    let values = Array5::from_shape_fn((1, 1, 1, ny, nx), |(_, _, _, j, i)| {
        f(spatial.x()[i], spatial.y()[j])
    });

    Grid::new(
        Parameter::new(name, parse_unit(unit).unwrap()),
        Domain::spatial(spatial),
        values,
    )
    .unwrap()
}

/// Time series with values `f(t, x, y)` where `t` is the time index.
pub(crate) fn series<F>(name: &str, unit: &str, spatial: SpatialDomain, times: TimeAxis, f: F) -> Grid
where
    F: Fn(usize, Float, Float) -> Float,
{
    let (nt, nx, ny) = (times.len(), spatial.nx(), spatial.ny());
    let values = Array5::from_shape_fn((nt, 1, 1, ny, nx), |(t, _, _, j, i)| {
        f(t, spatial.x()[i], spatial.y()[j])
    });

    Grid::new(
        Parameter::new(name, parse_unit(unit).unwrap()),
        Domain::spatial(spatial).with_time(times),
        values,
    )
    .unwrap()
}

/// Ensemble whose members are constant fields with given values.
pub(crate) fn ensemble(name: &str, unit: &str, spatial: SpatialDomain, members: &[Float]) -> Grid {
    let (nx, ny) = (spatial.nx(), spatial.ny());
    let values = Array5::from_shape_fn((1, members.len(), 1, ny, nx), |(_, m, _, _, _)| members[m]);

    Grid::new(
        Parameter::new(name, parse_unit(unit).unwrap()),
        Domain::spatial(spatial).with_ensemble(EnsembleAxis::numbered(members.len()).unwrap()),
        values,
    )
    .unwrap()
}
