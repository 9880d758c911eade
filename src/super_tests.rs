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

//! Tests of properties spanning several modules,
//! with access to crate-private helpers.
//!
//! Building a realistic set of grids for every unit test
//! would be tedious, so properties which need grids from
//! more than one operator family are checked here.

use crate::algebra::{self, Comparator, Interpolation};
use crate::errors::GridError;
use crate::grid::testing::*;
use crate::grid::{Frame, GridAxis, VectorGrid};
use crate::kinematics;
use crate::reduction::{self, time::TimeFilter, ClimatologyStat, Combinator, EdgePolicy};
use crate::units::parse_unit;
use crate::Float;
use float_cmp::approx_eq;
use ndarray::Axis;

#[test]
fn add_sub_round_trip() {
    init_logger();

    let a = field("h", "m", unit_domain(3, 3), |x, y| x * y + 3.0);
    let b = field("dh", "km", unit_domain(5, 5), |x, _| 0.5 * x);

    let sum = algebra::add(&a, &b).unwrap();
    let back = algebra::sub(&sum, &b).unwrap();

    assert_eq!(back.unit(), a.unit());
    assert!(back.spatial().matches(a.spatial()));
    for (r, e) in back.values().iter().zip(a.values()) {
        assert!(approx_eq!(Float, *r, *e, epsilon = 1e-9));
    }
}

#[test]
fn mask_before_rescale() {
    let grid = field("ir", "K", unit_domain(5, 1), |x, _| 5.0 * x);

    let unmasked = algebra::rescale(&grid, 0.0, 10.0, 0.0, 10.0).unwrap();
    assert!(unmasked.values().iter().any(|v| *v > 10.0));

    let masked = algebra::mask_values(&grid, Comparator::Le, 10.0, Float::NAN);
    let rescaled = algebra::rescale(&masked, 0.0, 10.0, 0.0, 10.0).unwrap();

    assert!(rescaled.values().iter().filter(|v| !v.is_nan()).all(|v| *v <= 10.0));
    assert_eq!(rescaled.values().iter().filter(|v| v.is_nan()).count(), 2);
}

#[test]
fn composite_needs_common_domain() {
    let red = field("ir1", "K", unit_domain(3, 3), |x, _| x);
    let green = field("ir2", "K", unit_domain(3, 3), |_, y| y);
    let blue = field("ir3", "K", unit_domain(4, 4), |x, y| x + y);

    assert!(matches!(
        algebra::combine_rgb(&red, &green, &blue),
        Err(GridError::DomainMismatch(_))
    ));

    let blue = algebra::resample_grid(&blue, red.spatial(), Interpolation::Nearest).unwrap();
    let rgb = algebra::combine_rgb(&red, &green, &blue).unwrap();

    assert!(rgb.spatial().matches(red.spatial()));
    assert_eq!(rgb.blue().name(), "blue");
    assert_eq!(rgb.blue().values()[[0, 0, 0, 2, 2]], 4.0);
}

#[test]
fn march_start_climatology() {
    // values are calendar month numbers
    let calendar_month = |start: usize| move |t: usize, _: Float, _: Float| ((start + t) % 12 + 1) as Float;

    let grid = series("T", "K", unit_domain(2, 2), monthly_times(2000, 3, 24), calendar_month(2));
    let ltm = reduction::climatology_monthly(&grid, ClimatologyStat::Mean).unwrap();

    assert_eq!(ltm.times().unwrap().start_month(), 2);
    assert_eq!(ltm.values()[[0, 0, 0, 0, 0]], 3.0);
    assert_eq!(ltm.values()[[10, 0, 0, 0, 0]], 1.0);

    // a series starting in January is matched month by month
    let january = series("T", "K", unit_domain(2, 2), monthly_times(2001, 1, 12), calendar_month(0));
    let anomaly = reduction::monthly_anomaly(&january, &ltm, false).unwrap();
    assert!(anomaly.values().iter().all(|v| *v == 0.0));

    let uneven = series("T", "K", unit_domain(2, 2), monthly_times(2000, 3, 13), calendar_month(2));
    assert!(matches!(
        reduction::climatology_monthly(&uneven, ClimatologyStat::Mean),
        Err(GridError::InvalidCadence(_))
    ));
}

#[test]
fn solid_body_rotation() {
    let omega = 0.1;
    let u = field("u", "m/s", unit_domain(5, 5), |_, y| -omega * (y - 2.0));
    let v = field("v", "m/s", unit_domain(5, 5), |x, _| omega * (x - 2.0));
    let wind = VectorGrid::new(u, v, Frame::GridRelative).unwrap();

    let divergence = kinematics::divergence(&wind).unwrap();
    let vorticity = kinematics::vorticity(&wind).unwrap();

    assert!(divergence.values().iter().all(|d| approx_eq!(Float, *d, 0.0, epsilon = 1e-12)));
    assert!(vorticity.values().iter().all(|z| approx_eq!(Float, *z, 2.0 * omega, epsilon = 1e-12)));
    assert_eq!(vorticity.unit(), &parse_unit("s-1").unwrap());
}

#[test]
fn probability_conditions() {
    let grid = ensemble("T", "K", unit_domain(2, 2), &[1.0, 3.0, 5.0, 7.0]);

    assert!(matches!(
        reduction::ens_probability(&grid, Comparator::Lt, 5.0, Some(Comparator::Gt), Some(5.0), Some(Combinator::Or), None),
        Err(GridError::Value(_))
    ));
    assert!(matches!(
        reduction::ens_probability(&grid, Comparator::Lt, 5.0, Some(Comparator::Gt), Some(2.0), Some(Combinator::Or), None),
        Err(GridError::Logic(_))
    ));
    assert!(matches!(
        reduction::ens_probability(&grid, Comparator::Gt, 5.0, Some(Comparator::Ge), Some(2.0), Some(Combinator::And), None),
        Err(GridError::NotImplemented(_))
    ));

    let below = reduction::ens_probability(&grid, Comparator::Lt, 4.0, None, None, None, None).unwrap();
    let above = reduction::ens_probability(&grid, Comparator::Ge, 4.0, None, None, None, None).unwrap();
    for (b, a) in below.values().iter().zip(above.values()) {
        assert!(approx_eq!(Float, b + a, 1.0, epsilon = 1e-12));
        assert!(approx_eq!(Float, *b, 0.5, epsilon = 1e-9));
    }
}

#[test]
fn cyclic_average_of_periodic_series() {
    let wave = [0.0, 1.0, 0.0, -1.0];
    let grid = series("T", "K", unit_domain(3, 2), monthly_times(2000, 1, 12), |t, _, _| 10.0 + wave[t % 4]);

    let averaged = reduction::running_average(&grid, 4, EdgePolicy::Cyclic).unwrap();
    assert!(averaged.values().iter().all(|v| approx_eq!(Float, *v, 10.0, epsilon = 1e-12)));

    let edges = reduction::running_average(&grid, 4, EdgePolicy::SetMissing).unwrap();
    assert_eq!(edges.values().iter().filter(|v| v.is_nan()).count(), 3 * 6);
}

#[test]
fn outputs_do_not_alias_inputs() {
    let grid = series("T", "K", unit_domain(2, 2), monthly_times(2000, 1, 3), |t, _, _| t as Float);

    let mut changed = algebra::offset(&grid, 0.0);
    changed.values_mut().fill(-1.0);

    let first = grid.time_step(-3).unwrap();
    assert!(first.values().iter().all(|v| *v == 0.0));
    assert_eq!(grid.values().index_axis(Axis(0), 2)[[0, 0, 0, 0]], 2.0);
}

#[test]
fn winter_mean_of_daily_series() {
    let grid = series("T", "K", unit_domain(1, 1), daily_times(date(2000, 11, 30), 95), |t, _, _| t as Float);

    let winter = reduction::time::sample_at_times(
        &grid,
        &TimeFilter {
            season: Some("djf".parse().unwrap()),
            ..TimeFilter::default()
        },
    )
    .unwrap();
    assert_eq!(winter.domain_length(GridAxis::Time), 90);

    let mean = reduction::time::average_over_time(&winter, false).unwrap();
    assert_eq!(mean.values()[[0, 0, 0, 0, 0]], 45.5);
}
