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

//! Differential and vector operators on horizontal fields.
//!
//! Derivatives are computed over the native coordinates of the grid.
//! Cartesian coordinates are in metres. On lon/lat domains degrees are
//! converted to metres with [`METRES_PER_DEGREE`] and zonal spacing
//! shrinks with $\cos\varphi$ up to [`MAX_METRIC_LATITUDE`].
//!
//! Operators taking a [`VectorGrid`] work on grid-relative components.
//! Vectors in the true frame are rotated to the grid frame on entry,
//! so results do not depend on the frame of the input.

mod finite_difference;

use crate::algebra;
use crate::constants::{EARTH_TWO_OMEGA, MAX_METRIC_LATITUDE, METRES_PER_DEGREE};
use crate::errors::GridError;
use crate::grid::{CoordinateKind, Frame, Grid, GridAxis, Parameter, VectorGrid};
use crate::units::Unit;
use crate::Float;
use finite_difference::partial;
use log::debug;
use ndarray::{Array1, Array2, Zip};

/// Zonal derivative $\partial S / \partial x$.
pub fn ddx(grid: &Grid) -> Result<Grid, GridError> {
    let spatial = grid.spatial();
    let mut values = partial(grid.values(), spatial.x(), GridAxis::X.axis())?;

    if spatial.kind() == CoordinateKind::LonLat {
        let min_cos = MAX_METRIC_LATITUDE.to_radians().cos();
        let metres = Array1::from_iter(
            spatial
                .y()
                .iter()
                .map(|lat| METRES_PER_DEGREE * lat.to_radians().cos().max(min_cos)),
        )
        .into_shape((1, 1, 1, spatial.ny(), 1))?;

        values /= &metres;
    }

    per_metre(grid, values)
}

/// Meridional derivative $\partial S / \partial y$.
pub fn ddy(grid: &Grid) -> Result<Grid, GridError> {
    let spatial = grid.spatial();
    let mut values = partial(grid.values(), spatial.y(), GridAxis::Y.axis())?;

    if spatial.kind() == CoordinateKind::LonLat {
        values /= METRES_PER_DEGREE;
    }

    per_metre(grid, values)
}

fn per_metre(grid: &Grid, values: ndarray::Array5<Float>) -> Result<Grid, GridError> {
    let unit = grid.unit().div(&Unit::metre());
    Ok(grid.with_values(values)?.rename(grid.name(), Some(unit)))
}

/// Vertical derivative over the level coordinate, in the grid unit per level unit.
pub fn ddz(grid: &Grid) -> Result<Grid, GridError> {
    let levels = grid.levels().ok_or(GridError::MissingAxis("level"))?;
    let values = partial(grid.values(), levels.values(), GridAxis::Level.axis())?;
    let unit = grid.unit().div(levels.unit());

    Ok(grid.with_values(values)?.rename(grid.name(), Some(unit)))
}

fn grid_components(wind: &VectorGrid) -> Result<(Grid, Grid), GridError> {
    Ok(wind.to_grid_vector()?.into_components())
}

/// $\partial u / \partial x + \partial v / \partial y$
pub fn divergence(wind: &VectorGrid) -> Result<Grid, GridError> {
    let (u, v) = grid_components(wind)?;
    let result = algebra::add(&ddx(&u)?, &ddy(&v)?)?;

    Ok(result.rename("divergence", None))
}

/// Relative vorticity $\partial v / \partial x - \partial u / \partial y$.
pub fn vorticity(wind: &VectorGrid) -> Result<Grid, GridError> {
    let (u, v) = grid_components(wind)?;
    let result = algebra::sub(&ddx(&v)?, &ddy(&u)?)?;

    Ok(result.rename("vorticity", None))
}

/// Relative vorticity plus the Coriolis parameter $2\Omega\sin\varphi$.
pub fn absolute_vorticity(wind: &VectorGrid) -> Result<Grid, GridError> {
    let spatial = wind.u().spatial();

    if spatial.kind() != CoordinateKind::LonLat {
        return Err(GridError::Value(
            "Coriolis parameter needs a lon/lat domain",
        ));
    }

    let coriolis = Array2::from_shape_fn((spatial.ny(), spatial.nx()), |(j, _)| {
        EARTH_TWO_OMEGA * spatial.y()[j].to_radians().sin()
    });
    let coriolis = Grid::from_field(
        Parameter::new("coriolis", Unit::dimensionless().div(&Unit::second())),
        spatial.clone(),
        coriolis,
    )?;

    let result = algebra::add(&vorticity(wind)?, &coriolis)?;

    Ok(result.rename("absolute_vorticity", None))
}

/// Advection of a scalar $-(u\,\partial S/\partial x + v\,\partial S/\partial y)$.
pub fn advection(scalar: &Grid, wind: &VectorGrid) -> Result<Grid, GridError> {
    let (u, v) = grid_components(wind)?;

    let zonal = algebra::mul(&u, &ddx(scalar)?)?;
    let meridional = algebra::mul(&v, &ddy(scalar)?)?;
    let result = algebra::negate(&algebra::add(&zonal, &meridional)?);

    Ok(result.rename(&format!("{}_advection", scalar.name()), None))
}

/// Grid-relative gradient vector of a scalar.
pub fn gradient(scalar: &Grid) -> Result<VectorGrid, GridError> {
    VectorGrid::new(ddx(scalar)?, ddy(scalar)?, Frame::GridRelative)
}

pub fn laplacian(scalar: &Grid) -> Result<Grid, GridError> {
    let result = divergence(&gradient(scalar)?)?;

    Ok(result.rename(&format!("{}_laplacian", scalar.name()), None))
}

/// $\partial u / \partial x - \partial v / \partial y$
pub fn stretching_deformation(wind: &VectorGrid) -> Result<Grid, GridError> {
    let (u, v) = grid_components(wind)?;
    let result = algebra::sub(&ddx(&u)?, &ddy(&v)?)?;

    Ok(result.rename("stretching_deformation", None))
}

/// $\partial v / \partial x + \partial u / \partial y$
pub fn shear_deformation(wind: &VectorGrid) -> Result<Grid, GridError> {
    let (u, v) = grid_components(wind)?;
    let result = algebra::add(&ddx(&v)?, &ddy(&u)?)?;

    Ok(result.rename("shear_deformation", None))
}

pub fn total_deformation(wind: &VectorGrid) -> Result<Grid, GridError> {
    let stretch = stretching_deformation(wind)?;
    let shear = shear_deformation(wind)?;

    let result = hypot(&stretch, &shear)?;

    Ok(result.rename("total_deformation", None))
}

/// Square root of the sum of squares, in the unit of `a`.
fn hypot(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    let sum = algebra::add(&algebra::powf(a, 2.0), &algebra::powf(b, 2.0))?;
    Ok(algebra::sqrt(&sum).rename(a.name(), Some(a.unit().clone())))
}

/// Petterssen frontogenesis function of a scalar (usually potential temperature).
///
/// $F = \frac{1}{2}|\nabla\theta|(D\cos 2\beta - \delta)$ where $D$ is the total
/// deformation, $\delta$ the divergence and $\beta$ the angle between the
/// isentropes and the axis of dilatation.
/// Points where the angle cannot be computed are missing.
pub fn frontogenesis(scalar: &Grid, wind: &VectorGrid) -> Result<Grid, GridError> {
    debug!("Computing frontogenesis of {}", scalar.name());

    let dsdx = ddx(scalar)?;
    let dsdy = ddy(scalar)?;
    let grad = hypot(&dsdx, &dsdy)?;

    let stretch = stretching_deformation(wind)?;
    let shear = shear_deformation(wind)?;
    let deformation = hypot(&stretch, &shear)?;
    let div = divergence(wind)?;

    let psi = algebra::scale(&algebra::atan2(&shear, &stretch)?, 0.5);

    let across = algebra::add(
        &algebra::mul(&dsdx, &algebra::cos(&psi)?)?,
        &algebra::mul(&dsdy, &algebra::sin(&psi)?)?,
    )?;
    let beta = algebra::asin(&algebra::div(&algebra::negate(&across), &grad)?)?;

    let confluence = algebra::sub(
        &algebra::mul(&deformation, &algebra::cos(&algebra::scale(&beta, 2.0))?)?,
        &div,
    )?;
    let result = algebra::scale(&algebra::mul(&grad, &confluence)?, 0.5);

    Ok(result.rename(&format!("{}_frontogenesis", scalar.name()), None))
}

/// Length of the vector, in the unit of its components.
pub fn vector_magnitude(wind: &VectorGrid) -> Result<Grid, GridError> {
    let values = Zip::from(wind.u().values())
        .and(wind.v().values())
        .par_map_collect(|&u, &v| u.hypot(v));

    Ok(wind.u().with_values(values)?.rename("magnitude", None))
}

/// Meteorological direction (degrees clockwise from north the
/// vector is coming from) of true components.
pub fn vector_direction(wind: &VectorGrid) -> Result<Grid, GridError> {
    let true_wind = wind.to_true_vector()?;

    let values = Zip::from(true_wind.u().values())
        .and(true_wind.v().values())
        .par_map_collect(|&u, &v| (270.0 - v.atan2(u).to_degrees()).rem_euclid(360.0));

    Ok(true_wind
        .u()
        .with_values(values)?
        .rename("direction", Some(Unit::degree())))
}

/// Divergence of the horizontal flux $(S u, S v)$.
pub fn horizontal_flux_divergence(scalar: &Grid, wind: &VectorGrid) -> Result<Grid, GridError> {
    let (u, v) = grid_components(wind)?;

    let zonal = ddx(&algebra::mul(scalar, &u)?)?;
    let meridional = ddy(&algebra::mul(scalar, &v)?)?;
    let result = algebra::add(&zonal, &meridional)?;

    Ok(result.rename(&format!("{}_flux_divergence", scalar.name()), None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use crate::grid::{Domain, LevelAxis, LevelKind, SpatialDomain};
    use crate::units::parse_unit;
    use float_cmp::approx_eq;
    use ndarray::Array5;

    fn wind<U, V>(spatial: SpatialDomain, u: U, v: V) -> VectorGrid
    where
        U: Fn(Float, Float) -> Float,
        V: Fn(Float, Float) -> Float,
    {
        VectorGrid::new(
            field("u", "m/s", spatial.clone(), u),
            field("v", "m/s", spatial, v),
            Frame::GridRelative,
        )
        .unwrap()
    }

    fn all_close(grid: &Grid, expected: Float) -> bool {
        grid.values()
            .iter()
            .all(|v| approx_eq!(Float, *v, expected, epsilon = 1e-9))
    }

    #[test]
    fn cartesian_derivatives() {
        let grid = field("z", "m", unit_domain(4, 3), |x, y| 3.0 * x + 2.0 * y);

        let dzdx = ddx(&grid).unwrap();
        let dzdy = ddy(&grid).unwrap();

        assert!(all_close(&dzdx, 3.0));
        assert!(all_close(&dzdy, 2.0));
        assert!(dzdx.unit().is_dimensionless());
    }

    #[test]
    fn lonlat_metric() {
        let spatial =
            SpatialDomain::new(CoordinateKind::LonLat, vec![0.0, 1.0, 2.0], vec![0.0, 60.0]).unwrap();
        let grid = field("lon", "1", spatial, |lon, _| lon);

        let dx = ddx(&grid).unwrap();
        let values = dx.values();

        assert!(approx_eq!(Float, values[[0, 0, 0, 0, 1]], 1.0 / 111_325.0, ulps = 4));
        assert!(approx_eq!(Float, values[[0, 0, 0, 1, 1]], 2.0 / 111_325.0, epsilon = 1e-15));
    }

    #[test]
    fn divergence_and_vorticity() {
        let spreading = wind(unit_domain(4, 4), |x, _| x, |_, y| y);
        let rotating = wind(unit_domain(4, 4), |_, y| -y, |x, _| x);

        assert!(all_close(&divergence(&spreading).unwrap(), 2.0));
        assert!(all_close(&vorticity(&spreading).unwrap(), 0.0));
        assert!(all_close(&vorticity(&rotating).unwrap(), 2.0));
        assert!(all_close(&divergence(&rotating).unwrap(), 0.0));

        let vort = vorticity(&rotating).unwrap();
        assert_eq!(vort.name(), "vorticity");
        assert_eq!(vort.unit(), &parse_unit("1/s").unwrap());
    }

    #[test]
    fn true_vectors_are_rotated_first() {
        let spatial = unit_domain(4, 4)
            .with_rotation(Array2::from_elem((4, 4), std::f64::consts::FRAC_PI_2))
            .unwrap();
        let spreading = wind(spatial, |x, _| x, |_, y| y);
        let true_spreading = spreading.to_true_vector().unwrap();

        assert_eq!(true_spreading.frame(), Frame::TrueNorth);
        assert!(all_close(&divergence(&true_spreading).unwrap(), 2.0));
        assert!(all_close(&vorticity(&true_spreading).unwrap(), 0.0));
    }

    #[test]
    fn coriolis_is_added() {
        let spatial =
            SpatialDomain::new(CoordinateKind::LonLat, vec![10.0, 11.0], vec![30.0, 31.0]).unwrap();
        let still = wind(spatial, |_, _| 0.0, |_, _| 0.0);

        let eta = absolute_vorticity(&still).unwrap();
        assert!(approx_eq!(
            Float,
            eta.values()[[0, 0, 0, 0, 0]],
            0.5 * EARTH_TWO_OMEGA,
            epsilon = 1e-12
        ));

        let cartesian = wind(unit_domain(2, 2), |_, _| 0.0, |_, _| 0.0);
        assert!(absolute_vorticity(&cartesian).is_err());
    }

    #[test]
    fn advection_and_laplacian() {
        let temperature = field("T", "K", unit_domain(5, 5), |x, y| x * x + y * y);
        let flow = wind(unit_domain(5, 5), |_, _| 2.0, |_, _| 0.0);

        let adv = advection(&field("T", "K", unit_domain(5, 5), |x, _| x), &flow).unwrap();
        assert!(all_close(&adv, -2.0));
        assert_eq!(adv.unit(), &parse_unit("K/s").unwrap());

        let lap = laplacian(&temperature).unwrap();
        assert!(approx_eq!(Float, lap.values()[[0, 0, 0, 2, 2]], 4.0, epsilon = 1e-9));
    }

    #[test]
    fn deformation_and_frontogenesis() {
        let flow = wind(unit_domain(4, 4), |x, _| x, |_, y| -y);
        let theta = field("theta", "K", unit_domain(4, 4), |x, _| x);

        assert!(all_close(&stretching_deformation(&flow).unwrap(), 2.0));
        assert!(all_close(&shear_deformation(&flow).unwrap(), 0.0));
        assert!(all_close(&total_deformation(&flow).unwrap(), 2.0));

        // stretching along the gradient weakens it
        let front = frontogenesis(&theta, &flow).unwrap();
        assert!(all_close(&front, -1.0));
    }

    #[test]
    fn magnitude_and_direction() {
        let northerly = wind(unit_domain(2, 2), |_, _| 0.0, |_, _| -5.0);
        let westerly = wind(unit_domain(2, 2), |_, _| 3.0, |_, _| 0.0);

        assert!(all_close(&vector_magnitude(&northerly).unwrap(), 5.0));

        let from_north = vector_direction(&northerly).unwrap();
        assert!(from_north
            .values()
            .iter()
            .all(|d| approx_eq!(Float, *d, 0.0, epsilon = 1e-9) || approx_eq!(Float, *d, 360.0, epsilon = 1e-9)));
        assert!(all_close(&vector_direction(&westerly).unwrap(), 270.0));
    }

    #[test]
    fn flux_divergence() {
        let density = field("q", "kg/kg", unit_domain(4, 4), |_, _| 2.0);
        let flow = wind(unit_domain(4, 4), |x, _| x, |_, _| 0.0);

        assert!(all_close(&horizontal_flux_divergence(&density, &flow).unwrap(), 2.0));
    }

    #[test]
    fn vertical_derivative() {
        let levels =
            LevelAxis::new(LevelKind::Pressure, vec![1000.0, 850.0, 700.0], parse_unit("hPa").unwrap())
                .unwrap();
        let domain = Domain::spatial(unit_domain(2, 2)).with_levels(levels.clone());
        let values = Array5::from_shape_fn((1, 1, 3, 2, 2), |(_, _, k, _, _)| 0.5 * levels.values()[k]);
        let grid = Grid::new(Parameter::new("z", Unit::metre()), domain, values).unwrap();

        assert!(all_close(&ddz(&grid).unwrap(), 0.5));
        assert!(matches!(
            ddz(&field("z", "m", unit_domain(2, 2), |_, _| 0.0)),
            Err(GridError::MissingAxis("level"))
        ));
    }
}
