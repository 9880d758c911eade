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

//! Grids of random samples shaped like a template grid.
//!
//! The generator is passed in by the caller, so a seeded
//! generator reproduces the same grid.

use crate::errors::GridError;
use crate::grid::Grid;
use crate::units::Unit;
use crate::Float;
use ndarray::Array5;
use rand::Rng;
use rand_distr::{Distribution, Normal, Uniform};

fn fill_from<D, R>(template: &Grid, unit: Option<Unit>, distribution: D, rng: &mut R) -> Result<Grid, GridError>
where
    D: Distribution<Float>,
    R: Rng + ?Sized,
{
    let values = Array5::from_shape_simple_fn(template.values().raw_dim(), || distribution.sample(&mut *rng));

    Ok(template
        .with_values(values)?
        .rename(template.name(), unit))
}

/// Values drawn uniformly from `[min, max)` on the domain of `template`.
///
/// `unit` relabels the result, values are not converted.
pub fn fill_uniform<R>(
    template: &Grid,
    min: Float,
    max: Float,
    unit: Option<Unit>,
    rng: &mut R,
) -> Result<Grid, GridError>
where
    R: Rng + ?Sized,
{
    if !(min.is_finite() && max.is_finite() && min < max) {
        return Err(GridError::Value("uniform bounds must be finite with min below max"));
    }

    fill_from(template, unit, Uniform::new(min, max), rng)
}

/// Values drawn from a normal distribution on the domain of `template`.
pub fn fill_normal<R>(
    template: &Grid,
    mean: Float,
    std_dev: Float,
    unit: Option<Unit>,
    rng: &mut R,
) -> Result<Grid, GridError>
where
    R: Rng + ?Sized,
{
    if !(mean.is_finite() && std_dev.is_finite()) {
        return Err(GridError::Value("normal distribution needs finite parameters"));
    }

    let normal = Normal::new(mean, std_dev)
        .map_err(|_| GridError::Value("standard deviation cannot be negative"))?;

    fill_from(template, unit, normal, rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use crate::units::parse_unit;
    use float_cmp::approx_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn template() -> Grid {
        series("T", "K", unit_domain(20, 10), monthly_times(2000, 1, 5), |_, _, _| 0.0)
    }

    #[test]
    fn uniform_samples() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = fill_uniform(&template(), 2.0, 4.0, Some(parse_unit("mm").unwrap()), &mut rng).unwrap();

        assert_eq!(noise.shape(), template().shape());
        assert_eq!(noise.times(), template().times());
        assert_eq!(noise.unit(), &parse_unit("mm").unwrap());
        assert!(noise.values().iter().all(|v| (2.0..4.0).contains(v)));

        let mean = noise.values().mean().unwrap();
        assert!(approx_eq!(Float, mean, 3.0, epsilon = 0.1));

        let mut again = StdRng::seed_from_u64(7);
        let repeated = fill_uniform(&template(), 2.0, 4.0, None, &mut again).unwrap();
        assert_eq!(repeated.values(), noise.values());
        assert_eq!(repeated.unit(), template().unit());

        assert!(fill_uniform(&template(), 4.0, 2.0, None, &mut rng).is_err());
    }

    #[test]
    fn normal_samples() {
        let mut rng = StdRng::seed_from_u64(11);
        let noise = fill_normal(&template(), 10.0, 2.0, None, &mut rng).unwrap();

        let mean = noise.values().mean().unwrap();
        let std = noise.values().std(0.0);
        assert!(approx_eq!(Float, mean, 10.0, epsilon = 0.3));
        assert!(approx_eq!(Float, std, 2.0, epsilon = 0.3));

        assert!(fill_normal(&template(), 0.0, -1.0, None, &mut rng).is_err());
        assert!(fill_normal(&template(), Float::NAN, 1.0, None, &mut rng).is_err());
    }
}
