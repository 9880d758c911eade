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

//! Horizontal smoothing filters in grid index space.
//!
//! Every horizontal field of a grid (each level, time and member)
//! is smoothed separately. Missing points stay missing.

use crate::errors::GridError;
use crate::grid::Grid;
use crate::Float;
use log::debug;
use std::f64::consts::PI;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Smoother {
    /// 5-point smoother, `0.5` centre weight.
    FivePoint,
    /// 9-point smoother, weights `1/4`, `1/8` on sides and `1/16` on corners.
    NinePoint,
    /// Mean over a square of the given half width.
    Rectangular(usize),
    /// Mean over a circle of the given radius.
    Circular(usize),
    /// Gaussian weights with response `1/e` at the given wavelength.
    Gaussian(usize),
}

impl Smoother {
    /// Smoother from its conventional name (`SM5S`, `SM9S`, `RECT`,
    /// `CIRC`, `GWFS`) and the size the last three require.
    pub fn new(name: &str, size: Option<usize>) -> Result<Self, GridError> {
        let sized = |build: fn(usize) -> Smoother| match size {
            Some(n) if n > 0 => Ok(build(n)),
            _ => Err(GridError::Value("smoother needs a positive size")),
        };

        match name.trim().to_uppercase().as_str() {
            "SM5S" => Ok(Smoother::FivePoint),
            "SM9S" => Ok(Smoother::NinePoint),
            "RECT" => sized(Smoother::Rectangular),
            "CIRC" => sized(Smoother::Circular),
            "GWFS" => sized(Smoother::Gaussian),
            _ => Err(GridError::Value("unknown smoother")),
        }
    }

    /// Weights by `(dy, dx)` offset.
    fn kernel(self) -> Vec<(isize, isize, Float)> {
        let square = |r: isize| (-r..=r).flat_map(move |dy| (-r..=r).map(move |dx| (dy, dx)));

        match self {
            Smoother::FivePoint => vec![(0, 0, 0.5), (-1, 0, 0.125), (1, 0, 0.125), (0, -1, 0.125), (0, 1, 0.125)],
            Smoother::NinePoint => square(1)
                .map(|(dy, dx)| {
                    let weight = match dy.abs() + dx.abs() {
                        0 => 0.25,
                        1 => 0.125,
                        _ => 0.0625,
                    };
                    (dy, dx, weight)
                })
                .collect(),
            Smoother::Rectangular(n) => square(n as isize).map(|(dy, dx)| (dy, dx, 1.0)).collect(),
            Smoother::Circular(n) => {
                let r = n as isize;
                square(r)
                    .filter(|(dy, dx)| dy * dy + dx * dx <= r * r)
                    .map(|(dy, dx)| (dy, dx, 1.0))
                    .collect()
            }
            Smoother::Gaussian(n) => {
                let sigma = n as Float / (PI * (2.0 as Float).sqrt());
                let r = (3.0 * sigma).ceil() as isize;
                square(r)
                    .map(|(dy, dx)| {
                        let d2 = (dy * dy + dx * dx) as Float;
                        (dy, dx, (-d2 / (2.0 * sigma * sigma)).exp())
                    })
                    .collect()
            }
        }
    }

    /// Fixed stencils leave points unchanged unless all neighbours are valid,
    /// averaging windows renormalise over the valid ones.
    fn needs_full_stencil(self) -> bool {
        matches!(self, Smoother::FivePoint | Smoother::NinePoint)
    }
}

/// Smooths every horizontal field of `grid`.
pub fn smooth(grid: &Grid, smoother: Smoother) -> Result<Grid, GridError> {
    debug!("Smoothing {} with {:?}", grid.name(), smoother);

    let kernel = smoother.kernel();
    let full = smoother.needs_full_stencil();
    let (ny, nx) = (grid.spatial().ny(), grid.spatial().nx());

    let values = grid.map_planes((ny, nx), |field, mut output| {
        for j in 0..ny {
            for i in 0..nx {
                let centre = field[[j, i]];
                if centre.is_nan() {
                    output[[j, i]] = Float::NAN;
                    continue;
                }

                let mut sum = 0.0;
                let mut weights = 0.0;
                let mut complete = true;

                for &(dy, dx, w) in &kernel {
                    let (y, x) = (j as isize + dy, i as isize + dx);
                    if y < 0 || x < 0 || y >= ny as isize || x >= nx as isize {
                        complete = false;
                        continue;
                    }

                    let v = field[[y as usize, x as usize]];
                    if v.is_nan() {
                        complete = false;
                    } else {
                        sum += w * v;
                        weights += w;
                    }
                }

                output[[j, i]] = if full && !complete { centre } else { sum / weights };
            }
        }
    })?;

    grid.with_values(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use float_cmp::approx_eq;

    fn spike(nx: usize) -> Grid {
        let c = (nx / 2) as Float;
        field("z", "m", unit_domain(nx, nx), move |x, y| if x == c && y == c { 16.0 } else { 0.0 })
    }

    #[test]
    fn smoother_names() {
        assert_eq!(Smoother::new("sm9s", None).unwrap(), Smoother::NinePoint);
        assert_eq!(Smoother::new("GWFS", Some(6)).unwrap(), Smoother::Gaussian(6));
        assert!(Smoother::new("CIRC", None).is_err());
        assert!(Smoother::new("RECT", Some(0)).is_err());
        assert!(Smoother::new("CRES", Some(2)).is_err());
    }

    #[test]
    fn nine_point_stencil() {
        let smoothed = smooth(&spike(5), Smoother::NinePoint).unwrap();
        let v = smoothed.values();

        assert_eq!(v[[0, 0, 0, 2, 2]], 4.0);
        assert_eq!(v[[0, 0, 0, 1, 2]], 2.0);
        assert_eq!(v[[0, 0, 0, 1, 1]], 1.0);
        assert_eq!(v[[0, 0, 0, 0, 0]], 0.0);

        let five = smooth(&spike(5), Smoother::FivePoint).unwrap();
        assert_eq!(five.values()[[0, 0, 0, 2, 2]], 8.0);
        assert_eq!(five.values()[[0, 0, 0, 2, 1]], 2.0);
    }

    #[test]
    fn windows_conserve_constants() {
        let flat = field("z", "m", unit_domain(6, 4), |x, _| if x == 5.0 { Float::NAN } else { 3.0 });

        for smoother in [Smoother::Rectangular(2), Smoother::Circular(2), Smoother::Gaussian(4), Smoother::FivePoint] {
            let smoothed = smooth(&flat, smoother).unwrap();
            assert!(smoothed.values()[[0, 0, 0, 1, 5]].is_nan());
            assert!(smoothed
                .values()
                .iter()
                .filter(|v| !v.is_nan())
                .all(|v| approx_eq!(Float, *v, 3.0, epsilon = 1e-12)));
        }
    }

    #[test]
    fn rectangle_and_circle() {
        let rect = smooth(&spike(5), Smoother::Rectangular(1)).unwrap();
        assert!(approx_eq!(Float, rect.values()[[0, 0, 0, 1, 1]], 16.0 / 9.0, ulps = 4));

        let circ = smooth(&spike(5), Smoother::Circular(1)).unwrap();
        assert!(approx_eq!(Float, circ.values()[[0, 0, 0, 2, 2]], 16.0 / 5.0, ulps = 4));
        assert_eq!(circ.values()[[0, 0, 0, 1, 1]], 0.0);
    }
}
