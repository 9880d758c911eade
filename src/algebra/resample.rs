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

//! Resampling of grids onto other horizontal domains.
//!
//! Target points are located in the source coordinates with bisection
//! separately along x and y, so both domains must be rectilinear in the
//! same coordinate kind. Points outside the source domain are missing.

use crate::errors::GridError;
use crate::grid::bisection;
use crate::grid::{Grid, SpatialDomain};
use crate::Float;
use log::debug;
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    /// value of the closest source point
    Nearest,
    /// bilinear combination of the four enclosing source points
    WeightedAverage,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Nearest
    }
}

impl FromStr for Interpolation {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "nearest" => Ok(Interpolation::Nearest),
            "weighted_average" | "weighted-average" | "weightedaverage" => {
                Ok(Interpolation::WeightedAverage)
            }
            _ => Err(GridError::Value("unknown interpolation mode")),
        }
    }
}

/// Source indices and weights contributing to one target coordinate.
type Stencil = Option<[(usize, Float); 2]>;

fn stencils(source: &[Float], target: &[Float], mode: Interpolation) -> Vec<Stencil> {
    let (first, last) = (source[0], source[source.len() - 1]);
    let tolerance = 1e-9 * (last - first).abs().max(1.0);

    target
        .iter()
        .map(|&t| {
            // snap coordinates differing from the source edges by rounding only
            let t = if (t - first).abs() <= tolerance {
                first
            } else if (t - last).abs() <= tolerance {
                last
            } else {
                t
            };

            let (left, right, weight) = bisection::bracket(source, t).ok()?;

            match mode {
                Interpolation::Nearest if weight <= 0.5 => Some([(left, 1.0), (left, 0.0)]),
                Interpolation::Nearest => Some([(right, 1.0), (right, 0.0)]),
                Interpolation::WeightedAverage => {
                    Some([(left, 1.0 - weight), (right, weight)])
                }
            }
        })
        .collect()
}

fn interpolate(field: &ArrayView2<Float>, y: &[(usize, Float); 2], x: &[(usize, Float); 2]) -> Float {
    let mut value = 0.0;

    for &(j, wy) in y {
        for &(i, wx) in x {
            let weight = wy * wx;
            if weight != 0.0 {
                value += weight * field[[j, i]];
            }
        }
    }

    value
}

/// Evaluates `source` on the `target` horizontal domain.
///
/// Non-spatial axes are kept, the returned grid uses the target
/// domain (including its rotation angles).
pub fn resample_grid(
    source: &Grid,
    target: &SpatialDomain,
    mode: Interpolation,
) -> Result<Grid, GridError> {
    if source.spatial().kind() != target.kind() {
        return Err(GridError::DomainMismatch(
            "cannot resample between Cartesian and lon/lat domains",
        ));
    }

    if source.spatial().matches(target) {
        return Ok(source.clone());
    }

    debug!(
        "Resampling {} from {}x{} to {}x{} points",
        source.name(),
        source.spatial().nx(),
        source.spatial().ny(),
        target.nx(),
        target.ny()
    );

    let xs = stencils(source.spatial().x(), target.x(), mode);
    let ys = stencils(source.spatial().y(), target.y(), mode);

    let values = source.map_planes((target.ny(), target.nx()), |field, mut output| {
        for (j, sy) in ys.iter().enumerate() {
            for (i, sx) in xs.iter().enumerate() {
                output[[j, i]] = match (sy, sx) {
                    (Some(sy), Some(sx)) => interpolate(&field, sy, sx),
                    _ => Float::NAN,
                };
            }
        }
    })?;

    let mut domain = source.domain().clone();
    domain.spatial = target.clone();

    source.with_domain(domain, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use crate::grid::CoordinateKind;
    use float_cmp::approx_eq;

    fn target() -> SpatialDomain {
        SpatialDomain::new(
            CoordinateKind::Cartesian,
            vec![0.5, 1.5, 3.0],
            vec![0.25, 1.0],
        )
        .unwrap()
    }

    #[test]
    fn bilinear_resampling() {
        let source = field("T", "K", unit_domain(3, 3), |x, y| x + 10.0 * y);
        let resampled = resample_grid(&source, &target(), Interpolation::WeightedAverage).unwrap();

        let values = resampled.values();
        assert!(approx_eq!(Float, values[[0, 0, 0, 0, 0]], 3.0, epsilon = 1e-12));
        assert!(approx_eq!(Float, values[[0, 0, 0, 0, 1]], 4.0, epsilon = 1e-12));
        assert!(approx_eq!(Float, values[[0, 0, 0, 1, 1]], 11.5, epsilon = 1e-12));
        assert!(values[[0, 0, 0, 0, 2]].is_nan());
        assert!(resampled.spatial().matches(&target()));
    }

    #[test]
    fn nearest_resampling() {
        let source = field("T", "K", unit_domain(3, 3), |x, y| x + 10.0 * y);
        let resampled = resample_grid(&source, &target(), Interpolation::Nearest).unwrap();

        let values = resampled.values();
        assert_eq!(values[[0, 0, 0, 0, 0]], 0.0);
        assert_eq!(values[[0, 0, 0, 0, 1]], 1.0);
        assert_eq!(values[[0, 0, 0, 1, 1]], 11.0);
        assert!(values[[0, 0, 0, 1, 2]].is_nan());
    }

    #[test]
    fn kinds_must_agree() {
        let source = field("T", "K", unit_domain(3, 3), |_, _| 1.0);
        let lonlat = SpatialDomain::new(CoordinateKind::LonLat, vec![0.0, 1.0], vec![0.0, 1.0]).unwrap();

        assert!(matches!(
            resample_grid(&source, &lonlat, Interpolation::Nearest),
            Err(GridError::DomainMismatch(_))
        ));
    }

    #[test]
    fn mode_parsing() {
        assert_eq!("nearest".parse::<Interpolation>().unwrap(), Interpolation::Nearest);
        assert_eq!(
            "weighted-average".parse::<Interpolation>().unwrap(),
            Interpolation::WeightedAverage
        );
        assert!("cubic".parse::<Interpolation>().is_err());
    }
}
