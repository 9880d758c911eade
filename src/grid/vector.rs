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

//! Horizontal vector fields.
//!
//! Components are either relative to the grid axes or to true
//! east and north. Vector arithmetic never converts frames:
//! adding or subtracting vectors in different frames is an error and
//! the caller has to convert one of them with [`VectorGrid::to_true_vector`]
//! or [`VectorGrid::to_grid_vector`] first. Differential operators in
//! [`crate::kinematics`] rotate true vectors to the grid frame themselves.

use super::Grid;
use crate::algebra;
use crate::errors::GridError;
use crate::Float;
use log::debug;
use nalgebra::{Rotation2, Vector2};
use ndarray::{Array5, Zip};
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Frame {
    GridRelative,
    TrueNorth,
}

#[derive(Clone, Debug)]
pub struct VectorGrid {
    u: Grid,
    v: Grid,
    frame: Frame,
}

impl VectorGrid {
    /// Creates vector grid from components on identical domains,
    /// `v` is converted to the unit of `u`.
    pub fn new(u: Grid, v: Grid, frame: Frame) -> Result<Self, GridError> {
        let (du, dv) = (u.domain(), v.domain());

        if !du.spatial.matches(&dv.spatial)
            || du.time != dv.time
            || du.levels != dv.levels
            || du.ensemble != dv.ensemble
        {
            return Err(GridError::DomainMismatch(
                "vector components must have identical domains",
            ));
        }

        let v = v.convert_to(u.unit())?;

        Ok(VectorGrid { u, v, frame })
    }

    pub fn u(&self) -> &Grid {
        &self.u
    }

    pub fn v(&self) -> &Grid {
        &self.v
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn into_components(self) -> (Grid, Grid) {
        (self.u, self.v)
    }

    pub fn to_true_vector(&self) -> Result<VectorGrid, GridError> {
        match self.frame {
            Frame::TrueNorth => Ok(self.clone()),
            Frame::GridRelative => self.rotated(1.0, Frame::TrueNorth),
        }
    }

    pub fn to_grid_vector(&self) -> Result<VectorGrid, GridError> {
        match self.frame {
            Frame::GridRelative => Ok(self.clone()),
            Frame::TrueNorth => self.rotated(-1.0, Frame::GridRelative),
        }
    }

    /// Rotates components by the domain rotation angle multiplied by `direction`.
    fn rotated(&self, direction: Float, frame: Frame) -> Result<VectorGrid, GridError> {
        let angles = match self.u.spatial().rotation() {
            Some(angles) => angles,
            None => {
                return Ok(VectorGrid {
                    u: self.u.clone(),
                    v: self.v.clone(),
                    frame,
                })
            }
        };

        debug!("Rotating {}/{} to {:?} frame", self.u.name(), self.v.name(), frame);

        let angles = angles
            .broadcast(self.u.shape())
            .ok_or(GridError::DomainMismatch("rotation does not fit the domain"))?;

        let mut u = Array5::<Float>::zeros(self.u.values().raw_dim());
        let mut v = Array5::<Float>::zeros(self.v.values().raw_dim());

        Zip::from(&mut u)
            .and(&mut v)
            .and(self.u.values())
            .and(self.v.values())
            .and(&angles)
            .par_for_each(|u_out, v_out, &u_in, &v_in, &angle| {
                let rotated = Rotation2::new(direction * angle) * Vector2::new(u_in, v_in);
                *u_out = rotated.x;
                *v_out = rotated.y;
            });

        Ok(VectorGrid {
            u: self.u.with_values(u)?,
            v: self.v.with_values(v)?,
            frame,
        })
    }

    pub fn check_frame(&self, other: &VectorGrid) -> Result<(), GridError> {
        if self.frame == other.frame {
            Ok(())
        } else {
            Err(GridError::FrameMismatch)
        }
    }

    pub fn add(&self, other: &VectorGrid) -> Result<VectorGrid, GridError> {
        self.check_frame(other)?;

        VectorGrid::new(
            algebra::add(&self.u, &other.u)?,
            algebra::add(&self.v, &other.v)?,
            self.frame,
        )
    }

    pub fn sub(&self, other: &VectorGrid) -> Result<VectorGrid, GridError> {
        self.check_frame(other)?;

        VectorGrid::new(
            algebra::sub(&self.u, &other.u)?,
            algebra::sub(&self.v, &other.v)?,
            self.frame,
        )
    }

    pub fn scale(&self, factor: Float) -> VectorGrid {
        VectorGrid {
            u: algebra::scale(&self.u, factor),
            v: algebra::scale(&self.v, factor),
            frame: self.frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use float_cmp::approx_eq;
    use ndarray::Array2;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn rotation_round_trip() {
        let spatial = unit_domain(3, 2)
            .with_rotation(Array2::from_elem((2, 3), FRAC_PI_2))
            .unwrap();
        let u = field("u", "m/s", spatial.clone(), |_, _| 1.0);
        let v = field("v", "m/s", spatial, |_, _| 0.0);

        let grid_wind = VectorGrid::new(u, v, Frame::GridRelative).unwrap();
        let true_wind = grid_wind.to_true_vector().unwrap();

        assert_eq!(true_wind.frame(), Frame::TrueNorth);
        assert!(true_wind.u().values().iter().all(|x| approx_eq!(Float, *x, 0.0, epsilon = 1e-12)));
        assert!(true_wind.v().values().iter().all(|x| approx_eq!(Float, *x, 1.0, epsilon = 1e-12)));

        let back = true_wind.to_grid_vector().unwrap();
        assert!(back.u().values().iter().all(|x| approx_eq!(Float, *x, 1.0, epsilon = 1e-12)));
        assert!(back.v().values().iter().all(|x| approx_eq!(Float, *x, 0.0, epsilon = 1e-12)));
    }

    #[test]
    fn frames_are_not_mixed() {
        let u = field("u", "m/s", unit_domain(2, 2), |_, _| 1.0);
        let v = field("v", "m/s", unit_domain(2, 2), |_, _| 2.0);

        let grid_wind = VectorGrid::new(u.clone(), v.clone(), Frame::GridRelative).unwrap();
        let true_wind = VectorGrid::new(u, v, Frame::TrueNorth).unwrap();

        assert!(matches!(grid_wind.add(&true_wind), Err(GridError::FrameMismatch)));

        let sum = grid_wind.add(&true_wind.to_grid_vector().unwrap()).unwrap();
        assert!(sum.v().values().iter().all(|x| *x == 4.0));
    }

    #[test]
    fn components_share_domain() {
        let u = field("u", "m/s", unit_domain(2, 2), |_, _| 1.0);
        let v = field("v", "m/s", unit_domain(3, 2), |_, _| 2.0);
        let t = field("t", "K", unit_domain(2, 2), |_, _| 2.0);

        assert!(VectorGrid::new(u.clone(), v, Frame::GridRelative).is_err());
        assert!(matches!(
            VectorGrid::new(u, t, Frame::GridRelative),
            Err(GridError::Unit(_))
        ));
    }
}
