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

//! Partial derivatives of gridded values along one axis.
//!
//! Interior points use the centred difference over the two
//! neighbours, so coordinates do not have to be uniform.
//! Edge points use one-sided first order differences.

use crate::errors::GridError;
use crate::Float;
use ndarray::{Array1, Array5, Axis, Slice};

/// Derivative of `values` along `axis` with respect to `coords`.
pub(crate) fn partial(
    values: &Array5<Float>,
    coords: &[Float],
    axis: Axis,
) -> Result<Array5<Float>, GridError> {
    let n = values.len_of(axis);

    if n < 2 {
        return Err(GridError::Value(
            "derivative needs at least two points along the axis",
        ));
    }

    if coords.len() != n {
        return Err(GridError::DomainMismatch(
            "coordinates do not match the differentiated axis",
        ));
    }

    // coordinates broadcast along all other axes
    let mut shape = [1; 5];
    shape[axis.index()] = n;
    let x = Array1::from(coords.to_vec()).into_shape(shape)?;

    let f = |start: isize, end: Option<isize>| values.slice_axis(axis, Slice::new(start, end, 1));
    let c = |start: isize, end: Option<isize>| x.slice_axis(axis, Slice::new(start, end, 1));

    let mut result = Array5::<Float>::zeros(values.raw_dim());

    if n > 2 {
        let centred = (&f(2, None) - &f(0, Some(-2))) / (&c(2, None) - &c(0, Some(-2)));
        result
            .slice_axis_mut(axis, Slice::new(1, Some(-1), 1))
            .assign(&centred);
    }

    let first = (&f(1, Some(2)) - &f(0, Some(1))) / (&c(1, Some(2)) - &c(0, Some(1)));
    result
        .slice_axis_mut(axis, Slice::new(0, Some(1), 1))
        .assign(&first);

    let last = (&f(-1, None) - &f(-2, Some(-1))) / (&c(-1, None) - &c(-2, Some(-1)));
    result
        .slice_axis_mut(axis, Slice::new(-1, None, 1))
        .assign(&last);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    #[test]
    fn non_uniform_coordinates() {
        let coords: [Float; 3] = [0.0, 1.0, 3.0];
        let values = Array5::from_shape_fn((1, 1, 1, 2, 3), |(_, _, _, _, i)| coords[i].powi(2));

        let derivative = partial(&values, &coords, Axis(4)).unwrap();

        for j in 0..2 {
            assert!(approx_eq!(Float, derivative[[0, 0, 0, j, 0]], 1.0, ulps = 2));
            assert!(approx_eq!(Float, derivative[[0, 0, 0, j, 1]], 3.0, ulps = 2));
            assert!(approx_eq!(Float, derivative[[0, 0, 0, j, 2]], 4.0, ulps = 2));
        }
    }

    #[test]
    fn descending_coordinates() {
        let coords = [30.0, 20.0, 10.0, 0.0];
        let values = Array5::from_shape_fn((2, 1, 1, 4, 1), |(_, _, _, j, _)| 2.0 * coords[j]);

        let derivative = partial(&values, &coords, Axis(3)).unwrap();
        assert!(derivative.iter().all(|d| approx_eq!(Float, *d, 2.0, ulps = 2)));
    }

    #[test]
    fn degenerate_axes() {
        let values = Array5::<Float>::zeros((1, 1, 1, 1, 3));

        assert!(matches!(
            partial(&values, &[0.0], Axis(3)),
            Err(GridError::Value(_))
        ));
        assert!(matches!(
            partial(&values, &[0.0, 1.0], Axis(4)),
            Err(GridError::DomainMismatch(_))
        ));
    }
}
