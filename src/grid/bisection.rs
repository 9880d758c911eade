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

//! Module containg methods for conducting
//! binary search (bisection) of coordinates closest
//! to searched values. Coordinate axes can be sorted
//! ascendingly (eg. longitudes) or descendingly
//! (eg. latitudes from north, pressure levels).

use crate::errors::SearchError;
use crate::Float;

/// Core bisection function, returns the first index
/// at which the axis reaches or passes `x`.
fn binary_search<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    let (first, last) = match (array.first(), array.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(SearchError::EmptyArray),
    };

    if x < first && x < last || x > first && x > last {
        return Err(SearchError::OutOfBounds);
    }

    let ascending = first <= last;
    let mut lo = 0;
    let mut hi = array.len() - 1;

    while lo < hi {
        let mid = (lo + hi) / 2;

        let reached = if ascending {
            array[mid] >= *x
        } else {
            array[mid] <= *x
        };

        if reached {
            hi = mid;
        } else {
            lo = mid + 1;
        }
    }

    Ok(lo)
}

/// Finds the index of the closest coordinate preceding
/// (in axis order) or equal to the searched value.
pub fn find_left_closest<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    let found_index = binary_search(array, x)?;

    if array[found_index] == *x || found_index == 0 {
        Ok(found_index)
    } else {
        Ok(found_index - 1)
    }
}

/// Finds the index of the closest coordinate following
/// (in axis order) or equal to the searched value.
pub fn find_right_closest<T: PartialOrd>(array: &[T], x: &T) -> Result<usize, SearchError> {
    binary_search(array, x)
}

/// Finds two neighbouring coordinates enclosing `x` and the
/// linear interpolation weight of the second one.
///
/// When `x` lies exactly on the last coordinate both indices are equal.
pub fn bracket(array: &[Float], x: Float) -> Result<(usize, usize, Float), SearchError> {
    if x.is_nan() {
        return Err(SearchError::OutOfBounds);
    }

    let left = find_left_closest(array, &x)?;

    if left == array.len() - 1 || array[left] == x {
        return Ok((left, left, 0.0));
    }

    let right = left + 1;
    let weight = (x - array[left]) / (array[right] - array[left]);

    Ok((left, right, weight))
}

/// Finds the index of the coordinate nearest to `x`.
pub fn find_nearest(array: &[Float], x: Float) -> Result<usize, SearchError> {
    let (left, right, weight) = bracket(array, x)?;

    if weight <= 0.5 {
        Ok(left)
    } else {
        Ok(right)
    }
}
