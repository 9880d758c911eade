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

//! Module containing physical constants used by the operators.

use crate::Float;

///Standard gravity used in pressure-weighted vertical integrals
pub const GRAVITY: Float = 9.8;

///Earth angular velocity doubled ($2\Omega$), in s-1
pub const EARTH_TWO_OMEGA: Float = 0.000_145_84;

///Length of one degree of latitude in metres
pub const METRES_PER_DEGREE: Float = 111_325.0;

///Highest latitude (in degrees) at which zonal spacing shrinks with $\cos\varphi$
///
///Closer to the poles the spacing at this latitude is used
///so that zonal derivatives stay finite.
pub const MAX_METRIC_LATITUDE: Float = 89.0;

///Seconds in one day
pub const SECONDS_PER_DAY: i64 = 86_400;
