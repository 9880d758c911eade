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

//! Probability of threshold exceedance estimated from ensemble members.
//!
//! The distribution of members at a point is approximated by a
//! piecewise linear density through the sorted member values
//! (GEMPAK univariate probability), with linear tails beyond the
//! smallest and largest member.

use crate::algebra::Comparator;
use crate::errors::GridError;
use crate::grid::{Grid, GridAxis, Parameter};
use crate::units::Unit;
use crate::Float;
use log::debug;
use ndarray::ArrayView1;
use std::str::FromStr;

/// Joins two threshold conditions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Combinator {
    And,
    Or,
}

impl FromStr for Combinator {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "and" | "&&" => Ok(Combinator::And),
            "or" | "||" => Ok(Combinator::Or),
            _ => Err(GridError::Value("unknown combinator, use and or or")),
        }
    }
}

const SAME_VALUE: Float = 1e-6;

/// `P(X < threshold)` from the members of one lane.
///
/// Missing members are skipped but still count towards the ensemble size.
fn probability_below(lane: ArrayView1<Float>, threshold: Float) -> Float {
    let mut sorted: Vec<Float> = lane.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(Float::total_cmp);

    let length = lane.len() as Float;
    let n = sorted.len();

    match n {
        0 => return Float::NAN,
        _ if length < 2.0 => return if sorted[0] < threshold { 1.0 } else { 0.0 },
        _ => (),
    }

    // (value, weight, frequency) with near-identical members merged
    let tolerance = 0.001 * (sorted[n - 1] - sorted[0]) / n as Float;
    let mut points: Vec<(Float, Float, Float)> = Vec::with_capacity(n);
    for v in sorted {
        match points.last_mut() {
            Some(last) if (v - last.0).abs() <= tolerance => {
                last.1 += 1.0 / n as Float;
                last.2 += 1.0;
            }
            _ => points.push((v, 1.0 / n as Float, 1.0)),
        }
    }

    if points.len() == 1 {
        let v = points[0].0;
        let (lower, upper) = if v.abs() < SAME_VALUE {
            (-1e-5, 1e-5)
        } else {
            let delta = 1e-5 * v.abs();
            (v - delta, v + delta)
        };
        points = vec![(lower, 0.5, 1.0), (upper, 0.5, 1.0)];
    }

    let m = points.len();
    let x: Vec<Float> = points.iter().map(|p| p.0).collect();

    // intrinsic weights from member spacing
    let mut intrinsic = vec![0.0; m];
    intrinsic[0] = points[0].2 / (x[1] - x[0]);
    for k in 1..m - 1 {
        intrinsic[k] = 2.0 * points[k].2 / (x[k + 1] - x[k - 1]);
    }
    intrinsic[m - 1] = points[m - 1].2 / (x[m - 1] - x[m - 2]);
    let intrinsic_sum: Float = intrinsic.iter().sum();

    let mut w: Vec<Float> = points
        .iter()
        .zip(&intrinsic)
        .map(|(p, z)| z / intrinsic_sum * p.1)
        .collect();
    let total: Float = w.iter().sum();
    w.iter_mut().for_each(|v| *v /= total);

    let area: Float = (1..m).map(|k| 0.5 * (w[k] + w[k - 1]) * (x[k] - x[k - 1])).sum();
    let area = area / (1.0 - 2.0 / (length + 1.0));
    w.iter_mut().for_each(|v| *v /= area);

    let left = x[0] - 2.0 / (w[0] * (length + 1.0));
    let right = x[m - 1] + 2.0 / (w[m - 1] * (length + 1.0));

    let xs: Vec<Float> = std::iter::once(left).chain(x).chain(std::iter::once(right)).collect();
    let ws: Vec<Float> = std::iter::once(0.0).chain(w).chain(std::iter::once(0.0)).collect();

    if threshold < left {
        return 0.0;
    }
    if threshold > right {
        return 1.0;
    }

    let mut cumulative = 0.0;
    for k in 1..xs.len() {
        if (threshold - xs[k - 1]).abs() < SAME_VALUE {
            return cumulative;
        } else if threshold >= xs[k] {
            cumulative += 0.5 * (ws[k] + ws[k - 1]) * (xs[k] - xs[k - 1]);
        } else if threshold > xs[k - 1] {
            let fraction = (threshold - xs[k - 1]) / (xs[k] - xs[k - 1]);
            let density = ws[k - 1] + (ws[k] - ws[k - 1]) * fraction;
            return cumulative + 0.5 * (density + ws[k - 1]) * (threshold - xs[k - 1]);
        }
    }

    cumulative
}

#[derive(Copy, Clone, Debug, PartialEq)]
enum Condition {
    Below(Float),
    Above(Float),
}

impl Condition {
    fn new(op: Comparator, value: Float) -> Result<Self, GridError> {
        match op {
            Comparator::Lt | Comparator::Le => Ok(Condition::Below(value)),
            Comparator::Gt | Comparator::Ge => Ok(Condition::Above(value)),
            Comparator::Eq | Comparator::Ne => Err(GridError::NotImplemented(
                "equality conditions have no probability in a continuous distribution",
            )),
        }
    }

    fn probability(self, lane: ArrayView1<Float>) -> Float {
        match self {
            Condition::Below(v) => probability_below(lane, v),
            Condition::Above(v) => 1.0 - probability_below(lane, v),
        }
    }
}

fn symbol(op: Comparator) -> &'static str {
    match op {
        Comparator::Lt => "<",
        Comparator::Le => "<=",
        Comparator::Gt => ">",
        Comparator::Ge => ">=",
        Comparator::Eq => "==",
        Comparator::Ne => "!=",
    }
}

/// Probability of `X op1 v1`, optionally joined with `X op2 v2`,
/// at every point of an ensemble grid.
///
/// Joined conditions must bound the values from opposite sides:
/// `and` needs a non-empty interval and `or` must not cover
/// every value.
///
/// Members outside the `expected` bounds (inclusive) are dropped,
/// but still count towards the ensemble size.
pub fn ens_probability(
    grid: &Grid,
    op1: Comparator,
    v1: Float,
    op2: Option<Comparator>,
    v2: Option<Float>,
    combinator: Option<Combinator>,
    expected: Option<(Float, Float)>,
) -> Result<Grid, GridError> {
    if let Some((lower, upper)) = expected {
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(GridError::Value("expected bounds must be ordered numbers"));
        }
    }

    let second = match (op2, v2, combinator) {
        (None, None, None) => None,
        (Some(op), Some(v), Some(c)) => Some((op, v, c)),
        _ => {
            return Err(GridError::Value(
                "second condition needs an operator, a value and a combinator",
            ))
        }
    };

    if let Some((_, v, _)) = second {
        if v == v1 {
            return Err(GridError::Value("joined conditions must use different values"));
        }
    }

    let first = Condition::new(op1, v1)?;

    let joined = match second {
        None => None,
        Some((op, v, c)) => {
            let other = Condition::new(op, v)?;

            let (lower, upper) = match (first, other) {
                (Condition::Above(a), Condition::Below(b)) | (Condition::Below(b), Condition::Above(a)) => (a, b),
                _ => {
                    return Err(GridError::NotImplemented(
                        "joined conditions must bound values from opposite sides",
                    ))
                }
            };

            match c {
                Combinator::And if lower >= upper => {
                    return Err(GridError::Logic("joined conditions can never hold together"))
                }
                Combinator::Or if lower <= upper => {
                    return Err(GridError::Logic("joined conditions hold for every value"))
                }
                _ => (),
            }

            Some((c, lower, upper))
        }
    };

    if !grid.is_ensemble() {
        return Err(GridError::MissingAxis("ensemble"));
    }

    let mut name = format!("P({} {} {}", grid.name(), symbol(op1), v1);
    if let Some((op, v, c)) = second {
        name += &format!(" {:?} {} {}", c, symbol(op), v).to_lowercase();
    }
    name += ")";

    debug!("Computing {} from {} members", name, grid.domain_length(GridAxis::Ensemble));

    let values = grid.reduce_lanes(GridAxis::Ensemble, |members| {
        let members = match expected {
            Some((low, high)) => members.mapv(|v| if v < low || v > high { Float::NAN } else { v }),
            None => members.to_owned(),
        };
        let lane = members.view();

        match joined {
            None => first.probability(lane),
            Some((Combinator::And, lower, upper)) => {
                probability_below(lane, upper) - probability_below(lane, lower)
            }
            Some((Combinator::Or, lower, upper)) => {
                probability_below(lane, upper) + 1.0 - probability_below(lane, lower)
            }
        }
    });

    Grid::new(
        Parameter::new(&name, Unit::dimensionless()),
        grid.domain_without(GridAxis::Ensemble),
        values,
    )
}
