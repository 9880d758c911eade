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

//! Operators along the time axis.
//!
//! Most operators return grids without time axis unchanged,
//! only those which cannot produce a meaningful result without
//! time fail with [`GridError::MissingAxis`].

use super::{nan_max, nan_mean, nan_min, nan_std, nan_sum};
use crate::algebra;
use crate::constants::SECONDS_PER_DAY;
use crate::errors::GridError;
use crate::grid::{Grid, GridAxis, Parameter, StackedAxis, TimeAxis};
use crate::units::Unit;
use crate::Float;
use chrono::{Datelike, Duration, NaiveDateTime, Timelike};
use log::{debug, info};
use ndarray::{ArrayView1, Axis, Zip};
use std::collections::BTreeSet;
use std::str::FromStr;

pub(crate) fn time_axis(grid: &Grid) -> Result<&TimeAxis, GridError> {
    grid.times().ok_or(GridError::MissingAxis("time"))
}

/// Subset of the grid at given (ordered, unique) time indices.
pub(crate) fn select_times(grid: &Grid, indices: &[usize]) -> Result<Grid, GridError> {
    let times = time_axis(grid)?.select(indices)?;
    let values = grid.select(GridAxis::Time, indices);

    let mut domain = grid.domain().clone();
    domain.time = Some(times);

    grid.with_domain(domain, values)
}

fn over_time<F>(grid: &Grid, keep_times: bool, f: F) -> Result<Grid, GridError>
where
    F: Fn(ArrayView1<Float>) -> Float + Sync + Send,
{
    if !grid.is_time_sequence() {
        return Ok(grid.clone());
    }

    let reduced = grid.reduce_lanes(GridAxis::Time, f);

    if keep_times {
        let repeated = reduced
            .broadcast(grid.shape())
            .ok_or(GridError::DomainMismatch("reduced values cannot be repeated over time"))?
            .to_owned();

        grid.with_values(repeated)
    } else {
        grid.with_domain(grid.domain_without(GridAxis::Time), reduced)
    }
}

/// Mean over time at every point.
///
/// With `keep_times` the result keeps the time axis and every
/// time step holds the mean, otherwise the time axis is removed.
pub fn average_over_time(grid: &Grid, keep_times: bool) -> Result<Grid, GridError> {
    over_time(grid, keep_times, nan_mean)
}

pub fn sum_over_time(grid: &Grid, keep_times: bool) -> Result<Grid, GridError> {
    over_time(grid, keep_times, nan_sum)
}

pub fn min_over_time(grid: &Grid, keep_times: bool) -> Result<Grid, GridError> {
    over_time(grid, keep_times, nan_min)
}

pub fn max_over_time(grid: &Grid, keep_times: bool) -> Result<Grid, GridError> {
    over_time(grid, keep_times, nan_max)
}

/// Population standard deviation over time.
pub fn stdev_over_time(grid: &Grid, keep_times: bool) -> Result<Grid, GridError> {
    over_time(grid, keep_times, nan_std)
}

#[derive(Copy, Clone, Debug)]
enum StepOp {
    Difference,
    Sum,
}

/// Combines every time step `T` with step `T + offset`, or with the
/// first step when `offset` is 0. Steps whose partner lies outside
/// the series are missing.
fn time_step_op(grid: &Grid, offset: i64, op: StepOp) -> Result<Grid, GridError> {
    if !grid.is_time_sequence() {
        return Ok(grid.clone());
    }

    let values = grid.map_lanes(GridAxis::Time, |input, mut output| {
        let n = input.len() as i64;

        for t in 0..n {
            let partner = if offset == 0 { 0 } else { t + offset };

            output[t as usize] = if (0..n).contains(&partner) {
                let (a, b) = (input[t as usize], input[partner as usize]);
                match op {
                    StepOp::Difference => a - b,
                    StepOp::Sum => a + b,
                }
            } else {
                Float::NAN
            };
        }
    });

    grid.with_values(values)
}

/// `D(T) = D(T) - D(T + offset)`, e.g. `offset = -1` gives step-to-step tendency.
pub fn time_step_difference(grid: &Grid, offset: i64) -> Result<Grid, GridError> {
    time_step_op(grid, offset, StepOp::Difference)
}

/// `D(T) = D(T) + D(T + offset)`
pub fn time_step_sum(grid: &Grid, offset: i64) -> Result<Grid, GridError> {
    time_step_op(grid, offset, StepOp::Sum)
}

/// `D(T) = D(T) - D(0)`
pub fn difference_from_base_time(grid: &Grid) -> Result<Grid, GridError> {
    time_step_op(grid, 0, StepOp::Difference)
}

/// Cumulative sum `D(T) = D(0) + ... + D(T)`.
pub fn sum_from_base_time(grid: &Grid) -> Result<Grid, GridError> {
    if !grid.is_time_sequence() {
        return Ok(grid.clone());
    }

    let values = grid.map_lanes(GridAxis::Time, |input, mut output| {
        let mut total = 0.0;
        for (out, value) in output.iter_mut().zip(input) {
            total += value;
            *out = total;
        }
    });

    grid.with_values(values)
}

/// Calendar period used to group time steps.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimePeriod {
    Yearly,
    Monthly,
    Daily,
    Hourly,
}

impl TimePeriod {
    fn key(self, time: &NaiveDateTime) -> (i32, u32, u32, u32) {
        match self {
            TimePeriod::Yearly => (time.year(), 0, 0, 0),
            TimePeriod::Monthly => (time.year(), time.month(), 0, 0),
            TimePeriod::Daily => (time.year(), time.month(), time.day(), 0),
            TimePeriod::Hourly => (time.year(), time.month(), time.day(), time.hour()),
        }
    }
}

impl FromStr for TimePeriod {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "year" | "yr" | "years" | "yearly" => Ok(TimePeriod::Yearly),
            "mon" | "month" | "months" | "monthly" => Ok(TimePeriod::Monthly),
            "day" | "d" | "days" | "daily" => Ok(TimePeriod::Daily),
            "hr" | "hour" | "hours" | "hourly" => Ok(TimePeriod::Hourly),
            _ => Err(GridError::Value("unknown time period, use yearly, monthly, daily or hourly")),
        }
    }
}

/// Runs of consecutive time indices falling into the same period.
fn period_groups(times: &TimeAxis, period: TimePeriod) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut last_key = None;

    for (i, time) in times.times().iter().enumerate() {
        let key = period.key(time);

        match groups.last_mut() {
            Some(group) if last_key == Some(key) => group.push(i),
            _ => groups.push(vec![i]),
        }

        last_key = Some(key);
    }

    groups
}

fn mean_time(times: &[NaiveDateTime], group: &[usize]) -> NaiveDateTime {
    let base = times[group[0]];
    let total: i64 = group.iter().map(|&i| (times[i] - base).num_seconds()).sum();

    base + Duration::seconds(total / group.len() as i64)
}

/// Mean of every calendar period present in the series.
///
/// Output times are the mean times of the averaged steps.
pub fn time_means(grid: &Grid, period: TimePeriod) -> Result<Grid, GridError> {
    let times = time_axis(grid)?;
    let groups = period_groups(times, period);

    debug!("Averaging {} steps of {} into {} {:?} means", times.len(), grid.name(), groups.len(), period);

    let means = groups
        .iter()
        .map(|group| {
            let subset = select_times(grid, group)?;
            average_over_time(&subset, false)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mean_times = groups.iter().map(|g| mean_time(times.times(), g)).collect();

    let stacked = Grid::stack(
        &means,
        StackedAxis::Time(TimeAxis::new(mean_times)?),
    )?;

    Ok(stacked.rename(&format!("{}_time_mean", grid.name()), None))
}

/// Deviation of every step from the mean of its calendar period.
pub fn anomaly_from_time_means(grid: &Grid, period: TimePeriod) -> Result<Grid, GridError> {
    let times = time_axis(grid)?;
    let groups = period_groups(times, period);
    let means = time_means(grid, period)?;

    let mut owner = vec![0; times.len()];
    for (g, group) in groups.iter().enumerate() {
        for &i in group {
            owner[i] = g;
        }
    }

    let expanded = means.select(GridAxis::Time, &owner);
    let mut anomaly = grid.values().clone();
    Zip::from(&mut anomaly)
        .and(&expanded)
        .par_for_each(|v, &m| *v -= m);

    Ok(grid
        .with_values(anomaly)?
        .rename(&format!("{}_anomaly", grid.name()), None))
}

/// Unit of time used for tendencies.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    /// 30 days
    Month,
    Day,
    Hour,
    Minute,
    Second,
}

impl TimeUnit {
    pub fn seconds(self) -> i64 {
        match self {
            TimeUnit::Month => 30 * SECONDS_PER_DAY,
            TimeUnit::Day => SECONDS_PER_DAY,
            TimeUnit::Hour => 3600,
            TimeUnit::Minute => 60,
            TimeUnit::Second => 1,
        }
    }

    pub fn unit(self) -> Unit {
        let symbol = match self {
            TimeUnit::Month => "month",
            TimeUnit::Day => "day",
            TimeUnit::Hour => "h",
            TimeUnit::Minute => "min",
            TimeUnit::Second => "s",
        };

        Unit::new(symbol, Unit::second().dimensions(), self.seconds() as Float, 0.0)
    }
}

impl FromStr for TimeUnit {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mon" | "month" | "months" => Ok(TimeUnit::Month),
            "day" | "d" | "days" => Ok(TimeUnit::Day),
            "hr" | "hour" | "hours" => Ok(TimeUnit::Hour),
            "m" | "min" | "minute" | "minutes" => Ok(TimeUnit::Minute),
            "s" | "sec" | "second" | "seconds" => Ok(TimeUnit::Second),
            _ => Err(GridError::Value("unknown time unit, use month, day, hour, minute or second")),
        }
    }
}

/// Forward-difference tendency between consecutive steps,
/// valid at the midpoints of the steps.
pub fn ddt(grid: &Grid, per: TimeUnit) -> Result<Grid, GridError> {
    let times = time_axis(grid)?;

    if times.len() < 2 {
        return Err(GridError::InvalidCadence(
            "tendency needs at least two time steps".to_string(),
        ));
    }

    let steps: Vec<Float> = times
        .times()
        .windows(2)
        .map(|w| (w[1] - w[0]).num_seconds() as Float / per.seconds() as Float)
        .collect();
    let midpoints = times
        .times()
        .windows(2)
        .map(|w| w[0] + (w[1] - w[0]) / 2)
        .collect();

    let [nt, ne, nz, ny, nx] = grid.shape();
    let mut values = ndarray::Array5::<Float>::zeros((nt - 1, ne, nz, ny, nx));

    Zip::from(values.lanes_mut(Axis(0)))
        .and(grid.values().lanes(Axis(0)))
        .par_for_each(|mut output, input| {
            for (t, dt) in steps.iter().enumerate() {
                output[t] = (input[t + 1] - input[t]) / dt;
            }
        });

    let mut domain = grid.domain().clone();
    domain.time = Some(TimeAxis::new(midpoints)?);

    let unit = grid.unit().div(&per.unit());

    Ok(grid
        .with_domain(domain, values)?
        .rename(&format!("{}_ddt", grid.name()), Some(unit)))
}

fn pearson(x: ArrayView1<Float>, y: ArrayView1<Float>) -> Float {
    let pairs: Vec<(Float, Float)> = x
        .iter()
        .zip(y)
        .filter(|(a, b)| !a.is_nan() && !b.is_nan())
        .map(|(a, b)| (*a, *b))
        .collect();

    if pairs.len() < 2 {
        return Float::NAN;
    }

    let n = pairs.len() as Float;
    let mean_x = pairs.iter().map(|p| p.0).sum::<Float>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<Float>() / n;

    let (mut cov, mut var_x, mut var_y) = (0.0, 0.0, 0.0);
    for (a, b) in pairs {
        cov += (a - mean_x) * (b - mean_y);
        var_x += (a - mean_x).powi(2);
        var_y += (b - mean_y).powi(2);
    }

    cov / (var_x.sqrt() * var_y.sqrt())
}

/// Pearson correlation over time at every point, `y` is resampled
/// onto the spatial domain of `x` if needed.
pub fn correlation(x: &Grid, y: &Grid) -> Result<Grid, GridError> {
    let (tx, ty) = (time_axis(x)?, time_axis(y)?);

    if tx.len() != ty.len() {
        return Err(GridError::DomainMismatch(
            "correlated series must have the same number of time steps",
        ));
    }

    let y = algebra::aligned(x, y, algebra::Interpolation::default())?;

    let domain = x
        .domain_without(GridAxis::Time)
        .broadcast(&y.domain_without(GridAxis::Time))?;

    let mut shape = domain.shape();
    shape[0] = tx.len();

    let xv = x
        .values()
        .broadcast(shape)
        .ok_or(GridError::DomainMismatch("first series cannot be broadcast"))?;
    let yv = y
        .values()
        .broadcast(shape)
        .ok_or(GridError::DomainMismatch("second series cannot be broadcast"))?;

    let values = Zip::from(xv.lanes(Axis(0)))
        .and(yv.lanes(Axis(0)))
        .par_map_collect(|a, b| pearson(a, b))
        .insert_axis(Axis(0));

    Grid::new(
        Parameter::new("correlation", Unit::dimensionless()),
        domain,
        values,
    )
}

/// Selects time steps at which the spatial mean of `selector` lies
/// within `(min, max]`, together with `window.0` preceding and
/// `window.1` following steps.
///
/// `selector` must share the time axis of `grid`.
pub fn time_composite(
    grid: &Grid,
    selector: &Grid,
    min: Float,
    max: Float,
    window: (usize, usize),
) -> Result<Grid, GridError> {
    let times = time_axis(grid)?;

    if selector.times() != Some(times) {
        return Err(GridError::DomainMismatch(
            "composite selector must have the time axis of the grid",
        ));
    }

    let n = times.len();
    let mut indices = BTreeSet::new();

    for (t, step) in selector.values().axis_iter(Axis(0)).enumerate() {
        let (sum, count) = step
            .iter()
            .filter(|v| !v.is_nan())
            .fold((0.0, 0), |(s, c), v| (s + v, c + 1));
        let average = sum / count as Float;

        if min < average && average <= max {
            let first = t.saturating_sub(window.0);
            let last = (t + window.1).min(n - 1);
            indices.extend(first..=last);
        }
    }

    if indices.is_empty() {
        return Err(GridError::Value("no time step matches the composite range"));
    }

    let indices: Vec<usize> = indices.into_iter().collect();
    info!("Time composite of {} uses {} of {} steps", grid.name(), indices.len(), n);

    select_times(grid, &indices)
}

/// Standard seasons as sets of calendar months.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Season {
    Djf,
    Jfm,
    Mam,
    Jja,
    Son,
    Ond,
    Jjas,
}

impl Season {
    pub fn months(self) -> &'static [u32] {
        match self {
            Season::Djf => &[12, 1, 2],
            Season::Jfm => &[1, 2, 3],
            Season::Mam => &[3, 4, 5],
            Season::Jja => &[6, 7, 8],
            Season::Son => &[9, 10, 11],
            Season::Ond => &[10, 11, 12],
            Season::Jjas => &[6, 7, 8, 9],
        }
    }
}

impl FromStr for Season {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "djf" => Ok(Season::Djf),
            "jfm" => Ok(Season::Jfm),
            "mam" => Ok(Season::Mam),
            "jja" => Ok(Season::Jja),
            "son" => Ok(Season::Son),
            "ond" => Ok(Season::Ond),
            "jjas" => Ok(Season::Jjas),
            _ => Err(GridError::Value("unknown season")),
        }
    }
}

/// Calendar components a time step has to match, unset fields match anything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TimeFilter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub season: Option<Season>,
    pub day: Option<u32>,
    pub hour: Option<u32>,
}

impl TimeFilter {
    fn matches(&self, time: &NaiveDateTime) -> bool {
        self.year.map_or(true, |y| time.year() == y)
            && self.month.map_or(true, |m| time.month() == m)
            && self.season.map_or(true, |s| s.months().contains(&time.month()))
            && self.day.map_or(true, |d| time.day() == d)
            && self.hour.map_or(true, |h| time.hour() == h)
    }
}

/// Subset of the series at times matching `filter`.
pub fn sample_at_times(grid: &Grid, filter: &TimeFilter) -> Result<Grid, GridError> {
    if filter.month.is_some() && filter.season.is_some() {
        return Err(GridError::Value("month and season cannot be used together"));
    }

    let times = time_axis(grid)?;
    let indices: Vec<usize> = times
        .times()
        .iter()
        .enumerate()
        .filter(|(_, t)| filter.matches(t))
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        return Err(GridError::Value("no time step matches the filter"));
    }

    select_times(grid, &indices)
}

/// Subset of `a` at times (to the minute) also present in `b`.
pub fn sample_at_times_of(a: &Grid, b: &Grid) -> Result<Grid, GridError> {
    let minute = |t: &NaiveDateTime| (t.date(), t.hour(), t.minute());

    let wanted: BTreeSet<_> = time_axis(b)?.times().iter().map(minute).collect();
    let indices: Vec<usize> = time_axis(a)?
        .times()
        .iter()
        .enumerate()
        .filter(|(_, t)| wanted.contains(&minute(t)))
        .map(|(i, _)| i)
        .collect();

    if indices.is_empty() {
        return Err(GridError::Value("grids have no common time steps"));
    }

    select_times(a, &indices)
}
