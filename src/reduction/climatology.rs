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

//! Monthly and daily climatologies and anomalies from them.

use super::time::{select_times, time_axis};
use super::{nan_mean, nan_std};
use crate::algebra::{aligned, Interpolation};
use crate::errors::GridError;
use crate::grid::{Grid, GridAxis, TimeAxis};
use crate::units::Unit;
use crate::Float;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use log::{debug, warn};
use ndarray::{Array5, ArrayView1, Axis, Slice, Zip};
use std::str::FromStr;

/// Statistic computed for every calendar slot of a climatology.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ClimatologyStat {
    Mean,
    /// Population standard deviation.
    StdDev,
}

impl ClimatologyStat {
    fn reduce(self, lane: ArrayView1<Float>) -> Float {
        match self {
            ClimatologyStat::Mean => nan_mean(lane),
            ClimatologyStat::StdDev => nan_std(lane),
        }
    }
}

impl FromStr for ClimatologyStat {
    type Err = GridError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mean" | "average" => Ok(ClimatologyStat::Mean),
            "stddev" | "stdev" | "std" => Ok(ClimatologyStat::StdDev),
            _ => Err(GridError::Value("unknown climatology statistic, use mean or stddev")),
        }
    }
}

fn month_number(time: &NaiveDateTime) -> i64 {
    time.year() as i64 * 12 + time.month0() as i64
}

/// Statistic of every calendar month of a monthly series.
///
/// The series must span whole years with one sample per month.
/// Slot `i` of the result holds the month of the `i`-th input sample,
/// and the result takes the first 12 input times.
pub fn climatology_monthly(grid: &Grid, stat: ClimatologyStat) -> Result<Grid, GridError> {
    let times = grid.times().ok_or_else(|| {
        GridError::InvalidCadence("monthly climatology needs a time series".to_string())
    })?;

    let n = times.len();
    if n == 0 || n % 12 != 0 {
        return Err(GridError::InvalidCadence(format!(
            "monthly climatology needs whole years of data, got {} samples",
            n
        )));
    }

    let first = month_number(&times.first());
    if let Some((k, t)) = times
        .times()
        .iter()
        .enumerate()
        .find(|(k, t)| month_number(t) != first + *k as i64)
    {
        return Err(GridError::InvalidCadence(format!(
            "sample {} at {} breaks the monthly sequence",
            k, t
        )));
    }

    debug!("Monthly climatology ({:?}) of {} from {} years", stat, grid.name(), n / 12);

    let [_, ne, nz, ny, nx] = grid.shape();
    let mut values = Array5::<Float>::zeros((12, ne, nz, ny, nx));

    for slot in 0..12 {
        let indices: Vec<usize> = (slot..n).step_by(12).collect();
        let reduced = select_times(grid, &indices)?.reduce_lanes(GridAxis::Time, |l| stat.reduce(l));

        values
            .slice_axis_mut(Axis(0), Slice::from(slot..slot + 1))
            .assign(&reduced);
    }

    let mut domain = grid.domain().clone();
    domain.time = Some(times.select(&(0..12).collect::<Vec<_>>())?);

    let climatology = grid.with_domain(domain, values)?;

    Ok(match stat {
        ClimatologyStat::Mean => climatology,
        ClimatologyStat::StdDev => climatology.rename(&format!("{}_stdev", grid.name()), None),
    })
}

/// Departures of a monthly series from a 12-month climatology.
///
/// Sample `k` is compared with the climatology slot of the same calendar
/// month, counting months from the first sample of each. With `normalize`
/// the along-x mean of every row is removed from the anomaly as well.
pub fn monthly_anomaly(series: &Grid, ltm: &Grid, normalize: bool) -> Result<Grid, GridError> {
    let times = time_axis(series)?;

    let ltm_times = ltm.times().ok_or_else(|| {
        GridError::InvalidCadence("climatology must have a time axis".to_string())
    })?;
    if ltm_times.len() != 12 {
        return Err(GridError::InvalidCadence(format!(
            "climatology must have 12 monthly samples, got {}",
            ltm_times.len()
        )));
    }

    let ltm = aligned(series, ltm, Interpolation::default())?.convert_to(series.unit())?;

    let start = times.start_month();
    let ltm_start = ltm_times.start_month();
    let slots: Vec<usize> = (0..times.len())
        .map(|k| (start + k + 12 - ltm_start) % 12)
        .collect();

    let expanded = ltm.select(GridAxis::Time, &slots);
    let expanded = expanded
        .broadcast(series.shape())
        .ok_or(GridError::DomainMismatch("climatology has axes absent from the series"))?;

    let mut anomaly = series.values().clone();
    Zip::from(&mut anomaly)
        .and(&expanded)
        .par_for_each(|v, &m| *v -= m);

    if normalize {
        for mut row in anomaly.lanes_mut(Axis(4)) {
            let mean = nan_mean(row.view());
            row.mapv_inplace(|v| v - mean);
        }
    }

    Ok(series
        .with_values(anomaly)?
        .rename(&format!("{}_anomaly", series.name()), None))
}

/// Position of a day in a 365 or 366 day calendar.
///
/// February 29 has no slot in the 365 day calendar.
fn calendar_slot(time: &NaiveDateTime, leap: bool) -> Option<usize> {
    let reference = if leap { 2000 } else { 2001 };

    NaiveDate::from_ymd_opt(reference, time.month(), time.day()).map(|d| d.ordinal0() as usize)
}

fn calendar_times(leap: bool) -> Result<TimeAxis, GridError> {
    let (reference, days) = if leap { (2000, 366) } else { (2001, 365) };

    let times = (0..days)
        .filter_map(|d| {
            NaiveDate::from_yo_opt(reference, d + 1).and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .collect();

    TimeAxis::new(times)
}

const FEB_28: usize = 58;
const FEB_29: usize = 59;
const MAR_1_LEAP: usize = 60;

/// Mean of every calendar day of a daily series.
///
/// The result has 366 samples (dated in 2000) with `use366` and 365
/// samples (dated in 2001) otherwise, in which case February 29 is
/// ignored. Days absent from the series are missing, except February 29
/// of the 366 day calendar which is then the mean of February 28 and March 1.
pub fn daily_climatology(grid: &Grid, use366: bool) -> Result<Grid, GridError> {
    let times = grid.times().ok_or_else(|| {
        GridError::InvalidCadence("daily climatology needs a time series".to_string())
    })?;

    if times.times().windows(2).any(|w| w[0].date() == w[1].date()) {
        return Err(GridError::InvalidCadence(
            "daily climatology needs at most one sample per day".to_string(),
        ));
    }

    let calendar = calendar_times(use366)?;
    let days = calendar.len();

    let mut members: Vec<Vec<usize>> = vec![Vec::new(); days];
    let mut skipped = 0;
    for (i, time) in times.times().iter().enumerate() {
        match calendar_slot(time, use366) {
            Some(slot) => members[slot].push(i),
            None => skipped += 1,
        }
    }

    if skipped > 0 {
        warn!("{} samples of February 29 ignored in 365 day climatology of {}", skipped, grid.name());
    }

    let [_, ne, nz, ny, nx] = grid.shape();
    let mut values = Array5::<Float>::from_elem((days, ne, nz, ny, nx), Float::NAN);

    for (slot, indices) in members.iter().enumerate().filter(|(_, m)| !m.is_empty()) {
        let reduced = select_times(grid, indices)?.reduce_lanes(GridAxis::Time, nan_mean);

        values
            .slice_axis_mut(Axis(0), Slice::from(slot..slot + 1))
            .assign(&reduced);
    }

    if use366 && members[FEB_29].is_empty() {
        debug!("No February 29 in {}, interpolating the leap day", grid.name());

        let leap_day = (&values.index_axis(Axis(0), FEB_28) + &values.index_axis(Axis(0), MAR_1_LEAP)) / 2.0;
        values.index_axis_mut(Axis(0), FEB_29).assign(&leap_day);
    }

    let mut domain = grid.domain().clone();
    domain.time = Some(calendar);

    grid.with_domain(domain, values)
}

/// Departures of a daily series from a daily climatology.
///
/// With `as_percent` the anomaly is the percentage departure from
/// the climatology. February 29 is compared with the mean of
/// February 28 and March 1 when the climatology has 365 days.
pub fn daily_anomaly(grid: &Grid, clim: &Grid, as_percent: bool) -> Result<Grid, GridError> {
    let times = time_axis(grid)?;

    let leap = match clim.domain_length(GridAxis::Time) {
        366 if clim.is_time_sequence() => true,
        365 if clim.is_time_sequence() => false,
        _ => {
            return Err(GridError::InvalidCadence(
                "daily climatology must have 365 or 366 samples".to_string(),
            ))
        }
    };

    let clim = aligned(grid, clim, Interpolation::default())?.convert_to(grid.unit())?;
    let clim_values = clim.values();

    let [_, ne, nz, ny, nx] = clim.shape();
    let mut reference = Array5::<Float>::zeros((times.len(), ne, nz, ny, nx));

    for (i, time) in times.times().iter().enumerate() {
        let mut target = reference.index_axis_mut(Axis(0), i);

        match calendar_slot(time, leap) {
            Some(slot) => target.assign(&clim_values.index_axis(Axis(0), slot)),
            None => target.assign(
                &((&clim_values.index_axis(Axis(0), FEB_28)
                    + &clim_values.index_axis(Axis(0), FEB_28 + 1))
                    / 2.0),
            ),
        }
    }

    let reference = reference
        .broadcast(grid.shape())
        .ok_or(GridError::DomainMismatch("climatology has axes absent from the series"))?;

    let mut anomaly = grid.values().clone();
    Zip::from(&mut anomaly).and(&reference).par_for_each(|v, &c| {
        *v = if as_percent {
            100.0 * *v / c - 100.0
        } else {
            *v - c
        }
    });

    let name = format!("{}_anomaly", grid.name());
    let unit = if as_percent {
        Some(Unit::new("%", Unit::dimensionless().dimensions(), 0.01, 0.0))
    } else {
        None
    };

    Ok(grid.with_values(anomaly)?.rename(&name, unit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use float_cmp::approx_eq;

    fn lane(grid: &Grid) -> Vec<Float> {
        grid.values().lanes(Axis(0)).into_iter().next().unwrap().to_vec()
    }

    #[test]
    fn monthly_mean_and_spread() {
        // two years, second year 2 units warmer
        let grid = series("T", "K", unit_domain(2, 1), monthly_times(2000, 1, 24), |t, _, _| {
            (t % 12) as Float + if t < 12 { 0.0 } else { 2.0 }
        });

        let mean = climatology_monthly(&grid, ClimatologyStat::Mean).unwrap();
        assert_eq!(mean.domain_length(GridAxis::Time), 12);
        assert_eq!(lane(&mean)[5], 6.0);
        assert_eq!(mean.times().unwrap().first(), date(2000, 1, 1));

        let spread = climatology_monthly(&grid, "stddev".parse().unwrap()).unwrap();
        assert!(spread.values().iter().all(|v| approx_eq!(Float, *v, 1.0, ulps = 2)));
    }

    #[test]
    fn monthly_cadence_is_checked() {
        let short = series("T", "K", unit_domain(1, 1), monthly_times(2000, 1, 13), |_, _, _| 0.0);
        assert!(matches!(
            climatology_monthly(&short, ClimatologyStat::Mean),
            Err(GridError::InvalidCadence(_))
        ));

        let daily = series("T", "K", unit_domain(1, 1), daily_times(date(2000, 1, 1), 12), |_, _, _| 0.0);
        assert!(matches!(
            climatology_monthly(&daily, ClimatologyStat::Mean),
            Err(GridError::InvalidCadence(_))
        ));
    }

    #[test]
    fn anomaly_from_monthly_climatology() {
        let ltm = series("T", "K", unit_domain(3, 1), monthly_times(1990, 1, 12), |t, _, _| t as Float);
        let data = series("T", "K", unit_domain(3, 1), monthly_times(2005, 6, 3), |t, x, _| {
            (5 + t) as Float + x
        });

        let anomaly = monthly_anomaly(&data, &ltm, false).unwrap();
        assert_eq!(anomaly.values()[[2, 0, 0, 0, 2]], 2.0);

        let normalized = monthly_anomaly(&data, &ltm, true).unwrap();
        assert_eq!(normalized.values()[[1, 0, 0, 0, 0]], -1.0);
        assert_eq!(normalized.values()[[1, 0, 0, 0, 1]], 0.0);

        let bad = series("T", "K", unit_domain(3, 1), monthly_times(1990, 1, 11), |_, _, _| 0.0);
        assert!(matches!(
            monthly_anomaly(&data, &bad, false),
            Err(GridError::InvalidCadence(_))
        ));
    }

    #[test]
    fn daily_climatology_calendars() {
        // 2003 and 2004 (leap), value is the year offset
        let times = daily_times(date(2003, 1, 1), 731);
        let grid = series("T", "K", unit_domain(1, 1), times, |t, _, _| if t < 365 { 0.0 } else { 2.0 });

        let clim = daily_climatology(&grid, false).unwrap();
        assert_eq!(clim.domain_length(GridAxis::Time), 365);
        assert!(lane(&clim).iter().all(|v| *v == 1.0));

        let leap = daily_climatology(&grid, true).unwrap();
        let days = lane(&leap);
        assert_eq!(days.len(), 366);
        assert_eq!(days[FEB_29], 2.0);
        assert_eq!(days[365], 1.0);
    }

    #[test]
    fn leap_day_is_interpolated() {
        let grid = series("T", "K", unit_domain(1, 1), daily_times(date(2001, 2, 27), 3), |t, _, _| {
            t as Float
        });

        let clim = daily_climatology(&grid, true).unwrap();
        let days = lane(&clim);
        assert_eq!(days[FEB_28], 1.0);
        assert_eq!(days[FEB_29], 1.5);
        assert_eq!(days[MAR_1_LEAP], 2.0);
        assert!(days[0].is_nan());
    }

    #[test]
    fn daily_departures() {
        let clim = series("T", "mm", unit_domain(1, 1), daily_times(date(2001, 1, 1), 365), |_, _, _| 4.0);
        let data = series("T", "mm", unit_domain(1, 1), daily_times(date(2004, 2, 28), 3), |_, _, _| 5.0);

        let anomaly = daily_anomaly(&data, &clim, false).unwrap();
        assert_eq!(lane(&anomaly), vec![1.0, 1.0, 1.0]);

        let percent = daily_anomaly(&data, &clim, true).unwrap();
        assert_eq!(lane(&percent), vec![25.0, 25.0, 25.0]);
        assert_eq!(percent.unit().symbol(), "%");
    }
}
