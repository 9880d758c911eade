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

//! RGB composites of three grids.
//!
//! Channel scaling of named products (airmass, dust, ...) is not
//! hard-coded, presets are read from the configuration file
//! and passed to [`compose_rgb`].

use super::{aligned, clip, gamma, Interpolation};
use crate::errors::{ConfigError, GridError};
use crate::grid::{Grid, SpatialDomain};
use crate::Float;
use log::debug;
use serde::{Deserialize, Serialize};

/// Input range and gamma of one composite channel.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ChannelScaling {
    /// Input value mapped to 0.
    pub min: Float,

    /// Input value mapped to 255.
    pub max: Float,

    /// _(Optional)_ Gamma of the channel.
    ///
    /// Must be positive. Defaults to `1.0`.
    #[serde(default = "ChannelScaling::default_gamma")]
    pub gamma: Float,
}

impl ChannelScaling {
    fn default_gamma() -> Float {
        1.0
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::OutOfBounds(
                "Channel range must be finite",
            ));
        }

        if self.min == self.max {
            return Err(ConfigError::OutOfBounds(
                "Channel range cannot be empty",
            ));
        }

        if !(self.gamma > 0.0) || !self.gamma.is_finite() {
            return Err(ConfigError::OutOfBounds(
                "Channel gamma must be positive",
            ));
        }

        Ok(())
    }
}

/// Scaling of the three channels of a named RGB product.
#[derive(Copy, Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct ProductPreset {
    pub red: ChannelScaling,
    pub green: ChannelScaling,
    pub blue: ChannelScaling,
}

impl ProductPreset {
    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        self.red.check_bounds()?;
        self.green.check_bounds()?;
        self.blue.check_bounds()?;

        Ok(())
    }
}

/// Three channel grids on a common spatial domain.
#[derive(Clone, Debug)]
pub struct ColorComposite {
    red: Grid,
    green: Grid,
    blue: Grid,
}

impl ColorComposite {
    pub fn name(&self) -> &str {
        "RGB"
    }

    pub fn red(&self) -> &Grid {
        &self.red
    }

    pub fn green(&self) -> &Grid {
        &self.green
    }

    pub fn blue(&self) -> &Grid {
        &self.blue
    }

    pub fn spatial(&self) -> &SpatialDomain {
        self.red.spatial()
    }
}

/// Combines three channels into a composite without any resampling.
pub fn combine_rgb(red: &Grid, green: &Grid, blue: &Grid) -> Result<ColorComposite, GridError> {
    for channel in [green, blue] {
        if !channel.spatial().matches(red.spatial()) {
            return Err(GridError::DomainMismatch(
                "composite channels must share the spatial domain",
            ));
        }

        red.domain().broadcast(channel.domain())?;
    }

    Ok(ColorComposite {
        red: red.rename("red", None),
        green: green.rename("green", None),
        blue: blue.rename("blue", None),
    })
}

fn scaled_channel(channel: &Grid, scaling: &ChannelScaling) -> Result<Grid, GridError> {
    let (lower, upper) = if scaling.min < scaling.max {
        (scaling.min, scaling.max)
    } else {
        (scaling.max, scaling.min)
    };

    let clipped = clip(channel, lower, upper)?;
    gamma(&clipped, scaling.min, scaling.max, scaling.gamma)
}

/// Builds a composite from raw channels using product scaling.
///
/// Green and blue are resampled onto the domain of red when it differs.
pub fn compose_rgb(
    red: &Grid,
    green: &Grid,
    blue: &Grid,
    preset: &ProductPreset,
    mode: Interpolation,
) -> Result<ColorComposite, GridError> {
    debug!(
        "Composing RGB from {}, {} and {}",
        red.name(),
        green.name(),
        blue.name()
    );

    let green = aligned(red, green, mode)?;
    let blue = aligned(red, blue, mode)?;

    combine_rgb(
        &scaled_channel(red, &preset.red)?,
        &scaled_channel(&green, &preset.green)?,
        &scaled_channel(&blue, &preset.blue)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::testing::*;
    use float_cmp::approx_eq;

    fn preset() -> ProductPreset {
        ProductPreset {
            red: ChannelScaling { min: -4.0, max: 2.0, gamma: 1.0 },
            green: ChannelScaling { min: 0.0, max: 15.0, gamma: 2.5 },
            blue: ChannelScaling { min: 261.0, max: 289.0, gamma: 1.0 },
        }
    }

    #[test]
    fn composite_channels() {
        let red = field("ir1", "K", unit_domain(2, 2), |x, _| -4.0 + 6.0 * x);
        let green = field("ir2", "K", unit_domain(2, 2), |_, _| 15.0);
        let blue = field("ir3", "K", unit_domain(2, 2), |_, _| 300.0);

        let rgb = compose_rgb(&red, &green, &blue, &preset(), Interpolation::Nearest).unwrap();

        assert_eq!(rgb.name(), "RGB");
        assert_eq!(rgb.red().name(), "red");
        assert!(approx_eq!(Float, rgb.red().values()[[0, 0, 0, 0, 0]], 0.0, epsilon = 1e-9));
        assert!(approx_eq!(Float, rgb.red().values()[[0, 0, 0, 0, 1]], 255.0, epsilon = 1e-9));
        assert!(rgb.green().values().iter().all(|v| approx_eq!(Float, *v, 255.0, epsilon = 1e-9)));
        // clipped to the channel range
        assert!(rgb.blue().values().iter().all(|v| approx_eq!(Float, *v, 255.0, epsilon = 1e-9)));
    }

    #[test]
    fn channels_are_resampled() {
        let red = field("ir1", "K", unit_domain(3, 3), |_, _| 0.0);
        let green = field("ir2", "K", unit_domain(5, 5), |_, _| 7.5);
        let blue = field("ir3", "K", unit_domain(3, 3), |_, _| 275.0);

        let rgb = compose_rgb(&red, &green, &blue, &preset(), Interpolation::WeightedAverage).unwrap();
        assert!(rgb.spatial().matches(red.spatial()));

        assert!(matches!(
            combine_rgb(&red, &green, &blue),
            Err(GridError::DomainMismatch(_))
        ));
    }

    #[test]
    fn preset_bounds() {
        let mut broken = preset();
        broken.green.gamma = 0.0;
        assert!(broken.check_bounds().is_err());

        broken = preset();
        broken.red.max = broken.red.min;
        assert!(broken.check_bounds().is_err());

        assert!(preset().check_bounds().is_ok());
    }
}
