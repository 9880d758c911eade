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

//! Parsing and checking of the engine configuration.
//!
//! The configuration uses [YAML](https://en.wikipedia.org/wiki/YAML)
//! deserialized with `serde`, so malformed files are rejected with
//! a message pointing at the offending field. Every section is optional.
//!
//! ```yaml
//! resources:
//!   threads: 4
//! algebra:
//!   interpolation: weighted_average
//! products:
//!   dust:
//!     red: { min: -4.0, max: 2.0 }
//!     green: { min: 0.0, max: 15.0, gamma: 2.5 }
//!     blue: { min: 261.0, max: 289.0 }
//! ```

use crate::algebra::{Interpolation, ProductPreset};
use crate::errors::ConfigError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::{fs, path::Path};

/// _(Optional)_ Resources available to the engine.
#[derive(Clone, PartialEq, Debug, Deserialize)]
pub struct Resources {
    /// _(Optional)_ Number of workers in the engine thread pool.
    ///
    /// Cannot be less than `1`. Defaults to `1`.
    #[serde(default = "Resources::default_threads")]
    pub threads: u16,
}

impl Resources {
    fn default_threads() -> u16 {
        1
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        if self.threads < 1 {
            return Err(ConfigError::OutOfBounds(
                "Available threads cannot be less than 1",
            ));
        }

        Ok(())
    }
}

impl Default for Resources {
    fn default() -> Self {
        Resources {
            threads: Resources::default_threads(),
        }
    }
}

/// _(Optional)_ Defaults of grid algebra.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
pub struct Algebra {
    /// _(Optional)_ Interpolation used when operands lie on
    /// different spatial domains, `nearest` or `weighted_average`.
    ///
    /// Defaults to `nearest`.
    #[serde(default)]
    pub interpolation: Interpolation,
}

/// Main config structure representing the fields in
/// configuration file.
#[derive(Clone, PartialEq, Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub resources: Resources,

    #[serde(default)]
    pub algebra: Algebra,

    /// Channel scaling of RGB products by product name.
    #[serde(default)]
    pub products: BTreeMap<String, ProductPreset>,
}

impl Config {
    /// Reads configuration from a YAML file and checks it.
    pub fn new_from_file(file_path: &Path) -> Result<Config, ConfigError> {
        let data = fs::read(file_path)?;
        let config: Config = serde_yaml::from_slice(data.as_slice())?;

        config.check_bounds()?;

        Ok(config)
    }

    /// Reads configuration from a YAML string and checks it.
    pub fn from_yaml_str(yaml: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;

        config.check_bounds()?;

        Ok(config)
    }

    pub fn check_bounds(&self) -> Result<(), ConfigError> {
        self.resources.check_bounds()?;

        for preset in self.products.values() {
            preset.check_bounds()?;
        }

        Ok(())
    }

    pub fn product(&self, name: &str) -> Result<&ProductPreset, ConfigError> {
        self.products
            .get(name)
            .ok_or_else(|| ConfigError::UnknownProduct(name.to_string()))
    }
}
