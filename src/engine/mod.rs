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

//! Explicit context in which the host runs grid operators.
//!
//! Operators themselves are free functions. The [`Engine`] only holds
//! what they would otherwise take from global state: the configuration
//! (default interpolation, product presets) and a thread pool bounding
//! the parallelism of reductions.

mod configuration;

pub use configuration::{Algebra, Config, Resources};

use crate::algebra::{compose_rgb, ColorComposite, Interpolation};
use crate::errors::{EngineError, GridError};
use crate::grid::Grid;
use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::path::Path;

/// Supplier of grids, implemented by the host data layer.
///
/// Returned grids must carry their spatial domain, unit and
/// `NaN` for missing values.
pub trait GridSource {
    fn load(&self, parameter: &str) -> Result<Grid, GridError>;
}

/// Configuration and thread pool shared by operator calls.
#[derive(Debug)]
pub struct Engine {
    config: Config,
    threadpool: ThreadPool,
}

impl Engine {
    /// Checks the configuration and sets up the thread pool.
    pub fn new(config: Config) -> Result<Self, EngineError> {
        config.check_bounds()?;

        debug!("Setting up ThreadPool with {} threads", config.resources.threads);
        let threadpool = ThreadPoolBuilder::new()
            .num_threads(config.resources.threads as usize)
            .thread_name(|i| format!("gridmath-{}", i))
            .build()?;

        Ok(Engine { config, threadpool })
    }

    pub fn from_file(file_path: &Path) -> Result<Self, EngineError> {
        debug!("Reading configuration from {}", file_path.display());
        Engine::new(Config::new_from_file(file_path)?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Default interpolation for operands on different domains.
    pub fn interpolation(&self) -> Interpolation {
        self.config.algebra.interpolation
    }

    /// Runs `op` inside the engine thread pool, so parallel
    /// reductions called from `op` use at most the configured threads.
    pub fn install<OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce() -> R + Send,
        R: Send,
    {
        self.threadpool.install(op)
    }

    /// Loads a grid from `source` and checks it is usable.
    pub fn load(&self, source: &dyn GridSource, parameter: &str) -> Result<Grid, EngineError> {
        debug!("Loading {}", parameter);
        let grid = source.load(parameter)?;

        if grid.spatial().nx() == 0 || grid.spatial().ny() == 0 {
            return Err(GridError::DomainMismatch("loaded grid has an empty spatial domain").into());
        }

        if grid.values().iter().all(|v| v.is_nan()) {
            warn!("All values of loaded {} are missing", parameter);
        }

        if grid.unit().is_promiscuous() {
            warn!("Loaded {} has no unit, unit checks will be skipped", parameter);
        }

        Ok(grid)
    }

    /// RGB composite of a product preset from configuration.
    pub fn composite(
        &self,
        product: &str,
        red: &Grid,
        green: &Grid,
        blue: &Grid,
    ) -> Result<ColorComposite, EngineError> {
        let preset = self.config.product(product)?;
        info!("Composing {} product", product);

        let composite = self.install(|| compose_rgb(red, green, blue, preset, self.interpolation()))?;

        Ok(composite)
    }
}
