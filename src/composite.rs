//! Coldest-pixel compositing.
//!
//! One [`CompositeBuilder`] accumulates the passes of one calendar day on one
//! grid. Each accepted pass is regridded and folded into a running per-cell
//! minimum where missing data never replaces a valid reading, so the coldest
//! cloud-free observation wins. [`CompositeBuilder::finalize`] consumes the
//! builder and yields the read-only [`CompositeGrid`].
//!
//! Only passes captured inside the day's daylight window are used. Windows
//! are half-open hour ranges looked up per month in a [`DaylightTable`].

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ColdpixError, Result};
use crate::geo::GeoGrid;
use crate::interpolation::Interpolator;
use crate::regrid::regrid;
use crate::swath::{PassInfo, SwathObservation};

/// Fill sentinel written for cells no pass covered
pub const DEFAULT_FILL_VALUE: f32 = -999.0;

/// Half-open GMT hour range `[start_hour, end_hour)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaylightWindow {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl DaylightWindow {
    pub fn new(start_hour: u32, end_hour: u32) -> Result<Self> {
        if start_hour >= end_hour || end_hour > 24 {
            return Err(ColdpixError::Config {
                message: format!(
                    "Invalid daylight window {}-{}: need start < end <= 24",
                    start_hour, end_hour
                ),
            });
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    /// Whether a pass captured at `hour` falls inside the window
    pub fn contains(&self, hour: u32) -> bool {
        self.start_hour <= hour && hour < self.end_hour
    }
}

impl fmt::Display for DaylightWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}-{:02}GMT", self.start_hour, self.end_hour)
    }
}

/// Month -> daylight window lookup, January first
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<DaylightWindow>", into = "Vec<DaylightWindow>")]
pub struct DaylightTable([DaylightWindow; 12]);

impl DaylightTable {
    pub fn new(windows: [DaylightWindow; 12]) -> Self {
        Self(windows)
    }

    /// Window for a calendar month, 1-based
    pub fn for_month(&self, month: u32) -> Result<DaylightWindow> {
        if !(1..=12).contains(&month) {
            return Err(ColdpixError::InvalidParameter {
                param: "month".to_string(),
                message: format!("Month must be 1-12, got {}", month),
            });
        }
        Ok(self.0[month as usize - 1])
    }

    /// Window for the month of `day`
    pub fn for_day(&self, day: NaiveDate) -> DaylightWindow {
        self.0[day.month0() as usize]
    }

    pub fn windows(&self) -> &[DaylightWindow; 12] {
        &self.0
    }
}

impl Default for DaylightTable {
    fn default() -> Self {
        const START: [u32; 12] = [14, 14, 13, 13, 12, 12, 12, 12, 13, 13, 14, 14];
        const END: [u32; 12] = [20, 20, 20, 22, 22, 23, 23, 23, 21, 20, 20, 20];
        Self(std::array::from_fn(|m| DaylightWindow {
            start_hour: START[m],
            end_hour: END[m],
        }))
    }
}

impl TryFrom<Vec<DaylightWindow>> for DaylightTable {
    type Error = ColdpixError;

    fn try_from(windows: Vec<DaylightWindow>) -> Result<Self> {
        let len = windows.len();
        let windows: [DaylightWindow; 12] =
            windows.try_into().map_err(|_| ColdpixError::Config {
                message: format!("Daylight table needs 12 monthly windows, got {}", len),
            })?;
        for w in &windows {
            DaylightWindow::new(w.start_hour, w.end_hour)?;
        }
        Ok(Self(windows))
    }
}

impl From<DaylightTable> for Vec<DaylightWindow> {
    fn from(table: DaylightTable) -> Self {
        table.0.to_vec()
    }
}

/// NaN-aware minimum: a NaN operand yields the other operand.
#[inline]
pub fn nan_min(a: f32, b: f32) -> f32 {
    // f32::min already ignores a single NaN operand
    a.min(b)
}

/// Fold `other` into `acc` cell by cell with [`nan_min`].
///
/// # Panics
///
/// Panics if the shapes differ.
pub fn fold_min(acc: &mut Array2<f32>, other: &ArrayView2<f32>) {
    Zip::from(acc).and(other).for_each(|a, &b| *a = nan_min(*a, b));
}

/// Lifecycle stage of a day's composite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CompositeState {
    Empty,
    Accumulating,
    Finalized,
}

/// What happened to a pass offered to [`CompositeBuilder::ingest`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    /// Regridded and folded in
    Accepted,
    /// Captured outside the daylight window
    OutsideWindow,
    /// Captured on another calendar day
    WrongDay,
    /// Same satellite and time as an already accepted pass
    Duplicate,
}

/// Accumulates passes for one (grid, day)
pub struct CompositeBuilder {
    grid: Arc<GeoGrid>,
    day: NaiveDate,
    window: DaylightWindow,
    interpolator: Box<dyn Interpolator>,
    min_sst: Array2<f32>,
    passes: Vec<PassInfo>,
    seen: HashSet<PassInfo>,
}

impl CompositeBuilder {
    /// Start an empty composite for `day`, using the month's window from `table`.
    pub fn begin(
        grid: Arc<GeoGrid>,
        day: NaiveDate,
        table: &DaylightTable,
        interpolator: Box<dyn Interpolator>,
    ) -> Self {
        let window = table.for_day(day);
        Self::with_window(grid, day, window, interpolator)
    }

    /// Start an empty composite with an explicit daylight window.
    pub fn with_window(
        grid: Arc<GeoGrid>,
        day: NaiveDate,
        window: DaylightWindow,
        interpolator: Box<dyn Interpolator>,
    ) -> Self {
        debug!(day = %day, window = %window, "Beginning composite");
        let min_sst = grid.nan_field();
        Self {
            grid,
            day,
            window,
            interpolator,
            min_sst,
            passes: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn window(&self) -> DaylightWindow {
        self.window
    }

    pub fn state(&self) -> CompositeState {
        if self.passes.is_empty() {
            CompositeState::Empty
        } else {
            CompositeState::Accumulating
        }
    }

    /// Decide from the pass identity alone whether it would be folded in.
    ///
    /// Lets callers skip reading files that would be rejected anyway.
    pub fn screen(&self, info: &PassInfo) -> IngestOutcome {
        if info.day() != self.day {
            IngestOutcome::WrongDay
        } else if !self.window.contains(info.hour()) {
            IngestOutcome::OutsideWindow
        } else if self.seen.contains(info) {
            IngestOutcome::Duplicate
        } else {
            IngestOutcome::Accepted
        }
    }

    /// Offer a pass to the composite.
    pub fn ingest(&mut self, pass: &SwathObservation) -> IngestOutcome {
        let outcome = self.screen(&pass.info);
        if outcome != IngestOutcome::Accepted {
            debug!(pass = %pass.info, outcome = ?outcome, "Pass not used");
            return outcome;
        }

        let regridded = regrid(pass, &self.grid, self.interpolator.as_ref());
        fold_min(&mut self.min_sst, &regridded.view());

        self.seen.insert(pass.info.clone());
        self.passes.push(pass.info.clone());
        debug!(
            pass = %pass.info,
            covered_cells = regridded.iter().filter(|v| !v.is_nan()).count(),
            "Pass folded into composite"
        );
        IngestOutcome::Accepted
    }

    /// Close the day: missing cells become `fill_value`.
    pub fn finalize(self, fill_value: f32) -> CompositeGrid {
        let valid_cells = self.min_sst.iter().filter(|v| !v.is_nan()).count();
        let mut sst = self.min_sst;
        sst.mapv_inplace(|v| if v.is_nan() { fill_value } else { v });

        info!(
            day = %self.day,
            window = %self.window,
            passes = self.passes.len(),
            valid_cells = valid_cells,
            "Composite finalized"
        );

        CompositeGrid {
            grid: self.grid,
            day: self.day,
            window: self.window,
            sst,
            fill_value,
            passes: self.passes,
            valid_cells,
        }
    }
}

/// Finished daily composite
#[derive(Debug, Clone)]
pub struct CompositeGrid {
    grid: Arc<GeoGrid>,
    day: NaiveDate,
    window: DaylightWindow,
    sst: Array2<f32>,
    fill_value: f32,
    passes: Vec<PassInfo>,
    valid_cells: usize,
}

impl CompositeGrid {
    pub fn state(&self) -> CompositeState {
        CompositeState::Finalized
    }

    /// Grid the composite is defined on
    pub fn grid(&self) -> &GeoGrid {
        &self.grid
    }

    pub fn day(&self) -> NaiveDate {
        self.day
    }

    pub fn window(&self) -> DaylightWindow {
        self.window
    }

    /// Minimum temperatures, `(lat, lon)`, fill value where no pass contributed
    pub fn sst(&self) -> &Array2<f32> {
        &self.sst
    }

    pub fn fill_value(&self) -> f32 {
        self.fill_value
    }

    /// Accepted passes in ingestion order
    pub fn passes(&self) -> &[PassInfo] {
        &self.passes
    }

    /// Number of cells holding a real temperature
    pub fn valid_cells(&self) -> usize {
        self.valid_cells
    }

    /// `included_passes` metadata, e.g. `NOAA-19 18:54GMT, NOAA-18 19:23GMT`
    pub fn included_passes(&self) -> String {
        self.passes
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
