//! Multi-day compositing and buoy comparison runs.
//!
//! A calendar day is the unit of compositing work and a (buoy, product file)
//! pair the unit of extraction work. Units run concurrently up to a worker
//! limit; every file read happens on the blocking pool under a timeout, and
//! a failed or slow read only costs the pass or point it belonged to.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Duration as ChronoDuration, NaiveDate, NaiveDateTime};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{debug, info, warn, Instrument};

use crate::buoy::{pair_by_day, pair_with_passes, BuoyReport, BuoySeries, DailyReduction};
use crate::composite::{CompositeBuilder, DaylightTable, IngestOutcome};
use crate::config::CompositeConfig;
use crate::data_loader::{load_product, load_swath};
use crate::error::{ColdpixError, Result};
use crate::extract::{extract, ExtractionQuery, ProductProfile, RadiusPolicy};
use crate::interpolation::get_interpolator;
use crate::logging::{day_span, log_day_summary, log_pass_outcome, log_pass_skipped, PassTally};
use crate::swath::{PassInfo, SwathObservation};
use crate::writer::{output_path, write_composite, CompositeTemplate};

/// Every day from `start` to `end`, inclusive
pub fn days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    let mut days = Vec::new();
    let mut day = start;
    while day <= end {
        days.push(day);
        day += ChronoDuration::days(1);
    }
    days
}

/// Candidate pass files for `day`: names starting with `YYMMDD` and ending with `suffix`.
///
/// Sorted by name with duplicates removed.
pub fn discover_passes(dir: &Path, day: NaiveDate, suffix: &str) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ColdpixError::missing_input(dir, "pass directory not found"));
    }
    let prefix = day.format("%y%m%d").to_string();
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .map(|name| name.starts_with(&prefix) && name.ends_with(suffix))
                .unwrap_or(false)
        })
        .collect();
    files.sort();
    files.dedup();
    Ok(files)
}

/// Outcome of one composited day
#[derive(Debug, Clone, Serialize)]
pub struct DayReport {
    pub day: NaiveDate,
    pub output: PathBuf,
    /// Descriptors of the passes folded in
    pub included_passes: String,
    pub accepted: usize,
    /// Passes outside the window, from another day or repeated
    pub rejected: usize,
    /// Passes that could not be read
    pub skipped: usize,
    pub valid_cells: usize,
    pub duration_ms: u128,
}

/// Read a swath on the blocking pool, giving up after `timeout`
async fn read_swath(
    path: PathBuf,
    variable: String,
    fill_value: f32,
    timeout: Duration,
) -> Result<SwathObservation> {
    let task_path = path.clone();
    let task =
        tokio::task::spawn_blocking(move || load_swath(&task_path, &variable, fill_value));
    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(e)) => Err(ColdpixError::missing_input(
            path,
            format!("read task failed: {}", e),
        )),
        Err(_) => Err(ColdpixError::missing_input(
            path,
            format!("read timed out after {:?}", timeout),
        )),
    }
}

/// Build and write the composite for one day.
///
/// Unreadable passes are skipped with a warning; only a failure to write the
/// output is an error.
pub async fn composite_day(
    template: Arc<CompositeTemplate>,
    settings: Arc<CompositeConfig>,
    pass_dir: PathBuf,
    out_dir: PathBuf,
    day: NaiveDate,
) -> Result<DayReport> {
    let span = day_span(day, settings.daylight.for_day(day));
    build_day(template, settings, pass_dir, out_dir, day)
        .instrument(span)
        .await
}

async fn build_day(
    template: Arc<CompositeTemplate>,
    settings: Arc<CompositeConfig>,
    pass_dir: PathBuf,
    out_dir: PathBuf,
    day: NaiveDate,
) -> Result<DayReport> {
    let start = Instant::now();
    let interpolator = get_interpolator(&settings.interpolation_method)?;
    let mut builder = CompositeBuilder::begin(
        template.grid.clone(),
        day,
        &settings.daylight,
        interpolator,
    );

    let files = discover_passes(&pass_dir, day, &settings.pass_suffix).unwrap_or_else(|e| {
        warn!(error = %e, "Pass discovery failed, compositing no passes");
        Vec::new()
    });
    debug!(candidates = files.len(), "Discovered pass files");

    let mut tally = PassTally::default();
    for path in files {
        let file_name = path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
        let info = match PassInfo::from_path(&path) {
            Ok(info) => info,
            Err(e) => {
                log_pass_skipped(&file_name, &e);
                tally.skipped += 1;
                continue;
            }
        };
        let screened = builder.screen(&info);
        if screened != IngestOutcome::Accepted {
            log_pass_outcome(&info, screened);
            tally.record(screened);
            continue;
        }

        let swath = match read_swath(
            path.clone(),
            settings.sst_variable.clone(),
            settings.fill_value,
            settings.read_timeout(),
        )
        .await
        {
            Ok(swath) => swath,
            Err(e) => {
                log_pass_skipped(&file_name, &e);
                tally.skipped += 1;
                continue;
            }
        };

        let (returned, outcome) = tokio::task::spawn_blocking(move || {
            let outcome = builder.ingest(&swath);
            (builder, outcome)
        })
        .await
        .map_err(|e| ColdpixError::Server {
            message: format!("compositing task failed: {}", e),
        })?;
        builder = returned;
        log_pass_outcome(&info, outcome);
        tally.record(outcome);
    }

    let composite = builder.finalize(settings.fill_value);
    let output = output_path(&out_dir, day);
    let write_path = output.clone();
    let output_variable = settings.output_variable.clone();
    let composite = tokio::task::spawn_blocking(move || {
        write_composite(&write_path, &composite, &template, &output_variable).map(|_| composite)
    })
    .await
    .map_err(|e| ColdpixError::Server {
        message: format!("write task failed: {}", e),
    })??;

    let elapsed = start.elapsed();
    log_day_summary(tally, composite.valid_cells(), elapsed);
    Ok(DayReport {
        day,
        output,
        included_passes: composite.included_passes(),
        accepted: tally.accepted,
        rejected: tally.rejected,
        skipped: tally.skipped,
        valid_cells: composite.valid_cells(),
        duration_ms: elapsed.as_millis(),
    })
}

/// Composite every day in `days` with at most `workers` days in flight.
///
/// Returns the reports in day order, or the first write failure.
pub async fn run_composites(
    template: Arc<CompositeTemplate>,
    settings: Arc<CompositeConfig>,
    pass_dir: &Path,
    out_dir: &Path,
    days: Vec<NaiveDate>,
    workers: usize,
) -> Result<Vec<DayReport>> {
    let results: Vec<Result<DayReport>> = stream::iter(days)
        .map(|day| {
            composite_day(
                template.clone(),
                settings.clone(),
                pass_dir.to_path_buf(),
                out_dir.to_path_buf(),
                day,
            )
        })
        .buffer_unordered(workers.max(1))
        .collect()
        .await;

    let mut reports = results.into_iter().collect::<Result<Vec<_>>>()?;
    reports.sort_by_key(|r| r.day);
    Ok(reports)
}

/// One point to extract from one product file
#[derive(Debug, Clone)]
pub struct ExtractionRequest {
    /// Caller's key, e.g. a buoy id
    pub id: String,
    pub day: NaiveDate,
    pub path: PathBuf,
    pub query: ExtractionQuery,
}

/// Extracted value for a request, NaN when unavailable
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionResult {
    pub id: String,
    pub day: NaiveDate,
    pub value: f64,
}

async fn extract_one(
    request: ExtractionRequest,
    profile: Arc<ProductProfile>,
    timeout: Duration,
) -> ExtractionResult {
    let path = request.path.clone();
    let query = request.query;
    let task = tokio::task::spawn_blocking(move || {
        load_product(&path).map(|product| extract(&product, &profile, &query))
    });

    let value = match tokio::time::timeout(timeout, task).await {
        Ok(Ok(Ok(value))) => value,
        Ok(Ok(Err(e))) => {
            warn!(file_path = %request.path.display(), error = %e, "Product unreadable, using NaN");
            f64::NAN
        }
        Ok(Err(e)) => {
            warn!(file_path = %request.path.display(), error = %e, "Extraction task failed, using NaN");
            f64::NAN
        }
        Err(_) => {
            warn!(file_path = %request.path.display(), "Product read timed out, using NaN");
            f64::NAN
        }
    };

    ExtractionResult {
        id: request.id,
        day: request.day,
        value,
    }
}

/// Run extractions with at most `workers` file reads in flight.
///
/// Results come back in request order; failures are NaN values.
pub async fn run_extractions(
    requests: Vec<ExtractionRequest>,
    profile: Arc<ProductProfile>,
    workers: usize,
    timeout: Duration,
) -> Vec<ExtractionResult> {
    stream::iter(requests)
        .map(|request| extract_one(request, profile.clone(), timeout))
        .buffered(workers.max(1))
        .collect()
        .await
}

/// Existing composite files under `composite_dir` for each day in the range
pub fn composite_products(
    composite_dir: &Path,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<(NaiveDate, PathBuf)> {
    days_between(start, end)
        .into_iter()
        .map(|day| (day, output_path(composite_dir, day)))
        .filter(|(_, path)| path.is_file())
        .collect()
}

/// Options for [`compare_buoy`] and [`compare_buoy_passes`]
#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub policy: RadiusPolicy,
    pub profile: Arc<ProductProfile>,
    pub table: DaylightTable,
    /// Reduction of buoy records to daily values, for daily products
    pub reduction: DailyReduction,
    pub workers: usize,
    pub timeout: Duration,
}

/// Compare a buoy's daily values with values extracted from daily products.
pub async fn compare_buoy(
    series: &BuoySeries,
    products: &[(NaiveDate, PathBuf)],
    options: &CompareOptions,
) -> Result<BuoyReport> {
    let requests = products
        .iter()
        .map(|(day, path)| ExtractionRequest {
            id: series.id.clone(),
            day: *day,
            path: path.clone(),
            query: ExtractionQuery::new(series.lon, series.lat, options.policy),
        })
        .collect();

    let extracted = run_extractions(
        requests,
        options.profile.clone(),
        options.workers,
        options.timeout,
    )
    .await;
    let sat_daily: Vec<(NaiveDate, f64)> = extracted.iter().map(|r| (r.day, r.value)).collect();
    let buoy_daily = options.reduction.apply(series, &options.table);

    let pairs = pair_by_day(&buoy_daily, &sat_daily);
    let report = BuoyReport::from_pairs(&series.id, &options.reduction.to_string(), &pairs)?;
    log_report(&report, products.len());
    Ok(report)
}

/// Compare a buoy with every daylight pass in `pass_dir` from `start` to `end`.
///
/// Each pass is matched with the buoy reading at the pass time.
pub async fn compare_buoy_passes(
    series: &BuoySeries,
    pass_dir: &Path,
    pass_suffix: &str,
    start: NaiveDate,
    end: NaiveDate,
    options: &CompareOptions,
) -> Result<BuoyReport> {
    let mut passes = Vec::new();
    for day in days_between(start, end) {
        let window = options.table.for_day(day);
        for path in discover_passes(pass_dir, day, pass_suffix)? {
            match PassInfo::from_path(&path) {
                Ok(info) if window.contains(info.hour()) => passes.push((info, path)),
                Ok(info) => log_pass_outcome(&info, IngestOutcome::OutsideWindow),
                Err(e) => log_pass_skipped(&path.display().to_string(), &e),
            }
        }
    }

    let requests = passes
        .iter()
        .map(|(info, path)| ExtractionRequest {
            id: info.to_string(),
            day: info.day(),
            path: path.clone(),
            query: ExtractionQuery::new(series.lon, series.lat, options.policy),
        })
        .collect();
    let extracted = run_extractions(
        requests,
        options.profile.clone(),
        options.workers,
        options.timeout,
    )
    .await;

    // run_extractions keeps request order
    let pass_values: Vec<(NaiveDateTime, f64)> = passes
        .iter()
        .zip(&extracted)
        .map(|((info, _), result)| (info.time, result.value))
        .collect();
    let pairs = pair_with_passes(series, &pass_values);
    let report = BuoyReport::from_pairs(&series.id, "individual_passes", &pairs)?;
    log_report(&report, passes.len());
    Ok(report)
}

fn log_report(report: &BuoyReport, products: usize) {
    info!(
        buoy = %report.buoy,
        method = %report.method,
        products = products,
        n = report.overall.n,
        months = report.months.len(),
        rmse = ?report.overall.rmse,
        "Buoy comparison complete"
    );
}
