//! Structured logging for coldpix.
//!
//! Compositing runs log inside a span per day, so every pass decision carries
//! the day and its daylight window. The point service logs each request with
//! the profile and policy it was answered under.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::Request;
use chrono::NaiveDate;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::trace::{DefaultOnRequest, DefaultOnResponse, MakeSpan, TraceLayer};
use tower_http::LatencyUnit;
use tracing::{debug, error, info, info_span, warn, Level, Span};
use uuid::Uuid;

use crate::composite::{DaylightWindow, IngestOutcome};
use crate::error::ColdpixError;
use crate::extract::{ExtractionQuery, ProductProfile};
use crate::product::GriddedProduct;
use crate::swath::PassInfo;

/// Initialize the tracing subscriber; `RUST_LOG` wins over `log_level`
pub fn init_tracing(log_level: &str) {
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string());

    // Tests and embedders may have installed a subscriber already
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .try_init();
}

/// Span wrapping all work on one composite day
pub fn day_span(day: NaiveDate, window: DaylightWindow) -> Span {
    info_span!("composite_day", day = %day, window = %window)
}

/// Log how a candidate pass was handled
pub fn log_pass_outcome(pass: &PassInfo, outcome: IngestOutcome) {
    match outcome {
        IngestOutcome::Accepted => debug!(pass = %pass, "Pass accepted"),
        IngestOutcome::OutsideWindow => debug!(pass = %pass, hour = pass.hour(), "Pass outside daylight window"),
        IngestOutcome::WrongDay => warn!(pass = %pass, pass_day = %pass.day(), "Pass belongs to another day"),
        IngestOutcome::Duplicate => debug!(pass = %pass, "Pass already composited"),
    }
}

/// Log a pass file that could not be used at all
pub fn log_pass_skipped(file_name: &str, error: &ColdpixError) {
    warn!(file = file_name, error = %error, "Skipping unusable pass");
}

/// Counts for one finished composite day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassTally {
    pub accepted: usize,
    pub rejected: usize,
    pub skipped: usize,
}

impl PassTally {
    /// Count an ingest outcome
    pub fn record(&mut self, outcome: IngestOutcome) {
        match outcome {
            IngestOutcome::Accepted => self.accepted += 1,
            _ => self.rejected += 1,
        }
    }
}

/// One summary line per composited day
pub fn log_day_summary(tally: PassTally, valid_cells: usize, elapsed: Duration) {
    info!(
        accepted = tally.accepted,
        rejected = tally.rejected,
        skipped = tally.skipped,
        valid_cells = valid_cells,
        duration_ms = elapsed.as_millis() as u64,
        "Day composited"
    );
}

/// Wall-clock timer for a whole CLI run
pub struct RunTimer {
    command: &'static str,
    started: Instant,
}

impl RunTimer {
    /// Log the start of `command` and begin timing it
    pub fn start(command: &'static str, scope: &str) -> Self {
        info!(command = command, scope = scope, "Run started");
        Self {
            command,
            started: Instant::now(),
        }
    }

    /// Log the end of the run; `problems` counts inputs that had to be skipped
    pub fn finish(self, problems: usize) -> Duration {
        let elapsed = self.started.elapsed();
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        if problems == 0 {
            info!(command = self.command, duration_ms = duration_ms, "Run finished");
        } else {
            warn!(
                command = self.command,
                duration_ms = duration_ms,
                problems = problems,
                "Run finished with skipped inputs"
            );
        }
        elapsed
    }
}

/// Log a command that failed outright
pub fn log_run_failure(command: &str, error: &ColdpixError) {
    error!(command = command, error = %error, "Run failed");
}

/// Log what a loaded product holds
pub fn log_product_stats(file_path: &str, product: &GriddedProduct) {
    let mut names: Vec<&str> = product.metadata.variables.keys().map(String::as_str).collect();
    names.sort_unstable();
    let mut dims: Vec<String> = product
        .metadata
        .dimensions
        .values()
        .map(|d| format!("{}={}", d.name, d.size))
        .collect();
    dims.sort_unstable();

    info!(
        file_path = file_path,
        var_count = names.len(),
        vars = %names.join(", "),
        dims = %dims.join(", "),
        memory_mb = product.data_memory_bytes() / (1024 * 1024),
        "Product loaded"
    );
}

/// Identifier attached to every point service response
pub fn new_request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Log an answered point extraction
pub fn log_point_extracted(
    request_id: &str,
    profile: &ProductProfile,
    query: &ExtractionQuery,
    value: f64,
    elapsed: Duration,
) {
    info!(
        request_id = request_id,
        profile = %profile,
        lon = query.lon,
        lat = query.lat,
        policy = %query.policy,
        value = value,
        duration_us = elapsed.as_micros() as u64,
        "Point extracted"
    );
}

/// Log a point request that could not be answered with a value
pub fn log_point_failure(
    request_id: &str,
    profile: &ProductProfile,
    lon: f64,
    lat: f64,
    policy: Option<&str>,
    error: &ColdpixError,
) {
    warn!(
        request_id = request_id,
        profile = %profile,
        lon = lon,
        lat = lat,
        policy = policy.unwrap_or("default"),
        error = %error,
        "Point request failed"
    );
}

/// Request span tagged with the product the service answers from
#[derive(Debug, Clone)]
pub struct ProductSpan {
    profile: Arc<str>,
    variable: Arc<str>,
}

impl ProductSpan {
    pub fn new(profile: &ProductProfile) -> Self {
        Self {
            profile: Arc::from(profile.name.as_str()),
            variable: Arc::from(profile.variable.as_str()),
        }
    }
}

impl<B> MakeSpan<B> for ProductSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            query = request.uri().query().unwrap_or(""),
            profile = %self.profile,
            variable = %self.variable,
        )
    }
}

/// HTTP trace layer for the point service
pub fn http_trace_layer(
    profile: &ProductProfile,
) -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, ProductSpan, DefaultOnRequest, DefaultOnResponse>
{
    TraceLayer::new_for_http()
        .make_span_with(ProductSpan::new(profile))
        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Micros),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pass_tally() {
        let mut tally = PassTally::default();
        tally.record(IngestOutcome::Accepted);
        tally.record(IngestOutcome::OutsideWindow);
        tally.record(IngestOutcome::Duplicate);
        tally.record(IngestOutcome::Accepted);
        tally.skipped += 1;
        assert_eq!(
            tally,
            PassTally {
                accepted: 2,
                rejected: 2,
                skipped: 1
            }
        );
    }

    #[test]
    fn test_run_timer() {
        init_tracing("debug");
        let timer = RunTimer::start("composite", "2019-07-04 to 2019-07-05");
        std::thread::sleep(Duration::from_millis(2));
        assert!(timer.finish(1) >= Duration::from_millis(2));
    }

    #[test]
    fn test_product_span() {
        init_tracing("debug");
        let mut make = ProductSpan::new(&ProductProfile::rtg());
        let request = Request::builder()
            .uri("/point?lon=-74.5&lat=38.5")
            .body(())
            .unwrap();
        let span = make.make_span(&request);
        let _entered = span.enter();
        log_product_stats("memory", &GriddedProduct::default());
    }

    #[test]
    fn test_request_ids_are_unique() {
        assert_ne!(new_request_id(), new_request_id());
    }
}
