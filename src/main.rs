//! coldpix - daily coldest-pixel SST composites and point extraction
//!
//! Entry point for the `coldpix` command line tool.

use serde::Serialize;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use coldpix::batch::{
    compare_buoy, compare_buoy_passes, composite_products, days_between, run_composites,
    CompareOptions,
};
use coldpix::buoy::BuoySeries;
use coldpix::config::Command;
use coldpix::data_loader::load_product;
use coldpix::handlers::router;
use coldpix::writer::CompositeTemplate;
use coldpix::logging::{log_run_failure, RunTimer};
use coldpix::{
    extract, init_tracing, log_product_stats, AppState, ColdpixError, Config, ExtractionQuery,
    Result,
};

#[tokio::main]
async fn main() -> Result<()> {
    let (config, command) = Config::load()?;

    init_tracing(&config.log_level);
    info!("Starting coldpix v{}", env!("CARGO_PKG_VERSION"));

    config.validate().map_err(|e| {
        error!("Invalid configuration: {}", e);
        e
    })?;

    let name = command_name(&command);
    let result = run(config, command).await;
    if let Err(e) = &result {
        log_run_failure(name, e);
    }
    result
}

async fn run(config: Config, command: Command) -> Result<()> {
    match command {
        Command::Composite {
            template,
            pass_dir,
            out_dir,
            start,
            end,
            ..
        } => {
            let end = end.unwrap_or(start);
            let timer = RunTimer::start("composite", &format!("{} to {}", start, end));

            let template = Arc::new(CompositeTemplate::load(&template)?);
            let days = days_between(start, end);
            let reports = run_composites(
                template,
                Arc::new(config.composite.clone()),
                &pass_dir,
                &out_dir,
                days,
                config.worker_count(),
            )
            .await?;

            timer.finish(reports.iter().map(|r| r.skipped).sum());
            print_json(&reports)
        }
        Command::Extract { product, lon, lat, .. } => {
            let profile = config.extraction.product_profile()?;
            let timer = RunTimer::start("extract", &product.display().to_string());
            let loaded = load_product(&product)?;
            log_product_stats(&product.display().to_string(), &loaded);

            let query = ExtractionQuery::new(lon, lat, config.extraction.policy);
            let value = extract(&loaded, &profile, &query);
            timer.finish(usize::from(value.is_nan()));

            #[derive(Serialize)]
            struct ExtractOutput<'a> {
                file_path: String,
                profile: &'a str,
                variable: &'a str,
                #[serde(flatten)]
                query: ExtractionQuery,
                value: Option<f64>,
            }
            print_json(&ExtractOutput {
                file_path: product.display().to_string(),
                profile: &profile.name,
                variable: &profile.variable,
                query,
                value: value.is_finite().then_some(value),
            })
        }
        Command::Compare {
            buoy,
            data_dir,
            start,
            end,
            individual_passes,
            ..
        } => {
            let timer = RunTimer::start("compare", &format!("{} {} to {}", buoy.display(), start, end));
            let series = load_buoy(&buoy)?;
            let options = CompareOptions {
                policy: config.extraction.policy,
                profile: Arc::new(config.extraction.product_profile()?),
                table: config.composite.daylight.clone(),
                reduction: config.extraction.reduction,
                workers: config.worker_count(),
                timeout: config.composite.read_timeout(),
            };

            let report = if individual_passes {
                compare_buoy_passes(
                    &series,
                    &data_dir,
                    &config.composite.pass_suffix,
                    start,
                    end,
                    &options,
                )
                .await?
            } else {
                let products = composite_products(&data_dir, start, end);
                if products.is_empty() {
                    warn!(
                        composite_dir = %data_dir.display(),
                        start = %start,
                        end = %end,
                        "No composites found in range"
                    );
                }
                compare_buoy(&series, &products, &options).await?
            };

            timer.finish(usize::from(report.overall.n == 0));
            print_json(&report)
        }
        Command::Serve { product, .. } => serve(config, &product).await,
    }
}

fn command_name(command: &Command) -> &'static str {
    match command {
        Command::Composite { .. } => "composite",
        Command::Extract { .. } => "extract",
        Command::Compare { .. } => "compare",
        Command::Serve { .. } => "serve",
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn load_buoy(path: &Path) -> Result<BuoySeries> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ColdpixError::missing_input(path, e.to_string()))?;
    Ok(serde_json::from_str(&content)?)
}

async fn serve(config: Config, product_path: &Path) -> Result<()> {
    info!("Loading product: {:?}", product_path);
    let product = load_product(product_path).map_err(|e| {
        error!("Failed to load product: {}", e);
        e
    })?;
    log_product_stats(&product_path.display().to_string(), &product);

    let profile = config.extraction.product_profile()?;
    let app_state = AppState::new(config.clone(), product_path.to_path_buf(), product, profile);
    app_state.validate().map_err(|e| {
        error!("Product cannot be served: {}", e);
        e
    })?;

    let app = router(Arc::new(app_state));

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .map_err(|e| ColdpixError::Config {
                message: format!("Invalid host address: {}", e),
            })?,
        config.server.port,
    ));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ColdpixError::Server {
            message: format!("Failed to bind to address: {}", e),
        })?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ColdpixError::Server {
            message: format!("Server error: {}", e),
        })?;

    info!("Server has been gracefully shut down");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
