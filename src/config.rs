//! Configuration management for coldpix.
//!
//! This module handles the layered configuration system with the following precedence:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. JSON config file
//! 4. Default values (lowest priority)

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::buoy::DailyReduction;
use crate::composite::{DaylightTable, DEFAULT_FILL_VALUE};
use crate::error::{ColdpixError, Result};
use crate::extract::{ProductProfile, RadiusPolicy};
use crate::interpolation::get_interpolator;

/// Command-line arguments for coldpix
#[derive(Parser, Debug)]
#[command(name = "coldpix")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to JSON configuration file
    #[arg(short, long, env = "COLDPIX_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "COLDPIX_LOG_LEVEL", global = true)]
    pub log_level: Option<String>,

    /// Number of concurrent workers
    #[arg(short, long, env = "COLDPIX_WORKERS", global = true)]
    pub workers: Option<usize>,
}

/// What to run
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Build daily coldest-pixel composites
    Composite {
        /// Template NetCDF file defining the output grid and schema
        template: PathBuf,
        /// Directory holding the satellite pass files
        pass_dir: PathBuf,
        /// Root output directory (one subdirectory per year)
        out_dir: PathBuf,
        /// First day to process (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day to process, inclusive (defaults to --start)
        #[arg(long)]
        end: Option<NaiveDate>,
        /// Interpolation method (bilinear, nearest)
        #[arg(long)]
        interpolation: Option<String>,
    },
    /// Extract one value from a gridded product and print it as JSON
    Extract {
        /// Gridded NetCDF product
        product: PathBuf,
        /// Longitude, degrees east
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
        /// Latitude, degrees north
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        /// Radius policy ("5", "closest", "closestwithin5")
        #[arg(long)]
        policy: Option<String>,
        /// Product profile (daily_avhrr, avhrr, cold_sport, sport, rtg, nrel)
        #[arg(long)]
        profile: Option<String>,
        /// Temperature variable, overriding the profile's
        #[arg(long)]
        variable: Option<String>,
    },
    /// Compare a buoy series against satellite data and print overall and monthly statistics
    Compare {
        /// Buoy series as JSON (id, lon, lat, observations)
        buoy: PathBuf,
        /// Root composite directory (as written by `composite`), or the
        /// pass directory with --individual-passes
        data_dir: PathBuf,
        /// First day (YYYY-MM-DD)
        #[arg(long)]
        start: NaiveDate,
        /// Last day, inclusive
        #[arg(long)]
        end: NaiveDate,
        /// Radius policy
        #[arg(long)]
        policy: Option<String>,
        /// Product profile (defaults to avhrr with --individual-passes)
        #[arg(long)]
        profile: Option<String>,
        /// Buoy daily value for daily products (daylight_mean, median)
        #[arg(long)]
        reduction: Option<String>,
        /// Match each daylight pass with the buoy reading at the pass time
        #[arg(long)]
        individual_passes: bool,
    },
    /// Serve point extraction over HTTP
    Serve {
        /// Gridded NetCDF product to serve
        product: PathBuf,
        /// Host address to bind to
        #[arg(short = 'H', long, env = "COLDPIX_HOST")]
        host: Option<String>,
        /// Port to listen on
        #[arg(short, long, env = "COLDPIX_PORT")]
        port: Option<u16>,
        /// Default radius policy
        #[arg(long)]
        policy: Option<String>,
        /// Product profile
        #[arg(long)]
        profile: Option<String>,
        /// Temperature variable, overriding the profile's
        #[arg(long)]
        variable: Option<String>,
    },
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of concurrent workers (None = number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
}

/// Compositing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeConfig {
    /// Month -> daylight window table
    #[serde(default)]
    pub daylight: DaylightTable,

    /// Value written where no pass contributed
    #[serde(default = "default_fill_value")]
    pub fill_value: f32,

    /// Temperature variable in pass files
    #[serde(default = "default_sst_variable")]
    pub sst_variable: String,

    /// Temperature variable in composite files
    #[serde(default = "default_output_variable")]
    pub output_variable: String,

    /// File name suffix of pass files
    #[serde(default = "default_pass_suffix")]
    pub pass_suffix: String,

    /// Regridding interpolation method
    #[serde(default = "default_interpolation")]
    pub interpolation_method: String,

    /// Per-file read timeout
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
}

impl CompositeConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }
}

/// Point extraction configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Radius policy, e.g. "closestwithin5"
    #[serde(default = "default_policy")]
    pub policy: RadiusPolicy,

    /// Product profile name
    #[serde(default = "default_profile")]
    pub profile: String,

    /// Temperature variable overriding the profile's
    #[serde(default)]
    pub variable: Option<String>,

    /// Buoy daily value used in comparisons with daily products
    #[serde(default)]
    pub reduction: DailyReduction,
}

impl ExtractionConfig {
    /// The configured profile with any variable override applied
    pub fn product_profile(&self) -> Result<ProductProfile> {
        let profile: ProductProfile = self.profile.parse()?;
        Ok(match &self.variable {
            Some(variable) => profile.with_variable(variable.clone()),
            None => profile,
        })
    }
}

/// Complete configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Compositing configuration
    #[serde(default)]
    pub composite: CompositeConfig,

    /// Extraction configuration
    #[serde(default)]
    pub extraction: ExtractionConfig,

    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn parse_policy(text: &str) -> Result<RadiusPolicy> {
    text.parse().map_err(|e: ColdpixError| ColdpixError::Config {
        message: e.to_string(),
    })
}

impl Config {
    /// Load configuration from all sources with proper precedence
    pub fn load() -> Result<(Self, Command)> {
        let args = Args::parse();
        let config = Self::from_args(&args)?;
        Ok((config, args.command))
    }

    /// Build the configuration for already parsed arguments
    pub fn from_args(args: &Args) -> Result<Self> {
        // Start with defaults
        let mut config = Config::default();

        // Load from JSON file if provided
        if let Some(config_path) = &args.config {
            let json_config = Self::load_from_file(config_path)?;
            config.merge(json_config);
        }

        // Override with command-line arguments
        if let Some(level) = &args.log_level {
            config.log_level = level.clone();
        }
        if args.workers.is_some() {
            config.server.workers = args.workers;
        }

        match &args.command {
            Command::Composite { interpolation, .. } => {
                if let Some(method) = interpolation {
                    config.composite.interpolation_method = method.clone();
                }
            }
            Command::Extract {
                policy,
                profile,
                variable,
                ..
            }
            | Command::Serve {
                policy,
                profile,
                variable,
                ..
            } => {
                if let Some(policy) = policy {
                    config.extraction.policy = parse_policy(policy)?;
                }
                if let Some(profile) = profile {
                    config.extraction.profile = profile.clone();
                }
                if variable.is_some() {
                    config.extraction.variable = variable.clone();
                }
            }
            Command::Compare {
                policy,
                profile,
                reduction,
                individual_passes,
                ..
            } => {
                if let Some(policy) = policy {
                    config.extraction.policy = parse_policy(policy)?;
                }
                match profile {
                    Some(profile) => config.extraction.profile = profile.clone(),
                    None if *individual_passes => config.extraction.profile = "avhrr".to_string(),
                    None => {}
                }
                if let Some(reduction) = reduction {
                    config.extraction.reduction =
                        reduction.parse::<DailyReduction>().map_err(|e: ColdpixError| ColdpixError::Config {
                            message: e.to_string(),
                        })?;
                }
            }
        }

        if let Command::Serve { host, port, .. } = &args.command {
            if let Some(host) = host {
                config.server.host = host.clone();
            }
            if let Some(port) = port {
                config.server.port = *port;
            }
        }

        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        self.server.host = other.server.host;
        self.server.port = other.server.port;
        if other.server.workers.is_some() {
            self.server.workers = other.server.workers;
        }
        self.composite = other.composite;
        self.extraction = other.extraction;
        self.log_level = other.log_level;
    }

    /// Number of concurrent workers for batch runs
    pub fn worker_count(&self) -> usize {
        self.server.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate server host (must be a valid IP or hostname)
        if self.server.host.is_empty() {
            return Err(ColdpixError::Config {
                message: "Server host cannot be empty".to_string(),
            });
        }

        // Validate port (0 is not a valid port for users)
        if self.server.port == 0 {
            return Err(ColdpixError::Config {
                message: "Server port cannot be 0".to_string(),
            });
        }

        if self.server.workers == Some(0) {
            return Err(ColdpixError::Config {
                message: "Worker count cannot be 0".to_string(),
            });
        }

        // Validate log level
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => {
                return Err(ColdpixError::Config {
                    message: format!(
                        "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                        self.log_level
                    ),
                });
            }
        }

        // Validate interpolation method
        if let Err(e) = get_interpolator(&self.composite.interpolation_method) {
            return Err(ColdpixError::Config {
                message: e.to_string(),
            });
        }

        if self.composite.read_timeout_secs == 0 {
            return Err(ColdpixError::Config {
                message: "Read timeout must be at least one second".to_string(),
            });
        }

        if let Err(e) = self.extraction.product_profile() {
            return Err(ColdpixError::Config {
                message: e.to_string(),
            });
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            composite: CompositeConfig::default(),
            extraction: ExtractionConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            daylight: DaylightTable::default(),
            fill_value: default_fill_value(),
            sst_variable: default_sst_variable(),
            output_variable: default_output_variable(),
            pass_suffix: default_pass_suffix(),
            interpolation_method: default_interpolation(),
            read_timeout_secs: default_read_timeout_secs(),
        }
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            policy: default_policy(),
            profile: default_profile(),
            variable: None,
            reduction: DailyReduction::default(),
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_fill_value() -> f32 {
    DEFAULT_FILL_VALUE
}

fn default_sst_variable() -> String {
    "mcsst".to_string()
}

fn default_output_variable() -> String {
    "sst".to_string()
}

fn default_pass_suffix() -> String {
    ".CF.nc".to_string()
}

fn default_interpolation() -> String {
    "bilinear".to_string()
}

fn default_read_timeout_secs() -> u64 {
    60
}

fn default_policy() -> RadiusPolicy {
    RadiusPolicy::NearestWithin(5.0)
}

fn default_profile() -> String {
    "daily_avhrr".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.composite.interpolation_method, "bilinear");
        assert_eq!(config.composite.fill_value, -999.0);
        assert_eq!(config.composite.sst_variable, "mcsst");
        assert_eq!(config.composite.pass_suffix, ".CF.nc");
        assert_eq!(config.extraction.policy, RadiusPolicy::NearestWithin(5.0));
        assert_eq!(config.extraction.profile, "daily_avhrr");
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_config_merge() {
        let mut config1 = Config::default();
        let mut config2 = Config::default();

        config2.server.port = 9000;
        config2.server.workers = Some(4);
        config2.composite.read_timeout_secs = 5;

        config1.merge(config2);

        assert_eq!(config1.server.port, 9000);
        assert_eq!(config1.server.workers, Some(4));
        assert_eq!(config1.composite.read_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "composite": { "sst_variable": "sst", "read_timeout_secs": 10 },
            "extraction": { "policy": "closest", "profile": "rtg" }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.composite.sst_variable, "sst");
        assert_eq!(config.composite.fill_value, -999.0);
        assert_eq!(config.composite.daylight.for_month(7).unwrap().start_hour, 12);
        assert_eq!(config.extraction.policy, RadiusPolicy::Nearest);
        assert_eq!(config.server.port, 8000);
        assert!(config.validate().is_ok());

        let bad = r#"{ "extraction": { "policy": "nearby" } }"#;
        assert!(serde_json::from_str::<Config>(bad).is_err());
    }

    #[test]
    fn test_cli_overrides() {
        let args = parse(&[
            "coldpix",
            "--log-level",
            "debug",
            "extract",
            "product.nc",
            "--lon",
            "-74.7",
            "--lat",
            "38.46",
            "--policy",
            "10",
            "--profile",
            "sport",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.extraction.policy, RadiusPolicy::Fixed(10.0));
        assert_eq!(config.extraction.product_profile().unwrap().variable, "TMP_P0_L1_GLL0");
        match args.command {
            Command::Extract { lon, lat, .. } => {
                assert_eq!(lon, -74.7);
                assert_eq!(lat, 38.46);
            }
            other => panic!("unexpected command {:?}", other),
        }

        let args = parse(&["coldpix", "serve", "p.nc", "--policy", "bogus"]);
        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn test_compare_args() {
        let args = parse(&[
            "coldpix",
            "compare",
            "44009.json",
            "passes",
            "--start",
            "2019-07-01",
            "--end",
            "2019-07-31",
            "--individual-passes",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.extraction.profile, "avhrr");
        assert_eq!(config.extraction.reduction, DailyReduction::DaylightMean);

        let args = parse(&[
            "coldpix",
            "compare",
            "44009.json",
            "composites",
            "--start",
            "2019-07-01",
            "--end",
            "2019-07-31",
            "--reduction",
            "median",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.extraction.profile, "daily_avhrr");
        assert_eq!(config.extraction.reduction, DailyReduction::Median);

        let args = parse(&[
            "coldpix", "compare", "b.json", "c", "--start", "2019-07-01", "--end", "2019-07-02",
            "--reduction", "mode",
        ]);
        assert!(Config::from_args(&args).is_err());
    }

    #[test]
    fn test_composite_args() {
        let args = parse(&[
            "coldpix",
            "composite",
            "template.nc",
            "passes",
            "out",
            "--start",
            "2019-07-01",
            "--interpolation",
            "nearest",
        ]);
        let config = Config::from_args(&args).unwrap();
        assert_eq!(config.composite.interpolation_method, "nearest");
        match args.command {
            Command::Composite { start, end, .. } => {
                assert_eq!(start, NaiveDate::from_ymd_opt(2019, 7, 1).unwrap());
                assert!(end.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_validation() {
        // Valid config should pass
        let config = Config::default();
        assert!(config.validate().is_ok());

        // Test invalid host
        let mut config = Config::default();
        config.server.host = "".to_string();
        assert!(config.validate().is_err());

        // Test invalid port
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());

        // Test invalid log level
        let mut config = Config::default();
        config.log_level = "invalid".to_string();
        assert!(config.validate().is_err());

        // Test invalid interpolation method
        let mut config = Config::default();
        config.composite.interpolation_method = "bicubic".to_string();
        assert!(config.validate().is_err());

        // Test zero timeout
        let mut config = Config::default();
        config.composite.read_timeout_secs = 0;
        assert!(config.validate().is_err());

        // Test unknown profile
        let mut config = Config::default();
        config.extraction.profile = "goes".to_string();
        assert!(config.validate().is_err());
    }
}
