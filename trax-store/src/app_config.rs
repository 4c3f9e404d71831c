use chrono::NaiveDate;
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::env;
use tracing::warn;
use trax_tracking::{AssemblerOptions, EstimatorOptions};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WorkerConfig {
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackingConfig {
    #[serde(default = "default_lead_days")]
    pub lead_days: u32,
    #[serde(default = "default_cutoff_hour")]
    pub cutoff_hour: u32,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    /// ISO dates skipped by business-day arithmetic, beyond weekends.
    #[serde(default)]
    pub holidays: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotifyConfig {
    #[serde(default = "default_page_limit")]
    pub page_limit: usize,
}

fn default_poll_interval_ms() -> u64 {
    250
}
fn default_lead_days() -> u32 {
    3
}
fn default_cutoff_hour() -> u32 {
    20
}
fn default_timezone() -> String {
    "America/Chicago".to_string()
}
fn default_page_limit() -> usize {
    1000
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            lead_days: default_lead_days(),
            cutoff_hour: default_cutoff_hour(),
            default_timezone: default_timezone(),
            holidays: Vec::new(),
        }
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            page_limit: default_page_limit(),
        }
    }
}

impl TrackingConfig {
    /// Estimator tunables from configuration. Unparseable holiday dates are
    /// skipped with a warning rather than failing the whole config.
    pub fn estimator_options(&self) -> EstimatorOptions {
        let mut holidays = BTreeSet::new();
        for raw in &self.holidays {
            match raw.parse::<NaiveDate>() {
                Ok(date) => {
                    holidays.insert(date);
                }
                Err(err) => warn!(date = %raw, "Ignoring unparseable holiday: {err}"),
            }
        }
        EstimatorOptions {
            lead_days: self.lead_days,
            cutoff_hour: self.cutoff_hour,
            holidays,
        }
    }

    pub fn assembler_options(&self) -> AssemblerOptions {
        let default_timezone = match self.default_timezone.parse::<Tz>() {
            Ok(tz) => tz,
            Err(_) => {
                warn!(
                    timezone = %self.default_timezone,
                    "Unparseable default timezone in config, falling back to America/Chicago"
                );
                chrono_tz::America::Chicago
            }
        };
        AssemblerOptions {
            estimator: self.estimator_options(),
            default_timezone,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Start off by merging in the "default" configuration file
            .add_source(config::File::with_name("config/default").required(false))
            // Add in the current environment file
            // Default to 'development' env
            // Note that this file is _optional_
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add in a local configuration file
            // This file shouldn't be checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            // Add in settings from the environment (with a prefix of TRAX)
            // Eg.. `TRAX_NOTIFY__PAGE_LIMIT=500` would set the page limit
            .add_source(config::Environment::with_prefix("TRAX").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_apply_without_files() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.tracking.lead_days, 3);
        assert_eq!(config.tracking.cutoff_hour, 20);
        assert_eq!(config.tracking.default_timezone, "America/Chicago");
        assert_eq!(config.notify.page_limit, 1000);
        assert_eq!(config.worker.poll_interval_ms, 250);
        assert!(config.tracking.holidays.is_empty());
    }

    #[test]
    fn test_tracking_config_threads_into_estimator_options() {
        let tracking = TrackingConfig {
            lead_days: 5,
            cutoff_hour: 18,
            default_timezone: "America/Denver".to_string(),
            holidays: vec!["2025-12-25".to_string(), "not-a-date".to_string()],
        };

        let opts = tracking.estimator_options();
        assert_eq!(opts.lead_days, 5);
        assert_eq!(opts.cutoff_hour, 18);
        // The parseable holiday survives; the malformed one is skipped.
        assert_eq!(opts.holidays.len(), 1);
        assert!(opts
            .holidays
            .contains(&NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()));

        let assembler = tracking.assembler_options();
        assert_eq!(assembler.default_timezone, chrono_tz::America::Denver);
        assert_eq!(assembler.estimator.lead_days, 5);
    }

    #[test]
    fn test_unparseable_timezone_falls_back_to_default() {
        let tracking = TrackingConfig {
            default_timezone: "Mars/Olympus_Mons".to_string(),
            ..TrackingConfig::default()
        };
        assert_eq!(
            tracking.assembler_options().default_timezone,
            chrono_tz::America::Chicago
        );
    }
}
