use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub solver: SolverSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SolverSettings {
    pub slot_duration_minutes: u32,
    pub day_start_hour: u32,
    pub day_end_hour: u32,
    pub min_shift_hours: u32,
    pub max_regular_hours: u32,
    pub max_manager_hours: u32,
    pub min_rest_hours: u32,
    pub cpsat_time_budget_seconds: u64,
    pub variable_cap: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        let options = crate::domain::services::SolverOptions::default();
        Self {
            slot_duration_minutes: options.slot_duration_minutes,
            day_start_hour: options.day_start_hour,
            day_end_hour: options.day_end_hour,
            min_shift_hours: options.min_shift_hours,
            max_regular_hours: options.max_regular_hours,
            max_manager_hours: options.max_manager_hours,
            min_rest_hours: options.min_rest_hours,
            cpsat_time_budget_seconds: options.cpsat_time_budget_seconds,
            variable_cap: options.variable_cap,
        }
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let environment = std::env::var("RUN_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::SolverOptions;

    #[test]
    fn test_defaults_match_solver_options() {
        let settings = SolverSettings::default();
        let options = SolverOptions::from_config(&settings);
        assert_eq!(options.slot_duration_minutes, 60);
        assert_eq!(options.day_start_hour, 6);
        assert_eq!(options.day_end_hour, 22);
        assert_eq!(options.min_shift_hours, 4);
        assert_eq!(options.max_regular_hours, 9);
        assert_eq!(options.max_manager_hours, 12);
        assert_eq!(options.min_rest_hours, 12);
        assert_eq!(options.cpsat_time_budget_seconds, 120);
        assert_eq!(options.variable_cap, 100_000);
    }
}
