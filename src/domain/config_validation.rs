//! Configuration validation.
//!
//! Validates every config field before a backtest runs, and exposes the
//! typed lookups the CLI uses to build its run configuration.

use crate::domain::error::BacktestError;
use crate::domain::strategy::{
    DEFAULT_CASH, DEFAULT_MAX_POSITION_SIZE, ParameterKind, StrategyRegistry,
};
use crate::domain::timeframe::Timeframe;
use crate::ports::config_port::ConfigPort;
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

pub const BACKTEST: &str = "backtest";
pub const STRATEGY: &str = "strategy";
pub const REPORT: &str = "report";
pub const LOGGING: &str = "logging";

pub const DEFAULT_STRATEGY: &str = "cdc_actionzone";

fn config_invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn config_missing(section: &str, key: &str) -> BacktestError {
    BacktestError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    symbol(config)?;
    timeframe(config)?;
    initial_cash(config)?;
    max_position_size(config)?;
    periods_per_year(config)?;
    date_range(config)?;
    Ok(())
}

pub fn validate_strategy_config(
    config: &dyn ConfigPort,
    registry: &StrategyRegistry,
) -> Result<(), BacktestError> {
    let name = strategy_name(config);
    let definition = registry
        .get(&name)
        .ok_or_else(|| BacktestError::UnknownStrategy { name: name.clone() })?;

    for (key, value) in strategy_parameters(config)? {
        let Some(spec) = definition.parameter_spec(&key) else {
            tracing::debug!(strategy = %name, parameter = %key, "parameter not declared by strategy");
            continue;
        };
        if spec.kind == ParameterKind::Int && (value.fract() != 0.0 || value < 1.0) {
            return Err(config_invalid(
                STRATEGY,
                &key,
                format!("{key} must be a positive integer, got {value}"),
            ));
        }
        if !spec.in_range(value) {
            tracing::warn!(
                parameter = %key,
                value,
                min = spec.min,
                max = spec.max,
                "parameter outside documented range"
            );
        }
    }
    Ok(())
}

pub fn validate_logging_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let Some(raw) = config.get_string(LOGGING, "format") else {
        return Ok(());
    };
    match raw.trim().to_lowercase().as_str() {
        "" | "text" | "json" => Ok(()),
        _ => Err(config_invalid(
            LOGGING,
            "format",
            format!("format must be 'text' or 'json', got '{}'", raw.trim()),
        )),
    }
}

pub fn symbol(config: &dyn ConfigPort) -> Result<String, BacktestError> {
    match config.get_string(BACKTEST, "symbol") {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(config_missing(BACKTEST, "symbol")),
    }
}

pub fn timeframe(config: &dyn ConfigPort) -> Result<Timeframe, BacktestError> {
    match config.get_string(BACKTEST, "timeframe") {
        None => Ok(Timeframe::default()),
        Some(s) => s
            .parse()
            .map_err(|reason: String| config_invalid(BACKTEST, "timeframe", reason)),
    }
}

/// `None` when the key is absent; an error when present but not a finite number.
pub fn optional_number(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, BacktestError> {
    let Some(raw) = config.get_string(section, key) else {
        return Ok(None);
    };
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(config_invalid(
            section,
            key,
            format!("{key} must be a number, got '{raw}'"),
        )),
    }
}

pub fn initial_cash(config: &dyn ConfigPort) -> Result<f64, BacktestError> {
    let value = optional_number(config, BACKTEST, "initial_cash")?.unwrap_or(DEFAULT_CASH);
    if value <= 0.0 {
        return Err(config_invalid(
            BACKTEST,
            "initial_cash",
            "initial_cash must be positive",
        ));
    }
    Ok(value)
}

pub fn max_position_size(config: &dyn ConfigPort) -> Result<f64, BacktestError> {
    let value = optional_number(config, BACKTEST, "max_position_size")?
        .unwrap_or(DEFAULT_MAX_POSITION_SIZE);
    if value <= 0.0 || value > 1.0 {
        return Err(config_invalid(
            BACKTEST,
            "max_position_size",
            "max_position_size must be in (0, 1]",
        ));
    }
    Ok(value)
}

pub fn periods_per_year(config: &dyn ConfigPort) -> Result<Option<f64>, BacktestError> {
    match optional_number(config, BACKTEST, "periods_per_year")? {
        Some(v) if v <= 0.0 => Err(config_invalid(
            BACKTEST,
            "periods_per_year",
            "periods_per_year must be positive",
        )),
        other => Ok(other),
    }
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, BacktestError> {
    match value {
        None => Err(config_missing(BACKTEST, field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            config_invalid(
                BACKTEST,
                field,
                format!("invalid {field} format, expected YYYY-MM-DD"),
            )
        }),
    }
}

/// `[start_date, end_date]`, or `[start_date, start_date + days]` when only
/// `days` is given.
pub fn date_range(config: &dyn ConfigPort) -> Result<(NaiveDate, NaiveDate), BacktestError> {
    let start = parse_date(config.get_string(BACKTEST, "start_date").as_deref(), "start_date")?;

    let end = match config.get_string(BACKTEST, "end_date") {
        Some(s) => parse_date(Some(&s), "end_date")?,
        None => {
            let days = match optional_number(config, BACKTEST, "days")? {
                Some(d) if d >= 1.0 && d.fract() == 0.0 => d as i64,
                Some(_) => {
                    return Err(config_invalid(BACKTEST, "days", "days must be a positive integer"));
                }
                None => return Err(config_missing(BACKTEST, "end_date")),
            };
            start + Duration::days(days)
        }
    };

    if start >= end {
        return Err(config_invalid(
            BACKTEST,
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok((start, end))
}

pub fn strategy_name(config: &dyn ConfigPort) -> String {
    config
        .get_string(STRATEGY, "name")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_STRATEGY.to_string())
}

/// Every `[strategy]` key except `name`, parsed as a number.
pub fn strategy_parameters(config: &dyn ConfigPort) -> Result<BTreeMap<String, f64>, BacktestError> {
    let mut parameters = BTreeMap::new();
    for key in config.keys(STRATEGY) {
        if key == "name" {
            continue;
        }
        if let Some(value) = optional_number(config, STRATEGY, &key)? {
            parameters.insert(key, value);
        }
    }
    Ok(parameters)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID_BACKTEST: &str = r#"
[backtest]
symbol = AAPL
timeframe = 1d
start_date = 2020-01-01
end_date = 2024-12-31
initial_cash = 100000.0
max_position_size = 0.25
"#;

    #[test]
    fn valid_backtest_config_passes() {
        assert!(validate_backtest_config(&make_config(VALID_BACKTEST)).is_ok());
    }

    #[test]
    fn defaults_apply_when_optional_keys_missing() {
        let config = make_config("[backtest]\nsymbol = AAPL\nstart_date = 2020-01-01\ndays = 30\n");
        assert!(validate_backtest_config(&config).is_ok());
        assert_eq!(timeframe(&config).unwrap(), Timeframe::Day1);
        assert_eq!(initial_cash(&config).unwrap(), 100_000.0);
        assert_eq!(max_position_size(&config).unwrap(), 0.1);
        assert_eq!(periods_per_year(&config).unwrap(), None);
    }

    #[test]
    fn missing_symbol_fails() {
        let config = make_config("[backtest]\nstart_date = 2020-01-01\nend_date = 2024-12-31\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { key, .. } if key == "symbol"));
    }

    #[test]
    fn initial_cash_must_be_positive() {
        for value in ["0", "-100", "lots"] {
            let config = make_config(&format!(
                "[backtest]\nsymbol = AAPL\ninitial_cash = {value}\nstart_date = 2020-01-01\nend_date = 2024-12-31\n"
            ));
            let err = validate_backtest_config(&config).unwrap_err();
            assert!(
                matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "initial_cash"),
                "{value}"
            );
        }
    }

    #[test]
    fn max_position_size_bounds() {
        for value in ["0", "1.5", "-0.1"] {
            let config = make_config(&format!(
                "[backtest]\nsymbol = AAPL\nmax_position_size = {value}\nstart_date = 2020-01-01\nend_date = 2024-12-31\n"
            ));
            let err = validate_backtest_config(&config).unwrap_err();
            assert!(
                matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "max_position_size"),
                "{value}"
            );
        }
        let config = make_config("[backtest]\nmax_position_size = 1\n");
        assert_eq!(max_position_size(&config).unwrap(), 1.0);
    }

    #[test]
    fn invalid_timeframe_fails() {
        let config = make_config("[backtest]\nsymbol = AAPL\ntimeframe = 3d\nstart_date = 2020-01-01\nend_date = 2024-12-31\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "timeframe"));
    }

    #[test]
    fn periods_per_year_override() {
        let config = make_config("[backtest]\nperiods_per_year = 365\n");
        assert_eq!(periods_per_year(&config).unwrap(), Some(365.0));
        let config = make_config("[backtest]\nperiods_per_year = 0\n");
        assert!(periods_per_year(&config).is_err());
    }

    #[test]
    fn invalid_start_date_format_fails() {
        let config = make_config("[backtest]\nsymbol = AAPL\nstart_date = 2020/01/01\nend_date = 2024-12-31\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn missing_end_date_and_days_fails() {
        let config = make_config("[backtest]\nsymbol = AAPL\nstart_date = 2020-01-01\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn days_extends_from_start() {
        let config = make_config("[backtest]\nstart_date = 2024-01-01\ndays = 31\n");
        let (start, end) = date_range(&config).unwrap();
        assert_eq!(start, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(end, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());

        let config = make_config("[backtest]\nstart_date = 2024-01-01\ndays = 2.5\n");
        assert!(date_range(&config).is_err());
    }

    #[test]
    fn start_date_after_end_date_fails() {
        let config = make_config("[backtest]\nsymbol = AAPL\nstart_date = 2024-12-31\nend_date = 2020-01-01\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn valid_strategy_config_passes() {
        let registry = StrategyRegistry::with_defaults();
        let config = make_config(
            "[strategy]\nname = cdc_actionzone\nfast_period = 12\nslow_period = 26\nsmoothing = 1\n",
        );
        assert!(validate_strategy_config(&config, &registry).is_ok());
        let params = strategy_parameters(&config).unwrap();
        assert_eq!(params.len(), 3);
        assert_eq!(params["fast_period"], 12.0);
    }

    #[test]
    fn strategy_name_defaults() {
        let config = make_config("[strategy]\nfast_period = 12\n");
        assert_eq!(strategy_name(&config), "cdc_actionzone");
    }

    #[test]
    fn unknown_strategy_fails() {
        let registry = StrategyRegistry::with_defaults();
        let config = make_config("[strategy]\nname = moon_phase\n");
        let err = validate_strategy_config(&config, &registry).unwrap_err();
        assert!(matches!(err, BacktestError::UnknownStrategy { name } if name == "moon_phase"));
    }

    #[test]
    fn non_integral_period_fails() {
        let registry = StrategyRegistry::with_defaults();
        let config = make_config("[strategy]\nfast_period = 12.5\n");
        let err = validate_strategy_config(&config, &registry).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "fast_period"));
    }

    #[test]
    fn non_positive_period_fails() {
        let registry = StrategyRegistry::with_defaults();
        let config = make_config("[strategy]\nslow_period = 0\n");
        let err = validate_strategy_config(&config, &registry).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "slow_period"));
    }

    #[test]
    fn non_numeric_parameter_fails() {
        let config = make_config("[strategy]\nsmoothing = lots\n");
        let err = strategy_parameters(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "smoothing"));
    }

    #[test]
    fn out_of_range_parameter_only_warns() {
        let registry = StrategyRegistry::with_defaults();
        let config = make_config("[strategy]\nfast_period = 2\nslow_period = 3\n");
        assert!(validate_strategy_config(&config, &registry).is_ok());
    }

    #[test]
    fn logging_format_checked() {
        assert!(validate_logging_config(&make_config("[logging]\nformat = json\n")).is_ok());
        assert!(validate_logging_config(&make_config("[logging]\n")).is_ok());
        let err = validate_logging_config(&make_config("[logging]\nformat = xml\n")).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "format"));
    }

    #[test]
    fn logging_format_ignores_case() {
        for format in ["JSON", "Text", " json "] {
            let config = make_config(&format!("[logging]\nformat = {format}\n"));
            assert!(validate_logging_config(&config).is_ok(), "{format}");
        }
    }
}
