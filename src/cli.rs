//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvBarSource;
use crate::adapters::csv_trade_log_adapter::CsvTradeLogAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::json_report_adapter::JsonReportAdapter;
use crate::domain::backtest::run_backtest;
use crate::domain::config_validation::{
    self, BACKTEST, LOGGING, REPORT, validate_backtest_config, validate_logging_config,
    validate_strategy_config,
};
use crate::domain::error::BacktestError;
use crate::domain::report::BacktestReport;
use crate::domain::strategy::{StrategyConfig, StrategyRegistry};
use crate::domain::timeframe::Timeframe;
use crate::logging::{self, LogFormat};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::BarSource;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "actionzone", about = "CDC ActionZone signal backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Overrides [backtest] symbol
        #[arg(long)]
        symbol: Option<String>,
        /// Overrides [backtest] data_dir
        #[arg(long)]
        data_dir: Option<PathBuf>,
        /// Overrides [report] json_path
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List registered strategies and their parameters
    Strategies,
    /// List symbols with data files for a timeframe
    ListSymbols {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long, default_value = "1d")]
        timeframe: String,
    },
}

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub symbol: Option<String>,
    pub data_dir: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

/// Everything the pipeline needs besides the strategy itself.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_cash: f64,
    pub max_position_size: f64,
    pub periods_per_year: Option<f64>,
    pub data_dir: PathBuf,
    pub json_path: Option<PathBuf>,
    pub trades_csv_path: Option<PathBuf>,
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            symbol,
            data_dir,
            output,
            dry_run,
        } => {
            let overrides = Overrides {
                symbol,
                data_dir,
                output,
            };
            run_backtest_command(&config, &overrides, dry_run)
        }
        Command::Validate { config } => run_validate(&config),
        Command::Strategies => run_strategies(),
        Command::ListSymbols {
            config,
            data_dir,
            timeframe,
        } => run_list_symbols(config.as_ref(), data_dir, &timeframe),
    }
}

pub fn load_config(path: &PathBuf) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn init_logging(config: Option<&dyn ConfigPort>) -> Result<(), BacktestError> {
    let Some(config) = config else {
        return logging::init_tracing(None, LogFormat::Text);
    };
    validate_logging_config(config)?;
    let level = config.get_string(LOGGING, "level");
    let format = config
        .get_string(LOGGING, "format")
        .and_then(|f| LogFormat::parse(&f))
        .unwrap_or(LogFormat::Text);
    logging::init_tracing(level.as_deref(), format)
}

fn optional_path(config: &dyn ConfigPort, section: &str, key: &str) -> Option<PathBuf> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

pub fn build_run_config(
    config: &dyn ConfigPort,
    overrides: &Overrides,
) -> Result<RunConfig, BacktestError> {
    let symbol = match &overrides.symbol {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => config_validation::symbol(config)?,
    };
    let (start_date, end_date) = config_validation::date_range(config)?;

    Ok(RunConfig {
        symbol,
        timeframe: config_validation::timeframe(config)?,
        start_date,
        end_date,
        initial_cash: config_validation::initial_cash(config)?,
        max_position_size: config_validation::max_position_size(config)?,
        periods_per_year: config_validation::periods_per_year(config)?,
        data_dir: overrides
            .data_dir
            .clone()
            .or_else(|| optional_path(config, BACKTEST, "data_dir"))
            .unwrap_or_else(|| PathBuf::from(".")),
        json_path: overrides
            .output
            .clone()
            .or_else(|| optional_path(config, REPORT, "json_path")),
        trades_csv_path: optional_path(config, REPORT, "trades_csv_path"),
    })
}

pub fn build_strategy_config(
    config: &dyn ConfigPort,
    run_config: &RunConfig,
) -> Result<StrategyConfig, BacktestError> {
    let mut strategy_config =
        StrategyConfig::new(&config_validation::strategy_name(config), &run_config.symbol);
    strategy_config.timeframe = run_config.timeframe;
    strategy_config.cash = run_config.initial_cash;
    strategy_config.max_position_size = run_config.max_position_size;
    strategy_config.parameters = config_validation::strategy_parameters(config)?;
    Ok(strategy_config)
}

/// Fetches bars, runs the strategy and writes whichever reports are configured.
pub fn run_backtest_pipeline(
    bar_source: &dyn BarSource,
    registry: &StrategyRegistry,
    run_config: &RunConfig,
    strategy_config: StrategyConfig,
) -> Result<BacktestReport, BacktestError> {
    let name = strategy_config.name.clone();
    let strategy = registry.create(&name, strategy_config)?;

    let bars = bar_source.fetch_bars(
        &run_config.symbol,
        run_config.start_date,
        run_config.end_date,
        run_config.timeframe,
    )?;
    if bars.is_empty() {
        return Err(BacktestError::NoData {
            symbol: run_config.symbol.clone(),
            timeframe: run_config.timeframe.to_string(),
        });
    }
    eprintln!(
        "Running backtest: {} {} bars, {} to {}",
        bars.len(),
        run_config.timeframe,
        run_config.start_date,
        run_config.end_date,
    );

    let result = run_backtest(&strategy, &bars, run_config.periods_per_year)?;
    let report = BacktestReport::new(&strategy, &result, bars.len());

    if let Some(path) = &run_config.json_path {
        JsonReportAdapter::new().write(&report, path)?;
        eprintln!("Report written to: {}", path.display());
    }
    if let Some(path) = &run_config.trades_csv_path {
        CsvTradeLogAdapter::new().write(&report, path)?;
        eprintln!("Trade log written to: {}", path.display());
    }
    Ok(report)
}

fn print_summary(report: &BacktestReport) {
    let performance = &report.summary.performance;
    let risk = &report.summary.risk_metrics;
    let stats = &report.summary.trade_statistics;

    eprintln!("\n=== {} on {} ({}) ===", report.strategy, report.symbol, report.timeframe);
    eprintln!("Signals:          {}", report.signals.len());
    eprintln!("Total Return:     {:.2}%", performance.total_return * 100.0);
    eprintln!(
        "Annualized:       {:.2}%",
        performance.annualized_return * 100.0
    );
    eprintln!("Sharpe Ratio:     {:.2}", performance.sharpe_ratio);
    eprintln!("Max Drawdown:     {:.1}%", performance.max_drawdown * 100.0);
    eprintln!("Volatility:       {:.2}%", risk.volatility * 100.0);
    eprintln!("VaR (95%):        {:.2}%", risk.var_95 * 100.0);
    eprintln!("Total Trades:     {}", stats.total_trades);
    eprintln!("Win Rate:         {:.1}%", performance.win_rate * 100.0);
    if performance.profit_factor.is_finite() {
        eprintln!("Profit Factor:    {:.2}", performance.profit_factor);
    } else {
        eprintln!("Profit Factor:    inf");
    }
}

fn run_backtest_command(config_path: &PathBuf, overrides: &Overrides, dry_run: bool) -> ExitCode {
    // Stage 1: Load config and set up logging
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };
    if let Err(e) = init_logging(Some(&adapter)) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 2: Validate and build run configuration
    let registry = StrategyRegistry::with_defaults();
    let run_config = match build_run_config(&adapter, overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if let Err(e) = validate_strategy_config(&adapter, &registry) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let strategy_config = match build_strategy_config(&adapter, &run_config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    if dry_run {
        return run_dry_run(&registry, &run_config, strategy_config);
    }

    // Stage 3: Run pipeline
    let bar_source = CsvBarSource::new(run_config.data_dir.clone());
    match run_backtest_pipeline(&bar_source, &registry, &run_config, strategy_config) {
        Ok(report) => {
            print_summary(&report);
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn resolved_parameters(
    registry: &StrategyRegistry,
    strategy_config: &StrategyConfig,
) -> BTreeMap<String, f64> {
    let mut resolved: BTreeMap<String, f64> = registry
        .parameters(&strategy_config.name)
        .unwrap_or_default()
        .iter()
        .map(|spec| (spec.name.to_string(), spec.default))
        .collect();
    resolved.extend(strategy_config.parameters.clone());
    resolved
}

pub fn run_dry_run(
    registry: &StrategyRegistry,
    run_config: &RunConfig,
    strategy_config: StrategyConfig,
) -> ExitCode {
    let parameters = resolved_parameters(registry, &strategy_config);
    let name = strategy_config.name.clone();
    if let Err(e) = registry.create(&name, strategy_config) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    eprintln!("Config validated successfully");

    eprintln!("\nStrategy: {name}");
    for (key, value) in &parameters {
        eprintln!("  {key}: {value}");
    }

    let bar_source = CsvBarSource::new(run_config.data_dir.clone());
    eprintln!("\nData:");
    eprintln!("  symbol:    {}", run_config.symbol);
    eprintln!("  timeframe: {}", run_config.timeframe);
    eprintln!("  range:     {} to {}", run_config.start_date, run_config.end_date);
    eprintln!(
        "  file:      {}",
        bar_source
            .csv_path(&run_config.symbol, run_config.timeframe)
            .display()
    );
    eprintln!("\nCapital:");
    eprintln!("  initial_cash:      {:.2}", run_config.initial_cash);
    eprintln!("  max_position_size: {}", run_config.max_position_size);

    eprintln!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let registry = StrategyRegistry::with_defaults();
    let checks = init_logging(Some(&adapter))
        .and_then(|()| validate_backtest_config(&adapter))
        .and_then(|()| validate_strategy_config(&adapter, &registry));
    if let Err(e) = checks {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Config is valid");
    ExitCode::SUCCESS
}

fn run_strategies() -> ExitCode {
    if let Err(e) = init_logging(None) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let registry = StrategyRegistry::with_defaults();
    for definition in registry.definitions() {
        println!("{} ({})", definition.id, definition.display_name);
        println!("  {}", definition.description);
        for spec in &definition.parameters {
            println!(
                "  {:<12} {:?} default={} range=[{}, {}]  {}",
                spec.name, spec.kind, spec.default, spec.min, spec.max, spec.description
            );
        }
    }
    ExitCode::SUCCESS
}

fn run_list_symbols(
    config_path: Option<&PathBuf>,
    data_dir: Option<PathBuf>,
    timeframe: &str,
) -> ExitCode {
    let timeframe: Timeframe = match timeframe.parse() {
        Ok(tf) => tf,
        Err(reason) => {
            let e = BacktestError::invalid_configuration("timeframe", reason);
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let data_dir = match (data_dir, config_path) {
        (Some(dir), _) => dir,
        (None, Some(path)) => {
            let adapter = match load_config(path) {
                Ok(a) => a,
                Err(code) => return code,
            };
            optional_path(&adapter, BACKTEST, "data_dir").unwrap_or_else(|| PathBuf::from("."))
        }
        (None, None) => {
            eprintln!("error: --config or --data-dir is required for list-symbols");
            return ExitCode::from(1);
        }
    };

    let source = CsvBarSource::new(data_dir);
    match source.list_symbols(timeframe) {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("No symbols found for timeframe {timeframe}");
            ExitCode::SUCCESS
        }
        Ok(symbols) => {
            for symbol in &symbols {
                println!("{symbol}");
            }
            eprintln!("{} symbols found", symbols.len());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const BASE: &str = r#"
[backtest]
symbol = AAPL
start_date = 2024-01-01
end_date = 2024-06-30
data_dir = /data

[strategy]
fast_period = 10
slow_period = 30

[report]
json_path = out/report.json
"#;

    #[test]
    fn run_config_from_file() {
        let rc = build_run_config(&config(BASE), &Overrides::default()).unwrap();
        assert_eq!(rc.symbol, "AAPL");
        assert_eq!(rc.timeframe, Timeframe::Day1);
        assert_eq!(rc.start_date, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(rc.data_dir, PathBuf::from("/data"));
        assert_eq!(rc.json_path, Some(PathBuf::from("out/report.json")));
        assert_eq!(rc.trades_csv_path, None);
        assert_eq!(rc.periods_per_year, None);
        assert!((rc.initial_cash - 100_000.0).abs() < f64::EPSILON);
    }

    #[test]
    fn overrides_take_precedence() {
        let overrides = Overrides {
            symbol: Some("MSFT".into()),
            data_dir: Some(PathBuf::from("/other")),
            output: Some(PathBuf::from("r.json")),
        };
        let rc = build_run_config(&config(BASE), &overrides).unwrap();
        assert_eq!(rc.symbol, "MSFT");
        assert_eq!(rc.data_dir, PathBuf::from("/other"));
        assert_eq!(rc.json_path, Some(PathBuf::from("r.json")));
    }

    #[test]
    fn symbol_override_fills_missing_key() {
        let cfg = config("[backtest]\nstart_date = 2024-01-01\ndays = 30\n");
        assert!(matches!(
            build_run_config(&cfg, &Overrides::default()),
            Err(BacktestError::ConfigMissing { .. })
        ));
        let overrides = Overrides {
            symbol: Some("BTC".into()),
            ..Overrides::default()
        };
        let rc = build_run_config(&cfg, &overrides).unwrap();
        assert_eq!(rc.symbol, "BTC");
        assert_eq!(rc.end_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(rc.data_dir, PathBuf::from("."));
    }

    #[test]
    fn strategy_config_carries_capital_and_parameters() {
        let cfg = config(BASE);
        let rc = build_run_config(&cfg, &Overrides::default()).unwrap();
        let sc = build_strategy_config(&cfg, &rc).unwrap();
        assert_eq!(sc.name, "cdc_actionzone");
        assert_eq!(sc.symbol, "AAPL");
        assert_eq!(sc.parameter("fast_period"), Some(10.0));
        assert_eq!(sc.parameter("slow_period"), Some(30.0));
        assert_eq!(sc.parameter("smoothing"), None);
    }

    #[test]
    fn resolved_parameters_fill_defaults() {
        let registry = StrategyRegistry::with_defaults();
        let sc = StrategyConfig::new("cdc_actionzone", "AAPL").with_parameter("fast_period", 8.0);
        let resolved = resolved_parameters(&registry, &sc);
        assert_eq!(resolved.get("fast_period"), Some(&8.0));
        assert_eq!(resolved.get("slow_period"), Some(&26.0));
        assert_eq!(resolved.get("smoothing"), Some(&1.0));
    }

    struct EmptySource;

    impl BarSource for EmptySource {
        fn fetch_bars(
            &self,
            _symbol: &str,
            _start: NaiveDate,
            _end: NaiveDate,
            _timeframe: Timeframe,
        ) -> Result<Vec<crate::domain::ohlcv::Bar>, BacktestError> {
            Ok(Vec::new())
        }

        fn list_symbols(&self, _timeframe: Timeframe) -> Result<Vec<String>, BacktestError> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn pipeline_reports_no_data() {
        let cfg = config(BASE);
        let rc = build_run_config(&cfg, &Overrides::default()).unwrap();
        let sc = build_strategy_config(&cfg, &rc).unwrap();
        let registry = StrategyRegistry::with_defaults();
        let err = run_backtest_pipeline(&EmptySource, &registry, &rc, sc).unwrap_err();
        assert!(matches!(err, BacktestError::NoData { ref symbol, .. } if symbol == "AAPL"));
    }

    #[test]
    fn pipeline_rejects_unknown_strategy_before_fetch() {
        let cfg = config(BASE);
        let rc = build_run_config(&cfg, &Overrides::default()).unwrap();
        let sc = StrategyConfig::new("nope", "AAPL");
        let registry = StrategyRegistry::with_defaults();
        let err = run_backtest_pipeline(&EmptySource, &registry, &rc, sc).unwrap_err();
        assert!(matches!(err, BacktestError::UnknownStrategy { .. }));
    }
}
