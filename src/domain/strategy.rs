//! Strategy configuration, definitions and the strategy registry.
//!
//! A strategy is a [`StrategyConfig`] paired with a [`StrategyDefinition`]:
//! parameter metadata plus the function pair that turns bars into indicators
//! and indicators into signals. Definitions live in a [`StrategyRegistry`]
//! that the caller builds once and passes by reference.

use crate::domain::action_zone;
use crate::domain::error::BacktestError;
use crate::domain::indicator::IndicatorTable;
use crate::domain::ohlcv::Bar;
use crate::domain::signal::Signal;
use crate::domain::timeframe::Timeframe;
use serde::Serialize;
use std::collections::BTreeMap;

pub const DEFAULT_CASH: f64 = 100_000.0;
pub const DEFAULT_MAX_POSITION_SIZE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyConfig {
    pub name: String,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub cash: f64,
    pub max_position_size: f64,
    pub parameters: BTreeMap<String, f64>,
}

impl StrategyConfig {
    pub fn new(name: &str, symbol: &str) -> Self {
        StrategyConfig {
            name: name.to_string(),
            symbol: symbol.to_string(),
            timeframe: Timeframe::default(),
            cash: DEFAULT_CASH,
            max_position_size: DEFAULT_MAX_POSITION_SIZE,
            parameters: BTreeMap::new(),
        }
    }

    pub fn with_parameter(mut self, name: &str, value: f64) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<f64> {
        self.parameters.get(name).copied()
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        validate_capital(self.cash, self.max_position_size)
    }
}

/// Shared by strategy construction and the simulator.
pub fn validate_capital(cash: f64, max_position_size: f64) -> Result<(), BacktestError> {
    if !cash.is_finite() || cash <= 0.0 {
        return Err(BacktestError::invalid_configuration(
            "cash",
            "initial cash must be positive",
        ));
    }
    if !(max_position_size > 0.0 && max_position_size <= 1.0) {
        return Err(BacktestError::invalid_configuration(
            "max_position_size",
            "max_position_size must be in (0, 1]",
        ));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterKind {
    Int,
    Float,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParameterKind,
    pub default: f64,
    pub min: f64,
    pub max: f64,
    pub description: &'static str,
}

impl ParameterSpec {
    /// Type check only: documented ranges are advisory.
    pub fn check_type(&self, value: f64) -> Result<(), String> {
        if !value.is_finite() {
            return Err("must be a finite number".to_string());
        }
        if self.kind == ParameterKind::Int && value.fract() != 0.0 {
            return Err(format!("must be an integer, got {value}"));
        }
        Ok(())
    }

    pub fn in_range(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

pub type ParameterCheckFn = fn(&StrategyConfig) -> Result<(), BacktestError>;
pub type IndicatorFn = fn(&[Bar], &StrategyConfig) -> Result<IndicatorTable, BacktestError>;
pub type SignalFn = fn(&[Bar], &IndicatorTable, &StrategyConfig) -> Vec<Signal>;

#[derive(Debug, Clone)]
pub struct StrategyDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub description: &'static str,
    pub parameters: Vec<ParameterSpec>,
    pub check_parameters: ParameterCheckFn,
    pub compute_indicators: IndicatorFn,
    pub generate_signals: SignalFn,
}

impl StrategyDefinition {
    pub fn parameter_spec(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|spec| spec.name == name)
    }
}

/// A configured strategy ready to run against a bar series.
#[derive(Debug, Clone)]
pub struct Strategy<'r> {
    pub config: StrategyConfig,
    pub definition: &'r StrategyDefinition,
}

impl Strategy<'_> {
    pub fn id(&self) -> &'static str {
        self.definition.id
    }

    pub fn compute_indicators(&self, bars: &[Bar]) -> Result<IndicatorTable, BacktestError> {
        (self.definition.compute_indicators)(bars, &self.config)
    }

    pub fn generate_signals(&self, bars: &[Bar], indicators: &IndicatorTable) -> Vec<Signal> {
        (self.definition.generate_signals)(bars, indicators, &self.config)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StrategyRegistry {
    definitions: BTreeMap<&'static str, StrategyDefinition>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        StrategyRegistry::default()
    }

    /// Registry holding every built-in strategy.
    pub fn with_defaults() -> Self {
        let mut registry = StrategyRegistry::new();
        registry.register(action_zone::definition());
        registry
    }

    /// Registers `definition`, replacing any previous one with the same id.
    pub fn register(&mut self, definition: StrategyDefinition) {
        tracing::debug!(strategy = definition.id, "strategy registered");
        self.definitions.insert(definition.id, definition);
    }

    pub fn get(&self, id: &str) -> Option<&StrategyDefinition> {
        self.definitions.get(id)
    }

    pub fn definitions(&self) -> impl Iterator<Item = &StrategyDefinition> {
        self.definitions.values()
    }

    pub fn parameters(&self, id: &str) -> Option<&[ParameterSpec]> {
        self.get(id).map(|definition| definition.parameters.as_slice())
    }

    pub fn create(&self, id: &str, config: StrategyConfig) -> Result<Strategy<'_>, BacktestError> {
        let definition = self.get(id).ok_or_else(|| BacktestError::UnknownStrategy {
            name: id.to_string(),
        })?;
        config.validate()?;
        (definition.check_parameters)(&config)?;

        tracing::info!(
            strategy = definition.id,
            symbol = %config.symbol,
            timeframe = %config.timeframe,
            "strategy created"
        );
        Ok(Strategy { config, definition })
    }
}
