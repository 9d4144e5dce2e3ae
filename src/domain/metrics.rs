//! Return and risk metrics over an equity curve.

use super::portfolio::EquityPoint;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Metrics {
    pub total_return: f64,
    pub annualized_return: f64,
    pub sharpe_ratio: f64,
    pub volatility: f64,
    pub max_drawdown: f64,
    pub var_95: f64,
    pub cvar_95: f64,
    pub calmar_ratio: f64,
    pub return_periods: usize,
}

impl Metrics {
    /// `initial_cash` is only consulted when the curve is empty.
    pub fn compute(equity_curve: &[EquityPoint], initial_cash: f64, periods_per_year: f64) -> Self {
        let returns = period_returns(equity_curve);
        let total_return = total_return(equity_curve, initial_cash);
        let annualized_return = annualized_return(total_return, returns.len(), periods_per_year);
        let max_drawdown = max_drawdown(equity_curve);

        let var_95 = percentile(&returns, 0.05).unwrap_or(0.0);
        let cvar_95 = mean(
            &returns
                .iter()
                .copied()
                .filter(|&r| r <= var_95)
                .collect::<Vec<_>>(),
        )
        .unwrap_or(0.0);

        let calmar_ratio = if max_drawdown != 0.0 {
            annualized_return / max_drawdown.abs()
        } else {
            0.0
        };

        Metrics {
            total_return,
            annualized_return,
            sharpe_ratio: sharpe_ratio(&returns, periods_per_year),
            volatility: volatility(&returns, periods_per_year),
            max_drawdown,
            var_95,
            cvar_95,
            calmar_ratio,
            return_periods: returns.len(),
        }
    }
}

/// `equity[t] / equity[t-1] - 1` for t > 0. A non-positive base yields 0.
pub fn period_returns(equity_curve: &[EquityPoint]) -> Vec<f64> {
    equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                w[1].equity / prev - 1.0
            } else {
                0.0
            }
        })
        .collect()
}

pub fn total_return(equity_curve: &[EquityPoint], initial_cash: f64) -> f64 {
    let first = equity_curve.first().map_or(initial_cash, |p| p.equity);
    let last = equity_curve.last().map_or(initial_cash, |p| p.equity);
    if first > 0.0 {
        (last - first) / first
    } else {
        0.0
    }
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1); `None` for fewer than two values.
pub fn sample_stddev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(variance.sqrt())
}

pub fn sharpe_ratio(returns: &[f64], periods_per_year: f64) -> f64 {
    match (mean(returns), sample_stddev(returns)) {
        (Some(m), Some(sd)) if sd > 0.0 => m / sd * periods_per_year.sqrt(),
        _ => 0.0,
    }
}

pub fn volatility(returns: &[f64], periods_per_year: f64) -> f64 {
    sample_stddev(returns).map_or(0.0, |sd| sd * periods_per_year.sqrt())
}

pub fn annualized_return(total_return: f64, return_periods: usize, periods_per_year: f64) -> f64 {
    if return_periods == 0 {
        return 0.0;
    }
    total_return * periods_per_year / return_periods as f64
}

/// Fractional drawdown per point, measured on `equity / equity[0]`.
///
/// The anchor point is part of the running peak, so a loss on the first
/// period already counts as a drawdown from the initial equity. The series
/// has one value per equity point and every value is <= 0.
pub fn drawdown_series(equity_curve: &[EquityPoint]) -> Vec<f64> {
    let Some(first) = equity_curve.first().map(|p| p.equity) else {
        return Vec::new();
    };
    if first <= 0.0 {
        return vec![0.0; equity_curve.len()];
    }

    let mut running_max = f64::MIN;
    equity_curve
        .iter()
        .map(|point| {
            let cumulative = point.equity / first;
            running_max = running_max.max(cumulative);
            if running_max > 0.0 {
                ((cumulative - running_max) / running_max).min(0.0)
            } else {
                0.0
            }
        })
        .collect()
}

pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    drawdown_series(equity_curve)
        .into_iter()
        .fold(0.0, f64::min)
}

/// Quantile `q` in [0, 1] with linear interpolation between closest ranks.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let rank = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let weight = rank - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
