use serde::{Deserialize, Serialize};

use crate::error::InvalidEntry;
use crate::models::WatchEntry;

/// Thresholds the evaluator applies to every entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AlertRules {
    /// Minimum fall from the baseline, in percent, that fires a drop alert
    pub drop_threshold_pct: f64,
}

impl Default for AlertRules {
    fn default() -> Self {
        Self {
            drop_threshold_pct: 5.0,
        }
    }
}

/// A notification the evaluator decided to emit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Alert {
    TargetHit {
        symbol: String,
        price: f64,
        target: f64,
    },
    PriceDrop {
        symbol: String,
        previous: f64,
        current: f64,
        drop_percent: f64,
    },
}

/// Entry state to persist after a successful fetch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct NextState {
    pub target_price: Option<f64>,
    pub last_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub alerts: Vec<Alert>,
    pub next: NextState,
}

impl Evaluation {
    /// True when the target was consumed by this evaluation
    pub fn target_consumed(&self) -> bool {
        self.alerts
            .iter()
            .any(|a| matches!(a, Alert::TargetHit { .. }))
    }
}

fn is_valid_price(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Decide which alerts fire for `entry` at `current_price`.
///
/// Both rules read the entry as it was at sweep start. The target is
/// one-shot: a hit clears it. The baseline always advances to
/// `current_price`.
pub fn evaluate(
    entry: &WatchEntry,
    current_price: f64,
    rules: &AlertRules,
) -> Result<Evaluation, InvalidEntry> {
    if !is_valid_price(current_price) {
        return Err(InvalidEntry::Price(current_price));
    }
    if let Some(target) = entry.target_price {
        if !is_valid_price(target) {
            return Err(InvalidEntry::Target(target));
        }
    }
    if let Some(last) = entry.last_price {
        if !is_valid_price(last) {
            return Err(InvalidEntry::Baseline(last));
        }
    }

    let mut alerts = Vec::new();
    let mut next_target = entry.target_price;

    if let Some(target) = entry.target_price {
        if current_price >= target {
            alerts.push(Alert::TargetHit {
                symbol: entry.symbol.clone(),
                price: current_price,
                target,
            });
            next_target = None;
        }
    }

    // No baseline on the first successful fetch, so no drop check
    if let Some(last) = entry.last_price {
        let drop_percent = (last - current_price) / last * 100.0;
        if drop_percent >= rules.drop_threshold_pct {
            alerts.push(Alert::PriceDrop {
                symbol: entry.symbol.clone(),
                previous: last,
                current: current_price,
                drop_percent,
            });
        }
    }

    Ok(Evaluation {
        alerts,
        next: NextState {
            target_price: next_target,
            last_price: current_price,
        },
    })
}
