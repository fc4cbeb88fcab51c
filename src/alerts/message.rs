use super::Alert;

/// Render the text delivered to the user for an alert
pub fn render(alert: &Alert) -> String {
    match alert {
        Alert::TargetHit {
            symbol,
            price,
            target,
        } => format!(
            "TARGET HIT: {} has reached Rs. {:.2} (Target: {})",
            symbol, price, target
        ),
        Alert::PriceDrop {
            symbol,
            previous,
            current,
            drop_percent,
        } => format!(
            "PRICE DROP ALERT: {} fell by {:.2}%\nPrevious: Rs. {:.2} -> Now: Rs. {:.2}",
            symbol, drop_percent, previous, current
        ),
    }
}
