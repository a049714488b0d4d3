//! Custom Askama template filters.

use std::fmt::Display;

use rust_decimal::Decimal;

/// Format a decimal amount as dollars, e.g. `12.5` renders as `$12.50`.
///
/// Usage in templates: `{{ item.price|money }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn money(amount: &Decimal, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(format!("${:.2}", amount.round_dp(2)))
}

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_money_pads_cents() {
        let amount: Decimal = "12.5".parse().unwrap();
        assert_eq!(money::default().execute(&amount, askama::NO_VALUES).unwrap(), "$12.50");

        let amount: Decimal = "3".parse().unwrap();
        assert_eq!(money::default().execute(&amount, askama::NO_VALUES).unwrap(), "$3.00");
    }
}
