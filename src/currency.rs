use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::CurrencyConfig;

/// `Rs 1,234.50`: symbol, grouped thousands, always two decimals.
pub fn format_amount(amount: Decimal, currency: &CurrencyConfig) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let digits = format!("{:.2}", rounded.abs());
    let (whole, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{}{} {}.{}", sign, currency.symbol, grouped, fraction)
}

/// Accepts what a user types into an amount box: an optional currency
/// symbol, thousands separators and surrounding spaces.
pub fn parse_amount(input: &str, currency: &CurrencyConfig) -> Option<Decimal> {
    let trimmed = input.trim();
    let without_symbol = trimmed
        .strip_prefix(currency.symbol.as_str())
        .or_else(|| trimmed.strip_prefix(currency.code.as_str()))
        .unwrap_or(trimmed);
    let cleaned: String = without_symbol.trim().chars().filter(|c| *c != ',').collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<Decimal>().ok()
}
