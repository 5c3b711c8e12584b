//! models/money.rs
//! Los montos viajan como `Decimal` y se guardan en SQLite como centavos (INTEGER).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Convierte centavos guardados en DB a `Decimal` con dos decimales.
pub fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}

/// Redondea a dos decimales (half-up, como `DecimalField`) y devuelve centavos.
/// `None` si el monto no cabe en un i64.
pub fn to_cents(amount: Decimal) -> Option<i64> {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    (rounded * Decimal::from(100)).to_i64()
}

/// Normaliza un monto a dos decimales.
pub fn normalize(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

/// "1234567.5" -> "1,234,567.50"
pub fn format_amount(amount: Decimal) -> String {
    let fixed = normalize(amount);
    let negative = fixed.is_sign_negative() && !fixed.is_zero();
    let text = fixed.abs().to_string();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    format!("{}{}.{}", if negative { "-" } else { "" }, grouped, frac_part)
}

/// Monto con el símbolo de la moneda del usuario, p.ej. "S/1,250.00".
pub fn format_currency(amount: Decimal, symbol: &str) -> String {
    let formatted = format_amount(amount);
    match formatted.strip_prefix('-') {
        Some(abs) => format!("-{}{}", symbol, abs),
        None => format!("{}{}", symbol, formatted),
    }
}

/// Porcentaje `part / whole * 100` como f64; 0 si `whole` no es positivo.
pub fn percentage(part: Decimal, whole: Decimal) -> f64 {
    if whole <= Decimal::ZERO {
        return 0.0;
    }
    (part / whole * Decimal::from(100)).to_f64().unwrap_or(0.0)
}
