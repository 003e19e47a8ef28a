use rust_decimal::Decimal;

/// Render a price for customer-facing text: thousands-grouped, two decimal
/// places only when the amount has a fractional part ("₦5,000",
/// "₦1,250.50"). A missing price renders as "price on request" — the agent
/// must never invent a number.
pub fn format_price(price: Option<&Decimal>, symbol: &str) -> String {
    match price {
        Some(amount) => format!("{symbol}{}", format_amount(amount)),
        None => "price on request".to_string(),
    }
}

/// Format a known amount without the currency symbol.
pub fn format_amount(amount: &Decimal) -> String {
    let normalized = amount.normalize();
    let rendered = if normalized.scale() == 0 {
        normalized.to_string()
    } else {
        format!("{:.2}", amount.round_dp(2))
    };

    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i.to_string(), Some(f.to_string())),
        None => (rendered, None),
    };

    let grouped = group_thousands(&int_part);
    match frac_part {
        Some(f) => format!("{grouped}.{f}"),
        None => grouped,
    }
}

fn group_thousands(digits: &str) -> String {
    let (sign, digits) = match digits.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", digits),
    };

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    format!("{sign}{grouped}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn formats_integral_amounts_without_decimals() {
        let price = Decimal::from(5000);
        assert_eq!(format_price(Some(&price), "₦"), "₦5,000");
    }

    #[test]
    fn formats_fractional_amounts_with_two_places() {
        let price = Decimal::from_str("1250.5").unwrap();
        assert_eq!(format_price(Some(&price), "₦"), "₦1,250.50");
    }

    #[test]
    fn groups_large_amounts() {
        let price = Decimal::from(1_500_000);
        assert_eq!(format_price(Some(&price), "₦"), "₦1,500,000");
    }

    #[test]
    fn missing_price_is_on_request() {
        assert_eq!(format_price(None, "₦"), "price on request");
    }

    #[test]
    fn small_amounts_are_ungrouped() {
        let price = Decimal::from(950);
        assert_eq!(format_price(Some(&price), "$"), "$950");
    }
}
