//! Display helpers for amounts, prices, and addresses

/// Insert `,` thousands separators into a string of integer digits.
fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Format a number with grouping and a fixed fraction width,
/// optionally trimming trailing zeros.
fn format_grouped(value: f64, fraction: usize, trim: bool) -> String {
    let fixed = format!("{:.*}", fraction, value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), ""));
    let frac_part = if trim {
        frac_part.trim_end_matches('0')
    } else {
        frac_part
    };

    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };

    if frac_part.is_empty() {
        format!("{}{}", sign, group_thousands(int_part))
    } else {
        format!("{}{}.{}", sign, group_thousands(int_part), frac_part)
    }
}

/// Human amount with thousands grouping and at most six fraction digits.
///
/// Empty or unparsable input renders as `0.00`.
pub fn format_amount(num: &str) -> String {
    match num.trim().parse::<f64>() {
        Ok(v) if v != 0.0 && v.is_finite() => format_grouped(v, 6, true),
        _ => "0.00".to_string(),
    }
}

/// USD value of `amount` units at `price`, or `None` if either is missing.
pub fn format_usd(amount: &str, price: Option<&str>) -> Option<String> {
    let amount: f64 = amount.trim().parse().ok()?;
    let price: f64 = price?.trim().parse().ok()?;
    if !amount.is_finite() || !price.is_finite() {
        return None;
    }

    let total = amount * price;
    if total == 0.0 {
        return Some("$0.00".to_string());
    }
    if total < 0.01 {
        return Some("<$0.01".to_string());
    }
    Some(format!("${}", format_grouped(total, 2, false)))
}

/// Shorten an address to `0x1234...abcd`.
pub fn short_address(addr: &str) -> String {
    if addr.len() <= 10 || !addr.is_ascii() {
        return addr.to_string();
    }
    format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
}

/// Size class for rendering an amount, shrinking as the string grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmountSize {
    Large,
    Medium,
    Small,
    Tiny,
}

pub fn amount_display_size(s: &str) -> AmountSize {
    match s.chars().count() {
        n if n > 20 => AmountSize::Tiny,
        n if n > 14 => AmountSize::Small,
        n if n > 10 => AmountSize::Medium,
        _ => AmountSize::Large,
    }
}
