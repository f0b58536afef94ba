//! Display helpers for listing tables.

/// Formats with thousands separators, or a `K`/`M` suffix when `compact`.
pub fn format_number(value: f64, decimals: usize, compact: bool) -> String {
    if compact && value >= 1_000_000.0 {
        return format!("{:.*}M", decimals, value / 1_000_000.0);
    }
    if compact && value >= 1_000.0 {
        return format!("{:.*}K", decimals, value / 1_000.0);
    }
    if value > 0.0 && value < 1.0 {
        return format!("{:.*}", decimals, value);
    }
    group_thousands(&format!("{:.*}", decimals, value))
}

/// USD with at least two and at most six fraction digits.
pub fn format_currency(value: f64) -> String {
    let mut digits = format!("{:.6}", value.abs());
    if let Some(dot) = digits.find('.') {
        let keep = digits.trim_end_matches('0').len().max(dot + 3);
        digits.truncate(keep);
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}${}", sign, group_thousands(&digits))
}

pub fn format_percentage(value: f64) -> String {
    let sign = if value >= 0.0 { "+" } else { "" };
    format!("{}{:.2}%", sign, value)
}

/// Shortens an address to `start` leading and `end` trailing characters.
pub fn truncate_address(address: &str, start: usize, end: usize) -> String {
    let chars: Vec<char> = address.chars().collect();
    if chars.len() <= start + end {
        return address.to_string();
    }
    let head: String = chars[..start].iter().collect();
    let tail: String = chars[chars.len() - end..].iter().collect();
    format!("{}...{}", head, tail)
}

fn group_thousands(formatted: &str) -> String {
    let (sign, unsigned) = match formatted.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", formatted),
    };
    let (integer, fraction) = match unsigned.find('.') {
        Some(dot) => unsigned.split_at(dot),
        None => (unsigned, ""),
    };
    let mut grouped = String::with_capacity(integer.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    format!("{}{}{}", sign, grouped, fraction)
}
