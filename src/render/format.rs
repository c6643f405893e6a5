//! Number formatting for cards

/// `$1,234.567890` with exactly `decimals` fraction digits
pub fn format_usd_fixed(value: f64, decimals: usize) -> String {
    format!("{}${}", sign(value), grouped(value.abs(), decimals))
}

/// `$0.0012` with at most `max_decimals` fraction digits
pub fn format_usd_max(value: f64, max_decimals: usize) -> String {
    let fixed = grouped(value.abs(), max_decimals);
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    format!("{}${}", sign(value), trimmed)
}

/// `$152,341`
pub fn format_usd_whole(value: f64) -> String {
    format_usd_fixed(value, 0)
}

/// `0.00052345 WRON`
pub fn format_cross(value: f64, counter_symbol: &str) -> String {
    format!("{}{} {}", sign(value), grouped(value.abs(), 8), counter_symbol)
}

/// `-3.25%`
pub fn format_change(change_percent: f64) -> String {
    format!("{:.2}%", change_percent)
}

fn sign(value: f64) -> &'static str {
    if value < 0.0 {
        "-"
    } else {
        ""
    }
}

fn grouped(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::with_capacity(fixed.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}
