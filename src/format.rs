//! Number formatting with a fixed `1.234.567,89` convention, independent of
//! the host locale.

const THOUSANDS_SEP: char = '.';
const DECIMAL_SEP: char = ',';

fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(THOUSANDS_SEP);
        }
        out.push(c);
    }
    out
}

/// `1234567` -> `"1.234.567"`
pub fn format_integer(n: i64) -> String {
    let grouped = group_digits(&n.unsigned_abs().to_string());
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// `12.5` -> `"12,50"`, `1234.567` -> `"1.234,57"`
pub fn format_decimal(x: f64) -> String {
    if !x.is_finite() {
        return format_decimal(0.0);
    }
    let cents = (x.abs() * 100.0).round() as u64;
    let whole = group_digits(&(cents / 100).to_string());
    let sign = if x < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}{}{:02}", sign, whole, DECIMAL_SEP, cents % 100)
}

/// Leading numeric prefix of `s` as a float; anything unparsable is zero.
///
/// Status values are sometimes lists such as `"0.52,0.48,0.40"`, in which case
/// the first figure counts.
pub fn lenient_f64(s: &str) -> f64 {
    let s = s.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in s.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return 0.0;
    }
    s[..end].trim_end_matches('.').parse().unwrap_or(0.0)
}

/// Leading integer prefix of `s`; anything unparsable is zero. Values out of
/// range saturate.
pub fn lenient_i64(s: &str) -> i64 {
    let s = s.trim();
    let unsigned = s.strip_prefix(['+', '-']).unwrap_or(s);
    let digits = unsigned
        .find(|c: char| !c.is_ascii_digit())
        .map_or(unsigned, |end| &unsigned[..end]);
    if digits.is_empty() {
        return 0;
    }
    let end = s.len() - unsigned.len() + digits.len();
    s[..end].parse().unwrap_or(if s.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    })
}
