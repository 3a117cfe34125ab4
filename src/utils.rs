/// Formats an optional f64 to `precision` decimal places, or returns "—" if None or non-finite.
pub fn fmt_opt(v: Option<f64>, precision: usize) -> String {
    match v {
        Some(x) if x.is_finite() => fmt_num(x, precision),
        _ => "—".to_owned(),
    }
}

/// Fixed-precision formatting that never prints a negative zero.
pub fn fmt_num(x: f64, precision: usize) -> String {
    let s = format!("{x:.precision$}");
    if s.starts_with('-') && s[1..].chars().all(|c| c == '0' || c == '.') {
        s[1..].to_owned()
    } else {
        s
    }
}

/// p-values below the display resolution are shown as an upper bound.
pub fn fmt_p(p: Option<f64>, precision: usize) -> String {
    match p {
        Some(x) if x.is_finite() => {
            let floor = 10f64.powi(-(precision as i32));
            if x < floor {
                format!("<{}", fmt_num(floor, precision))
            } else {
                fmt_num(x, precision)
            }
        }
        _ => "—".to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fmt_opt() {
        assert_eq!(fmt_opt(Some(0.33333), 3), "0.333");
        assert_eq!(fmt_opt(None, 3), "—");
        assert_eq!(fmt_opt(Some(f64::NAN), 3), "—");
    }

    #[test]
    fn test_negative_zero_suppressed() {
        assert_eq!(fmt_num(-0.0001, 3), "0.000");
        assert_eq!(fmt_num(-0.5, 1), "-0.5");
    }

    #[test]
    fn test_fmt_p_floor() {
        assert_eq!(fmt_p(Some(0.00001), 3), "<0.001");
        assert_eq!(fmt_p(Some(0.0412), 3), "0.041");
    }
}
