//! Human-readable byte counts.

use std::num::ParseFloatError;

pub const N_ONE_KB: u64 = 1024;
pub const N_ONE_MB: u64 = N_ONE_KB * N_ONE_KB;

const L_UNITS_SCALED: [&str; 4] = ["KB", "MB", "GB", "TB"];

/// Format a byte count with the largest unit keeping the value below 1024.
///
/// `1023` gives `1023Byte`, `1024` gives `1.0KB`, `1536` gives `1.5KB`.
/// Scaled values are rounded half-up to two decimals. TB is the largest unit.
/// Negative sizes give an empty string.
pub fn format_size(n_size: i64) -> String {
    if n_size < 0 {
        return String::new();
    }
    if n_size < N_ONE_KB as i64 {
        return format!("{n_size}Byte");
    }
    format_size_f64(n_size as f64)
}

/// [`format_size`] for fractional sizes; plain bytes keep their fraction.
pub fn format_size_f64(size: f64) -> String {
    if size < 0.0 || size.is_nan() {
        return String::new();
    }
    if size < N_ONE_KB as f64 {
        return format!("{}Byte", _format_jvm_double(size));
    }
    let mut size_scaled = size;
    let mut c_unit = L_UNITS_SCALED[0];
    for c_candidate in L_UNITS_SCALED {
        size_scaled /= N_ONE_KB as f64;
        c_unit = c_candidate;
        if size_scaled < N_ONE_KB as f64 {
            break;
        }
    }
    let size_rounded = (size_scaled * 100.0 + 0.5).floor() / 100.0;
    format!("{}{c_unit}", _format_jvm_double(size_rounded))
}

/// Parse a decimal byte count and format it. Empty input gives an empty string.
pub fn format_size_str(c_size: &str) -> Result<String, ParseFloatError> {
    let c_trimmed = c_size.trim();
    if c_trimmed.is_empty() {
        return Ok(String::new());
    }
    Ok(format_size_f64(c_trimmed.parse::<f64>()?))
}

/// `1.0`, `1.25`, `1.0E7`: always a fraction digit, exponent form from 10^7.
fn _format_jvm_double(value: f64) -> String {
    if value.is_infinite() {
        return "Infinity".to_string();
    }
    if value.abs() >= 1e7 {
        let c_sci = format!("{value:e}");
        let (c_mantissa, c_exp) = c_sci.split_once('e').unwrap_or((c_sci.as_str(), "0"));
        if c_mantissa.contains('.') {
            return format!("{c_mantissa}E{c_exp}");
        }
        return format!("{c_mantissa}.0E{c_exp}");
    }
    if value.fract() == 0.0 {
        return format!("{value:.1}");
    }
    format!("{value}")
}

#[cfg(test)]
mod tests {
    use super::{N_ONE_KB, N_ONE_MB, format_size, format_size_f64, format_size_str};

    #[test]
    fn format_size_boundaries() {
        assert_eq!(format_size(0), "0Byte");
        assert_eq!(format_size(1023), "1023Byte");
        assert_eq!(format_size(1024), "1.0KB");
        assert_eq!(format_size(1536), "1.5KB");
        assert_eq!(format_size(-5), "");
    }

    #[test]
    fn format_size_units() {
        let n_one_gb = N_ONE_MB * N_ONE_KB;
        assert_eq!(format_size((N_ONE_MB + N_ONE_MB / 4) as i64), "1.25MB");
        assert_eq!(format_size((3 * n_one_gb) as i64), "3.0GB");
        assert_eq!(format_size((2048 * n_one_gb * N_ONE_KB) as i64), "2048.0TB");
        // 1023.999 KB rounds up but stays in KB.
        assert_eq!(format_size(1_048_575), "1024.0KB");
        assert_eq!(format_size(1_234_567), "1.18MB");
    }

    #[test]
    fn format_size_fractional_and_text() {
        assert_eq!(format_size_f64(512.5), "512.5Byte");
        assert_eq!(format_size_f64(-0.5), "");
        assert_eq!(format_size_f64(1e20), "9.094947018E7TB");
        assert_eq!(format_size_str("").expect("empty"), "");
        assert_eq!(format_size_str(" 2048 ").expect("parse"), "2.0KB");
        assert!(format_size_str("abc").is_err());
    }
}
