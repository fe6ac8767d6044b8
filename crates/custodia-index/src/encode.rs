use custodia_core::constants::{NUMERIC_ENCODING_FRAC_DIGITS, NUMERIC_ENCODING_INT_WIDTH};

/// Canonical stringified encoding used for every indexed value (spec §4.E:
/// "All values are stringified through a canonical encoder that pads
/// numbers to a fixed width and preserves lexical order equal to numeric
/// order"). Values that don't parse as a number pass through unchanged, so
/// string-valued fields still sort lexically (which is the identity
/// transform for strings).
pub fn encode_value(raw: &str) -> String {
    match raw.parse::<f64>() {
        Ok(n) if n.is_finite() => encode_number(n),
        _ => raw.to_string(),
    }
}

/// Sign-aware, fixed-width numeric encoding: a leading sign digit (`0` for
/// negative, `1` for non-negative) so negatives always sort before
/// non-negatives, fixed-width zero-padded integer part so magnitude compares
/// lexically the same as numerically, and a fixed-precision fractional part.
/// Negative magnitudes are digit-inverted (`9 - d`) so that a more negative
/// number — larger magnitude — sorts *before* a less negative one.
pub fn encode_number(n: f64) -> String {
    let negative = n.is_sign_negative() && n != 0.0;
    let abs = n.abs();
    let int_part = abs.trunc() as u64;
    let scale = 10u64.pow(NUMERIC_ENCODING_FRAC_DIGITS as u32);
    let frac_part = (abs.fract() * scale as f64).round() as u64;

    let int_str = format!("{:0width$}", int_part, width = NUMERIC_ENCODING_INT_WIDTH);
    let frac_str = format!("{:0width$}", frac_part, width = NUMERIC_ENCODING_FRAC_DIGITS);

    if negative {
        let inv = |s: &str| -> String {
            s.chars()
                .map(|c| std::char::from_digit(9 - c.to_digit(10).unwrap(), 10).unwrap())
                .collect()
        };
        format!("0{}.{}", inv(&int_str), inv(&frac_str))
    } else {
        format!("1{int_str}.{frac_str}")
    }
}
