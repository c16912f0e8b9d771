//! Folding of numeric literal parts into concrete values.
//!
//! The parser hands over a literal as sign/integer/fraction/exponent parts;
//! emission needs the folded integer or floating value.

use serde::{Deserialize, Serialize};

/// The fractional digits of a literal: the digits themselves plus how many
/// there are, so `.025` (digits 25, width 3) and `.25` (digits 25, width 2)
/// stay distinct.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fraction {
    pub digits: u64,
    pub width: u8,
}

impl Fraction {
    pub fn new(digits: u64, width: u8) -> Self {
        Fraction { digits, width }
    }

    /// The value of the fraction as a float in `[0, 1)`.
    pub fn value(&self) -> f64 {
        self.digits as f64 / 10f64.powi(self.width as i32)
    }
}

/// Fold literal parts into a float value.
pub fn fold_float(sign: i32, integer: u64, fraction: Option<Fraction>, exponent: Option<i16>) -> f64 {
    let mut value = integer as f64;
    if let Some(f) = fraction {
        value += f.value();
    }
    if let Some(e) = exponent {
        value *= 10f64.powi(e as i32);
    }
    sign as f64 * value
}

/// Fold literal parts into an integer value. A positive exponent scales the
/// integer; fractional parts are the caller's problem (they force a float
/// literal in the first place).
pub fn fold_int(sign: i32, integer: u64, exponent: Option<i16>) -> i64 {
    let mut value = integer as i64;
    if let Some(e) = exponent {
        if e > 0 {
            value = value.saturating_mul(10i64.saturating_pow(e as u32));
        }
    }
    sign as i64 * value
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_plain_integers() {
        assert_eq!(fold_int(1, 89, None), 89);
        assert_eq!(fold_int(-1, 3, None), -3);
        assert_eq!(fold_int(1, 2, Some(3)), 2000);
    }

    #[test]
    fn folds_floats() {
        assert_eq!(fold_float(1, 4, Some(Fraction::new(0, 1)), None), 4.0);
        assert_eq!(fold_float(1, 0, Some(Fraction::new(25, 2)), None), 0.25);
        assert_eq!(fold_float(1, 2, None, Some(-1)), 0.2);
        assert_eq!(fold_float(-1, 1, Some(Fraction::new(5, 1)), None), -1.5);
    }

    #[test]
    fn fraction_width_matters() {
        assert!(Fraction::new(25, 3).value() < Fraction::new(25, 2).value());
    }
}
