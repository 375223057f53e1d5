use std::{fmt, str::FromStr};

use crate::common::reason_error;

/// Largest supported scale, digits after the decimal point.
const MAX_SCALE: u32 = 28;

/// Largest supported mantissa, 96 bit.
const MAX_MANTISSA: u128 = (1 << 96) - 1;

/// Fixed point decimal number.
///
/// Stored as `mantissa * 10^-scale`. Scale is significant, `1.50` and `1.5`
/// are different values, matching how the remote side preserves trailing
/// zeros.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Decimal {
    mantissa: i128,
    scale: u32,
}

impl Decimal {
    pub const ZERO: Decimal = Decimal { mantissa: 0, scale: 0 };

    pub const MAX: Decimal = Decimal { mantissa: MAX_MANTISSA as i128, scale: 0 };

    pub const MIN: Decimal = Decimal { mantissa: -(MAX_MANTISSA as i128), scale: 0 };

    /// Create new decimal, returns [`None`] if mantissa or scale is out of range.
    pub const fn new(mantissa: i128, scale: u32) -> Option<Decimal> {
        if mantissa.unsigned_abs() > MAX_MANTISSA || scale > MAX_SCALE {
            return None;
        }
        Some(Self { mantissa, scale })
    }

    /// Returns the unscaled integer.
    pub const fn mantissa(&self) -> i128 {
        self.mantissa
    }

    /// Returns the number of fractional digits.
    pub const fn scale(&self) -> u32 {
        self.scale
    }

    pub const fn is_negative(&self) -> bool {
        self.mantissa < 0
    }
}

impl From<i64> for Decimal {
    fn from(value: i64) -> Self {
        Self { mantissa: value as i128, scale: 0 }
    }
}

impl fmt::Display for Decimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = itoa::Buffer::new();
        let digits = buf.format(self.mantissa.unsigned_abs());
        let scale = self.scale as usize;

        if self.mantissa < 0 {
            f.write_str("-")?;
        }

        if scale == 0 {
            return f.write_str(digits);
        }

        if digits.len() > scale {
            let (int, frac) = digits.split_at(digits.len() - scale);
            write!(f, "{int}.{frac}")
        } else {
            f.write_str("0.")?;
            for _ in digits.len()..scale {
                f.write_str("0")?;
            }
            f.write_str(digits)
        }
    }
}

impl FromStr for Decimal {
    type Err = ParseDecimalError;

    /// Parse `-?digits(.digits)?`, no exponent and no leading `+`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(body) => (true, body),
            None => (false, s),
        };

        let (int, frac) = match body.split_once('.') {
            Some((int, frac)) => (int, frac),
            None => (body, ""),
        };

        if int.is_empty() || (body.contains('.') && frac.is_empty()) {
            return Err(ParseDecimalError::new("missing digits"));
        }

        if !int.bytes().chain(frac.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(ParseDecimalError::new("invalid digit"));
        }

        let scale = frac.len() as u32;
        if scale > MAX_SCALE {
            return Err(ParseDecimalError::new("scale too large"));
        }

        let mut mantissa = 0u128;
        for b in int.bytes().chain(frac.bytes()) {
            mantissa = mantissa
                .checked_mul(10)
                .and_then(|m| m.checked_add((b - b'0') as u128))
                .filter(|m| *m <= MAX_MANTISSA)
                .ok_or_else(|| ParseDecimalError::new("mantissa overflow"))?;
        }

        let mantissa = mantissa as i128;
        Ok(Self { mantissa: if negative { -mantissa } else { mantissa }, scale })
    }
}

reason_error! {
    /// An error when parsing decimal text.
    pub struct ParseDecimalError("failed to parse decimal");
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn format_decimal() {
        assert_eq!(Decimal::new(150, 2).unwrap().to_string(), "1.50");
        assert_eq!(Decimal::new(-5, 3).unwrap().to_string(), "-0.005");
        assert_eq!(Decimal::new(42, 0).unwrap().to_string(), "42");
        assert_eq!(Decimal::ZERO.to_string(), "0");
        assert_eq!(Decimal::MAX.to_string(), "79228162514264337593543950335");
        assert_eq!(Decimal::MIN.to_string(), "-79228162514264337593543950335");
    }

    #[test]
    fn parse_decimal() {
        assert_eq!("1.50".parse::<Decimal>().unwrap(), Decimal::new(150, 2).unwrap());
        assert_eq!("-0.005".parse::<Decimal>().unwrap(), Decimal::new(-5, 3).unwrap());
        assert_eq!("79228162514264337593543950335".parse::<Decimal>().unwrap(), Decimal::MAX);
        assert!("79228162514264337593543950336".parse::<Decimal>().is_err());
        assert!("1e5".parse::<Decimal>().is_err());
        assert!("+1".parse::<Decimal>().is_err());
        assert!("1.".parse::<Decimal>().is_err());
        assert!(".5".parse::<Decimal>().is_err());
        assert!("".parse::<Decimal>().is_err());
    }

    #[test]
    fn scale_is_bounded() {
        assert!(Decimal::new(1, 29).is_none());
        assert!("0.00000000000000000000000000001".parse::<Decimal>().is_err());
    }
}
