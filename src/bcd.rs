//! Fixed-precision packed decimal values.
//!
//! A [`Bcd`] keeps a number in normalized scientific form: a run of
//! significant decimal digits plus the count of digits that sit before the
//! decimal point. Leading integer zeros and trailing fractional zeros are
//! never stored, so `0.1` and `0.10` share one representation and compare
//! equal without going through binary floating point.
//!
//! The 12-byte key layout produced by [`Bcd::to_bytes`] is:
//!
//! | byte  | contents                                                  |
//! |-------|-----------------------------------------------------------|
//! | 0     | bit 7 sign, bits 2..=6 encoded digit count, bit 0 always 1 |
//! | 1     | significant digit count biased by 52                      |
//! | 2..12 | digits packed two per byte, high nibble first             |

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Maximum number of digits a value can carry.
pub const MAX_DIGITS: usize = 20;

/// Size of the packed key produced by [`Bcd::to_bytes`].
pub const BCD_KEY_LEN: usize = 12;

const SIG_DIGIT_BIAS: i16 = 52;

/// Largest count the five-bit header field holds.
const MAX_ENCODED_DIGITS: i16 = 31;

/// Errors raised while building a decimal value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BcdError {
    #[error("Invalid numeric text: '{0}'")]
    InvalidNumber(String),

    #[error("Value out of range for a packed decimal: {0}")]
    OutOfRange(String),

    #[error("Malformed packed decimal key")]
    MalformedKey,
}

/// A packed decimal value with exact ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bcd {
    negative: bool,
    /// Digits before the decimal point; negative for values below 0.1.
    sig_digits: i16,
    /// Number of digits in use at the front of `digits`.
    len: u8,
    digits: [u8; MAX_DIGITS],
}

impl Bcd {
    /// The zero value.
    pub const fn zero() -> Self {
        Self {
            negative: false,
            sig_digits: 0,
            len: 0,
            digits: [0; MAX_DIGITS],
        }
    }

    /// Build a value from a finite floating point number.
    ///
    /// The number is rounded to 15 significant digits first, which is the
    /// precision an `f64` reliably round-trips through decimal text.
    pub fn from_f64(value: f64) -> Result<Self, BcdError> {
        if !value.is_finite() {
            return Err(BcdError::OutOfRange(value.to_string()));
        }
        if value == 0.0 {
            return Ok(Self::zero());
        }

        let text = format!("{:.14e}", value.abs());
        let (mantissa, exponent) = text
            .split_once('e')
            .ok_or_else(|| BcdError::InvalidNumber(text.clone()))?;
        let exponent: i16 = exponent
            .parse()
            .map_err(|_| BcdError::InvalidNumber(text.clone()))?;
        let digits: Vec<u8> = mantissa
            .bytes()
            .filter(u8::is_ascii_digit)
            .map(|b| b - b'0')
            .collect();

        Self::from_parts(value < 0.0, &digits, exponent + 1)
    }

    /// Replace the value with one parsed from text.
    pub fn set_str(&mut self, text: &str) -> Result<(), BcdError> {
        *self = text.parse()?;
        Ok(())
    }

    /// Replace the value with one built from a floating point number.
    pub fn set_f64(&mut self, value: f64) -> Result<(), BcdError> {
        *self = Self::from_f64(value)?;
        Ok(())
    }

    pub fn is_zero(&self) -> bool {
        self.len == 0
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    /// Count of digits before the decimal point in normalized form.
    pub fn significant_digits(&self) -> i16 {
        self.sig_digits
    }

    /// Count of digits actually stored.
    pub fn stored_digits(&self) -> usize {
        self.len as usize
    }

    /// Digit count written into the key header: every integer digit plus
    /// the fraction up to its last non-zero digit, capped at 31.
    ///
    /// `1200` counts 4 and `0.05` counts 2.
    pub fn encoded_digits(&self) -> usize {
        if self.len == 0 {
            return 0;
        }
        let len = self.len as i16;
        let count = if self.sig_digits >= 0 {
            self.sig_digits.max(len)
        } else {
            len - self.sig_digits
        };
        count.min(MAX_ENCODED_DIGITS) as usize
    }

    pub fn to_f64(&self) -> f64 {
        self.to_string().parse().unwrap_or(0.0)
    }

    /// Pack into the fixed 12-byte key layout.
    pub fn to_bytes(&self) -> [u8; BCD_KEY_LEN] {
        let mut out = [0u8; BCD_KEY_LEN];
        out[0] = (((self.encoded_digits() as u8) & 0x1f) << 2) | 0x01;
        if self.negative {
            out[0] |= 0x80;
        }
        out[1] = (self.sig_digits + SIG_DIGIT_BIAS) as u8;
        for (i, pair) in self.digits.chunks(2).enumerate() {
            out[2 + i] = (pair[0] << 4) | pair[1];
        }
        out
    }

    /// Unpack a value written by [`Bcd::to_bytes`].
    pub fn from_bytes(bytes: &[u8; BCD_KEY_LEN]) -> Result<Self, BcdError> {
        if bytes[0] & 0x01 == 0 {
            return Err(BcdError::MalformedKey);
        }
        let encoded = (bytes[0] >> 2) & 0x1f;

        let mut digits = [0u8; MAX_DIGITS];
        for (i, byte) in bytes[2..].iter().enumerate() {
            let (hi, lo) = (byte >> 4, byte & 0x0f);
            if hi > 9 || lo > 9 {
                return Err(BcdError::MalformedKey);
            }
            digits[i * 2] = hi;
            digits[i * 2 + 1] = lo;
        }

        let len = MAX_DIGITS - digits.iter().rev().take_while(|&&d| d == 0).count();
        if len == 0 {
            return if encoded == 0 {
                Ok(Self::zero())
            } else {
                Err(BcdError::MalformedKey)
            };
        }
        if encoded == 0 || digits[0] == 0 {
            return Err(BcdError::MalformedKey);
        }
        let len = len as u8;
        Ok(Self {
            negative: bytes[0] & 0x80 != 0,
            sig_digits: bytes[1] as i16 - SIG_DIGIT_BIAS,
            len,
            digits,
        })
    }

    /// Three-way comparison against another value.
    pub fn compare(&self, other: &Bcd) -> Ordering {
        self.cmp(other)
    }

    /// Three-way comparison against a floating point number.
    ///
    /// The number is converted to a packed decimal first; values that
    /// cannot be represented fall back to a plain float comparison.
    pub fn compare_f64(&self, other: f64) -> Ordering {
        match Bcd::from_f64(other) {
            Ok(rhs) => self.cmp(&rhs),
            Err(_) => self
                .to_f64()
                .partial_cmp(&other)
                .unwrap_or(Ordering::Less),
        }
    }

    /// Normalize a digit run and build the value.
    fn from_parts(negative: bool, digits: &[u8], sig_digits: i16) -> Result<Self, BcdError> {
        let leading = digits.iter().take_while(|&&d| d == 0).count();
        let digits = &digits[leading..];
        let sig_digits = sig_digits - leading as i16;
        let trailing = digits.iter().rev().take_while(|&&d| d == 0).count();
        let digits = &digits[..digits.len() - trailing];

        if digits.is_empty() {
            return Ok(Self::zero());
        }

        let biased = sig_digits + SIG_DIGIT_BIAS;
        if !(0..=u8::MAX as i16).contains(&biased) {
            return Err(BcdError::OutOfRange(format!(
                "{} significant digits",
                sig_digits
            )));
        }

        // Digits past the storage width are dropped.
        let kept = digits.len().min(MAX_DIGITS);
        let trailing = digits[..kept].iter().rev().take_while(|&&d| d == 0).count();
        let kept = kept - trailing;

        let mut packed = [0u8; MAX_DIGITS];
        packed[..kept].copy_from_slice(&digits[..kept]);
        Ok(Self {
            negative,
            sig_digits,
            len: kept as u8,
            digits: packed,
        })
    }

    fn cmp_magnitude(&self, other: &Bcd) -> Ordering {
        self.sig_digits
            .cmp(&other.sig_digits)
            .then_with(|| self.digits.cmp(&other.digits))
    }
}

impl Default for Bcd {
    fn default() -> Self {
        Self::zero()
    }
}

impl FromStr for Bcd {
    type Err = BcdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let text = s.trim();
        let (negative, body) = match text.as_bytes().first() {
            Some(b'-') => (true, &text[1..]),
            Some(b'+') => (false, &text[1..]),
            _ => (false, text),
        };

        let (int_part, frac_part) = body.split_once('.').unwrap_or((body, ""));
        let all_digits = |part: &str| part.bytes().all(|b| b.is_ascii_digit());
        if (int_part.is_empty() && frac_part.is_empty())
            || !all_digits(int_part)
            || !all_digits(frac_part)
        {
            return Err(BcdError::InvalidNumber(s.to_string()));
        }

        let digits: Vec<u8> = int_part
            .bytes()
            .chain(frac_part.bytes())
            .map(|b| b - b'0')
            .collect();
        Self::from_parts(negative, &digits, int_part.len() as i16)
    }
}

impl Ord for Bcd {
    fn cmp(&self, other: &Self) -> Ordering {
        let sign = |v: &Bcd| -> i8 {
            if v.is_zero() {
                0
            } else if v.negative {
                -1
            } else {
                1
            }
        };

        match sign(self).cmp(&sign(other)) {
            Ordering::Equal => match sign(self) {
                0 => Ordering::Equal,
                1 => self.cmp_magnitude(other),
                _ => other.cmp_magnitude(self),
            },
            unequal => unequal,
        }
    }
}

impl PartialOrd for Bcd {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Bcd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_zero() {
            return write!(f, "0");
        }

        let digits: String = self.digits[..self.len as usize]
            .iter()
            .map(|d| char::from(b'0' + d))
            .collect();
        let sign = if self.negative { "-" } else { "" };
        let sig = self.sig_digits;
        let len = self.len as i16;

        if sig <= 0 {
            write!(f, "{}0.{}{}", sign, "0".repeat((-sig) as usize), digits)
        } else if sig >= len {
            write!(f, "{}{}{}", sign, digits, "0".repeat((sig - len) as usize))
        } else {
            let (int_part, frac_part) = digits.split_at(sig as usize);
            write!(f, "{}{}.{}", sign, int_part, frac_part)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bcd(s: &str) -> Bcd {
        s.parse().unwrap()
    }

    #[test]
    fn test_trailing_zeros_not_significant() {
        let a = bcd("0.1");
        let b = bcd("0.10");
        assert_eq!(a.compare(&b), Ordering::Equal);
        assert_eq!(a, b);
        assert_eq!(a.encoded_digits(), 1);
        assert_eq!(a.stored_digits(), 1);
    }

    #[test]
    fn test_encoded_digit_count() {
        assert_eq!(bcd("1200").encoded_digits(), 4);
        assert_eq!(bcd("1200").stored_digits(), 2);
        assert_eq!(bcd("1200.00").encoded_digits(), 4);
        assert_eq!(bcd("0.05").encoded_digits(), 2);
        assert_eq!(bcd("-12.5").encoded_digits(), 3);
        assert_eq!(bcd("0").encoded_digits(), 0);
        assert_eq!(bcd(&format!("1{}", "0".repeat(40))).encoded_digits(), 31);

        let key = bcd("1200").to_bytes();
        assert_eq!(key[0], (4 << 2) | 0x01);
        assert_eq!(key[1], 4 + 52);
        assert_eq!(&key[2..4], &[0x12, 0x00]);
        assert_eq!(Bcd::from_bytes(&key).unwrap(), bcd("1200"));
        assert_eq!(Bcd::from_bytes(&bcd("0").to_bytes()).unwrap(), Bcd::zero());
    }

    #[test]
    fn test_ordering_by_digits() {
        assert_eq!(bcd("0.30").compare(&bcd("0.1")), Ordering::Greater);
        assert_eq!(bcd("0.05").compare(&bcd("0.1")), Ordering::Less);
        assert_eq!(bcd("100").compare(&bcd("99.999")), Ordering::Greater);
        assert_eq!(bcd("12.5").compare(&bcd("12.50001")), Ordering::Less);
    }

    #[test]
    fn test_ordering_with_signs_and_zero() {
        assert_eq!(bcd("-5").compare(&bcd("3")), Ordering::Less);
        assert_eq!(bcd("-5").compare(&bcd("-3")), Ordering::Less);
        assert_eq!(bcd("-0.5").compare(&bcd("-12")), Ordering::Greater);
        assert_eq!(bcd("0").compare(&bcd("0.05")), Ordering::Less);
        assert_eq!(bcd("0").compare(&bcd("-0.05")), Ordering::Greater);
        assert_eq!(bcd("-0").compare(&bcd("0.000")), Ordering::Equal);
    }

    #[test]
    fn test_display() {
        assert_eq!(bcd("007.500").to_string(), "7.5");
        assert_eq!(bcd("-0.0025").to_string(), "-0.0025");
        assert_eq!(bcd("1200").to_string(), "1200");
        assert_eq!(bcd(".5").to_string(), "0.5");
        assert_eq!(bcd("0.00").to_string(), "0");
    }

    #[test]
    fn test_from_f64() {
        let v = Bcd::from_f64(0.1 + 0.2).unwrap();
        assert_eq!(v, bcd("0.3"));
        assert_eq!(Bcd::from_f64(-42.0).unwrap().to_string(), "-42");
        assert_eq!(Bcd::from_f64(1234.5678).unwrap().to_f64(), 1234.5678);
        assert!(Bcd::from_f64(f64::NAN).is_err());
    }

    #[test]
    fn test_compare_f64() {
        assert_eq!(bcd("0.3").compare_f64(0.1 + 0.2), Ordering::Equal);
        assert_eq!(bcd("2.5").compare_f64(2.4), Ordering::Greater);
        assert_eq!(bcd("-1").compare_f64(0.0), Ordering::Less);
    }

    #[test]
    fn test_invalid_text() {
        assert!(matches!(
            "12a".parse::<Bcd>(),
            Err(BcdError::InvalidNumber(_))
        ));
        assert!(".".parse::<Bcd>().is_err());
        assert!("".parse::<Bcd>().is_err());
        assert!("1.2.3".parse::<Bcd>().is_err());
    }

    #[test]
    fn test_key_layout() {
        let v = bcd("-123.45");
        let key = v.to_bytes();
        assert_eq!(key[0], 0x80 | (5 << 2) | 0x01);
        assert_eq!(key[1], 3 + 52);
        assert_eq!(&key[2..5], &[0x12, 0x34, 0x50]);
        assert_eq!(Bcd::from_bytes(&key).unwrap(), v);
    }

    #[test]
    fn test_malformed_key() {
        let mut key = bcd("1").to_bytes();
        key[0] &= !0x01;
        assert_eq!(Bcd::from_bytes(&key), Err(BcdError::MalformedKey));
    }

    #[test]
    fn test_set() {
        let mut v = Bcd::zero();
        v.set_str("42.10").unwrap();
        assert_eq!(v.to_string(), "42.1");
        v.set_f64(-3.0).unwrap();
        assert!(v.is_negative());
        assert!(v.set_str("abc").is_err());
    }
}
