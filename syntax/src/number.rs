// Copyright (c) 2016-2021 Fabian Schuiki

//! Structured values for numeric literals. A based literal's digit string is
//! folded into explicit value bits and an X/Z mask, with digit validity
//! checked against the base. The lexer performs this check when it
//! constructs the token; the binder folds the result into constant values.

use crate::token::{Lit, TimeUnit};
use num::{BigInt, Zero};
use sylva_common::errors::*;
use sylva_common::source::Span;

/// A literal value in four-state representation. Bits flagged in `xz_mask`
/// are unknown; for those, `value` holds 0 for X and 1 for Z.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct BitVec {
    /// The declared width in bits, if the literal carried a size prefix.
    pub width: Option<usize>,
    /// Whether the literal is signed (`'s` indicator).
    pub signed: bool,
    /// The base character `b`, `o`, `d`, or `h`.
    pub base: char,
    /// The two-state value bits.
    pub value: BigInt,
    /// Mask of bits that are X or Z.
    pub xz_mask: BigInt,
}

impl BitVec {
    /// Whether any bit of the value is X or Z.
    pub fn has_xz(&self) -> bool {
        !self.xz_mask.is_zero()
    }

    /// The width to operate at: the declared width, or 32 for unsized
    /// literals as per IEEE 1800-2009 section 5.7.1.
    pub fn effective_width(&self) -> usize {
        self.width.unwrap_or(32)
    }
}

/// The number of value bits one digit of the given base contributes.
fn bits_per_digit(base: char) -> usize {
    match base {
        'b' => 1,
        'o' => 3,
        'h' => 4,
        _ => 0,
    }
}

/// The numeric value of a digit character, if it is valid for the base.
fn digit_value(c: char, base: char) -> Option<u32> {
    let radix = match base {
        'b' => 2,
        'o' => 8,
        'd' => 10,
        'h' => 16,
        _ => return None,
    };
    c.to_digit(radix)
}

/// Fold the digit body of a based literal into value bits and an X/Z mask.
/// Digits that are invalid for the base are diagnosed through `invalid` and
/// treated as zero, so a degraded value is always produced.
pub fn parse_based(
    size: Option<&str>,
    signed: bool,
    base: char,
    body: &str,
    span: Span,
    invalid: &mut Vec<DiagBuilder2>,
) -> BitVec {
    let width = size.and_then(|s| s.parse::<usize>().ok());
    let mut value = BigInt::zero();
    let mut xz_mask = BigInt::zero();
    let per_digit = bits_per_digit(base);

    for c in body.chars() {
        if c == '_' {
            continue;
        }
        match c {
            'x' | 'X' | '?' | 'z' | 'Z' => {
                if base == 'd' && body.chars().filter(|&d| d != '_').count() > 1 {
                    // A decimal X/Z digit must be the entire body.
                    invalid.push(
                        DiagBuilder2::error(format!(
                            "decimal literal may contain `{}` only as its sole digit",
                            c
                        ))
                        .span(span),
                    );
                }
                let digit_bits = if per_digit == 0 { 1 } else { per_digit };
                let fill: BigInt = (BigInt::from(1) << digit_bits) - 1;
                value <<= digit_bits;
                xz_mask <<= digit_bits;
                xz_mask |= fill.clone();
                if c == 'z' || c == 'Z' || c == '?' {
                    value |= fill;
                }
            }
            c => match digit_value(c, base) {
                Some(d) => {
                    if base == 'd' {
                        value *= 10;
                        value += d;
                        xz_mask *= 10;
                    } else {
                        value <<= per_digit;
                        xz_mask <<= per_digit;
                        value += d;
                    }
                }
                None => {
                    invalid.push(
                        DiagBuilder2::error(format!(
                            "digit `{}` is not valid for base `'{}`",
                            c, base
                        ))
                        .span(span),
                    );
                    // Keep the digit position so the remaining digits stay
                    // aligned; the bad digit reads as zero.
                    if base == 'd' {
                        value *= 10;
                        xz_mask *= 10;
                    } else {
                        value <<= per_digit;
                        xz_mask <<= per_digit;
                    }
                }
            },
        }
    }

    // Truncate to the declared width, if any.
    if let Some(w) = width {
        let mask: BigInt = (BigInt::from(1) << w) - 1;
        value &= mask.clone();
        xz_mask &= mask;
    }

    BitVec {
        width: width,
        signed: signed,
        base: base,
        value: value,
        xz_mask: xz_mask,
    }
}

/// Fold an unsized decimal number into a value.
pub fn parse_decimal(body: &str) -> BigInt {
    let digits: String = body.chars().filter(|&c| c != '_').collect();
    digits.parse().unwrap_or_else(|_| BigInt::zero())
}

/// Fold a literal token payload into a structured value, where the literal
/// has one. String and real-valued literals yield `None`.
pub fn from_literal(lit: Lit, span: Span, invalid: &mut Vec<DiagBuilder2>) -> Option<BitVec> {
    match lit {
        Lit::BasedInteger(size, signed, base, body) => {
            let size = size.map(|s| s.as_str());
            Some(parse_based(
                size.as_ref().map(|s| &s[..]),
                signed,
                base,
                &body.as_str(),
                span,
                invalid,
            ))
        }
        Lit::Number(int, None) => Some(BitVec {
            width: None,
            signed: true,
            base: 'd',
            value: parse_decimal(&int.as_str()),
            xz_mask: BigInt::zero(),
        }),
        Lit::UnbasedUnsized(c) => {
            let (value, xz) = match c {
                '0' => (BigInt::zero(), BigInt::zero()),
                '1' => (BigInt::from(1), BigInt::zero()),
                'x' => (BigInt::zero(), BigInt::from(1)),
                'z' => (BigInt::from(1), BigInt::from(1)),
                _ => (BigInt::zero(), BigInt::zero()),
            };
            Some(BitVec {
                width: Some(1),
                signed: false,
                base: 'b',
                value: value,
                xz_mask: xz,
            })
        }
        _ => None,
    }
}

/// The magnitude of a time-scale value, restricted to 1, 10, and 100.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum TimeScaleMagnitude {
    One = 1,
    Ten = 10,
    Hundred = 100,
}

/// One half of a `` `timescale `` specification: a magnitude and a unit.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeScaleValue {
    pub magnitude: TimeScaleMagnitude,
    pub unit: TimeUnit,
}

impl TimeScaleValue {
    /// Build a time-scale value from a literal magnitude and unit. Returns
    /// `None` for magnitudes other than 1, 10, or 100.
    pub fn from_literal(magnitude: &str, unit: TimeUnit) -> Option<TimeScaleValue> {
        let magnitude = match magnitude {
            "1" => TimeScaleMagnitude::One,
            "10" => TimeScaleMagnitude::Ten,
            "100" => TimeScaleMagnitude::Hundred,
            _ => return None,
        };
        Some(TimeScaleValue {
            magnitude: magnitude,
            unit: unit,
        })
    }
}

impl std::fmt::Display for TimeScaleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}{}", self.magnitude as usize, self.unit)
    }
}

/// A full `` `timescale `` specification: time unit and precision.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct TimeScale {
    pub base: TimeScaleValue,
    pub precision: TimeScaleValue,
}

impl std::fmt::Display for TimeScale {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} / {}", self.base, self.precision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num::BigInt;
    use sylva_common::source::INVALID_SPAN;

    fn based(size: Option<&str>, base: char, body: &str) -> (BitVec, usize) {
        let mut invalid = Vec::new();
        let v = parse_based(size, false, base, body, INVALID_SPAN, &mut invalid);
        (v, invalid.len())
    }

    #[test]
    fn single_binary_bit() {
        let (v, bad) = based(Some("1"), 'b', "0");
        assert_eq!(bad, 0);
        assert_eq!(v.width, Some(1));
        assert_eq!(v.base, 'b');
        assert_eq!(v.value, BigInt::from(0));
        assert!(!v.has_xz());
    }

    #[test]
    fn hex_value() {
        let (v, bad) = based(Some("16"), 'h', "2F");
        assert_eq!(bad, 0);
        assert_eq!(v.value, BigInt::from(0x2f));
        assert!(!v.has_xz());
    }

    #[test]
    fn underscores_ignored() {
        let (v, bad) = based(Some("16"), 'b', "0011_0101_0001_1111");
        assert_eq!(bad, 0);
        assert_eq!(v.value, BigInt::from(0b0011_0101_0001_1111));
    }

    #[test]
    fn xz_masks() {
        let (v, bad) = based(Some("3"), 'b', "01x");
        assert_eq!(bad, 0);
        assert_eq!(v.value, BigInt::from(0b010));
        assert_eq!(v.xz_mask, BigInt::from(0b001));

        let (v, _) = based(Some("12"), 'h', "x");
        assert_eq!(v.xz_mask, BigInt::from(0xf));
        let (v, _) = based(Some("8"), 'h', "z0");
        assert_eq!(v.value, BigInt::from(0xf0));
        assert_eq!(v.xz_mask, BigInt::from(0xf0));
    }

    #[test]
    fn invalid_digit_degrades() {
        let (v, bad) = based(Some("4"), 'b', "012");
        assert_eq!(bad, 1);
        assert_eq!(v.value, BigInt::from(0b010));
    }

    #[test]
    fn width_truncation() {
        let (v, bad) = based(Some("4"), 'h', "ff");
        assert_eq!(bad, 0);
        assert_eq!(v.value, BigInt::from(0xf));
    }

    #[test]
    fn time_scale_magnitudes() {
        assert!(TimeScaleValue::from_literal("1", TimeUnit::NanoSecond).is_some());
        assert!(TimeScaleValue::from_literal("10", TimeUnit::PicoSecond).is_some());
        assert!(TimeScaleValue::from_literal("100", TimeUnit::Second).is_some());
        assert!(TimeScaleValue::from_literal("42", TimeUnit::NanoSecond).is_none());
        assert_eq!(
            TimeScaleValue::from_literal("10", TimeUnit::NanoSecond)
                .unwrap()
                .to_string(),
            "10ns"
        );
    }
}
