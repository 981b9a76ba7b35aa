//! Pure value operations used by the Type2 opcodes.

use alloc::string::String;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt::Write;

use crate::AmlError;
use crate::object::{AmlValue, IntWidth, to_buffer, to_integer, to_string};
use crate::opcode::{
    ADD_OP, AND_OP, LEQUAL_OP, LGREATER_EQUAL_OP, LGREATER_OP, LLESS_EQUAL_OP, LLESS_OP,
    LNOT_EQUAL_OP, MOD_OP, MULTIPLY_OP, NAND_OP, NOR_OP, OR_OP, SHIFT_LEFT_OP, SHIFT_RIGHT_OP,
    SUBTRACT_OP, XOR_OP,
};

/// Evaluates a two-operand integer opcode.
pub(crate) fn binary(op: u16, a: u64, b: u64, width: IntWidth) -> Result<u64, AmlError> {
    let v = match op {
        ADD_OP => a.wrapping_add(b),
        SUBTRACT_OP => a.wrapping_sub(b),
        MULTIPLY_OP => a.wrapping_mul(b),
        SHIFT_LEFT_OP => {
            if b >= width.bits() {
                0
            } else {
                a << b
            }
        }
        SHIFT_RIGHT_OP => {
            if b >= width.bits() {
                0
            } else {
                a >> b
            }
        }
        AND_OP => a & b,
        NAND_OP => !(a & b),
        OR_OP => a | b,
        NOR_OP => !(a | b),
        XOR_OP => a ^ b,
        MOD_OP => {
            if b == 0 {
                log::warn!("aml: Mod by zero");
                return Err(AmlError::ExecutionFailure);
            }
            a % b
        }
        _ => return Err(AmlError::ExecutionFailure),
    };
    Ok(width.mask(v))
}

/// `FindSetLeftBit`: one-based index of the most significant set bit.
pub(crate) fn find_set_left_bit(v: u64) -> u64 {
    if v == 0 { 0 } else { u64::from(64 - v.leading_zeros()) }
}

/// `FindSetRightBit`: one-based index of the least significant set bit.
pub(crate) fn find_set_right_bit(v: u64) -> u64 {
    if v == 0 { 0 } else { u64::from(v.trailing_zeros() + 1) }
}

/// Compares two values the way the logical comparison opcodes do: the
/// second operand is converted to the type of the first.
pub(crate) fn compare(a: &AmlValue, b: &AmlValue, width: IntWidth) -> Result<Ordering, AmlError> {
    match a {
        AmlValue::Integer(x) => Ok(x.cmp(&to_integer(b, width)?)),
        AmlValue::String(x) => Ok(x.as_str().cmp(to_string(b, width)?.as_str())),
        AmlValue::Buffer(x) => Ok(x.as_slice().cmp(to_buffer(b, width)?.as_slice())),
        _ => Err(AmlError::TypeMismatch),
    }
}

/// Evaluates a logical comparison opcode.
pub(crate) fn logical_compare(op: u16, ordering: Ordering) -> bool {
    match op {
        LEQUAL_OP => ordering == Ordering::Equal,
        LNOT_EQUAL_OP => ordering != Ordering::Equal,
        LGREATER_OP => ordering == Ordering::Greater,
        LLESS_OP => ordering == Ordering::Less,
        LGREATER_EQUAL_OP => ordering != Ordering::Less,
        LLESS_EQUAL_OP => ordering != Ordering::Greater,
        _ => false,
    }
}

/// `Concatenate`: the result type follows the first operand.
pub(crate) fn concat(a: &AmlValue, b: &AmlValue, width: IntWidth) -> Result<AmlValue, AmlError> {
    match a {
        AmlValue::Integer(x) => {
            let mut out = x.to_le_bytes()[..width.bytes()].to_vec();
            let y = to_integer(b, width)?;
            out.extend_from_slice(&y.to_le_bytes()[..width.bytes()]);
            Ok(AmlValue::Buffer(out))
        }
        AmlValue::String(x) => {
            let mut out = x.clone();
            out.push_str(&to_string(b, width)?);
            Ok(AmlValue::String(out))
        }
        AmlValue::Buffer(x) => {
            let mut out = x.clone();
            match b {
                // A string appended to a buffer contributes its bytes only.
                AmlValue::String(s) => out.extend_from_slice(s.as_bytes()),
                _ => out.extend_from_slice(&to_buffer(b, width)?),
            }
            Ok(AmlValue::Buffer(out))
        }
        _ => Err(AmlError::TypeMismatch),
    }
}

/// Strips a trailing end tag (small item 0x79 + checksum) from a resource
/// template.
fn strip_end_tag(template: &[u8]) -> &[u8] {
    match template {
        [rest @ .., 0x79, _] => rest,
        _ => template,
    }
}

/// `ConcatenateResTemplate`: joins two templates under a single end tag.
pub(crate) fn concat_res(a: &AmlValue, b: &AmlValue) -> Result<AmlValue, AmlError> {
    let a = a.as_buffer()?;
    let b = b.as_buffer()?;
    let mut out = Vec::with_capacity(a.len() + b.len());
    out.extend_from_slice(strip_end_tag(a));
    out.extend_from_slice(strip_end_tag(b));
    out.extend_from_slice(&[0x79, 0x00]);
    Ok(AmlValue::Buffer(out))
}

/// `Mid`: a clamped substring or sub-buffer.
pub(crate) fn mid(src: &AmlValue, index: u64, length: u64) -> Result<AmlValue, AmlError> {
    let range = |len: usize| {
        let start = usize::try_from(index).unwrap_or(usize::MAX).min(len);
        let count = usize::try_from(length).unwrap_or(usize::MAX);
        start..start.saturating_add(count).min(len)
    };
    match src {
        AmlValue::String(s) => {
            let r = range(s.len());
            Ok(AmlValue::String(s.get(r).unwrap_or_default().into()))
        }
        AmlValue::Buffer(b) => {
            let r = range(b.len());
            Ok(AmlValue::Buffer(b[r].to_vec()))
        }
        _ => Err(AmlError::TypeMismatch),
    }
}

/// `ToDecimalString`.
pub(crate) fn to_decimal_string(v: &AmlValue) -> Result<AmlValue, AmlError> {
    let mut s = String::new();
    match v {
        AmlValue::Integer(x) => {
            let _ = write!(s, "{x}");
        }
        AmlValue::Buffer(b) => {
            for (i, byte) in b.iter().enumerate() {
                if i > 0 {
                    s.push(',');
                }
                let _ = write!(s, "{byte}");
            }
        }
        AmlValue::String(x) => s.clone_from(x),
        _ => return Err(AmlError::TypeMismatch),
    }
    Ok(AmlValue::String(s))
}

/// `ToHexString`.
pub(crate) fn to_hex_string(v: &AmlValue, width: IntWidth) -> Result<AmlValue, AmlError> {
    match v {
        AmlValue::Buffer(b) => {
            let mut s = String::with_capacity(b.len() * 5);
            for (i, byte) in b.iter().enumerate() {
                if i > 0 {
                    s.push(',');
                }
                let _ = write!(s, "0x{byte:02X}");
            }
            Ok(AmlValue::String(s))
        }
        _ => Ok(AmlValue::String(to_string(v, width)?)),
    }
}

/// `ToInteger`: strings are decimal unless prefixed with `0x`.
pub(crate) fn to_integer_explicit(v: &AmlValue, width: IntWidth) -> Result<u64, AmlError> {
    match v {
        AmlValue::String(s) => {
            let s = s.trim();
            if s.starts_with("0x") || s.starts_with("0X") {
                return to_integer(v, width);
            }
            let mut x: u64 = 0;
            for c in s.chars() {
                let Some(d) = c.to_digit(10) else { break };
                x = x.wrapping_mul(10).wrapping_add(u64::from(d));
            }
            Ok(width.mask(x))
        }
        _ => to_integer(v, width),
    }
}

/// `ToString`: buffer bytes up to the first NUL or `length` bytes.
pub(crate) fn buffer_to_string(v: &AmlValue, length: u64) -> Result<AmlValue, AmlError> {
    let b = v.as_buffer()?;
    let limit = usize::try_from(length).unwrap_or(usize::MAX).min(b.len());
    Ok(AmlValue::String(
        b[..limit]
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| if c.is_ascii() { char::from(c) } else { '?' })
            .collect(),
    ))
}

/// `ToBCD`.
pub(crate) fn to_bcd(mut v: u64, width: IntWidth) -> u64 {
    let mut out = 0u64;
    let mut shift = 0;
    while v != 0 && shift < 64 {
        out |= (v % 10) << shift;
        v /= 10;
        shift += 4;
    }
    width.mask(out)
}

/// `FromBCD`.
pub(crate) fn from_bcd(mut v: u64) -> u64 {
    let mut out = 0u64;
    let mut scale = 1u64;
    while v != 0 {
        out = out.wrapping_add((v & 0xF).wrapping_mul(scale));
        scale = scale.wrapping_mul(10);
        v >>= 4;
    }
    out
}

/// One `Match` predicate (`MTR`, `MEQ`, `MLE`, `MLT`, `MGE`, `MGT`).
fn match_one(op: u64, element: &AmlValue, operand: &AmlValue, width: IntWidth) -> bool {
    if op == 0 {
        return true;
    }
    let Ok(ordering) = compare(element, operand, width) else {
        return false;
    };
    match op {
        1 => ordering == Ordering::Equal,
        2 => ordering != Ordering::Greater,
        3 => ordering == Ordering::Less,
        4 => ordering != Ordering::Less,
        5 => ordering == Ordering::Greater,
        _ => false,
    }
}

/// `Match`: index of the first element from `start` satisfying both
/// predicates, or `Ones`.
pub(crate) fn match_package(
    package: &[AmlValue],
    ops: [(u64, &AmlValue); 2],
    start: u64,
    width: IntWidth,
) -> u64 {
    let start = usize::try_from(start).unwrap_or(usize::MAX);
    package
        .iter()
        .enumerate()
        .skip(start)
        .find(|(_, e)| ops.iter().all(|&(op, v)| match_one(op, e, v, width)))
        .map_or(width.ones(), |(i, _)| i as u64)
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;

    const W: IntWidth = IntWidth::Bits64;

    #[test]
    fn arithmetic_masks_to_width() {
        assert_eq!(binary(ADD_OP, 2, 3, W), Ok(5));
        assert_eq!(binary(SUBTRACT_OP, 0, 1, IntWidth::Bits32), Ok(0xFFFF_FFFF));
        assert_eq!(binary(SHIFT_LEFT_OP, 1, 64, W), Ok(0));
        assert_eq!(binary(NAND_OP, 0, 0, IntWidth::Bits32), Ok(0xFFFF_FFFF));
        assert_eq!(binary(MOD_OP, 7, 0, W), Err(AmlError::ExecutionFailure));
    }

    #[test]
    fn bit_searches() {
        assert_eq!(find_set_left_bit(0), 0);
        assert_eq!(find_set_left_bit(0x80), 8);
        assert_eq!(find_set_right_bit(0x80), 8);
        assert_eq!(find_set_right_bit(1), 1);
    }

    #[test]
    fn comparisons_convert_second_operand() {
        let ord = compare(&AmlValue::Integer(0x10), &AmlValue::from("10"), W).unwrap();
        assert!(logical_compare(LEQUAL_OP, ord));
        let ord = compare(&AmlValue::from("abc"), &AmlValue::from("abd"), W).unwrap();
        assert!(logical_compare(LLESS_OP, ord));
        assert!(logical_compare(LLESS_EQUAL_OP, ord));
        assert!(!logical_compare(LGREATER_EQUAL_OP, ord));
    }

    #[test]
    fn concatenation() {
        assert_eq!(
            concat(&AmlValue::from("ab"), &AmlValue::Integer(1), IntWidth::Bits32),
            Ok(AmlValue::from("ab00000001"))
        );
        assert_eq!(
            concat(&AmlValue::Integer(1), &AmlValue::Integer(2), IntWidth::Bits32),
            Ok(AmlValue::Buffer(vec![1, 0, 0, 0, 2, 0, 0, 0]))
        );
        let a = AmlValue::Buffer(vec![0x22, 0x01, 0x00, 0x79, 0x00]);
        let b = AmlValue::Buffer(vec![0x47, 0x79, 0x00]);
        assert_eq!(
            concat_res(&a, &b),
            Ok(AmlValue::Buffer(vec![0x22, 0x01, 0x00, 0x47, 0x79, 0x00]))
        );
    }

    #[test]
    fn mid_clamps() {
        assert_eq!(mid(&AmlValue::from("hello"), 1, 3), Ok(AmlValue::from("ell")));
        assert_eq!(mid(&AmlValue::from("hello"), 4, 10), Ok(AmlValue::from("o")));
        assert_eq!(mid(&AmlValue::from("hi"), 5, 1), Ok(AmlValue::from("")));
    }

    #[test]
    fn bcd_round_trip() {
        assert_eq!(to_bcd(1234, W), 0x1234);
        assert_eq!(from_bcd(0x1234), 1234);
    }

    #[test]
    fn explicit_conversions() {
        assert_eq!(to_integer_explicit(&AmlValue::from("123"), W), Ok(123));
        assert_eq!(to_integer_explicit(&AmlValue::from("0x1F"), W), Ok(0x1F));
        assert_eq!(
            to_decimal_string(&AmlValue::Buffer(vec![1, 20])),
            Ok(AmlValue::from("1,20"))
        );
        assert_eq!(
            to_hex_string(&AmlValue::Buffer(vec![0xA, 0xFF]), W),
            Ok(AmlValue::from("0x0A,0xFF"))
        );
        assert_eq!(
            buffer_to_string(&AmlValue::Buffer(b"abc\0def".to_vec()), u64::MAX),
            Ok(AmlValue::from("abc"))
        );
    }

    #[test]
    fn match_finds_first_hit() {
        let pkg = [AmlValue::Integer(1), AmlValue::Integer(5), AmlValue::Integer(9)];
        let four = AmlValue::Integer(4);
        let any = AmlValue::Integer(0);
        // MGT 4, MTR
        assert_eq!(match_package(&pkg, [(5, &four), (0, &any)], 0, W), 1);
        assert_eq!(match_package(&pkg, [(5, &four), (0, &any)], 2, W), 2);
        assert_eq!(match_package(&pkg, [(1, &four), (0, &any)], 0, W), u64::MAX);
    }
}
