//! Numeric helpers: integer pow, integer↔string conversion, and the 256-bit
//! arithmetic the target lacks natively.
//!
//! `itoa` supports radix 2–36; `atoi` parses radix 10 only, scanning digits
//! right to left and skipping `,` separators.  Negative decimal rendering
//! goes through the unsigned magnitude so the most-negative value of each
//! width round-trips.

pub mod bigint;

pub use bigint::{div256_u256, div256_u256_rem, I256, U256};

use crate::heap::Addr;
use crate::runtime::Runtime;

const ITOA_DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";

// ─────────────────────────────────────────────────────────────────────────────
// Integer pow by binary exponentiation (wrapping, like the target's words)
// ─────────────────────────────────────────────────────────────────────────────

macro_rules! pow_int {
    ($name:ident, $ty:ty) => {
        pub fn $name(mut base: $ty, mut exp: $ty) -> $ty {
            let mut result: $ty = 1;
            loop {
                if exp & 1 == 1 {
                    result = result.wrapping_mul(base);
                }
                exp >>= 1;
                if exp == 0 {
                    break;
                }
                base = base.wrapping_mul(base);
            }
            result
        }
    };
}

pow_int!(ir_builtin_pow_u8, u8);
pow_int!(ir_builtin_pow_u16, u16);
pow_int!(ir_builtin_pow_u32, u32);
pow_int!(ir_builtin_pow_u64, u64);
pow_int!(ir_builtin_pow_u128, u128);
pow_int!(ir_builtin_pow_i8, i8);
pow_int!(ir_builtin_pow_i16, i16);
pow_int!(ir_builtin_pow_i32, i32);
pow_int!(ir_builtin_pow_i64, i64);
pow_int!(ir_builtin_pow_i128, i128);

pub fn ir_builtin_pow_u256(mut base: U256, mut exp: U256) -> U256 {
    let mut result = U256::ONE;
    loop {
        if exp.low_u64() & 1 == 1 {
            result = result.wrapping_mul(base);
        }
        exp = exp.shr(1);
        if exp.is_zero() {
            break;
        }
        base = base.wrapping_mul(base);
    }
    result
}

pub fn ir_builtin_pow_i256(base: I256, exp: I256) -> I256 {
    I256(ir_builtin_pow_u256(base.0, exp.0))
}

// ─────────────────────────────────────────────────────────────────────────────
// itoa
// ─────────────────────────────────────────────────────────────────────────────

fn render_u128(mut unum: u128, radix: u32, neg: bool) -> String {
    let mut digits = Vec::new();
    loop {
        digits.push(ITOA_DIGITS[(unum % radix as u128) as usize]);
        unum /= radix as u128;
        if unum == 0 {
            break;
        }
    }
    let mut out = String::with_capacity(digits.len() + 1);
    if neg {
        out.push('-');
    }
    for d in digits.iter().rev() {
        out.push(*d as char);
    }
    out
}

fn render_u256(mut unum: U256, radix: u32, neg: bool) -> String {
    let mut digits = Vec::new();
    let radix256 = U256::from_u64(radix as u64);
    loop {
        let (quot, rem) = div256_u256_rem(unum, radix256);
        digits.push(ITOA_DIGITS[rem.low_u64() as usize]);
        unum = quot;
        if unum.is_zero() {
            break;
        }
    }
    let mut out = String::with_capacity(digits.len() + 1);
    if neg {
        out.push('-');
    }
    for d in digits.iter().rev() {
        out.push(*d as char);
    }
    out
}

macro_rules! int_toa {
    ($name:ident, $ty:ty, $uty:ty) => {
        /// Renders the value in the given radix (2–36); an invalid radix
        /// aborts.  Negative values spell a leading `-` in radix 10 and the
        /// raw two's-complement bit pattern otherwise.
        #[allow(unused_comparisons)]
        pub fn $name(&mut self, num: $ty, radix: i32) -> String {
            if !(2..=36).contains(&radix) {
                self.abort_str("ITOA Error: invalid radix");
            }
            if radix == 10 && num < 0 {
                render_u128((num as i128).unsigned_abs(), 10, true)
            } else {
                render_u128(num as $uty as u128, radix as u32, false)
            }
        }
    };
}

macro_rules! int_to_str {
    ($name:ident, $toa:ident, $ty:ty) => {
        /// Rendered value packaged as a byte vector.
        pub fn $name(&mut self, num: $ty, radix: i32) -> Addr {
            let s = self.$toa(num, radix);
            self.vector_new(s.len() as u32, Some(s.as_bytes()))
        }
    };
}

impl Runtime {
    int_toa!(i8_toa, i8, u8);
    int_toa!(i16_toa, i16, u16);
    int_toa!(i32_toa, i32, u32);
    int_toa!(i64_toa, i64, u64);
    int_toa!(i128_toa, i128, u128);
    int_toa!(u8_toa, u8, u8);
    int_toa!(u16_toa, u16, u16);
    int_toa!(u32_toa, u32, u32);
    int_toa!(u64_toa, u64, u64);
    int_toa!(u128_toa, u128, u128);

    pub fn u256_toa(&mut self, num: U256, radix: i32) -> String {
        if !(2..=36).contains(&radix) {
            self.abort_str("ITOA Error: invalid radix");
        }
        render_u256(num, radix as u32, false)
    }

    pub fn i256_toa(&mut self, num: I256, radix: i32) -> String {
        if !(2..=36).contains(&radix) {
            self.abort_str("ITOA Error: invalid radix");
        }
        if radix == 10 && num.is_negative() {
            render_u256(num.unsigned_magnitude(), 10, true)
        } else {
            render_u256(num.0, radix as u32, false)
        }
    }

    int_to_str!(ir_builtin_i8_to_str, i8_toa, i8);
    int_to_str!(ir_builtin_i16_to_str, i16_toa, i16);
    int_to_str!(ir_builtin_i32_to_str, i32_toa, i32);
    int_to_str!(ir_builtin_i64_to_str, i64_toa, i64);
    int_to_str!(ir_builtin_i128_to_str, i128_toa, i128);
    int_to_str!(ir_builtin_u8_to_str, u8_toa, u8);
    int_to_str!(ir_builtin_u16_to_str, u16_toa, u16);
    int_to_str!(ir_builtin_u32_to_str, u32_toa, u32);
    int_to_str!(ir_builtin_u64_to_str, u64_toa, u64);
    int_to_str!(ir_builtin_u128_to_str, u128_toa, u128);

    pub fn ir_builtin_u256_to_str(&mut self, num: U256, radix: i32) -> Addr {
        let s = self.u256_toa(num, radix);
        self.vector_new(s.len() as u32, Some(s.as_bytes()))
    }

    pub fn ir_builtin_i256_to_str(&mut self, num: I256, radix: i32) -> Addr {
        let s = self.i256_toa(num, radix);
        self.vector_new(s.len() as u32, Some(s.as_bytes()))
    }

    // ── atoi ─────────────────────────────────────────────────────────────

    // Radix-10 parse, right-to-left accumulation.  Returns the unsigned
    // accumulator and the sign flag.
    fn parse_decimal_u128(&mut self, s: Addr, signed: bool) -> (u128, bool) {
        let bytes = self.vector_as_slice(s).to_vec();
        let mut offset = 0usize;
        if offset >= bytes.len() {
            self.abort_str("str to int failed: empty string");
        }
        let mut neg = false;
        if signed {
            if bytes[offset] == b'-' {
                neg = true;
                offset += 1;
            } else if bytes[offset] == b'+' {
                offset += 1;
            }
        }

        let mut result = 0u128;
        let mut digit_multiply = 1u128;
        let mut digits_count = 0usize;
        for i in (offset..bytes.len()).rev() {
            let digit = bytes[i];
            if digit == b',' {
                continue;
            }
            if !digit.is_ascii_digit() {
                let msg = format!("str to int failed: invalid char: {}", digit as char);
                self.abort_str(&msg);
            }
            let new_result =
                result.wrapping_add(digit_multiply.wrapping_mul((digit - b'0') as u128));
            if new_result < result {
                self.abort_str("str to int failed: overflow");
            }
            result = new_result;
            digit_multiply = digit_multiply.wrapping_mul(10);
            digits_count += 1;
        }
        if digits_count < 1 {
            self.abort_str("str to int failed: no digits");
        }
        (result, neg)
    }

    fn parse_decimal_u256(&mut self, s: Addr, signed: bool) -> (U256, bool) {
        let bytes = self.vector_as_slice(s).to_vec();
        let mut offset = 0usize;
        if offset >= bytes.len() {
            self.abort_str("str to int failed: empty string");
        }
        let mut neg = false;
        if signed {
            if bytes[offset] == b'-' {
                neg = true;
                offset += 1;
            } else if bytes[offset] == b'+' {
                offset += 1;
            }
        }

        let mut result = U256::ZERO;
        let mut digit_multiply = U256::ONE;
        let ten = U256::from_u64(10);
        let mut digits_count = 0usize;
        for i in (offset..bytes.len()).rev() {
            let digit = bytes[i];
            if digit == b',' {
                continue;
            }
            if !digit.is_ascii_digit() {
                let msg = format!("str to int failed: invalid char: {}", digit as char);
                self.abort_str(&msg);
            }
            let step = digit_multiply.wrapping_mul(U256::from_u64((digit - b'0') as u64));
            let new_result = result.wrapping_add(step);
            if new_result < result {
                self.abort_str("str to int failed: overflow");
            }
            result = new_result;
            digit_multiply = digit_multiply.wrapping_mul(ten);
            digits_count += 1;
        }
        if digits_count < 1 {
            self.abort_str("str to int failed: no digits");
        }
        (result, neg)
    }

    pub fn ir_builtin_str_to_i128(&mut self, s: Addr) -> i128 {
        let (result, neg) = self.parse_decimal_u128(s, true);
        if neg {
            result.wrapping_neg() as i128
        } else {
            result as i128
        }
    }

    pub fn ir_builtin_str_to_u128(&mut self, s: Addr) -> u128 {
        let (result, _) = self.parse_decimal_u128(s, false);
        result
    }

    pub fn ir_builtin_str_to_i256(&mut self, s: Addr) -> I256 {
        let (result, neg) = self.parse_decimal_u256(s, true);
        if neg {
            I256(result.wrapping_neg())
        } else {
            I256(result)
        }
    }

    pub fn ir_builtin_str_to_u256(&mut self, s: Addr) -> U256 {
        let (result, _) = self.parse_decimal_u256(s, false);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pow_small_widths() {
        assert_eq!(ir_builtin_pow_u8(2, 0), 1);
        assert_eq!(ir_builtin_pow_u8(2, 7), 128);
        assert_eq!(ir_builtin_pow_u32(3, 9), 19683);
        assert_eq!(ir_builtin_pow_i64(-2, 5), -32);
        assert_eq!(ir_builtin_pow_u64(2, 63), 1 << 63);
        // wraps like the target's machine words
        assert_eq!(ir_builtin_pow_u8(2, 8), 0);
    }

    #[test]
    fn pow_u256_squares() {
        let two = U256::from_u64(2);
        assert_eq!(
            ir_builtin_pow_u256(two, U256::from_u64(200)),
            U256::ONE.shl(200)
        );
    }

    #[test]
    fn itoa_radixes() {
        let mut rt = Runtime::with_mock_host();
        assert_eq!(rt.i32_toa(0, 10), "0");
        assert_eq!(rt.i32_toa(-123, 10), "-123");
        assert_eq!(rt.i32_toa(255, 16), "ff");
        assert_eq!(rt.i32_toa(5, 2), "101");
        assert_eq!(rt.u64_toa(u64::MAX, 10), "18446744073709551615");
        assert_eq!(rt.i32_toa(35, 36), "z");
        // non-decimal negatives render the bit pattern
        assert_eq!(rt.i8_toa(-1, 16), "ff");
        assert_eq!(rt.i128_toa(i128::MIN, 10), "-170141183460469231731687303715884105728");
    }

    #[test]
    #[should_panic(expected = "ITOA Error: invalid radix")]
    fn itoa_radix_0_aborts() {
        let mut rt = Runtime::with_mock_host();
        rt.i32_toa(5, 0);
    }

    #[test]
    #[should_panic(expected = "ITOA Error: invalid radix")]
    fn itoa_radix_1_aborts() {
        let mut rt = Runtime::with_mock_host();
        rt.i32_toa(5, 1);
    }

    #[test]
    #[should_panic(expected = "ITOA Error: invalid radix")]
    fn itoa_radix_37_aborts() {
        let mut rt = Runtime::with_mock_host();
        rt.i32_toa(5, 37);
    }

    #[test]
    fn atoi_roundtrip_i128_boundaries() {
        let mut rt = Runtime::with_mock_host();
        for value in [
            0i128,
            123,
            -123,
            123456789012345678,
            -123456789012345678,
            i128::MAX,
            i128::MIN + 1,
            i128::MIN,
        ] {
            let s = rt.ir_builtin_i128_to_str(value, 10);
            assert_eq!(rt.ir_builtin_str_to_i128(s), value);
        }
    }

    #[test]
    fn atoi_u128_and_commas() {
        let mut rt = Runtime::with_mock_host();
        let s = rt.vector_new(9, Some(b"1,234,567"));
        assert_eq!(rt.ir_builtin_str_to_u128(s), 1234567);
        let max = rt.ir_builtin_u128_to_str(u128::MAX, 10);
        assert_eq!(rt.ir_builtin_str_to_u128(max), u128::MAX);
    }

    #[test]
    fn atoi_u256_roundtrip() {
        let mut rt = Runtime::with_mock_host();
        let big = U256([u64::MAX, u64::MAX, 5, 1]);
        let s = rt.ir_builtin_u256_to_str(big, 10);
        assert_eq!(rt.ir_builtin_str_to_u256(s), big);

        let neg = I256::from_i128(-99999999999999999999999999i128);
        let s2 = rt.ir_builtin_i256_to_str(neg, 10);
        assert_eq!(rt.ir_builtin_str_to_i256(s2), neg);
    }

    #[test]
    #[should_panic(expected = "str to int failed: empty string")]
    fn atoi_empty_aborts() {
        let mut rt = Runtime::with_mock_host();
        let s = rt.vector_new(0, Some(b""));
        rt.ir_builtin_str_to_i128(s);
    }

    #[test]
    #[should_panic(expected = "str to int failed: no digits")]
    fn atoi_sign_only_aborts() {
        let mut rt = Runtime::with_mock_host();
        let s = rt.vector_new(1, Some(b"-"));
        rt.ir_builtin_str_to_i128(s);
    }

    #[test]
    #[should_panic(expected = "str to int failed: invalid char: x")]
    fn atoi_invalid_char_aborts() {
        let mut rt = Runtime::with_mock_host();
        let s = rt.vector_new(3, Some(b"12x"));
        rt.ir_builtin_str_to_i128(s);
    }
}
