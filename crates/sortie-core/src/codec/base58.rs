//! Base58 encoding over arbitrary-length big-endian byte arrays.
//!
//! Uses the Bitcoin alphabet, which omits `0`, `O`, `I` and `l` so codes can
//! be read aloud or retyped without ambiguity. Leading zero bytes map one to
//! one onto leading `'1'` characters, so the byte length survives a round
//! trip even though the big-integer value alone would lose it.

use crate::error::CodecError;

/// The 58-symbol alphabet. Previously distributed codes depend on this exact
/// ordering.
pub const ALPHABET: &[u8; 58] = b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

const RADIX: u32 = 58;

/// ASCII -> digit value lookup; `-1` marks characters outside the alphabet.
const DECODE_MAP: [i8; 128] = {
    let mut map = [-1i8; 128];
    let mut i = 0;
    while i < ALPHABET.len() {
        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        {
            map[ALPHABET[i] as usize] = i as i8;
        }
        i += 1;
    }
    map
};

fn digit_value(ch: char) -> Option<u8> {
    let idx = usize::try_from(u32::from(ch)).ok()?;
    let value = *DECODE_MAP.get(idx)?;
    u8::try_from(value).ok()
}

/// Encode `input` as a base58 string.
#[allow(clippy::cast_possible_truncation)] // remainders are always < 58
pub fn encode(input: &[u8]) -> String {
    let zeros = input.iter().take_while(|&&b| b == 0).count();

    // Little-endian base58 digits of the big-endian integer.
    let mut digits: Vec<u8> = Vec::with_capacity(input.len() * 138 / 100 + 1);
    for &byte in &input[zeros..] {
        let mut carry = u32::from(byte);
        for digit in &mut digits {
            carry += u32::from(*digit) << 8;
            *digit = (carry % RADIX) as u8;
            carry /= RADIX;
        }
        while carry > 0 {
            digits.push((carry % RADIX) as u8);
            carry /= RADIX;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat_n('1', zeros));
    out.extend(
        digits
            .iter()
            .rev()
            .map(|&d| char::from(ALPHABET[usize::from(d)])),
    );
    out
}

/// Decode a base58 string back into big-endian bytes.
///
/// Fails with [`CodecError::InvalidCharacter`] on the first character outside
/// [`ALPHABET`].
#[allow(clippy::cast_possible_truncation)] // masked to a single byte
pub fn decode(input: &str) -> Result<Vec<u8>, CodecError> {
    let mut bytes: Vec<u8> = Vec::with_capacity(input.len());
    for (position, ch) in input.chars().enumerate() {
        let value = digit_value(ch).ok_or(CodecError::InvalidCharacter { ch, position })?;
        let mut carry = u32::from(value);
        for byte in &mut bytes {
            carry += u32::from(*byte) * RADIX;
            *byte = (carry & 0xff) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xff) as u8);
            carry >>= 8;
        }
    }

    let zeros = input.chars().take_while(|&c| c == '1').count();
    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}
