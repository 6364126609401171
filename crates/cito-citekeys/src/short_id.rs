//! Short citation identifier hashing
//!
//! Short ids are embedded in rendered manuscripts as persistent bibliography
//! keys. The algorithm (6-byte BLAKE2b digest, base62 byte encoding) is
//! frozen: changing it would break citations in already-published documents.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

const BASE62_ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Return a shortened citekey derived from the input citekey.
///
/// The input citekey should be standardized prior to calling this function,
/// since differences in the input will produce entirely different short ids.
/// Output characters are within the ranges 0-9, a-z and A-Z.
pub fn shorten_citekey(standard_citekey: &str) -> String {
    debug_assert!(
        !standard_citekey.contains('@'),
        "standard citekey contains '@' sigil: {standard_citekey:?}"
    );
    let mut hasher = Blake2bVar::new(6).expect("6 bytes is a valid BLAKE2b digest size");
    hasher.update(standard_citekey.as_bytes());
    let mut digest = [0u8; 6];
    hasher
        .finalize_variable(&mut digest)
        .expect("buffer length matches digest size");
    encode_bytes(&digest)
}

/// Encode bytes in base62.
///
/// Leading zero bytes are encoded as `0` followed by the alphabet character
/// for the zero count; the remaining bytes are treated as a big-endian
/// integer. This convention keeps the encoding reversible for digests that
/// begin with null bytes.
fn encode_bytes(bytes: &[u8]) -> String {
    let leading_zeros = bytes.iter().take_while(|&&b| b == 0).count();
    let mut encoded = String::new();
    let full_runs = leading_zeros / (BASE62_ALPHABET.len() - 1);
    let remainder = leading_zeros % (BASE62_ALPHABET.len() - 1);
    for _ in 0..full_runs {
        encoded.push('0');
        encoded.push(BASE62_ALPHABET[BASE62_ALPHABET.len() - 1] as char);
    }
    if remainder > 0 {
        encoded.push('0');
        encoded.push(BASE62_ALPHABET[remainder] as char);
    }
    if leading_zeros == bytes.len() {
        return encoded;
    }
    let payload = bytes[leading_zeros..]
        .iter()
        .fold(0u128, |acc, &b| (acc << 8) | u128::from(b));
    encoded.push_str(&encode_integer(payload));
    encoded
}

fn encode_integer(mut n: u128) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while n > 0 {
        digits.push(BASE62_ALPHABET[(n % 62) as usize]);
        n /= 62;
    }
    digits.reverse();
    String::from_utf8(digits).expect("base62 alphabet is ASCII")
}
