//! Lexical wire codec.
//!
//! Scalars, coordinates and challenges in the proof streams are written in a
//! positional base-64 notation with the digit set `0-9A-Za-z+/`, most
//! significant digit first and without leading zeros. This is the radix the
//! data sections are defined in, not RFC 4648 base64: `"10"` is sixty-four.
//! Balances, assets, timestamps and indices stay decimal.

use ark_ff::PrimeField;
use num_bigint::BigUint;

use crate::curve::{
    Affine, BaseField, CHALLENGE_BITS, COORD_BYTES, Challenge, ScalarField, point_from_parts,
    y_parity,
};
use crate::error::EngineError;

const DIGITS: &[u8; 64] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz+/";

fn digit_value(d: u8) -> Option<u8> {
    match d {
        b'0'..=b'9' => Some(d - b'0'),
        b'A'..=b'Z' => Some(d - b'A' + 10),
        b'a'..=b'z' => Some(d - b'a' + 36),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Encodes an arbitrary-precision integer.
pub fn encode(n: &BigUint) -> String {
    n.to_radix_be(64)
        .into_iter()
        .map(|d| DIGITS[d as usize] as char)
        .collect()
}

/// Decodes a lexical base-64 token.
pub fn decode(what: &'static str, token: &str) -> Result<BigUint, EngineError> {
    if token.is_empty() {
        return Err(EngineError::malformed(what, token));
    }
    let mut digits = Vec::with_capacity(token.len());
    for byte in token.bytes() {
        digits.push(digit_value(byte).ok_or_else(|| EngineError::malformed(what, token))?);
    }
    Ok(BigUint::from_radix_be(&digits, 64).expect("digit values are below the radix"))
}

/// Encodes a scalar field element.
pub fn encode_scalar(s: &ScalarField) -> String {
    encode(&s.into_bigint().into())
}

/// Decodes a canonical scalar; values at or above the group order are
/// rejected.
pub fn decode_scalar(what: &'static str, token: &str) -> Result<ScalarField, EngineError> {
    let n = decode(what, token)?;
    if n >= ScalarField::MODULUS.into() {
        return Err(EngineError::malformed(what, token));
    }
    Ok(ScalarField::from_be_bytes_mod_order(&n.to_bytes_be()))
}

/// Encodes a base field coordinate.
pub fn encode_coordinate(x: &BaseField) -> String {
    encode(&x.into_bigint().into())
}

/// Decodes a coordinate; values at or above the field modulus are rejected.
pub fn decode_coordinate(what: &'static str, token: &str) -> Result<BaseField, EngineError> {
    let n = decode(what, token)?;
    if n >= BaseField::MODULUS.into() {
        return Err(EngineError::malformed(what, token));
    }
    Ok(BaseField::from_be_bytes_mod_order(&n.to_bytes_be()))
}

/// Encodes a challenge.
pub fn encode_challenge(c: &Challenge) -> String {
    encode(&BigUint::from_bytes_be(c.as_bytes()))
}

/// Decodes a challenge; the value must fit the challenge width.
pub fn decode_challenge(what: &'static str, token: &str) -> Result<Challenge, EngineError> {
    let n = decode(what, token)?;
    if n.bits() > CHALLENGE_BITS as u64 {
        return Err(EngineError::malformed(what, token));
    }
    let bytes = n.to_bytes_be();
    let mut out = [0u8; COORD_BYTES];
    out[COORD_BYTES - bytes.len()..].copy_from_slice(&bytes);
    Ok(Challenge::from_bytes(out))
}

/// Encodes a point as its `(x, y_lsb)` token pair.
pub fn encode_point(p: &Affine) -> (String, u8) {
    (encode_coordinate(&p.x), y_parity(p))
}

/// Decodes a point from its `(x, y_lsb)` token pair.
pub fn decode_point(
    what: &'static str,
    x_token: &str,
    parity_token: &str,
) -> Result<Affine, EngineError> {
    let x = decode_coordinate(what, x_token)?;
    let parity = match parity_token {
        "0" => 0,
        "1" => 1,
        _ => return Err(EngineError::malformed(what, parity_token)),
    };
    point_from_parts(x, parity).ok_or_else(|| EngineError::malformed(what, x_token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;

    #[test]
    fn test_digit_alphabet() {
        assert_eq!(encode(&BigUint::from(0u32)), "0");
        assert_eq!(encode(&BigUint::from(35u32)), "Z");
        assert_eq!(encode(&BigUint::from(61u32)), "z");
        assert_eq!(encode(&BigUint::from(62u32)), "+");
        assert_eq!(encode(&BigUint::from(63u32)), "/");
        assert_eq!(encode(&BigUint::from(64u32)), "10");
        assert_eq!(decode("n", "10").unwrap(), BigUint::from(64u32));
        assert!(decode("n", "1!").is_err());
        assert!(decode("n", "").is_err());
    }

    #[test]
    fn test_scalar_roundtrip() {
        let mut rng = rand::thread_rng();
        for _ in 0..16 {
            let s = ScalarField::rand(&mut rng);
            let restored = decode_scalar("scalar", &encode_scalar(&s)).unwrap();
            assert_eq!(s, restored);
        }
    }

    #[test]
    fn test_scalar_rejects_group_order() {
        let order: BigUint = ScalarField::MODULUS.into();
        assert!(decode_scalar("scalar", &encode(&order)).is_err());
    }

    #[test]
    fn test_challenge_roundtrip() {
        let mut rng = rand::thread_rng();
        let c = Challenge::rand(&mut rng);
        let restored = decode_challenge("challenge", &encode_challenge(&c)).unwrap();
        assert_eq!(c, restored);
    }

    #[test]
    fn test_point_roundtrip() {
        let mut rng = rand::thread_rng();
        let p = Affine::rand(&mut rng);
        let (x, parity) = encode_point(&p);
        let restored = decode_point("point", &x, if parity == 1 { "1" } else { "0" }).unwrap();
        assert_eq!(p, restored);
        assert!(decode_point("point", &x, "2").is_err());
    }
}
