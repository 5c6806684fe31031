//! Thin semantic layer over the arkworks field and curve primitives.
//!
//! Everything the processors need from the underlying algebra lives here:
//! the curve type aliases, the `w`-bit [`Challenge`] with its XOR split, the
//! SHA-256 transcript hash, the compressed `(x, y_lsb)` point encoding, and
//! the try-and-increment derivation of the three commitment bases. The rest
//! of the crate never touches curve internals directly.

use ark_ec::{AffineRepr, CurveGroup, PrimeGroup, short_weierstrass::SWCurveConfig};
use ark_ff::{BigInteger, One, PrimeField};
use num_bigint::BigUint;
use rand::{CryptoRng, Rng};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::error::EngineError;

/// The prime-order group all commitments live in.
pub type Curve = ark_secp256k1::Projective;
/// Affine representation of [`Curve`] points; this is what goes on the wire.
pub type Affine = ark_secp256k1::Affine;
/// Projective representation, used for accumulation.
pub type Projective = ark_secp256k1::Projective;
/// The scalar field of order `q`.
pub type ScalarField = <Curve as PrimeGroup>::ScalarField;
/// The base field the point coordinates live in.
pub type BaseField = <Curve as CurveGroup>::BaseField;

/// Working bit length of Fiat-Shamir challenges; equals the curve size.
pub const CHALLENGE_BITS: usize = 256;
/// Serialized width of an affine coordinate.
pub const COORD_BYTES: usize = 32;

/// A `w`-bit Fiat-Shamir challenge.
///
/// Challenges are deliberately not field elements: the OR proofs split a
/// challenge as `c = c1 ^ c2` over the full bit width, and only the
/// reduction [`Challenge::to_scalar`] enters the group arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Zeroize)]
pub struct Challenge([u8; COORD_BYTES]);

impl Challenge {
    /// Wraps raw big-endian bytes.
    pub fn from_bytes(bytes: [u8; COORD_BYTES]) -> Self {
        Self(bytes)
    }

    /// Big-endian byte view.
    pub fn as_bytes(&self) -> &[u8; COORD_BYTES] {
        &self.0
    }

    /// Samples a challenge with the full [`CHALLENGE_BITS`] random bits.
    pub fn rand<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        let mut bytes = [0u8; COORD_BYTES];
        rng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Bitwise XOR over the full challenge width.
    pub fn xor(&self, other: &Challenge) -> Challenge {
        let mut out = [0u8; COORD_BYTES];
        for (o, (a, b)) in out.iter_mut().zip(self.0.iter().zip(other.0.iter())) {
            *o = a ^ b;
        }
        Challenge(out)
    }

    /// Reduces the challenge into the scalar field.
    pub fn to_scalar(&self) -> ScalarField {
        ScalarField::from_be_bytes_mod_order(&self.0)
    }
}

/// Hashes raw transcript bytes to a challenge.
///
/// The SHA-256 digest is interpreted big-endian and right-shifted down to
/// [`CHALLENGE_BITS`]; at the full digest width the shift vanishes.
pub fn transcript_hash(data: &[u8]) -> Challenge {
    let digest: [u8; COORD_BYTES] = Sha256::digest(data).into();
    Challenge(digest)
}

/// Hashes an identifier into the scalar field: `H(id) mod q`.
pub fn hash_to_scalar(data: &[u8]) -> ScalarField {
    ScalarField::from_be_bytes_mod_order(&Sha256::digest(data))
}

/// Fixed-width big-endian encoding of a base field element.
pub fn coordinate_bytes(x: &BaseField) -> [u8; COORD_BYTES] {
    x.into_bigint()
        .to_bytes_be()
        .try_into()
        .expect("coordinate width is fixed")
}

/// Parity bit of the affine y coordinate.
pub fn y_parity(p: &Affine) -> u8 {
    u8::from(p.y.into_bigint().is_odd())
}

/// Reconstructs a point from its x coordinate and the parity of y.
///
/// Returns `None` when `x` is not on the curve.
pub fn point_from_parts(x: BaseField, parity: u8) -> Option<Affine> {
    let p = Affine::get_point_from_x_unchecked(x, false)?;
    if y_parity(&p) == parity { Some(p) } else { Some(-p) }
}

/// Computes the challenge over points in transcript order.
///
/// Each point contributes its compressed encoding, the x coordinate
/// followed by one parity byte. The order is fixed to
/// `(g, h, f, commitment, gammas...)` by the callers; reordering breaks
/// interoperability between prover and verifier.
pub fn challenge_over_points(points: &[Affine]) -> Challenge {
    let mut buf = Vec::with_capacity(points.len() * (COORD_BYTES + 1));
    for p in points {
        buf.extend_from_slice(&coordinate_bytes(&p.x));
        buf.push(y_parity(p));
    }
    transcript_hash(&buf)
}

/// Derives a commitment base by try-and-increment.
///
/// The smallest `s' >= seed` with a valid x coordinate yields the base; of
/// the two candidate points the one with even y is taken. The verifier
/// repeats the same loop over the published seeds to bind the bases.
pub fn derive_base(seed: BaseField) -> Affine {
    let mut x = seed;
    loop {
        if let Some(p) = Affine::get_point_from_x_unchecked(x, false) {
            return if y_parity(&p) == 0 { p } else { -p };
        }
        x += BaseField::one();
    }
}

/// The three independent commitment bases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bases {
    /// Base binding the identifier hash.
    pub g: Affine,
    /// Base binding the committed value.
    pub h: Affine,
    /// Base binding the nonce.
    pub f: Affine,
}

/// The seed scalars the bases are derived from.
#[derive(Debug, Clone, Copy)]
pub struct BaseSeeds {
    /// Seed for the identifier base.
    pub g: BaseField,
    /// Seed for the value base.
    pub h: BaseField,
    /// Seed for the nonce base.
    pub f: BaseField,
}

impl BaseSeeds {
    /// Parses the three whitespace-separated decimal seeds of a bases file.
    pub fn parse(text: &str) -> Result<Self, EngineError> {
        let mut tokens = text.split_whitespace();
        let mut seed = |what: &'static str| -> Result<BaseField, EngineError> {
            let token = tokens.next().ok_or(EngineError::Truncated("bases file"))?;
            let n = BigUint::parse_bytes(token.as_bytes(), 10)
                .ok_or_else(|| EngineError::malformed(what, token))?;
            Ok(BaseField::from_be_bytes_mod_order(&n.to_bytes_be()))
        };
        Ok(Self {
            g: seed("g seed")?,
            h: seed("h seed")?,
            f: seed("f seed")?,
        })
    }

    /// Runs the try-and-increment derivation for all three bases.
    pub fn derive(&self) -> Bases {
        Bases {
            g: derive_base(self.g),
            h: derive_base(self.h),
            f: derive_base(self.f),
        }
    }
}

/// Validates a curve parameter file against the built-in curve.
///
/// The file carries `bits p a b q x y` in hexadecimal (the bit length is
/// decimal). The curve itself is fixed at compile time, so the file is only
/// checked, never instantiated; a mismatch is a setup failure.
pub fn check_curve_parameters(text: &str) -> Result<(), EngineError> {
    let mut tokens = text.split_whitespace();
    let mut next = |what: &'static str| -> Result<&str, EngineError> {
        tokens.next().ok_or(EngineError::Truncated(what))
    };

    let bits_token = next("curve bit length")?;
    let bits: usize = bits_token
        .parse()
        .map_err(|_| EngineError::malformed("curve bit length", bits_token))?;
    if bits != CHALLENGE_BITS {
        return Err(EngineError::CurveMismatch("bit length"));
    }

    let mut check = |what: &'static str, expected: BigUint| -> Result<(), EngineError> {
        let token = next(what)?;
        let value = BigUint::parse_bytes(token.as_bytes(), 16)
            .ok_or_else(|| EngineError::malformed(what, token))?;
        if value == expected {
            Ok(())
        } else {
            Err(EngineError::CurveMismatch(what))
        }
    };

    let generator = Affine::generator();
    check("field modulus", BaseField::MODULUS.into())?;
    check(
        "curve coefficient a",
        ark_secp256k1::Config::COEFF_A.into_bigint().into(),
    )?;
    check(
        "curve coefficient b",
        ark_secp256k1::Config::COEFF_B.into_bigint().into(),
    )?;
    check("group order", ScalarField::MODULUS.into())?;
    check("generator x", generator.x.into_bigint().into())?;
    check("generator y", generator.y.into_bigint().into())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;

    fn seeds() -> BaseSeeds {
        BaseSeeds::parse("1 2 3").expect("seed text parses")
    }

    #[test]
    fn test_challenge_xor() {
        let mut rng = rand::thread_rng();
        let a = Challenge::rand(&mut rng);
        let b = Challenge::rand(&mut rng);
        assert_eq!(a.xor(&b).xor(&b), a);
        assert_eq!(a.xor(&a), Challenge::default());
    }

    #[test]
    fn test_base_derivation_is_deterministic() {
        let bases = seeds().derive();
        let again = seeds().derive();
        assert_eq!(bases, again);
        assert_ne!(bases.g, bases.h);
        assert_ne!(bases.h, bases.f);
        for p in [bases.g, bases.h, bases.f] {
            assert!(p.is_on_curve());
            assert_eq!(y_parity(&p), 0);
        }
    }

    #[test]
    fn test_point_roundtrip_through_parts() {
        let mut rng = rand::thread_rng();
        for _ in 0..8 {
            let p = Affine::rand(&mut rng);
            let restored =
                point_from_parts(p.x, y_parity(&p)).expect("x of a real point is valid");
            assert_eq!(p, restored);
        }
    }

    #[test]
    fn test_transcript_is_order_sensitive() {
        let bases = seeds().derive();
        let forward = challenge_over_points(&[bases.g, bases.h, bases.f]);
        let backward = challenge_over_points(&[bases.f, bases.h, bases.g]);
        assert_ne!(forward, backward);
    }

    #[test]
    fn test_builtin_curve_parameters_accepted() {
        // secp256k1, as the verifier-side parameter file spells it.
        let text = "256\n\
            FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEFFFFFC2F\n\
            0\n\
            7\n\
            FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFFEBAAEDCE6AF48A03BBFD25E8CD0364141\n\
            79BE667EF9DCBBAC55A06295CE870B07029BFCDB2DCE28D959F2815B16F81798\n\
            483ADA7726A3C4655DA4FBFC0E1108A8FD17B448A68554199C47D08FFB10D4B8";
        check_curve_parameters(text).expect("built-in parameters validate");

        let wrong = text.replace("16F81798", "16F81799");
        assert!(check_curve_parameters(&wrong).is_err());
    }
}
