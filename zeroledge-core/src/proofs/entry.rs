//! Proof of knowledge of an opening of an entry commitment.
//!
//! The prover shows it knows `(x', v, r)` with `lec = x'*g + v*h + r*f`.
//! With saved state from a previous run, both the commitment and the nonce
//! commitment are derived from the previous ones: the commitment shifts by
//! the balance and nonce deltas, and the three nonces rescale by a single
//! fresh scalar, collapsing three scalar multiplications into one.

use ark_ec::CurveGroup;
use ark_ff::{UniformRand, Zero};
use rand::{CryptoRng, Rng};

use crate::curve::{Bases, ScalarField, challenge_over_points};
use crate::ledger::{IncrementalEntry, LedgerEntry};

/// Commits to the entry. Requires the aggregate nonce `e.r` to be computed.
pub fn commit(bases: &Bases, e: &mut LedgerEntry, prev: Option<&IncrementalEntry>) {
    match prev {
        Some(prev) => {
            let mut lec = bases.f * (e.r - prev.r) + prev.lec;
            let delta = ScalarField::from(e.balance) - ScalarField::from(prev.balance);
            if !delta.is_zero() {
                lec += bases.h * delta;
            }
            e.lec = lec.into_affine();
        }
        None => {
            e.lec = (bases.g * e.id_hash_prime
                + bases.h * ScalarField::from(e.balance)
                + bases.f * e.r)
                .into_affine();
        }
    }
}

/// First move: sample nonces and commit to them.
pub fn begin<R: Rng + CryptoRng>(
    bases: &Bases,
    e: &mut LedgerEntry,
    prev: Option<&IncrementalEntry>,
    rng: &mut R,
) {
    match prev {
        Some(prev) => {
            let b_incr = ScalarField::rand(rng);
            e.lep.b1 = prev.lep_b1 * b_incr;
            e.lep.b2 = prev.lep_b2 * b_incr;
            e.lep.b3 = prev.lep_b3 * b_incr;
            e.lep.gamma = (prev.lep_gamma * b_incr).into_affine();
        }
        None => {
            e.lep.b1 = ScalarField::rand(rng);
            e.lep.b2 = ScalarField::rand(rng);
            e.lep.b3 = ScalarField::rand(rng);
            e.lep.gamma = (bases.g * e.lep.b1 + bases.h * e.lep.b2 + bases.f * e.lep.b3)
                .into_affine();
        }
    }
}

/// Second move: the challenge is the transcript hash over
/// `(g, h, f, lec, gamma)`.
pub fn challenge(bases: &Bases, e: &mut LedgerEntry) {
    e.lep.c = challenge_over_points(&[bases.g, bases.h, bases.f, e.lec, e.lep.gamma]);
}

/// Third move: responses `z = b + c * secret`.
pub fn complete(e: &mut LedgerEntry) {
    let c = e.lep.c.to_scalar();
    e.lep.z1 = e.lep.b1 + c * e.id_hash_prime;
    e.lep.z2 = e.lep.b2 + c * ScalarField::from(e.balance);
    e.lep.z3 = e.lep.b3 + c * e.r;
}

/// Runs the three proof moves in order.
pub fn prove<R: Rng + CryptoRng>(
    bases: &Bases,
    e: &mut LedgerEntry,
    prev: Option<&IncrementalEntry>,
    rng: &mut R,
) {
    begin(bases, e, prev, rng);
    challenge(bases, e);
    complete(e);
}

/// Replays `z1*g + z2*h + z3*f == c*lec + gamma` with the challenge
/// recomputed from the transcript.
pub fn verify(bases: &Bases, e: &LedgerEntry) -> bool {
    let c = challenge_over_points(&[bases.g, bases.h, bases.f, e.lec, e.lep.gamma]);
    let lhs = bases.g * e.lep.z1 + bases.h * e.lep.z2 + bases.f * e.lep.z3;
    let rhs = e.lec * c.to_scalar() + e.lep.gamma;
    lhs == rhs
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;

    use crate::curve::{Affine, BaseSeeds};
    use crate::proofs::bit;

    fn bases() -> Bases {
        BaseSeeds::parse("1 2 3").unwrap().derive()
    }

    fn proven_entry(id: &str, balance: u64) -> LedgerEntry {
        let mut rng = rand::thread_rng();
        let bases = bases();
        let mut e = LedgerEntry::new(id, balance, 8);
        bit::sample_nonces(&mut e, &mut rng);
        e.compute_r();
        commit(&bases, &mut e, None);
        prove(&bases, &mut e, None, &mut rng);
        e
    }

    #[test]
    fn test_honest_proof_verifies() {
        let e = proven_entry("alice", 5);
        assert!(verify(&bases(), &e));
    }

    #[test]
    fn test_tampered_response_rejected() {
        let mut e = proven_entry("alice", 5);
        e.lep.z3 += ScalarField::from(1u64);
        assert!(!verify(&bases(), &e));
    }

    #[test]
    fn test_tampered_gamma_rejected() {
        let mut e = proven_entry("alice", 5);
        e.lep.gamma = (e.lep.gamma + e.lep.gamma).into_affine();
        assert!(!verify(&bases(), &e));
    }

    #[test]
    fn test_incremental_commitment_matches_fresh() {
        let mut rng = rand::thread_rng();
        let bases = bases();

        let mut old = LedgerEntry::new("carol", 6, 8);
        bit::sample_nonces(&mut old, &mut rng);
        old.compute_r();
        commit(&bases, &mut old, None);
        prove(&bases, &mut old, None, &mut rng);

        let prev = IncrementalEntry {
            balance: old.balance,
            lec: old.lec,
            lbc: old.lbc.clone(),
            bit_gammas: vec![Affine::identity(); 8],
            lep_gamma: old.lep.gamma,
            r_bits: old.lbp.iter().map(|b| b.r).collect(),
            r: old.r,
            bit_b1: vec![ScalarField::zero(); 8],
            bit_b2: vec![ScalarField::zero(); 8],
            lep_b1: old.lep.b1,
            lep_b2: old.lep.b2,
            lep_b3: old.lep.b3,
        };

        let mut new = LedgerEntry::new("carol", 9, 8);
        bit::sample_nonces(&mut new, &mut rng);
        new.compute_r();
        commit(&bases, &mut new, Some(&prev));

        let expected = (bases.g * new.id_hash_prime
            + bases.h * ScalarField::from(new.balance)
            + bases.f * new.r)
            .into_affine();
        assert_eq!(new.lec, expected);

        prove(&bases, &mut new, Some(&prev), &mut rng);
        assert!(verify(&bases, &new));
    }
}
