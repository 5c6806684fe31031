//! OR proof that a bit commitment opens to 0 or 1.
//!
//! Each bit carries two parallel branches: branch 1 attests the committed
//! value is 0, branch 2 that it is 1. The branch matching the real bit is
//! proven honestly; the other is simulated backwards from random responses
//! and a presampled challenge share. The shares bind to the transcript
//! challenge through `c1 ^ c2 = c`, so exactly one branch could have been
//! simulated and nothing reveals which.
//!
//! With saved state from a previous run whose bit value matches, the real
//! branch rescales the previous nonces by one fresh scalar instead of
//! committing afresh; the commitment itself shifts by the nonce and bit
//! deltas. A missing or bit-flipped record falls back to the fresh path.

use ark_ec::{AffineRepr, CurveGroup};
use ark_ff::{One, UniformRand};
use rand::{CryptoRng, Rng};

use crate::curve::{Bases, Challenge, ScalarField, challenge_over_points};
use crate::ledger::{IncrementalEntry, LedgerEntry};

/// Samples a fresh nonce for every bit of the entry.
pub fn sample_nonces<R: Rng + CryptoRng>(e: &mut LedgerEntry, rng: &mut R) {
    for bit in e.lbp.iter_mut() {
        bit.r = ScalarField::rand(rng);
    }
}

/// Commits to bit `i`: `lbc_i = x*g + r_i*f + bit*h`.
pub fn commit(bases: &Bases, e: &mut LedgerEntry, i: usize, prev: Option<&IncrementalEntry>) {
    let b = e.bit(i);
    match prev {
        Some(prev) => {
            let mut lbc = bases.f * (e.lbp[i].r - prev.r_bits[i]) + prev.lbc[i];
            match (b, prev.bit(i)) {
                (true, false) => lbc += bases.h,
                (false, true) => lbc -= bases.h,
                _ => {}
            }
            e.lbc[i] = lbc.into_affine();
        }
        None => {
            let mut lbc = bases.g * e.id_hash + bases.f * e.lbp[i].r;
            if b {
                lbc += bases.h;
            }
            e.lbc[i] = lbc.into_affine();
        }
    }
}

/// Commits to every bit, sharing the identifier term across the fresh path.
pub fn commit_all(bases: &Bases, e: &mut LedgerEntry, prev: Option<&IncrementalEntry>) {
    if prev.is_some() {
        for i in 0..e.value_bits() {
            commit(bases, e, i, prev);
        }
        return;
    }
    let gx = bases.g * e.id_hash;
    for i in 0..e.value_bits() {
        let mut lbc = gx + bases.f * e.lbp[i].r;
        if e.bit(i) {
            lbc += bases.h;
        }
        e.lbc[i] = lbc.into_affine();
    }
}

/// First move: honest nonce commitments for the real branch, a simulated
/// transcript for the other.
pub fn begin<R: Rng + CryptoRng>(
    bases: &Bases,
    e: &mut LedgerEntry,
    i: usize,
    prev: Option<&IncrementalEntry>,
    rng: &mut R,
) {
    let lbc = e.lbc[i];
    if !e.bit(i) {
        // real branch 1
        match prev.filter(|p| !p.bit(i)) {
            Some(p) => {
                let b_incr = ScalarField::rand(rng);
                e.lbp[i].b1 = p.bit_b1[i] * b_incr;
                e.lbp[i].b2 = p.bit_b2[i] * b_incr;
                e.lbp[i].gamma1 = (p.bit_gammas[i] * b_incr).into_affine();
            }
            None => {
                e.lbp[i].b1 = ScalarField::rand(rng);
                e.lbp[i].b2 = ScalarField::rand(rng);
                e.lbp[i].gamma1 = (bases.g * e.lbp[i].b1 + bases.f * e.lbp[i].b2).into_affine();
            }
        }
        // simulated branch 2
        e.lbp[i].z3 = ScalarField::rand(rng);
        e.lbp[i].z4 = ScalarField::rand(rng);
        e.lbp[i].c2 = Challenge::rand(rng);
        let c2 = e.lbp[i].c2.to_scalar();
        e.lbp[i].gamma2 = (bases.g * e.lbp[i].z3
            + bases.h * (ScalarField::one() + c2)
            + bases.f * e.lbp[i].z4
            - lbc * c2)
            .into_affine();
    } else {
        // real branch 2
        match prev.filter(|p| p.bit(i)) {
            Some(p) => {
                let b_incr = ScalarField::rand(rng);
                e.lbp[i].b3 = p.bit_b1[i] * b_incr;
                e.lbp[i].b4 = p.bit_b2[i] * b_incr;
                e.lbp[i].gamma2 =
                    ((p.bit_gammas[i].into_group() - bases.h) * b_incr + bases.h).into_affine();
            }
            None => {
                e.lbp[i].b3 = ScalarField::rand(rng);
                e.lbp[i].b4 = ScalarField::rand(rng);
                e.lbp[i].gamma2 =
                    (bases.g * e.lbp[i].b3 + bases.h + bases.f * e.lbp[i].b4).into_affine();
            }
        }
        // simulated branch 1
        e.lbp[i].z1 = ScalarField::rand(rng);
        e.lbp[i].z2 = ScalarField::rand(rng);
        e.lbp[i].c1 = Challenge::rand(rng);
        let c1 = e.lbp[i].c1.to_scalar();
        e.lbp[i].gamma1 =
            (bases.g * e.lbp[i].z1 + bases.f * e.lbp[i].z2 - lbc * c1).into_affine();
    }
}

/// Second move: the challenge covers `(g, h, f, lbc_i, gamma1, gamma2)`.
pub fn challenge(bases: &Bases, e: &mut LedgerEntry, i: usize) {
    e.lbp[i].c = challenge_over_points(&[
        bases.g,
        bases.h,
        bases.f,
        e.lbc[i],
        e.lbp[i].gamma1,
        e.lbp[i].gamma2,
    ]);
}

/// Third move: fold the transcript challenge into the real branch.
pub fn complete(e: &mut LedgerEntry, i: usize) {
    let b = e.bit(i);
    let x = e.id_hash;
    let p = &mut e.lbp[i];
    if !b {
        p.c1 = p.c.xor(&p.c2);
        let c1 = p.c1.to_scalar();
        p.z1 = p.b1 + c1 * x;
        p.z2 = p.b2 + c1 * p.r;
    } else {
        p.c2 = p.c.xor(&p.c1);
        let c2 = p.c2.to_scalar();
        p.z3 = p.b3 + c2 * x;
        p.z4 = p.b4 + c2 * p.r;
    }
}

/// Runs the three proof moves for bit `i`.
pub fn prove<R: Rng + CryptoRng>(
    bases: &Bases,
    e: &mut LedgerEntry,
    i: usize,
    prev: Option<&IncrementalEntry>,
    rng: &mut R,
) {
    begin(bases, e, i, prev, rng);
    challenge(bases, e, i);
    complete(e, i);
}

/// Runs the proof for every bit.
pub fn prove_all<R: Rng + CryptoRng>(
    bases: &Bases,
    e: &mut LedgerEntry,
    prev: Option<&IncrementalEntry>,
    rng: &mut R,
) {
    for i in 0..e.value_bits() {
        prove(bases, e, i, prev, rng);
    }
}

/// Verifies both branches of bit `i` against the recomputed challenge; the
/// second challenge share is re-derived as `c ^ c1`, which also enforces the
/// XOR relation.
pub fn verify(bases: &Bases, e: &LedgerEntry, i: usize) -> bool {
    let p = &e.lbp[i];
    let c = challenge_over_points(&[bases.g, bases.h, bases.f, e.lbc[i], p.gamma1, p.gamma2]);
    let c2 = c.xor(&p.c1).to_scalar();

    let lhs1 = bases.g * p.z1 + bases.f * p.z2;
    let rhs1 = e.lbc[i] * p.c1.to_scalar() + p.gamma1;

    let lhs2 = bases.g * p.z3 + bases.h * (ScalarField::one() + c2) + bases.f * p.z4;
    let rhs2 = e.lbc[i] * c2 + p.gamma2;

    lhs1 == rhs1 && lhs2 == rhs2
}

/// Verifies every bit of the entry.
pub fn verify_all(bases: &Bases, e: &LedgerEntry) -> bool {
    (0..e.value_bits()).all(|i| verify(bases, e, i))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ec::AffineRepr;

    use crate::curve::{Affine, BaseSeeds};

    fn bases() -> Bases {
        BaseSeeds::parse("1 2 3").unwrap().derive()
    }

    fn proven_entry(id: &str, balance: u64) -> LedgerEntry {
        let mut rng = rand::thread_rng();
        let bases = bases();
        let mut e = LedgerEntry::new(id, balance, 8);
        sample_nonces(&mut e, &mut rng);
        commit_all(&bases, &mut e, None);
        prove_all(&bases, &mut e, None, &mut rng);
        e
    }

    #[test]
    fn test_honest_bits_verify() {
        // covers both the all-zero tie-break and a mixed bit pattern
        for balance in [0u64, 5, 255] {
            let e = proven_entry("alice", balance);
            assert!(verify_all(&bases(), &e), "balance {balance}");
        }
    }

    #[test]
    fn test_entry_equivalency_holds() {
        let mut e = proven_entry("bob", 37);
        e.compute_r();
        crate::proofs::entry::commit(&bases(), &mut e, None);
        assert!(e.verify_commitment_equivalency());
    }

    #[test]
    fn test_tampered_share_rejected() {
        let mut e = proven_entry("alice", 5);
        let mut bytes = *e.lbp[3].c1.as_bytes();
        bytes[31] ^= 1;
        e.lbp[3].c1 = Challenge::from_bytes(bytes);
        assert!(!verify(&bases(), &e, 3));
    }

    #[test]
    fn test_tampered_commitment_rejected() {
        let mut e = proven_entry("alice", 5);
        e.lbc[0] = (e.lbc[0] + e.lbc[0]).into_affine();
        assert!(!verify(&bases(), &e, 0));
    }

    fn saved_state(e: &LedgerEntry) -> IncrementalEntry {
        IncrementalEntry {
            balance: e.balance,
            lec: e.lec,
            lbc: e.lbc.clone(),
            bit_gammas: e
                .lbp
                .iter()
                .enumerate()
                .map(|(i, p)| if e.bit(i) { p.gamma2 } else { p.gamma1 })
                .collect(),
            lep_gamma: e.lep.gamma,
            r_bits: e.lbp.iter().map(|p| p.r).collect(),
            r: e.r,
            bit_b1: e
                .lbp
                .iter()
                .enumerate()
                .map(|(i, p)| if e.bit(i) { p.b3 } else { p.b1 })
                .collect(),
            bit_b2: e
                .lbp
                .iter()
                .enumerate()
                .map(|(i, p)| if e.bit(i) { p.b4 } else { p.b2 })
                .collect(),
            lep_b1: e.lep.b1,
            lep_b2: e.lep.b2,
            lep_b3: e.lep.b3,
        }
    }

    #[test]
    fn test_incremental_proofs_verify() {
        let mut rng = rand::thread_rng();
        let bases = bases();

        let mut old = proven_entry("carol", 0b0110);
        old.compute_r();
        crate::proofs::entry::commit(&bases, &mut old, None);
        crate::proofs::entry::prove(&bases, &mut old, None, &mut rng);
        let prev = saved_state(&old);

        // 0b0011 keeps bits 1 and 3 and flips bits 0 and 2, so both the
        // rescaled and the fresh fallback paths run.
        let mut new = LedgerEntry::new("carol", 0b0011, 8);
        sample_nonces(&mut new, &mut rng);
        commit_all(&bases, &mut new, Some(&prev));
        prove_all(&bases, &mut new, Some(&prev), &mut rng);
        assert!(verify_all(&bases, &new));

        // the shifted commitments still open to the new values
        let identity = Affine::identity();
        for i in 0..8 {
            let mut expected = bases.g * new.id_hash + bases.f * new.lbp[i].r;
            if new.bit(i) {
                expected += bases.h;
            }
            assert_eq!(new.lbc[i], expected.into_affine(), "bit {i}");
            assert_ne!(new.lbc[i], identity);
        }
    }
}
