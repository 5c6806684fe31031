//! OR proofs over the bits of the aggregated difference.
//!
//! Structurally these are the bit proofs again, applied once per ledger
//! after every entry has been folded in: the identifier role is played by
//! `-id_hash_sum` and the nonce role by `-r_bit_sums[i]`, with the signs
//! absorbed into the real branch, so the response is `z = b - c*s` where the
//! bit proofs use `b + c*s`. Proving each difference bit commitment opens to
//! a bit bounds the difference to `[0, 2^value_bits)` and, with the
//! commitment equivalency, yields the solvency claim.

use ark_ec::CurveGroup;
use ark_ff::{One, UniformRand};
use rand::{CryptoRng, Rng};

use crate::curve::{Bases, Challenge, ScalarField, challenge_over_points};
use crate::ledger::Ledger;

/// Commits to every difference bit:
/// `dbc_i = -id_hash_sum*g - r_bit_sums[i]*f + bit*h`.
pub fn commit_all(bases: &Bases, l: &mut Ledger) {
    let gx = -(bases.g * l.id_hash_sum);
    for i in 0..l.value_bits() {
        let mut dbc = gx - bases.f * l.r_bit_sums[i];
        if l.difference_bit(i) {
            dbc += bases.h;
        }
        l.dbc[i] = dbc.into_affine();
    }
}

/// First move for difference bit `i`.
pub fn begin<R: Rng + CryptoRng>(bases: &Bases, l: &mut Ledger, i: usize, rng: &mut R) {
    let dbc = l.dbc[i];
    let b = l.difference_bit(i);
    let p = &mut l.dbp[i];
    if !b {
        p.b1 = ScalarField::rand(rng);
        p.b2 = ScalarField::rand(rng);
        p.gamma1 = (bases.g * p.b1 + bases.f * p.b2).into_affine();

        p.z3 = ScalarField::rand(rng);
        p.z4 = ScalarField::rand(rng);
        p.c2 = Challenge::rand(rng);
        let c2 = p.c2.to_scalar();
        p.gamma2 = (bases.g * p.z3 + bases.h * (ScalarField::one() + c2) + bases.f * p.z4
            - dbc * c2)
            .into_affine();
    } else {
        p.b3 = ScalarField::rand(rng);
        p.b4 = ScalarField::rand(rng);
        p.gamma2 = (bases.g * p.b3 + bases.h + bases.f * p.b4).into_affine();

        p.z1 = ScalarField::rand(rng);
        p.z2 = ScalarField::rand(rng);
        p.c1 = Challenge::rand(rng);
        let c1 = p.c1.to_scalar();
        p.gamma1 = (bases.g * p.z1 + bases.f * p.z2 - dbc * c1).into_affine();
    }
}

/// Second move: the challenge covers `(g, h, f, dbc_i, gamma1, gamma2)`.
pub fn challenge(bases: &Bases, l: &mut Ledger, i: usize) {
    l.dbp[i].c = challenge_over_points(&[
        bases.g,
        bases.h,
        bases.f,
        l.dbc[i],
        l.dbp[i].gamma1,
        l.dbp[i].gamma2,
    ]);
}

/// Third move: responses `z = b - c*s` for the real branch.
pub fn complete(l: &mut Ledger, i: usize) {
    let b = l.difference_bit(i);
    let s = l.id_hash_sum;
    let r_sum = l.r_bit_sums[i];
    let p = &mut l.dbp[i];
    if !b {
        p.c1 = p.c.xor(&p.c2);
        let c1 = p.c1.to_scalar();
        p.z1 = p.b1 - c1 * s;
        p.z2 = p.b2 - c1 * r_sum;
    } else {
        p.c2 = p.c.xor(&p.c1);
        let c2 = p.c2.to_scalar();
        p.z3 = p.b3 - c2 * s;
        p.z4 = p.b4 - c2 * r_sum;
    }
}

/// Runs the three proof moves for every difference bit.
pub fn prove_all<R: Rng + CryptoRng>(bases: &Bases, l: &mut Ledger, rng: &mut R) {
    for i in 0..l.value_bits() {
        begin(bases, l, i, rng);
        challenge(bases, l, i);
        complete(l, i);
    }
}

/// Verifies both branches of difference bit `i` against the recomputed
/// challenge.
pub fn verify(bases: &Bases, l: &Ledger, i: usize) -> bool {
    let p = &l.dbp[i];
    let c = challenge_over_points(&[bases.g, bases.h, bases.f, l.dbc[i], p.gamma1, p.gamma2]);
    let c2 = c.xor(&p.c1).to_scalar();

    let lhs1 = bases.g * p.z1 + bases.f * p.z2;
    let rhs1 = l.dbc[i] * p.c1.to_scalar() + p.gamma1;

    let lhs2 = bases.g * p.z3 + bases.h * (ScalarField::one() + c2) + bases.f * p.z4;
    let rhs2 = l.dbc[i] * c2 + p.gamma2;

    lhs1 == rhs1 && lhs2 == rhs2
}

/// Verifies every difference bit.
pub fn verify_all(bases: &Bases, l: &Ledger) -> bool {
    (0..l.value_bits()).all(|i| verify(bases, l, i))
}
