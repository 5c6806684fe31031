//! Ledger data model: per-entry state, aggregate state, and the proof
//! records the processors populate.
//!
//! A [`LedgerEntry`] is created from `(id, balance)`; the bit processor
//! fills its nonces, bit commitments and bit proofs, [`LedgerEntry::compute_r`]
//! folds the bit nonces into the aggregate nonce, and the entry processor
//! commits and proves the entry as a whole. Entries are then folded into a
//! [`Ledger`], whose aggregates are commutative sums, so partial ledgers
//! built by different workers merge in any order.
//!
//! Proof records carry their Σ-protocol nonces until the incremental state
//! is exported, so they zeroize on drop and deliberately do not implement
//! `Debug`, following the handling of secret session state elsewhere.

use ark_ec::AffineRepr;
use ark_ff::{AdditiveGroup, Field, One, Zero};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::curve::{Affine, Bases, Challenge, Projective, ScalarField, hash_to_scalar};

/// `2^value_bits - 1`, the factor binding an entry commitment to the sum of
/// its bit commitments.
pub(crate) fn amplifier(value_bits: usize) -> ScalarField {
    ScalarField::from(2u64).pow([value_bits as u64]) - ScalarField::one()
}

/// `sum_i 2^i * points[i]`, evaluated by Horner doubling.
pub(crate) fn bit_weighted_sum(points: &[Affine]) -> Projective {
    let mut acc = Projective::zero();
    for p in points.iter().rev() {
        acc.double_in_place();
        acc += *p;
    }
    acc
}

/// Proof data for a single entry commitment.
///
/// `b1..b3` are the Σ-protocol nonces; `gamma`, the challenge and the
/// responses are published.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EntryProof {
    /// Nonce for the identifier component.
    pub b1: ScalarField,
    /// Nonce for the value component.
    pub b2: ScalarField,
    /// Nonce for the nonce component.
    pub b3: ScalarField,
    /// Commitment to the nonces.
    #[zeroize(skip)]
    pub gamma: Affine,
    /// Fiat-Shamir challenge.
    pub c: Challenge,
    /// Response for the identifier component.
    pub z1: ScalarField,
    /// Response for the value component.
    pub z2: ScalarField,
    /// Response for the nonce component.
    pub z3: ScalarField,
}

impl Default for EntryProof {
    fn default() -> Self {
        Self {
            b1: ScalarField::zero(),
            b2: ScalarField::zero(),
            b3: ScalarField::zero(),
            gamma: Affine::identity(),
            c: Challenge::default(),
            z1: ScalarField::zero(),
            z2: ScalarField::zero(),
            z3: ScalarField::zero(),
        }
    }
}

/// Proof data for a single bit commitment, including that bit's nonce.
///
/// The same record serves the difference bits, where the identifier and
/// nonce roles are played by the negated ledger sums. Branch 1 attests the
/// bit is 0, branch 2 that it is 1; one branch is real, the other simulated,
/// and the challenge shares satisfy `c1 ^ c2 = c`.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct BitProof {
    /// The bit's nonce.
    pub r: ScalarField,
    /// Branch 1 nonce (identifier component).
    pub b1: ScalarField,
    /// Branch 1 nonce (nonce component).
    pub b2: ScalarField,
    /// Branch 2 nonce (identifier component).
    pub b3: ScalarField,
    /// Branch 2 nonce (nonce component).
    pub b4: ScalarField,
    /// Branch 1 nonce commitment.
    #[zeroize(skip)]
    pub gamma1: Affine,
    /// Branch 2 nonce commitment.
    #[zeroize(skip)]
    pub gamma2: Affine,
    /// Fiat-Shamir challenge.
    pub c: Challenge,
    /// Branch 1 challenge share; the one that goes on the wire.
    pub c1: Challenge,
    /// Branch 2 challenge share.
    pub c2: Challenge,
    /// Branch 1 responses.
    pub z1: ScalarField,
    /// Branch 1 responses.
    pub z2: ScalarField,
    /// Branch 2 responses.
    pub z3: ScalarField,
    /// Branch 2 responses.
    pub z4: ScalarField,
}

impl Default for BitProof {
    fn default() -> Self {
        Self {
            r: ScalarField::zero(),
            b1: ScalarField::zero(),
            b2: ScalarField::zero(),
            b3: ScalarField::zero(),
            b4: ScalarField::zero(),
            gamma1: Affine::identity(),
            gamma2: Affine::identity(),
            c: Challenge::default(),
            c1: Challenge::default(),
            c2: Challenge::default(),
            z1: ScalarField::zero(),
            z2: ScalarField::zero(),
            z3: ScalarField::zero(),
            z4: ScalarField::zero(),
        }
    }
}

/// A single ledger entry with its commitments and proofs.
#[derive(Clone)]
pub struct LedgerEntry {
    /// Opaque customer identifier.
    pub id: String,
    /// `H(id)` reduced into the scalar field.
    pub id_hash: ScalarField,
    /// `(2^v - 1) * id_hash`, the amplified identifier scalar.
    pub id_hash_prime: ScalarField,
    /// Account balance, restricted to `value_bits` bits.
    pub balance: u64,
    /// Aggregate nonce `sum_i 2^i * r_i`.
    pub r: ScalarField,
    /// Commitment to the whole entry.
    pub lec: Affine,
    /// Entry proof.
    pub lep: EntryProof,
    /// Per-bit commitments.
    pub lbc: Vec<Affine>,
    /// Per-bit proofs.
    pub lbp: Vec<BitProof>,
    value_bits: usize,
}

impl LedgerEntry {
    /// Creates an entry from an identifier and a balance.
    pub fn new(id: impl Into<String>, balance: u64, value_bits: usize) -> Self {
        let mut e = Self::unbound(value_bits);
        e.set_id(id);
        e.set_balance(balance);
        e
    }

    /// Creates an entry shell with no identifier or balance, as the verifier
    /// sees one before any opener is applied.
    pub fn unbound(value_bits: usize) -> Self {
        Self {
            id: String::new(),
            id_hash: ScalarField::zero(),
            id_hash_prime: ScalarField::zero(),
            balance: 0,
            r: ScalarField::zero(),
            lec: Affine::identity(),
            lep: EntryProof::default(),
            lbc: vec![Affine::identity(); value_bits],
            lbp: vec![BitProof::default(); value_bits],
            value_bits,
        }
    }

    /// The bit width this entry's balance is restricted to.
    pub fn value_bits(&self) -> usize {
        self.value_bits
    }

    /// Sets the identifier and derives the identifier scalars from it.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
        self.id_hash = hash_to_scalar(self.id.as_bytes());
        self.id_hash_prime = amplifier(self.value_bits) * self.id_hash;
    }

    /// Sets the balance.
    pub fn set_balance(&mut self, balance: u64) {
        self.balance = balance;
    }

    /// Sets the aggregate nonce directly, as the verifier does from an
    /// opener.
    pub fn set_r(&mut self, r: ScalarField) {
        self.r = r;
    }

    /// Bit `i` of the balance.
    pub fn bit(&self, i: usize) -> bool {
        (self.balance >> i) & 1 == 1
    }

    /// Folds the per-bit nonces into the aggregate nonce
    /// `r = sum_i 2^i * r_i`.
    pub fn compute_r(&mut self) {
        let mut acc = ScalarField::zero();
        for bit in self.lbp.iter().rev() {
            acc = acc.double() + bit.r;
        }
        self.r = acc;
    }

    /// Checks that the bit-weighted product of the bit commitments equals
    /// the entry commitment. This binds the entry to its bits and witnesses
    /// that the balance is non-negative within `value_bits` bits.
    pub fn verify_commitment_equivalency(&self) -> bool {
        bit_weighted_sum(&self.lbc) == self.lec.into_group()
    }

    /// Recomputes the entry commitment from known `(id, balance, r)` and
    /// compares it with the committed one. This is the inclusion check a
    /// customer runs with their opener.
    pub fn verify_known_values(&self, bases: &Bases) -> bool {
        let rhs = bases.g * self.id_hash_prime
            + bases.h * ScalarField::from(self.balance)
            + bases.f * self.r;
        rhs == self.lec.into_group()
    }
}

/// Aggregate state of a ledger, or of one worker's part of one.
#[derive(Clone)]
pub struct Ledger {
    /// Sum of identifier hashes.
    pub id_hash_sum: ScalarField,
    /// Sum of amplified identifier hashes.
    pub id_hash_prime_sum: ScalarField,
    /// Sum of aggregate entry nonces.
    pub r_sum: ScalarField,
    /// Per-bit-position sums of the bit nonces.
    pub r_bit_sums: Vec<ScalarField>,
    /// Sum of entry commitments.
    pub total_commitment: Projective,
    /// Publicly declared assets.
    pub total_assets: u128,
    /// Sum of balances.
    pub total_liabilities: u128,
    /// Frozen `total_assets - total_liabilities`.
    pub difference: i128,
    /// `total_assets * h - total_commitment`.
    pub difference_commitment: Projective,
    /// Difference bit commitments.
    pub dbc: Vec<Affine>,
    /// Difference bit proofs.
    pub dbp: Vec<BitProof>,
    value_bits: usize,
}

impl Ledger {
    /// Creates an empty ledger for the given bit width.
    pub fn new(value_bits: usize) -> Self {
        Self {
            id_hash_sum: ScalarField::zero(),
            id_hash_prime_sum: ScalarField::zero(),
            r_sum: ScalarField::zero(),
            r_bit_sums: vec![ScalarField::zero(); value_bits],
            total_commitment: Projective::zero(),
            total_assets: 0,
            total_liabilities: 0,
            difference: 0,
            difference_commitment: Projective::zero(),
            dbc: vec![Affine::identity(); value_bits],
            dbp: vec![BitProof::default(); value_bits],
            value_bits,
        }
    }

    /// The bit width balances and the difference are restricted to.
    pub fn value_bits(&self) -> usize {
        self.value_bits
    }

    /// Folds one entry into the aggregates.
    pub fn add_entry(&mut self, e: &LedgerEntry) {
        self.id_hash_sum += e.id_hash;
        self.id_hash_prime_sum += e.id_hash_prime;
        self.total_liabilities += u128::from(e.balance);
        self.r_sum += e.r;
        for (sum, bit) in self.r_bit_sums.iter_mut().zip(e.lbp.iter()) {
            *sum += bit.r;
        }
        self.total_commitment += e.lec;
    }

    /// Folds another (partial) ledger into this one.
    pub fn merge(&mut self, other: &Ledger) {
        self.id_hash_sum += other.id_hash_sum;
        self.id_hash_prime_sum += other.id_hash_prime_sum;
        self.total_liabilities += other.total_liabilities;
        self.r_sum += other.r_sum;
        for (sum, o) in self.r_bit_sums.iter_mut().zip(other.r_bit_sums.iter()) {
            *sum += o;
        }
        self.total_commitment += other.total_commitment;
    }

    /// Freezes the difference once all entries are in.
    pub fn compute_sums(&mut self) {
        self.difference = self.total_assets as i128 - self.total_liabilities as i128;
    }

    /// Bit `i` of the frozen difference, two's complement.
    pub fn difference_bit(&self, i: usize) -> bool {
        ((self.difference as u128) >> i) & 1 == 1
    }

    /// Commits to the difference: `total_assets * h - total_commitment`.
    pub fn commit_difference(&mut self, bases: &Bases) {
        self.difference_commitment =
            bases.h * ScalarField::from(self.total_assets) - self.total_commitment;
    }

    /// Checks that the bit-weighted product of the difference bit
    /// commitments equals the difference commitment. Together with the bit
    /// proofs this bounds the difference to `[0, 2^value_bits)` and hence
    /// proves solvency.
    pub fn verify_commitment_equivalency(&self) -> bool {
        bit_weighted_sum(&self.dbc) == self.difference_commitment
    }
}

/// Saved state of one entry from a previous proof run, keyed by identifier
/// in the incremental store.
///
/// Carries the previous commitments together with the Σ-protocol nonces of
/// the real branches, so a new proof can rescale them by one fresh scalar
/// instead of sampling and committing afresh.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct IncrementalEntry {
    /// Previous balance.
    pub balance: u64,
    /// Previous entry commitment.
    #[zeroize(skip)]
    pub lec: Affine,
    /// Previous bit commitments.
    #[zeroize(skip)]
    pub lbc: Vec<Affine>,
    /// Previous real-branch nonce commitments, one per bit.
    #[zeroize(skip)]
    pub bit_gammas: Vec<Affine>,
    /// Previous entry-proof nonce commitment.
    #[zeroize(skip)]
    pub lep_gamma: Affine,
    /// Previous bit nonces.
    pub r_bits: Vec<ScalarField>,
    /// Previous aggregate nonce.
    pub r: ScalarField,
    /// Previous real-branch nonces, first component.
    pub bit_b1: Vec<ScalarField>,
    /// Previous real-branch nonces, second component.
    pub bit_b2: Vec<ScalarField>,
    /// Previous entry-proof nonce (identifier component).
    pub lep_b1: ScalarField,
    /// Previous entry-proof nonce (value component).
    pub lep_b2: ScalarField,
    /// Previous entry-proof nonce (nonce component).
    pub lep_b3: ScalarField,
}

impl IncrementalEntry {
    /// Bit `i` of the previous balance.
    pub fn bit(&self, i: usize) -> bool {
        (self.balance >> i) & 1 == 1
    }
}

/// An opener for one ledger entry: everything a verifier needs to recompute
/// and match its commitment.
#[derive(Debug, Clone)]
pub struct KnownEntry {
    /// Position of the entry in the proof stream.
    pub index: u64,
    /// Account identifier.
    pub id: String,
    /// Account balance.
    pub balance: u64,
    /// Aggregate nonce.
    pub r: ScalarField,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::UniformRand;

    #[test]
    fn test_amplified_identifier() {
        let e = LedgerEntry::new("alice", 5, 8);
        assert_eq!(e.id_hash, hash_to_scalar(b"alice"));
        assert_eq!(e.id_hash_prime, ScalarField::from(255u64) * e.id_hash);
    }

    #[test]
    fn test_compute_r_matches_direct_sum() {
        let mut rng = rand::thread_rng();
        let mut e = LedgerEntry::new("bob", 9, 8);
        for bit in e.lbp.iter_mut() {
            bit.r = ScalarField::rand(&mut rng);
        }
        e.compute_r();

        let mut expected = ScalarField::zero();
        let mut weight = ScalarField::one();
        for bit in e.lbp.iter() {
            expected += weight * bit.r;
            weight.double_in_place();
        }
        assert_eq!(e.r, expected);
    }

    #[test]
    fn test_difference_bits_wrap_when_insolvent() {
        let mut l = Ledger::new(8);
        l.total_assets = 10;
        l.total_liabilities = 11;
        l.compute_sums();
        assert_eq!(l.difference, -1);
        // two's complement: every low bit is set
        for i in 0..8 {
            assert!(l.difference_bit(i));
        }
    }

    #[test]
    fn test_bit_weighted_sum() {
        let mut rng = rand::thread_rng();
        let p = Affine::rand(&mut rng);
        let q = Affine::rand(&mut rng);
        let sum = bit_weighted_sum(&[p, q]);
        assert_eq!(sum, p + q + q);
    }
}
