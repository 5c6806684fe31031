//! Verifier pipeline and report.
//!
//! Workers share the proof stream behind one lock that also numbers the
//! entries, so the indices opener files refer to are exactly the stream
//! positions. Each worker pulls a batch of raw entry blocks, parses and
//! checks them outside the lock (entry proof, bit proofs, commitment
//! equivalency, plus the opener check for known entries), and folds the
//! commitments into its private partial ledger. The difference section, the
//! base re-derivation and the ledger-wide equivalency run single-threaded
//! after the workers join.
//!
//! Cryptographic failures never abort the run: every check executes and the
//! [`VerificationReport`] carries one verdict per category.

use std::collections::HashMap;
use std::io::BufRead;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;

use parking_lot::Mutex;

use crate::curve::{BaseSeeds, Bases};
use crate::error::EngineError;
use crate::generate::worker_count;
use crate::ledger::{KnownEntry, Ledger};
use crate::proofs::{bit, difference, entry};
use crate::wire::{self, TokenReader};

/// Tuning options for the verifier pipeline.
#[derive(Debug, Clone)]
pub struct VerifierOptions {
    /// Worker count; `0` uses the number of online CPUs.
    pub threads: usize,
    /// Entry blocks each worker pulls per lock acquisition.
    pub batch_size: usize,
    /// Check only the inclusion of known entries and skip the ledger-wide
    /// verdicts.
    pub inclusion_only: bool,
}

impl Default for VerifierOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            batch_size: 10,
            inclusion_only: false,
        }
    }
}

/// Outcome of a verification run, one verdict per category.
///
/// The ledger-wide verdicts are `None` in inclusion-only mode, where they
/// are never computed.
#[derive(Debug, Clone)]
pub struct VerificationReport {
    /// Number of entry blocks in the proof.
    pub entry_count: u64,
    /// Declared assets, from the prelude.
    pub total_assets: u128,
    /// Proof timestamp, from the prelude.
    pub proof_time: u64,
    /// Bit width, from the prelude.
    pub value_bits: usize,
    /// Number of openers supplied.
    pub known_total: u64,
    /// Openers whose recomputed commitment matched.
    pub known_valid: u64,
    /// Entries whose entry proof verified.
    pub entry_proofs_valid: u64,
    /// Entries whose bit proofs all verified.
    pub bit_proofs_valid: u64,
    /// Entries whose commitment equivalency held.
    pub equivalency_valid: u64,
    /// Whether the proof's bases match the seed derivation.
    pub bases_valid: Option<bool>,
    /// Whether every difference bit proof verified.
    pub difference_bits_valid: Option<bool>,
    /// Whether the ledger-wide commitment equivalency held.
    pub total_equivalency_valid: Option<bool>,
    /// Whether the run was inclusion-only.
    pub inclusion_only: bool,
}

impl VerificationReport {
    /// Every supplied opener matched.
    pub fn known_ok(&self) -> bool {
        self.known_valid == self.known_total
    }

    /// Every entry proof verified.
    pub fn entry_proofs_ok(&self) -> bool {
        self.entry_proofs_valid == self.entry_count
    }

    /// Every bit proof verified.
    pub fn bit_proofs_ok(&self) -> bool {
        self.bit_proofs_valid == self.entry_count
    }

    /// Every per-entry commitment equivalency held.
    pub fn equivalency_ok(&self) -> bool {
        self.equivalency_valid == self.entry_count
    }

    /// The overall verdict.
    pub fn is_valid(&self) -> bool {
        if self.inclusion_only {
            return self.known_ok();
        }
        self.known_ok()
            && self.entry_proofs_ok()
            && self.bit_proofs_ok()
            && self.equivalency_ok()
            && self.bases_valid.unwrap_or(false)
            && self.difference_bits_valid.unwrap_or(false)
            && self.total_equivalency_valid.unwrap_or(false)
    }
}

struct SharedSource<R> {
    tr: TokenReader<R>,
    entry_count: u64,
}

struct WorkerTally {
    ledger: Ledger,
    entry_proofs: u64,
    bit_proofs: u64,
    equivalency: u64,
    known_valid: u64,
}

/// Verifies a proof stream.
///
/// `seeds` are required for the bases verdict of a full run; in
/// inclusion-only mode they are ignored. `known` maps entry indices to
/// openers. Structural damage to the stream (truncation, a missing end
/// marker) is an error; cryptographic failures are reported in the returned
/// [`VerificationReport`].
pub fn verify_proof(
    opts: &VerifierOptions,
    seeds: Option<&BaseSeeds>,
    known: &HashMap<u64, KnownEntry>,
    proof: impl BufRead + Send,
) -> Result<VerificationReport, EngineError> {
    let mut tr = TokenReader::new(proof);
    let header = wire::read_header(&mut tr)?;
    let bases = header.bases;
    let value_bits = header.value_bits;

    let shared = Mutex::new(SharedSource { tr, entry_count: 0 });
    let known_seen = AtomicU64::new(0);
    let workers = worker_count(opts.threads);
    tracing::debug!(workers, "starting verify pool");

    let tallies = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                s.spawn(|| verify_worker(opts, &bases, value_bits, known, &shared, &known_seen))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<Vec<_>>()
    });

    let SharedSource {
        tr: mut tail,
        entry_count,
    } = shared.into_inner();

    let mut ledger = Ledger::new(value_bits);
    ledger.total_assets = header.assets;
    let mut report = VerificationReport {
        entry_count,
        total_assets: header.assets,
        proof_time: header.time,
        value_bits,
        known_total: known.len() as u64,
        known_valid: 0,
        entry_proofs_valid: 0,
        bit_proofs_valid: 0,
        equivalency_valid: 0,
        bases_valid: None,
        difference_bits_valid: None,
        total_equivalency_valid: None,
        inclusion_only: opts.inclusion_only,
    };
    for tally in tallies.iter() {
        ledger.merge(&tally.ledger);
        report.entry_proofs_valid += tally.entry_proofs;
        report.bit_proofs_valid += tally.bit_proofs;
        report.equivalency_valid += tally.equivalency;
        report.known_valid += tally.known_valid;
    }

    if opts.inclusion_only {
        return Ok(report);
    }

    tail.expect_separator()?;
    for i in 0..value_bits {
        wire::read_difference_block(&mut tail, &mut ledger, i)?;
    }
    wire::read_trailer(&mut tail)?;

    report.bases_valid = Some(seeds.is_some_and(|seeds| seeds.derive() == bases));
    report.difference_bits_valid = Some(difference::verify_all(&bases, &ledger));
    ledger.commit_difference(&bases);
    report.total_equivalency_valid = Some(ledger.verify_commitment_equivalency());

    Ok(report)
}

fn verify_worker<R: BufRead>(
    opts: &VerifierOptions,
    bases: &Bases,
    value_bits: usize,
    known: &HashMap<u64, KnownEntry>,
    shared: &Mutex<SharedSource<R>>,
    known_seen: &AtomicU64,
) -> WorkerTally {
    let mut tally = WorkerTally {
        ledger: Ledger::new(value_bits),
        entry_proofs: 0,
        bit_proofs: 0,
        equivalency: 0,
        known_valid: 0,
    };
    let mut raws = Vec::with_capacity(opts.batch_size);

    loop {
        if opts.inclusion_only && known_seen.load(Ordering::Relaxed) >= known.len() as u64 {
            break;
        }

        raws.clear();
        let mut stop = false;
        let base_index;
        {
            let mut src = shared.lock();
            for _ in 0..opts.batch_size {
                match wire::read_raw_entry_block(&mut src.tr, value_bits) {
                    Ok(Some(raw)) => raws.push(raw),
                    Ok(None) => {
                        stop = true;
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(%err, "malformed proof block, worker stops");
                        stop = true;
                        break;
                    }
                }
            }
            base_index = src.entry_count;
            src.entry_count += raws.len() as u64;
        }
        if raws.is_empty() {
            break;
        }

        for (offset, raw) in raws.iter().enumerate() {
            let index = base_index + offset as u64;
            let opener = known.get(&index);
            if opts.inclusion_only && opener.is_none() {
                continue;
            }

            let mut e = match wire::parse_entry_block(raw, value_bits) {
                Ok(e) => e,
                Err(err) => {
                    // counts stay behind entry_count, so the verdict turns
                    // INVALID without aborting the run
                    tracing::warn!(%err, index, "undecodable entry block");
                    continue;
                }
            };

            if entry::verify(bases, &e) {
                tally.entry_proofs += 1;
            }
            if bit::verify_all(bases, &e) {
                tally.bit_proofs += 1;
            }
            if e.verify_commitment_equivalency() {
                tally.equivalency += 1;
            }

            if let Some(opener) = opener {
                e.set_id(opener.id.as_str());
                e.set_balance(opener.balance);
                e.set_r(opener.r);
                if e.verify_known_values(bases) {
                    tally.known_valid += 1;
                }
                known_seen.fetch_add(1, Ordering::Relaxed);
            }

            if !opts.inclusion_only {
                tally.ledger.add_entry(&e);
            }
        }

        if stop {
            break;
        }
    }
    tally
}
