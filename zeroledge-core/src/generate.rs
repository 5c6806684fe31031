//! Generator pipeline.
//!
//! A pool of compute workers shares the ledger source, the proof sink and
//! the optional opener and incremental sinks, each behind its own lock. A
//! worker pulls a batch of raw `(id, balance)` tokens under the source lock,
//! releases it, runs the bit and entry processors over the batch, folds the
//! results into its private partial ledger, and then appends its buffered
//! output under the sink locks. Opener and incremental records carry the
//! entry index reserved under the proof lock at emission, which is the index
//! verifiers key openers by. After the source is exhausted the partial
//! ledgers merge and the difference section is produced single-threaded.
//!
//! No lock is held across cryptographic work, and each worker owns its RNG.

use std::collections::HashMap;
use std::io::{BufRead, Write};
use std::thread;

use parking_lot::Mutex;
use rand::SeedableRng as _;
use rand_chacha::ChaCha12Rng;

use crate::curve::Bases;
use crate::error::EngineError;
use crate::ledger::{IncrementalEntry, Ledger, LedgerEntry};
use crate::proofs::{bit, difference, entry};
use crate::wire::{self, ProofHeader, SECTION_SEPARATOR, TokenReader};

/// Tuning options for the generator pipeline.
#[derive(Debug, Clone)]
pub struct GeneratorOptions {
    /// Worker count; `0` uses the number of online CPUs.
    pub threads: usize,
    /// Entries each worker pulls per lock acquisition.
    pub batch_size: usize,
    /// Bit width balances and the difference are restricted to.
    pub value_bits: usize,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            threads: 0,
            batch_size: 10,
            value_bits: 24,
        }
    }
}

/// Incremental state imported from a previous run.
pub struct IncrementalData {
    /// Timestamp of the proof the state was exported from.
    pub time: u64,
    /// Saved per-entry state keyed by account identifier.
    pub entries: HashMap<String, IncrementalEntry>,
}

pub(crate) fn worker_count(threads: usize) -> usize {
    if threads > 0 {
        threads
    } else {
        thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
    }
}

struct ProofSink<'a> {
    out: &'a mut (dyn Write + Send),
    next_index: u64,
}

type SideSink<'a> = Mutex<&'a mut (dyn Write + Send)>;

/// Streams `ledger` into a complete solvency proof on `proof`.
///
/// The ledger source supplies the declared assets followed by repeated
/// `(identifier, balance)` token pairs. The optional sinks receive the
/// per-entry openers and the incremental state for the next run. A
/// malformed ledger record ends the worker that hit it; the proof emitted
/// up to that point stays on the sink, and the caller sees the truncation
/// through the verifier.
///
/// Returns the merged ledger aggregates with the difference section proven.
pub fn generate_proof(
    opts: &GeneratorOptions,
    bases: &Bases,
    incremental: Option<&IncrementalData>,
    proof_time: u64,
    ledger: impl BufRead + Send,
    mut proof: impl Write + Send,
    entries_out: Option<&mut (dyn Write + Send)>,
    incremental_out: Option<&mut (dyn Write + Send)>,
) -> Result<Ledger, EngineError> {
    if opts.value_bits == 0 || opts.value_bits > 63 {
        return Err(EngineError::malformed(
            "value bits",
            opts.value_bits.to_string(),
        ));
    }

    let mut source = TokenReader::new(ledger);
    let assets: u128 = {
        let token = source.expect("declared assets")?;
        token
            .parse()
            .map_err(|_| EngineError::malformed("declared assets", token))?
    };

    wire::write_header(
        &mut proof,
        &ProofHeader {
            assets,
            time: proof_time,
            value_bits: opts.value_bits,
            bases: *bases,
        },
    )?;

    let incr_sink: Option<SideSink<'_>> = match incremental_out {
        Some(out) => {
            writeln!(out, "{proof_time}")?;
            Some(Mutex::new(out))
        }
        None => None,
    };
    let entries_sink: Option<SideSink<'_>> = entries_out.map(Mutex::new);

    let source = Mutex::new(source);
    let sink = Mutex::new(ProofSink {
        out: &mut proof,
        next_index: 0,
    });
    let incr_map = incremental.map(|data| &data.entries);

    let workers = worker_count(opts.threads);
    tracing::debug!(workers, batch_size = opts.batch_size, "starting compute pool");

    let partials = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                s.spawn(|| {
                    compute_worker(
                        opts,
                        bases,
                        incr_map,
                        &source,
                        &sink,
                        entries_sink.as_ref(),
                        incr_sink.as_ref(),
                    )
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic)))
            .collect::<Vec<_>>()
    });

    let entry_count = {
        let sink = sink.into_inner();
        sink.next_index
    };
    tracing::debug!(entries = entry_count, "ledger exhausted");

    let mut final_ledger = Ledger::new(opts.value_bits);
    final_ledger.total_assets = assets;
    for partial in partials.iter() {
        final_ledger.merge(partial);
    }

    final_ledger.compute_sums();
    difference::commit_all(bases, &mut final_ledger);
    let mut rng = ChaCha12Rng::from_entropy();
    difference::prove_all(bases, &mut final_ledger, &mut rng);
    final_ledger.commit_difference(bases);

    writeln!(proof, "{SECTION_SEPARATOR}")?;
    let mut tail = String::new();
    for i in 0..opts.value_bits {
        wire::push_difference_block(&mut tail, &final_ledger, i);
    }
    proof.write_all(tail.as_bytes())?;
    wire::write_trailer(&mut proof)?;
    proof.flush()?;

    Ok(final_ledger)
}

fn process_entry<R: rand::Rng + rand::CryptoRng>(
    bases: &Bases,
    e: &mut LedgerEntry,
    prev: Option<&IncrementalEntry>,
    rng: &mut R,
) {
    bit::sample_nonces(e, rng);
    bit::commit_all(bases, e, prev);
    bit::prove_all(bases, e, prev, rng);
    e.compute_r();
    entry::commit(bases, e, prev);
    entry::prove(bases, e, prev, rng);
}

fn compute_worker<R: BufRead>(
    opts: &GeneratorOptions,
    bases: &Bases,
    incr_map: Option<&HashMap<String, IncrementalEntry>>,
    source: &Mutex<TokenReader<R>>,
    sink: &Mutex<ProofSink<'_>>,
    entries_sink: Option<&SideSink<'_>>,
    incr_sink: Option<&SideSink<'_>>,
) -> Ledger {
    let mut rng = ChaCha12Rng::from_entropy();
    let mut partial = Ledger::new(opts.value_bits);
    let mut raw: Vec<(String, String)> = Vec::with_capacity(opts.batch_size);

    loop {
        raw.clear();
        {
            let mut src = source.lock();
            for _ in 0..opts.batch_size {
                let Ok(Some(id)) = src.token() else { break };
                let Ok(Some(balance)) = src.token() else { break };
                raw.push((id, balance));
            }
        }
        if raw.is_empty() {
            break;
        }
        let short = raw.len() < opts.batch_size;

        let mut entries = Vec::with_capacity(raw.len());
        let mut proof_buf = String::new();
        let mut stop = short;
        for (id, balance_token) in raw.drain(..) {
            let balance = match balance_token.parse::<u64>() {
                Ok(b) if b >> opts.value_bits == 0 => b,
                _ => {
                    tracing::warn!(id = %id, balance = %balance_token, "malformed ledger record, worker stops");
                    stop = true;
                    break;
                }
            };
            let mut e = LedgerEntry::new(id, balance, opts.value_bits);
            let prev = incr_map.and_then(|m| m.get(&e.id));
            process_entry(bases, &mut e, prev, &mut rng);
            partial.add_entry(&e);
            wire::push_entry_block(&mut proof_buf, &e);
            entries.push(e);
        }

        let base_index = {
            let mut sink = sink.lock();
            if let Err(err) = sink.out.write_all(proof_buf.as_bytes()) {
                tracing::warn!(%err, "proof sink failed, worker stops");
                break;
            }
            let base = sink.next_index;
            sink.next_index += entries.len() as u64;
            base
        };

        if let Some(out) = entries_sink {
            let mut buf = String::new();
            for (offset, e) in entries.iter().enumerate() {
                wire::push_opener_line(&mut buf, base_index + offset as u64, e);
            }
            if let Err(err) = out.lock().write_all(buf.as_bytes()) {
                tracing::warn!(%err, "entries sink failed");
            }
        }

        if let Some(out) = incr_sink {
            let mut buf = String::new();
            for (offset, e) in entries.iter().enumerate() {
                wire::push_incremental_record(&mut buf, base_index + offset as u64, e);
            }
            if let Err(err) = out.lock().write_all(buf.as_bytes()) {
                tracing::warn!(%err, "incremental sink failed");
            }
        }

        if stop {
            break;
        }
    }
    partial
}

/// Imports incremental state exported by a previous run.
///
/// The leading token is the previous proof's timestamp, which the new proof
/// inherits. The remaining records are ingested by a worker pool that copies
/// raw tokens under the source lock and parses them outside it, inserting
/// into the shared store under the store lock. A malformed record ends the
/// worker that hit it.
pub fn import_incremental(
    opts: &GeneratorOptions,
    source: impl BufRead + Send,
) -> Result<IncrementalData, EngineError> {
    let mut tr = TokenReader::new(source);
    let token = tr.expect("incremental timestamp")?;
    let time: u64 = token
        .parse()
        .map_err(|_| EngineError::malformed("incremental timestamp", token))?;

    let source = Mutex::new(tr);
    let store = Mutex::new(HashMap::new());
    let workers = worker_count(opts.threads);
    tracing::debug!(workers, "starting ingest pool");

    thread::scope(|s| {
        for _ in 0..workers {
            s.spawn(|| ingest_worker(opts, &source, &store));
        }
    });

    let entries = store.into_inner();
    tracing::debug!(entries = entries.len(), "incremental state imported");
    Ok(IncrementalData { time, entries })
}

fn ingest_worker<R: BufRead>(
    opts: &GeneratorOptions,
    source: &Mutex<TokenReader<R>>,
    store: &Mutex<HashMap<String, IncrementalEntry>>,
) {
    let mut raw_batch = Vec::with_capacity(opts.batch_size);
    loop {
        raw_batch.clear();
        let mut stop = false;
        {
            let mut src = source.lock();
            for _ in 0..opts.batch_size {
                match wire::read_raw_incremental_record(&mut src, opts.value_bits) {
                    Ok(Some(record)) => raw_batch.push(record),
                    Ok(None) => {
                        stop = true;
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(%err, "malformed incremental record, worker stops");
                        stop = true;
                        break;
                    }
                }
            }
        }
        if raw_batch.is_empty() {
            break;
        }

        let mut parsed = Vec::with_capacity(raw_batch.len());
        for record in raw_batch.drain(..) {
            match wire::parse_incremental_record(&record) {
                Ok(pair) => parsed.push(pair),
                Err(err) => {
                    tracing::warn!(%err, id = %record.id, "undecodable incremental record, worker stops");
                    stop = true;
                    break;
                }
            }
        }

        {
            let mut store = store.lock();
            for (id, entry) in parsed {
                store.insert(id, entry);
            }
        }

        if stop {
            break;
        }
    }
}
