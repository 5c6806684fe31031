//! Textual stream formats: the proof document, the entries opener file and
//! the incremental state file.
//!
//! All streams are whitespace-separated token sequences; the proof document
//! additionally groups its sections with separator lines. Workers read raw
//! token batches while holding the stream lock and parse them into curve
//! points and scalars only after releasing it, so the `read_raw_*` functions
//! return string records and the `parse_*` functions decode them.

use std::collections::{HashMap, VecDeque};
use std::io::{BufRead, Write};

use itertools::izip;

use crate::codec;
use crate::curve::{Affine, Bases};
use crate::error::EngineError;
use crate::ledger::{IncrementalEntry, KnownEntry, Ledger, LedgerEntry};

/// Separator line between proof sections.
pub const SECTION_SEPARATOR: &str = "====================";

const PROOF_BEGIN: [&str; 3] = ["BEGIN", "ZEROLEDGE", "PROOF"];
const PROOF_END: [&str; 3] = ["END", "ZEROLEDGE", "PROOF"];

/// Whitespace tokenizer over a buffered reader, with one token of lookahead.
pub struct TokenReader<R> {
    reader: R,
    pending: VecDeque<String>,
}

impl<R: BufRead> TokenReader<R> {
    /// Wraps a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: VecDeque::new(),
        }
    }

    fn refill(&mut self) -> Result<(), EngineError> {
        let mut line = String::new();
        while self.pending.is_empty() {
            line.clear();
            if self.reader.read_line(&mut line)? == 0 {
                return Ok(());
            }
            self.pending
                .extend(line.split_whitespace().map(str::to_owned));
        }
        Ok(())
    }

    /// The next token, or `None` at the end of the stream.
    pub fn token(&mut self) -> Result<Option<String>, EngineError> {
        self.refill()?;
        Ok(self.pending.pop_front())
    }

    /// Peeks at the next token without consuming it.
    pub fn peek(&mut self) -> Result<Option<&str>, EngineError> {
        self.refill()?;
        Ok(self.pending.front().map(String::as_str))
    }

    /// The next token, or a truncation error naming what was expected.
    pub fn expect(&mut self, what: &'static str) -> Result<String, EngineError> {
        self.token()?.ok_or(EngineError::Truncated(what))
    }

    /// Consumes one token and requires it to be the section separator.
    pub fn expect_separator(&mut self) -> Result<(), EngineError> {
        let token = self.expect("section separator")?;
        if token == SECTION_SEPARATOR {
            Ok(())
        } else {
            Err(EngineError::malformed("section separator", token))
        }
    }
}

fn push_line(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}

fn push_point(buf: &mut String, p: &Affine) {
    let (x, parity) = codec::encode_point(p);
    push_line(buf, &x);
    push_line(buf, if parity == 1 { "1" } else { "0" });
}

fn parse_decimal<T: std::str::FromStr>(
    what: &'static str,
    token: &str,
) -> Result<T, EngineError> {
    token
        .parse()
        .map_err(|_| EngineError::malformed(what, token))
}

/// The proof prelude: the public claim and the commitment bases.
#[derive(Debug, Clone)]
pub struct ProofHeader {
    /// Publicly declared assets.
    pub assets: u128,
    /// Proof timestamp, unix seconds.
    pub time: u64,
    /// Bit width of balances and the difference.
    pub value_bits: usize,
    /// Commitment bases as published in the proof.
    pub bases: Bases,
}

/// Writes everything up to and including the bases block.
pub fn write_header(out: &mut dyn Write, header: &ProofHeader) -> Result<(), EngineError> {
    let mut buf = String::new();
    push_line(&mut buf, "BEGIN ZEROLEDGE PROOF");
    push_line(&mut buf, SECTION_SEPARATOR);
    push_line(&mut buf, &format!("ASSETS {}", header.assets));
    push_line(&mut buf, &format!("TIME {}", header.time));
    push_line(&mut buf, &format!("BITS {}", header.value_bits));
    push_line(&mut buf, SECTION_SEPARATOR);
    for p in [header.bases.g, header.bases.h, header.bases.f] {
        push_point(&mut buf, &p);
    }
    out.write_all(buf.as_bytes())?;
    Ok(())
}

/// Reads and checks the proof prelude.
pub fn read_header<R: BufRead>(tr: &mut TokenReader<R>) -> Result<ProofHeader, EngineError> {
    for expected in PROOF_BEGIN {
        let token = tr.expect("proof prelude")?;
        if token != expected {
            return Err(EngineError::malformed("proof prelude", token));
        }
    }
    tr.expect_separator()?;

    let mut labeled = |label: &'static str| -> Result<String, EngineError> {
        let token = tr.expect(label)?;
        if token != label {
            return Err(EngineError::malformed("prelude label", token));
        }
        tr.expect(label)
    };
    let assets: u128 = {
        let token = labeled("ASSETS")?;
        parse_decimal("declared assets", &token)?
    };
    let time: u64 = {
        let token = labeled("TIME")?;
        parse_decimal("proof timestamp", &token)?
    };
    let value_bits: usize = {
        let token = labeled("BITS")?;
        let bits = parse_decimal("value bits", &token)?;
        if bits == 0 || bits > 63 {
            return Err(EngineError::malformed("value bits", token));
        }
        bits
    };
    tr.expect_separator()?;

    let mut point = |what: &'static str| -> Result<Affine, EngineError> {
        let x = tr.expect(what)?;
        let parity = tr.expect(what)?;
        codec::decode_point(what, &x, &parity)
    };
    let g = point("base g")?;
    let h = point("base h")?;
    let f = point("base f")?;

    Ok(ProofHeader {
        assets,
        time,
        value_bits,
        bases: Bases { g, h, f },
    })
}

/// Appends the per-entry proof block for `e` to a batch buffer.
pub fn push_entry_block(buf: &mut String, e: &LedgerEntry) {
    push_point(buf, &e.lec);
    push_point(buf, &e.lep.gamma);
    push_line(buf, &codec::encode_scalar(&e.lep.z1));
    push_line(buf, &codec::encode_scalar(&e.lep.z2));
    push_line(buf, &codec::encode_scalar(&e.lep.z3));
    for (lbc, p) in izip!(e.lbc.iter(), e.lbp.iter()) {
        push_point(buf, lbc);
        push_point(buf, &p.gamma1);
        push_point(buf, &p.gamma2);
        push_line(buf, &codec::encode_challenge(&p.c1));
        push_line(buf, &codec::encode_scalar(&p.z1));
        push_line(buf, &codec::encode_scalar(&p.z2));
        push_line(buf, &codec::encode_scalar(&p.z3));
        push_line(buf, &codec::encode_scalar(&p.z4));
    }
}

/// Raw tokens of one per-bit slice of an entry block.
pub struct RawBitTokens {
    /// Bit commitment token pair.
    pub lbc: [String; 2],
    /// Branch 1 nonce commitment token pair.
    pub gamma1: [String; 2],
    /// Branch 2 nonce commitment token pair.
    pub gamma2: [String; 2],
    /// Published challenge share.
    pub c1: String,
    /// Responses `z1..z4`.
    pub z: [String; 4],
}

/// Raw, still-unparsed tokens of one per-entry proof block.
pub struct RawEntryBlock {
    /// Entry commitment token pair.
    pub lec: [String; 2],
    /// Entry proof nonce commitment token pair.
    pub gamma: [String; 2],
    /// Entry proof responses.
    pub z: [String; 3],
    /// Per-bit token slices.
    pub bits: Vec<RawBitTokens>,
}

fn read_pair<R: BufRead>(
    tr: &mut TokenReader<R>,
    what: &'static str,
) -> Result<[String; 2], EngineError> {
    Ok([tr.expect(what)?, tr.expect(what)?])
}

/// Reads the raw tokens of one entry block, or `None` when the entry
/// section ends (separator line or end of stream).
pub fn read_raw_entry_block<R: BufRead>(
    tr: &mut TokenReader<R>,
    value_bits: usize,
) -> Result<Option<RawEntryBlock>, EngineError> {
    match tr.peek()? {
        None => return Ok(None),
        Some(token) if token == SECTION_SEPARATOR => return Ok(None),
        Some(_) => {}
    }
    let what = "entry block";
    let lec = read_pair(tr, what)?;
    let gamma = read_pair(tr, what)?;
    let z = [tr.expect(what)?, tr.expect(what)?, tr.expect(what)?];
    let mut bits = Vec::with_capacity(value_bits);
    for _ in 0..value_bits {
        bits.push(RawBitTokens {
            lbc: read_pair(tr, what)?,
            gamma1: read_pair(tr, what)?,
            gamma2: read_pair(tr, what)?,
            c1: tr.expect(what)?,
            z: [
                tr.expect(what)?,
                tr.expect(what)?,
                tr.expect(what)?,
                tr.expect(what)?,
            ],
        });
    }
    Ok(Some(RawEntryBlock {
        lec,
        gamma,
        z,
        bits,
    }))
}

/// Decodes a raw block into a verifier-side entry shell.
pub fn parse_entry_block(
    raw: &RawEntryBlock,
    value_bits: usize,
) -> Result<LedgerEntry, EngineError> {
    let mut e = LedgerEntry::unbound(value_bits);
    e.lec = codec::decode_point("entry commitment", &raw.lec[0], &raw.lec[1])?;
    e.lep.gamma = codec::decode_point("entry nonce commitment", &raw.gamma[0], &raw.gamma[1])?;
    e.lep.z1 = codec::decode_scalar("entry response", &raw.z[0])?;
    e.lep.z2 = codec::decode_scalar("entry response", &raw.z[1])?;
    e.lep.z3 = codec::decode_scalar("entry response", &raw.z[2])?;
    for (lbc, p, rb) in izip!(e.lbc.iter_mut(), e.lbp.iter_mut(), raw.bits.iter()) {
        *lbc = codec::decode_point("bit commitment", &rb.lbc[0], &rb.lbc[1])?;
        p.gamma1 = codec::decode_point("bit nonce commitment", &rb.gamma1[0], &rb.gamma1[1])?;
        p.gamma2 = codec::decode_point("bit nonce commitment", &rb.gamma2[0], &rb.gamma2[1])?;
        p.c1 = codec::decode_challenge("bit challenge share", &rb.c1)?;
        p.z1 = codec::decode_scalar("bit response", &rb.z[0])?;
        p.z2 = codec::decode_scalar("bit response", &rb.z[1])?;
        p.z3 = codec::decode_scalar("bit response", &rb.z[2])?;
        p.z4 = codec::decode_scalar("bit response", &rb.z[3])?;
    }
    Ok(e)
}

/// Appends the proof block for difference bit `i` to a batch buffer.
pub fn push_difference_block(buf: &mut String, l: &Ledger, i: usize) {
    let p = &l.dbp[i];
    push_point(buf, &l.dbc[i]);
    push_point(buf, &p.gamma1);
    push_point(buf, &p.gamma2);
    push_line(buf, &codec::encode_challenge(&p.c1));
    push_line(buf, &codec::encode_scalar(&p.z1));
    push_line(buf, &codec::encode_scalar(&p.z2));
    push_line(buf, &codec::encode_scalar(&p.z3));
    push_line(buf, &codec::encode_scalar(&p.z4));
}

/// Reads the proof block for difference bit `i` into the ledger.
pub fn read_difference_block<R: BufRead>(
    tr: &mut TokenReader<R>,
    l: &mut Ledger,
    i: usize,
) -> Result<(), EngineError> {
    let what = "difference bit block";
    let pair = read_pair(tr, what)?;
    l.dbc[i] = codec::decode_point("difference bit commitment", &pair[0], &pair[1])?;
    let pair = read_pair(tr, what)?;
    l.dbp[i].gamma1 = codec::decode_point("difference nonce commitment", &pair[0], &pair[1])?;
    let pair = read_pair(tr, what)?;
    l.dbp[i].gamma2 = codec::decode_point("difference nonce commitment", &pair[0], &pair[1])?;
    l.dbp[i].c1 = codec::decode_challenge("difference challenge share", &tr.expect(what)?)?;
    l.dbp[i].z1 = codec::decode_scalar("difference response", &tr.expect(what)?)?;
    l.dbp[i].z2 = codec::decode_scalar("difference response", &tr.expect(what)?)?;
    l.dbp[i].z3 = codec::decode_scalar("difference response", &tr.expect(what)?)?;
    l.dbp[i].z4 = codec::decode_scalar("difference response", &tr.expect(what)?)?;
    Ok(())
}

/// Writes the closing separator and end marker.
pub fn write_trailer(out: &mut dyn Write) -> Result<(), EngineError> {
    writeln!(out, "{SECTION_SEPARATOR}")?;
    writeln!(out, "END ZEROLEDGE PROOF")?;
    Ok(())
}

/// Consumes the closing separator and end marker.
pub fn read_trailer<R: BufRead>(tr: &mut TokenReader<R>) -> Result<(), EngineError> {
    tr.expect_separator()?;
    for expected in PROOF_END {
        let token = tr.expect("proof trailer")?;
        if token != expected {
            return Err(EngineError::malformed("proof trailer", token));
        }
    }
    Ok(())
}

/// Appends one opener line: `index id balance r`.
pub fn push_opener_line(buf: &mut String, index: u64, e: &LedgerEntry) {
    push_line(
        buf,
        &format!(
            "{index} {} {} {}",
            e.id,
            e.balance,
            codec::encode_scalar(&e.r)
        ),
    );
}

/// Reads all opener lines of an entries file, keyed by entry index.
pub fn read_known_entries(
    reader: impl BufRead,
) -> Result<HashMap<u64, KnownEntry>, EngineError> {
    let mut tr = TokenReader::new(reader);
    let mut known = HashMap::new();
    while let Some(token) = tr.token()? {
        let index: u64 = parse_decimal("opener index", &token)?;
        let id = tr.expect("opener identifier")?;
        let balance: u64 = parse_decimal("opener balance", &tr.expect("opener balance")?)?;
        let r = codec::decode_scalar("opener nonce", &tr.expect("opener nonce")?)?;
        known.insert(
            index,
            KnownEntry {
                index,
                id,
                balance,
                r,
            },
        );
    }
    Ok(known)
}

/// Appends one incremental-state record for `e`.
///
/// The stored nonce commitment and `b` pair are those of the real branch of
/// each bit proof, which is the only state a later run can rescale.
pub fn push_incremental_record(buf: &mut String, index: u64, e: &LedgerEntry) {
    let mut fields: Vec<String> = Vec::with_capacity(8 * e.value_bits() + 11);
    fields.push(index.to_string());
    fields.push(e.id.clone());
    fields.push(e.balance.to_string());
    for lbc in e.lbc.iter() {
        let (x, parity) = codec::encode_point(lbc);
        fields.push(x);
        fields.push(parity.to_string());
    }
    let (x, parity) = codec::encode_point(&e.lec);
    fields.push(x);
    fields.push(parity.to_string());
    for (i, p) in e.lbp.iter().enumerate() {
        let gamma = if e.bit(i) { &p.gamma2 } else { &p.gamma1 };
        let (x, parity) = codec::encode_point(gamma);
        fields.push(x);
        fields.push(parity.to_string());
    }
    let (x, parity) = codec::encode_point(&e.lep.gamma);
    fields.push(x);
    fields.push(parity.to_string());
    for p in e.lbp.iter() {
        fields.push(codec::encode_scalar(&p.r));
    }
    fields.push(codec::encode_scalar(&e.r));
    for (i, p) in e.lbp.iter().enumerate() {
        fields.push(codec::encode_scalar(if e.bit(i) { &p.b3 } else { &p.b1 }));
    }
    for (i, p) in e.lbp.iter().enumerate() {
        fields.push(codec::encode_scalar(if e.bit(i) { &p.b4 } else { &p.b2 }));
    }
    fields.push(codec::encode_scalar(&e.lep.b1));
    fields.push(codec::encode_scalar(&e.lep.b2));
    fields.push(codec::encode_scalar(&e.lep.b3));
    push_line(buf, &fields.join(" "));
}

/// Raw tokens of one incremental-state record.
pub struct RawIncrementalRecord {
    /// Account identifier, the key of the incremental store.
    pub id: String,
    /// Previous balance token.
    pub balance: String,
    /// Previous bit commitment token pairs.
    pub lbc: Vec<[String; 2]>,
    /// Previous entry commitment token pair.
    pub lec: [String; 2],
    /// Previous real-branch nonce commitment token pairs.
    pub bit_gammas: Vec<[String; 2]>,
    /// Previous entry-proof nonce commitment token pair.
    pub lep_gamma: [String; 2],
    /// Previous bit nonce tokens.
    pub r_bits: Vec<String>,
    /// Previous aggregate nonce token.
    pub r: String,
    /// Previous real-branch nonce tokens, first component.
    pub bit_b1: Vec<String>,
    /// Previous real-branch nonce tokens, second component.
    pub bit_b2: Vec<String>,
    /// Previous entry-proof nonce tokens.
    pub lep_b: [String; 3],
}

/// Reads the raw tokens of one incremental record, or `None` at the end of
/// the stream.
pub fn read_raw_incremental_record<R: BufRead>(
    tr: &mut TokenReader<R>,
    value_bits: usize,
) -> Result<Option<RawIncrementalRecord>, EngineError> {
    // the leading index is only positional and is not stored
    if tr.token()?.is_none() {
        return Ok(None);
    }
    let what = "incremental record";
    let id = tr.expect(what)?;
    let balance = tr.expect(what)?;
    let mut lbc = Vec::with_capacity(value_bits);
    for _ in 0..value_bits {
        lbc.push(read_pair(tr, what)?);
    }
    let lec = read_pair(tr, what)?;
    let mut bit_gammas = Vec::with_capacity(value_bits);
    for _ in 0..value_bits {
        bit_gammas.push(read_pair(tr, what)?);
    }
    let lep_gamma = read_pair(tr, what)?;
    let mut r_bits = Vec::with_capacity(value_bits);
    for _ in 0..value_bits {
        r_bits.push(tr.expect(what)?);
    }
    let r = tr.expect(what)?;
    let mut bit_b1 = Vec::with_capacity(value_bits);
    for _ in 0..value_bits {
        bit_b1.push(tr.expect(what)?);
    }
    let mut bit_b2 = Vec::with_capacity(value_bits);
    for _ in 0..value_bits {
        bit_b2.push(tr.expect(what)?);
    }
    let lep_b = [tr.expect(what)?, tr.expect(what)?, tr.expect(what)?];
    Ok(Some(RawIncrementalRecord {
        id,
        balance,
        lbc,
        lec,
        bit_gammas,
        lep_gamma,
        r_bits,
        r,
        bit_b1,
        bit_b2,
        lep_b,
    }))
}

/// Decodes a raw incremental record into the store representation.
pub fn parse_incremental_record(
    raw: &RawIncrementalRecord,
) -> Result<(String, IncrementalEntry), EngineError> {
    let balance: u64 = parse_decimal("incremental balance", &raw.balance)?;
    let mut lbc = Vec::with_capacity(raw.lbc.len());
    for pair in raw.lbc.iter() {
        lbc.push(codec::decode_point("incremental bit commitment", &pair[0], &pair[1])?);
    }
    let lec = codec::decode_point("incremental entry commitment", &raw.lec[0], &raw.lec[1])?;
    let mut bit_gammas = Vec::with_capacity(raw.bit_gammas.len());
    for pair in raw.bit_gammas.iter() {
        bit_gammas.push(codec::decode_point(
            "incremental nonce commitment",
            &pair[0],
            &pair[1],
        )?);
    }
    let lep_gamma = codec::decode_point(
        "incremental nonce commitment",
        &raw.lep_gamma[0],
        &raw.lep_gamma[1],
    )?;
    let mut r_bits = Vec::with_capacity(raw.r_bits.len());
    for token in raw.r_bits.iter() {
        r_bits.push(codec::decode_scalar("incremental bit nonce", token)?);
    }
    let r = codec::decode_scalar("incremental nonce", &raw.r)?;
    let mut bit_b1 = Vec::with_capacity(raw.bit_b1.len());
    for token in raw.bit_b1.iter() {
        bit_b1.push(codec::decode_scalar("incremental branch nonce", token)?);
    }
    let mut bit_b2 = Vec::with_capacity(raw.bit_b2.len());
    for token in raw.bit_b2.iter() {
        bit_b2.push(codec::decode_scalar("incremental branch nonce", token)?);
    }
    let entry = IncrementalEntry {
        balance,
        lec,
        lbc,
        bit_gammas,
        lep_gamma,
        r_bits,
        r,
        bit_b1,
        bit_b2,
        lep_b1: codec::decode_scalar("incremental entry nonce", &raw.lep_b[0])?,
        lep_b2: codec::decode_scalar("incremental entry nonce", &raw.lep_b[1])?,
        lep_b3: codec::decode_scalar("incremental entry nonce", &raw.lep_b[2])?,
    };
    Ok((raw.id.clone(), entry))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::curve::BaseSeeds;
    use crate::proofs::{bit, entry};

    fn bases() -> Bases {
        BaseSeeds::parse("1 2 3").unwrap().derive()
    }

    fn proven_entry(id: &str, balance: u64) -> LedgerEntry {
        let mut rng = rand::thread_rng();
        let bases = bases();
        let mut e = LedgerEntry::new(id, balance, 8);
        bit::sample_nonces(&mut e, &mut rng);
        bit::commit_all(&bases, &mut e, None);
        bit::prove_all(&bases, &mut e, None, &mut rng);
        e.compute_r();
        entry::commit(&bases, &mut e, None);
        entry::prove(&bases, &mut e, None, &mut rng);
        e
    }

    #[test]
    fn test_tokenizer_peek_and_lines() {
        let text = "alpha beta\n\n  gamma\n";
        let mut tr = TokenReader::new(text.as_bytes());
        assert_eq!(tr.peek().unwrap(), Some("alpha"));
        assert_eq!(tr.token().unwrap().as_deref(), Some("alpha"));
        assert_eq!(tr.token().unwrap().as_deref(), Some("beta"));
        assert_eq!(tr.peek().unwrap(), Some("gamma"));
        assert_eq!(tr.token().unwrap().as_deref(), Some("gamma"));
        assert_eq!(tr.token().unwrap(), None);
        assert!(tr.expect("anything").is_err());
    }

    #[test]
    fn test_header_roundtrip() {
        let header = ProofHeader {
            assets: 123456,
            time: 1700000000,
            value_bits: 8,
            bases: bases(),
        };
        let mut out = Vec::new();
        write_header(&mut out, &header).unwrap();
        let mut tr = TokenReader::new(out.as_slice());
        let restored = read_header(&mut tr).unwrap();
        assert_eq!(restored.assets, header.assets);
        assert_eq!(restored.time, header.time);
        assert_eq!(restored.value_bits, header.value_bits);
        assert_eq!(restored.bases, header.bases);
    }

    #[test]
    fn test_entry_block_roundtrip() {
        let e = proven_entry("alice", 5);
        let mut buf = String::new();
        push_entry_block(&mut buf, &e);

        let mut tr = TokenReader::new(buf.as_bytes());
        let raw = read_raw_entry_block(&mut tr, 8).unwrap().expect("one block");
        assert!(read_raw_entry_block(&mut tr, 8).unwrap().is_none());

        let parsed = parse_entry_block(&raw, 8).unwrap();
        assert_eq!(parsed.lec, e.lec);
        assert_eq!(parsed.lep.z3, e.lep.z3);
        assert_eq!(parsed.lbc, e.lbc);
        assert_eq!(parsed.lbp[7].c1, e.lbp[7].c1);
        assert_eq!(parsed.lbp[0].z4, e.lbp[0].z4);
    }

    #[test]
    fn test_opener_roundtrip() {
        let mut e = proven_entry("alice", 5);
        e.compute_r();
        let mut buf = String::new();
        push_opener_line(&mut buf, 3, &e);
        let known = read_known_entries(buf.as_bytes()).unwrap();
        let k = known.get(&3).expect("index 3 present");
        assert_eq!(k.id, "alice");
        assert_eq!(k.balance, 5);
        assert_eq!(k.r, e.r);
    }

    #[test]
    fn test_incremental_record_roundtrip() {
        let e = proven_entry("carol", 0b1010);
        let mut buf = String::new();
        push_incremental_record(&mut buf, 0, &e);

        let mut tr = TokenReader::new(buf.as_bytes());
        let raw = read_raw_incremental_record(&mut tr, 8)
            .unwrap()
            .expect("one record");
        assert!(read_raw_incremental_record(&mut tr, 8).unwrap().is_none());

        let (id, inc) = parse_incremental_record(&raw).unwrap();
        assert_eq!(id, "carol");
        assert_eq!(inc.balance, e.balance);
        assert_eq!(inc.lec, e.lec);
        assert_eq!(inc.lbc, e.lbc);
        assert_eq!(inc.r, e.r);
        // bit 1 is set, so the stored state is the real branch 2
        assert_eq!(inc.bit_gammas[1], e.lbp[1].gamma2);
        assert_eq!(inc.bit_b1[1], e.lbp[1].b3);
        // bit 0 is clear, branch 1
        assert_eq!(inc.bit_gammas[0], e.lbp[0].gamma1);
        assert_eq!(inc.bit_b1[0], e.lbp[0].b1);
    }
}
