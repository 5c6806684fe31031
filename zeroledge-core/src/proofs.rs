//! The three Σ-protocol processors.
//!
//! Each processor is a set of stateless transformers over the shared
//! commitment bases and an explicit entry or ledger buffer: `commit*`
//! populates commitments, `begin` / `challenge` / `complete` run the three
//! moves of the Fiat-Shamir compiled protocol, `prove*` chains them, and
//! `verify*` replays the verifier side from the published values alone.
//!
//! - [`entry`] proves knowledge of an opening of an entry commitment.
//! - [`bit`] proves a bit commitment opens to 0 or 1 (an OR proof).
//! - [`difference`] proves the same for the bits of the aggregated
//!   difference, with the secret terms carrying the opposite sign.
//!
//! Soundness depends on the call order within one proof: commitments first,
//! then the nonce commitments, then the transcript challenge, then the
//! responses. The challenge always covers `(g, h, f)` and the commitment
//! before the nonce commitments.

pub mod bit;
pub mod difference;
pub mod entry;
