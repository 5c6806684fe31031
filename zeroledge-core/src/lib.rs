#![deny(missing_docs)]
//! Core engine of ZeroLedge, a zero-knowledge proof-of-solvency scheme.
//!
//! A custodial institution runs the generator over its ledger to publish a
//! single non-interactive proof that its declared assets cover the sum of
//! customer balances, revealing neither per-account balances nor the
//! customer list. The construction commits to each entry and to each
//! balance bit with Pedersen commitments over secp256k1, attaches
//! Fiat-Shamir compiled Schnorr proofs (a knowledge proof per entry, an OR
//! proof per bit), and binds everything to a ledger-wide range proof on
//! `assets - liabilities` through the difference bit commitments. Anyone can
//! verify the published proof; a customer holding an opener can additionally
//! verify that their account is included.
//!
//! The crate is organised leaves-first:
//! - [`curve`]: primitives adapter over the arkworks stack.
//! - [`codec`]: lexical radix-64 wire codec.
//! - [`ledger`]: per-entry and aggregate data model.
//! - [`proofs`]: the entry, bit and difference-bit processors.
//! - [`wire`]: textual stream formats.
//! - [`generate`] / [`verify`]: the parallel producer/consumer pipelines.

pub mod codec;
pub mod curve;
pub mod error;
pub mod generate;
pub mod ledger;
pub mod proofs;
pub mod verify;
pub mod wire;

pub use error::EngineError;
