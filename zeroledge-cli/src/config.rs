//! Configuration types and CLI/environment parsing for the two binaries.

use std::path::PathBuf;

use clap::Parser;

/// Configuration for the proof generator.
///
/// It can be configured via environment variables or command line arguments
/// using `clap`.
#[derive(Parser, Debug)]
#[command(name = "zlgenerate", about = "ZeroLedge proof generator", version)]
pub struct GenerateConfig {
    /// Number of worker threads; 0 means one per online CPU.
    #[clap(short = 't', long, env = "ZEROLEDGE_THREADS", default_value = "0")]
    pub threads: usize,

    /// Number of ledger entries each worker processes at a time.
    #[clap(short = 'g', long, env = "ZEROLEDGE_GROUP_SIZE", default_value = "10")]
    pub group_size: usize,

    /// Bit width balances and sums are restricted to.
    #[clap(short = 'v', long, env = "ZEROLEDGE_VALUE_BITS", default_value = "24")]
    pub value_bits: usize,

    /// Commitment base seed file.
    #[clap(short = 'b', long, env = "ZEROLEDGE_BASES", default_value = "bases.txt")]
    pub bases: PathBuf,

    /// Elliptic curve parameter file to validate against the built-in curve.
    #[clap(short = 'c', long, env = "ZEROLEDGE_CURVE")]
    pub curve: Option<PathBuf>,

    /// Generate an incremental proof using state exported by a previous run.
    #[clap(short = 'i', long)]
    pub incremental_in: Option<PathBuf>,

    /// Write entry openers to this path.
    #[clap(short = 'e', long)]
    pub entries_out: Option<PathBuf>,

    /// Write incremental state for the next run to this path.
    #[clap(short = 'r', long)]
    pub incremental_out: Option<PathBuf>,

    /// Write the proof to this path instead of standard output.
    #[clap(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// Ledger source; standard input when omitted.
    pub ledger: Option<PathBuf>,
}

/// Configuration for the proof verifier.
///
/// It can be configured via environment variables or command line arguments
/// using `clap`.
#[derive(Parser, Debug)]
#[command(name = "zlverify", about = "ZeroLedge proof verifier", version)]
pub struct VerifyConfig {
    /// Number of worker threads; 0 means one per online CPU.
    #[clap(short = 't', long, env = "ZEROLEDGE_THREADS", default_value = "0")]
    pub threads: usize,

    /// Commitment base seed file.
    #[clap(short = 'b', long, env = "ZEROLEDGE_BASES", default_value = "bases.txt")]
    pub bases: PathBuf,

    /// Elliptic curve parameter file to validate against the built-in curve.
    #[clap(short = 'c', long, env = "ZEROLEDGE_CURVE")]
    pub curve: Option<PathBuf>,

    /// Known ledger entry openers to check for inclusion.
    #[clap(short = 'k', long)]
    pub known_entries: Option<PathBuf>,

    /// Verify ledger entry inclusion only, skipping the ledger-wide checks.
    #[clap(short = 'i', long)]
    pub inclusion_only: bool,

    /// Proof source; standard input when omitted.
    pub proof: Option<PathBuf>,
}
