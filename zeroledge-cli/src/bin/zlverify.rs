use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;
use std::process::ExitCode;
use std::time::{Duration, UNIX_EPOCH};

use clap::Parser as _;
use eyre::Context as _;
use zeroledge_cli::config::VerifyConfig;
use zeroledge_core::verify::{self, VerificationReport, VerifierOptions};
use zeroledge_core::wire;

const TAG_VALID: &str = "[VALID]";
const TAG_INVALID: &str = "[INVALID]";

fn verdict(ok: bool) -> &'static str {
    if ok { TAG_VALID } else { TAG_INVALID }
}

fn print_report(report: &VerificationReport) {
    println!("ZEROLEDGE PROOF VERIFIER");
    println!();
    println!("Ledger Entries: {}", report.entry_count);
    println!("Maximum Liability: {}", report.total_assets);
    println!(
        "Proof Time: {}",
        humantime::format_rfc3339_seconds(UNIX_EPOCH + Duration::from_secs(report.proof_time))
    );
    println!("Validating...");
    println!();

    if !report.inclusion_only {
        println!(
            "{:<40}{}",
            "Bases",
            verdict(report.bases_valid.unwrap_or(false))
        );
    }
    if report.known_total > 0 {
        println!(
            "{:<40}{}",
            "Known Ledger Entries",
            verdict(report.known_ok())
        );
    }
    if report.inclusion_only {
        return;
    }
    println!(
        "{:<40}{}",
        "Ledger Entry Proofs",
        verdict(report.entry_proofs_ok())
    );
    println!(
        "{:<40}{}",
        "Ledger Bit Proofs",
        verdict(report.bit_proofs_ok())
    );
    println!(
        "{:<40}{}",
        "Ledger Commitment Equivalency",
        verdict(report.equivalency_ok())
    );
    println!(
        "{:<40}{}",
        "Difference Bit Proofs",
        verdict(report.difference_bits_valid.unwrap_or(false))
    );
    println!(
        "{:<40}{}",
        "Total Commitment Equivalency",
        verdict(report.total_equivalency_valid.unwrap_or(false))
    );
    println!("{:<40}{}", "ZeroLedge Proof", verdict(report.is_valid()));
}

fn main() -> eyre::Result<ExitCode> {
    zeroledge_cli::install_tracing("zlverify=info,warn");
    let config = VerifyConfig::parse();
    tracing::debug!(?config, "starting zlverify");

    zeroledge_cli::check_curve(config.curve.as_deref())
        .context("while validating curve parameters")?;
    let seeds = if config.inclusion_only {
        None
    } else {
        Some(
            zeroledge_cli::load_seeds(&config.bases)
                .context("while reading commitment base seeds")?,
        )
    };

    let known = match &config.known_entries {
        Some(path) => {
            let reader = BufReader::new(
                File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?,
            );
            wire::read_known_entries(reader).context("while reading known entries")?
        }
        None => HashMap::new(),
    };

    let proof = zeroledge_cli::input_stream(config.proof.as_deref())?;
    let opts = VerifierOptions {
        threads: config.threads,
        batch_size: 10,
        inclusion_only: config.inclusion_only,
    };

    let report =
        verify::verify_proof(&opts, seeds.as_ref(), &known, proof).context("while verifying")?;
    print_report(&report);

    Ok(if report.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
