use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use clap::Parser as _;
use eyre::Context as _;
use zeroledge_cli::config::GenerateConfig;
use zeroledge_core::generate::{self, GeneratorOptions};

fn main() -> eyre::Result<()> {
    zeroledge_cli::install_tracing("zlgenerate=info,warn");
    let config = GenerateConfig::parse();
    tracing::debug!(?config, "starting zlgenerate");

    zeroledge_cli::check_curve(config.curve.as_deref())
        .context("while validating curve parameters")?;
    let seeds = zeroledge_cli::load_seeds(&config.bases)
        .context("while reading commitment base seeds")?;
    let bases = seeds.derive();

    let opts = GeneratorOptions {
        threads: config.threads,
        batch_size: config.group_size,
        value_bits: config.value_bits,
    };

    let incremental = match &config.incremental_in {
        Some(path) => {
            tracing::info!(path = %path.display(), "importing incremental state");
            let source = BufReader::new(
                File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?,
            );
            Some(
                generate::import_incremental(&opts, source)
                    .context("while importing incremental state")?,
            )
        }
        None => None,
    };
    let proof_time = match &incremental {
        Some(data) => data.time,
        None => SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock before the unix epoch")
            .as_secs(),
    };

    let ledger = zeroledge_cli::input_stream(config.ledger.as_deref())?;
    let proof = zeroledge_cli::output_stream(config.output.as_deref())?;
    let mut entries_out = match &config.entries_out {
        Some(path) => Some(BufWriter::new(
            File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };
    let mut incremental_out = match &config.incremental_out {
        Some(path) => Some(BufWriter::new(
            File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?,
        )),
        None => None,
    };

    tracing::info!("generating proof");
    let started = Instant::now();
    generate::generate_proof(
        &opts,
        &bases,
        incremental.as_ref(),
        proof_time,
        ledger,
        proof,
        entries_out
            .as_mut()
            .map(|w| w as &mut (dyn Write + Send)),
        incremental_out
            .as_mut()
            .map(|w| w as &mut (dyn Write + Send)),
    )
    .context("while generating proof")?;

    if let Some(out) = entries_out.as_mut() {
        out.flush().context("while flushing entries output")?;
    }
    if let Some(out) = incremental_out.as_mut() {
        out.flush().context("while flushing incremental output")?;
    }

    tracing::info!(elapsed = ?started.elapsed(), "proof complete");
    Ok(())
}
