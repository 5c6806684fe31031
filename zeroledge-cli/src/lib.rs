//! Shared plumbing for the `zlgenerate` and `zlverify` binaries: tracing
//! setup, stream opening, and parameter-file loading.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use eyre::Context as _;
use zeroledge_core::curve::{self, BaseSeeds};

pub mod config;

/// Installs the fmt tracing subscriber on stderr, honouring `RUST_LOG` and
/// falling back to `default_filter`.
pub fn install_tracing(default_filter: &str) {
    use tracing_subscriber::EnvFilter;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
}

/// Opens a buffered input stream: the file at `path`, or standard input.
pub fn input_stream(path: Option<&Path>) -> eyre::Result<Box<dyn BufRead + Send>> {
    match path {
        Some(path) => {
            let file = File::open(path).wrap_err_with(|| format!("opening {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(std::io::stdin()))),
    }
}

/// Opens a buffered output stream: the file at `path`, or standard output.
pub fn output_stream(path: Option<&Path>) -> eyre::Result<Box<dyn Write + Send>> {
    match path {
        Some(path) => {
            let file =
                File::create(path).wrap_err_with(|| format!("creating {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(std::io::stdout())),
    }
}

/// Reads the three commitment base seeds.
pub fn load_seeds(path: &Path) -> eyre::Result<BaseSeeds> {
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("reading base seeds from {}", path.display()))?;
    Ok(BaseSeeds::parse(&text)?)
}

/// Validates an optional curve parameter file against the built-in curve.
pub fn check_curve(path: Option<&Path>) -> eyre::Result<()> {
    if let Some(path) = path {
        let text = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading curve parameters from {}", path.display()))?;
        curve::check_curve_parameters(&text)?;
    }
    Ok(())
}
