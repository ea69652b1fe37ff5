// ─────────────────────────────────────────────────────────────────────
// SCPN Fusion Core — PIC Setup Command
// © 1998–2026 Miroslav Šotek. All rights reserved.
// Contact: www.anulum.li | protoscience@anulum.li
// ORCID: https://orcid.org/0009-0009-3560-0851
// License: GNU AGPL v3 | Commercial licensing available
// ─────────────────────────────────────────────────────────────────────
//! Validate a PIC input deck and build its grid without running the solver.

use clap::Parser;
use fusion_math::expr::StandardCompiler;
use fusion_pic::simulation::{ProcessRole, Simulation};
use fusion_types::config::ParameterTable;
use fusion_types::error::{FusionError, FusionResult};
use fusion_types::grid::NDIM;
use serde_json::json;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

const EXIT_USAGE: u8 = 80;
const EXIT_INPUT_FILE: u8 = 82;
const EXIT_INPUT_VAR: u8 = 83;
const EXIT_SETUP: u8 = 84;

#[derive(Parser, Debug)]
#[command(name = "pic-setup", version)]
#[command(about = "Validate a PIC input deck and build its non-uniform grid")]
struct Cli {
    /// Input deck (JSON)
    #[arg(short, long)]
    input: PathBuf,

    /// Rank of this process
    #[arg(long, default_value_t = 0)]
    rank: usize,

    /// Number of participating processes
    #[arg(long, default_value_t = 1)]
    size: usize,

    /// Print the cell widths of every dimension as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code(err: &FusionError) -> u8 {
    match err {
        FusionError::Io(_) | FusionError::Json(_) => EXIT_INPUT_FILE,
        FusionError::MissingParameter { .. }
        | FusionError::ParameterType { .. }
        | FusionError::ConfigError(_) => EXIT_INPUT_VAR,
        _ => EXIT_SETUP,
    }
}

fn load(cli: &Cli, role: &ProcessRole) -> FusionResult<ParameterTable> {
    let path = cli.input.to_string_lossy();
    ParameterTable::from_file(&path).inspect_err(|err| {
        if role.is_coordinator() {
            tracing::error!("Cannot read input deck {path}: {err}");
        }
    })
}

/// Validate `--rank`/`--size`. Only the would-be coordinator (rank 0)
/// reports a rejection.
fn resolve_role(rank: usize, size: usize) -> Result<ProcessRole, u8> {
    ProcessRole::new(rank, size).map_err(|err| {
        if rank == 0 {
            tracing::error!("{err}");
        }
        EXIT_USAGE
    })
}

fn run(cli: &Cli, role: ProcessRole) -> FusionResult<()> {
    if role.is_coordinator() {
        tracing::info!(
            version = env!("CARGO_PKG_VERSION"),
            processes = role.size(),
            "SCPN PIC setup"
        );
    }
    let table = load(cli, &role)?;
    let sim = Simulation::setup(&table, role, &StandardCompiler)?;

    if cli.json && role.is_coordinator() {
        let grid = sim.grid();
        let axes: Vec<_> = (0..NDIM)
            .map(|dim| {
                json!({
                    "lower": grid.bounds(dim).0,
                    "upper": grid.bounds(dim).1,
                    "deltas": grid.deltas(dim).to_vec(),
                })
            })
            .collect();
        let dump = json!({
            "report": grid.report(),
            "axes": axes,
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
    }
    Ok(())
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();

    let role = match resolve_role(cli.rank, cli.size) {
        Ok(role) => role,
        Err(code) => return ExitCode::from(code),
    };

    match run(&cli, role) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => ExitCode::from(exit_code(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_exit_codes() {
        let io = FusionError::Io(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        assert_eq!(exit_code(&io), EXIT_INPUT_FILE);
        let missing = FusionError::MissingParameter {
            section: "grid".into(),
            key: "ngrid".into(),
        };
        assert_eq!(exit_code(&missing), EXIT_INPUT_VAR);
        let bad = FusionError::InvalidBounds {
            dim: 0,
            lower: 1.0,
            upper: 0.0,
        };
        assert_eq!(exit_code(&bad), EXIT_SETUP);
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn logged_while(f: impl FnOnce()) -> String {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        tracing::subscriber::with_default(subscriber, f);
        let bytes = captured.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_bad_role_reported_by_rank_zero_only() {
        let log = logged_while(|| {
            assert_eq!(resolve_role(5, 2).unwrap_err(), EXIT_USAGE);
        });
        assert!(log.is_empty(), "{log}");

        let log = logged_while(|| {
            assert_eq!(resolve_role(0, 0).unwrap_err(), EXIT_USAGE);
        });
        assert!(log.contains("Process count"), "{log}");

        assert_eq!(resolve_role(1, 2).unwrap(), ProcessRole::new(1, 2).unwrap());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from(["pic-setup", "-i", "deck.json", "--rank", "1", "--size", "2"])
            .unwrap();
        assert_eq!(cli.input, PathBuf::from("deck.json"));
        assert_eq!(cli.rank, 1);
        assert_eq!(cli.size, 2);
        assert!(!cli.json);
        assert!(Cli::try_parse_from(["pic-setup"]).is_err());
    }
}
