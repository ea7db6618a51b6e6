//! spicerack CLI.
//!
//! # Responsibility
//! - Load a JSON catalog into the in-memory store and resolve one blend.
//! - Keep stdout to resolved spices only; diagnostics go to stderr logs.

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use spicerack_core::{
    init_stderr_logging, BlendId, BlendResolver, CatalogSeed, ResolutionResult, ResolverConfig,
    SqliteCatalog,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const EXIT_OK: u8 = 0;
const EXIT_ROOT_MISSING: u8 = 2;

#[derive(Parser, Debug)]
#[command(
    name = "spicerack",
    version,
    about = "Resolve spice blends into the spices they contain"
)]
struct Cli {
    /// Log level for stderr diagnostics (trace|debug|info|warn|error).
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every unique spice reachable from a blend, sorted by name.
    Resolve {
        /// JSON file with `spices` and `blends` arrays.
        catalog: PathBuf,
        blend_id: BlendId,
        /// Maximum concurrent store lookups.
        #[arg(long)]
        max_in_flight: Option<usize>,
        /// Per-lookup timeout in milliseconds.
        #[arg(long)]
        fetch_timeout_ms: Option<u64>,
        /// Abort the whole resolution after this many milliseconds.
        #[arg(long)]
        deadline_ms: Option<u64>,
    },
    /// Print the core library version.
    Version,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(err) = init_stderr_logging(&cli.log_level) {
        eprintln!("error: {err}");
        return ExitCode::FAILURE;
    }

    match run(cli.command).await {
        Ok(code) => code,
        Err(err) => {
            error!("event=cli_run module=cli status=error error={err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Command) -> Result<ExitCode, String> {
    match command {
        Command::Version => {
            println!("spicerack_core {}", spicerack_core::core_version());
            Ok(ExitCode::SUCCESS)
        }
        Command::Resolve {
            catalog,
            blend_id,
            max_in_flight,
            fetch_timeout_ms,
            deadline_ms,
        } => {
            let store = Arc::new(load_catalog(&catalog)?);
            info!(
                "event=catalog_load module=cli status=ok path={}",
                catalog.display()
            );
            let mut config = ResolverConfig::default();
            if let Some(limit) = max_in_flight {
                config = config.with_max_in_flight_fetches(limit);
            }
            if let Some(ms) = fetch_timeout_ms {
                config = config.with_fetch_timeout(Duration::from_millis(ms));
            }
            let resolver = BlendResolver::with_config(Arc::clone(&store), store, config);

            let result = match deadline_ms {
                Some(ms) => resolver
                    .resolve_within(blend_id, Duration::from_millis(ms))
                    .await
                    .map_err(|err| err.to_string())?,
                None => resolver.resolve(blend_id).await,
            };
            let mut stdout = std::io::stdout().lock();
            let code = write_result(result, &mut stdout)
                .map_err(|err| format!("failed to write result: {err}"))?;
            Ok(ExitCode::from(code))
        }
    }
}

fn load_catalog(path: &Path) -> Result<SqliteCatalog, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read catalog `{}`: {err}", path.display()))?;
    let seed: CatalogSeed = serde_json::from_str(&raw)
        .map_err(|err| format!("invalid catalog `{}`: {err}", path.display()))?;
    SqliteCatalog::from_seed(&seed).map_err(|err| err.to_string())
}

/// Writes resolved spices as `id<TAB>name[<TAB>attributes]` lines sorted by
/// name and returns the process exit code.
fn write_result<W: Write>(result: ResolutionResult, out: &mut W) -> std::io::Result<u8> {
    if result.root_unresolved() {
        warn!(
            "event=resolve module=cli status=root_unresolved root={} root_status={}",
            result.root,
            result.root_status.as_str()
        );
        return Ok(EXIT_ROOT_MISSING);
    }

    for spice in result.sorted_by_name() {
        if spice.attributes.is_empty() {
            writeln!(out, "{}\t{}", spice.id, spice.name)?;
        } else {
            let attributes = serde_json::Value::Object(spice.attributes);
            writeln!(out, "{}\t{}\t{}", spice.id, spice.name, attributes)?;
        }
    }
    Ok(EXIT_OK)
}

#[cfg(test)]
mod tests {
    use super::{load_catalog, write_result, EXIT_OK, EXIT_ROOT_MISSING};
    use spicerack_core::{BlendResolver, ResolutionResult, RootStatus, Spice};
    use std::path::Path;
    use std::sync::Arc;

    fn result(root_status: RootStatus, spices: Vec<Spice>) -> ResolutionResult {
        ResolutionResult {
            root: 1,
            root_status,
            spices,
        }
    }

    fn render(result: ResolutionResult) -> (u8, String) {
        let mut out = Vec::new();
        let code = write_result(result, &mut out).unwrap();
        (code, String::from_utf8(out).unwrap())
    }

    #[test]
    fn unresolved_root_exits_with_root_missing_code() {
        for status in [RootStatus::NotFound, RootStatus::Unavailable] {
            let (code, out) = render(result(status, Vec::new()));
            assert_eq!(code, EXIT_ROOT_MISSING);
            assert!(out.is_empty());
        }
    }

    #[test]
    fn resolved_empty_blend_succeeds_without_output() {
        let (code, out) = render(result(RootStatus::Resolved, Vec::new()));
        assert_eq!(code, EXIT_OK);
        assert!(out.is_empty());
    }

    #[test]
    fn spices_are_printed_sorted_by_name() {
        let spices = vec![
            Spice::new(3, "Turmeric"),
            Spice::new(1, "Cumin").with_attribute("heat", 1),
            Spice::new(2, "Allspice"),
        ];

        let (code, out) = render(result(RootStatus::Resolved, spices));

        assert_eq!(code, EXIT_OK);
        assert_eq!(
            out,
            "2\tAllspice\n1\tCumin\t{\"heat\":1}\n3\tTurmeric\n"
        );
    }

    #[tokio::test]
    async fn fixture_catalog_resolves_through_its_cycle() {
        let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("fixtures/catalog.json");
        let store = Arc::new(load_catalog(&fixture).unwrap());
        let resolver = BlendResolver::new(Arc::clone(&store), store);

        let missing = resolver.resolve(404).await;
        assert_eq!(render(missing).0, EXIT_ROOT_MISSING);

        let resolved = resolver.resolve(3).await;
        assert_eq!(resolved.root_status, RootStatus::Resolved);
        assert_eq!(resolved.spice_ids(), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
