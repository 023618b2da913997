use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use telepaint_core::store::{self, ContentStore};
use telepaint_core::{
    default_config_path, parse_document, Document, EnvelopeRecord, GitHubStore, MemoryStore,
    Passphrase, SyncLoop, SyncState, SyncWorker, TelepaintConfig,
    DEFAULT_PBKDF2_ITERATIONS,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const PASSPHRASE_ENV: &str = "TELEPAINT_PASSPHRASE";

/// Telepaint - shared drawing frames over a git-hosted content store
#[derive(Parser)]
#[command(name = "telepaint")]
#[command(about = "Exchange drawing frames with a peer through a shared repository", long_about = None)]
struct Cli {
    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Keep committing a local document and polling the peer until Ctrl+C
    Run {
        /// Plaintext document JSON, re-read every tick
        #[arg(long)]
        document: PathBuf,

        /// Loop tick in milliseconds
        #[arg(long, default_value_t = 250)]
        tick_ms: u64,

        /// Use an in-memory store instead of the network
        #[arg(long)]
        offline: bool,
    },

    /// Commit a document once
    Push {
        #[arg(long)]
        document: PathBuf,
    },

    /// Fetch the peer document once
    Pull {
        /// Write the document here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Encrypt a file into an envelope
    Seal {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = DEFAULT_PBKDF2_ITERATIONS)]
        iterations: u32,
    },

    /// Decrypt an envelope
    Open {
        #[arg(long)]
        input: PathBuf,

        #[arg(long)]
        output: PathBuf,

        #[arg(long, default_value_t = DEFAULT_PBKDF2_ITERATIONS)]
        iterations: u32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Run {
            document,
            tick_ms,
            offline,
        } => {
            let config = load_config(&config_path)?;
            let tick = Duration::from_millis(tick_ms.max(1));
            if offline {
                info!("Running against an in-memory store");
                let store = Arc::new(MemoryStore::new());
                run(move || Ok(store), config, document, tick).await?;
            } else {
                let store_config = config.store_config();
                run(move || GitHubStore::new(store_config), config, document, tick).await?;
            }
        }
        Commands::Push { document } => {
            let config = load_config(&config_path)?;
            let local = load_local(&document, &config)?;
            let outcome = tokio::task::spawn_blocking(move || -> Result<_> {
                let store = GitHubStore::new(config.store_config())?;
                let sync = SyncLoop::new(store, config.sync_settings());
                Ok(sync.commit_now(&local)?)
            })
            .await??;
            println!("{:?}", outcome);
        }
        Commands::Pull { out } => {
            let config = load_config(&config_path)?;
            let (outcome, state) = tokio::task::spawn_blocking(move || -> Result<_> {
                let store = GitHubStore::new(config.store_config())?;
                let sync = SyncLoop::new(store, config.sync_settings());
                let mut state = SyncState::new();
                let outcome = sync.poll_now(&mut state);
                Ok((outcome, state))
            })
            .await??;

            let Some(peer) = state.peer_document else {
                bail!("No peer document available: {:?}", outcome);
            };
            write_output(out.as_deref(), &peer.to_json())?;
        }
        Commands::Seal {
            input,
            output,
            iterations,
        } => {
            let passphrase = read_passphrase()?;
            let plain = std::fs::read(&input)
                .with_context(|| format!("Cannot read {}", input.display()))?;
            let sealed = telepaint_core::seal(&plain, &passphrase, iterations)?;
            std::fs::write(&output, sealed)
                .with_context(|| format!("Cannot write {}", output.display()))?;
            info!("Sealed {} into {}", input.display(), output.display());
        }
        Commands::Open {
            input,
            output,
            iterations,
        } => {
            let passphrase = read_passphrase()?;
            let body = std::fs::read(&input)
                .with_context(|| format!("Cannot read {}", input.display()))?;
            let Some(record) = EnvelopeRecord::try_parse(&body) else {
                bail!("{} is not an envelope", input.display());
            };
            let plain = record.open(&passphrase, iterations)?;
            std::fs::write(&output, plain)
                .with_context(|| format!("Cannot write {}", output.display()))?;
            info!("Opened {} into {}", input.display(), output.display());
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<TelepaintConfig> {
    TelepaintConfig::load(path).with_context(|| format!("Loading config {}", path.display()))
}

/// Read a plaintext document and stamp it with this client's identity.
fn load_local(path: &Path, config: &TelepaintConfig) -> Result<Document> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    let parsed = parse_document(&bytes)?;
    if !parsed.is_clean() {
        warn!(
            "{}: skipped {} points and {} strokes",
            path.display(),
            parsed.skipped_points,
            parsed.skipped_strokes
        );
    }

    let mut document = parsed.document;
    document.session = config.session.clone();
    document.author = config.user_id.clone();
    document.timestamp = chrono::Utc::now().timestamp().max(0) as u64;
    Ok(document)
}

fn write_output(out: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match out {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("Cannot write {}", path.display())),
        None => {
            println!("{}", String::from_utf8_lossy(bytes));
            Ok(())
        }
    }
}

fn read_passphrase() -> Result<Passphrase> {
    if let Some(passphrase) = std::env::var(PASSPHRASE_ENV)
        .ok()
        .and_then(Passphrase::non_empty)
    {
        return Ok(passphrase);
    }

    let entered = rpassword::prompt_password("Passphrase: ")?;
    match Passphrase::non_empty(entered) {
        Some(passphrase) => Ok(passphrase),
        None => bail!("Passphrase cannot be empty"),
    }
}

async fn run<S, F>(make_store: F, config: TelepaintConfig, path: PathBuf, tick: Duration) -> Result<()>
where
    S: ContentStore + 'static,
    F: FnOnce() -> store::Result<S> + Send + 'static,
{
    let initial = load_local(&path, &config).unwrap_or_else(|e| {
        warn!("Starting with an empty document: {:#}", e);
        Document::new(config.session.clone(), config.user_id.clone(), 0)
    });

    let handle = SyncWorker::spawn(make_store, config.sync_settings(), tick, initial);
    let mut peer_updates = handle.peer_updates();
    let mut ticker = tokio::time::interval(tick);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, shutting down");
                break;
            }
            changed = peer_updates.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(peer) = peer_updates.borrow_and_update().as_ref() {
                    info!(
                        "Peer {} now has {} strokes ({} points)",
                        peer.author,
                        peer.strokes.len(),
                        peer.point_count()
                    );
                }
            }
            _ = ticker.tick() => {
                if handle.is_finished() {
                    break;
                }
                match load_local(&path, &config) {
                    Ok(document) => handle.publish_local(document),
                    Err(e) => warn!("Keeping previous local document: {:#}", e),
                }
            }
        }
    }

    let state = handle.shutdown().await?;
    let outcome = match state.peer_document {
        Some(_) => "with a peer document",
        None => "without a peer document",
    };
    info!("Stopped {}", outcome);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_flags() {
        let cli = Cli::try_parse_from([
            "telepaint",
            "--config",
            "/tmp/c.json",
            "run",
            "--document",
            "frame.json",
            "--tick-ms",
            "100",
            "--offline",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.json")));
        match cli.command {
            Commands::Run {
                tick_ms, offline, ..
            } => {
                assert_eq!(tick_ms, 100);
                assert!(offline);
            }
            _ => panic!("expected run"),
        }
    }

    #[test]
    fn seal_defaults_iterations() {
        let cli =
            Cli::try_parse_from(["telepaint", "seal", "--input", "a", "--output", "b"]).unwrap();
        match cli.command {
            Commands::Seal { iterations, .. } => assert_eq!(iterations, DEFAULT_PBKDF2_ITERATIONS),
            _ => panic!("expected seal"),
        }
    }
}
