//! TinaBridge command-line interface
//!
//! Resolve connection strings, run document operations against the
//! selected backend, and serve a backend over HTTP for local development.
//!
//! # Examples
//!
//! ```bash
//! # Which backend does a connection string select?
//! tinabridge resolve https://content.tinajs.io/content/abc123/github/main
//!
//! # Serve the current checkout
//! tinabridge --url http://localhost:4001/graphql serve --port 4001
//!
//! # Write and read a document
//! tinabridge put content/posts/hello.md --value "# Hello"
//! tinabridge get content/posts/hello.md
//!
//! # Mirror content into the local store
//! tinabridge build content/
//! ```

use anyhow::{bail, Context};
use clap::{ArgGroup, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tinabridge::backend::Backend;
use tinabridge::bridge::MemoryBridge;
use tinabridge::server::start_server;
use tinabridge::{BridgeConfig, ConnectionDescriptor, DocumentBridge, EventBus};
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// TinaBridge - pluggable document storage for the Tina content layer
#[derive(Parser, Debug)]
#[command(name = "tinabridge")]
#[command(version = tinabridge::VERSION)]
#[command(about = "Pluggable document storage for the Tina content layer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(long, global = true, env = "TINA_CONFIG")]
    config: Option<PathBuf>,

    /// Connection string; overrides `content_url` from the configuration
    #[arg(long, global = true, env = "TINA_URL")]
    url: Option<String>,

    /// Log directory path
    #[arg(long, global = true, default_value = "logs", env = "TINA_LOG_DIR")]
    log_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error); `RUST_LOG` directives
    /// are applied on top
    #[arg(long, global = true, default_value = "info", env = "TINA_LOG_LEVEL")]
    log_level: String,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the selected backend over HTTP
    Serve(ServeArgs),

    /// Show which backend a connection string selects
    Resolve {
        /// Connection string
        #[arg(value_name = "URL")]
        connection: String,
    },

    /// Print a document (empty when missing)
    Get {
        /// Document path
        path: String,
    },

    /// Create or overwrite a document
    Put(PutArgs),

    /// List document paths under a prefix
    Glob {
        /// Path prefix
        prefix: String,
    },

    /// Delete a document
    Delete {
        /// Document path
        path: String,
    },

    /// Mirror documents into the local store
    Build {
        /// Path prefix (everything when omitted)
        #[arg(default_value = "")]
        prefix: String,
    },

    /// Show version
    Version,
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// HTTP bind address
    #[arg(short, long, env = "TINA_BIND")]
    bind: Option<String>,

    /// HTTP port
    #[arg(short, long, env = "TINA_PORT")]
    port: Option<u16>,

    /// Bearer token required on content routes
    #[arg(long, env = "TINA_SERVER_TOKEN")]
    token: Option<String>,

    /// Disable CORS
    #[arg(long)]
    no_cors: bool,

    /// Serve an empty in-memory store instead of the configured backend
    #[arg(long)]
    memory: bool,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["file", "value"])))]
struct PutArgs {
    /// Document path
    path: String,

    /// Read the payload from a file
    #[arg(long)]
    file: Option<PathBuf>,

    /// Payload given inline
    #[arg(long)]
    value: Option<String>,

    /// Write as a configuration document
    #[arg(long)]
    config_doc: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(&cli)?;

    let mut config = BridgeConfig::load(cli.config.as_deref())?;
    if let Some(url) = &cli.url {
        config.content_url = url.clone();
    }
    debug!(content_url = %config.content_url, "Configuration loaded");

    match cli.command {
        Commands::Serve(args) => serve_command(config, args).await,
        Commands::Resolve { connection } => resolve_command(&config, &connection),
        Commands::Get { path } => {
            let bridge = open_bridge(&config)?;
            print!("{}", bridge.get(&path).await?);
            Ok(())
        }
        Commands::Put(args) => put_command(&config, args).await,
        Commands::Glob { prefix } => {
            let bridge = open_bridge(&config)?;
            let mut paths = bridge.glob(&prefix).await?;
            paths.sort();
            for path in paths {
                println!("{}", path);
            }
            Ok(())
        }
        Commands::Delete { path } => {
            let db = open_backend(&config)?.into_database(&config.store).await?;
            db.delete_document(&path).await?;
            println!("Deleted {}", path);
            Ok(())
        }
        Commands::Build { prefix } => {
            let db = open_backend(&config)?.into_database(&config.store).await?;
            let report = db.build(&prefix).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(())
        }
        Commands::Version => {
            println!("tinabridge {}", tinabridge::VERSION);
            Ok(())
        }
    }
}

/// Setup logging with rolling files and console output
fn setup_logging(cli: &Cli) -> anyhow::Result<()> {
    std::fs::create_dir_all(&cli.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &cli.log_dir, "tinabridge.log");

    let log_level = cli
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    // Console goes to stderr so document payloads on stdout stay clean.
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(!cli.no_color),
        )
        .with(fmt::layer().with_writer(file_appender).with_ansi(false))
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .init();

    Ok(())
}

fn resolve(config: &BridgeConfig) -> anyhow::Result<ConnectionDescriptor> {
    config
        .resolver()
        .parse(&config.content_url)
        .with_context(|| format!("cannot resolve connection string {:?}", config.content_url))
}

fn open_backend(config: &BridgeConfig) -> anyhow::Result<Backend> {
    let descriptor = resolve(config)?;
    Ok(Backend::open(&descriptor, config)?)
}

fn open_bridge(config: &BridgeConfig) -> anyhow::Result<DocumentBridge> {
    match open_backend(config)? {
        Backend::Hosted { content_url } => {
            bail!("{} is served by the hosted content API; no local bridge", content_url)
        }
        backend => Ok(backend.into_bridge()?),
    }
}

fn resolve_command(config: &BridgeConfig, url: &str) -> anyhow::Result<()> {
    let descriptor = config.resolver().parse(url)?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    if let Some(content_url) = descriptor.hosted_content_url(&config.hosted_host) {
        println!("content url: {}", content_url);
    }
    Ok(())
}

async fn put_command(config: &BridgeConfig, args: PutArgs) -> anyhow::Result<()> {
    let payload = match (&args.file, args.value) {
        (Some(file), _) => tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("cannot read {}", file.display()))?,
        (None, Some(value)) => value,
        (None, None) => bail!("either --file or --value is required"),
    };

    let db = open_backend(config)?.into_database(&config.store).await?;
    if args.config_doc {
        db.put_config(&args.path, &payload).await?;
    } else {
        db.put_document(&args.path, &payload).await?;
    }
    println!("Wrote {} ({} bytes)", args.path, payload.len());
    Ok(())
}

async fn serve_command(config: BridgeConfig, args: ServeArgs) -> anyhow::Result<()> {
    info!(version = %tinabridge::VERSION, "TinaBridge starting");

    let events = Arc::new(EventBus::new());
    let bridge = if args.memory {
        info!("Serving an in-memory store");
        DocumentBridge::new(Box::new(MemoryBridge::new())).with_events(events.clone())
    } else {
        match open_backend(&config)?.with_events(events.clone()) {
            Backend::Hosted { content_url } => {
                bail!("{} is the hosted content API; nothing to serve locally", content_url)
            }
            backend => backend.into_bridge()?,
        }
    };

    let mut server_config = config.server.clone();
    if let Some(bind) = args.bind {
        server_config.http_addr = bind;
    }
    if let Some(port) = args.port {
        server_config.http_port = port;
    }
    if args.token.is_some() {
        server_config.token = args.token;
    }
    if args.no_cors {
        server_config.enable_cors = false;
    }

    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => info!(event = event.name(), path = ?event.path(), "Content changed"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event listener lagged")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    start_server(server_config, Arc::new(bridge)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_log_level_has_its_own_env_var() {
        let command = Cli::command();
        let log_level = command
            .get_arguments()
            .find(|arg| arg.get_id() == "log_level")
            .expect("log_level argument");
        assert_eq!(
            log_level.get_env().and_then(|env| env.to_str()),
            Some("TINA_LOG_LEVEL")
        );
    }

    #[test]
    fn test_put_requires_a_source() {
        assert!(Cli::try_parse_from(["tinabridge", "put", "posts/a.md"]).is_err());
        let cli = Cli::try_parse_from(["tinabridge", "put", "posts/a.md", "--value", "# A"])
            .expect("put with value");
        assert!(matches!(cli.command, Commands::Put(PutArgs { value: Some(_), .. })));
    }
}
