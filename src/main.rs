//! dag CLI - Command line interface for dagstore
//!
//! Drives a local store file or a remote object daemon, and exposes the
//! MIME classifier. Output is JSON so other tools can wrap it.

use clap::{Parser, Subcommand};
use dagstore::store::ContentAddressedStorage;
#[cfg(feature = "remote")]
use dagstore::RemoteConfig;
use dagstore::{mime, FileStore, MerkleNode, Multihash, WriterKey};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dag")]
#[command(about = "A content-addressed Merkle-DAG object store")]
#[command(version)]
struct Cli {
    /// Path to the local store file
    #[arg(short, long, default_value = "store.dag")]
    store: PathBuf,

    /// Use a remote daemon instead (URL or multiaddr, e.g. /ip4/127.0.0.1/tcp/5001)
    #[arg(long)]
    api: Option<String>,

    /// Writer identity as hex (default: null writer)
    #[arg(short, long, default_value = "null")]
    writer: String,

    /// Output format (json or text)
    #[arg(short, long, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the empty node
    New,

    /// Store a node built from data and links
    Put {
        /// Inline data payload
        #[arg(short, long, conflicts_with = "data_file")]
        data: Option<String>,
        /// Read the payload from a file
        #[arg(long)]
        data_file: Option<PathBuf>,
        /// Link as label=hash (repeatable)
        #[arg(short, long = "link")]
        links: Vec<String>,
    },

    /// Show a node's data and links
    Get {
        /// The node hash
        hash: String,
    },

    /// Show only a node's data
    Data {
        /// The node hash
        hash: String,
    },

    /// Replace a node's data (links are kept)
    SetData {
        /// The base node hash
        base: String,
        /// The new data
        data: String,
    },

    /// Add or replace a link on a node
    AddLink {
        /// The base node hash
        base: String,
        /// Link label
        label: String,
        /// Link target hash
        target: String,
    },

    /// Recursively pin a node
    Pin {
        /// The root hash
        hash: String,
    },

    /// Remove a recursive pin
    Unpin {
        /// The root hash
        hash: String,
    },

    /// Guess the MIME type of a file from its first bytes
    Mime {
        /// File to inspect
        path: PathBuf,
    },
}

/// The selected backend, kept concrete so local files can be flushed
enum Backend {
    File(FileStore),
    #[cfg(feature = "remote")]
    Remote(dagstore::RemoteStore),
}

impl Backend {
    async fn open(cli: &Cli) -> anyhow::Result<Self> {
        match &cli.api {
            #[cfg(feature = "remote")]
            Some(addr) => {
                let config = RemoteConfig::for_addr(addr)?;
                Ok(Backend::Remote(dagstore::RemoteStore::connect(config).await?))
            }
            #[cfg(not(feature = "remote"))]
            Some(_) => anyhow::bail!("Remote backend not enabled. Compile with --features remote"),
            None => Ok(Backend::File(FileStore::open_or_create(&cli.store)?)),
        }
    }

    fn store(&self) -> &dyn ContentAddressedStorage {
        match self {
            Backend::File(store) => store,
            #[cfg(feature = "remote")]
            Backend::Remote(store) => store,
        }
    }

    fn finish(self) -> anyhow::Result<()> {
        if let Backend::File(store) = self {
            store.sync()?;
        }
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Commands::Mime { path } = &cli.command {
        let mime_type = mime::classify_file(path)?;
        output(
            &cli.format,
            &serde_json::json!({
                "path": path.display().to_string(),
                "mime": mime_type
            }),
        );
        return Ok(());
    }

    let writer: WriterKey = cli
        .writer
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid writer key: {}", e))?;
    let backend = Backend::open(&cli).await?;
    let store = backend.store();
    let mut missing = None;

    match &cli.command {
        Commands::New => {
            let hash = store.create_empty(&writer).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "hash": hash.to_string()
                }),
            );
        }

        Commands::Put {
            data,
            data_file,
            links,
        } => {
            let payload = match (data, data_file) {
                (Some(text), _) => text.as_bytes().to_vec(),
                (None, Some(path)) => std::fs::read(path)?,
                (None, None) => Vec::new(),
            };
            let mut node = MerkleNode::new(payload);
            for link in links {
                let (label, target) = parse_link(link)?;
                node = node.with_link(label, target);
            }
            let hash = store.put(&writer, &node).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "hash": hash.to_string(),
                    "links": node.links.len()
                }),
            );
        }

        Commands::Get { hash } => {
            let hash = parse_hash(hash)?;
            match store.get_node(&hash).await? {
                Some(node) => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "hash": hash.to_string(),
                            "size": node.data.len(),
                            "data": String::from_utf8_lossy(&node.data),
                            "links": node.links
                        }),
                    );
                }
                None => missing = Some(not_found(&cli.format, hash)),
            }
        }

        Commands::Data { hash } => {
            let hash = parse_hash(hash)?;
            match store.get_data(&hash).await? {
                Some(data) => {
                    output(
                        &cli.format,
                        &serde_json::json!({
                            "hash": hash.to_string(),
                            "size": data.len(),
                            "data": String::from_utf8_lossy(&data)
                        }),
                    );
                }
                None => missing = Some(not_found(&cli.format, hash)),
            }
        }

        Commands::SetData { base, data } => {
            let base = parse_hash(base)?;
            let hash = store.set_data(&writer, &base, data.as_bytes()).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "hash": hash.to_string()
                }),
            );
        }

        Commands::AddLink {
            base,
            label,
            target,
        } => {
            let base = parse_hash(base)?;
            let target = parse_hash(target)?;
            let hash = store.add_link(&writer, &base, label, &target).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "status": "ok",
                    "hash": hash.to_string()
                }),
            );
        }

        Commands::Pin { hash } => {
            let hash = parse_hash(hash)?;
            let pinned = store.recursive_pin(&hash).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "hash": hash.to_string(),
                    "pinned": pinned
                }),
            );
        }

        Commands::Unpin { hash } => {
            let hash = parse_hash(hash)?;
            let removed = store.recursive_unpin(&hash).await?;
            output(
                &cli.format,
                &serde_json::json!({
                    "hash": hash.to_string(),
                    "unpinned": removed
                }),
            );
        }

        Commands::Mime { .. } => unreachable!("handled before opening a store"),
    }

    backend.finish()?;

    match missing {
        Some(hash) => anyhow::bail!("Object not found: {}", hash),
        None => Ok(()),
    }
}

fn parse_hash(s: &str) -> anyhow::Result<Multihash> {
    s.parse()
        .map_err(|e| anyhow::anyhow!("Invalid hash {}: {}", s, e))
}

fn parse_link(s: &str) -> anyhow::Result<(String, Multihash)> {
    let (label, target) = s
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("Link must look like label=hash: {}", s))?;
    Ok((label.to_string(), parse_hash(target)?))
}

/// Report a missing object on stdout; `main` turns it into a failed exit
fn not_found(format: &OutputFormat, hash: Multihash) -> Multihash {
    output(
        format,
        &serde_json::json!({
            "status": "error",
            "message": format!("Object not found: {}", hash)
        }),
    );
    hash
}

fn output(format: &OutputFormat, value: &serde_json::Value) {
    match format {
        OutputFormat::Json => {
            println!("{}", value);
        }
        OutputFormat::Text => {
            println!(
                "{}",
                serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
            );
        }
    }
}
