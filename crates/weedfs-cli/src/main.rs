//! weed: command-line client for a master/volume/filer blob store.
//!
//! Reads WEED_MASTER_URL, WEED_FILER_URL and friends from the environment or `.env`.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::Serialize;
use weedfs_cli::{init_tracing, upload_name};
use weedfs_client::WeedClient;
use weedfs_core::{ClientConfig, OperationResult};

#[derive(Parser)]
#[command(name = "weed", about = "weedfs blob store CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reserve new file ids
    Assign {
        #[arg(long, default_value = "1")]
        count: u32,
    },
    /// Upload a local file, under a new fid unless --fid is given
    Put {
        file: PathBuf,
        /// Overwrite this fid instead of assigning a new one
        #[arg(long)]
        fid: Option<String>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Download a blob
    Get {
        fid: String,
        /// Write content here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    Delete {
        fid: String,
    },
    Exists {
        fid: String,
    },
    /// Print a volume server URL for a fid
    Url {
        fid: String,
        #[arg(long)]
        public: bool,
    },
    /// Show the volume servers holding a volume
    Lookup {
        volume: String,
    },
    /// Copy one blob over another
    Cp {
        src: String,
        dst: String,
    },
    /// Force garbage collection
    Vacuum {
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Cluster topology from the master
    Status,
    /// Status of a single volume server
    VolumeStatus {
        url: String,
    },
    /// List a filer directory
    FilerLs {
        dir: String,
    },
}

fn print_json(value: &impl Serialize) -> anyhow::Result<()> {
    let out = serde_json::to_string_pretty(value).context("Serialize response")?;
    println!("{}", out);
    Ok(())
}

/// Print the result and turn a Failed status into a non-zero exit.
fn finish(result: &OperationResult) -> anyhow::Result<()> {
    print_json(result)?;
    if !result.is_success() {
        anyhow::bail!("{}", result.message);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ClientConfig::from_env().context("Invalid WEED_* configuration")?;
    let client = WeedClient::new(config).context("Failed to create weedfs client")?;

    let cli = Cli::parse();

    match cli.command {
        Commands::Assign { count } => {
            let fids: Vec<String> = client
                .acquire_fids(count)
                .await?
                .into_iter()
                .map(|f| f.to_string())
                .collect();
            print_json(&fids)?;
        }
        Commands::Put { file, fid, name } => {
            let content = tokio::fs::read(&file)
                .await
                .with_context(|| format!("Read {}", file.display()))?;
            let name = upload_name(&file, name.as_deref());
            let result = client.put(content, fid.as_deref(), &name).await;
            finish(&result)?;
        }
        Commands::Get { fid, output } => {
            let result = client.read(&fid, "").await;
            match output {
                Some(path) if result.is_success() => {
                    tokio::fs::write(&path, &result.content)
                        .await
                        .with_context(|| format!("Write {}", path.display()))?;
                    finish(&result)?;
                }
                _ if result.is_success() => {
                    use std::io::Write;
                    std::io::stdout()
                        .write_all(&result.content)
                        .context("Write content to stdout")?;
                }
                _ => finish(&result)?,
            }
        }
        Commands::Delete { fid } => {
            let result = client.delete(&fid, "").await;
            finish(&result)?;
        }
        Commands::Exists { fid } => {
            let exists = client.exists(&fid).await;
            print_json(&serde_json::json!({ "fid": fid, "exists": exists }))?;
        }
        Commands::Url { fid, public } => {
            let url = client.get_url(&fid, public).await?;
            print_json(&serde_json::json!({ "fid": fid, "url": url }))?;
        }
        Commands::Lookup { volume } => {
            let locations = client.master().resolve(&volume).await?;
            print_json(&serde_json::json!({ "volumeId": volume, "locations": locations }))?;
        }
        Commands::Cp { src, dst } => {
            let result = client.copy(&src, &dst, "").await;
            finish(&result)?;
        }
        Commands::Vacuum { threshold } => {
            let status = client.master().vacuum(threshold).await?;
            print_json(&status)?;
        }
        Commands::Status => {
            let status = client.master().status().await?;
            print_json(&status)?;
        }
        Commands::VolumeStatus { url } => {
            let status = client.volume(&url).status().await?;
            print_json(&status)?;
        }
        Commands::FilerLs { dir } => {
            let listing = client.filer()?.list(&dir).await?;
            print_json(&listing)?;
        }
    }

    Ok(())
}
