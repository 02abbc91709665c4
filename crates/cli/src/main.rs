//! BRS command line interface.
//!
//! One operation per invocation: the manager is wired from the settings
//! file, the operation runs, and the unit of work is committed on success
//! or swept on failure. Durable records live in a YAML record store next to
//! the configured storages.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::io::{Read, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brs_core::{
    BackendRegistry, ResourceManager, Settings, Sha1Hash, YamlFileDriver,
    DEFAULT_PERSISTENT_COLLECTION_NAME,
};

#[derive(Parser)]
#[command(name = "brs")]
#[command(about = "BRS binary resource store CLI")]
struct Cli {
    /// Path to the settings file
    #[arg(long, global = true, default_value = "brs.yaml")]
    config: PathBuf,

    /// Root directory of the durable record store
    #[arg(long, global = true, default_value = "records")]
    records: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a file as a persistent resource
    Import {
        /// File to import
        file: PathBuf,
        /// Collection to import into
        #[arg(long, default_value = DEFAULT_PERSISTENT_COLLECTION_NAME)]
        collection: String,
    },
    /// Import content from stdin under the given filename
    ImportContent {
        /// Filename for the new resource (drives the media type)
        filename: String,
        /// Collection to import into
        #[arg(long, default_value = DEFAULT_PERSISTENT_COLLECTION_NAME)]
        collection: String,
    },
    /// Write a resource's content to stdout
    Cat {
        /// SHA-1 hash of the content
        sha1: String,
    },
    /// Print the public URI of a resource
    Uri {
        /// SHA-1 hash of the content
        sha1: String,
        /// Collection the resource belongs to
        #[arg(long, default_value = DEFAULT_PERSISTENT_COLLECTION_NAME)]
        collection: String,
    },
    /// Delete a resource (and its bytes, if unreferenced)
    Delete {
        /// SHA-1 hash of the content
        sha1: String,
        /// Keep the published file in place
        #[arg(long)]
        keep_published: bool,
    },
    /// List all resource records
    List,
    /// Publish every resource of a collection
    Publish {
        /// Collection to publish
        collection: String,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let settings = Settings::from_yaml_file(&cli.config)
        .with_context(|| format!("loading settings from {}", cli.config.display()))?;
    let driver = YamlFileDriver::open(&cli.records)
        .with_context(|| format!("opening record store at {}", cli.records.display()))?;
    let mut manager = ResourceManager::new(
        &settings,
        &BackendRegistry::with_defaults(),
        Box::new(driver),
    )
    .context("building the resource manager")?;
    tracing::debug!(
        "resource manager ready (settings: {}, records: {})",
        cli.config.display(),
        cli.records.display()
    );

    match run(&mut manager, cli.command) {
        Ok(()) => {
            manager.commit().context("committing the unit of work")?;
            Ok(())
        }
        Err(e) => {
            // The operation failed: sweep storage data of anything imported
            // but never committed, then report the original failure.
            manager.shutdown();
            Err(e)
        }
    }
}

fn run(manager: &mut ResourceManager, command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Import { file, collection } => {
            let resource = manager.import_resource(&file, &collection)?;
            let sha1 = resource
                .sha1()
                .map(|hash| hash.to_string())
                .unwrap_or_default();
            println!("Imported: {} ({} bytes)", sha1, resource.file_size());
            if let Some(uri) = manager.public_persistent_resource_uri(&resource) {
                println!("URI: {}", uri);
            }
        }
        Commands::ImportContent {
            filename,
            collection,
        } => {
            let mut content = Vec::new();
            std::io::stdin()
                .read_to_end(&mut content)
                .context("reading content from stdin")?;

            let resource =
                manager.import_resource_from_content(&content, &filename, &collection)?;
            let sha1 = resource
                .sha1()
                .map(|hash| hash.to_string())
                .unwrap_or_default();
            println!("Imported: {} ({} bytes)", sha1, resource.file_size());
        }
        Commands::Cat { sha1 } => {
            let sha1 = Sha1Hash::parse(&sha1)?;
            let resource = manager
                .resource_by_sha1(&sha1)?
                .with_context(|| format!("no resource found for hash {}", sha1))?;
            let mut stream = manager
                .stream_by_resource(&resource)
                .with_context(|| format!("no storage data available for hash {}", sha1))?;

            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            std::io::copy(&mut stream, &mut handle).context("writing content to stdout")?;
            handle.flush().ok();
        }
        Commands::Uri { sha1, collection } => {
            let sha1 = Sha1Hash::parse(&sha1)?;
            let uri = manager.public_persistent_resource_uri_by_hash(&sha1, &collection)?;
            println!("{}", uri);
        }
        Commands::Delete {
            sha1,
            keep_published,
        } => {
            let sha1 = Sha1Hash::parse(&sha1)?;
            let mut resource = manager
                .resource_by_sha1(&sha1)?
                .with_context(|| format!("no resource found for hash {}", sha1))?;

            if manager.delete_resource(&mut resource, !keep_published) {
                println!("Deleted: {}", sha1);
            } else {
                // The record is gone either way; only the storage-side
                // cleanup failed. Keep the commit so both views agree.
                eprintln!(
                    "warning: the record for {} was removed, but its storage data could not be deleted",
                    sha1
                );
            }
        }
        Commands::List => {
            let resources = manager.resources()?;
            if resources.is_empty() {
                println!("No resources found.");
            } else {
                for resource in resources {
                    println!(
                        "{}  {:>10}  {}  {} [{}]",
                        resource
                            .sha1()
                            .map(|hash| hash.to_string())
                            .unwrap_or_else(|| "-".repeat(40)),
                        resource.file_size(),
                        resource.media_type(),
                        resource.filename(),
                        resource.collection_name(),
                    );
                }
            }
        }
        Commands::Publish { collection } => {
            manager.publish_collection(&collection)?;
            println!("Published collection '{}'.", collection);
        }
    }

    Ok(())
}
