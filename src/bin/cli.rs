//! ikv-tool CLI
//!
//! Pack a directory into an ikv file, look payloads up, inspect the footer.

use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use ikv::{Ikv, IkvConfig, IkvError, IkvWriter, Result};
use tracing_subscriber::{fmt, EnvFilter};
use xxhash_rust::xxh3::xxh3_64;

/// ikv CLI
#[derive(Parser, Debug)]
#[command(name = "ikv-tool")]
#[command(about = "Build and query integer-keyed indexed value files")]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Pack every file under a directory, keyed by relative path
    Pack {
        /// Directory to pack
        dir: PathBuf,

        /// Output ikv file
        out: PathBuf,

        /// Store offsets only (4-byte table records)
        #[arg(long)]
        no_size: bool,

        /// Perfect hash seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Print the payload of one key to stdout
    Get {
        /// ikv file
        file: PathBuf,

        /// Relative path used when packing
        #[arg(long, conflicts_with = "key", required_unless_present = "key")]
        name: Option<String>,

        /// Raw integer key
        #[arg(long, allow_hyphen_values = true)]
        key: Option<i32>,
    },

    /// Describe an ikv file
    Inspect {
        /// ikv file
        file: PathBuf,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

/// Key of a packed file: XXH3 of its `/`-separated relative path, low 32 bits
fn name_key(name: &str) -> i32 {
    xxh3_64(name.as_bytes()) as i32
}

/// Files under `dir` keyed by relative path, sorted, leaving out `skip`
fn collect_files(
    root: &Path,
    dir: &Path,
    skip: &Path,
    out: &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    let mut entries: Vec<_> = fs::read_dir(dir)?.collect::<std::io::Result<_>>()?;
    entries.sort_by_key(|e| e.file_name());
    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, skip, out)?;
        } else if fs::canonicalize(&path).is_ok_and(|p| p == skip) {
            tracing::debug!("Skipping output file {}", path.display());
        } else if let Ok(rel) = path.strip_prefix(root) {
            let name = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push((name, path));
        }
    }
    Ok(())
}

fn pack(dir: &Path, out: &Path, no_size: bool, seed: Option<u64>) -> Result<()> {
    let mut builder = IkvConfig::builder().write_size(!no_size);
    if let Some(seed) = seed {
        builder = builder.hash_seed(seed);
    }
    let config = builder.build();

    // Create the output first so a copy inside `dir` can be recognized
    let file = File::create(out)?;
    let out_canonical = fs::canonicalize(out)?;
    let mut files = Vec::new();
    collect_files(dir, dir, &out_canonical, &mut files)?;

    let mut seen: HashMap<i32, String> = HashMap::with_capacity(files.len());
    let mut writer = IkvWriter::with_config(file, &config)?;
    for (name, path) in files {
        let key = name_key(&name);
        if let Some(previous) = seen.get(&key) {
            return Err(IkvError::HashConstruction(format!(
                "{} and {} share key {}",
                previous, name, key
            )));
        }
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };
        writer.write(key, &data)?;
        seen.insert(key, name);
    }

    let info = writer.close()?;
    tracing::info!(
        "Packed {} files into {} ({} bytes)",
        info.index.entry_count,
        out.display(),
        info.file_length
    );
    Ok(())
}

fn get(file: &Path, name: Option<String>, key: Option<i32>) -> Result<()> {
    let key = match (name, key) {
        (_, Some(key)) => key,
        (Some(name), None) => name_key(&name),
        (None, None) => return Err(IkvError::Config("either --name or --key is required".into())),
    };

    let ikv = Ikv::open(file)?;
    let payload = if ikv.has_size() {
        ikv.get(key)?
    } else {
        ikv.get_unbounded(key)?
    };
    match payload {
        Some(bytes) => {
            use std::io::Write;
            std::io::stdout().write_all(bytes)?;
            Ok(())
        }
        None => {
            tracing::error!("Key {} not found", key);
            std::process::exit(1);
        }
    }
}

fn inspect(file: &Path, json: bool) -> Result<()> {
    let ikv = Ikv::open(file)?;
    let footer = ikv.footer();
    if json {
        let summary = serde_json::json!({
            "entry_count": footer.entry_count,
            "key_data_size": footer.key_data_size,
            "has_size": footer.has_size,
            "record_size": footer.record_size(),
            "data_length": ikv.data_len(),
            "index_length": footer.index_length(),
        });
        println!("{}", summary);
    } else {
        println!("entries:       {}", footer.entry_count);
        println!("key data:      {} bytes", footer.key_data_size);
        println!("sizes stored:  {}", footer.has_size);
        println!("record size:   {} bytes", footer.record_size());
        println!("data length:   {} bytes", ikv.data_len());
        println!("index length:  {} bytes", footer.index_length());
    }
    Ok(())
}

fn main() {
    // Initialize tracing/logging (stderr, stdout carries payloads)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,ikv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let result = match args.command {
        Commands::Pack {
            dir,
            out,
            no_size,
            seed,
        } => pack(&dir, &out, no_size, seed),
        Commands::Get { file, name, key } => get(&file, name, key),
        Commands::Inspect { file, json } => inspect(&file, json),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
