mod output;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use merkledag_core::{
    Algorithm, DagBuilder, FsStore, Hash, ObjectKind, WalkOptions, node_from_path, resolve_hash,
};
use output::{
    AddReport, AddedRoot, InitReport, LinkEntry, LsReport, MaterializeReport, OutputWriter,
    StatReport,
};
use std::fmt::Write as _;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Merkledag - content-addressed Merkle DAG over files and directories
#[derive(Parser)]
#[command(name = "merkledag")]
#[command(about = "Content-addressed Merkle DAG over files and directories", long_about = None)]
#[command(version)]
struct Cli {
    /// Store root directory
    #[arg(
        short,
        long,
        global = true,
        env = "MERKLEDAG_ROOT",
        default_value = "./merkledag-store"
    )]
    root: PathBuf,

    /// Emit results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log debug output to stderr (overrides MERKLEDAG_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new store
    Init {
        /// Hash algorithm to use (blake3 or sha256)
        #[arg(long, default_value = "blake3")]
        algo: String,
    },

    /// Add files or directories to the store
    Add {
        /// Paths to add
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        /// Threads used to store sibling files
        #[arg(long, default_value_t = 1)]
        workers: usize,

        /// Skip entries matched by .gitignore files
        #[arg(long)]
        gitignore: bool,
    },

    /// Write file content to stdout (a directory prints its encoded object)
    Cat {
        /// Root hash
        hash: String,

        /// Path below the root
        path: Option<String>,
    },

    /// List the links of an object
    Ls {
        /// Root hash
        hash: String,

        /// Path below the root
        path: Option<String>,

        /// Show hashes and sizes
        #[arg(short, long)]
        long: bool,
    },

    /// Show object metadata
    Stat {
        /// Hash of the object
        hash: String,
    },

    /// Recreate a stored file or directory on the filesystem
    Materialize {
        /// Hash of the object to materialize
        hash: String,

        /// Destination path (must not exist)
        dest: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = OutputWriter::new(cli.json);
    match run(cli, &output) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output.emit_error(&e, 1);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("MERKLEDAG_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .init();
}

fn run(cli: Cli, output: &OutputWriter) -> Result<()> {
    let root = cli.root;
    match cli.command {
        Commands::Init { algo } => cmd_init(&root, &algo, output),
        Commands::Add {
            paths,
            workers,
            gitignore,
        } => cmd_add(&root, paths, workers, gitignore, output),
        Commands::Cat { hash, path } => cmd_cat(&root, &hash, path.as_deref().unwrap_or("")),
        Commands::Ls { hash, path, long } => {
            cmd_ls(&root, &hash, path.as_deref().unwrap_or(""), long, output)
        }
        Commands::Stat { hash } => cmd_stat(&root, &hash, output),
        Commands::Materialize { hash, dest } => cmd_materialize(&root, &hash, &dest, output),
    }
}

fn open_store(root: &Path) -> Result<FsStore> {
    FsStore::open(root).with_context(|| format!("Failed to open store at {}", root.display()))
}

fn parse_hash(hash_str: &str) -> Result<Hash> {
    Hash::from_hex(hash_str).with_context(|| format!("Invalid hash: {}", hash_str))
}

fn cmd_init(root: &Path, algo: &str, output: &OutputWriter) -> Result<()> {
    let algorithm = Algorithm::parse(algo)?;

    FsStore::init(root, algorithm)
        .with_context(|| format!("Failed to initialize store at {}", root.display()))?;

    let report = InitReport {
        root: root.display().to_string(),
        algorithm: algorithm.as_str().to_string(),
    };
    output.emit(&report, || {
        format!(
            "Initialized merkledag store at {}\nAlgorithm: {}\n",
            root.display(),
            algorithm
        )
    })
}

fn cmd_add(
    root: &Path,
    paths: Vec<PathBuf>,
    workers: usize,
    gitignore: bool,
    output: &OutputWriter,
) -> Result<()> {
    let store = open_store(root)?;
    let builder = DagBuilder::new(&store, store.algorithm()).workers(workers);
    let options = WalkOptions {
        git_ignore: gitignore,
    };

    let mut roots = Vec::with_capacity(paths.len());
    for path in paths {
        debug!(path = %path.display(), workers, gitignore, "adding path");
        let node = node_from_path(&path, options)
            .with_context(|| format!("Failed to read path: {}", path.display()))?;
        let hash = builder
            .add(&node)
            .with_context(|| format!("Failed to add path: {}", path.display()))?;
        roots.push(AddedRoot {
            hash,
            path: path.display().to_string(),
        });
    }

    let report = AddReport { roots };
    output.emit(&report, || {
        let mut text = String::new();
        for added in &report.roots {
            let _ = writeln!(text, "{} {}", added.hash, added.path);
        }
        text
    })
}

fn cmd_cat(root: &Path, hash_str: &str, path: &str) -> Result<()> {
    let store = open_store(root)?;
    let root_hash = parse_hash(hash_str)?;

    let hash = resolve_hash(&store, &root_hash, path)
        .with_context(|| format!("Failed to resolve '{}' under {}", path, root_hash))?;
    let object = merkledag_core::get(&store, &hash)?;

    let stdout = io::stdout();
    let mut handle = stdout.lock();

    if object.kind()? == ObjectKind::Tree {
        handle.write_all(&object.encode()?)?;
    } else {
        merkledag_core::write_file(&store, &hash, &mut handle)
            .with_context(|| format!("Failed to output file {}", hash))?;
    }
    handle.flush()?;

    Ok(())
}

fn cmd_ls(
    root: &Path,
    hash_str: &str,
    path: &str,
    long: bool,
    output: &OutputWriter,
) -> Result<()> {
    let store = open_store(root)?;
    let root_hash = parse_hash(hash_str)?;

    let hash = resolve_hash(&store, &root_hash, path)
        .with_context(|| format!("Failed to resolve '{}' under {}", path, root_hash))?;
    let object = merkledag_core::get(&store, &hash)?;
    let kind = object.kind()?;
    let data_len = object.data.len();

    let report = LsReport {
        hash,
        kind: kind.as_str(),
        links: object.links.into_iter().map(LinkEntry::from).collect(),
    };
    output.emit(&report, || {
        let mut text = String::new();
        if kind == ObjectKind::Blob {
            let _ = writeln!(text, "blob {} bytes", data_len);
        }
        for link in &report.links {
            if long {
                let _ = writeln!(text, "{} {:>12} {}", link.hash, link.size, link.name);
            } else if link.name.is_empty() {
                let _ = writeln!(text, "{}", link.hash);
            } else {
                let _ = writeln!(text, "{}", link.name);
            }
        }
        text
    })
}

fn cmd_stat(root: &Path, hash_str: &str, output: &OutputWriter) -> Result<()> {
    let store = open_store(root)?;
    let hash = parse_hash(hash_str)?;

    let object = merkledag_core::get(&store, &hash)
        .with_context(|| format!("Failed to read object {}", hash))?;
    let kind = object.kind()?;
    let encoded_size = object.encode()?.len() as u64;
    let size = if object.links.is_empty() {
        object.data.len() as u64
    } else {
        object.links_size()
    };

    let report = StatReport {
        hash,
        kind: kind.as_str(),
        links: object.links.len(),
        size,
        encoded_size,
        location: store.object_path(hash.as_bytes()).display().to_string(),
    };
    output.emit(&report, || {
        let mut text = String::new();
        let _ = writeln!(text, "Hash: {}", report.hash);
        let _ = writeln!(text, "Type: {}", report.kind);
        let _ = writeln!(text, "Links: {}", report.links);
        let _ = writeln!(text, "Size: {} bytes", report.size);
        let _ = writeln!(text, "Encoded: {} bytes", report.encoded_size);
        let _ = writeln!(text, "Location: {}", report.location);
        text
    })
}

fn cmd_materialize(root: &Path, hash_str: &str, dest: &Path, output: &OutputWriter) -> Result<()> {
    let store = open_store(root)?;
    let hash = parse_hash(hash_str)?;

    merkledag_core::materialize(&store, &hash, dest)
        .with_context(|| format!("Failed to materialize {} to {}", hash, dest.display()))?;

    let report = MaterializeReport {
        hash,
        destination: dest.display().to_string(),
    };
    output.emit(&report, || {
        format!("Materialized {} to {}\n", hash, dest.display())
    })
}
