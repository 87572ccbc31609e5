//! Gate Compiler CLI
//!
//! Command-line interface for generating the call boundary artifacts
//! from declaration manifests.

use clap::{CommandFactory, Parser as ClapParser, Subcommand};
use clap_complete::{Shell, generate};
use std::io;
use std::path::PathBuf;
use std::process;

#[derive(ClapParser)]
#[command(name = "gatec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Generate the secure call boundary between library and executor images", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the defs header, caller stubs and executor dispatcher
    Generate {
        /// Declaration manifest file(s), processed in order
        #[arg(required = true)]
        manifests: Vec<PathBuf>,

        /// Library name for constant naming and the frame tag
        /// (defaults to the first manifest's [library] table)
        #[arg(long)]
        libname: Option<String>,

        /// Output path of the identifier defs header
        #[arg(long)]
        defs: PathBuf,

        /// Output path of the caller stub source
        #[arg(long)]
        stubs: PathBuf,

        /// Output path of the executor dispatch source
        #[arg(long)]
        dispatch: PathBuf,

        /// Persisted identifier ledger, read and rewritten in place
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Emit the response identifier integrity check
        #[arg(long)]
        hardened: bool,
    },

    /// Print canonical prototypes and identifiers without writing artifacts
    Inspect {
        /// Declaration manifest file(s), processed in order
        #[arg(required = true)]
        manifests: Vec<PathBuf>,

        /// Library name (defaults to the first manifest's [library] table)
        #[arg(long)]
        libname: Option<String>,

        /// Persisted identifier ledger to consult (read-only)
        #[arg(long)]
        ledger: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            manifests,
            libname,
            defs,
            stubs,
            dispatch,
            ledger,
            hardened,
        } => {
            run_generate(&manifests, libname, defs, stubs, dispatch, ledger, hardened);
        }
        Commands::Inspect {
            manifests,
            libname,
            ledger,
        } => {
            run_inspect(&manifests, libname, ledger);
        }
        Commands::Completions { shell } => {
            run_completions(shell);
        }
    }
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "gatec", &mut io::stdout());
}

fn run_generate(
    manifests: &[PathBuf],
    libname: Option<String>,
    defs: PathBuf,
    stubs: PathBuf,
    dispatch: PathBuf,
    ledger: Option<PathBuf>,
    hardened: bool,
) {
    let mut config = gatec::GeneratorConfig::new().with_hardened(hardened);
    config.library_name = libname;
    config.ledger_path = ledger;

    let outputs = gatec::ArtifactPaths {
        defs,
        stubs,
        dispatch,
    };

    match gatec::generate_files(manifests, &outputs, &config) {
        Ok(()) => {
            println!("defs:     {}", outputs.defs.display());
            println!("stubs:    {}", outputs.stubs.display());
            println!("dispatch: {}", outputs.dispatch.display());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn run_inspect(manifests: &[PathBuf], libname: Option<String>, ledger: Option<PathBuf>) {
    let result = inspect(manifests, libname, ledger);
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn inspect(
    manifests: &[PathBuf],
    libname: Option<String>,
    ledger_path: Option<PathBuf>,
) -> Result<(), gatec::Error> {
    let (declarations, manifest_library) = gatec::manifest::load_manifests(manifests)?;
    let library_name = libname.or(manifest_library);

    let ledger = match &ledger_path {
        Some(path) => gatec::Ledger::load(path)?,
        None => gatec::Ledger::new(),
    };

    let allocation = gatec::alloc::allocate(&declarations, &ledger)?;
    for call in &allocation.calls {
        println!("{}", call.prototype.trim_end());
        println!("  digest:   {}", call.digest_hex);
        println!("  sequence: {}", call.ids.sequence);
        println!("  id_in:    0x{:08x}", call.ids.id_in);
        println!("  id_out:   0x{:08x}", call.ids.id_out);
        if let Some(name) = &library_name {
            println!(
                "  defines:  {} / {}",
                gatec::codegen::const_id_in(name, &call.declaration.name),
                gatec::codegen::const_id_out(name, &call.declaration.name),
            );
        }
        println!();
    }
    println!(
        "{} call(s), {} ledger entries",
        allocation.calls.len(),
        allocation.ledger.len()
    );
    Ok(())
}
