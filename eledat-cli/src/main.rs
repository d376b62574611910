use anyhow::Result;
use clap::{Parser, Subcommand};
use eledat_cli::{
    commands::{
        extract::{self, ExtractOptions},
        inspect,
    },
    LayoutArg, Traversal,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "eledat")]
#[command(about = "Eledat - Decode Element ICP-MS .dat files to CSV", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct CsvArgs {
    /// Dat files, or directories of dat files
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Add a comment line naming each file to the output
    #[arg(short, long)]
    comments: bool,

    /// Scan header layout
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,

    /// Directory for the combined output file
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode dat files through their scan index
    Extract(CsvArgs),

    /// Decode dat files with a damaged or missing index
    Recover(CsvArgs),

    /// Print a dat file's header as JSON
    Inspect {
        /// Input dat file
        #[arg(short, long)]
        input: String,

        /// Output JSON file
        #[arg(short, long)]
        output: Option<String>,

        /// Scan header layout
        #[arg(long, value_enum, default_value = "legacy")]
        layout: LayoutArg,
    },
}

fn csv_options(args: CsvArgs, traversal: Traversal) -> ExtractOptions {
    ExtractOptions {
        inputs: args.inputs,
        comments: args.comments,
        layout: args.layout.map(Into::into),
        output_dir: args.output_dir,
        traversal,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    // Execute command
    match cli.command {
        Commands::Extract(args) => {
            extract::execute(&csv_options(args, Traversal::Indexed)).map(|_| ())
        }
        Commands::Recover(args) => {
            extract::execute(&csv_options(args, Traversal::Recover)).map(|_| ())
        }
        Commands::Inspect {
            input,
            output,
            layout,
        } => inspect::execute(&input, output.as_deref(), layout.into()),
    }
}
