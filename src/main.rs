use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{fmt::format::FmtSpan, EnvFilter};

use sbml_tree::{read_file, write_file, write_string, Result};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Read a document and write it back
    Roundtrip {
        /// Input file path
        file: PathBuf,

        /// Output file path (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the node outline of a document
    Tree {
        /// Input file path
        file: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .without_time()
        .init();

    if let Err(e) = run() {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    match Args::parse().command {
        Command::Roundtrip { file, output } => {
            info!("Reading file: {}", file.display());
            let doc = read_file(&file)?;
            match output {
                Some(path) => {
                    write_file(&doc, &path)?;
                    info!("Wrote {}", path.display());
                }
                None => print!("{}", write_string(&doc)),
            }
        }
        Command::Tree { file } => {
            let doc = read_file(&file)?;
            print!("{}", doc.outline());
        }
    }
    Ok(())
}
