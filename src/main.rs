//! autoplug Command Line Interface
//!
//! Inspect the autoplug catalog and build audio decoding chains.

use autoplug::typefind::{self, MediaInfo};
use autoplug::{AutoplugConfig, Caps, Catalog, Session, intersect};
use clap::{Parser, Subcommand};
use log::info;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "autoplug")]
#[command(about = "Rank-driven audio autoplugger", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (TOML)
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Registry file replacing the built-in registry
    #[arg(short, long, global = true, value_name = "FILE")]
    registry: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the units eligible for autoplugging, highest rank first
    Catalog,

    /// Intersect two caps strings
    Intersect {
        /// First caps
        a: String,
        /// Second caps
        b: String,
    },

    /// Detect the media type of a file
    Typefind {
        /// Input media file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Build the decoding chain for a file or a given type
    Plug {
        /// Input media file
        #[arg(value_name = "FILE", required_unless_present = "caps")]
        input: Option<PathBuf>,

        /// Input type, instead of detecting it from a file
        #[arg(long, conflicts_with = "input")]
        caps: Option<String>,

        /// Elementary stream carried by the input (repeatable)
        #[arg(long = "stream", value_name = "CAPS")]
        streams: Vec<String>,

        /// Write the resulting graph in Graphviz format
        #[arg(long, value_name = "FILE")]
        dot: Option<PathBuf>,
    },
}

fn load_config(cli: &Cli) -> Result<AutoplugConfig, Box<dyn std::error::Error>> {
    let mut config = match &cli.config {
        Some(path) => AutoplugConfig::from_file(path)?,
        None => AutoplugConfig::default(),
    };
    if let Some(path) = &cli.registry {
        config.registry = Some(path.clone());
    }
    Ok(config)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging
    if cli.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Info)
            .init();
    }

    info!("autoplug {}", autoplug::VERSION);

    let config = load_config(&cli)?;

    match cli.command {
        Commands::Catalog => {
            let registry = config.load_registry()?;
            let catalog = Catalog::build(&registry, &config.catalog_filter());
            println!("{} of {} factories eligible", catalog.len(), registry.len());
            for factory in &catalog {
                println!("{:>5}  {:<20} {}", factory.rank.0, factory.name, factory.klass);
            }
        }
        Commands::Intersect { a, b } => {
            let a = Caps::parse(&a)?;
            let b = Caps::parse(&b)?;
            match intersect(&a, &b) {
                Some(caps) => println!("{}", caps),
                None => println!("EMPTY"),
            }
        }
        Commands::Typefind { input } => {
            let media = typefind::type_find_file(&input)?;
            println!("{}: {}", input.display(), media.caps);
            for (i, stream) in media.streams.iter().enumerate() {
                println!("  stream {}: {}", i, stream);
            }
        }
        Commands::Plug {
            input,
            caps,
            streams,
            dot,
        } => {
            let mut media = match (input, caps) {
                (Some(path), _) => typefind::type_find_file(&path)?,
                (None, Some(caps)) => MediaInfo::new(Caps::parse(&caps)?),
                (None, None) => return Err("either FILE or --caps is required".into()),
            };
            for stream in &streams {
                media.streams.push(Caps::parse(stream)?);
            }

            let mut session = Session::from_config(config)?;
            let report = session.run(&media)?;

            for entry in &report.diagnostics {
                println!("{:<32} {}", entry.pad, entry.outcome);
            }
            println!();
            for (src, sink) in &report.links {
                println!("{} -> {}", src, sink);
            }

            if let Some(path) = dot {
                std::fs::write(&path, session.to_dot())?;
                info!("Graph written to {}", path.display());
            }

            if !report.terminated {
                return Err("no audio path reached the sink".into());
            }
        }
    }

    Ok(())
}
