use clap::{Parser as ClapParser, Subcommand};
use clove_canon::cli::{self, CliError, HashOptions, NormalizeOptions, PathOptions};
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "clove-canon")]
#[command(about = "Structural hashing, equality and attribute-path canonicalization of expression trees")]
#[command(version)]
struct Cli {
    /// Pretty-print the output
    #[arg(short, long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Structural hash of a tree
    Hash {
        /// JSON-encoded tree (reads from stdin if not provided)
        tree: Option<String>,

        /// Seed folded into the hash
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },

    /// Structural equality of two trees
    Equal {
        /// Left JSON-encoded tree
        lhs: String,

        /// Right JSON-encoded tree
        rhs: String,
    },

    /// Canonical path string of an attribute path
    Path {
        /// JSON-encoded tree (reads from stdin if not provided)
        tree: Option<String>,

        /// Variable the path must start at
        #[arg(short, long = "ref")]
        reference: String,

        /// JSON object binding variables used by computed offsets
        #[arg(short, long)]
        bindings: Option<String>,
    },

    /// Normalize a comparison against a reference variable
    Normalize {
        /// JSON-encoded comparison (reads from stdin if not provided)
        tree: Option<String>,

        /// Reference variable
        #[arg(short, long = "ref")]
        reference: String,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Hash { tree, seed } => read_input(tree).and_then(|input| {
            cli::execute_hash(&HashOptions { input, seed })
        }),
        Commands::Equal { lhs, rhs } => cli::execute_equal(&lhs, &rhs),
        Commands::Path {
            tree,
            reference,
            bindings,
        } => read_input(tree).and_then(|input| {
            cli::execute_path(&PathOptions {
                input,
                reference,
                bindings,
            })
        }),
        Commands::Normalize { tree, reference } => read_input(tree).and_then(|input| {
            cli::execute_normalize(&NormalizeOptions { input, reference })
        }),
    };

    let output = result.and_then(|output| {
        if cli.pretty {
            serde_json::to_string_pretty(&output)
        } else {
            serde_json::to_string(&output)
        }
        .map_err(CliError::from)
    });

    match output {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}

fn read_input(tree: Option<String>) -> Result<String, CliError> {
    match tree {
        Some(s) => Ok(s),
        None if !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer)
        }
        None => Err(CliError::NoInput),
    }
}
