use clap::{Parser, Subcommand};
use hyde::{config, export, output, scan};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("HYDE_ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("HYDE_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "hyde")]
#[command(about = "Content graph and JSON:API serializer for Markdown/YAML trees")]
#[command(long_about = "\
Content graph and JSON:API serializer for Markdown/YAML trees

Your filesystem is the data source. Directories become collections, content
files become items, and front-matter tags become tag collections.

Content structure:

  content/
  ├── hyde.toml                    # Config (optional): name, mode, serializers
  ├── about.md                     # Item <name>/about
  ├── posts.md                     # Merged into collection <name>/posts
  └── posts/                       # Collection <name>/posts
      └── 2024/
          └── hello.md             # Item <name>/posts/2024/hello

Front matter:

  ---
  title: Hello
  tags: [rust, web]                # → <name>/tags/rust, <name>/tags/web
  ---
  Body text.

Run 'hyde gen-config' to generate a documented hyde.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Content directory
    #[arg(long, default_value = "content", global = true)]
    source: PathBuf,

    /// Output directory for `build`
    #[arg(long, default_value = "dist", global = true)]
    output: PathBuf,

    /// Config file (defaults to hyde.toml in the content directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Clone)]
struct ScanArgs {
    /// Record files that fail to parse and continue instead of aborting
    #[arg(long)]
    keep_going: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Parse the content directory and print the collection tree
    Scan(ScanArgs),
    /// Parse, then write one JSON:API document per entity plus index.json
    Build(ScanArgs),
    /// Validate the content directory without writing anything
    Check,
    /// Print a stock hyde.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Command::Scan(args) => {
            let config = load_config(&cli)?;
            let options = scan::ScanOptions {
                keep_going: args.keep_going,
            };
            let (ctx, report) = scan::scan_with(&cli.source, &config, &options)?;
            output::print_scan_output(&ctx, &report, &cli.source);
        }
        Command::Build(args) => {
            let config = load_config(&cli)?;
            let options = scan::ScanOptions {
                keep_going: args.keep_going,
            };

            println!("==> Scanning {}", cli.source.display());
            let (ctx, report) = scan::scan_with(&cli.source, &config, &options)?;
            output::print_scan_output(&ctx, &report, &cli.source);

            println!("==> Writing JSON:API documents \u{2192} {}", cli.output.display());
            let summary = export::export(&ctx, &cli.output, config.output.pretty)?;
            output::print_build_output(&summary);

            println!("==> Build complete: {}", cli.output.display());
        }
        Command::Check => {
            let config = load_config(&cli)?;
            println!("==> Checking {}", cli.source.display());
            let options = scan::ScanOptions { keep_going: true };
            let (ctx, report) = scan::scan_with(&cli.source, &config, &options)?;
            output::print_check_output(&ctx, &report, &cli.source);
            if !report.is_clean() {
                return Err(format!("{} file(s) failed to parse", report.failed.len()).into());
            }
            println!("==> Content is valid");
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `--config` if given, else `hyde.toml` from the source root.
fn load_config(cli: &Cli) -> Result<config::HydeConfig, config::ConfigError> {
    match &cli.config {
        Some(path) => config::load_config_file(path),
        None => config::load_config(&cli.source),
    }
}

/// Log to stderr so stdout stays reserved for command output.
fn init_tracing(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "hyde=warn",
            1 => "hyde=debug",
            _ => "hyde=trace",
        })
    });
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
