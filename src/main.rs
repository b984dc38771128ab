use clap::{Parser, Subcommand};
use heic_converter::config::{self, CliOverrides};
use heic_converter::formats::SupportedFormat;
use heic_converter::imaging::RustBackend;
use heic_converter::intake::{self, DropHint};
use heic_converter::presenter;
use heic_converter::session::Session;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "heic-converter")]
#[command(about = "Convert HEIC/HEIF and other images between formats")]
#[command(long_about = "\
Convert HEIC/HEIF and other images between formats

Every file with a recognised extension is decoded, optionally shrunk below
a size ceiling, and written in the target format. Directories are searched
recursively. Files with other extensions are reported and skipped.

Accepted inputs:
  heic heif jpg jpeg png webp avif tiff tif bmp gif ico
  cr2 nef arw orf raf rw2 dng pef   (camera RAW, `raw` feature)

Output formats:
  JPEG PNG WEBP AVIF TIFF ICO BMP GIF

HEIC/HEIF decoding needs the `heif` feature (links the system libheif).

Settings are read from heic-converter.toml in the working directory, or
from --config. Run 'heic-converter gen-config' for a documented example.
Set RUST_LOG=debug to trace each stage.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (default: ./heic-converter.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct ConvertArgs {
    /// Files or directories to convert
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Target format (JPEG, PNG, WEBP, AVIF, TIFF, ICO, BMP, GIF)
    #[arg(long, short = 't')]
    to: Option<SupportedFormat>,

    /// Output directory
    #[arg(long, short = 'o')]
    output: Option<PathBuf>,

    /// Skip the size-reduction pass
    #[arg(long)]
    no_compress: bool,

    /// Write a JSON summary of the batch to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Convert files into the target format
    Convert(ConvertArgs),
    /// List output formats and their encoder settings
    Formats,
    /// Show which files would be accepted, without converting
    Check {
        /// Files or directories to check
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Print a stock heic-converter.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Command::Convert(args) => {
            let mut settings = config::load_config(cli.config.as_deref(), &cwd)?;
            settings.apply(&CliOverrides {
                format: args.to,
                output_dir: args.output,
                no_compress: args.no_compress,
            })?;

            let (paths, mut skipped) = intake::collect_paths(&args.paths);
            let (sources, unreadable) = intake::read_sources(&paths);
            skipped.extend(unreadable);
            for (path, err) in &skipped {
                tracing::warn!(path = %path.display(), error = %err, "could not read file");
                eprintln!("skipped {}: {err}", path.display());
            }

            let mut session = Session::from_config(RustBackend::new(), &settings)?;
            println!(
                "==> Converting {} file(s) to {}",
                sources.len(),
                session.selected_format()
            );
            session.submit_with(sources, |event, view| {
                if let Some(row) = view.row(event.job) {
                    println!("{}", presenter::format_event(event, &row.file_name));
                }
            });

            println!("==> Writing to {}", settings.output.dir.display());
            session.download_all(&settings.output.dir)?;
            presenter::print_job_list(session.presenter());
            presenter::print_lines(&presenter::format_batch_summary(session.presenter()));

            if let Some(report) = &args.report {
                session.write_report(report)?;
                println!("==> Report: {}", report.display());
            }

            let failed = session
                .jobs()
                .iter()
                .filter(|j| j.error().is_some())
                .count()
                + skipped.len();
            if failed > 0 {
                return Err(format!("{failed} file(s) failed or were skipped").into());
            }
        }
        Command::Formats => {
            let settings = config::load_config(cli.config.as_deref(), &cwd)?;
            presenter::print_lines(&presenter::format_format_list(settings.output.format));
        }
        Command::Check { paths } => {
            let (found, skipped) = intake::collect_paths(&paths);
            for (path, err) in &skipped {
                eprintln!("skipped {}: {err}", path.display());
            }
            let names: Vec<(String, bool)> = found
                .iter()
                .map(|p| {
                    let name = intake::display_name(p, &cwd);
                    let accepted = p
                        .file_name()
                        .is_some_and(|n| intake::is_accepted(&n.to_string_lossy()));
                    (name, accepted)
                })
                .collect();
            presenter::print_lines(&presenter::format_intake_check(&names));

            let hint = intake::hover_state(
                found
                    .iter()
                    .filter_map(|p| p.file_name().and_then(|n| n.to_str())),
            );
            match hint {
                DropHint::Valid => println!("==> Ready to convert"),
                DropHint::Invalid => println!("==> Nothing to convert"),
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}
