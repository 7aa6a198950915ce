use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use facecheck_core::{assess_quality, decode_image_file, VerificationResult, Verifier};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

mod config;
mod response;

#[derive(Parser)]
#[command(name = "facecheck", about = "Match an ID card photo against a selfie")]
struct Cli {
    /// TOML configuration file (FACECHECK_* environment variables override it)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Verify that the ID card and the selfie show the same person
    Verify {
        /// ID card image (PNG or JPEG)
        #[arg(long)]
        id: PathBuf,
        /// Selfie image (PNG or JPEG)
        #[arg(long)]
        selfie: PathBuf,
        /// Text already recognized from the ID card, one fragment per line
        #[arg(long)]
        id_text: Option<PathBuf>,
    },
    /// Run face detection on one image and report its quality
    Detect {
        #[arg(long)]
        image: PathBuf,
    },
    /// Extract date of birth and age from recognized ID card text
    Dob {
        /// Text file, one fragment per line
        #[arg(long)]
        text: PathBuf,
    },
    /// Print the effective configuration
    Config,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Verify { id, selfie, id_text } => {
            let verifier = Verifier::from_config(&config).context("loading face models")?;

            let id_image = decode_image_file(&id).context("reading ID card image")?;
            let selfie_image = decode_image_file(&selfie).context("reading selfie image")?;

            let result = verifier.verify(&id_image, &selfie_image);
            let failed = result.is_err();

            match id_text {
                Some(path) => {
                    let fragments = read_fragments(&path)?;
                    let identity = facecheck_id::parse_identity_text(&fragments, today());
                    print_json(&response::Response::assemble(&identity, &result))?;
                }
                None => print_json(&VerificationResult::from(result))?,
            }

            Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
        }
        Commands::Detect { image } => {
            let verifier = Verifier::from_config(&config).context("loading face models")?;
            let image = decode_image_file(&image).context("reading image")?;

            let face = verifier.detect(&image).context("face detection")?;
            let quality = face.as_ref().map(|f| assess_quality(&image, f));
            let found = face.is_some();
            print_json(&serde_json::json!({
                "width": image.width(),
                "height": image.height(),
                "face": face,
                "quality": quality,
            }))?;

            Ok(if found { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Dob { text } => {
            let fragments = read_fragments(&text)?;
            let identity = facecheck_id::parse_identity_text(&fragments, today());
            print_json(&identity)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Config => {
            print!("{}", toml::to_string_pretty(&config).context("serializing config")?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

fn read_fragments(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect())
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
