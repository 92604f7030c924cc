//! Run one generation cycle for an image on disk and print the copy as JSON.

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use shopcopy::cli::ProviderOptions;
use shopcopy::config::setup_logging;
use shopcopy::encoded_image::EncodedImage;
use shopcopy::generation::Generator;
use std::path::PathBuf;

/// Generate marketing copy for a product photo.
///
/// Minimal UX:
///   generate_copy ./sneaker.jpg
#[derive(Parser, Debug)]
#[command(name = "generate_copy")]
#[command(about = "Describe a product photo and write marketing copy for it")]
struct Args {
    /// Image to generate copy for
    image: PathBuf,

    /// Enable debug logging
    #[arg(long, env = "SHOPCOPY_DEBUG")]
    debug: bool,

    #[command(flatten)]
    providers: ProviderOptions,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Err(err) = setup_logging(args.debug) {
        eprintln!("Logging setup failed: {err}");
    }

    let config = args.providers.generator_config();
    config.warn_missing_keys();

    let image = EncodedImage::from_path(&args.image)
        .await
        .with_context(|| format!("Failed to load {}", args.image.display()))?;
    let generator = Generator::new(&config).context("Failed to set up model clients")?;

    let result = generator
        .try_run(&image)
        .await
        .map_err(|err| anyhow!("{} generation failed: {err}", config.variant))?;

    println!(
        "{}",
        serde_json::to_string_pretty(&result).context("Failed to serialize the result")?
    );
    Ok(())
}
