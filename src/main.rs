use clap::Parser;
use shopcopy::config::setup_logging;
use shopcopy::generation::Generator;
use tracing::error;

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let cli = shopcopy::cli::CliOptions::parse();

    if let Err(err) = setup_logging(cli.debug) {
        eprintln!("Logging setup failed: {}", err);
    }

    let config = cli.providers.generator_config();
    config.warn_missing_keys();

    let generator = match Generator::new(&config) {
        Ok(generator) => generator,
        Err(err) => {
            error!("Failed to set up model clients: {}", err);
            return;
        }
    };

    if let Err(err) = shopcopy::web::setup_server(&cli.listen_address, cli.port, generator).await
    {
        error!("Application error: {}", err);
    }
}
