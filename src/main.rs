use clap::Parser;
use katottg_import::cli::{load_config, run, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logging = load_config(&cli.config)
        .map(|config| config.logging)
        .unwrap_or_default();

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive(format!("katottg_import={}", logging.level).parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(cli).await {
        tracing::error!(error = %e, "Import failed");
        return Err(e);
    }

    Ok(())
}
