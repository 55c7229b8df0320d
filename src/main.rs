use anyhow::Context;
use healer::{cli::args_from_env, config::Config, logging::init_tracing, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = args_from_env()?;
    let config = Config::load(&args.config_path)
        .with_context(|| format!("failed to load config from {}", args.config_path.display()))?;
    let _logging = init_tracing(&config.logging)?;

    match &args.process {
        Some(path) => {
            let engine = server::build_engine(&config)?;
            let handled = server::process_file(&engine, path).await?;
            tracing::info!(target: "server", file = %path.display(), handled, "incident_file_processed");
            Ok(())
        }
        None => server::run(config).await,
    }
}
