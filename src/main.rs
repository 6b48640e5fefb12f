//! kolosal-forecast entry point

use clap::Parser;
use kolosal_forecast::cli::{cmd_clean, cmd_info, cmd_predict, cmd_train, Cli, Commands};

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kolosal_forecast=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Clean { input, output, skip_rows } => {
            cmd_clean(&input, &output, skip_rows)?;
        }
        Commands::Train { data, targets, forecast_hours, split_ratio, format, common } => {
            cmd_train(&data, &targets, forecast_hours, split_ratio, format, &common)?;
        }
        Commands::Predict { data, fill, common } => {
            cmd_predict(&data, fill, &common)?;
        }
        Commands::Info { data, models } => {
            cmd_info(data.as_deref(), models.as_deref())?;
        }
    }

    Ok(())
}
