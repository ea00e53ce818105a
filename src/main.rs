use befriend::logger::*;
use befriend::server::*;
use befriend::settings::*;
use std::time::Duration;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload(&project_settings.log)?;

    let server = Server::try_new(&project_settings).await?;

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            server.spawn_repair_worker(
                Duration::from_millis(project_settings.repair.interval_ms),
                project_settings.repair.batch_size,
            )?;
            signal::ctrl_c().await?;
        }
        Command::Audit => {
            let anomalies = server.reconcile_service.audit().await?;
            println!("{}", serde_json::to_string_pretty(&anomalies)?);
        }
        Command::Repair => {
            let anomalies = server.reconcile_service.audit().await?;
            let changed = server.reconcile_service.repair(&anomalies).await?;
            info!(anomalies = anomalies.len(), changed, "audit repaired");

            loop {
                let report = server
                    .reconcile_service
                    .drain(project_settings.repair.batch_size)
                    .await?;
                info!(?report, "repair tickets drained");
                if report.repaired == 0 {
                    break;
                }
            }
        }
    }

    let shutdown_timeout = Duration::from_secs(30);
    match tokio::time::timeout(shutdown_timeout, server.shutdown()).await {
        Ok(_) => tracing::info!("server shutdown successfully"),
        Err(_) => tracing::error!("server shutdown timed out"),
    }

    Ok(())
}
