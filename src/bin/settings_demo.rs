//! Prints which backends a settings file selects and whether the connection
//! sections they need are present.
//!
//! $ cargo run --bin settings_demo -- --settings=settings/release.toml
//! $ BEFRIEND__STORE__BACKEND=mysql cargo run --bin settings_demo

use befriend::settings::*;

fn describe(settings: &Settings) -> Vec<String> {
    let mut lines = vec![
        format!("log filter: {}", settings.log.filter),
        format!("user store: {}", settings.store.backend),
        format!(
            "repair queue: {} (prefix {:?}, every {}ms, {} per batch)",
            settings.repair.backend,
            settings.repair.prefix,
            settings.repair.interval_ms,
            settings.repair.batch_size
        ),
    ];

    match (settings.store.backend.as_str(), &settings.mysql) {
        ("mysql", None) => lines.push("missing [mysql] section for the user store".to_string()),
        ("mysql", Some(mysql)) => lines.push(format!("mysql: {}", mysql.dsn)),
        ("memory", _) => {}
        (other, _) => lines.push(format!("unknown store backend {other:?}")),
    }
    match (settings.repair.backend.as_str(), &settings.redis) {
        ("redis", None) => lines.push("missing [redis] section for the repair queue".to_string()),
        ("redis", Some(redis)) => lines.push(format!("redis: {}", redis.dsn)),
        ("memory", _) => {}
        (other, _) => lines.push(format!("unknown repair backend {other:?}")),
    }
    lines
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    for line in describe(&project_settings) {
        println!("{line}");
    }

    if let Err(e) = parse_settings(Some("settings/missing.toml")) {
        println!("missing file rejected: {e}");
    }

    Ok(())
}
