use crate::domain_model::UserPair;
use crate::settings::Log;
use anyhow::{Result, anyhow};
use tracing::Span;
use tracing_subscriber::{
    EnvFilter, Registry, fmt, layer::SubscriberExt, reload, util::SubscriberInitExt,
};

/// Our own events at info, store and queue drivers only when they warn.
const BOOTSTRAP_FILTER: &str = "befriend=info,warn";

/// Global subscriber whose filter is replaced by `[log] filter` once the
/// settings file has been read.
pub struct Logger {
    reload_handle: reload::Handle<EnvFilter, Registry>,
}

impl Logger {
    /// `RUST_LOG` wins over the bootstrap filter until settings are loaded.
    pub fn new_bootstrap() -> Self {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(BOOTSTRAP_FILTER));
        let (filter, reload_handle) = reload::Layer::new(filter);

        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .try_init()
        {
            eprintln!("logger already installed: {e}");
        }

        Self { reload_handle }
    }

    /// An invalid filter leaves the current one in place.
    pub fn reload(&self, log: &Log) -> Result<()> {
        let filter = filter_from(log)?;
        self.reload_handle.reload(filter).map_err(|e| anyhow!(e))?;
        tracing::debug!(filter = %log.filter, "log filter reloaded");
        Ok(())
    }
}

fn filter_from(log: &Log) -> Result<EnvFilter> {
    EnvFilter::try_new(&log.filter).map_err(|e| anyhow!("bad log filter {:?}: {e}", log.filter))
}

/// Span wrapping every write to a user pair, so the saga, compensation and
/// reconciliation events of one pair can be grepped together.
pub fn pair_span(pair: UserPair, op: &'static str) -> Span {
    tracing::info_span!("pair", %pair, op)
}
