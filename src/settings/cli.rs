use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Run the repair worker until interrupted (default)
    Run,
    /// Print relationship anomalies as JSON
    Audit,
    /// Fix audited anomalies and drain queued repair tickets
    Repair,
}
