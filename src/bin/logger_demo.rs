//! Shows what a friend request looks like in the logs, before and after the
//! `[log]` filter from the settings file replaces the bootstrap one.

use befriend::application_impl::RealRelationshipService;
use befriend::application_port::RelationshipService;
use befriend::domain_model::*;
use befriend::domain_port::UserStore;
use befriend::infra_memory::*;
use befriend::logger::*;
use befriend::settings::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = Logger::new_bootstrap();
    debug!("hidden by the bootstrap filter");

    let store = Arc::new(MemoryUserStore::new());
    let service = RealRelationshipService::new(store.clone(), Arc::new(MemoryRepairQueue::new()));
    let me = store
        .create(NewUser {
            email: "me@test.com".to_string(),
            name: "me".to_string(),
        })
        .await?;
    let squanchy = store
        .create(NewUser {
            email: "squanchy@test.com".to_string(),
            name: "Squanchy".to_string(),
        })
        .await?;

    // info only: "friend request recorded"
    service.add_friend(me.id, squanchy.id).await?;

    let project_settings = parse_settings(cli.settings.as_deref())?;
    logger.reload(&project_settings.log)?;
    info!(filter = %project_settings.log.filter, "settings filter active");

    // with the dev filter the saga's debug events show up inside its pair span
    service.accept_friend(me.id, squanchy.id).await?;
    service
        .remove_friend(me.id, squanchy.id)
        .instrument(pair_span(UserPair::new(me.id, squanchy.id), "demo"))
        .await?;

    let bad = Log {
        filter: "befriend=[".to_string(),
    };
    if let Err(e) = logger.reload(&bad) {
        warn!("kept previous filter: {e}");
    }

    Ok(())
}
