//! Walks three users through the friend lifecycle against the backends named
//! in the settings file.
//!
//! With the release settings this expects MySQL (see `sql/schema.sql`) and
//! Redis to be reachable.

use befriend::application_port::RelationshipService;
use befriend::domain_model::*;
use befriend::domain_port::UserStore;
use befriend::logger::*;
use befriend::server::*;
use befriend::settings::*;
use nanoid::nanoid;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let logger = Logger::new_bootstrap();
    let project_settings = parse_settings(cli.settings.as_deref())?;
    logger.reload(&Log {
        filter: "befriend=debug,friends_demo=debug".to_string(),
    })?;

    let alphabet: [char; 16] = [
        '1', '2', '3', '4', '5', '6', '7', '8', '9', '0', 'a', 'b', 'c', 'd', 'e', 'f',
    ];
    let run_id = nanoid!(10, &alphabet);

    let server = Server::try_new(&project_settings).await?;
    let relationship_service = server.relationship_service.clone();

    let mut ids = Vec::new();
    for name in ["me", "squanchy", "loser"] {
        let user = server
            .user_store
            .create(NewUser {
                email: format!("{name}_{run_id}@test.com"),
                name: name.to_string(),
            })
            .await?;
        ids.push(user.id);
    }
    let (me, squanchy, loser) = (ids[0], ids[1], ids[2]);

    relationship_service.add_friend(me, squanchy).await?;
    relationship_service.add_friend(me, loser).await?;
    relationship_service.reject_friend(me, loser).await?;
    relationship_service.accept_friend(me, squanchy).await?;
    debug!(
        "state: {:?}",
        relationship_service.relation_state(me, squanchy).await?
    );

    let friends = relationship_service.get_friends(me, Some("squa")).await?;
    debug!("friends of {}: {:?}", friends.email, friends.friends);

    relationship_service.remove_friend(me, squanchy).await?;
    debug!(
        "state: {:?}",
        relationship_service.relation_state(me, squanchy).await?
    );

    server.shutdown().await;
    Ok(())
}
