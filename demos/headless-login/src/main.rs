//! Logs in against a running login service and spawns the player into a
//! scene that only prints what happens to it.
//!
//! ```text
//! EOS_SERVER_URL=http://127.0.0.1:8080 cargo run -p headless-login -- abc
//! EOS_TRANSPORT=socket EOS_SOCKET_ADDR=127.0.0.1:9000 cargo run -p headless-login -- abc
//! ```

use std::collections::{HashMap, HashSet};

use eos::prelude::*;
use tokio::sync::oneshot;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// Console scene
// ---------------------------------------------------------------------------

/// Name tags are built one attempt after their character, so the label
/// retry path runs on every login.
#[derive(Default)]
struct ConsoleScene {
    next_id: u64,
    positions: HashMap<EntityHandle, Position>,
    unbuilt_labels: HashSet<EntityHandle>,
}

impl Scene for ConsoleScene {
    fn spawn_player(&mut self, position: Position, identity: &Identity) -> EntityHandle {
        self.next_id += 1;
        let entity = EntityHandle::new(self.next_id);
        self.positions.insert(entity, position);
        self.unbuilt_labels.insert(entity);
        info!(
            %entity,
            x = position.x,
            y = position.y,
            user_no = identity.user_no,
            gold = identity.gold,
            "character spawned"
        );
        entity
    }

    fn set_label(&mut self, entity: EntityHandle, text: &str) -> LabelAttach {
        if !self.positions.contains_key(&entity) {
            return LabelAttach::EntityGone;
        }
        if self.unbuilt_labels.remove(&entity) {
            return LabelAttach::NotReady;
        }
        info!(%entity, text, "name tag set");
        LabelAttach::Attached
    }

    fn despawn(&mut self, entity: EntityHandle) {
        if self.positions.remove(&entity).is_some() {
            self.unbuilt_labels.remove(&entity);
            info!(%entity, "character removed");
        }
    }

    fn is_alive(&self, entity: EntityHandle) -> bool {
        self.positions.contains_key(&entity)
    }
}

// ---------------------------------------------------------------------------
// Bootstrap
// ---------------------------------------------------------------------------

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let user_id = std::env::args().nth(1).unwrap_or_else(|| "guest".to_string());
    let config = ClientConfig::from_env()?;
    info!(
        transport = %config.transport,
        server_url = %config.server_url,
        socket_addr = %config.socket_addr,
        "connecting"
    );

    let mut client = EosClient::<ConsoleScene>::builder()
        .config(config)
        .build(ConsoleScene::default())
        .await?;
    let mut events = client.take_events().ok_or("event stream already taken")?;

    // A failed login ends the demo; a successful one keeps it running
    // until Ctrl-C.
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let mut stop = Some(stop_tx);
        while let Some(event) = events.recv().await {
            match event {
                SessionEvent::LoginSucceeded { identity } => {
                    info!(nickname = %identity.nickname, user_no = identity.user_no, "logged in");
                }
                SessionEvent::LoginFailed { reason } => {
                    error!(%reason, "login failed");
                    if let Some(tx) = stop.take() {
                        let _ = tx.send(());
                    }
                }
                SessionEvent::LoggedOut => info!("logged out"),
                SessionEvent::ServerPush { kind, body } => info!(%kind, %body, "server push"),
            }
        }
    });

    client.login(&user_id).await?;
    client
        .run_until(async {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = stop_rx => {}
            }
        })
        .await?;
    Ok(())
}
