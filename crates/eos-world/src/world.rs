//! The privileged context: the only place the scene is touched.

use std::time::Instant;

use eos_session::{
    DespawnIntent, Intent, IntentReceiver, RequestId, SessionHandle,
    SpawnIntent,
};

use crate::binder::{BindStatus, BinderConfig, BindingReport, EntityBinder};
use crate::scene::{EntityHandle, Scene};

/// How the world tells the session that a spawn happened.
///
/// `generation` is the [`SpawnIntent::generation`] the entity was created
/// for. Must not block: it is called in the middle of a frame.
pub trait SessionLink {
    fn spawned(&self, entity: EntityHandle, generation: RequestId);
}

impl SessionLink for SessionHandle {
    fn spawned(&self, entity: EntityHandle, generation: RequestId) {
        if let Err(err) = self.acknowledge_spawn(generation, entity) {
            tracing::warn!(%entity, %generation, error = %err, "could not acknowledge spawn");
        }
    }
}

/// What happened during one [`World::tick`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub spawned: Vec<EntityHandle>,
    pub despawned: Vec<EntityHandle>,
    /// Immediate label outcome for each spawn, in order.
    pub labels: Vec<BindStatus>,
    /// Outcomes of retried label bindings.
    pub bindings: Vec<BindingReport>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty()
            && self.despawned.is_empty()
            && self.labels.is_empty()
            && self.bindings.is_empty()
    }
}

/// Owns the scene, the binder, and the consuming half of the handoff
/// queue. Scene and session are injected, so tests substitute both.
pub struct World<S: Scene, L: SessionLink> {
    scene: S,
    link: L,
    intents: IntentReceiver,
    binder: EntityBinder,
    player: Option<EntityHandle>,
}

impl<S: Scene, L: SessionLink> World<S, L> {
    pub fn new(
        scene: S,
        link: L,
        intents: IntentReceiver,
        binder: BinderConfig,
    ) -> Self {
        Self {
            scene,
            link,
            intents,
            binder: EntityBinder::new(binder),
            player: None,
        }
    }

    /// Applies every queued intent in order, then runs due label retries.
    pub fn tick(&mut self, now: Instant) -> TickReport {
        let mut report = TickReport::default();

        for intent in self.intents.drain() {
            match intent {
                Intent::Spawn(spawn) => self.apply_spawn(spawn, now, &mut report),
                Intent::Despawn(despawn) => self.apply_despawn(despawn, &mut report),
            }
        }

        report.bindings = self.binder.poll(&mut self.scene, now);
        report
    }

    fn apply_spawn(&mut self, intent: SpawnIntent, now: Instant, report: &mut TickReport) {
        if let Some(old) = self.player.take() {
            tracing::warn!(entity = %old, "replacing existing local player");
            self.release(old, report);
        }

        let SpawnIntent {
            generation,
            position,
            identity,
        } = intent;
        let entity = self.scene.spawn_player(position, &identity);
        self.player = Some(entity);
        tracing::info!(
            %entity,
            x = position.x,
            y = position.y,
            nickname = %identity.nickname,
            "local player spawned"
        );
        self.link.spawned(entity, generation);
        report.spawned.push(entity);

        let timeout = self.binder.config().timeout;
        let status = self.binder.attach(
            &mut self.scene,
            entity,
            &identity.nickname,
            timeout,
            now,
        );
        report.labels.push(status);
    }

    fn apply_despawn(&mut self, intent: DespawnIntent, report: &mut TickReport) {
        match self.player.take() {
            Some(entity) => {
                tracing::info!(%entity, reason = %intent.reason, "local player despawned");
                self.release(entity, report);
            }
            None => {
                tracing::debug!(reason = %intent.reason, "despawn with no local player");
            }
        }
    }

    fn release(&mut self, entity: EntityHandle, report: &mut TickReport) {
        self.binder.forget(entity);
        self.scene.despawn(entity);
        report.despawned.push(entity);
    }

    /// The local player entity, if one exists.
    pub fn player(&self) -> Option<EntityHandle> {
        self.player
    }

    pub fn scene(&self) -> &S {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.scene
    }

    pub fn binder(&self) -> &EntityBinder {
        &self.binder
    }

    pub fn link(&self) -> &L {
        &self.link
    }
}
