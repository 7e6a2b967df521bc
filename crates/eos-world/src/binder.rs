//! Entity binder: attaches a nickname to an entity whose label may not
//! exist yet.
//!
//! A freshly spawned character is created in one frame but its name label
//! is often built a few frames later. [`EntityBinder::attach`] tries right
//! away; if the label isn't there it records a [`BindingTask`] and
//! [`EntityBinder::poll`] retries it every `retry_interval` until it
//! succeeds, the entity disappears, or the deadline passes. The last
//! attempt happens at the deadline at the latest; a poll that runs after
//! it reports the timeout without touching the label.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::scene::{EntityHandle, LabelAttach, Scene};
use crate::WorldError;

/// Retry cadence and give-up point for label binding.
#[derive(Debug, Clone)]
pub struct BinderConfig {
    /// Time between attempts. Default: 100 ms.
    pub retry_interval: Duration,
    /// How long after the first attempt to give up. Default: 1 s.
    pub timeout: Duration,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            retry_interval: Duration::from_millis(100),
            timeout: Duration::from_secs(1),
        }
    }
}

/// Immediate outcome of [`EntityBinder::attach`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindStatus {
    Attached,
    /// The label already shows this nickname; nothing was done.
    Unchanged,
    /// The label isn't ready; a retry is scheduled.
    Pending,
    /// The entity is gone.
    Cancelled,
}

/// Outcome of a retried binding, reported by [`EntityBinder::poll`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingReport {
    Attached { entity: EntityHandle, nickname: String },
    TimedOut { entity: EntityHandle, nickname: String },
    Cancelled { entity: EntityHandle },
}

/// A binding waiting for its label.
#[derive(Debug, Clone)]
pub struct BindingTask {
    entity: EntityHandle,
    nickname: String,
    timeout: Duration,
    deadline: Instant,
    next_attempt: Instant,
}

impl BindingTask {
    pub fn entity(&self) -> EntityHandle {
        self.entity
    }

    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    pub fn next_attempt(&self) -> Instant {
        self.next_attempt
    }
}

/// Tracks pending bindings and the nickname each entity currently shows.
#[derive(Debug, Default)]
pub struct EntityBinder {
    config: BinderConfig,
    tasks: HashMap<EntityHandle, BindingTask>,
    applied: HashMap<EntityHandle, String>,
}

impl EntityBinder {
    pub fn new(config: BinderConfig) -> Self {
        Self {
            config,
            tasks: HashMap::new(),
            applied: HashMap::new(),
        }
    }

    pub fn config(&self) -> &BinderConfig {
        &self.config
    }

    /// Puts `nickname` on `entity`'s label, retrying for up to `timeout`
    /// if the label isn't ready.
    ///
    /// Calling again with the nickname already shown is a no-op. Calling
    /// with a different nickname overwrites it and replaces any pending
    /// retry; the last call wins.
    pub fn attach<S: Scene + ?Sized>(
        &mut self,
        scene: &mut S,
        entity: EntityHandle,
        nickname: &str,
        timeout: Duration,
        now: Instant,
    ) -> BindStatus {
        if !scene.is_alive(entity) {
            self.forget(entity);
            return BindStatus::Cancelled;
        }

        if self.applied.get(&entity).is_some_and(|shown| shown == nickname) {
            // A pending retry for some other name would overwrite this one.
            self.tasks.remove(&entity);
            return BindStatus::Unchanged;
        }
        if self.tasks.get(&entity).is_some_and(|t| t.nickname == nickname) {
            return BindStatus::Pending;
        }

        match scene.set_label(entity, nickname) {
            LabelAttach::Attached => {
                self.tasks.remove(&entity);
                self.applied.insert(entity, nickname.to_owned());
                tracing::debug!(%entity, nickname, "label attached");
                BindStatus::Attached
            }
            LabelAttach::EntityGone => {
                self.forget(entity);
                BindStatus::Cancelled
            }
            LabelAttach::NotReady => {
                tracing::debug!(%entity, nickname, ?timeout, "label not ready, retrying");
                self.tasks.insert(
                    entity,
                    BindingTask {
                        entity,
                        nickname: nickname.to_owned(),
                        timeout,
                        deadline: now + timeout,
                        next_attempt: now + self.config.retry_interval.min(timeout),
                    },
                );
                BindStatus::Pending
            }
        }
    }

    /// Runs every retry that is due at `now`.
    pub fn poll<S: Scene + ?Sized>(
        &mut self,
        scene: &mut S,
        now: Instant,
    ) -> Vec<BindingReport> {
        let mut due: Vec<EntityHandle> = self
            .tasks
            .values()
            .filter(|t| t.next_attempt <= now)
            .map(|t| t.entity)
            .collect();
        due.sort_unstable();

        let mut reports = Vec::with_capacity(due.len());
        for entity in due {
            let Some(mut task) = self.tasks.remove(&entity) else {
                continue;
            };

            if !scene.is_alive(entity) {
                self.applied.remove(&entity);
                reports.push(BindingReport::Cancelled { entity });
                continue;
            }
            if now > task.deadline {
                reports.push(Self::give_up(task));
                continue;
            }

            match scene.set_label(entity, &task.nickname) {
                LabelAttach::Attached => {
                    tracing::debug!(%entity, nickname = %task.nickname, "label attached after retry");
                    self.applied.insert(entity, task.nickname.clone());
                    reports.push(BindingReport::Attached {
                        entity,
                        nickname: task.nickname,
                    });
                }
                LabelAttach::EntityGone => {
                    self.applied.remove(&entity);
                    reports.push(BindingReport::Cancelled { entity });
                }
                LabelAttach::NotReady if now >= task.deadline => {
                    reports.push(Self::give_up(task));
                }
                LabelAttach::NotReady => {
                    task.next_attempt =
                        (now + self.config.retry_interval).min(task.deadline);
                    self.tasks.insert(entity, task);
                }
            }
        }
        reports
    }

    fn give_up(task: BindingTask) -> BindingReport {
        let err = WorldError::BindingTimedOut {
            entity: task.entity,
            timeout: task.timeout,
        };
        tracing::warn!(error = %err, nickname = %task.nickname, "giving up on label");
        BindingReport::TimedOut {
            entity: task.entity,
            nickname: task.nickname,
        }
    }

    /// Drops everything known about `entity`. Call when it is despawned.
    pub fn forget(&mut self, entity: EntityHandle) {
        if self.tasks.remove(&entity).is_some() {
            tracing::debug!(%entity, "pending label binding cancelled");
        }
        self.applied.remove(&entity);
    }

    /// The nickname the entity's label currently shows, as far as the
    /// binder knows.
    pub fn label(&self, entity: EntityHandle) -> Option<&str> {
        self.applied.get(&entity).map(String::as_str)
    }

    pub fn task(&self, entity: EntityHandle) -> Option<&BindingTask> {
        self.tasks.get(&entity)
    }

    pub fn pending_count(&self) -> usize {
        self.tasks.len()
    }

    /// The earliest instant at which [`poll`](Self::poll) has work.
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.values().map(|t| t.next_attempt).min()
    }
}

// =========================================================================
// Tests
// =========================================================================
