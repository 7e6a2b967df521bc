//! The privileged context of the EOS client.
//!
//! Everything that touches the scene lives here and runs on one task:
//!
//! - **World** ([`World`]) drains the session's handoff queue once per frame
//!   and spawns or despawns the local player through the [`Scene`] seam.
//! - **Entity binder** ([`EntityBinder`]) puts the player's nickname on a
//!   label that may be created a few frames after the entity.
//! - **Frame clock** ([`FrameScheduler`]) paces the loop.

mod binder;
mod error;
mod frame;
mod scene;
mod world;

pub use binder::{
    BindStatus, BinderConfig, BindingReport, BindingTask, EntityBinder,
};
pub use error::WorldError;
pub use frame::{FrameConfig, FrameInfo, FrameScheduler};
pub use scene::{EntityHandle, LabelAttach, Scene};
pub use world::{SessionLink, TickReport, World};
