//! The scene seam.
//!
//! Rendering, meshes, and UI widgets are outside this workspace. The world
//! reaches them only through [`Scene`], which a game engine implements on
//! its side. Every call happens on the privileged context.

use eos_protocol::{Identity, Position};

pub use eos_session::EntityHandle;

/// Result of trying to put text on an entity's name label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelAttach {
    /// The label exists and now shows the text.
    Attached,
    /// The entity exists but its label has not been created yet.
    NotReady,
    /// The entity no longer exists.
    EntityGone,
}

/// What the world needs from the engine.
pub trait Scene {
    /// Creates the local player's character at `position`.
    fn spawn_player(&mut self, position: Position, identity: &Identity) -> EntityHandle;

    /// Sets the text of the entity's name label, if the label exists yet.
    fn set_label(&mut self, entity: EntityHandle, text: &str) -> LabelAttach;

    /// Removes an entity. Unknown handles are ignored.
    fn despawn(&mut self, entity: EntityHandle);

    fn is_alive(&self, entity: EntityHandle) -> bool;
}
