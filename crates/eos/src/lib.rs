//! # EOS
//!
//! Session bootstrap for the EOS game client.
//!
//! A player types a user id; the client logs in against the login
//! service, receives the player's identity and last position, spawns the
//! local character on the privileged context, and puts the nickname on
//! its label once the label exists. The engine plugs in through the
//! [`Scene`](eos_world::Scene) trait.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use eos::prelude::*;
//!
//! let mut client = EosClient::builder()
//!     .config(ClientConfig::from_env()?)
//!     .build(my_scene)
//!     .await?;
//! let mut events = client.take_events().unwrap();
//! client.login("abc").await?;
//! client.run_until(tokio::signal::ctrl_c()).await?;
//! ```

mod client;
mod config;
mod error;

pub use client::{EosClient, EosClientBuilder};
pub use config::{ClientConfig, TransportMode};
pub use error::EosError;

pub mod prelude {
    //! The types most clients need, in one import.

    pub use crate::{ClientConfig, EosClient, EosClientBuilder, EosError, TransportMode};
    pub use eos_protocol::{Credentials, Identity, Position};
    pub use eos_session::{
        SessionEvent, SessionEvents, SessionHandle, SessionState,
    };
    pub use eos_world::{
        BinderConfig, EntityHandle, FrameConfig, LabelAttach, Scene,
    };
}
