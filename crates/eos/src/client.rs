//! `EosClient` builder and frame loop.
//!
//! This ties the layers together: transport → session actor → handoff
//! queue → world. The session actor runs on its own Tokio task; the world
//! runs on whichever task awaits [`EosClient::run_until`], which makes that
//! task the privileged context. Server pushes from the login socket reach
//! the UI as session events.

use std::future::Future;

use eos_protocol::Credentials;
use eos_session::{
    RequestId, SessionConfig, SessionEvents, SessionHandle, route_socket_frame,
    spawn_session, spawn_session_with_pushes,
};
use eos_transport::{
    HttpTransport, LineRequester, PushFrames, TcpLineConnection,
};
use eos_world::{
    BinderConfig, FrameConfig, FrameInfo, FrameScheduler, Scene, TickReport,
    World,
};

use crate::{ClientConfig, EosError, TransportMode};

/// Builder for configuring and starting an EOS client.
///
/// # Example
///
/// ```rust,ignore
/// use eos::prelude::*;
///
/// let mut client = EosClient::builder()
///     .server_url("http://127.0.0.1:8080")
///     .build(my_scene)
///     .await?;
/// client.login("abc").await?;
/// client.run_until(tokio::signal::ctrl_c()).await?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct EosClientBuilder {
    config: ClientConfig,
}

impl EosClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn server_url(mut self, url: &str) -> Self {
        self.config.server_url = url.to_string();
        self
    }

    pub fn socket_addr(mut self, addr: &str) -> Self {
        self.config.socket_addr = addr.to_string();
        self
    }

    pub fn transport(mut self, mode: TransportMode) -> Self {
        self.config.transport = mode;
        self
    }

    /// Whether HTTP mode also listens for pushes on the socket.
    pub fn push_channel(mut self, enabled: bool) -> Self {
        self.config.push_channel = enabled;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.config.session = config;
        self
    }

    pub fn binder_config(mut self, config: BinderConfig) -> Self {
        self.config.binder = config;
        self
    }

    pub fn frame_config(mut self, config: FrameConfig) -> Self {
        self.config.frame = config;
        self
    }

    /// Opens the transport, starts the session actor, and wraps `scene` in
    /// a world.
    ///
    /// # Errors
    /// [`EosError::Transport`] if the HTTP client cannot be created or the
    /// socket cannot be reached.
    pub async fn build<S: Scene>(self, scene: S) -> Result<EosClient<S>, EosError> {
        let config = self.config;
        tracing::info!(transport = %config.transport, "starting EOS client");

        let mut push_link = None;
        let (handle, events, intents) = match config.transport {
            TransportMode::Http => {
                let transport = HttpTransport::new(
                    config.server_url.clone(),
                    config.session.response_timeout,
                )?;
                let pushes = if config.push_channel {
                    open_push_channel(&config).await
                } else {
                    None
                };
                match pushes {
                    Some((link, pushes)) => {
                        push_link = Some(link);
                        spawn_session_with_pushes(
                            transport,
                            pushes,
                            config.session.clone(),
                        )
                    }
                    None => spawn_session(transport, config.session.clone()),
                }
            }
            TransportMode::Socket => {
                let conn = TcpLineConnection::connect(
                    &config.socket_addr,
                    config.connect_timeout,
                )
                .await?;
                let (requester, pushes) =
                    LineRequester::with_router(conn, route_socket_frame);
                spawn_session_with_pushes(requester, pushes, config.session.clone())
            }
        };

        let world = World::new(scene, handle.clone(), intents, config.binder.clone());
        Ok(EosClient {
            push_link,
            handle,
            events: Some(events),
            world,
            frames: FrameScheduler::new(config.frame.clone()),
            config,
        })
    }
}

/// Connects the push socket used next to HTTP logins. Nothing is ever sent
/// on it, so every frame ends up on the push stream.
async fn open_push_channel(
    config: &ClientConfig,
) -> Option<(LineRequester<TcpLineConnection>, PushFrames)> {
    match TcpLineConnection::connect(&config.socket_addr, config.connect_timeout).await {
        Ok(conn) => {
            tracing::info!(addr = %config.socket_addr, "push channel connected");
            Some(LineRequester::with_router(conn, route_socket_frame))
        }
        Err(err) => {
            tracing::warn!(
                addr = %config.socket_addr,
                error = %err,
                "push channel unavailable, continuing without it"
            );
            None
        }
    }
}

/// A running client: session actor plus the world it feeds.
pub struct EosClient<S: Scene> {
    config: ClientConfig,
    /// Owns the HTTP-mode push socket; dropping it stops the reader.
    push_link: Option<LineRequester<TcpLineConnection>>,
    handle: SessionHandle,
    events: Option<SessionEvents>,
    world: World<S, SessionHandle>,
    frames: FrameScheduler,
}

impl<S: Scene> EosClient<S> {
    pub fn builder() -> EosClientBuilder {
        EosClientBuilder::new()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The session handle. Clone it to drive logins from a UI task.
    pub fn handle(&self) -> &SessionHandle {
        &self.handle
    }

    /// Takes the session event stream. Only the first call returns it.
    pub fn take_events(&mut self) -> Option<SessionEvents> {
        self.events.take()
    }

    pub fn world(&self) -> &World<S, SessionHandle> {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World<S, SessionHandle> {
        &mut self.world
    }

    /// Validates `user_id` and submits a login.
    pub async fn login(&self, user_id: &str) -> Result<RequestId, EosError> {
        let credentials = Credentials::new(user_id)?;
        Ok(self.handle.submit_login(credentials).await?)
    }

    pub async fn logout(&self) -> Result<(), EosError> {
        Ok(self.handle.logout().await?)
    }

    /// Waits for the next frame and runs the world once.
    pub async fn next_frame(&mut self) -> (FrameInfo, TickReport) {
        let frame = self.frames.wait_for_frame().await;
        let report = self.world.tick(frame.now);
        if !report.is_empty() {
            tracing::trace!(frame = frame.frame, ?report, "world changed");
        }
        (frame, report)
    }

    /// Runs the frame loop until `shutdown` resolves, then stops the
    /// session actor.
    pub async fn run_until<F: Future>(&mut self, shutdown: F) -> Result<(), EosError> {
        tracing::info!(rate_hz = self.frames.rate_hz(), "EOS client running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = self.next_frame() => {}
            }
        }

        tracing::info!("EOS client stopping");
        if self.push_link.take().is_some() {
            tracing::debug!("push channel closed");
        }
        self.handle.shutdown().await?;
        Ok(())
    }
}
