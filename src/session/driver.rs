use std::sync::Arc;

use tokio::time::MissedTickBehavior;

use super::shared::Shared;
use crate::connection::{Connector, Transport};
use crate::discovery::parser::feature_bits;
use crate::error::AirPlayError;
use crate::protocol::video::{PlaybackInfo, ServerInfo};
use crate::registry::{DeviceRegistry, TargetHandle};
use crate::types::{AirPlayConfig, AirPlayDevice};

/// Background half of a session: hands the media over, then polls
pub(super) struct Driver {
    pub(super) shared: Arc<Shared>,
    pub(super) config: AirPlayConfig,
    pub(super) registry: DeviceRegistry,
    pub(super) connector: Arc<dyn Connector>,
}

impl Driver {
    pub(super) async fn run(self, target: TargetHandle) {
        let cancel = self.shared.cancel.clone();
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            result = self.drive(target) => result,
        };

        match result {
            Ok(()) => {
                self.shared.conclude(None, true).await;
            }
            Err(e) => {
                self.shared.conclude(Some(Arc::new(e)), false).await;
            }
        }
    }

    async fn drive(&self, target: TargetHandle) -> Result<(), AirPlayError> {
        let device = self
            .registry
            .get(target)
            .await
            .ok_or_else(|| AirPlayError::DeviceNotFound {
                device_id: target.to_string(),
            })?;
        if !device.can_play_video() {
            return Err(unsupported(&device));
        }

        tracing::info!(
            "Starting session {} on {} ({})",
            self.shared.requests.session_id(),
            device.name,
            device.socket_addr()
        );

        let media = self.shared.video.prepare(&device).await?;
        media.validate()?;

        let transport = tokio::time::timeout(
            self.config.connection_timeout,
            self.connector.connect(&device, &self.config),
        )
        .await
        .map_err(|_| AirPlayError::ConnectionTimeout {
            duration: self.config.connection_timeout,
        })??;

        {
            let mut guard = self.shared.transport.lock().await;
            let transport = guard.insert(transport);
            if !device.capabilities.features_known {
                self.check_server_info(&mut **transport, &device).await?;
            }
            tracing::debug!("Handing over {}", media.url);
            transport
                .send(self.shared.requests.play(&media, self.config.play_body))
                .await?;
        }

        if !self.shared.enter_streaming() {
            return Ok(());
        }
        tracing::info!("{} is playing {}", device.name, media.url);

        self.poll().await
    }

    /// Ask an unadvertised receiver what it supports
    ///
    /// Receivers that do not serve `/server-info` are given the benefit of
    /// the doubt.
    async fn check_server_info(
        &self,
        transport: &mut dyn Transport,
        device: &AirPlayDevice,
    ) -> Result<(), AirPlayError> {
        let response = match transport.send(self.shared.requests.server_info()).await {
            Ok(response) => response,
            Err(e) if e.status_code().is_some() => {
                tracing::debug!("{} has no server info: {e}", device.name);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        match ServerInfo::parse(&response) {
            Ok(ServerInfo {
                features: Some(features),
                ..
            }) if features & feature_bits::VIDEO == 0 => Err(unsupported(device)),
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::debug!("Ignoring unreadable server info from {}: {e}", device.name);
                Ok(())
            }
        }
    }

    /// Poll until the media ends or the receiver stops answering
    async fn poll(&self) -> Result<(), AirPlayError> {
        let mut ticker = tokio::time::interval(self.config.state_poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut seen_ready = false;

        loop {
            ticker.tick().await;

            // Hold the connection while applying so a command cannot slip
            // between a reply and its effect
            let update = {
                let mut guard = self.shared.transport.lock().await;
                let Some(transport) = guard.as_mut() else {
                    return Ok(());
                };
                let response = transport.send(self.shared.requests.playback_info()).await?;
                let info = PlaybackInfo::parse(&response)?;
                self.shared.apply_playback(&info, &mut seen_ready)
            };

            if let Some(paused) = update.paused {
                self.shared.video.paused_changed(paused).await;
            }
            if update.finished {
                tracing::info!("Media finished on session {}", self.shared.requests.session_id());
                return Ok(());
            }
        }
    }
}

fn unsupported(device: &AirPlayDevice) -> AirPlayError {
    AirPlayError::UnsupportedFeature {
        device_name: device.name.clone(),
        feature: "video".to_string(),
    }
}
