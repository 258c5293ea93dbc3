use super::parser;
use crate::error::AirPlayError;
use crate::types::{AirPlayConfig, AirPlayDevice};
use futures::Stream;
use std::collections::HashMap;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Discovery events
#[derive(Debug, Clone, PartialEq)]
pub enum DiscoveryEvent {
    /// A new device was discovered
    Added(AirPlayDevice),
    /// A device was removed/went offline
    Removed(String),
    /// Device information was updated
    Updated(AirPlayDevice),
}

impl DiscoveryEvent {
    /// Id of the device the event concerns
    #[must_use]
    pub fn device_id(&self) -> &str {
        match self {
            Self::Added(device) | Self::Updated(device) => &device.id,
            Self::Removed(id) => id,
        }
    }
}

/// mDNS browser for discovering `AirPlay` receivers
pub struct DeviceBrowser {
    config: AirPlayConfig,
}

impl DeviceBrowser {
    /// Create a new device browser
    #[must_use]
    pub fn new(config: AirPlayConfig) -> Self {
        Self { config }
    }

    /// Start browsing for devices
    ///
    /// # Errors
    ///
    /// Returns an error if the mDNS daemon cannot be initialized.
    pub fn browse(self) -> Result<impl Stream<Item = DiscoveryEvent>, AirPlayError> {
        DeviceBrowserStream::new(&self.config)
    }
}

/// Stream implementation for device discovery
struct DeviceBrowserStream {
    mdns: mdns_sd::ServiceDaemon,
    stream: Box<dyn Stream<Item = mdns_sd::ServiceEvent> + Send + Unpin>,
    known_devices: HashMap<String, AirPlayDevice>,
    fullname_map: HashMap<String, String>,
    debug: bool,
}

impl DeviceBrowserStream {
    fn new(config: &AirPlayConfig) -> Result<Self, AirPlayError> {
        let mdns = mdns_sd::ServiceDaemon::new().map_err(|e| AirPlayError::DiscoveryFailed {
            message: format!("Failed to create mDNS daemon: {e}"),
            source: None,
        })?;

        let receiver = mdns.browse(super::AIRPLAY_SERVICE_TYPE).map_err(|e| {
            AirPlayError::DiscoveryFailed {
                message: format!("Failed to browse: {e}"),
                source: None,
            }
        })?;

        tracing::debug!("Browsing for {}", super::AIRPLAY_SERVICE_TYPE);

        Ok(Self {
            mdns,
            stream: Box::new(receiver.into_stream()),
            known_devices: HashMap::new(),
            fullname_map: HashMap::new(),
            debug: config.debug_protocol,
        })
    }

    fn process_event(&mut self, event: mdns_sd::ServiceEvent) -> Option<DiscoveryEvent> {
        match event {
            mdns_sd::ServiceEvent::ServiceResolved(info) => self.handle_resolved(&info),
            mdns_sd::ServiceEvent::ServiceRemoved(_, fullname) => self.handle_removed(&fullname),
            _ => None,
        }
    }

    fn handle_resolved(&mut self, info: &mdns_sd::ServiceInfo) -> Option<DiscoveryEvent> {
        let fullname = info.get_fullname().to_string();

        let txt_records: HashMap<String, String> = info
            .get_properties()
            .iter()
            .map(|prop| (prop.key().to_string(), prop.val_str().to_string()))
            .collect();

        let addresses: Vec<_> = info.get_addresses().iter().copied().collect();
        if addresses.is_empty() {
            tracing::debug!("Ignoring {fullname}: no addresses resolved");
            return None;
        }

        let device =
            parser::device_from_service(&fullname, info.get_port(), addresses, txt_records);
        if self.debug {
            tracing::debug!("Resolved {fullname}: {device:?}");
        }

        self.fullname_map.insert(fullname, device.id.clone());

        let event = match self.known_devices.get(&device.id) {
            Some(known) if *known == device => return None,
            Some(_) => DiscoveryEvent::Updated(device.clone()),
            None => {
                tracing::info!("Discovered {} ({})", device.name, device.socket_addr());
                DiscoveryEvent::Added(device.clone())
            }
        };
        self.known_devices.insert(device.id.clone(), device);

        Some(event)
    }

    fn handle_removed(&mut self, fullname: &str) -> Option<DiscoveryEvent> {
        let id = self.fullname_map.remove(fullname)?;
        self.known_devices.remove(&id);
        tracing::info!("Lost {fullname}");
        Some(DiscoveryEvent::Removed(id))
    }
}

impl Stream for DeviceBrowserStream {
    type Item = DiscoveryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let event = match Pin::new(&mut self.stream).poll_next(cx) {
                Poll::Ready(Some(event)) => event,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            };

            if let Some(discovery_event) = self.process_event(event) {
                return Poll::Ready(Some(discovery_event));
            }
        }
    }
}

impl Drop for DeviceBrowserStream {
    fn drop(&mut self) {
        let _ = self.mdns.stop_browse(super::AIRPLAY_SERVICE_TYPE);
        let _ = self.mdns.shutdown();
    }
}
