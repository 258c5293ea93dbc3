//! Registry of discovered receivers
//!
//! Sessions refer to their target through a [`TargetHandle`] rather than
//! holding the device. A handle stays valid while the device is present;
//! once discovery reports it gone, every outstanding handle goes stale and
//! resolving it fails.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::discovery::DiscoveryEvent;
use crate::types::AirPlayDevice;

/// Generational reference to a registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TargetHandle {
    index: u32,
    generation: u32,
}

impl TargetHandle {
    /// Slot index
    #[must_use]
    pub fn index(self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued
    #[must_use]
    pub fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Display for TargetHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}v{}", self.index, self.generation)
    }
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    device: Option<AirPlayDevice>,
}

#[derive(Debug, Default)]
struct Entries {
    slots: Vec<Slot>,
    by_id: HashMap<String, u32>,
    free: Vec<u32>,
}

impl Entries {
    fn handle(&self, index: u32) -> TargetHandle {
        TargetHandle {
            index,
            generation: self.slots[index as usize].generation,
        }
    }

    fn slot(&self, handle: TargetHandle) -> Option<&Slot> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
    }
}

/// Shared, cloneable device registry
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    entries: Arc<RwLock<Entries>>,
}

impl DeviceRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or refresh a device
    ///
    /// A device id already present keeps its handle; its record is replaced.
    pub async fn insert(&self, device: AirPlayDevice) -> TargetHandle {
        let mut entries = self.entries.write().await;

        if let Some(&index) = entries.by_id.get(&device.id) {
            entries.slots[index as usize].device = Some(device);
            return entries.handle(index);
        }

        let index = match entries.free.pop() {
            Some(index) => index,
            None => {
                #[allow(clippy::cast_possible_truncation)]
                let index = entries.slots.len() as u32;
                entries.slots.push(Slot::default());
                index
            }
        };
        tracing::debug!("Registered {} ({}) in slot {index}", device.name, device.id);
        entries.by_id.insert(device.id.clone(), index);
        entries.slots[index as usize].device = Some(device);
        entries.handle(index)
    }

    /// Resolve a handle to the current device record
    pub async fn get(&self, handle: TargetHandle) -> Option<AirPlayDevice> {
        let entries = self.entries.read().await;
        entries.slot(handle).and_then(|slot| slot.device.clone())
    }

    /// Check whether a handle still resolves
    pub async fn contains(&self, handle: TargetHandle) -> bool {
        let entries = self.entries.read().await;
        entries.slot(handle).is_some_and(|slot| slot.device.is_some())
    }

    /// Handle of a device by id
    pub async fn handle_of(&self, device_id: &str) -> Option<TargetHandle> {
        let entries = self.entries.read().await;
        entries.by_id.get(device_id).map(|&index| entries.handle(index))
    }

    /// Remove a device by id, invalidating its handles
    pub async fn remove(&self, device_id: &str) -> Option<AirPlayDevice> {
        let mut entries = self.entries.write().await;
        let index = entries.by_id.remove(device_id)?;
        let slot = &mut entries.slots[index as usize];
        slot.generation = slot.generation.wrapping_add(1);
        let device = slot.device.take();
        entries.free.push(index);
        tracing::debug!("Removed {device_id} from slot {index}");
        device
    }

    /// Apply a discovery event
    ///
    /// Returns the handle for added or updated devices.
    pub async fn apply(&self, event: &DiscoveryEvent) -> Option<TargetHandle> {
        match event {
            DiscoveryEvent::Added(device) | DiscoveryEvent::Updated(device) => {
                Some(self.insert(device.clone()).await)
            }
            DiscoveryEvent::Removed(id) => {
                self.remove(id).await;
                None
            }
        }
    }

    /// First device whose name matches, ignoring case
    pub async fn find_by_name(&self, name: &str) -> Option<(TargetHandle, AirPlayDevice)> {
        let entries = self.entries.read().await;
        entries
            .slots
            .iter()
            .enumerate()
            .find_map(|(index, slot)| {
                let device = slot.device.as_ref()?;
                #[allow(clippy::cast_possible_truncation)]
                let handle = entries.handle(index as u32);
                device
                    .name
                    .eq_ignore_ascii_case(name)
                    .then(|| (handle, device.clone()))
            })
    }

    /// All present devices with their handles, ordered by name
    pub async fn entries(&self) -> Vec<(TargetHandle, AirPlayDevice)> {
        let entries = self.entries.read().await;
        let mut list: Vec<_> = entries
            .slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| {
                #[allow(clippy::cast_possible_truncation)]
                let handle = entries.handle(index as u32);
                slot.device.clone().map(|device| (handle, device))
            })
            .collect();
        list.sort_by(|a, b| a.1.name.cmp(&b.1.name));
        list
    }

    /// Number of present devices
    pub async fn len(&self) -> usize {
        self.entries.read().await.by_id.len()
    }

    /// Whether the registry is empty
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Keep the registry in sync with a discovery stream
    ///
    /// The task ends when the stream does; abort the handle to stop earlier.
    pub fn watch<S>(&self, stream: S) -> JoinHandle<()>
    where
        S: Stream<Item = DiscoveryEvent> + Send + 'static,
    {
        let registry = self.clone();
        tokio::spawn(async move {
            tokio::pin!(stream);
            while let Some(event) = stream.next().await {
                registry.apply(&event).await;
            }
            tracing::debug!("Discovery stream ended");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn device(id: &str, name: &str) -> AirPlayDevice {
        AirPlayDevice::new(id, name, IpAddr::V4(Ipv4Addr::LOCALHOST), 7000)
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let registry = DeviceRegistry::new();
        let handle = registry.insert(device("a", "Living Room")).await;

        assert_eq!(registry.get(handle).await.unwrap().name, "Living Room");
        assert_eq!(registry.len().await, 1);
        assert!(registry.contains(handle).await);
    }

    #[tokio::test]
    async fn test_same_id_keeps_handle() {
        let registry = DeviceRegistry::new();
        let first = registry.insert(device("a", "Old Name")).await;
        let second = registry.insert(device("a", "New Name")).await;

        assert_eq!(first, second);
        assert_eq!(registry.get(first).await.unwrap().name, "New Name");
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn test_remove_invalidates_handle() {
        let registry = DeviceRegistry::new();
        let stale = registry.insert(device("a", "TV")).await;

        assert!(registry.remove("a").await.is_some());
        assert!(registry.get(stale).await.is_none());

        // The slot is reused under a new generation
        let fresh = registry.insert(device("b", "Other")).await;
        assert_eq!(fresh.index(), stale.index());
        assert_ne!(fresh.generation(), stale.generation());
        assert!(registry.get(stale).await.is_none());
        assert!(registry.get(fresh).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_unknown() {
        let registry = DeviceRegistry::new();
        assert!(registry.remove("missing").await.is_none());
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_apply_events() {
        let registry = DeviceRegistry::new();
        let handle = registry
            .apply(&DiscoveryEvent::Added(device("a", "TV")))
            .await
            .unwrap();
        let updated = registry
            .apply(&DiscoveryEvent::Updated(device("a", "TV 2")))
            .await
            .unwrap();
        assert_eq!(handle, updated);

        assert!(
            registry
                .apply(&DiscoveryEvent::Removed("a".to_string()))
                .await
                .is_none()
        );
        assert!(registry.get(handle).await.is_none());
    }

    #[tokio::test]
    async fn test_find_by_name_and_entries() {
        let registry = DeviceRegistry::new();
        registry.insert(device("b", "Bedroom")).await;
        let den = registry.insert(device("a", "Den")).await;

        let (handle, found) = registry.find_by_name("den").await.unwrap();
        assert_eq!(handle, den);
        assert_eq!(found.id, "a");
        assert!(registry.find_by_name("Kitchen").await.is_none());

        let names: Vec<_> = registry
            .entries()
            .await
            .into_iter()
            .map(|(_, d)| d.name)
            .collect();
        assert_eq!(names, vec!["Bedroom", "Den"]);
        assert_eq!(registry.handle_of("a").await, Some(den));
    }

    #[tokio::test]
    async fn test_watch_applies_stream() {
        let registry = DeviceRegistry::new();
        let events = futures::stream::iter(vec![
            DiscoveryEvent::Added(device("a", "TV")),
            DiscoveryEvent::Added(device("b", "Projector")),
            DiscoveryEvent::Removed("a".to_string()),
        ]);

        registry.watch(events).await.unwrap();

        assert_eq!(registry.len().await, 1);
        assert!(registry.find_by_name("Projector").await.is_some());
    }

    #[test]
    fn test_handle_display() {
        let handle = TargetHandle {
            index: 3,
            generation: 1,
        };
        assert_eq!(handle.to_string(), "#3v1");
    }
}
