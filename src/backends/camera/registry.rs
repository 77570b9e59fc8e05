// SPDX-License-Identifier: GPL-3.0-only

//! Capture device registry
//!
//! Device ids are not stable across enumerations (a replugged webcam may come
//! back under a different node), so the registry keys selection on the
//! human-readable label. If two devices share a label the first one in host
//! order wins.

use super::CameraHost;
use super::types::{CaptureDevice, DeviceKind, MediaDeviceInfo};
use crate::constants::placeholder_label;
use crate::errors::CameraError;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Keep only video inputs, in host order, naming unlabeled ones
pub fn video_inputs(devices: &[MediaDeviceInfo]) -> Vec<CaptureDevice> {
    devices
        .iter()
        .filter(|info| info.kind == DeviceKind::VideoInput)
        .enumerate()
        .map(|(index, info)| CaptureDevice {
            id: info.device_id.clone(),
            label: if info.label.is_empty() {
                placeholder_label(index)
            } else {
                info.label.clone()
            },
        })
        .collect()
}

/// Enumerate the host's capture devices
pub async fn enumerate<H: CameraHost>(host: &H) -> Result<Vec<CaptureDevice>, CameraError> {
    let devices = host.enumerate_devices().await.map_err(CameraError::from)?;
    let cameras = video_inputs(&devices);
    info!(
        total = devices.len(),
        cameras = cameras.len(),
        "Enumerated media devices"
    );
    Ok(cameras)
}

/// Selectable camera list with label-based selection
#[derive(Debug, Clone, Default)]
pub struct DeviceRegistry {
    devices: Vec<CaptureDevice>,
    by_label: HashMap<String, usize>,
    selected: Option<usize>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the list with a fresh enumeration
    ///
    /// Clears the selection; call [`reselect`](Self::reselect) afterwards.
    pub fn rebuild(&mut self, devices: Vec<CaptureDevice>) {
        let mut by_label = HashMap::with_capacity(devices.len());
        for (index, device) in devices.iter().enumerate() {
            if by_label.contains_key(&device.label) {
                warn!(label = %device.label, "Duplicate camera label, keeping first entry");
                continue;
            }
            by_label.insert(device.label.clone(), index);
        }

        self.devices = devices;
        self.by_label = by_label;
        self.selected = None;
    }

    /// Re-apply a remembered selection after [`rebuild`](Self::rebuild)
    ///
    /// * empty list → `NoCameraFound`
    /// * remembered label missing → `DeviceVanished`
    /// * nothing remembered → `Ok(None)`, the host will pick a default
    pub fn reselect(
        &mut self,
        remembered: Option<&str>,
    ) -> Result<Option<&CaptureDevice>, CameraError> {
        if self.devices.is_empty() {
            self.selected = None;
            return Err(CameraError::NoCameraFound);
        }

        let Some(label) = remembered else {
            self.selected = None;
            return Ok(None);
        };

        match self.by_label.get(label) {
            Some(&index) => {
                self.selected = Some(index);
                debug!(label, id = %self.devices[index].id, "Reselected camera by label");
                Ok(Some(&self.devices[index]))
            }
            None => {
                self.selected = None;
                warn!(label, "Previously selected camera vanished");
                Err(CameraError::DeviceVanished(label.to_string()))
            }
        }
    }

    /// Enumerate, rebuild and reselect in one step
    pub async fn refresh<H: CameraHost>(
        &mut self,
        host: &H,
        remembered: Option<&str>,
    ) -> Result<Option<&CaptureDevice>, CameraError> {
        let cameras = enumerate(host).await?;
        self.rebuild(cameras);
        self.reselect(remembered)
    }

    /// Mark the entry with `label` as selected
    pub fn select_by_label(&mut self, label: &str) -> Option<&CaptureDevice> {
        let index = *self.by_label.get(label)?;
        self.selected = Some(index);
        Some(&self.devices[index])
    }

    /// Mark the entry with device `id` as selected
    pub fn select_by_id(&mut self, id: &str) -> Option<&CaptureDevice> {
        let index = self.devices.iter().position(|device| device.id == id)?;
        self.selected = Some(index);
        Some(&self.devices[index])
    }

    /// Mark the first entry as selected, the one a host default resolves to
    pub fn select_first(&mut self) -> Option<&CaptureDevice> {
        if self.devices.is_empty() {
            return None;
        }
        self.selected = Some(0);
        self.devices.first()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<&CaptureDevice> {
        self.selected.map(|index| &self.devices[index])
    }

    pub fn devices(&self) -> &[CaptureDevice] {
        &self.devices
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device(id: &str, label: &str) -> CaptureDevice {
        CaptureDevice {
            id: id.into(),
            label: label.into(),
        }
    }

    #[test]
    fn test_video_inputs_filters_and_names() {
        let raw = vec![
            MediaDeviceInfo::new("mic", "Mic", DeviceKind::AudioInput),
            MediaDeviceInfo::video("a", "Cam1"),
            MediaDeviceInfo::new("meta", "Cam1 metadata", DeviceKind::Other),
            MediaDeviceInfo::video("b", ""),
        ];

        let cameras = video_inputs(&raw);
        assert_eq!(cameras, vec![device("a", "Cam1"), device("b", "Camera 2")]);
    }

    #[test]
    fn test_reselect_follows_label_not_id() {
        let mut registry = DeviceRegistry::new();
        registry.rebuild(vec![device("A", "Cam1"), device("B", "Cam2")]);
        assert_eq!(registry.reselect(Some("Cam2")).unwrap().unwrap().id, "B");

        registry.rebuild(vec![device("B2", "Cam2"), device("C", "Cam3")]);
        let selected = registry.reselect(Some("Cam2")).unwrap().unwrap();
        assert_eq!(selected.id, "B2");
        assert_eq!(registry.selected().unwrap().id, "B2");
    }

    #[test]
    fn test_vanished_label_is_an_error() {
        let mut registry = DeviceRegistry::new();
        registry.rebuild(vec![device("C", "Cam3")]);
        let err = registry.reselect(Some("Cam2")).unwrap_err();
        assert!(matches!(err, CameraError::DeviceVanished(label) if label == "Cam2"));
        assert!(registry.selected().is_none());
    }

    #[test]
    fn test_empty_list_is_no_camera() {
        let mut registry = DeviceRegistry::new();
        registry.rebuild(Vec::new());
        assert!(matches!(
            registry.reselect(None).unwrap_err(),
            CameraError::NoCameraFound
        ));
        assert!(registry.selected().is_none());
    }

    #[test]
    fn test_nothing_remembered_selects_nothing() {
        let mut registry = DeviceRegistry::new();
        registry.rebuild(vec![device("A", "Cam1")]);
        assert!(registry.reselect(None).unwrap().is_none());
        assert!(registry.selected().is_none());
    }

    #[test]
    fn test_duplicate_labels_take_first() {
        let mut registry = DeviceRegistry::new();
        registry.rebuild(vec![device("A", "USB Camera"), device("B", "USB Camera")]);
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.select_by_label("USB Camera").unwrap().id, "A");
    }

    #[test]
    fn test_select_by_id_and_first() {
        let mut registry = DeviceRegistry::new();
        registry.rebuild(vec![device("A", "Camera 1"), device("B", "Cam2")]);

        assert_eq!(registry.select_by_id("B").unwrap().label, "Cam2");
        assert!(registry.select_by_id("gone").is_none());
        assert_eq!(registry.select_first().unwrap().label, "Camera 1");
        assert_eq!(registry.selected().unwrap().id, "A");

        registry.rebuild(Vec::new());
        assert!(registry.select_first().is_none());
    }

    #[test]
    fn test_rebuild_clears_selection() {
        let mut registry = DeviceRegistry::new();
        registry.rebuild(vec![device("A", "Cam1")]);
        registry.select_by_label("Cam1");
        registry.rebuild(vec![device("A", "Cam1")]);
        assert!(registry.selected().is_none());
    }
}
