//! Last-known fixture state and status diffing.

use serde::{Deserialize, Serialize};

use crate::convert;
use crate::events::PropertyChange;
use crate::protocol::DeviceStatus;

/// Host-facing normalized state derived from the latest status snapshot.
///
/// Absent on a [`crate::LightInstance`] until the first snapshot has been
/// received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LightOptions {
    /// Steady power state, the negation of the reported fading-off flag.
    pub powered_on: bool,
    /// Hue in host degrees. The mirrored inbound mapping reaches -1 at
    /// the top of the native range.
    pub hue: i16,
    /// Saturation percent (1-100).
    pub saturation: u8,
    /// Brightness percent (1-100).
    pub brightness: u8,
}

/// Identification fields reported by the fixture itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub mdns_name: String,
    /// The user-assigned name stored on the device; may be empty.
    pub display_name: String,
    pub firmware_version: String,
}

/// Last natively-scaled hue/saturation values sent.
///
/// Cached because the write protocol bundles the two: setting one
/// requires re-sending the other so it is not clobbered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct PendingSettings {
    pub hue: u8,
    pub saturation: u8,
}

/// Mutable per-instance state shared between the receive task, the
/// poller and the property setters.
#[derive(Debug)]
pub(crate) struct LightState {
    /// Current network target; updated when discovery reports a move.
    pub host: String,
    pub options: Option<LightOptions>,
    pub info: Option<DeviceInfo>,
    pub pending: PendingSettings,
}

impl LightState {
    pub fn new(host: String) -> Self {
        Self {
            host,
            options: None,
            info: None,
            pending: PendingSettings::default(),
        }
    }

    /// Fold one snapshot into the state.
    ///
    /// Converts the native values to host units, diffs each field against
    /// the previous converted options and returns the changes to notify,
    /// at most one per field. The stored options and info are replaced
    /// unconditionally, whether or not anything changed.
    pub fn apply_status(&mut self, status: &DeviceStatus) -> Vec<PropertyChange> {
        let new = LightOptions {
            powered_on: !status.fading_off,
            hue: convert::hue_to_host(status.hue),
            saturation: convert::saturation_to_host(status.saturation),
            brightness: convert::brightness_to_host(status.brightness),
        };

        let mut changes = Vec::new();
        if let Some(old) = &self.options {
            if old.powered_on != new.powered_on {
                changes.push(PropertyChange::Power(new.powered_on));
            }
            if old.brightness != new.brightness {
                changes.push(PropertyChange::Brightness(new.brightness));
            }
            if old.hue != new.hue {
                changes.push(PropertyChange::Hue(new.hue));
            }
            if old.saturation != new.saturation {
                changes.push(PropertyChange::Saturation(new.saturation));
            }
        }

        self.options = Some(new);
        self.info = Some(DeviceInfo {
            mdns_name: status.mdns_name.clone(),
            display_name: status.user_defined_name.clone(),
            firmware_version: status.firmware_version.clone(),
        });
        changes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(fading_off: bool, hue: u16, saturation: u16, brightness: u16) -> DeviceStatus {
        DeviceStatus {
            fading_off,
            hue,
            saturation,
            brightness,
            mdns_name: "exoy-2a41f7".into(),
            user_defined_name: "Hexagon wall".into(),
            firmware_version: "1.4.2".into(),
        }
    }

    #[test]
    fn first_snapshot_populates_without_notifying() {
        let mut state = LightState::new("exoy.local".into());
        let changes = state.apply_status(&snapshot(false, 128, 128, 150));

        assert!(changes.is_empty());
        let options = state.options.unwrap();
        assert!(options.powered_on);
        assert_eq!(options.hue, 179);
        assert_eq!(options.saturation, 51);
        assert_eq!(options.brightness, 47);
        assert_eq!(state.info.as_ref().unwrap().display_name, "Hexagon wall");
    }

    #[test]
    fn identical_snapshots_notify_nothing() {
        let mut state = LightState::new("exoy.local".into());
        state.apply_status(&snapshot(false, 128, 128, 150));
        let changes = state.apply_status(&snapshot(false, 128, 128, 150));
        assert!(changes.is_empty());
    }

    #[test]
    fn brightness_change_fires_exactly_once() {
        let mut state = LightState::new("exoy.local".into());
        state.apply_status(&snapshot(false, 128, 128, 150));
        let changes = state.apply_status(&snapshot(false, 128, 128, 200));

        assert_eq!(changes, vec![PropertyChange::Brightness(72)]);
    }

    #[test]
    fn power_transition_reports_new_steady_state() {
        let mut state = LightState::new("exoy.local".into());
        state.apply_status(&snapshot(false, 128, 128, 150));
        let changes = state.apply_status(&snapshot(true, 128, 128, 150));

        assert_eq!(changes, vec![PropertyChange::Power(false)]);

        let changes = state.apply_status(&snapshot(false, 128, 128, 150));
        assert_eq!(changes, vec![PropertyChange::Power(true)]);
    }

    #[test]
    fn wire_noise_quantized_away_is_not_notified() {
        // Native 128 and 129 both convert to 51 percent saturation.
        let mut state = LightState::new("exoy.local".into());
        state.apply_status(&snapshot(false, 128, 128, 150));
        let changes = state.apply_status(&snapshot(false, 128, 129, 150));
        assert!(changes.is_empty());
    }

    #[test]
    fn multiple_fields_fire_independently() {
        let mut state = LightState::new("exoy.local".into());
        state.apply_status(&snapshot(false, 128, 128, 150));
        let changes = state.apply_status(&snapshot(true, 1, 128, 150));

        assert_eq!(changes.len(), 2);
        assert!(changes.contains(&PropertyChange::Power(false)));
        assert!(changes.contains(&PropertyChange::Hue(359)));
    }

    #[test]
    fn state_replaced_even_when_notified() {
        let mut state = LightState::new("exoy.local".into());
        state.apply_status(&snapshot(false, 128, 128, 150));
        state.apply_status(&snapshot(true, 1, 255, 255));

        let options = state.options.unwrap();
        assert!(!options.powered_on);
        assert_eq!(options.hue, 359);
        assert_eq!(options.saturation, 100);
        assert_eq!(options.brightness, 100);
    }
}
