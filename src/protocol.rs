//! Wire protocol messages exchanged with Exoy fixtures.
//!
//! The protocol is JSON over UDP, one object per datagram, relying on
//! datagram boundaries instead of any framing. Writes are shaped by the
//! device: hue and saturation only travel together in a combined message,
//! brightness travels alone, power is a bare toggle.

use serde::{Deserialize, Serialize};

use crate::convert::{DEVICE_BRIGHTNESS_MIN, DEVICE_COLOR_MIN, DEVICE_MAX};
use crate::errors::Error;

/// A single outbound message for a fixture.
///
/// Values passed to the constructors are clamped into the protocol ranges
/// (hue/saturation 1-255, brightness 60-255) before they are put on the
/// wire.
///
/// # Examples
///
/// ```
/// use exoy_lights_rs::Payload;
///
/// let payload = Payload::brightness(157);
/// assert_eq!(serde_json::to_string(&payload).unwrap(), r#"{"setBrightness":157}"#);
/// ```
#[serde_with::skip_serializing_none]
#[derive(Default, Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Payload {
    #[serde(rename = "setHue")]
    pub(crate) hue: Option<u8>,
    #[serde(rename = "setSaturation")]
    pub(crate) saturation: Option<u8>,
    #[serde(rename = "setBrightness")]
    pub(crate) brightness: Option<u8>,
    #[serde(rename = "togglePower")]
    pub(crate) power: Option<u8>,
    #[serde(rename = "getData")]
    pub(crate) status_request: Option<u8>,
}

impl Payload {
    /// Request a full status snapshot from the fixture.
    pub fn status_request() -> Self {
        Payload {
            status_request: Some(1),
            ..Payload::default()
        }
    }

    /// Combined hue and saturation write.
    ///
    /// The device has no hue-only or saturation-only message, so the
    /// caller re-sends the last known value for whichever field it did
    /// not change.
    pub fn hue_saturation(hue: u8, saturation: u8) -> Self {
        Payload {
            hue: Some(hue.clamp(DEVICE_COLOR_MIN, DEVICE_MAX)),
            saturation: Some(saturation.clamp(DEVICE_COLOR_MIN, DEVICE_MAX)),
            ..Payload::default()
        }
    }

    /// Brightness-only write.
    pub fn brightness(brightness: u8) -> Self {
        Payload {
            brightness: Some(brightness.clamp(DEVICE_BRIGHTNESS_MIN, DEVICE_MAX)),
            ..Payload::default()
        }
    }

    /// Power toggle write; no value conversion is involved.
    pub fn power(on: bool) -> Self {
        Payload {
            power: Some(u8::from(on)),
            ..Payload::default()
        }
    }

    /// Check if this payload contains at least one attribute.
    pub fn is_valid(&self) -> bool {
        self.hue.is_some()
            || self.saturation.is_some()
            || self.brightness.is_some()
            || self.power.is_some()
            || self.status_request.is_some()
    }
}

/// One parsed status snapshot, as reported by a fixture in response to a
/// status request.
///
/// All color values are in device-native units; `fading_off` is the
/// transitional power-down indicator whose negation yields the steady
/// power state.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub fading_off: bool,
    pub hue: u16,
    pub saturation: u16,
    pub brightness: u16,
    pub mdns_name: String,
    pub user_defined_name: String,
    pub firmware_version: String,
}

/// Decode one inbound datagram into a status snapshot.
pub(crate) fn parse_status(bytes: &[u8]) -> Result<DeviceStatus, Error> {
    let text = String::from_utf8(bytes.to_vec()).map_err(Error::Utf8Decode)?;
    serde_json::from_str(&text).map_err(Error::JsonLoad)
}
