//! # exoy_lights_rs
//!
//! An async Rust library for controlling Exoy light fixtures over UDP.
//!
//! This crate provides a **runtime-agnostic** async client that keeps a live
//! control-and-status session with a fixture on the local network. It
//! translates between host-normalized values (hue in degrees, saturation and
//! brightness in percent) and the device's native ranges, polls the fixture
//! for status, and surfaces observed property transitions as change events.
//!
//! ## Quick Start
//!
//! ```ignore
//! use exoy_lights_rs::{DeviceIdentity, LightInstance, Property};
//! use futures::StreamExt;
//!
//! // Works with any async runtime!
//! async fn control_light() -> Result<(), exoy_lights_rs::Error> {
//!     // Identity comes from your discovery layer.
//!     let identity = DeviceIdentity::new("192.168.1.40", "Hexagon wall", "aa:bb:cc:dd:ee:ff");
//!
//!     // Connects, waits for the first status snapshot, starts polling.
//!     let light = LightInstance::connect(identity).await?;
//!
//!     // Watch for changes made from elsewhere (wall switch, app, ...).
//!     let mut changes = light.subscribe();
//!
//!     light.set(Property::Brightness, 30).await?;
//!     if let Some(change) = changes.next().await {
//!         println!("{:?} -> {}", change.property(), change.value());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Runtime Agnostic**: Works with tokio, async-std, or smol async runtimes
//! - **Normalized Values**: Hue 0-360, saturation/brightness 1-100 at the API,
//!   converted to the device's native ranges on the wire
//! - **Status Polling**: A background poller keeps the last-known state fresh
//! - **Change Events**: Subscribe to per-property transitions via [`LightInstance::subscribe`]
//! - **Address Updates**: Re-target a moved fixture with [`LightInstance::update_address`]
//!
//! ## Communication
//!
//! All communication with a fixture occurs over UDP on port 8888, one JSON
//! object per datagram. The fixture must be reachable on the local network;
//! addresses are supplied by an external discovery layer.
//!
//! ## Runtime Selection
//!
//! This library is runtime-agnostic. Select your preferred runtime using
//! feature flags:
//!
//! ### Using tokio (default)
//!
//! ```toml
//! [dependencies]
//! exoy-lights-rs = "0.1"
//! tokio = { version = "1", features = ["rt-multi-thread", "macros"] }
//! ```
//!
//! ### Using async-std
//!
//! ```toml
//! [dependencies]
//! exoy-lights-rs = { version = "0.1", default-features = false, features = ["runtime-async-std"] }
//! async-std = { version = "1.12", features = ["attributes"] }
//! ```
//!
//! ### Using smol
//!
//! ```toml
//! [dependencies]
//! exoy-lights-rs = { version = "0.1", default-features = false, features = ["runtime-smol"] }
//! smol = "2"
//! ```
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime

pub mod convert;
mod errors;
mod events;
mod light;
mod protocol;
pub mod runtime;
mod status;
mod transport;

// Re-export public API
pub use errors::Error;
pub use events::{Property, PropertyChange};
pub use light::{ConnectOptions, DeviceIdentity, LightInstance};
pub use protocol::{DeviceStatus, Payload};
pub use status::{DeviceInfo, LightOptions};
