//! Individual light control.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::channel::mpsc::UnboundedReceiver;
use futures::channel::oneshot;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::convert;
use crate::errors::Error;
use crate::events::{ChangeDispatcher, Property, PropertyChange};
use crate::protocol::{self, Payload};
use crate::runtime::{self, JoinHandle};
use crate::status::{DeviceInfo, LightOptions, LightState};
use crate::transport::Channel;

type Result<T> = std::result::Result<T, Error>;

/// Identity of one fixture, as supplied by an external discovery layer.
///
/// `name` and `mac` are fixed for the life of the instance; the network
/// address may be re-pointed via [`LightInstance::update_address`] when
/// discovery learns that the same hardware moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceIdentity {
    /// Network address (IP or resolvable hostname), without port.
    pub host: String,
    /// Configured display name, used when the device reports none.
    pub name: String,
    /// Stable hardware identifier.
    pub mac: String,
}

impl DeviceIdentity {
    pub fn new(host: &str, name: &str, mac: &str) -> Self {
        DeviceIdentity {
            host: host.to_string(),
            name: name.to_string(),
            mac: mac.to_string(),
        }
    }
}

/// Tuning knobs for instance construction.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Port the fixture protocol listens on.
    pub port: u16,
    /// Interval between periodic status requests.
    pub polling_interval: Duration,
    /// How long to wait for the first status snapshot before giving up.
    pub ready_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        ConnectOptions {
            port: LightInstance::PORT,
            polling_interval: Duration::from_millis(LightInstance::POLLING_INTERVAL_MS),
            ready_timeout: Duration::from_millis(LightInstance::READY_TIMEOUT_MS),
        }
    }
}

/// State shared between the instance handle and its background tasks.
struct Shared {
    channel: Channel,
    state: Mutex<LightState>,
    dispatcher: ChangeDispatcher,
    running: AtomicBool,
}

/// A live control-and-status session with one Exoy fixture.
///
/// An instance owns the UDP socket, a receive task that folds inbound
/// status snapshots into the last-known state, and a poller that
/// periodically requests a fresh snapshot. Construction only completes
/// once the first snapshot has arrived, so a returned instance is always
/// ready to answer [`LightInstance::get`].
///
/// # Example
///
/// ```ignore
/// use exoy_lights_rs::{DeviceIdentity, LightInstance, Property};
///
/// async fn dim_the_wall() -> Result<(), exoy_lights_rs::Error> {
///     let identity = DeviceIdentity::new("192.168.1.40", "Hexagon wall", "aa:bb:cc:dd:ee:ff");
///     let light = LightInstance::connect(identity).await?;
///
///     let mut changes = light.subscribe();
///     light.set(Property::Brightness, 30).await?;
///     Ok(())
/// }
/// ```
pub struct LightInstance {
    name: String,
    mac: String,
    port: u16,
    shared: Arc<Shared>,
    recv_task: Option<JoinHandle<()>>,
    poll_task: Option<JoinHandle<()>>,
}

impl LightInstance {
    const PORT: u16 = 8888;
    const POLLING_INTERVAL_MS: u64 = 1000;
    const READY_TIMEOUT_MS: u64 = 5000;

    /// Connect to a fixture with default options.
    ///
    /// Fails with [`Error::Connect`] when the transport cannot associate
    /// with the address and with [`Error::ReadyTimeout`] when the device
    /// never answers the initial status request. In both cases no
    /// instance escapes.
    pub async fn connect(identity: DeviceIdentity) -> Result<Self> {
        Self::connect_with(identity, ConnectOptions::default()).await
    }

    /// Connect to a fixture with explicit options.
    pub async fn connect_with(identity: DeviceIdentity, options: ConnectOptions) -> Result<Self> {
        let channel = Channel::connect(&identity.host, options.port).await?;

        let shared = Arc::new(Shared {
            channel,
            state: Mutex::new(LightState::new(identity.host)),
            dispatcher: ChangeDispatcher::new(),
            running: AtomicBool::new(true),
        });

        let (ready_tx, ready_rx) = oneshot::channel();
        let recv_task = runtime::spawn(receive_loop(Arc::clone(&shared), ready_tx));

        // Dropping the instance on any failure below stops the receive
        // task via the running flag.
        let mut instance = LightInstance {
            name: identity.name,
            mac: identity.mac,
            port: options.port,
            shared,
            recv_task: Some(recv_task),
            poll_task: None,
        };

        send_payload(&instance.shared, &Payload::status_request()).await?;

        let ready = runtime::timeout(options.ready_timeout, ready_rx).await;
        if !matches!(ready, Ok(Ok(()))) {
            return Err(Error::ReadyTimeout {
                host: instance.host(),
                timeout_ms: options.ready_timeout.as_millis() as u64,
            });
        }

        instance.poll_task = Some(runtime::spawn(poll_loop(
            Arc::clone(&instance.shared),
            options.polling_interval,
            instance.name.clone(),
        )));

        Ok(instance)
    }

    /// Write one property to the fixture.
    ///
    /// The host value is clamped and converted to native units. Hue and
    /// saturation update the pending write cache and travel as the
    /// combined message, re-sending the other field's last sent value so
    /// it is not clobbered. Brightness is written alone; power is a bare
    /// toggle. A send failure surfaces here and is not retried.
    pub async fn set(&self, property: Property, value: i32) -> Result<()> {
        let payload = match property {
            Property::Hue => {
                let mut state = self.shared.state.lock().unwrap();
                state.pending.hue = convert::hue_to_device(value);
                Payload::hue_saturation(state.pending.hue, state.pending.saturation)
            }
            Property::Saturation => {
                let mut state = self.shared.state.lock().unwrap();
                state.pending.saturation = convert::saturation_to_device(value);
                Payload::hue_saturation(state.pending.hue, state.pending.saturation)
            }
            Property::Brightness => Payload::brightness(convert::brightness_to_device(value)),
            Property::Power => Payload::power(value != 0),
        };

        send_payload(&self.shared, &payload).await
    }

    pub async fn set_hue(&self, degrees: i32) -> Result<()> {
        self.set(Property::Hue, degrees).await
    }

    pub async fn set_saturation(&self, percent: i32) -> Result<()> {
        self.set(Property::Saturation, percent).await
    }

    pub async fn set_brightness(&self, percent: i32) -> Result<()> {
        self.set(Property::Brightness, percent).await
    }

    pub async fn set_power(&self, on: bool) -> Result<()> {
        self.set(Property::Power, i32::from(on)).await
    }

    /// Current normalized value of a property, or 0 before the first
    /// status snapshot has arrived.
    pub fn get(&self, property: Property) -> i32 {
        let state = self.shared.state.lock().unwrap();
        match &state.options {
            Some(options) => match property {
                Property::Hue => i32::from(options.hue),
                Property::Saturation => i32::from(options.saturation),
                Property::Brightness => i32::from(options.brightness),
                Property::Power => i32::from(options.powered_on),
            },
            None => 0,
        }
    }

    /// Normalized options from the latest snapshot.
    pub fn options(&self) -> Option<LightOptions> {
        self.shared.state.lock().unwrap().options
    }

    /// Device-reported identification from the latest snapshot.
    pub fn info(&self) -> Option<DeviceInfo> {
        self.shared.state.lock().unwrap().info.clone()
    }

    /// The configured identity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stable hardware identifier.
    pub fn mac(&self) -> &str {
        &self.mac
    }

    /// The current network address.
    pub fn host(&self) -> String {
        self.shared.state.lock().unwrap().host.clone()
    }

    /// The device-reported name when present and non-empty, otherwise
    /// the configured identity name.
    pub fn display_name(&self) -> String {
        display_name(&self.shared, &self.name)
    }

    /// Subscribe to property change events.
    ///
    /// Every subscriber receives each observed transition exactly once;
    /// changes published while nobody subscribes are discarded.
    pub fn subscribe(&self) -> UnboundedReceiver<PropertyChange> {
        self.shared.dispatcher.subscribe()
    }

    /// Re-target the fixture after discovery reported a new address for
    /// the same hardware identifier.
    pub async fn update_address(&self, host: &str) -> Result<()> {
        self.shared.channel.reconnect(host, self.port).await?;
        self.shared.state.lock().unwrap().host = host.to_string();
        Ok(())
    }

    /// Whether the background tasks are still running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Stop all periodic traffic and wait for the background tasks to
    /// wind down.
    pub async fn stop(mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        if let Some(task) = self.poll_task.take() {
            task.await;
        }
        if let Some(task) = self.recv_task.take() {
            task.await;
        }
    }
}

impl Drop for LightInstance {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
    }
}

fn display_name(shared: &Shared, configured: &str) -> String {
    let state = shared.state.lock().unwrap();
    match &state.info {
        Some(info) if !info.display_name.is_empty() => info.display_name.clone(),
        _ => configured.to_string(),
    }
}

async fn send_payload(shared: &Shared, payload: &Payload) -> Result<()> {
    if !payload.is_valid() {
        return Err(Error::NoAttribute);
    }

    let bytes = serde_json::to_vec(payload).map_err(Error::JsonDump)?;
    debug!("sending {}", String::from_utf8_lossy(&bytes));
    shared.channel.send(&bytes).await
}

/// Processes inbound datagrams in arrival order. Each parsed snapshot
/// fully replaces the stored state before its changes are published;
/// malformed datagrams are dropped without disturbing the loop.
async fn receive_loop(shared: Arc<Shared>, ready: oneshot::Sender<()>) {
    let mut ready = Some(ready);
    let mut buffer = [0u8; 4096];

    while shared.running.load(Ordering::SeqCst) {
        let size = match shared.channel.recv(&mut buffer).await {
            Ok(Some(size)) => size,
            // Timeout slice elapsed; re-check the running flag.
            Ok(None) => continue,
            Err(e) => {
                debug!("receive failed: {e}");
                continue;
            }
        };

        let status = match protocol::parse_status(&buffer[..size]) {
            Ok(status) => status,
            Err(e) => {
                debug!("dropping malformed datagram: {e}");
                continue;
            }
        };

        let changes = {
            let mut state = shared.state.lock().unwrap();
            state.apply_status(&status)
        };
        for change in changes {
            shared.dispatcher.publish(change);
        }

        if let Some(tx) = ready.take() {
            let _ = tx.send(());
        }
    }
}

/// Requests a status snapshot every tick. A failed request is logged and
/// retried on the next tick; there is no backoff and no give-up, a local
/// fixture is expected to reappear.
async fn poll_loop(shared: Arc<Shared>, interval: Duration, configured_name: String) {
    loop {
        runtime::sleep(interval).await;
        if !shared.running.load(Ordering::SeqCst) {
            break;
        }

        if let Err(e) = send_payload(&shared, &Payload::status_request()).await {
            debug!(
                "polling of {} failed: {e}",
                display_name(&shared, &configured_name)
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use serde_json::json;
    use tokio::sync::mpsc;

    const MAC: &str = "aa:bb:cc:dd:ee:ff";

    fn status_json(fading_off: bool, hue: u16, saturation: u16, brightness: u16) -> String {
        json!({
            "fadingOff": fading_off,
            "hue": hue,
            "saturation": saturation,
            "brightness": brightness,
            "mdnsName": "exoy-2a41f7",
            "userDefinedName": "Hexagon wall",
            "firmwareVersion": "1.4.2",
        })
        .to_string()
    }

    /// Fake fixture answering each status request with the next canned
    /// snapshot (the last one repeats). Every inbound datagram is copied
    /// to the returned channel for assertions.
    async fn spawn_fake_device(statuses: Vec<String>) -> (u16, mpsc::UnboundedReceiver<String>) {
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];
            let mut served = 0usize;
            loop {
                let Ok((size, addr)) = socket.recv_from(&mut buffer).await else {
                    break;
                };
                let msg = String::from_utf8_lossy(&buffer[..size]).to_string();
                let is_status_request = msg.contains("getData");
                if tx.send(msg).is_err() {
                    break;
                }
                if is_status_request {
                    let reply = &statuses[served.min(statuses.len() - 1)];
                    served += 1;
                    let _ = socket.send_to(reply.as_bytes(), addr).await;
                }
            }
        });

        (port, rx)
    }

    fn test_options(port: u16) -> ConnectOptions {
        ConnectOptions {
            port,
            polling_interval: Duration::from_millis(50),
            ready_timeout: Duration::from_secs(2),
        }
    }

    async fn recv_msg(rx: &mut mpsc::UnboundedReceiver<String>) -> String {
        tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no datagram within deadline")
            .expect("fake device channel closed")
    }

    #[tokio::test]
    async fn connect_waits_for_first_snapshot() {
        let (port, mut sent) = spawn_fake_device(vec![status_json(false, 128, 128, 150)]).await;
        let identity = DeviceIdentity::new("127.0.0.1", "Studio light", MAC);

        let light = LightInstance::connect_with(identity, test_options(port))
            .await
            .unwrap();

        assert_eq!(recv_msg(&mut sent).await, r#"{"getData":1}"#);
        assert_eq!(light.get(Property::Hue), 179);
        assert_eq!(light.get(Property::Saturation), 51);
        assert_eq!(light.get(Property::Brightness), 47);
        assert_eq!(light.get(Property::Power), 1);
        assert_eq!(light.display_name(), "Hexagon wall");
        assert_eq!(light.info().unwrap().firmware_version, "1.4.2");
        assert_eq!(light.name(), "Studio light");
        assert_eq!(light.mac(), MAC);
        assert!(light.is_running());

        light.stop().await;
    }

    #[tokio::test]
    async fn silent_device_times_out_without_an_instance() {
        // Bound but mute: requests go nowhere.
        let socket = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = socket.local_addr().unwrap().port();

        let identity = DeviceIdentity::new("127.0.0.1", "Studio light", MAC);
        let options = ConnectOptions {
            ready_timeout: Duration::from_millis(200),
            ..test_options(port)
        };

        let result = LightInstance::connect_with(identity, options).await;
        assert!(matches!(result, Err(Error::ReadyTimeout { .. })));
    }

    #[tokio::test]
    async fn unresolvable_host_fails_construction() {
        let identity = DeviceIdentity::new("no-such-host.invalid", "Studio light", MAC);
        let result = LightInstance::connect(identity).await;
        assert!(matches!(result, Err(Error::Connect { .. })));
    }

    #[tokio::test]
    async fn writes_take_the_documented_shapes() {
        let (port, mut sent) = spawn_fake_device(vec![status_json(false, 128, 128, 150)]).await;
        let identity = DeviceIdentity::new("127.0.0.1", "Studio light", MAC);
        let options = ConnectOptions {
            // Long enough that no poll interleaves with the writes below.
            polling_interval: Duration::from_secs(60),
            ..test_options(port)
        };

        let light = LightInstance::connect_with(identity, options).await.unwrap();
        assert_eq!(recv_msg(&mut sent).await, r#"{"getData":1}"#);

        // Brightness travels alone; host 50 scales to native 157.
        light.set_brightness(50).await.unwrap();
        assert_eq!(recv_msg(&mut sent).await, r#"{"setBrightness":157}"#);

        // Hue 400 clamps to the host-360 native value; the never-sent
        // saturation rides along at the bottom of its range.
        light.set_hue(400).await.unwrap();
        assert_eq!(recv_msg(&mut sent).await, r#"{"setHue":255,"setSaturation":1}"#);

        // Saturation re-sends the hue we just set.
        light.set_saturation(100).await.unwrap();
        assert_eq!(recv_msg(&mut sent).await, r#"{"setHue":255,"setSaturation":255}"#);

        light.set_power(false).await.unwrap();
        assert_eq!(recv_msg(&mut sent).await, r#"{"togglePower":0}"#);

        light.stop().await;
    }

    #[tokio::test]
    async fn polling_diffs_and_notifies_subscribers() {
        let (port, _sent) = spawn_fake_device(vec![
            status_json(false, 128, 128, 150),
            status_json(false, 128, 128, 200),
        ])
        .await;
        let identity = DeviceIdentity::new("127.0.0.1", "Studio light", MAC);

        let light = LightInstance::connect_with(identity, test_options(port))
            .await
            .unwrap();
        let mut changes = light.subscribe();

        let change = tokio::time::timeout(Duration::from_secs(2), changes.next())
            .await
            .expect("no change within deadline")
            .expect("change stream ended");
        assert_eq!(change, PropertyChange::Brightness(72));

        light.stop().await;
    }

    #[tokio::test]
    async fn empty_device_name_falls_back_to_identity() {
        let reply = json!({
            "fadingOff": false,
            "hue": 1,
            "saturation": 1,
            "brightness": 60,
            "mdnsName": "exoy-2a41f7",
            "userDefinedName": "",
            "firmwareVersion": "1.4.2",
        })
        .to_string();
        let (port, _sent) = spawn_fake_device(vec![reply]).await;
        let identity = DeviceIdentity::new("127.0.0.1", "Studio light", MAC);

        let light = LightInstance::connect_with(identity, test_options(port))
            .await
            .unwrap();
        assert_eq!(light.display_name(), "Studio light");

        light.stop().await;
    }

    #[tokio::test]
    async fn update_address_retargets_and_records_host() {
        let (port, _sent) = spawn_fake_device(vec![status_json(false, 128, 128, 150)]).await;
        let identity = DeviceIdentity::new("127.0.0.1", "Studio light", MAC);

        let light = LightInstance::connect_with(identity, test_options(port))
            .await
            .unwrap();
        assert_eq!(light.host(), "127.0.0.1");

        light.update_address("localhost").await.unwrap();
        assert_eq!(light.host(), "localhost");

        light.stop().await;
    }

    #[tokio::test]
    async fn stop_halts_periodic_traffic() {
        let (port, mut sent) = spawn_fake_device(vec![status_json(false, 128, 128, 150)]).await;
        let identity = DeviceIdentity::new("127.0.0.1", "Studio light", MAC);

        let light = LightInstance::connect_with(identity, test_options(port))
            .await
            .unwrap();
        assert!(light.is_running());
        light.stop().await;

        // Drain whatever was in flight, then expect silence.
        while tokio::time::timeout(Duration::from_millis(200), sent.recv())
            .await
            .is_ok()
        {}
        let quiet = tokio::time::timeout(Duration::from_millis(200), sent.recv()).await;
        assert!(quiet.is_err());
    }
}
