//! Change notifications for observed property transitions.

use std::sync::Mutex;

use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use strum_macros::{Display, EnumString};

/// A host-addressable property of a light fixture.
///
/// The string form matches the names host layers use to address
/// properties (`"hue"`, `"saturation"`, `"brightness"`, `"power"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "camelCase")]
pub enum Property {
    Hue,
    Saturation,
    Brightness,
    Power,
}

/// A single observed property transition, carrying the new normalized
/// value.
///
/// At most one change is emitted per property per status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyChange {
    Power(bool),
    Hue(i16),
    Saturation(u8),
    Brightness(u8),
}

impl PropertyChange {
    /// The property this change belongs to.
    pub fn property(&self) -> Property {
        match self {
            PropertyChange::Power(_) => Property::Power,
            PropertyChange::Hue(_) => Property::Hue,
            PropertyChange::Saturation(_) => Property::Saturation,
            PropertyChange::Brightness(_) => Property::Brightness,
        }
    }

    /// The new normalized value as a plain number (power as 0/1).
    pub fn value(&self) -> i32 {
        match self {
            PropertyChange::Power(on) => i32::from(*on),
            PropertyChange::Hue(hue) => i32::from(*hue),
            PropertyChange::Saturation(saturation) => i32::from(*saturation),
            PropertyChange::Brightness(brightness) => i32::from(*brightness),
        }
    }
}

/// Fans property changes out to any number of subscribers.
///
/// Each subscriber gets its own unbounded channel; changes published
/// while nobody is subscribed are silently discarded. Subscribers that
/// dropped their receiver are pruned on the next publish.
pub(crate) struct ChangeDispatcher {
    subscribers: Mutex<Vec<UnboundedSender<PropertyChange>>>,
}

impl ChangeDispatcher {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }

    pub fn subscribe(&self) -> UnboundedReceiver<PropertyChange> {
        let (tx, rx) = mpsc::unbounded();
        self.subscribers.lock().unwrap().push(tx);
        rx
    }

    pub fn publish(&self, change: PropertyChange) {
        self.subscribers
            .lock()
            .unwrap()
            .retain(|tx| tx.unbounded_send(change).is_ok());
    }

    #[cfg(test)]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn property_names_round_trip() {
        assert_eq!(Property::Power.to_string(), "power");
        assert_eq!(Property::from_str("hue").unwrap(), Property::Hue);
        assert_eq!(
            Property::from_str("brightness").unwrap(),
            Property::Brightness
        );
        assert!(Property::from_str("colorTemperature").is_err());
    }

    #[test]
    fn change_exposes_property_and_value() {
        let change = PropertyChange::Hue(-1);
        assert_eq!(change.property(), Property::Hue);
        assert_eq!(change.value(), -1);

        let change = PropertyChange::Power(true);
        assert_eq!(change.property(), Property::Power);
        assert_eq!(change.value(), 1);
    }

    #[test]
    fn publish_delivers_to_all_subscribers() {
        let dispatcher = ChangeDispatcher::new();
        let mut rx1 = dispatcher.subscribe();
        let mut rx2 = dispatcher.subscribe();

        dispatcher.publish(PropertyChange::Brightness(50));

        assert_eq!(rx1.try_next().unwrap(), Some(PropertyChange::Brightness(50)));
        assert_eq!(rx2.try_next().unwrap(), Some(PropertyChange::Brightness(50)));
    }

    #[test]
    fn publish_without_subscribers_is_discarded() {
        let dispatcher = ChangeDispatcher::new();
        dispatcher.publish(PropertyChange::Power(false));
        assert_eq!(dispatcher.subscriber_count(), 0);
    }

    #[test]
    fn dropped_subscribers_are_pruned() {
        let dispatcher = ChangeDispatcher::new();
        let rx = dispatcher.subscribe();
        let _rx2 = dispatcher.subscribe();
        drop(rx);

        dispatcher.publish(PropertyChange::Saturation(10));
        assert_eq!(dispatcher.subscriber_count(), 1);
    }
}
