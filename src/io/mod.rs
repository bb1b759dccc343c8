//! Output side: message types, the publisher sink and bag files.

pub mod bag;
pub mod bus;
pub mod messages;

pub use bus::{Bus, BusMessage, Publisher, TRANSFORM_TOPIC};
pub use messages::{CloudMsg, OdometryMsg, TransformMsg};
