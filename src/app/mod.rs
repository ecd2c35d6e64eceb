//! Application core: command routing and event broadcast.
//!
//! Everything in here is pure logic behind port traits; the ESP-IDF
//! surfaces live in [`adapters`](crate::adapters) and only touch this
//! module through [`ports`].

pub mod broadcast;
pub mod events;
pub mod ports;
pub mod router;
