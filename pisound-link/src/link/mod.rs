//! Wire protocol: frame layout, the exchange engine and identity decoding.

pub mod frame;
pub mod exchange;
pub mod identity;

pub use exchange::FrameExchange;
pub use frame::{Frame, Slot};
pub use identity::DeviceIdentity;
