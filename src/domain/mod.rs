//! Domain model: the purchase session state machine, inventory snapshots,
//! host notifications and the ports to the billing provider and the host.

pub mod catalog;
pub mod inventory;
pub mod notification;
pub mod ports;
pub mod purchase;
pub mod session;
