//! Port registry domain module (PortMaster records).
//!
//! Ports are referenced by shipments through their [`PortCode`]. Ports are
//! never removed: deleting one marks it inactive.

pub mod code;
pub mod port;

pub use code::PortCode;
pub use port::Port;
