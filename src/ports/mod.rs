//! Port traits: the boundaries between the domain and the outside world.

pub mod config_port;
pub mod price_port;
pub mod report_port;
