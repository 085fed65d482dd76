//! Outbound messaging abstractions (WhatsApp Cloud API today).

pub mod branded;
pub mod port;
pub mod sink;
pub mod throttled;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;
