//! Wire objects and HTTP clients for the services ll0en talks to.
//!
//! - [`objects`] holds the payloads exchanged with the NationStates API,
//!   its server-sent happenings feed and the Eurocore telegram gateway.
//! - [`client`] (behind the `client` feature) holds typed `reqwest` clients
//!   for the NationStates API and Eurocore.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
