//! Test fixtures

mod logging;
mod swarm;

pub use logging::WarnCounter;
pub use swarm::{Peer, Swarm, dead_endpoint, patterned_data, vanishing_peer};
