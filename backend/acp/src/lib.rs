pub mod announce;
pub mod client;
pub mod registry;
pub mod server;

pub use announce::{Announcer, DEFAULT_ANNOUNCE_TIMEOUT};
pub use client::{PeerLink, PeerLinkConfig, DESCRIPTOR_PATH, MAX_RPC_TIMEOUT};
pub use registry::{
    DispatchError, DispatchOutcome, PeerRegistry, PeerSummary, RegistrationReport,
    DEFAULT_SESSION_TAG,
};
pub use server::{build_gateway_router, serve, GatewayState, LEGACY_DESCRIPTOR_PATH};
