use std::net::Ipv4Addr;
use std::time::Duration;

use lanlobby_protocol::{GameIdentity, MAX_PACKET_SIZE, platform};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// BeaconConfig
// ---------------------------------------------------------------------------

/// Configuration for the LAN beacon.
///
/// Every field has a default, so a config file only needs the values it
/// changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeaconConfig {
    /// Port every LAN host listens on and every LAN search broadcasts to.
    ///
    /// Default: 14001.
    pub announce_port: u16,

    /// Distinguishes titles sharing the announce port. Default: 9999.
    pub game_unique_id: i32,

    /// Marker written into outgoing packets. Defaults to this build's
    /// endianness flag.
    pub platform_marker: u8,

    /// Incoming platform bytes are ANDed with this. Default: accept all.
    pub platform_mask: u8,

    /// How long (in milliseconds) a search waits without traffic before
    /// it completes. Default: 5000.
    pub query_timeout_ms: u64,

    /// First port tried when a routed beacon can't bind its preferred port.
    pub fallback_base_port: u16,

    /// How many ports from `fallback_base_port` to try.
    pub fallback_port_attempts: u16,

    /// Upper bound on any packet we build. Larger responses are not sent.
    pub max_packet_size: usize,

    /// Where LAN packets are broadcast. Default: 255.255.255.255.
    pub broadcast_addr: Ipv4Addr,
}

impl Default for BeaconConfig {
    fn default() -> Self {
        Self {
            announce_port: 14001,
            game_unique_id: 9999,
            platform_marker: platform::native(),
            platform_mask: platform::ANY,
            query_timeout_ms: 5000,
            fallback_base_port: 8000,
            fallback_port_attempts: 32,
            max_packet_size: MAX_PACKET_SIZE,
            broadcast_addr: Ipv4Addr::BROADCAST,
        }
    }
}

impl BeaconConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }

    /// The header fields that mark a packet as ours.
    pub fn identity(&self) -> GameIdentity {
        GameIdentity {
            game_unique_id: self.game_unique_id,
            platform_marker: self.platform_marker,
            platform_mask: self.platform_mask,
        }
    }
}
