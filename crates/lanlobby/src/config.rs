//! Lobby configuration.

use std::net::Ipv4Addr;

use lanlobby_beacon::BeaconConfig;
use lanlobby_session::RegistryConfig;
use serde::{Deserialize, Serialize};

use crate::LobbyError;

/// Configuration for [`LanSessionInterface`](crate::LanSessionInterface).
///
/// Every field has a default, so a JSON file only needs what it changes:
///
/// ```rust
/// use lanlobby::LobbyConfig;
///
/// let config = LobbyConfig::from_json_str(r#"{ "game_port": 9000 }"#).unwrap();
/// assert_eq!(config.game_port, 9000);
/// assert_eq!(config.beacon.announce_port, 14001);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    pub beacon: BeaconConfig,

    /// The game server's port. Advertised as the port of every hosted
    /// session's address. Default: 7777.
    pub game_port: u16,

    /// Routed searches listen on `game_port + client_port_offset`.
    pub client_port_offset: u16,

    /// Routed hosts listen on `game_port + host_port_offset`.
    pub host_port_offset: u16,

    /// Dedicated server: hosts every session it creates and registers no
    /// local talkers.
    pub is_dedicated: bool,

    /// Stamped into every created session.
    pub build_unique_id: i32,

    /// Advertise this address instead of the detected local one.
    pub host_ip: Option<Ipv4Addr>,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            beacon: BeaconConfig::default(),
            game_port: 7777,
            client_port_offset: 2,
            host_port_offset: 1,
            is_dedicated: false,
            build_unique_id: 0,
            host_ip: None,
        }
    }
}

impl LobbyConfig {
    /// Parses a JSON config. Missing fields keep their defaults.
    ///
    /// # Errors
    /// Returns [`LobbyError::Config`] on malformed JSON or mistyped fields.
    pub fn from_json_str(json: &str) -> Result<Self, LobbyError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn routed_host_port(&self) -> u16 {
        self.game_port.saturating_add(self.host_port_offset)
    }

    pub fn routed_client_port(&self) -> u16 {
        self.game_port.saturating_add(self.client_port_offset)
    }

    pub(crate) fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            is_dedicated: self.is_dedicated,
            build_unique_id: self.build_unique_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lobby_config_defaults() {
        let config = LobbyConfig::default();
        assert_eq!(config.game_port, 7777);
        assert_eq!(config.routed_host_port(), 7778);
        assert_eq!(config.routed_client_port(), 7779);
        assert!(!config.is_dedicated);
        assert_eq!(config.host_ip, None);
    }

    #[test]
    fn test_from_json_str_nested_beacon_overrides() {
        let config = LobbyConfig::from_json_str(
            r#"{
                "is_dedicated": true,
                "host_ip": "10.0.0.5",
                "beacon": { "game_unique_id": 42, "query_timeout_ms": 250 }
            }"#,
        )
        .unwrap();
        assert!(config.is_dedicated);
        assert_eq!(config.host_ip, Some(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(config.beacon.game_unique_id, 42);
        assert_eq!(config.beacon.query_timeout_ms, 250);
        assert_eq!(config.beacon.announce_port, 14001);
    }

    #[test]
    fn test_from_json_str_bad_type_returns_config_error() {
        let err = LobbyConfig::from_json_str(r#"{ "game_port": "seven" }"#).unwrap_err();
        assert!(matches!(err, LobbyError::Config(_)));
    }

    #[test]
    fn test_routed_ports_saturate() {
        let config = LobbyConfig {
            game_port: u16::MAX,
            ..Default::default()
        };
        assert_eq!(config.routed_host_port(), u16::MAX);
    }
}
