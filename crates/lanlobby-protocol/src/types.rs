//! Shared data types that travel inside beacon responses.
//!
//! - [`UniqueNetId`] identifies a player or session owner.
//! - [`SettingValue`] + [`Advertisement`] make up one entry of a session's
//!   key/value settings bag.
//! - [`SessionSettings`] is the host-configured description of a session.
//! - [`SessionAdvert`] is the full response payload a host sends back to a
//!   searching client.
//!
//! Field order in every `encode`/`decode` pair is part of the wire
//! protocol. Changing it requires bumping [`PACKET_VERSION`](crate::PACKET_VERSION).

use std::collections::BTreeMap;
use std::fmt;
use std::net::{Ipv4Addr, SocketAddrV4};

use serde::{Deserialize, Serialize};

use crate::codec::{NboReader, NboWriter, WireDecode, WireEncode};
use crate::ProtocolError;

// ---------------------------------------------------------------------------
// UniqueNetId
// ---------------------------------------------------------------------------

/// Opaque player identifier.
///
/// On the LAN there is no online service handing out ids, so these are
/// whatever string the identity provider returns (often a machine name
/// plus a player index).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UniqueNetId(pub String);

impl UniqueNetId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for UniqueNetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UniqueNetId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl WireEncode for UniqueNetId {
    fn encode(&self, w: &mut NboWriter) {
        w.write_str(&self.0);
    }
}

impl WireDecode for UniqueNetId {
    fn decode(r: &mut NboReader<'_>) -> Self {
        Self(r.read_string())
    }
}

// Host addresses are an IPv4 `u32` followed by a `u16` port.
impl WireEncode for SocketAddrV4 {
    fn encode(&self, w: &mut NboWriter) {
        w.write_u32(u32::from(*self.ip())).write_u16(self.port());
    }
}

impl WireDecode for SocketAddrV4 {
    fn decode(r: &mut NboReader<'_>) -> Self {
        let ip = Ipv4Addr::from(r.read_u32());
        let port = r.read_u16();
        SocketAddrV4::new(ip, port)
    }
}

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// A typed session setting value.
///
/// On the wire each value is a one-byte type tag followed by the payload.
/// An unknown tag decodes as [`SettingValue::Empty`] and poisons the reader,
/// since we can't know how many bytes to skip.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum SettingValue {
    #[default]
    Empty,
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Double(f64),
    String(String),
    Float(f32),
    Blob(Vec<u8>),
    Bool(bool),
}

impl SettingValue {
    fn tag(&self) -> u8 {
        match self {
            Self::Empty => 0,
            Self::Int32(_) => 1,
            Self::UInt32(_) => 2,
            Self::Int64(_) => 3,
            Self::UInt64(_) => 4,
            Self::Double(_) => 5,
            Self::String(_) => 6,
            Self::Float(_) => 7,
            Self::Blob(_) => 8,
            Self::Bool(_) => 9,
        }
    }
}

impl WireEncode for SettingValue {
    fn encode(&self, w: &mut NboWriter) {
        w.write_u8(self.tag());
        match self {
            Self::Empty => {}
            Self::Int32(v) => {
                w.write_i32(*v);
            }
            Self::UInt32(v) => {
                w.write_u32(*v);
            }
            Self::Int64(v) => {
                w.write_i64(*v);
            }
            Self::UInt64(v) => {
                w.write_u64(*v);
            }
            Self::Double(v) => {
                w.write_f64(*v);
            }
            Self::String(v) => {
                w.write_str(v);
            }
            Self::Float(v) => {
                w.write_f32(*v);
            }
            Self::Blob(v) => {
                w.write_blob(v);
            }
            Self::Bool(v) => {
                w.write_bool(*v);
            }
        }
    }
}

impl WireDecode for SettingValue {
    fn decode(r: &mut NboReader<'_>) -> Self {
        match r.read_u8() {
            1 => Self::Int32(r.read_i32()),
            2 => Self::UInt32(r.read_u32()),
            3 => Self::Int64(r.read_i64()),
            4 => Self::UInt64(r.read_u64()),
            5 => Self::Double(r.read_f64()),
            6 => Self::String(r.read_string()),
            7 => Self::Float(r.read_f32()),
            8 => Self::Blob(r.read_blob()),
            9 => Self::Bool(r.read_bool()),
            0 => Self::Empty,
            _ => {
                // Unknown width: nothing after this can be trusted.
                r.poison();
                Self::Empty
            }
        }
    }
}

/// Who gets to see a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum Advertisement {
    /// Local only. Never leaves this process.
    #[default]
    DontAdvertise,
    /// Visible to ping queries only (not sent in LAN responses).
    ViaPingOnly,
    /// Sent to discoverers.
    ViaOnlineService,
    /// Sent to discoverers and ping queries.
    ViaOnlineServiceAndPing,
}

impl Advertisement {
    /// Whether this entry crosses the wire in a session advert.
    pub fn is_advertised(self) -> bool {
        self >= Self::ViaOnlineService
    }
}

/// One entry in the settings bag.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SessionSetting {
    pub value: SettingValue,
    pub advertisement: Advertisement,
}

impl SessionSetting {
    pub fn new(value: SettingValue, advertisement: Advertisement) -> Self {
        Self {
            value,
            advertisement,
        }
    }
}

/// The host-configured description of a session.
///
/// `num_public_connections`/`num_private_connections` are the configured
/// capacity. The live open-slot counters live on the registry's session
/// record, not here.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    pub num_public_connections: u32,
    pub num_private_connections: u32,
    pub should_advertise: bool,
    pub is_lan_match: bool,
    pub is_dedicated: bool,
    pub uses_stats: bool,
    pub allow_join_in_progress: bool,
    pub allow_invites: bool,
    pub uses_presence: bool,
    pub allow_join_via_presence: bool,
    pub allow_join_via_presence_friends_only: bool,
    pub anti_cheat_protected: bool,
    pub build_unique_id: i32,
    /// Keyed settings. `BTreeMap` keeps the wire order deterministic.
    pub settings: BTreeMap<String, SessionSetting>,
}

impl SessionSettings {
    /// Inserts or replaces a keyed setting.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: SettingValue,
        advertisement: Advertisement,
    ) {
        self.settings
            .insert(key.into(), SessionSetting::new(value, advertisement));
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.settings.get(key).map(|s| &s.value)
    }

    pub fn remove(&mut self, key: &str) -> Option<SessionSetting> {
        self.settings.remove(key)
    }

    /// Settings that cross the wire, in key order.
    pub fn advertised(&self) -> impl Iterator<Item = (&String, &SessionSetting)> {
        self.settings
            .iter()
            .filter(|(_, s)| s.advertisement.is_advertised())
    }

    fn flags(&self) -> [bool; 10] {
        [
            self.should_advertise,
            self.is_lan_match,
            self.is_dedicated,
            self.uses_stats,
            self.allow_join_in_progress,
            self.allow_invites,
            self.uses_presence,
            self.allow_join_via_presence,
            self.allow_join_via_presence_friends_only,
            self.anti_cheat_protected,
        ]
    }
}

fn count_to_wire(n: u32) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

fn count_from_wire(n: i32) -> u32 {
    u32::try_from(n).unwrap_or(0)
}

impl WireEncode for SessionSettings {
    fn encode(&self, w: &mut NboWriter) {
        w.write_i32(count_to_wire(self.num_public_connections))
            .write_i32(count_to_wire(self.num_private_connections));
        for flag in self.flags() {
            w.write_bool(flag);
        }
        w.write_i32(self.build_unique_id);

        let advertised: Vec<_> = self.advertised().collect();
        w.write_i32(i32::try_from(advertised.len()).unwrap_or(i32::MAX));
        for (key, setting) in advertised {
            w.write_str(key).write(&setting.value);
        }
    }
}

impl WireDecode for SessionSettings {
    fn decode(r: &mut NboReader<'_>) -> Self {
        let mut out = SessionSettings {
            num_public_connections: count_from_wire(r.read_i32()),
            num_private_connections: count_from_wire(r.read_i32()),
            should_advertise: r.read_bool(),
            is_lan_match: r.read_bool(),
            is_dedicated: r.read_bool(),
            uses_stats: r.read_bool(),
            allow_join_in_progress: r.read_bool(),
            allow_invites: r.read_bool(),
            uses_presence: r.read_bool(),
            allow_join_via_presence: r.read_bool(),
            allow_join_via_presence_friends_only: r.read_bool(),
            anti_cheat_protected: r.read_bool(),
            build_unique_id: r.read_i32(),
            settings: BTreeMap::new(),
        };

        let count = r.read_i32();
        let mut read = 0;
        while read < count && !r.has_overflow() {
            let key = r.read_string();
            let value = r.read::<SettingValue>();
            // Whatever arrived was advertised by definition.
            out.settings.insert(
                key,
                SessionSetting::new(value, Advertisement::ViaOnlineService),
            );
            read += 1;
        }

        // Never keep a partially decoded settings bag.
        if r.has_overflow() {
            out.settings.clear();
        }
        out
    }
}

// ---------------------------------------------------------------------------
// SessionAdvert
// ---------------------------------------------------------------------------

/// Everything a host tells a searching client about one session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionAdvert {
    pub owning_user_id: UniqueNetId,
    pub owning_user_name: String,
    pub num_open_private_connections: u32,
    pub num_open_public_connections: u32,
    pub host_addr: Option<SocketAddrV4>,
    pub session_id: String,
    pub settings: SessionSettings,
}

impl WireEncode for SessionAdvert {
    fn encode(&self, w: &mut NboWriter) {
        let host = self
            .host_addr
            .unwrap_or(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0));
        w.write(&self.owning_user_id)
            .write_str(&self.owning_user_name)
            .write_i32(count_to_wire(self.num_open_private_connections))
            .write_i32(count_to_wire(self.num_open_public_connections))
            .write(&host)
            .write_str(&self.session_id)
            .write(&self.settings);
    }
}

impl SessionAdvert {
    /// Reads an advert from a response payload.
    ///
    /// Overflow while reading the fixed fields means the advert is garbage.
    /// Overflow inside the dynamic settings block only empties the settings
    /// bag; the rest of the advert is still usable.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Truncated`] if any fixed field could not be read.
    pub fn read(r: &mut NboReader<'_>) -> Result<Self, ProtocolError> {
        let owning_user_id = r.read::<UniqueNetId>();
        let owning_user_name = r.read_string();
        let num_open_private_connections = count_from_wire(r.read_i32());
        let num_open_public_connections = count_from_wire(r.read_i32());
        let host = r.read::<SocketAddrV4>();
        let session_id = r.read_string();
        if r.has_overflow() {
            return Err(ProtocolError::Truncated);
        }

        let settings = r.read::<SessionSettings>();
        // 0.0.0.0:0 is what a host without a resolved address writes.
        let host_addr = (*host.ip() != Ipv4Addr::UNSPECIFIED || host.port() != 0).then_some(host);
        Ok(Self {
            owning_user_id,
            owning_user_name,
            num_open_private_connections,
            num_open_public_connections,
            host_addr,
            session_id,
            settings,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
