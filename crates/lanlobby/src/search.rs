//! Search context: what a session search asked for and what it found.

use std::cmp::Ordering;
use std::fmt;
use std::net::SocketAddrV4;
use std::sync::Arc;
use std::time::Instant;

use lanlobby_protocol::SessionAdvert;

/// Where a search is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    NotStarted,
    InProgress,
    Done,
    Failed,
}

/// One discovered session.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub session: SessionAdvert,
    /// Milliseconds from search start to this response arriving. A rough
    /// latency figure, not a real ping.
    pub ping_ms: u32,
}

impl SearchResult {
    /// `"ip:port"` of the advertised host, if it sent one.
    pub fn connect_string(&self) -> Option<String> {
        self.session.host_addr.map(|addr| addr.to_string())
    }
}

/// Orders search results when a search completes.
pub type ResultComparator = Arc<dyn Fn(&SearchResult, &SearchResult) -> Ordering + Send + Sync>;

/// What to search for.
#[derive(Clone)]
pub struct SearchSettings {
    /// Broadcast to the subnet. When `false`, query `host_addr` directly.
    pub is_lan_query: bool,

    /// Host to query in a routed search.
    pub host_addr: Option<SocketAddrV4>,

    sort: Option<ResultComparator>,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self::lan()
    }
}

impl fmt::Debug for SearchSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SearchSettings")
            .field("is_lan_query", &self.is_lan_query)
            .field("host_addr", &self.host_addr)
            .field("custom_sort", &self.sort.is_some())
            .finish()
    }
}

impl SearchSettings {
    /// Broadcast search on the local subnet.
    pub fn lan() -> Self {
        Self {
            is_lan_query: true,
            host_addr: None,
            sort: None,
        }
    }

    /// Query one known host.
    pub fn routed(host_addr: SocketAddrV4) -> Self {
        Self {
            is_lan_query: false,
            host_addr: Some(host_addr),
            sort: None,
        }
    }

    /// Replaces the default ordering (lowest ping first).
    pub fn with_sort<C>(mut self, compare: C) -> Self
    where
        C: Fn(&SearchResult, &SearchResult) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(Arc::new(compare));
        self
    }
}

/// A search and its results. At most one is in flight per lobby.
#[derive(Debug, Clone)]
pub struct SessionSearch {
    pub settings: SearchSettings,
    pub results: Vec<SearchResult>,
    pub state: SearchState,
    pub(crate) nonce: u64,
    pub(crate) started_at: Instant,
}

impl SessionSearch {
    pub(crate) fn begin(settings: SearchSettings, nonce: u64) -> Self {
        Self {
            settings,
            results: Vec::new(),
            state: SearchState::InProgress,
            nonce,
            started_at: Instant::now(),
        }
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub(crate) fn elapsed_ms(&self) -> u32 {
        u32::try_from(self.started_at.elapsed().as_millis()).unwrap_or(u32::MAX)
    }

    /// Stable sort with the caller's comparator, or by ping.
    pub(crate) fn sort_results(&mut self) {
        match &self.settings.sort {
            Some(compare) => self.results.sort_by(|a, b| compare(a, b)),
            None => self.results.sort_by_key(|r| r.ping_ms),
        }
    }
}
