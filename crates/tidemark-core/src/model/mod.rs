//! Normalized entity types mirrored from the remote daemon.
//!
//! Every field here is post-normalization: wire-level casing, sentinel values
//! and per-tracker aggregates have already been resolved by the sync engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state reported by the daemon for a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TorrentStatus {
    /// Torrent is stopped and idle.
    #[default]
    Stopped,
    /// Queued for a local data verification pass.
    CheckWait,
    /// Local data is being verified.
    Checking,
    /// Queued for download.
    DownloadWait,
    /// Actively downloading.
    Downloading,
    /// Queued for seeding.
    SeedWait,
    /// Actively seeding.
    Seeding,
}

impl TorrentStatus {
    /// Map the daemon's numeric status code onto the typed state.
    ///
    /// Unknown codes fold into [`TorrentStatus::Stopped`] so a newer server
    /// cannot wedge the mirror.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            1 => Self::CheckWait,
            2 => Self::Checking,
            3 => Self::DownloadWait,
            4 => Self::Downloading,
            5 => Self::SeedWait,
            6 => Self::Seeding,
            _ => Self::Stopped,
        }
    }
}

/// Bandwidth priority assigned to a torrent or file group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BandwidthPriority {
    /// Throttled below normal transfers.
    Low,
    /// Default priority.
    #[default]
    Normal,
    /// Preferred over normal transfers.
    High,
}

impl BandwidthPriority {
    /// Map the daemon's `-1/0/1` encoding onto the typed priority.
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        match code {
            i64::MIN..=-1 => Self::Low,
            1..=i64::MAX => Self::High,
            0 => Self::Normal,
        }
    }

    /// Wire encoding expected by the daemon.
    #[must_use]
    pub const fn to_code(self) -> i64 {
        match self {
            Self::Low => -1,
            Self::Normal => 0,
            Self::High => 1,
        }
    }
}

/// One mirrored torrent entity, keyed by the server-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Torrent {
    /// Stable server-assigned identifier.
    pub id: i64,
    /// Current lifecycle state.
    pub status: TorrentStatus,
    /// Daemon error code; zero when healthy.
    pub error_code: i64,
    /// Human-readable daemon error message, empty when healthy.
    pub error_message: String,
    /// Display name.
    pub name: String,
    /// Total payload size in bytes.
    pub total_size: u64,
    /// Completion fraction in `0.0..=1.0`.
    pub percent_done: f64,
    /// Verification progress fraction in `0.0..=1.0`.
    pub recheck_progress: f64,
    /// Bytes downloaded over the torrent's lifetime.
    pub downloaded_ever: u64,
    /// Bytes uploaded over the torrent's lifetime.
    pub uploaded_ever: u64,
    /// Share ratio in parts per thousand; zero when the daemon reports an
    /// unknown ratio.
    pub ratio_permille: u64,
    /// Current download rate in bytes per second.
    pub rate_download: u64,
    /// Current upload rate in bytes per second.
    pub rate_upload: u64,
    /// Estimated seconds to completion; zero when unknown.
    pub eta_seconds: u64,
    /// Peers we are currently downloading from.
    pub peers_sending: u64,
    /// Peers we are currently uploading to.
    pub peers_getting: u64,
    /// Leechers summed across all trackers.
    pub total_leechers: u64,
    /// Seeders summed across all trackers.
    pub total_seeders: u64,
    /// Position in the daemon's queue.
    pub queue_position: i64,
    /// When the torrent was added, if the daemon reported it.
    pub added_at: Option<DateTime<Utc>>,
    /// When the download finished, if it has.
    pub completed_at: Option<DateTime<Utc>>,
    /// Download directory on the daemon host.
    pub download_dir: String,
    /// Magnet link reconstructed by the daemon.
    pub magnet_link: String,
    /// Content hash string.
    pub hash: String,
    /// Whether the daemon considers the transfer stalled.
    pub is_stalled: bool,
    /// Currently connected peer count.
    pub peers_connected: u64,
    /// User-assigned labels.
    pub labels: Vec<String>,
    /// Bandwidth priority for the whole torrent.
    pub bandwidth_priority: BandwidthPriority,
}

impl Torrent {
    /// Completion predicate used for completion-notification detection and
    /// the store's active-id accessor.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.percent_done >= 1.0
    }
}

/// Priority of a single file within a torrent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FilePriority {
    /// File is not wanted and will not be downloaded.
    Excluded,
    /// Wanted, throttled priority.
    Low,
    /// Wanted, default priority.
    #[default]
    Normal,
    /// Wanted, preferred priority.
    High,
}

impl FilePriority {
    /// Derive the normalized priority from the daemon's `-1/0/1` priority
    /// code and the wanted flag. Unwanted files are always `Excluded`.
    #[must_use]
    pub const fn from_wire(wanted: bool, code: i64) -> Self {
        if !wanted {
            return Self::Excluded;
        }
        match code {
            i64::MIN..=-1 => Self::Low,
            1..=i64::MAX => Self::High,
            0 => Self::Normal,
        }
    }

    /// Numeric level used by callers issuing priority changes: `0` excluded,
    /// `1/2/3` low/normal/high.
    #[must_use]
    pub const fn level(self) -> u8 {
        match self {
            Self::Excluded => 0,
            Self::Low => 1,
            Self::Normal => 2,
            Self::High => 3,
        }
    }
}

/// One file inside a torrent. Fetched on demand, never persisted across
/// refreshes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentFile {
    /// Full path within the torrent payload.
    pub name: String,
    /// Short display name (final path component).
    pub display_name: String,
    /// Total size in bytes.
    pub total_size: u64,
    /// Bytes downloaded so far.
    pub bytes_completed: u64,
    /// Normalized priority.
    pub priority: FilePriority,
}

/// Per-tracker statistics attached to a torrent detail view.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct TrackerStat {
    /// Announce URL.
    pub announce: String,
    /// Last announce result message from the tracker.
    pub last_announce_result: String,
    /// Last scrape result message from the tracker.
    pub last_scrape_result: String,
    /// Seeders known to this tracker; `None` when the tracker has not
    /// answered a scrape yet.
    pub seeder_count: Option<u64>,
    /// Leechers known to this tracker.
    pub leecher_count: Option<u64>,
}

/// Detailed view of one torrent, combining the mirrored entity with data
/// only fetched on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TorrentDetail {
    /// The normalized torrent entity.
    pub torrent: Torrent,
    /// Tracker statistics.
    pub trackers: Vec<TrackerStat>,
    /// Free-form comment embedded in the metainfo.
    pub comment: String,
    /// Creator string embedded in the metainfo.
    pub creator: String,
    /// Piece count.
    pub piece_count: u64,
    /// Piece size in bytes.
    pub piece_size: u64,
}

/// One connected peer, fetched on demand.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PeerSnapshot {
    /// Remote address.
    pub address: String,
    /// Client software string.
    pub client_name: String,
    /// Peer's completion fraction.
    pub progress: f64,
    /// Bytes per second we receive from this peer.
    pub rate_to_client: u64,
    /// Bytes per second we send to this peer.
    pub rate_to_peer: u64,
    /// Whether the connection is encrypted.
    pub is_encrypted: bool,
}

/// Session-wide settings singleton, replaced wholesale on every fetch.
///
/// Defaults mirror the daemon's documented defaults and are used whenever a
/// field is absent from the wire response; optionality is per-field, never
/// per-entity.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Alternate ("turtle") download limit, KB/s.
    pub alt_speed_down: u64,
    /// Alternate upload limit, KB/s.
    pub alt_speed_up: u64,
    /// Whether the alternate limits are active.
    pub alt_speed_enabled: bool,
    /// Whether the alternate-limit schedule is active.
    pub alt_speed_time_enabled: bool,
    /// Schedule start, minutes after midnight.
    pub alt_speed_time_begin: u64,
    /// Schedule end, minutes after midnight.
    pub alt_speed_time_end: u64,
    /// Schedule day bitmask.
    pub alt_speed_time_day: u64,
    /// Global download limit, KB/s.
    pub speed_limit_down: u64,
    /// Whether the global download limit is active.
    pub speed_limit_down_enabled: bool,
    /// Global upload limit, KB/s.
    pub speed_limit_up: u64,
    /// Whether the global upload limit is active.
    pub speed_limit_up_enabled: bool,
    /// Whether the blocklist is consulted.
    pub blocklist_enabled: bool,
    /// Blocklist source URL.
    pub blocklist_url: String,
    /// Number of rules in the current blocklist.
    pub blocklist_size: u64,
    /// Distributed hash table participation.
    pub dht_enabled: bool,
    /// Peer-exchange participation.
    pub pex_enabled: bool,
    /// Local peer discovery participation.
    pub lpd_enabled: bool,
    /// Micro transport protocol enablement.
    pub utp_enabled: bool,
    /// Encryption mode: `required`, `preferred` or `tolerated`.
    pub encryption: String,
    /// Default download directory.
    pub download_dir: String,
    /// Staging directory for incomplete downloads.
    pub incomplete_dir: String,
    /// Whether the staging directory is used.
    pub incomplete_dir_enabled: bool,
    /// Whether incomplete files carry a `.part` suffix.
    pub rename_partial_files: bool,
    /// Global connected-peer cap.
    pub peer_limit_global: u64,
    /// Per-torrent connected-peer cap.
    pub peer_limit_per_torrent: u64,
    /// Listening port for incoming peers.
    pub peer_port: u64,
    /// Whether the port is randomized at startup.
    pub peer_port_random_on_start: bool,
    /// Whether the daemon requests a port mapping from the router.
    pub port_forwarding_enabled: bool,
    /// Whether stalled transfers are exempt from queue slots.
    pub queue_stalled_enabled: bool,
    /// Minutes of inactivity before a transfer counts as stalled.
    pub queue_stalled_minutes: u64,
    /// Maximum simultaneously downloading torrents.
    pub download_queue_size: u64,
    /// Whether the download queue is enforced.
    pub download_queue_enabled: bool,
    /// Maximum simultaneously seeding torrents.
    pub seed_queue_size: u64,
    /// Whether the seed queue is enforced.
    pub seed_queue_enabled: bool,
    /// Stop seeding at this share ratio.
    pub seed_ratio_limit: f64,
    /// Whether the seed-ratio limit is enforced.
    pub seed_ratio_limited: bool,
    /// Stop seeding after this many idle minutes.
    pub idle_seeding_limit: u64,
    /// Whether the idle-seeding limit is enforced.
    pub idle_seeding_limit_enabled: bool,
    /// Whether a script runs when a torrent finishes.
    pub script_torrent_done_enabled: bool,
    /// Path of the torrent-done script.
    pub script_torrent_done_filename: String,
    /// Whether newly added torrents start immediately.
    pub start_added_torrents: bool,
    /// RPC protocol version reported by the daemon; gates wire key casing.
    pub rpc_version: i64,
    /// Daemon software version string.
    pub version: String,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            alt_speed_down: 50,
            alt_speed_up: 50,
            alt_speed_enabled: false,
            alt_speed_time_enabled: false,
            alt_speed_time_begin: 540,
            alt_speed_time_end: 1020,
            alt_speed_time_day: 127,
            speed_limit_down: 100,
            speed_limit_down_enabled: false,
            speed_limit_up: 100,
            speed_limit_up_enabled: false,
            blocklist_enabled: false,
            blocklist_url: String::new(),
            blocklist_size: 0,
            dht_enabled: true,
            pex_enabled: true,
            lpd_enabled: false,
            utp_enabled: true,
            encryption: "preferred".to_string(),
            download_dir: String::new(),
            incomplete_dir: String::new(),
            incomplete_dir_enabled: false,
            rename_partial_files: true,
            peer_limit_global: 240,
            peer_limit_per_torrent: 60,
            peer_port: 51413,
            peer_port_random_on_start: false,
            port_forwarding_enabled: true,
            queue_stalled_enabled: true,
            queue_stalled_minutes: 30,
            download_queue_size: 5,
            download_queue_enabled: true,
            seed_queue_size: 10,
            seed_queue_enabled: false,
            seed_ratio_limit: 2.0,
            seed_ratio_limited: false,
            idle_seeding_limit: 30,
            idle_seeding_limit_enabled: false,
            script_torrent_done_enabled: false,
            script_torrent_done_filename: String::new(),
            start_added_torrents: true,
            rpc_version: 0,
            version: String::new(),
        }
    }
}

/// One aggregate transfer-rate sample appended per refresh cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedSample {
    /// When the sample was taken.
    pub time: DateTime<Utc>,
    /// Sum of all torrents' download rates, bytes per second.
    pub download_bps: u64,
    /// Sum of all torrents' upload rates, bytes per second.
    pub upload_bps: u64,
}
