//! Translation from wire records to the normalized model.
//!
//! Every accessor here reads defensively through the casing fallback, so
//! one normalization path serves every protocol dialect the daemon speaks.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tidemark_core::{
    BandwidthPriority, FilePriority, PeerSnapshot, SessionSettings, Torrent, TorrentFile,
    TorrentStatus, TrackerStat,
};
use tidemark_rpc::casing::field;

/// Integer field with a default for absent or mis-typed values.
#[must_use]
pub fn get_i64(map: &Map<String, Value>, key: &str, default: i64) -> i64 {
    field(map, key).and_then(Value::as_i64).unwrap_or(default)
}

/// Non-negative integer field; negatives and absence fold to the default.
#[must_use]
pub fn get_u64(map: &Map<String, Value>, key: &str, default: u64) -> u64 {
    field(map, key).and_then(Value::as_u64).unwrap_or(default)
}

/// Float field with a default.
#[must_use]
pub fn get_f64(map: &Map<String, Value>, key: &str, default: f64) -> f64 {
    field(map, key).and_then(Value::as_f64).unwrap_or(default)
}

/// Boolean field with a default.
#[must_use]
pub fn get_bool(map: &Map<String, Value>, key: &str, default: bool) -> bool {
    field(map, key).and_then(Value::as_bool).unwrap_or(default)
}

/// String field; absent values yield an empty string.
#[must_use]
pub fn get_string(map: &Map<String, Value>, key: &str) -> String {
    field(map, key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Array field; absent values yield an empty slice.
#[must_use]
pub fn get_array<'a>(map: &'a Map<String, Value>, key: &str) -> &'a [Value] {
    field(map, key)
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Share ratio in parts per thousand: `round(ratio × 1000)` for reported
/// ratios at or above zero, otherwise zero (the daemon uses negative
/// sentinels for unknown/infinite).
#[must_use]
pub fn ratio_permille(ratio: f64) -> u64 {
    if ratio >= 0.0 {
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        {
            (ratio * 1000.0).round() as u64
        }
    } else {
        0
    }
}

/// ETA in seconds: the daemon's negative sentinels (unknown, not available)
/// fold to zero.
#[must_use]
pub const fn eta_seconds(eta: i64) -> u64 {
    if eta > 0 { eta.unsigned_abs() } else { 0 }
}

fn timestamp(map: &Map<String, Value>, key: &str) -> Option<DateTime<Utc>> {
    let seconds = get_i64(map, key, 0);
    if seconds > 0 {
        DateTime::from_timestamp(seconds, 0)
    } else {
        None
    }
}

/// Sum per-tracker seeder/leecher counts across all trackers. Trackers that
/// have not answered a scrape report negative counts and are skipped.
#[must_use]
pub fn tracker_totals(stats: &[Value]) -> (u64, u64) {
    let mut seeders = 0;
    let mut leechers = 0;
    for stat in stats {
        if let Some(stat) = stat.as_object() {
            seeders += get_i64(stat, "seederCount", -1).max(0).unsigned_abs();
            leechers += get_i64(stat, "leecherCount", -1).max(0).unsigned_abs();
        }
    }
    (seeders, leechers)
}

/// Normalize one wire torrent record.
#[must_use]
pub fn torrent(record: &Map<String, Value>) -> Torrent {
    let (total_seeders, total_leechers) = tracker_totals(get_array(record, "trackerStats"));
    Torrent {
        id: get_i64(record, "id", 0),
        status: TorrentStatus::from_code(get_i64(record, "status", 0)),
        error_code: get_i64(record, "error", 0),
        error_message: get_string(record, "errorString"),
        name: get_string(record, "name"),
        total_size: get_u64(record, "totalSize", 0),
        percent_done: get_f64(record, "percentDone", 0.0),
        recheck_progress: get_f64(record, "recheckProgress", 0.0),
        downloaded_ever: get_u64(record, "downloadedEver", 0),
        uploaded_ever: get_u64(record, "uploadedEver", 0),
        ratio_permille: ratio_permille(get_f64(record, "uploadRatio", -1.0)),
        rate_download: get_u64(record, "rateDownload", 0),
        rate_upload: get_u64(record, "rateUpload", 0),
        eta_seconds: eta_seconds(get_i64(record, "eta", -1)),
        peers_sending: get_u64(record, "peersSendingToUs", 0),
        peers_getting: get_u64(record, "peersGettingFromUs", 0),
        total_leechers,
        total_seeders,
        queue_position: get_i64(record, "queuePosition", 0),
        added_at: timestamp(record, "addedDate"),
        completed_at: timestamp(record, "doneDate"),
        download_dir: get_string(record, "downloadDir"),
        magnet_link: get_string(record, "magnetLink"),
        hash: get_string(record, "hashString"),
        is_stalled: get_bool(record, "isStalled", false),
        peers_connected: get_u64(record, "peersConnected", 0),
        labels: get_array(record, "labels")
            .iter()
            .filter_map(Value::as_str)
            .map(ToString::to_string)
            .collect(),
        bandwidth_priority: BandwidthPriority::from_code(get_i64(record, "bandwidthPriority", 0)),
    }
}

/// Normalize a torrent's file list by zipping the `files` and `fileStats`
/// arrays the daemon returns in parallel.
#[must_use]
pub fn files(entries: &[Value], stats: &[Value]) -> Vec<TorrentFile> {
    entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let entry = entry.as_object()?;
            let name = get_string(entry, "name");
            let display_name = name
                .rsplit('/')
                .next()
                .unwrap_or(name.as_str())
                .to_string();
            let (wanted, priority_code) = stats
                .get(index)
                .and_then(Value::as_object)
                .map_or((true, 0), |stat| {
                    (
                        get_bool(stat, "wanted", true),
                        get_i64(stat, "priority", 0),
                    )
                });
            Some(TorrentFile {
                display_name,
                total_size: get_u64(entry, "length", 0),
                bytes_completed: get_u64(entry, "bytesCompleted", 0),
                priority: FilePriority::from_wire(wanted, priority_code),
                name,
            })
        })
        .collect()
}

/// Normalize one tracker-statistics record.
#[must_use]
pub fn tracker_stat(stat: &Map<String, Value>) -> TrackerStat {
    let count = |key: &str| {
        let value = get_i64(stat, key, -1);
        (value >= 0).then(|| value.unsigned_abs())
    };
    TrackerStat {
        announce: get_string(stat, "announce"),
        last_announce_result: get_string(stat, "lastAnnounceResult"),
        last_scrape_result: get_string(stat, "lastScrapeResult"),
        seeder_count: count("seederCount"),
        leecher_count: count("leecherCount"),
    }
}

/// Normalize one connected-peer record.
#[must_use]
pub fn peer(record: &Map<String, Value>) -> PeerSnapshot {
    PeerSnapshot {
        address: get_string(record, "address"),
        client_name: get_string(record, "clientName"),
        progress: get_f64(record, "progress", 0.0),
        rate_to_client: get_u64(record, "rateToClient", 0),
        rate_to_peer: get_u64(record, "rateToPeer", 0),
        is_encrypted: get_bool(record, "isEncrypted", false),
    }
}

/// Normalize the session-settings singleton, applying the documented
/// default for every absent field.
#[must_use]
pub fn settings(args: &Map<String, Value>) -> SessionSettings {
    let defaults = SessionSettings::default();
    SessionSettings {
        alt_speed_down: get_u64(args, "alt-speed-down", defaults.alt_speed_down),
        alt_speed_up: get_u64(args, "alt-speed-up", defaults.alt_speed_up),
        alt_speed_enabled: get_bool(args, "alt-speed-enabled", defaults.alt_speed_enabled),
        alt_speed_time_enabled: get_bool(
            args,
            "alt-speed-time-enabled",
            defaults.alt_speed_time_enabled,
        ),
        alt_speed_time_begin: get_u64(args, "alt-speed-time-begin", defaults.alt_speed_time_begin),
        alt_speed_time_end: get_u64(args, "alt-speed-time-end", defaults.alt_speed_time_end),
        alt_speed_time_day: get_u64(args, "alt-speed-time-day", defaults.alt_speed_time_day),
        speed_limit_down: get_u64(args, "speed-limit-down", defaults.speed_limit_down),
        speed_limit_down_enabled: get_bool(
            args,
            "speed-limit-down-enabled",
            defaults.speed_limit_down_enabled,
        ),
        speed_limit_up: get_u64(args, "speed-limit-up", defaults.speed_limit_up),
        speed_limit_up_enabled: get_bool(
            args,
            "speed-limit-up-enabled",
            defaults.speed_limit_up_enabled,
        ),
        blocklist_enabled: get_bool(args, "blocklist-enabled", defaults.blocklist_enabled),
        blocklist_url: get_string(args, "blocklist-url"),
        blocklist_size: get_u64(args, "blocklist-size", defaults.blocklist_size),
        dht_enabled: get_bool(args, "dht-enabled", defaults.dht_enabled),
        pex_enabled: get_bool(args, "pex-enabled", defaults.pex_enabled),
        lpd_enabled: get_bool(args, "lpd-enabled", defaults.lpd_enabled),
        utp_enabled: get_bool(args, "utp-enabled", defaults.utp_enabled),
        encryption: {
            let value = get_string(args, "encryption");
            if value.is_empty() {
                defaults.encryption.clone()
            } else {
                value
            }
        },
        download_dir: get_string(args, "download-dir"),
        incomplete_dir: get_string(args, "incomplete-dir"),
        incomplete_dir_enabled: get_bool(
            args,
            "incomplete-dir-enabled",
            defaults.incomplete_dir_enabled,
        ),
        rename_partial_files: get_bool(
            args,
            "rename-partial-files",
            defaults.rename_partial_files,
        ),
        peer_limit_global: get_u64(args, "peer-limit-global", defaults.peer_limit_global),
        peer_limit_per_torrent: get_u64(
            args,
            "peer-limit-per-torrent",
            defaults.peer_limit_per_torrent,
        ),
        peer_port: get_u64(args, "peer-port", defaults.peer_port),
        peer_port_random_on_start: get_bool(
            args,
            "peer-port-random-on-start",
            defaults.peer_port_random_on_start,
        ),
        port_forwarding_enabled: get_bool(
            args,
            "port-forwarding-enabled",
            defaults.port_forwarding_enabled,
        ),
        queue_stalled_enabled: get_bool(
            args,
            "queue-stalled-enabled",
            defaults.queue_stalled_enabled,
        ),
        queue_stalled_minutes: get_u64(
            args,
            "queue-stalled-minutes",
            defaults.queue_stalled_minutes,
        ),
        download_queue_size: get_u64(args, "download-queue-size", defaults.download_queue_size),
        download_queue_enabled: get_bool(
            args,
            "download-queue-enabled",
            defaults.download_queue_enabled,
        ),
        seed_queue_size: get_u64(args, "seed-queue-size", defaults.seed_queue_size),
        seed_queue_enabled: get_bool(args, "seed-queue-enabled", defaults.seed_queue_enabled),
        seed_ratio_limit: get_f64(args, "seedRatioLimit", defaults.seed_ratio_limit),
        seed_ratio_limited: get_bool(args, "seedRatioLimited", defaults.seed_ratio_limited),
        idle_seeding_limit: get_u64(args, "idle-seeding-limit", defaults.idle_seeding_limit),
        idle_seeding_limit_enabled: get_bool(
            args,
            "idle-seeding-limit-enabled",
            defaults.idle_seeding_limit_enabled,
        ),
        script_torrent_done_enabled: get_bool(
            args,
            "script-torrent-done-enabled",
            defaults.script_torrent_done_enabled,
        ),
        script_torrent_done_filename: get_string(args, "script-torrent-done-filename"),
        start_added_torrents: get_bool(
            args,
            "start-added-torrents",
            defaults.start_added_torrents,
        ),
        rpc_version: get_i64(args, "rpc-version", defaults.rpc_version),
        version: get_string(args, "version"),
    }
}
