//! Wire-record builders mirroring the daemon's camelCase dialect.

use serde_json::{Map, Value, json};

/// Convert a JSON object literal into the argument map the transport takes.
///
/// # Panics
///
/// Panics when the value is not a JSON object; fixtures are always literals.
#[must_use]
pub fn arguments(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("fixture arguments must be an object, got {other}"),
    }
}

/// A plausible wire record for one torrent in the daemon's oldest dialect.
#[must_use]
pub fn torrent_record(id: i64, status: i64, percent_done: f64) -> Value {
    json!({
        "id": id,
        "status": status,
        "error": 0,
        "errorString": "",
        "name": format!("fixture-{id}"),
        "totalSize": 2_048_000,
        "percentDone": percent_done,
        "recheckProgress": 0.0,
        "downloadedEver": 1_024_000,
        "uploadedEver": 512_000,
        "uploadRatio": 0.5,
        "rateDownload": 2_000,
        "rateUpload": 1_000,
        "eta": 120,
        "peersSendingToUs": 3,
        "peersGettingFromUs": 1,
        "peersConnected": 4,
        "queuePosition": 0,
        "addedDate": 1_700_000_000,
        "doneDate": 0,
        "downloadDir": "/downloads",
        "magnetLink": format!("magnet:?xt=urn:btih:{id:040}"),
        "hashString": format!("{id:040x}"),
        "isStalled": false,
        "labels": [],
        "bandwidthPriority": 0,
        "trackerStats": [tracker_stat(10, 5)],
    })
}

/// A per-tracker statistics record.
#[must_use]
pub fn tracker_stat(seeders: i64, leechers: i64) -> Value {
    json!({
        "announce": "http://tracker.example/announce",
        "lastAnnounceResult": "Success",
        "lastScrapeResult": "Success",
        "seederCount": seeders,
        "leecherCount": leechers,
    })
}
