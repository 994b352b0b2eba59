use axum::extract::ws::{Message, WebSocket};
use serde::Serialize;
use tracing::{error, info, warn};

use canlog::Series;

#[derive(Serialize)]
struct SamplePayload<'a> {
    timestamp: i64,
    value: f64,
    desc: &'a str,
    seq: u64,
    end_flag: bool,
}

/// Stream every sample of `series` as one JSON message, then an end marker.
pub async fn handle_ws_fetch(mut socket: WebSocket, series: Series) {
    let name = series.name().to_string();
    info!("ws_fetch streaming started: {} ({} samples)", name, series.len());

    let mut seq: u64 = 0;
    for (timestamp, value) in series.iter() {
        let payload = SamplePayload {
            timestamp,
            value,
            desc: series.label(),
            seq,
            end_flag: false,
        };

        let json = match serde_json::to_string(&payload) {
            Ok(j) => j,
            Err(e) => {
                error!("json serialize error: {}", e);
                return;
            }
        };

        if let Err(e) = socket.send(Message::Text(json.into())).await {
            warn!("ws send failed: {}", e);
            return;
        }

        seq += 1;
    }

    let end_payload = SamplePayload {
        timestamp: 0,
        value: 0.0,
        desc: series.label(),
        seq,
        end_flag: true,
    };

    if let Ok(json) = serde_json::to_string(&end_payload) {
        let _ = socket.send(Message::Text(json.into())).await;
    }

    info!("ws_fetch finished: {}", name);
}
