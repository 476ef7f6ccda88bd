// rlp_wetter - Sensor exporter for the RLP agrometeorology network
//
// Copyright 2026 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::client::{ClientError, RlpWetterClient, StationPayload};
use serde_json::{Map, Value};
use std::error;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{Instrument, Level};

const KEY_DATE: &str = "datum";
const KEY_TIME: &str = "zeit";
const KEY_STATION_NAME: &str = "station_name";
const KEY_STATION_ID: &str = "station_id";
const KEY_STATION_HEIGHT: &str = "station_height";

/// Shortest interval between refreshes. Anything shorter, zero included, is raised to this.
pub const MIN_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Most recent measurement record for a station, decorated with station metadata.
///
/// A snapshot is immutable. Each successful poll builds a new one from scratch, nothing
/// is carried over from the previous snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    fields: Map<String, Value>,
}

impl Snapshot {
    pub fn from_payload(payload: StationPayload) -> Self {
        let mut fields = payload.latest;
        fields.insert(KEY_STATION_NAME.to_owned(), payload.station_name);
        fields.insert(KEY_STATION_ID.to_owned(), payload.station_id);
        fields.insert(KEY_STATION_HEIGHT.to_owned(), payload.station_height);
        Snapshot { fields }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn station_name(&self) -> Option<&str> {
        self.fields.get(KEY_STATION_NAME).and_then(Value::as_str)
    }

    pub fn station_id(&self) -> Option<&Value> {
        self.fields.get(KEY_STATION_ID).filter(|v| !v.is_null())
    }

    pub fn station_height(&self) -> Option<&Value> {
        self.fields.get(KEY_STATION_HEIGHT).filter(|v| !v.is_null())
    }

    /// Date and time of the measurement joined by a space, e.g. `2026-10-19 12:00`.
    pub fn measurement_time(&self) -> Option<String> {
        let parts: Vec<String> = [KEY_DATE, KEY_TIME]
            .iter()
            .filter_map(|k| self.fields.get(*k))
            .filter(|v| !v.is_null())
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();

        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Everything readers know about a station's polling: the current snapshot (if any) and the
/// outcome of the most recent refresh.
#[derive(Debug, Clone, Default)]
pub struct CoordinatorState {
    pub data: Option<Arc<Snapshot>>,
    pub last_update_success: bool,
    pub last_update_success_time: Option<SystemTime>,
    pub last_error: Option<String>,
    pub shut_down: bool,
}

/// A failed refresh. Never fatal, the next scheduled refresh tries again.
#[derive(Debug)]
pub struct UpdateFailed {
    station_id: u32,
    cause: ClientError,
}

impl UpdateFailed {
    pub fn station_id(&self) -> u32 {
        self.station_id
    }

    pub fn cause(&self) -> &ClientError {
        &self.cause
    }
}

impl fmt::Display for UpdateFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "update failed for station {}: {}", self.station_id, self.cause)
    }
}

impl error::Error for UpdateFailed {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        Some(&self.cause)
    }
}

/// Polls a single station on a fixed interval and publishes the latest snapshot.
///
/// State is published through a `watch` channel: readers only ever see whole values and
/// a failed refresh leaves the previous snapshot in place.
#[derive(Debug)]
pub struct Coordinator {
    station_id: u32,
    client: Arc<RlpWetterClient>,
    update_interval: Duration,
    state: watch::Sender<CoordinatorState>,
}

impl Coordinator {
    pub fn new(station_id: u32, client: Arc<RlpWetterClient>, update_interval: Duration) -> Self {
        let (state, _) = watch::channel(CoordinatorState::default());
        Coordinator {
            station_id,
            client,
            update_interval: update_interval.max(MIN_UPDATE_INTERVAL),
            state,
        }
    }

    pub fn station_id(&self) -> u32 {
        self.station_id
    }

    pub fn update_interval(&self) -> Duration {
        self.update_interval
    }

    /// Copy of the current state.
    pub fn state(&self) -> CoordinatorState {
        self.state.borrow().clone()
    }

    /// Current snapshot, if any refresh has succeeded so far.
    pub fn data(&self) -> Option<Arc<Snapshot>> {
        self.state.borrow().data.clone()
    }

    pub fn last_update_success(&self) -> bool {
        self.state.borrow().last_update_success
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.borrow().shut_down
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorState> {
        self.state.subscribe()
    }

    /// Fetch the latest measurement once, replacing the snapshot on success.
    pub async fn refresh(&self) -> Result<(), UpdateFailed> {
        match self.client.measurements(self.station_id).await {
            Ok(payload) => {
                let snapshot = Arc::new(Snapshot::from_payload(payload));
                self.state.send_modify(|s| {
                    s.data = Some(snapshot);
                    s.last_update_success = true;
                    s.last_update_success_time = Some(SystemTime::now());
                    s.last_error = None;
                });

                Ok(())
            }
            Err(e) => {
                self.log_failure(&e);
                let err = UpdateFailed {
                    station_id: self.station_id,
                    cause: e,
                };

                let msg = err.to_string();
                self.state.send_modify(|s| {
                    s.last_update_success = false;
                    s.last_error = Some(msg);
                });

                Err(err)
            }
        }
    }

    /// Initial refresh made while setting up a station. Failure means the station isn't ready.
    pub async fn first_refresh(&self) -> Result<(), UpdateFailed> {
        self.refresh()
            .instrument(tracing::span!(Level::DEBUG, "rlp_first_refresh", station_id = self.station_id))
            .await
    }

    /// Refresh on the configured interval until shut down.
    ///
    /// The first tick of the interval is consumed immediately since the station was already
    /// refreshed during setup. Refresh cycles never overlap: a slow request delays the next tick.
    pub async fn run(&self) {
        let mut interval = tokio::time::interval(self.update_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let _ = interval.tick().await;

        tracing::info!(message = "station polling started", station_id = self.station_id, interval_millis = self.update_interval.as_millis() as u64);

        loop {
            let _ = interval.tick().await;
            if self.is_shut_down() {
                break;
            }

            match self
                .refresh()
                .instrument(tracing::span!(Level::DEBUG, "rlp_refresh", station_id = self.station_id))
                .await
            {
                Ok(_) => {
                    tracing::info!(message = "fetched new measurement", station_id = self.station_id);
                }
                Err(e) => {
                    tracing::debug!(message = "refresh failed, keeping previous measurement", error = %e);
                }
            }
        }

        tracing::info!(message = "station polling stopped", station_id = self.station_id);
    }

    /// Mark the coordinator as shut down. Readers treat it as unavailable from now on.
    pub fn shutdown(&self) {
        self.state.send_modify(|s| s.shut_down = true);
    }

    fn log_failure(&self, err: &ClientError) {
        match err {
            ClientError::Status(status, _) if status.is_server_error() => {
                tracing::warn!(message = "API server error, likely transient", station_id = self.station_id, status = %status);
            }
            ClientError::Status(status, _) => {
                tracing::error!(message = "API client error, check station configuration", station_id = self.station_id, status = %status);
            }
            ClientError::Connect(_) | ClientError::Timeout(_) | ClientError::NoMeasurements(_) => {
                tracing::warn!(message = "failed to fetch measurement", station_id = self.station_id, error = %err);
            }
            _ => {
                tracing::error!(message = "unexpected error fetching measurement", station_id = self.station_id, error = %err);
            }
        }
    }
}
