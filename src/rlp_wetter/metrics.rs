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

use crate::coordinator::Coordinator;
use crate::sensor::WeatherSensor;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use prometheus_client::registry::Registry;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::AtomicU64;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::UNIX_EPOCH;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct StationLabels {
    station_id: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct StationInfoLabels {
    station_id: String,
    station_name: String,
    station_height: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
struct SensorLabels {
    station_id: String,
    sensor: String,
    unit: String,
}

/// Prometheus view of every sensor of every configured station.
///
/// Metrics are created and registered upon call to `WeatherMetrics::new()` and all share the
/// prefix "rlp_wetter_". Numeric sensor values are exported as `rlp_wetter_sensor` with labels
/// for the station and measurement field. Sensors that are unavailable or whose value isn't a
/// number are removed rather than left at a stale value.
#[derive(Debug)]
pub struct WeatherMetrics {
    station_info: Family<StationInfoLabels, Gauge>,
    last_update_success: Family<StationLabels, Gauge>,
    last_update_timestamp: Family<StationLabels, Gauge>,
    sensor: Family<SensorLabels, Gauge<f64, AtomicU64>>,
    info_labels: Mutex<HashMap<u32, StationInfoLabels>>,
}

impl WeatherMetrics {
    pub fn new(reg: &mut Registry) -> Self {
        let station_info = Family::<StationInfoLabels, Gauge>::default();
        let last_update_success = Family::<StationLabels, Gauge>::default();
        let last_update_timestamp = Family::<StationLabels, Gauge>::default();
        let sensor = Family::<SensorLabels, Gauge<f64, AtomicU64>>::default();

        reg.register("rlp_wetter_station", "Station metadata", station_info.clone());
        reg.register(
            "rlp_wetter_last_update_success",
            "Whether the most recent update for a station succeeded (0 or 1)",
            last_update_success.clone(),
        );
        reg.register(
            "rlp_wetter_last_update_timestamp_seconds",
            "Time of the last successful update for a station, in seconds since the epoch",
            last_update_timestamp.clone(),
        );
        reg.register("rlp_wetter_sensor", "Latest measurement value of a sensor", sensor.clone());

        Self {
            station_info,
            last_update_success,
            last_update_timestamp,
            sensor,
            info_labels: Mutex::new(HashMap::new()),
        }
    }

    /// Set metrics for a station from its coordinator and sensors.
    pub fn observe(&self, coordinator: &Coordinator, sensors: &[WeatherSensor]) {
        let sid = coordinator.station_id();
        let state = coordinator.state();
        let station = StationLabels {
            station_id: sid.to_string(),
        };

        self.last_update_success
            .get_or_create(&station)
            .set(i64::from(state.last_update_success));

        if let Some(t) = state.last_update_success_time {
            if let Ok(d) = t.duration_since(UNIX_EPOCH) {
                self.last_update_timestamp.get_or_create(&station).set(d.as_secs() as i64);
            }
        }

        if let Some(snap) = &state.data {
            let info = StationInfoLabels {
                station_id: sid.to_string(),
                station_name: snap.station_name().unwrap_or_default().to_owned(),
                station_height: snap.station_height().map(label_value).unwrap_or_default(),
            };
            self.set_station_info(sid, info);
        }

        for s in sensors {
            let labels = sensor_labels(s);
            match s.native_value().as_ref().and_then(numeric) {
                Some(v) if s.available() => {
                    self.sensor.get_or_create(&labels).set(v);
                }
                _ => {
                    self.sensor.remove(&labels);
                }
            }
        }
    }

    /// Remove all metrics for a station that is no longer configured.
    pub fn clear_station(&self, station_id: u32, sensors: &[WeatherSensor]) {
        let station = StationLabels {
            station_id: station_id.to_string(),
        };

        self.last_update_success.remove(&station);
        self.last_update_timestamp.remove(&station);
        for s in sensors {
            self.sensor.remove(&sensor_labels(s));
        }

        let mut info_labels = self.info_labels();
        if let Some(old) = info_labels.remove(&station_id) {
            self.station_info.remove(&old);
        }
    }

    fn info_labels(&self) -> MutexGuard<'_, HashMap<u32, StationInfoLabels>> {
        self.info_labels.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_station_info(&self, station_id: u32, info: StationInfoLabels) {
        let mut info_labels = self.info_labels();
        if let Some(old) = info_labels.get(&station_id) {
            if *old == info {
                return;
            }
            self.station_info.remove(old);
        }

        self.station_info.get_or_create(&info).set(1);
        info_labels.insert(station_id, info);
    }
}

fn sensor_labels(s: &WeatherSensor) -> SensorLabels {
    SensorLabels {
        station_id: s.station_id().to_string(),
        sensor: s.description().key.to_owned(),
        unit: s.description().unit.unwrap_or_default().to_owned(),
    }
}

fn label_value(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Numeric value of a measurement. Strings are accepted when they hold a number, using either
/// a period or a comma as decimal separator.
fn numeric(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
        _ => None,
    }
}
