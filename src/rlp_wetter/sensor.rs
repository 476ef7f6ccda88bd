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
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

pub const DOMAIN: &str = "rlp_wetter";
const MANUFACTURER: &str = "RLP Agrarmeteorologie";
const CONFIGURATION_URL: &str = "https://www.wetter.rlp.de/Agrarmeteorologie/Wetterdaten/Alphabetisch/AM";

/// Static description of one measurement field exposed as a sensor.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorDescription {
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: Option<&'static str>,
}

const fn describe(
    key: &'static str,
    name: &'static str,
    unit: Option<&'static str>,
    icon: Option<&'static str>,
) -> SensorDescription {
    SensorDescription { key, name, unit, icon }
}

/// Measurement fields exposed for every configured station.
pub static SENSOR_TYPES: &[SensorDescription] = &[
    describe("lufttemperatur", "Lufttemperatur 2 m", Some("°C"), Some("mdi:thermometer")),
    describe("temperatur_20cm", "Temperatur 20 cm", Some("°C"), Some("mdi:thermometer")),
    describe("bodentemperatur", "Bodentemperatur 5 cm", Some("°C"), Some("mdi:thermometer")),
    describe("relative_luftfeuchte", "Relative Luftfeuchte", Some("%"), Some("mdi:water-percent")),
    describe("niederschlag", "Niederschlag", Some("mm"), Some("mdi:weather-rainy")),
    describe("windgeschwindigkeit", "Windgeschwindigkeit", Some("m/s"), Some("mdi:weather-windy")),
    describe("windrichtung", "Windrichtung", Some("°"), Some("mdi:compass-outline")),
    describe("globalstrahlung", "Globalstrahlung", Some("W/m²"), Some("mdi:white-balance-sunny")),
    describe("blattnaesse", "Blattnässe", Some("min"), Some("mdi:leaf")),
];

/// Find the description for a measurement field.
pub fn description(key: &str) -> Option<&'static SensorDescription> {
    SENSOR_TYPES.iter().find(|d| d.key == key)
}

/// Grouping of every sensor of one station.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub identifiers: (String, String),
    pub name: String,
    pub manufacturer: String,
    pub model: String,
    pub configuration_url: String,
}

/// Descriptive, non-primary attributes of a sensor.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SensorAttributes {
    pub station_id: Option<Value>,
    pub station_name: Option<String>,
    pub station_height: Option<Value>,
    pub measurement_time: Option<String>,
    /// Seconds since the Unix epoch of the last successful update.
    pub last_update: Option<u64>,
}

/// Point in time view of a sensor, suitable for serialization.
#[derive(Serialize, Debug, Clone, PartialEq)]
pub struct SensorState {
    pub unique_id: String,
    pub key: &'static str,
    pub name: &'static str,
    pub unit: Option<&'static str>,
    pub icon: Option<&'static str>,
    pub value: Option<Value>,
    pub available: bool,
    pub attributes: Option<SensorAttributes>,
    pub device: DeviceInfo,
}

/// Read-only view of one measurement field of a station's latest snapshot.
#[derive(Debug, Clone)]
pub struct WeatherSensor {
    coordinator: Arc<Coordinator>,
    description: &'static SensorDescription,
}

impl WeatherSensor {
    pub fn new(coordinator: Arc<Coordinator>, description: &'static SensorDescription) -> Self {
        WeatherSensor {
            coordinator,
            description,
        }
    }

    /// Create a sensor for every known measurement field of a station.
    pub fn all(coordinator: &Arc<Coordinator>) -> Vec<Self> {
        SENSOR_TYPES
            .iter()
            .map(|d| WeatherSensor::new(Arc::clone(coordinator), d))
            .collect()
    }

    pub fn description(&self) -> &'static SensorDescription {
        self.description
    }

    pub fn station_id(&self) -> u32 {
        self.coordinator.station_id()
    }

    pub fn unique_id(&self) -> String {
        format!("{}_{}_{}", DOMAIN, self.coordinator.station_id(), self.description.key)
    }

    pub fn native_value(&self) -> Option<Value> {
        self.coordinator
            .data()
            .and_then(|snap| snap.get(self.description.key).cloned())
    }

    /// Available while the station is loaded and its snapshot contains this field. A missing
    /// field only affects the sensor for that field.
    pub fn available(&self) -> bool {
        let state = self.coordinator.state();
        !state.shut_down
            && state
                .data
                .map(|snap| snap.contains(self.description.key))
                .unwrap_or(false)
    }

    pub fn extra_state_attributes(&self) -> Option<SensorAttributes> {
        let state = self.coordinator.state();
        let snap = state.data?;

        Some(SensorAttributes {
            station_id: snap.station_id().cloned(),
            station_name: snap.station_name().map(|s| s.to_owned()),
            station_height: snap.station_height().cloned(),
            measurement_time: snap.measurement_time(),
            last_update: state.last_update_success_time.and_then(unix_secs),
        })
    }

    pub fn device_info(&self) -> DeviceInfo {
        let sid = self.coordinator.station_id();
        let display = self
            .coordinator
            .data()
            .and_then(|snap| snap.station_name().map(|s| s.to_owned()))
            .unwrap_or_else(|| sid.to_string());

        DeviceInfo {
            identifiers: (DOMAIN.to_owned(), sid.to_string()),
            name: format!("RLP Wetter Station {}", display),
            manufacturer: MANUFACTURER.to_owned(),
            model: format!("Station ID {}", sid),
            configuration_url: format!("{}{}", CONFIGURATION_URL, sid),
        }
    }

    pub fn state(&self) -> SensorState {
        SensorState {
            unique_id: self.unique_id(),
            key: self.description.key,
            name: self.description.name,
            unit: self.description.unit,
            icon: self.description.icon,
            value: self.native_value(),
            available: self.available(),
            attributes: self.extra_state_attributes(),
            device: self.device_info(),
        }
    }
}

fn unix_secs(t: SystemTime) -> Option<u64> {
    t.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}
