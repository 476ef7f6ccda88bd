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

use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::{Map, Value};
use std::error;
use std::fmt;

const KEY_MEASUREMENTS: &str = "messwerte";
const KEY_STATION_NAME: &str = "station_name";
const KEY_STATION_ID: &str = "station_id";
const KEY_STATION_HEIGHT: &str = "station_height";

#[derive(Debug)]
pub enum ClientError {
    Connect(reqwest::Error),
    Timeout(reqwest::Error),
    Status(StatusCode, Url),
    Decode(reqwest::Error),
    NoMeasurements(u32),
    InvalidUrl(String),
    Internal(reqwest::Error),
}

impl ClientError {
    fn from_request(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e)
        } else if e.is_connect() {
            Self::Connect(e)
        } else if e.is_decode() {
            Self::Decode(e)
        } else {
            Self::Internal(e)
        }
    }

    /// HTTP status of the response if the request failed because of a non-success status.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status, _) => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect(e) => write!(f, "connection error: {}", e),
            Self::Timeout(e) => write!(f, "request timed out: {}", e),
            Self::Status(status, url) => write!(f, "unexpected status {} for {}", status, url),
            Self::Decode(e) => write!(f, "unable to decode response: {}", e),
            Self::NoMeasurements(sid) => write!(f, "no measurements returned for station {}", sid),
            Self::InvalidUrl(u) => write!(f, "invalid API URL {}", u),
            Self::Internal(e) => write!(f, "{}", e),
        }
    }
}

impl error::Error for ClientError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Self::Connect(e) => Some(e),
            Self::Timeout(e) => Some(e),
            Self::Decode(e) => Some(e),
            Self::Internal(e) => Some(e),
            _ => None,
        }
    }
}

/// Client for the station measurement endpoint.
///
/// The underlying `reqwest::Client` (and its connection pool) is meant to be shared by
/// setup validation and polling. Request timeouts are configured on that client.
#[derive(Debug)]
pub struct RlpWetterClient {
    client: Client,
    base_url: Url,
}

impl RlpWetterClient {
    const USER_AGENT: &'static str = "rlp_wetter sensor exporter";
    const JSON_RESPONSE: &'static str = "application/json";

    pub fn new(client: Client, base_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(base_url).map_err(|_| ClientError::InvalidUrl(base_url.to_owned()))?;
        Ok(RlpWetterClient { client, base_url })
    }

    /// Fetch the current payload for a station, requiring at least one measurement record.
    pub async fn measurements(&self, station_id: u32) -> Result<StationPayload, ClientError> {
        let request_url = self.station_url(station_id);
        tracing::debug!(message = "making station measurement request", url = %request_url);

        let res = self.make_request(request_url).await?;
        let body = res.json::<Value>().await.map_err(ClientError::from_request)?;
        StationPayload::from_value(station_id, body)
    }

    async fn make_request(&self, url: Url) -> Result<Response, ClientError> {
        let res = self
            .client
            .get(url.clone())
            .header(USER_AGENT, Self::USER_AGENT)
            .header(ACCEPT, Self::JSON_RESPONSE)
            .send()
            .await
            .map_err(ClientError::from_request)?;

        let status = res.status();
        if status.is_success() {
            Ok(res)
        } else {
            Err(ClientError::Status(status, url))
        }
    }

    /// Endpoint URL with the station appended as the `sid` query parameter.
    pub fn station_url(&self, station_id: u32) -> Url {
        let mut url = self.base_url.clone();
        url.query_pairs_mut().append_pair("sid", &station_id.to_string());
        url
    }
}

/// Response body for a station: root metadata plus the most recent measurement record.
#[derive(Debug, Clone, PartialEq)]
pub struct StationPayload {
    pub station_name: Value,
    pub station_id: Value,
    pub station_height: Value,
    pub latest: Map<String, Value>,
}

impl StationPayload {
    /// Extract the metadata and first `messwerte` record from a decoded body.
    ///
    /// A body that isn't an object, or whose `messwerte` is missing, empty, or doesn't start
    /// with an object, has no usable measurement and is rejected.
    pub fn from_value(station_id: u32, body: Value) -> Result<Self, ClientError> {
        let mut root = match body {
            Value::Object(m) => m,
            _ => return Err(ClientError::NoMeasurements(station_id)),
        };

        let latest = match root.remove(KEY_MEASUREMENTS) {
            Some(Value::Array(records)) => match records.into_iter().next() {
                Some(Value::Object(record)) => record,
                _ => return Err(ClientError::NoMeasurements(station_id)),
            },
            _ => return Err(ClientError::NoMeasurements(station_id)),
        };

        Ok(StationPayload {
            station_name: root.remove(KEY_STATION_NAME).unwrap_or(Value::Null),
            station_id: root.remove(KEY_STATION_ID).unwrap_or(Value::Null),
            station_height: root.remove(KEY_STATION_HEIGHT).unwrap_or(Value::Null),
            latest,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{ClientError, RlpWetterClient, StationPayload};
    use reqwest::Client;
    use serde_json::json;

    #[test]
    fn test_station_url_appends_sid() {
        let client = RlpWetterClient::new(Client::new(), "http://localhost:1234/api/station").unwrap();
        assert_eq!(
            "http://localhost:1234/api/station?sid=102",
            client.station_url(102).as_str()
        );
    }

    #[test]
    fn test_station_url_keeps_existing_query() {
        let client = RlpWetterClient::new(Client::new(), "http://localhost:1234/api?format=json").unwrap();
        assert_eq!(
            "http://localhost:1234/api?format=json&sid=7",
            client.station_url(7).as_str()
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let res = RlpWetterClient::new(Client::new(), "not a url");
        assert!(matches!(res, Err(ClientError::InvalidUrl(_))));
    }

    #[test]
    fn test_payload_uses_first_record() {
        let body = json!({
            "station_name": "Alzey",
            "station_id": 102,
            "station_height": 215,
            "messwerte": [
                {"datum": "2026-10-19", "zeit": "12:00", "lufttemperatur": 14.2},
                {"datum": "2026-10-19", "zeit": "11:50", "lufttemperatur": 13.9},
            ],
        });

        let payload = StationPayload::from_value(102, body).unwrap();
        assert_eq!(json!("Alzey"), payload.station_name);
        assert_eq!(json!(102), payload.station_id);
        assert_eq!(json!(215), payload.station_height);
        assert_eq!(Some(&json!("12:00")), payload.latest.get("zeit"));
        assert_eq!(Some(&json!(14.2)), payload.latest.get("lufttemperatur"));
    }

    #[test]
    fn test_payload_missing_metadata_is_null() {
        let body = json!({"messwerte": [{"lufttemperatur": 1.0}]});
        let payload = StationPayload::from_value(102, body).unwrap();
        assert!(payload.station_name.is_null());
        assert!(payload.station_id.is_null());
        assert!(payload.station_height.is_null());
    }

    #[test]
    fn test_payload_empty_measurements() {
        let body = json!({"station_name": "Alzey", "messwerte": []});
        let res = StationPayload::from_value(102, body);
        assert!(matches!(res, Err(ClientError::NoMeasurements(102))));
    }

    #[test]
    fn test_payload_missing_measurements() {
        let res = StationPayload::from_value(102, json!({"station_name": "Alzey"}));
        assert!(matches!(res, Err(ClientError::NoMeasurements(102))));
    }

    #[test]
    fn test_payload_not_an_object() {
        assert!(matches!(
            StationPayload::from_value(102, json!(null)),
            Err(ClientError::NoMeasurements(102))
        ));
        assert!(matches!(
            StationPayload::from_value(102, json!([1, 2, 3])),
            Err(ClientError::NoMeasurements(102))
        ));
    }

    #[test]
    fn test_payload_measurements_not_records() {
        let res = StationPayload::from_value(102, json!({"messwerte": [1, 2]}));
        assert!(matches!(res, Err(ClientError::NoMeasurements(102))));
    }
}
