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

mod common;

use common::{payload, MockApi, Reply};
use prometheus_client::registry::Registry;
use reqwest::StatusCode;
use rlp_wetter::http::{app, RequestContext};
use rlp_wetter::integration::Integration;
use rlp_wetter::metrics::WeatherMetrics;
use rlp_wetter::stations;
use serde_json::{json, Value};
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

async fn serve(api: &MockApi, station_id: u32) -> String {
    let mut registry = Registry::default();
    let metrics = Arc::new(WeatherMetrics::new(&mut registry));
    let integration = Arc::new(Integration::new(Arc::new(api.client()), Duration::from_secs(3600), metrics));

    let entry = integration.configure(station_id).await.unwrap();
    integration.setup_entry(entry).await.unwrap();

    let context = Arc::new(RequestContext::new(registry, integration));
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    let server = axum::Server::from_tcp(listener)
        .unwrap()
        .serve(app(context).into_make_service());
    tokio::spawn(server);

    format!("http://{}", addr)
}

async fn mock_api() -> MockApi {
    MockApi::start(vec![Reply::json(payload(
        171,
        "Worms",
        vec![json!({"datum": "19.10.2026", "zeit": "12:00", "lufttemperatur": 11.5})],
    ))])
    .await
}

#[tokio::test]
async fn test_sensors_endpoint() {
    let api = mock_api().await;
    let base = serve(&api, 171).await;

    let res = reqwest::get(format!("{}/sensors", base)).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let body: Vec<Value> = res.json().await.unwrap();
    let temperature = body.iter().find(|s| s["key"] == "lufttemperatur").unwrap();
    assert_eq!(json!(11.5), temperature["value"]);
    assert_eq!(json!(true), temperature["available"]);
    assert_eq!(json!("Worms"), temperature["attributes"]["station_name"]);
    assert_eq!(json!("RLP Wetter Station Worms"), temperature["device"]["name"]);

    let rain = body.iter().find(|s| s["key"] == "niederschlag").unwrap();
    assert_eq!(json!(false), rain["available"]);
    assert!(rain["value"].is_null());
}

#[tokio::test]
async fn test_station_sensors_endpoint() {
    let api = mock_api().await;
    let base = serve(&api, 171).await;

    let res = reqwest::get(format!("{}/sensors/171", base)).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let res = reqwest::get(format!("{}/sensors/102", base)).await.unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let api = mock_api().await;
    let base = serve(&api, 171).await;

    let res = reqwest::get(format!("{}/metrics", base)).await.unwrap();
    assert_eq!(StatusCode::OK, res.status());

    let body = res.text().await.unwrap();
    assert!(body.contains("rlp_wetter_sensor{"));
    assert!(body.contains("station_id=\"171\""));
}

#[tokio::test]
async fn test_stations_endpoint() {
    let api = mock_api().await;
    let base = serve(&api, 171).await;

    let body: Vec<Value> = reqwest::get(format!("{}/stations", base))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stations::STATIONS.len(), body.len());
    assert_eq!(json!("Alzey"), body[0]["name"]);
    assert_eq!(json!(102), body[0]["id"]);
}

#[tokio::test]
async fn test_unknown_path() {
    let api = mock_api().await;
    let base = serve(&api, 171).await;

    let res = reqwest::get(format!("{}/nope", base)).await.unwrap();
    assert_eq!(StatusCode::NOT_FOUND, res.status());
}
