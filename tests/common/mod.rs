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

//! Local stand-in for the station measurement API.

#![allow(dead_code)]

use axum::extract::{Query, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use reqwest::Client;
use rlp_wetter::client::RlpWetterClient;
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: String,
    pub delay: Option<Duration>,
}

impl Reply {
    pub fn json(body: Value) -> Self {
        Reply {
            status: StatusCode::OK,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn status(status: StatusCode) -> Self {
        Reply {
            status,
            body: json!({"error": status.as_u16()}).to_string(),
            delay: None,
        }
    }

    pub fn raw(body: &str) -> Self {
        Reply {
            status: StatusCode::OK,
            body: body.to_owned(),
            delay: None,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Default)]
struct MockState {
    replies: VecDeque<Reply>,
    requests: Vec<HashMap<String, String>>,
}

/// Serves queued replies in order. The last reply is repeated once the queue is down to one.
#[derive(Debug, Clone)]
pub struct MockApi {
    pub url: String,
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub async fn start(replies: Vec<Reply>) -> Self {
        let state = Arc::new(Mutex::new(MockState {
            replies: replies.into(),
            requests: Vec::new(),
        }));

        let app = Router::new()
            .route("/api/messwerte", get(handle))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = axum::Server::from_tcp(listener).unwrap().serve(app.into_make_service());
        tokio::spawn(server);

        MockApi {
            url: format!("http://{}/api/messwerte", addr),
            state,
        }
    }

    pub fn push(&self, reply: Reply) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    /// Replace every queued reply.
    pub fn set(&self, reply: Reply) {
        let mut state = self.state.lock().unwrap();
        state.replies.clear();
        state.replies.push_back(reply);
    }

    pub fn requests(&self) -> Vec<HashMap<String, String>> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn client(&self) -> RlpWetterClient {
        client_for(&self.url, Duration::from_secs(5))
    }

    pub fn client_with_timeout(&self, timeout: Duration) -> RlpWetterClient {
        client_for(&self.url, timeout)
    }
}

async fn handle(
    State(state): State<Arc<Mutex<MockState>>>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let reply = {
        let mut state = state.lock().unwrap();
        state.requests.push(params);
        if state.replies.len() > 1 {
            state.replies.pop_front()
        } else {
            state.replies.front().cloned()
        }
    };

    let reply = reply.unwrap_or_else(|| Reply::status(StatusCode::INTERNAL_SERVER_ERROR));
    if let Some(d) = reply.delay {
        tokio::time::sleep(d).await;
    }

    (reply.status, [(CONTENT_TYPE, "application/json")], reply.body)
}

pub fn client_for(url: &str, timeout: Duration) -> RlpWetterClient {
    let http = Client::builder().timeout(timeout).build().unwrap();
    RlpWetterClient::new(http, url).unwrap()
}

/// URL of a local port with nothing listening on it.
pub fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}/api/messwerte", addr)
}

pub fn payload(station_id: u32, name: &str, records: Vec<Value>) -> Value {
    json!({
        "station_name": name,
        "station_id": station_id,
        "station_height": 215,
        "messwerte": records,
    })
}
