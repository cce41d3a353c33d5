//! Minimal in-process SendGrid API fake.
//!
//! Serves just enough of the v3 template endpoints for a sync run: list,
//! create, rename and delete templates, create and delete versions. State is
//! a JSON document guarded by a mutex; every request is also appended to a
//! log so tests can assert which calls were (or were not) made.

use std::io::{Cursor, Read};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::{Value, json};
use tiny_http::{Header, Method, Response, Server};

pub struct MockSendGrid {
    /// Base URL including the `/v3` prefix, for `SENDGRID_BASE_URL`.
    pub base_url: String,
    state: Arc<Mutex<Vec<Value>>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockSendGrid {
    /// Start the server on an ephemeral port with the given initial
    /// template inventory. The serving thread lives until the test process
    /// exits.
    pub fn start(initial: Vec<Value>) -> Self {
        let server = Server::http("127.0.0.1:0").expect("failed to bind mock server");
        let port = server.server_addr().to_ip().expect("tcp listen address").port();

        let state = Arc::new(Mutex::new(initial));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let thread_state = Arc::clone(&state);
        let thread_requests = Arc::clone(&requests);
        thread::spawn(move || {
            let mut next_id = 0u64;
            for mut request in server.incoming_requests() {
                let method = request.method().clone();
                let url = request.url().to_string();
                thread_requests.lock().unwrap().push(format!("{method} {url}"));

                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);

                let path = url.split('?').next().unwrap_or("").to_string();
                let segments: Vec<String> =
                    path.trim_start_matches('/').split('/').map(str::to_string).collect();
                let segments: Vec<&str> = segments.iter().map(String::as_str).collect();

                let mut state = thread_state.lock().unwrap();
                let response = handle(&method, &segments, &body, &mut state, &mut next_id);
                let _ = request.respond(response);
            }
        });

        Self {
            base_url: format!("http://127.0.0.1:{port}/v3"),
            state,
            requests,
        }
    }

    /// Build a template inventory entry.
    pub fn template(id: &str, name: &str, versions: &[(&str, &str)]) -> Value {
        let versions: Vec<Value> = versions
            .iter()
            .map(|(vid, vname)| json!({ "id": vid, "name": vname, "active": 1 }))
            .collect();
        json!({ "id": id, "name": name, "generation": "dynamic", "versions": versions })
    }

    /// Snapshot of the current remote state.
    pub fn templates(&self) -> Vec<Value> {
        self.state.lock().unwrap().clone()
    }

    /// All requests received so far, as `"METHOD /path"` strings.
    pub fn request_log(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

fn handle(
    method: &Method,
    segments: &[&str],
    body: &str,
    state: &mut Vec<Value>,
    next_id: &mut u64,
) -> Response<Cursor<Vec<u8>>> {
    match (method, segments) {
        (Method::Get, ["v3", "templates"]) => json_response(200, json!({ "templates": *state })),

        (Method::Post, ["v3", "templates"]) => {
            let request: Value = serde_json::from_str(body).unwrap_or_default();
            *next_id += 1;
            let template = json!({
                "id": format!("srv-t-{next_id}"),
                "name": request["name"],
                "generation": "dynamic",
                "versions": [],
            });
            state.push(template.clone());
            json_response(201, template)
        }

        (Method::Patch, ["v3", "templates", id]) => {
            let request: Value = serde_json::from_str(body).unwrap_or_default();
            match state.iter_mut().find(|t| t["id"].as_str() == Some(*id)) {
                Some(template) => {
                    template["name"] = request["name"].clone();
                    let updated = template.clone();
                    json_response(200, updated)
                }
                None => json_response(404, json!({ "error": "template not found" })),
            }
        }

        (Method::Delete, ["v3", "templates", id]) => {
            state.retain(|t| t["id"].as_str() != Some(*id));
            empty_response(204)
        }

        (Method::Post, ["v3", "templates", id, "versions"]) => {
            let request: Value = serde_json::from_str(body).unwrap_or_default();
            *next_id += 1;
            // html_content is kept so tests can assert on the uploaded body;
            // the client ignores unknown fields when deserializing.
            let version = json!({
                "id": format!("srv-v-{next_id}"),
                "name": request["name"],
                "active": request["active"],
                "html_content": request["html_content"],
                "subject": request["subject"],
            });
            match state.iter_mut().find(|t| t["id"].as_str() == Some(*id)) {
                Some(template) => {
                    template["versions"].as_array_mut().unwrap().push(version.clone());
                    json_response(201, version)
                }
                None => json_response(404, json!({ "error": "template not found" })),
            }
        }

        (Method::Delete, ["v3", "templates", id, "versions", version_id]) => {
            if let Some(template) = state.iter_mut().find(|t| t["id"].as_str() == Some(*id))
                && let Some(versions) = template["versions"].as_array_mut()
            {
                versions.retain(|v| v["id"].as_str() != Some(*version_id));
            }
            empty_response(204)
        }

        _ => json_response(404, json!({ "error": "unknown endpoint" })),
    }
}

fn json_response(status: u16, body: Value) -> Response<Cursor<Vec<u8>>> {
    Response::from_string(body.to_string()).with_status_code(status).with_header(
        Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
            .expect("static header is valid"),
    )
}

fn empty_response(status: u16) -> Response<Cursor<Vec<u8>>> {
    Response::from_string("").with_status_code(status)
}
