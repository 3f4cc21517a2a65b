//! Shared test fixtures: an in-memory fake of the handle service and its auth service,
//! served over HTTP by wiremock.

#![allow(dead_code)]

use handle_service_sdk::{CallerConfig, Credentials, HandleServiceClient};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

pub const SERVICE_PATH: &str = "/services/handle_service";
pub const AUTH_PATH: &str = "/services/auth";

pub const ALICE_TOKEN: &str = "alice-token";
pub const BOB_TOKEN: &str = "bob-token";
pub const ADMIN_TOKEN: &str = "admin-token";
pub const ALICE_PASSWORD: &str = "correct horse";

#[derive(Default)]
struct ServiceState {
    handles: BTreeMap<String, Map<String, Value>>,
    next_hid: u64,
    unreadable_nodes: HashSet<String>,
}

/// Stateful stand-in for the AbstractHandle service
#[derive(Clone, Default)]
pub struct FakeHandleService {
    state: Arc<Mutex<ServiceState>>,
}

type Outcome = Result<Value, (i64, String)>;

impl FakeHandleService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the store report the node behind a handle as unreadable
    pub fn mark_unreadable(&self, node_id: &str) {
        self.state
            .lock()
            .unwrap()
            .unreadable_nodes
            .insert(node_id.to_string());
    }

    fn user_for(token: Option<&str>) -> Option<&'static str> {
        match token {
            Some(ALICE_TOKEN) => Some("alice"),
            Some(BOB_TOKEN) => Some("bob"),
            Some(ADMIN_TOKEN) => Some("admin"),
            _ => None,
        }
    }

    fn dispatch(&self, method: &str, params: &[Value], user: Option<&str>) -> Outcome {
        if method == "AbstractHandle.status" {
            return Ok(json!({
                "state": "OK",
                "message": "",
                "version": "0.0.1",
                "git_url": "https://github.com/kbase/handle_service2",
                "git_commit_hash": "fe8686f5ba6f253cc5aa18fbbd32a57d2478049e"
            }));
        }

        let user = user.ok_or((-32400, "Token validation failed".to_string()))?;
        let mut state = self.state.lock().unwrap();

        match method {
            "AbstractHandle.persist_handle" => {
                let mut handle = params
                    .first()
                    .and_then(Value::as_object)
                    .cloned()
                    .ok_or((-32602, "handle must be an object".to_string()))?;
                let hid = match handle.get("hid").and_then(Value::as_str) {
                    Some(hid) => hid.to_string(),
                    None => {
                        state.next_hid += 1;
                        format!("KBH_{}", state.next_hid)
                    }
                };
                handle.insert("hid".into(), json!(hid));
                handle.insert("created_by".into(), json!(user));
                handle.insert("creation_date".into(), json!("2019-03-01 10:00:00"));
                state.handles.insert(hid.clone(), handle);
                Ok(json!(hid))
            }
            "AbstractHandle.hids_to_handles" => {
                Ok(Value::Array(find_in(&state, "hid", strings(params.first()))))
            }
            "AbstractHandle.ids_to_handles" => {
                Ok(Value::Array(find_in(&state, "id", strings(params.first()))))
            }
            "AbstractHandle.fetch_handles_by" => {
                let query = params.first().and_then(Value::as_object);
                let (elements, field) = match query {
                    Some(q) if q.contains_key("elements") && q.contains_key("field_name") => {
                        (strings(q.get("elements")), q["field_name"].as_str().unwrap_or(""))
                    }
                    _ => {
                        return Err((
                            -32500,
                            "Required keys elements, field_name not in supplied parameters"
                                .to_string(),
                        ))
                    }
                };
                Ok(Value::Array(find_in(&state, field, elements)))
            }
            "AbstractHandle.is_owner" => {
                let hids = strings(params.first());
                let owned = hids.iter().all(|hid| {
                    state
                        .handles
                        .get(hid)
                        .map(|h| h.get("created_by") == Some(&json!(user)))
                        .unwrap_or(false)
                });
                Ok(json!(owned as i64))
            }
            "AbstractHandle.delete_handles" => {
                let handles = params.first().and_then(Value::as_array).cloned().unwrap_or_default();
                let hids: Vec<String> = handles
                    .iter()
                    .filter_map(|h| h.get("hid").and_then(Value::as_str).map(str::to_string))
                    .collect();
                for hid in &hids {
                    if let Some(stored) = state.handles.get(hid) {
                        if stored.get("created_by") != Some(&json!(user)) {
                            return Err((
                                -32500,
                                "Cannot delete handles not created by owner".to_string(),
                            ));
                        }
                    }
                }
                let deleted = hids
                    .iter()
                    .filter(|hid| state.handles.remove(*hid).is_some())
                    .count();
                Ok(json!(deleted as i64))
            }
            "AbstractHandle.are_readable" => Ok(json!(readable(&state, &strings(params.first())))),
            "AbstractHandle.is_readable" => {
                let hid = params.first().and_then(Value::as_str).unwrap_or_default();
                Ok(json!(readable(&state, &[hid.to_string()])))
            }
            "AbstractHandle.add_read_acl" | "AbstractHandle.set_public_read" => {
                if user != "admin" {
                    return Err((
                        -32500,
                        format!("User {} may not run add_read_acl/set_public_read method", user),
                    ));
                }
                Ok(json!(1))
            }
            other => Err((-32601, format!("Method not found: {}", other))),
        }
    }
}

fn strings(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn find_in(state: &ServiceState, field: &str, elements: Vec<String>) -> Vec<Value> {
    state
        .handles
        .values()
        .filter(|h| {
            h.get(field)
                .and_then(Value::as_str)
                .map(|v| elements.iter().any(|e| e == v))
                .unwrap_or(false)
        })
        .map(|h| Value::Object(h.clone()))
        .collect()
}

fn readable(state: &ServiceState, hids: &[String]) -> i64 {
    let all = hids.iter().all(|hid| match state.handles.get(hid) {
        Some(handle) => {
            let node = handle.get("id").and_then(Value::as_str).unwrap_or_default();
            !state.unreadable_nodes.contains(node)
        }
        None => false,
    });
    all as i64
}

impl Respond for FakeHandleService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(e) => return ResponseTemplate::new(400).set_body_string(e.to_string()),
        };
        let id = body.get("id").cloned().unwrap_or(Value::Null);
        let method = body["method"].as_str().unwrap_or_default().to_string();
        let params = body["params"].as_array().cloned().unwrap_or_default();
        let token = request
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok());

        match self.dispatch(&method, &params, Self::user_for(token)) {
            Ok(result) => ResponseTemplate::new(200).set_body_json(json!({
                "version": "1.1",
                "id": id,
                "result": [result]
            })),
            Err((code, message)) => ResponseTemplate::new(500).set_body_json(json!({
                "version": "1.1",
                "id": id,
                "error": {
                    "name": "JSONRPCError",
                    "code": code,
                    "message": message,
                    "error": "Traceback (most recent call last):\n  ..."
                }
            })),
        }
    }
}

/// Stand-in for the auth service: token introspection and legacy login
#[derive(Clone)]
pub struct FakeAuthService;

impl Respond for FakeAuthService {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let path = request.url.path();

        if path.ends_with("/api/V2/token") {
            let token = request
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok());
            return match FakeHandleService::user_for(token) {
                Some(user) => ResponseTemplate::new(200)
                    .set_body_json(json!({"user": user, "type": "Login", "expires": 0})),
                None => ResponseTemplate::new(401).set_body_json(json!({
                    "error": {"httpcode": 401, "message": "10020 Invalid token"}
                })),
            };
        }

        if path.ends_with("/api/legacy/KBase/Sessions/Login") {
            let form: HashMap<String, String> = url::form_urlencoded::parse(&request.body)
                .into_owned()
                .collect();
            let user = form.get("user_id").map(String::as_str);
            let password = form.get("password").map(String::as_str);
            return match (user, password) {
                (Some("alice"), Some(ALICE_PASSWORD)) => ResponseTemplate::new(200)
                    .set_body_json(json!({"token": ALICE_TOKEN, "user_id": "alice"})),
                _ => ResponseTemplate::new(401).set_body_json(json!({
                    "error_msg": "LoginFailure: Authentication failed."
                })),
            };
        }

        ResponseTemplate::new(404)
    }
}

/// Both fakes on one server, under SERVICE_PATH and AUTH_PATH
pub struct TestEnv {
    pub server: MockServer,
    pub service: FakeHandleService,
}

impl TestEnv {
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        let service = FakeHandleService::new();

        Mock::given(method("POST"))
            .and(path(SERVICE_PATH))
            .respond_with(service.clone())
            .mount(&server)
            .await;
        Mock::given(wiremock::matchers::path_regex(format!("^{}/", AUTH_PATH)))
            .respond_with(FakeAuthService)
            .mount(&server)
            .await;

        Self { server, service }
    }

    pub fn service_url(&self) -> String {
        format!("{}{}", self.server.uri(), SERVICE_PATH)
    }

    pub fn auth_url(&self) -> String {
        format!("{}{}", self.server.uri(), AUTH_PATH)
    }

    /// Plain-http test server, so insecure http must be allowed
    pub fn config(&self) -> CallerConfig {
        CallerConfig {
            insecure_http_allowed: true,
            auth_url: self.auth_url(),
            ..Default::default()
        }
    }

    pub async fn client_with_token(&self, token: &str) -> HandleServiceClient {
        HandleServiceClient::connect(
            self.service_url(),
            Credentials::Token(token.to_string()),
            self.config(),
        )
        .await
        .expect("token client")
    }

    pub fn anonymous_client(&self) -> HandleServiceClient {
        HandleServiceClient::new(self.service_url()).expect("anonymous client")
    }

    /// JSON bodies of every request the service endpoint received
    pub async fn service_requests(&self) -> Vec<Value> {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == SERVICE_PATH)
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}
