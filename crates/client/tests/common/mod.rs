#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode, header::AUTHORIZATION};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};

pub const EMAIL: &str = "programmer@example.com";
pub const PASSWORD: &str = "Prog123!";
pub const VALID_TOKEN: &str = "valid-token";
pub const EXPIRED_TOKEN: &str = "expired-token";

/// What `GET list-items` answers for a valid token.
#[derive(Debug, Clone)]
pub enum ListReply {
    Json(Value),
    Raw(&'static str),
    Delayed(Duration, Value),
}

pub struct MockInventory {
    pub list_reply: Mutex<ListReply>,
    pub list_calls: Mutex<usize>,
}

impl MockInventory {
    pub fn set_items(&self, items: Value) {
        *self.list_reply.lock().unwrap() =
            ListReply::Json(json!({ "statusCode": 1, "message": "ok", "data": items }));
    }

    pub fn set_reply(&self, reply: ListReply) {
        *self.list_reply.lock().unwrap() = reply;
    }
}

pub struct TestServer {
    pub base_url: String,
    pub mock: Arc<MockInventory>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let mock = Arc::new(MockInventory {
            list_reply: Mutex::new(ListReply::Json(
                json!({ "statusCode": 1, "message": "ok", "data": [] }),
            )),
            list_calls: Mutex::new(0),
        });

        let app = Router::new()
            .route("/api/dev/login", post(login))
            .route("/api/dev/list-items", get(list_items))
            .with_state(mock.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}/api/dev/", addr);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url,
            mock,
            handle,
        }
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn login(Form(form): Form<LoginForm>) -> Json<Value> {
    if form.email == EMAIL && form.password == PASSWORD {
        Json(json!({
            "statusCode": 1,
            "message": "login ok",
            "data": { "api_token": VALID_TOKEN }
        }))
    } else {
        Json(json!({ "statusCode": 0, "message": "invalid credentials", "data": null }))
    }
}

async fn list_items(State(mock): State<Arc<MockInventory>>, headers: HeaderMap) -> Response {
    *mock.list_calls.lock().unwrap() += 1;

    let auth = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if auth == format!("Bearer {EXPIRED_TOKEN}") {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    if auth != format!("Bearer {VALID_TOKEN}") {
        return Json(json!({ "statusCode": 0, "message": "bad token", "data": null }))
            .into_response();
    }

    let reply = mock.list_reply.lock().unwrap().clone();
    match reply {
        ListReply::Json(body) => Json(body).into_response(),
        ListReply::Raw(text) => (StatusCode::OK, text).into_response(),
        ListReply::Delayed(delay, body) => {
            tokio::time::sleep(delay).await;
            Json(body).into_response()
        }
    }
}

pub fn item_json(id: i64, name: &str, stock: u32, unit: &str) -> Value {
    json!({ "id": id, "item_name": name, "stock": stock, "unit": unit })
}
