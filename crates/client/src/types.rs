//! Wire types exchanged with the inventory service and session value types.

use serde::{Deserialize, Serialize};
use stocksync_core::Item;

use crate::error::RemoteError;

/// Business status code the service uses for success.
pub const STATUS_OK: i32 = 1;

/// Body of `GET list-items`.
///
/// `message` and `data` may be absent or `null`, which the service does on
/// rejections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemResponse {
    #[serde(rename = "statusCode")]
    pub status_code: i32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<Vec<Item>>,
}

/// One remote fetch result, valid for a single refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemBatch {
    pub status_code: i32,
    pub message: String,
    pub items: Vec<Item>,
}

impl ItemBatch {
    pub fn success(items: Vec<Item>) -> Self {
        Self {
            status_code: STATUS_OK,
            message: String::new(),
            items,
        }
    }

    pub fn rejected(status_code: i32, message: impl Into<String>) -> Self {
        Self {
            status_code,
            message: message.into(),
            items: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status_code == STATUS_OK
    }

    /// Items to fold into the store, or the reason the batch must be discarded.
    pub fn into_items(self) -> Result<Vec<Item>, RemoteError> {
        if !self.is_success() {
            return Err(RemoteError::ServerRejected(self.message));
        }
        for item in &self.items {
            item.validate()
                .map_err(|e| RemoteError::transport(format!("malformed payload: {e}")))?;
        }
        Ok(self.items)
    }
}

impl From<ItemResponse> for ItemBatch {
    fn from(resp: ItemResponse) -> Self {
        Self {
            status_code: resp.status_code,
            message: resp.message.unwrap_or_default(),
            items: resp.data.unwrap_or_default(),
        }
    }
}

/// Body of `POST login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "statusCode")]
    pub status_code: i32,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<LoginData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginData {
    pub api_token: String,
}

/// Login credentials.
#[derive(Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Opaque bearer token issued by the login endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Reachability of the inventory service as of the last remote call.
///
/// Only login and refresh outcomes move it; local mutations never do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// The last remote call got an answer, success or rejection.
    #[default]
    Online,
    /// The last remote call never got an answer (transport failure or timeout).
    Offline,
}

#[cfg(test)]
mod tests {
    use super::*;
    use stocksync_core::ItemId;

    #[test]
    fn parses_list_items_body() {
        let body = serde_json::json!({
            "statusCode": 1,
            "message": "ok",
            "data": [
                { "id": 1, "item_name": "Bolt", "stock": 10, "unit": "pcs" },
                { "id": 2, "item_name": "Nut", "stock": 0, "unit": "pcs" }
            ]
        });
        let resp: ItemResponse = serde_json::from_value(body).unwrap();
        let items = ItemBatch::from(resp).into_items().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Bolt");
    }

    #[test]
    fn rejection_without_data_parses() {
        let body = serde_json::json!({ "statusCode": 0, "message": "bad token" });
        let resp: ItemResponse = serde_json::from_value(body).unwrap();
        let err = ItemBatch::from(resp).into_items().unwrap_err();
        assert_eq!(err, RemoteError::ServerRejected("bad token".into()));
    }

    #[test]
    fn rejection_with_null_fields_keeps_server_message() {
        let body = serde_json::json!({ "statusCode": 0, "message": "bad token", "data": null });
        let resp: ItemResponse = serde_json::from_value(body).unwrap();
        let err = ItemBatch::from(resp).into_items().unwrap_err();
        assert_eq!(err, RemoteError::ServerRejected("bad token".into()));

        let body = serde_json::json!({ "statusCode": 0, "message": null, "data": null });
        let resp: ItemResponse = serde_json::from_value(body).unwrap();
        let err = ItemBatch::from(resp).into_items().unwrap_err();
        assert_eq!(err, RemoteError::ServerRejected(String::new()));
    }

    #[test]
    fn login_rejection_with_null_fields_parses() {
        let body = serde_json::json!({ "statusCode": 0, "message": null, "data": null });
        let resp: LoginResponse = serde_json::from_value(body).unwrap();
        assert!(resp.data.is_none());
        assert!(resp.message.is_none());
    }

    #[test]
    fn invalid_item_discards_whole_batch() {
        let good = Item::new(ItemId::new(1), "Bolt", 1, "pcs").unwrap();
        let bad = Item {
            id: ItemId::new(2),
            name: String::new(),
            stock: 1,
            unit: "pcs".into(),
        };
        let err = ItemBatch::success(vec![good, bad]).into_items().unwrap_err();
        assert!(matches!(err, RemoteError::TransportFailure(_)));
    }

    #[test]
    fn secrets_are_redacted_in_debug() {
        let creds = Credentials::new("a@b.c", "hunter2");
        let token = AuthToken::new("abc123");
        assert!(!format!("{creds:?}").contains("hunter2"));
        assert!(!format!("{token:?}").contains("abc123"));
    }
}
