// REST collaborator transport
// Every request to the back office API goes through a Transport, so screens and tests can swap the wire

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

// Errors surfaced by the API client and the cache built on top of it
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Mutation already in flight for {0}")]
    MutationInFlight(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_))
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Unauthorized(_) => Some(401),
            ApiError::ApiResponseError { status_code, .. } => Some(*status_code),
            _ => None,
        }
    }

    // The one string a toast or inline banner shows
    pub fn user_message(&self) -> String {
        let message = match self {
            ApiError::NetworkError(message)
            | ApiError::Unauthorized(message)
            | ApiError::ApiResponseError { message, .. }
            | ApiError::Other(message) => message.trim(),
            ApiError::Timeout(_) => "The request timed out. Please try again.",
            ApiError::DecodeError(_) => "Unexpected response from the server.",
            ApiError::MutationInFlight(_) => "This action is already in progress.",
        };

        if message.is_empty() {
            "A network or server error occurred.".to_string()
        } else {
            message.to_string()
        }
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_ms: 15_000,
            user_agent: concat!("dashboard_core/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
        })
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

// Private requests carry the session's bearer token, public ones never do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    pub access: Access,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    pub bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, access: Access, path: impl Into<String>) -> Self {
        Self {
            method,
            access,
            path: path.into(),
            query: Vec::new(),
            body: None,
            bearer: None,
        }
    }

    pub fn public(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, Access::Public, path)
    }

    pub fn private(method: Method, path: impl Into<String>) -> Self {
        Self::new(method, Access::Private, path)
    }

    pub fn query(mut self, name: &str, value: impl Into<String>) -> Self {
        self.query.push((name.to_string(), value.into()));
        self
    }

    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::Other(format!("Failed to encode request body: {}", e)))?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn query_value(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn json(status: u16, body: &serde_json::Value) -> Self {
        Self {
            status,
            body: Bytes::from(body.to_string()),
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError>;
}

pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout_ms: u64,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        if config.base_url.trim().is_empty() {
            return Err(ClientError::ConfigError("base_url must not be empty".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: config.timeout_ms,
        })
    }

    fn map_error(&self, error: reqwest::Error) -> ApiError {
        if error.is_timeout() {
            ApiError::Timeout(self.timeout_ms)
        } else {
            ApiError::NetworkError(error.to_string())
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = format!("{}{}", self.base_url, request.path);
        debug!("{} {}", request.method, url);

        let mut builder = self
            .client
            .request(request.method.into(), url)
            .header(CONTENT_TYPE, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &request.bearer {
            builder = builder.bearer_auth(token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(|e| self.map_error(e))?;

        Ok(ApiResponse { status, body })
    }
}

// In-memory back office used by the client, cache and dashboard tests
#[cfg(test)]
pub mod mock_server {
    use super::*;
    use parking_lot::Mutex;
    use serde_json::{json, Value};
    use std::collections::{HashMap, VecDeque};
    use tokio::sync::watch;

    pub const VALID_TOKEN: &str = "token-123";

    pub struct MockServer {
        bookings: Mutex<Vec<Value>>,
        routes: Mutex<HashMap<(Method, String), Value>>,
        failures: Mutex<VecDeque<ApiResponse>>,
        calls: Mutex<HashMap<(Method, String), usize>>,
        requests: Mutex<Vec<ApiRequest>>,
        open: watch::Sender<bool>,
    }

    impl MockServer {
        pub fn new() -> Self {
            let (open, _) = watch::channel(true);
            Self {
                bookings: Mutex::new(Vec::new()),
                routes: Mutex::new(HashMap::new()),
                failures: Mutex::new(VecDeque::new()),
                calls: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
                open,
            }
        }

        pub fn with_bookings(ids: &[&str]) -> Self {
            let server = Self::new();
            for id in ids {
                server.add_booking(id);
            }
            server
        }

        pub fn add_booking(&self, id: &str) {
            self.bookings.lock().push(json!({
                "_id": id,
                "bookingReference": format!("REF-{}", id),
                "fullName": "Jane Doe",
                "email": "jane@example.com",
                "services": "standard-cleaning",
                "serviceType": "2-bed-1-bath",
                "charge": 203.0,
                "status": "pending"
            }));
        }

        pub fn booking_ids(&self) -> Vec<String> {
            self.bookings
                .lock()
                .iter()
                .filter_map(|b| b["_id"].as_str().map(str::to_string))
                .collect()
        }

        // Canned success body for any route the built-in handlers do not cover
        pub fn respond(&self, method: Method, path: &str, body: Value) {
            self.routes.lock().insert((method, path.to_string()), body);
        }

        // Queue failing responses; each request consumes one before normal handling
        pub fn fail_next(&self, status: u16, body: Value) {
            self.failures.lock().push_back(ApiResponse::json(status, &body));
        }

        // Hold every request until release() is called
        pub fn pause(&self) {
            self.open.send_replace(false);
        }

        pub fn release(&self) {
            self.open.send_replace(true);
        }

        pub fn calls(&self, method: Method, path: &str) -> usize {
            self.calls
                .lock()
                .get(&(method, path.to_string()))
                .copied()
                .unwrap_or(0)
        }

        pub fn total_calls(&self) -> usize {
            self.calls.lock().values().sum()
        }

        pub fn requests(&self) -> Vec<ApiRequest> {
            self.requests.lock().clone()
        }

        fn ok(data: Value) -> ApiResponse {
            ApiResponse::json(200, &json!({ "success": true, "data": data }))
        }

        fn handle(&self, request: &ApiRequest) -> ApiResponse {
            if request.access == Access::Private && request.bearer.as_deref() != Some(VALID_TOKEN) {
                return ApiResponse::json(401, &json!({ "message": "Invalid or expired token" }));
            }

            match (request.method, request.path.as_str()) {
                (Method::Get, "/api/v1/admin/all-bookings") => {
                    Self::ok(Value::Array(self.bookings.lock().clone()))
                }
                (Method::Get, "/api/v1/admin/booking") => {
                    let id = request.query_value("bookingId").unwrap_or_default();
                    let bookings = self.bookings.lock();
                    match bookings.iter().find(|b| b["_id"] == id) {
                        Some(booking) => Self::ok(booking.clone()),
                        None => ApiResponse::json(404, &json!({ "message": "Booking not found" })),
                    }
                }
                (Method::Delete, "/api/v1/admin/deleteBooking") => {
                    let id = request.query_value("bookingId").unwrap_or_default();
                    let mut bookings = self.bookings.lock();
                    let before = bookings.len();
                    bookings.retain(|b| b["_id"] != id);
                    if bookings.len() == before {
                        ApiResponse::json(404, &json!({ "error": "Booking not found" }))
                    } else {
                        ApiResponse::json(200, &json!({ "success": true, "message": "Booking deleted" }))
                    }
                }
                (Method::Post, "/api/v1/booking/createBookingPayment") => {
                    let body = request.body.clone().unwrap_or(Value::Null);
                    let id = format!("b{}", self.bookings.lock().len() + 1);
                    let mut booking = body.clone();
                    booking["_id"] = json!(id);
                    self.bookings.lock().push(booking);
                    ApiResponse::json(200, &json!({ "success": true, "message": "Booking created" }))
                }
                (Method::Post, "/api/v1/user/login") => {
                    let body = request.body.clone().unwrap_or(Value::Null);
                    if body["password"] == "secret" {
                        Self::ok(json!({
                            "token": VALID_TOKEN,
                            "user": {
                                "_id": "admin-1",
                                "fullName": "Ada Admin",
                                "email": body["email"],
                                "role": "admin"
                            }
                        }))
                    } else {
                        ApiResponse::json(401, &json!({ "message": "Invalid credentials" }))
                    }
                }
                (method, path) => match self.routes.lock().get(&(method, path.to_string())) {
                    Some(body) => ApiResponse::json(200, body),
                    None => ApiResponse::json(404, &json!({ "message": format!("No route for {} {}", method, path) })),
                },
            }
        }
    }

    impl Default for MockServer {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Transport for MockServer {
        async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
            *self
                .calls
                .lock()
                .entry((request.method, request.path.clone()))
                .or_insert(0) += 1;
            self.requests.lock().push(request.clone());

            let mut open = self.open.subscribe();
            if open.wait_for(|open| *open).await.is_err() {
                return Err(ApiError::NetworkError("mock server shut down".to_string()));
            }

            if let Some(failure) = self.failures.lock().pop_front() {
                return Ok(failure);
            }
            Ok(self.handle(&request))
        }
    }

    // Transport that cannot reach anything
    pub struct Unreachable;

    #[async_trait]
    impl Transport for Unreachable {
        async fn send(&self, _request: ApiRequest) -> Result<ApiResponse, ApiError> {
            Err(ApiError::NetworkError("connection refused".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(ApiError::NetworkError("".to_string()), "A network or server error occurred.")]
    #[test_case(ApiError::NetworkError("connection refused".to_string()), "connection refused")]
    #[test_case(ApiError::Timeout(15_000), "The request timed out. Please try again.")]
    #[test_case(ApiError::ApiResponseError { status_code: 409, message: "Email already used".to_string() }, "Email already used")]
    #[test_case(ApiError::DecodeError("missing field `data`".to_string()), "Unexpected response from the server.")]
    fn test_user_message(error: ApiError, expected: &str) {
        assert_eq!(error.user_message(), expected);
    }

    #[test]
    fn test_request_builder() {
        let request = ApiRequest::private(Method::Post, "/api/v1/admin/assign-booking-to-cleaner")
            .query("bookingId", "b1")
            .query("workerId", "w9");

        assert_eq!(request.query_value("workerId"), Some("w9"));
        assert_eq!(request.query_value("missing"), None);
        assert_eq!(
            request.label(),
            "POST /api/v1/admin/assign-booking-to-cleaner"
        );
        assert!(request.bearer.is_none());
    }

    #[test]
    fn test_http_transport_rejects_empty_base_url() {
        let config = ClientConfig {
            base_url: "  ".to_string(),
            ..ClientConfig::default()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(ClientError::ConfigError(_))
        ));
    }

    #[tokio::test]
    async fn test_http_transport_reports_unreachable_host() {
        let config = ClientConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_ms: 2_000,
            ..ClientConfig::default()
        };
        let transport = HttpTransport::new(&config).unwrap();

        let result = transport
            .send(ApiRequest::public(Method::Get, "/api/v1/faq/getFaqs"))
            .await;
        assert!(matches!(
            result,
            Err(ApiError::NetworkError(_)) | Err(ApiError::Timeout(_))
        ));
    }
}
