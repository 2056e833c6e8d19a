use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};
use crate::common::error::{Result, WorkbenchError};
use crate::common::value::{identity_string, RawElement};
use crate::query_bail;
use super::graphson;

const GRAPHSON_V3: &str = "application/vnd.gremlin-v3.0+json";

/// Account as supplied by the caller; either field may be missing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Account {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Account {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }
}

/// Validated credentials for a traversal connection
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Validate a caller account. No account means anonymous access; an account
    /// missing either field is rejected.
    pub fn from_account(account: Option<&Account>) -> Result<Self> {
        let Some(account) = account else {
            return Ok(Credentials::default());
        };
        match (&account.username, &account.password) {
            (Some(username), Some(password)) => Ok(Credentials {
                username: username.clone(),
                password: password.clone(),
            }),
            _ => Err(WorkbenchError::authentication("username or password not exists.")),
        }
    }

    pub fn is_anonymous(&self) -> bool {
        self.username.is_empty() && self.password.is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Open session with a traversal engine
#[async_trait]
pub trait TraversalConnection: Send + Sync {
    /// Submit one query in the engine's native language
    async fn submit(&self, query: &str) -> Result<Vec<RawElement>>;

    /// Release the connection; calling it twice is harmless
    async fn close(&self) -> Result<()>;
}

/// Factory for traversal connections, injected into every query operation
#[async_trait]
pub trait TraversalConnector: Send + Sync {
    async fn open(&self, server: &str, credentials: Credentials) -> Result<Box<dyn TraversalConnection>>;
}

/// Validate the account, then open a connection.
/// Malformed accounts fail here, before the connector sees the request.
pub async fn connect(
    connector: &dyn TraversalConnector,
    server: &str,
    account: Option<&Account>,
) -> Result<Box<dyn TraversalConnection>> {
    let credentials = Credentials::from_account(account)?;
    let connection = connector.open(server, credentials).await?;
    tracing::info!("Gremlin client init on server {}", server);
    Ok(connection)
}

/// Best-effort close; errors are logged and dropped
pub async fn release(connection: &dyn TraversalConnection) {
    tracing::debug!("Gremlin client close");
    if let Err(e) = connection.close().await {
        tracing::debug!("Ignoring error while closing gremlin client: {}", e);
    }
}

/// Render a vertex id as a query literal. Numeric ids are written bare,
/// string ids always as a quoted, escaped literal.
pub fn id_literal(id: &JsonValue) -> String {
    match id {
        JsonValue::Number(n) => n.to_string(),
        other => {
            let text = identity_string(other);
            format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
        }
    }
}

/// Comma separated id literals for `g.V(...)`
pub fn json_id_list(ids: &[JsonValue]) -> String {
    ids.iter().map(id_literal).collect::<Vec<_>>().join(",")
}

/// Connector for the Gremlin Server HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpTraversalConnector {
    client: reqwest::Client,
}

impl HttpTraversalConnector {
    pub fn new(connect_timeout: Duration, request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()?;
        Ok(HttpTraversalConnector { client })
    }
}

#[async_trait]
impl TraversalConnector for HttpTraversalConnector {
    async fn open(&self, server: &str, credentials: Credentials) -> Result<Box<dyn TraversalConnection>> {
        Ok(Box::new(HttpTraversalConnection {
            client: self.client.clone(),
            endpoint: http_endpoint(server),
            credentials,
            closed: AtomicBool::new(false),
        }))
    }
}

/// Gremlin endpoints are usually published as websocket URLs
fn http_endpoint(server: &str) -> String {
    if let Some(rest) = server.strip_prefix("ws://") {
        format!("http://{}", rest)
    } else if let Some(rest) = server.strip_prefix("wss://") {
        format!("https://{}", rest)
    } else {
        server.to_string()
    }
}

/// Message of a failed reply: `status.message`, then the top-level `message`
/// the HTTP endpoint sends, then the body text when it is not JSON
fn error_message(body: Option<&JsonValue>, text: &str) -> Option<String> {
    match body {
        Some(body) => body
            .get("status")
            .and_then(|status| status.get("message"))
            .or_else(|| body.get("message"))
            .and_then(JsonValue::as_str)
            .filter(|m| !m.is_empty())
            .map(str::to_string),
        None => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
    }
}

/// One logical session against a Gremlin Server HTTP endpoint
pub struct HttpTraversalConnection {
    client: reqwest::Client,
    endpoint: String,
    credentials: Credentials,
    closed: AtomicBool,
}

impl HttpTraversalConnection {
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TraversalConnection for HttpTraversalConnection {
    async fn submit(&self, query: &str) -> Result<Vec<RawElement>> {
        if self.is_closed() {
            query_bail!("connection to {} is closed", self.endpoint);
        }

        tracing::info!("Execute query {}", query);
        let mut request = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::ACCEPT, GRAPHSON_V3)
            .json(&json!({"gremlin": query, "language": "gremlin-groovy"}));
        if !self.credentials.is_anonymous() {
            request = request.basic_auth(&self.credentials.username, Some(&self.credentials.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| WorkbenchError::query(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| WorkbenchError::query(e.to_string()))?;

        let body = serde_json::from_str::<JsonValue>(&text);
        if !status.is_success() {
            let message = error_message(body.as_ref().ok(), &text)
                .unwrap_or_else(|| format!("server responded with status {}", status.as_u16()));
            return Err(WorkbenchError::query(message));
        }
        match body {
            Ok(body) => graphson::decode_response(&body),
            Err(e) => query_bail!("unreadable response from {}: {}", self.endpoint, e),
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}
