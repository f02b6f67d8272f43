use std::net::SocketAddr;
use std::sync::Arc;

use common::StorageConfig;
use reqwest::Client;
use reqwest::header::HeaderMap;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use serde_json::Value;

use tether_server::config::{
    AppConfig, CorsConfig, DatabaseConfig, ServerConfig, SessionConfig, UploadConfig,
};
use tether_server::files::Files;
use tether_server::state::AppState;

pub mod routes {
    pub const TEMP_FILES: &str = "/api/v1/temp-files";
    pub const OPENAPI: &str = "/api-docs/openapi.json";

    pub fn temp_file(id: i32, name: &str) -> String {
        format!("/api/v1/temp-files/{id}/{name}")
    }
}

/// A running test server.
pub struct TestApp {
    pub addr: SocketAddr,
    /// Client that keeps cookies, i.e. one browser session.
    pub client: Client,
    pub db: DatabaseConnection,
    pub files: Files,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Raw response body as text.
    pub text: String,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors: CorsConfig {
                allow_origins: vec![],
                max_age: 3600,
            },
        },
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        storage: StorageConfig::in_memory(),
        session: SessionConfig::default(),
        upload: UploadConfig::default(),
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with(|_| {}).await
    }

    /// Spawn with a tweaked configuration.
    pub async fn spawn_with(configure: impl FnOnce(&mut AppConfig)) -> Self {
        let mut config = test_config();
        configure(&mut config);

        // A single connection: every in-memory SQLite connection is its own database.
        let mut opts = ConnectOptions::new(config.database.url.clone());
        opts.max_connections(1)
            .min_connections(1)
            .sqlx_logging(false);
        let db = Database::connect(opts)
            .await
            .expect("Failed to connect to test database");
        tether_server::database::sync_schema(&db)
            .await
            .expect("Failed to sync schema");

        let files = Files::from_config(&config.storage)
            .await
            .expect("Failed to build disks");

        let state = AppState {
            db: db.clone(),
            files: files.clone(),
            config: Arc::new(config),
        };

        let app = tether_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: new_session_client(),
            db,
            files,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.get_as(&self.client, path).await
    }

    /// GET with another client, e.g. a second browser session.
    pub async fn get_as(&self, client: &Client, path: &str) -> TestResponse {
        let res = client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");

        TestResponse::from_response(res).await
    }

    pub async fn upload(&self, file_name: &str, file_bytes: Vec<u8>) -> TestResponse {
        let part = reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        self.post_form(form).await
    }

    pub async fn post_form(&self, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(routes::TEMP_FILES))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");

        TestResponse::from_response(res).await
    }
}

/// A client with its own cookie store.
pub fn new_session_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to build HTTP client")
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let text = res.text().await.unwrap_or_default();
        let body = serde_json::from_str(&text).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            text,
            body,
        }
    }

    pub fn id(&self) -> i32 {
        self.body["id"]
            .as_i64()
            .expect("response body should contain 'id'") as i32
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
