//! Common test utilities and helpers.

#![allow(dead_code)]

use reqwest::multipart;
use serde_json::{json, Value};
use std::net::{SocketAddr, TcpListener};
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener as TokioTcpListener;
use videotube::{
    config::{
        AuthConfig, CloudinaryConfig, Config, LoggingConfig, MediaConfig, MediaProvider,
        RateLimitConfig, ServerConfig, StorageConfig, UploadConfig,
    },
    create_router, AppState, RateLimiter,
};

pub const PASSWORD: &str = "correct horse battery";

/// Test server instance
pub struct TestServer {
    pub base_url: String,
    pub data_dir: TempDir,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

impl TestServer {
    /// Start a test server on a random port
    pub async fn start() -> Self {
        Self::start_with(RateLimitConfig::default()).await
    }

    /// Start a test server with the given rate limit settings
    pub async fn start_with(rate_limit: RateLimitConfig) -> Self {
        let port = get_available_port();
        let data_dir = TempDir::new().expect("Failed to create temp dir");
        let base_url = format!("http://127.0.0.1:{}", port);

        let config = create_test_config(&data_dir, port, &base_url, rate_limit);
        let rate_limiter = RateLimiter::new(&config.rate_limit);

        let state = AppState::new(config)
            .await
            .expect("Failed to create app state");
        let app = create_router(state, &rate_limiter);

        let listener = TokioTcpListener::bind(("127.0.0.1", port))
            .await
            .expect("Failed to bind listener");

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            tokio::select! {
                _ = axum::serve(
                    listener,
                    app.into_make_service_with_connect_info::<SocketAddr>(),
                ) => {}
                _ = shutdown_rx => {}
            }
        });

        // Give the server time to start
        tokio::time::sleep(Duration::from_millis(50)).await;

        Self {
            base_url,
            data_dir,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// HTTP client that keeps session cookies
    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap()
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Path on disk of a locally hosted media URL
    pub fn media_path(&self, url: &str) -> PathBuf {
        let public_id = url
            .strip_prefix(&format!("{}/media/", self.base_url))
            .expect("not a local media url");
        self.data_dir.path().join("media").join(public_id)
    }

    /// Register `username` with an avatar
    pub async fn register(&self, client: &reqwest::Client, username: &str) -> reqwest::Response {
        let form = multipart::Form::new()
            .text("username", username.to_string())
            .text("email", format!("{}@example.com", username))
            .text("fullname", format!("{} Tester", username))
            .text("password", PASSWORD)
            .part("avatar", png_part("avatar.png"));

        client
            .post(self.url("/api/v1/users/register"))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send register request")
    }

    /// Register and log in; returns a client holding the session and the user
    pub async fn signed_in(&self, username: &str) -> (reqwest::Client, Value) {
        let client = self.client();

        let response = self.register(&client, username).await;
        assert_eq!(response.status(), 201, "register {}", username);

        let response = client
            .post(self.url("/api/v1/users/login"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200, "login {}", username);

        let body: Value = response.json().await.unwrap();
        (client, body["data"]["user"].clone())
    }

    /// Upload a video as the client's user; returns the video document
    pub async fn publish_video(&self, client: &reqwest::Client, title: &str, published: bool) -> Value {
        let form = multipart::Form::new()
            .text("title", title.to_string())
            .text("description", format!("About {}", title))
            .text("isPublished", published.to_string())
            .part("videoFile", mp4_part("clip.mp4"));

        let response = client
            .post(self.url("/api/v1/videos"))
            .multipart(form)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 201, "publish {}", title);

        let body: Value = response.json().await.unwrap();
        body["data"].clone()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Create test configuration
fn create_test_config(
    data_dir: &TempDir,
    port: u16,
    base_url: &str,
    rate_limit: RateLimitConfig,
) -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            base_url: base_url.to_string(),
            cors_origins: vec!["http://localhost:5173".to_string()],
            public_dir: data_dir.path().join("public"),
            max_page_size: 50,
        },
        storage: StorageConfig {
            data_dir: data_dir.path().to_path_buf(),
        },
        auth: AuthConfig {
            access_token_secret: "test-access-secret".to_string(),
            access_token_ttl_secs: 3600,
            refresh_token_secret: "test-refresh-secret".to_string(),
            refresh_token_ttl_secs: 86400,
            cookie_secure: false,
        },
        media: MediaConfig {
            provider: MediaProvider::Local,
            folder_root: "Videotube".to_string(),
            cloudinary: CloudinaryConfig::default(),
        },
        upload: UploadConfig {
            max_image_size: 1024 * 1024,
            max_video_size: 4 * 1024 * 1024,
        },
        rate_limit,
        logging: LoggingConfig {
            level: "warn".to_string(),
            format: "pretty".to_string(),
        },
    }
}

/// Find an available TCP port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .expect("Failed to bind to random port")
        .local_addr()
        .expect("Failed to get local address")
        .port()
}

/// Bytes with a PNG signature
pub fn png_bytes() -> Vec<u8> {
    let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
    data.extend_from_slice(&[0u8; 64]);
    data
}

/// Bytes with an MP4 `ftyp` box
pub fn mp4_bytes() -> Vec<u8> {
    let mut data = vec![
        0x00, 0x00, 0x00, 0x18, b'f', b't', b'y', b'p', b'i', b's', b'o', b'm', 0x00, 0x00,
        0x02, 0x00, b'i', b's', b'o', b'm', b'm', b'p', b'4', b'1',
    ];
    data.extend_from_slice(&[0u8; 128]);
    data
}

pub fn png_part(name: &str) -> multipart::Part {
    multipart::Part::bytes(png_bytes())
        .file_name(name.to_string())
        .mime_str("image/png")
        .unwrap()
}

pub fn mp4_part(name: &str) -> multipart::Part {
    multipart::Part::bytes(mp4_bytes())
        .file_name(name.to_string())
        .mime_str("video/mp4")
        .unwrap()
}
