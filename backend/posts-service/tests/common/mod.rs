//! Shared fixtures for posts-service integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use crypto_core::JwtKeys;
use posts_service::db::MemoryStore;
use posts_service::handlers::AppState;
use posts_service::models::Location;
use posts_service::services::{
    FileStorage, GeocodeError, Geocoder, LocalFileStorage, PostCoordinator, UserDirectory,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const JWT_SECRET: &str = "integration-secret-Qm7#pL2x9Rk4vT8wEz1uNc6Y";

pub const BAKER_ST: &str = "221B Baker St";
pub const BAKER_ST_LOCATION: Location = Location {
    lat: 51.5237,
    lng: -0.1585,
};

/// Resolves a fixed set of addresses; anything else fails.
pub struct StubGeocoder {
    known: HashMap<String, Location>,
}

impl StubGeocoder {
    pub fn new() -> Self {
        let mut known = HashMap::new();
        known.insert(BAKER_ST.to_string(), BAKER_ST_LOCATION);
        Self { known }
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn resolve(&self, address: &str) -> Result<Location, GeocodeError> {
        self.known
            .get(address)
            .copied()
            .ok_or(GeocodeError::NoResults)
    }
}

/// Geocoder whose upstream is always down.
pub struct FailingGeocoder;

#[async_trait]
impl Geocoder for FailingGeocoder {
    async fn resolve(&self, _address: &str) -> Result<Location, GeocodeError> {
        Err(GeocodeError::Request("unreachable".into()))
    }
}

pub struct Harness {
    pub store: MemoryStore,
    pub keys: Arc<JwtKeys>,
    pub files: Arc<LocalFileStorage>,
    pub posts: PostCoordinator,
    pub users: UserDirectory,
    pub upload_dir: tempfile::TempDir,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_geocoder(Arc::new(StubGeocoder::new()))
    }

    pub fn with_geocoder(geocoder: Arc<dyn Geocoder>) -> Self {
        let store = MemoryStore::new();
        let keys = Arc::new(JwtKeys::from_secret(JWT_SECRET));
        let upload_dir = tempfile::tempdir().expect("tempdir");
        let files = Arc::new(LocalFileStorage::new(upload_dir.path(), 64 * 1024));

        let posts = PostCoordinator::new(
            Arc::new(store.clone()),
            geocoder,
            files.clone(),
            Duration::from_secs(5),
        );
        let users = UserDirectory::new(Arc::new(store.clone()), keys.clone(), files.clone());

        Self {
            store,
            keys,
            files,
            posts,
            users,
            upload_dir,
        }
    }

    pub fn app_state(&self) -> AppState {
        AppState::new(
            Arc::new(self.store.clone()),
            Arc::new(StubGeocoder::new()),
            self.files.clone() as Arc<dyn FileStorage>,
            self.keys.clone(),
            Duration::from_secs(5),
            64 * 1024,
        )
    }

    /// Number of files currently in the upload directory.
    pub fn stored_files(&self) -> usize {
        std::fs::read_dir(self.upload_dir.path())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }
}

/// Build a `multipart/form-data` body. Files are `(field, content_type, bytes)`.
pub fn multipart_body(
    fields: &[(&str, &str)],
    file: Option<(&str, &str, &[u8])>,
) -> (String, Vec<u8>) {
    let boundary = "----pinpoint-test-boundary";
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n").as_bytes(),
        );
        body.extend_from_slice(value.as_bytes());
        body.extend_from_slice(b"\r\n");
    }

    if let Some((name, content_type, bytes)) = file {
        body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{name}\"; filename=\"upload\"\r\n\
                 Content-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    body.extend_from_slice(format!("--{boundary}--\r\n").as_bytes());
    (format!("multipart/form-data; boundary={boundary}"), body)
}
