#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use fyyur::server::create_server;
use fyyur::storage::{InMemoryStorage, SqliteStorage, Storage};
use tempfile::TempDir;
use tower::ServiceExt;

pub const FUTURE: &str = "2035-04-01 20:00:00";
pub const PAST: &str = "2019-05-21 21:30:00";

/// A router over a fresh storage backend, plus the storage handle for
/// asserting on what the requests wrote.
pub struct TestApp {
    pub router: Router,
    pub storage: Arc<dyn Storage>,
    _dir: Option<TempDir>,
}

impl TestApp {
    pub fn in_memory() -> Self {
        let storage: Arc<dyn Storage> = Arc::new(InMemoryStorage::new());
        Self::with_storage(storage, None)
    }

    pub fn sqlite() -> Result<Self> {
        let dir = tempfile::tempdir()?;
        let storage = SqliteStorage::open(dir.path().join("fyyur.db"))?;
        storage.run_migrations()?;
        Ok(Self::with_storage(Arc::new(storage), Some(dir)))
    }

    fn with_storage(storage: Arc<dyn Storage>, dir: Option<TempDir>) -> Self {
        Self {
            router: create_server(storage.clone(), Path::new("static")),
            storage,
            _dir: dir,
        }
    }

    pub async fn get(&self, uri: &str) -> Result<(StatusCode, String)> {
        let request = Request::builder().uri(uri).body(Body::empty())?;
        self.send(request).await
    }

    pub async fn delete(&self, uri: &str) -> Result<(StatusCode, String)> {
        let request = Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())?;
        self.send(request).await
    }

    pub async fn post_form(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
    ) -> Result<(StatusCode, String)> {
        let response = self.post_form_raw(uri, fields).await?;
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, String::from_utf8(body.to_vec())?))
    }

    pub async fn post_form_raw(
        &self,
        uri: &str,
        fields: &[(&str, &str)],
    ) -> Result<axum::response::Response> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))?;
        Ok(self.router.clone().oneshot(request).await?)
    }

    async fn send(&self, request: Request<Body>) -> Result<(StatusCode, String)> {
        let response = self.router.clone().oneshot(request).await?;
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, String::from_utf8(body.to_vec())?))
    }
}

pub fn venue_fields<'a>(name: &'a str, city: &'a str, state: &'a str) -> Vec<(&'a str, &'a str)> {
    vec![
        ("name", name),
        ("city", city),
        ("state", state),
        ("address", "1805 Geary Blvd"),
        ("phone", "415-346-6000"),
        ("genres", "Rock"),
        ("genres", "Jazz"),
        ("website", "https://www.thefillmore.com"),
        ("seeking_talent", "y"),
        ("seeking_description", "Looking for local bands"),
    ]
}

pub fn artist_fields(name: &str) -> Vec<(&str, &str)> {
    vec![
        ("name", name),
        ("city", "San Francisco"),
        ("state", "CA"),
        ("phone", "326-123-5000"),
        ("genres", "Rock n Roll"),
        ("image_link", "https://images.example.com/artist.jpg"),
    ]
}

pub async fn seed_venue(app: &TestApp, name: &str, city: &str, state: &str) -> Result<()> {
    let (status, _) = app
        .post_form("/venues/create", &venue_fields(name, city, state))
        .await?;
    assert_eq!(status, StatusCode::OK, "seeding venue {name}");
    Ok(())
}

pub async fn seed_artist(app: &TestApp, name: &str) -> Result<()> {
    let (status, _) = app.post_form("/artists/create", &artist_fields(name)).await?;
    assert_eq!(status, StatusCode::OK, "seeding artist {name}");
    Ok(())
}

pub async fn seed_show(
    app: &TestApp,
    venue_id: &str,
    artist_id: &str,
    start_time: &str,
) -> Result<()> {
    let (status, _) = app
        .post_form(
            "/shows/create",
            &[("venue_id", venue_id), ("artist_id", artist_id), ("start_time", start_time)],
        )
        .await?;
    assert_eq!(status, StatusCode::OK, "seeding show at {start_time}");
    Ok(())
}
