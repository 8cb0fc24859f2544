use std::sync::Arc;

use anyhow::Result;
use chrono::{Duration, Local, NaiveDateTime};
use fyyur::domain::{Artist, Show, Venue};
use fyyur::error::FyyurError;
use fyyur::storage::{InMemoryStorage, SqliteStorage, Storage};
use fyyur::views;

fn venue(name: &str, city: &str) -> Venue {
    Venue {
        id: 0,
        name: name.to_string(),
        address: "1015 Folsom Street".to_string(),
        city: city.to_string(),
        state: "CA".to_string(),
        phone: None,
        image_link: None,
        facebook_link: None,
        website: None,
        genres: "Jazz,Reggae".to_string(),
        seeking_talent: false,
        seeking_description: None,
    }
}

fn artist(name: &str) -> Artist {
    Artist {
        id: 0,
        name: name.to_string(),
        city: "San Francisco".to_string(),
        state: "CA".to_string(),
        address: None,
        phone: Some("326-123-5000".to_string()),
        genres: "Rock n Roll".to_string(),
        image_link: None,
        facebook_link: None,
        website: None,
        seeking_venue: true,
        seeking_description: Some("Looking for shows".to_string()),
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

async fn exercise(storage: Arc<dyn Storage>) -> Result<()> {
    let mut hop = venue("The Musical Hop", "San Francisco");
    let mut park = venue("Park Square 100% Live", "San Francisco");
    let mut piano = venue("The Dueling Pianos Bar", "New York");
    storage.create_venue(&mut hop).await?;
    storage.create_venue(&mut park).await?;
    storage.create_venue(&mut piano).await?;
    assert_eq!((hop.id, park.id, piano.id), (1, 2, 3));

    let mut petals = artist("Guns N Petals");
    storage.create_artist(&mut petals).await?;

    // search
    assert_eq!(storage.search_venues("hop").await?, vec![hop.clone()]);
    assert_eq!(storage.search_venues("100%").await?.len(), 1);
    assert_eq!(storage.search_venues("_").await?.len(), 0);
    assert_eq!(storage.search_venues("").await?.len(), 3);
    assert_eq!(storage.search_artists("PETALS").await?.len(), 1);

    // locations
    let areas = views::load_venue_areas(storage.as_ref(), now()).await?;
    let pairs: Vec<(&str, usize)> = areas
        .iter()
        .map(|area| (area.city.as_str(), area.venues.len()))
        .collect();
    assert_eq!(pairs, vec![("San Francisco", 2), ("New York", 1)]);
    assert_eq!(
        storage
            .get_venues_by_location("San Francisco", "CA")
            .await?
            .len(),
        2
    );

    // shows and integrity
    let mut upcoming = Show::new(hop.id, petals.id, now() + Duration::days(30));
    let mut past = Show::new(hop.id, petals.id, now() - Duration::days(30));
    storage.create_show(&mut upcoming).await?;
    storage.create_show(&mut past).await?;
    assert_eq!(storage.count_upcoming_shows_by_venue(hop.id, now()).await?, 1);
    assert_eq!(storage.count_upcoming_shows_by_venue(park.id, now()).await?, 0);

    let mut orphan = Show::new(hop.id, 99, now());
    assert!(matches!(
        storage.create_show(&mut orphan).await,
        Err(FyyurError::IntegrityViolation { .. })
    ));
    assert_eq!(storage.get_all_shows().await?.len(), 2);

    let listings = storage.get_show_listings_by_artist(petals.id).await?;
    assert_eq!(listings.len(), 2);
    assert!(listings.iter().all(|l| l.venue.name == "The Musical Hop"));

    // update
    let mut renamed = park.clone();
    renamed.name = "Park Square Live Music".to_string();
    storage.update_venue(&renamed).await?;
    assert_eq!(storage.get_venue_by_id(park.id).await?, Some(renamed));

    let mut ghost = venue("Ghost", "Nowhere");
    ghost.id = 404;
    assert!(storage.update_venue(&ghost).await.unwrap_err().is_not_found());

    // cascade
    let deleted = storage.delete_venue(hop.id).await?;
    assert_eq!(deleted.name, "The Musical Hop");
    assert!(storage.get_show_by_id(upcoming.id).await?.is_none());
    assert!(storage.get_show_by_id(past.id).await?.is_none());
    assert!(storage.delete_venue(hop.id).await.unwrap_err().is_not_found());
    assert_eq!(storage.get_all_venues().await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn in_memory_backend_behaves() -> Result<()> {
    exercise(Arc::new(InMemoryStorage::new())).await
}

#[tokio::test]
async fn sqlite_backend_behaves() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = SqliteStorage::open(dir.path().join("fyyur.db"))?;
    storage.run_migrations()?;
    exercise(Arc::new(storage)).await
}

async fn search_folds_ascii_case_only(storage: Arc<dyn Storage>) -> Result<()> {
    let mut ecole = venue("ÉCOLE Hall", "San Francisco");
    storage.create_venue(&mut ecole).await?;

    assert_eq!(storage.search_venues("ÉCOLE").await?.len(), 1);
    assert_eq!(storage.search_venues("École").await?.len(), 0);
    assert_eq!(storage.search_venues("écOLE").await?.len(), 0);
    assert_eq!(storage.search_venues("hall").await?.len(), 1);
    assert_eq!(storage.search_venues("HALL").await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn in_memory_search_folds_ascii_case_only() -> Result<()> {
    search_folds_ascii_case_only(Arc::new(InMemoryStorage::new())).await
}

#[tokio::test]
async fn sqlite_search_folds_ascii_case_only() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let storage = SqliteStorage::open(dir.path().join("fyyur.db"))?;
    storage.run_migrations()?;
    search_folds_ascii_case_only(Arc::new(storage)).await
}
