use super::traits::Storage;
use crate::domain::*;
use crate::error::{FyyurError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

#[derive(Default)]
struct Tables {
    venues: BTreeMap<i64, Venue>,
    artists: BTreeMap<i64, Artist>,
    shows: BTreeMap<i64, Show>,
    next_venue_id: i64,
    next_artist_id: i64,
    next_show_id: i64,
}

/// In-memory storage implementation for development/testing.
///
/// All tables sit behind one lock so cascades and reference checks see a
/// consistent snapshot.
#[derive(Default)]
pub struct InMemoryStorage {
    tables: Mutex<Tables>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| FyyurError::database("In-memory storage lock poisoned"))
    }

    fn listings<F>(&self, keep: F) -> Result<Vec<ShowListing>>
    where
        F: Fn(&Show) -> bool,
    {
        let tables = self.tables()?;
        let mut listings = Vec::new();
        for show in tables.shows.values().filter(|s| keep(s)) {
            // References are checked on insert and cascaded on delete.
            let (Some(venue), Some(artist)) = (
                tables.venues.get(&show.venue_id),
                tables.artists.get(&show.artist_id),
            ) else {
                continue;
            };
            listings.push(ShowListing {
                show: show.clone(),
                venue: venue.clone(),
                artist: artist.clone(),
            });
        }
        listings.sort_by(|a, b| {
            a.show
                .start_time
                .cmp(&b.show.start_time)
                .then(a.show.id.cmp(&b.show.id))
        });
        Ok(listings)
    }
}

/// ASCII-only case folding, matching SQLite's `LIKE`.
fn name_matches(name: &str, term: &str) -> bool {
    name.to_ascii_lowercase().contains(&term.to_ascii_lowercase())
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_venue(&self, venue: &mut Venue) -> Result<()> {
        let mut tables = self.tables()?;
        tables.next_venue_id += 1;
        let id = tables.next_venue_id;
        venue.id = id;
        tables.venues.insert(id, venue.clone());

        debug!("Created venue: {} with id {}", venue.name, id);
        Ok(())
    }

    async fn update_venue(&self, venue: &Venue) -> Result<()> {
        let mut tables = self.tables()?;
        let slot = tables
            .venues
            .get_mut(&venue.id)
            .ok_or_else(|| FyyurError::not_found("Venue", venue.id))?;
        *slot = venue.clone();

        debug!("Updated venue: {} with id {}", venue.name, venue.id);
        Ok(())
    }

    async fn delete_venue(&self, venue_id: i64) -> Result<Venue> {
        let mut tables = self.tables()?;
        let venue = tables
            .venues
            .remove(&venue_id)
            .ok_or_else(|| FyyurError::not_found("Venue", venue_id))?;
        tables.shows.retain(|_, s| s.venue_id != venue_id);

        debug!("Deleted venue: {} with id {}", venue.name, venue_id);
        Ok(venue)
    }

    async fn get_venue_by_id(&self, venue_id: i64) -> Result<Option<Venue>> {
        Ok(self.tables()?.venues.get(&venue_id).cloned())
    }

    async fn get_all_venues(&self) -> Result<Vec<Venue>> {
        Ok(self.tables()?.venues.values().cloned().collect())
    }

    async fn search_venues(&self, term: &str) -> Result<Vec<Venue>> {
        let tables = self.tables()?;
        Ok(tables
            .venues
            .values()
            .filter(|v| name_matches(&v.name, term))
            .cloned()
            .collect())
    }

    async fn get_venues_by_location(&self, city: &str, state: &str) -> Result<Vec<Venue>> {
        let tables = self.tables()?;
        Ok(tables
            .venues
            .values()
            .filter(|v| v.city == city && v.state == state)
            .cloned()
            .collect())
    }

    async fn create_artist(&self, artist: &mut Artist) -> Result<()> {
        let mut tables = self.tables()?;
        tables.next_artist_id += 1;
        let id = tables.next_artist_id;
        artist.id = id;
        tables.artists.insert(id, artist.clone());

        debug!("Created artist: {} with id {}", artist.name, id);
        Ok(())
    }

    async fn update_artist(&self, artist: &Artist) -> Result<()> {
        let mut tables = self.tables()?;
        let slot = tables
            .artists
            .get_mut(&artist.id)
            .ok_or_else(|| FyyurError::not_found("Artist", artist.id))?;
        *slot = artist.clone();

        debug!("Updated artist: {} with id {}", artist.name, artist.id);
        Ok(())
    }

    async fn delete_artist(&self, artist_id: i64) -> Result<Artist> {
        let mut tables = self.tables()?;
        let artist = tables
            .artists
            .remove(&artist_id)
            .ok_or_else(|| FyyurError::not_found("Artist", artist_id))?;
        tables.shows.retain(|_, s| s.artist_id != artist_id);

        debug!("Deleted artist: {} with id {}", artist.name, artist_id);
        Ok(artist)
    }

    async fn get_artist_by_id(&self, artist_id: i64) -> Result<Option<Artist>> {
        Ok(self.tables()?.artists.get(&artist_id).cloned())
    }

    async fn get_all_artists(&self) -> Result<Vec<Artist>> {
        Ok(self.tables()?.artists.values().cloned().collect())
    }

    async fn search_artists(&self, term: &str) -> Result<Vec<Artist>> {
        let tables = self.tables()?;
        Ok(tables
            .artists
            .values()
            .filter(|a| name_matches(&a.name, term))
            .cloned()
            .collect())
    }

    async fn create_show(&self, show: &mut Show) -> Result<()> {
        let mut tables = self.tables()?;
        if !tables.venues.contains_key(&show.venue_id) {
            return Err(FyyurError::IntegrityViolation {
                message: format!("venue {} does not exist", show.venue_id),
            });
        }
        if !tables.artists.contains_key(&show.artist_id) {
            return Err(FyyurError::IntegrityViolation {
                message: format!("artist {} does not exist", show.artist_id),
            });
        }
        tables.next_show_id += 1;
        let id = tables.next_show_id;
        show.id = id;
        tables.shows.insert(id, show.clone());

        debug!("Created show {} (venue {}, artist {})", id, show.venue_id, show.artist_id);
        Ok(())
    }

    async fn get_show_by_id(&self, show_id: i64) -> Result<Option<Show>> {
        Ok(self.tables()?.shows.get(&show_id).cloned())
    }

    async fn get_all_shows(&self) -> Result<Vec<Show>> {
        let mut shows: Vec<Show> = self.tables()?.shows.values().cloned().collect();
        shows.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.id.cmp(&b.id)));
        Ok(shows)
    }

    async fn get_show_listings(&self) -> Result<Vec<ShowListing>> {
        self.listings(|_| true)
    }

    async fn get_show_listings_by_venue(&self, venue_id: i64) -> Result<Vec<ShowListing>> {
        self.listings(|s| s.venue_id == venue_id)
    }

    async fn get_show_listings_by_artist(&self, artist_id: i64) -> Result<Vec<ShowListing>> {
        self.listings(|s| s.artist_id == artist_id)
    }

    async fn count_upcoming_shows_by_venue(
        &self,
        venue_id: i64,
        now: NaiveDateTime,
    ) -> Result<usize> {
        let tables = self.tables()?;
        Ok(tables
            .shows
            .values()
            .filter(|s| s.venue_id == venue_id && s.start_time > now)
            .count())
    }
}
