use crate::domain::*;
use crate::error::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;

/// Storage trait for persisting venues, artists and the shows that link them.
///
/// Writes are atomic per call: a failed call leaves every table unchanged.
/// `update_*` and `delete_*` fail with `NotFound` for unknown ids, and
/// `create_show` fails with `IntegrityViolation` when the referenced venue or
/// artist does not exist.
#[async_trait]
pub trait Storage: Send + Sync {
    // Venue operations
    async fn create_venue(&self, venue: &mut Venue) -> Result<()>;
    async fn update_venue(&self, venue: &Venue) -> Result<()>;
    /// Removes the venue and every show it hosts, returning the removed row.
    async fn delete_venue(&self, venue_id: i64) -> Result<Venue>;
    async fn get_venue_by_id(&self, venue_id: i64) -> Result<Option<Venue>>;
    async fn get_all_venues(&self) -> Result<Vec<Venue>>;
    /// Substring match on the venue name, ignoring ASCII case.
    async fn search_venues(&self, term: &str) -> Result<Vec<Venue>>;
    async fn get_venues_by_location(&self, city: &str, state: &str) -> Result<Vec<Venue>>;

    // Artist operations
    async fn create_artist(&self, artist: &mut Artist) -> Result<()>;
    async fn update_artist(&self, artist: &Artist) -> Result<()>;
    /// Removes the artist and every show they perform at, returning the removed row.
    async fn delete_artist(&self, artist_id: i64) -> Result<Artist>;
    async fn get_artist_by_id(&self, artist_id: i64) -> Result<Option<Artist>>;
    async fn get_all_artists(&self) -> Result<Vec<Artist>>;
    async fn search_artists(&self, term: &str) -> Result<Vec<Artist>>;

    // Show operations
    async fn create_show(&self, show: &mut Show) -> Result<()>;
    async fn get_show_by_id(&self, show_id: i64) -> Result<Option<Show>>;
    async fn get_all_shows(&self) -> Result<Vec<Show>>;
    async fn get_show_listings(&self) -> Result<Vec<ShowListing>>;
    async fn get_show_listings_by_venue(&self, venue_id: i64) -> Result<Vec<ShowListing>>;
    async fn get_show_listings_by_artist(&self, artist_id: i64) -> Result<Vec<ShowListing>>;
    /// Number of shows at the venue starting strictly after `now`.
    async fn count_upcoming_shows_by_venue(
        &self,
        venue_id: i64,
        now: NaiveDateTime,
    ) -> Result<usize>;
}
