use super::traits::Storage;
use crate::domain::*;
use crate::error::{FyyurError, Result};
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

const VENUE_COLUMNS: &str = "id, name, address, city, state, phone, image_link, facebook_link, \
                             website, genres, seeking_talent, seeking_description";
const ARTIST_COLUMNS: &str = "id, name, city, state, address, phone, genres, image_link, \
                              facebook_link, website, seeking_venue, seeking_description";
const SHOW_COLUMNS: &str = "id, start_time, venue_id, artist_id";

const VENUE_WIDTH: usize = 12;
const SHOW_WIDTH: usize = 4;

const MIGRATIONS: &[(&str, &str)] = &[
    (
        "001_create_venues_artists_shows",
        include_str!("../../migrations/001_create_venues_artists_shows.sql"),
    ),
    ("002_indexes", include_str!("../../migrations/002_indexes.sql")),
];

/// Relational storage on SQLite with enforced foreign keys and cascading deletes.
///
/// Queries run on the blocking thread pool; the connection is shared between
/// them behind one lock.
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`. `":memory:"` opens a private
    /// in-memory database. Migrations are not applied; see [`Self::run_migrations`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let conn = if path == Path::new(":memory:") {
            Connection::open_in_memory()
        } else {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            Connection::open(path)
        }
        .map_err(db_err("Failed to open database"))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(db_err("Failed to enable foreign keys"))?;

        info!("Opened SQLite database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory database with the schema already applied.
    pub fn open_in_memory() -> Result<Self> {
        let storage = Self::open(":memory:")?;
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Applies the embedded schema files. Every statement is idempotent.
    pub fn run_migrations(&self) -> Result<()> {
        info!("Running database migrations...");
        let conn = self.conn.lock().map_err(|_| lock_poisoned())?;
        for (name, sql) in MIGRATIONS {
            conn.execute_batch(sql).map_err(|e| FyyurError::Database {
                message: format!("Failed to run migration {name}: {e}"),
            })?;
            debug!("Applied migration {}", name);
        }
        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock().map_err(|_| lock_poisoned())?;
            f(&mut guard)
        })
        .await
        .map_err(|e| FyyurError::database(format!("Database task failed: {e}")))?
    }

    async fn listings_where(
        &self,
        filter: &'static str,
        id: Option<i64>,
    ) -> Result<Vec<ShowListing>> {
        let sql = format!(
            "SELECT {}, {}, {} FROM shows s \
             JOIN venues v ON v.id = s.venue_id \
             JOIN artists a ON a.id = s.artist_id \
             {filter} ORDER BY s.start_time, s.id",
            prefixed(SHOW_COLUMNS, "s"),
            prefixed(VENUE_COLUMNS, "v"),
            prefixed(ARTIST_COLUMNS, "a"),
        );
        self.with_connection(move |conn| {
            let mut stmt = conn
                .prepare(&sql)
                .map_err(db_err("Failed to prepare show listing query"))?;
            let rows = match id {
                Some(id) => stmt.query_map(params![id], listing_from_row),
                None => stmt.query_map(params![], listing_from_row),
            }
            .map_err(db_err("Failed to query show listings"))?;
            let listings = rows
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err("Failed to read show listing"));
            listings
        })
        .await
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_venue(&self, venue: &mut Venue) -> Result<()> {
        let row = venue.clone();
        let id = self
            .with_connection(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(db_err("Failed to begin transaction"))?;
                tx.execute(
                    "INSERT INTO venues (name, address, city, state, phone, image_link,
                                         facebook_link, website, genres, seeking_talent,
                                         seeking_description)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        row.name,
                        row.address,
                        row.city,
                        row.state,
                        row.phone,
                        row.image_link,
                        row.facebook_link,
                        row.website,
                        row.genres,
                        row.seeking_talent,
                        row.seeking_description,
                    ],
                )
                .map_err(db_err("Failed to insert venue"))?;
                let id = tx.last_insert_rowid();
                tx.commit().map_err(db_err("Failed to commit venue"))?;
                Ok(id)
            })
            .await?;

        venue.id = id;
        info!("Created venue: {} with id {}", venue.name, id);
        Ok(())
    }

    async fn update_venue(&self, venue: &Venue) -> Result<()> {
        let row = venue.clone();
        self.with_connection(move |conn| {
            let tx = conn
                .transaction()
                .map_err(db_err("Failed to begin transaction"))?;
            let changed = tx
                .execute(
                    "UPDATE venues SET name = ?1, address = ?2, city = ?3, state = ?4,
                            phone = ?5, image_link = ?6, facebook_link = ?7, website = ?8,
                            genres = ?9, seeking_talent = ?10, seeking_description = ?11
                     WHERE id = ?12",
                    params![
                        row.name,
                        row.address,
                        row.city,
                        row.state,
                        row.phone,
                        row.image_link,
                        row.facebook_link,
                        row.website,
                        row.genres,
                        row.seeking_talent,
                        row.seeking_description,
                        row.id,
                    ],
                )
                .map_err(db_err("Failed to update venue"))?;
            if changed == 0 {
                return Err(FyyurError::not_found("Venue", row.id));
            }
            tx.commit().map_err(db_err("Failed to commit venue update"))
        })
        .await?;

        info!("Updated venue: {} with id {}", venue.name, venue.id);
        Ok(())
    }

    async fn delete_venue(&self, venue_id: i64) -> Result<Venue> {
        let (venue, removed_shows) = self
            .with_connection(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(db_err("Failed to begin transaction"))?;
                let venue = tx
                    .query_row(
                        &format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?1"),
                        params![venue_id],
                        |row| venue_at(row, 0),
                    )
                    .optional()
                    .map_err(db_err("Failed to load venue"))?
                    .ok_or_else(|| FyyurError::not_found("Venue", venue_id))?;
                let removed_shows = tx
                    .query_row(
                        "SELECT COUNT(*) FROM shows WHERE venue_id = ?1",
                        params![venue_id],
                        |row| row.get::<_, i64>(0),
                    )
                    .map_err(db_err("Failed to count venue shows"))?;
                tx.execute("DELETE FROM venues WHERE id = ?1", params![venue_id])
                    .map_err(db_err("Failed to delete venue"))?;
                tx.commit().map_err(db_err("Failed to commit venue delete"))?;
                Ok((venue, removed_shows))
            })
            .await?;

        info!(
            "Deleted venue: {} with id {} ({} shows removed)",
            venue.name, venue_id, removed_shows
        );
        Ok(venue)
    }

    async fn get_venue_by_id(&self, venue_id: i64) -> Result<Option<Venue>> {
        self.with_connection(move |conn| {
            conn.query_row(
                &format!("SELECT {VENUE_COLUMNS} FROM venues WHERE id = ?1"),
                params![venue_id],
                |row| venue_at(row, 0),
            )
            .optional()
            .map_err(db_err("Failed to get venue"))
        })
        .await
    }

    async fn get_all_venues(&self) -> Result<Vec<Venue>> {
        self.with_connection(|conn| {
            query_venues(
                conn,
                &format!("SELECT {VENUE_COLUMNS} FROM venues ORDER BY id"),
                params![],
            )
        })
        .await
    }

    async fn search_venues(&self, term: &str) -> Result<Vec<Venue>> {
        debug!("Searching venues for '{}'", term);
        let pattern = like_pattern(term);
        self.with_connection(move |conn| {
            query_venues(
                conn,
                &format!(
                    "SELECT {VENUE_COLUMNS} FROM venues \
                     WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id"
                ),
                params![pattern],
            )
        })
        .await
    }

    async fn get_venues_by_location(&self, city: &str, state: &str) -> Result<Vec<Venue>> {
        let (city, state) = (city.to_string(), state.to_string());
        self.with_connection(move |conn| {
            query_venues(
                conn,
                &format!(
                    "SELECT {VENUE_COLUMNS} FROM venues \
                     WHERE city = ?1 AND state = ?2 ORDER BY id"
                ),
                params![city, state],
            )
        })
        .await
    }

    async fn create_artist(&self, artist: &mut Artist) -> Result<()> {
        let row = artist.clone();
        let id = self
            .with_connection(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(db_err("Failed to begin transaction"))?;
                tx.execute(
                    "INSERT INTO artists (name, city, state, address, phone, genres, image_link,
                                          facebook_link, website, seeking_venue,
                                          seeking_description)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                    params![
                        row.name,
                        row.city,
                        row.state,
                        row.address,
                        row.phone,
                        row.genres,
                        row.image_link,
                        row.facebook_link,
                        row.website,
                        row.seeking_venue,
                        row.seeking_description,
                    ],
                )
                .map_err(db_err("Failed to insert artist"))?;
                let id = tx.last_insert_rowid();
                tx.commit().map_err(db_err("Failed to commit artist"))?;
                Ok(id)
            })
            .await?;

        artist.id = id;
        info!("Created artist: {} with id {}", artist.name, id);
        Ok(())
    }

    async fn update_artist(&self, artist: &Artist) -> Result<()> {
        let row = artist.clone();
        self.with_connection(move |conn| {
            let tx = conn
                .transaction()
                .map_err(db_err("Failed to begin transaction"))?;
            let changed = tx
                .execute(
                    "UPDATE artists SET name = ?1, city = ?2, state = ?3, address = ?4,
                            phone = ?5, genres = ?6, image_link = ?7, facebook_link = ?8,
                            website = ?9, seeking_venue = ?10, seeking_description = ?11
                     WHERE id = ?12",
                    params![
                        row.name,
                        row.city,
                        row.state,
                        row.address,
                        row.phone,
                        row.genres,
                        row.image_link,
                        row.facebook_link,
                        row.website,
                        row.seeking_venue,
                        row.seeking_description,
                        row.id,
                    ],
                )
                .map_err(db_err("Failed to update artist"))?;
            if changed == 0 {
                return Err(FyyurError::not_found("Artist", row.id));
            }
            tx.commit().map_err(db_err("Failed to commit artist update"))
        })
        .await?;

        info!("Updated artist: {} with id {}", artist.name, artist.id);
        Ok(())
    }

    async fn delete_artist(&self, artist_id: i64) -> Result<Artist> {
        let artist = self
            .with_connection(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(db_err("Failed to begin transaction"))?;
                let artist = tx
                    .query_row(
                        &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = ?1"),
                        params![artist_id],
                        |row| artist_at(row, 0),
                    )
                    .optional()
                    .map_err(db_err("Failed to load artist"))?
                    .ok_or_else(|| FyyurError::not_found("Artist", artist_id))?;
                tx.execute("DELETE FROM artists WHERE id = ?1", params![artist_id])
                    .map_err(db_err("Failed to delete artist"))?;
                tx.commit().map_err(db_err("Failed to commit artist delete"))?;
                Ok(artist)
            })
            .await?;

        info!("Deleted artist: {} with id {}", artist.name, artist_id);
        Ok(artist)
    }

    async fn get_artist_by_id(&self, artist_id: i64) -> Result<Option<Artist>> {
        self.with_connection(move |conn| {
            conn.query_row(
                &format!("SELECT {ARTIST_COLUMNS} FROM artists WHERE id = ?1"),
                params![artist_id],
                |row| artist_at(row, 0),
            )
            .optional()
            .map_err(db_err("Failed to get artist"))
        })
        .await
    }

    async fn get_all_artists(&self) -> Result<Vec<Artist>> {
        self.with_connection(|conn| {
            query_artists(
                conn,
                &format!("SELECT {ARTIST_COLUMNS} FROM artists ORDER BY id"),
                params![],
            )
        })
        .await
    }

    async fn search_artists(&self, term: &str) -> Result<Vec<Artist>> {
        debug!("Searching artists for '{}'", term);
        let pattern = like_pattern(term);
        self.with_connection(move |conn| {
            query_artists(
                conn,
                &format!(
                    "SELECT {ARTIST_COLUMNS} FROM artists \
                     WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id"
                ),
                params![pattern],
            )
        })
        .await
    }

    async fn create_show(&self, show: &mut Show) -> Result<()> {
        let row = show.clone();
        let id = self
            .with_connection(move |conn| {
                let tx = conn
                    .transaction()
                    .map_err(db_err("Failed to begin transaction"))?;

                let (venue_exists, artist_exists): (bool, bool) = tx
                    .query_row(
                        "SELECT EXISTS(SELECT 1 FROM venues WHERE id = ?1),
                                EXISTS(SELECT 1 FROM artists WHERE id = ?2)",
                        params![row.venue_id, row.artist_id],
                        |r| Ok((r.get(0)?, r.get(1)?)),
                    )
                    .map_err(db_err("Failed to check show references"))?;
                if !venue_exists {
                    return Err(FyyurError::IntegrityViolation {
                        message: format!("venue {} does not exist", row.venue_id),
                    });
                }
                if !artist_exists {
                    return Err(FyyurError::IntegrityViolation {
                        message: format!("artist {} does not exist", row.artist_id),
                    });
                }

                tx.execute(
                    "INSERT INTO shows (start_time, venue_id, artist_id) VALUES (?1, ?2, ?3)",
                    params![
                        row.start_time.format(STORAGE_TIME_FORMAT).to_string(),
                        row.venue_id,
                        row.artist_id,
                    ],
                )
                .map_err(db_err("Failed to insert show"))?;
                let id = tx.last_insert_rowid();
                tx.commit().map_err(db_err("Failed to commit show"))?;
                Ok(id)
            })
            .await?;

        show.id = id;
        info!(
            "Created show {} (venue {}, artist {}) at {}",
            id, show.venue_id, show.artist_id, show.start_time
        );
        Ok(())
    }

    async fn get_show_by_id(&self, show_id: i64) -> Result<Option<Show>> {
        self.with_connection(move |conn| {
            conn.query_row(
                &format!("SELECT {SHOW_COLUMNS} FROM shows WHERE id = ?1"),
                params![show_id],
                |row| show_at(row, 0),
            )
            .optional()
            .map_err(db_err("Failed to get show"))
        })
        .await
    }

    async fn get_all_shows(&self) -> Result<Vec<Show>> {
        self.with_connection(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {SHOW_COLUMNS} FROM shows ORDER BY start_time, id"
                ))
                .map_err(db_err("Failed to prepare show query"))?;
            let rows = stmt
                .query_map(params![], |row| show_at(row, 0))
                .map_err(db_err("Failed to query shows"))?;
            let shows = rows
                .collect::<rusqlite::Result<Vec<_>>>()
                .map_err(db_err("Failed to read show"));
            shows
        })
        .await
    }

    async fn get_show_listings(&self) -> Result<Vec<ShowListing>> {
        self.listings_where("", None).await
    }

    async fn get_show_listings_by_venue(&self, venue_id: i64) -> Result<Vec<ShowListing>> {
        self.listings_where("WHERE s.venue_id = ?1", Some(venue_id))
            .await
    }

    async fn get_show_listings_by_artist(&self, artist_id: i64) -> Result<Vec<ShowListing>> {
        self.listings_where("WHERE s.artist_id = ?1", Some(artist_id))
            .await
    }

    async fn count_upcoming_shows_by_venue(
        &self,
        venue_id: i64,
        now: NaiveDateTime,
    ) -> Result<usize> {
        let now = now.format(STORAGE_TIME_FORMAT).to_string();
        let count: i64 = self
            .with_connection(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM shows WHERE venue_id = ?1 AND start_time > ?2",
                    params![venue_id, now],
                    |row| row.get(0),
                )
                .map_err(db_err("Failed to count upcoming shows"))
            })
            .await?;
        Ok(count as usize)
    }
}

fn lock_poisoned() -> FyyurError {
    FyyurError::database("Database connection lock poisoned")
}

fn db_err(context: &'static str) -> impl Fn(rusqlite::Error) -> FyyurError {
    move |e| FyyurError::Database {
        message: format!("{context}: {e}"),
    }
}

fn query_venues(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Venue>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(db_err("Failed to prepare venue query"))?;
    let rows = stmt
        .query_map(params, |row| venue_at(row, 0))
        .map_err(db_err("Failed to query venues"))?;
    let venues = rows
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err("Failed to read venue"));
    venues
}

fn query_artists(
    conn: &Connection,
    sql: &str,
    params: &[&dyn rusqlite::ToSql],
) -> Result<Vec<Artist>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(db_err("Failed to prepare artist query"))?;
    let rows = stmt
        .query_map(params, |row| artist_at(row, 0))
        .map_err(db_err("Failed to query artists"))?;
    let artists = rows
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(db_err("Failed to read artist"));
    artists
}

/// `%term%` with LIKE wildcards in the term escaped by `\`.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn prefixed(columns: &str, alias: &str) -> String {
    columns
        .split(',')
        .map(|c| format!("{alias}.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

fn venue_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Venue> {
    Ok(Venue {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        address: row.get(base + 2)?,
        city: row.get(base + 3)?,
        state: row.get(base + 4)?,
        phone: row.get(base + 5)?,
        image_link: row.get(base + 6)?,
        facebook_link: row.get(base + 7)?,
        website: row.get(base + 8)?,
        genres: row.get(base + 9)?,
        seeking_talent: row.get(base + 10)?,
        seeking_description: row.get(base + 11)?,
    })
}

fn artist_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Artist> {
    Ok(Artist {
        id: row.get(base)?,
        name: row.get(base + 1)?,
        city: row.get(base + 2)?,
        state: row.get(base + 3)?,
        address: row.get(base + 4)?,
        phone: row.get(base + 5)?,
        genres: row.get(base + 6)?,
        image_link: row.get(base + 7)?,
        facebook_link: row.get(base + 8)?,
        website: row.get(base + 9)?,
        seeking_venue: row.get(base + 10)?,
        seeking_description: row.get(base + 11)?,
    })
}

fn show_at(row: &Row<'_>, base: usize) -> rusqlite::Result<Show> {
    let raw: String = row.get(base + 1)?;
    let start_time = NaiveDateTime::parse_from_str(&raw, STORAGE_TIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(base + 1, Type::Text, Box::new(e))
    })?;
    Ok(Show {
        id: row.get(base)?,
        start_time,
        venue_id: row.get(base + 2)?,
        artist_id: row.get(base + 3)?,
    })
}

fn listing_from_row(row: &Row<'_>) -> rusqlite::Result<ShowListing> {
    Ok(ShowListing {
        show: show_at(row, 0)?,
        venue: venue_at(row, SHOW_WIDTH)?,
        artist: artist_at(row, SHOW_WIDTH + VENUE_WIDTH)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("fill"), "%fill%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
    }

    #[test]
    fn prefixed_qualifies_every_column() {
        assert_eq!(
            prefixed(SHOW_COLUMNS, "s"),
            "s.id, s.start_time, s.venue_id, s.artist_id"
        );
        assert_eq!(prefixed(VENUE_COLUMNS, "v").split(", ").count(), VENUE_WIDTH);
    }

    #[test]
    fn migrations_are_idempotent() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.run_migrations().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_reads_share_the_connection() -> anyhow::Result<()> {
        let storage = Arc::new(SqliteStorage::open_in_memory()?);
        let mut venue = Venue {
            id: 0,
            name: "The Dueling Pianos Bar".to_string(),
            address: "335 Delancey Street".to_string(),
            city: "New York".to_string(),
            state: "NY".to_string(),
            phone: None,
            image_link: None,
            facebook_link: None,
            website: None,
            genres: "Classical,R&B".to_string(),
            seeking_talent: false,
            seeking_description: None,
        };
        storage.create_venue(&mut venue).await?;

        let readers: Vec<_> = (0..8)
            .map(|_| {
                let storage = Arc::clone(&storage);
                tokio::spawn(async move { storage.get_venue_by_id(1).await })
            })
            .collect();
        for reader in readers {
            let found = reader.await??;
            assert_eq!(found.as_ref().map(|v| v.name.as_str()), Some("The Dueling Pianos Bar"));
        }
        Ok(())
    }

    #[tokio::test]
    async fn on_disk_database_persists_between_opens() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested").join("fyyur.db");

        {
            let storage = SqliteStorage::open(&path)?;
            storage.run_migrations()?;
            let mut venue = Venue {
                id: 0,
                name: "Park Square Live".to_string(),
                address: "34 Whiskey Moore Ave".to_string(),
                city: "San Francisco".to_string(),
                state: "CA".to_string(),
                phone: None,
                image_link: None,
                facebook_link: None,
                website: None,
                genres: "Rock,Folk".to_string(),
                seeking_talent: false,
                seeking_description: None,
            };
            storage.create_venue(&mut venue).await?;
            assert!(venue.id > 0);
        }

        let storage = SqliteStorage::open(&path)?;
        storage.run_migrations()?;
        let venues = storage.get_all_venues().await?;
        assert_eq!(venues.len(), 1);
        assert_eq!(venues[0].name, "Park Square Live");
        Ok(())
    }
}
