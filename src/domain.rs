use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp format used when a show is serialized for templates or clients.
pub const SHOW_TIME_FORMAT: &str = "%m/%d/%Y, %H:%M:%S";

/// Timestamp format used for the `start_time` column.
pub const STORAGE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A venue that hosts shows.
///
/// `id` is assigned by storage on create; a venue built from a form carries
/// `0` until it has been persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Venue {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub phone: Option<String>,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website: Option<String>,
    pub genres: String,
    pub seeking_talent: bool,
    pub seeking_description: Option<String>,
}

/// An artist that performs at shows. Same id convention as [`Venue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub genres: String,
    pub image_link: Option<String>,
    pub facebook_link: Option<String>,
    pub website: Option<String>,
    pub seeking_venue: bool,
    pub seeking_description: Option<String>,
}

/// A booking of one artist at one venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Show {
    pub id: i64,
    #[serde(with = "show_time")]
    pub start_time: NaiveDateTime,
    pub venue_id: i64,
    pub artist_id: i64,
}

/// A show loaded together with the venue and artist it references.
#[derive(Debug, Clone, PartialEq)]
pub struct ShowListing {
    pub show: Show,
    pub venue: Venue,
    pub artist: Artist,
}

impl Venue {
    pub fn genre_list(&self) -> Vec<&str> {
        split_genres(&self.genres)
    }
}

impl Artist {
    pub fn genre_list(&self) -> Vec<&str> {
        split_genres(&self.genres)
    }
}

impl Show {
    pub fn new(venue_id: i64, artist_id: i64, start_time: NaiveDateTime) -> Self {
        Self {
            id: 0,
            start_time,
            venue_id,
            artist_id,
        }
    }
}

/// Joins a tag list into the comma separated form stored in `genres`.
pub fn join_genres<S: AsRef<str>>(genres: &[S]) -> String {
    genres
        .iter()
        .map(|g| g.as_ref())
        .collect::<Vec<_>>()
        .join(",")
}

pub fn split_genres(genres: &str) -> Vec<&str> {
    genres
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .collect()
}

pub(crate) mod show_time {
    use super::SHOW_TIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &NaiveDateTime,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(SHOW_TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, SHOW_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
