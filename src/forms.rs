//! Form decoding and validation for venue, artist and show submissions.
//!
//! Forms keep the raw submitted strings so a rejected submission can be
//! re-rendered as typed; `validate` turns them into domain records or a
//! per-field error map.

use crate::domain::*;
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

pub const STATES: &[&str] = &[
    "AL", "AK", "AZ", "AR", "CA", "CO", "CT", "DE", "DC", "FL", "GA", "HI", "ID", "IL", "IN", "IA",
    "KS", "KY", "LA", "ME", "MT", "NE", "NV", "NH", "NJ", "NM", "NY", "NC", "ND", "OH", "OK", "OR",
    "MD", "MA", "MI", "MN", "MS", "MO", "PA", "RI", "SC", "SD", "TN", "TX", "UT", "VT", "VA", "WA",
    "WV", "WI", "WY",
];

pub const GENRES: &[&str] = &[
    "Alternative",
    "Blues",
    "Classical",
    "Country",
    "Electronic",
    "Folk",
    "Funk",
    "Hip-Hop",
    "Heavy Metal",
    "Instrumental",
    "Jazz",
    "Musical Theatre",
    "Pop",
    "Punk",
    "R&B",
    "Reggae",
    "Rock",
    "Rock n Roll",
    "Soul",
    "Swing",
    "Other",
];

/// Accepted `start_time` layouts, tried in order.
const START_TIME_FORMATS: &[&str] = &[
    STORAGE_TIME_FORMAT,
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    SHOW_TIME_FORMAT,
];

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{3}-\d{3}-\d{4}$").expect("valid phone regex"));

/// A decoded `application/x-www-form-urlencoded` body, keeping repeated keys.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self { pairs }
    }

    /// First value for `key`, trimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
    }

    /// First value for `key`, trimmed, or `""`.
    pub fn value(&self, key: &str) -> String {
        self.get(key).unwrap_or_default().to_string()
    }

    /// Every non-empty value for `key`, trimmed.
    pub fn get_all(&self, key: &str) -> Vec<String> {
        self.pairs
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn checkbox(&self, key: &str) -> bool {
        matches!(
            self.get(key).map(str::to_ascii_lowercase).as_deref(),
            Some("y" | "yes" | "on" | "true" | "1")
        )
    }
}

impl From<Vec<(String, String)>> for FormData {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self::new(pairs)
    }
}

/// Field name to the messages explaining why it was rejected.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn for_field(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    /// One line per field, as shown in the notice banner.
    pub fn messages(&self) -> Vec<String> {
        self.fields
            .iter()
            .map(|(field, messages)| {
                format!(
                    "The field {} has following error messages: {}",
                    field,
                    messages.join(",")
                )
            })
            .collect()
    }

    fn into_result<T>(self, value: impl FnOnce() -> T) -> Result<T, FormErrors> {
        if self.is_empty() {
            Ok(value())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for FormErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(", ")))
            .collect();
        write!(f, "{}", parts.join("; "))
    }
}

fn require(errors: &mut FormErrors, field: &str, value: &str) {
    if value.is_empty() {
        errors.add(field, "This field is required.");
    }
}

fn check_state(errors: &mut FormErrors, value: &str) {
    if value.is_empty() {
        errors.add("state", "This field is required.");
    } else if !STATES.contains(&value) {
        errors.add("state", "Not a valid choice.");
    }
}

fn check_genres(errors: &mut FormErrors, genres: &[String]) {
    if genres.is_empty() {
        errors.add("genres", "This field is required.");
        return;
    }
    for genre in genres {
        if !GENRES.contains(&genre.as_str()) {
            errors.add("genres", format!("'{}' is not a valid choice for this field.", genre));
        }
    }
}

fn check_phone(errors: &mut FormErrors, value: &str) {
    if !value.is_empty() && !PHONE_RE.is_match(value) {
        errors.add("phone", "Invalid phone number, expected XXX-XXX-XXXX.");
    }
}

fn check_url(errors: &mut FormErrors, field: &str, value: &str) {
    if value.is_empty() {
        return;
    }
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {}
        _ => errors.add(field, "Invalid URL."),
    }
}

fn optional(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn has_choice<S: AsRef<str>>(chosen: &[String], candidate: S) -> bool {
    chosen.iter().any(|g| g == candidate.as_ref())
}

pub fn parse_start_time(value: &str) -> Option<NaiveDateTime> {
    START_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VenueForm {
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: String,
    pub image_link: String,
    pub facebook_link: String,
    pub website: String,
    pub genres: Vec<String>,
    pub seeking_talent: bool,
    pub seeking_description: String,
}

impl VenueForm {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            name: form.value("name"),
            city: form.value("city"),
            state: form.value("state"),
            address: form.value("address"),
            phone: form.value("phone"),
            image_link: form.value("image_link"),
            facebook_link: form.value("facebook_link"),
            website: form.value("website"),
            genres: form.get_all("genres"),
            seeking_talent: form.checkbox("seeking_talent"),
            seeking_description: form.value("seeking_description"),
        }
    }

    /// Pre-fills the edit form from a stored venue.
    pub fn from_venue(venue: &Venue) -> Self {
        Self {
            name: venue.name.clone(),
            city: venue.city.clone(),
            state: venue.state.clone(),
            address: venue.address.clone(),
            phone: venue.phone.clone().unwrap_or_default(),
            image_link: venue.image_link.clone().unwrap_or_default(),
            facebook_link: venue.facebook_link.clone().unwrap_or_default(),
            website: venue.website.clone().unwrap_or_default(),
            genres: venue.genre_list().into_iter().map(str::to_string).collect(),
            seeking_talent: venue.seeking_talent,
            seeking_description: venue.seeking_description.clone().unwrap_or_default(),
        }
    }

    pub fn has_genre<S: AsRef<str>>(&self, genre: S) -> bool {
        has_choice(&self.genres, genre)
    }

    pub fn is_state<S: AsRef<str>>(&self, state: S) -> bool {
        self.state == state.as_ref()
    }

    /// A venue with id `0`; the caller sets the id before an update.
    pub fn validate(&self) -> Result<Venue, FormErrors> {
        let mut errors = FormErrors::default();
        require(&mut errors, "name", &self.name);
        require(&mut errors, "city", &self.city);
        check_state(&mut errors, &self.state);
        require(&mut errors, "address", &self.address);
        check_phone(&mut errors, &self.phone);
        check_genres(&mut errors, &self.genres);
        check_url(&mut errors, "image_link", &self.image_link);
        check_url(&mut errors, "facebook_link", &self.facebook_link);
        check_url(&mut errors, "website", &self.website);

        errors.into_result(|| Venue {
            id: 0,
            name: self.name.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            phone: optional(&self.phone),
            image_link: optional(&self.image_link),
            facebook_link: optional(&self.facebook_link),
            website: optional(&self.website),
            genres: join_genres(&self.genres),
            seeking_talent: self.seeking_talent,
            seeking_description: optional(&self.seeking_description),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtistForm {
    pub name: String,
    pub city: String,
    pub state: String,
    pub address: String,
    pub phone: String,
    pub image_link: String,
    pub facebook_link: String,
    pub website: String,
    pub genres: Vec<String>,
    pub seeking_venue: bool,
    pub seeking_description: String,
}

impl ArtistForm {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            name: form.value("name"),
            city: form.value("city"),
            state: form.value("state"),
            address: form.value("address"),
            phone: form.value("phone"),
            image_link: form.value("image_link"),
            facebook_link: form.value("facebook_link"),
            website: form.value("website"),
            genres: form.get_all("genres"),
            seeking_venue: form.checkbox("seeking_venue"),
            seeking_description: form.value("seeking_description"),
        }
    }

    pub fn from_artist(artist: &Artist) -> Self {
        Self {
            name: artist.name.clone(),
            city: artist.city.clone(),
            state: artist.state.clone(),
            address: artist.address.clone().unwrap_or_default(),
            phone: artist.phone.clone().unwrap_or_default(),
            image_link: artist.image_link.clone().unwrap_or_default(),
            facebook_link: artist.facebook_link.clone().unwrap_or_default(),
            website: artist.website.clone().unwrap_or_default(),
            genres: artist.genre_list().into_iter().map(str::to_string).collect(),
            seeking_venue: artist.seeking_venue,
            seeking_description: artist.seeking_description.clone().unwrap_or_default(),
        }
    }

    pub fn has_genre<S: AsRef<str>>(&self, genre: S) -> bool {
        has_choice(&self.genres, genre)
    }

    pub fn is_state<S: AsRef<str>>(&self, state: S) -> bool {
        self.state == state.as_ref()
    }

    pub fn validate(&self) -> Result<Artist, FormErrors> {
        let mut errors = FormErrors::default();
        require(&mut errors, "name", &self.name);
        require(&mut errors, "city", &self.city);
        check_state(&mut errors, &self.state);
        check_phone(&mut errors, &self.phone);
        check_genres(&mut errors, &self.genres);
        check_url(&mut errors, "image_link", &self.image_link);
        check_url(&mut errors, "facebook_link", &self.facebook_link);
        check_url(&mut errors, "website", &self.website);

        errors.into_result(|| Artist {
            id: 0,
            name: self.name.clone(),
            city: self.city.clone(),
            state: self.state.clone(),
            address: optional(&self.address),
            phone: optional(&self.phone),
            genres: join_genres(&self.genres),
            image_link: optional(&self.image_link),
            facebook_link: optional(&self.facebook_link),
            website: optional(&self.website),
            seeking_venue: self.seeking_venue,
            seeking_description: optional(&self.seeking_description),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowForm {
    pub artist_id: String,
    pub venue_id: String,
    pub start_time: String,
}

impl ShowForm {
    pub fn from_form(form: &FormData) -> Self {
        Self {
            artist_id: form.value("artist_id"),
            venue_id: form.value("venue_id"),
            start_time: form.value("start_time"),
        }
    }

    /// An empty form whose start time defaults to `now`.
    pub fn starting_at(now: NaiveDateTime) -> Self {
        Self {
            start_time: now.format(STORAGE_TIME_FORMAT).to_string(),
            ..Self::default()
        }
    }

    pub fn is_venue<T: Borrow<i64>>(&self, id: T) -> bool {
        self.venue_id == id.borrow().to_string()
    }

    pub fn is_artist<T: Borrow<i64>>(&self, id: T) -> bool {
        self.artist_id == id.borrow().to_string()
    }

    /// Only the field formats are checked here; whether the referenced
    /// venue and artist exist is decided by storage.
    pub fn validate(&self) -> Result<Show, FormErrors> {
        let mut errors = FormErrors::default();
        let artist_id = parse_id(&mut errors, "artist_id", &self.artist_id);
        let venue_id = parse_id(&mut errors, "venue_id", &self.venue_id);
        let start_time = if self.start_time.is_empty() {
            errors.add("start_time", "This field is required.");
            None
        } else {
            let parsed = parse_start_time(&self.start_time);
            if parsed.is_none() {
                errors.add("start_time", "Not a valid datetime value.");
            }
            parsed
        };

        match (artist_id, venue_id, start_time) {
            (Some(artist_id), Some(venue_id), Some(start_time)) if errors.is_empty() => {
                Ok(Show::new(venue_id, artist_id, start_time))
            }
            _ => Err(errors),
        }
    }
}

fn parse_id(errors: &mut FormErrors, field: &str, value: &str) -> Option<i64> {
    if value.is_empty() {
        errors.add(field, "This field is required.");
        return None;
    }
    match value.parse::<i64>() {
        Ok(id) if id > 0 => Some(id),
        _ => {
            errors.add(field, "Must be a positive whole number.");
            None
        }
    }
}
