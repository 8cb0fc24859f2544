use askama::Template;

use crate::domain::{Artist, Venue};
use crate::forms::{ArtistForm, FormErrors, ShowForm, VenueForm, GENRES, STATES};
use crate::views::{ArtistDetail, CityStateArea, SearchResults, ShowWithRelated, VenueDetail};

/// Custom askama filters.
pub mod filters {
    use chrono::NaiveDateTime;
    use std::borrow::Borrow;

    /// Formats a show time for display. `"full"` renders e.g.
    /// `Saturday May, 21, 2035 at 9:30PM`, `"medium"` renders
    /// `Sat 05, 21, 2035 9:30PM`; anything else is used as a chrono format.
    pub fn datetime<T: Borrow<NaiveDateTime>>(value: T, format: &str) -> ::askama::Result<String> {
        let pattern = match format {
            "full" => "%A %B, %-d, %Y at %-I:%M%p",
            "medium" => "%a %m, %d, %Y %-I:%M%p",
            other => other,
        };
        Ok(value.borrow().format(pattern).to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// A one-off message shown at the top of the home page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            text: text.into(),
        }
    }

    pub fn css_class(&self) -> &'static str {
        match self.level {
            NoticeLevel::Success => "alert-success",
            NoticeLevel::Error => "alert-danger",
        }
    }
}

#[derive(Template)]
#[template(path = "pages/home.html")]
pub struct HomeTemplate {
    pub notices: Vec<Notice>,
}

#[derive(Template)]
#[template(path = "pages/venues.html")]
pub struct VenuesTemplate {
    pub areas: Vec<CityStateArea>,
}

#[derive(Template)]
#[template(path = "pages/search_venues.html")]
pub struct SearchVenuesTemplate {
    pub results: SearchResults<Venue>,
    pub search_term: String,
}

#[derive(Template)]
#[template(path = "pages/show_venue.html")]
pub struct ShowVenueTemplate {
    pub venue: VenueDetail,
}

#[derive(Template)]
#[template(path = "pages/artists.html")]
pub struct ArtistsTemplate {
    pub artists: Vec<Artist>,
}

#[derive(Template)]
#[template(path = "pages/search_artists.html")]
pub struct SearchArtistsTemplate {
    pub results: SearchResults<Artist>,
    pub search_term: String,
}

#[derive(Template)]
#[template(path = "pages/show_artist.html")]
pub struct ShowArtistTemplate {
    pub artist: ArtistDetail,
}

#[derive(Template)]
#[template(path = "pages/shows.html")]
pub struct ShowsTemplate {
    pub shows: Vec<ShowWithRelated>,
}

#[derive(Template)]
#[template(path = "forms/new_venue.html")]
pub struct NewVenueTemplate {
    pub form: VenueForm,
    pub errors: FormErrors,
    pub states: &'static [&'static str],
    pub genres: &'static [&'static str],
}

impl NewVenueTemplate {
    pub fn new(form: VenueForm, errors: FormErrors) -> Self {
        Self {
            form,
            errors,
            states: STATES,
            genres: GENRES,
        }
    }
}

#[derive(Template)]
#[template(path = "forms/edit_venue.html")]
pub struct EditVenueTemplate {
    pub venue_id: i64,
    pub venue_name: String,
    pub form: VenueForm,
    pub errors: FormErrors,
    pub states: &'static [&'static str],
    pub genres: &'static [&'static str],
}

impl EditVenueTemplate {
    pub fn new(venue_id: i64, venue_name: String, form: VenueForm, errors: FormErrors) -> Self {
        Self {
            venue_id,
            venue_name,
            form,
            errors,
            states: STATES,
            genres: GENRES,
        }
    }
}

#[derive(Template)]
#[template(path = "forms/new_artist.html")]
pub struct NewArtistTemplate {
    pub form: ArtistForm,
    pub errors: FormErrors,
    pub states: &'static [&'static str],
    pub genres: &'static [&'static str],
}

impl NewArtistTemplate {
    pub fn new(form: ArtistForm, errors: FormErrors) -> Self {
        Self {
            form,
            errors,
            states: STATES,
            genres: GENRES,
        }
    }
}

#[derive(Template)]
#[template(path = "forms/edit_artist.html")]
pub struct EditArtistTemplate {
    pub artist_id: i64,
    pub artist_name: String,
    pub form: ArtistForm,
    pub errors: FormErrors,
    pub states: &'static [&'static str],
    pub genres: &'static [&'static str],
}

impl EditArtistTemplate {
    pub fn new(artist_id: i64, artist_name: String, form: ArtistForm, errors: FormErrors) -> Self {
        Self {
            artist_id,
            artist_name,
            form,
            errors,
            states: STATES,
            genres: GENRES,
        }
    }
}

#[derive(Template)]
#[template(path = "forms/new_show.html")]
pub struct NewShowTemplate {
    pub form: ShowForm,
    pub errors: FormErrors,
    pub venues: Vec<Venue>,
    pub artists: Vec<Artist>,
}

#[derive(Template)]
#[template(path = "errors/404.html")]
pub struct NotFoundTemplate;

#[derive(Template)]
#[template(path = "errors/500.html")]
pub struct ServerErrorTemplate;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn datetime_filter_formats() {
        let at = NaiveDate::from_ymd_opt(2035, 5, 21)
            .unwrap()
            .and_hms_opt(21, 30, 0)
            .unwrap();
        assert_eq!(filters::datetime(&at, "full").unwrap(), "Monday May, 21, 2035 at 9:30PM");
        assert_eq!(filters::datetime(at, "medium").unwrap(), "Mon 05, 21, 2035 9:30PM");
        assert_eq!(filters::datetime(&at, "%Y").unwrap(), "2035");
    }

    #[test]
    fn home_renders_notices() {
        let html = HomeTemplate {
            notices: vec![Notice::error("Venue X could not be listed.")],
        }
        .render()
        .unwrap();
        assert!(html.contains("alert-danger"));
        assert!(html.contains("Venue X could not be listed."));
    }
}
