use askama::Template;
use axum::extract::{Form, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use chrono::{Local, NaiveDateTime};
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::error::{FyyurError, Result};
use crate::forms::{ArtistForm, FormData, FormErrors, ShowForm, VenueForm};
use crate::views::{self, SearchResults};
use crate::web::error::not_found_page;
use crate::web::extract::RecordId;
use crate::web::state::AppState;
use crate::web::templates::*;

type FormPairs = Form<Vec<(String, String)>>;

#[derive(Debug, Default, Deserialize)]
pub struct SearchForm {
    #[serde(default)]
    pub search_term: String,
}

/// Wall-clock time in the server's local zone, matching how show times are entered.
fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn render<T: Template>(status: StatusCode, template: &T) -> Result<Response> {
    Ok((status, Html(template.render()?)).into_response())
}

fn home_with(status: StatusCode, notice: Notice) -> Result<Response> {
    render(status, &HomeTemplate { notices: vec![notice] })
}

/// Turns a failed write into a home page notice. Anything other than a
/// rejected reference or a database failure propagates.
fn write_failure(err: FyyurError, message: String) -> Result<Response> {
    match err {
        FyyurError::IntegrityViolation { message: reason } => {
            warn!(%reason, "Write rejected");
            home_with(
                StatusCode::UNPROCESSABLE_ENTITY,
                Notice::error(format!("{} {}", message, reason)),
            )
        }
        FyyurError::Database { message: reason } => {
            error!(%reason, "Write failed");
            home_with(StatusCode::INTERNAL_SERVER_ERROR, Notice::error(message))
        }
        other => Err(other),
    }
}

pub async fn index() -> Result<Response> {
    render(StatusCode::OK, &HomeTemplate { notices: Vec::new() })
}

pub async fn fallback() -> Response {
    not_found_page()
}

//  Venues
//  ----------------------------------------------------------------

pub async fn venues(State(state): State<AppState>) -> Result<Response> {
    let areas = views::load_venue_areas(state.storage.as_ref(), now()).await?;
    render(StatusCode::OK, &VenuesTemplate { areas })
}

pub async fn search_venues(
    State(state): State<AppState>,
    Form(search): Form<SearchForm>,
) -> Result<Response> {
    let term = search.search_term.trim().to_string();
    let results = SearchResults::new(state.storage.search_venues(&term).await?);
    info!(term = %term, count = results.count, "Venue search");
    render(
        StatusCode::OK,
        &SearchVenuesTemplate {
            results,
            search_term: term,
        },
    )
}

pub async fn show_venue(
    State(state): State<AppState>,
    RecordId(venue_id): RecordId,
) -> Result<Response> {
    let venue = views::load_venue_detail(state.storage.as_ref(), venue_id, now()).await?;
    render(StatusCode::OK, &ShowVenueTemplate { venue })
}

pub async fn create_venue_form() -> Result<Response> {
    render(
        StatusCode::OK,
        &NewVenueTemplate::new(VenueForm::default(), FormErrors::default()),
    )
}

pub async fn create_venue_submission(
    State(state): State<AppState>,
    Form(pairs): FormPairs,
) -> Result<Response> {
    let form = VenueForm::from_form(&FormData::from(pairs));
    let mut venue = match form.validate() {
        Ok(venue) => venue,
        Err(errors) => {
            warn!(%errors, "Venue form rejected");
            return render(
                StatusCode::UNPROCESSABLE_ENTITY,
                &NewVenueTemplate::new(form, errors),
            );
        }
    };

    match state.storage.create_venue(&mut venue).await {
        Ok(()) => {
            info!(venue_id = venue.id, name = %venue.name, "Venue listed");
            home_with(
                StatusCode::OK,
                Notice::success(format!("Venue {} was successfully listed!", venue.name)),
            )
        }
        Err(e) => write_failure(
            e,
            format!("An error occurred. Venue {} could not be listed.", venue.name),
        ),
    }
}

pub async fn edit_venue_form(
    State(state): State<AppState>,
    RecordId(venue_id): RecordId,
) -> Result<Response> {
    let venue = state
        .storage
        .get_venue_by_id(venue_id)
        .await?
        .ok_or_else(|| FyyurError::not_found("Venue", venue_id))?;
    let form = VenueForm::from_venue(&venue);
    render(
        StatusCode::OK,
        &EditVenueTemplate::new(venue.id, venue.name, form, FormErrors::default()),
    )
}

pub async fn edit_venue_submission(
    State(state): State<AppState>,
    RecordId(venue_id): RecordId,
    Form(pairs): FormPairs,
) -> Result<Response> {
    let existing = state
        .storage
        .get_venue_by_id(venue_id)
        .await?
        .ok_or_else(|| FyyurError::not_found("Venue", venue_id))?;

    let form = VenueForm::from_form(&FormData::from(pairs));
    let mut venue = match form.validate() {
        Ok(venue) => venue,
        Err(errors) => {
            warn!(venue_id, %errors, "Venue edit rejected");
            return render(
                StatusCode::UNPROCESSABLE_ENTITY,
                &EditVenueTemplate::new(venue_id, existing.name, form, errors),
            );
        }
    };
    venue.id = venue_id;

    match state.storage.update_venue(&venue).await {
        Ok(()) => {
            info!(venue_id, "Venue updated");
            Ok(Redirect::to(&format!("/venues/{}", venue_id)).into_response())
        }
        Err(e) if e.is_not_found() => Err(e),
        Err(e) => write_failure(
            e,
            format!("An error occurred. Venue {} could not be updated.", existing.name),
        ),
    }
}

pub async fn delete_venue(
    State(state): State<AppState>,
    RecordId(venue_id): RecordId,
) -> Result<Response> {
    match state.storage.delete_venue(venue_id).await {
        Ok(venue) => {
            info!(venue_id, name = %venue.name, "Venue deleted");
            home_with(
                StatusCode::OK,
                Notice::success(format!("Venue {} was deleted.", venue.name)),
            )
        }
        Err(e) if e.is_not_found() => Err(e),
        Err(e) => write_failure(
            e,
            format!("An error occurred. Venue {} could not be deleted.", venue_id),
        ),
    }
}

//  Artists
//  ----------------------------------------------------------------

pub async fn artists(State(state): State<AppState>) -> Result<Response> {
    let artists = state.storage.get_all_artists().await?;
    render(StatusCode::OK, &ArtistsTemplate { artists })
}

pub async fn search_artists(
    State(state): State<AppState>,
    Form(search): Form<SearchForm>,
) -> Result<Response> {
    let term = search.search_term.trim().to_string();
    let results = SearchResults::new(state.storage.search_artists(&term).await?);
    info!(term = %term, count = results.count, "Artist search");
    render(
        StatusCode::OK,
        &SearchArtistsTemplate {
            results,
            search_term: term,
        },
    )
}

pub async fn show_artist(
    State(state): State<AppState>,
    RecordId(artist_id): RecordId,
) -> Result<Response> {
    let artist = views::load_artist_detail(state.storage.as_ref(), artist_id, now()).await?;
    render(StatusCode::OK, &ShowArtistTemplate { artist })
}

pub async fn create_artist_form() -> Result<Response> {
    render(
        StatusCode::OK,
        &NewArtistTemplate::new(ArtistForm::default(), FormErrors::default()),
    )
}

pub async fn create_artist_submission(
    State(state): State<AppState>,
    Form(pairs): FormPairs,
) -> Result<Response> {
    let form = ArtistForm::from_form(&FormData::from(pairs));
    let mut artist = match form.validate() {
        Ok(artist) => artist,
        Err(errors) => {
            warn!(%errors, "Artist form rejected");
            return render(
                StatusCode::UNPROCESSABLE_ENTITY,
                &NewArtistTemplate::new(form, errors),
            );
        }
    };

    match state.storage.create_artist(&mut artist).await {
        Ok(()) => {
            info!(artist_id = artist.id, name = %artist.name, "Artist listed");
            home_with(
                StatusCode::OK,
                Notice::success(format!("Artist {} was successfully listed!", artist.name)),
            )
        }
        Err(e) => write_failure(
            e,
            format!("An error occurred. Artist {} could not be listed.", artist.name),
        ),
    }
}

pub async fn edit_artist_form(
    State(state): State<AppState>,
    RecordId(artist_id): RecordId,
) -> Result<Response> {
    let artist = state
        .storage
        .get_artist_by_id(artist_id)
        .await?
        .ok_or_else(|| FyyurError::not_found("Artist", artist_id))?;
    let form = ArtistForm::from_artist(&artist);
    render(
        StatusCode::OK,
        &EditArtistTemplate::new(artist.id, artist.name, form, FormErrors::default()),
    )
}

pub async fn edit_artist_submission(
    State(state): State<AppState>,
    RecordId(artist_id): RecordId,
    Form(pairs): FormPairs,
) -> Result<Response> {
    let existing = state
        .storage
        .get_artist_by_id(artist_id)
        .await?
        .ok_or_else(|| FyyurError::not_found("Artist", artist_id))?;

    let form = ArtistForm::from_form(&FormData::from(pairs));
    let mut artist = match form.validate() {
        Ok(artist) => artist,
        Err(errors) => {
            warn!(artist_id, %errors, "Artist edit rejected");
            return render(
                StatusCode::UNPROCESSABLE_ENTITY,
                &EditArtistTemplate::new(artist_id, existing.name, form, errors),
            );
        }
    };
    artist.id = artist_id;

    match state.storage.update_artist(&artist).await {
        Ok(()) => {
            info!(artist_id, "Artist updated");
            Ok(Redirect::to(&format!("/artists/{}", artist_id)).into_response())
        }
        Err(e) if e.is_not_found() => Err(e),
        Err(e) => write_failure(
            e,
            format!("An error occurred. Artist {} could not be updated.", existing.name),
        ),
    }
}

pub async fn delete_artist(
    State(state): State<AppState>,
    RecordId(artist_id): RecordId,
) -> Result<Response> {
    match state.storage.delete_artist(artist_id).await {
        Ok(artist) => {
            info!(artist_id, name = %artist.name, "Artist deleted");
            home_with(
                StatusCode::OK,
                Notice::success(format!("Artist {} was deleted.", artist.name)),
            )
        }
        Err(e) if e.is_not_found() => Err(e),
        Err(e) => write_failure(
            e,
            format!("An error occurred. Artist {} could not be deleted.", artist_id),
        ),
    }
}

//  Shows
//  ----------------------------------------------------------------

pub async fn shows(State(state): State<AppState>) -> Result<Response> {
    let shows = views::load_show_listings(state.storage.as_ref()).await?;
    render(StatusCode::OK, &ShowsTemplate { shows })
}

async fn new_show_page(
    state: &AppState,
    status: StatusCode,
    form: ShowForm,
    errors: FormErrors,
) -> Result<Response> {
    let venues = state.storage.get_all_venues().await?;
    let artists = state.storage.get_all_artists().await?;
    render(
        status,
        &NewShowTemplate {
            form,
            errors,
            venues,
            artists,
        },
    )
}

pub async fn create_show_form(State(state): State<AppState>) -> Result<Response> {
    let form = ShowForm::starting_at(now());
    new_show_page(&state, StatusCode::OK, form, FormErrors::default()).await
}

pub async fn create_show_submission(
    State(state): State<AppState>,
    Form(pairs): FormPairs,
) -> Result<Response> {
    let form = ShowForm::from_form(&FormData::from(pairs));
    let mut show = match form.validate() {
        Ok(show) => show,
        Err(errors) => {
            warn!(%errors, "Show form rejected");
            return new_show_page(&state, StatusCode::UNPROCESSABLE_ENTITY, form, errors).await;
        }
    };

    match state.storage.create_show(&mut show).await {
        Ok(()) => {
            info!(
                show_id = show.id,
                venue_id = show.venue_id,
                artist_id = show.artist_id,
                "Show listed"
            );
            home_with(StatusCode::OK, Notice::success("Show was successfully listed!"))
        }
        Err(e) => write_failure(e, "An error occurred. Show could not be listed.".to_string()),
    }
}
