//! Typed presentation views assembled from storage rows.
//!
//! Each view lists its fields statically; templates and JSON consumers read
//! exactly these shapes.

use crate::domain::*;
use crate::error::{FyyurError, Result};
use crate::storage::Storage;
use chrono::NaiveDateTime;
use serde::Serialize;

/// A show with the venue and artist it links, plus the flattened fields the
/// list and detail pages display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShowWithRelated {
    pub id: i64,
    #[serde(serialize_with = "crate::domain::show_time::serialize")]
    pub start_time: NaiveDateTime,
    pub venue_id: i64,
    pub artist_id: i64,
    pub venue: Venue,
    pub artist: Artist,
    pub artist_name: String,
    pub artist_image_link: Option<String>,
    pub venue_name: String,
    pub venue_image_link: Option<String>,
}

impl From<ShowListing> for ShowWithRelated {
    fn from(listing: ShowListing) -> Self {
        let ShowListing { show, venue, artist } = listing;
        Self {
            id: show.id,
            start_time: show.start_time,
            venue_id: show.venue_id,
            artist_id: show.artist_id,
            artist_name: artist.name.clone(),
            artist_image_link: artist.image_link.clone(),
            venue_name: venue.name.clone(),
            venue_image_link: venue.image_link.clone(),
            venue,
            artist,
        }
    }
}

/// Shows split around one instant. A show starting exactly at that instant is
/// in neither list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShowPartition {
    pub upcoming: Vec<ShowWithRelated>,
    pub past: Vec<ShowWithRelated>,
}

pub fn partition_shows(listings: Vec<ShowListing>, now: NaiveDateTime) -> ShowPartition {
    let mut partition = ShowPartition::default();
    for listing in listings {
        let start = listing.show.start_time;
        if start > now {
            partition.upcoming.push(listing.into());
        } else if start < now {
            partition.past.push(listing.into());
        }
    }
    partition
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueDetail {
    #[serde(flatten)]
    pub venue: Venue,
    pub upcoming_shows: Vec<ShowWithRelated>,
    pub past_shows: Vec<ShowWithRelated>,
    pub upcoming_shows_count: usize,
    pub past_shows_count: usize,
}

impl VenueDetail {
    pub fn new(venue: Venue, listings: Vec<ShowListing>, now: NaiveDateTime) -> Self {
        let ShowPartition { upcoming, past } = partition_shows(listings, now);
        Self {
            venue,
            upcoming_shows_count: upcoming.len(),
            past_shows_count: past.len(),
            upcoming_shows: upcoming,
            past_shows: past,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ArtistDetail {
    #[serde(flatten)]
    pub artist: Artist,
    pub upcoming_shows: Vec<ShowWithRelated>,
    pub past_shows: Vec<ShowWithRelated>,
    pub upcoming_shows_count: usize,
    pub past_shows_count: usize,
}

impl ArtistDetail {
    pub fn new(artist: Artist, listings: Vec<ShowListing>, now: NaiveDateTime) -> Self {
        let ShowPartition { upcoming, past } = partition_shows(listings, now);
        Self {
            artist,
            upcoming_shows_count: upcoming.len(),
            past_shows_count: past.len(),
            upcoming_shows: upcoming,
            past_shows: past,
        }
    }
}

/// A venue with the number of its upcoming shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VenueSummary {
    #[serde(flatten)]
    pub venue: Venue,
    pub num_shows: usize,
}

/// Every venue in one (city, state) pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityStateArea {
    pub city: String,
    pub state: String,
    pub venues: Vec<VenueSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResults<T> {
    pub count: usize,
    pub data: Vec<T>,
}

impl<T> SearchResults<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            count: data.len(),
            data,
        }
    }
}

pub async fn load_venue_detail(
    storage: &dyn Storage,
    venue_id: i64,
    now: NaiveDateTime,
) -> Result<VenueDetail> {
    let venue = storage
        .get_venue_by_id(venue_id)
        .await?
        .ok_or_else(|| FyyurError::not_found("Venue", venue_id))?;
    let listings = storage.get_show_listings_by_venue(venue_id).await?;
    Ok(VenueDetail::new(venue, listings, now))
}

pub async fn load_artist_detail(
    storage: &dyn Storage,
    artist_id: i64,
    now: NaiveDateTime,
) -> Result<ArtistDetail> {
    let artist = storage
        .get_artist_by_id(artist_id)
        .await?
        .ok_or_else(|| FyyurError::not_found("Artist", artist_id))?;
    let listings = storage.get_show_listings_by_artist(artist_id).await?;
    Ok(ArtistDetail::new(artist, listings, now))
}

/// The (city, state) area `venue` belongs to, with every venue in it.
pub async fn load_city_state_area(
    storage: &dyn Storage,
    venue: &Venue,
    now: NaiveDateTime,
) -> Result<CityStateArea> {
    let neighbours = storage
        .get_venues_by_location(&venue.city, &venue.state)
        .await?;
    let mut venues = Vec::with_capacity(neighbours.len());
    for neighbour in neighbours {
        let num_shows = storage
            .count_upcoming_shows_by_venue(neighbour.id, now)
            .await?;
        venues.push(VenueSummary {
            venue: neighbour,
            num_shows,
        });
    }
    Ok(CityStateArea {
        city: venue.city.clone(),
        state: venue.state.clone(),
        venues,
    })
}

/// One area per distinct (city, state) pair, in the order its first venue
/// was listed.
pub async fn load_venue_areas(
    storage: &dyn Storage,
    now: NaiveDateTime,
) -> Result<Vec<CityStateArea>> {
    let mut areas: Vec<CityStateArea> = Vec::new();
    for venue in storage.get_all_venues().await? {
        if areas
            .iter()
            .any(|area| area.city == venue.city && area.state == venue.state)
        {
            continue;
        }
        areas.push(load_city_state_area(storage, &venue, now).await?);
    }
    Ok(areas)
}

pub async fn load_show_listings(storage: &dyn Storage) -> Result<Vec<ShowWithRelated>> {
    let listings = storage.get_show_listings().await?;
    Ok(listings.into_iter().map(ShowWithRelated::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStorage;
    use chrono::{Duration, NaiveDate};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2030, 1, 15)
            .unwrap()
            .and_hms_opt(20, 0, 0)
            .unwrap()
    }

    fn venue(name: &str, city: &str, state: &str) -> Venue {
        Venue {
            id: 0,
            name: name.to_string(),
            address: "1015 Folsom Street".to_string(),
            city: city.to_string(),
            state: state.to_string(),
            phone: Some("123-123-1234".to_string()),
            image_link: Some(format!("https://img.example.com/{}.jpg", name.len())),
            facebook_link: None,
            website: None,
            genres: "Jazz,Reggae".to_string(),
            seeking_talent: true,
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
            phone: None,
            genres: "Rock n Roll".to_string(),
            image_link: Some("https://img.example.com/artist.jpg".to_string()),
            facebook_link: None,
            website: None,
            seeking_venue: false,
            seeking_description: None,
        }
    }

    fn listing(id: i64, start_time: NaiveDateTime) -> ShowListing {
        let mut v = venue("The Musical Hop", "San Francisco", "CA");
        v.id = 1;
        let mut a = artist("Guns N Petals");
        a.id = 4;
        ShowListing {
            show: Show {
                id,
                start_time,
                venue_id: 1,
                artist_id: 4,
            },
            venue: v,
            artist: a,
        }
    }

    #[test]
    fn partition_is_strict_on_both_sides() {
        let listings = vec![
            listing(1, now() - Duration::hours(1)),
            listing(2, now()),
            listing(3, now() + Duration::seconds(1)),
        ];

        let partition = partition_shows(listings, now());
        let upcoming: Vec<i64> = partition.upcoming.iter().map(|s| s.id).collect();
        let past: Vec<i64> = partition.past.iter().map(|s| s.id).collect();
        assert_eq!(upcoming, vec![3]);
        assert_eq!(past, vec![1]);
    }

    #[test]
    fn related_fields_come_from_loaded_rows() {
        let show: ShowWithRelated = listing(9, now()).into();
        assert_eq!(show.artist_name, "Guns N Petals");
        assert_eq!(show.venue_name, "The Musical Hop");
        assert_eq!(show.artist_image_link, show.artist.image_link);
        assert_eq!(show.venue_image_link, show.venue.image_link);
        assert_eq!((show.venue_id, show.artist_id), (1, 4));
    }

    #[test]
    fn detail_counts_match_partition_lengths() {
        let listings = vec![
            listing(1, now() - Duration::days(3)),
            listing(2, now() + Duration::days(1)),
            listing(3, now() + Duration::days(2)),
        ];
        let detail = VenueDetail::new(listing(0, now()).venue, listings, now());
        assert_eq!(detail.upcoming_shows_count, 2);
        assert_eq!(detail.past_shows_count, 1);
        assert_eq!(detail.upcoming_shows.len(), detail.upcoming_shows_count);
    }

    #[test]
    fn detail_serializes_flat_fields_and_show_lists() {
        let detail = VenueDetail::new(
            listing(0, now()).venue,
            vec![listing(5, now() + Duration::days(1))],
            now(),
        );
        let json = serde_json::to_value(&detail).unwrap();
        assert_eq!(json["name"], "The Musical Hop");
        assert_eq!(json["genres"], "Jazz,Reggae");
        assert_eq!(json["upcoming_shows_count"], 1);
        assert_eq!(json["upcoming_shows"][0]["artist_name"], "Guns N Petals");
        assert_eq!(json["upcoming_shows"][0]["start_time"], "01/16/2030, 20:00:00");
        assert!(json["upcoming_shows"][0].get("artist_name_new").is_none());
        assert_eq!(json["past_shows"], serde_json::json!([]));
    }

    #[test]
    fn search_results_count_their_data() {
        let results = SearchResults::new(vec!["a", "b"]);
        assert_eq!(results.count, 2);
    }

    #[tokio::test]
    async fn areas_group_by_city_and_state_with_evaluated_counts() {
        let storage = InMemoryStorage::new();
        let mut hop = venue("The Musical Hop", "San Francisco", "CA");
        let mut park = venue("Park Square Live", "San Francisco", "CA");
        let mut dueling = venue("The Dueling Pianos Bar", "New York", "NY");
        storage.create_venue(&mut hop).await.unwrap();
        storage.create_venue(&mut dueling).await.unwrap();
        storage.create_venue(&mut park).await.unwrap();
        let mut a = artist("Matt Quevedo");
        storage.create_artist(&mut a).await.unwrap();

        for offset in [1, 2] {
            let mut show = Show::new(park.id, a.id, now() + Duration::days(offset));
            storage.create_show(&mut show).await.unwrap();
        }
        let mut old = Show::new(park.id, a.id, now() - Duration::days(30));
        storage.create_show(&mut old).await.unwrap();

        let areas = load_venue_areas(&storage, now()).await.unwrap();
        assert_eq!(areas.len(), 2);
        assert_eq!((areas[0].city.as_str(), areas[0].state.as_str()), ("San Francisco", "CA"));
        let counts: Vec<(&str, usize)> = areas[0]
            .venues
            .iter()
            .map(|s| (s.venue.name.as_str(), s.num_shows))
            .collect();
        assert_eq!(counts, vec![("The Musical Hop", 0), ("Park Square Live", 2)]);
        assert_eq!(areas[1].venues.len(), 1);

        let area = load_city_state_area(&storage, &hop, now()).await.unwrap();
        assert_eq!(area.venues.len(), 2);
    }

    #[tokio::test]
    async fn missing_detail_is_not_found() {
        let storage = InMemoryStorage::new();
        let err = load_venue_detail(&storage, 42, now()).await.unwrap_err();
        assert!(err.is_not_found());
        let err = load_artist_detail(&storage, 42, now()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
