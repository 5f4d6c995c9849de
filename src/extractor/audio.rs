/// Audio streaming pages (Spotify web player).
use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use super::analysis::{contextual_keywords, excerpt, is_collaboration, release_year};
use super::{Candidate, PageDom, first_match, put};
use crate::history_data::ExtractedFields;

/// "Song - song and lyrics by Artist | Spotify"
static DOCUMENT_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.+?) - song(?: and lyrics)? by (.+?) \| Spotify$").expect("valid spotify title")
});

const TRACK: &[Candidate] = &[
    Candidate::Text("[data-testid='entityTitle'] h1"),
    Candidate::Text("span[data-testid='entityTitle']"),
    Candidate::Text("[data-testid='context-item-link']"),
    Candidate::Attr("meta[property='og:title']", "content"),
];

const ARTIST: &[Candidate] = &[
    Candidate::Text("[data-testid='creator-link']"),
    Candidate::Text("[data-testid='context-item-info-artist']"),
    Candidate::Attr("meta[name='music:musician_description']", "content"),
];

const ALBUM: &[Candidate] = &[
    Candidate::Text("a[href*='/album/']"),
];

const RELEASE: &[Candidate] = &[
    Candidate::Text("[data-testid='release-date']"),
    Candidate::Attr("meta[name='music:release_date']", "content"),
];

const DESCRIPTION: &[Candidate] = &[
    Candidate::Attr("meta[property='og:description']", "content"),
    Candidate::Attr("meta[name='description']", "content"),
];

pub fn extract(page: &dyn PageDom, url: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::new();
    let from_title = DOCUMENT_TITLE
        .captures(&page.title())
        .map(|c| (c[1].trim().to_string(), c[2].trim().to_string()));

    let track = first_match(page, TRACK).or_else(|| from_title.clone().map(|(track, _)| track));
    let artist = first_match(page, ARTIST).or_else(|| from_title.map(|(_, artist)| artist));
    let album = first_match(page, ALBUM);
    let year = first_match(page, RELEASE).and_then(|text| release_year(&text));
    let description = first_match(page, DESCRIPTION).map(|d| excerpt(&d));

    if track.is_none() && artist.is_none() && album.is_none() && year.is_none() && description.is_none() {
        return fields;
    }

    let track_text = track.clone().unwrap_or_default();
    let artist_text = artist.clone().unwrap_or_default();
    if is_collaboration(&track_text) || artist_text.contains(',') || artist_text.contains(" & ") {
        put(&mut fields, "collaboration", Some("true".to_string()));
    }
    let context = format!("{} {}", track_text, album.clone().unwrap_or_default());
    put(&mut fields, "contextual_keywords", contextual_keywords(&context));
    put(&mut fields, "track_name", track);
    put(&mut fields, "artist", artist);
    put(&mut fields, "album", album);
    put(&mut fields, "release_year", year);
    put(&mut fields, "description", description);
    put(&mut fields, "platform", Some("spotify".to_string()));
    put(&mut fields, "source_id", track_id(url));
    fields
}

fn track_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    segments.find(|segment| *segment == "track")?;
    segments.next().filter(|id| !id.is_empty()).map(str::to_string)
}
