/// Video platform pages (YouTube and YouTube Music).
use url::Url;

use super::analysis::{contextual_keywords, excerpt, is_collaboration, release_year, split_title, video_type};
use super::{Candidate, PageDom, first_match, put};
use crate::history_data::ExtractedFields;

const TITLE: &[Candidate] = &[
    Candidate::Text("h1.ytd-watch-metadata yt-formatted-string"),
    Candidate::Text("h1.title yt-formatted-string"),
    Candidate::Text("ytmusic-player-bar .title"),
    Candidate::Attr("meta[name='title']", "content"),
    Candidate::Attr("meta[property='og:title']", "content"),
];

const CHANNEL: &[Candidate] = &[
    Candidate::Text("ytd-channel-name#channel-name a"),
    Candidate::Text("#owner #channel-name a"),
    Candidate::Text("#upload-info #channel-name a"),
    Candidate::Text("ytmusic-player-bar .byline a"),
    Candidate::Attr("span[itemprop='author'] link[itemprop='name']", "content"),
];

const DESCRIPTION: &[Candidate] = &[
    Candidate::Text("#description-inline-expander yt-attributed-string"),
    Candidate::Text("#description yt-formatted-string"),
    Candidate::Attr("meta[name='description']", "content"),
    Candidate::Attr("meta[property='og:description']", "content"),
];

pub fn extract(page: &dyn PageDom, url: &str) -> ExtractedFields {
    let mut fields = ExtractedFields::new();
    let title = first_match(page, TITLE);
    let channel = first_match(page, CHANNEL);
    let description = first_match(page, DESCRIPTION).map(|d| excerpt(&d));

    if title.is_none() && channel.is_none() && description.is_none() {
        return fields;
    }

    let title_text = title.clone().unwrap_or_default();
    let description_text = description.clone().unwrap_or_default();
    let context = format!("{} {}", title_text, description_text);

    if let Some((artist, song)) = split_title(&title_text) {
        put(&mut fields, "parsed_artist", Some(artist));
        put(&mut fields, "parsed_song", Some(song));
    }
    put(&mut fields, "video_type", video_type(&title_text).map(str::to_string));
    if is_collaboration(&title_text) || is_collaboration(&description_text) {
        put(&mut fields, "collaboration", Some("true".to_string()));
    }
    put(&mut fields, "contextual_keywords", contextual_keywords(&context));
    put(&mut fields, "release_year", release_year(&description_text));
    put(&mut fields, "video_title", title);
    put(&mut fields, "channel", channel);
    put(&mut fields, "description", description);
    put(&mut fields, "platform", Some("youtube".to_string()));
    put(&mut fields, "source_id", video_id(url));
    fields
}

fn video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == "v")
        .map(|(_, value)| value.into_owned())
}
