/// Lightweight text analysis over scraped titles and descriptions.
use std::sync::LazyLock;

use regex::Regex;

pub const DESCRIPTION_EXCERPT_CHARS: usize = 1000;

static TITLE_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(.+?)\s+[-–—]\s+(.+?)\s*$").expect("valid title split"));
static NOTIFICATION_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\(\d+\)\s*").expect("valid prefix"));
static BRACKETED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*[(\[][^)\]]*[)\]]").expect("valid brackets"));
static COLLABORATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\bfeat\.?(\s|$)|\bft\.(\s|$)|\bft\s|\bfeaturing\b|\bduet\b|\s[x×]\s)")
        .expect("valid collaboration")
});
static RELEASE_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19[5-9]\d|20[0-4]\d)\b").expect("valid year"));

/// Context vocabulary: label emitted, pattern matched case-insensitively.
const VOCABULARY: &[(&str, &str)] = &[
    // instruments
    ("piano", r"\bpiano\b"),
    ("guitar", r"\bguitars?\b"),
    ("violin", r"\bviolins?\b"),
    ("cello", r"\bcello\b"),
    ("drums", r"\bdrums?\b"),
    ("flute", r"\bflute\b"),
    ("saxophone", r"\bsax(ophone)?\b"),
    // settings
    ("rain", r"\brain(y|ing)?\b"),
    ("beach", r"\bbeach\b"),
    ("night", r"\bnight\b"),
    ("forest", r"\bforest\b"),
    ("city", r"\bcity\b"),
    ("snow", r"\bsnow(y|ing)?\b"),
    ("studio", r"\bstudio\b"),
    // performance style
    ("dancing", r"\bdanc(e|es|er|ers|ing)\b"),
    ("acoustic", r"\bacoustic\b"),
    ("live", r"\blive\b"),
    ("unplugged", r"\bunplugged\b"),
    ("orchestra", r"\borchestra(l)?\b"),
    // performer
    ("female vocals", r"\b(she|her|girl|woman|women|female)\b"),
    ("male vocals", r"\b(he|his|boy|man|men|male)\b"),
];

static VOCABULARY_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    VOCABULARY
        .iter()
        .filter_map(|(label, pattern)| {
            Regex::new(&format!("(?i){}", pattern))
                .ok()
                .map(|re| (*label, re))
        })
        .collect()
});

/// Video kinds by title marker, first match wins.
const VIDEO_TYPES: &[(&str, &[&str])] = &[
    ("lyric video", &["lyric video", "lyrics", "(lyric"]),
    ("music video", &["official music video", "official video", "music video", "(official mv)"]),
    ("audio", &["official audio", "(audio)", "[audio]"]),
    ("live performance", &["live at", "live from", "(live)", "[live]", "live performance"]),
    ("cover", &["cover"]),
    ("remix", &["remix"]),
];

/// Split "Performer - Work (Official Video)" into performer and work.
pub fn split_title(title: &str) -> Option<(String, String)> {
    let title = NOTIFICATION_PREFIX.replace(title, "");
    let captures = TITLE_SPLIT.captures(&title)?;
    let artist = captures[1].trim().to_string();
    let song = BRACKETED.replace_all(&captures[2], "").trim().to_string();
    if artist.is_empty() || song.is_empty() {
        return None;
    }
    Some((artist, song))
}

/// Comma-separated context labels found in `text`.
pub fn contextual_keywords(text: &str) -> Option<String> {
    let labels: Vec<&str> = VOCABULARY_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(text))
        .map(|(label, _)| *label)
        .collect();
    (!labels.is_empty()).then(|| labels.join(", "))
}

pub fn is_collaboration(text: &str) -> bool {
    COLLABORATION.is_match(text)
}

pub fn video_type(title: &str) -> Option<&'static str> {
    let title = title.to_lowercase();
    VIDEO_TYPES
        .iter()
        .find(|(_, markers)| markers.iter().any(|marker| title.contains(marker)))
        .map(|(kind, _)| *kind)
}

pub fn release_year(text: &str) -> Option<String> {
    RELEASE_YEAR
        .captures(text)
        .map(|captures| captures[1].to_string())
}

/// Whitespace-collapsed prefix of `text`, at most `DESCRIPTION_EXCERPT_CHARS` chars.
pub fn excerpt(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    collapsed.chars().take(DESCRIPTION_EXCERPT_CHARS).collect()
}
