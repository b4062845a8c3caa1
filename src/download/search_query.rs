//! Building and simplifying the text query sent to peer search.

use regex::Regex;
use std::sync::OnceLock;

fn parenthetical_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*[\(\[][^\)\]]*[\)\]]").unwrap())
}

fn trailing_disambiguator_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s*[-:]\s*(remaster(ed)?|deluxe|expanded|anniversary)\s*(edition)?$").unwrap())
}

fn feature_list_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s*feat\.?\s+.*$|\s*ft\.?\s+.*$").unwrap())
}

pub fn simplify(term: &str) -> String {
    let without_parens = parenthetical_re().replace_all(term, "");
    let without_features = feature_list_re().replace_all(&without_parens, "");
    let without_disambiguator = trailing_disambiguator_re().replace_all(&without_features, "");
    without_disambiguator.trim().to_string()
}

pub fn album_query(artist: &str, album: &str, exclude_terms: &[String], simplify_terms: bool) -> String {
    build("{artist} - {album}", artist, album, exclude_terms, simplify_terms)
}

pub fn track_query(artist: &str, title: &str, exclude_terms: &[String], simplify_terms: bool) -> String {
    build("{artist} - {title}", artist, title, exclude_terms, simplify_terms)
}

fn build(template: &str, artist: &str, subject: &str, exclude_terms: &[String], simplify_terms: bool) -> String {
    let (artist, subject) = if simplify_terms {
        (simplify(artist), simplify(subject))
    } else {
        (artist.to_string(), subject.to_string())
    };

    let mut query = template.replacen("{artist}", &artist, 1);
    query = query.replacen(if template.contains("{album}") { "{album}" } else { "{title}" }, &subject, 1);

    for term in exclude_terms {
        query.push_str(&format!(" -{}", term));
    }
    query
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_substitute_placeholders() {
        assert_eq!(album_query("Artist", "Album", &[], false), "Artist - Album");
        assert_eq!(track_query("Artist", "Title", &[], false), "Artist - Title");
    }

    #[test]
    fn simplify_strips_parentheticals_and_features() {
        assert_eq!(simplify("Artist (feat. Someone)"), "Artist");
        assert_eq!(simplify("Album (Deluxe Edition)"), "Album");
        assert_eq!(simplify("Album - Remastered"), "Album");
    }

    #[test]
    fn exclude_terms_are_appended_as_negative_tokens() {
        let query = album_query("Artist", "Album", &["live".to_string(), "remix".to_string()], false);
        assert_eq!(query, "Artist - Album -live -remix");
    }
}
