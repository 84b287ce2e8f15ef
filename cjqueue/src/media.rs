//! YouTube media reference helpers.
//!
//! Submissions arrive as share links in any of YouTube's URL shapes
//! (`watch?v=`, `youtu.be/`, `embed/`, playlist-suffixed, ...). The display
//! embed needs the 11-character video id; a ref from which no id can be
//! extracted is unplayable and triggers library fallback.

use once_cell::sync::Lazy;
use regex::Regex;

static LINK_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.?be)/.+$")
        .expect("link pattern is valid")
});

static VIDEO_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^.*(youtu\.be/|v/|u/\w/|embed/|watch\?v=|&v=)([^#&?]*).*$")
        .expect("video id pattern is valid")
});

/// Cheap shape check used by the submission form: does this look like a
/// YouTube link at all?
pub fn is_valid_link(url: &str) -> bool {
    LINK_PATTERN.is_match(url)
}

/// Extracts the 11-character video id from a YouTube URL.
pub fn video_id(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    let captures = VIDEO_ID_PATTERN.captures(url)?;
    let id = captures.get(2)?.as_str();
    if id.len() == 11 {
        Some(id.to_string())
    } else {
        None
    }
}

/// A media reference is playable when a video id can be extracted from it.
pub fn is_playable(media_ref: &str) -> bool {
    video_id(media_ref).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_id_extraction() {
        let cases = [
            (
                "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
                Some("dQw4w9WgXcQ"),
            ),
            (
                "https://youtu.be/izGwDsrQ1eQ?si=3vGO28sU66GynBZt",
                Some("izGwDsrQ1eQ"),
            ),
            (
                "https://www.youtube.com/watch?v=kJQP7kiw5Fk&list=PL15B1E77BB5708555",
                Some("kJQP7kiw5Fk"),
            ),
            (
                "https://www.youtube.com/embed/60ItHLz5WEA",
                Some("60ItHLz5WEA"),
            ),
            ("https://www.youtube.com/watch?v=short", None),
            ("https://example.com/watch?v=dQw4w9WgXcQ2", None),
            ("not a url", None),
            ("", None),
        ];

        for (url, expected) in cases {
            assert_eq!(video_id(url).as_deref(), expected, "url: {url}");
        }
    }

    #[test]
    fn test_link_shape_check() {
        assert!(is_valid_link("https://www.youtube.com/watch?v=dQw4w9WgXcQ"));
        assert!(is_valid_link("youtu.be/izGwDsrQ1eQ"));
        assert!(is_valid_link("http://youtube.com/embed/x"));
        assert!(!is_valid_link("https://vimeo.com/12345"));
        assert!(!is_valid_link("youtube.com/"));
    }

    #[test]
    fn test_playability() {
        assert!(is_playable("https://youtu.be/izGwDsrQ1eQ"));
        // A link can pass the shape check and still be unplayable.
        assert!(is_valid_link("https://www.youtube.com/watch?v=oops"));
        assert!(!is_playable("https://www.youtube.com/watch?v=oops"));
    }
}
