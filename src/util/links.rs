//! Link detection in free text
//!
//! Post bodies and chat messages are plain text; this finds the URLs in
//! them so a renderer can make them tappable.

use url::Url;

/// A URL found in text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Byte range of the link in the source text
    pub start: usize,
    pub end: usize,
    /// Normalized target (scheme added for `www.` links)
    pub url: Url,
}

/// Piece of text as it should be rendered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(&'a str),
    Link { text: &'a str, url: Url },
}

const TRAILING_PUNCTUATION: &[char] = &['.', ',', ';', ':', '!', '?', ')', ']', '"', '\''];

/// Find every http(s) or `www.` link in `text`
pub fn find_links(text: &str) -> Vec<Link> {
    let mut links = Vec::new();

    for (start, word) in words(text) {
        let candidate = word
            .trim_start_matches(['(', '[', '"', '\''])
            .trim_end_matches(TRAILING_PUNCTUATION);
        if candidate.is_empty() {
            continue;
        }
        let offset = start + (word.len() - word.trim_start_matches(['(', '[', '"', '\'']).len());

        let lower = candidate.to_ascii_lowercase();
        let target = if lower.starts_with("http://") || lower.starts_with("https://") {
            candidate.to_string()
        } else if lower.starts_with("www.") {
            format!("https://{}", candidate)
        } else {
            continue;
        };

        match Url::parse(&target) {
            Ok(url) if url.host_str().is_some_and(|h| h.contains('.') || h == "localhost") => {
                links.push(Link {
                    start: offset,
                    end: offset + candidate.len(),
                    url,
                });
            }
            _ => {}
        }
    }

    links
}

/// Split `text` into plain and link segments, in order
pub fn segments(text: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut cursor = 0;

    for link in find_links(text) {
        if link.start > cursor {
            out.push(Segment::Text(&text[cursor..link.start]));
        }
        out.push(Segment::Link {
            text: &text[link.start..link.end],
            url: link.url,
        });
        cursor = link.end;
    }
    if cursor < text.len() {
        out.push(Segment::Text(&text[cursor..]));
    }

    out
}

/// Whitespace-separated words with their byte offsets
fn words(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.split_whitespace()
        .map(move |word| (word.as_ptr() as usize - text.as_ptr() as usize, word))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_http_and_www_links() {
        let text = "Slides at https://example.com/deck.pdf, notes on www.notes.io!";
        let links = find_links(text);

        assert_eq!(links.len(), 2);
        assert_eq!(&text[links[0].start..links[0].end], "https://example.com/deck.pdf");
        assert_eq!(&text[links[1].start..links[1].end], "www.notes.io");
        assert_eq!(links[1].url.as_str(), "https://www.notes.io/");
    }

    #[test]
    fn ignores_non_links() {
        assert!(find_links("email me at ada@example.com or see http://").is_empty());
        assert!(find_links("").is_empty());
    }

    #[test]
    fn parenthesized_link_excludes_brackets() {
        let text = "(see https://rust-lang.org)";
        let links = find_links(text);
        assert_eq!(&text[links[0].start..links[0].end], "https://rust-lang.org");
    }

    #[test]
    fn segments_cover_the_whole_text() {
        let text = "go to https://a.io now";
        let parts = segments(text);

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], Segment::Text("go to "));
        assert!(matches!(&parts[1], Segment::Link { text, .. } if *text == "https://a.io"));
        assert_eq!(parts[2], Segment::Text(" now"));
    }
}
