//! Lyrics page extraction.
//!
//! Reconstructs ordered lyric lines from a rendered song page with a single
//! left-to-right walk over the lyrics paragraph. Inline styling elements
//! carry no semantic weight and are flattened to their text; `<br>` marks
//! the end of one lyric line. Title and artist come from a fixed header
//! region of the same document, independent of the lyrics walk.

use scraper::{ElementRef, Html, Node, Selector};
use tracing::{debug, instrument};

use lyricat_shared::{Extraction, LyricatError, Result, ScrapedSong};

/// Extract lyrics and header metadata from one song page.
///
/// Returns [`Extraction::NoLyrics`] when the page has no lyrics container or
/// the container has no paragraph child — the song is skipped, not an error.
/// A missing title or artist header is a parse error for this page.
#[instrument(skip(html))]
pub fn extract(html: &str, url: &str) -> Result<Extraction> {
    let doc = Html::parse_document(html);

    let lyrics_sel = Selector::parse("div.lyrics").expect("valid selector");
    let Some(container) = doc.select(&lyrics_sel).next() else {
        debug!(url, "no lyrics container");
        return Ok(Extraction::NoLyrics);
    };

    // The lyric text lives in the container's first paragraph child.
    let Some(paragraph) = container
        .children()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "p")
    else {
        debug!(url, "lyrics container has no paragraph");
        return Ok(Extraction::NoLyrics);
    };

    let lines = walk_paragraph(&paragraph);
    let (title, artist, artist_url) = extract_header(&doc, url)?;

    debug!(url, lines = lines.len(), "lyrics extracted");

    Ok(Extraction::Song(ScrapedSong {
        url: url.to_string(),
        title,
        artist,
        artist_url,
        lines,
    }))
}

/// Walk the paragraph's children, buffering text until each line break.
///
/// State machine per child node:
/// - text node: append to the line buffer
/// - `<br>`: flush the trimmed buffer as one completed line (possibly empty)
/// - any other element: append its recursively flattened text
///
/// A non-empty trailing buffer flushes as a final line so text with no
/// terminating break is not lost.
fn walk_paragraph(paragraph: &ElementRef) -> Vec<String> {
    let mut completed_lines = Vec::new();
    let mut line_buffer = String::new();

    for child in paragraph.children() {
        match child.value() {
            Node::Text(text) => line_buffer.push_str(text),
            Node::Element(element) => {
                if element.name() == "br" {
                    completed_lines.push(line_buffer.trim().to_string());
                    line_buffer.clear();
                } else if let Some(el) = ElementRef::wrap(child) {
                    // Styling and annotation markup collapses to its text.
                    line_buffer.push_str(&el.text().collect::<String>());
                }
            }
            _ => {}
        }
    }

    if !line_buffer.trim().is_empty() {
        completed_lines.push(line_buffer.trim().to_string());
    }

    completed_lines
}

/// Read title, artist, and artist URL from the page header.
fn extract_header(doc: &Html, url: &str) -> Result<(String, String, Option<String>)> {
    let header_sel = Selector::parse("div.header_with_cover_art").expect("valid selector");
    let h1_sel = Selector::parse("h1").expect("valid selector");
    let h2_sel = Selector::parse("h2").expect("valid selector");
    let a_sel = Selector::parse("a").expect("valid selector");

    let header = doc
        .select(&header_sel)
        .next()
        .ok_or_else(|| LyricatError::parse(format!("{url}: song header not found")))?;

    let title = header
        .select(&h1_sel)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| LyricatError::parse(format!("{url}: song title not found")))?;

    let artist_el = header
        .select(&h2_sel)
        .next()
        .ok_or_else(|| LyricatError::parse(format!("{url}: artist header not found")))?;

    let artist = artist_el.text().collect::<String>().trim().to_string();
    if artist.is_empty() {
        return Err(LyricatError::parse(format!("{url}: artist header is empty")));
    }

    let artist_url = artist_el
        .select(&a_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
        .map(String::from);

    Ok((title, artist, artist_url))
}
