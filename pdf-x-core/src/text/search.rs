//! Regex-based text search over reconstructed layout, with coalesced match
//! bounding boxes spanning the words a match touches.

use regex::Regex;

use super::layout::{Line, Paragraph};

/// A search hit: the matched text and the union bbox of every word it overlaps.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchMatch {
    pub text: String,
    pub bbox: [f64; 4],
    /// Index into the paragraph list the match was found in.
    pub paragraph_index: usize,
    /// Index into that paragraph's line list.
    pub line_index: usize,
}

/// How to position the search relative to a previous result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStart {
    /// Begin scanning from the first line.
    FromTop,
    /// Resume scanning after a previously returned match.
    ContinueAfter,
    /// Scan backward from a previously returned match.
    Backward,
}

/// Search `paragraphs` for `pattern`, returning every match in reading
/// order (or reverse reading order for [`SearchStart::Backward`]).
pub fn search(paragraphs: &[Paragraph], pattern: &str, start: SearchStart, anchor: Option<(usize, usize)>) -> Result<Vec<SearchMatch>, regex::Error> {
    let re = Regex::new(pattern)?;
    let mut matches = Vec::new();

    for (pi, paragraph) in paragraphs.iter().enumerate() {
        for (li, line) in paragraph.lines.iter().enumerate() {
            if let Some((api, ali)) = anchor {
                match start {
                    SearchStart::ContinueAfter if (pi, li) <= (api, ali) => continue,
                    SearchStart::Backward if (pi, li) >= (api, ali) => continue,
                    _ => {}
                }
            }
            matches.extend(matches_in_line(line, &re, pi, li));
        }
    }

    if start == SearchStart::Backward {
        matches.reverse();
    }
    Ok(matches)
}

fn matches_in_line(line: &Line, re: &Regex, pi: usize, li: usize) -> Vec<SearchMatch> {
    let text = line.text();
    let mut out = Vec::new();
    for m in re.find_iter(&text) {
        let bbox = bbox_for_char_range(line, m.start(), m.end());
        out.push(SearchMatch { text: m.as_str().to_string(), bbox, paragraph_index: pi, line_index: li });
    }
    out
}

/// Map a byte range within a line's joined text back to the union bbox of
/// the words it overlaps (words are joined with a single space by
/// [`Line::text`]).
fn bbox_for_char_range(line: &Line, start: usize, end: usize) -> [f64; 4] {
    let mut pos = 0usize;
    let mut xmin = f64::INFINITY;
    let mut ymin = f64::INFINITY;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymax = f64::NEG_INFINITY;
    let mut touched = false;

    for (i, word) in line.words.iter().enumerate() {
        if i > 0 {
            pos += 1; // joining space
        }
        let word_start = pos;
        let word_end = pos + word.text.len();
        if word_end > start && word_start < end {
            xmin = xmin.min(word.bbox[0]);
            ymin = ymin.min(word.bbox[1]);
            xmax = xmax.max(word.bbox[2]);
            ymax = ymax.max(word.bbox[3]);
            touched = true;
        }
        pos = word_end;
    }

    if touched {
        [xmin, ymin, xmax, ymax]
    } else {
        line.bbox
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::layout::Word;

    fn line(words: &[&str]) -> Line {
        let mut x = 0.0;
        let words: Vec<Word> = words
            .iter()
            .map(|w| {
                let bbox = [x, 0.0, x + w.len() as f64 * 6.0, 10.0];
                x += w.len() as f64 * 6.0 + 4.0;
                Word { text: w.to_string(), bbox, underlined: false, link: None }
            })
            .collect();
        let bbox = [0.0, 0.0, x, 10.0];
        Line { words, bbox }
    }

    #[test]
    fn finds_simple_match() {
        let paragraphs = vec![Paragraph { lines: vec![line(&["hello", "world"])], bbox: [0.0, 0.0, 100.0, 10.0] }];
        let results = search(&paragraphs, "world", SearchStart::FromTop, None).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].text, "world");
    }

    #[test]
    fn continue_after_skips_prior_matches() {
        let paragraphs = vec![
            Paragraph { lines: vec![line(&["cat", "dog"])], bbox: [0.0, 0.0, 50.0, 10.0] },
            Paragraph { lines: vec![line(&["cat", "bird"])], bbox: [0.0, 0.0, 50.0, 10.0] },
        ];
        let results = search(&paragraphs, "cat", SearchStart::ContinueAfter, Some((0, 0))).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].paragraph_index, 1);
    }
}
