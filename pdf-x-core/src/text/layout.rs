//! Word / line / paragraph grouping and reading-order reconstruction
//!, plus the optional fixed-pitch physical
//! layout renderer.

use super::block::{BlockTag, TextBlock};
use super::glyph::Glyph;

/// A run of glyphs with no inter-glyph gap large enough to count as a
/// word boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct Word {
    pub text: String,
    pub bbox: [f64; 4],
    /// Set when an underline record's bbox overlaps this word.
    pub underlined: bool,
    /// Set to the link target when a link rectangle overlaps this word.
    pub link: Option<String>,
}

/// One reconstructed line of words, left-to-right in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub words: Vec<Word>,
    pub bbox: [f64; 4],
}

impl Line {
    pub fn text(&self) -> String {
        self.words.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ")
    }
}

/// A run of lines with no vertical gap large enough to count as a
/// paragraph break.
#[derive(Debug, Clone, PartialEq)]
pub struct Paragraph {
    pub lines: Vec<Line>,
    pub bbox: [f64; 4],
}

impl Paragraph {
    pub fn text(&self) -> String {
        self.lines.iter().map(|l| l.text()).collect::<Vec<_>>().join("\n")
    }
}

/// Word-gap threshold, in device units, for a run of glyphs sharing a
/// dominant font size: a horizontal gap wider than this starts a new word.
fn word_gap_threshold(glyphs: &[Glyph]) -> f64 {
    let avg_size = glyphs.iter().map(|g| g.size).sum::<f64>() / glyphs.len().max(1) as f64;
    (0.25 * avg_size).max(0.5)
}

/// Split one leaf's glyphs into sub-lines by vertical proximity, then each
/// sub-line into words by horizontal gap.
pub fn lines_from_leaf(glyphs: &[Glyph]) -> Vec<Line> {
    if glyphs.is_empty() {
        return Vec::new();
    }
    let mut sorted: Vec<&Glyph> = glyphs.iter().collect();
    sorted.sort_by(|a, b| b.center_y().partial_cmp(&a.center_y()).unwrap());

    let avg_height = glyphs.iter().map(|g| g.height()).sum::<f64>() / glyphs.len() as f64;
    let y_threshold = (0.4 * avg_height).max(0.5);

    let mut bands: Vec<Vec<&Glyph>> = Vec::new();
    for g in sorted {
        match bands.last_mut() {
            Some(band) if (band.last().unwrap().center_y() - g.center_y()).abs() <= y_threshold => {
                band.push(g);
            }
            _ => bands.push(vec![g]),
        }
    }

    bands.into_iter().map(|band| line_from_band(&band)).collect()
}

fn line_from_band(band: &[&Glyph]) -> Line {
    let mut sorted: Vec<&Glyph> = band.to_vec();
    sorted.sort_by(|a, b| a.xmin().partial_cmp(&b.xmin()).unwrap());

    let owned: Vec<Glyph> = sorted.iter().map(|g| (*g).clone()).collect();
    let gap_threshold = word_gap_threshold(&owned);

    let mut words: Vec<Word> = Vec::new();
    let mut current: Vec<&Glyph> = Vec::new();
    for g in &sorted {
        if let Some(last) = current.last() {
            if g.xmin() - last.xmax() > gap_threshold {
                words.push(word_from_run(&current));
                current.clear();
            }
        }
        current.push(g);
    }
    if !current.is_empty() {
        words.push(word_from_run(&current));
    }

    let bbox = union(&owned);
    Line { words, bbox }
}

fn word_from_run(run: &[&Glyph]) -> Word {
    let text: String = run.iter().map(|g| g.unicode).collect();
    let owned: Vec<Glyph> = run.iter().map(|g| (*g).clone()).collect();
    Word { text, bbox: union(&owned), underlined: false, link: None }
}

fn union(glyphs: &[Glyph]) -> [f64; 4] {
    let mut xmin = f64::INFINITY;
    let mut ymin = f64::INFINITY;
    let mut xmax = f64::NEG_INFINITY;
    let mut ymax = f64::NEG_INFINITY;
    for g in glyphs {
        xmin = xmin.min(g.xmin());
        ymin = ymin.min(g.ymin());
        xmax = xmax.max(g.xmax());
        ymax = ymax.max(g.ymax());
    }
    if glyphs.is_empty() {
        [0.0, 0.0, 0.0, 0.0]
    } else {
        [xmin, ymin, xmax, ymax]
    }
}

/// Group consecutive lines into paragraphs: a gap larger than
/// `1.4 * median line height` starts a new paragraph.
pub fn group_paragraphs(lines: Vec<Line>) -> Vec<Paragraph> {
    if lines.is_empty() {
        return Vec::new();
    }
    let heights: Vec<f64> = lines.iter().map(|l| l.bbox[3] - l.bbox[1]).collect();
    let mut sorted_heights = heights.clone();
    sorted_heights.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let median_height = sorted_heights[sorted_heights.len() / 2].max(1.0);
    let gap_threshold = 1.4 * median_height;

    let mut paragraphs: Vec<Vec<Line>> = Vec::new();
    for line in lines {
        let start_new = match paragraphs.last().and_then(|p| p.last()) {
            Some(prev) => (prev.bbox[1] - line.bbox[3]) > gap_threshold,
            None => false,
        };
        if start_new || paragraphs.is_empty() {
            paragraphs.push(vec![line]);
        } else {
            paragraphs.last_mut().unwrap().push(line);
        }
    }

    paragraphs
        .into_iter()
        .map(|lines| {
            let bbox = lines.iter().fold([f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY], |acc, l| {
                [acc[0].min(l.bbox[0]), acc[1].min(l.bbox[1]), acc[2].max(l.bbox[2]), acc[3].max(l.bbox[3])]
            });
            Paragraph { lines, bbox }
        })
        .collect()
}

/// Walk the partition tree in reading order, collecting one [`Line`] list
/// per leaf (leaves are already ordered top-to-bottom / left-to-right by
/// [`super::block::build_split_tree`]).
pub fn reading_order_lines(tree: &TextBlock) -> Vec<Line> {
    let mut out = Vec::new();
    for leaf in tree.leaves() {
        if let TextBlock::Leaf { glyphs, .. } = leaf {
            out.extend(lines_from_leaf(glyphs));
        }
    }
    out
}

/// Options controlling how [`super::TextExtractor`] reconstructs layout.
#[derive(Debug, Clone)]
pub struct TextLayoutOptions {
    /// Emit a fixed-pitch character grid instead of natural paragraph text.
    pub physical_layout: bool,
    /// Target column width for physical layout, in characters (0 = auto from page width).
    pub physical_layout_width: usize,
    /// Substitute ActualText marked-content replacement text for its
    /// underlying glyph run when present.
    pub use_actual_text: bool,
    /// Retain glyphs whose bbox was fully clipped away and reinsert them
    /// into the line they visually overlap, instead of discarding them.
    pub keep_tiny_chars: bool,
}

impl Default for TextLayoutOptions {
    fn default() -> Self {
        TextLayoutOptions {
            physical_layout: false,
            physical_layout_width: 0,
            use_actual_text: true,
            keep_tiny_chars: false,
        }
    }
}

/// Render paragraphs onto a fixed-pitch character grid by mapping each
/// word's `xmin` to a column proportional to page width.
pub fn physical_layout(paragraphs: &[Paragraph], page_width: f64, page_height: f64, columns: usize) -> String {
    if paragraphs.is_empty() || page_width <= 0.0 || page_height <= 0.0 {
        return String::new();
    }
    let cols = if columns == 0 { 120 } else { columns };

    let mut all_lines: Vec<&Line> = paragraphs.iter().flat_map(|p| &p.lines).collect();
    all_lines.sort_by(|a, b| b.bbox[1].partial_cmp(&a.bbox[1]).unwrap());

    let avg_line_height = {
        let total: f64 = all_lines.iter().map(|l| (l.bbox[3] - l.bbox[1]).max(1.0)).sum();
        (total / all_lines.len().max(1) as f64).max(1.0)
    };
    let rows = (page_height / avg_line_height).ceil() as usize + 1;

    let mut grid: Vec<Vec<char>> = vec![vec![' '; cols]; rows];
    for line in &all_lines {
        let row = (((page_height - line.bbox[3]) / avg_line_height) as usize).min(rows - 1);
        for word in &line.words {
            let col = (((word.bbox[0] / page_width) * cols as f64) as usize).min(cols.saturating_sub(1));
            for (i, ch) in word.text.chars().enumerate() {
                if col + i < cols {
                    grid[row][col + i] = ch;
                }
            }
        }
    }

    grid.into_iter()
        .map(|row| row.into_iter().collect::<String>().trim_end().to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns true when `tag` denotes a node whose children read top-to-bottom
/// as independent stories rather than side-by-side columns of one story.
pub fn is_story_break(tag: BlockTag) -> bool {
    matches!(tag, BlockTag::Multicolumn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(x: f64, y: f64, size: f64, ch: char) -> Glyph {
        Glyph {
            font_ref: "F1".into(),
            size,
            bbox: [x, y, x + size * 0.6, y + size],
            unicode: ch,
            char_pos_in_stream: 0,
            n_bytes: 1,
            rotation: 0,
            clipped: false,
            invisible: false,
        }
    }

    #[test]
    fn adjacent_glyphs_form_one_word() {
        let glyphs = vec![glyph(0.0, 0.0, 10.0, 'h'), glyph(6.0, 0.0, 10.0, 'i')];
        let lines = lines_from_leaf(&glyphs);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].words.len(), 1);
        assert_eq!(lines[0].words[0].text, "hi");
    }

    #[test]
    fn wide_gap_splits_words() {
        let glyphs = vec![glyph(0.0, 0.0, 10.0, 'h'), glyph(60.0, 0.0, 10.0, 'i')];
        let lines = lines_from_leaf(&glyphs);
        assert_eq!(lines[0].words.len(), 2);
    }

    #[test]
    fn distinct_rows_form_distinct_lines() {
        let glyphs = vec![glyph(0.0, 100.0, 10.0, 'a'), glyph(0.0, 0.0, 10.0, 'b')];
        let lines = lines_from_leaf(&glyphs);
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn paragraph_break_on_large_gap() {
        let l1 = Line { words: vec![], bbox: [0.0, 90.0, 10.0, 100.0] };
        let l2 = Line { words: vec![], bbox: [0.0, 78.0, 10.0, 88.0] };
        let l3 = Line { words: vec![], bbox: [0.0, 20.0, 10.0, 30.0] };
        let paragraphs = group_paragraphs(vec![l1, l2, l3]);
        assert_eq!(paragraphs.len(), 2);
    }
}
