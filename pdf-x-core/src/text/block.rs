//! The recursive text-block partition tree: glyphs are split into a tree of
//! lines, columns, and multicolumn regions, then tagged post-order.
//!
//! Glyphs belonging to one rotation are recursively cut along the largest
//! whitespace gap -- alternating between a horizontal cut (stacking lines)
//! and a vertical cut (separating columns) -- until a region holds the
//! glyphs of a single line. Each node is then tagged `Line`, `Column`, or
//! `Multicolumn` in a post-order pass.

use super::glyph::Glyph;

/// Tag assigned to a [`TextBlock`] node during post-order classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockTag {
    Line,
    Column,
    Multicolumn,
}

/// A node of the recursive partition tree.
#[derive(Debug, Clone)]
pub enum TextBlock {
    /// A terminal node: the glyphs of (approximately) one line.
    Leaf { bbox: [f64; 4], rotation: u8, tag: BlockTag, glyphs: Vec<Glyph> },
    /// A split node, cut horizontally (stacking lines top-to-bottom) or
    /// vertically (side-by-side columns).
    Split { bbox: [f64; 4], rotation: u8, tag: BlockTag, horizontal: bool, children: Vec<TextBlock> },
}

impl TextBlock {
    pub fn bbox(&self) -> [f64; 4] {
        match self {
            TextBlock::Leaf { bbox, .. } => *bbox,
            TextBlock::Split { bbox, .. } => *bbox,
        }
    }

    pub fn tag(&self) -> BlockTag {
        match self {
            TextBlock::Leaf { tag, .. } => *tag,
            TextBlock::Split { tag, .. } => *tag,
        }
    }

    pub fn set_tag(&mut self, new_tag: BlockTag) {
        match self {
            TextBlock::Leaf { tag, .. } => *tag = new_tag,
            TextBlock::Split { tag, .. } => *tag = new_tag,
        }
    }

    /// All leaves in the tree, left-to-right / top-to-bottom per their split order.
    pub fn leaves(&self) -> Vec<&TextBlock> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a TextBlock>) {
        match self {
            TextBlock::Leaf { .. } => out.push(self),
            TextBlock::Split { children, .. } => {
                for c in children {
                    c.collect_leaves(out);
                }
            }
        }
    }
}

fn union_bbox(glyphs: &[Glyph]) -> [f64; 4] {
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

struct GapStats {
    /// Length of the largest contiguous empty run, in coordinate units.
    size: f64,
    /// Position (coordinate) the gap starts at.
    start: f64,
    /// Number of gaps within 20% of `avg_font_size` of the largest.
    count_near_largest: u32,
}

/// Build an occupancy profile over `axis` (true = Y, false = X), adjusting
/// each glyph's vertical extent (top trimmed to 0.875·height, bottom trimmed
/// to 0.04·height, to tolerate slight descender/ascender overlap between
/// adjacent lines).
fn occupancy_gap(glyphs: &[Glyph], precision: f64, avg_font_size: f64, vertical_axis: bool) -> GapStats {
    if glyphs.is_empty() || precision <= 0.0 {
        return GapStats { size: 0.0, start: 0.0, count_near_largest: 0 };
    }

    let extent = |g: &Glyph| -> (f64, f64) {
        if vertical_axis {
            let h = g.height();
            (g.ymin() + 0.04 * h, g.ymin() + 0.875 * h)
        } else {
            (g.xmin(), g.xmax())
        }
    };

    let mut min_c = f64::INFINITY;
    let mut max_c = f64::NEG_INFINITY;
    for g in glyphs {
        let (lo, hi) = extent(g);
        min_c = min_c.min(lo);
        max_c = max_c.max(hi);
    }
    if !(max_c > min_c) {
        return GapStats { size: 0.0, start: min_c, count_near_largest: 0 };
    }

    let n = ((max_c - min_c) / precision).ceil() as usize + 2;
    let mut profile = vec![0u32; n];
    for g in glyphs {
        let (lo, hi) = extent(g);
        let i0 = ((lo - min_c) / precision).floor().max(0.0) as usize;
        let i1 = (((hi - min_c) / precision).floor() as usize).min(n - 1);
        for slot in profile.iter_mut().take(i1 + 1).skip(i0) {
            *slot += 1;
        }
    }

    // Find all maximal zero-runs.
    let mut gaps: Vec<(usize, usize)> = Vec::new(); // (start_idx, len)
    let mut run_start: Option<usize> = None;
    for (i, &count) in profile.iter().enumerate() {
        if count == 0 {
            if run_start.is_none() {
                run_start = Some(i);
            }
        } else if let Some(s) = run_start.take() {
            gaps.push((s, i - s));
        }
    }
    if let Some(s) = run_start {
        gaps.push((s, profile.len() - s));
    }

    if gaps.is_empty() {
        return GapStats { size: 0.0, start: min_c, count_near_largest: 0 };
    }

    let (best_start, best_len) = *gaps.iter().max_by_key(|(_, len)| *len).unwrap();
    let best_size = best_len as f64 * precision;
    let tolerance = 0.2 * avg_font_size;
    let count_near_largest = gaps
        .iter()
        .filter(|(_, len)| (*len as f64 * precision - best_size).abs() <= tolerance || *len as f64 * precision >= best_size)
        .count() as u32;

    GapStats { size: best_size, start: min_c + best_start as f64 * precision, count_near_largest }
}

const MIN_GAP_THRESHOLD_UNITS: f64 = 1.0;
const MAX_GAP_THRESHOLD_UNITS: f64 = 3.0;
const LINE_COUNT_SLOPE: f64 = -0.05;

/// Gap threshold in coordinate units, scaled by `avgFontSize/splitPrecision`.
fn gap_threshold(avg_font_size: f64, split_precision: f64, estimated_line_count: f64) -> f64 {
    let unit = avg_font_size / split_precision.max(1e-9);
    let scaled_max = MAX_GAP_THRESHOLD_UNITS + LINE_COUNT_SLOPE * estimated_line_count;
    MIN_GAP_THRESHOLD_UNITS.max(scaled_max) * unit * split_precision
}

enum SplitAxis {
    Horizontal, // cut along Y: stacks regions top/bottom
    Vertical,   // cut along X: separates regions left/right
}

fn choose_split(glyphs: &[Glyph], avg_font_size: f64, split_precision: f64) -> Option<(SplitAxis, f64)> {
    let estimated_line_count = (union_bbox(glyphs)[3] - union_bbox(glyphs)[1]) / avg_font_size.max(1.0);
    let threshold = gap_threshold(avg_font_size, split_precision, estimated_line_count);

    let vert = occupancy_gap(glyphs, split_precision, avg_font_size, true);
    let horiz = occupancy_gap(glyphs, split_precision, avg_font_size, false);

    if vert.count_near_largest > 0 && vert.size > horiz.size && vert.size > threshold {
        Some((SplitAxis::Horizontal, vert.start + vert.size / 2.0))
    } else if horiz.count_near_largest > 0 && horiz.size > threshold {
        Some((SplitAxis::Vertical, horiz.start + horiz.size / 2.0))
    } else {
        None
    }
}

/// Build the recursive partition tree for the glyphs of a single rotation
/// bucket.
pub fn build_split_tree(glyphs: Vec<Glyph>, rotation: u8) -> TextBlock {
    build_node(glyphs, rotation, 0)
}

const MAX_SPLIT_DEPTH: u32 = 64;

fn build_node(glyphs: Vec<Glyph>, rotation: u8, depth: u32) -> TextBlock {
    let bbox = union_bbox(&glyphs);
    if glyphs.len() <= 1 || depth >= MAX_SPLIT_DEPTH {
        return TextBlock::Leaf { bbox, rotation, tag: BlockTag::Line, glyphs };
    }

    let min_font_size = glyphs.iter().map(|g| g.size).fold(f64::INFINITY, f64::min);
    let avg_font_size = glyphs.iter().map(|g| g.size).sum::<f64>() / glyphs.len() as f64;
    let split_precision = (0.05 * min_font_size).max(0.2);

    match choose_split(&glyphs, avg_font_size, split_precision) {
        Some((SplitAxis::Horizontal, cut_y)) => {
            // Strict `<` for the lower region, `<=` for the upper, so a
            // glyph straddling the cut (due to profile rounding) is never
            // dropped entirely.
            let (lower, upper): (Vec<Glyph>, Vec<Glyph>) =
                glyphs.into_iter().partition(|g| g.center_y() < cut_y);
            let mut children = Vec::new();
            if !lower.is_empty() {
                children.push(build_node(lower, rotation, depth + 1));
            }
            if !upper.is_empty() {
                children.push(build_node(upper, rotation, depth + 1));
            }
            if children.len() < 2 {
                return children.pop().unwrap_or(TextBlock::Leaf {
                    bbox,
                    rotation,
                    tag: BlockTag::Line,
                    glyphs: Vec::new(),
                });
            }
            // Top-to-bottom reading order: larger Y first (PDF user space).
            children.sort_by(|a, b| b.bbox()[1].partial_cmp(&a.bbox()[1]).unwrap());
            TextBlock::Split { bbox, rotation, tag: BlockTag::Multicolumn, horizontal: true, children }
        }
        Some((SplitAxis::Vertical, cut_x)) => {
            let (left, right): (Vec<Glyph>, Vec<Glyph>) = glyphs.into_iter().partition(|g| {
                let cx = (g.xmin() + g.xmax()) / 2.0;
                cx <= cut_x
            });
            let mut children = Vec::new();
            if !left.is_empty() {
                children.push(build_node(left, rotation, depth + 1));
            }
            if !right.is_empty() {
                children.push(build_node(right, rotation, depth + 1));
            }
            if children.len() < 2 {
                return children.pop().unwrap_or(TextBlock::Leaf {
                    bbox,
                    rotation,
                    tag: BlockTag::Line,
                    glyphs: Vec::new(),
                });
            }
            children.sort_by(|a, b| a.bbox()[0].partial_cmp(&b.bbox()[0]).unwrap());
            TextBlock::Split { bbox, rotation, tag: BlockTag::Multicolumn, horizontal: false, children }
        }
        None => TextBlock::Leaf { bbox, rotation, tag: BlockTag::Line, glyphs },
    }
}

/// Post-order tag classification.
pub fn classify_tags(node: &mut TextBlock) {
    if let TextBlock::Split { children, horizontal, tag, .. } = node {
        for child in children.iter_mut() {
            classify_tags(child);
        }
        let all_line_or_column = children.iter().all(|c| matches!(c.tag(), BlockTag::Line | BlockTag::Column));
        *tag = if *horizontal && all_line_or_column && children.len() >= 2 {
            BlockTag::Column
        } else {
            BlockTag::Multicolumn
        };
    }
}

/// Max gap, in multiples of glyph size, between a clipped glyph's left edge
/// and a leaf's right edge for the glyph to still be considered part of
/// that leaf's line.
const CLIPPED_TEXT_MAX_WORD_SPACE: f64 = 0.5;

/// Reinsert glyphs that were fully outside the clip path (retained only
/// when `keep_tiny_chars` is set) into the line they visually belong to:
/// the leaf whose vertical range brackets the glyph's Y center and whose
/// right edge is within `CLIPPED_TEXT_MAX_WORD_SPACE * size` of the
/// glyph's left edge. Glyphs with no matching leaf are dropped.
pub fn insert_clipped_chars(tree: &mut TextBlock, mut clipped: Vec<Glyph>) {
    clipped.sort_by(|a, b| a.xmin().partial_cmp(&b.xmin()).unwrap());
    for g in clipped {
        let y = g.center_y();
        if let Some(glyphs) = find_clipped_char_leaf_glyphs(tree, y, g.xmin(), g.size) {
            glyphs.push(g);
        }
    }
}

fn find_clipped_char_leaf_glyphs<'a>(
    tree: &'a mut TextBlock,
    y: f64,
    xmin: f64,
    size: f64,
) -> Option<&'a mut Vec<Glyph>> {
    match tree {
        TextBlock::Leaf { bbox, glyphs, .. } => {
            if y > bbox[1] && y < bbox[3] && xmin <= bbox[2] + CLIPPED_TEXT_MAX_WORD_SPACE * size {
                Some(glyphs)
            } else {
                None
            }
        }
        TextBlock::Split { children, .. } => {
            for child in children.iter_mut() {
                if let Some(glyphs) = find_clipped_char_leaf_glyphs(child, y, xmin, size) {
                    return Some(glyphs);
                }
            }
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn glyph(x: f64, y: f64, size: f64) -> Glyph {
        Glyph {
            font_ref: "F1".to_string(),
            size,
            bbox: [x, y, x + size * 0.5, y + size],
            unicode: 'x',
            char_pos_in_stream: 0,
            n_bytes: 1,
            rotation: 0,
            clipped: false,
            invisible: false,
        }
    }

    #[test]
    fn single_glyph_is_a_leaf() {
        let tree = build_split_tree(vec![glyph(0.0, 0.0, 12.0)], 0);
        assert!(matches!(tree, TextBlock::Leaf { .. }));
    }

    #[test]
    fn two_columns_split_vertically() {
        let mut glyphs = Vec::new();
        for i in 0..5 {
            glyphs.push(glyph(i as f64 * 6.0, 700.0, 12.0));
        }
        for i in 0..5 {
            glyphs.push(glyph(300.0 + i as f64 * 6.0, 700.0, 12.0));
        }
        let mut tree = build_split_tree(glyphs, 0);
        classify_tags(&mut tree);
        assert_eq!(tree.leaves().len(), 2);
    }

    #[test]
    fn stacked_lines_split_horizontally() {
        let mut glyphs = Vec::new();
        for i in 0..5 {
            glyphs.push(glyph(i as f64 * 6.0, 700.0, 12.0));
        }
        for i in 0..5 {
            glyphs.push(glyph(i as f64 * 6.0, 600.0, 12.0));
        }
        let mut tree = build_split_tree(glyphs, 0);
        classify_tags(&mut tree);
        assert_eq!(tree.leaves().len(), 2);
        assert_eq!(tree.tag(), BlockTag::Column);
    }

    #[test]
    fn clipped_char_joins_leaf_within_word_space() {
        let mut tree = build_split_tree(vec![glyph(0.0, 700.0, 12.0)], 0);
        let clipped = glyph(8.0, 700.0, 12.0);
        insert_clipped_chars(&mut tree, vec![clipped]);
        match &tree {
            TextBlock::Leaf { glyphs, .. } => assert_eq!(glyphs.len(), 2),
            TextBlock::Split { .. } => panic!("expected a leaf"),
        }
    }

    #[test]
    fn clipped_char_outside_word_space_is_dropped() {
        let mut tree = build_split_tree(vec![glyph(0.0, 700.0, 12.0)], 0);
        let clipped = glyph(50.0, 700.0, 12.0);
        insert_clipped_chars(&mut tree, vec![clipped]);
        match &tree {
            TextBlock::Leaf { glyphs, .. } => assert_eq!(glyphs.len(), 1),
            TextBlock::Split { .. } => panic!("expected a leaf"),
        }
    }
}
