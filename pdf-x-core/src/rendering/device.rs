//! Device trait for rendering backend abstraction.
//!
//! This module defines the Device trait, which abstracts the rendering backend.
//! This allows different rendering implementations (e.g., CPU rendering, GPU rendering,
//! image export) without changing the content stream interpretation logic.

use super::graphics_state::{Color, FillRule, StrokeProps};
use crate::core::error::PDFResult;
use crate::core::parser::PDFObject;

/// How to draw a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathDrawMode {
    /// Fill the path
    Fill(FillRule),
    /// Stroke the path outline
    Stroke,
    /// Fill and stroke the path
    FillStroke(FillRule),
}

/// Paint for drawing operations.
///
/// Represents how a shape should be filled/stroked. Patterns and shadings
/// are resolved above this layer: [`super::RenderingContext`] expands a
/// tiling pattern into per-tile `draw_path` calls and a shading pattern
/// into `*_shaded_fill` regions, so by the time a `Paint`
/// reaches the device it is always a flat color.
#[derive(Debug, Clone)]
pub enum Paint {
    /// Solid color
    Solid(Color),
}

impl Paint {
    /// Create a solid black paint.
    pub fn black() -> Self {
        Paint::Solid(Color::black())
    }

    /// Create a solid white paint.
    pub fn white() -> Self {
        Paint::Solid(Color::white())
    }

    /// Create a solid paint from a color.
    pub fn from_color(color: Color) -> Self {
        Paint::Solid(color)
    }
}

impl Default for Paint {
    fn default() -> Self {
        Paint::black()
    }
}

/// Image data for rendering.
///
/// This represents image data that can be drawn by a device.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Image data (RGB or RGBA)
    pub data: Vec<u8>,
    /// Whether the image has an alpha channel
    pub has_alpha: bool,
    /// Bits per component
    pub bits_per_component: u8,
}

/// A device that can render PDF drawing operations.
///
/// This trait abstracts the rendering backend, allowing different implementations
/// for different use cases (screen display, image export, GPU rendering, etc.).
///
/// The design follows the Device trait from hayro, which is inspired by PDF.js's
/// operator execution pattern.
pub trait Device {
    /// Begin a new path.
    fn begin_path(&mut self);

    /// Move the current point to (x, y) starting a new subpath.
    fn move_to(&mut self, x: f64, y: f64);

    /// Add a straight line segment from the current point to (x, y).
    fn line_to(&mut self, x: f64, y: f64);

    /// Add a cubic BÃ©zier curve from the current point.
    ///
    /// # Arguments
    /// * `cp1x, cp1y` - First control point
    /// * `cp2x, cp2y` - Second control point
    /// * `x, y` - End point
    fn curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64);

    /// Add a rectangle to the path.
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Close the current subpath.
    fn close_path(&mut self);

    /// Draw the current path.
    ///
    /// # Arguments
    /// * `mode` - How to draw the path (fill, stroke, or both)
    /// * `paint` - The paint/color to use
    /// * `stroke_props` - Stroke properties (only used for stroking)
    fn draw_path(
        &mut self,
        mode: PathDrawMode,
        paint: &Paint,
        stroke_props: &StrokeProps,
    ) -> PDFResult<()>;

    /// Set a clipping path.
    ///
    /// Subsequent drawing operations will be clipped to this path.
    ///
    /// # Arguments
    /// * `rule` - Fill rule to use for the clipping path
    fn clip_path(&mut self, rule: FillRule) -> PDFResult<()>;

    /// Save the graphics state.
    fn save_state(&mut self);

    /// Restore the graphics state.
    fn restore_state(&mut self);

    /// Concatenate a transformation matrix to the current CTM.
    ///
    /// # Arguments
    /// * `matrix` - 6-element array [a b c d e f] representing the transform
    fn concat_matrix(&mut self, matrix: &[f64; 6]);

    /// Set the transformation matrix.
    ///
    /// # Arguments
    /// * `matrix` - 6-element array [a b c d e f] representing the transform
    fn set_matrix(&mut self, matrix: &[f64; 6]);

    /// Draw text at the current position.
    ///
    /// # Arguments
    /// * `text_bytes` - Raw text bytes using the font's encoding (NOT UTF-8)
    /// * `font_name` - Name of the font to use
    /// * `font_size` - Font size in points
    /// * `paint` - The paint/color to use
    /// * `text_matrix` - Text transformation matrix (for positioning text in user space)
    /// * `horizontal_scaling` - Horizontal text scaling as percentage (default: 100.0)
    /// * `char_spacing` - Additional spacing (`Tc`) added after every glyph, in unscaled text space units
    /// * `word_spacing` - Additional spacing (`Tw`) added after single-byte code 32 only, in unscaled text space units
    /// * `text_rise` - Text rise in user space units (for superscript/subscript)
    ///
    /// # Returns
    /// The total rendered width in text space units
    fn draw_text(
        &mut self,
        text_bytes: &[u8],
        font_name: &str,
        font_size: f64,
        paint: &Paint,
        text_matrix: &[f64; 6],
        horizontal_scaling: f64,
        char_spacing: f64,
        word_spacing: f64,
        text_rise: f64,
    ) -> PDFResult<f64>;

    /// Draw an image.
    ///
    /// # Arguments
    /// * `image` - The image data
    /// * `transform` - Transformation matrix for placing the image
    fn draw_image(&mut self, image: ImageData, transform: &[f64; 6]) -> PDFResult<()>;

    /// Get the current page bounds.
    ///
    /// Returns (width, height) in user space units.
    fn page_bounds(&self) -> (f64, f64);

    /// Load font data for rendering.
    ///
    /// This method allows loading font data (TrueType, CFF, etc.) for text rendering.
    /// Devices that don't support text rendering can ignore this.
    ///
    /// # Arguments
    /// * `name` - The font name/identifier (e.g., "F1", "Helvetica")
    /// * `data` - Raw font data
    /// * `encoding` - Optional PDF Encoding dictionary for custom glyph name mappings
    ///
    /// # Returns
    /// Ok(()) if successful, or an error if loading failed
    fn load_font_data(
        &mut self,
        name: &str,
        data: Vec<u8>,
        encoding: Option<&PDFObject>,
    ) -> PDFResult<()> {
        // Default implementation ignores font loading
        // (for devices that don't support text rendering)
        let _ = name;
        let _ = data;
        let _ = encoding;
        Ok(())
    }

    // ========================================================================
    // Image mask / soft-mask dispatch
    // ========================================================================

    /// Draw a stencil-mask image: 1 bit per sample, painted in the current
    /// fill color wherever the (possibly `Decode`-inverted) mask bit is set.
    fn draw_image_mask(&mut self, _image: ImageData, _paint: &Paint, _transform: &[f64; 6]) -> PDFResult<()> {
        Ok(())
    }

    /// Draw an image with an explicit stencil `/Mask` stream.
    fn draw_masked_image(&mut self, image: ImageData, _mask: ImageData, transform: &[f64; 6]) -> PDFResult<()> {
        self.draw_image(image, transform)
    }

    /// Draw an image with an `/SMask` (soft mask) applied as per-pixel alpha.
    fn draw_soft_masked_image(&mut self, image: ImageData, _soft_mask: ImageData, transform: &[f64; 6]) -> PDFResult<()> {
        self.draw_image(image, transform)
    }

    /// Install an image mask as the current soft mask (used by
    /// `setSoftMaskFromImageMask` in PDF readers implementing SMask via
    /// an auxiliary image-mask group).
    fn set_soft_mask_from_image_mask(&mut self, _mask: ImageData) -> PDFResult<()> {
        Ok(())
    }

    // ========================================================================
    // Shading dispatch
    // ========================================================================

    /// Whether this backend wants `sh`/shading-pattern fills routed through
    /// `*_shaded_fill`. Devices that return `false` get shadings approximated
    /// via `drawImage`/flat fills by the interpreter instead.
    fn use_shaded_fills(&self) -> bool {
        false
    }

    /// Paint pre-subdivided function-shading quads (already mapped through the CTM).
    fn function_shaded_fill(&mut self, _regions: &[crate::rendering::shading::ShadedRegion]) -> PDFResult<()> {
        Ok(())
    }

    /// Paint pre-subdivided axial-shading segments (already mapped through the CTM).
    fn axial_shaded_fill(&mut self, _regions: &[crate::rendering::shading::ShadedRegion]) -> PDFResult<()> {
        Ok(())
    }

    /// Paint pre-subdivided radial-shading annuli (already mapped through the CTM).
    fn radial_shaded_fill(&mut self, _regions: &[crate::rendering::shading::ShadedRegion]) -> PDFResult<()> {
        Ok(())
    }

    // ========================================================================
    // Transparency groups & soft masks
    // ========================================================================

    /// Begin a transparency group (isolated/knockout per the form's `/Group` dict).
    fn begin_transparency_group(&mut self, _isolated: bool, _knockout: bool) -> PDFResult<()> {
        Ok(())
    }

    /// End the most recently begun transparency group.
    fn end_transparency_group(&mut self) -> PDFResult<()> {
        Ok(())
    }

    /// Composite the group's accumulated buffer onto the page.
    fn paint_transparency_group(&mut self) -> PDFResult<()> {
        Ok(())
    }

    /// Install a soft mask produced by a luminosity/alpha transparency group.
    fn set_soft_mask(&mut self) -> PDFResult<()> {
        Ok(())
    }

    /// Remove the current soft mask.
    fn clear_soft_mask(&mut self) -> PDFResult<()> {
        Ok(())
    }

    /// Flush buffered output. Called periodically by the interpreter during
    /// long content streams (every `operators_per_flush` dispatches) so a
    /// streaming backend can emit partial output instead of buffering an
    /// entire page. No-op by default.
    fn flush(&mut self) -> PDFResult<()> {
        Ok(())
    }

    // ========================================================================
    // Capability queries
    // ========================================================================

    /// Whether the backend needs non-text marking operators dispatched at all
    /// (text-only extractors can answer `false` to skip path/image work).
    fn need_non_text(&self) -> bool {
        true
    }

    /// Whether the backend wants a running character count (some text
    /// extractors use it to bound output size).
    fn need_char_count(&self) -> bool {
        false
    }

    /// Whether Type-3 glyph procedures should be interpreted as content
    /// streams (`true`) or skipped as opaque (`false`).
    fn interpret_type3_chars(&self) -> bool {
        true
    }

    /// Whether form XObjects should be forwarded to the backend as
    /// `drawForm` calls (tiling-pattern tile synthesis) instead of inlined
    /// by the interpreter.
    fn use_draw_form(&self) -> bool {
        false
    }

    /// Whether tiling-pattern fills should be delegated to the backend's
    /// own tiler instead of the interpreter enumerating tile indices.
    fn use_tiling_pattern_fill(&self) -> bool {
        false
    }

    /// Whether the backend's device space has Y increasing downward
    /// (rasterizers) rather than upward (PDF user space default).
    fn upside_down(&self) -> bool {
        false
    }

    // ========================================================================
    // ActualText
    // ========================================================================

    /// A `BDC /Span << /ActualText (...) >>` window opened. Backends that
    /// reconstruct text substitute `text` for the glyphs shown until the
    /// matching `end_actual_text`.
    fn begin_actual_text(&mut self, _text: &str) {}

    /// The matching `EMC` for the most recently opened ActualText window.
    fn end_actual_text(&mut self) {}
}

/// Forwards every `Device` call through a mutable reference, letting
/// `RenderingContext<&mut D>` borrow a device the caller still owns -- the
/// interpreter is generic over any capability implementation, including one
/// borrowed for the duration of a page.
impl<T: Device + ?Sized> Device for &mut T {
    fn begin_path(&mut self) {
        (**self).begin_path()
    }
    fn move_to(&mut self, x: f64, y: f64) {
        (**self).move_to(x, y)
    }
    fn line_to(&mut self, x: f64, y: f64) {
        (**self).line_to(x, y)
    }
    fn curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        (**self).curve_to(cp1x, cp1y, cp2x, cp2y, x, y)
    }
    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        (**self).rect(x, y, width, height)
    }
    fn close_path(&mut self) {
        (**self).close_path()
    }
    fn draw_path(&mut self, mode: PathDrawMode, paint: &Paint, stroke_props: &StrokeProps) -> PDFResult<()> {
        (**self).draw_path(mode, paint, stroke_props)
    }
    fn clip_path(&mut self, rule: FillRule) -> PDFResult<()> {
        (**self).clip_path(rule)
    }
    fn save_state(&mut self) {
        (**self).save_state()
    }
    fn restore_state(&mut self) {
        (**self).restore_state()
    }
    fn concat_matrix(&mut self, matrix: &[f64; 6]) {
        (**self).concat_matrix(matrix)
    }
    fn set_matrix(&mut self, matrix: &[f64; 6]) {
        (**self).set_matrix(matrix)
    }
    fn draw_text(
        &mut self,
        text_bytes: &[u8],
        font_name: &str,
        font_size: f64,
        paint: &Paint,
        text_matrix: &[f64; 6],
        horizontal_scaling: f64,
        char_spacing: f64,
        word_spacing: f64,
        text_rise: f64,
    ) -> PDFResult<f64> {
        (**self).draw_text(text_bytes, font_name, font_size, paint, text_matrix, horizontal_scaling, char_spacing, word_spacing, text_rise)
    }
    fn draw_image(&mut self, image: ImageData, transform: &[f64; 6]) -> PDFResult<()> {
        (**self).draw_image(image, transform)
    }
    fn flush(&mut self) -> PDFResult<()> {
        (**self).flush()
    }
    fn page_bounds(&self) -> (f64, f64) {
        (**self).page_bounds()
    }
    fn load_font_data(&mut self, name: &str, data: Vec<u8>, encoding: Option<&PDFObject>) -> PDFResult<()> {
        (**self).load_font_data(name, data, encoding)
    }
    fn draw_image_mask(&mut self, image: ImageData, paint: &Paint, transform: &[f64; 6]) -> PDFResult<()> {
        (**self).draw_image_mask(image, paint, transform)
    }
    fn draw_masked_image(&mut self, image: ImageData, mask: ImageData, transform: &[f64; 6]) -> PDFResult<()> {
        (**self).draw_masked_image(image, mask, transform)
    }
    fn draw_soft_masked_image(&mut self, image: ImageData, soft_mask: ImageData, transform: &[f64; 6]) -> PDFResult<()> {
        (**self).draw_soft_masked_image(image, soft_mask, transform)
    }
    fn set_soft_mask_from_image_mask(&mut self, mask: ImageData) -> PDFResult<()> {
        (**self).set_soft_mask_from_image_mask(mask)
    }
    fn use_shaded_fills(&self) -> bool {
        (**self).use_shaded_fills()
    }
    fn function_shaded_fill(&mut self, regions: &[crate::rendering::shading::ShadedRegion]) -> PDFResult<()> {
        (**self).function_shaded_fill(regions)
    }
    fn axial_shaded_fill(&mut self, regions: &[crate::rendering::shading::ShadedRegion]) -> PDFResult<()> {
        (**self).axial_shaded_fill(regions)
    }
    fn radial_shaded_fill(&mut self, regions: &[crate::rendering::shading::ShadedRegion]) -> PDFResult<()> {
        (**self).radial_shaded_fill(regions)
    }
    fn begin_transparency_group(&mut self, isolated: bool, knockout: bool) -> PDFResult<()> {
        (**self).begin_transparency_group(isolated, knockout)
    }
    fn end_transparency_group(&mut self) -> PDFResult<()> {
        (**self).end_transparency_group()
    }
    fn paint_transparency_group(&mut self) -> PDFResult<()> {
        (**self).paint_transparency_group()
    }
    fn set_soft_mask(&mut self) -> PDFResult<()> {
        (**self).set_soft_mask()
    }
    fn clear_soft_mask(&mut self) -> PDFResult<()> {
        (**self).clear_soft_mask()
    }
    fn need_non_text(&self) -> bool {
        (**self).need_non_text()
    }
    fn need_char_count(&self) -> bool {
        (**self).need_char_count()
    }
    fn interpret_type3_chars(&self) -> bool {
        (**self).interpret_type3_chars()
    }
    fn use_draw_form(&self) -> bool {
        (**self).use_draw_form()
    }
    fn use_tiling_pattern_fill(&self) -> bool {
        (**self).use_tiling_pattern_fill()
    }
    fn upside_down(&self) -> bool {
        (**self).upside_down()
    }
    fn begin_actual_text(&mut self, text: &str) {
        (**self).begin_actual_text(text)
    }
    fn end_actual_text(&mut self) {
        (**self).end_actual_text()
    }
}

/// A simple CPU-based device implementation for testing.
///
/// This is a minimal implementation that records drawing operations
/// but doesn't actually produce visual output. It's useful for testing
/// and as a reference implementation.
#[derive(Debug, Default)]
pub struct TestDevice {
    /// Page width in user space units
    page_width: f64,
    /// Page height in user space units
    page_height: f64,
    /// Graphics state stack
    state_stack: Vec<TestGraphicsState>,
    /// Recorded operations for testing
    operations: Vec<String>,
}

#[derive(Debug, Clone)]
struct TestGraphicsState {
    ctm: [f64; 6],
    stroke_color: Color,
    fill_color: Color,
}

impl Default for TestGraphicsState {
    fn default() -> Self {
        TestGraphicsState {
            ctm: [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
            stroke_color: Color::black(),
            fill_color: Color::black(),
        }
    }
}

impl TestDevice {
    /// Create a new test device with the given page dimensions.
    pub fn new(width: f64, height: f64) -> Self {
        TestDevice {
            page_width: width,
            page_height: height,
            state_stack: vec![TestGraphicsState::default()],
            operations: Vec::new(),
        }
    }

    /// Get the recorded operations.
    pub fn operations(&self) -> &[String] {
        &self.operations
    }

    /// Clear the recorded operations.
    pub fn clear_operations(&mut self) {
        self.operations.clear();
    }
}

impl Device for TestDevice {
    fn begin_path(&mut self) {
        self.operations.push("begin_path".to_string());
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.operations.push(format!("move_to({},{})", x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.operations.push(format!("line_to({},{})", x, y));
    }

    fn curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.operations.push(format!(
            "curve_to({},{},{},{},{},{})",
            cp1x, cp1y, cp2x, cp2y, x, y
        ));
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.operations
            .push(format!("rect({},{},{},{})", x, y, width, height));
    }

    fn close_path(&mut self) {
        self.operations.push("close_path".to_string());
    }

    fn draw_path(
        &mut self,
        mode: PathDrawMode,
        _paint: &Paint,
        _stroke_props: &StrokeProps,
    ) -> PDFResult<()> {
        match mode {
            PathDrawMode::Fill(rule) => {
                self.operations.push(format!("draw_path(fill, {:?})", rule));
            }
            PathDrawMode::Stroke => {
                self.operations.push("draw_path(stroke)".to_string());
            }
            PathDrawMode::FillStroke(rule) => {
                self.operations
                    .push(format!("draw_path(fill_stroke, {:?})", rule));
            }
        }
        Ok(())
    }

    fn clip_path(&mut self, rule: FillRule) -> PDFResult<()> {
        self.operations.push(format!("clip_path({:?})", rule));
        Ok(())
    }

    fn save_state(&mut self) {
        let current = self.state_stack.last().unwrap().clone();
        self.state_stack.push(current);
        self.operations.push("save_state".to_string());
    }

    fn restore_state(&mut self) {
        if self.state_stack.len() > 1 {
            self.state_stack.pop();
        }
        self.operations.push("restore_state".to_string());
    }

    fn concat_matrix(&mut self, matrix: &[f64; 6]) {
        if let Some(state) = self.state_stack.last_mut() {
            // Concatenate matrix (simplified)
            let [a, b, c, d, e, f] = *matrix;
            let [ctm_a, ctm_b, ctm_c, ctm_d, ctm_e, ctm_f] = state.ctm;
            state.ctm = [
                ctm_a * a + ctm_c * b,
                ctm_b * a + ctm_d * b,
                ctm_a * c + ctm_c * d,
                ctm_b * c + ctm_d * d,
                ctm_a * e + ctm_c * f + ctm_e,
                ctm_b * e + ctm_d * f + ctm_f,
            ];
        }
        self.operations.push(format!("concat_matrix({:?})", matrix));
    }

    fn set_matrix(&mut self, matrix: &[f64; 6]) {
        if let Some(state) = self.state_stack.last_mut() {
            state.ctm = *matrix;
        }
        self.operations.push(format!("set_matrix({:?})", matrix));
    }

    fn draw_text(
        &mut self,
        text_bytes: &[u8],
        font_name: &str,
        font_size: f64,
        _paint: &Paint,
        _text_matrix: &[f64; 6],
        _horizontal_scaling: f64,
        char_spacing: f64,
        word_spacing: f64,
        _text_rise: f64,
    ) -> PDFResult<f64> {
        self.operations.push(format!(
            "draw_text({}, {}, {:?})",
            font_name, font_size, text_bytes
        ));
        // Return approximate width for testing: 500/1000 em per byte plus spacing
        let mut width = 0.0;
        for &b in text_bytes {
            width += 500.0 * font_size / 1000.0 + char_spacing;
            if b == 0x20 {
                width += word_spacing;
            }
        }
        Ok(width)
    }

    fn draw_image(&mut self, image: ImageData, transform: &[f64; 6]) -> PDFResult<()> {
        self.operations.push(format!(
            "draw_image({}x{}, {:?})",
            image.width, image.height, transform
        ));
        Ok(())
    }

    fn page_bounds(&self) -> (f64, f64) {
        (self.page_width, self.page_height)
    }
}
