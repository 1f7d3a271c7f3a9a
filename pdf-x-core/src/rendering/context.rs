//! Rendering context for processing PDF content streams.
//!
//! This module provides the RenderingContext, which coordinates:
//! - Graphics state stack (save/restore)
//! - Current path being constructed
//! - Device for rendering operations
//! - Processing of content stream operators, including XObject/shading/pattern
//!   dispatch

use super::device::{Device, ImageData};
use super::graphics_state::{Color, FillRule, GraphicsState};
use super::options::RenderOptions;
use super::path::Path;
use super::shading::{evaluate_shading, Shading, ShadedRegion, ShadingKind};
use super::{Paint, PathDrawMode};
use crate::core::content_stream::{OpCode, Operation};
use crate::core::error::{PDFError, PDFResult};
use crate::core::parser::PDFObject;
use crate::core::xref::XRef;
use std::collections::{HashMap, HashSet};

/// Rendering context for processing PDF content streams.
///
/// The context maintains the graphics state stack, current path, and device
/// for rendering. It processes content stream operations and forwards them
/// to the device.
///
/// This follows the same pattern as PDF.js's CanvasGraphics and hayro's Context.
pub struct RenderingContext<D: Device> {
    /// The device for rendering
    device: D,

    /// Graphics state stack
    state_stack: Vec<GraphicsState>,

    /// Current path being constructed
    current_path: Path,

    /// Clip path stack (for nesting)
    clip_stack: Vec<FillRule>,

    /// Whether we're in a text object (BT...ET)
    in_text_object: bool,

    /// Resource dictionary stack (page-level at index 0, one extra per
    /// nested form XObject). Used to resolve XObject/Pattern/Shading/
    /// ExtGState/Font names encountered in the content stream.
    resources_stack: Vec<PDFObject>,

    /// Current form-XObject recursion depth.
    form_depth: u32,

    /// Indirect-reference keys (`"num+generation"`) of forms currently on
    /// the call stack, for cycle detection via content-stream reference numbers.
    active_forms: HashSet<String>,

    /// Marked-content nesting: `Some(true)` marks a `BDC /Span <</ActualText ...>>`
    /// window so the matching `EMC` can call `end_actual_text`.
    marked_content_stack: Vec<bool>,

    /// The CTM in effect at the start of the content stream currently being
    /// interpreted (page-level, or the CTM at `Do`-invocation time for a
    /// nested form) -- the pattern base matrix (BTM) against which a
    /// pattern's own `/Matrix` is composed.
    base_ctm_stack: Vec<[f64; 6]>,

    /// Interpretation-loop and text-extraction knobs for this render pass.
    options: RenderOptions,
}

impl<D: Device> RenderingContext<D> {
    /// Create a new rendering context.
    ///
    /// # Arguments
    /// * `device` - The rendering device to use
    /// * `options` - interpretation-loop and layout knobs for this pass
    pub fn new(device: D, options: RenderOptions) -> Self {
        RenderingContext {
            device,
            state_stack: vec![GraphicsState::default()],
            current_path: Path::new(),
            clip_stack: Vec::new(),
            in_text_object: false,
            resources_stack: Vec::new(),
            form_depth: 0,
            active_forms: HashSet::new(),
            marked_content_stack: Vec::new(),
            base_ctm_stack: vec![[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]],
            options,
        }
    }

    /// The options this context was constructed with.
    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Flush the backend's buffered output.
    pub fn flush(&mut self) -> PDFResult<()> {
        self.device.flush()
    }

    /// Install the CTM that a page's patterns treat as their base
    /// transformation matrix. Must be called before
    /// processing any operation if the page's initial CTM isn't the
    /// identity (e.g. a media-box/rotation flip set up by the caller).
    pub fn set_base_ctm(&mut self, ctm: [f64; 6]) {
        self.base_ctm_stack[0] = ctm;
    }

    /// Install the page (or top-level content stream's) resource dictionary.
    /// Must be called before processing any operation that needs to resolve
    /// an XObject, Pattern, Shading, ExtGState, or Font name.
    pub fn set_resources(&mut self, resources: PDFObject) {
        if self.resources_stack.is_empty() {
            self.resources_stack.push(resources);
        } else {
            self.resources_stack[0] = resources;
        }
    }

    /// Get the current graphics state.
    pub fn current_state(&self) -> &GraphicsState {
        self.state_stack.last().expect("Graphics state stack underflow")
    }

    /// Get mutable reference to the current graphics state.
    pub fn current_state_mut(&mut self) -> &mut GraphicsState {
        self.state_stack.last_mut().expect("Graphics state stack underflow")
    }

    /// Get the device.
    pub fn device(&mut self) -> &mut D {
        &mut self.device
    }

    fn current_resources(&self) -> Option<&PDFObject> {
        self.resources_stack.last()
    }

    /// Look up `name` in a named sub-dictionary (`XObject`, `Pattern`,
    /// `Shading`, `ExtGState`, `Font`, ...) of the current resource
    /// dictionary, fetching through `xref` if the entry is indirect.
    fn resolve_resource(&self, xref: &mut XRef, category: &str, name: &str) -> PDFResult<Option<PDFObject>> {
        let resources = match self.current_resources() {
            Some(r) => r,
            None => return Ok(None),
        };
        let resources = xref.fetch_if_ref(resources)?;
        let dict = match &resources {
            PDFObject::Dictionary(d) => d,
            _ => return Ok(None),
        };
        let category_obj = match dict.get(category) {
            Some(c) => xref.fetch_if_ref(c)?,
            None => return Ok(None),
        };
        let category_dict = match &category_obj {
            PDFObject::Dictionary(d) => d,
            _ => return Ok(None),
        };
        match category_dict.get(name) {
            Some(entry) => Ok(Some(xref.fetch_if_ref(entry)?)),
            None => Ok(None),
        }
    }

    /// Process a content stream operation.
    ///
    /// This is the main entry point for interpreting PDF content streams.
    /// It dispatches to appropriate handler methods based on the operator.
    /// `xref` is required to resolve XObjects, patterns, shadings and
    /// ExtGStates named in the current resource dictionary.
    pub fn process_operation(&mut self, op: &Operation, xref: &mut XRef) -> PDFResult<()> {
        let cmd = op.op.to_command();
        if self.options.print_commands {
            eprintln!("{} {:?}", cmd, op.args);
        }
        if let Some(desc) = crate::core::operators::find_op(cmd) {
            if let crate::core::operators::TypeCheckResult::Skip(reason) =
                crate::core::operators::type_check(desc, &op.args)
            {
                eprintln!("Warning: skipping operator {}: {}", cmd, reason);
                return Ok(());
            }
        }

        match op.op {
            // Graphics state operators
            OpCode::Save => self.save()?,
            OpCode::Restore => self.restore()?,
            OpCode::Transform => self.transform(&op.args)?,
            OpCode::SetGState => self.set_gstate(&op.args, xref)?,

            // Path construction operators
            OpCode::MoveTo => self.move_to(&op.args)?,
            OpCode::LineTo => self.line_to(&op.args)?,
            OpCode::CurveTo => self.curve_to(&op.args)?,
            OpCode::CurveTo2 => self.curve_to_2(&op.args)?,
            OpCode::CurveTo3 => self.curve_to_3(&op.args)?,
            OpCode::ClosePath => self.close_path()?,
            OpCode::Rectangle => self.rectangle(&op.args)?,

            // Path painting operators
            OpCode::Stroke => self.stroke()?,
            OpCode::CloseStroke => self.close_and_stroke()?,
            OpCode::Fill => self.fill(FillRule::NonZero, xref)?,
            OpCode::EOFill => self.fill(FillRule::EvenOdd, xref)?,
            OpCode::FillStroke => self.fill_and_stroke(FillRule::NonZero, xref)?,
            OpCode::EOFillStroke => self.fill_and_stroke(FillRule::EvenOdd, xref)?,
            OpCode::CloseFillStroke => self.close_fill_stroke(FillRule::NonZero, xref)?,
            OpCode::CloseEOFillStroke => self.close_fill_stroke(FillRule::EvenOdd, xref)?,
            OpCode::EndPath => self.end_path()?,

            // Clipping operators
            OpCode::Clip => self.clip(FillRule::NonZero)?,
            OpCode::EOClip => self.clip(FillRule::EvenOdd)?,

            // Text object operators
            OpCode::BeginText => self.begin_text()?,
            OpCode::EndText => self.end_text()?,

            // Text showing operators
            OpCode::ShowText => self.show_text(&op.args)?,
            OpCode::ShowSpacedText => self.show_spaced_text(&op.args)?,
            OpCode::NextLineShowText => self.next_line_show_text(&op.args)?,
            OpCode::NextLineSetSpacingShowText => self.next_line_set_spacing_show_text(&op.args)?,

            // Text positioning operators
            OpCode::MoveText => self.move_text(&op.args)?,
            OpCode::SetLeadingMoveText => self.set_leading_move_text(&op.args)?,
            OpCode::SetTextMatrix => self.set_text_matrix(&op.args)?,
            OpCode::NextLine => self.next_line()?,

            // Text state operators
            OpCode::SetFont => self.set_font(&op.args)?,
            OpCode::SetCharSpacing => self.set_char_spacing(&op.args)?,
            OpCode::SetWordSpacing => self.set_word_spacing(&op.args)?,
            OpCode::SetHScale => self.set_horizontal_scaling(&op.args)?,
            OpCode::SetLeading => self.set_leading(&op.args)?,
            OpCode::SetTextRenderingMode => self.set_text_rendering_mode(&op.args)?,
            OpCode::SetTextRise => self.set_text_rise(&op.args)?,

            // Color operators
            OpCode::SetStrokeGray => self.set_stroke_gray(&op.args)?,
            OpCode::SetFillGray => self.set_fill_gray(&op.args)?,
            OpCode::SetStrokeRGBColor => self.set_stroke_rgb(&op.args)?,
            OpCode::SetFillRGBColor => self.set_fill_rgb(&op.args)?,
            OpCode::SetStrokeCMYKColor => self.set_stroke_cmyk(&op.args)?,
            OpCode::SetFillCMYKColor => self.set_fill_cmyk(&op.args)?,
            OpCode::SetStrokeColorSpace => self.set_stroke_color_space(&op.args)?,
            OpCode::SetFillColorSpace => self.set_fill_color_space(&op.args)?,
            OpCode::SetStrokeColor => self.set_stroke_color_n(&op.args)?,
            OpCode::SetStrokeColorN => self.set_stroke_color_n(&op.args)?,
            OpCode::SetFillColor => self.set_fill_color_n(&op.args)?,
            OpCode::SetFillColorN => self.set_fill_color_n(&op.args)?,

            // Line property operators
            OpCode::SetLineWidth => self.set_line_width(&op.args)?,
            OpCode::SetLineCap => self.set_line_cap(&op.args)?,
            OpCode::SetLineJoin => self.set_line_join(&op.args)?,
            OpCode::SetMiterLimit => self.set_miter_limit(&op.args)?,
            OpCode::SetDash => self.set_dash(&op.args)?,

            // XObject operator
            OpCode::PaintXObject => self.paint_xobject(&op.args, xref)?,

            // Shading operator
            OpCode::ShadingFill => self.shading_fill(&op.args, xref)?,

            // Marked content
            OpCode::BeginMarkedContent => self.marked_content_stack.push(false),
            OpCode::BeginMarkedContentProps => self.begin_marked_content_props(&op.args)?,
            OpCode::EndMarkedContent => self.end_marked_content(),
            OpCode::MarkPoint | OpCode::MarkPointProps => {
                // MP/DP carry no persistent state; they're point annotations.
            }

            // Compatibility section markers (BX/EX): unknown operators inside
            // are tolerated either way by our default `_` arm already.
            OpCode::BeginCompat | OpCode::EndCompat => {}

            _ => {
                // Other operators not yet implemented
                // Log warning but don't fail
                eprintln!("Warning: Operator {:?} not yet implemented", op.op);
            }
        }

        Ok(())
    }

    // === Graphics State Operators ===

    fn save(&mut self) -> PDFResult<()> {
        // Save current state
        let saved = self.current_state().save();
        self.state_stack.push(saved);
        self.device.save_state();
        Ok(())
    }

    fn restore(&mut self) -> PDFResult<()> {
        // Restore any clipping paths
        while self.clip_stack.len() >= self.state_stack.len() {
            self.clip_stack.pop();
            // Note: Device doesn't have a pop_clip method in our trait
            // In a full implementation, we'd pop the clip here
        }

        // Restore graphics state
        if self.state_stack.len() > 1 {
            self.state_stack.pop();
            self.device.restore_state();
        }
        Ok(())
    }

    fn transform(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 6 {
            return Err(PDFError::content_stream_error(
                "cm operator requires 6 arguments".to_string(),
            ));
        }

        let mut matrix = [0.0; 6];
        for i in 0..6 {
            if let PDFObject::Number(n) = args[i] {
                matrix[i] = n;
            } else {
                return Err(PDFError::content_stream_error(
                    "cm operator arguments must be numbers".to_string(),
                ));
            }
        }

        self.current_state_mut().concat_matrix(&matrix);
        self.device.concat_matrix(&matrix);
        Ok(())
    }

    /// `gs` - apply an ExtGState resource: `ca`/`CA` (constant alpha) and
    /// `BM` (blend mode) are the entries relevant to painting.
    fn set_gstate(&mut self, args: &[PDFObject], xref: &mut XRef) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "gs operator requires 1 argument".to_string(),
            ));
        }
        let name = match &args[0] {
            PDFObject::Name(n) => n.clone(),
            _ => return Ok(()),
        };

        let gstate = match self.resolve_resource(xref, "ExtGState", &name)? {
            Some(obj) => obj,
            None => return Ok(()),
        };
        let dict = match &gstate {
            PDFObject::Dictionary(d) => d,
            _ => return Ok(()),
        };

        if let Some(ca) = dict.get("ca").and_then(PDFObject::as_number) {
            self.current_state_mut().fill_alpha = ca;
        }
        if let Some(cap) = dict.get("CA").and_then(PDFObject::as_number) {
            self.current_state_mut().stroke_alpha = cap;
        }
        if let Some(PDFObject::Name(bm)) = dict.get("BM") {
            self.current_state_mut().blend_mode = bm.clone();
        } else if let Some(PDFObject::Array(arr)) = dict.get("BM") {
            if let Some(PDFObject::Name(bm)) = arr.first().map(|o| o.as_ref()) {
                self.current_state_mut().blend_mode = bm.clone();
            }
        }

        Ok(())
    }

    // === Path Construction Operators ===

    fn move_to(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 2 {
            return Err(PDFError::content_stream_error(
                "m operator requires 2 arguments".to_string(),
            ));
        }

        let x = extract_number(args, 0)?;
        let y = extract_number(args, 1)?;

        self.current_path.move_to(x, y);
        self.device.move_to(x, y);
        Ok(())
    }

    fn line_to(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 2 {
            return Err(PDFError::content_stream_error(
                "l operator requires 2 arguments".to_string(),
            ));
        }

        let x = extract_number(args, 0)?;
        let y = extract_number(args, 1)?;

        self.current_path.line_to(x, y);
        self.device.line_to(x, y);
        Ok(())
    }

    fn curve_to(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 6 {
            return Err(PDFError::content_stream_error(
                "c operator requires 6 arguments".to_string(),
            ));
        }

        let cp1x = extract_number(args, 0)?;
        let cp1y = extract_number(args, 1)?;
        let cp2x = extract_number(args, 2)?;
        let cp2y = extract_number(args, 3)?;
        let x = extract_number(args, 4)?;
        let y = extract_number(args, 5)?;

        self.current_path.curve_to(cp1x, cp1y, cp2x, cp2y, x, y);
        self.device.curve_to(cp1x, cp1y, cp2x, cp2y, x, y);
        Ok(())
    }

    fn curve_to_2(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        // v - CurveTo2: initial point replicated
        if args.len() < 4 {
            return Err(PDFError::content_stream_error(
                "v operator requires 4 arguments".to_string(),
            ));
        }

        let current = self.current_path.current_point().unwrap_or((0.0, 0.0));
        let cp2x = extract_number(args, 0)?;
        let cp2y = extract_number(args, 1)?;
        let x = extract_number(args, 2)?;
        let y = extract_number(args, 3)?;

        self.current_path.curve_to(current.0, current.1, cp2x, cp2y, x, y);
        self.device.curve_to(current.0, current.1, cp2x, cp2y, x, y);
        Ok(())
    }

    fn curve_to_3(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        // y - CurveTo3: final point replicated
        if args.len() < 4 {
            return Err(PDFError::content_stream_error(
                "y operator requires 4 arguments".to_string(),
            ));
        }

        let cp1x = extract_number(args, 0)?;
        let cp1y = extract_number(args, 1)?;
        let x = extract_number(args, 2)?;
        let y = extract_number(args, 3)?;

        self.current_path.curve_to(cp1x, cp1y, x, y, x, y);
        self.device.curve_to(cp1x, cp1y, x, y, x, y);
        Ok(())
    }

    fn close_path(&mut self) -> PDFResult<()> {
        self.current_path.close_path();
        self.device.close_path();
        Ok(())
    }

    fn rectangle(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 4 {
            return Err(PDFError::content_stream_error(
                "re operator requires 4 arguments".to_string(),
            ));
        }

        let x = extract_number(args, 0)?;
        let y = extract_number(args, 1)?;
        let width = extract_number(args, 2)?;
        let height = extract_number(args, 3)?;

        self.current_path.rect(x, y, width, height);
        self.device.rect(x, y, width, height);
        Ok(())
    }

    // === Path Painting Operators ===

    fn fill_paint(&self) -> Paint {
        Paint::from_color(self.current_state().fill_color.clone())
    }

    fn stroke(&mut self) -> PDFResult<()> {
        let paint = Paint::from_color(self.current_state().stroke_color.clone());
        let stroke_props = self.current_state().stroke_props.clone();
        self.device.draw_path(PathDrawMode::Stroke, &paint, &stroke_props)?;
        self.current_path.begin();
        Ok(())
    }

    fn close_and_stroke(&mut self) -> PDFResult<()> {
        self.close_path()?;
        self.stroke()
    }

    /// `f`/`F`/`f*` - fill the current path. When the fill color space is
    /// `/Pattern`, resolves the named pattern and, for shading patterns,
    /// paints the shading clipped to the path's bounding box instead of a
    /// flat color.
    fn fill(&mut self, rule: FillRule, xref: &mut XRef) -> PDFResult<()> {
        if self.try_fill_with_pattern(rule, xref)? {
            self.current_path.begin();
            return Ok(());
        }
        let paint = self.fill_paint();
        let stroke_props = self.current_state().stroke_props.clone();
        self.device.draw_path(PathDrawMode::Fill(rule), &paint, &stroke_props)?;
        self.current_path.begin();
        Ok(())
    }

    fn fill_and_stroke(&mut self, rule: FillRule, xref: &mut XRef) -> PDFResult<()> {
        if self.try_fill_with_pattern(rule, xref)? {
            let paint = Paint::from_color(self.current_state().stroke_color.clone());
            let stroke_props = self.current_state().stroke_props.clone();
            self.device.draw_path(PathDrawMode::Stroke, &paint, &stroke_props)?;
            self.current_path.begin();
            return Ok(());
        }
        // For fill and stroke, we use fill color for fill, stroke color for stroke
        // But our Device trait only takes one paint, so we use fill color
        let paint = self.fill_paint();
        let stroke_props = self.current_state().stroke_props.clone();
        self.device.draw_path(PathDrawMode::FillStroke(rule), &paint, &stroke_props)?;
        self.current_path.begin();
        Ok(())
    }

    fn close_fill_stroke(&mut self, rule: FillRule, xref: &mut XRef) -> PDFResult<()> {
        self.close_path()?;
        self.fill_and_stroke(rule, xref)
    }

    /// If the fill color space is `/Pattern`, resolves and paints the named
    /// pattern clipped to the current path, and returns `true`. Shading
    /// patterns (`/PatternType 2`) paint the shading directly; tiling
    /// patterns (`/PatternType 1`) enumerate tile indices and replay the
    /// pattern's content stream once per tile.
    /// Returns `false` when there is no pattern in effect, so the caller
    /// falls back to a solid fill.
    fn try_fill_with_pattern(&mut self, _rule: FillRule, xref: &mut XRef) -> PDFResult<bool> {
        if self.current_state().fill_color_space != "Pattern" {
            return Ok(false);
        }
        let name = match self.current_state().fill_pattern.clone() {
            Some(n) => n,
            None => return Ok(false),
        };

        let pattern_obj = match self.resolve_resource(xref, "Pattern", &name)? {
            Some(obj) => obj,
            None => return Ok(false),
        };
        let dict = match &pattern_obj {
            PDFObject::Dictionary(d) => d.clone(),
            PDFObject::Stream { dict, .. } => dict.clone(),
            _ => return Ok(false),
        };

        let pattern_type = dict.get("PatternType").and_then(PDFObject::as_number).unwrap_or(0.0) as i64;
        let bbox = self
            .current_path
            .bounding_box()
            .map(|(x0, y0, x1, y1)| [x0, y0, x1, y1])
            .unwrap_or([0.0, 0.0, 0.0, 0.0]);

        if pattern_type == 2 {
            if let Some(shading_obj) = dict.get("Shading") {
                let shading_obj = xref.fetch_if_ref(shading_obj)?;
                if let Some(shading) = Shading::from_object(&shading_obj) {
                    let saved_ctm = self.current_state().ctm;
                    if let Some(matrix) = dict.get("Matrix").and_then(as_matrix) {
                        self.current_state_mut().concat_matrix(&matrix);
                    }
                    self.paint_shading(&shading, bbox)?;
                    self.current_state_mut().ctm = saved_ctm;
                    return Ok(true);
                }
            }
            return Ok(false);
        }

        if pattern_type == 1 {
            let data = match &pattern_obj {
                PDFObject::Stream { data, .. } => data.clone(),
                _ => Vec::new(),
            };
            self.fill_tiling_pattern(&name, &dict, &data, bbox, xref)?;
            return Ok(true);
        }

        Ok(false)
    }

    /// Tiling pattern fill: computes
    /// the pattern-space -> current-space transform `PTM · BTM · CTM⁻¹`,
    /// enumerates the integer tile lattice covering the clipped fill bbox,
    /// and replays the pattern's content stream once per tile with the
    /// device's CTM translated to that tile's origin. Uncolored patterns
    /// (`PaintType` 2) inherit the fill color in effect when the pattern was
    /// selected, since their content stream carries no color operators of
    /// its own.
    fn fill_tiling_pattern(
        &mut self,
        name: &str,
        dict: &HashMap<String, PDFObject>,
        data: &[u8],
        bbox: [f64; 4],
        xref: &mut XRef,
    ) -> PDFResult<()> {
        let x_step = dict.get("XStep").and_then(PDFObject::as_number).unwrap_or(1.0);
        let y_step = dict.get("YStep").and_then(PDFObject::as_number).unwrap_or(1.0);
        if x_step.abs() < 1e-6 || y_step.abs() < 1e-6 {
            return Ok(());
        }
        let pattern_bbox = dict.get("BBox").and_then(as_bbox).unwrap_or([0.0, 0.0, x_step, y_step]);
        let paint_type = dict.get("PaintType").and_then(PDFObject::as_number).unwrap_or(1.0) as i64;

        let ptm = dict.get("Matrix").and_then(as_matrix).unwrap_or([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
        let btm = *self.base_ctm_stack.last().unwrap();
        let ctm = self.current_state().ctm;
        let ctm_inv = match mat_invert(&ctm) {
            Some(m) => m,
            None => return Ok(()),
        };
        // pattern space -> current (CTM-relative) user space.
        let pattern_to_current = mat_mul(&mat_mul(&ptm, &btm), &ctm_inv);
        let current_to_pattern = match mat_invert(&pattern_to_current) {
            Some(m) => m,
            None => return Ok(()),
        };

        // Map the fill bbox's four corners into pattern space to find the
        // covering tile index range (ceil/floor of the mapped bbox edges
        // over xstep/ystep).
        let corners = [
            (bbox[0], bbox[1]),
            (bbox[2], bbox[1]),
            (bbox[2], bbox[3]),
            (bbox[0], bbox[3]),
        ];
        let mut px0 = f64::INFINITY;
        let mut px1 = f64::NEG_INFINITY;
        let mut py0 = f64::INFINITY;
        let mut py1 = f64::NEG_INFINITY;
        for (x, y) in corners {
            let (tx, ty) = transform_point(&current_to_pattern, x, y);
            px0 = px0.min(tx);
            px1 = px1.max(tx);
            py0 = py0.min(ty);
            py1 = py1.max(ty);
        }

        let xi0 = ((px0 - pattern_bbox[2]) / x_step).ceil() as i64;
        let xi1 = ((px1 - pattern_bbox[0]) / x_step).floor() as i64 + 1;
        let yi0 = ((py0 - pattern_bbox[3]) / y_step).ceil() as i64;
        let yi1 = ((py1 - pattern_bbox[1]) / y_step).floor() as i64 + 1;

        const MAX_TILES: i64 = 10_000;
        let n_tiles = (xi1 - xi0).max(0) * (yi1 - yi0).max(0);
        if n_tiles > MAX_TILES || n_tiles <= 0 {
            eprintln!(
                "Warning: tiling pattern '{}' would paint {} tiles, clamping to a flat fill",
                name, n_tiles
            );
            let paint = Paint::from_color(self.current_state().fill_color.clone());
            let stroke_props = self.current_state().stroke_props.clone();
            self.device.draw_path(PathDrawMode::Fill(FillRule::NonZero), &paint, &stroke_props)?;
            return Ok(());
        }

        let filter = dict.get("Filter");
        let parms = dict.get("DecodeParms").or_else(|| dict.get("DP"));
        let decoded = match filter {
            Some(f) => crate::core::decode::apply_filters_with_parms(data, f, parms).unwrap_or_default(),
            None => data.to_vec(),
        };
        let pattern_resources = match dict.get("Resources") {
            Some(r) => xref.fetch_if_ref(r).unwrap_or(PDFObject::Null),
            None => self.current_resources().cloned().unwrap_or(PDFObject::Null),
        };
        let underlying_fill_color = self.current_state().fill_color.clone();

        if self.form_depth >= self.options.max_recursion_depth {
            return Ok(());
        }
        self.form_depth += 1;
        for yi in yi0..yi1 {
            for xi in xi0..xi1 {
                let tile_origin = [1.0, 0.0, 0.0, 1.0, xi as f64 * x_step, yi as f64 * y_step];
                let tile_ctm = mat_mul(&mat_mul(&tile_origin, &pattern_to_current), &ctm);

                self.save()?;
                self.current_state_mut().ctm = tile_ctm;
                self.device.set_matrix(&tile_ctm);
                if paint_type == 2 {
                    self.current_state_mut().fill_color = underlying_fill_color.clone();
                    self.current_state_mut().stroke_color = underlying_fill_color.clone();
                }
                self.resources_stack.push(pattern_resources.clone());
                self.base_ctm_stack.push(tile_ctm);
                let result = self.run_content_stream(&decoded, xref);
                self.base_ctm_stack.pop();
                self.resources_stack.pop();
                let restore_result = self.restore();
                result?;
                restore_result?;
            }
        }
        self.form_depth -= 1;

        Ok(())
    }

    fn end_path(&mut self) -> PDFResult<()> {
        self.current_path.begin();
        Ok(())
    }

    // === Clipping Operators ===

    fn clip(&mut self, rule: FillRule) -> PDFResult<()> {
        self.device.clip_path(rule)?;
        self.clip_stack.push(rule);

        if let Some((x0, y0, x1, y1)) = self.current_path.bounding_box() {
            let new_bbox = [x0, y0, x1, y1];
            let state = self.current_state_mut();
            state.clip_bbox = Some(match state.clip_bbox {
                Some(existing) => intersect_bbox(existing, new_bbox),
                None => new_bbox,
            });
        }
        Ok(())
    }

    // === Text Object Operators ===

    fn begin_text(&mut self) -> PDFResult<()> {
        self.in_text_object = true;
        // Reset text matrices
        self.current_state_mut().text_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        self.current_state_mut().text_line_matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        Ok(())
    }

    fn end_text(&mut self) -> PDFResult<()> {
        self.in_text_object = false;
        Ok(())
    }

    // === Text Operators ===

    fn show_text(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if !self.in_text_object {
            return Err(PDFError::content_stream_error(
                "Tj operator outside text object".to_string(),
            ));
        }

        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "Tj operator requires 1 argument".to_string(),
            ));
        }

        let bytes: &[u8] = match &args[0] {
            PDFObject::String(bytes) | PDFObject::HexString(bytes) => bytes,
            _ => return Ok(()),
        };

        self.draw_text_run(bytes)
    }

    /// Shared by `Tj`/`'`/`"`: draws `bytes` at the current text state and
    /// advances the text matrix by the width the device reports.
    fn draw_text_run(&mut self, bytes: &[u8]) -> PDFResult<()> {
        let state = self.current_state();
        let font_name = state.font_name.clone().unwrap_or_else(|| "Default".to_string());
        let font_size = state.font_size.unwrap_or(12.0);
        let paint = Paint::from_color(state.fill_color.clone());
        let text_matrix = state.text_matrix;
        let horizontal_scaling = state.text_horizontal_scaling / 100.0;
        let char_spacing = state.character_spacing;
        let word_spacing = state.word_spacing;
        let text_rise = state.text_rise;

        if state.text_rendering_mode == super::graphics_state::TextRenderingMode::Invisible {
            // Still advance the text matrix so subsequent glyphs position
            // correctly, but skip the paint call.
            return Ok(());
        }

        let width = self.device.draw_text(
            bytes,
            &font_name,
            font_size,
            &paint,
            &text_matrix,
            horizontal_scaling,
            char_spacing,
            word_spacing,
            text_rise,
        )?;

        // Advance along the text-space x axis through the text matrix, per
        // PDF 32000-1 9.4.3: Tm' = [1 0 0 1 tx 0] x Tm.
        let tx = width * horizontal_scaling;
        let translation = [1.0, 0.0, 0.0, 1.0, tx, 0.0];
        let state = self.current_state_mut();
        state.text_matrix = matmul(&translation, &state.text_matrix);
        Ok(())
    }

    fn show_spaced_text(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        // TJ operator: an array mixing strings and numeric adjustments
        // TJ: negative numbers push glyphs apart, in thousandths of text
        // space, scaled by font size and Tz.
        if args.is_empty() {
            return Ok(());
        }

        let items = match &args[0] {
            PDFObject::Array(arr) => arr.clone(),
            _ => return Ok(()),
        };

        for item in items.iter() {
            match item.as_ref() {
                PDFObject::String(bytes) | PDFObject::HexString(bytes) => {
                    self.draw_text_run(bytes)?;
                }
                PDFObject::Number(adjustment) => {
                    let state = self.current_state();
                    let font_size = state.font_size.unwrap_or(12.0);
                    let horizontal_scaling = state.text_horizontal_scaling / 100.0;
                    let tx = -adjustment / 1000.0 * font_size * horizontal_scaling;
                    let translation = [1.0, 0.0, 0.0, 1.0, tx, 0.0];
                    let state = self.current_state_mut();
                    state.text_matrix = matmul(&translation, &state.text_matrix);
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn next_line_show_text(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        self.next_line()?;
        self.show_text(args)
    }

    fn next_line_set_spacing_show_text(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 3 {
            return Err(PDFError::content_stream_error(
                "\" operator requires 3 arguments".to_string(),
            ));
        }

        let word_spacing = extract_number(args, 0)?;
        let char_spacing = extract_number(args, 1)?;

        self.current_state_mut().word_spacing = word_spacing;
        self.current_state_mut().character_spacing = char_spacing;

        self.next_line()?;
        self.show_text(&args[2..])
    }

    fn move_text(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 2 {
            return Err(PDFError::content_stream_error(
                "Td operator requires 2 arguments".to_string(),
            ));
        }

        let tx = extract_number(args, 0)?;
        let ty = extract_number(args, 1)?;

        let state = self.current_state_mut();
        let translation = [1.0, 0.0, 0.0, 1.0, tx, ty];
        state.text_line_matrix = matmul(&translation, &state.text_line_matrix);
        state.text_matrix = state.text_line_matrix;

        Ok(())
    }

    fn set_leading_move_text(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 2 {
            return Err(PDFError::content_stream_error(
                "TD operator requires 2 arguments".to_string(),
            ));
        }

        let ty = extract_number(args, 1)?;
        self.current_state_mut().text_leading = -ty; // Leading is negative of ty

        self.move_text(args)
    }

    fn set_text_matrix(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 6 {
            return Err(PDFError::content_stream_error(
                "Tm operator requires 6 arguments".to_string(),
            ));
        }

        let mut matrix = [0.0; 6];
        for i in 0..6 {
            matrix[i] = extract_number(args, i)?;
        }

        self.current_state_mut().set_text_matrix(&matrix);
        Ok(())
    }

    fn next_line(&mut self) -> PDFResult<()> {
        let state = self.current_state_mut();
        let translation = [1.0, 0.0, 0.0, 1.0, 0.0, -state.text_leading];
        state.text_line_matrix = matmul(&translation, &state.text_line_matrix);
        state.text_matrix = state.text_line_matrix;
        Ok(())
    }

    fn set_font(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 2 {
            return Err(PDFError::content_stream_error(
                "Tf operator requires 2 arguments".to_string(),
            ));
        }

        if let PDFObject::Name(name) = &args[0] {
            self.current_state_mut().font_name = Some(name.clone());
        }

        self.current_state_mut().font_size = Some(extract_number(args, 1)?);
        Ok(())
    }

    fn set_char_spacing(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "Tc operator requires 1 argument".to_string(),
            ));
        }

        self.current_state_mut().character_spacing = extract_number(args, 0)?;
        Ok(())
    }

    fn set_word_spacing(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "Tw operator requires 1 argument".to_string(),
            ));
        }

        self.current_state_mut().word_spacing = extract_number(args, 0)?;
        Ok(())
    }

    fn set_horizontal_scaling(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "Tz operator requires 1 argument".to_string(),
            ));
        }

        self.current_state_mut().text_horizontal_scaling = extract_number(args, 0)?;
        Ok(())
    }

    fn set_leading(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "TL operator requires 1 argument".to_string(),
            ));
        }

        self.current_state_mut().text_leading = extract_number(args, 0)?;
        Ok(())
    }

    fn set_text_rendering_mode(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "Tr operator requires 1 argument".to_string(),
            ));
        }

        let mode = extract_number(args, 0)? as i32;
        self.current_state_mut().text_rendering_mode = match mode {
            0 => super::graphics_state::TextRenderingMode::Fill,
            1 => super::graphics_state::TextRenderingMode::Stroke,
            2 => super::graphics_state::TextRenderingMode::FillStroke,
            3 => super::graphics_state::TextRenderingMode::Invisible,
            4 => super::graphics_state::TextRenderingMode::FillClip,
            5 => super::graphics_state::TextRenderingMode::StrokeClip,
            6 => super::graphics_state::TextRenderingMode::FillStrokeClip,
            7 => super::graphics_state::TextRenderingMode::Clip,
            _ => return Err(PDFError::content_stream_error(format!("Invalid text rendering mode: {}", mode))),
        };
        Ok(())
    }

    fn set_text_rise(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "Ts operator requires 1 argument".to_string(),
            ));
        }

        self.current_state_mut().text_rise = extract_number(args, 0)?;
        Ok(())
    }

    // === Color Operators ===

    fn set_stroke_gray(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "G operator requires 1 argument".to_string(),
            ));
        }

        let gray = extract_number(args, 0)?;
        self.current_state_mut().stroke_color = Color::Gray(gray);
        self.current_state_mut().stroke_pattern = None;
        Ok(())
    }

    fn set_fill_gray(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "g operator requires 1 argument".to_string(),
            ));
        }

        let gray = extract_number(args, 0)?;
        self.current_state_mut().fill_color = Color::Gray(gray);
        self.current_state_mut().fill_pattern = None;
        Ok(())
    }

    fn set_stroke_rgb(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 3 {
            return Err(PDFError::content_stream_error(
                "RG operator requires 3 arguments".to_string(),
            ));
        }

        let r = extract_number(args, 0)?;
        let g = extract_number(args, 1)?;
        let b = extract_number(args, 2)?;
        self.current_state_mut().stroke_color = Color::RGB(r, g, b);
        self.current_state_mut().stroke_pattern = None;
        Ok(())
    }

    fn set_fill_rgb(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 3 {
            return Err(PDFError::content_stream_error(
                "rg operator requires 3 arguments".to_string(),
            ));
        }

        let r = extract_number(args, 0)?;
        let g = extract_number(args, 1)?;
        let b = extract_number(args, 2)?;
        self.current_state_mut().fill_color = Color::RGB(r, g, b);
        self.current_state_mut().fill_pattern = None;
        Ok(())
    }

    fn set_stroke_cmyk(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 4 {
            return Err(PDFError::content_stream_error(
                "K operator requires 4 arguments".to_string(),
            ));
        }

        let c = extract_number(args, 0)?;
        let m = extract_number(args, 1)?;
        let y = extract_number(args, 2)?;
        let k = extract_number(args, 3)?;
        self.current_state_mut().stroke_color = Color::CMYK(c, m, y, k);
        self.current_state_mut().stroke_pattern = None;
        Ok(())
    }

    fn set_fill_cmyk(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.len() < 4 {
            return Err(PDFError::content_stream_error(
                "k operator requires 4 arguments".to_string(),
            ));
        }

        let c = extract_number(args, 0)?;
        let m = extract_number(args, 1)?;
        let y = extract_number(args, 2)?;
        let k = extract_number(args, 3)?;
        self.current_state_mut().fill_color = Color::CMYK(c, m, y, k);
        self.current_state_mut().fill_pattern = None;
        Ok(())
    }

    fn set_stroke_color_space(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if let Some(PDFObject::Name(name)) = args.first() {
            self.current_state_mut().stroke_color_space = name.clone();
            if name != "Pattern" {
                self.current_state_mut().stroke_pattern = None;
            }
        }
        Ok(())
    }

    fn set_fill_color_space(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if let Some(PDFObject::Name(name)) = args.first() {
            self.current_state_mut().fill_color_space = name.clone();
            if name != "Pattern" {
                self.current_state_mut().fill_pattern = None;
            }
        }
        Ok(())
    }

    /// `SC`/`SCN` - set stroke color in the current stroke color space. When
    /// the space is `/Pattern`, the trailing operand is a pattern name
    /// rather than a numeric component.
    fn set_stroke_color_n(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if let Some(PDFObject::Name(name)) = args.last() {
            self.current_state_mut().stroke_pattern = Some(name.clone());
            // Uncolored patterns (PaintType 2) carry their underlying color
            // as the leading numeric operands -- uncolored patterns inherit
            // the underlying color set this way.
            let components: Vec<f64> = args[..args.len() - 1].iter().filter_map(PDFObject::as_number).collect();
            if !components.is_empty() {
                self.current_state_mut().stroke_color = color_from_n_components(&components);
            }
            return Ok(());
        }
        let components: Vec<f64> = args.iter().filter_map(PDFObject::as_number).collect();
        self.current_state_mut().stroke_color = color_from_n_components(&components);
        self.current_state_mut().stroke_pattern = None;
        Ok(())
    }

    /// `sc`/`scn` - set fill color, symmetric to [`Self::set_stroke_color_n`].
    fn set_fill_color_n(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if let Some(PDFObject::Name(name)) = args.last() {
            self.current_state_mut().fill_pattern = Some(name.clone());
            let components: Vec<f64> = args[..args.len() - 1].iter().filter_map(PDFObject::as_number).collect();
            if !components.is_empty() {
                self.current_state_mut().fill_color = color_from_n_components(&components);
            }
            return Ok(());
        }
        let components: Vec<f64> = args.iter().filter_map(PDFObject::as_number).collect();
        self.current_state_mut().fill_color = color_from_n_components(&components);
        self.current_state_mut().fill_pattern = None;
        Ok(())
    }

    // === Marked content ===

    fn begin_marked_content_props(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        let props = args.get(1);
        let actual_text = match props {
            Some(PDFObject::Dictionary(d)) => match d.get("ActualText") {
                Some(PDFObject::String(bytes)) | Some(PDFObject::HexString(bytes)) => {
                    Some(String::from_utf8_lossy(bytes).into_owned())
                }
                _ => None,
            },
            _ => None,
        };

        if let Some(text) = actual_text {
            self.device.begin_actual_text(&text);
            self.marked_content_stack.push(true);
        } else {
            self.marked_content_stack.push(false);
        }
        Ok(())
    }

    fn end_marked_content(&mut self) {
        if let Some(true) = self.marked_content_stack.pop() {
            self.device.end_actual_text();
        }
    }

    // === Line Property Operators ===

    fn set_line_width(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "w operator requires 1 argument".to_string(),
            ));
        }

        self.current_state_mut().stroke_props.line_width = extract_number(args, 0)?;
        Ok(())
    }

    fn set_line_cap(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "J operator requires 1 argument".to_string(),
            ));
        }

        let cap = extract_number(args, 0)? as i32;
        self.current_state_mut().stroke_props.line_cap = match cap {
            0 => super::graphics_state::LineCap::Butt,
            1 => super::graphics_state::LineCap::Round,
            2 => super::graphics_state::LineCap::ProjectingSquare,
            _ => return Err(PDFError::content_stream_error(format!("Invalid line cap: {}", cap))),
        };
        Ok(())
    }

    fn set_line_join(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "j operator requires 1 argument".to_string(),
            ));
        }

        let join = extract_number(args, 0)? as i32;
        self.current_state_mut().stroke_props.line_join = match join {
            0 => super::graphics_state::LineJoin::Miter,
            1 => super::graphics_state::LineJoin::Round,
            2 => super::graphics_state::LineJoin::Bevel,
            _ => return Err(PDFError::content_stream_error(format!("Invalid line join: {}", join))),
        };
        Ok(())
    }

    fn set_miter_limit(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        if args.is_empty() {
            return Err(PDFError::content_stream_error(
                "M operator requires 1 argument".to_string(),
            ));
        }

        self.current_state_mut().stroke_props.miter_limit = extract_number(args, 0)?;
        Ok(())
    }

    fn set_dash(&mut self, args: &[PDFObject]) -> PDFResult<()> {
        // d operator: dash_array dash_offset
        if args.len() < 2 {
            return Err(PDFError::content_stream_error(
                "d operator requires 2 arguments".to_string(),
            ));
        }

        let mut dash_array = Vec::new();
        if let PDFObject::Array(arr) = &args[0] {
            for obj in arr {
                match &**obj {
                    PDFObject::Number(n) => dash_array.push(*n),
                    _ => {
                        return Err(PDFError::content_stream_error(
                            "Dash array must contain only numbers".to_string(),
                        ))
                    }
                }
            }
        }

        let dash_offset = extract_number(args, 1)?;

        self.current_state_mut().stroke_props.dash_array = dash_array;
        self.current_state_mut().stroke_props.dash_offset = dash_offset;
        Ok(())
    }

    // === XObject Operator ===

    /// `Do` - paint an XObject, dispatching on its `/Subtype` (form or image).
    fn paint_xobject(&mut self, args: &[PDFObject], xref: &mut XRef) -> PDFResult<()> {
        let name = match args.first() {
            Some(PDFObject::Name(n)) => n.clone(),
            _ => {
                return Err(PDFError::content_stream_error(
                    "Do operator requires a name argument".to_string(),
                ))
            }
        };

        let xobject = match self.resolve_resource(xref, "XObject", &name)? {
            Some(obj) => obj,
            None => {
                eprintln!("Warning: Do operator: XObject '{}' not found in resources", name);
                return Ok(());
            }
        };

        let (dict, data) = match &xobject {
            PDFObject::Stream { dict, data } => (dict.clone(), data.clone()),
            _ => {
                eprintln!("Warning: Do operator: XObject '{}' is not a stream", name);
                return Ok(());
            }
        };

        match dict.get("Subtype") {
            Some(PDFObject::Name(s)) if s == "Form" => self.paint_form_xobject(&name, &dict, &data, xref),
            Some(PDFObject::Name(s)) if s == "Image" => self.paint_image_xobject(&dict, &data, xref),
            _ => {
                eprintln!("Warning: Do operator: XObject '{}' has unknown Subtype", name);
                Ok(())
            }
        }
    }

    /// Recursively interprets a Form XObject's content stream under a saved
    /// graphics state, with the form's `/Matrix` pre-concatenated and its
    /// `/BBox` intersected into the clip.
    fn paint_form_xobject(
        &mut self,
        name: &str,
        dict: &HashMap<String, PDFObject>,
        data: &[u8],
        xref: &mut XRef,
    ) -> PDFResult<()> {
        if self.form_depth >= self.options.max_recursion_depth {
            eprintln!("Warning: Do operator: form recursion depth {} exceeded, skipping '{}'", self.options.max_recursion_depth, name);
            return Ok(());
        }

        // Cycle detection: forms referenced directly by object id are
        // tracked; inline (non-Ref) forms can't recurse into themselves so
        // using the resolved name is a reasonable proxy when no ref exists.
        let cycle_key = name.to_string();
        if self.active_forms.contains(&cycle_key) {
            eprintln!("Warning: Do operator: cycle detected rendering form '{}'", name);
            return Ok(());
        }

        let filter = dict.get("Filter");
        let parms = dict.get("DecodeParms").or_else(|| dict.get("DP"));
        let decoded = match filter {
            Some(f) => crate::core::decode::apply_filters_with_parms(data, f, parms)
                .unwrap_or_else(|e| {
                    eprintln!("Warning: failed to decode form XObject '{}': {}", name, e);
                    Vec::new()
                }),
            None => data.to_vec(),
        };

        self.active_forms.insert(cycle_key.clone());
        self.form_depth += 1;
        // The form's own content establishes a new base space for any
        // pattern it paints with, rooted at the CTM in effect when `Do`
        // was invoked (before the form's own /Matrix is concatenated).
        self.base_ctm_stack.push(self.current_state().ctm);
        self.save()?;

        if let Some(matrix_arr) = dict.get("Matrix").and_then(as_matrix) {
            self.current_state_mut().concat_matrix(&matrix_arr);
            self.device.concat_matrix(&matrix_arr);
        }

        if let Some(bbox) = dict.get("BBox").and_then(as_bbox) {
            self.device.begin_path();
            self.device.move_to(bbox[0], bbox[1]);
            self.device.line_to(bbox[2], bbox[1]);
            self.device.line_to(bbox[2], bbox[3]);
            self.device.line_to(bbox[0], bbox[3]);
            self.device.close_path();
            let _ = self.device.clip_path(FillRule::NonZero);
            let state = self.current_state_mut();
            state.clip_bbox = Some(match state.clip_bbox {
                Some(existing) => intersect_bbox(existing, bbox),
                None => bbox,
            });
        }

        // Forms may carry their own /Resources; otherwise they inherit the
        // caller's -- resource inheritance when a Form has no own Resources dict.
        let form_resources = match dict.get("Resources") {
            Some(r) => xref.fetch_if_ref(r).unwrap_or(PDFObject::Null),
            None => self.current_resources().cloned().unwrap_or(PDFObject::Null),
        };
        self.resources_stack.push(form_resources);

        let result = self.run_content_stream(&decoded, xref);

        self.resources_stack.pop();
        let restore_result = self.restore();
        self.form_depth -= 1;
        self.active_forms.remove(&cycle_key);
        self.base_ctm_stack.pop();

        result?;
        restore_result
    }

    /// Parses and processes a raw (already filter-decoded) content stream
    /// under the current context -- used for both top-level page content
    /// and recursive form XObjects.
    fn run_content_stream(&mut self, data: &[u8], xref: &mut XRef) -> PDFResult<()> {
        use crate::core::{BaseStream, Lexer, Parser, Stream};

        let stream = Box::new(Stream::from_bytes(data.to_vec())) as Box<dyn BaseStream>;
        let lexer = Lexer::new(stream)?;
        let parser = Parser::new(lexer)?;
        let mut evaluator = crate::core::content_stream::ContentStreamEvaluator::new(parser);

        loop {
            match evaluator.read_operation() {
                Ok(Some(op)) => {
                    if let Err(e) = self.process_operation(&op, xref) {
                        eprintln!("Warning: Failed to process operator {:?}: {}", op.op, e);
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    eprintln!("Warning: Failed to read operation, stopping: {}", e);
                    break;
                }
            }
        }
        Ok(())
    }

    /// Decodes and dispatches an Image XObject through one of the four
    /// cases: image-mask+pattern fill, soft-masked image, explicit stencil
    /// mask, or a plain/color-key image.
    fn paint_image_xobject(
        &mut self,
        dict: &HashMap<String, PDFObject>,
        data: &[u8],
        xref: &mut XRef,
    ) -> PDFResult<()> {
        let width = dict.get("Width").and_then(PDFObject::as_number).unwrap_or(0.0) as u32;
        let height = dict.get("Height").and_then(PDFObject::as_number).unwrap_or(0.0) as u32;
        let bits_per_component = dict.get("BitsPerComponent").and_then(PDFObject::as_number).unwrap_or(8.0) as u8;
        let is_mask = matches!(dict.get("ImageMask"), Some(PDFObject::Boolean(true)));

        let filter = dict.get("Filter");
        let parms = dict.get("DecodeParms").or_else(|| dict.get("DP"));
        let decoded = match filter {
            Some(f) => crate::core::decode::apply_filters_with_parms(data, f, parms).unwrap_or_default(),
            None => data.to_vec(),
        };

        // Device-space transform for a unit-square image is the CTM itself:
        // image space [0,1]x[0,1] maps through the CTM.
        let transform = self.current_state().ctm;

        if is_mask {
            let image = ImageData { width, height, data: decoded, has_alpha: false, bits_per_component: 1 };
            let paint = self.fill_paint();
            return self.device.draw_image_mask(image, &paint, &transform);
        }

        let has_alpha = dict.contains_key("SMask");
        let image = ImageData { width, height, data: decoded, has_alpha, bits_per_component };

        if let Some(smask_obj) = dict.get("SMask") {
            if let Ok(PDFObject::Stream { dict: smask_dict, data: smask_data }) = xref.fetch_if_ref(smask_obj) {
                let smask_filter = smask_dict.get("Filter");
                let smask_decoded = match smask_filter {
                    Some(f) => crate::core::decode::apply_filters(&smask_data, f).unwrap_or_default(),
                    None => smask_data,
                };
                let smask_width = smask_dict.get("Width").and_then(PDFObject::as_number).unwrap_or(width as f64) as u32;
                let smask_height = smask_dict.get("Height").and_then(PDFObject::as_number).unwrap_or(height as f64) as u32;
                let smask_image = ImageData {
                    width: smask_width,
                    height: smask_height,
                    data: smask_decoded,
                    has_alpha: false,
                    bits_per_component: smask_dict.get("BitsPerComponent").and_then(PDFObject::as_number).unwrap_or(8.0) as u8,
                };
                return self.device.draw_soft_masked_image(image, smask_image, &transform);
            }
        }

        if let Some(mask_obj) = dict.get("Mask") {
            if let Ok(PDFObject::Stream { dict: mask_dict, data: mask_data }) = xref.fetch_if_ref(mask_obj) {
                let mask_filter = mask_dict.get("Filter");
                let mask_decoded = match mask_filter {
                    Some(f) => crate::core::decode::apply_filters(&mask_data, f).unwrap_or_default(),
                    None => mask_data,
                };
                let mask_width = mask_dict.get("Width").and_then(PDFObject::as_number).unwrap_or(width as f64) as u32;
                let mask_height = mask_dict.get("Height").and_then(PDFObject::as_number).unwrap_or(height as f64) as u32;
                let mask_image = ImageData { width: mask_width, height: mask_height, data: mask_decoded, has_alpha: false, bits_per_component: 1 };
                return self.device.draw_masked_image(image, mask_image, &transform);
            }
        }

        self.device.draw_image(image, &transform)
    }

    /// `sh` - paint a shading across the current clip. The
    /// shading dictionary is resolved from `/Resources/Shading`, evaluated
    /// via [`evaluate_shading`] into flat regions in shading space, mapped
    /// through the CTM, and handed to the device's `*_shaded_fill` methods.
    fn shading_fill(&mut self, args: &[PDFObject], xref: &mut XRef) -> PDFResult<()> {
        let name = match args.first() {
            Some(PDFObject::Name(n)) => n.clone(),
            _ => {
                return Err(PDFError::content_stream_error(
                    "sh operator requires a name argument".to_string(),
                ))
            }
        };

        let shading_obj = match self.resolve_resource(xref, "Shading", &name)? {
            Some(obj) => obj,
            None => {
                eprintln!("Warning: sh operator: shading '{}' not found in resources", name);
                return Ok(());
            }
        };

        let shading = match Shading::from_object(&shading_obj) {
            Some(s) => s,
            None => {
                eprintln!("Warning: sh operator: could not parse shading '{}'", name);
                return Ok(());
            }
        };

        let clip_bbox = self.current_state().clip_bbox.unwrap_or_else(|| {
            let (w, h) = self.device.page_bounds();
            [0.0, 0.0, w, h]
        });

        self.paint_shading(&shading, clip_bbox)
    }

    /// Evaluates `shading` within `clip_bbox` (shading space) and forwards
    /// the CTM-mapped regions to the matching `Device::*_shaded_fill`
    /// method, falling back to a single averaged flat fill when the device
    /// doesn't opt into region-level shading (`use_shaded_fills() == false`).
    fn paint_shading(&mut self, shading: &Shading, clip_bbox: [f64; 4]) -> PDFResult<()> {
        let regions = evaluate_shading(shading, clip_bbox);
        if regions.is_empty() {
            return Ok(());
        }

        if !self.device.use_shaded_fills() {
            return self.fallback_flat_fill(&regions);
        }

        let ctm = self.current_state().ctm;
        let mapped: Vec<ShadedRegion> = regions.iter().map(|r| map_region(r, &ctm)).collect();

        match &shading.kind {
            ShadingKind::Function { .. } => self.device.function_shaded_fill(&mapped),
            ShadingKind::Axial { .. } => self.device.axial_shaded_fill(&mapped),
            ShadingKind::Radial { .. } => self.device.radial_shaded_fill(&mapped),
            ShadingKind::Gouraud { .. } | ShadingKind::PatchMesh { .. } => self.device.function_shaded_fill(&mapped),
        }
    }

    /// Backends that don't implement per-region shading get the clip
    /// rectangle filled with the average of all region colors instead of
    /// nothing at all.
    fn fallback_flat_fill(&mut self, regions: &[ShadedRegion]) -> PDFResult<()> {
        let color = average_region_color(regions);
        let paint = Paint::from_color(color);
        self.device.draw_path(PathDrawMode::Fill(FillRule::NonZero), &paint, &self.current_state().stroke_props.clone())
    }
}

/// Helper function to extract a number from a PDFObject.
fn extract_number(args: &[PDFObject], index: usize) -> PDFResult<f64> {
    if index >= args.len() {
        return Err(PDFError::content_stream_error("Not enough arguments".to_string()));
    }

    match &args[index] {
        PDFObject::Number(n) => Ok(*n),
        _ => Err(PDFError::content_stream_error("Expected number argument".to_string())),
    }
}

fn matmul(a: &[f64; 6], b: &[f64; 6]) -> [f64; 6] {
    let [a0, a1, a2, a3, a4, a5] = *a;
    let [b0, b1, b2, b3, b4, b5] = *b;
    [
        a0 * b0 + a1 * b2,
        a0 * b1 + a1 * b3,
        a2 * b0 + a3 * b2,
        a2 * b1 + a3 * b3,
        a4 * b0 + a5 * b2 + b4,
        a4 * b1 + a5 * b3 + b5,
    ]
}

fn color_from_n_components(components: &[f64]) -> Color {
    match components.len() {
        1 => Color::Gray(components[0]),
        4 => Color::CMYK(components[0], components[1], components[2], components[3]),
        3 => Color::RGB(components[0], components[1], components[2]),
        _ => Color::black(),
    }
}

fn as_matrix(obj: &PDFObject) -> Option<[f64; 6]> {
    if let PDFObject::Array(arr) = obj {
        if arr.len() >= 6 {
            let mut m = [0.0; 6];
            for (i, v) in arr.iter().take(6).enumerate() {
                m[i] = v.as_number()?;
            }
            return Some(m);
        }
    }
    None
}

fn as_bbox(obj: &PDFObject) -> Option<[f64; 4]> {
    if let PDFObject::Array(arr) = obj {
        if arr.len() >= 4 {
            let mut b = [0.0; 4];
            for (i, v) in arr.iter().take(4).enumerate() {
                b[i] = v.as_number()?;
            }
            // Normalize so [x0,y0,x1,y1] has x0<=x1, y0<=y1.
            let (x0, x1) = (b[0].min(b[2]), b[0].max(b[2]));
            let (y0, y1) = (b[1].min(b[3]), b[1].max(b[3]));
            return Some([x0, y0, x1, y1]);
        }
    }
    None
}

fn intersect_bbox(a: [f64; 4], b: [f64; 4]) -> [f64; 4] {
    [a[0].max(b[0]), a[1].max(b[1]), a[2].min(b[2]), a[3].min(b[3])]
}

fn transform_point(ctm: &[f64; 6], x: f64, y: f64) -> (f64, f64) {
    let [a, b, c, d, e, f] = *ctm;
    (a * x + c * y + e, b * x + d * y + f)
}

/// Composes `m1` then `m2`: the result maps a point the way `point * m1 *
/// m2` would (row-vector convention), matching [`GraphicsState::concat_matrix`].
fn mat_mul(m1: &[f64; 6], m2: &[f64; 6]) -> [f64; 6] {
    let [a1, b1, c1, d1, e1, f1] = *m1;
    let [a2, b2, c2, d2, e2, f2] = *m2;
    [
        a1 * a2 + b1 * c2,
        a1 * b2 + b1 * d2,
        c1 * a2 + d1 * c2,
        c1 * b2 + d1 * d2,
        e1 * a2 + f1 * c2 + e2,
        e1 * b2 + f1 * d2 + f2,
    ]
}

/// Inverts a 2x3 affine matrix. Returns `None` when singular (determinant
/// below epsilon=1e-6).
fn mat_invert(m: &[f64; 6]) -> Option<[f64; 6]> {
    let [a, b, c, d, e, f] = *m;
    let det = a * d - b * c;
    if det.abs() < 1e-6 {
        return None;
    }
    let inv_det = 1.0 / det;
    let ia = d * inv_det;
    let ib = -b * inv_det;
    let ic = -c * inv_det;
    let id = a * inv_det;
    let ie = -(e * ia + f * ic);
    let if_ = -(e * ib + f * id);
    Some([ia, ib, ic, id, ie, if_])
}

fn map_region(region: &ShadedRegion, ctm: &[f64; 6]) -> ShadedRegion {
    match region {
        ShadedRegion::Quad { bbox, color } => {
            let (x0, y0) = transform_point(ctm, bbox[0], bbox[1]);
            let (x1, y1) = transform_point(ctm, bbox[2], bbox[3]);
            ShadedRegion::Polygon {
                vertices: vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1)],
                color: *color,
            }
        }
        ShadedRegion::Polygon { vertices, color } => ShadedRegion::Polygon {
            vertices: vertices.iter().map(|(x, y)| transform_point(ctm, *x, *y)).collect(),
            color: *color,
        },
        ShadedRegion::Triangle { points, color } => {
            let mapped = [
                transform_point(ctm, points[0].0, points[0].1),
                transform_point(ctm, points[1].0, points[1].1),
                transform_point(ctm, points[2].0, points[2].1),
            ];
            ShadedRegion::Triangle { points: mapped, color: *color }
        }
    }
}

fn region_color(region: &ShadedRegion) -> Color {
    match region {
        ShadedRegion::Quad { color, .. } => *color,
        ShadedRegion::Polygon { color, .. } => *color,
        ShadedRegion::Triangle { color, .. } => *color,
    }
}

fn average_region_color(regions: &[ShadedRegion]) -> Color {
    let mut r = 0.0;
    let mut g = 0.0;
    let mut b = 0.0;
    for region in regions {
        let (cr, cg, cb, _) = region_color(region).rgba();
        r += cr as f64;
        g += cg as f64;
        b += cb as f64;
    }
    let n = regions.len().max(1) as f64;
    Color::RGB(r / n / 255.0, g / n / 255.0, b / n / 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::parser::PDFObject;
    use crate::core::{BaseStream, Stream};

    fn create_context() -> RenderingContext<TestDevice> {
        let device = TestDevice::new(612.0, 792.0);
        RenderingContext::new(device, RenderOptions::default())
    }

    fn empty_xref() -> XRef {
        let stream = Box::new(Stream::from_bytes(b"%PDF-1.4\n%%EOF".to_vec())) as Box<dyn BaseStream>;
        XRef::new(stream)
    }

    use super::super::device::TestDevice;

    #[test]
    fn test_context_creation() {
        let ctx = create_context();
        assert_eq!(ctx.state_stack.len(), 1);
        assert!(ctx.current_path.is_empty());
    }

    #[test]
    fn test_save_restore() {
        let mut ctx = create_context();

        ctx.current_state_mut().stroke_color = Color::red();
        ctx.save().unwrap();

        ctx.current_state_mut().stroke_color = Color::blue();
        assert_eq!(ctx.current_state().stroke_color, Color::RGB(1.0, 0.0, 0.0));

        ctx.restore().unwrap();
        assert_eq!(ctx.current_state().stroke_color, Color::RGB(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_move_to_operator() {
        let mut ctx = create_context();
        let mut xref = empty_xref();

        let op = Operation::new(OpCode::MoveTo, vec![PDFObject::Number(10.0), PDFObject::Number(20.0)]);

        ctx.process_operation(&op, &mut xref).unwrap();
        assert_eq!(ctx.current_path.current_point(), Some((10.0, 20.0)));
    }

    #[test]
    fn test_fill_color_space_and_pattern_name() {
        let mut ctx = create_context();
        let mut xref = empty_xref();

        let cs_op = Operation::new(OpCode::SetFillColorSpace, vec![PDFObject::Name("Pattern".to_string())]);
        ctx.process_operation(&cs_op, &mut xref).unwrap();
        assert_eq!(ctx.current_state().fill_color_space, "Pattern");

        let scn_op = Operation::new(OpCode::SetFillColorN, vec![PDFObject::Name("P1".to_string())]);
        ctx.process_operation(&scn_op, &mut xref).unwrap();
        assert_eq!(ctx.current_state().fill_pattern.as_deref(), Some("P1"));
    }

    #[test]
    fn test_marked_content_actual_text_lifecycle() {
        let mut ctx = create_context();
        let mut xref = empty_xref();

        let mut props = HashMap::new();
        props.insert("ActualText".to_string(), PDFObject::String(b"hello".to_vec()));

        let bdc = Operation::new(
            OpCode::BeginMarkedContentProps,
            vec![PDFObject::Name("Span".to_string()), PDFObject::Dictionary(props)],
        );
        ctx.process_operation(&bdc, &mut xref).unwrap();
        assert_eq!(ctx.marked_content_stack, vec![true]);

        let emc = Operation::new(OpCode::EndMarkedContent, vec![]);
        ctx.process_operation(&emc, &mut xref).unwrap();
        assert!(ctx.marked_content_stack.is_empty());
    }

    #[test]
    fn test_text_matrix_advances_after_show_text() {
        let mut ctx = create_context();
        let mut xref = empty_xref();

        ctx.process_operation(&Operation::new(OpCode::BeginText, vec![]), &mut xref).unwrap();
        ctx.process_operation(
            &Operation::new(OpCode::SetFont, vec![PDFObject::Name("F1".to_string()), PDFObject::Number(12.0)]),
            &mut xref,
        )
        .unwrap();

        let before = ctx.current_state().text_matrix;
        ctx.process_operation(&Operation::new(OpCode::ShowText, vec![PDFObject::String(b"Hi".to_vec())]), &mut xref)
            .unwrap();
        let after = ctx.current_state().text_matrix;
        assert!(after[4] > before[4]);
    }
}
