//! Explicit render/interpretation options.
//!
//! The reference implementation reads a process-wide `globalParams`
//! singleton throughout the interpreter. Here that becomes an explicit
//! options value threaded through
//! construction instead: text encoding/EOL preferences, print-command
//! tracing, fixed pitch for physical layout, raster resolution, and the
//! interpreter's own recursion/error/flush bounds. The tiny-glyph retention
//! flag lives on [`crate::text::TextLayoutOptions`] instead, since it's
//! consulted by the text extractor, not the interpreter.

/// Line-ending convention used when joining extracted text lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EolMode {
    Lf,
    Cr,
    CrLf,
}

impl EolMode {
    pub fn as_str(self) -> &'static str {
        match self {
            EolMode::Lf => "\n",
            EolMode::Cr => "\r",
            EolMode::CrLf => "\r\n",
        }
    }
}

impl Default for EolMode {
    fn default() -> Self {
        EolMode::Lf
    }
}

/// Interpretation-loop and ambient options threaded through the rendering
/// context, replacing the reference implementation's global-parameters
/// singleton.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Preferred text encoding for extracted output (e.g. "UTF-8").
    pub text_encoding: String,
    /// Line-ending convention for joined text output.
    pub end_of_line: EolMode,
    /// Echo each dispatched operator to stderr as it is interpreted.
    pub print_commands: bool,
    /// Fixed character pitch for physical-layout text output; `None` uses
    /// `0.4 * font_size` per glyph.
    pub fixed_pitch: Option<f64>,
    /// Raster resolution in DPI, consulted by raster output backends.
    pub raster_resolution: f64,
    /// Prefer decoding images to an uncompressed form up front rather than
    /// streaming them through the pixel iterator.
    pub prefer_uncompressed_images: bool,
    /// Abort a content stream after this many recoverable errors (~500).
    pub content_stream_error_limit: u32,
    /// Maximum form-XObject / pattern / Type-3 recursion depth (>=100 skips).
    pub max_recursion_depth: u32,
    /// Flush the backend every this many dispatched operators (~20,000).
    pub operators_per_flush: u32,
    /// Poll the abort callback every this many dispatched operators (~10).
    pub operators_per_abort_poll: u32,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            text_encoding: "UTF-8".to_string(),
            end_of_line: EolMode::default(),
            print_commands: false,
            fixed_pitch: None,
            raster_resolution: 72.0,
            prefer_uncompressed_images: false,
            content_stream_error_limit: 500,
            max_recursion_depth: 100,
            operators_per_flush: 20_000,
            operators_per_abort_poll: 10,
        }
    }
}
