//! # pdfx-core: a PDF content-stream rendering and text-extraction engine
//!
//! This crate interprets a page's content-stream operators, maintains the
//! cascading graphics state machine (CTM, color, path, text state), dispatches
//! drawing primitives to a pluggable [`rendering::Device`] backend, decodes the
//! stream-filter pipeline (Flate/LZW/ASCII85/ASCIIHex/RunLength/DCT/CCITTFax),
//! and reconstructs readable text with layout (lines, words, paragraphs,
//! columns) from positioned glyph records.
//!
//! ## Scope
//!
//! The Document Model (indirect objects, cross-reference tables, encryption,
//! incremental updates, annotations/forms) and the Font Service (glyph
//! metrics, embedded font program parsing, CID-to-Unicode mapping) are
//! external collaborators. This crate consumes minimal, already-resolved
//! forms of both ([`core::PDFObject`]/[`core::XRef`] and [`core::Font`]) but
//! does not own their full lifecycle. Rasterization, PostScript generation,
//! and GUI viewers are specific [`rendering::Device`] implementations that
//! live outside this crate; [`rendering::device::TestDevice`] is the
//! in-memory reference implementation used by the test suite.
//!
//! ## Quick start
//!
//! ```rust
//! use pdf_x_core::rendering::{RenderingContext, RenderOptions, TestDevice};
//! use pdf_x_core::core::{BaseStream, ContentStreamEvaluator, Lexer, Parser, Stream, XRef};
//!
//! let device = TestDevice::new(612.0, 792.0);
//! let mut ctx = RenderingContext::new(device, RenderOptions::default());
//! let mut xref = XRef::new(Box::new(Stream::from_bytes(b"%PDF-1.4\n%%EOF".to_vec())) as Box<dyn BaseStream>);
//!
//! let content = b"1 0 0 RG 10 10 100 100 re S";
//! let stream = Box::new(Stream::from_bytes(content.to_vec())) as Box<dyn BaseStream>;
//! let mut evaluator = ContentStreamEvaluator::new(Parser::new(Lexer::new(stream).unwrap()).unwrap());
//! while let Some(op) = evaluator.read_operation().unwrap() {
//!     ctx.process_operation(&op, &mut xref).unwrap();
//! }
//! ```
//!
//! ## Architecture
//!
//! 1. **Streams & filters** ([`core::stream`], [`core::sub_stream`], [`core::decode`]):
//!    byte-range views over raw stream data and the filter-chain decoder.
//! 2. **Operator table** ([`core::operators`]): arity/operand-type metadata for
//!    every content-stream operator, looked up by binary search.
//! 3. **Graphics state & interpreter** ([`rendering::graphics_state`],
//!    [`rendering::context`]): the cascading state machine and operator dispatch.
//! 4. **Image & shading dispatch** ([`core::image`], [`rendering::shading`]): decodes
//!    image XObjects and evaluates axial/radial/function-based shadings.
//! 5. **Text layout reconstruction** ([`text`]): groups positioned glyphs into
//!    words, lines, columns and paragraphs in reading order.

pub mod core;
pub mod rendering;
pub mod text;

pub use core::decode;
pub use core::{
    BaseStream, ContentStreamEvaluator, Font, FontDict, FontType, Lexer, OpCode, Operation,
    OperandType, OperatorDescriptor, Page, PDFDocument, PDFError, PDFObject, Parser, Stream,
    SubStream, TextItem, Token, XRef, XRefEntry,
};
pub use rendering::{
    Color, Device, FillRule, GraphicsState, Paint, Path, PathBuilder, PathDrawMode,
    RenderingContext,
};
pub use text::{TextBlock, TextExtractor, TextLayoutOptions};
