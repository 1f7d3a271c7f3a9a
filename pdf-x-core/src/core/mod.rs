pub mod base_stream;
pub mod cmap;
pub mod content_stream;
pub mod decode;
pub mod document;
pub mod error;
pub mod font;
pub mod image;
pub mod lexer;
pub mod operators;
pub mod page;
pub mod parser;
pub mod stream;
pub mod sub_stream;
pub mod xref;

pub use base_stream::BaseStream;
pub use cmap::CMap;
pub use content_stream::{ContentStreamEvaluator, OpCode, Operation, TextItem};
pub use document::{LinearizedInfo, PDFDocument};
pub use error::PDFError;
pub use font::{Font, FontDict, FontType};
pub use image::{DecodedImage, ImageColorSpace, ImageDecoder, ImageExtraction, ImageFormat, ImageMetadata};
pub use lexer::{Lexer, Token};
pub use operators::{OperandType, OperatorDescriptor};
pub use page::{Page, PageTreeCache};
pub use parser::{PDFObject, Parser, Ref};
pub use stream::Stream;
pub use sub_stream::SubStream;
pub use xref::{XRef, XRefEntry};
