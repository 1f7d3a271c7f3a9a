//! The content-stream operator table: a fixed table of ~70 descriptors with
//! per-argument type checks, looked up by binary search.
//!
//! The interpreter (`content_stream`/`rendering::context`) consults this
//! table before dispatch: an unknown name, an arity mismatch, or an
//! argument-type mismatch is a recoverable error that skips the operator
//! rather than aborting the stream.

use crate::core::parser::PDFObject;

/// Operand type kinds used for per-argument type checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandType {
    Bool,
    Int,
    Num,
    String,
    Name,
    Array,
    /// `DP`/`BDC` property operand: a dictionary or the name of one in Properties.
    Props,
    /// `SC`/`SCN` color operand: a number (component) or a pattern name.
    Scn,
}

impl OperandType {
    /// Whether `obj` satisfies this operand kind.
    pub fn accepts(self, obj: &PDFObject) -> bool {
        match (self, obj) {
            (OperandType::Bool, PDFObject::Boolean(_)) => true,
            (OperandType::Int, PDFObject::Number(n)) => n.fract() == 0.0,
            (OperandType::Num, PDFObject::Number(_)) => true,
            (OperandType::String, PDFObject::String(_)) => true,
            (OperandType::String, PDFObject::HexString(_)) => true,
            (OperandType::Name, PDFObject::Name(_)) => true,
            (OperandType::Array, PDFObject::Array(_)) => true,
            (OperandType::Props, PDFObject::Dictionary(_)) => true,
            (OperandType::Props, PDFObject::Name(_)) => true,
            (OperandType::Scn, PDFObject::Number(_)) => true,
            (OperandType::Scn, PDFObject::Name(_)) => true,
            _ => false,
        }
    }
}

/// A single operator's dispatch metadata.
///
/// `arity >= 0` means "exactly `arity` operands"; fewer is a recoverable
/// error (operator skipped), more accepts the trailing `arity` and discards
/// the rest. `arity < 0` means "up to `|arity|` operands" (the variadic
/// `SC`/`SCN`/`sc`/`scn` color operators).
#[derive(Debug, Clone, Copy)]
pub struct OperatorDescriptor {
    pub name: &'static str,
    pub arity: i32,
    pub argtypes: &'static [OperandType],
}

impl OperatorDescriptor {
    pub fn is_variadic(&self) -> bool {
        self.arity < 0
    }

    /// Number of operands required (lower bound).
    pub fn min_args(&self) -> usize {
        if self.arity >= 0 {
            self.arity as usize
        } else {
            0
        }
    }

    /// Number of operands accepted (upper bound).
    pub fn max_args(&self) -> usize {
        self.arity.unsigned_abs() as usize
    }
}

use OperandType::*;

const NUM6: &[OperandType] = &[Num, Num, Num, Num, Num, Num];
const NUM4: &[OperandType] = &[Num, Num, Num, Num];
const NUM3: &[OperandType] = &[Num, Num, Num];
const NUM2: &[OperandType] = &[Num, Num];
const NUM1: &[OperandType] = &[Num];
const SCN32: &[OperandType] = &[
    Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn,
    Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn, Scn,
];

/// The operator table, sorted by ASCII byte order of `name` for binary search.
///
/// 73 entries: the ~70 content-stream operators from ISO 32000-1 table 51
/// plus the two text-showing shorthands (`'`, `"`) and the `d0`/`d1`
/// Type-3 glyph-metric operators.
pub static OPERATORS: &[OperatorDescriptor] = &[
    OperatorDescriptor { name: "\"", arity: 3, argtypes: &[Num, Num, String] },
    OperatorDescriptor { name: "'", arity: 1, argtypes: &[String] },
    OperatorDescriptor { name: "B", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "B*", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "BDC", arity: 2, argtypes: &[Name, Props] },
    OperatorDescriptor { name: "BI", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "BMC", arity: 1, argtypes: &[Name] },
    OperatorDescriptor { name: "BT", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "BX", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "CS", arity: 1, argtypes: &[Name] },
    OperatorDescriptor { name: "DP", arity: 2, argtypes: &[Name, Props] },
    OperatorDescriptor { name: "Do", arity: 1, argtypes: &[Name] },
    OperatorDescriptor { name: "EI", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "EMC", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "ET", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "EX", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "F", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "G", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "ID", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "J", arity: 1, argtypes: &[Int] },
    OperatorDescriptor { name: "K", arity: 4, argtypes: NUM4 },
    OperatorDescriptor { name: "M", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "MP", arity: 1, argtypes: &[Name] },
    OperatorDescriptor { name: "Q", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "RG", arity: 3, argtypes: NUM3 },
    OperatorDescriptor { name: "S", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "SC", arity: -32, argtypes: SCN32 },
    OperatorDescriptor { name: "SCN", arity: -33, argtypes: SCN32 },
    OperatorDescriptor { name: "T*", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "TD", arity: 2, argtypes: NUM2 },
    OperatorDescriptor { name: "TJ", arity: 1, argtypes: &[Array] },
    OperatorDescriptor { name: "TL", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "Tc", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "Td", arity: 2, argtypes: NUM2 },
    OperatorDescriptor { name: "Tf", arity: 2, argtypes: &[Name, Num] },
    OperatorDescriptor { name: "Tj", arity: 1, argtypes: &[String] },
    OperatorDescriptor { name: "Tm", arity: 6, argtypes: NUM6 },
    OperatorDescriptor { name: "Tr", arity: 1, argtypes: &[Int] },
    OperatorDescriptor { name: "Ts", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "Tw", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "Tz", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "W", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "W*", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "b", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "b*", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "c", arity: 6, argtypes: NUM6 },
    OperatorDescriptor { name: "cm", arity: 6, argtypes: NUM6 },
    OperatorDescriptor { name: "cs", arity: 1, argtypes: &[Name] },
    OperatorDescriptor { name: "d", arity: 2, argtypes: &[Array, Num] },
    OperatorDescriptor { name: "d0", arity: 2, argtypes: NUM2 },
    OperatorDescriptor { name: "d1", arity: 6, argtypes: NUM6 },
    OperatorDescriptor { name: "f", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "f*", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "g", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "gs", arity: 1, argtypes: &[Name] },
    OperatorDescriptor { name: "h", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "i", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "j", arity: 1, argtypes: &[Int] },
    OperatorDescriptor { name: "k", arity: 4, argtypes: NUM4 },
    OperatorDescriptor { name: "l", arity: 2, argtypes: NUM2 },
    OperatorDescriptor { name: "m", arity: 2, argtypes: NUM2 },
    OperatorDescriptor { name: "n", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "q", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "re", arity: 4, argtypes: NUM4 },
    OperatorDescriptor { name: "rg", arity: 3, argtypes: NUM3 },
    OperatorDescriptor { name: "ri", arity: 1, argtypes: &[Name] },
    OperatorDescriptor { name: "s", arity: 0, argtypes: &[] },
    OperatorDescriptor { name: "sc", arity: -32, argtypes: SCN32 },
    OperatorDescriptor { name: "scn", arity: -33, argtypes: SCN32 },
    OperatorDescriptor { name: "sh", arity: 1, argtypes: &[Name] },
    OperatorDescriptor { name: "v", arity: 4, argtypes: NUM4 },
    OperatorDescriptor { name: "w", arity: 1, argtypes: NUM1 },
    OperatorDescriptor { name: "y", arity: 4, argtypes: NUM4 },
];

/// Look up an operator by its ASCII name via binary search on the sorted table.
pub fn find_op(name: &str) -> Option<&'static OperatorDescriptor> {
    OPERATORS
        .binary_search_by(|d| d.name.cmp(name))
        .ok()
        .map(|i| &OPERATORS[i])
}

/// The result of validating an operand stack against an operator's descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeCheckResult<'a> {
    /// Dispatch with this operand slice (trailing operands for overfull
    /// fixed-arity calls, the full slice otherwise).
    Dispatch(&'a [PDFObject]),
    /// Skip the operator: too few operands, or a type mismatch.
    Skip(String),
}

/// Validate operand arity and per-argument types for `desc` against `args`,
/// Fewer operands than required, or any type mismatch, is a
/// recoverable error that skips the operator. More operands than a
/// fixed-arity operator needs accepts the trailing `arity` and discards the
/// earlier ones (matches PDF producers that emit redundant leading operands).
pub fn type_check<'a>(desc: &OperatorDescriptor, args: &'a [PDFObject]) -> TypeCheckResult<'a> {
    if args.len() < desc.min_args() {
        return TypeCheckResult::Skip(format!(
            "operator {} requires at least {} operand(s), got {}",
            desc.name,
            desc.min_args(),
            args.len()
        ));
    }

    let used = if desc.is_variadic() {
        args.len().min(desc.max_args())
    } else {
        desc.arity as usize
    };
    let slice = &args[args.len() - used..];

    for (i, obj) in slice.iter().enumerate() {
        let expected = if desc.argtypes.is_empty() {
            continue;
        } else if i < desc.argtypes.len() {
            desc.argtypes[i]
        } else {
            // Variadic operators repeat their single operand kind.
            *desc.argtypes.last().unwrap()
        };
        if !expected.accepts(obj) {
            return TypeCheckResult::Skip(format!(
                "operator {} argument {} has wrong type: expected {:?}, found {:?}",
                desc.name, i, expected, obj
            ));
        }
    }

    TypeCheckResult::Dispatch(slice)
}
