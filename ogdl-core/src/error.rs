//! Error types for parsing, the binary codec, evaluation and the log.

use std::io;
use thiserror::Error;

/// Error raised by the text parser. Carries the source position at which
/// the parse gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} at line {line}, column {column}")]
pub struct SyntaxError {
    pub message: String,
    /// 1-based source line.
    pub line: usize,
    /// Runes since the last line break.
    pub column: usize,
}

/// Error raised by the binary reader or writer.
#[derive(Debug, Error)]
pub enum BinaryError {
    #[error("missing binary header")]
    MissingHeader,

    #[error("truncated binary object")]
    Truncated,

    #[error("unknown type byte {0:#04x}")]
    UnknownType(u8),

    #[error("varint overflow")]
    VarintOverflow,

    #[error("payload cannot be serialized")]
    UnsupportedPayload,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Error raised while evaluating a path or expression.
///
/// A path that selects nothing is not an error; evaluation yields a null
/// value instead.
#[derive(Debug, Error)]
pub enum EvalError {
    #[error("function not in table: {0}")]
    UnknownFunction(String),

    #[error("no method {0}")]
    MissingMethod(String),

    #[error("type mismatch: {0}")]
    TypeMismatch(&'static str),

    #[error("division by zero")]
    DivisionByZero,

    #[error("target of for is not iterable")]
    NotIterable,

    #[error("assignment target is not a path")]
    BadAssignment,

    #[error("syntax error: {0}")]
    Syntax(#[from] SyntaxError),

    #[error("binary error: {0}")]
    Binary(#[from] BinaryError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Error raised by the log store.
#[derive(Debug, Error)]
pub enum LogError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{0}")]
    Binary(#[from] BinaryError),
}
