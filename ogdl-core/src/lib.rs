//! OGDL core toolkit.
//!
//! OGDL (Ordered Graph Data Language) is a text and binary representation
//! for hierarchical data. This crate reads OGDL text into trees,
//! serializes trees to a compact binary form, evaluates paths and
//! expressions against trees, renders text templates, and appends binary
//! objects to a log file.
//!
//! # Architecture
//!
//! - **chars.rs** - character classification predicates
//! - **stream.rs** - rune reader with push-back and position tracking
//! - **graph.rs** - the [`Graph`] tree and its [`Payload`]
//! - **event.rs** - depth-tagged event sink building trees
//! - **parser.rs** - recursive-descent text/path/expression productions
//! - **binary.rs** - varints, binary writer and streaming reader
//! - **eval.rs** - path walking and expression evaluation
//! - **template.rs** - `$`-directive templates
//! - **function.rs** - host and remote function bridge
//! - **log.rs** - append-only store of binary objects
//!
//! # Example
//!
//! ```
//! use ogdl_core::Graph;
//!
//! let mut config = Graph::parse("server\n  port 8080\n").unwrap();
//! let port = config.get_path("server.port").unwrap();
//! assert_eq!(port.scalar_text(), "8080");
//! ```

pub mod binary;
pub mod chars;
pub mod error;
pub mod eval;
pub mod event;
pub mod function;
pub mod graph;
pub mod log;
pub mod parser;
pub mod stream;
pub mod template;

pub use binary::BinReader;
pub use error::{BinaryError, EvalError, LogError, SyntaxError};
pub use eval::{assign, Value};
pub use event::EventHandler;
pub use function::{
    function_add, function_add_constructor, Invoker, RFunction, Transport,
};
pub use graph::{Graph, Payload};
pub use log::Log;
pub use parser::Parser;
pub use template::{parse_template, process};
