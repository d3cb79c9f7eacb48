//! Bridge for calling host functions from paths and templates.
//!
//! Two process-wide, append-only tables drive the bridge: constructors
//! (`name -> Invoker factory`) and plain functions (`name -> fn(context,
//! args, cursor) -> bytes`). A node binds itself by carrying a `!type`
//! child:
//!
//! ```text
//! esc
//!   !type function        # `esc(x)` calls the function table entry
//! db
//!   !type mydb            # `db.query(q)` instantiates `mydb` once and
//!   !init                 # invokes methods through its Invoker
//!     file data.db
//! math
//!   !type rfunction       # `math.add(1,2)` round-trips a binary object
//!   !init                 # over a byte-stream transport
//!     host 127.0.0.1:1111
//! ```
//!
//! On first use the constructed handle is cached as the second child of
//! `!type`, so later calls reuse the instance. Host objects are reached
//! through the [`Invoker`] capability; nothing here inspects host types.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{self, Write};
use std::net::TcpStream;
use std::rc::Rc;
use std::sync::{OnceLock, RwLock};

use tracing::debug;

use crate::binary::BinReader;
use crate::error::EvalError;
use crate::eval::{self, node_at, node_at_mut, Value};
use crate::graph::{Graph, Payload, TYPE_GROUP};
use crate::template;

/// Abstract capability over a constructed host object: field and method
/// access without reflection.
pub trait Invoker {
    /// Called once after construction with the node's `!init` subtree.
    fn init(&self, _settings: &Graph) {}

    /// Invoke a named method (or read a named field) with evaluated
    /// arguments.
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, EvalError>;
}

/// Factory for [`Invoker`] instances.
pub type ConstructorFn = Box<dyn Fn() -> Rc<dyn Invoker> + Send + Sync>;

/// A plain function callable from templates: (context, argument tree,
/// cursor) to bytes.
pub type FunctionFn = Box<dyn Fn(&Graph, &Graph, usize) -> Vec<u8> + Send + Sync>;

#[derive(Default)]
struct Registry {
    constructors: HashMap<String, ConstructorFn>,
    functions: HashMap<String, FunctionFn>,
}

fn registry() -> &'static RwLock<Registry> {
    static REGISTRY: OnceLock<RwLock<Registry>> = OnceLock::new();
    REGISTRY.get_or_init(|| {
        let mut r = Registry::default();
        // "T" renders its argument as a sub-template against the calling
        // context.
        r.functions.insert(
            "T".to_string(),
            Box::new(|ctx: &Graph, args: &Graph, _: usize| {
                match template::parse_template(&args.text()) {
                    Ok(t) => template::process(&t, &mut ctx.clone()),
                    Err(_) => Vec::new(),
                }
            }),
        );
        RwLock::new(r)
    })
}

/// Register a constructor under a type name.
pub fn function_add_constructor(name: &str, f: ConstructorFn) {
    if let Ok(mut r) = registry().write() {
        r.constructors.insert(name.to_string(), f);
    }
}

/// Register a plain function under a name.
pub fn function_add(name: &str, f: FunctionFn) {
    if let Ok(mut r) = registry().write() {
        r.functions.insert(name.to_string(), f);
    }
}

// ============================================================================
// Dispatch
// ============================================================================

/// Called by path evaluation when the node at `cur` carries a `!type`
/// child. `ix` is the path element following the one that selected the
/// node.
pub(crate) fn call(
    ctx: &mut Graph,
    cur: &[usize],
    path: &Graph,
    ix: usize,
) -> Result<Value, EvalError> {
    let type_name = node_at(ctx, cur)
        .node("!type")
        .and_then(|t| t.get(0))
        .map(|n| n.payload.to_text());
    let Some(type_name) = type_name else {
        return Ok(Value::Null);
    };

    match type_name.as_str() {
        "function" => {
            let fname = match ix.checked_sub(1).and_then(|i| path.get(i)) {
                Some(n) => n.payload.to_text(),
                None => return Err(EvalError::MissingMethod(String::new())),
            };
            // arguments first; the table call sees the context read-only
            let mut args = Graph::nil();
            if let Some(group) = path.get(ix).filter(|g| g.payload.text_eq(TYPE_GROUP)) {
                for a in &group.children {
                    let v = eval::eval(ctx, a)?;
                    args.add(v.scalar_text());
                }
            }
            let reg = registry()
                .read()
                .map_err(|_| EvalError::TypeMismatch("function table poisoned"))?;
            let f = reg
                .functions
                .get(&fname)
                .ok_or_else(|| EvalError::UnknownFunction(fname.clone()))?;
            Ok(Value::Bytes(f(&*ctx, &args, 0)))
        }

        "rfunction" => {
            let invoker = match cached_handle(ctx, cur) {
                Some(h) => h,
                None => {
                    let init = node_at(ctx, cur)
                        .node("!init")
                        .cloned()
                        .unwrap_or_default();
                    let rf: Rc<dyn Invoker> = Rc::new(RFunction::connect(&init)?);
                    cache_handle(ctx, cur, rf.clone());
                    rf
                }
            };
            invoke_through(ctx, &*invoker, path, ix)
        }

        name => {
            let invoker = match cached_handle(ctx, cur) {
                Some(h) => h,
                None => {
                    let built = {
                        let reg = registry()
                            .read()
                            .map_err(|_| EvalError::TypeMismatch("function table poisoned"))?;
                        let ctor = reg
                            .constructors
                            .get(name)
                            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
                        ctor()
                    };
                    if let Some(init) = node_at(ctx, cur).node("!init").cloned() {
                        built.init(&init);
                    }
                    cache_handle(ctx, cur, built.clone());
                    built
                }
            };
            invoke_through(ctx, &*invoker, path, ix)
        }
    }
}

/// Resolve the method name and argument group from the path tail and
/// invoke. A missing argument group means a field read.
fn invoke_through(
    ctx: &mut Graph,
    invoker: &dyn Invoker,
    path: &Graph,
    ix: usize,
) -> Result<Value, EvalError> {
    let method = path
        .get(ix)
        .map(|n| n.payload.to_text())
        .ok_or_else(|| EvalError::MissingMethod(String::new()))?;

    let mut args = Vec::new();
    if let Some(group) = path.get(ix + 1).filter(|g| g.payload.text_eq(TYPE_GROUP)) {
        for a in &group.children {
            args.push(eval::eval(ctx, a)?);
        }
    }
    invoker.invoke(&method, &args)
}

fn cached_handle(ctx: &Graph, cur: &[usize]) -> Option<Rc<dyn Invoker>> {
    let t = node_at(ctx, cur).node("!type")?;
    match &t.get(1)?.payload {
        Payload::Handle(h) => Some(h.clone()),
        _ => None,
    }
}

fn cache_handle(ctx: &mut Graph, cur: &[usize], handle: Rc<dyn Invoker>) {
    if let Some(t) = node_at_mut(ctx, cur).node_mut("!type") {
        t.children.push(Graph::new(Payload::Handle(handle)));
    }
}

// ============================================================================
// Remote functions
// ============================================================================

/// Byte-stream transport for remote functions. Request and response are
/// each one self-contained binary object; the transport adds no framing
/// of its own.
pub trait Transport {
    fn roundtrip(&mut self, request: &[u8]) -> io::Result<Vec<u8>>;
}

/// TCP transport: writes the request, then reads exactly one binary
/// object back.
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    pub fn connect(addr: &str) -> io::Result<TcpTransport> {
        Ok(TcpTransport {
            stream: TcpStream::connect(addr)?,
        })
    }
}

impl Transport for TcpTransport {
    fn roundtrip(&mut self, request: &[u8]) -> io::Result<Vec<u8>> {
        self.stream.write_all(request)?;
        self.stream.flush()?;
        BinReader::new(&mut self.stream)
            .read_raw()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
    }
}

/// A remote function: calls serialize the argument tree and parse the
/// binary response into a tree.
pub struct RFunction {
    transport: RefCell<Box<dyn Transport>>,
}

impl RFunction {
    /// Connect over TCP using the `host` entry of an `!init` subtree.
    pub fn connect(init: &Graph) -> Result<RFunction, EvalError> {
        let addr = init
            .node("host")
            .and_then(|n| n.get(0))
            .map(|n| n.payload.to_text())
            .ok_or(EvalError::TypeMismatch("rfunction init is missing host"))?;
        Ok(RFunction::with_transport(Box::new(TcpTransport::connect(
            &addr,
        )?)))
    }

    /// Use a caller-provided transport.
    pub fn with_transport(transport: Box<dyn Transport>) -> RFunction {
        RFunction {
            transport: RefCell::new(transport),
        }
    }

    /// One request/response round-trip.
    pub fn call(&self, request: &Graph) -> Result<Graph, EvalError> {
        let bytes = request.to_binary()?;
        debug!(len = bytes.len(), "remote function request");
        let response = self.transport.borrow_mut().roundtrip(&bytes)?;
        debug!(len = response.len(), "remote function response");
        Ok(Graph::from_binary(&response)?)
    }
}

impl Invoker for RFunction {
    fn invoke(&self, method: &str, args: &[Value]) -> Result<Value, EvalError> {
        let mut request = Graph::new(method);
        for v in args {
            match v {
                Value::Graph(g) if !g.children.is_empty() => {
                    request.add("_").add_node(g.clone());
                }
                other => {
                    request.add(other.scalar_text());
                }
            }
        }
        Ok(Value::Graph(self.call(&request)?))
    }
}
