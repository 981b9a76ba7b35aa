//! The AML evaluator.
//!
//! [`Interpreter`] owns the namespace and the host, loads definition blocks
//! and evaluates namespace objects. Execution uses an explicit stack
//! ([`state`]): every step either parses the next term in the mode the
//! innermost pending item needs, or executes that item once its operands
//! are complete. AML method calls push frames onto the same stack, so deep
//! AML recursion never grows the Rust stack.

mod exec;
mod field;
mod native;
mod ops;
mod state;
mod store;
mod sync;

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, AtomicU16, Ordering};

use crate::AmlError;
use crate::host::Host;
use crate::namespace::{MethodBody, Namespace, NodeId, NodeKind};
use crate::object::{AmlValue, IntWidth};
use crate::table::{Fadt, SdtHeader};

use self::state::{Frame, Item, Mode, State, Target};

/// Default `_OSI` strings answered with `Ones`.
const DEFAULT_OSI: &[&str] = &[
    "Windows 2000",
    "Windows 2001",
    "Windows 2001 SP1",
    "Windows 2001.1",
    "Windows 2001 SP2",
    "Windows 2001.1 SP1",
    "Windows 2006",
    "Windows 2006 SP1",
    "Windows 2006.1",
    "Windows 2009",
    "Windows 2012",
    "Windows 2013",
    "Windows 2015",
    "Module Device",
    "Processor Device",
    "3.0 Thermal Model",
    "3.0 _SCP Extensions",
    "Processor Aggregator Device",
];

/// Default `\_OS_` value; firmware commonly only tests for this string.
pub(crate) const DEFAULT_OS_NAME: &str = "Microsoft Windows NT";
/// Default `\_REV` value.
pub(crate) const DEFAULT_REVISION: u64 = 2;

/// Interpreter configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Value of `\_REV`.
    pub revision: u64,
    /// Value of `\_OS_`.
    pub os_name: String,
    /// Interfaces `\_OSI` reports as supported.
    pub osi_strings: Vec<String>,
    /// Maximum iterations of a single `While` loop.
    pub loop_limit: u64,
    /// Maximum nesting of method frames within one evaluation.
    pub max_call_depth: usize,
    /// Fixed hardware description used by the services.
    pub fadt: Option<Fadt>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            revision: DEFAULT_REVISION,
            os_name: String::from(DEFAULT_OS_NAME),
            osi_strings: DEFAULT_OSI.iter().map(|&s| String::from(s)).collect(),
            loop_limit: 0xFFFF,
            max_call_depth: 64,
            fadt: None,
        }
    }
}

impl Config {
    /// Sets the value of `\_REV`.
    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Sets the value of `\_OS_`.
    #[must_use]
    pub fn with_os_name(mut self, name: &str) -> Self {
        self.os_name = String::from(name);
        self
    }

    /// Adds an interface string that `\_OSI` reports as supported.
    #[must_use]
    pub fn with_osi(mut self, interface: &str) -> Self {
        self.osi_strings.push(String::from(interface));
        self
    }

    /// Sets the `While` iteration limit.
    #[must_use]
    pub fn with_loop_limit(mut self, limit: u64) -> Self {
        self.loop_limit = limit;
        self
    }

    /// Sets the method nesting limit.
    #[must_use]
    pub fn with_max_call_depth(mut self, depth: usize) -> Self {
        self.max_call_depth = depth;
        self
    }

    /// Supplies the parsed FADT.
    #[must_use]
    pub fn with_fadt(mut self, fadt: Fadt) -> Self {
        self.fadt = Some(fadt);
        self
    }
}

/// An AML interpreter instance: one namespace plus the host it runs on.
pub struct Interpreter<H: Host> {
    pub(crate) host: H,
    pub(crate) namespace: Namespace,
    pub(crate) config: Config,
    pub(crate) width: IntWidth,
    tables_loaded: usize,
    tracing: AtomicBool,
    pub(crate) sci_event: AtomicU16,
}

/// Finalises a [`State`] exactly once, whichever way the evaluation ends.
struct StateGuard<'a, H: Host> {
    interp: &'a mut Interpreter<H>,
    state: State,
}

impl<H: Host> Drop for StateGuard<'_, H> {
    fn drop(&mut self) {
        let state = core::mem::take(&mut self.state);
        self.interp.finalize(state);
    }
}

/// Evaluates a namespace object with a list of arguments converted through
/// `AmlValue::from`.
///
/// ```ignore
/// let sta = eval_largs!(aml, node)?;
/// let res = eval_largs!(aml, pts, 5u64)?;
/// ```
#[macro_export]
macro_rules! eval_largs {
    ($interp:expr, $node:expr $(, $arg:expr)* $(,)?) => {
        $interp.eval_args($node, &[$($crate::AmlValue::from($arg)),*])
    };
}

impl<H: Host> Interpreter<H> {
    /// Creates an interpreter with a fresh namespace.
    #[must_use]
    pub fn new(host: H, config: Config) -> Self {
        let namespace = Namespace::with_os(&config.os_name, config.revision);
        Self {
            host,
            namespace,
            config,
            width: IntWidth::Bits64,
            tables_loaded: 0,
            tracing: AtomicBool::new(false),
            sci_event: AtomicU16::new(0),
        }
    }

    /// The host implementation.
    #[must_use]
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The namespace.
    #[must_use]
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns `true` if integers are 32 bits wide (DSDT revision < 2).
    #[must_use]
    pub fn is_32bit(&self) -> bool {
        self.width == IntWidth::Bits32
    }

    /// Turns per-opcode tracing on or off.
    ///
    /// While enabled, every decoded opcode is logged at `trace` level with
    /// target `hadron_aml::trace`.
    pub fn enable_tracing(&self, enable: bool) {
        self.tracing.store(enable, Ordering::Relaxed);
    }

    pub(crate) fn tracing(&self) -> bool {
        self.tracing.load(Ordering::Relaxed)
    }

    // ─── Table loading ─────────────────────────────────────────────────────

    /// Loads a DSDT or SSDT (header included) into the namespace.
    ///
    /// The DSDT's revision selects the integer width for every table.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] for a malformed header and
    /// [`AmlError::ExecutionFailure`] if the definition block fails to
    /// execute. Nodes created before the failure are kept.
    pub fn load_table(&mut self, table: &[u8]) -> Result<(), AmlError> {
        let (header, aml) = SdtHeader::split_table(table)?;
        if &header.signature == b"DSDT" || self.tables_loaded == 0 {
            self.set_revision(header.revision);
        }
        log::debug!(
            "aml: loading {} ({} bytes of AML)",
            core::str::from_utf8(&header.signature).unwrap_or("????"),
            aml.len()
        );
        self.populate(aml)
    }

    /// Loads raw AML (no table header) with the given table revision.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::ExecutionFailure`] if the definition block fails
    /// to execute. Nodes created before the failure are kept.
    pub fn load_aml(&mut self, aml: &[u8], revision: u8) -> Result<(), AmlError> {
        if self.tables_loaded == 0 {
            self.set_revision(revision);
        }
        self.populate(aml)
    }

    fn set_revision(&mut self, revision: u8) {
        self.width = if revision < 2 {
            IntWidth::Bits32
        } else {
            IntWidth::Bits64
        };
    }

    fn populate(&mut self, aml: &[u8]) -> Result<(), AmlError> {
        self.tables_loaded += 1;
        let code: Arc<[u8]> = Arc::from(aml);
        let root = self.namespace.root();
        let end = code.len();

        let mut guard = StateGuard {
            interp: self,
            state: State::default(),
        };
        let guard = &mut guard;
        guard.state.frames.push(Frame::new(code, 0, end, root, None));
        guard.state.items.push(Item::Frame {
            mode: Mode::Exec,
            base: 0,
        });
        guard.interp.run(&mut guard.state).map_err(|err| {
            log::error!("aml: table load failed: {err}");
            AmlError::ExecutionFailure
        })
    }

    // ─── Evaluation ────────────────────────────────────────────────────────

    /// Evaluates `node` without arguments.
    ///
    /// # Errors
    ///
    /// See [`eval_args`](Self::eval_args).
    pub fn eval(&mut self, node: NodeId) -> Result<AmlValue, AmlError> {
        self.eval_args(node, &[])
    }

    /// Evaluates `node` with the given arguments.
    ///
    /// Methods are invoked (missing arguments read as uninitialized).
    /// `Name` objects yield their value, fields are read, and devices and
    /// other objects yield a [`AmlValue::Handle`] to themselves.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NoSuchNode`] for unknown nodes,
    /// [`AmlError::IllegalArguments`] for more than 7 arguments, or any
    /// error the evaluation itself raises.
    pub fn eval_args(&mut self, node: NodeId, args: &[AmlValue]) -> Result<AmlValue, AmlError> {
        if args.len() > 7 {
            return Err(AmlError::IllegalArguments);
        }
        let node = self.namespace.resolve_alias(node);
        let kind = self.namespace.node(node)?.kind().clone();

        let mut guard = StateGuard {
            interp: self,
            state: State::default(),
        };
        let guard = &mut guard;
        let result = match kind {
            NodeKind::Method(method) => match method.body {
                MethodBody::Native(native) => guard.interp.call_native(native, args),
                MethodBody::Aml { code, start, end } => {
                    let mut frame = Frame::new(code, start, end, node, Some(node));
                    for (slot, arg) in frame.args.iter_mut().zip(args) {
                        *slot = arg.clone();
                    }
                    guard.state.frames.push(frame);
                    guard.state.items.push(Item::Frame {
                        mode: Mode::Object,
                        base: 0,
                    });
                    guard
                        .interp
                        .run(&mut guard.state)
                        .map(|()| guard.state.result.take().unwrap_or_default())
                }
            },
            _ => guard.interp.load(&mut guard.state, &Target::Node(node)),
        };
        if let Err(err) = result {
            log::error!(
                "aml: evaluation of {} failed: {err}",
                guard.interp.namespace.path_of(node)
            );
        }
        result
    }

    /// Resolves `path` relative to `context` and evaluates it.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NoSuchNode`] if the path does not resolve, or
    /// any error from [`eval_args`](Self::eval_args).
    pub fn eval_path(
        &mut self,
        context: Option<NodeId>,
        path: &str,
        args: &[AmlValue],
    ) -> Result<AmlValue, AmlError> {
        let node = self.namespace.resolve_path(context, path)?;
        self.eval_args(node, args)
    }

    /// Evaluates the child `name` of `node` if it exists.
    ///
    /// Returns `Ok(None)` when there is no such child.
    pub(crate) fn eval_child(
        &mut self,
        node: NodeId,
        name: &str,
        args: &[AmlValue],
    ) -> Result<Option<AmlValue>, AmlError> {
        let seg = crate::name::NameSeg::from_str_padded(name)?;
        match self.namespace.child(node, seg) {
            Some(child) => self.eval_args(child, args).map(Some),
            None => Ok(None),
        }
    }

    /// Evaluates the integer child `name` of `node`, if it exists.
    pub(crate) fn eval_child_integer(
        &mut self,
        node: NodeId,
        name: &str,
    ) -> Result<Option<u64>, AmlError> {
        match self.eval_child(node, name, &[])? {
            Some(v) => crate::object::to_integer(&v, self.width).map(Some),
            None => Ok(None),
        }
    }

    /// Releases everything a finished (or aborted) evaluation still holds.
    fn finalize(&mut self, mut state: State) {
        while let Some(frame) = state.frames.pop() {
            self.drop_frame(frame);
        }
        for node in state.mutexes.drain(..).rev() {
            self.release_aml_mutex(node);
        }
    }

    /// Removes the method-scoped nodes of a finished frame.
    pub(crate) fn drop_frame(&mut self, frame: Frame) {
        for node in frame.temporaries.into_iter().rev() {
            self.namespace.remove(node);
        }
    }
}
