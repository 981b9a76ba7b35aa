//! Evaluation state: frames, the item stack and the operand stack.
//!
//! One [`State`] exists per top-level invocation (a table load or an
//! `eval*` call). Control methods invoked from AML push frames onto the
//! same state instead of recursing, so the Rust stack depth is independent
//! of the AML call depth.

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::namespace::NodeId;
use crate::name::AmlName;
use crate::object::AmlValue;

/// How the term being parsed will be consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Statement position: any result is discarded.
    Exec,
    /// `TermArg`: evaluate to a value. Names are read, methods invoked.
    Object,
    /// `SuperName`: produce a storage location, never invoke.
    Reference,
    /// `Target`: like `Reference`, but `NullName` is allowed.
    OptionalReference,
    /// A name produces a location (methods are still invoked); anything
    /// else produces a value. Used by `DerefOf`, `SizeOf` and `Index`.
    RefOrObject,
    /// An unresolved `NameString` (definitions, `CondRefOf`).
    Name,
    /// Raw `ByteData`.
    Byte,
    /// Raw `WordData`.
    Word,
    /// Raw `DWordData`.
    DWord,
    /// Package element: unresolvable names become strings, resolvable names
    /// become handles.
    PackageElement,
}

/// A storage location an operator can write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    /// `NullName`: writes are discarded.
    Null,
    /// `LocalN` of the current frame.
    Local(u8),
    /// `ArgN` of the current frame.
    Arg(u8),
    /// A namespace object.
    Node(NodeId),
    /// The `Debug` object.
    Debug,
    /// An element of a package, buffer or string held elsewhere.
    Element {
        /// Where the container lives.
        base: Box<Target>,
        /// Element index.
        index: usize,
    },
}

/// A completed operand waiting on the operand stack.
#[derive(Debug, Clone)]
pub(crate) enum Operand {
    /// A plain value.
    Value(AmlValue),
    /// A storage location.
    Target(Target),
    /// An unresolved name.
    Name(AmlName),
}

/// What a block on a frame's block stack is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockKind {
    /// Top-level term list of a method or table.
    Body,
    /// Body of `Scope`, `Device` and the other scoped named objects.
    Scope,
    /// `If` body; a following `Else` is skipped when it completes.
    Then,
    /// `Else` body.
    Else,
    /// `While` body.
    Loop {
        /// Offset of the loop predicate.
        predicate_pc: usize,
        /// Iterations completed so far.
        iterations: u64,
    },
}

/// A nested term list being executed within a frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Block {
    pub(crate) kind: BlockKind,
    /// End offset of the block's term list.
    pub(crate) limit: usize,
    /// Namespace scope for names defined or resolved in the block.
    pub(crate) scope: NodeId,
}

/// A method invocation or table population.
pub(crate) struct Frame {
    pub(crate) code: Arc<[u8]>,
    pub(crate) pc: usize,
    pub(crate) blocks: Vec<Block>,
    pub(crate) locals: [AmlValue; 8],
    pub(crate) args: [AmlValue; 7],
    /// The method being run (`None` for table population).
    pub(crate) method: Option<NodeId>,
    /// Nodes created by this invocation, removed when it returns.
    pub(crate) temporaries: Vec<NodeId>,
}

impl Frame {
    /// A frame that runs `code[start..end]` in `scope`.
    pub(crate) fn new(
        code: Arc<[u8]>,
        start: usize,
        end: usize,
        scope: NodeId,
        method: Option<NodeId>,
    ) -> Self {
        let mut blocks = Vec::with_capacity(4);
        blocks.push(Block {
            kind: BlockKind::Body,
            limit: end,
            scope,
        });
        Self {
            code,
            pc: start,
            blocks,
            locals: Default::default(),
            args: Default::default(),
            method,
            temporaries: Vec::new(),
        }
    }

    /// Scope of the innermost block.
    pub(crate) fn scope(&self) -> Option<NodeId> {
        self.blocks.last().map(|b| b.scope)
    }

    /// End of the innermost block.
    pub(crate) fn limit(&self) -> usize {
        self.blocks.last().map_or(self.pc, |b| b.limit)
    }

    /// Returns `true` if names defined by this frame are method-scoped.
    pub(crate) fn is_method(&self) -> bool {
        self.method.is_some()
    }
}

/// A pending construct on the item stack.
#[derive(Debug, Clone)]
pub(crate) enum Item {
    /// Statement context of the frame at the matching depth.
    Frame {
        /// How the frame's return value is consumed.
        mode: Mode,
        /// Operand stack height when the frame was entered.
        base: usize,
    },
    /// An operator collecting operands.
    Op {
        op: u16,
        modes: &'static [Mode],
        base: usize,
        mode: Mode,
        /// End of the `PkgLength`-delimited encoding (0 if none).
        end: usize,
    },
    /// A `While` predicate being evaluated.
    Loop {
        predicate_pc: usize,
        end: usize,
        iterations: u64,
        base: usize,
    },
    /// A method invocation collecting arguments.
    Invoke {
        method: NodeId,
        argc: usize,
        base: usize,
        mode: Mode,
    },
    /// A `Package`/`VarPackage` collecting elements.
    Package {
        end: usize,
        /// Declared element count (`None` until a `VarPackage` count is
        /// evaluated).
        count: Option<usize>,
        base: usize,
        mode: Mode,
    },
    /// A `Buffer` waiting for its size.
    Buffer { end: usize, base: usize, mode: Mode },
}

/// The complete state of one top-level invocation.
#[derive(Default)]
pub(crate) struct State {
    pub(crate) frames: Vec<Frame>,
    pub(crate) items: Vec<Item>,
    pub(crate) operands: Vec<Operand>,
    /// AML mutexes acquired and not yet released, one entry per level.
    pub(crate) mutexes: Vec<NodeId>,
    /// Return value of the outermost frame.
    pub(crate) result: Option<AmlValue>,
}

impl State {
    /// The innermost frame.
    pub(crate) fn frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    pub(crate) fn frame_mut(&mut self) -> Option<&mut Frame> {
        self.frames.last_mut()
    }
}
