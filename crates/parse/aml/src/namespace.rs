//! The ACPI namespace tree.
//!
//! Nodes live in an append-only arena and refer to each other by
//! [`NodeId`]. Parent links are plain indices, so there is no ownership
//! cycle between a node and its children. Node ids are never reused: a
//! method-scoped object that goes away when its method returns is unlinked
//! from its parent and marked dead, and every lookup and iterator skips it.

use alloc::sync::Arc;
use alloc::vec::Vec;

use bitflags::bitflags;

use crate::AmlError;
use crate::interp::{DEFAULT_OS_NAME, DEFAULT_REVISION};
use crate::name::{AmlName, NameSeg};
use crate::object::AmlValue;

/// Index of a node in the [`Namespace`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Returns the arena index of this node.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

bitflags! {
    /// `MethodFlags` byte of a `DefMethod`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodFlags: u8 {
        /// Argument count (0-7).
        const ARG_COUNT = 0b0000_0111;
        /// The method is `Serialized`.
        const SERIALIZED = 0b0000_1000;
        /// Sync level of a serialized method.
        const SYNC_LEVEL = 0b1111_0000;
    }
}

impl MethodFlags {
    /// Number of arguments the method declares.
    #[must_use]
    pub fn arg_count(self) -> usize {
        usize::from(self.bits() & 0x07)
    }

    /// Returns `true` for `Serialized` methods.
    #[must_use]
    pub fn serialized(self) -> bool {
        self.contains(Self::SERIALIZED)
    }

    /// Sync level of a serialized method.
    #[must_use]
    pub fn sync_level(self) -> u8 {
        self.bits() >> 4
    }
}

bitflags! {
    /// `FieldFlags` byte of `Field`, `IndexField` and `BankField`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FieldFlags: u8 {
        /// Access type (`AnyAcc` .. `BufferAcc`).
        const ACCESS_TYPE = 0b0000_1111;
        /// The global lock must be held while accessing the field.
        const LOCK = 0b0001_0000;
        /// Update rule (`Preserve`, `WriteAsOnes`, `WriteAsZeros`).
        const UPDATE_RULE = 0b0110_0000;
    }
}

/// Field access width selected by the `FieldFlags` access type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessType {
    /// `AnyAcc`: the interpreter picks byte accesses.
    Any,
    /// `ByteAcc`.
    Byte,
    /// `WordAcc`.
    Word,
    /// `DWordAcc`.
    DWord,
    /// `QWordAcc`.
    QWord,
    /// `BufferAcc` (treated as byte accesses for memory and I/O spaces).
    Buffer,
}

impl AccessType {
    /// Access width in bits.
    #[must_use]
    pub fn bits(self) -> u64 {
        match self {
            Self::Any | Self::Byte | Self::Buffer => 8,
            Self::Word => 16,
            Self::DWord => 32,
            Self::QWord => 64,
        }
    }
}

/// What a field write does with bits of the access unit outside the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateRule {
    /// Read-modify-write the surrounding bits.
    Preserve,
    /// Fill the surrounding bits with ones.
    WriteAsOnes,
    /// Fill the surrounding bits with zeros.
    WriteAsZeros,
}

impl FieldFlags {
    /// Decoded access type. Reserved encodings fall back to byte access.
    #[must_use]
    pub fn access_type(self) -> AccessType {
        match self.bits() & 0x0F {
            0 => AccessType::Any,
            2 => AccessType::Word,
            3 => AccessType::DWord,
            4 => AccessType::QWord,
            5 => AccessType::Buffer,
            _ => AccessType::Byte,
        }
    }

    /// Decoded update rule. The reserved encoding behaves like `Preserve`.
    #[must_use]
    pub fn update_rule(self) -> UpdateRule {
        match (self.bits() >> 5) & 0x03 {
            1 => UpdateRule::WriteAsOnes,
            2 => UpdateRule::WriteAsZeros,
            _ => UpdateRule::Preserve,
        }
    }

    /// Returns a copy with the access type replaced (used by `AccessAs`).
    #[must_use]
    pub fn with_access_type(self, access: u8) -> Self {
        Self::from_bits_retain((self.bits() & !0x0F) | (access & 0x0F))
    }
}

/// Native control methods implemented by the interpreter itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeMethod {
    /// `\_OSI`: operating system interface query.
    Osi,
}

/// Body of a control method.
#[derive(Debug, Clone)]
pub enum MethodBody {
    /// AML bytecode in `code[start..end]`.
    Aml {
        /// The table image the method was defined in.
        code: Arc<[u8]>,
        /// Offset of the first byte of the method's term list.
        start: usize,
        /// Offset one past the last byte of the method's term list.
        end: usize,
    },
    /// A method provided by the interpreter.
    Native(NativeMethod),
}

/// A control method.
#[derive(Debug, Clone)]
pub struct Method {
    /// Declared flags (argument count, serialization, sync level).
    pub flags: MethodFlags,
    /// Bytecode or native implementation.
    pub body: MethodBody,
}

/// Address space of an operation region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSpace {
    /// `SystemMemory`.
    SystemMemory,
    /// `SystemIO`.
    SystemIo,
    /// `PCI_Config`.
    PciConfig,
    /// `EmbeddedControl`.
    EmbeddedControl,
    /// `SMBus`.
    SmBus,
    /// `SystemCMOS`.
    SystemCmos,
    /// `PciBarTarget`.
    PciBarTarget,
    /// `IPMI`.
    Ipmi,
    /// `GeneralPurposeIO`.
    GeneralPurposeIo,
    /// `GenericSerialBus`.
    GenericSerialBus,
    /// `PCC`.
    Pcc,
    /// OEM-defined or reserved space.
    Other(u8),
}

impl From<u8> for RegionSpace {
    fn from(v: u8) -> Self {
        match v {
            0x00 => Self::SystemMemory,
            0x01 => Self::SystemIo,
            0x02 => Self::PciConfig,
            0x03 => Self::EmbeddedControl,
            0x04 => Self::SmBus,
            0x05 => Self::SystemCmos,
            0x06 => Self::PciBarTarget,
            0x07 => Self::Ipmi,
            0x08 => Self::GeneralPurposeIo,
            0x09 => Self::GenericSerialBus,
            0x0A => Self::Pcc,
            other => Self::Other(other),
        }
    }
}

/// An operation region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpRegion {
    /// Address space.
    pub space: RegionSpace,
    /// Base offset within the space.
    pub offset: u64,
    /// Length in bytes.
    pub length: u64,
}

/// How a field unit reaches its backing storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// `Field`: direct access into an operation region.
    Normal {
        /// The `OperationRegion` node.
        region: NodeId,
    },
    /// `IndexField`: write the offset to `index`, then access `data`.
    Index {
        /// Index register field.
        index: NodeId,
        /// Data register field.
        data: NodeId,
    },
    /// `BankField`: write `value` to `bank`, then access the region.
    Bank {
        /// The `OperationRegion` node.
        region: NodeId,
        /// Bank selector field.
        bank: NodeId,
        /// Value selecting this bank.
        value: u64,
    },
}

/// A named field unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldUnit {
    /// Backing storage.
    pub kind: FieldKind,
    /// Offset of the first bit.
    pub bit_offset: u64,
    /// Width in bits.
    pub bit_length: u64,
    /// Access type, lock and update rule.
    pub flags: FieldFlags,
}

/// Method-frame storage slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameSlot {
    /// `LocalN`.
    Local(u8),
    /// `ArgN`.
    Arg(u8),
}

/// Buffer that backs a buffer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSource {
    /// A named buffer object.
    Node(NodeId),
    /// A local or argument of a running method. Only valid while that
    /// method runs; the field node is method-scoped and dies with it.
    Frame {
        /// Depth of the owning frame on the evaluation's frame stack.
        depth: usize,
        /// The slot within the frame.
        slot: FrameSlot,
    },
}

/// A field created by `CreateField` and friends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferField {
    /// Backing buffer.
    pub source: BufferSource,
    /// Offset of the first bit.
    pub bit_offset: u64,
    /// Width in bits.
    pub bit_length: u64,
}

/// Current holder of an AML mutex.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutexOwner {
    /// Held by the host through [`Interpreter::acquire_mutex`](crate::Interpreter::acquire_mutex).
    Host,
    /// Held by AML code.
    Aml,
}

/// State of an AML `Mutex` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MutexObject {
    /// Declared sync level.
    pub sync_level: u8,
    /// Current owner, if locked.
    pub owner: Option<MutexOwner>,
    /// Recursion depth of the current owner.
    pub depth: u32,
}

/// State of an AML `Event` object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EventObject {
    /// Signals not yet consumed by a `Wait`.
    pub pending: u64,
}

/// Kind of a namespace node, with its kind-specific payload.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// The root (`\`).
    Root,
    /// A `Scope` or predefined scope such as `\_SB_`.
    Scope,
    /// A `Device`.
    Device,
    /// A `Processor`.
    Processor {
        /// Processor ID.
        id: u8,
        /// Processor block address.
        pblk_address: u32,
        /// Processor block length.
        pblk_length: u8,
    },
    /// A `PowerResource`.
    PowerResource {
        /// Deepest system sleep level the resource must be on in.
        system_level: u8,
        /// Ordering among power resources.
        resource_order: u16,
    },
    /// A `ThermalZone`.
    ThermalZone,
    /// A `Name` object (the value lives in [`Node::object`]).
    Name,
    /// A control method.
    Method(Method),
    /// An `Alias` for another node.
    Alias(NodeId),
    /// An `OperationRegion`.
    OpRegion(OpRegion),
    /// A `Field`, `IndexField` or `BankField` unit.
    Field(FieldUnit),
    /// A `CreateXxxField` unit.
    BufferField(BufferField),
    /// A `Mutex`.
    Mutex(MutexObject),
    /// An `Event`.
    Event(EventObject),
}

impl NodeKind {
    /// Returns `true` for kinds that open a new scope (and may therefore be
    /// re-opened by `Scope`).
    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(
            self,
            Self::Root
                | Self::Scope
                | Self::Device
                | Self::Processor { .. }
                | Self::PowerResource { .. }
                | Self::ThermalZone
        )
    }

    /// AML `ObjectType` code for this kind of node.
    #[must_use]
    pub fn object_type_code(&self, object: &AmlValue) -> u64 {
        match self {
            Self::Name => match object {
                AmlValue::Uninitialized => 0,
                AmlValue::Integer(_) => 1,
                AmlValue::String(_) => 2,
                AmlValue::Buffer(_) => 3,
                AmlValue::Package(_) => 4,
                AmlValue::Handle(_) => 20,
            },
            Self::Field(_) => 5,
            Self::Device => 6,
            Self::Event(_) => 7,
            Self::Method(_) => 8,
            Self::Mutex(_) => 9,
            Self::OpRegion(_) => 10,
            Self::PowerResource { .. } => 11,
            Self::Processor { .. } => 12,
            Self::ThermalZone => 13,
            Self::BufferField(_) => 14,
            Self::Root | Self::Scope | Self::Alias(_) => 0,
        }
    }
}

/// A single node in the ACPI namespace.
#[derive(Debug, Clone)]
pub struct Node {
    name: NameSeg,
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    /// Value attached to the node (`Name` objects).
    pub(crate) object: AmlValue,
    live: bool,
}

impl Node {
    /// Local name of this node.
    #[must_use]
    pub fn name(&self) -> NameSeg {
        self.name
    }

    /// Kind of namespace object, with its payload.
    #[must_use]
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub(crate) fn kind_mut(&mut self) -> &mut NodeKind {
        &mut self.kind
    }

    /// Parent node (`None` for the root).
    #[must_use]
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Attached value.
    #[must_use]
    pub fn object(&self) -> &AmlValue {
        &self.object
    }

    /// Returns `true` if this node is a `Device`.
    #[must_use]
    pub fn is_device(&self) -> bool {
        matches!(self.kind, NodeKind::Device)
    }
}

/// Predefined root-level scopes created with every namespace.
const PREDEFINED_SCOPES: [NameSeg; 5] = [
    NameSeg(*b"_SB_"),
    NameSeg(*b"_SI_"),
    NameSeg(*b"_GPE"),
    NameSeg(*b"_PR_"),
    NameSeg(*b"_TZ_"),
];

/// `\_GL_` global lock mutex name.
const GL_SEG: NameSeg = NameSeg(*b"_GL_");
/// `\_OS_` operating system name.
const OS_SEG: NameSeg = NameSeg(*b"_OS_");
/// `\_REV` revision of the ACPI specification implemented.
const REV_SEG: NameSeg = NameSeg(*b"_REV");
/// `\_OSI` interface query method.
const OSI_SEG: NameSeg = NameSeg(*b"_OSI");

/// Maximum alias chain followed before giving up.
const MAX_ALIAS_DEPTH: usize = 8;

/// The ACPI namespace.
#[derive(Debug, Clone)]
pub struct Namespace {
    nodes: Vec<Node>,
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

impl Namespace {
    /// Creates a namespace holding the root node, the predefined scopes
    /// (`\_SB_`, `\_SI_`, `\_GPE`, `\_PR_`, `\_TZ_`), the `\_GL_` mutex,
    /// `\_OS_`, `\_REV` and the native `\_OSI` method.
    ///
    /// `\_OS_` and `\_REV` hold the defaults of [`Config`](crate::Config).
    #[must_use]
    pub fn new() -> Self {
        Self::with_os(DEFAULT_OS_NAME, DEFAULT_REVISION)
    }

    /// Like [`new`](Self::new), with the given `\_OS_` and `\_REV` values.
    pub(crate) fn with_os(os_name: &str, revision: u64) -> Self {
        let mut ns = Self { nodes: Vec::new() };
        ns.nodes.push(Node {
            name: NameSeg::ROOT,
            kind: NodeKind::Root,
            parent: None,
            children: Vec::new(),
            object: AmlValue::Uninitialized,
            live: true,
        });
        let root = ns.root();
        for seg in PREDEFINED_SCOPES {
            ns.insert(root, seg, NodeKind::Scope, AmlValue::Uninitialized);
        }
        ns.insert(
            root,
            GL_SEG,
            NodeKind::Mutex(MutexObject::default()),
            AmlValue::Uninitialized,
        );
        ns.insert(root, OS_SEG, NodeKind::Name, AmlValue::from(os_name));
        ns.insert(
            root,
            REV_SEG,
            NodeKind::Name,
            AmlValue::Integer(revision),
        );
        ns.insert(
            root,
            OSI_SEG,
            NodeKind::Method(Method {
                flags: MethodFlags::from_bits_retain(1),
                body: MethodBody::Native(NativeMethod::Osi),
            }),
            AmlValue::Uninitialized,
        );
        ns
    }

    /// The root node.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the node with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NoSuchNode`] if the id is unknown or the node has
    /// been removed.
    pub fn node(&self, id: NodeId) -> Result<&Node, AmlError> {
        self.nodes
            .get(id.index())
            .filter(|n| n.live)
            .ok_or(AmlError::NoSuchNode)
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, AmlError> {
        self.nodes
            .get_mut(id.index())
            .filter(|n| n.live)
            .ok_or(AmlError::NoSuchNode)
    }

    /// Returns the live child of `parent` called `name`.
    #[must_use]
    pub fn child(&self, parent: NodeId, name: NameSeg) -> Option<NodeId> {
        let parent = self.node(parent).ok()?;
        parent
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c.index()].live && self.nodes[c.index()].name == name)
    }

    /// Returns the parent of `id`.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok()?.parent
    }

    /// Inserts a new node. The caller has checked that no live sibling of
    /// the same name exists.
    pub(crate) fn insert(
        &mut self,
        parent: NodeId,
        name: NameSeg,
        kind: NodeKind,
        object: AmlValue,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name,
            kind,
            parent: Some(parent),
            children: Vec::new(),
            object,
            live: true,
        });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Unlinks `id` (and its subtree) from the tree and marks it dead.
    pub(crate) fn remove(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get(id.index()).filter(|n| n.live) else {
            return;
        };
        let parent = node.parent;
        let children = node.children.clone();
        for child in children {
            self.remove(child);
        }
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
        let node = &mut self.nodes[id.index()];
        node.live = false;
        node.object = AmlValue::Uninitialized;
    }

    /// Follows `Alias` nodes to the object they stand for.
    #[must_use]
    pub fn resolve_alias(&self, mut id: NodeId) -> NodeId {
        for _ in 0..MAX_ALIAS_DEPTH {
            match self.node(id).map(Node::kind) {
                Ok(NodeKind::Alias(target)) => id = *target,
                _ => break,
            }
        }
        id
    }

    /// Resolves `name` relative to `scope` without any search.
    ///
    /// `^` prefixes walk up from `scope`; a `\` prefix starts from the root.
    #[must_use]
    pub fn lookup_exact(&self, scope: NodeId, name: &AmlName) -> Option<NodeId> {
        let mut node = if name.root { self.root() } else { scope };
        for _ in 0..name.parents {
            node = self.parent(node)?;
        }
        for &seg in &name.segments {
            let container = self.resolve_alias(node);
            node = self.child(container, seg)?;
        }
        Some(self.resolve_alias(node))
    }

    /// Resolves `name` using the ACPI namespace search rules.
    ///
    /// A relative name made of a single segment is looked up in `scope` and
    /// then in each enclosing scope up to the root; every other form is
    /// resolved exactly.
    #[must_use]
    pub fn lookup(&self, scope: NodeId, name: &AmlName) -> Option<NodeId> {
        if !name.is_search_candidate() {
            return self.lookup_exact(scope, name);
        }
        let seg = name.segments[0];
        let mut current = Some(scope);
        while let Some(node) = current {
            if let Some(found) = self.child(node, seg) {
                return Some(self.resolve_alias(found));
            }
            current = self.parent(node);
        }
        None
    }

    /// Resolves a path string such as `\_SB.PCI0` or `^PCI0._CRS` relative
    /// to `context` (the root if `None`), without search.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] for malformed paths and
    /// [`AmlError::NoSuchNode`] if the path does not exist.
    pub fn resolve_path(&self, context: Option<NodeId>, path: &str) -> Result<NodeId, AmlError> {
        let name = AmlName::parse(path)?;
        let scope = context.unwrap_or(self.root());
        self.node(scope)?;
        self.lookup_exact(scope, &name).ok_or(AmlError::NoSuchNode)
    }

    /// Resolves a name string relative to `context` (the root if `None`)
    /// with the upward search rule applied to single-segment names.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] for malformed names and
    /// [`AmlError::NoSuchNode`] if nothing matches.
    pub fn resolve_search(&self, context: Option<NodeId>, name: &str) -> Result<NodeId, AmlError> {
        let name = AmlName::parse(name)?;
        let scope = context.unwrap_or(self.root());
        self.node(scope)?;
        self.lookup(scope, &name).ok_or(AmlError::NoSuchNode)
    }

    /// Returns the absolute path of `id`.
    #[must_use]
    pub fn path_of(&self, id: NodeId) -> AmlName {
        let mut segments = Vec::new();
        let mut current = Some(id);
        while let Some(node) = current {
            let Ok(n) = self.node(node) else { break };
            if n.parent.is_none() {
                break;
            }
            segments.push(n.name);
            current = n.parent;
        }
        segments.reverse();
        AmlName {
            root: true,
            parents: 0,
            segments,
        }
    }

    /// Iterates over every live node in creation order.
    #[must_use]
    pub fn iter(&self) -> NodeIter<'_> {
        NodeIter { ns: self, next: 0 }
    }

    /// Iterates over the live children of `parent` in creation order.
    #[must_use]
    pub fn children(&self, parent: NodeId) -> ChildIter<'_> {
        let children = self
            .node(parent)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[]);
        ChildIter {
            ns: self,
            children,
            next: 0,
        }
    }

    /// Returns the `index`-th `Device` node in creation order.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::OutOfBounds`] if there are not that many devices.
    pub fn device(&self, index: usize) -> Result<NodeId, AmlError> {
        self.iter()
            .filter(|&id| self.nodes[id.index()].is_device())
            .nth(index)
            .ok_or(AmlError::OutOfBounds)
    }

    /// Number of live nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|n| n.live).count()
    }

    /// Returns `true` if only the root exists (never the case after `new`).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }
}

/// Iterator over all live namespace nodes. Cloning restarts from the same
/// position.
#[derive(Clone)]
pub struct NodeIter<'a> {
    ns: &'a Namespace,
    next: usize,
}

impl Iterator for NodeIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.ns.nodes.len() {
            let idx = self.next;
            self.next += 1;
            if self.ns.nodes[idx].live {
                return Some(NodeId(idx as u32));
            }
        }
        None
    }
}

/// Iterator over the live children of one node.
#[derive(Clone)]
pub struct ChildIter<'a> {
    ns: &'a Namespace,
    children: &'a [NodeId],
    next: usize,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&id) = self.children.get(self.next) {
            self.next += 1;
            if self.ns.nodes[id.index()].live {
                return Some(id);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::string::ToString;
    use std::vec::Vec;

    use super::*;

    fn seg(s: &str) -> NameSeg {
        NameSeg::from_str_padded(s).unwrap()
    }

    /// Builds `\A.B` plus `\A.X` and `\C.Y`.
    fn sample() -> (Namespace, NodeId, NodeId, NodeId) {
        let mut ns = Namespace::new();
        let root = ns.root();
        let a = ns.insert(root, seg("A"), NodeKind::Scope, AmlValue::Uninitialized);
        let b = ns.insert(a, seg("B"), NodeKind::Device, AmlValue::Uninitialized);
        let x = ns.insert(a, seg("X"), NodeKind::Name, AmlValue::Integer(1));
        let c = ns.insert(root, seg("C"), NodeKind::Scope, AmlValue::Uninitialized);
        ns.insert(c, seg("Y"), NodeKind::Name, AmlValue::Integer(2));
        (ns, a, b, x)
    }

    #[test]
    fn predefined_scopes_exist() {
        let ns = Namespace::new();
        for path in [
            "\\_SB", "\\_SI", "\\_GPE", "\\_PR", "\\_TZ", "\\_GL", "\\_OS", "\\_REV", "\\_OSI",
        ] {
            assert!(ns.resolve_path(None, path).is_ok(), "{path} missing");
        }
    }

    #[test]
    fn resolve_path_exact() {
        let (ns, a, b, _) = sample();
        assert_eq!(ns.resolve_path(None, "\\A.B"), Ok(b));
        assert_eq!(ns.resolve_path(Some(b), "^B"), Ok(b));
        assert_eq!(ns.resolve_path(Some(a), "B"), Ok(b));
        assert_eq!(ns.resolve_path(None, "\\A.Q"), Err(AmlError::NoSuchNode));
        // Exact resolution never searches upward.
        assert_eq!(ns.resolve_path(Some(b), "X"), Err(AmlError::NoSuchNode));
    }

    #[test]
    fn search_walks_parent_scopes() {
        let (ns, _, b, x) = sample();
        assert_eq!(ns.resolve_search(Some(b), "X"), Ok(x));
        // `Y` lives only in the unrelated scope `\C`.
        assert_eq!(ns.resolve_search(Some(b), "Y"), Err(AmlError::NoSuchNode));
    }

    #[test]
    fn path_of_round_trips() {
        let (ns, _, b, _) = sample();
        assert_eq!(ns.path_of(b).to_string(), "\\A___.B___");
        assert_eq!(ns.path_of(ns.root()).to_string(), "\\");
    }

    #[test]
    fn iteration_is_creation_ordered_and_restartable() {
        let (ns, a, b, x) = sample();
        let children: Vec<_> = ns.children(a).collect();
        assert_eq!(children, [b, x]);

        let iter = ns.iter();
        let first: Vec<_> = iter.clone().collect();
        let second: Vec<_> = iter.collect();
        assert_eq!(first, second);
        assert_eq!(first[0], ns.root());
        assert_eq!(first.len(), ns.len());
    }

    #[test]
    fn device_index() {
        let (ns, _, b, _) = sample();
        assert_eq!(ns.device(0), Ok(b));
        assert_eq!(ns.device(1), Err(AmlError::OutOfBounds));
    }

    #[test]
    fn removed_nodes_disappear() {
        let (mut ns, a, b, x) = sample();
        ns.remove(x);
        assert_eq!(ns.child(a, seg("X")), None);
        assert_eq!(ns.node(x).err(), Some(AmlError::NoSuchNode));
        assert_eq!(ns.children(a).collect::<Vec<_>>(), [b]);
        let again = ns.insert(a, seg("X"), NodeKind::Name, AmlValue::Integer(5));
        assert_ne!(again, x);
        assert_eq!(ns.child(a, seg("X")), Some(again));
    }

    #[test]
    fn aliases_resolve_to_target() {
        let (mut ns, a, _, x) = sample();
        ns.insert(a, seg("AL"), NodeKind::Alias(x), AmlValue::Uninitialized);
        assert_eq!(ns.resolve_path(None, "\\A.AL"), Ok(x));
    }

    #[test]
    fn method_and_field_flags() {
        let m = MethodFlags::from_bits_retain(0x2B);
        assert_eq!(m.arg_count(), 3);
        assert!(m.serialized());
        assert_eq!(m.sync_level(), 2);

        let f = FieldFlags::from_bits_retain(0x43);
        assert_eq!(f.access_type(), AccessType::DWord);
        assert_eq!(f.update_rule(), UpdateRule::WriteAsZeros);
        assert_eq!(f.with_access_type(1).access_type(), AccessType::Byte);
    }
}
