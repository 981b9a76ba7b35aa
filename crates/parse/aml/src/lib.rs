//! `hadron-aml`: a standalone, `no_std` AML interpreter.
//!
//! This crate builds the ACPI namespace from DSDT/SSDT bytecode and executes
//! control methods on demand. It is split into three tightly coupled layers:
//!
//! - [`namespace`]: an arena-backed tree of named nodes (devices, methods,
//!   fields, mutexes, ...).
//! - [`interp`]: a resumable, explicit-stack bytecode evaluator that runs
//!   table definition blocks and control methods against the namespace.
//! - [`resource`]: decoding and encoding of the resource templates returned
//!   by `_CRS` / `_PRS`.
//!
//! [`services`] layers the usual kernel-facing operations on top: ACPI mode
//! switching, sleep-state entry, PCI interrupt routing and SCI latching.
//!
//! All hardware access goes through the [`Host`] trait. Diagnostics are
//! emitted through the `log` facade.
//!
//! # Usage
//!
//! ```ignore
//! let mut aml = Interpreter::new(MyHost, Config::default());
//! aml.load_table(dsdt_bytes)?;
//! for ssdt in ssdts {
//!     aml.load_table(ssdt)?;
//! }
//! let pci0 = aml.namespace().resolve_path(None, "\\_SB_.PCI0")?;
//! let resources = aml.read_resource(pci0)?;
//! ```

#![no_std]
#![warn(missing_docs)]

extern crate alloc;

pub mod host;
pub mod interp;
pub mod name;
pub mod namespace;
pub mod object;
pub mod reader;
pub mod resource;
pub mod services;
pub mod table;

mod opcode;

// Re-export key types at crate root for convenience.
pub use host::{Host, PciAddress};
pub use interp::{Config, Interpreter};
pub use name::{AmlName, NameSeg};
pub use namespace::{Namespace, Node, NodeId, NodeKind};
pub use object::{AmlValue, EisaId, ObjectType};
pub use resource::{AcpiResource, ResourceIter, MAX_RESOURCES};
pub use services::{IrqRoute, PicMode};
pub use table::{Fadt, SdtHeader};

/// Errors returned by every fallible operation of the interpreter.
///
/// Success is represented by `Ok`; there is no separate "none" error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AmlError {
    /// A value had a different object type than the operation requires.
    TypeMismatch,
    /// A namespace lookup did not find the requested node.
    NoSuchNode,
    /// An index or count exceeded the bounds of its container.
    OutOfBounds,
    /// AML execution failed (malformed bytecode, unsupported opcode,
    /// runaway loop, divide by zero, ...).
    ExecutionFailure,
    /// The caller passed arguments that cannot be acted upon.
    IllegalArguments,
    /// Evaluation succeeded, but the resulting object does not satisfy
    /// the expectation of the caller (wrong type, size or contents).
    UnexpectedResult,
    /// A host-side wait on an AML mutex or event timed out.
    Timeout,
}

impl core::fmt::Display for AmlError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let msg = match self {
            Self::TypeMismatch => "type mismatch",
            Self::NoSuchNode => "no such node",
            Self::OutOfBounds => "out of bounds",
            Self::ExecutionFailure => "execution failure",
            Self::IllegalArguments => "illegal arguments",
            Self::UnexpectedResult => "unexpected result",
            Self::Timeout => "timeout",
        };
        f.write_str(msg)
    }
}
