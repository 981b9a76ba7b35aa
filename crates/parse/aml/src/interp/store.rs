//! Reading and writing storage locations.
//!
//! `Store` converts the value to the type already held by a named object;
//! `CopyObject` and writes to locals replace the value outright.

use alloc::vec::Vec;

use super::Interpreter;
use super::exec::element_of;
use super::state::{State, Target};
use crate::AmlError;
use crate::host::Host;
use crate::namespace::{BufferSource, FrameSlot, NodeId, NodeKind};
use crate::object::{AmlValue, IntWidth, convert_like, to_integer};

fn slot_of(slot: FrameSlot) -> (bool, usize) {
    match slot {
        FrameSlot::Local(i) => (true, usize::from(i)),
        FrameSlot::Arg(i) => (false, usize::from(i)),
    }
}

/// A local or argument of the frame at `depth`.
pub(crate) fn frame_slot(state: &State, depth: usize, slot: FrameSlot) -> Result<&AmlValue, AmlError> {
    let frame = state.frames.get(depth).ok_or(AmlError::ExecutionFailure)?;
    let (local, i) = slot_of(slot);
    let value = if local {
        frame.locals.get(i)
    } else {
        frame.args.get(i)
    };
    value.ok_or(AmlError::OutOfBounds)
}

/// Mutable access to a local or argument of the frame at `depth`.
pub(crate) fn frame_slot_mut(
    state: &mut State,
    depth: usize,
    slot: FrameSlot,
) -> Result<&mut AmlValue, AmlError> {
    let frame = state
        .frames
        .get_mut(depth)
        .ok_or(AmlError::ExecutionFailure)?;
    let (local, i) = slot_of(slot);
    let value = if local {
        frame.locals.get_mut(i)
    } else {
        frame.args.get_mut(i)
    };
    value.ok_or(AmlError::OutOfBounds)
}

fn current_slot(state: &State, target: &Target) -> Option<(usize, FrameSlot)> {
    let depth = state.frames.len().checked_sub(1)?;
    match *target {
        Target::Local(i) => Some((depth, FrameSlot::Local(i))),
        Target::Arg(i) => Some((depth, FrameSlot::Arg(i))),
        _ => None,
    }
}

/// Replaces element `index` of a package, buffer or string.
fn set_element(
    container: &mut AmlValue,
    index: usize,
    value: AmlValue,
    width: IntWidth,
) -> Result<(), AmlError> {
    match container {
        AmlValue::Package(p) => {
            *p.get_mut(index).ok_or(AmlError::OutOfBounds)? = value;
        }
        AmlValue::Buffer(b) => {
            let byte = to_integer(&value, width)? as u8;
            *b.get_mut(index).ok_or(AmlError::OutOfBounds)? = byte;
        }
        AmlValue::String(s) => {
            if index >= s.len() {
                return Err(AmlError::OutOfBounds);
            }
            let c = char::from(to_integer(&value, width)? as u8);
            if !c.is_ascii() || c == '\0' {
                return Err(AmlError::TypeMismatch);
            }
            let mut buf = [0u8; 4];
            s.replace_range(index..=index, c.encode_utf8(&mut buf));
        }
        _ => return Err(AmlError::TypeMismatch),
    }
    Ok(())
}

impl<H: Host> Interpreter<H> {
    /// Reads the value held at `target`.
    pub(crate) fn load(&mut self, state: &mut State, target: &Target) -> Result<AmlValue, AmlError> {
        match target {
            Target::Null | Target::Debug => Ok(AmlValue::Uninitialized),
            Target::Local(_) | Target::Arg(_) => {
                let (depth, slot) = current_slot(state, target).ok_or(AmlError::ExecutionFailure)?;
                frame_slot(state, depth, slot).cloned()
            }
            Target::Node(node) => self.read_node(state, *node),
            Target::Element { base, index } => {
                let container = self.load(state, base)?;
                element_of(&container, *index)
            }
        }
    }

    /// Reads a namespace object: data objects yield their value, fields are
    /// read from their backing storage and everything else yields a handle.
    pub(crate) fn read_node(&mut self, state: &mut State, node: NodeId) -> Result<AmlValue, AmlError> {
        let node = self.namespace.resolve_alias(node);
        let n = self.namespace.node(node)?;
        match n.kind() {
            NodeKind::Name => Ok(n.object().clone()),
            NodeKind::Field(field) => {
                let field = *field;
                self.read_field(state, &field)
            }
            NodeKind::BufferField(field) => {
                let field = *field;
                self.read_buffer_field(state, &field)
            }
            NodeKind::Method(_) => Err(AmlError::TypeMismatch),
            _ => Ok(AmlValue::Handle(node)),
        }
    }

    /// `Store` semantics.
    pub(crate) fn store(
        &mut self,
        state: &mut State,
        target: &Target,
        value: AmlValue,
    ) -> Result<(), AmlError> {
        match target {
            Target::Null => Ok(()),
            Target::Debug => {
                log::debug!("aml: Debug = {value:?}");
                Ok(())
            }
            Target::Local(_) => {
                let (depth, slot) = current_slot(state, target).ok_or(AmlError::ExecutionFailure)?;
                *frame_slot_mut(state, depth, slot)? = value;
                Ok(())
            }
            Target::Arg(_) => {
                let (depth, slot) = current_slot(state, target).ok_or(AmlError::ExecutionFailure)?;
                let arg = frame_slot_mut(state, depth, slot)?;
                // An argument holding a reference writes through to the object.
                if let AmlValue::Handle(node) = *arg {
                    return self.write_node(state, node, value);
                }
                *arg = value;
                Ok(())
            }
            Target::Node(node) => self.write_node(state, *node, value),
            Target::Element { base, index } => self.store_element(state, base, *index, value),
        }
    }

    /// `CopyObject` semantics: the target's value is replaced without
    /// conversion.
    pub(crate) fn copy_object(
        &mut self,
        state: &mut State,
        target: &Target,
        value: AmlValue,
    ) -> Result<(), AmlError> {
        match target {
            Target::Node(node) => self.replace_node(state, *node, value),
            Target::Arg(_) => {
                let (depth, slot) = current_slot(state, target).ok_or(AmlError::ExecutionFailure)?;
                let arg = frame_slot_mut(state, depth, slot)?;
                if let AmlValue::Handle(node) = *arg {
                    return self.replace_node(state, node, value);
                }
                *arg = value;
                Ok(())
            }
            _ => self.store(state, target, value),
        }
    }

    fn store_element(
        &mut self,
        state: &mut State,
        base: &Target,
        index: usize,
        value: AmlValue,
    ) -> Result<(), AmlError> {
        let mut container = self.load(state, base)?;
        set_element(&mut container, index, value, self.width)?;
        self.copy_object(state, base, container)
    }

    /// Writes a namespace object, converting to the type it already holds.
    pub(crate) fn write_node(
        &mut self,
        state: &mut State,
        node: NodeId,
        value: AmlValue,
    ) -> Result<(), AmlError> {
        let node = self.namespace.resolve_alias(node);
        let width = self.width;
        match *self.namespace.node(node)?.kind() {
            NodeKind::Name => {
                let n = self.namespace.node_mut(node)?;
                n.object = match &n.object {
                    old @ (AmlValue::Integer(_) | AmlValue::String(_) | AmlValue::Buffer(_)) => {
                        convert_like(&value, old, width)?
                    }
                    _ => value,
                };
                Ok(())
            }
            NodeKind::Field(field) => self.write_field(state, &field, &value),
            NodeKind::BufferField(field) => self.write_buffer_field(state, &field, &value),
            _ => {
                log::warn!(
                    "aml: cannot store to {}",
                    self.namespace.path_of(node)
                );
                Err(AmlError::TypeMismatch)
            }
        }
    }

    fn replace_node(
        &mut self,
        state: &mut State,
        node: NodeId,
        value: AmlValue,
    ) -> Result<(), AmlError> {
        let node = self.namespace.resolve_alias(node);
        if matches!(self.namespace.node(node)?.kind(), NodeKind::Name) {
            self.namespace.node_mut(node)?.object = value;
            return Ok(());
        }
        self.write_node(state, node, value)
    }

    /// Bytes of the buffer behind a buffer field.
    pub(crate) fn source_bytes(
        &self,
        state: &State,
        source: BufferSource,
    ) -> Result<Vec<u8>, AmlError> {
        let value = match source {
            BufferSource::Node(node) => {
                let node = self.namespace.resolve_alias(node);
                self.namespace.node(node)?.object()
            }
            BufferSource::Frame { depth, slot } => {
                frame_slot(state, depth, slot)?
            }
        };
        match value {
            AmlValue::Buffer(b) => Ok(b.clone()),
            AmlValue::String(s) => Ok(s.as_bytes().to_vec()),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    /// Writes back the buffer behind a buffer field.
    pub(crate) fn set_source_bytes(
        &mut self,
        state: &mut State,
        source: BufferSource,
        bytes: Vec<u8>,
    ) -> Result<(), AmlError> {
        let slot = match source {
            BufferSource::Node(node) => {
                let node = self.namespace.resolve_alias(node);
                &mut self.namespace.node_mut(node)?.object
            }
            BufferSource::Frame { depth, slot } => {
                frame_slot_mut(state, depth, slot)?
            }
        };
        *slot = AmlValue::Buffer(bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::string::String;
    use alloc::vec;

    use super::*;

    #[test]
    fn set_element_in_each_container() {
        let w = IntWidth::Bits64;
        let mut pkg = AmlValue::Package(vec![AmlValue::Integer(1), AmlValue::Integer(2)]);
        set_element(&mut pkg, 1, AmlValue::from("x"), w).unwrap();
        assert_eq!(pkg.package_element(1).unwrap().as_str(), Ok("x"));

        let mut buf = AmlValue::Buffer(vec![0, 0, 0]);
        set_element(&mut buf, 2, AmlValue::Integer(0x1FF), w).unwrap();
        assert_eq!(buf.as_buffer(), Ok(&[0, 0, 0xFF][..]));

        let mut s = AmlValue::String(String::from("abc"));
        set_element(&mut s, 0, AmlValue::Integer(u64::from(b'X')), w).unwrap();
        assert_eq!(s.as_str(), Ok("Xbc"));
    }

    #[test]
    fn set_element_out_of_range() {
        let mut buf = AmlValue::Buffer(vec![0]);
        assert_eq!(
            set_element(&mut buf, 1, AmlValue::Integer(1), IntWidth::Bits64),
            Err(AmlError::OutOfBounds)
        );
        let mut int = AmlValue::Integer(0);
        assert_eq!(
            set_element(&mut int, 0, AmlValue::Integer(1), IntWidth::Bits64),
            Err(AmlError::TypeMismatch)
        );
    }
}
