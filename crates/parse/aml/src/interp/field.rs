//! Field units, buffer fields and operation region access.
//!
//! A field is accessed one access unit at a time. Each unit is aligned to
//! the field's access width; partial units honour the field's update rule
//! on writes.

use alloc::vec;
use alloc::vec::{IntoIter, Vec};

use super::Interpreter;
use super::exec::read_inline;
use super::state::{Operand, State};
use crate::AmlError;
use crate::host::{Host, PciAddress};
use crate::name::{AmlName, NameSeg};
use crate::namespace::{BufferField, FieldFlags, FieldKind, FieldUnit, NodeId, NodeKind, RegionSpace, UpdateRule};
use crate::object::{AmlValue, to_buffer, to_integer};
use crate::opcode::{
    ACCESS_FIELD, BANK_FIELD_OP, BUFFER_OP, CONNECT_FIELD, EXTENDED_ACCESS_FIELD, FIELD_OP,
    INDEX_FIELD_OP, RESERVED_FIELD,
};
use crate::reader::starts_name_string;

// ─── Bit helpers ────────────────────────────────────────────────────────────

/// Mask with the low `bits` bits set.
fn low_mask(bits: u64) -> u64 {
    if bits >= 64 { u64::MAX } else { (1 << bits) - 1 }
}

fn bit(bytes: &[u8], index: u64) -> bool {
    usize::try_from(index / 8)
        .ok()
        .and_then(|i| bytes.get(i))
        .is_some_and(|&b| b & (1 << (index % 8)) != 0)
}

/// Copies `length` bits starting at bit `offset` of `src` into a new
/// byte vector starting at bit 0.
pub(crate) fn get_bits(src: &[u8], offset: u64, length: u64) -> Vec<u8> {
    let mut out = vec![0u8; length.div_ceil(8) as usize];
    for i in 0..length {
        if bit(src, offset + i) {
            out[(i / 8) as usize] |= 1 << (i % 8);
        }
    }
    out
}

/// Writes the low `length` bits of `src` into `dst` starting at bit
/// `offset`. Bits past the end of `src` are written as zero.
pub(crate) fn set_bits(dst: &mut [u8], offset: u64, length: u64, src: &[u8]) {
    for i in 0..length {
        let index = offset + i;
        let Some(byte) = usize::try_from(index / 8).ok().and_then(|b| dst.get_mut(b)) else {
            return;
        };
        let mask = 1 << (index % 8);
        if bit(src, i) {
            *byte |= mask;
        } else {
            *byte &= !mask;
        }
    }
}

/// Fails with `OutOfBounds` unless `field` lies inside `bytes`.
fn check_buffer_field(field: &BufferField, bytes: &[u8]) -> Result<(), AmlError> {
    let end = field
        .bit_offset
        .checked_add(field.bit_length)
        .ok_or(AmlError::OutOfBounds)?;
    if end > bytes.len() as u64 * 8 {
        return Err(AmlError::OutOfBounds);
    }
    Ok(())
}

fn bytes_to_u64(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .take(8)
        .enumerate()
        .fold(0, |v, (i, &b)| v | (u64::from(b) << (i * 8)))
}

impl<H: Host> Interpreter<H> {
    /// Turns raw field bits into an integer if they fit, a buffer otherwise.
    fn field_value(&self, bytes: Vec<u8>, bit_length: u64) -> AmlValue {
        if bit_length <= self.width.bits() {
            AmlValue::Integer(bytes_to_u64(&bytes))
        } else {
            AmlValue::Buffer(bytes)
        }
    }

    // ─── Buffer fields ─────────────────────────────────────────────────────

    pub(crate) fn read_buffer_field(
        &mut self,
        state: &mut State,
        field: &BufferField,
    ) -> Result<AmlValue, AmlError> {
        let bytes = self.source_bytes(state, field.source)?;
        check_buffer_field(field, &bytes)?;
        let bits = get_bits(&bytes, field.bit_offset, field.bit_length);
        Ok(self.field_value(bits, field.bit_length))
    }

    pub(crate) fn write_buffer_field(
        &mut self,
        state: &mut State,
        field: &BufferField,
        value: &AmlValue,
    ) -> Result<(), AmlError> {
        let mut bytes = self.source_bytes(state, field.source)?;
        check_buffer_field(field, &bytes)?;
        let src = to_buffer(value, self.width)?;
        set_bits(&mut bytes, field.bit_offset, field.bit_length, &src);
        self.set_source_bytes(state, field.source, bytes)
    }

    // ─── Field units ───────────────────────────────────────────────────────

    pub(crate) fn read_field(
        &mut self,
        state: &mut State,
        field: &FieldUnit,
    ) -> Result<AmlValue, AmlError> {
        let unit_bits = field.flags.access_type().bits();
        let mut out = vec![0u8; field.bit_length.div_ceil(8) as usize];
        let mut done = 0;
        while done < field.bit_length {
            let bit = field.bit_offset + done;
            let unit_offset = (bit / unit_bits) * (unit_bits / 8);
            let shift = bit % unit_bits;
            let chunk = (unit_bits - shift).min(field.bit_length - done);

            let raw = self.read_unit(state, field, unit_offset, unit_bits)?;
            let bits = (raw >> shift) & low_mask(chunk);
            set_bits(&mut out, done, chunk, &bits.to_le_bytes());
            done += chunk;
        }
        Ok(self.field_value(out, field.bit_length))
    }

    pub(crate) fn write_field(
        &mut self,
        state: &mut State,
        field: &FieldUnit,
        value: &AmlValue,
    ) -> Result<(), AmlError> {
        let src = match value {
            AmlValue::Integer(v) => v.to_le_bytes().to_vec(),
            other => to_buffer(other, self.width)?,
        };
        let unit_bits = field.flags.access_type().bits();
        let mut done = 0;
        while done < field.bit_length {
            let bit = field.bit_offset + done;
            let unit_offset = (bit / unit_bits) * (unit_bits / 8);
            let shift = bit % unit_bits;
            let chunk = (unit_bits - shift).min(field.bit_length - done);
            let mask = low_mask(chunk) << shift;

            let base = if chunk == unit_bits {
                0
            } else {
                match field.flags.update_rule() {
                    UpdateRule::Preserve => self.read_unit(state, field, unit_offset, unit_bits)?,
                    UpdateRule::WriteAsOnes => u64::MAX,
                    UpdateRule::WriteAsZeros => 0,
                }
            };
            let bits = bytes_to_u64(&get_bits(&src, done, chunk));
            let raw = (base & !mask) | ((bits << shift) & mask);
            self.write_unit(state, field, unit_offset, unit_bits, raw & low_mask(unit_bits))?;
            done += chunk;
        }
        Ok(())
    }

    /// Index and data registers of an `IndexField`, rejecting registers
    /// that are themselves index fields.
    fn index_registers(&self, index: NodeId, data: NodeId) -> Result<(), AmlError> {
        for node in [index, data] {
            if let NodeKind::Field(FieldUnit {
                kind: FieldKind::Index { .. },
                ..
            }) = self.namespace.node(node)?.kind()
            {
                log::warn!("aml: nested IndexField registers are not supported");
                return Err(AmlError::ExecutionFailure);
            }
        }
        Ok(())
    }

    fn read_unit(
        &mut self,
        state: &mut State,
        field: &FieldUnit,
        offset: u64,
        bits: u64,
    ) -> Result<u64, AmlError> {
        match field.kind {
            FieldKind::Normal { region } => self.region_read(region, offset, bits),
            FieldKind::Bank {
                region,
                bank,
                value,
            } => {
                self.write_node(state, bank, AmlValue::Integer(value))?;
                self.region_read(region, offset, bits)
            }
            FieldKind::Index { index, data } => {
                self.index_registers(index, data)?;
                self.write_node(state, index, AmlValue::Integer(offset))?;
                let v = self.read_node(state, data)?;
                to_integer(&v, self.width)
            }
        }
    }

    fn write_unit(
        &mut self,
        state: &mut State,
        field: &FieldUnit,
        offset: u64,
        bits: u64,
        value: u64,
    ) -> Result<(), AmlError> {
        match field.kind {
            FieldKind::Normal { region } => self.region_write(region, offset, bits, value),
            FieldKind::Bank {
                region,
                bank,
                value: selector,
            } => {
                self.write_node(state, bank, AmlValue::Integer(selector))?;
                self.region_write(region, offset, bits, value)
            }
            FieldKind::Index { index, data } => {
                self.index_registers(index, data)?;
                self.write_node(state, index, AmlValue::Integer(offset))?;
                self.write_node(state, data, AmlValue::Integer(value))
            }
        }
    }

    // ─── Operation regions ─────────────────────────────────────────────────

    /// Validates an access and returns the region's space and the absolute
    /// address of the access.
    fn region_address(
        &self,
        region: NodeId,
        offset: u64,
        bits: u64,
    ) -> Result<(RegionSpace, u64), AmlError> {
        let NodeKind::OpRegion(r) = *self.namespace.node(region)?.kind() else {
            return Err(AmlError::TypeMismatch);
        };
        let end = offset.checked_add(bits / 8);
        let address = r.offset.checked_add(offset);
        // The last byte touched must be addressable too.
        let last = end.and_then(|end| r.offset.checked_add(end.saturating_sub(1)));
        match (end, address, last) {
            (Some(end), Some(address), Some(_)) if end <= r.length => Ok((r.space, address)),
            _ => {
                log::warn!(
                    "aml: access at {offset:#x} is outside {} (length {:#x})",
                    self.namespace.path_of(region),
                    r.length
                );
                Err(AmlError::ExecutionFailure)
            }
        }
    }

    fn region_read(&mut self, region: NodeId, offset: u64, bits: u64) -> Result<u64, AmlError> {
        let (space, address) = self.region_address(region, offset, bits)?;
        let width = bits as u8;
        let value = match space {
            RegionSpace::SystemMemory => self.host.read_memory(address, width),
            RegionSpace::SystemIo => {
                let port = u16::try_from(address).map_err(|_| AmlError::ExecutionFailure)?;
                self.host.read_io(port, width)
            }
            RegionSpace::PciConfig => {
                let pci = self.pci_address(region)?;
                let offset = u16::try_from(address).map_err(|_| AmlError::ExecutionFailure)?;
                self.host.read_pci(pci, offset, width)
            }
            other => {
                log::warn!("aml: reads from {other:?} regions are not supported");
                return Err(AmlError::ExecutionFailure);
            }
        };
        if self.tracing() {
            log::trace!(target: super::exec::TRACE_TARGET, "read {space:?} {address:#x} -> {value:#x}");
        }
        Ok(value)
    }

    fn region_write(
        &mut self,
        region: NodeId,
        offset: u64,
        bits: u64,
        value: u64,
    ) -> Result<(), AmlError> {
        let (space, address) = self.region_address(region, offset, bits)?;
        let width = bits as u8;
        if self.tracing() {
            log::trace!(target: super::exec::TRACE_TARGET, "write {space:?} {address:#x} <- {value:#x}");
        }
        match space {
            RegionSpace::SystemMemory => self.host.write_memory(address, width, value),
            RegionSpace::SystemIo => {
                let port = u16::try_from(address).map_err(|_| AmlError::ExecutionFailure)?;
                self.host.write_io(port, width, value);
            }
            RegionSpace::PciConfig => {
                let pci = self.pci_address(region)?;
                let offset = u16::try_from(address).map_err(|_| AmlError::ExecutionFailure)?;
                self.host.write_pci(pci, offset, width, value);
            }
            other => {
                log::warn!("aml: writes to {other:?} regions are not supported");
                return Err(AmlError::ExecutionFailure);
            }
        }
        Ok(())
    }

    /// PCI function a `PCI_Config` region belongs to.
    ///
    /// The device and function come from `_ADR` of the nearest enclosing
    /// device; bus and segment come from `_BBN` and `_SEG` of the enclosing
    /// root bridge.
    pub(crate) fn pci_address(&mut self, region: NodeId) -> Result<PciAddress, AmlError> {
        let mut device = self.namespace.parent(region);
        while let Some(node) = device {
            if self.namespace.node(node)?.is_device() {
                break;
            }
            device = self.namespace.parent(node);
        }
        let device = device.ok_or_else(|| {
            log::warn!("aml: PCI_Config region outside of a device");
            AmlError::NoSuchNode
        })?;
        let adr = self.eval_child_integer(device, "_ADR")?.unwrap_or(0);

        let mut bus = 0;
        let mut segment = 0;
        let mut current = Some(device);
        while let Some(node) = current {
            let has_bbn = self.namespace.child(node, NameSeg(*b"_BBN")).is_some();
            if has_bbn || self.is_root_bridge(node)? {
                bus = self.eval_child_integer(node, "_BBN")?.unwrap_or(0);
                segment = self.eval_child_integer(node, "_SEG")?.unwrap_or(0);
                break;
            }
            current = self.namespace.parent(node);
        }

        Ok(PciAddress {
            segment: segment as u16,
            bus: bus as u8,
            device: (adr >> 16) as u8,
            function: adr as u8,
        })
    }

    // ─── Definitions ───────────────────────────────────────────────────────

    /// `Field`, `IndexField` and `BankField`: parses the field list up to
    /// `end` and creates one node per named entry.
    pub(crate) fn define_fields(
        &mut self,
        state: &mut State,
        op: u16,
        operands: &mut IntoIter<Operand>,
        end: usize,
    ) -> Result<(), AmlError> {
        let mut names: Vec<AmlName> = Vec::with_capacity(2);
        let mut ints: Vec<u64> = Vec::with_capacity(2);
        for operand in operands {
            match operand {
                Operand::Name(name) => names.push(name),
                Operand::Value(v) => ints.push(to_integer(&v, self.width)?),
                Operand::Target(_) => return Err(AmlError::ExecutionFailure),
            }
        }

        let scope = self.current_scope(state)?;
        let resolve = |name: &AmlName| {
            self.namespace.lookup(scope, name).ok_or_else(|| {
                log::warn!("aml: field refers to missing object {name}");
                AmlError::NoSuchNode
            })
        };
        let (kind, flags) = match (op, names.as_slice(), ints.as_slice()) {
            (FIELD_OP, [region], [flags]) => (
                FieldKind::Normal {
                    region: resolve(region)?,
                },
                *flags,
            ),
            (INDEX_FIELD_OP, [index, data], [flags]) => (
                FieldKind::Index {
                    index: resolve(index)?,
                    data: resolve(data)?,
                },
                *flags,
            ),
            (BANK_FIELD_OP, [region, bank], [value, flags]) => (
                FieldKind::Bank {
                    region: resolve(region)?,
                    bank: resolve(bank)?,
                    value: *value,
                },
                *flags,
            ),
            _ => return Err(AmlError::ExecutionFailure),
        };
        let mut flags = FieldFlags::from_bits_retain(flags as u8);

        let mut bit_offset = 0u64;
        while state.frame().ok_or(AmlError::ExecutionFailure)?.pc < end {
            let lead = read_inline(state, |r| r.read_u8())?;
            match lead {
                RESERVED_FIELD => {
                    bit_offset += read_inline(state, |r| r.pkg_length_value())? as u64;
                }
                ACCESS_FIELD => {
                    let (access, _attrib) = read_inline(state, |r| Ok((r.read_u8()?, r.read_u8()?)))?;
                    flags = flags.with_access_type(access);
                }
                EXTENDED_ACCESS_FIELD => {
                    let (access, _attrib, _length) =
                        read_inline(state, |r| Ok((r.read_u8()?, r.read_u8()?, r.read_u8()?)))?;
                    flags = flags.with_access_type(access);
                }
                CONNECT_FIELD => {
                    // Connection resources only matter to serial bus and
                    // GPIO regions, which are not supported.
                    read_inline(state, |r| {
                        match r.peek() {
                            Some(b) if b == BUFFER_OP as u8 => {
                                r.skip(1)?;
                                let end = r.pkg_length()?;
                                r.set_position(end);
                            }
                            Some(b) if starts_name_string(b) => {
                                r.name_string()?;
                            }
                            _ => return Err(AmlError::ExecutionFailure),
                        }
                        Ok(())
                    })?;
                }
                _ => {
                    let (seg, length) = read_inline(state, |r| {
                        let rest = r.read_bytes(3)?;
                        let bytes = [lead, rest[0], rest[1], rest[2]];
                        let seg = NameSeg::from_bytes(&bytes).ok_or(AmlError::ExecutionFailure)?;
                        Ok((seg, r.pkg_length_value()? as u64))
                    })?;
                    let unit = FieldUnit {
                        kind,
                        bit_offset,
                        bit_length: length,
                        flags,
                    };
                    self.define(
                        state,
                        &AmlName::from_seg(seg),
                        NodeKind::Field(unit),
                        AmlValue::Uninitialized,
                    )?;
                    bit_offset += length;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;

    #[test]
    fn bit_extraction_crosses_bytes() {
        let src = [0b1010_0000, 0b0000_0101];
        assert_eq!(get_bits(&src, 5, 6), [0b10_1101]);
        assert_eq!(get_bits(&src, 0, 16), src);
    }

    #[test]
    fn bit_insertion_preserves_neighbours() {
        let mut dst = [0xFF, 0xFF];
        set_bits(&mut dst, 4, 8, &[0x00]);
        assert_eq!(dst, [0x0F, 0xF0]);

        // Source shorter than the length writes zeros.
        let mut dst = [0xFF; 4];
        set_bits(&mut dst, 0, 32, &[0xAB]);
        assert_eq!(dst, [0xAB, 0, 0, 0]);
    }

    #[test]
    fn masks() {
        assert_eq!(low_mask(0), 0);
        assert_eq!(low_mask(8), 0xFF);
        assert_eq!(low_mask(64), u64::MAX);
        assert_eq!(bytes_to_u64(&[0x34, 0x12]), 0x1234);
    }
}
