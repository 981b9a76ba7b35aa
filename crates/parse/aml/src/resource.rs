//! ACPI resource template decoding and encoding.
//!
//! Resource templates are the byte buffers returned by `_CRS` and `_PRS`
//! and accepted by `_SRS`. They hold small (1-byte tag) and large (3-byte
//! tag) descriptors as defined in ACPI 6.5 §6.4, terminated by an end tag.

use alloc::collections::VecDeque;
use alloc::vec::Vec;

use crate::AmlError;
use crate::host::Host;
use crate::interp::Interpreter;
use crate::namespace::NodeId;
use crate::object::AmlValue;

/// Maximum number of descriptors [`decode_resources`] returns.
pub const MAX_RESOURCES: usize = 512;

/// Small item type of the end tag.
const SMALL_END_TAG: u8 = 0x0F;
/// Encoded end tag with a zero checksum.
const END_TAG: [u8; 2] = [0x79, 0x00];

/// Resource type of an address space descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressResourceType {
    /// Memory range.
    Memory,
    /// I/O range.
    Io,
    /// Bus number range.
    BusNumber,
    /// Reserved or vendor-defined type.
    Other(u8),
}

impl From<u8> for AddressResourceType {
    fn from(v: u8) -> Self {
        match v {
            0 => Self::Memory,
            1 => Self::Io,
            2 => Self::BusNumber,
            other => Self::Other(other),
        }
    }
}

impl From<AddressResourceType> for u8 {
    fn from(v: AddressResourceType) -> Self {
        match v {
            AddressResourceType::Memory => 0,
            AddressResourceType::Io => 1,
            AddressResourceType::BusNumber => 2,
            AddressResourceType::Other(other) => other,
        }
    }
}

/// Width of the address fields of an address space descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressWidth {
    /// Word address space (large tag 0x08).
    Word,
    /// DWord address space (large tag 0x07).
    DWord,
    /// QWord address space (large tag 0x0A).
    QWord,
}

impl AddressWidth {
    fn bytes(self) -> usize {
        match self {
            Self::Word => 2,
            Self::DWord => 4,
            Self::QWord => 8,
        }
    }

    fn tag(self) -> u8 {
        match self {
            Self::Word => 0x08,
            Self::DWord => 0x07,
            Self::QWord => 0x0A,
        }
    }
}

/// A Word, DWord or QWord address space descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressSpace {
    /// Encoded width of the address fields.
    pub width: AddressWidth,
    /// What the range describes.
    pub resource_type: AddressResourceType,
    /// General flags (decode type, min/max fixed).
    pub general_flags: u8,
    /// Type-specific flags (bit 0 is "writable" for memory ranges).
    pub type_flags: u8,
    /// Address granularity (`_GRA`).
    pub granularity: u64,
    /// Range minimum (`_MIN`).
    pub min: u64,
    /// Range maximum (`_MAX`).
    pub max: u64,
    /// Translation offset (`_TRA`).
    pub translation: u64,
    /// Range length (`_LEN`).
    pub length: u64,
}

/// A decoded ACPI resource descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcpiResource {
    /// One interrupt of an IRQ descriptor (small tag 0x04).
    Irq {
        /// IRQ number (0-15).
        irq: u8,
        /// Edge-triggered (vs level-triggered).
        edge_triggered: bool,
        /// Active-low (vs active-high).
        active_low: bool,
        /// Shared with other devices.
        shared: bool,
        /// Capable of waking the system.
        wake_capable: bool,
    },
    /// One channel of a DMA descriptor (small tag 0x05).
    Dma {
        /// DMA channel number (0-7).
        channel: u8,
        /// The channel supports bus mastering.
        bus_master: bool,
        /// Transfer type preference (bits 0-1 of the flags).
        transfer: u8,
        /// Channel speed (bits 5-6 of the flags).
        speed: u8,
    },
    /// I/O port range (small tag 0x08).
    Io {
        /// Decodes all 16 address bits (vs 10).
        decode_16bit: bool,
        /// Minimum base port.
        base: u16,
        /// Maximum base port.
        max: u16,
        /// Base alignment.
        alignment: u8,
        /// Number of ports.
        length: u8,
    },
    /// Fixed I/O port range (small tag 0x09).
    FixedIo {
        /// Base port (10-bit decode).
        base: u16,
        /// Number of ports.
        length: u8,
    },
    /// 24-bit memory range (large tag 0x01); values are in 256-byte units.
    Memory24 {
        /// Writable range.
        writable: bool,
        /// Minimum base address.
        base: u16,
        /// Maximum base address.
        max: u16,
        /// Base alignment.
        alignment: u16,
        /// Range length.
        length: u16,
    },
    /// 32-bit memory range (large tag 0x05).
    Memory32 {
        /// Writable range.
        writable: bool,
        /// Minimum base address.
        base: u32,
        /// Maximum base address.
        max: u32,
        /// Base alignment.
        alignment: u32,
        /// Range length.
        length: u32,
    },
    /// 32-bit fixed memory range (large tag 0x06).
    FixedMemory32 {
        /// Writable range.
        writable: bool,
        /// Base physical address.
        base: u32,
        /// Length in bytes.
        length: u32,
    },
    /// Word, DWord or QWord address space (large tags 0x08, 0x07, 0x0A).
    AddressSpace(AddressSpace),
    /// One interrupt of an extended interrupt descriptor (large tag 0x09).
    ExtendedIrq {
        /// Global System Interrupt number.
        gsi: u32,
        /// The device consumes (vs produces) the interrupt.
        consumer: bool,
        /// Edge-triggered.
        edge_triggered: bool,
        /// Active-low.
        active_low: bool,
        /// Shared with other devices.
        shared: bool,
        /// Capable of waking the system.
        wake_capable: bool,
    },
    /// Generic register (large tag 0x02).
    GenericRegister {
        /// Address space ID.
        space_id: u8,
        /// Register width in bits.
        bit_width: u8,
        /// Register offset in bits.
        bit_offset: u8,
        /// Access size.
        access_size: u8,
        /// Register address.
        address: u64,
    },
    /// Vendor-defined data (small tag 0x0E or large tag 0x04).
    Vendor {
        /// Raw descriptor body.
        data: Vec<u8>,
    },
}

/// Little-endian unsigned integer of `size` bytes at `offset`.
fn le(body: &[u8], offset: usize, size: usize) -> Option<u64> {
    let bytes = body.get(offset..offset.checked_add(size)?)?;
    Some(
        bytes
            .iter()
            .rev()
            .fold(0, |v, &b| (v << 8) | u64::from(b)),
    )
}

fn bit(flags: u8, n: u8) -> bool {
    flags & (1 << n) != 0
}

/// Iterator over the descriptors of a resource template.
///
/// Yields `Err(AmlError::UnexpectedResult)` once, then stops, if a
/// descriptor extends past the end of the buffer.
#[derive(Clone)]
pub struct ResourceIter<'a> {
    data: &'a [u8],
    pos: usize,
    pending: VecDeque<AcpiResource>,
    done: bool,
}

impl<'a> ResourceIter<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            pending: VecDeque::new(),
            done: false,
        }
    }

    /// Splits off the next descriptor: `(is_large, item type, body)`.
    fn next_descriptor(&mut self) -> Result<(bool, u8, &'a [u8]), AmlError> {
        let tag = *self.data.get(self.pos).ok_or(AmlError::UnexpectedResult)?;
        let (large, kind, header, length) = if tag & 0x80 == 0 {
            (false, (tag >> 3) & 0x0F, 1, usize::from(tag & 0x07))
        } else {
            let length = le(self.data, self.pos + 1, 2).ok_or(AmlError::UnexpectedResult)?;
            (true, tag & 0x7F, 3, length as usize)
        };
        let start = self.pos + header;
        let body = self
            .data
            .get(start..start + length)
            .ok_or(AmlError::UnexpectedResult)?;
        self.pos = start + length;
        Ok((large, kind, body))
    }

    /// Decodes a small descriptor body into `pending`.
    fn decode_small(&mut self, kind: u8, body: &[u8]) -> Option<()> {
        match kind {
            0x04 => {
                let mask = le(body, 0, 2)? as u16;
                // Without the flags byte the IRQ is edge-triggered, active-high.
                let flags = body.get(2).copied().unwrap_or(0x01);
                for irq in (0..16u8).filter(|&i| mask & (1 << i) != 0) {
                    self.pending.push_back(AcpiResource::Irq {
                        irq,
                        edge_triggered: bit(flags, 0),
                        active_low: bit(flags, 3),
                        shared: bit(flags, 4),
                        wake_capable: bit(flags, 5),
                    });
                }
            }
            0x05 => {
                let mask = *body.first()?;
                let flags = *body.get(1)?;
                for channel in (0..8u8).filter(|&c| mask & (1 << c) != 0) {
                    self.pending.push_back(AcpiResource::Dma {
                        channel,
                        bus_master: bit(flags, 2),
                        transfer: flags & 0x03,
                        speed: (flags >> 5) & 0x03,
                    });
                }
            }
            0x08 => self.pending.push_back(AcpiResource::Io {
                decode_16bit: bit(*body.first()?, 0),
                base: le(body, 1, 2)? as u16,
                max: le(body, 3, 2)? as u16,
                alignment: *body.get(5)?,
                length: *body.get(6)?,
            }),
            0x09 => self.pending.push_back(AcpiResource::FixedIo {
                base: le(body, 0, 2)? as u16 & 0x03FF,
                length: *body.get(2)?,
            }),
            0x0E => self.pending.push_back(AcpiResource::Vendor {
                data: body.to_vec(),
            }),
            // Start/end dependent functions, fixed DMA and reserved types.
            _ => {}
        }
        Some(())
    }

    /// Decodes a large descriptor body into `pending`.
    fn decode_large(&mut self, kind: u8, body: &[u8]) -> Option<()> {
        match kind {
            0x01 => self.pending.push_back(AcpiResource::Memory24 {
                writable: bit(*body.first()?, 0),
                base: le(body, 1, 2)? as u16,
                max: le(body, 3, 2)? as u16,
                alignment: le(body, 5, 2)? as u16,
                length: le(body, 7, 2)? as u16,
            }),
            0x02 => self.pending.push_back(AcpiResource::GenericRegister {
                space_id: *body.first()?,
                bit_width: *body.get(1)?,
                bit_offset: *body.get(2)?,
                access_size: *body.get(3)?,
                address: le(body, 4, 8)?,
            }),
            0x04 => self.pending.push_back(AcpiResource::Vendor {
                data: body.to_vec(),
            }),
            0x05 => self.pending.push_back(AcpiResource::Memory32 {
                writable: bit(*body.first()?, 0),
                base: le(body, 1, 4)? as u32,
                max: le(body, 5, 4)? as u32,
                alignment: le(body, 9, 4)? as u32,
                length: le(body, 13, 4)? as u32,
            }),
            0x06 => self.pending.push_back(AcpiResource::FixedMemory32 {
                writable: bit(*body.first()?, 0),
                base: le(body, 1, 4)? as u32,
                length: le(body, 5, 4)? as u32,
            }),
            0x07 | 0x08 | 0x0A => {
                let width = match kind {
                    0x07 => AddressWidth::DWord,
                    0x08 => AddressWidth::Word,
                    _ => AddressWidth::QWord,
                };
                let size = width.bytes();
                let field = |i: usize| le(body, 3 + i * size, size);
                self.pending.push_back(AcpiResource::AddressSpace(AddressSpace {
                    width,
                    resource_type: AddressResourceType::from(*body.first()?),
                    general_flags: *body.get(1)?,
                    type_flags: *body.get(2)?,
                    granularity: field(0)?,
                    min: field(1)?,
                    max: field(2)?,
                    translation: field(3)?,
                    length: field(4)?,
                }));
            }
            0x09 => {
                let flags = *body.first()?;
                let count = usize::from(*body.get(1)?);
                for i in 0..count {
                    self.pending.push_back(AcpiResource::ExtendedIrq {
                        gsi: le(body, 2 + i * 4, 4)? as u32,
                        consumer: bit(flags, 0),
                        edge_triggered: bit(flags, 1),
                        active_low: bit(flags, 2),
                        shared: bit(flags, 3),
                        wake_capable: bit(flags, 4),
                    });
                }
            }
            _ => {}
        }
        Some(())
    }
}

impl Iterator for ResourceIter<'_> {
    type Item = Result<AcpiResource, AmlError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(resource) = self.pending.pop_front() {
                return Some(Ok(resource));
            }
            if self.done || self.pos >= self.data.len() {
                self.done = true;
                return None;
            }

            let (large, kind, body) = match self.next_descriptor() {
                Ok(d) => d,
                Err(err) => {
                    log::warn!("aml: resource descriptor at {:#x} is truncated", self.pos);
                    self.done = true;
                    return Some(Err(err));
                }
            };
            if !large && kind == SMALL_END_TAG {
                self.done = true;
                continue;
            }
            let decoded = if large {
                self.decode_large(kind, body)
            } else {
                self.decode_small(kind, body)
            };
            if decoded.is_none() {
                self.pending.clear();
                log::warn!(
                    "aml: skipping short resource descriptor (type {kind:#x}, {} bytes)",
                    body.len()
                );
            }
        }
    }
}

/// Parses a resource template lazily.
///
/// The iterator stops at the end tag or when the data is exhausted.
#[must_use]
pub fn parse_resource_template(data: &[u8]) -> ResourceIter<'_> {
    ResourceIter::new(data)
}

/// Decodes a whole resource template.
///
/// # Errors
///
/// Returns [`AmlError::UnexpectedResult`] for a truncated template and
/// [`AmlError::OutOfBounds`] if it holds more than [`MAX_RESOURCES`]
/// descriptors.
pub fn decode_resources(data: &[u8]) -> Result<Vec<AcpiResource>, AmlError> {
    let mut out = Vec::new();
    for resource in parse_resource_template(data) {
        if out.len() == MAX_RESOURCES {
            return Err(AmlError::OutOfBounds);
        }
        out.push(resource?);
    }
    Ok(out)
}

/// Returns `true` if `data` is a sequence of well-formed descriptors that
/// ends with an end tag in its last two bytes.
#[must_use]
pub fn looks_like_resource_template(data: &[u8]) -> bool {
    let mut iter = ResourceIter::new(data);
    loop {
        match iter.next_descriptor() {
            Ok((false, SMALL_END_TAG, body)) => {
                return body.len() == 1 && iter.pos == data.len();
            }
            Ok(_) => {}
            Err(_) => return false,
        }
    }
}

// ─── Encoding ───────────────────────────────────────────────────────────────

fn push_le(out: &mut Vec<u8>, value: u64, size: usize) {
    out.extend_from_slice(&value.to_le_bytes()[..size]);
}

fn push_large(out: &mut Vec<u8>, kind: u8, body: &[u8]) -> Result<(), AmlError> {
    let length = u16::try_from(body.len()).map_err(|_| AmlError::IllegalArguments)?;
    out.push(0x80 | kind);
    out.extend_from_slice(&length.to_le_bytes());
    out.extend_from_slice(body);
    Ok(())
}

fn flag(b: bool, n: u8) -> u8 {
    u8::from(b) << n
}

/// Encodes descriptors as a resource template terminated by an end tag
/// (checksum 0).
///
/// IRQ, DMA and extended IRQ entries are encoded one descriptor each.
///
/// # Errors
///
/// Returns [`AmlError::IllegalArguments`] for values the encoding cannot
/// represent (an IRQ above 15, a DMA channel above 7, oversized vendor
/// data).
pub fn encode_resource_template(resources: &[AcpiResource]) -> Result<Vec<u8>, AmlError> {
    let mut out = Vec::new();
    for resource in resources {
        match resource {
            AcpiResource::Irq {
                irq,
                edge_triggered,
                active_low,
                shared,
                wake_capable,
            } => {
                if *irq > 15 {
                    return Err(AmlError::IllegalArguments);
                }
                out.push(0x23);
                push_le(&mut out, 1 << irq, 2);
                out.push(
                    flag(*edge_triggered, 0)
                        | flag(*active_low, 3)
                        | flag(*shared, 4)
                        | flag(*wake_capable, 5),
                );
            }
            AcpiResource::Dma {
                channel,
                bus_master,
                transfer,
                speed,
            } => {
                if *channel > 7 {
                    return Err(AmlError::IllegalArguments);
                }
                out.extend_from_slice(&[
                    0x2A,
                    1 << channel,
                    (transfer & 0x03) | flag(*bus_master, 2) | ((speed & 0x03) << 5),
                ]);
            }
            AcpiResource::Io {
                decode_16bit,
                base,
                max,
                alignment,
                length,
            } => {
                out.extend_from_slice(&[0x47, u8::from(*decode_16bit)]);
                push_le(&mut out, u64::from(*base), 2);
                push_le(&mut out, u64::from(*max), 2);
                out.extend_from_slice(&[*alignment, *length]);
            }
            AcpiResource::FixedIo { base, length } => {
                out.push(0x4B);
                push_le(&mut out, u64::from(*base & 0x03FF), 2);
                out.push(*length);
            }
            AcpiResource::Memory24 {
                writable,
                base,
                max,
                alignment,
                length,
            } => {
                let mut body = Vec::with_capacity(9);
                body.push(u8::from(*writable));
                for v in [base, max, alignment, length] {
                    push_le(&mut body, u64::from(*v), 2);
                }
                push_large(&mut out, 0x01, &body)?;
            }
            AcpiResource::Memory32 {
                writable,
                base,
                max,
                alignment,
                length,
            } => {
                let mut body = Vec::with_capacity(17);
                body.push(u8::from(*writable));
                for v in [base, max, alignment, length] {
                    push_le(&mut body, u64::from(*v), 4);
                }
                push_large(&mut out, 0x05, &body)?;
            }
            AcpiResource::FixedMemory32 {
                writable,
                base,
                length,
            } => {
                let mut body = Vec::with_capacity(9);
                body.push(u8::from(*writable));
                push_le(&mut body, u64::from(*base), 4);
                push_le(&mut body, u64::from(*length), 4);
                push_large(&mut out, 0x06, &body)?;
            }
            AcpiResource::AddressSpace(space) => {
                let size = space.width.bytes();
                let mut body = Vec::with_capacity(3 + size * 5);
                body.extend_from_slice(&[
                    u8::from(space.resource_type),
                    space.general_flags,
                    space.type_flags,
                ]);
                for v in [
                    space.granularity,
                    space.min,
                    space.max,
                    space.translation,
                    space.length,
                ] {
                    push_le(&mut body, v, size);
                }
                push_large(&mut out, space.width.tag(), &body)?;
            }
            AcpiResource::ExtendedIrq {
                gsi,
                consumer,
                edge_triggered,
                active_low,
                shared,
                wake_capable,
            } => {
                let mut body = Vec::with_capacity(6);
                body.push(
                    flag(*consumer, 0)
                        | flag(*edge_triggered, 1)
                        | flag(*active_low, 2)
                        | flag(*shared, 3)
                        | flag(*wake_capable, 4),
                );
                body.push(1);
                push_le(&mut body, u64::from(*gsi), 4);
                push_large(&mut out, 0x09, &body)?;
            }
            AcpiResource::GenericRegister {
                space_id,
                bit_width,
                bit_offset,
                access_size,
                address,
            } => {
                let mut body = Vec::with_capacity(12);
                body.extend_from_slice(&[*space_id, *bit_width, *bit_offset, *access_size]);
                push_le(&mut body, *address, 8);
                push_large(&mut out, 0x02, &body)?;
            }
            AcpiResource::Vendor { data } => {
                if data.len() <= 7 {
                    out.push(0x70 | data.len() as u8);
                    out.extend_from_slice(data);
                } else {
                    push_large(&mut out, 0x04, data)?;
                }
            }
        }
    }
    out.extend_from_slice(&END_TAG);
    Ok(out)
}

// ─── Device resources ───────────────────────────────────────────────────────

impl<H: Host> Interpreter<H> {
    fn read_template(&mut self, node: NodeId, method: &str) -> Result<Vec<AcpiResource>, AmlError> {
        match self.eval_child(node, method, &[])? {
            Some(AmlValue::Buffer(bytes)) => decode_resources(&bytes),
            Some(other) => {
                log::warn!(
                    "aml: {}.{method} returned {:?}, not a buffer",
                    self.namespace.path_of(node),
                    other.object_type()
                );
                Err(AmlError::UnexpectedResult)
            }
            None => Err(AmlError::NoSuchNode),
        }
    }

    /// Evaluates the device's `_CRS` and decodes the resulting template.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NoSuchNode`] if the device has no `_CRS`,
    /// [`AmlError::UnexpectedResult`] if it does not return a well-formed
    /// buffer, or any evaluation error.
    pub fn read_resource(&mut self, node: NodeId) -> Result<Vec<AcpiResource>, AmlError> {
        self.read_template(node, "_CRS")
    }

    /// Evaluates the device's `_PRS` and decodes the resulting template.
    ///
    /// # Errors
    ///
    /// As for [`read_resource`](Self::read_resource).
    pub fn read_possible_resources(&mut self, node: NodeId) -> Result<Vec<AcpiResource>, AmlError> {
        self.read_template(node, "_PRS")
    }

    /// Encodes `resources` and passes the template to the device's `_SRS`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NoSuchNode`] if the device has no `_SRS`,
    /// [`AmlError::IllegalArguments`] if the resources cannot be encoded, or
    /// any evaluation error.
    pub fn set_resources(&mut self, node: NodeId, resources: &[AcpiResource]) -> Result<(), AmlError> {
        let template = encode_resource_template(resources)?;
        match self.eval_child(node, "_SRS", &[AmlValue::Buffer(template)])? {
            Some(_) => Ok(()),
            None => Err(AmlError::NoSuchNode),
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec;
    use std::vec::Vec;

    use super::*;

    fn collect(data: &[u8]) -> Vec<Result<AcpiResource, AmlError>> {
        parse_resource_template(data).collect()
    }

    #[test]
    fn parse_io_descriptor() {
        // I/O descriptor: tag 0x47, decode=1, min=0x03F8, max=0x03F8, align=1, len=8
        let data = [0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08, 0x79, 0x00];
        assert_eq!(
            collect(&data),
            [Ok(AcpiResource::Io {
                decode_16bit: true,
                base: 0x03F8,
                max: 0x03F8,
                alignment: 1,
                length: 8,
            })]
        );
    }

    #[test]
    fn irq_without_flags_defaults_to_edge_high() {
        let data = [0x22, 0x10, 0x00, 0x79, 0x00];
        assert_eq!(
            collect(&data),
            [Ok(AcpiResource::Irq {
                irq: 4,
                edge_triggered: true,
                active_low: false,
                shared: false,
                wake_capable: false,
            })]
        );
    }

    #[test]
    fn irq_mask_expands_to_one_entry_per_bit() {
        // IRQs 3, 4 and 11; level, active-low, shared.
        let data = [0x23, 0x18, 0x08, 0x18, 0x79, 0x00];
        let irqs: Vec<u8> = decode_resources(&data)
            .unwrap()
            .into_iter()
            .map(|r| match r {
                AcpiResource::Irq {
                    irq,
                    edge_triggered: false,
                    active_low: true,
                    shared: true,
                    ..
                } => irq,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(irqs, [3, 4, 11]);
    }

    #[test]
    fn extended_irq_lists_every_interrupt() {
        let data = [
            0x89, 0x0A, 0x00, // tag + length
            0x0D, // consumer, active-low, shared (level)
            0x02, // two interrupts
            0x10, 0x00, 0x00, 0x00, // GSI 16
            0x11, 0x00, 0x00, 0x00, // GSI 17
            0x79, 0x00,
        ];
        let resources = decode_resources(&data).unwrap();
        assert_eq!(resources.len(), 2);
        assert_eq!(
            resources[1],
            AcpiResource::ExtendedIrq {
                gsi: 17,
                consumer: true,
                edge_triggered: false,
                active_low: true,
                shared: true,
                wake_capable: false,
            }
        );
    }

    #[test]
    fn dword_address_space() {
        let mut data = vec![0x87, 0x17, 0x00, 0x00, 0x0C, 0x01];
        for v in [0u32, 0xE000_0000, 0xEFFF_FFFF, 0, 0x1000_0000] {
            data.extend_from_slice(&v.to_le_bytes());
        }
        data.extend_from_slice(&END_TAG);
        let resources = decode_resources(&data).unwrap();
        let [AcpiResource::AddressSpace(space)] = resources.as_slice() else {
            panic!("unexpected {resources:?}");
        };
        assert_eq!(space.width, AddressWidth::DWord);
        assert_eq!(space.resource_type, AddressResourceType::Memory);
        assert_eq!(space.min, 0xE000_0000);
        assert_eq!(space.length, 0x1000_0000);
    }

    #[test]
    fn unknown_and_dependent_descriptors_are_skipped() {
        let data = [
            0x30, // StartDependentFn (no priority byte)
            0x4B, 0x60, 0x00, 0x01, // FixedIO 0x60
            0x38, // EndDependentFn
            0xFF, 0x01, 0x00, 0xAA, // unknown large type with a 1-byte body
            0x79, 0x00,
        ];
        assert_eq!(
            collect(&data),
            [Ok(AcpiResource::FixedIo {
                base: 0x60,
                length: 1
            })]
        );
    }

    #[test]
    fn truncated_descriptor_yields_one_error() {
        // Fixed memory descriptor claiming 9 bytes with only 4 present.
        let data = [0x4B, 0x60, 0x00, 0x01, 0x86, 0x09, 0x00, 0x01, 0x00, 0x00, 0xD0];
        let results = collect(&data);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[1], Err(AmlError::UnexpectedResult));
        assert_eq!(decode_resources(&data), Err(AmlError::UnexpectedResult));
    }

    #[test]
    fn decode_caps_resource_count() {
        let mut data = Vec::new();
        for _ in 0..=MAX_RESOURCES {
            data.extend_from_slice(&[0x4B, 0x60, 0x00, 0x01]);
        }
        data.extend_from_slice(&END_TAG);
        assert_eq!(decode_resources(&data), Err(AmlError::OutOfBounds));
    }

    #[test]
    fn encode_then_decode_is_identity() {
        let resources = vec![
            AcpiResource::Irq {
                irq: 9,
                edge_triggered: false,
                active_low: true,
                shared: true,
                wake_capable: false,
            },
            AcpiResource::Dma {
                channel: 2,
                bus_master: true,
                transfer: 1,
                speed: 2,
            },
            AcpiResource::Io {
                decode_16bit: true,
                base: 0x3F8,
                max: 0x3F8,
                alignment: 1,
                length: 8,
            },
            AcpiResource::Memory32 {
                writable: true,
                base: 0xFEC0_0000,
                max: 0xFEC0_0000,
                alignment: 0x1000,
                length: 0x1000,
            },
            AcpiResource::AddressSpace(AddressSpace {
                width: AddressWidth::QWord,
                resource_type: AddressResourceType::Memory,
                general_flags: 0x0C,
                type_flags: 0x01,
                granularity: 0,
                min: 0x1_0000_0000,
                max: 0x1_FFFF_FFFF,
                translation: 0,
                length: 0x1_0000_0000,
            }),
            AcpiResource::ExtendedIrq {
                gsi: 42,
                consumer: true,
                edge_triggered: true,
                active_low: false,
                shared: false,
                wake_capable: true,
            },
            AcpiResource::Vendor {
                data: vec![1, 2, 3],
            },
        ];
        let bytes = encode_resource_template(&resources).unwrap();
        assert!(bytes.ends_with(&END_TAG));
        assert!(looks_like_resource_template(&bytes));
        assert_eq!(decode_resources(&bytes).unwrap(), resources);
    }

    #[test]
    fn encode_rejects_unrepresentable_values() {
        let irq = AcpiResource::Irq {
            irq: 16,
            edge_triggered: true,
            active_low: false,
            shared: false,
            wake_capable: false,
        };
        assert_eq!(
            encode_resource_template(&[irq]),
            Err(AmlError::IllegalArguments)
        );
    }

    #[test]
    fn looks_like_resource_template_checks() {
        assert!(looks_like_resource_template(&[
            0x47, 0x01, 0xF8, 0x03, 0xF8, 0x03, 0x01, 0x08, 0x79, 0x00
        ]));
        assert!(looks_like_resource_template(&[0x79, 0x00]));
        assert!(!looks_like_resource_template(&[]));
        assert!(!looks_like_resource_template(&[0x00, 0x01, 0x02]));
        // Trailing bytes after the end tag.
        assert!(!looks_like_resource_template(&[0x79, 0x00, 0x00]));
    }
}
