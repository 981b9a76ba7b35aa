//! The host capability interface.
//!
//! The interpreter never touches hardware directly. Operation region
//! accesses, delays and the ACPI timer all go through a [`Host`]
//! implementation supplied by the kernel.

use crate::namespace::NodeId;

/// A PCI function address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PciAddress {
    /// PCI segment group (`_SEG`).
    pub segment: u16,
    /// Bus number (`_BBN` for the root bridge).
    pub bus: u8,
    /// Device number (upper word of `_ADR`).
    pub device: u8,
    /// Function number (lower word of `_ADR`).
    pub function: u8,
}

/// Hardware and timing services required by the interpreter.
///
/// Every access takes a width in bits (8, 16, 32 or 64). Reads return the
/// value zero-extended to 64 bits. Implementations decide how to map
/// physical addresses; the interpreter only ever passes addresses that come
/// from operation region definitions.
pub trait Host {
    /// Reads `width` bits of physical memory at `address`.
    fn read_memory(&self, address: u64, width: u8) -> u64;

    /// Writes `width` bits of physical memory at `address`.
    fn write_memory(&self, address: u64, width: u8, value: u64);

    /// Reads `width` bits from I/O port `port`.
    fn read_io(&self, port: u16, width: u8) -> u64;

    /// Writes `width` bits to I/O port `port`.
    fn write_io(&self, port: u16, width: u8, value: u64);

    /// Reads `width` bits of PCI configuration space.
    fn read_pci(&self, address: PciAddress, offset: u16, width: u8) -> u64;

    /// Writes `width` bits of PCI configuration space.
    fn write_pci(&self, address: PciAddress, offset: u16, width: u8, value: u64);

    /// Sleeps for at least `ms` milliseconds (may yield the CPU).
    fn sleep(&self, ms: u64);

    /// Busy-waits for `us` microseconds.
    fn stall(&self, us: u64);

    /// Monotonic timer in 100 ns units.
    fn timer(&self) -> u64;

    /// Called for AML `Notify(node, value)`.
    fn notify(&self, node: NodeId, value: u64) {
        let _ = (node, value);
    }

    /// Called for AML `Fatal(kind, code, arg)`.
    fn fatal(&self, kind: u8, code: u32, arg: u64) {
        let _ = (kind, code, arg);
    }
}
