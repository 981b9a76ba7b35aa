//! Shared helpers for the integration tests: a tiny AML assembler and a
//! recording mock host.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::vec::Vec;

use hadron_aml::{Config, EisaId, Host, Interpreter, NodeId, PciAddress};

// ── AML assembler ─────────────────────────────────────────────────────

/// Prefixes `body` with its `PkgLength` (which counts itself).
pub fn pkg(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len() + 4);
    let len = body.len();
    if len < 0x3F {
        out.push((len + 1) as u8);
    } else if len + 2 < 1 << 12 {
        let total = len + 2;
        out.push(0x40 | (total & 0x0F) as u8);
        out.push((total >> 4) as u8);
    } else if len + 3 < 1 << 20 {
        let total = len + 3;
        out.push(0x80 | (total & 0x0F) as u8);
        out.push((total >> 4) as u8);
        out.push((total >> 12) as u8);
    } else {
        let total = len + 4;
        out.push(0xC0 | (total & 0x0F) as u8);
        out.push((total >> 4) as u8);
        out.push((total >> 12) as u8);
        out.push((total >> 20) as u8);
    }
    out.extend_from_slice(body);
    out
}

/// Encodes a field-list length (a bare `PkgLength` value).
fn field_length(bits: usize) -> Vec<u8> {
    if bits < 0x40 {
        vec![bits as u8]
    } else {
        vec![0x40 | (bits & 0x0F) as u8, (bits >> 4) as u8]
    }
}

fn seg(s: &str) -> [u8; 4] {
    let mut out = [b'_'; 4];
    out[..s.len()].copy_from_slice(s.as_bytes());
    out
}

/// Encodes a name string such as `\_SB.PCI0`, `^FOO` or `BAR`.
pub fn ns(path: &str) -> Vec<u8> {
    let mut out = Vec::new();
    let mut rest = path;
    if let Some(r) = rest.strip_prefix('\\') {
        out.push(b'\\');
        rest = r;
    }
    while let Some(r) = rest.strip_prefix('^') {
        out.push(b'^');
        rest = r;
    }
    let segs: Vec<&str> = if rest.is_empty() {
        Vec::new()
    } else {
        rest.split('.').collect()
    };
    match segs.len() {
        0 => out.push(0x00),
        1 => {}
        2 => out.push(0x2E),
        n => {
            out.push(0x2F);
            out.push(n as u8);
        }
    }
    for s in segs {
        out.extend_from_slice(&seg(s));
    }
    out
}

/// An integer constant in its shortest encoding.
pub fn int(v: u64) -> Vec<u8> {
    match v {
        0 => vec![0x00],
        1 => vec![0x01],
        2..=0xFF => vec![0x0A, v as u8],
        0x100..=0xFFFF => [&[0x0B][..], &(v as u16).to_le_bytes()].concat(),
        0x1_0000..=0xFFFF_FFFF => [&[0x0C][..], &(v as u32).to_le_bytes()].concat(),
        _ => [&[0x0E][..], &v.to_le_bytes()].concat(),
    }
}

/// The `EisaId("...")` integer.
pub fn eisa(id: &str) -> Vec<u8> {
    int(u64::from(EisaId::encode(id).expect("valid EISA ID").raw))
}

pub fn string(s: &str) -> Vec<u8> {
    [&[0x0D][..], s.as_bytes(), &[0x00]].concat()
}

pub fn buffer(bytes: &[u8]) -> Vec<u8> {
    let body = [int(bytes.len() as u64), bytes.to_vec()].concat();
    [vec![0x11], pkg(&body)].concat()
}

pub fn package(elements: &[Vec<u8>]) -> Vec<u8> {
    let body = [vec![elements.len() as u8], elements.concat()].concat();
    [vec![0x12], pkg(&body)].concat()
}

pub fn name(path: &str, value: &[u8]) -> Vec<u8> {
    [vec![0x08], ns(path), value.to_vec()].concat()
}

pub fn method(path: &str, flags: u8, body: &[u8]) -> Vec<u8> {
    let inner = [ns(path), vec![flags], body.to_vec()].concat();
    [vec![0x14], pkg(&inner)].concat()
}

pub fn scope(path: &str, body: &[u8]) -> Vec<u8> {
    let inner = [ns(path), body.to_vec()].concat();
    [vec![0x10], pkg(&inner)].concat()
}

pub fn device(path: &str, body: &[u8]) -> Vec<u8> {
    let inner = [ns(path), body.to_vec()].concat();
    [vec![0x5B, 0x82], pkg(&inner)].concat()
}

pub fn ret(value: &[u8]) -> Vec<u8> {
    [&[0xA4][..], value].concat()
}

pub fn if_(predicate: &[u8], body: &[u8]) -> Vec<u8> {
    [vec![0xA0], pkg(&[predicate, body].concat())].concat()
}

pub fn else_(body: &[u8]) -> Vec<u8> {
    [vec![0xA1], pkg(body)].concat()
}

pub fn while_(predicate: &[u8], body: &[u8]) -> Vec<u8> {
    [vec![0xA2], pkg(&[predicate, body].concat())].concat()
}

/// `OpRegion(name, space, offset, length)`.
pub fn op_region(path: &str, space: u8, offset: u64, length: u64) -> Vec<u8> {
    [vec![0x5B, 0x80], ns(path), vec![space], int(offset), int(length)].concat()
}

/// Encodes a field list; an empty name is a reserved gap.
fn field_list(entries: &[(&str, usize)]) -> Vec<u8> {
    let mut out = Vec::new();
    for &(entry, bits) in entries {
        if entry.is_empty() {
            out.push(0x00);
        } else {
            out.extend_from_slice(&seg(entry));
        }
        out.extend_from_slice(&field_length(bits));
    }
    out
}

/// `Field(region, flags) { name, bits, ... }`.
pub fn field(region: &str, flags: u8, entries: &[(&str, usize)]) -> Vec<u8> {
    let inner = [ns(region), vec![flags], field_list(entries)].concat();
    [vec![0x5B, 0x81], pkg(&inner)].concat()
}

/// `IndexField(index, data, flags) { name, bits, ... }`.
pub fn index_field(index: &str, data: &str, flags: u8, entries: &[(&str, usize)]) -> Vec<u8> {
    let inner = [ns(index), ns(data), vec![flags], field_list(entries)].concat();
    [vec![0x5B, 0x86], pkg(&inner)].concat()
}

/// `BankField(region, bank, selector, flags) { name, bits, ... }`.
pub fn bank_field(
    region: &str,
    bank: &str,
    selector: u64,
    flags: u8,
    entries: &[(&str, usize)],
) -> Vec<u8> {
    let inner = [ns(region), ns(bank), int(selector), vec![flags], field_list(entries)].concat();
    [vec![0x5B, 0x87], pkg(&inner)].concat()
}

pub fn mutex(path: &str, sync_level: u8) -> Vec<u8> {
    [vec![0x5B, 0x01], ns(path), vec![sync_level]].concat()
}

pub fn local(n: u8) -> Vec<u8> {
    vec![0x60 + n]
}

pub fn arg(n: u8) -> Vec<u8> {
    vec![0x68 + n]
}

/// Wraps AML in a checksummed table header.
pub fn table(signature: &[u8; 4], revision: u8, aml: &[u8]) -> Vec<u8> {
    let mut t = vec![0u8; 36];
    t[0..4].copy_from_slice(signature);
    t[4..8].copy_from_slice(&((36 + aml.len()) as u32).to_le_bytes());
    t[8] = revision;
    t[10..16].copy_from_slice(b"HADRON");
    t[16..24].copy_from_slice(b"TESTDSDT");
    t.extend_from_slice(aml);
    let sum = t.iter().fold(0u8, |s, &b| s.wrapping_add(b));
    t[9] = 0u8.wrapping_sub(sum);
    t
}

// ── Mock host ─────────────────────────────────────────────────────────

/// A host that records I/O and keeps simulated time.
#[derive(Default)]
pub struct MockHost {
    /// Current value of every I/O port that was set or written.
    pub ports: RefCell<BTreeMap<u16, u64>>,
    /// Every I/O write as `(port, width, value)`.
    pub io_writes: RefCell<Vec<(u16, u8, u64)>>,
    /// Byte-addressed physical memory.
    pub memory: RefCell<BTreeMap<u64, u8>>,
    /// PCI configuration space, keyed by function and offset.
    pub pci: RefCell<BTreeMap<(u16, u8, u8, u8, u16), u64>>,
    /// Every `Notify` as `(node, value)`.
    pub notifications: RefCell<Vec<(NodeId, u64)>>,
    /// Simulated time in 100 ns ticks.
    pub time: Cell<u64>,
    /// `(smi_port, value, pm1_control_port)`: writing `value` to
    /// `smi_port` sets `SCI_EN`, clearing it for any other value.
    pub smi: Cell<Option<(u16, u64, u16)>>,
}

fn width_mask(width: u8) -> u64 {
    if width >= 64 { u64::MAX } else { (1 << width) - 1 }
}

impl MockHost {
    pub fn set_port(&self, port: u16, value: u64) {
        self.ports.borrow_mut().insert(port, value);
    }

    pub fn port(&self, port: u16) -> u64 {
        self.ports.borrow().get(&port).copied().unwrap_or(0)
    }

    pub fn writes(&self) -> Vec<(u16, u8, u64)> {
        self.io_writes.borrow().clone()
    }

    pub fn write_memory_bytes(&self, address: u64, bytes: &[u8]) {
        let mut memory = self.memory.borrow_mut();
        for (i, &b) in bytes.iter().enumerate() {
            memory.insert(address + i as u64, b);
        }
    }
}

impl Host for MockHost {
    fn read_memory(&self, address: u64, width: u8) -> u64 {
        let memory = self.memory.borrow();
        (0..u64::from(width / 8)).fold(0, |v, i| {
            v | (u64::from(memory.get(&(address + i)).copied().unwrap_or(0)) << (i * 8))
        })
    }

    fn write_memory(&self, address: u64, width: u8, value: u64) {
        let mut memory = self.memory.borrow_mut();
        for i in 0..u64::from(width / 8) {
            memory.insert(address + i, (value >> (i * 8)) as u8);
        }
    }

    fn read_io(&self, port: u16, width: u8) -> u64 {
        self.port(port) & width_mask(width)
    }

    fn write_io(&self, port: u16, width: u8, value: u64) {
        self.io_writes.borrow_mut().push((port, width, value));
        self.set_port(port, value & width_mask(width));
        if let Some((smi_port, enable, control)) = self.smi.get() {
            if port == smi_port {
                let cnt = self.port(control);
                self.set_port(control, if value == enable { cnt | 1 } else { cnt & !1 });
            }
        }
    }

    fn read_pci(&self, address: PciAddress, offset: u16, width: u8) -> u64 {
        let key = (address.segment, address.bus, address.device, address.function, offset);
        self.pci.borrow().get(&key).copied().unwrap_or(0) & width_mask(width)
    }

    fn write_pci(&self, address: PciAddress, offset: u16, width: u8, value: u64) {
        let key = (address.segment, address.bus, address.device, address.function, offset);
        self.pci.borrow_mut().insert(key, value & width_mask(width));
    }

    fn sleep(&self, ms: u64) {
        self.time.set(self.time.get() + ms * 10_000);
    }

    fn stall(&self, us: u64) {
        self.time.set(self.time.get() + us * 10);
    }

    fn timer(&self) -> u64 {
        self.time.get()
    }

    fn notify(&self, node: NodeId, value: u64) {
        self.notifications.borrow_mut().push((node, value));
    }
}

/// An interpreter over `aml` (revision 2, default configuration).
pub fn load(aml: &[u8]) -> Interpreter<MockHost> {
    load_with(aml, Config::default())
}

/// An interpreter over `aml` with the given configuration.
pub fn load_with(aml: &[u8], config: Config) -> Interpreter<MockHost> {
    let mut interp = Interpreter::new(MockHost::default(), config);
    interp.load_aml(aml, 2).expect("table loads");
    interp
}
