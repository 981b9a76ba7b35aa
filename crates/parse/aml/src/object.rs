//! AML object model: the value type shared by the namespace, the evaluator
//! and the kernel-facing API.
//!
//! [`AmlValue`] has plain value semantics. The evaluator clones values out
//! of namespace nodes and method frames, so a returned value never aliases
//! storage owned by an evaluation that is being torn down.

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt::Write;

use crate::AmlError;
use crate::namespace::NodeId;

/// Coarse object type of an [`AmlValue`], as seen by API consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    /// Uninitialized / absent value.
    None,
    /// 64-bit (or 32-bit, per table revision) unsigned integer.
    Integer,
    /// ASCII string.
    String,
    /// Raw byte buffer.
    Buffer,
    /// Ordered collection of values.
    Package,
    /// Reference to a namespace node.
    Device,
}

/// A resolved AML data object value.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AmlValue {
    /// No value has been assigned yet.
    #[default]
    Uninitialized,
    /// An integer. Values produced by the evaluator are already truncated
    /// to the integer width of the loaded tables.
    Integer(u64),
    /// An ASCII string.
    String(String),
    /// A byte buffer.
    Buffer(Vec<u8>),
    /// A package of (possibly nested) values.
    Package(Vec<AmlValue>),
    /// A reference to a namespace node (devices, `RefOf` results, and
    /// names inside packages).
    Handle(NodeId),
}

impl AmlValue {
    /// Returns the coarse type of this value.
    #[must_use]
    pub fn object_type(&self) -> ObjectType {
        match self {
            Self::Uninitialized => ObjectType::None,
            Self::Integer(_) => ObjectType::Integer,
            Self::String(_) => ObjectType::String,
            Self::Buffer(_) => ObjectType::Buffer,
            Self::Package(_) => ObjectType::Package,
            Self::Handle(_) => ObjectType::Device,
        }
    }

    /// Returns the integer held by this value.
    ///
    /// No implicit conversion is attempted.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::TypeMismatch`] unless the value is an integer.
    pub fn as_integer(&self) -> Result<u64, AmlError> {
        match self {
            Self::Integer(v) => Ok(*v),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    /// Returns the string held by this value.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::TypeMismatch`] unless the value is a string.
    pub fn as_str(&self) -> Result<&str, AmlError> {
        match self {
            Self::String(s) => Ok(s),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    /// Returns the bytes held by this value.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::TypeMismatch`] unless the value is a buffer.
    pub fn as_buffer(&self) -> Result<&[u8], AmlError> {
        match self {
            Self::Buffer(b) => Ok(b),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    /// Returns the elements of a package.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::TypeMismatch`] unless the value is a package.
    pub fn package(&self) -> Result<&[AmlValue], AmlError> {
        match self {
            Self::Package(p) => Ok(p),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    /// Bounds-checked access to a package element.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::TypeMismatch`] if the value is not a package and
    /// [`AmlError::OutOfBounds`] if `index` is past the last element.
    pub fn package_element(&self, index: usize) -> Result<&AmlValue, AmlError> {
        self.package()?.get(index).ok_or(AmlError::OutOfBounds)
    }

    /// Returns the namespace node referenced by this value.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::TypeMismatch`] unless the value is a handle.
    pub fn handle(&self) -> Result<NodeId, AmlError> {
        match self {
            Self::Handle(node) => Ok(*node),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    /// Builds the value a `_HID` comparison expects for `id`.
    ///
    /// A valid 7-character EISA ID (e.g. `"PNP0A03"`) becomes its packed
    /// integer form; anything else (e.g. `"ACPI0007"`) stays a string.
    #[must_use]
    pub fn eisa_id(id: &str) -> Self {
        match EisaId::encode(id) {
            Some(eisa) => Self::Integer(u64::from(eisa.raw)),
            None => Self::String(String::from(id)),
        }
    }
}

impl From<u64> for AmlValue {
    fn from(v: u64) -> Self {
        Self::Integer(v)
    }
}

impl From<&str> for AmlValue {
    fn from(s: &str) -> Self {
        Self::String(String::from(s))
    }
}

impl From<String> for AmlValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<u8>> for AmlValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Buffer(b)
    }
}

impl From<NodeId> for AmlValue {
    fn from(node: NodeId) -> Self {
        Self::Handle(node)
    }
}

/// A compressed EISA/PnP device identifier.
///
/// EISA IDs are stored as 32-bit compressed values in AML bytecode
/// (via the `EisaId()` macro in ASL). The 3-letter manufacturer code
/// is packed into the upper 16 bits and the product ID into the lower 16,
/// and the whole value is byte-swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EisaId {
    /// The raw 32-bit EISA ID value, exactly as it appears in AML.
    pub raw: u32,
}

impl EisaId {
    /// Encodes a 7-character EISA ID string (e.g., `"PNP0A03"`).
    ///
    /// Returns `None` unless the string is three upper-case letters
    /// followed by four hex digits.
    #[must_use]
    pub fn encode(id: &str) -> Option<Self> {
        let bytes = id.as_bytes();
        if bytes.len() != 7 {
            return None;
        }
        if !bytes[..3].iter().all(u8::is_ascii_uppercase) {
            return None;
        }

        let c1 = u32::from(bytes[0] - b'@');
        let c2 = u32::from(bytes[1] - b'@');
        let c3 = u32::from(bytes[2] - b'@');
        let manufacturer = (c1 << 10) | (c2 << 5) | c3;

        let mut product = 0u32;
        for &b in &bytes[3..] {
            let digit = char::from(b).to_digit(16)?;
            product = (product << 4) | digit;
        }

        let native = (manufacturer << 16) | product;
        Some(Self {
            raw: native.swap_bytes(),
        })
    }

    /// Decodes the EISA ID into a 7-character ASCII string (e.g., `"PNP0A03"`).
    #[must_use]
    pub fn decode(&self) -> [u8; 7] {
        // After byte-swapping to native order:
        //   Bits 30-26: first char - 'A' + 1
        //   Bits 25-21: second char - 'A' + 1
        //   Bits 20-16: third char - 'A' + 1
        //   Bits 15-0:  product ID as 4 hex digits
        let swapped = self.raw.swap_bytes();
        let c1 = (((swapped >> 26) & 0x1F) as u8) + b'@';
        let c2 = (((swapped >> 21) & 0x1F) as u8) + b'@';
        let c3 = (((swapped >> 16) & 0x1F) as u8) + b'@';
        let product = swapped as u16;

        [
            c1,
            c2,
            c3,
            hex_upper((product >> 12) as u8 & 0xF),
            hex_upper((product >> 8) as u8 & 0xF),
            hex_upper((product >> 4) as u8 & 0xF),
            hex_upper(product as u8 & 0xF),
        ]
    }

    /// Decodes the EISA ID into an owned string.
    #[must_use]
    pub fn to_id_string(&self) -> String {
        self.decode().iter().map(|&b| char::from(b)).collect()
    }
}

fn hex_upper(nibble: u8) -> u8 {
    if nibble < 10 {
        b'0' + nibble
    } else {
        b'A' + nibble - 10
    }
}

// ---------------------------------------------------------------------------
// Implicit conversions (ACPI 6.5 §19.3.5)
// ---------------------------------------------------------------------------

/// Integer width in effect for the loaded tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum IntWidth {
    /// DSDT revision < 2.
    Bits32,
    /// DSDT revision >= 2.
    Bits64,
}

impl IntWidth {
    /// All-ones value for this width (`Ones`, logical true).
    pub(crate) fn ones(self) -> u64 {
        match self {
            Self::Bits32 => u64::from(u32::MAX),
            Self::Bits64 => u64::MAX,
        }
    }

    /// Truncates `v` to this width.
    pub(crate) fn mask(self, v: u64) -> u64 {
        v & self.ones()
    }

    /// Width in bytes.
    pub(crate) fn bytes(self) -> usize {
        match self {
            Self::Bits32 => 4,
            Self::Bits64 => 8,
        }
    }

    /// Width in bits.
    pub(crate) fn bits(self) -> u64 {
        match self {
            Self::Bits32 => 32,
            Self::Bits64 => 64,
        }
    }
}

/// Converts a value to an integer using the implicit source-operand rules.
///
/// Strings are read as hexadecimal up to the first non-hex character;
/// buffers contribute their first 4/8 bytes in little-endian order.
pub(crate) fn to_integer(value: &AmlValue, width: IntWidth) -> Result<u64, AmlError> {
    match value {
        AmlValue::Integer(v) => Ok(width.mask(*v)),
        AmlValue::String(s) => {
            let digits = s.trim_start();
            let digits = digits
                .strip_prefix("0x")
                .or_else(|| digits.strip_prefix("0X"))
                .unwrap_or(digits);
            let mut v: u64 = 0;
            for c in digits.chars() {
                let Some(d) = c.to_digit(16) else { break };
                v = (v << 4) | u64::from(d);
            }
            Ok(width.mask(v))
        }
        AmlValue::Buffer(b) => {
            let mut v: u64 = 0;
            for (i, &byte) in b.iter().take(width.bytes()).enumerate() {
                v |= u64::from(byte) << (i * 8);
            }
            Ok(v)
        }
        _ => Err(AmlError::TypeMismatch),
    }
}

/// Converts a value to a buffer (integers become 4/8 little-endian bytes,
/// strings are copied with their terminating NUL).
pub(crate) fn to_buffer(value: &AmlValue, width: IntWidth) -> Result<Vec<u8>, AmlError> {
    match value {
        AmlValue::Integer(v) => Ok(v.to_le_bytes()[..width.bytes()].to_vec()),
        AmlValue::String(s) => {
            let mut b = Vec::with_capacity(s.len() + 1);
            b.extend_from_slice(s.as_bytes());
            b.push(0);
            Ok(b)
        }
        AmlValue::Buffer(b) => Ok(b.clone()),
        _ => Err(AmlError::TypeMismatch),
    }
}

/// Converts a value to a string using the implicit rules: integers become
/// fixed-width upper-case hex, buffers become space separated hex bytes.
pub(crate) fn to_string(value: &AmlValue, width: IntWidth) -> Result<String, AmlError> {
    match value {
        AmlValue::Integer(v) => {
            let mut s = String::new();
            let _ = match width {
                IntWidth::Bits32 => write!(s, "{:08X}", *v as u32),
                IntWidth::Bits64 => write!(s, "{v:016X}"),
            };
            Ok(s)
        }
        AmlValue::String(s) => Ok(s.clone()),
        AmlValue::Buffer(b) => {
            let mut s = String::with_capacity(b.len() * 3);
            for (i, byte) in b.iter().enumerate() {
                if i > 0 {
                    s.push(' ');
                }
                let _ = write!(s, "{byte:02X}");
            }
            Ok(s)
        }
        _ => Err(AmlError::TypeMismatch),
    }
}

/// Converts `value` to the type of `like` (Integer, String or Buffer).
///
/// Used when storing into a named object whose type is already fixed. A
/// buffer target keeps its length: the source is truncated or zero-padded.
pub(crate) fn convert_like(
    value: &AmlValue,
    like: &AmlValue,
    width: IntWidth,
) -> Result<AmlValue, AmlError> {
    Ok(match like {
        AmlValue::Integer(_) => AmlValue::Integer(to_integer(value, width)?),
        AmlValue::String(_) => AmlValue::String(to_string(value, width)?),
        AmlValue::Buffer(old) => {
            let mut b = match value {
                // Strings stored into buffers are copied without the NUL.
                AmlValue::String(s) => s.as_bytes().to_vec(),
                _ => to_buffer(value, width)?,
            };
            b.resize(old.len(), 0);
            AmlValue::Buffer(b)
        }
        _ => value.clone(),
    })
}
