//! AML name segments and name strings.
//!
//! ACPI names are composed of 4-byte segments. A name string is a list of
//! segments with an optional root (`\`) or parent (`^`) prefix. Relative
//! single-segment names are subject to the namespace search rules; every
//! other form resolves exactly.

use alloc::vec::Vec;

use crate::AmlError;

/// A 4-byte AML name segment (e.g., `_SB_`, `PCI0`, `_HID`).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NameSeg(pub [u8; 4]);

impl NameSeg {
    /// The root node's placeholder name.
    pub const ROOT: Self = Self(*b"\\___");

    /// Create a `NameSeg` from a 4-byte slice.
    ///
    /// Returns `None` if the slice is shorter than 4 bytes or the bytes are
    /// not valid name characters.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; 4] = bytes.get(..4)?.try_into().ok()?;
        let seg = Self(bytes);
        seg.is_valid().then_some(seg)
    }

    /// Parse a segment from a string of 1 to 4 characters, padding short
    /// names with `_` the same way ASL compilers do.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] for empty, overlong or
    /// non-ACPI names.
    pub fn from_str_padded(s: &str) -> Result<Self, AmlError> {
        let bytes = s.as_bytes();
        if bytes.is_empty() || bytes.len() > 4 {
            return Err(AmlError::IllegalArguments);
        }
        let mut seg = [b'_'; 4];
        seg[..bytes.len()].copy_from_slice(bytes);
        let seg = Self(seg);
        if seg.is_valid() {
            Ok(seg)
        } else {
            Err(AmlError::IllegalArguments)
        }
    }

    /// Returns `true` if every byte is a legal name character and the first
    /// one is a lead character (`A-Z` or `_`).
    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_lead_char(self.0[0]) && self.0[1..].iter().all(|&c| is_name_char(c))
    }

    /// Returns the name as a UTF-8 string (ACPI names are always ASCII).
    #[must_use]
    pub fn as_str(&self) -> &str {
        core::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl core::fmt::Debug for NameSeg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "NameSeg(\"{}\")", self.as_str())
    }
}

impl core::fmt::Display for NameSeg {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returns `true` for `A-Z` and `_`.
#[must_use]
pub const fn is_lead_char(c: u8) -> bool {
    matches!(c, b'A'..=b'Z' | b'_')
}

/// Returns `true` for `A-Z`, `0-9` and `_`.
#[must_use]
pub const fn is_name_char(c: u8) -> bool {
    matches!(c, b'A'..=b'Z' | b'0'..=b'9' | b'_')
}

/// A parsed AML name string.
///
/// `root` and `parents` record the `\` and `^` prefixes; `segments` holds the
/// name segments in order. A name with no segments and no prefix is the
/// `NullName`.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AmlName {
    /// Name starts with `\`.
    pub root: bool,
    /// Number of leading `^` prefixes.
    pub parents: u8,
    /// The name segments.
    pub segments: Vec<NameSeg>,
}

impl AmlName {
    /// The absolute root path (`\`).
    #[must_use]
    pub fn root() -> Self {
        Self {
            root: true,
            parents: 0,
            segments: Vec::new(),
        }
    }

    /// A relative name made of a single segment.
    #[must_use]
    pub fn from_seg(seg: NameSeg) -> Self {
        let mut segments = Vec::with_capacity(1);
        segments.push(seg);
        Self {
            root: false,
            parents: 0,
            segments,
        }
    }

    /// Parses a human-readable path such as `\_SB.PCI0`, `^^FOO.BAR` or
    /// `_CRS`.
    ///
    /// Segments shorter than 4 characters are padded with `_`.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] if the string is not a valid
    /// ACPI path.
    pub fn parse(path: &str) -> Result<Self, AmlError> {
        let mut rest = path;
        let mut name = Self::default();

        if let Some(stripped) = rest.strip_prefix('\\') {
            name.root = true;
            rest = stripped;
        } else {
            while let Some(stripped) = rest.strip_prefix('^') {
                name.parents = name
                    .parents
                    .checked_add(1)
                    .ok_or(AmlError::IllegalArguments)?;
                rest = stripped;
            }
        }

        if !rest.is_empty() {
            for part in rest.split('.') {
                name.segments.push(NameSeg::from_str_padded(part)?);
            }
        }

        if !name.root && name.parents == 0 && name.segments.is_empty() {
            return Err(AmlError::IllegalArguments);
        }
        Ok(name)
    }

    /// Returns `true` if this is the `NullName`.
    #[must_use]
    pub fn is_null(&self) -> bool {
        !self.root && self.parents == 0 && self.segments.is_empty()
    }

    /// Returns `true` if the name is subject to the upward namespace search
    /// (a single segment with no prefix).
    #[must_use]
    pub fn is_search_candidate(&self) -> bool {
        !self.root && self.parents == 0 && self.segments.len() == 1
    }

    /// Returns the final segment, if any.
    #[must_use]
    pub fn last_segment(&self) -> Option<NameSeg> {
        self.segments.last().copied()
    }

    /// Returns the name without its final segment (the scope in which the
    /// final segment lives).
    #[must_use]
    pub fn parent_name(&self) -> Self {
        let mut parent = self.clone();
        parent.segments.pop();
        parent
    }
}

impl core::fmt::Debug for AmlName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "AmlName(\"{self}\")")
    }
}

impl core::fmt::Display for AmlName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.root {
            f.write_str("\\")?;
        }
        for _ in 0..self.parents {
            f.write_str("^")?;
        }
        for (i, seg) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            write!(f, "{seg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::string::ToString;

    use super::*;

    #[test]
    fn parse_absolute_path() {
        let name = AmlName::parse("\\_SB.PCI0").unwrap();
        assert!(name.root);
        assert_eq!(name.segments, [NameSeg(*b"_SB_"), NameSeg(*b"PCI0")]);
        assert_eq!(name.to_string(), "\\_SB_.PCI0");
    }

    #[test]
    fn parse_parent_prefixed_path() {
        let name = AmlName::parse("^^FOO.B").unwrap();
        assert!(!name.root);
        assert_eq!(name.parents, 2);
        assert_eq!(name.segments, [NameSeg(*b"FOO_"), NameSeg(*b"B___")]);
        assert!(!name.is_search_candidate());
    }

    #[test]
    fn single_segment_is_search_candidate() {
        let name = AmlName::parse("_CRS").unwrap();
        assert!(name.is_search_candidate());
        assert_eq!(name.last_segment(), Some(NameSeg(*b"_CRS")));
    }

    #[test]
    fn rejects_bad_names() {
        assert_eq!(AmlName::parse(""), Err(AmlError::IllegalArguments));
        assert_eq!(AmlName::parse("\\1ABC"), Err(AmlError::IllegalArguments));
        assert_eq!(AmlName::parse("TOOLONG"), Err(AmlError::IllegalArguments));
        assert_eq!(AmlName::parse("\\A..B"), Err(AmlError::IllegalArguments));
    }

    #[test]
    fn root_only_path() {
        let name = AmlName::parse("\\").unwrap();
        assert_eq!(name, AmlName::root());
        assert_eq!(name.to_string(), "\\");
    }
}
