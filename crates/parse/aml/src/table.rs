//! System Description Table headers and the FADT fields the interpreter's
//! services need.

use bitflags::bitflags;

use crate::AmlError;

/// Reads a little-endian `u16` at `offset`, or `None` if out of bounds.
fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    Some(u16::from_le_bytes(data.get(offset..offset + 2)?.try_into().ok()?))
}

/// Reads a little-endian `u32` at `offset`, or `None` if out of bounds.
fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    Some(u32::from_le_bytes(data.get(offset..offset + 4)?.try_into().ok()?))
}

/// Standard ACPI System Description Table header.
///
/// This 36-byte header is present at the start of every ACPI table,
/// including the DSDT and SSDTs handed to the interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SdtHeader {
    /// 4-byte ASCII signature identifying the table type.
    pub signature: [u8; 4],
    /// Total length of the table, including the header, in bytes.
    pub length: u32,
    /// Revision of the table structure. For definition blocks this selects
    /// the integer width (below 2 means 32-bit integers).
    pub revision: u8,
    /// Checksum byte. The entire table, including the header, must sum to zero.
    pub checksum: u8,
    /// OEM-supplied identification string.
    pub oem_id: [u8; 6],
    /// OEM-supplied table identification string.
    pub oem_table_id: [u8; 8],
    /// OEM-supplied revision number.
    pub oem_revision: u32,
    /// Vendor ID of the utility that created the table.
    pub creator_id: u32,
    /// Revision of the utility that created the table.
    pub creator_revision: u32,
}

impl SdtHeader {
    /// The size of an SDT header in bytes.
    pub const SIZE: usize = 36;

    /// Read an [`SdtHeader`] from a byte slice.
    ///
    /// Returns `None` if the slice is shorter than [`SdtHeader::SIZE`] bytes.
    #[must_use]
    pub fn read_from_bytes(data: &[u8]) -> Option<Self> {
        let data = data.get(..Self::SIZE)?;
        Some(Self {
            signature: data[0..4].try_into().ok()?,
            length: read_u32(data, 4)?,
            revision: data[8],
            checksum: data[9],
            oem_id: data[10..16].try_into().ok()?,
            oem_table_id: data[16..24].try_into().ok()?,
            oem_revision: read_u32(data, 24)?,
            creator_id: read_u32(data, 28)?,
            creator_revision: read_u32(data, 32)?,
        })
    }

    /// Parses the header of a table and returns it together with the table
    /// body (the bytes after the header, up to the declared length).
    ///
    /// A checksum mismatch is logged but tolerated: plenty of shipping
    /// firmware gets it wrong.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] if the slice is shorter than
    /// the header or than the length the header declares.
    pub fn split_table(table: &[u8]) -> Result<(Self, &[u8]), AmlError> {
        let header = Self::read_from_bytes(table).ok_or(AmlError::IllegalArguments)?;
        let length = header.length as usize;
        if length < Self::SIZE || length > table.len() {
            return Err(AmlError::IllegalArguments);
        }
        let table = &table[..length];
        if !validate_checksum(table) {
            log::warn!(
                "aml: table {} has an invalid checksum",
                core::str::from_utf8(&header.signature).unwrap_or("????")
            );
        }
        Ok((header, &table[Self::SIZE..]))
    }
}

/// Validate the checksum of a byte slice.
///
/// ACPI tables are designed so that the sum of all bytes in the table equals
/// zero (mod 256).
#[must_use]
pub fn validate_checksum(data: &[u8]) -> bool {
    data.iter().fold(0u8, |sum, &b| sum.wrapping_add(b)) == 0
}

/// FADT table signature.
pub const FADT_SIGNATURE: &[u8; 4] = b"FACP";

bitflags! {
    /// PM1 control register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Pm1Control: u16 {
        /// The platform generates SCIs (ACPI mode is on).
        const SCI_EN = 1 << 0;
        /// Bus master requests wake the processor from C3.
        const BM_RLD = 1 << 1;
        /// Writing one raises an SMI to release the global lock.
        const GBL_RLS = 1 << 2;
        /// Sleep type field (3 bits).
        const SLP_TYP = 0b111 << 10;
        /// Writing one enters the sleep state selected by `SLP_TYP`.
        const SLP_EN = 1 << 13;
    }
}

bitflags! {
    /// PM1 event status/enable register bits.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Pm1Event: u16 {
        /// Power management timer carry.
        const TMR = 1 << 0;
        /// Bus master activity.
        const BM = 1 << 4;
        /// Global lock released by firmware.
        const GBL = 1 << 5;
        /// Power button pressed.
        const PWRBTN = 1 << 8;
        /// Sleep button pressed.
        const SLPBTN = 1 << 9;
        /// Real-time clock alarm.
        const RTC = 1 << 10;
        /// PCI Express wake.
        const PCIEXP_WAKE = 1 << 14;
        /// The system woke from a sleep state.
        const WAK = 1 << 15;
    }
}

impl Pm1Control {
    /// Bit position of the `SLP_TYP` field.
    pub const SLP_TYP_SHIFT: u16 = 10;
}

/// Parsed FADT: the fixed-hardware fields the services use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Fadt {
    /// Table revision.
    pub revision: u8,
    /// System vector the SCI is wired to.
    pub sci_interrupt: u16,
    /// I/O port of the SMI command register.
    pub smi_command: u32,
    /// Value written to `smi_command` to enter ACPI mode.
    pub acpi_enable: u8,
    /// Value written to `smi_command` to leave ACPI mode.
    pub acpi_disable: u8,
    /// PM1a event block port.
    pub pm1a_event_block: u32,
    /// PM1b event block port (zero if absent).
    pub pm1b_event_block: u32,
    /// PM1a control block port.
    pub pm1a_control_block: u32,
    /// PM1b control block port (zero if absent).
    pub pm1b_control_block: u32,
    /// PM timer port.
    pub pm_timer_block: u32,
    /// Length of each PM1 event block (status half + enable half).
    pub pm1_event_length: u8,
    /// Fixed feature flags.
    pub flags: u32,
}

impl Fadt {
    const SCI_INT_OFFSET: usize = 46;
    const SMI_CMD_OFFSET: usize = 48;
    const ACPI_ENABLE_OFFSET: usize = 52;
    const ACPI_DISABLE_OFFSET: usize = 53;
    const PM1A_EVT_BLK_OFFSET: usize = 56;
    const PM1B_EVT_BLK_OFFSET: usize = 60;
    const PM1A_CNT_BLK_OFFSET: usize = 64;
    const PM1B_CNT_BLK_OFFSET: usize = 68;
    const PM_TMR_BLK_OFFSET: usize = 76;
    const PM1_EVT_LEN_OFFSET: usize = 88;
    const FLAGS_OFFSET: usize = 112;

    /// Hardware-reduced ACPI: there is no SMI command port nor PM1 blocks.
    pub const HW_REDUCED_ACPI: u32 = 1 << 20;

    /// Parses a FADT from the full table bytes (header included).
    ///
    /// Older FADT revisions are shorter; fields past the end of the table
    /// read as zero.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] if the slice is not a `FACP`
    /// table or is too short for its own header.
    pub fn parse(data: &[u8]) -> Result<Self, AmlError> {
        let (header, _) = SdtHeader::split_table(data)?;
        if &header.signature != FADT_SIGNATURE {
            return Err(AmlError::IllegalArguments);
        }
        let data = &data[..header.length as usize];
        let byte = |offset: usize| data.get(offset).copied().unwrap_or(0);

        Ok(Self {
            revision: header.revision,
            sci_interrupt: read_u16(data, Self::SCI_INT_OFFSET).unwrap_or(0),
            smi_command: read_u32(data, Self::SMI_CMD_OFFSET).unwrap_or(0),
            acpi_enable: byte(Self::ACPI_ENABLE_OFFSET),
            acpi_disable: byte(Self::ACPI_DISABLE_OFFSET),
            pm1a_event_block: read_u32(data, Self::PM1A_EVT_BLK_OFFSET).unwrap_or(0),
            pm1b_event_block: read_u32(data, Self::PM1B_EVT_BLK_OFFSET).unwrap_or(0),
            pm1a_control_block: read_u32(data, Self::PM1A_CNT_BLK_OFFSET).unwrap_or(0),
            pm1b_control_block: read_u32(data, Self::PM1B_CNT_BLK_OFFSET).unwrap_or(0),
            pm_timer_block: read_u32(data, Self::PM_TMR_BLK_OFFSET).unwrap_or(0),
            pm1_event_length: byte(Self::PM1_EVT_LEN_OFFSET),
            flags: read_u32(data, Self::FLAGS_OFFSET).unwrap_or(0),
        })
    }

    /// Returns `true` on hardware-reduced platforms.
    #[must_use]
    pub fn is_hardware_reduced(&self) -> bool {
        self.flags & Self::HW_REDUCED_ACPI != 0
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use std::vec;
    use std::vec::Vec;

    use super::*;

    /// Builds a checksummed table with the given signature and body.
    fn table(signature: &[u8; 4], revision: u8, body: &[u8]) -> Vec<u8> {
        let mut t = vec![0u8; SdtHeader::SIZE];
        t[0..4].copy_from_slice(signature);
        t[4..8].copy_from_slice(&((SdtHeader::SIZE + body.len()) as u32).to_le_bytes());
        t[8] = revision;
        t[10..16].copy_from_slice(b"HADRON");
        t.extend_from_slice(body);
        let sum = t.iter().fold(0u8, |s, &b| s.wrapping_add(b));
        t[9] = 0u8.wrapping_sub(sum);
        t
    }

    #[test]
    fn header_round_trip() {
        let t = table(b"DSDT", 2, &[0xA3]);
        assert!(validate_checksum(&t));
        let (header, body) = SdtHeader::split_table(&t).unwrap();
        assert_eq!(&header.signature, b"DSDT");
        assert_eq!(header.revision, 2);
        assert_eq!(&header.oem_id, b"HADRON");
        assert_eq!(body, [0xA3]);
    }

    #[test]
    fn truncated_table_rejected() {
        let t = table(b"SSDT", 2, &[1, 2, 3]);
        assert_eq!(
            SdtHeader::split_table(&t[..t.len() - 1]).err(),
            Some(AmlError::IllegalArguments)
        );
        assert!(SdtHeader::read_from_bytes(&t[..10]).is_none());
    }

    #[test]
    fn fadt_fields() {
        let mut body = vec![0u8; 116 - SdtHeader::SIZE];
        let at = |off: usize| off - SdtHeader::SIZE;
        body[at(46)..at(46) + 2].copy_from_slice(&9u16.to_le_bytes());
        body[at(48)..at(48) + 4].copy_from_slice(&0xB2u32.to_le_bytes());
        body[at(52)] = 0xA0;
        body[at(53)] = 0xA1;
        body[at(56)..at(56) + 4].copy_from_slice(&0x600u32.to_le_bytes());
        body[at(64)..at(64) + 4].copy_from_slice(&0x604u32.to_le_bytes());
        body[at(88)] = 4;
        let t = table(b"FACP", 1, &body);

        let fadt = Fadt::parse(&t).unwrap();
        assert_eq!(fadt.sci_interrupt, 9);
        assert_eq!(fadt.smi_command, 0xB2);
        assert_eq!(fadt.acpi_enable, 0xA0);
        assert_eq!(fadt.acpi_disable, 0xA1);
        assert_eq!(fadt.pm1a_event_block, 0x600);
        assert_eq!(fadt.pm1a_control_block, 0x604);
        assert_eq!(fadt.pm1b_control_block, 0);
        assert_eq!(fadt.pm1_event_length, 4);
        assert!(!fadt.is_hardware_reduced());
    }

    #[test]
    fn fadt_wrong_signature() {
        let t = table(b"APIC", 1, &[0; 8]);
        assert_eq!(Fadt::parse(&t), Err(AmlError::IllegalArguments));
    }
}
