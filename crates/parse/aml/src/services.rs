//! Kernel-facing services built on the evaluator.
//!
//! These wrap the evaluations and fixed-hardware register accesses a
//! kernel performs around ACPI: switching into ACPI mode, entering sleep
//! states, routing PCI interrupts, latching SCI events and running device
//! initialisation.

use alloc::format;
use alloc::vec::Vec;
use core::sync::atomic::Ordering;

use crate::AmlError;
use crate::host::Host;
use crate::interp::Interpreter;
use crate::namespace::{NodeId, NodeKind};
use crate::object::{AmlValue, EisaId, to_integer};
use crate::resource::AcpiResource;
use crate::table::{Fadt, Pm1Control, Pm1Event};

/// Polls of `SCI_EN` before a mode switch is reported as timed out.
const MODE_SWITCH_POLLS: usize = 100;
/// Delay between `SCI_EN` polls, in milliseconds.
const MODE_SWITCH_POLL_MS: u64 = 10;

/// `_STA` value assumed when a device has none.
const STA_DEFAULT: u64 = 0x0F;
/// `_STA`: the device is present.
const STA_PRESENT: u64 = 1 << 0;
/// `_STA`: the device is functioning.
const STA_FUNCTIONING: u64 = 1 << 3;

/// PnP IDs of PCI and PCI Express root bridges.
const ROOT_BRIDGE_IDS: [&str; 2] = ["PNP0A03", "PNP0A08"];

/// Interrupt model reported to firmware through `\_PIC`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PicMode {
    /// Legacy 8259 PIC.
    Pic = 0,
    /// I/O APIC.
    Apic = 1,
    /// I/O SAPIC.
    Sapic = 2,
}

/// Routing of a PCI interrupt pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IrqRoute {
    /// Global System Interrupt the pin is wired to.
    pub gsi: u32,
    /// Edge-triggered (vs level-triggered).
    pub edge_triggered: bool,
    /// Active-low (vs active-high).
    pub active_low: bool,
    /// The interrupt may be shared.
    pub shared: bool,
}

/// Returns `true` if an `_HID`/`_CID` value names the identifier `id`.
///
/// Either side may be a packed EISA integer or a string; a string that is
/// a valid EISA ID matches its packed form.
fn id_matches(value: &AmlValue, id: &AmlValue) -> bool {
    match (value, id) {
        (AmlValue::Integer(a), AmlValue::Integer(b)) => a == b,
        (AmlValue::String(a), AmlValue::String(b)) => a == b,
        (AmlValue::String(s), AmlValue::Integer(raw))
        | (AmlValue::Integer(raw), AmlValue::String(s)) => {
            EisaId::encode(s).is_some_and(|e| u64::from(e.raw) == *raw)
        }
        _ => false,
    }
}

fn read_pm1(host: &impl Host, port: u32) -> Pm1Control {
    Pm1Control::from_bits_retain(host.read_io(port as u16, 16) as u16)
}

impl<H: Host> Interpreter<H> {
    fn fadt(&self) -> Result<Fadt, AmlError> {
        self.config.fadt.ok_or_else(|| {
            log::warn!("aml: no FADT configured");
            AmlError::IllegalArguments
        })
    }

    /// Evaluates the absolute `path` with `args` if it exists.
    fn eval_optional(&mut self, path: &str, args: &[AmlValue]) -> Result<Option<AmlValue>, AmlError> {
        match self.namespace.resolve_path(None, path) {
            Ok(node) => self.eval_args(node, args).map(Some),
            Err(AmlError::NoSuchNode) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Polls PM1a control until `SCI_EN` equals `enabled`.
    fn wait_sci_en(&self, fadt: &Fadt, enabled: bool) -> Result<(), AmlError> {
        for _ in 0..MODE_SWITCH_POLLS {
            if read_pm1(&self.host, fadt.pm1a_control_block).contains(Pm1Control::SCI_EN) == enabled {
                return Ok(());
            }
            self.host.sleep(MODE_SWITCH_POLL_MS);
        }
        log::error!("aml: SCI_EN did not become {enabled}");
        Err(AmlError::Timeout)
    }

    // ─── ACPI mode ─────────────────────────────────────────────────────────

    /// Switches the platform into ACPI mode.
    ///
    /// Reports `mode` to firmware through `\_PIC` (if defined), asks the
    /// SMI handler to set `SCI_EN` unless it already is, and enables the
    /// power and sleep button events.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] without a configured FADT,
    /// [`AmlError::Timeout`] if `SCI_EN` never sets, or any error from
    /// `\_PIC`.
    pub fn enable_acpi(&mut self, mode: PicMode) -> Result<(), AmlError> {
        self.eval_optional("\\_PIC", &[AmlValue::Integer(mode as u64)])?;

        let fadt = self.fadt()?;
        if fadt.is_hardware_reduced() {
            log::debug!("aml: hardware-reduced platform, no mode switch");
            return Ok(());
        }

        if read_pm1(&self.host, fadt.pm1a_control_block).contains(Pm1Control::SCI_EN) {
            log::debug!("aml: already in ACPI mode");
        } else if fadt.smi_command == 0 || fadt.acpi_enable == 0 {
            log::warn!("aml: SCI_EN clear but firmware offers no mode switch");
        } else {
            self.host
                .write_io(fadt.smi_command as u16, 8, u64::from(fadt.acpi_enable));
            self.wait_sci_en(&fadt, true)?;
        }

        let buttons = (Pm1Event::PWRBTN | Pm1Event::SLPBTN).bits();
        let half = u32::from(fadt.pm1_event_length / 2);
        for block in [fadt.pm1a_event_block, fadt.pm1b_event_block] {
            if block == 0 {
                continue;
            }
            let port = (block + half) as u16;
            let enable = self.host.read_io(port, 16) as u16;
            self.host.write_io(port, 16, u64::from(enable | buttons));
        }

        log::info!("aml: ACPI mode enabled ({mode:?})");
        Ok(())
    }

    /// Hands the platform back to legacy (SMM) mode.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] without a configured FADT or
    /// on platforms with no mode switch, and [`AmlError::Timeout`] if
    /// `SCI_EN` never clears.
    pub fn disable_acpi(&mut self) -> Result<(), AmlError> {
        let fadt = self.fadt()?;
        if fadt.is_hardware_reduced() || fadt.smi_command == 0 {
            return Err(AmlError::IllegalArguments);
        }
        self.host
            .write_io(fadt.smi_command as u16, 8, u64::from(fadt.acpi_disable));
        self.wait_sci_en(&fadt, false)?;
        log::info!("aml: ACPI mode disabled");
        Ok(())
    }

    // ─── Sleep states ──────────────────────────────────────────────────────

    /// Enters sleep state `S<state>` (1-5).
    ///
    /// Runs `\_PTS` and `\_GTS` if defined, then programs `SLP_TYP` from
    /// `\_Sx` and sets `SLP_EN` in PM1a (and PM1b) control. For S5 the
    /// call normally never returns on real hardware.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] for a state outside 1-5 or
    /// without a configured FADT, [`AmlError::NoSuchNode`] if firmware does
    /// not support the state, and [`AmlError::UnexpectedResult`] for a
    /// malformed `\_Sx` package.
    pub fn enter_sleep(&mut self, state: u8) -> Result<(), AmlError> {
        if !(1..=5).contains(&state) {
            return Err(AmlError::IllegalArguments);
        }
        let fadt = self.fadt()?;

        let package = self
            .eval_path(None, &format!("\\_S{state}_"), &[])?;
        let elements = package.package().map_err(|_| AmlError::UnexpectedResult)?;
        let typ = |i: usize| -> Result<u16, AmlError> {
            let v = elements.get(i).ok_or(AmlError::UnexpectedResult)?;
            Ok(to_integer(v, self.width).map_err(|_| AmlError::UnexpectedResult)? as u16)
        };
        let (slp_typ_a, slp_typ_b) = if elements.len() == 1 {
            // Some firmware packs both values into one integer.
            let v = typ(0)?;
            (v & 0xFF, v >> 8)
        } else {
            (typ(0)?, typ(1)?)
        };

        let arg = [AmlValue::Integer(u64::from(state))];
        self.eval_optional("\\_PTS", &arg)?;
        self.eval_optional("\\_GTS", &arg)?;

        log::info!("aml: entering S{state} (SLP_TYPa={slp_typ_a:#x}, SLP_TYPb={slp_typ_b:#x})");
        for (block, slp_typ) in [
            (fadt.pm1a_control_block, slp_typ_a),
            (fadt.pm1b_control_block, slp_typ_b),
        ] {
            if block == 0 {
                continue;
            }
            let port = block as u16;
            let mut cnt = read_pm1(&self.host, block);
            cnt.remove(Pm1Control::SLP_TYP | Pm1Control::SLP_EN);
            cnt |= Pm1Control::from_bits_retain((slp_typ & 0x7) << Pm1Control::SLP_TYP_SHIFT);
            self.host.write_io(port, 16, u64::from(cnt.bits()));
            cnt |= Pm1Control::SLP_EN;
            self.host.write_io(port, 16, u64::from(cnt.bits()));
        }
        Ok(())
    }

    /// Runs `\_WAK` after resuming from `S<state>`.
    ///
    /// # Errors
    ///
    /// Returns any error from `\_WAK`.
    pub fn leave_sleep(&mut self, state: u8) -> Result<(), AmlError> {
        self.eval_optional("\\_WAK", &[AmlValue::Integer(u64::from(state))])?;
        log::info!("aml: resumed from S{state}");
        Ok(())
    }

    // ─── SCI events ────────────────────────────────────────────────────────

    /// Latches `event` as the most recent SCI event.
    pub fn set_sci_event(&self, event: u16) {
        self.sci_event.store(event, Ordering::Release);
    }

    /// The most recently latched SCI event bits.
    #[must_use]
    pub fn sci_event(&self) -> u16 {
        self.sci_event.load(Ordering::Acquire)
    }

    /// Reads and acknowledges the PM1 status registers, latching and
    /// returning the combined status bits.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::IllegalArguments`] without a configured FADT.
    pub fn poll_sci_event(&self) -> Result<u16, AmlError> {
        let fadt = self.fadt()?;
        let mut event = 0;
        for block in [fadt.pm1a_event_block, fadt.pm1b_event_block] {
            if block == 0 {
                continue;
            }
            let status = self.host.read_io(block as u16, 16) as u16;
            if status != 0 {
                // Status bits are write-one-to-clear.
                self.host.write_io(block as u16, 16, u64::from(status));
            }
            event |= status;
        }
        self.set_sci_event(event);
        Ok(event)
    }

    // ─── Devices ───────────────────────────────────────────────────────────

    /// Returns `true` if the device's `_HID` or `_CID` names `id`.
    ///
    /// `id` is compared against integer (EISA) and string identifiers
    /// alike; `_CID` may be a package of identifiers.
    ///
    /// # Errors
    ///
    /// Returns any error from evaluating `_HID` or `_CID`.
    pub fn check_device_pnp_id(&mut self, node: NodeId, id: &str) -> Result<bool, AmlError> {
        self.check_device_id(node, &AmlValue::from(id))
    }

    /// Like [`check_device_pnp_id`](Self::check_device_pnp_id), for an
    /// identifier already held as an AML value (a packed EISA integer or
    /// a string).
    ///
    /// # Errors
    ///
    /// Returns any error from evaluating `_HID` or `_CID`.
    pub fn check_device_id(&mut self, node: NodeId, id: &AmlValue) -> Result<bool, AmlError> {
        if self
            .eval_child(node, "_HID", &[])?
            .is_some_and(|hid| id_matches(&hid, id))
        {
            return Ok(true);
        }
        Ok(match self.eval_child(node, "_CID", &[])? {
            Some(AmlValue::Package(cids)) => cids.iter().any(|cid| id_matches(cid, id)),
            Some(cid) => id_matches(&cid, id),
            None => false,
        })
    }

    /// Returns every device whose `_HID` or `_CID` names `id`, in
    /// namespace creation order.
    ///
    /// Devices whose identification methods fail are logged and skipped.
    pub fn find_devices(&mut self, id: &str) -> Vec<NodeId> {
        let id = AmlValue::from(id);
        let mut found = Vec::new();
        for device in self.all_devices() {
            match self.check_device_id(device, &id) {
                Ok(true) => found.push(device),
                Ok(false) => {}
                Err(err) => self.warn_device(device, "_HID/_CID", err),
            }
        }
        found
    }

    fn all_devices(&self) -> Vec<NodeId> {
        self.namespace
            .iter()
            .filter(|&n| self.namespace.node(n).is_ok_and(|node| node.is_device()))
            .collect()
    }

    fn warn_device(&self, device: NodeId, what: &str, err: AmlError) {
        log::warn!("aml: {}.{what} failed: {err}", self.namespace.path_of(device));
    }

    /// Returns `true` if `node` is a PCI or PCI Express root bridge.
    pub(crate) fn is_root_bridge(&mut self, node: NodeId) -> Result<bool, AmlError> {
        if !self.namespace.node(node)?.is_device() {
            return Ok(false);
        }
        for id in ROOT_BRIDGE_IDS {
            if self.check_device_pnp_id(node, id)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Runs `\_SB._INI` and then `_INI` of every present device below
    /// `\_SB`.
    ///
    /// `_STA` defaults to 0x0F. Children are only visited when their parent
    /// is present or functioning. Failures of individual `_STA`/`_INI`
    /// methods are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NoSuchNode`] if `\_SB` does not exist.
    pub fn initialize_devices(&mut self) -> Result<(), AmlError> {
        let sb = self.namespace.resolve_path(None, "\\_SB_")?;
        if let Err(err) = self.eval_child(sb, "_INI", &[]) {
            log::warn!("aml: \\_SB._INI failed: {err}");
        }

        let mut pending: Vec<NodeId> = self.device_children(sb);
        pending.reverse();
        let mut initialized = 0usize;
        while let Some(device) = pending.pop() {
            let sta = match self.eval_child_integer(device, "_STA") {
                Ok(sta) => sta.unwrap_or(STA_DEFAULT),
                Err(err) => {
                    log::warn!("aml: {}._STA failed: {err}", self.namespace.path_of(device));
                    continue;
                }
            };
            if sta & STA_PRESENT != 0 {
                match self.eval_child(device, "_INI", &[]) {
                    Ok(Some(_)) => initialized += 1,
                    Ok(None) => {}
                    Err(err) => {
                        log::warn!("aml: {}._INI failed: {err}", self.namespace.path_of(device));
                    }
                }
            }
            if sta & (STA_PRESENT | STA_FUNCTIONING) != 0 {
                pending.extend(self.device_children(device).into_iter().rev());
            }
        }
        log::debug!("aml: ran _INI on {initialized} devices");
        Ok(())
    }

    fn device_children(&self, node: NodeId) -> Vec<NodeId> {
        self.namespace
            .children(node)
            .filter(|&c| self.namespace.node(c).is_ok_and(|n| n.is_device()))
            .collect()
    }

    // ─── PCI interrupt routing ─────────────────────────────────────────────

    /// Finds the root bridge of PCI segment `segment`, bus `bus`.
    ///
    /// Devices whose identification or `_SEG`/`_BBN` fail are logged and
    /// skipped.
    fn find_root_bridge(&mut self, segment: u16, bus: u8) -> Result<NodeId, AmlError> {
        for device in self.all_devices() {
            match self.is_root_bridge(device) {
                Ok(true) => {}
                Ok(false) => continue,
                Err(err) => {
                    self.warn_device(device, "_HID/_CID", err);
                    continue;
                }
            }
            match self.bridge_location(device) {
                Ok(location) if location == (u64::from(segment), u64::from(bus)) => {
                    return Ok(device);
                }
                Ok(_) => {}
                Err(err) => self.warn_device(device, "_SEG/_BBN", err),
            }
        }
        Err(AmlError::NoSuchNode)
    }

    /// `(_SEG, _BBN)` of a root bridge, each defaulting to 0.
    fn bridge_location(&mut self, bridge: NodeId) -> Result<(u64, u64), AmlError> {
        let seg = self.eval_child_integer(bridge, "_SEG")?.unwrap_or(0);
        let bbn = self.eval_child_integer(bridge, "_BBN")?.unwrap_or(0);
        Ok((seg, bbn))
    }

    /// Resolves the interrupt of PCI function `seg:bus:slot.function`, pin
    /// `pin` (0 = INTA) through the root bridge's `_PRT`.
    ///
    /// A `_PRT` entry whose source is 0 names the GSI directly; otherwise
    /// the source is a link device whose current `_CRS` interrupt is used.
    ///
    /// # Errors
    ///
    /// Returns [`AmlError::NoSuchNode`] if there is no matching root bridge,
    /// `_PRT` or routing entry, and [`AmlError::UnexpectedResult`] for a
    /// malformed `_PRT` entry or a link device without an interrupt.
    pub fn pci_route_pin(
        &mut self,
        segment: u16,
        bus: u8,
        slot: u8,
        function: u8,
        pin: u8,
    ) -> Result<IrqRoute, AmlError> {
        let bridge = self.find_root_bridge(segment, bus)?;
        let prt = self
            .eval_child(bridge, "_PRT", &[])?
            .ok_or(AmlError::NoSuchNode)?;
        let entries = prt.package().map_err(|_| AmlError::UnexpectedResult)?;

        for entry in entries {
            let fields = entry.package().map_err(|_| AmlError::UnexpectedResult)?;
            let [address, entry_pin, source, index] = fields else {
                log::warn!("aml: _PRT entry with {} elements", fields.len());
                return Err(AmlError::UnexpectedResult);
            };
            let address = to_integer(address, self.width)?;
            let entry_pin = to_integer(entry_pin, self.width)?;
            let function_matches =
                address & 0xFFFF == 0xFFFF || address & 0xFFFF == u64::from(function);
            if (address >> 16) & 0xFFFF != u64::from(slot)
                || !function_matches
                || entry_pin != u64::from(pin)
            {
                continue;
            }

            let link = match source {
                AmlValue::Integer(0) => {
                    let gsi = to_integer(index, self.width)?;
                    return Ok(IrqRoute {
                        gsi: gsi as u32,
                        edge_triggered: false,
                        active_low: true,
                        shared: true,
                    });
                }
                AmlValue::Handle(node) => *node,
                AmlValue::String(path) => self.namespace.resolve_search(Some(bridge), path)?,
                other => {
                    log::warn!("aml: _PRT source {other:?} is not a link device");
                    return Err(AmlError::UnexpectedResult);
                }
            };
            return self.link_route(link);
        }
        log::debug!("aml: no _PRT entry for {segment:04x}:{bus:02x}:{slot:02x}.{function} pin {pin}");
        Err(AmlError::NoSuchNode)
    }

    /// The interrupt currently assigned to a PCI link device.
    fn link_route(&mut self, link: NodeId) -> Result<IrqRoute, AmlError> {
        let link = self.namespace.resolve_alias(link);
        if !matches!(self.namespace.node(link)?.kind(), NodeKind::Device) {
            return Err(AmlError::UnexpectedResult);
        }
        let resources = self.read_resource(link)?;
        resources
            .into_iter()
            .find_map(|r| match r {
                AcpiResource::Irq {
                    irq,
                    edge_triggered,
                    active_low,
                    shared,
                    ..
                } => Some(IrqRoute {
                    gsi: u32::from(irq),
                    edge_triggered,
                    active_low,
                    shared,
                }),
                AcpiResource::ExtendedIrq {
                    gsi,
                    edge_triggered,
                    active_low,
                    shared,
                    ..
                } => Some(IrqRoute {
                    gsi,
                    edge_triggered,
                    active_low,
                    shared,
                }),
                _ => None,
            })
            .ok_or_else(|| {
                log::warn!(
                    "aml: link device {} has no interrupt in _CRS",
                    self.namespace.path_of(link)
                );
                AmlError::UnexpectedResult
            })
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use alloc::string::String;

    use super::*;

    #[test]
    fn pnp_ids_match_both_encodings() {
        let eisa = AmlValue::eisa_id("PNP0A03");
        let string = AmlValue::from("PNP0A03");
        assert!(id_matches(&eisa, &eisa));
        assert!(id_matches(&eisa, &string));
        assert!(id_matches(&string, &eisa));
        assert!(!id_matches(&eisa, &AmlValue::from("PNP0A08")));
        let acpi = AmlValue::String(String::from("ACPI0007"));
        assert!(id_matches(&acpi, &AmlValue::from("ACPI0007")));
        assert!(!id_matches(&acpi, &eisa));
        assert!(!id_matches(&AmlValue::Uninitialized, &string));
    }
}
