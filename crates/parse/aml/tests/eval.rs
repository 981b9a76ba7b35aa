//! Evaluator behaviour over assembled AML.

#![allow(missing_docs)]

mod support;

use hadron_aml::{AmlError, AmlValue, Config, Host, eval_largs};
use support::*;

/// `Return(Add(2, 3))`
fn add_2_3() -> Vec<u8> {
    ret(&[vec![0x72], int(2), int(3), vec![0x00]].concat())
}

// ── Basic evaluation ──────────────────────────────────────────────────

#[test]
fn returns_computed_integer() {
    let mut aml = load(&method("MAIN", 0, &add_2_3()));
    assert_eq!(aml.eval_path(None, "\\MAIN", &[]), Ok(AmlValue::Integer(5)));
}

#[test]
fn tracing_does_not_change_results() {
    let mut aml = load(&method("MAIN", 0, &add_2_3()));
    aml.enable_tracing(true);
    assert_eq!(aml.eval_path(None, "\\MAIN", &[]), Ok(AmlValue::Integer(5)));
    aml.enable_tracing(false);
    assert_eq!(aml.eval_path(None, "\\MAIN", &[]), Ok(AmlValue::Integer(5)));
}

#[test]
fn method_without_return_yields_zero() {
    let mut aml = load(&method("NOP_", 0, &[0xA3]));
    assert_eq!(aml.eval_path(None, "\\NOP_", &[]), Ok(AmlValue::Integer(0)));
}

#[test]
fn names_evaluate_to_their_value() {
    let mut aml = load(&name("VERS", &string("1.0")));
    assert_eq!(aml.eval_path(None, "VERS", &[]), Ok(AmlValue::from("1.0")));
}

#[test]
fn arguments_and_locals() {
    // Store(Add(Arg0, Arg1), Local0); Return(Multiply(Local0, 2))
    let body = [
        vec![0x70, 0x72],
        arg(0),
        arg(1),
        vec![0x00],
        local(0),
        ret(&[vec![0x77], local(0), int(2), vec![0x00]].concat()),
    ]
    .concat();
    let mut aml = load(&method("MULA", 2, &body));
    let node = aml.namespace().resolve_path(None, "\\MULA").unwrap();
    assert_eq!(eval_largs!(aml, node, 3u64, 4u64), Ok(AmlValue::Integer(14)));
}

#[test]
fn too_many_arguments_are_rejected() {
    let mut aml = load(&method("MAIN", 0, &add_2_3()));
    let args = vec![AmlValue::Integer(0); 8];
    assert_eq!(
        aml.eval_path(None, "\\MAIN", &args),
        Err(AmlError::IllegalArguments)
    );
}

#[test]
fn revision_one_tables_use_32bit_integers() {
    let dsdt = table(b"DSDT", 1, &method("ONES", 0, &ret(&[0xFF])));
    let mut aml = hadron_aml::Interpreter::new(MockHost::default(), Config::default());
    aml.load_table(&dsdt).unwrap();
    assert!(aml.is_32bit());
    assert_eq!(
        aml.eval_path(None, "\\ONES", &[]),
        Ok(AmlValue::Integer(0xFFFF_FFFF))
    );
}

// ── Control flow ──────────────────────────────────────────────────────

#[test]
fn while_with_break() {
    // Store(0, Local0)
    // While(One) { Increment(Local0); If(LEqual(Local0, 5)) { Break } }
    // Return(Local0)
    let body = [
        vec![0x70, 0x00],
        local(0),
        while_(
            &[0x01],
            &[
                [vec![0x75], local(0)].concat(),
                if_(&[vec![0x93], local(0), int(5)].concat(), &[0xA5]),
            ]
            .concat(),
        ),
        ret(&local(0)),
    ]
    .concat();
    let mut aml = load(&method("LOOP", 0, &body));
    assert_eq!(aml.eval_path(None, "\\LOOP", &[]), Ok(AmlValue::Integer(5)));
}

#[test]
fn runaway_loop_is_stopped() {
    let body = while_(&[0x01], &[0xA3]);
    let mut aml = load_with(
        &method("SPIN", 0, &body),
        Config::default().with_loop_limit(100),
    );
    assert_eq!(
        aml.eval_path(None, "\\SPIN", &[]),
        Err(AmlError::ExecutionFailure)
    );
}

#[test]
fn if_else_branches() {
    // If(LGreater(Arg0, 10)) { Return("big") } Else { Return("small") }
    let body = [
        if_(&[vec![0x94], arg(0), int(10)].concat(), &ret(&string("big"))),
        else_(&ret(&string("small"))),
    ]
    .concat();
    let mut aml = load(&method("SIZE", 1, &body));
    assert_eq!(
        aml.eval_path(None, "\\SIZE", &[AmlValue::Integer(20)]),
        Ok(AmlValue::from("big"))
    );
    assert_eq!(
        aml.eval_path(None, "\\SIZE", &[AmlValue::Integer(3)]),
        Ok(AmlValue::from("small"))
    );
}

#[test]
fn nested_method_calls() {
    // TWO_() returns 2; MAIN() returns Add(TWO_(), TWO_())
    let aml_bytes = [
        method("TWO_", 0, &ret(&int(2))),
        method(
            "MAIN",
            0,
            &ret(&[vec![0x72], ns("TWO_"), ns("TWO_"), vec![0x00]].concat()),
        ),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    assert_eq!(aml.eval_path(None, "\\MAIN", &[]), Ok(AmlValue::Integer(4)));
}

#[test]
fn unbounded_recursion_hits_the_call_depth_limit() {
    // Method(RECU) { Return(RECU()) }
    let mut aml = load_with(
        &method("RECU", 0, &ret(&ns("RECU"))),
        Config::default().with_max_call_depth(16),
    );
    assert_eq!(
        aml.eval_path(None, "\\RECU", &[]),
        Err(AmlError::ExecutionFailure)
    );
}

// ── Data objects ──────────────────────────────────────────────────────

#[test]
fn package_indexing() {
    let pkg = package(&[int(1), string("two"), buffer(&[3])]);
    // Return(DerefOf(Index(PKG_, Arg0)))
    let body = ret(&[vec![0x83, 0x88], ns("PKG_"), arg(0), vec![0x00]].concat());
    let aml_bytes = [name("PKG_", &pkg), method("IDX_", 1, &body)].concat();
    let mut aml = load(&aml_bytes);
    assert_eq!(
        aml.eval_path(None, "\\IDX_", &[AmlValue::Integer(1)]),
        Ok(AmlValue::from("two"))
    );
    assert_eq!(
        aml.eval_path(None, "\\IDX_", &[AmlValue::Integer(3)]),
        Err(AmlError::OutOfBounds)
    );

    let value = aml.eval_path(None, "\\PKG_", &[]).unwrap();
    assert_eq!(value.package().unwrap().len(), 3);
    assert_eq!(value.package_element(2), Ok(&AmlValue::Buffer(vec![3])));
}

#[test]
fn store_to_package_element() {
    // Store(0x55, Index(PKG_, 0)); Return(DerefOf(Index(PKG_, 0)))
    let body = [
        vec![0x70],
        int(0x55),
        vec![0x88],
        ns("PKG_"),
        int(0),
        vec![0x00],
        ret(&[vec![0x83, 0x88], ns("PKG_"), int(0), vec![0x00]].concat()),
    ]
    .concat();
    let aml_bytes = [name("PKG_", &package(&[int(1)])), method("SET_", 0, &body)].concat();
    let mut aml = load(&aml_bytes);
    assert_eq!(aml.eval_path(None, "\\SET_", &[]), Ok(AmlValue::Integer(0x55)));
}

#[test]
fn store_converts_to_the_existing_type() {
    // Name(STR_, "old"); Method(SET_) { Store(0x1F, STR_) }
    let body = [vec![0x70], int(0x1F), ns("STR_")].concat();
    let aml_bytes = [name("STR_", &string("old")), method("SET_", 0, &body)].concat();
    let mut aml = load(&aml_bytes);
    aml.eval_path(None, "\\SET_", &[]).unwrap();
    assert_eq!(
        aml.eval_path(None, "\\STR_", &[]),
        Ok(AmlValue::from("000000000000001F"))
    );
}

#[test]
fn buffer_fields_read_their_buffer() {
    // Name(BUF_, Buffer{1, 2, 3, 4}); CreateWordField(BUF_, 1, WRD_)
    let aml_bytes = [
        name("BUF_", &buffer(&[1, 2, 3, 4])),
        [vec![0x8B], ns("BUF_"), int(1), ns("WRD_")].concat(),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    assert_eq!(
        aml.eval_path(None, "\\WRD_", &[]),
        Ok(AmlValue::Integer(0x0302))
    );
}

#[test]
fn buffer_fields_past_the_end_fail() {
    // CreateDWordField(BUF_, 0x2000000000000000, FLD_): the bit index overflows.
    let dword = [vec![0x8A], ns("BUF_"), int(0x2000_0000_0000_0000), ns("FLD_")].concat();
    // CreateField(BUF_, 8, Ones, FLD_)
    let ones = [vec![0x5B, 0x13], ns("BUF_"), int(8), vec![0xFF], ns("FLD_")].concat();
    // CreateField(BUF_, 24, 16, FLD_): valid to create, but reads beyond the buffer.
    let tail = [vec![0x5B, 0x13], ns("BUF_"), int(24), int(16), ns("FLD_")].concat();
    let aml_bytes = [
        name("BUF_", &buffer(&[1, 2, 3, 4])),
        method("DWD", 0, &[dword, ret(&ns("FLD_"))].concat()),
        method("ONES", 0, &[ones, ret(&ns("FLD_"))].concat()),
        method("TAIL", 0, &[tail, ret(&ns("FLD_"))].concat()),
        method("MAIN", 0, &add_2_3()),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    for path in ["\\DWD", "\\ONES", "\\TAIL"] {
        assert_eq!(aml.eval_path(None, path, &[]), Err(AmlError::OutOfBounds), "{path}");
    }
    assert_eq!(aml.eval_path(None, "\\MAIN", &[]), Ok(AmlValue::Integer(5)));
}

// ── Namespace ─────────────────────────────────────────────────────────

#[test]
fn single_segment_names_search_parent_scopes() {
    let aml_bytes = scope(
        "\\_SB",
        &[
            name("VAL", &int(42)),
            device("DEV0", &method("GET", 0, &ret(&ns("VAL")))),
        ]
        .concat(),
    );
    let mut aml = load(&aml_bytes);
    assert_eq!(
        aml.eval_path(None, "\\_SB.DEV0.GET", &[]),
        Ok(AmlValue::Integer(42))
    );

    let dev = aml.namespace().resolve_path(None, "\\_SB.DEV0").unwrap();
    let found = aml.namespace().resolve_search(Some(dev), "VAL").unwrap();
    assert_eq!(aml.namespace().path_of(found).to_string(), "\\_SB_.VAL_");
    assert_eq!(
        aml.namespace().resolve_path(Some(dev), "VAL"),
        Err(AmlError::NoSuchNode)
    );
}

#[test]
fn method_scoped_names_are_removed() {
    // Method(TMP_) { Name(XX__, 5); Return(XX__) }
    let body = [name("XX", &int(5)), ret(&ns("XX"))].concat();
    let mut aml = load(&method("TMP", 0, &body));
    let before = aml.namespace().len();
    for _ in 0..2 {
        assert_eq!(aml.eval_path(None, "\\TMP", &[]), Ok(AmlValue::Integer(5)));
        assert_eq!(
            aml.namespace().resolve_path(None, "\\TMP.XX"),
            Err(AmlError::NoSuchNode)
        );
    }
    assert_eq!(aml.namespace().len(), before);
}

#[test]
fn truncated_method_fails_without_poisoning_the_interpreter() {
    // Method(BAD_) { Return(Add(2, <missing>
    let aml_bytes = [
        method("BAD", 0, &[0xA4, 0x72, 0x0A, 0x02]),
        method("MAIN", 0, &add_2_3()),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    assert_eq!(
        aml.eval_path(None, "\\BAD", &[]),
        Err(AmlError::ExecutionFailure)
    );
    assert_eq!(aml.eval_path(None, "\\MAIN", &[]), Ok(AmlValue::Integer(5)));
}

#[test]
fn unknown_paths_are_reported() {
    let mut aml = load(&method("MAIN", 0, &add_2_3()));
    assert_eq!(
        aml.eval_path(None, "\\_SB.NONE", &[]),
        Err(AmlError::NoSuchNode)
    );
}

// ── _OSI ──────────────────────────────────────────────────────────────

#[test]
fn osi_answers_known_interfaces() {
    // Method(CHK_, 1) { If(\_OSI(Arg0)) { Return(1) } Return(0) }
    let body = [
        if_(&[ns("\\_OSI"), arg(0)].concat(), &ret(&int(1))),
        ret(&int(0)),
    ]
    .concat();
    let mut aml = load_with(&method("CHK", 1, &body), Config::default().with_osi("Hadron"));
    for (query, expected) in [("Windows 2015", 1), ("Hadron", 1), ("Linux", 0)] {
        assert_eq!(
            aml.eval_path(None, "\\CHK", &[AmlValue::from(query)]),
            Ok(AmlValue::Integer(expected)),
            "{query}"
        );
    }
    assert_eq!(
        aml.eval_path(None, "\\_OSI", &[AmlValue::from("Windows 2015")]),
        Ok(AmlValue::Integer(u64::MAX))
    );
}

#[test]
fn os_name_and_revision_come_from_the_config() {
    let mut aml = load(&[]);
    assert_eq!(
        aml.eval_path(None, "\\_OS", &[]),
        Ok(AmlValue::from("Microsoft Windows NT"))
    );
    assert_eq!(aml.eval_path(None, "\\_REV", &[]), Ok(AmlValue::Integer(2)));

    let config = Config::default().with_os_name("Hadron").with_revision(5);
    let mut aml = load_with(&[], config);
    assert_eq!(aml.eval_path(None, "\\_OS", &[]), Ok(AmlValue::from("Hadron")));
    assert_eq!(aml.eval_path(None, "\\_REV", &[]), Ok(AmlValue::Integer(5)));
}

// ── Operation regions ─────────────────────────────────────────────────

#[test]
fn system_io_field_access() {
    // OperationRegion(DBG_, SystemIO, 0x80, 4)
    // Field(DBG_, ByteAcc, NoLock, Preserve) { P80_, 8, P81_, 4 }
    let aml_bytes = [
        op_region("DBG", 1, 0x80, 4),
        field("DBG", 0x01, &[("P80", 8), ("P81", 4)]),
        method(
            "WR",
            0,
            &[
                [vec![0x70], int(0x5A), ns("P80")].concat(),
                [vec![0x70], int(3), ns("P81")].concat(),
            ]
            .concat(),
        ),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    aml.host().set_port(0x81, 0xF0);

    aml.eval_path(None, "\\WR", &[]).unwrap();
    assert_eq!(aml.host().writes(), [(0x80, 8, 0x5A), (0x81, 8, 0xF3)]);
    assert_eq!(aml.eval_path(None, "\\P81", &[]), Ok(AmlValue::Integer(3)));
}

#[test]
fn word_access_field_spans_units() {
    // Field(REG_, WordAcc, NoLock, WriteAsZeros) { , 4, VAL_, 16 }
    let aml_bytes = [
        op_region("REG", 1, 0x500, 4),
        field("REG", 0x02 | (2 << 5), &[("", 4), ("VAL", 16)]),
        method("WR", 0, &[vec![0x70], int(0xABCD), ns("VAL")].concat()),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    aml.eval_path(None, "\\WR", &[]).unwrap();
    assert_eq!(
        aml.host().writes(),
        [(0x500, 16, 0xBCD0), (0x502, 16, 0x000A)]
    );
}

#[test]
fn accesses_outside_the_region_fail() {
    let aml_bytes = [
        op_region("REG", 1, 0x500, 1),
        field("REG", 0x01, &[("LOW", 8), ("HIGH", 8)]),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    assert_eq!(aml.eval_path(None, "\\LOW", &[]), Ok(AmlValue::Integer(0)));
    assert_eq!(
        aml.eval_path(None, "\\HIGH", &[]),
        Err(AmlError::ExecutionFailure)
    );
}

#[test]
fn system_memory_field_reads_through_the_host() {
    let aml_bytes = [
        op_region("MEM", 0, 0x1000, 8),
        field("MEM", 0x03, &[("DW0", 32)]),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    aml.host().write_memory_bytes(0x1000, &[0x78, 0x56, 0x34, 0x12]);
    assert_eq!(
        aml.eval_path(None, "\\DW0", &[]),
        Ok(AmlValue::Integer(0x1234_5678))
    );
}

#[test]
fn region_at_the_top_of_the_address_space_fails_cleanly() {
    // OperationRegion(REG_, SystemMemory, Ones, 0x10)
    let aml_bytes = [
        op_region("REG", 0, u64::MAX, 0x10),
        field("REG", 0x01, &[("A", 8), ("B", 8)]),
        method("MAIN", 0, &add_2_3()),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    assert_eq!(
        aml.eval_path(None, "\\B", &[]),
        Err(AmlError::ExecutionFailure)
    );
    assert_eq!(aml.eval_path(None, "\\MAIN", &[]), Ok(AmlValue::Integer(5)));
}

#[test]
fn index_field_selects_before_data_access() {
    // IndexField(IDX_, DAT_, ByteAcc, NoLock, Preserve) { , 16, REGA, 8 }
    let aml_bytes = [
        op_region("IDXR", 1, 0x70, 2),
        field("IDXR", 0x01, &[("IDX", 8), ("DAT", 8)]),
        index_field("IDX", "DAT", 0x01, &[("", 16), ("REGA", 8)]),
        method("WR", 0, &[vec![0x70], int(0x99), ns("REGA")].concat()),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    aml.host().set_port(0x71, 0x42);
    assert_eq!(aml.eval_path(None, "\\REGA", &[]), Ok(AmlValue::Integer(0x42)));
    assert_eq!(aml.host().writes(), [(0x70, 8, 2)]);

    aml.eval_path(None, "\\WR", &[]).unwrap();
    let writes = aml.host().writes();
    assert_eq!(writes[writes.len() - 2..], [(0x70, 8, 2), (0x71, 8, 0x99)]);
}

#[test]
fn bank_field_selects_its_bank_first() {
    // BankField(REG_, SEL_, 1, ByteAcc, NoLock, Preserve) { BK1_, 8 }
    let aml_bytes = [
        op_region("BNK", 1, 0x200, 1),
        field("BNK", 0x01, &[("SEL", 8)]),
        op_region("REG", 1, 0x300, 4),
        bank_field("REG", "SEL", 1, 0x01, &[("BK1", 8)]),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    aml.host().set_port(0x300, 0x77);
    assert_eq!(aml.eval_path(None, "\\BK1", &[]), Ok(AmlValue::Integer(0x77)));
    assert_eq!(aml.host().writes(), [(0x200, 8, 1)]);
}

#[test]
fn pci_config_field_addresses_its_device() {
    // Device DEV1 (_ADR 3.1) below a root bridge on bus 2.
    let dev = device(
        "DEV1",
        &[
            name("_ADR", &int(0x0003_0001)),
            op_region("CFG", 2, 0x40, 0x10),
            field("CFG", 0x03, &[("VID", 32)]),
            method("WR", 0, &[vec![0x70], int(0xCAFE_F00D), ns("VID")].concat()),
        ]
        .concat(),
    );
    let aml_bytes = scope(
        "\\_SB",
        &device(
            "PCI0",
            &[name("_HID", &eisa("PNP0A03")), name("_BBN", &int(2)), dev].concat(),
        ),
    );
    let mut aml = load(&aml_bytes);
    aml.host().pci.borrow_mut().insert((0, 2, 3, 1, 0x40), 0x1234_8086);
    assert_eq!(
        aml.eval_path(None, "\\_SB.PCI0.DEV1.VID", &[]),
        Ok(AmlValue::Integer(0x1234_8086))
    );

    aml.eval_path(None, "\\_SB.PCI0.DEV1.WR", &[]).unwrap();
    assert_eq!(
        aml.host().pci.borrow().get(&(0, 2, 3, 1, 0x40)).copied(),
        Some(0xCAFE_F00D)
    );
}

// ── Synchronisation ───────────────────────────────────────────────────

#[test]
fn acquire_times_out_while_the_host_holds_the_mutex() {
    // Mutex(MTX_, 0); Method(ACQ_) { Return(Acquire(MTX_, 10)) }
    let aml_bytes = [
        mutex("MTX", 0),
        method(
            "ACQ",
            0,
            &ret(&[vec![0x5B, 0x23], ns("MTX"), vec![10, 0]].concat()),
        ),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    let mtx = aml.namespace().resolve_path(None, "\\MTX").unwrap();

    aml.acquire_mutex(mtx, 0xFFFF).unwrap();
    let start = aml.host().timer();
    assert_eq!(
        aml.eval_path(None, "\\ACQ", &[]),
        Ok(AmlValue::Integer(u64::MAX))
    );
    assert!(aml.host().timer() - start >= 10 * 10_000);

    aml.release_mutex(mtx).unwrap();
    assert_eq!(aml.eval_path(None, "\\ACQ", &[]), Ok(AmlValue::Integer(0)));
    // The evaluation released what it still held.
    assert_eq!(aml.acquire_mutex(mtx, 0), Ok(()));
    assert_eq!(aml.release_mutex(mtx), Ok(()));
    assert_eq!(aml.release_mutex(mtx), Err(AmlError::IllegalArguments));
}

#[test]
fn events_count_signals() {
    // Event(EVT_)
    let aml_bytes = [vec![0x5B, 0x02], ns("EVT")].concat();
    let mut aml = load(&aml_bytes);
    let evt = aml.namespace().resolve_path(None, "\\EVT").unwrap();

    aml.signal_event(evt).unwrap();
    assert_eq!(aml.wait_event(evt, 0), Ok(()));
    assert_eq!(aml.wait_event(evt, 5), Err(AmlError::Timeout));
}

#[test]
fn notify_reaches_the_host() {
    // Device(DEV_); Method(NTFY) { Notify(DEV_, 0x80) }
    let aml_bytes = [
        device("DEV", &[]),
        method("NTFY", 0, &[vec![0x86], ns("DEV"), int(0x80)].concat()),
    ]
    .concat();
    let mut aml = load(&aml_bytes);
    aml.eval_path(None, "\\NTFY", &[]).unwrap();
    let dev = aml.namespace().resolve_path(None, "\\DEV").unwrap();
    assert_eq!(*aml.host().notifications.borrow(), [(dev, 0x80)]);
}
