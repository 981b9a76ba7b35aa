//! AML opcode constants.
//!
//! Single-byte opcodes are stored as their byte value. Extended opcodes
//! (`ExtOpPrefix` 0x5B followed by a second byte) are stored as
//! `0x5B00 | second`. The three two-byte logical opcodes `LNotEqual`,
//! `LLessEqual` and `LGreaterEqual` (`LNot` followed by a comparison) are
//! stored as `0x9200 | second`.

// ─── Data objects ───────────────────────────────────────────────────────────

pub(crate) const ZERO_OP: u16 = 0x00;
pub(crate) const ONE_OP: u16 = 0x01;
pub(crate) const ALIAS_OP: u16 = 0x06;
pub(crate) const NAME_OP: u16 = 0x08;
pub(crate) const BYTE_PREFIX: u16 = 0x0A;
pub(crate) const WORD_PREFIX: u16 = 0x0B;
pub(crate) const DWORD_PREFIX: u16 = 0x0C;
pub(crate) const STRING_PREFIX: u16 = 0x0D;
pub(crate) const QWORD_PREFIX: u16 = 0x0E;
pub(crate) const SCOPE_OP: u16 = 0x10;
pub(crate) const BUFFER_OP: u16 = 0x11;
pub(crate) const PACKAGE_OP: u16 = 0x12;
pub(crate) const VAR_PACKAGE_OP: u16 = 0x13;
pub(crate) const METHOD_OP: u16 = 0x14;
pub(crate) const EXTERNAL_OP: u16 = 0x15;
pub(crate) const ONES_OP: u16 = 0xFF;

// ─── Locals, arguments and Type2 opcodes ───────────────────────────────────

pub(crate) const LOCAL0_OP: u16 = 0x60;
pub(crate) const LOCAL7_OP: u16 = 0x67;
pub(crate) const ARG0_OP: u16 = 0x68;
pub(crate) const ARG6_OP: u16 = 0x6E;
pub(crate) const STORE_OP: u16 = 0x70;
pub(crate) const REF_OF_OP: u16 = 0x71;
pub(crate) const ADD_OP: u16 = 0x72;
pub(crate) const CONCAT_OP: u16 = 0x73;
pub(crate) const SUBTRACT_OP: u16 = 0x74;
pub(crate) const INCREMENT_OP: u16 = 0x75;
pub(crate) const DECREMENT_OP: u16 = 0x76;
pub(crate) const MULTIPLY_OP: u16 = 0x77;
pub(crate) const DIVIDE_OP: u16 = 0x78;
pub(crate) const SHIFT_LEFT_OP: u16 = 0x79;
pub(crate) const SHIFT_RIGHT_OP: u16 = 0x7A;
pub(crate) const AND_OP: u16 = 0x7B;
pub(crate) const NAND_OP: u16 = 0x7C;
pub(crate) const OR_OP: u16 = 0x7D;
pub(crate) const NOR_OP: u16 = 0x7E;
pub(crate) const XOR_OP: u16 = 0x7F;
pub(crate) const NOT_OP: u16 = 0x80;
pub(crate) const FIND_SET_LEFT_BIT_OP: u16 = 0x81;
pub(crate) const FIND_SET_RIGHT_BIT_OP: u16 = 0x82;
pub(crate) const DEREF_OF_OP: u16 = 0x83;
pub(crate) const CONCAT_RES_OP: u16 = 0x84;
pub(crate) const MOD_OP: u16 = 0x85;
pub(crate) const NOTIFY_OP: u16 = 0x86;
pub(crate) const SIZE_OF_OP: u16 = 0x87;
pub(crate) const INDEX_OP: u16 = 0x88;
pub(crate) const MATCH_OP: u16 = 0x89;
pub(crate) const CREATE_DWORD_FIELD_OP: u16 = 0x8A;
pub(crate) const CREATE_WORD_FIELD_OP: u16 = 0x8B;
pub(crate) const CREATE_BYTE_FIELD_OP: u16 = 0x8C;
pub(crate) const CREATE_BIT_FIELD_OP: u16 = 0x8D;
pub(crate) const OBJECT_TYPE_OP: u16 = 0x8E;
pub(crate) const CREATE_QWORD_FIELD_OP: u16 = 0x8F;
pub(crate) const LAND_OP: u16 = 0x90;
pub(crate) const LOR_OP: u16 = 0x91;
pub(crate) const LNOT_OP: u16 = 0x92;
pub(crate) const LEQUAL_OP: u16 = 0x93;
pub(crate) const LGREATER_OP: u16 = 0x94;
pub(crate) const LLESS_OP: u16 = 0x95;
pub(crate) const LNOT_EQUAL_OP: u16 = 0x9293;
pub(crate) const LLESS_EQUAL_OP: u16 = 0x9294;
pub(crate) const LGREATER_EQUAL_OP: u16 = 0x9295;
pub(crate) const TO_BUFFER_OP: u16 = 0x96;
pub(crate) const TO_DECIMAL_STRING_OP: u16 = 0x97;
pub(crate) const TO_HEX_STRING_OP: u16 = 0x98;
pub(crate) const TO_INTEGER_OP: u16 = 0x99;
pub(crate) const TO_STRING_OP: u16 = 0x9C;
pub(crate) const COPY_OBJECT_OP: u16 = 0x9D;
pub(crate) const MID_OP: u16 = 0x9E;
pub(crate) const CONTINUE_OP: u16 = 0x9F;

// ─── Type1 (statements) ────────────────────────────────────────────────────

pub(crate) const IF_OP: u16 = 0xA0;
pub(crate) const ELSE_OP: u16 = 0xA1;
pub(crate) const WHILE_OP: u16 = 0xA2;
pub(crate) const NOOP_OP: u16 = 0xA3;
pub(crate) const RETURN_OP: u16 = 0xA4;
pub(crate) const BREAK_OP: u16 = 0xA5;
pub(crate) const BREAK_POINT_OP: u16 = 0xCC;

// ─── Extended opcodes (0x5B prefix) ────────────────────────────────────────

pub(crate) const EXT_OP_PREFIX: u8 = 0x5B;
pub(crate) const MUTEX_OP: u16 = 0x5B01;
pub(crate) const EVENT_OP: u16 = 0x5B02;
pub(crate) const COND_REF_OF_OP: u16 = 0x5B12;
pub(crate) const CREATE_FIELD_OP: u16 = 0x5B13;
pub(crate) const LOAD_TABLE_OP: u16 = 0x5B1F;
pub(crate) const LOAD_OP: u16 = 0x5B20;
pub(crate) const STALL_OP: u16 = 0x5B21;
pub(crate) const SLEEP_OP: u16 = 0x5B22;
pub(crate) const ACQUIRE_OP: u16 = 0x5B23;
pub(crate) const SIGNAL_OP: u16 = 0x5B24;
pub(crate) const WAIT_OP: u16 = 0x5B25;
pub(crate) const RESET_OP: u16 = 0x5B26;
pub(crate) const RELEASE_OP: u16 = 0x5B27;
pub(crate) const FROM_BCD_OP: u16 = 0x5B28;
pub(crate) const TO_BCD_OP: u16 = 0x5B29;
pub(crate) const UNLOAD_OP: u16 = 0x5B2A;
pub(crate) const REVISION_OP: u16 = 0x5B30;
pub(crate) const DEBUG_OP: u16 = 0x5B31;
pub(crate) const FATAL_OP: u16 = 0x5B32;
pub(crate) const TIMER_OP: u16 = 0x5B33;
pub(crate) const OP_REGION_OP: u16 = 0x5B80;
pub(crate) const FIELD_OP: u16 = 0x5B81;
pub(crate) const DEVICE_OP: u16 = 0x5B82;
pub(crate) const PROCESSOR_OP: u16 = 0x5B83;
pub(crate) const POWER_RES_OP: u16 = 0x5B84;
pub(crate) const THERMAL_ZONE_OP: u16 = 0x5B85;
pub(crate) const INDEX_FIELD_OP: u16 = 0x5B86;
pub(crate) const BANK_FIELD_OP: u16 = 0x5B87;
pub(crate) const DATA_REGION_OP: u16 = 0x5B88;

// ─── Field list elements ───────────────────────────────────────────────────

pub(crate) const RESERVED_FIELD: u8 = 0x00;
pub(crate) const ACCESS_FIELD: u8 = 0x01;
pub(crate) const CONNECT_FIELD: u8 = 0x02;
pub(crate) const EXTENDED_ACCESS_FIELD: u8 = 0x03;

/// Human-readable opcode name for tracing and diagnostics.
pub(crate) fn name(op: u16) -> &'static str {
    match op {
        ZERO_OP => "Zero",
        ONE_OP => "One",
        ALIAS_OP => "Alias",
        NAME_OP => "Name",
        BYTE_PREFIX => "BytePrefix",
        WORD_PREFIX => "WordPrefix",
        DWORD_PREFIX => "DWordPrefix",
        STRING_PREFIX => "StringPrefix",
        QWORD_PREFIX => "QWordPrefix",
        SCOPE_OP => "Scope",
        BUFFER_OP => "Buffer",
        PACKAGE_OP => "Package",
        VAR_PACKAGE_OP => "VarPackage",
        METHOD_OP => "Method",
        EXTERNAL_OP => "External",
        ONES_OP => "Ones",
        LOCAL0_OP..=LOCAL7_OP => "LocalX",
        ARG0_OP..=ARG6_OP => "ArgX",
        STORE_OP => "Store",
        REF_OF_OP => "RefOf",
        ADD_OP => "Add",
        CONCAT_OP => "Concatenate",
        SUBTRACT_OP => "Subtract",
        INCREMENT_OP => "Increment",
        DECREMENT_OP => "Decrement",
        MULTIPLY_OP => "Multiply",
        DIVIDE_OP => "Divide",
        SHIFT_LEFT_OP => "ShiftLeft",
        SHIFT_RIGHT_OP => "ShiftRight",
        AND_OP => "And",
        NAND_OP => "NAnd",
        OR_OP => "Or",
        NOR_OP => "NOr",
        XOR_OP => "XOr",
        NOT_OP => "Not",
        FIND_SET_LEFT_BIT_OP => "FindSetLeftBit",
        FIND_SET_RIGHT_BIT_OP => "FindSetRightBit",
        DEREF_OF_OP => "DerefOf",
        CONCAT_RES_OP => "ConcatenateResTemplate",
        MOD_OP => "Mod",
        NOTIFY_OP => "Notify",
        SIZE_OF_OP => "SizeOf",
        INDEX_OP => "Index",
        MATCH_OP => "Match",
        CREATE_DWORD_FIELD_OP => "CreateDWordField",
        CREATE_WORD_FIELD_OP => "CreateWordField",
        CREATE_BYTE_FIELD_OP => "CreateByteField",
        CREATE_BIT_FIELD_OP => "CreateBitField",
        OBJECT_TYPE_OP => "ObjectType",
        CREATE_QWORD_FIELD_OP => "CreateQWordField",
        LAND_OP => "LAnd",
        LOR_OP => "LOr",
        LNOT_OP => "LNot",
        LEQUAL_OP => "LEqual",
        LGREATER_OP => "LGreater",
        LLESS_OP => "LLess",
        LNOT_EQUAL_OP => "LNotEqual",
        LLESS_EQUAL_OP => "LLessEqual",
        LGREATER_EQUAL_OP => "LGreaterEqual",
        TO_BUFFER_OP => "ToBuffer",
        TO_DECIMAL_STRING_OP => "ToDecimalString",
        TO_HEX_STRING_OP => "ToHexString",
        TO_INTEGER_OP => "ToInteger",
        TO_STRING_OP => "ToString",
        COPY_OBJECT_OP => "CopyObject",
        MID_OP => "Mid",
        CONTINUE_OP => "Continue",
        IF_OP => "If",
        ELSE_OP => "Else",
        WHILE_OP => "While",
        NOOP_OP => "Noop",
        RETURN_OP => "Return",
        BREAK_OP => "Break",
        BREAK_POINT_OP => "BreakPoint",
        MUTEX_OP => "Mutex",
        EVENT_OP => "Event",
        COND_REF_OF_OP => "CondRefOf",
        CREATE_FIELD_OP => "CreateField",
        LOAD_TABLE_OP => "LoadTable",
        LOAD_OP => "Load",
        STALL_OP => "Stall",
        SLEEP_OP => "Sleep",
        ACQUIRE_OP => "Acquire",
        SIGNAL_OP => "Signal",
        WAIT_OP => "Wait",
        RESET_OP => "Reset",
        RELEASE_OP => "Release",
        FROM_BCD_OP => "FromBCD",
        TO_BCD_OP => "ToBCD",
        UNLOAD_OP => "Unload",
        REVISION_OP => "Revision",
        DEBUG_OP => "Debug",
        FATAL_OP => "Fatal",
        TIMER_OP => "Timer",
        OP_REGION_OP => "OperationRegion",
        FIELD_OP => "Field",
        DEVICE_OP => "Device",
        PROCESSOR_OP => "Processor",
        POWER_RES_OP => "PowerResource",
        THERMAL_ZONE_OP => "ThermalZone",
        INDEX_FIELD_OP => "IndexField",
        BANK_FIELD_OP => "BankField",
        DATA_REGION_OP => "DataRegion",
        _ => "<unknown>",
    }
}
