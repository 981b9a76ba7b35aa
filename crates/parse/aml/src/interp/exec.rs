//! The evaluator main loop: term parsing and operator execution.

use alloc::boxed::Box;
use alloc::string::ToString;
use alloc::sync::Arc;
use alloc::vec::{IntoIter, Vec};

use super::Interpreter;
use super::ops;
use super::state::{Block, BlockKind, Frame, Item, Mode, Operand, State, Target};
use crate::AmlError;
use crate::host::Host;
use crate::name::AmlName;
use crate::namespace::{
    BufferField, BufferSource, EventObject, FrameSlot, Method, MethodBody, MethodFlags,
    MutexObject, NodeId, NodeKind, OpRegion, RegionSpace,
};
use crate::object::{AmlValue, to_buffer, to_integer};
use crate::opcode::{self, *};
use crate::reader::{AmlReader, starts_name_string};

/// Log target for per-opcode tracing.
pub(crate) const TRACE_TARGET: &str = "hadron_aml::trace";

/// Value of the `Revision` opcode.
const INTERPRETER_REVISION: u64 = 1;

use Mode::{Byte, DWord, Name, Object, OptionalReference, RefOrObject, Reference, Word};

const M_NONE: &[Mode] = &[];
const M_OBJ: &[Mode] = &[Object];
const M_OBJ2: &[Mode] = &[Object, Object];
const M_UNARY: &[Mode] = &[Object, OptionalReference];
const M_BINARY: &[Mode] = &[Object, Object, OptionalReference];
const M_DIVIDE: &[Mode] = &[Object, Object, OptionalReference, OptionalReference];
const M_REF: &[Mode] = &[Reference];
const M_STORE: &[Mode] = &[Object, Reference];
const M_DEREF: &[Mode] = &[RefOrObject];
const M_INDEX: &[Mode] = &[RefOrObject, Object, OptionalReference];
const M_MATCH: &[Mode] = &[Object, Byte, Object, Byte, Object, Object];
const M_MID: &[Mode] = &[Object, Object, Object, OptionalReference];
const M_COND_REF: &[Mode] = &[Name, OptionalReference];
const M_REF_OBJ: &[Mode] = &[Reference, Object];
const M_ACQUIRE: &[Mode] = &[Reference, Word];
const M_FATAL: &[Mode] = &[Byte, DWord, Object];
const M_NAME: &[Mode] = &[Name];
const M_NAME_OBJ: &[Mode] = &[Name, Object];
const M_NAME2: &[Mode] = &[Name, Name];
const M_NAME_BYTE: &[Mode] = &[Name, Byte];
const M_EXTERNAL: &[Mode] = &[Name, Byte, Byte];
const M_PROCESSOR: &[Mode] = &[Name, Byte, DWord, Byte];
const M_POWER_RES: &[Mode] = &[Name, Byte, Word];
const M_OP_REGION: &[Mode] = &[Name, Byte, Object, Object];
const M_INDEX_FIELD: &[Mode] = &[Name, Name, Byte];
const M_BANK_FIELD: &[Mode] = &[Name, Name, Object, Byte];
const M_CREATE_FIXED: &[Mode] = &[RefOrObject, Object, Name];
const M_CREATE_FIELD: &[Mode] = &[RefOrObject, Object, Object, Name];

/// Operand modes of `op` and whether a `PkgLength` follows the opcode.
fn grammar(op: u16) -> Option<(&'static [Mode], bool)> {
    Some(match op {
        NAME_OP => (M_NAME_OBJ, false),
        ALIAS_OP => (M_NAME2, false),
        SCOPE_OP | DEVICE_OP | THERMAL_ZONE_OP => (M_NAME, true),
        METHOD_OP | FIELD_OP => (M_NAME_BYTE, true),
        EXTERNAL_OP => (M_EXTERNAL, false),
        PROCESSOR_OP => (M_PROCESSOR, true),
        POWER_RES_OP => (M_POWER_RES, true),
        MUTEX_OP => (M_NAME_BYTE, false),
        EVENT_OP => (M_NAME, false),
        OP_REGION_OP => (M_OP_REGION, false),
        INDEX_FIELD_OP => (M_INDEX_FIELD, true),
        BANK_FIELD_OP => (M_BANK_FIELD, true),
        CREATE_BIT_FIELD_OP | CREATE_BYTE_FIELD_OP | CREATE_WORD_FIELD_OP
        | CREATE_DWORD_FIELD_OP | CREATE_QWORD_FIELD_OP => (M_CREATE_FIXED, false),
        CREATE_FIELD_OP => (M_CREATE_FIELD, false),
        IF_OP => (M_OBJ, true),
        RETURN_OP | LNOT_OP | SLEEP_OP | STALL_OP => (M_OBJ, false),
        BREAK_OP | CONTINUE_OP | NOOP_OP | BREAK_POINT_OP => (M_NONE, false),
        STORE_OP | COPY_OBJECT_OP => (M_STORE, false),
        ADD_OP | SUBTRACT_OP | MULTIPLY_OP | SHIFT_LEFT_OP | SHIFT_RIGHT_OP | AND_OP | NAND_OP
        | OR_OP | NOR_OP | XOR_OP | MOD_OP | CONCAT_OP | CONCAT_RES_OP | TO_STRING_OP => {
            (M_BINARY, false)
        }
        DIVIDE_OP => (M_DIVIDE, false),
        NOT_OP | FIND_SET_LEFT_BIT_OP | FIND_SET_RIGHT_BIT_OP | TO_BUFFER_OP
        | TO_DECIMAL_STRING_OP | TO_HEX_STRING_OP | TO_INTEGER_OP | TO_BCD_OP | FROM_BCD_OP => {
            (M_UNARY, false)
        }
        INCREMENT_OP | DECREMENT_OP | REF_OF_OP | OBJECT_TYPE_OP | RELEASE_OP | SIGNAL_OP
        | RESET_OP => (M_REF, false),
        DEREF_OF_OP | SIZE_OF_OP => (M_DEREF, false),
        INDEX_OP => (M_INDEX, false),
        MATCH_OP => (M_MATCH, false),
        MID_OP => (M_MID, false),
        COND_REF_OF_OP => (M_COND_REF, false),
        LAND_OP | LOR_OP | LEQUAL_OP | LGREATER_OP | LLESS_OP | LNOT_EQUAL_OP
        | LLESS_EQUAL_OP | LGREATER_EQUAL_OP => (M_OBJ2, false),
        NOTIFY_OP | WAIT_OP => (M_REF_OBJ, false),
        ACQUIRE_OP => (M_ACQUIRE, false),
        FATAL_OP => (M_FATAL, false),
        _ => return None,
    })
}

/// Runs `f` on a reader positioned at the current frame's pc and bounded
/// by the innermost block, then advances the pc past what `f` consumed.
pub(crate) fn read_inline<T>(
    state: &mut State,
    f: impl FnOnce(&mut AmlReader<'_>) -> Result<T, AmlError>,
) -> Result<T, AmlError> {
    let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
    let limit = frame.limit();
    let code = Arc::clone(&frame.code);
    let mut r = AmlReader::at(code.get(..limit).ok_or(AmlError::ExecutionFailure)?, frame.pc);
    let v = f(&mut r)?;
    frame.pc = r.position();
    Ok(v)
}

/// Decodes an opcode (one byte, or two for extended and `LNot` pairs).
fn decode_opcode(r: &mut AmlReader<'_>) -> Result<u16, AmlError> {
    let b = r.read_u8()?;
    match b {
        EXT_OP_PREFIX => Ok(0x5B00 | u16::from(r.read_u8()?)),
        0x92 => match r.peek() {
            Some(next @ 0x93..=0x95) => {
                r.skip(1)?;
                Ok(0x9200 | u16::from(next))
            }
            _ => Ok(LNOT_OP),
        },
        _ => Ok(u16::from(b)),
    }
}

/// Operand mode the innermost item is waiting for, if any.
fn pending_mode(state: &State) -> Option<Mode> {
    let item = state.items.last()?;
    let have = |base: usize| state.operands.len().saturating_sub(base);
    match item {
        Item::Frame { .. } => None,
        Item::Op { modes, base, .. } => modes.get(have(*base)).copied(),
        Item::Loop { base, .. } | Item::Buffer { base, .. } => (have(*base) == 0).then_some(Object),
        Item::Invoke { argc, base, .. } => (have(*base) < *argc).then_some(Object),
        Item::Package {
            end, count, base, ..
        } => match count {
            None => (have(*base) == 0).then_some(Object),
            Some(_) => {
                let pc = state.frame()?.pc;
                (pc < *end).then_some(Mode::PackageElement)
            }
        },
    }
}

fn next_operand(it: &mut IntoIter<Operand>) -> Result<Operand, AmlError> {
    it.next().ok_or(AmlError::ExecutionFailure)
}

fn next_name(it: &mut IntoIter<Operand>) -> Result<AmlName, AmlError> {
    match next_operand(it)? {
        Operand::Name(name) => Ok(name),
        _ => Err(AmlError::ExecutionFailure),
    }
}

/// Interprets an operand collected in a reference mode as a target.
fn next_target(it: &mut IntoIter<Operand>) -> Result<Target, AmlError> {
    match next_operand(it)? {
        Operand::Target(t) => Ok(t),
        Operand::Value(AmlValue::Handle(node)) => Ok(Target::Node(node)),
        Operand::Value(_) => Ok(Target::Null),
        Operand::Name(_) => Err(AmlError::ExecutionFailure),
    }
}

/// Element `index` of a package, buffer or string.
pub(crate) fn element_of(container: &AmlValue, index: usize) -> Result<AmlValue, AmlError> {
    match container {
        AmlValue::Package(p) => p.get(index).cloned().ok_or(AmlError::OutOfBounds),
        AmlValue::Buffer(b) => b
            .get(index)
            .map(|&v| AmlValue::Integer(u64::from(v)))
            .ok_or(AmlError::OutOfBounds),
        AmlValue::String(s) => s
            .as_bytes()
            .get(index)
            .map(|&v| AmlValue::Integer(u64::from(v)))
            .ok_or(AmlError::OutOfBounds),
        _ => Err(AmlError::TypeMismatch),
    }
}

impl<H: Host> Interpreter<H> {
    /// Runs until the item stack is empty.
    pub(crate) fn run(&mut self, state: &mut State) -> Result<(), AmlError> {
        while !state.items.is_empty() {
            self.step(state)?;
        }
        Ok(())
    }

    fn step(&mut self, state: &mut State) -> Result<(), AmlError> {
        if let Some(mode) = pending_mode(state) {
            return self.parse_term(state, mode);
        }

        match state.items.last() {
            None => return Ok(()),
            Some(Item::Frame { .. }) => return self.step_frame(state),
            Some(Item::Package { count: None, .. }) => {
                // `VarPackage` count just evaluated.
                let n = match state.operands.pop() {
                    Some(Operand::Value(v)) => to_integer(&v, self.width)?,
                    _ => return Err(AmlError::TypeMismatch),
                };
                let n = usize::try_from(n).map_err(|_| AmlError::OutOfBounds)?;
                if let Some(Item::Package { count, .. }) = state.items.last_mut() {
                    *count = Some(n);
                }
                return Ok(());
            }
            Some(_) => {}
        }

        let item = state.items.pop().ok_or(AmlError::ExecutionFailure)?;
        match item {
            Item::Op {
                op, base, mode, end, ..
            } => {
                let operands = state.operands.split_off(base);
                self.execute(state, op, operands, end, mode)
            }
            Item::Loop {
                predicate_pc,
                end,
                iterations,
                base,
            } => {
                let operands = state.operands.split_off(base);
                let mut it = operands.into_iter();
                let predicate = self.next_int(state, &mut it)? != 0;
                let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
                if predicate {
                    if iterations >= self.config.loop_limit {
                        log::error!("aml: While loop exceeded {iterations} iterations");
                        return Err(AmlError::ExecutionFailure);
                    }
                    let scope = frame.scope().ok_or(AmlError::ExecutionFailure)?;
                    frame.blocks.push(Block {
                        kind: BlockKind::Loop {
                            predicate_pc,
                            iterations: iterations + 1,
                        },
                        limit: end,
                        scope,
                    });
                } else {
                    frame.pc = end;
                }
                Ok(())
            }
            Item::Invoke {
                method, base, mode, ..
            } => {
                let mut args = Vec::with_capacity(state.operands.len() - base);
                for operand in state.operands.split_off(base) {
                    args.push(self.take_value(state, operand)?);
                }
                self.call(state, method, args, mode)
            }
            Item::Package {
                end,
                count,
                base,
                mode,
            } => {
                let mut elements = Vec::with_capacity(state.operands.len() - base);
                for operand in state.operands.split_off(base) {
                    elements.push(self.take_value(state, operand)?);
                }
                if let Some(count) = count {
                    if elements.len() > count {
                        log::warn!(
                            "aml: package has {} initializers for {count} elements",
                            elements.len()
                        );
                        elements.truncate(count);
                    }
                    elements.resize(count, AmlValue::Uninitialized);
                }
                let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
                frame.pc = end;
                self.deliver(state, Operand::Value(AmlValue::Package(elements)), mode)
            }
            Item::Buffer { end, base, mode } => {
                let operands = state.operands.split_off(base);
                let mut it = operands.into_iter();
                let size = self.next_int(state, &mut it)?;
                let size = usize::try_from(size).map_err(|_| AmlError::OutOfBounds)?;
                let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
                let mut bytes = frame
                    .code
                    .get(frame.pc..end)
                    .ok_or(AmlError::ExecutionFailure)?
                    .to_vec();
                frame.pc = end;
                if bytes.len() < size {
                    bytes.resize(size, 0);
                }
                self.deliver(state, Operand::Value(AmlValue::Buffer(bytes)), mode)
            }
            Item::Frame { .. } => Err(AmlError::ExecutionFailure),
        }
    }

    /// Advances statement execution of the innermost frame.
    fn step_frame(&mut self, state: &mut State) -> Result<(), AmlError> {
        let frame = state.frames.last_mut().ok_or(AmlError::ExecutionFailure)?;
        let Some(block) = frame.blocks.last().copied() else {
            return self.leave_frame(state, AmlValue::Integer(0));
        };
        if frame.pc < block.limit {
            return self.parse_term(state, Mode::Exec);
        }

        frame.blocks.pop();
        match block.kind {
            BlockKind::Body => self.leave_frame(state, AmlValue::Integer(0)),
            BlockKind::Scope | BlockKind::Else => Ok(()),
            BlockKind::Then => {
                // The taken branch skips a following `Else`.
                if frame.pc < frame.limit() && frame.code.get(frame.pc) == Some(&(ELSE_OP as u8)) {
                    frame.pc += 1;
                    let end = read_inline(state, |r| r.pkg_length())?;
                    let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
                    frame.pc = end;
                }
                Ok(())
            }
            BlockKind::Loop {
                predicate_pc,
                iterations,
            } => {
                frame.pc = predicate_pc;
                let base = state.operands.len();
                state.items.push(Item::Loop {
                    predicate_pc,
                    end: block.limit,
                    iterations,
                    base,
                });
                Ok(())
            }
        }
    }

    /// Pops the innermost frame and hands `value` to its caller.
    fn leave_frame(&mut self, state: &mut State, value: AmlValue) -> Result<(), AmlError> {
        let (mode, base) = loop {
            match state.items.pop() {
                Some(Item::Frame { mode, base }) => break (mode, base),
                Some(_) => {}
                None => return Err(AmlError::ExecutionFailure),
            }
        };
        state.operands.truncate(base);
        let frame = state.frames.pop().ok_or(AmlError::ExecutionFailure)?;
        self.drop_frame(frame);

        if state.frames.is_empty() {
            state.result = Some(value);
            return Ok(());
        }
        self.deliver(state, Operand::Value(value), mode)
    }

    /// Hands a finished term's result to whatever is waiting for it.
    pub(crate) fn deliver(
        &mut self,
        state: &mut State,
        operand: Operand,
        mode: Mode,
    ) -> Result<(), AmlError> {
        match mode {
            Mode::Exec => Ok(()),
            Mode::Object | Mode::PackageElement => {
                let value = self.take_value(state, operand)?;
                state.operands.push(Operand::Value(value));
                Ok(())
            }
            _ => {
                state.operands.push(operand);
                Ok(())
            }
        }
    }

    /// Converts an operand into a value, reading targets.
    pub(crate) fn take_value(
        &mut self,
        state: &mut State,
        operand: Operand,
    ) -> Result<AmlValue, AmlError> {
        match operand {
            Operand::Value(v) => Ok(v),
            Operand::Target(t) => self.load(state, &t),
            Operand::Name(_) => Err(AmlError::ExecutionFailure),
        }
    }

    fn next_value(
        &mut self,
        state: &mut State,
        it: &mut IntoIter<Operand>,
    ) -> Result<AmlValue, AmlError> {
        let operand = next_operand(it)?;
        self.take_value(state, operand)
    }

    fn next_int(&mut self, state: &mut State, it: &mut IntoIter<Operand>) -> Result<u64, AmlError> {
        let value = self.next_value(state, it)?;
        to_integer(&value, self.width)
    }

    fn boolean(&self, b: bool) -> AmlValue {
        AmlValue::Integer(if b { self.width.ones() } else { 0 })
    }

    // ─── Term parsing ──────────────────────────────────────────────────────

    /// Parses the next term of the innermost frame in `mode`.
    fn parse_term(&mut self, state: &mut State, mode: Mode) -> Result<(), AmlError> {
        match mode {
            Mode::Byte => {
                let v = read_inline(state, |r| r.read_u8())?;
                state.operands.push(Operand::Value(AmlValue::Integer(u64::from(v))));
                return Ok(());
            }
            Mode::Word => {
                let v = read_inline(state, |r| r.read_u16())?;
                state.operands.push(Operand::Value(AmlValue::Integer(u64::from(v))));
                return Ok(());
            }
            Mode::DWord => {
                let v = read_inline(state, |r| r.read_u32())?;
                state.operands.push(Operand::Value(AmlValue::Integer(u64::from(v))));
                return Ok(());
            }
            Mode::Name => {
                let name = read_inline(state, |r| r.name_string())?;
                state.operands.push(Operand::Name(name));
                return Ok(());
            }
            _ => {}
        }

        let start = state.frame().ok_or(AmlError::ExecutionFailure)?.pc;
        let lead = read_inline(state, |r| r.peek().ok_or(AmlError::ExecutionFailure))?;

        if lead == 0 && matches!(mode, Mode::Reference | Mode::OptionalReference) {
            read_inline(state, |r| r.skip(1))?;
            state.operands.push(Operand::Target(Target::Null));
            return Ok(());
        }
        if starts_name_string(lead) {
            let name = read_inline(state, |r| r.name_string())?;
            return self.resolve_term(state, &name, mode);
        }

        let op = read_inline(state, decode_opcode)?;
        if self.tracing() {
            log::trace!(target: TRACE_TARGET, "{start:#06x}: {}", opcode::name(op));
        }
        self.begin(state, op, mode)
    }

    /// Handles a name appearing where a term is expected.
    fn resolve_term(&mut self, state: &mut State, name: &AmlName, mode: Mode) -> Result<(), AmlError> {
        let scope = state
            .frame()
            .and_then(Frame::scope)
            .ok_or(AmlError::ExecutionFailure)?;
        let Some(node) = self.namespace.lookup(scope, name) else {
            if mode == Mode::PackageElement {
                state
                    .operands
                    .push(Operand::Value(AmlValue::String(name.to_string())));
                return Ok(());
            }
            log::warn!("aml: unresolved name {name}");
            return Err(AmlError::NoSuchNode);
        };

        if let NodeKind::Method(method) = self.namespace.node(node)?.kind() {
            if matches!(mode, Mode::Exec | Mode::Object | Mode::RefOrObject) {
                let argc = method.flags.arg_count();
                let base = state.operands.len();
                state.items.push(Item::Invoke {
                    method: node,
                    argc,
                    base,
                    mode,
                });
                return Ok(());
            }
        }

        match mode {
            Mode::Exec => Ok(()),
            Mode::PackageElement => {
                state.operands.push(Operand::Value(AmlValue::Handle(node)));
                Ok(())
            }
            _ => self.deliver(state, Operand::Target(Target::Node(node)), mode),
        }
    }

    /// Starts executing a decoded opcode.
    fn begin(&mut self, state: &mut State, op: u16, mode: Mode) -> Result<(), AmlError> {
        let constant = match op {
            ZERO_OP => Some(0),
            ONE_OP => Some(1),
            ONES_OP => Some(self.width.ones()),
            BYTE_PREFIX => Some(u64::from(read_inline(state, |r| r.read_u8())?)),
            WORD_PREFIX => Some(u64::from(read_inline(state, |r| r.read_u16())?)),
            DWORD_PREFIX => Some(u64::from(read_inline(state, |r| r.read_u32())?)),
            QWORD_PREFIX => Some(self.width.mask(read_inline(state, |r| r.read_u64())?)),
            REVISION_OP => Some(INTERPRETER_REVISION),
            TIMER_OP => Some(self.host.timer()),
            _ => None,
        };
        if let Some(v) = constant {
            return self.deliver(state, Operand::Value(AmlValue::Integer(v)), mode);
        }

        let base = state.operands.len();
        match op {
            STRING_PREFIX => {
                let s = read_inline(state, |r| r.string())?;
                self.deliver(state, Operand::Value(AmlValue::String(s)), mode)
            }
            LOCAL0_OP..=LOCAL7_OP => {
                let t = Target::Local((op - LOCAL0_OP) as u8);
                self.deliver(state, Operand::Target(t), mode)
            }
            ARG0_OP..=ARG6_OP => {
                let t = Target::Arg((op - ARG0_OP) as u8);
                self.deliver(state, Operand::Target(t), mode)
            }
            DEBUG_OP => self.deliver(state, Operand::Target(Target::Debug), mode),
            BUFFER_OP => {
                let end = read_inline(state, |r| r.pkg_length())?;
                state.items.push(Item::Buffer { end, base, mode });
                Ok(())
            }
            PACKAGE_OP => {
                let end = read_inline(state, |r| r.pkg_length())?;
                let count = read_inline(state, |r| r.read_u8())?;
                state.items.push(Item::Package {
                    end,
                    count: Some(usize::from(count)),
                    base,
                    mode,
                });
                Ok(())
            }
            VAR_PACKAGE_OP => {
                let end = read_inline(state, |r| r.pkg_length())?;
                state.items.push(Item::Package {
                    end,
                    count: None,
                    base,
                    mode,
                });
                Ok(())
            }
            WHILE_OP => {
                let end = read_inline(state, |r| r.pkg_length())?;
                let predicate_pc = state.frame().ok_or(AmlError::ExecutionFailure)?.pc;
                state.items.push(Item::Loop {
                    predicate_pc,
                    end,
                    iterations: 0,
                    base,
                });
                Ok(())
            }
            ELSE_OP => {
                // An `Else` not consumed by its `If` is skipped.
                let end = read_inline(state, |r| r.pkg_length())?;
                state.frame_mut().ok_or(AmlError::ExecutionFailure)?.pc = end;
                Ok(())
            }
            LOAD_OP | LOAD_TABLE_OP | UNLOAD_OP | DATA_REGION_OP => {
                log::warn!("aml: {} is not supported", opcode::name(op));
                Err(AmlError::ExecutionFailure)
            }
            _ => {
                let Some((modes, has_pkg_length)) = grammar(op) else {
                    log::warn!("aml: unknown opcode {op:#06x}");
                    return Err(AmlError::ExecutionFailure);
                };
                let end = if has_pkg_length {
                    read_inline(state, |r| r.pkg_length())?
                } else {
                    0
                };
                state.items.push(Item::Op {
                    op,
                    modes,
                    base,
                    mode,
                    end,
                });
                Ok(())
            }
        }
    }

    // ─── Invocation ────────────────────────────────────────────────────────

    /// Invokes a method from AML: native methods run inline, AML methods
    /// push a frame.
    fn call(
        &mut self,
        state: &mut State,
        method: NodeId,
        args: Vec<AmlValue>,
        mode: Mode,
    ) -> Result<(), AmlError> {
        let NodeKind::Method(Method { body, .. }) = self.namespace.node(method)?.kind().clone()
        else {
            return Err(AmlError::TypeMismatch);
        };
        if self.tracing() {
            log::trace!(target: TRACE_TARGET, "call {}", self.namespace.path_of(method));
        }
        match body {
            MethodBody::Native(native) => {
                let value = self.call_native(native, &args)?;
                self.deliver(state, Operand::Value(value), mode)
            }
            MethodBody::Aml { code, start, end } => {
                if state.frames.len() >= self.config.max_call_depth {
                    log::error!(
                        "aml: call depth limit ({}) exceeded",
                        self.config.max_call_depth
                    );
                    return Err(AmlError::ExecutionFailure);
                }
                let mut frame = Frame::new(code, start, end, method, Some(method));
                for (slot, arg) in frame.args.iter_mut().zip(args) {
                    *slot = arg;
                }
                let base = state.operands.len();
                state.items.push(Item::Frame { mode, base });
                state.frames.push(frame);
                Ok(())
            }
        }
    }

    // ─── Operator execution ────────────────────────────────────────────────

    /// Executes an operator whose operands are complete.
    #[allow(clippy::too_many_lines)]
    fn execute(
        &mut self,
        state: &mut State,
        op: u16,
        operands: Vec<Operand>,
        end: usize,
        mode: Mode,
    ) -> Result<(), AmlError> {
        let width = self.width;
        let mut it = operands.into_iter();
        let it = &mut it;

        match op {
            // Named objects and namespace modifiers.
            NAME_OP => {
                let name = next_name(it)?;
                let value = self.next_value(state, it)?;
                self.define(state, &name, NodeKind::Name, value).map(drop)
            }
            ALIAS_OP => {
                let source = next_name(it)?;
                let alias = next_name(it)?;
                let scope = self.current_scope(state)?;
                match self.namespace.lookup(scope, &source) {
                    Some(target) => self
                        .define(state, &alias, NodeKind::Alias(target), AmlValue::Uninitialized)
                        .map(drop),
                    None => {
                        log::warn!("aml: Alias source {source} does not exist");
                        Ok(())
                    }
                }
            }
            SCOPE_OP => {
                let name = next_name(it)?;
                self.open_scope(state, &name, end)
            }
            METHOD_OP => {
                let name = next_name(it)?;
                let flags = self.next_int(state, it)?;
                let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
                let body = MethodBody::Aml {
                    code: Arc::clone(&frame.code),
                    start: frame.pc,
                    end,
                };
                frame.pc = end;
                let method = Method {
                    flags: MethodFlags::from_bits_retain(flags as u8),
                    body,
                };
                self.define(state, &name, NodeKind::Method(method), AmlValue::Uninitialized)
                    .map(drop)
            }
            EXTERNAL_OP => Ok(()),
            DEVICE_OP => {
                let name = next_name(it)?;
                self.open_container(state, &name, NodeKind::Device, end)
            }
            THERMAL_ZONE_OP => {
                let name = next_name(it)?;
                self.open_container(state, &name, NodeKind::ThermalZone, end)
            }
            PROCESSOR_OP => {
                let name = next_name(it)?;
                let id = self.next_int(state, it)? as u8;
                let pblk_address = self.next_int(state, it)? as u32;
                let pblk_length = self.next_int(state, it)? as u8;
                let kind = NodeKind::Processor {
                    id,
                    pblk_address,
                    pblk_length,
                };
                self.open_container(state, &name, kind, end)
            }
            POWER_RES_OP => {
                let name = next_name(it)?;
                let system_level = self.next_int(state, it)? as u8;
                let resource_order = self.next_int(state, it)? as u16;
                let kind = NodeKind::PowerResource {
                    system_level,
                    resource_order,
                };
                self.open_container(state, &name, kind, end)
            }
            MUTEX_OP => {
                let name = next_name(it)?;
                let flags = self.next_int(state, it)?;
                let mutex = MutexObject {
                    sync_level: (flags & 0x0F) as u8,
                    ..MutexObject::default()
                };
                self.define(state, &name, NodeKind::Mutex(mutex), AmlValue::Uninitialized)
                    .map(drop)
            }
            EVENT_OP => {
                let name = next_name(it)?;
                let kind = NodeKind::Event(EventObject::default());
                self.define(state, &name, kind, AmlValue::Uninitialized).map(drop)
            }
            OP_REGION_OP => {
                let name = next_name(it)?;
                let space = RegionSpace::from(self.next_int(state, it)? as u8);
                let offset = self.next_int(state, it)?;
                let length = self.next_int(state, it)?;
                let region = OpRegion {
                    space,
                    offset,
                    length,
                };
                self.define(state, &name, NodeKind::OpRegion(region), AmlValue::Uninitialized)
                    .map(drop)
            }
            FIELD_OP | INDEX_FIELD_OP | BANK_FIELD_OP => self.define_fields(state, op, it, end),
            CREATE_BIT_FIELD_OP | CREATE_BYTE_FIELD_OP | CREATE_WORD_FIELD_OP
            | CREATE_DWORD_FIELD_OP | CREATE_QWORD_FIELD_OP | CREATE_FIELD_OP => {
                self.create_buffer_field(state, op, it)
            }

            // Control flow.
            IF_OP => {
                let predicate = self.next_int(state, it)? != 0;
                let scope = self.current_scope(state)?;
                let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
                if predicate {
                    frame.blocks.push(Block {
                        kind: BlockKind::Then,
                        limit: end,
                        scope,
                    });
                    return Ok(());
                }
                frame.pc = end;
                if frame.pc < frame.limit() && frame.code.get(frame.pc) == Some(&(ELSE_OP as u8)) {
                    frame.pc += 1;
                    let limit = read_inline(state, |r| r.pkg_length())?;
                    let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
                    frame.blocks.push(Block {
                        kind: BlockKind::Else,
                        limit,
                        scope,
                    });
                }
                Ok(())
            }
            RETURN_OP => {
                let value = self.next_value(state, it)?;
                self.leave_frame(state, value)
            }
            BREAK_OP => self.unwind_loop(state, false),
            CONTINUE_OP => self.unwind_loop(state, true),
            NOOP_OP | BREAK_POINT_OP => Ok(()),

            // Data movement.
            STORE_OP => {
                let value = self.next_value(state, it)?;
                let target = next_target(it)?;
                self.store(state, &target, value.clone())?;
                self.deliver(state, Operand::Value(value), mode)
            }
            COPY_OBJECT_OP => {
                let value = self.next_value(state, it)?;
                let target = next_target(it)?;
                self.copy_object(state, &target, value.clone())?;
                self.deliver(state, Operand::Value(value), mode)
            }
            REF_OF_OP => {
                let target = next_target(it)?;
                let node = self.ref_of(state, &target)?;
                self.deliver(state, Operand::Value(AmlValue::Handle(node)), mode)
            }
            COND_REF_OF_OP => {
                let name = next_name(it)?;
                let target = next_target(it)?;
                let scope = self.current_scope(state)?;
                let found = self.namespace.lookup(scope, &name);
                if let Some(node) = found {
                    self.store(state, &target, AmlValue::Handle(node))?;
                }
                let result = self.boolean(found.is_some());
                self.deliver(state, Operand::Value(result), mode)
            }
            DEREF_OF_OP => {
                let operand = next_operand(it)?;
                let result = self.deref(state, operand)?;
                self.deliver(state, result, mode)
            }
            SIZE_OF_OP => {
                let operand = next_operand(it)?;
                let mut value = self.take_value(state, operand)?;
                if let AmlValue::Handle(node) = value {
                    value = self.load(state, &Target::Node(node))?;
                }
                let size = match &value {
                    AmlValue::String(s) => s.len(),
                    AmlValue::Buffer(b) => b.len(),
                    AmlValue::Package(p) => p.len(),
                    _ => return Err(AmlError::TypeMismatch),
                };
                self.deliver(state, Operand::Value(AmlValue::Integer(size as u64)), mode)
            }
            OBJECT_TYPE_OP => {
                let target = next_target(it)?;
                let code = self.object_type_of(state, &target)?;
                self.deliver(state, Operand::Value(AmlValue::Integer(code)), mode)
            }
            INDEX_OP => {
                let base = next_operand(it)?;
                let index = self.next_int(state, it)?;
                let target = next_target(it)?;
                self.index(state, base, index, &target, mode)
            }
            MATCH_OP => {
                let package = self.next_value(state, it)?;
                let op1 = self.next_int(state, it)?;
                let v1 = self.next_value(state, it)?;
                let op2 = self.next_int(state, it)?;
                let v2 = self.next_value(state, it)?;
                let start = self.next_int(state, it)?;
                let index =
                    ops::match_package(package.package()?, [(op1, &v1), (op2, &v2)], start, width);
                self.deliver(state, Operand::Value(AmlValue::Integer(index)), mode)
            }

            // Integer arithmetic.
            ADD_OP | SUBTRACT_OP | MULTIPLY_OP | SHIFT_LEFT_OP | SHIFT_RIGHT_OP | AND_OP
            | NAND_OP | OR_OP | NOR_OP | XOR_OP | MOD_OP => {
                let a = self.next_int(state, it)?;
                let b = self.next_int(state, it)?;
                let target = next_target(it)?;
                let result = ops::binary(op, a, b, width)?;
                self.store_result(state, &target, AmlValue::Integer(result), mode)
            }
            DIVIDE_OP => {
                let dividend = self.next_int(state, it)?;
                let divisor = self.next_int(state, it)?;
                let remainder_target = next_target(it)?;
                let quotient_target = next_target(it)?;
                if divisor == 0 {
                    log::warn!("aml: Divide by zero");
                    return Err(AmlError::ExecutionFailure);
                }
                self.store(
                    state,
                    &remainder_target,
                    AmlValue::Integer(dividend % divisor),
                )?;
                self.store_result(
                    state,
                    &quotient_target,
                    AmlValue::Integer(dividend / divisor),
                    mode,
                )
            }
            NOT_OP | FIND_SET_LEFT_BIT_OP | FIND_SET_RIGHT_BIT_OP | TO_BCD_OP | FROM_BCD_OP => {
                let v = self.next_int(state, it)?;
                let target = next_target(it)?;
                let result = match op {
                    NOT_OP => width.mask(!v),
                    FIND_SET_LEFT_BIT_OP => ops::find_set_left_bit(v),
                    FIND_SET_RIGHT_BIT_OP => ops::find_set_right_bit(v),
                    TO_BCD_OP => ops::to_bcd(v, width),
                    _ => width.mask(ops::from_bcd(v)),
                };
                self.store_result(state, &target, AmlValue::Integer(result), mode)
            }
            INCREMENT_OP | DECREMENT_OP => {
                let target = next_target(it)?;
                let current = self.load(state, &target)?;
                let v = to_integer(&current, width)?;
                let v = if op == INCREMENT_OP {
                    v.wrapping_add(1)
                } else {
                    v.wrapping_sub(1)
                };
                self.store_result(state, &target, AmlValue::Integer(width.mask(v)), mode)
            }

            // Logic.
            LAND_OP | LOR_OP => {
                let a = self.next_int(state, it)? != 0;
                let b = self.next_int(state, it)? != 0;
                let result = if op == LAND_OP { a && b } else { a || b };
                let result = self.boolean(result);
                self.deliver(state, Operand::Value(result), mode)
            }
            LNOT_OP => {
                let v = self.next_int(state, it)?;
                let result = self.boolean(v == 0);
                self.deliver(state, Operand::Value(result), mode)
            }
            LEQUAL_OP | LGREATER_OP | LLESS_OP | LNOT_EQUAL_OP | LLESS_EQUAL_OP
            | LGREATER_EQUAL_OP => {
                let a = self.next_value(state, it)?;
                let b = self.next_value(state, it)?;
                let ordering = ops::compare(&a, &b, width)?;
                let result = self.boolean(ops::logical_compare(op, ordering));
                self.deliver(state, Operand::Value(result), mode)
            }

            // Conversions and string/buffer operators.
            CONCAT_OP | CONCAT_RES_OP => {
                let a = self.next_value(state, it)?;
                let b = self.next_value(state, it)?;
                let target = next_target(it)?;
                let result = if op == CONCAT_OP {
                    ops::concat(&a, &b, width)?
                } else {
                    ops::concat_res(&a, &b)?
                };
                self.store_result(state, &target, result, mode)
            }
            TO_STRING_OP => {
                let source = self.next_value(state, it)?;
                let length = self.next_int(state, it)?;
                let target = next_target(it)?;
                let result = ops::buffer_to_string(&source, length)?;
                self.store_result(state, &target, result, mode)
            }
            MID_OP => {
                let source = self.next_value(state, it)?;
                let index = self.next_int(state, it)?;
                let length = self.next_int(state, it)?;
                let target = next_target(it)?;
                let result = ops::mid(&source, index, length)?;
                self.store_result(state, &target, result, mode)
            }
            TO_BUFFER_OP | TO_DECIMAL_STRING_OP | TO_HEX_STRING_OP | TO_INTEGER_OP => {
                let source = self.next_value(state, it)?;
                let target = next_target(it)?;
                let result = match op {
                    TO_BUFFER_OP => AmlValue::Buffer(to_buffer(&source, width)?),
                    TO_DECIMAL_STRING_OP => ops::to_decimal_string(&source)?,
                    TO_HEX_STRING_OP => ops::to_hex_string(&source, width)?,
                    _ => AmlValue::Integer(ops::to_integer_explicit(&source, width)?),
                };
                self.store_result(state, &target, result, mode)
            }

            // Host interaction and synchronisation.
            NOTIFY_OP => {
                let target = next_target(it)?;
                let value = self.next_int(state, it)?;
                let node = self.target_node(state, &target)?;
                log::debug!("aml: Notify({}, {value:#x})", self.namespace.path_of(node));
                self.host.notify(node, value);
                Ok(())
            }
            SLEEP_OP => {
                let ms = self.next_int(state, it)?;
                self.host.sleep(ms);
                Ok(())
            }
            STALL_OP => {
                let us = self.next_int(state, it)?;
                self.host.stall(us);
                Ok(())
            }
            ACQUIRE_OP => {
                let target = next_target(it)?;
                let timeout = self.next_int(state, it)? as u16;
                let node = self.target_node(state, &target)?;
                let timed_out = self.acquire_aml_mutex(state, node, timeout)?;
                let result = self.boolean(timed_out);
                self.deliver(state, Operand::Value(result), mode)
            }
            RELEASE_OP => {
                let target = next_target(it)?;
                let node = self.target_node(state, &target)?;
                self.release_mutex_op(state, node)
            }
            SIGNAL_OP | RESET_OP => {
                let target = next_target(it)?;
                let node = self.target_node(state, &target)?;
                if op == SIGNAL_OP {
                    self.signal_event(node)
                } else {
                    self.reset_event(node)
                }
            }
            WAIT_OP => {
                let target = next_target(it)?;
                let timeout = self.next_int(state, it)?;
                let node = self.target_node(state, &target)?;
                let timed_out = self.wait_event_op(node, timeout)?;
                let result = self.boolean(timed_out);
                self.deliver(state, Operand::Value(result), mode)
            }
            FATAL_OP => {
                let kind = self.next_int(state, it)? as u8;
                let code = self.next_int(state, it)? as u32;
                let arg = self.next_int(state, it)?;
                log::error!("aml: Fatal(type {kind:#x}, code {code:#x}, arg {arg:#x})");
                self.host.fatal(kind, code, arg);
                Ok(())
            }
            _ => {
                log::warn!("aml: unhandled opcode {}", opcode::name(op));
                Err(AmlError::ExecutionFailure)
            }
        }
    }

    /// Stores `value` into `target`, then delivers it as the result.
    fn store_result(
        &mut self,
        state: &mut State,
        target: &Target,
        value: AmlValue,
        mode: Mode,
    ) -> Result<(), AmlError> {
        self.store(state, target, value.clone())?;
        self.deliver(state, Operand::Value(value), mode)
    }

    /// `Break` (`resume == false`) or `Continue` (`resume == true`).
    fn unwind_loop(&mut self, state: &mut State, resume: bool) -> Result<(), AmlError> {
        let base = state.operands.len();
        let frame = state.frames.last_mut().ok_or(AmlError::ExecutionFailure)?;
        while let Some(block) = frame.blocks.pop() {
            match block.kind {
                BlockKind::Loop {
                    predicate_pc,
                    iterations,
                } => {
                    if resume {
                        frame.pc = predicate_pc;
                        state.items.push(Item::Loop {
                            predicate_pc,
                            end: block.limit,
                            iterations,
                            base,
                        });
                    } else {
                        frame.pc = block.limit;
                    }
                    return Ok(());
                }
                BlockKind::Body => {
                    frame.blocks.push(block);
                    break;
                }
                _ => {}
            }
        }
        log::warn!("aml: Break/Continue outside of While");
        Err(AmlError::ExecutionFailure)
    }

    // ─── Namespace definitions ─────────────────────────────────────────────

    /// Scope of the innermost block of the innermost frame.
    pub(crate) fn current_scope(&self, state: &State) -> Result<NodeId, AmlError> {
        state
            .frame()
            .and_then(Frame::scope)
            .ok_or(AmlError::ExecutionFailure)
    }

    /// Creates a node for a definition.
    ///
    /// Redefining a scope-like object reopens the existing one. Any other
    /// redefinition is ignored with a warning and yields `None`.
    pub(crate) fn define(
        &mut self,
        state: &mut State,
        name: &AmlName,
        kind: NodeKind,
        object: AmlValue,
    ) -> Result<Option<NodeId>, AmlError> {
        let scope = self.current_scope(state)?;
        let seg = name.last_segment().ok_or(AmlError::ExecutionFailure)?;
        let parent = if name.is_search_candidate() {
            scope
        } else {
            self.namespace
                .lookup_exact(scope, &name.parent_name())
                .ok_or_else(|| {
                    log::warn!("aml: parent scope of {name} does not exist");
                    AmlError::NoSuchNode
                })?
        };

        if let Some(existing) = self.namespace.child(parent, seg) {
            if kind.is_container() && self.namespace.node(existing)?.kind().is_container() {
                return Ok(Some(existing));
            }
            log::warn!(
                "aml: {} already exists, ignoring redefinition",
                self.namespace.path_of(existing)
            );
            return Ok(None);
        }

        let node = self.namespace.insert(parent, seg, kind, object);
        let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
        if frame.is_method() {
            frame.temporaries.push(node);
        }
        Ok(Some(node))
    }

    /// `Scope`: enters an existing scope, or skips the block if the name
    /// does not refer to one.
    fn open_scope(&mut self, state: &mut State, name: &AmlName, end: usize) -> Result<(), AmlError> {
        let scope = self.current_scope(state)?;
        let target = self
            .namespace
            .lookup(scope, name)
            .filter(|&n| self.namespace.node(n).is_ok_and(|n| n.kind().is_container()));
        let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
        match target {
            Some(node) => frame.blocks.push(Block {
                kind: BlockKind::Scope,
                limit: end,
                scope: node,
            }),
            None => {
                log::warn!("aml: Scope({name}) does not name a scope, skipping it");
                frame.pc = end;
            }
        }
        Ok(())
    }

    /// Defines (or reopens) a scope-like object and enters its body.
    fn open_container(
        &mut self,
        state: &mut State,
        name: &AmlName,
        kind: NodeKind,
        end: usize,
    ) -> Result<(), AmlError> {
        let node = self.define(state, name, kind, AmlValue::Uninitialized)?;
        let frame = state.frame_mut().ok_or(AmlError::ExecutionFailure)?;
        match node {
            Some(node) => frame.blocks.push(Block {
                kind: BlockKind::Scope,
                limit: end,
                scope: node,
            }),
            None => frame.pc = end,
        }
        Ok(())
    }

    /// `CreateBitField` .. `CreateQWordField` and `CreateField`.
    fn create_buffer_field(
        &mut self,
        state: &mut State,
        op: u16,
        it: &mut IntoIter<Operand>,
    ) -> Result<(), AmlError> {
        let source = next_operand(it)?;
        let index = self.next_int(state, it)?;
        let byte_index = || index.checked_mul(8).ok_or(AmlError::OutOfBounds);
        let (bit_offset, bit_length) = match op {
            CREATE_BIT_FIELD_OP => (index, 1),
            CREATE_BYTE_FIELD_OP => (byte_index()?, 8),
            CREATE_WORD_FIELD_OP => (byte_index()?, 16),
            CREATE_DWORD_FIELD_OP => (byte_index()?, 32),
            CREATE_QWORD_FIELD_OP => (byte_index()?, 64),
            _ => (index, self.next_int(state, it)?),
        };
        let name = next_name(it)?;
        if bit_length == 0 || bit_offset.checked_add(bit_length).is_none() {
            log::warn!("aml: buffer field {name} at bit {bit_offset:#x} length {bit_length:#x} cannot exist");
            return Err(AmlError::OutOfBounds);
        }

        let source = match source {
            Operand::Target(t) => match self.deref_location(state, t) {
                Target::Node(node) => BufferSource::Node(node),
                Target::Local(i) => BufferSource::Frame {
                    depth: state.frames.len() - 1,
                    slot: FrameSlot::Local(i),
                },
                Target::Arg(i) => BufferSource::Frame {
                    depth: state.frames.len() - 1,
                    slot: FrameSlot::Arg(i),
                },
                _ => return Err(AmlError::TypeMismatch),
            },
            Operand::Value(AmlValue::Handle(node)) => BufferSource::Node(node),
            _ => {
                log::warn!("aml: buffer field {name} over a temporary buffer");
                return Err(AmlError::TypeMismatch);
            }
        };

        let field = BufferField {
            source,
            bit_offset,
            bit_length,
        };
        self.define(state, &name, NodeKind::BufferField(field), AmlValue::Uninitialized)
            .map(drop)
    }

    // ─── References ────────────────────────────────────────────────────────

    /// Follows a local or argument holding a handle to the named object.
    pub(crate) fn deref_location(&self, state: &State, target: Target) -> Target {
        let slot = state.frame().and_then(|f| match target {
            Target::Local(i) => f.locals.get(usize::from(i)),
            Target::Arg(i) => f.args.get(usize::from(i)),
            _ => None,
        });
        match slot {
            Some(AmlValue::Handle(node)) => Target::Node(*node),
            _ => target,
        }
    }

    /// Node referenced by a `SuperName` operand.
    fn target_node(&self, state: &State, target: &Target) -> Result<NodeId, AmlError> {
        match self.deref_location(state, target.clone()) {
            Target::Node(node) => Ok(self.namespace.resolve_alias(node)),
            _ => Err(AmlError::TypeMismatch),
        }
    }

    /// `RefOf`.
    fn ref_of(&self, state: &State, target: &Target) -> Result<NodeId, AmlError> {
        self.target_node(state, target).inspect_err(|_| {
            log::warn!("aml: RefOf of a non-namespace object is not supported");
        })
    }

    /// `DerefOf`: handles and path strings become namespace targets, other
    /// values are returned as they are.
    fn deref(&mut self, state: &mut State, operand: Operand) -> Result<Operand, AmlError> {
        let value = self.take_value(state, operand)?;
        match value {
            AmlValue::Handle(node) => Ok(Operand::Target(Target::Node(node))),
            AmlValue::String(path) => {
                let scope = self.current_scope(state)?;
                let name = AmlName::parse(&path).map_err(|_| AmlError::TypeMismatch)?;
                let node = self
                    .namespace
                    .lookup(scope, &name)
                    .ok_or(AmlError::NoSuchNode)?;
                Ok(Operand::Target(Target::Node(node)))
            }
            other => Ok(Operand::Value(other)),
        }
    }

    /// `ObjectType` code of a target.
    fn object_type_of(&mut self, state: &mut State, target: &Target) -> Result<u64, AmlError> {
        let value = match self.deref_location(state, target.clone()) {
            Target::Node(node) => {
                let node = self.namespace.node(node)?;
                return Ok(node.kind().object_type_code(node.object()));
            }
            Target::Debug => return Ok(16),
            Target::Null => AmlValue::Uninitialized,
            other => self.load(state, &other)?,
        };
        Ok(NodeKind::Name.object_type_code(&value))
    }

    /// `Index`: a reference to an element when the container is stored
    /// somewhere, otherwise a copy of the element.
    fn index(
        &mut self,
        state: &mut State,
        base: Operand,
        index: u64,
        target: &Target,
        mode: Mode,
    ) -> Result<(), AmlError> {
        let index = usize::try_from(index).map_err(|_| AmlError::OutOfBounds)?;
        let (container, location) = match base {
            Operand::Target(t) => {
                let t = self.deref_location(state, t);
                (self.load(state, &t)?, Some(t))
            }
            Operand::Value(AmlValue::Handle(node)) => {
                let t = Target::Node(node);
                (self.load(state, &t)?, Some(t))
            }
            Operand::Value(v) => (v, None),
            Operand::Name(_) => return Err(AmlError::ExecutionFailure),
        };
        let element = element_of(&container, index)?;
        self.store(state, target, element.clone())?;
        let result = match location {
            Some(base) => Operand::Target(Target::Element {
                base: Box::new(base),
                index,
            }),
            None => Operand::Value(element),
        };
        self.deliver(state, result, mode)
    }
}
