use std::rc::Rc;

use crate::common::{address::Address, call::Message, hash::keccak256, word::Word};
use crate::db::Backend;
use crate::decoder::{Bytecode, Instruction};
use crate::errors::VmError;
use crate::memory::Memory;
use crate::precompiles;
use crate::stack::Stack;
use crate::state::{Checkpoint, State};
use crate::tracer::{CallScheme, Event, EventData, EventTracer};

pub const CALL_DEPTH_LIMIT: usize = 1024;
/// EIP-170 deployed-code size ceiling.
pub const MAX_CODE_SIZE: usize = 24576;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Word>,
    pub data: Vec<u8>,
}

/// A single call frame: one message, its own stack, memory, log buffer and
/// return-data window, executing against the shared journaled state.
pub struct Computation<T: EventTracer> {
    pub msg: Message,
    code: Rc<Bytecode>,
    stack: Stack,
    memory: Memory,
    pub logs: Vec<Log>,
    output: Vec<u8>,
    return_data: Vec<u8>,
    pc: usize,
    halted: bool,
    pub error: Option<VmError>,
    pub tracer: T,
}

impl<T: EventTracer> Computation<T> {
    fn new<B: Backend>(state: &mut State<B>, msg: Message, tracer: T) -> Self {
        let code = state.bytecode(&msg.code);
        Self {
            msg,
            code,
            stack: Stack::default(),
            memory: Memory::default(),
            logs: Vec::new(),
            output: Vec::new(),
            return_data: Vec::new(),
            pc: 0,
            halted: false,
            error: None,
            tracer,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// The frame's result payload. Halts other than RETURN/STOP/REVERT
    /// erase it.
    pub fn output(&self) -> &[u8] {
        match &self.error {
            Some(err) if err.erases_output() => &[],
            _ => &self.output,
        }
    }

    pub fn take_output(&mut self) -> Vec<u8> {
        match &self.error {
            Some(err) if err.erases_output() => Vec::new(),
            _ => std::mem::take(&mut self.output),
        }
    }

    /// Run a call message in its own checkpoint: transfer value, execute,
    /// then commit on success or roll everything back.
    pub fn apply_message<B: Backend>(state: &mut State<B>, msg: Message, tracer: T) -> Self {
        let checkpoint = state.checkpoint();
        let mut computation = Self::new(state, msg, tracer);

        if computation.msg.transfers_value && !computation.msg.value.is_zero() {
            let (from, to, value) = (
                computation.msg.caller,
                computation.msg.target,
                computation.msg.value,
            );
            if let Err(err) = state.transfer(&from, &to, value) {
                computation.error = Some(err);
            }
        }
        if computation.is_success() {
            computation.run(state);
        }

        computation.seal(state, checkpoint);
        computation
    }

    /// Run a creation message: the new account is marked as created in this
    /// transaction and starts at nonce 1; a successful initcode run must
    /// also pass the code-deposit rules before the checkpoint commits.
    pub fn apply_create_message<B: Backend>(
        state: &mut State<B>,
        msg: Message,
        tracer: T,
    ) -> Self {
        let checkpoint = state.checkpoint();
        state.mark_created(msg.target);
        let mut computation = Self::new(state, msg, tracer);

        if let Err(err) = state.set_nonce(&computation.msg.target, 1) {
            computation.error = Some(err.into());
        }
        if computation.is_success() && !computation.msg.value.is_zero() {
            let (from, to, value) = (
                computation.msg.caller,
                computation.msg.target,
                computation.msg.value,
            );
            if let Err(err) = state.transfer(&from, &to, value) {
                computation.error = Some(err);
            }
        }
        if computation.is_success() {
            computation.run(state);
        }
        if computation.is_success() {
            computation.deposit_code(state);
        }

        computation.seal(state, checkpoint);
        computation
    }

    fn deposit_code<B: Backend>(&mut self, state: &mut State<B>) {
        if self.output.len() > MAX_CODE_SIZE {
            self.error = Some(VmError::CodeTooLarge(self.output.len()));
        } else if self.output.first() == Some(&0xef) {
            self.error = Some(VmError::InvalidCodeFirstByte);
        } else if let Err(err) = state.set_code(&self.msg.target, &self.output.clone()) {
            self.error = Some(err.into());
        }
    }

    fn seal<B: Backend>(&mut self, state: &mut State<B>, checkpoint: Checkpoint) {
        self.tracer.record(Event {
            data: EventData::Halt {
                output: self.output().to_vec(),
                reverted: self.is_error(),
            },
            depth: self.msg.depth,
            reverted: false,
        });
        let result = if self.is_success() {
            state.commit(checkpoint)
        } else {
            state.revert(checkpoint)
        };
        if let Err(err) = result {
            self.error.get_or_insert(VmError::Backend(err));
        }
        tracing::debug!(
            contract = %self.msg.target,
            depth = self.msg.depth,
            success = self.is_success(),
            "frame sealed"
        );
    }

    fn run<B: Backend>(&mut self, state: &mut State<B>) {
        tracing::debug!(
            from = %self.msg.caller,
            to = %self.msg.target,
            value = %self.msg.value,
            depth = self.msg.depth,
            is_static = self.msg.is_static,
            "frame started"
        );

        if !self.msg.is_create {
            if let Some(precompile) = precompiles::lookup(&self.msg.code_address) {
                match precompile(&self.msg.data) {
                    Ok(output) => self.output = output,
                    Err(err) => self.error = Some(err.into()),
                }
                return;
            }
        }

        let code = self.code.clone();
        while !self.halted && self.is_success() && self.pc < code.instructions.len() {
            let instruction = &code.instructions[self.pc];
            self.tracer.record(Event {
                data: EventData::Opcode {
                    pc: instruction.offset,
                    byte: instruction.opcode.byte,
                    name: instruction.opcode.name(),
                    immediate: instruction.immediate.clone(),
                },
                depth: self.msg.depth,
                reverted: false,
            });
            if let Err(err) = self.step(state, instruction) {
                self.error = Some(err);
            }
        }
    }

    fn step<B: Backend>(
        &mut self,
        state: &mut State<B>,
        instruction: &Instruction,
    ) -> Result<(), VmError> {
        let mut advance = true;

        match instruction.opcode.byte {
            // 0x00s: halting and arithmetic
            0x00 => {
                // STOP
                self.output.clear();
                self.halted = true;
            }
            0x01 => {
                // ADD
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a + b)?;
            }
            0x02 => {
                // MUL
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a * b)?;
            }
            0x03 => {
                // SUB
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a - b)?;
            }
            0x04 => {
                // DIV
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let res = if b.is_zero() { Word::zero() } else { a / b };
                self.stack.push(res)?;
            }
            0x05 => {
                // SDIV
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a.sdiv(b))?;
            }
            0x06 => {
                // MOD
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let res = if b.is_zero() { Word::zero() } else { a % b };
                self.stack.push(res)?;
            }
            0x07 => {
                // SMOD
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a.smod(b))?;
            }
            0x08 => {
                // ADDMOD
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let modulo = self.stack.pop()?;
                self.stack.push(a.add_mod(&b, &modulo))?;
            }
            0x09 => {
                // MULMOD
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                let modulo = self.stack.pop()?;
                self.stack.push(a.mul_mod(&b, &modulo))?;
            }
            0x0a => {
                // EXP
                let base = self.stack.pop()?;
                let exponent = self.stack.pop()?;
                self.stack.push(base.pow(exponent))?;
            }
            0x0b => {
                // SIGNEXTEND
                let index = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(value.sign_extend(index))?;
            }

            // 0x10s: comparison and bitwise logic
            0x10 => {
                // LT
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.push_bool(a < b)?;
            }
            0x11 => {
                // GT
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.push_bool(a > b)?;
            }
            0x12 => {
                // SLT
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.push_bool(a.slt(&b))?;
            }
            0x13 => {
                // SGT
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.push_bool(a.sgt(&b))?;
            }
            0x14 => {
                // EQ
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.push_bool(a == b)?;
            }
            0x15 => {
                // ISZERO
                let a = self.stack.pop()?;
                self.push_bool(a.is_zero())?;
            }
            0x16 => {
                // AND
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a & b)?;
            }
            0x17 => {
                // OR
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a | b)?;
            }
            0x18 => {
                // XOR
                let a = self.stack.pop()?;
                let b = self.stack.pop()?;
                self.stack.push(a ^ b)?;
            }
            0x19 => {
                // NOT
                let a = self.stack.pop()?;
                self.stack.push(!a)?;
            }
            0x1a => {
                // BYTE
                let index = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(value.byte_at(index))?;
            }
            0x1b => {
                // SHL
                let shift = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(value.shl_by(shift))?;
            }
            0x1c => {
                // SHR
                let shift = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(value.shr_by(shift))?;
            }
            0x1d => {
                // SAR
                let shift = self.stack.pop()?;
                let value = self.stack.pop()?;
                self.stack.push(value.sar_by(shift))?;
            }

            0x20 => {
                // SHA3
                let offset = self.pop_usize()?;
                let size = self.pop_usize()?;
                let data = self.memory.read(offset, size)?;
                self.stack.push(Word::from_bytes(&keccak256(&data)))?;
            }

            // 0x30s: environment
            0x30 => {
                // ADDRESS
                self.stack.push(self.msg.target.as_word())?;
            }
            0x31 => {
                // BALANCE
                let address = Address::from(&self.stack.pop()?);
                self.stack.push(state.balance(&address)?)?;
            }
            0x32 => {
                // ORIGIN
                self.stack.push(state.tx.origin.as_word())?;
            }
            0x33 => {
                // CALLER
                self.stack.push(self.msg.caller.as_word())?;
            }
            0x34 => {
                // CALLVALUE
                self.stack.push(self.msg.value)?;
            }
            0x35 => {
                // CALLDATALOAD
                let offset = self.stack.pop()?;
                let word = padded_slice(&self.msg.data, offset, 32);
                self.stack.push(Word::from_bytes(&word))?;
            }
            0x36 => {
                // CALLDATASIZE
                self.stack.push(Word::from(self.msg.data.len()))?;
            }
            0x37 => {
                // CALLDATACOPY
                let dest = self.pop_usize()?;
                let offset = self.stack.pop()?;
                let size = self.pop_usize()?;
                let data = padded_slice(&self.msg.data, offset, size);
                self.memory.write(dest, &data)?;
            }
            0x38 => {
                // CODESIZE
                self.stack.push(Word::from(self.code.raw.len()))?;
            }
            0x39 => {
                // CODECOPY
                let dest = self.pop_usize()?;
                let offset = self.stack.pop()?;
                let size = self.pop_usize()?;
                let code = self.code.clone();
                let data = padded_slice(&code.raw, offset, size);
                self.memory.write(dest, &data)?;
            }
            0x3a => {
                // GASPRICE
                self.stack.push(state.tx.gas_price)?;
            }
            0x3b => {
                // EXTCODESIZE
                let address = Address::from(&self.stack.pop()?);
                self.stack.push(Word::from(state.code(&address)?.len()))?;
            }
            0x3c => {
                // EXTCODECOPY
                let address = Address::from(&self.stack.pop()?);
                let dest = self.pop_usize()?;
                let offset = self.stack.pop()?;
                let size = self.pop_usize()?;
                let code = state.code(&address)?;
                let data = padded_slice(&code, offset, size);
                self.memory.write(dest, &data)?;
            }
            0x3d => {
                // RETURNDATASIZE
                self.stack.push(Word::from(self.return_data.len()))?;
            }
            0x3e => {
                // RETURNDATACOPY: unlike the other copies, reading past the
                // buffer is a halting error
                let dest = self.pop_usize()?;
                let offset = self.pop_usize()?;
                let size = self.pop_usize()?;
                let end = offset
                    .checked_add(size)
                    .ok_or(VmError::OutOfMemory(usize::MAX))?;
                if end > self.return_data.len() {
                    return Err(VmError::OutOfBoundsRead {
                        end,
                        size: self.return_data.len(),
                    });
                }
                let data = self.return_data[offset..end].to_vec();
                self.memory.write(dest, &data)?;
            }
            0x3f => {
                // EXTCODEHASH: zero for absent and for empty accounts
                let address = Address::from(&self.stack.pop()?);
                let hash = if !state.account_exists(&address)?
                    || state.account_is_empty(&address)?
                {
                    Word::zero()
                } else {
                    state.code_hash(&address)?
                };
                self.stack.push(hash)?;
            }

            // 0x40s: block
            0x40 => {
                // BLOCKHASH: no header history is kept, every block reads zero
                let _number = self.stack.pop()?;
                self.stack.push(Word::zero())?;
            }
            0x41 => {
                // COINBASE
                self.stack.push(state.block.coinbase.as_word())?;
            }
            0x42 => {
                // TIMESTAMP
                self.stack.push(state.block.timestamp)?;
            }
            0x43 => {
                // NUMBER
                self.stack.push(state.block.number)?;
            }
            0x44 => {
                // PREVRANDAO
                self.stack.push(state.block.prevrandao)?;
            }
            0x45 => {
                // GASLIMIT
                self.stack.push(state.block.gas_limit)?;
            }
            0x46 => {
                // CHAINID
                self.stack.push(state.block.chain_id)?;
            }
            0x47 => {
                // SELFBALANCE
                self.stack.push(state.balance(&self.msg.target)?)?;
            }
            0x48 => {
                // BASEFEE
                self.stack.push(state.block.base_fee)?;
            }
            0x49 => {
                // BLOBHASH
                let index = self.stack.pop()?;
                let hash = index
                    .to_usize()
                    .and_then(|index| state.block.blob_hashes.get(index).copied())
                    .unwrap_or_default();
                self.stack.push(hash)?;
            }
            0x4a => {
                // BLOBBASEFEE
                self.stack.push(state.block.blob_base_fee)?;
            }

            // 0x50s: stack, memory, storage and flow
            0x50 => {
                // POP
                self.stack.pop()?;
            }
            0x51 => {
                // MLOAD
                let offset = self.pop_usize()?;
                let word = self.memory.read(offset, 32)?;
                self.stack.push(Word::from_bytes(&word))?;
            }
            0x52 => {
                // MSTORE
                let offset = self.pop_usize()?;
                let value = self.stack.pop()?;
                self.memory.write(offset, &value.into_bytes())?;
            }
            0x53 => {
                // MSTORE8
                let offset = self.pop_usize()?;
                let value = self.stack.pop()?;
                self.memory.write_byte(offset, value.into_bytes()[31])?;
            }
            0x54 => {
                // SLOAD
                let slot = self.stack.pop()?;
                let value = state.storage(&self.msg.target, &slot)?;
                self.stack.push(value)?;
                self.tracer.record(Event {
                    data: EventData::StorageRead {
                        address: self.msg.target,
                        slot,
                        value,
                    },
                    depth: self.msg.depth,
                    reverted: false,
                });
            }
            0x55 => {
                // SSTORE
                self.ensure_writable()?;
                let slot = self.stack.pop()?;
                let value = self.stack.pop()?;
                state.set_storage(&self.msg.target, slot, value);
                self.tracer.record(Event {
                    data: EventData::StorageWrite {
                        address: self.msg.target,
                        slot,
                        value,
                    },
                    depth: self.msg.depth,
                    reverted: false,
                });
            }
            0x56 => {
                // JUMP
                let dest = self.stack.pop()?;
                self.pc = self.jump_target(dest)?;
                advance = false;
            }
            0x57 => {
                // JUMPI
                let dest = self.stack.pop()?;
                let condition = self.stack.pop()?;
                if !condition.is_zero() {
                    self.pc = self.jump_target(dest)?;
                    advance = false;
                }
            }
            0x58 => {
                // PC
                self.stack.push(Word::from(instruction.offset))?;
            }
            0x59 => {
                // MSIZE
                self.stack.push(Word::from(self.memory.len()))?;
            }
            0x5a => {
                // GAS: unmetered; the block gas limit stands in as a
                // deterministic sentinel
                self.stack.push(state.block.gas_limit)?;
            }
            0x5b => {
                // JUMPDEST
            }
            0x5c => {
                // TLOAD
                let slot = self.stack.pop()?;
                let value = state.transient_storage(&self.msg.target, &slot);
                self.stack.push(value)?;
            }
            0x5d => {
                // TSTORE
                self.ensure_writable()?;
                let slot = self.stack.pop()?;
                let value = self.stack.pop()?;
                state.set_transient_storage(self.msg.target, slot, value);
            }
            0x5e => {
                // MCOPY
                let dest = self.pop_usize()?;
                let src = self.pop_usize()?;
                let len = self.pop_usize()?;
                self.memory.copy(dest, src, len)?;
            }
            0x5f => {
                // PUSH0
                self.stack.push(Word::zero())?;
            }
            0x60..=0x7f => {
                // PUSH1..=PUSH32
                let immediate = instruction.immediate.as_deref().unwrap_or(&[]);
                self.stack.push(Word::from_bytes(immediate))?;
            }
            0x80..=0x8f => {
                // DUP1..=DUP16
                self.stack.dup(instruction.opcode.n as usize)?;
            }
            0x90..=0x9f => {
                // SWAP1..=SWAP16
                self.stack.swap(instruction.opcode.n as usize)?;
            }
            0xa0..=0xa4 => {
                // LOG0..=LOG4
                self.ensure_writable()?;
                let offset = self.pop_usize()?;
                let size = self.pop_usize()?;
                let data = self.memory.read(offset, size)?;
                let mut topics = Vec::with_capacity(instruction.opcode.n as usize);
                for _ in 0..instruction.opcode.n {
                    topics.push(self.stack.pop()?);
                }
                let log = Log {
                    address: self.msg.target,
                    topics,
                    data,
                };
                self.tracer.record(Event {
                    data: EventData::Log(log.clone()),
                    depth: self.msg.depth,
                    reverted: false,
                });
                self.logs.push(log);
            }

            // 0xf0s: system
            0xf0 => {
                // CREATE
                self.op_create(state, false)?;
            }
            0xf1 => {
                // CALL
                self.op_call(state, CallScheme::Call)?;
            }
            0xf2 => {
                // CALLCODE
                self.op_call(state, CallScheme::Code)?;
            }
            0xf3 => {
                // RETURN
                let offset = self.pop_usize()?;
                let size = self.pop_usize()?;
                self.output = self.memory.read(offset, size)?;
                self.halted = true;
            }
            0xf4 => {
                // DELEGATECALL
                self.op_call(state, CallScheme::Delegate)?;
            }
            0xf5 => {
                // CREATE2
                self.op_create(state, true)?;
            }
            0xfa => {
                // STATICCALL
                self.op_call(state, CallScheme::Static)?;
            }
            0xfd => {
                // REVERT: halts with data, recoverable by the caller
                let offset = self.pop_usize()?;
                let size = self.pop_usize()?;
                self.output = self.memory.read(offset, size)?;
                return Err(VmError::Revert);
            }
            0xff => {
                // SELFDESTRUCT
                self.op_selfdestruct(state)?;
            }
            byte => {
                // INVALID and every unassigned byte
                return Err(VmError::InvalidInstruction(byte));
            }
        }

        if advance {
            self.pc += 1;
        }
        Ok(())
    }

    //
    // sub-calls
    //

    fn op_call<B: Backend>(
        &mut self,
        state: &mut State<B>,
        scheme: CallScheme,
    ) -> Result<(), VmError> {
        let _gas = self.stack.pop()?;
        let to = Address::from(&self.stack.pop()?);
        let value = match scheme {
            CallScheme::Call | CallScheme::Code => self.stack.pop()?,
            CallScheme::Delegate => self.msg.value,
            _ => Word::zero(),
        };
        if scheme == CallScheme::Call && self.msg.is_static && !value.is_zero() {
            return Err(VmError::WriteProtection);
        }
        let in_offset = self.pop_usize()?;
        let in_size = self.pop_usize()?;
        let out_offset = self.pop_usize()?;
        let out_size = self.pop_usize()?;

        // both windows expand up front, before the child observes memory
        self.memory.extend(out_offset, out_size)?;
        let data = self.memory.read(in_offset, in_size)?;

        // CALLCODE and DELEGATECALL run the foreign code against this
        // frame's own storage; DELEGATECALL keeps the original caller too
        let (caller, target, transfers_value) = match scheme {
            CallScheme::Call => (self.msg.target, to, true),
            CallScheme::Code => (self.msg.target, self.msg.target, true),
            CallScheme::Delegate => (self.msg.caller, self.msg.target, false),
            _ => (self.msg.target, to, false),
        };
        let is_static = self.msg.is_static || scheme == CallScheme::Static;

        // recoverable pre-flight failures: push 0 and carry on
        if self.msg.depth + 1 > CALL_DEPTH_LIMIT {
            tracing::debug!(depth = self.msg.depth, "call depth exceeded");
            self.return_data.clear();
            return self.stack.push(Word::zero());
        }
        if transfers_value && !value.is_zero() && state.balance(&caller)? < value {
            tracing::debug!(%caller, value = %value, "insufficient balance for call");
            self.return_data.clear();
            return self.stack.push(Word::zero());
        }

        self.tracer.record(Event {
            data: EventData::Call {
                scheme: scheme.clone(),
                from: caller,
                to,
                value,
            },
            depth: self.msg.depth,
            reverted: false,
        });

        let msg = Message {
            caller,
            target,
            code_address: to,
            value,
            data,
            code: state.code(&to)?,
            depth: self.msg.depth + 1,
            is_static,
            is_create: false,
            transfers_value,
        };
        let child = Computation::apply_message(state, msg, self.tracer.fork());
        self.absorb_call_result(child, out_offset, out_size)
    }

    fn absorb_call_result(
        &mut self,
        mut child: Computation<T>,
        out_offset: usize,
        out_size: usize,
    ) -> Result<(), VmError> {
        let success = child.is_success();
        let output = child.take_output();
        let reverted = !success;

        if success {
            self.logs.append(&mut child.logs);
        }
        self.tracer.join(child.tracer, reverted);

        let window = out_size.min(output.len());
        if window > 0 {
            self.memory.write(out_offset, &output[..window])?;
        }
        self.return_data = output;
        self.push_bool(success)
    }

    fn op_create<B: Backend>(
        &mut self,
        state: &mut State<B>,
        is_create2: bool,
    ) -> Result<(), VmError> {
        self.ensure_writable()?;
        let value = self.stack.pop()?;
        let offset = self.pop_usize()?;
        let size = self.pop_usize()?;
        let salt = if is_create2 {
            Some(self.stack.pop()?)
        } else {
            None
        };
        let initcode = self.memory.read(offset, size)?;

        if self.msg.depth + 1 > CALL_DEPTH_LIMIT {
            self.return_data.clear();
            return self.stack.push(Word::zero());
        }
        let sender = self.msg.target;
        if state.balance(&sender)? < value {
            self.return_data.clear();
            return self.stack.push(Word::zero());
        }

        let created = match &salt {
            Some(salt) => sender.create2(salt, &initcode),
            None => sender.create(state.nonce(&sender)?),
        };
        if state.has_code_or_nonce(&created)? {
            // address collision fails the create before any code runs
            tracing::debug!(address = %created, "creation collision");
            self.return_data.clear();
            return self.stack.push(Word::zero());
        }

        self.tracer.record(Event {
            data: EventData::Call {
                scheme: if salt.is_some() {
                    CallScheme::Create2
                } else {
                    CallScheme::Create
                },
                from: sender,
                to: created,
                value,
            },
            depth: self.msg.depth,
            reverted: false,
        });

        let msg = Message {
            caller: sender,
            target: created,
            code_address: created,
            value,
            data: Vec::new(),
            code: initcode,
            depth: self.msg.depth + 1,
            is_static: false,
            is_create: true,
            transfers_value: true,
        };
        let mut child = Computation::apply_create_message(state, msg, self.tracer.fork());

        let success = child.is_success();
        let output = child.take_output();
        if success {
            self.logs.append(&mut child.logs);
        }
        self.tracer.join(child.tracer, !success);

        if success {
            state.increment_nonce(&sender)?;
            self.tracer.record(Event {
                data: EventData::Created { address: created },
                depth: self.msg.depth,
                reverted: false,
            });
            self.return_data.clear();
            self.stack.push(created.as_word())
        } else {
            // only a REVERT hands data back from a failed create
            self.return_data = output;
            self.stack.push(Word::zero())
        }
    }

    fn op_selfdestruct<B: Backend>(&mut self, state: &mut State<B>) -> Result<(), VmError> {
        self.ensure_writable()?;
        let beneficiary = Address::from(&self.stack.pop()?);
        let contract = self.msg.target;

        let balance = state.balance(&contract)?;
        if beneficiary != contract && !balance.is_zero() {
            state.set_balance(&contract, Word::zero())?;
            let credit = state.balance(&beneficiary)?;
            state.set_balance(&beneficiary, credit + balance)?;
        }

        // EIP-6780: only contracts born in this transaction actually die;
        // everything else just surrenders its balance
        if state.created_in_transaction(&contract) {
            state.delete_account(&contract)?;
        }

        self.output.clear();
        self.halted = true;
        Ok(())
    }

    //
    // helpers
    //

    fn push_bool(&mut self, value: bool) -> Result<(), VmError> {
        let word = if value { Word::one() } else { Word::zero() };
        self.stack.push(word)
    }

    fn pop_usize(&mut self) -> Result<usize, VmError> {
        let word = self.stack.pop()?;
        word.to_usize().ok_or(VmError::OutOfMemory(usize::MAX))
    }

    fn jump_target(&self, dest: Word) -> Result<usize, VmError> {
        let offset = dest
            .to_usize()
            .ok_or(VmError::InvalidJumpDestination(usize::MAX))?;
        self.code
            .jump_target(offset)
            .ok_or(VmError::InvalidJumpDestination(offset))
    }

    fn ensure_writable(&self) -> Result<(), VmError> {
        if self.msg.is_static {
            Err(VmError::StaticViolation)
        } else {
            Ok(())
        }
    }
}

/// Copy `size` bytes of `source` starting at `offset`, zero-filling past
/// its end; CALLDATACOPY/CODECOPY/EXTCODECOPY semantics.
fn padded_slice(source: &[u8], offset: Word, size: usize) -> Vec<u8> {
    let mut out = vec![0u8; size];
    if let Some(offset) = offset.to_usize() {
        if offset < source.len() {
            let n = size.min(source.len() - offset);
            out[..n].copy_from_slice(&source[offset..offset + n]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_slice() {
        let source = [1u8, 2, 3];
        assert_eq!(padded_slice(&source, Word::zero(), 2), vec![1, 2]);
        assert_eq!(padded_slice(&source, Word::from(2u64), 3), vec![3, 0, 0]);
        assert_eq!(padded_slice(&source, Word::from(9u64), 2), vec![0, 0]);
        assert_eq!(padded_slice(&source, Word::max(), 2), vec![0, 0]);
        assert_eq!(padded_slice(&source, Word::zero(), 0), Vec::<u8>::new());
    }
}
