pub mod common;
pub mod computation;
pub mod db;
pub mod decoder;
pub mod errors;
pub mod eth;
pub mod memory;
pub mod opcodes;
pub mod precompiles;
pub mod stack;
pub mod state;
pub mod tracer;

use common::{address::Address, call::Message, word::Word};
use computation::{Computation, Log};
use db::{Backend, StateDiff};
use errors::VmError;
use state::{State, TxContext};
use tracer::{EventTracer, NoopTracer};

/// What one transaction did: halting status, the root frame's output (the
/// deployed code for creations), the emitted logs, the pending state
/// mutations, and for creations the new contract's address.
pub struct Outcome {
    pub success: bool,
    pub output: Vec<u8>,
    pub logs: Vec<Log>,
    pub state_diff: StateDiff,
    pub address: Option<Address>,
    pub error: Option<VmError>,
}

/// Execute one transaction against `state`. A zero `to` address means
/// contract creation with `code` as the initcode; for calls an empty `code`
/// falls back to the target's stored code. Nothing is persisted — the diff
/// reports what a subsequent `state.persist()` would flush.
pub fn execute_bytecode<B: Backend>(
    state: &mut State<B>,
    sender: Address,
    to: Address,
    value: Word,
    data: Vec<u8>,
    code: Vec<u8>,
) -> eyre::Result<Outcome> {
    let (outcome, _tracer) =
        execute_bytecode_traced::<B, NoopTracer>(state, sender, to, value, data, code)?;
    Ok(outcome)
}

/// `execute_bytecode` with an event tracer observing the run.
pub fn execute_bytecode_traced<B: Backend, T: EventTracer>(
    state: &mut State<B>,
    sender: Address,
    to: Address,
    value: Word,
    data: Vec<u8>,
    code: Vec<u8>,
) -> eyre::Result<(Outcome, T)> {
    let gas_price = state.block.base_fee;
    state.reset_transaction(TxContext {
        origin: sender,
        gas_price,
    });

    let is_create = to.is_zero();
    let (target, code) = if is_create {
        let nonce = state.nonce(&sender)?;
        (sender.create(nonce), code)
    } else if code.is_empty() {
        (to, state.code(&to)?)
    } else {
        (to, code)
    };

    if is_create && state.has_code_or_nonce(&target)? {
        state.finish_transaction();
        return Ok((
            Outcome {
                success: false,
                output: Vec::new(),
                logs: Vec::new(),
                state_diff: StateDiff::default(),
                address: None,
                error: Some(VmError::CreationCollision(target)),
            },
            T::default(),
        ));
    }

    let msg = Message {
        caller: sender,
        target,
        code_address: target,
        value,
        data,
        code,
        depth: 0,
        is_static: false,
        is_create,
        transfers_value: true,
    };

    let mut computation = if is_create {
        Computation::apply_create_message(state, msg, T::default())
    } else {
        Computation::apply_message(state, msg, T::default())
    };

    let success = computation.is_success();
    if success && is_create {
        state.increment_nonce(&sender)?;
    }

    let state_diff = if success {
        state.pending_diff()?
    } else {
        StateDiff::default()
    };
    let logs = if success {
        std::mem::take(&mut computation.logs)
    } else {
        Vec::new()
    };

    state.finish_transaction();

    let outcome = Outcome {
        success,
        output: computation.take_output(),
        logs,
        state_diff,
        address: (success && is_create).then_some(target),
        error: computation.error,
    };
    Ok((outcome, computation.tracer))
}
