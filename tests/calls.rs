mod util;

use armature::common::{Word, call::Message, word};
use armature::computation::Computation;
use armature::errors::VmError;
use armature::execute_bytecode;
use armature::tracer::NoopTracer;
use util::*;

/// CALL with zeroed memory windows, then store the status word at mem[0].
fn call_and_store_status(asm: Asm, callee: &armature::common::Address, value: u64) -> Asm {
    asm.push(0) // ret size
        .push(0) // ret offset
        .push(0) // args size
        .push(0) // args offset
        .push(value)
        .push_addr(callee)
        .push(0xffff) // gas, ignored by the engine
        .op(CALL)
        .push(0)
        .op(MSTORE)
}

#[test]
fn test_revert_propagation() {
    // child stores to slot 1, then reverts with the word 42
    let child = Asm::new()
        .push(0x07)
        .push(1)
        .op(SSTORE)
        .push(0x2a)
        .push(0)
        .op(MSTORE)
        .push(32)
        .push(0)
        .op(REVERT)
        .build();

    // parent calls the child, then returns status, RETURNDATASIZE and the
    // copied revert payload
    let parent = call_and_store_status(Asm::new(), &OTHER, 0)
        .op(RETURNDATASIZE)
        .push(32)
        .op(MSTORE)
        .push(32) // size
        .push(0) // returndata offset
        .push(64) // memory dest
        .op(RETURNDATACOPY)
        .push(96)
        .push(0)
        .op(RETURN)
        .build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &parent).unwrap();
    state.set_code(&OTHER, &child).unwrap();

    let outcome = execute_bytecode(
        &mut state,
        SENDER,
        CONTRACT,
        Word::zero(),
        vec![],
        vec![],
    )
    .unwrap();

    assert!(outcome.success);
    assert_eq!(
        output_words(&outcome),
        vec![Word::zero(), Word::from(32u64), word("0x2a")]
    );
    // the child's storage write did not survive its revert
    assert_eq!(state.storage(&OTHER, &Word::one()).unwrap(), Word::zero());
}

#[test]
fn test_static_violation_fails_the_callee() {
    let child = Asm::new().push(1).push(1).op(SSTORE).build();
    let parent = Asm::new()
        .push(0) // ret size
        .push(0) // ret offset
        .push(0) // args size
        .push(0) // args offset
        .push_addr(&OTHER)
        .push(0xffff)
        .op(STATICCALL)
        .push(0)
        .op(MSTORE)
        .push(32)
        .push(0)
        .op(RETURN)
        .build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &parent).unwrap();
    state.set_code(&OTHER, &child).unwrap();

    let outcome = execute_bytecode(
        &mut state,
        SENDER,
        CONTRACT,
        Word::zero(),
        vec![],
        vec![],
    )
    .unwrap();

    assert!(outcome.success);
    assert_eq!(output_words(&outcome), vec![Word::zero()]);
    assert_eq!(state.storage(&OTHER, &Word::one()).unwrap(), Word::zero());
}

#[test]
fn test_nonzero_value_call_in_static_context_write_protects() {
    // OTHER tries a value-bearing CALL while executing under STATICCALL
    let child = call_and_store_status(Asm::new(), &CONTRACT, 1).build();
    let parent = Asm::new()
        .push(0)
        .push(0)
        .push(0)
        .push(0)
        .push_addr(&OTHER)
        .push(0xffff)
        .op(STATICCALL)
        .push(0)
        .op(MSTORE)
        .push(32)
        .push(0)
        .op(RETURN)
        .build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &parent).unwrap();
    state.set_code(&OTHER, &child).unwrap();
    state.set_balance(&OTHER, Word::from(10u64)).unwrap();

    let outcome = execute_bytecode(
        &mut state,
        SENDER,
        CONTRACT,
        Word::zero(),
        vec![],
        vec![],
    )
    .unwrap();

    // the WriteProtection halt surfaces to the parent as a failed subcall
    assert!(outcome.success);
    assert_eq!(output_words(&outcome), vec![Word::zero()]);
}

#[test]
fn test_delegatecall_writes_caller_storage_and_keeps_caller() {
    // library stores CALLER at slot 0 of whatever storage it runs against
    let library = Asm::new().op(CALLER).push(0).op(SSTORE).build();
    let parent = Asm::new()
        .push(0)
        .push(0)
        .push(0)
        .push(0)
        .push_addr(&OTHER)
        .push(0xffff)
        .op(DELEGATECALL)
        .op(STOP)
        .build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &parent).unwrap();
    state.set_code(&OTHER, &library).unwrap();

    let outcome = execute_bytecode(
        &mut state,
        SENDER,
        CONTRACT,
        Word::zero(),
        vec![],
        vec![],
    )
    .unwrap();

    assert!(outcome.success);
    // storage landed on the caller, with the original sender preserved
    assert_eq!(
        state.storage(&CONTRACT, &Word::zero()).unwrap(),
        SENDER.as_word()
    );
    assert_eq!(state.storage(&OTHER, &Word::zero()).unwrap(), Word::zero());
}

#[test]
fn test_call_transfers_value() {
    let parent = call_and_store_status(Asm::new(), &OTHER, 5)
        .push(32)
        .push(0)
        .op(RETURN)
        .build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &parent).unwrap();
    state.set_balance(&CONTRACT, Word::from(9u64)).unwrap();

    let outcome = execute_bytecode(
        &mut state,
        SENDER,
        CONTRACT,
        Word::zero(),
        vec![],
        vec![],
    )
    .unwrap();

    assert!(outcome.success);
    assert_eq!(output_words(&outcome), vec![Word::one()]);
    assert_eq!(state.balance(&CONTRACT).unwrap(), Word::from(4u64));
    assert_eq!(state.balance(&OTHER).unwrap(), Word::from(5u64));
}

#[test]
fn test_insufficient_balance_pushes_zero_without_reverting() {
    let parent = call_and_store_status(Asm::new(), &OTHER, 50)
        .push(32)
        .push(0)
        .op(RETURN)
        .build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &parent).unwrap();
    state.set_balance(&CONTRACT, Word::from(9u64)).unwrap();

    let outcome = execute_bytecode(
        &mut state,
        SENDER,
        CONTRACT,
        Word::zero(),
        vec![],
        vec![],
    )
    .unwrap();

    assert!(outcome.success);
    assert_eq!(output_words(&outcome), vec![Word::zero()]);
    assert_eq!(state.balance(&CONTRACT).unwrap(), Word::from(9u64));
    assert_eq!(state.balance(&OTHER).unwrap(), Word::zero());
}

#[test]
fn test_call_depth_limit_pushes_zero() {
    let code = call_and_store_status(Asm::new(), &OTHER, 0)
        .push(32)
        .push(0)
        .op(RETURN)
        .build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &code).unwrap();

    // a frame already sitting at the depth limit cannot spawn children
    let msg = Message {
        caller: SENDER,
        target: CONTRACT,
        code_address: CONTRACT,
        value: Word::zero(),
        data: vec![],
        code,
        depth: 1024,
        is_static: false,
        is_create: false,
        transfers_value: true,
    };
    let computation = Computation::<NoopTracer>::apply_message(&mut state, msg, NoopTracer);
    assert!(computation.is_success());
    assert_eq!(Word::from_bytes(computation.output()), Word::zero());
}

#[test]
fn test_precompile_call_sets_return_data() {
    // CALL into 0x04 (identity) copies the input straight back
    let identity = armature::common::addr("0x0000000000000000000000000000000000000004");
    let code = Asm::new()
        .push(0x2a)
        .push(0)
        .op(MSTORE)
        .push(32) // ret size
        .push(32) // ret offset
        .push(32) // args size
        .push(0) // args offset
        .push(0) // value
        .push_addr(&identity)
        .push(0xffff)
        .op(CALL)
        .push(0)
        .op(MSTORE)
        .op(RETURNDATASIZE)
        .push(64)
        .op(MSTORE)
        .push(96)
        .push(0)
        .op(RETURN)
        .build();

    let (outcome, _) = run_code(code, vec![]);
    assert!(outcome.success);
    assert_eq!(
        output_words(&outcome),
        vec![Word::one(), word("0x2a"), Word::from(32u64)]
    );
}

#[test]
fn test_selfdestruct_of_preexisting_contract_only_moves_balance() {
    let code = Asm::new().push_addr(&OTHER).op(SELFDESTRUCT).build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &code).unwrap();
    state.set_balance(&CONTRACT, Word::from(10u64)).unwrap();

    let outcome = execute_bytecode(
        &mut state,
        SENDER,
        CONTRACT,
        Word::zero(),
        vec![],
        vec![],
    )
    .unwrap();

    assert!(outcome.success);
    assert_eq!(state.balance(&CONTRACT).unwrap(), Word::zero());
    assert_eq!(state.balance(&OTHER).unwrap(), Word::from(10u64));
    // the account itself survives: it predates the transaction
    assert!(state.account_exists(&CONTRACT).unwrap());
    assert!(!state.code(&CONTRACT).unwrap().is_empty());
}

#[test]
fn test_selfdestruct_of_account_created_this_transaction_deletes_it() {
    let code = Asm::new().push_addr(&OTHER).op(SELFDESTRUCT).build();

    let mut state = fresh_state();
    state.set_code(&CONTRACT, &code).unwrap();
    state.set_balance(&CONTRACT, Word::from(10u64)).unwrap();
    state.mark_created(CONTRACT);

    let msg = Message {
        caller: SENDER,
        target: CONTRACT,
        code_address: CONTRACT,
        value: Word::zero(),
        data: vec![],
        code,
        depth: 0,
        is_static: false,
        is_create: false,
        transfers_value: true,
    };
    let computation = Computation::<NoopTracer>::apply_message(&mut state, msg, NoopTracer);

    assert!(computation.is_success());
    assert!(!state.account_exists(&CONTRACT).unwrap());
    assert_eq!(state.balance(&OTHER).unwrap(), Word::from(10u64));
}

#[test]
fn test_static_violation_error_kind() {
    // a direct static frame running SSTORE reports StaticViolation
    let code = Asm::new().push(1).push(1).op(SSTORE).build();
    let mut state = fresh_state();
    let msg = Message {
        caller: SENDER,
        target: CONTRACT,
        code_address: CONTRACT,
        value: Word::zero(),
        data: vec![],
        code,
        depth: 0,
        is_static: true,
        is_create: false,
        transfers_value: false,
    };
    let computation = Computation::<NoopTracer>::apply_message(&mut state, msg, NoopTracer);
    assert!(matches!(
        computation.error,
        Some(VmError::StaticViolation)
    ));
}
