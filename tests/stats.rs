//! Instrumentation properties, run in their own process so symbols this
//! binary never executes stay at zero. Tests that assert on counters each
//! use an opcode no other test here touches.

mod common;

use ethereum_types::U256;

use common::{frame, test_evm, TestHost, TestState};
use evm_interpreter::instructions::{make_dup, op_gas, op_xor};
use evm_interpreter::interpreter::{Config, Interpreter};
use evm_interpreter::stats::{get_bytecode_info_stats, snapshot, StatId, SYMBOLS};

#[test]
fn unexecuted_symbols_export_zeros() {
    let exported = get_bytecode_info_stats();
    let parsed: serde_json::Value = serde_json::from_str(&exported).expect("export must parse");
    // Nothing in this binary runs SELFDESTRUCT.
    assert_eq!(parsed["selfdestruct ns"], "0");
    assert_eq!(parsed["selfdestruct min ns"], "0");
    assert_eq!(parsed["selfdestruct max ns"], "0");
    assert_eq!(parsed["selfdestructCount"], "0");
    assert_eq!(parsed["selfdestruct gas"], "0");
}

#[test]
fn counts_track_invocations_exactly() {
    let mut evm = test_evm(TestState::default(), TestHost::default());
    let mut interpreter = Interpreter::new(&mut evm, Config::default(), false);
    let mut scope = frame(&[]);
    scope.contract.gas = 1;

    let n = 5i64;
    for _ in 0..n {
        let mut pc = 0u64;
        op_gas(&mut pc, &mut interpreter, &mut scope);
    }
    let stat = snapshot(StatId::Gas);
    assert_eq!(stat.count, n);
    assert!(stat.ns_total >= 0);
    assert!(stat.ns_min <= stat.ns_max);
}

#[test]
fn factories_measure_construction_not_invocation() {
    let mut evm = test_evm(TestState::default(), TestHost::default());
    let mut interpreter = Interpreter::new(&mut evm, Config::default(), false);
    let mut scope = frame(&[]);

    let dup3 = make_dup(3);
    assert_eq!(snapshot(StatId::MakeDup).count, 1);

    scope.stack.push(U256::from(1));
    scope.stack.push(U256::from(2));
    scope.stack.push(U256::from(3));
    let mut pc = 0u64;
    dup3(&mut pc, &mut interpreter, &mut scope);
    dup3(&mut pc, &mut interpreter, &mut scope);
    // Running the built closure charges nothing further.
    assert_eq!(snapshot(StatId::MakeDup).count, 1);
}

#[test]
fn export_reflects_executed_opcodes() {
    let mut evm = test_evm(TestState::default(), TestHost::default());
    let mut interpreter = Interpreter::new(&mut evm, Config::default(), false);
    let mut scope = frame(&[]);

    scope.stack.push(U256::from(0b1100));
    scope.stack.push(U256::from(0b1010));
    let mut pc = 0u64;
    op_xor(&mut pc, &mut interpreter, &mut scope);
    assert_eq!(scope.stack.pop(), U256::from(0b0110));

    let parsed: serde_json::Value =
        serde_json::from_str(&get_bytecode_info_stats()).expect("export must parse");
    assert_eq!(parsed["xorCount"], "1");
    let total: i64 = parsed["xor ns"].as_str().unwrap().parse().unwrap();
    let min: i64 = parsed["xor min ns"].as_str().unwrap().parse().unwrap();
    let max: i64 = parsed["xor max ns"].as_str().unwrap().parse().unwrap();
    assert!(total >= 0);
    assert!(min <= max);
    // Gas columns are reserved and never written.
    assert_eq!(parsed["xor gas"], "0");
    assert_eq!(parsed["xor min gas"], "0");
    assert_eq!(parsed["xor max gas"], "0");
}

#[test]
fn export_key_order_follows_the_symbol_table() {
    let exported = get_bytecode_info_stats();
    assert!(exported.starts_with("{\"add ns\""));
    assert!(exported.ends_with("\"}"));
    assert!(!exported.contains(",}"));

    let mut last = 0;
    for symbol in SYMBOLS {
        let key = format!("\"{symbol}Count\"");
        let at = exported.find(&key).unwrap_or_else(|| panic!("missing {key}"));
        assert!(at > last, "{symbol} out of order");
        last = at;
    }
}
