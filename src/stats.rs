//! Per-opcode timing counters.
//!
//! One process-wide table, one record per instrumented symbol: the opcode
//! handlers plus the four table-construction factories. Updates are
//! best-effort atomics (relaxed adds, compare-and-swap loops for the
//! bounds), so concurrent frames may occasionally lose an update; the
//! accounting is diagnostic, not consensus-relevant.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Instant;

use once_cell::sync::Lazy;

/// Export names of every instrumented symbol, in export order.
pub const SYMBOLS: [&str; 77] = [
    "add",
    "sub",
    "mul",
    "div",
    "sdiv",
    "mod",
    "smod",
    "exp",
    "signExtend",
    "not",
    "lt",
    "gt",
    "slt",
    "sgt",
    "eq",
    "isZero",
    "and",
    "or",
    "xor",
    "byte",
    "addmod",
    "mulmod",
    "shl",
    "shr",
    "sar",
    "keccak256",
    "address",
    "balance",
    "origin",
    "caller",
    "callValue",
    "callDataLoad",
    "callDataSize",
    "callDataCopy",
    "returnDataSize",
    "returnDataCopy",
    "extCodeSize",
    "codeSize",
    "codeCopy",
    "extCodeCopy",
    "extCodeHash",
    "gasprice",
    "blockhash",
    "coinbase",
    "timestamp",
    "number",
    "difficulty",
    "random",
    "gasLimit",
    "pop",
    "mload",
    "mstore",
    "mstore8",
    "sload",
    "sstore",
    "jump",
    "jumpi",
    "jumpdest",
    "pc",
    "msize",
    "gas",
    "create",
    "create2",
    "call",
    "callCode",
    "delegateCall",
    "staticCall",
    "return",
    "revert",
    "undefined",
    "stop",
    "selfdestruct",
    "makeLog",
    "push1",
    "makePush",
    "makeDup",
    "makeSwap",
];

/// Index into the stats table. Variant order matches [`SYMBOLS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum StatId {
    Add,
    Sub,
    Mul,
    Div,
    Sdiv,
    Mod,
    Smod,
    Exp,
    SignExtend,
    Not,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Byte,
    Addmod,
    Mulmod,
    Shl,
    Shr,
    Sar,
    Keccak256,
    Address,
    Balance,
    Origin,
    Caller,
    CallValue,
    CallDataLoad,
    CallDataSize,
    CallDataCopy,
    ReturnDataSize,
    ReturnDataCopy,
    ExtCodeSize,
    CodeSize,
    CodeCopy,
    ExtCodeCopy,
    ExtCodeHash,
    Gasprice,
    Blockhash,
    Coinbase,
    Timestamp,
    Number,
    Difficulty,
    Random,
    GasLimit,
    Pop,
    Mload,
    Mstore,
    Mstore8,
    Sload,
    Sstore,
    Jump,
    Jumpi,
    Jumpdest,
    Pc,
    Msize,
    Gas,
    Create,
    Create2,
    Call,
    CallCode,
    DelegateCall,
    StaticCall,
    Return,
    Revert,
    Undefined,
    Stop,
    Selfdestruct,
    MakeLog,
    Push1,
    MakePush,
    MakeDup,
    MakeSwap,
}

#[derive(Default)]
struct OpRecord {
    ns_total: AtomicI64,
    ns_min: AtomicI64,
    ns_max: AtomicI64,
    count: AtomicI64,
}

struct StatsTable {
    records: [OpRecord; SYMBOLS.len()],
}

static TABLE: Lazy<StatsTable> = Lazy::new(|| StatsTable {
    records: std::array::from_fn(|_| OpRecord::default()),
});

/// One record, read for export and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatSnapshot {
    pub ns_total: i64,
    pub ns_min: i64,
    pub ns_max: i64,
    pub count: i64,
}

pub fn snapshot(id: StatId) -> StatSnapshot {
    snapshot_at(id as usize)
}

fn snapshot_at(index: usize) -> StatSnapshot {
    let record = &TABLE.records[index];
    StatSnapshot {
        ns_total: record.ns_total.load(Ordering::Relaxed),
        ns_min: record.ns_min.load(Ordering::Relaxed),
        ns_max: record.ns_max.load(Ordering::Relaxed),
        count: record.count.load(Ordering::Relaxed),
    }
}

/// Run `body`, charging its wall-clock duration to `id`. Timing never
/// affects the result.
pub fn observe<T>(id: StatId, body: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let out = body();
    record(id, duration_ns(start));
    out
}

fn duration_ns(start: Instant) -> i64 {
    start.elapsed().as_nanos().min(i64::MAX as u128) as i64
}

fn record(id: StatId, dur: i64) {
    let record = &TABLE.records[id as usize];
    record.ns_total.fetch_add(dur, Ordering::Relaxed);
    record.count.fetch_add(1, Ordering::Relaxed);

    let mut current = record.ns_max.load(Ordering::Relaxed);
    while dur > current {
        match record
            .ns_max
            .compare_exchange_weak(current, dur, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => break,
            Err(seen) => current = seen,
        }
    }

    // Zero doubles as "no sample yet": the first recorded duration always
    // becomes the minimum, even when a later genuine zero-length sample
    // would re-arm it. Kept for output compatibility.
    let mut current = record.ns_min.load(Ordering::Relaxed);
    while current == 0 || dur < current {
        match record
            .ns_min
            .compare_exchange_weak(current, dur, Ordering::Relaxed, Ordering::Relaxed)
        {
            Ok(_) => break,
            Err(seen) => current = seen,
        }
    }
}

/// Serialize the whole table as one flat JSON object.
///
/// Seven keys per symbol, every value a quoted decimal. The gas columns are
/// a reserved schema slot and always read `"0"`.
pub fn get_bytecode_info_stats() -> String {
    let mut out = String::with_capacity(SYMBOLS.len() * 180);
    out.push('{');
    for (i, symbol) in SYMBOLS.iter().enumerate() {
        let stat = snapshot_at(i);
        if i > 0 {
            out.push(',');
        }
        let _ = write!(
            out,
            "\"{symbol} ns\":\"{}\",\"{symbol} min ns\":\"{}\",\"{symbol} max ns\":\"{}\",\
             \"{symbol} gas\":\"0\",\"{symbol} min gas\":\"0\",\"{symbol} max gas\":\"0\",\
             \"{symbol}Count\":\"{}\"",
            stat.ns_total, stat.ns_min, stat.ns_max, stat.count
        );
    }
    out.push('}');
    tracing::debug!(bytes = out.len(), "exported opcode stats");
    out
}
