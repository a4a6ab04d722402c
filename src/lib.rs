//! Opcode execution engine for a 256-bit-word, stack-based virtual machine
//! with EVM semantics, plus a per-opcode timing sidecar.
//!
//! The crate supplies the instruction bodies and their frame-local state;
//! the fetch-decode loop, gas accounting, jump-table construction and the
//! persistent store live with the caller and are consumed through the
//! [`evm::Host`] and [`state::StateDb`] interfaces.

pub mod common;
pub mod contract;
pub mod errors;
pub mod evm;
pub mod instructions;
pub mod interpreter;
pub mod memory;
pub mod opcodes;
pub mod stack;
pub mod state;
pub mod stats;

pub use contract::Contract;
pub use errors::VmError;
pub use evm::{BlockContext, CallOutcome, ChainRules, CreateOutcome, Evm, Host};
pub use interpreter::{
    Config, ExecutionFunc, InstructionResult, Interpreter, Outcome, ScopeContext, Tracer,
};
pub use memory::Memory;
pub use stack::Stack;
pub use state::{Log, StateDb};
pub use stats::{get_bytecode_info_stats, snapshot, StatId, StatSnapshot};
