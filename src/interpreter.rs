use bytes::Bytes;
use ethereum_types::{Address, U256};
use sha3::{Digest, Keccak256};

use crate::contract::Contract;
use crate::errors::VmError;
use crate::evm::Evm;
use crate::memory::Memory;
use crate::stack::Stack;

/// How a handler leaves the frame.
///
/// `Continue` is the default: the dispatcher bumps the program counter and
/// fetches the next opcode. The other three terminate the frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Stop,
    Revert,
    Error(VmError),
}

/// Bytes handed back to the dispatcher plus the control-flow verdict. Only
/// the terminating opcodes and the call family produce non-empty bytes.
pub type InstructionResult = (Bytes, Outcome);

/// An instruction body as stored in the caller's jump table. Boxed because
/// the `PUSH`/`DUP`/`SWAP`/`LOG` entries are closures produced by factories.
pub type ExecutionFunc = Box<
    dyn Fn(&mut u64, &mut Interpreter<'_>, &mut ScopeContext) -> InstructionResult + Send + Sync,
>;

/// Observer of sub-frame boundaries. `SELFDESTRUCT` reports through it as an
/// enter/exit pair even though it spawns no sub-frame.
pub trait Tracer {
    fn capture_enter(
        &mut self,
        op: u8,
        from: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    );
    fn capture_exit(&mut self, output: &[u8], gas_used: u64, err: Option<&VmError>);
}

#[derive(Default)]
pub struct Config {
    pub debug: bool,
    pub enable_preimage_recording: bool,
    pub tracer: Option<Box<dyn Tracer>>,
}

/// Containers of the current frame, bundled for the handler signature.
pub struct ScopeContext {
    pub contract: Contract,
    pub stack: Stack,
    pub memory: Memory,
}

impl ScopeContext {
    pub fn new(contract: Contract) -> Self {
        ScopeContext {
            contract,
            stack: Stack::new(),
            memory: Memory::new(),
        }
    }
}

/// Mutable per-frame execution state. One is built per frame and dies with
/// it; the [`Evm`] behind the reference outlives all frames.
pub struct Interpreter<'a> {
    pub evm: &'a mut Evm,
    pub cfg: Config,
    /// Frame entered via `STATICCALL`: every state-mutating opcode faults.
    pub read_only: bool,
    /// Output of the last completed sub-frame, readable via
    /// `RETURNDATASIZE`/`RETURNDATACOPY`.
    pub return_data: Bytes,
    /// Keccak state reused across `KECCAK256` invocations.
    pub(crate) hasher: Keccak256,
    pub(crate) hasher_buf: [u8; 32],
}

impl<'a> Interpreter<'a> {
    pub fn new(evm: &'a mut Evm, cfg: Config, read_only: bool) -> Self {
        Interpreter {
            evm,
            cfg,
            read_only,
            return_data: Bytes::new(),
            hasher: Keccak256::new(),
            hasher_buf: [0u8; 32],
        }
    }
}
