use std::sync::atomic::AtomicI32;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

use crate::contract::Contract;
use crate::errors::VmError;
use crate::state::StateDb;

/// Fork switches observed by the handlers. The full rule set lives with the
/// jump-table owner; only the two flags the opcode bodies branch on appear
/// here.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChainRules {
    pub is_homestead: bool,
    pub is_eip150: bool,
}

/// Immutable data of the enclosing block.
pub struct BlockContext {
    pub coinbase: Address,
    pub timestamp: U256,
    pub block_number: U256,
    pub difficulty: U256,
    /// Post-merge randomness beacon, pushed verbatim by `RANDOM`.
    pub random: H256,
    pub gas_limit: u64,
    /// Hash lookup for `BLOCKHASH`; the 256-block window is enforced by the
    /// handler, not here.
    pub get_hash: Box<dyn Fn(u64) -> H256 + Send + Sync>,
}

impl BlockContext {
    pub fn get_hash(&self, number: u64) -> H256 {
        (self.get_hash)(number)
    }
}

/// Output of a sub-call: returned bytes, remaining gas, error if any.
pub type CallOutcome = (Bytes, u64, Option<VmError>);
/// Output of a create: returned bytes, new address, remaining gas, error.
pub type CreateOutcome = (Bytes, Address, u64, Option<VmError>);

/// Collaborator that services sub-frames. The engine hands it the caller's
/// contract (for gas accounting and address derivation) and consumes the
/// outcome; frame setup, depth limits and value transfer are its business.
pub trait Host {
    fn create(
        &mut self,
        caller: &mut Contract,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CreateOutcome;

    fn create2(
        &mut self,
        caller: &mut Contract,
        input: &[u8],
        gas: u64,
        value: U256,
        salt: U256,
    ) -> CreateOutcome;

    fn call(
        &mut self,
        caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome;

    fn call_code(
        &mut self,
        caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome;

    fn delegate_call(
        &mut self,
        caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
    ) -> CallOutcome;

    fn static_call(
        &mut self,
        caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
    ) -> CallOutcome;
}

/// The enclosing virtual machine as the handlers see it.
pub struct Evm {
    pub origin: Address,
    pub gas_price: U256,
    /// Gas granted to the next sub-call, computed by the dispatcher's gas
    /// pass; the gas operand on the stack is popped and discarded.
    pub call_gas_temp: u64,
    pub chain_rules: ChainRules,
    /// Externally set cancellation flag, observed with acquire ordering at
    /// every `JUMP`/`JUMPI`.
    pub abort: AtomicI32,
    pub context: BlockContext,
    pub state_db: Box<dyn StateDb>,
    pub host: Box<dyn Host>,
}

impl Evm {
    pub fn create(
        &mut self,
        caller: &mut Contract,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CreateOutcome {
        self.host.create(caller, input, gas, value)
    }

    pub fn create2(
        &mut self,
        caller: &mut Contract,
        input: &[u8],
        gas: u64,
        value: U256,
        salt: U256,
    ) -> CreateOutcome {
        self.host.create2(caller, input, gas, value, salt)
    }

    pub fn call(
        &mut self,
        caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        self.host.call(caller, to, input, gas, value)
    }

    pub fn call_code(
        &mut self,
        caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        self.host.call_code(caller, to, input, gas, value)
    }

    pub fn delegate_call(
        &mut self,
        caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
    ) -> CallOutcome {
        self.host.delegate_call(caller, to, input, gas)
    }

    pub fn static_call(
        &mut self,
        caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
    ) -> CallOutcome {
        self.host.static_call(caller, to, input, gas)
    }
}
