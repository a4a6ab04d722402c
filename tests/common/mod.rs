//! In-memory doubles for the engine's external collaborators: a `StateDb`
//! backed by hash maps, a `Host` that replays canned sub-frame outcomes, and
//! a recording `Tracer`. All hand out shared handles so tests can inspect
//! what the handlers did after the frame is gone.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::AtomicI32;

use bytes::Bytes;
use ethereum_types::{Address, H256, U256};
use sha3::{Digest, Keccak256};

use evm_interpreter::contract::Contract;
use evm_interpreter::evm::{BlockContext, CallOutcome, ChainRules, CreateOutcome, Evm, Host};
use evm_interpreter::interpreter::{ScopeContext, Tracer};
use evm_interpreter::state::{Log, StateDb};
use evm_interpreter::VmError;

#[derive(Default)]
pub struct StateInner {
    pub balances: HashMap<Address, U256>,
    pub code: HashMap<Address, Bytes>,
    pub storage: HashMap<(Address, H256), H256>,
    pub logs: Vec<Log>,
    pub preimages: HashMap<H256, Vec<u8>>,
    pub suicided: Vec<Address>,
}

/// Cloneable handle over one shared account store.
#[derive(Clone, Default)]
pub struct TestState(pub Rc<RefCell<StateInner>>);

impl TestState {
    pub fn set_balance(&self, address: Address, amount: U256) {
        self.0.borrow_mut().balances.insert(address, amount);
    }

    pub fn set_code(&self, address: Address, code: Bytes) {
        self.0.borrow_mut().code.insert(address, code);
    }
}

impl StateDb for TestState {
    fn get_balance(&self, address: &Address) -> U256 {
        self.0
            .borrow()
            .balances
            .get(address)
            .copied()
            .unwrap_or_default()
    }

    fn add_balance(&mut self, address: &Address, amount: U256) {
        let mut inner = self.0.borrow_mut();
        let balance = inner.balances.entry(*address).or_default();
        *balance = balance.overflowing_add(amount).0;
    }

    fn get_code(&self, address: &Address) -> Bytes {
        self.0.borrow().code.get(address).cloned().unwrap_or_default()
    }

    fn get_code_size(&self, address: &Address) -> usize {
        self.get_code(address).len()
    }

    fn get_code_hash(&self, address: &Address) -> H256 {
        H256::from_slice(&Keccak256::digest(self.get_code(address)))
    }

    fn empty(&self, address: &Address) -> bool {
        let inner = self.0.borrow();
        !inner.balances.contains_key(address) && !inner.code.contains_key(address)
    }

    fn get_state(&self, address: &Address, key: &H256) -> H256 {
        self.0
            .borrow()
            .storage
            .get(&(*address, *key))
            .copied()
            .unwrap_or_default()
    }

    fn set_state(&mut self, address: &Address, key: H256, value: H256) {
        self.0.borrow_mut().storage.insert((*address, key), value);
    }

    fn add_preimage(&mut self, hash: H256, preimage: &[u8]) {
        self.0
            .borrow_mut()
            .preimages
            .insert(hash, preimage.to_vec());
    }

    fn add_log(&mut self, log: Log) {
        self.0.borrow_mut().logs.push(log);
    }

    fn suicide(&mut self, address: &Address) {
        self.0.borrow_mut().suicided.push(*address);
    }
}

/// One sub-frame request as the host saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostCall {
    Create { input: Vec<u8>, gas: u64, value: U256 },
    Create2 { input: Vec<u8>, gas: u64, value: U256, salt: U256 },
    Call { to: Address, input: Vec<u8>, gas: u64, value: U256 },
    CallCode { to: Address, input: Vec<u8>, gas: u64, value: U256 },
    DelegateCall { to: Address, input: Vec<u8>, gas: u64 },
    StaticCall { to: Address, input: Vec<u8>, gas: u64 },
}

pub struct HostInner {
    pub call_outcome: CallOutcome,
    pub create_outcome: CreateOutcome,
    pub seen: Vec<HostCall>,
}

impl Default for HostInner {
    fn default() -> Self {
        HostInner {
            call_outcome: (Bytes::new(), 0, None),
            create_outcome: (Bytes::new(), Address::zero(), 0, None),
            seen: Vec::new(),
        }
    }
}

/// Host double replaying one canned outcome per frame kind.
#[derive(Clone, Default)]
pub struct TestHost(pub Rc<RefCell<HostInner>>);

impl TestHost {
    pub fn with_call_outcome(ret: &'static [u8], gas: u64, err: Option<VmError>) -> Self {
        let host = TestHost::default();
        host.0.borrow_mut().call_outcome = (Bytes::from_static(ret), gas, err);
        host
    }

    pub fn with_create_outcome(
        ret: &'static [u8],
        address: Address,
        gas: u64,
        err: Option<VmError>,
    ) -> Self {
        let host = TestHost::default();
        host.0.borrow_mut().create_outcome = (Bytes::from_static(ret), address, gas, err);
        host
    }

    pub fn seen(&self) -> Vec<HostCall> {
        self.0.borrow().seen.clone()
    }
}

impl Host for TestHost {
    fn create(
        &mut self,
        _caller: &mut Contract,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CreateOutcome {
        let mut inner = self.0.borrow_mut();
        inner.seen.push(HostCall::Create {
            input: input.to_vec(),
            gas,
            value,
        });
        inner.create_outcome.clone()
    }

    fn create2(
        &mut self,
        _caller: &mut Contract,
        input: &[u8],
        gas: u64,
        value: U256,
        salt: U256,
    ) -> CreateOutcome {
        let mut inner = self.0.borrow_mut();
        inner.seen.push(HostCall::Create2 {
            input: input.to_vec(),
            gas,
            value,
            salt,
        });
        inner.create_outcome.clone()
    }

    fn call(
        &mut self,
        _caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        let mut inner = self.0.borrow_mut();
        inner.seen.push(HostCall::Call {
            to,
            input: input.to_vec(),
            gas,
            value,
        });
        inner.call_outcome.clone()
    }

    fn call_code(
        &mut self,
        _caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) -> CallOutcome {
        let mut inner = self.0.borrow_mut();
        inner.seen.push(HostCall::CallCode {
            to,
            input: input.to_vec(),
            gas,
            value,
        });
        inner.call_outcome.clone()
    }

    fn delegate_call(
        &mut self,
        _caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
    ) -> CallOutcome {
        let mut inner = self.0.borrow_mut();
        inner.seen.push(HostCall::DelegateCall {
            to,
            input: input.to_vec(),
            gas,
        });
        inner.call_outcome.clone()
    }

    fn static_call(
        &mut self,
        _caller: &mut Contract,
        to: Address,
        input: &[u8],
        gas: u64,
    ) -> CallOutcome {
        let mut inner = self.0.borrow_mut();
        inner.seen.push(HostCall::StaticCall {
            to,
            input: input.to_vec(),
            gas,
        });
        inner.call_outcome.clone()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceEvent {
    Enter {
        op: u8,
        from: Address,
        to: Address,
        input: Vec<u8>,
        gas: u64,
        value: U256,
    },
    Exit {
        output: Vec<u8>,
        gas_used: u64,
        err: Option<VmError>,
    },
}

#[derive(Clone, Default)]
pub struct TestTracer(pub Rc<RefCell<Vec<TraceEvent>>>);

impl Tracer for TestTracer {
    fn capture_enter(
        &mut self,
        op: u8,
        from: Address,
        to: Address,
        input: &[u8],
        gas: u64,
        value: U256,
    ) {
        self.0.borrow_mut().push(TraceEvent::Enter {
            op,
            from,
            to,
            input: input.to_vec(),
            gas,
            value,
        });
    }

    fn capture_exit(&mut self, output: &[u8], gas_used: u64, err: Option<&VmError>) {
        self.0.borrow_mut().push(TraceEvent::Exit {
            output: output.to_vec(),
            gas_used,
            err: err.cloned(),
        });
    }
}

pub const CONTRACT_ADDRESS: Address = Address::repeat_byte(0xc0);
pub const CALLER_ADDRESS: Address = Address::repeat_byte(0xca);

pub fn test_evm(state: TestState, host: TestHost) -> Evm {
    Evm {
        origin: Address::repeat_byte(0x0e),
        gas_price: U256::from(7),
        call_gas_temp: 0,
        chain_rules: ChainRules {
            is_homestead: true,
            is_eip150: true,
        },
        abort: AtomicI32::new(0),
        context: BlockContext {
            coinbase: Address::repeat_byte(0xcb),
            timestamp: U256::from(1_700_000_000u64),
            block_number: U256::from(1000u64),
            difficulty: U256::from(131_072u64),
            random: H256::repeat_byte(0x42),
            gas_limit: 30_000_000,
            get_hash: Box::new(H256::from_low_u64_be),
        },
        state_db: Box::new(state),
        host: Box::new(host),
    }
}

/// Frame containers over `code`, with empty input and no gas.
pub fn frame(code: &'static [u8]) -> ScopeContext {
    ScopeContext::new(Contract::new(
        CALLER_ADDRESS,
        CONTRACT_ADDRESS,
        Bytes::from_static(code),
        Bytes::new(),
        0,
        U256::zero(),
    ))
}
