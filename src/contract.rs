use bytes::Bytes;
use ethereum_types::{Address, U256};

use crate::common::math;
use crate::opcodes;

/// Bit-per-code-position set used for the jump destination analysis.
#[derive(Debug, Clone, Default)]
struct Bitvec(Vec<u64>);

impl Bitvec {
    fn with_capacity(bits: usize) -> Self {
        Bitvec(vec![0; bits / 64 + 1])
    }

    fn set(&mut self, pos: usize) {
        self.0[pos / 64] |= 1 << (pos % 64);
    }

    fn is_set(&self, pos: usize) -> bool {
        self.0[pos / 64] & (1 << (pos % 64)) != 0
    }
}

/// Code, call data and gas counter of the executing frame.
#[derive(Debug, Clone)]
pub struct Contract {
    /// Address of the account that initiated this frame.
    pub caller: Address,
    /// Address of the executing account.
    pub address: Address,
    pub code: Bytes,
    pub input: Bytes,
    pub gas: u64,
    pub value: U256,
    jumpdests: Bitvec,
}

/// Positions that hold a `JUMPDEST` opcode outside of any PUSH immediate.
fn analyze_jumpdests(code: &[u8]) -> Bitvec {
    let mut bits = Bitvec::with_capacity(code.len());
    let mut pc = 0usize;
    while pc < code.len() {
        let op = code[pc];
        if op == opcodes::JUMPDEST {
            bits.set(pc);
        } else if (opcodes::PUSH1..=opcodes::PUSH32).contains(&op) {
            pc += (op - opcodes::PUSH1) as usize + 1;
        }
        pc += 1;
    }
    bits
}

impl Contract {
    pub fn new(
        caller: Address,
        address: Address,
        code: Bytes,
        input: Bytes,
        gas: u64,
        value: U256,
    ) -> Self {
        let jumpdests = analyze_jumpdests(&code);
        Contract {
            caller,
            address,
            code,
            input,
            gas,
            value,
            jumpdests,
        }
    }

    /// `dest` is a legal target for `JUMP`/`JUMPI`.
    pub fn valid_jumpdest(&self, dest: &U256) -> bool {
        let (udest, overflow) = math::u64_with_overflow(*dest);
        if overflow || udest >= self.code.len() as u64 {
            return false;
        }
        self.jumpdests.is_set(udest as usize)
    }

    /// Deduct `amount` from the gas counter; false when not enough is left.
    pub fn use_gas(&mut self, amount: u64) -> bool {
        if self.gas < amount {
            return false;
        }
        self.gas -= amount;
        true
    }
}
