//! The opcode handler bodies.
//!
//! Every handler is wrapped by [`observe`], which charges its wall-clock
//! duration to the process-wide stats table. The four factories at the bottom
//! (`make_log`, `make_push`, `make_dup`, `make_swap`) are instrumented as
//! symbols of their own: the measurement covers the factory call that builds
//! the closure, not the closure's later invocations.
//!
//! Handlers run under the dispatcher's guarantees: stack depth requirements
//! hold, gas is already debited, and memory has been grown to cover every
//! region touched. Nothing here re-checks those.

use std::sync::atomic::Ordering;

use bytes::Bytes;
use ethereum_types::{H256, U256};
use sha3::Digest;

use crate::common::constants::CALL_STIPEND;
use crate::common::math;
use crate::errors::VmError;
use crate::interpreter::{ExecutionFunc, InstructionResult, Interpreter, Outcome, ScopeContext};
use crate::opcodes;
use crate::state::Log;
use crate::stats::{observe, StatId};

fn next() -> InstructionResult {
    (Bytes::new(), Outcome::Continue)
}

fn fault(err: VmError) -> InstructionResult {
    (Bytes::new(), Outcome::Error(err))
}

fn boxed(
    f: impl Fn(&mut u64, &mut Interpreter<'_>, &mut ScopeContext) -> InstructionResult
        + Send
        + Sync
        + 'static,
) -> ExecutionFunc {
    Box::new(f)
}

fn bool_word(b: bool) -> U256 {
    if b {
        U256::one()
    } else {
        U256::zero()
    }
}

// ---------------------------------------------------------------------------
// Arithmetic, comparison, bitwise
//
// Binary convention: pop x, rewrite the new top in place with op(x, top).

pub fn op_add(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Add, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = x.overflowing_add(*y).0;
        next()
    })
}

pub fn op_sub(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Sub, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = x.overflowing_sub(*y).0;
        next()
    })
}

pub fn op_mul(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Mul, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = x.overflowing_mul(*y).0;
        next()
    })
}

pub fn op_div(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Div, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = x.checked_div(*y).unwrap_or_default();
        next()
    })
}

pub fn op_sdiv(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Sdiv, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = math::sdiv(x, *y);
        next()
    })
}

pub fn op_mod(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Mod, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = x.checked_rem(*y).unwrap_or_default();
        next()
    })
}

pub fn op_smod(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Smod, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = math::smod(x, *y);
        next()
    })
}

pub fn op_exp(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Exp, || {
        let base = scope.stack.pop();
        let exponent = scope.stack.peek_mut();
        *exponent = math::exp(base, *exponent);
        next()
    })
}

pub fn op_sign_extend(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::SignExtend, || {
        let back = scope.stack.pop();
        let num = scope.stack.peek_mut();
        *num = math::sign_extend(back, *num);
        next()
    })
}

pub fn op_not(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Not, || {
        let x = scope.stack.peek_mut();
        *x = !*x;
        next()
    })
}

pub fn op_lt(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Lt, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = bool_word(x < *y);
        next()
    })
}

pub fn op_gt(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Gt, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = bool_word(x > *y);
        next()
    })
}

pub fn op_slt(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Slt, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = bool_word(math::slt(x, *y));
        next()
    })
}

pub fn op_sgt(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Sgt, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = bool_word(math::sgt(x, *y));
        next()
    })
}

pub fn op_eq(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Eq, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = bool_word(x == *y);
        next()
    })
}

pub fn op_iszero(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::IsZero, || {
        let x = scope.stack.peek_mut();
        *x = bool_word(x.is_zero());
        next()
    })
}

pub fn op_and(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::And, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = x & *y;
        next()
    })
}

pub fn op_or(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Or, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = x | *y;
        next()
    })
}

pub fn op_xor(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Xor, || {
        let x = scope.stack.pop();
        let y = scope.stack.peek_mut();
        *y = x ^ *y;
        next()
    })
}

pub fn op_byte(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Byte, || {
        let th = scope.stack.pop();
        let val = scope.stack.peek_mut();
        *val = math::byte(th, *val);
        next()
    })
}

pub fn op_addmod(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Addmod, || {
        let x = scope.stack.pop();
        let y = scope.stack.pop();
        let z = scope.stack.peek_mut();
        if z.is_zero() {
            *z = U256::zero();
        } else {
            *z = math::add_mod(x, y, *z);
        }
        next()
    })
}

pub fn op_mulmod(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Mulmod, || {
        let x = scope.stack.pop();
        let y = scope.stack.pop();
        let z = scope.stack.peek_mut();
        *z = math::mul_mod(x, y, *z);
        next()
    })
}

pub fn op_shl(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Shl, || {
        let shift = scope.stack.pop();
        let value = scope.stack.peek_mut();
        *value = math::shl(shift, *value);
        next()
    })
}

pub fn op_shr(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Shr, || {
        let shift = scope.stack.pop();
        let value = scope.stack.peek_mut();
        *value = math::shr(shift, *value);
        next()
    })
}

pub fn op_sar(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Sar, || {
        let shift = scope.stack.pop();
        let value = scope.stack.peek_mut();
        *value = math::sar(shift, *value);
        next()
    })
}

// ---------------------------------------------------------------------------
// Hashing

pub fn op_keccak256(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Keccak256, || {
        let offset = scope.stack.pop();
        let size = scope.stack.peek();
        let data = scope.memory.get_ptr(offset.low_u64(), size.low_u64());

        interpreter.hasher.update(data);
        let digest = interpreter.hasher.finalize_reset();
        interpreter.hasher_buf.copy_from_slice(&digest);

        if interpreter.cfg.enable_preimage_recording {
            interpreter
                .evm
                .state_db
                .add_preimage(H256(interpreter.hasher_buf), data);
        }

        *scope.stack.peek_mut() = U256::from_big_endian(&interpreter.hasher_buf);
        next()
    })
}

// ---------------------------------------------------------------------------
// Environment and block context

pub fn op_address(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Address, || {
        let word = math::address_to_u256(scope.contract.address);
        scope.stack.push(word);
        next()
    })
}

pub fn op_balance(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Balance, || {
        let address = math::to_address(scope.stack.peek());
        *scope.stack.peek_mut() = interpreter.evm.state_db.get_balance(&address);
        next()
    })
}

pub fn op_origin(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Origin, || {
        scope.stack.push(math::address_to_u256(interpreter.evm.origin));
        next()
    })
}

pub fn op_caller(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Caller, || {
        let word = math::address_to_u256(scope.contract.caller);
        scope.stack.push(word);
        next()
    })
}

pub fn op_call_value(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::CallValue, || {
        let value = scope.contract.value;
        scope.stack.push(value);
        next()
    })
}

pub fn op_call_data_load(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::CallDataLoad, || {
        let x = scope.stack.peek_mut();
        let (offset, overflow) = math::u64_with_overflow(*x);
        if overflow {
            *x = U256::zero();
        } else {
            let data = math::get_data(&scope.contract.input, offset, 32);
            *x = U256::from_big_endian(&data);
        }
        next()
    })
}

pub fn op_call_data_size(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::CallDataSize, || {
        let size = U256::from(scope.contract.input.len());
        scope.stack.push(size);
        next()
    })
}

pub fn op_call_data_copy(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::CallDataCopy, || {
        let mem_offset = scope.stack.pop();
        let data_offset = scope.stack.pop();
        let length = scope.stack.pop();
        let (data_offset64, overflow) = math::u64_with_overflow(data_offset);
        let data_offset64 = if overflow { u64::MAX } else { data_offset64 };
        // Memory bounds were checked during the gas pass.
        let data = math::get_data(&scope.contract.input, data_offset64, length.low_u64());
        scope
            .memory
            .set(mem_offset.low_u64(), length.low_u64(), &data);
        next()
    })
}

pub fn op_return_data_size(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::ReturnDataSize, || {
        scope.stack.push(U256::from(interpreter.return_data.len()));
        next()
    })
}

pub fn op_return_data_copy(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::ReturnDataCopy, || {
        let mem_offset = scope.stack.pop();
        let data_offset = scope.stack.pop();
        let length = scope.stack.pop();

        let (offset64, overflow) = math::u64_with_overflow(data_offset);
        if overflow {
            return fault(VmError::ReturnDataOutOfBounds);
        }
        let end = data_offset.overflowing_add(length).0;
        let (end64, overflow) = math::u64_with_overflow(end);
        if overflow || (interpreter.return_data.len() as u64) < end64 {
            return fault(VmError::ReturnDataOutOfBounds);
        }
        scope.memory.set(
            mem_offset.low_u64(),
            length.low_u64(),
            &interpreter.return_data[offset64 as usize..end64 as usize],
        );
        next()
    })
}

pub fn op_ext_code_size(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::ExtCodeSize, || {
        let address = math::to_address(scope.stack.peek());
        *scope.stack.peek_mut() = U256::from(interpreter.evm.state_db.get_code_size(&address));
        next()
    })
}

pub fn op_code_size(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::CodeSize, || {
        let size = U256::from(scope.contract.code.len());
        scope.stack.push(size);
        next()
    })
}

pub fn op_code_copy(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::CodeCopy, || {
        let mem_offset = scope.stack.pop();
        let code_offset = scope.stack.pop();
        let length = scope.stack.pop();
        let (code_offset64, overflow) = math::u64_with_overflow(code_offset);
        let code_offset64 = if overflow { u64::MAX } else { code_offset64 };
        let code = math::get_data(&scope.contract.code, code_offset64, length.low_u64());
        scope
            .memory
            .set(mem_offset.low_u64(), length.low_u64(), &code);
        next()
    })
}

pub fn op_ext_code_copy(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::ExtCodeCopy, || {
        let a = scope.stack.pop();
        let mem_offset = scope.stack.pop();
        let code_offset = scope.stack.pop();
        let length = scope.stack.pop();
        let (code_offset64, overflow) = math::u64_with_overflow(code_offset);
        let code_offset64 = if overflow { u64::MAX } else { code_offset64 };
        let code = interpreter.evm.state_db.get_code(&math::to_address(a));
        let copy = math::get_data(&code, code_offset64, length.low_u64());
        scope
            .memory
            .set(mem_offset.low_u64(), length.low_u64(), &copy);
        next()
    })
}

/// Accounts without code hash to the empty-code hash; accounts that do not
/// exist (or are ruled empty) hash to zero. Both cases are serviced by the
/// store, so the handler only distinguishes `empty`.
pub fn op_ext_code_hash(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::ExtCodeHash, || {
        let address = math::to_address(scope.stack.peek());
        let word = if interpreter.evm.state_db.empty(&address) {
            U256::zero()
        } else {
            math::h256_to_u256(interpreter.evm.state_db.get_code_hash(&address))
        };
        *scope.stack.peek_mut() = word;
        next()
    })
}

pub fn op_gasprice(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Gasprice, || {
        scope.stack.push(interpreter.evm.gas_price);
        next()
    })
}

pub fn op_blockhash(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Blockhash, || {
        let num = scope.stack.peek();
        let (num64, overflow) = math::u64_with_overflow(num);
        if overflow {
            *scope.stack.peek_mut() = U256::zero();
            return next();
        }
        let upper = interpreter.evm.context.block_number.low_u64();
        let lower = if upper < 257 { 0 } else { upper - 256 };
        let word = if num64 >= lower && num64 < upper {
            math::h256_to_u256(interpreter.evm.context.get_hash(num64))
        } else {
            U256::zero()
        };
        *scope.stack.peek_mut() = word;
        next()
    })
}

pub fn op_coinbase(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Coinbase, || {
        scope
            .stack
            .push(math::address_to_u256(interpreter.evm.context.coinbase));
        next()
    })
}

pub fn op_timestamp(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Timestamp, || {
        scope.stack.push(interpreter.evm.context.timestamp);
        next()
    })
}

pub fn op_number(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Number, || {
        scope.stack.push(interpreter.evm.context.block_number);
        next()
    })
}

pub fn op_difficulty(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Difficulty, || {
        scope.stack.push(interpreter.evm.context.difficulty);
        next()
    })
}

pub fn op_random(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Random, || {
        scope
            .stack
            .push(math::h256_to_u256(interpreter.evm.context.random));
        next()
    })
}

pub fn op_gas_limit(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::GasLimit, || {
        scope.stack.push(U256::from(interpreter.evm.context.gas_limit));
        next()
    })
}

// ---------------------------------------------------------------------------
// Stack, memory, storage

pub fn op_pop(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Pop, || {
        scope.stack.pop();
        next()
    })
}

pub fn op_mload(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Mload, || {
        let offset = scope.stack.peek().low_u64();
        let word = U256::from_big_endian(scope.memory.get_ptr(offset, 32));
        *scope.stack.peek_mut() = word;
        next()
    })
}

pub fn op_mstore(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Mstore, || {
        let m_start = scope.stack.pop();
        let val = scope.stack.pop();
        scope.memory.set32(m_start.low_u64(), &val);
        next()
    })
}

pub fn op_mstore8(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Mstore8, || {
        let offset = scope.stack.pop();
        let val = scope.stack.pop();
        scope.memory.set(offset.low_u64(), 1, &[val.byte(0)]);
        next()
    })
}

pub fn op_sload(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Sload, || {
        let key = math::to_h256(scope.stack.peek());
        let value = interpreter
            .evm
            .state_db
            .get_state(&scope.contract.address, &key);
        *scope.stack.peek_mut() = math::h256_to_u256(value);
        next()
    })
}

pub fn op_sstore(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Sstore, || {
        if interpreter.read_only {
            return fault(VmError::WriteProtection);
        }
        let loc = scope.stack.pop();
        let val = scope.stack.pop();
        interpreter.evm.state_db.set_state(
            &scope.contract.address,
            math::to_h256(loc),
            math::to_h256(val),
        );
        next()
    })
}

// ---------------------------------------------------------------------------
// Control flow

pub fn op_jump(
    pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Jump, || {
        if interpreter.evm.abort.load(Ordering::Acquire) != 0 {
            tracing::trace!("abort flag observed, stopping frame");
            return fault(VmError::StopToken);
        }
        let pos = scope.stack.pop();
        if !scope.contract.valid_jumpdest(&pos) {
            return fault(VmError::InvalidJump);
        }
        // The dispatcher's increment lands on the target.
        *pc = pos.low_u64().wrapping_sub(1);
        next()
    })
}

pub fn op_jumpi(
    pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Jumpi, || {
        if interpreter.evm.abort.load(Ordering::Acquire) != 0 {
            tracing::trace!("abort flag observed, stopping frame");
            return fault(VmError::StopToken);
        }
        let pos = scope.stack.pop();
        let cond = scope.stack.pop();
        if !cond.is_zero() {
            if !scope.contract.valid_jumpdest(&pos) {
                return fault(VmError::InvalidJump);
            }
            *pc = pos.low_u64().wrapping_sub(1);
        }
        next()
    })
}

pub fn op_jumpdest(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    _scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Jumpdest, next)
}

pub fn op_pc(
    pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Pc, || {
        scope.stack.push(U256::from(*pc));
        next()
    })
}

pub fn op_msize(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Msize, || {
        scope.stack.push(U256::from(scope.memory.len()));
        next()
    })
}

pub fn op_gas(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Gas, || {
        let gas = U256::from(scope.contract.gas);
        scope.stack.push(gas);
        next()
    })
}

// ---------------------------------------------------------------------------
// Sub-frames

pub fn op_create(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Create, || {
        if interpreter.read_only {
            return fault(VmError::WriteProtection);
        }
        let value = scope.stack.pop();
        let offset = scope.stack.pop();
        let size = scope.stack.pop();
        let input = scope.memory.get_copy(offset.low_u64(), size.low_u64());

        let mut gas = scope.contract.gas;
        if interpreter.evm.chain_rules.is_eip150 {
            gas -= gas / 64;
        }
        scope.contract.use_gas(gas);

        let (ret, address, return_gas, err) =
            interpreter.evm.create(&mut scope.contract, &input, gas, value);

        // Under homestead rules a code-store failure is a failure; frontier
        // pretended the creation succeeded.
        let push_address = match &err {
            Some(VmError::CodeStoreOutOfGas) => !interpreter.evm.chain_rules.is_homestead,
            Some(_) => false,
            None => true,
        };
        scope.stack.push(if push_address {
            math::address_to_u256(address)
        } else {
            U256::zero()
        });
        scope.contract.gas += return_gas;

        if err == Some(VmError::ExecutionReverted) {
            interpreter.return_data = ret.clone();
            return (ret, Outcome::Continue);
        }
        interpreter.return_data = Bytes::new();
        next()
    })
}

pub fn op_create2(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Create2, || {
        if interpreter.read_only {
            return fault(VmError::WriteProtection);
        }
        let endowment = scope.stack.pop();
        let offset = scope.stack.pop();
        let size = scope.stack.pop();
        let salt = scope.stack.pop();
        let input = scope.memory.get_copy(offset.low_u64(), size.low_u64());

        // CREATE2 postdates EIP-150, so the 64th-floor rule always applies.
        let mut gas = scope.contract.gas;
        gas -= gas / 64;
        scope.contract.use_gas(gas);

        let (ret, address, return_gas, err) =
            interpreter
                .evm
                .create2(&mut scope.contract, &input, gas, endowment, salt);

        scope.stack.push(if err.is_none() {
            math::address_to_u256(address)
        } else {
            U256::zero()
        });
        scope.contract.gas += return_gas;

        if err == Some(VmError::ExecutionReverted) {
            interpreter.return_data = ret.clone();
            return (ret, Outcome::Continue);
        }
        interpreter.return_data = Bytes::new();
        next()
    })
}

pub fn op_call(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Call, || {
        // The gas operand is popped and discarded; the dispatcher's gas pass
        // left the amount actually granted in call_gas_temp.
        scope.stack.pop();
        let mut gas = interpreter.evm.call_gas_temp;
        let addr = scope.stack.pop();
        let value = scope.stack.pop();
        let in_offset = scope.stack.pop();
        let in_size = scope.stack.pop();
        let ret_offset = scope.stack.pop();
        let ret_size = scope.stack.pop();
        let to = math::to_address(addr);

        if interpreter.read_only && !value.is_zero() {
            return fault(VmError::WriteProtection);
        }
        if !value.is_zero() {
            gas += CALL_STIPEND;
        }
        let args = scope.memory.get_ptr(in_offset.low_u64(), in_size.low_u64());

        let (ret, return_gas, err) =
            interpreter
                .evm
                .call(&mut scope.contract, to, args, gas, value);

        scope.stack.push(bool_word(err.is_none()));
        if matches!(err, None | Some(VmError::ExecutionReverted)) {
            scope
                .memory
                .set(ret_offset.low_u64(), ret_size.low_u64(), &ret);
        }
        scope.contract.gas += return_gas;

        interpreter.return_data = ret.clone();
        (ret, Outcome::Continue)
    })
}

pub fn op_call_code(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::CallCode, || {
        scope.stack.pop();
        let mut gas = interpreter.evm.call_gas_temp;
        let addr = scope.stack.pop();
        let value = scope.stack.pop();
        let in_offset = scope.stack.pop();
        let in_size = scope.stack.pop();
        let ret_offset = scope.stack.pop();
        let ret_size = scope.stack.pop();
        let to = math::to_address(addr);

        if interpreter.read_only && !value.is_zero() {
            return fault(VmError::WriteProtection);
        }
        if !value.is_zero() {
            gas += CALL_STIPEND;
        }
        let args = scope.memory.get_ptr(in_offset.low_u64(), in_size.low_u64());

        let (ret, return_gas, err) =
            interpreter
                .evm
                .call_code(&mut scope.contract, to, args, gas, value);

        scope.stack.push(bool_word(err.is_none()));
        if matches!(err, None | Some(VmError::ExecutionReverted)) {
            scope
                .memory
                .set(ret_offset.low_u64(), ret_size.low_u64(), &ret);
        }
        scope.contract.gas += return_gas;

        interpreter.return_data = ret.clone();
        (ret, Outcome::Continue)
    })
}

pub fn op_delegate_call(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::DelegateCall, || {
        scope.stack.pop();
        let gas = interpreter.evm.call_gas_temp;
        let addr = scope.stack.pop();
        let in_offset = scope.stack.pop();
        let in_size = scope.stack.pop();
        let ret_offset = scope.stack.pop();
        let ret_size = scope.stack.pop();
        let to = math::to_address(addr);

        let args = scope.memory.get_ptr(in_offset.low_u64(), in_size.low_u64());

        let (ret, return_gas, err) =
            interpreter
                .evm
                .delegate_call(&mut scope.contract, to, args, gas);

        scope.stack.push(bool_word(err.is_none()));
        if matches!(err, None | Some(VmError::ExecutionReverted)) {
            scope
                .memory
                .set(ret_offset.low_u64(), ret_size.low_u64(), &ret);
        }
        scope.contract.gas += return_gas;

        interpreter.return_data = ret.clone();
        (ret, Outcome::Continue)
    })
}

pub fn op_static_call(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::StaticCall, || {
        scope.stack.pop();
        let gas = interpreter.evm.call_gas_temp;
        let addr = scope.stack.pop();
        let in_offset = scope.stack.pop();
        let in_size = scope.stack.pop();
        let ret_offset = scope.stack.pop();
        let ret_size = scope.stack.pop();
        let to = math::to_address(addr);

        let args = scope.memory.get_ptr(in_offset.low_u64(), in_size.low_u64());

        let (ret, return_gas, err) =
            interpreter
                .evm
                .static_call(&mut scope.contract, to, args, gas);

        scope.stack.push(bool_word(err.is_none()));
        if matches!(err, None | Some(VmError::ExecutionReverted)) {
            scope
                .memory
                .set(ret_offset.low_u64(), ret_size.low_u64(), &ret);
        }
        scope.contract.gas += return_gas;

        interpreter.return_data = ret.clone();
        (ret, Outcome::Continue)
    })
}

// ---------------------------------------------------------------------------
// Termination

pub fn op_return(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Return, || {
        let offset = scope.stack.pop();
        let size = scope.stack.pop();
        let ret = scope.memory.get_copy(offset.low_u64(), size.low_u64());
        (ret, Outcome::Stop)
    })
}

pub fn op_revert(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Revert, || {
        let offset = scope.stack.pop();
        let size = scope.stack.pop();
        let ret = scope.memory.get_copy(offset.low_u64(), size.low_u64());
        interpreter.return_data = ret.clone();
        (ret, Outcome::Revert)
    })
}

pub fn op_undefined(
    pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Undefined, || {
        fault(VmError::InvalidOpCode(scope.contract.code[*pc as usize]))
    })
}

pub fn op_stop(
    _pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    _scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Stop, || (Bytes::new(), Outcome::Stop))
}

pub fn op_selfdestruct(
    _pc: &mut u64,
    interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Selfdestruct, || {
        if interpreter.read_only {
            return fault(VmError::WriteProtection);
        }
        let beneficiary = math::to_address(scope.stack.pop());
        let address = scope.contract.address;
        let balance = interpreter.evm.state_db.get_balance(&address);
        interpreter.evm.state_db.add_balance(&beneficiary, balance);
        interpreter.evm.state_db.suicide(&address);
        if interpreter.cfg.debug {
            if let Some(tracer) = interpreter.cfg.tracer.as_mut() {
                tracer.capture_enter(opcodes::SELFDESTRUCT, address, beneficiary, &[], 0, balance);
                tracer.capture_exit(&[], 0, None);
            }
        }
        tracing::debug!(?address, ?beneficiary, "selfdestruct");
        (Bytes::new(), Outcome::Stop)
    })
}

// ---------------------------------------------------------------------------
// Jump-table factories

/// Build the handler for `LOG0`..`LOG4` with `size` topics.
pub fn make_log(size: usize) -> ExecutionFunc {
    observe(StatId::MakeLog, || {
        boxed(move |_pc, interpreter, scope| {
            if interpreter.read_only {
                return fault(VmError::WriteProtection);
            }
            let m_start = scope.stack.pop();
            let m_size = scope.stack.pop();
            let mut topics = Vec::with_capacity(size);
            for _ in 0..size {
                topics.push(math::to_h256(scope.stack.pop()));
            }
            let data = scope.memory.get_copy(m_start.low_u64(), m_size.low_u64());
            let block_number = interpreter.evm.context.block_number.low_u64();
            interpreter.evm.state_db.add_log(Log {
                address: scope.contract.address,
                topics,
                data,
                block_number,
            });
            next()
        })
    })
}

/// Specialized `PUSH1`: one immediate byte, read after advancing the counter.
pub fn op_push1(
    pc: &mut u64,
    _interpreter: &mut Interpreter<'_>,
    scope: &mut ScopeContext,
) -> InstructionResult {
    observe(StatId::Push1, || {
        let code_len = scope.contract.code.len() as u64;
        *pc += 1;
        let value = if *pc < code_len {
            U256::from(scope.contract.code[*pc as usize])
        } else {
            U256::zero()
        };
        scope.stack.push(value);
        next()
    })
}

/// Build the handler for `PUSHn`. Truncated immediates at the end of the
/// code are zero-padded on the right.
pub fn make_push(size: u64, push_byte_size: usize) -> ExecutionFunc {
    observe(StatId::MakePush, || {
        boxed(move |pc, _interpreter, scope| {
            let code_len = scope.contract.code.len();
            let start = code_len.min(*pc as usize + 1);
            let end = code_len.min(start + push_byte_size);
            let padded = math::right_pad(&scope.contract.code[start..end], push_byte_size);
            scope.stack.push(U256::from_big_endian(&padded));
            *pc += size;
            next()
        })
    })
}

/// Build the handler for `DUPn`.
pub fn make_dup(size: usize) -> ExecutionFunc {
    observe(StatId::MakeDup, || {
        boxed(move |_pc, _interpreter, scope| {
            scope.stack.dup(size);
            next()
        })
    })
}

/// Build the handler for `SWAPn`.
pub fn make_swap(size: usize) -> ExecutionFunc {
    observe(StatId::MakeSwap, || {
        // Exchange with n + 1, otherwise n would be swapped with itself.
        let size = size + 1;
        boxed(move |_pc, _interpreter, scope| {
            scope.stack.swap(size);
            next()
        })
    })
}
