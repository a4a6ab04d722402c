use thiserror::Error;

/// Frame-terminating conditions surfaced to the dispatcher.
///
/// `StopToken` and `ExecutionReverted` are control-flow signals rather than
/// faults: the first ends the frame cleanly, the second ends it with the
/// return data preserved and the remaining gas refundable. Everything else
/// aborts the frame with gas consumed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("stop token")]
    StopToken,
    #[error("execution reverted")]
    ExecutionReverted,
    #[error("write protection")]
    WriteProtection,
    #[error("invalid jump destination")]
    InvalidJump,
    #[error("invalid opcode: {0:#04x}")]
    InvalidOpCode(u8),
    #[error("return data out of bounds")]
    ReturnDataOutOfBounds,
    #[error("contract creation code storage out of gas")]
    CodeStoreOutOfGas,
}
