/// Maximum number of items on the operand stack.
pub const STACK_LIMIT: usize = 1024;

/// Free gas granted to a value-transferring call so the callee can at least
/// emit a log.
pub const CALL_STIPEND: u64 = 2300;
