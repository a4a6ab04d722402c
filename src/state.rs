use bytes::Bytes;
use ethereum_types::{Address, H256, U256};

/// Log record emitted by the `LOG0`..`LOG4` opcodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<H256>,
    pub data: Bytes,
    /// Block of the emitting frame; filled here because the store does not
    /// know the current block number.
    pub block_number: u64,
}

/// Persistent account and storage backend, owned by the caller.
///
/// Snapshotting, journaling and revert handling all happen on the other side
/// of this interface; the engine only issues reads and writes in opcode
/// order.
pub trait StateDb {
    fn get_balance(&self, address: &Address) -> U256;
    fn add_balance(&mut self, address: &Address, amount: U256);

    fn get_code(&self, address: &Address) -> Bytes;
    fn get_code_size(&self, address: &Address) -> usize;
    fn get_code_hash(&self, address: &Address) -> H256;

    /// Account has no code, no balance, and no nonce.
    fn empty(&self, address: &Address) -> bool;

    fn get_state(&self, address: &Address, key: &H256) -> H256;
    fn set_state(&mut self, address: &Address, key: H256, value: H256);

    fn add_preimage(&mut self, hash: H256, preimage: &[u8]);
    fn add_log(&mut self, log: Log);

    /// Mark the account for destruction at the end of the transaction.
    fn suicide(&mut self, address: &Address);
}
