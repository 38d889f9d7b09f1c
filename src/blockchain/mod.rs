pub mod registry;
pub mod relayer;
pub mod rpc;

pub use registry::{ChainNetwork, ChainRegistry, ContractAddresses};
pub use relayer::{EthersRelayer, RelayerClient};
pub use rpc::{AssetBalance, BalanceReader, ChainClients, ChainReader, EthersChainReader, LendingPosition};
