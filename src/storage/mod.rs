pub mod wallet_directory;

pub use wallet_directory::{InMemoryWalletDirectory, WalletDirectory};
