pub mod submitter;
pub mod wallet_api;

pub use submitter::{PollPolicy, Submission, TransactionSubmitter};
pub use wallet_api::{CircleWalletClient, ManagedWalletApi, StaticCiphertext};
