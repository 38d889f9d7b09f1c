pub mod attestation;
pub mod cctp;
pub mod mint_policy;
pub mod state;
pub mod traits;

// 재노출
pub use attestation::{AttestationRetriever, IrisAttestationClient};
pub use cctp::{CctpTransferOrchestrator, MintReceipt, TransferFailure, TransferReceipt};
pub use mint_policy::{MintPolicy, MintStrategy};
pub use state::{TransferStage, TransferStateMachine};
pub use traits::{AttestationPoll, AttestationSource};
