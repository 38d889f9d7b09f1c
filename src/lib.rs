// crosslend: 커스터디 지갑 USDC 브리징 및 렌딩 오케스트레이션

pub mod blockchain;
pub mod bridges;
pub mod config;
pub mod core;
pub mod execution;
pub mod mocks;
pub mod protocols;
pub mod storage;
pub mod utils;

// 핵심 타입
pub mod constants;
pub mod error;
pub mod types;

// 편의를 위한 재노출
pub use config::Config;
pub use core::{EngineServices, OperationEngine};
pub use error::{EncodingError, OrchestratorError, OrchestratorResult};
pub use types::{Operation, OperationOutcome};
