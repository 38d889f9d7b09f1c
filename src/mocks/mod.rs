//! 외부 서비스의 프로세스 내 대체 구현. 단위 테스트와
//! `API_MODE=mock` 으로 실행한 바이너리가 사용한다.

pub mod attestation_mock;
pub mod chain_mock;
pub mod wallet_api_mock;

pub use attestation_mock::MockAttestationSource;
pub use chain_mock::{MockChainReader, MockRelayer};
pub use wallet_api_mock::MockWalletApi;

use std::env;

/// Mock 모드 활성화 여부 확인
pub fn is_mock_mode() -> bool {
    env::var("API_MODE").unwrap_or_default() == "mock"
}
