use std::time::Duration;

use alloy::primitives::{address, Address};

// CCTP v2 소각 파라미터
pub const DEFAULT_FINALITY_THRESHOLD: u32 = 1000;

// 폴링 기본값
pub const TX_POLL_INTERVAL: Duration = Duration::from_secs(2);
pub const TX_POLL_TIMEOUT: Duration = Duration::from_secs(600);
pub const ATTESTATION_POLL_INTERVAL: Duration = Duration::from_secs(5);
pub const ATTESTATION_POLL_TIMEOUT: Duration = Duration::from_secs(1800);
pub const RELAYER_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

// 엔드포인트 제한
pub const DEFAULT_MAX_IN_FLIGHT: usize = 8;
pub const DEFAULT_MIN_SPACING: Duration = Duration::from_millis(100);

// 관리형 지갑 수수료 레벨
pub const FEE_LEVEL_CONTRACT_EXECUTION: &str = "HIGH";
pub const FEE_LEVEL_TRANSFER: &str = "MEDIUM";

// 서비스 엔드포인트 (테스트넷)
pub const CIRCLE_API_BASE_URL: &str = "https://api.circle.com";
pub const IRIS_SANDBOX_BASE_URL: &str = "https://iris-api-sandbox.circle.com";

// 체인 ID
pub const ETH_SEPOLIA_CHAIN_ID: u64 = 11_155_111;
pub const AVAX_FUJI_CHAIN_ID: u64 = 43_113;
pub const BASE_SEPOLIA_CHAIN_ID: u64 = 84_532;
pub const SONIC_BLAZE_CHAIN_ID: u64 = 57_054;
pub const LINEA_SEPOLIA_CHAIN_ID: u64 = 59_141;
pub const ARBITRUM_SEPOLIA_CHAIN_ID: u64 = 421_614;
pub const OPTIMISM_SEPOLIA_CHAIN_ID: u64 = 11_155_420;

// CCTP 도메인
pub const ETH_SEPOLIA_DOMAIN: u32 = 0;
pub const AVAX_FUJI_DOMAIN: u32 = 1;
pub const OPTIMISM_SEPOLIA_DOMAIN: u32 = 2;
pub const ARBITRUM_SEPOLIA_DOMAIN: u32 = 3;
pub const BASE_SEPOLIA_DOMAIN: u32 = 6;
pub const LINEA_SEPOLIA_DOMAIN: u32 = 11;
pub const SONIC_BLAZE_DOMAIN: u32 = 13;

// CCTP v2 컨트랙트는 모든 테스트넷에서 같은 주소
pub const TOKEN_MESSENGER_V2: Address = address!("8fe6b999dc680ccfdd5bf7eb0974218be2542daa");
pub const MESSAGE_TRANSMITTER_V2: Address = address!("e737e5cebeeba77efe34d4aa090756590b1ce275");

// USDC 토큰
pub const USDC_ETH_SEPOLIA: Address = address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238");
pub const USDC_AVAX_FUJI: Address = address!("5425890298aed601595a70AB815c96711a31Bc65");
pub const USDC_BASE_SEPOLIA: Address = address!("036CbD53842c5426634e7929541eC2318f3dCF7e");
pub const USDC_SONIC_BLAZE: Address = address!("A4879Fed32Ecbef99399e5cbC247E533421C4eC6");
pub const USDC_OPTIMISM_SEPOLIA: Address = address!("5fd84259d66cd46123540766be93dfe6d43130d7");
pub const USDC_LINEA_SEPOLIA: Address = address!("FEce4462D57bD51A6A552365A011b95f0E16d9B7");
pub const USDC_ARBITRUM_SEPOLIA: Address = address!("75faf114eafb1BDbe2F0316DF893fd58CE46AA4d");

// Aave v3 주소
pub const AAVE_POOL_ETH_SEPOLIA: Address = address!("6Ae43d3271ff6888e7Fc43Fd7321a503ff738951");
pub const AAVE_POOL_ARBITRUM_SEPOLIA: Address = address!("BfC91D59fdAA134A4ED45f7B584cAf96D7792Eff");
pub const AAVE_POOL_OPTIMISM_SEPOLIA: Address = address!("b50201558B00496A145fE76f7424749556E326D8");
pub const AAVE_WETH_GATEWAY_ARBITRUM_SEPOLIA: Address = address!("20040a64612555042335926d72B4E5F667a67fA1");
pub const AAVE_WETH_GATEWAY_OPTIMISM_SEPOLIA: Address = address!("589750BA8aF186cE5B55391B0b7148cAD43a1619");
pub const AAVE_AWETH_ARBITRUM_SEPOLIA: Address = address!("f5f17ebe81e516dc7cb38d61908ec252f150ce60");
pub const AAVE_AWETH_OPTIMISM_SEPOLIA: Address = address!("23e4E76D01B2002BE436CE8d6044b0aA2f68B68a");
pub const AAVE_AUSDC_ARBITRUM_SEPOLIA: Address = address!("460b97bd498e1157530aeb3086301d5225b91216");
pub const AAVE_AUSDC_OPTIMISM_SEPOLIA: Address = address!("a818f1b57c201e092c4a2017a91815034326efd1");

// Compound v3 (Base Sepolia 전용)
pub const COMPOUND_WETH_COMET_BASE_SEPOLIA: Address = address!("61490650AbaA31393464C3f34E8B29cd1C44118E");
pub const COMPOUND_USDC_COMET_BASE_SEPOLIA: Address = address!("571621Ce60Cebb0c1D442B5afb38B1663C6Bf017");
pub const WETH_BASE_SEPOLIA: Address = address!("4200000000000000000000000000000000000006");

// 설정에서 덮어쓰지 않을 때 쓰는 공개 RPC 엔드포인트
pub const ETH_SEPOLIA_RPC: &str = "https://ethereum-sepolia-rpc.publicnode.com";
pub const AVAX_FUJI_RPC: &str = "https://api.avax-test.network/ext/bc/C/rpc";
pub const BASE_SEPOLIA_RPC: &str = "https://sepolia.base.org";
pub const SONIC_BLAZE_RPC: &str = "https://rpc.blaze.soniclabs.com";
pub const LINEA_SEPOLIA_RPC: &str = "https://rpc.sepolia.linea.build";
pub const ARBITRUM_SEPOLIA_RPC: &str = "https://sepolia-rollup.arbitrum.io/rpc";
pub const OPTIMISM_SEPOLIA_RPC: &str = "https://sepolia.optimism.io";
