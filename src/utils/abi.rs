use alloy::primitives::{Address, Bytes, B256, U256};
use alloy::sol;
use alloy::sol_types::SolCall;
use tracing::debug;

use crate::blockchain::registry::ChainNetwork;
use crate::constants::DEFAULT_FINALITY_THRESHOLD;
use crate::error::EncodingError;
use crate::types::{Attestation, Batch, CallStep};
use crate::utils::validation::recipient_to_bytes32;

// 엔진이 사용하는 Solidity 인터페이스

// ERC20 토큰 인터페이스
sol! {
    interface IERC20 {
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
        function balanceOf(address account) external view returns (uint256);
    }
}

// CCTP v2 소각 측
sol! {
    interface ITokenMessengerV2 {
        function depositForBurnWithHook(
            uint256 amount,
            uint32 destinationDomain,
            bytes32 mintRecipient,
            address burnToken,
            bytes32 destinationCaller,
            uint256 maxFee,
            uint32 minFinalityThreshold,
            bytes calldata hookData
        ) external;
    }
}

// CCTP v2 mint 측
sol! {
    interface IMessageTransmitterV2 {
        function receiveMessage(bytes calldata message, bytes calldata attestation)
            external returns (bool success);
    }
}

// Aave V3 Pool 인터페이스
sol! {
    interface IAavePool {
        function supply(address asset, uint256 amount, address onBehalfOf, uint16 referralCode) external;
        function withdraw(address asset, uint256 amount, address to) external returns (uint256);
    }
}

// Aave WrappedTokenGatewayV3
sol! {
    interface IWrappedTokenGateway {
        function depositETH(address pool, address onBehalfOf, uint16 referralCode) external payable;
        function withdrawETH(address pool, uint256 amount, address to) external;
    }
}

// Compound V3 Comet
sol! {
    interface IComet {
        function supply(address asset, uint256 amount) external;
        function withdraw(address asset, uint256 amount) external;
        function balanceOf(address account) external view returns (uint256);
        function collateralBalanceOf(address account, address asset) external view returns (uint128);
    }
}

// 래핑된 네이티브 토큰
sol! {
    interface IWETH {
        function deposit() external payable;
        function withdraw(uint256 wad) external;
    }
}

// 스마트 컨트랙트 계정의 배치 진입점
sol! {
    interface IBatchExecutor {
        struct Call {
            address target;
            uint256 value;
            bytes data;
        }

        function executeBatch(Call[] calldata calls) external payable;
    }
}

/// 지갑 배치 진입점의 정규 시그니처
pub const EXECUTE_BATCH_SIGNATURE: &str = "executeBatch((address,uint256,bytes)[])";

/// 모든 소각에 붙는 no-op hook 데이터: 0 워드 하나.
/// hook 버전의 TokenMessenger 는 빈 `hookData` 를 거부한다.
pub const NOOP_HOOK_DATA: [u8; 32] = [0u8; 32];

/// 엔진이 만드는 모든 컨트랙트 호출의 순수 call data 빌더.
///
/// 소각에 쓰는 finality threshold 외에는 상태가 없어서 같은
/// 입력은 항상 같은 바이트를 만든다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallEncoder {
    finality_threshold: u32,
}

impl CallEncoder {
    pub fn new() -> Self {
        Self::with_finality_threshold(DEFAULT_FINALITY_THRESHOLD)
    }

    pub fn with_finality_threshold(finality_threshold: u32) -> Self {
        Self { finality_threshold }
    }

    pub fn finality_threshold(&self) -> u32 {
        self.finality_threshold
    }

    // ---- ERC-20 ----

    pub fn erc20_approve(&self, token: Address, spender: Address, amount: U256) -> CallStep {
        let call = IERC20::approveCall { spender, amount };
        CallStep::new(token, call.abi_encode().into())
    }

    pub fn erc20_transfer(&self, token: Address, to: Address, amount: U256) -> CallStep {
        let call = IERC20::transferCall { to, amount };
        CallStep::new(token, call.abi_encode().into())
    }

    // ---- CCTP ----

    /// 소스 체인 TokenMessenger 의 `depositForBurnWithHook`.
    ///
    /// maxFee 는 `amount - 1` 이므로 0 수량은 underflow 전에
    /// 여기서 거부한다.
    pub fn deposit_for_burn(
        &self,
        source: &ChainNetwork,
        destination: &ChainNetwork,
        amount: U256,
        recipient: &str,
    ) -> Result<CallStep, EncodingError> {
        if amount.is_zero() {
            return Err(EncodingError::ZeroAmount);
        }
        let messenger = source.token_messenger()?;
        let burn_token = source.usdc()?;
        let destination_domain = destination.cctp_domain()?;
        let mint_recipient = recipient_to_bytes32(recipient)?;

        let call = ITokenMessengerV2::depositForBurnWithHookCall {
            amount,
            destinationDomain: destination_domain,
            mintRecipient: mint_recipient,
            burnToken: burn_token,
            destinationCaller: B256::ZERO,
            maxFee: amount - U256::from(1u64),
            minFinalityThreshold: self.finality_threshold,
            hookData: Bytes::copy_from_slice(&NOOP_HOOK_DATA),
        };
        debug!(
            "🔥 burn 인코딩: {} -> domain {} ({})",
            source.name, destination_domain, recipient
        );
        Ok(CallStep::new(messenger, call.abi_encode().into()))
    }

    /// approve(TokenMessenger, amount) 후 소각, 이 순서 고정
    pub fn approve_and_burn(
        &self,
        source: &ChainNetwork,
        destination: &ChainNetwork,
        amount: U256,
        recipient: &str,
    ) -> Result<Batch, EncodingError> {
        let burn = self.deposit_for_burn(source, destination, amount, recipient)?;
        let approve = self.erc20_approve(source.usdc()?, source.token_messenger()?, amount);
        Batch::new(vec![approve, burn])
    }

    /// 목적지 MessageTransmitter 의 `receiveMessage(message, attestation)`
    pub fn receive_message(
        &self,
        destination: &ChainNetwork,
        attestation: &Attestation,
    ) -> Result<CallStep, EncodingError> {
        let transmitter = destination.message_transmitter()?;
        let call = IMessageTransmitterV2::receiveMessageCall {
            message: attestation.message.clone(),
            attestation: attestation.attestation.clone(),
        };
        Ok(CallStep::new(transmitter, call.abi_encode().into()))
    }

    // ---- Aave ----

    pub fn aave_supply(&self, pool: Address, asset: Address, amount: U256, on_behalf_of: Address) -> CallStep {
        let call = IAavePool::supplyCall {
            asset,
            amount,
            onBehalfOf: on_behalf_of,
            referralCode: 0,
        };
        CallStep::new(pool, call.abi_encode().into())
    }

    pub fn aave_withdraw(&self, pool: Address, asset: Address, amount: U256, to: Address) -> CallStep {
        let call = IAavePool::withdrawCall { asset, amount, to };
        CallStep::new(pool, call.abi_encode().into())
    }

    /// WETH gateway 를 통한 네이티브 예치. `amount` 는 call value 로 전달
    pub fn aave_deposit_eth(&self, gateway: Address, pool: Address, on_behalf_of: Address, amount: U256) -> CallStep {
        let call = IWrappedTokenGateway::depositETHCall {
            pool,
            onBehalfOf: on_behalf_of,
            referralCode: 0,
        };
        CallStep::with_value(gateway, amount, call.abi_encode().into())
    }

    pub fn aave_withdraw_eth(&self, gateway: Address, pool: Address, amount: U256, to: Address) -> CallStep {
        let call = IWrappedTokenGateway::withdrawETHCall { pool, amount, to };
        CallStep::new(gateway, call.abi_encode().into())
    }

    // ---- Compound ----

    pub fn comet_supply(&self, comet: Address, asset: Address, amount: U256) -> CallStep {
        let call = IComet::supplyCall { asset, amount };
        CallStep::new(comet, call.abi_encode().into())
    }

    pub fn comet_withdraw(&self, comet: Address, asset: Address, amount: U256) -> CallStep {
        let call = IComet::withdrawCall { asset, amount };
        CallStep::new(comet, call.abi_encode().into())
    }

    // ---- WETH ----

    pub fn weth_deposit(&self, weth: Address, amount: U256) -> CallStep {
        CallStep::with_value(weth, amount, IWETH::depositCall {}.abi_encode().into())
    }

    pub fn weth_withdraw(&self, weth: Address, amount: U256) -> CallStep {
        let call = IWETH::withdrawCall { wad: amount };
        CallStep::new(weth, call.abi_encode().into())
    }

    // ---- Wallet batch ----

    /// 배치를 지갑 자신을 대상으로 하는 `executeBatch` 호출 하나로 감싼다.
    /// 외부 호출에는 value 를 싣지 않고, 내부 호출의 value 는 지갑 잔액에서 나간다
    pub fn execute_batch(&self, wallet: Address, batch: &Batch) -> CallStep {
        let calls = batch
            .steps()
            .iter()
            .map(|step| IBatchExecutor::Call {
                target: step.target,
                value: step.value,
                data: step.data.clone(),
            })
            .collect();
        let call = IBatchExecutor::executeBatchCall { calls };
        CallStep::new(wallet, call.abi_encode().into())
    }

    /// `data` 가 호출 타입 `C` 의 selector 로 시작하는지
    pub fn matches<C: SolCall>(data: &[u8]) -> bool {
        data.len() >= 4 && data[..4] == C::SELECTOR
    }
}

impl Default for CallEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::registry::ChainRegistry;
    use crate::types::AttestationStatus;
    use alloy::primitives::{address, keccak256};

    const RECIPIENT: &str = "0x2222222222222222222222222222222222222222";

    fn selector_of(signature: &str) -> [u8; 4] {
        let hash = keccak256(signature.as_bytes());
        [hash[0], hash[1], hash[2], hash[3]]
    }

    #[test]
    fn test_erc20_selectors() {
        let encoder = CallEncoder::new();
        let token = address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238");

        let approve = encoder.erc20_approve(token, Address::ZERO, U256::from(1u64));
        assert_eq!(approve.selector(), Some([0x09, 0x5e, 0xa7, 0xb3]));
        assert_eq!(approve.target, token);

        let transfer = encoder.erc20_transfer(token, Address::ZERO, U256::from(1u64));
        assert_eq!(transfer.selector(), Some([0xa9, 0x05, 0x9c, 0xbb]));
        assert_eq!(transfer.value, U256::ZERO);
    }

    #[test]
    fn test_lending_selectors_match_signatures() {
        let encoder = CallEncoder::new();
        let a = Address::ZERO;
        let amt = U256::from(10u64);

        let cases = [
            (encoder.aave_supply(a, a, amt, a), "supply(address,uint256,address,uint16)"),
            (encoder.aave_withdraw(a, a, amt, a), "withdraw(address,uint256,address)"),
            (encoder.aave_deposit_eth(a, a, a, amt), "depositETH(address,address,uint16)"),
            (encoder.aave_withdraw_eth(a, a, amt, a), "withdrawETH(address,uint256,address)"),
            (encoder.comet_supply(a, a, amt), "supply(address,uint256)"),
            (encoder.comet_withdraw(a, a, amt), "withdraw(address,uint256)"),
            (encoder.weth_deposit(a, amt), "deposit()"),
            (encoder.weth_withdraw(a, amt), "withdraw(uint256)"),
        ];
        for (step, signature) in cases {
            assert_eq!(step.selector(), Some(selector_of(signature)), "{}", signature);
        }
        assert_eq!(encoder.aave_deposit_eth(a, a, a, amt).value, amt);
        assert_eq!(encoder.weth_deposit(a, amt).value, amt);
    }

    #[test]
    fn test_burn_encoding_fields() {
        let registry = ChainRegistry::testnet();
        let source = registry.resolve("ethereum sepolia").unwrap();
        let destination = registry.resolve("base").unwrap();
        let encoder = CallEncoder::new();

        let amount = U256::from(1_000_000u64);
        let step = encoder
            .deposit_for_burn(source, destination, amount, RECIPIENT)
            .unwrap();
        assert_eq!(step.target, source.token_messenger().unwrap());
        assert_eq!(
            step.selector(),
            Some(selector_of(
                "depositForBurnWithHook(uint256,uint32,bytes32,address,bytes32,uint256,uint32,bytes)"
            ))
        );

        let decoded = ITokenMessengerV2::depositForBurnWithHookCall::abi_decode_raw(&step.data[4..]).unwrap();
        assert_eq!(decoded.amount, amount);
        assert_eq!(decoded.destinationDomain, 6);
        assert_eq!(decoded.maxFee, U256::from(999_999u64));
        assert_eq!(decoded.minFinalityThreshold, 1000);
        assert_eq!(decoded.destinationCaller, B256::ZERO);
        assert_eq!(decoded.burnToken, source.usdc().unwrap());
        assert_eq!(&decoded.mintRecipient[..12], &[0u8; 12]);
        assert_eq!(&decoded.mintRecipient[12..], &[0x22u8; 20]);
        assert_eq!(decoded.hookData.as_ref(), &NOOP_HOOK_DATA);
    }

    #[test]
    fn test_burn_edge_cases() {
        let registry = ChainRegistry::testnet();
        let source = registry.resolve("ethereum sepolia").unwrap();
        let destination = registry.resolve("base").unwrap();
        let encoder = CallEncoder::new();

        assert_eq!(
            encoder.deposit_for_burn(source, destination, U256::ZERO, RECIPIENT),
            Err(EncodingError::ZeroAmount)
        );

        // amount 1 이면 max fee 는 0
        let step = encoder
            .deposit_for_burn(source, destination, U256::from(1u64), RECIPIENT)
            .unwrap();
        let decoded = ITokenMessengerV2::depositForBurnWithHookCall::abi_decode_raw(&step.data[4..]).unwrap();
        assert_eq!(decoded.maxFee, U256::ZERO);

        assert!(matches!(
            encoder.deposit_for_burn(source, destination, U256::from(5u64), "0x123"),
            Err(EncodingError::InvalidAddress(_))
        ));
    }

    #[test]
    fn test_custom_finality_threshold() {
        let registry = ChainRegistry::testnet();
        let source = registry.resolve("avax").unwrap();
        let destination = registry.resolve("arbitrum").unwrap();
        let encoder = CallEncoder::with_finality_threshold(2000);

        let step = encoder
            .deposit_for_burn(source, destination, U256::from(7u64), RECIPIENT)
            .unwrap();
        let decoded = ITokenMessengerV2::depositForBurnWithHookCall::abi_decode_raw(&step.data[4..]).unwrap();
        assert_eq!(decoded.minFinalityThreshold, 2000);
        assert_eq!(decoded.destinationDomain, 3);
    }

    #[test]
    fn test_approve_and_burn_order_and_determinism() {
        let registry = ChainRegistry::testnet();
        let source = registry.resolve("base").unwrap();
        let destination = registry.resolve("optimism").unwrap();
        let encoder = CallEncoder::new();

        let batch = encoder
            .approve_and_burn(source, destination, U256::from(5_000_000u64), RECIPIENT)
            .unwrap();
        assert_eq!(batch.len(), 2);
        assert!(CallEncoder::matches::<IERC20::approveCall>(&batch.steps()[0].data));
        assert_eq!(batch.steps()[0].target, source.usdc().unwrap());
        assert!(CallEncoder::matches::<ITokenMessengerV2::depositForBurnWithHookCall>(
            &batch.steps()[1].data
        ));

        let again = encoder
            .approve_and_burn(source, destination, U256::from(5_000_000u64), RECIPIENT)
            .unwrap();
        assert_eq!(batch, again);
    }

    #[test]
    fn test_receive_message_round_trip() {
        let registry = ChainRegistry::testnet();
        let destination = registry.resolve("linea").unwrap();
        let attestation = Attestation {
            message: Bytes::from(vec![0xaa; 120]),
            attestation: Bytes::from(vec![0xbb; 65]),
            status: AttestationStatus::Complete,
        };

        let step = CallEncoder::new().receive_message(destination, &attestation).unwrap();
        assert_eq!(step.target, destination.message_transmitter().unwrap());
        assert_eq!(step.selector(), Some(selector_of("receiveMessage(bytes,bytes)")));

        let decoded = IMessageTransmitterV2::receiveMessageCall::abi_decode_raw(&step.data[4..]).unwrap();
        assert_eq!(decoded.message, attestation.message);
        assert_eq!(decoded.attestation, attestation.attestation);
    }

    #[test]
    fn test_execute_batch_wraps_steps_in_order() {
        let encoder = CallEncoder::new();
        let wallet = address!("3333333333333333333333333333333333333333");
        let weth = address!("4200000000000000000000000000000000000006");
        let batch = Batch::new(vec![
            encoder.weth_deposit(weth, U256::from(100u64)),
            encoder.erc20_approve(weth, wallet, U256::from(100u64)),
        ])
        .unwrap();

        let step = encoder.execute_batch(wallet, &batch);
        assert_eq!(step.target, wallet);
        // 바깥 호출에는 native amount 가 없음
        assert_eq!(step.value, U256::ZERO);
        assert_eq!(step.selector(), Some(selector_of(EXECUTE_BATCH_SIGNATURE)));

        let decoded = IBatchExecutor::executeBatchCall::abi_decode_raw(&step.data[4..]).unwrap();
        assert_eq!(decoded.calls.len(), 2);
        assert_eq!(decoded.calls[0].target, weth);
        assert_eq!(decoded.calls[0].value, U256::from(100u64));
        assert_eq!(decoded.calls[1].data, batch.steps()[1].data);
    }

    #[test]
    fn test_missing_mapping_surfaces_before_encoding() {
        let registry = ChainRegistry::testnet();
        let mut broken = registry.resolve("base").unwrap().clone();
        broken.contracts.token_messenger = None;
        let destination = registry.resolve("optimism").unwrap();

        let err = CallEncoder::new()
            .deposit_for_burn(&broken, destination, U256::from(1u64), RECIPIENT)
            .unwrap_err();
        assert!(matches!(err, EncodingError::MissingAddress { contract: "CCTP TokenMessenger", .. }));
    }
}
