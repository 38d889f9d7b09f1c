//! Aave v3 담보 풀 배치

use alloy::primitives::{Address, U256};

use crate::blockchain::registry::ChainNetwork;
use crate::error::EncodingError;
use crate::types::{Asset, Batch};
use crate::utils::abi::CallEncoder;

/// `owner` 명의로 `asset` 을 `amount` 만큼 공급.
///
/// 네이티브: WETH gateway 의 `depositETH` 하나, value 포함.
/// USDC: approve(pool) + supply.
pub fn supply_batch(
    encoder: &CallEncoder,
    network: &ChainNetwork,
    asset: Asset,
    amount: U256,
    owner: Address,
) -> Result<Batch, EncodingError> {
    let pool = network.aave_pool()?;
    match asset {
        Asset::Eth => {
            let gateway = network.aave_weth_gateway()?;
            Batch::new(vec![encoder.aave_deposit_eth(gateway, pool, owner, amount)])
        }
        Asset::Usdc => {
            let usdc = network.usdc()?;
            Batch::new(vec![
                encoder.erc20_approve(usdc, pool, amount),
                encoder.aave_supply(pool, usdc, amount, owner),
            ])
        }
    }
}

/// `asset` 을 `amount` 만큼 `owner` 에게 출금.
///
/// 네이티브: gateway 가 aWETH 를 소각하므로 먼저 aWETH 토큰에
/// allowance 가 필요하다.
pub fn withdraw_batch(
    encoder: &CallEncoder,
    network: &ChainNetwork,
    asset: Asset,
    amount: U256,
    owner: Address,
) -> Result<Batch, EncodingError> {
    let pool = network.aave_pool()?;
    match asset {
        Asset::Eth => {
            let gateway = network.aave_weth_gateway()?;
            let aweth = network.aave_aweth()?;
            Batch::new(vec![
                encoder.erc20_approve(aweth, gateway, amount),
                encoder.aave_withdraw_eth(gateway, pool, amount, owner),
            ])
        }
        Asset::Usdc => {
            let usdc = network.usdc()?;
            Batch::new(vec![
                encoder.erc20_approve(usdc, pool, amount),
                encoder.aave_withdraw(pool, usdc, amount, owner),
            ])
        }
    }
}
