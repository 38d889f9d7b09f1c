//! Compound v3 (Comet) 배치. 네이티브 자산은 먼저 WETH 로 래핑

use alloy::primitives::U256;

use crate::blockchain::registry::ChainNetwork;
use crate::error::EncodingError;
use crate::types::{Asset, Batch};
use crate::utils::abi::CallEncoder;

pub fn supply_batch(
    encoder: &CallEncoder,
    network: &ChainNetwork,
    asset: Asset,
    amount: U256,
) -> Result<Batch, EncodingError> {
    match asset {
        Asset::Eth => {
            let comet = network.compound_weth_comet()?;
            let weth = network.weth()?;
            Batch::new(vec![
                encoder.weth_deposit(weth, amount),
                encoder.erc20_approve(weth, comet, amount),
                encoder.comet_supply(comet, weth, amount),
            ])
        }
        Asset::Usdc => {
            let comet = network.compound_usdc_comet()?;
            let usdc = network.usdc()?;
            Batch::new(vec![
                encoder.erc20_approve(usdc, comet, amount),
                encoder.comet_supply(comet, usdc, amount),
            ])
        }
    }
}

/// 네이티브: comet 에서 WETH 를 꺼낸 뒤 언래핑. USDC: withdraw 하나
pub fn withdraw_batch(
    encoder: &CallEncoder,
    network: &ChainNetwork,
    asset: Asset,
    amount: U256,
) -> Result<Batch, EncodingError> {
    match asset {
        Asset::Eth => {
            let comet = network.compound_weth_comet()?;
            let weth = network.weth()?;
            Batch::new(vec![
                encoder.comet_withdraw(comet, weth, amount),
                encoder.weth_withdraw(weth, amount),
            ])
        }
        Asset::Usdc => {
            let comet = network.compound_usdc_comet()?;
            let usdc = network.usdc()?;
            Batch::new(vec![encoder.comet_withdraw(comet, usdc, amount)])
        }
    }
}
