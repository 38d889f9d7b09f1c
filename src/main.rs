use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use rust_decimal::Decimal;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crosslend::config::Config;
use crosslend::core::OperationEngine;
use crosslend::mocks::is_mock_mode;
use crosslend::types::{Asset, BridgeRequest, LendingProtocol, LendingRequest, Operation, TransferRequest};

fn cli() -> Command {
    let owner = Arg::new("owner")
        .long("owner")
        .value_name("OWNER")
        .help("지갑 소유자 ID")
        .required(true);
    let amount = Arg::new("amount")
        .long("amount")
        .value_name("AMOUNT")
        .help("금액 (단위: 토큰, 예: 1.5)")
        .required(true);
    let network = Arg::new("network")
        .short('n')
        .long("network")
        .value_name("NETWORK")
        .help("네트워크 이름, 별칭 또는 체인 ID")
        .required(true);
    let asset = Arg::new("asset")
        .long("asset")
        .value_name("ASSET")
        .help("자산 (ETH, USDC)")
        .required(true);
    let protocol = Arg::new("protocol")
        .short('p')
        .long("protocol")
        .value_name("PROTOCOL")
        .help("렌딩 프로토콜 (aave, compound)")
        .required(true);

    Command::new("crosslend")
        .version(env!("CARGO_PKG_VERSION"))
        .about("🦀 커스터디 지갑 CCTP 전송 및 렌딩 오케스트레이터")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("설정 파일 경로 (기본: config/default.toml)")
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .short('l')
                .long("log-level")
                .value_name("LEVEL")
                .help("로그 레벨 (trace, debug, info, warn, error)")
                .global(true),
        )
        .arg(
            Arg::new("mock")
                .long("mock")
                .help("Mock 서비스로 실행 (API_MODE=mock 과 동일)")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("transfer")
                .about("같은 체인 내 전송")
                .arg(network.clone())
                .arg(asset.clone())
                .arg(amount.clone())
                .arg(owner.clone())
                .arg(Arg::new("to").long("to").value_name("ADDRESS").required(true)),
        )
        .subcommand(
            Command::new("bridge")
                .about("CCTP USDC 소각-민트 전송")
                .arg(Arg::new("from").long("from").value_name("NETWORK").required(true))
                .arg(Arg::new("to").long("to").value_name("NETWORK").required(true))
                .arg(amount.clone())
                .arg(owner.clone())
                .arg(Arg::new("recipient").long("recipient").value_name("ADDRESS").required(true)),
        )
        .subcommand(
            Command::new("lend")
                .about("렌딩 프로토콜에 공급")
                .arg(protocol.clone())
                .arg(network.clone())
                .arg(asset.clone())
                .arg(amount.clone())
                .arg(owner.clone()),
        )
        .subcommand(
            Command::new("withdraw")
                .about("렌딩 프로토콜에서 출금")
                .arg(protocol)
                .arg(network.clone())
                .arg(asset.clone())
                .arg(amount)
                .arg(owner.clone()),
        )
        .subcommand(
            Command::new("balances")
                .about("지갑 잔액 조회")
                .arg(owner.clone())
                .arg(network.required(false))
                .arg(asset.required(false)),
        )
        .subcommand(Command::new("positions").about("렌딩 포지션 조회").arg(owner))
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(String::as_str)
        .with_context(|| format!("missing --{}", name))
}

fn amount(matches: &ArgMatches) -> Result<Decimal> {
    let raw = arg(matches, "amount")?;
    Decimal::from_str(raw).with_context(|| format!("invalid amount: {}", raw))
}

fn lending_request(matches: &ArgMatches) -> Result<LendingRequest> {
    Ok(LendingRequest {
        protocol: arg(matches, "protocol")?.parse::<LendingProtocol>()?,
        network: arg(matches, "network")?.to_string(),
        asset: arg(matches, "asset")?.parse::<Asset>()?,
        amount: amount(matches)?,
        owner: arg(matches, "owner")?.to_string(),
    })
}

fn operation(name: &str, matches: &ArgMatches) -> Result<Option<Operation>> {
    let operation = match name {
        "transfer" => Operation::Transfer(TransferRequest {
            network: arg(matches, "network")?.to_string(),
            asset: arg(matches, "asset")?.parse::<Asset>()?,
            amount: amount(matches)?,
            owner: arg(matches, "owner")?.to_string(),
            destination: arg(matches, "to")?.to_string(),
        }),
        "bridge" => Operation::CctpBridge(BridgeRequest {
            source_network: arg(matches, "from")?.to_string(),
            destination_network: arg(matches, "to")?.to_string(),
            amount: amount(matches)?,
            owner: arg(matches, "owner")?.to_string(),
            destination: arg(matches, "recipient")?.to_string(),
        }),
        "lend" => Operation::LendSupply(lending_request(matches)?),
        "withdraw" => Operation::LendWithdraw(lending_request(matches)?),
        _ => return Ok(None),
    };
    Ok(Some(operation))
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let config_path = matches.get_one::<String>("config").map(String::as_str);
    let config = Config::load(config_path)?;

    // 로깅 초기화
    let log_level = matches
        .get_one::<String>("log-level")
        .cloned()
        .unwrap_or_else(|| config.monitoring.log_level.clone());
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| log_level.as_str().into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mock = matches.get_flag("mock") || is_mock_mode();
    if mock {
        warn!("🎭 Mock 모드 - 실제 트랜잭션을 제출하지 않습니다");
    }

    let engine = OperationEngine::from_config(&config, mock).context("엔진 초기화 실패")?;

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("🛑 종료 신호 수신됨, 진행 중인 작업을 취소합니다");
                trigger.cancel();
            }
            Err(err) => error!("❌ 신호 처리 오류: {}", err),
        }
    });

    let Some((name, sub)) = matches.subcommand() else {
        return Ok(());
    };

    match name {
        "balances" => {
            let owner = arg(sub, "owner")?;
            match (sub.get_one::<String>("network"), sub.get_one::<String>("asset")) {
                (Some(network), Some(asset)) => {
                    let balance = engine.balances().balance(owner, network, asset.parse::<Asset>()?).await?;
                    println!("{}", serde_json::to_string_pretty(&balance)?);
                }
                _ => {
                    let balances = engine.balances().wallet_balances(owner).await;
                    println!("{}", serde_json::to_string_pretty(&balances)?);
                }
            }
        }
        "positions" => {
            let positions = engine.balances().lending_positions(arg(sub, "owner")?).await;
            println!("{}", serde_json::to_string_pretty(&positions)?);
        }
        other => {
            let Some(operation) = operation(other, sub)? else {
                anyhow::bail!("unknown command: {}", other);
            };
            let outcome = engine.execute(operation, &cancel).await;
            info!("📋 결과: {}", outcome.summary());
            println!("{}", serde_json::to_string_pretty(&outcome)?);
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
