//! Ordered instruction lists that stand up the mock coordinator and the raffle
//! on a cluster. Development chains get a fresh mock with a funded
//! subscription; live clusters reuse the configured one.

use solana_program::{instruction::Instruction, program_error::ProgramError, pubkey::Pubkey};
use thiserror::Error;

use crate::{
    instruction,
    network_config::{is_development_chain, network_config, CoordinatorAccounts, NetworkConfig},
    state::RaffleStack,
    vrf_coordinator,
};

/// Subscription funding on development chains: 10 LINK in juels
pub const VRF_SUBSCRIPTION_FUND_AMOUNT: u64 = 10_000_000_000_000_000_000;

/// Id the mock gives its first subscription
pub const FIRST_SUBSCRIPTION_ID: u64 = 1;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    #[error("No network configuration for {0}")]
    UnknownNetwork(String),

    #[error("No VRF coordinator configured for {0}")]
    MissingCoordinator(String),

    #[error("Failed to build instruction: {0}")]
    Instruction(#[from] ProgramError),
}

/// Instructions and resulting addresses of a raffle deployment
#[derive(Clone, Debug, PartialEq)]
pub struct Deployment {
    pub instructions: Vec<Instruction>,
    pub raffle_stack: Pubkey,
    pub coordinator: CoordinatorAccounts,
    pub subscription_id: u64,
}

pub fn resolve_network(name: &str) -> Result<NetworkConfig, DeployError> {
    network_config(name).ok_or_else(|| DeployError::UnknownNetwork(name.to_string()))
}

/// Coordinator mock setup; empty outside development chains
pub fn deploy_mocks(
    network: &NetworkConfig,
    coordinator_program: &Pubkey,
    deployer: &Pubkey,
) -> Result<Vec<Instruction>, DeployError> {
    if !is_development_chain(network.name) {
        return Ok(Vec::new());
    }
    Ok(vec![vrf_coordinator::instruction::initialize(
        coordinator_program,
        deployer,
        vrf_coordinator::BASE_FEE,
        vrf_coordinator::GAS_PRICE_LINK,
    )?])
}

/// Coordinator the raffle talks to: the mock under `mock_program` on
/// development chains, the configured one elsewhere
pub fn resolve_coordinator(
    network: &NetworkConfig,
    mock_program: &Pubkey,
) -> Result<CoordinatorAccounts, DeployError> {
    if is_development_chain(network.name) {
        return Ok(CoordinatorAccounts::for_program(*mock_program));
    }
    network
        .vrf_coordinator
        .ok_or_else(|| DeployError::MissingCoordinator(network.name.to_string()))
}

/// Raffle setup. On development chains the deployer also creates and funds
/// subscription `FIRST_SUBSCRIPTION_ID` on the mock under `mock_program` and
/// registers the raffle as its consumer. Live clusters use the coordinator
/// and subscription from the network table; `mock_program` is ignored there.
pub fn deploy_raffle_stack(
    network: &NetworkConfig,
    raffle_program: &Pubkey,
    mock_program: &Pubkey,
    deployer: &Pubkey,
) -> Result<Deployment, DeployError> {
    let (raffle_stack, _) = RaffleStack::find_address(raffle_program);
    let coordinator = resolve_coordinator(network, mock_program)?;
    let development = is_development_chain(network.name);
    let subscription_id = if development {
        FIRST_SUBSCRIPTION_ID
    } else {
        network.subscription_id
    };

    let mut instructions = Vec::new();
    if development {
        instructions.push(vrf_coordinator::instruction::create_subscription(
            &coordinator.program_id,
            deployer,
        )?);
        instructions.push(vrf_coordinator::instruction::fund_subscription(
            &coordinator.program_id,
            deployer,
            subscription_id,
            VRF_SUBSCRIPTION_FUND_AMOUNT,
        )?);
    }

    instructions.push(instruction::initialize(
        raffle_program,
        deployer,
        &coordinator.program_id,
        &coordinator.coordinator,
        network.entrance_fee,
        network.interval,
        network.gas_lane,
        subscription_id,
        network.callback_gas_limit,
    )?);

    if development {
        instructions.push(vrf_coordinator::instruction::add_consumer(
            &coordinator.program_id,
            deployer,
            subscription_id,
            &raffle_stack,
        )?);
    }

    Ok(Deployment {
        instructions,
        raffle_stack,
        coordinator,
        subscription_id,
    })
}
