// Per-cluster deployment parameters
use solana_program::pubkey::Pubkey;

use crate::vrf_coordinator::state::Coordinator;

/// Clusters that get the VRF coordinator mock deployed
pub const DEVELOPMENT_CHAINS: &[&str] = &["localnet", "localhost"];

/// Key hash of the oracle job. Mocks ignore it, live coordinators route on it.
pub const DEFAULT_GAS_LANE: [u8; 32] = [
    216, 155, 43, 241, 80, 227, 185, 225, 52, 70, 152, 110, 87, 31, 185, 202, 178, 75, 19, 206,
    160, 164, 62, 162, 10, 96, 73, 168, 92, 200, 7, 204,
];

/// 0.01 SOL
pub const DEFAULT_ENTRANCE_FEE: u64 = 10_000_000;
pub const DEFAULT_INTERVAL: u64 = 30;
pub const DEFAULT_CALLBACK_GAS_LIMIT: u32 = 500_000;

/// Where the coordinator lives on a cluster
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CoordinatorAccounts {
    pub program_id: Pubkey,
    pub coordinator: Pubkey,
}

impl CoordinatorAccounts {
    /// Accounts of a coordinator deployed under `program_id`
    pub fn for_program(program_id: Pubkey) -> Self {
        let (coordinator, _) = Coordinator::find_address(&program_id);
        Self {
            program_id,
            coordinator,
        }
    }
}

/// Parameters the raffle is deployed with on one cluster
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    pub name: &'static str,
    /// Lamports
    pub entrance_fee: u64,
    pub gas_lane: [u8; 32],
    /// Live subscription; development chains create their own
    pub subscription_id: u64,
    pub callback_gas_limit: u32,
    /// Seconds between rounds
    pub interval: u64,
    pub block_confirmations: u32,
    /// Live coordinator; `None` on development chains, which deploy the mock
    pub vrf_coordinator: Option<CoordinatorAccounts>,
}

/// Look up the parameters for a cluster by name
pub fn network_config(name: &str) -> Option<NetworkConfig> {
    match name {
        "devnet" => Some(NetworkConfig {
            name: "devnet",
            entrance_fee: DEFAULT_ENTRANCE_FEE,
            gas_lane: DEFAULT_GAS_LANE,
            subscription_id: 0,
            callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
            interval: DEFAULT_INTERVAL,
            block_confirmations: 6,
            // Set once a coordinator program is deployed on devnet
            vrf_coordinator: None,
        }),
        "localnet" | "localhost" => Some(NetworkConfig {
            name: "localnet",
            entrance_fee: DEFAULT_ENTRANCE_FEE,
            gas_lane: DEFAULT_GAS_LANE,
            subscription_id: 0,
            callback_gas_limit: DEFAULT_CALLBACK_GAS_LIMIT,
            interval: DEFAULT_INTERVAL,
            block_confirmations: 1,
            vrf_coordinator: None,
        }),
        _ => None,
    }
}

pub fn is_development_chain(name: &str) -> bool {
    DEVELOPMENT_CHAINS.contains(&name)
}
