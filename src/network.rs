// Per-cluster raffle parameters
use crate::state::{OracleConfig, RaffleConfig};
use solana_program::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Cluster {
    Localnet,
    Devnet,
    Testnet,
    MainnetBeta,
}

impl Cluster {
    /// Local clusters run against a mock oracle
    pub fn is_development(&self) -> bool {
        matches!(self, Cluster::Localnet)
    }
}

impl FromStr for Cluster {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "localnet" | "localhost" => Ok(Cluster::Localnet),
            "devnet" => Ok(Cluster::Devnet),
            "testnet" => Ok(Cluster::Testnet),
            "mainnet" | "mainnet-beta" => Ok(Cluster::MainnetBeta),
            _ => Err(format!("unknown cluster: {}", s)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NetworkConfig {
    pub entry_fee: u64,
    pub interval: u64,
    pub max_entrants: u32,
    pub draw_timeout: u64,
    pub key_hash: [u8; 32],
    pub subscription_id: u64,
    pub request_confirmations: u16,
    pub callback_compute_limit: u32,
}

impl NetworkConfig {
    pub fn for_cluster(cluster: Cluster) -> Self {
        match cluster {
            Cluster::Localnet => Self {
                entry_fee: LAMPORTS_PER_SOL / 100,
                interval: 30,
                max_entrants: 64,
                draw_timeout: 300,
                key_hash: [0; 32],
                subscription_id: 0,
                request_confirmations: 1,
                callback_compute_limit: 500_000,
            },
            Cluster::Devnet | Cluster::Testnet => Self {
                entry_fee: LAMPORTS_PER_SOL / 100,
                interval: 30,
                max_entrants: 256,
                draw_timeout: 3_600,
                key_hash: [1; 32],
                subscription_id: 1,
                request_confirmations: 2,
                callback_compute_limit: 500_000,
            },
            Cluster::MainnetBeta => Self {
                entry_fee: LAMPORTS_PER_SOL / 10,
                interval: 86_400,
                max_entrants: 256,
                draw_timeout: 86_400,
                key_hash: [2; 32],
                subscription_id: 1,
                request_confirmations: 3,
                callback_compute_limit: 500_000,
            },
        }
    }

    pub fn raffle_config(&self, oracle_authority: Pubkey) -> RaffleConfig {
        RaffleConfig {
            entry_fee: self.entry_fee,
            interval: self.interval,
            max_entrants: self.max_entrants,
            draw_timeout: self.draw_timeout,
            oracle: OracleConfig {
                authority: oracle_authority,
                key_hash: self.key_hash,
                subscription_id: self.subscription_id,
                request_confirmations: self.request_confirmations,
                callback_compute_limit: self.callback_compute_limit,
                num_words: 1,
            },
        }
    }
}
