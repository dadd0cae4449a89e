use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CLIENTS: u32 = 10;
pub const DEFAULT_QUERIES_PER_TRANSACTION: u32 = 10;
pub const DEFAULT_PERCENT_QUERIED: u32 = 90;
pub const DEFAULT_RELATIONS: u32 = 1 << 16;
pub const DEFAULT_TRANSACTIONS: u32 = 1 << 16;
pub const DEFAULT_PERCENT_USER: u32 = 80;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct Config {
    pub workload: WorkloadConfig,
    /// Base seed; client `i` runs with `seed + i`.
    #[serde(default)]
    pub seed: u32,
}

/// Shape of the load driven against the resource manager.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadConfig {
    /// Number of client threads.
    pub clients: u32,
    /// Upper bound on queries (or updates) issued by one transaction.
    pub queries_per_transaction: u32,
    /// Share of the relations a client may touch, in percent.
    pub percent_queried: u32,
    /// Ids `1..=relations` are populated in every table.
    pub relations: u32,
    /// Total transactions, split evenly over the clients.
    pub transactions: u32,
    /// Share of transactions that are reservations, in percent.
    pub percent_user: u32,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            clients: DEFAULT_CLIENTS,
            queries_per_transaction: DEFAULT_QUERIES_PER_TRANSACTION,
            percent_queried: DEFAULT_PERCENT_QUERIED,
            relations: DEFAULT_RELATIONS,
            transactions: DEFAULT_TRANSACTIONS,
            percent_user: DEFAULT_PERCENT_USER,
        }
    }
}

impl WorkloadConfig {
    /// Ids handed to clients are drawn from `1..=query_range`.
    pub fn query_range(&self) -> i64 {
        (f64::from(self.percent_queried) / 100.0 * f64::from(self.relations) + 0.5) as i64
    }

    pub fn transactions_per_client(&self) -> u64 {
        if self.clients == 0 {
            return 0;
        }
        (f64::from(self.transactions) / f64::from(self.clients) + 0.5) as u64
    }

    pub fn validate(&self) -> Result<(), WorkloadError> {
        at_least("clients", self.clients, 1)?;
        at_least("queries_per_transaction", self.queries_per_transaction, 1)?;
        at_least("relations", self.relations, 1)?;
        percentage("percent_queried", self.percent_queried)?;
        percentage("percent_user", self.percent_user)?;

        if self.query_range() < 1 {
            return Err(WorkloadError::EmptyQueryRange {
                percent_queried: self.percent_queried,
                relations: self.relations,
            });
        }
        Ok(())
    }
}

fn at_least(field: &'static str, value: u32, min: u32) -> Result<(), WorkloadError> {
    if value < min {
        return Err(WorkloadError::TooSmall { field, min, value });
    }
    Ok(())
}

fn percentage(field: &'static str, value: u32) -> Result<(), WorkloadError> {
    if value > 100 {
        return Err(WorkloadError::NotAPercentage { field, value });
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkloadError {
    #[error("{field} must be at least {min}, got {value}")]
    TooSmall {
        field: &'static str,
        min: u32,
        value: u32,
    },

    #[error("{field} must be a percentage (0-100), got {value}")]
    NotAPercentage { field: &'static str, value: u32 },

    #[error("Query range is empty: {percent_queried}% of {relations} relations")]
    EmptyQueryRange { percent_queried: u32, relations: u32 },
}

/// Values given on the command line; they win over every other source.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config_file: Option<PathBuf>,
    pub clients: Option<u32>,
    pub queries_per_transaction: Option<u32>,
    pub percent_queried: Option<u32>,
    pub relations: Option<u32>,
    pub transactions: Option<u32>,
    pub percent_user: Option<u32>,
    pub seed: Option<u32>,
}

impl Config {
    pub fn load(overrides: &Overrides) -> Result<Self, config::ConfigError> {
        let defaults = WorkloadConfig::default();

        let builder = config::Config::builder()
            .set_default("seed", 0_i64)?
            .set_default("workload.clients", i64::from(defaults.clients))?
            .set_default(
                "workload.queries_per_transaction",
                i64::from(defaults.queries_per_transaction),
            )?
            .set_default("workload.percent_queried", i64::from(defaults.percent_queried))?
            .set_default("workload.relations", i64::from(defaults.relations))?
            .set_default("workload.transactions", i64::from(defaults.transactions))?
            .set_default("workload.percent_user", i64::from(defaults.percent_user))?;

        // An explicit file must exist; the conventional one is optional
        let builder = match &overrides.config_file {
            Some(path) => builder.add_source(config::File::from(path.as_path())),
            None => builder.add_source(config::File::with_name("config/vacation").required(false)),
        };

        let s = builder
            // Eg.. `VACATION__WORKLOAD__CLIENTS=4` would set `workload.clients`
            .add_source(
                config::Environment::with_prefix("VACATION")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("workload.clients", overrides.clients.map(i64::from))?
            .set_override_option(
                "workload.queries_per_transaction",
                overrides.queries_per_transaction.map(i64::from),
            )?
            .set_override_option(
                "workload.percent_queried",
                overrides.percent_queried.map(i64::from),
            )?
            .set_override_option("workload.relations", overrides.relations.map(i64::from))?
            .set_override_option("workload.transactions", overrides.transactions.map(i64::from))?
            .set_override_option("workload.percent_user", overrides.percent_user.map(i64::from))?
            .set_override_option("seed", overrides.seed.map(i64::from))?
            .build()?;

        s.try_deserialize()
    }
}
