use std::path::PathBuf;

use clap::Parser;

use crate::app_config::Overrides;

#[derive(Parser, Debug)]
#[command(
    name = "vacation",
    version,
    about = "Travel reservation workload against an in-memory resource manager"
)]
pub struct Cli {
    /// Number of clients
    #[arg(short = 'c', long)]
    pub clients: Option<u32>,

    /// Maximum queries (or updates) per transaction
    #[arg(short = 'n', long = "number")]
    pub queries_per_transaction: Option<u32>,

    /// Percentage of relations queried
    #[arg(short = 'q', long = "queried")]
    pub percent_queried: Option<u32>,

    /// Number of records per table
    #[arg(short = 'r', long)]
    pub relations: Option<u32>,

    /// Total number of transactions
    #[arg(short = 't', long)]
    pub transactions: Option<u32>,

    /// Percentage of transactions that are user reservations
    #[arg(short = 'u', long = "user")]
    pub percent_user: Option<u32>,

    /// Base random seed
    #[arg(long)]
    pub seed: Option<u32>,

    /// Config file (defaults to an optional config/vacation.*)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Output the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Leave the tables populated after the audit
    #[arg(long)]
    pub skip_teardown: bool,
}

impl Cli {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            clients: self.clients,
            queries_per_transaction: self.queries_per_transaction,
            percent_queried: self.percent_queried,
            relations: self.relations,
            transactions: self.transactions,
            percent_user: self.percent_user,
            seed: self.seed,
        }
    }
}
