use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use cryptofolio::{
    api::{CryptocompareClient, PriceFetcher, TablePriceFetcher},
    config::Config,
    functions::{exchange_balance, export_history, format_total, grand_total},
    logger::Logger,
    parsing::{build_exchanges, get_transactions},
    structs::{CoinRegistry, Portfolio, PriceTables},
};
use dotenv::dotenv;

#[derive(Parser, Debug)]
#[command(name = "cryptofolio", version, about = "Balance and history of a crypto portfolio read from exchange exports")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Log per-record details
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Current balance of each exchange, compared with the previous run
    Balance {
        /// Exchange export file or folder
        #[arg(long)]
        input: Option<PathBuf>,
        /// Folder of the <Exchange>Balance.json files
        #[arg(long)]
        snapshots: Option<PathBuf>,
        /// Folder of the price tables, used with --offline
        #[arg(long)]
        historical: Option<PathBuf>,
        #[arg(long)]
        fiat: Option<String>,
        /// Value coins with the newest price table entry instead of live prices
        #[arg(long)]
        offline: bool,
        /// Do not overwrite the previous balances
        #[arg(long)]
        no_save: bool,
    },
    /// Crypto, fiat and net value at each transaction date, as CSV
    History {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        historical: Option<PathBuf>,
        #[arg(long)]
        fiat: Option<String>,
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let cli = Cli::parse();
    Logger::init(cli.verbose).context("cannot install the logger")?;

    let config = Config::from_env();
    let registry = CoinRegistry::bundled().context("cannot read the coin database")?;

    match cli.command {
        Command::Balance {
            input,
            snapshots,
            historical,
            fiat,
            offline,
            no_save,
        } => {
            let input = input.unwrap_or_else(|| config.data_folder.clone());
            let snapshots = snapshots.unwrap_or_else(|| config.balance_folder.clone());
            let historical = historical.unwrap_or_else(|| config.historical_folder.clone());
            let fiat = fiat.map(|f| f.to_uppercase()).unwrap_or_else(|| config.fiat.clone());

            let exchanges = build_exchanges(&input, &registry)?;
            let tables = offline.then(|| PriceTables::load(&historical, &[fiat.as_str()]));
            let fetcher: Box<dyn PriceFetcher + '_> = match &tables {
                Some(tables) => Box::new(TablePriceFetcher::new(tables)),
                None => Box::new(CryptocompareClient::new(&config.price_api)?),
            };

            let mut balances = Vec::with_capacity(exchanges.len());
            for exchange in exchanges.iter() {
                let balance = exchange_balance(exchange, &registry, &fiat, fetcher.as_ref(), &snapshots, !no_save)?;
                println!("{}\n", balance.format());
                balances.push(balance);
            }
            let (total, last_total) = grand_total(&balances);
            println!("{}", format_total("Grand total", total, last_total, None));
        }
        Command::History {
            input,
            historical,
            fiat,
            out,
        } => {
            let input = input.unwrap_or_else(|| config.data_folder.clone());
            let historical = historical.unwrap_or_else(|| config.historical_folder.clone());
            let fiat = fiat.map(|f| f.to_uppercase()).unwrap_or_else(|| config.fiat.clone());

            let transactions = get_transactions(&input, &registry)?;
            let portfolio = Portfolio::from_transactions(transactions.into_iter().map(Arc::new), &registry, None);
            let tables = PriceTables::load(&historical, &[fiat.as_str()]);
            export_history(&portfolio, &fiat, &tables, &out)?;
        }
    }
    Ok(())
}
