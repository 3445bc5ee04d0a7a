/* Value of the portfolio over time, exported as CSV */

use std::{fs::File, io::Write, path::Path};

use csv::{Terminator, WriterBuilder};

use crate::{
    errors::IoError,
    structs::{CryptoFiatSeries, Portfolio, PriceTables},
    utils::{create_directories_if_needed, datetime_to_str},
};

pub const HISTORY_HEADERS: [&str; 4] = ["datetime", "crypto", "fiat", "net"];

pub fn write_history<W: Write>(series: &CryptoFiatSeries, writer: W) -> Result<(), IoError> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(writer);
    writer.write_record(HISTORY_HEADERS)?;
    let net = series.net();
    for (i, date) in series.dates.iter().enumerate() {
        writer.write_record([
            datetime_to_str(date),
            series.crypto[i].to_string(),
            series.fiat[i].to_string(),
            net[i].to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

/* Writes one row per transaction date to `out`, returns the number of rows */
pub fn export_history(portfolio: &Portfolio, fiat: &str, tables: &PriceTables, out: &Path) -> Result<usize, IoError> {
    let series = portfolio.crypto_fiat_balance(fiat, tables);
    create_directories_if_needed(out)?;
    let file = File::create(out)?;
    write_history(&series, file)?;
    log::info!("Wrote {} rows of history to {}", series.dates.len(), out.display());
    Ok(series.dates.len())
}
