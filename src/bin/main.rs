// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

use clap::{Parser, ValueEnum};
use csv::{ReaderBuilder, Trim, Writer};
use debt_ledger::{DebtId, DebtPatch, LedgerError, MemoryStore, ledger};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::PathBuf;
use std::process;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

/// Debt Ledger - Replay debt and payment commands from a CSV file
///
/// Reads ledger commands from a CSV file and writes a report to stdout.
/// Supports creating, resizing, renaming and deleting debts, and applying
/// or reversing payments.
#[derive(Parser, Debug)]
#[command(name = "debt-ledger")]
#[command(about = "A debt ledger that replays command CSVs", long_about = None)]
struct Args {
    /// Path to CSV file with commands
    ///
    /// Expected format: type,debt,amount,text
    /// Example: cargo run -- commands.csv --report stats > stats.csv
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// Which report to write to stdout
    #[arg(long, value_enum, default_value_t = Report::Debts)]
    report: Report,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Report {
    /// One row per debt
    Debts,
    /// One row per payment
    Payments,
    /// A single row of aggregate figures
    Stats,
}

fn main() {
    // Parse command line arguments
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // Open input file
    let file = match File::open(&args.input) {
        Ok(f) => f,
        Err(e) => {
            error!("Error opening file '{}': {}", args.input.display(), e);
            process::exit(1);
        }
    };

    // Replay commands from CSV
    let store = match process_commands(BufReader::new(file)) {
        Ok(store) => store,
        Err(e) => {
            error!("Error processing commands: {}", e);
            process::exit(1);
        }
    };

    // Write results to stdout
    if let Err(e) = write_report(&store, args.report, std::io::stdout()) {
        error!("Error writing output: {}", e);
        process::exit(1);
    }
}

/// Raw CSV record matching the input format.
///
/// Fields: `type, debt, amount, text`
#[derive(Debug, Deserialize)]
struct CsvRecord {
    #[serde(rename = "type")]
    command: String,
    debt: String,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    amount: Option<Decimal>,
    #[serde(default)]
    text: Option<String>,
}

/// A parsed ledger command. Debts are referred to by name.
#[derive(Debug, Clone, PartialEq)]
enum Command {
    Create { name: String, amount: Decimal },
    Pay { debt: String, amount: Decimal, description: Option<String> },
    Resize { debt: String, amount: Decimal },
    Rename { debt: String, new_name: String },
    /// Reverses the debt's latest payment.
    Unpay { debt: String },
    Delete { debt: String },
}

impl CsvRecord {
    /// Converts CSV record to a Command.
    ///
    /// Returns `None` for unknown command types or missing required fields.
    fn into_command(self) -> Option<Command> {
        let debt = self.debt;
        let text = self.text.filter(|t| !t.trim().is_empty());

        match self.command.to_lowercase().as_str() {
            "create" => Some(Command::Create {
                name: debt,
                amount: self.amount?,
            }),
            "pay" => Some(Command::Pay {
                debt,
                amount: self.amount?,
                description: text,
            }),
            "resize" => Some(Command::Resize {
                debt,
                amount: self.amount?,
            }),
            "rename" => Some(Command::Rename {
                debt,
                new_name: text?,
            }),
            "unpay" => Some(Command::Unpay { debt }),
            "delete" => Some(Command::Delete { debt }),
            _ => None,
        }
    }
}

fn resolve(store: &MemoryStore, name: &str) -> Result<DebtId, LedgerError> {
    ledger::find_debt_by_name(store, name)?
        .map(|debt| debt.id())
        .ok_or_else(|| LedgerError::NotFound {
            entity: debt_ledger::Entity::Debt,
            id: name.to_string(),
        })
}

fn apply_command(store: &MemoryStore, command: Command) -> Result<(), LedgerError> {
    match command {
        Command::Create { name, amount } => {
            ledger::create_debt(store, &name, amount)?;
        }
        Command::Pay {
            debt,
            amount,
            description,
        } => {
            let id = resolve(store, &debt)?;
            ledger::apply_payment(store, id, amount, description.as_deref())?;
        }
        Command::Resize { debt, amount } => {
            let id = resolve(store, &debt)?;
            let patch = DebtPatch {
                initial_amount: Some(amount),
                ..DebtPatch::default()
            };
            ledger::update_debt(store, id, patch)?;
        }
        Command::Rename { debt, new_name } => {
            let id = resolve(store, &debt)?;
            let patch = DebtPatch {
                name: Some(new_name),
                ..DebtPatch::default()
            };
            ledger::update_debt(store, id, patch)?;
        }
        Command::Unpay { debt } => {
            let debt = ledger::get_debt(store, resolve(store, &debt)?)?;
            let latest = debt.payments().last().ok_or_else(|| {
                LedgerError::Conflict(format!("debt \"{}\" has no payments", debt.name()))
            })?;
            ledger::delete_payment(store, latest.id())?;
        }
        Command::Delete { debt } => {
            let id = resolve(store, &debt)?;
            ledger::delete_debt(store, id)?;
        }
    }
    Ok(())
}

/// Replay ledger commands from a CSV reader.
///
/// Rows are streamed, so large files are not loaded into memory. Malformed
/// rows and commands the ledger rejects are logged and skipped.
///
/// # CSV Format
///
/// Expected columns: `type, debt, amount, text`
/// - `type`: create, pay, resize, rename, unpay, delete
/// - `debt`: Debt name (the new name for `create`)
/// - `amount`: Decimal amount (create, pay, resize)
/// - `text`: Payment description (pay) or new name (rename)
///
/// # Example
///
/// ```csv
/// type,debt,amount,text
/// create,Personal Loan,50000,
/// pay,Personal Loan,15000,first installment
/// rename,Personal Loan,,Family Loan
/// ```
///
/// # Errors
///
/// Returns a CSV error if the reader fails or the CSV structure is invalid.
fn process_commands<R: Read>(reader: R) -> Result<MemoryStore, csv::Error> {
    let store = MemoryStore::new();

    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true) // Allow missing trailing fields
        .has_headers(true)
        .from_reader(reader);

    for (row, result) in rdr.deserialize::<CsvRecord>().enumerate() {
        match result {
            Ok(record) => {
                let Some(command) = record.into_command() else {
                    warn!(row, "skipping invalid command record");
                    continue;
                };

                if let Err(e) = apply_command(&store, command) {
                    warn!(row, error = %e, "skipping rejected command");
                }
            }
            Err(e) => {
                warn!(row, error = %e, "skipping malformed row");
            }
        }
    }

    Ok(store)
}

#[derive(Debug, Serialize)]
struct DebtRow {
    id: DebtId,
    name: String,
    initial: Decimal,
    remaining: Decimal,
    paid: Decimal,
    is_paid: bool,
    payments: usize,
}

#[derive(Debug, Serialize)]
struct PaymentRow {
    id: String,
    debt: DebtId,
    amount: Decimal,
    description: String,
    date: String,
}

#[derive(Debug, Serialize)]
struct StatsRow {
    total_debts: usize,
    total_initial: Decimal,
    total_remaining: Decimal,
    total_paid: Decimal,
    average_debt_amount: Decimal,
    paid_count: usize,
    pending_count: usize,
    completion_rate: Decimal,
    total_payments: usize,
    average_payment: Decimal,
    largest_payment: Decimal,
    smallest_payment: Decimal,
    payments_this_month: usize,
    amount_this_month: Decimal,
}

/// Write the selected report to a CSV writer.
///
/// Amounts are written with 2 decimal precision.
///
/// # Errors
///
/// Returns a CSV error if writing fails or the store cannot be read.
fn write_report<W: Write>(
    store: &MemoryStore,
    report: Report,
    writer: W,
) -> Result<(), csv::Error> {
    let mut wtr = Writer::from_writer(writer);
    let to_csv = |e: LedgerError| csv::Error::from(std::io::Error::other(e.to_string()));

    match report {
        Report::Debts => {
            for debt in ledger::list_debts(store).map_err(to_csv)? {
                wtr.serialize(DebtRow {
                    id: debt.id(),
                    name: debt.name().to_string(),
                    initial: debt.initial_amount().round_dp(2),
                    remaining: debt.remaining_amount().round_dp(2),
                    paid: debt.total_paid().round_dp(2),
                    is_paid: debt.is_paid(),
                    payments: debt.payments().len(),
                })?;
            }
        }
        Report::Payments => {
            for payment in ledger::list_payments(store).map_err(to_csv)? {
                wtr.serialize(PaymentRow {
                    id: payment.id().to_string(),
                    debt: payment.debt_id(),
                    amount: payment.amount().round_dp(2),
                    description: payment.description().to_string(),
                    date: payment.date().to_rfc3339(),
                })?;
            }
        }
        Report::Stats => {
            let debts = ledger::debt_statistics(store).map_err(to_csv)?;
            let payments = ledger::payment_statistics(store).map_err(to_csv)?;
            wtr.serialize(StatsRow {
                total_debts: debts.total_debts,
                total_initial: debts.total_initial,
                total_remaining: debts.total_remaining,
                total_paid: debts.total_paid,
                average_debt_amount: debts.average_debt_amount,
                paid_count: debts.paid_count,
                pending_count: debts.pending_count,
                completion_rate: debts.completion_rate,
                total_payments: payments.total_payments,
                average_payment: payments.average_amount,
                largest_payment: payments.largest_amount,
                smallest_payment: payments.smallest_amount,
                payments_this_month: payments.payments_this_month,
                amount_this_month: payments.amount_this_month,
            })?;
        }
    }

    // Flush to ensure all data is written
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Cursor;

    fn run(csv: &str) -> MemoryStore {
        process_commands(Cursor::new(csv.to_string())).unwrap()
    }

    fn debt(store: &MemoryStore, name: &str) -> debt_ledger::Debt {
        ledger::find_debt_by_name(store, name).unwrap().unwrap()
    }

    #[test]
    fn parse_create_and_pay() {
        let store = run("type,debt,amount,text\n\
                         create,Personal Loan,50000,\n\
                         pay,Personal Loan,15000,first installment\n");

        assert_eq!(store.len(), 1);
        let loan = debt(&store, "Personal Loan");
        assert_eq!(loan.remaining_amount(), dec!(35000));
        assert_eq!(loan.payments()[0].description(), "first installment");
    }

    #[test]
    fn missing_description_uses_default_label() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100,\n\
                         pay,Car,40,\n");

        assert_eq!(debt(&store, "Car").payments()[0].description(), "Payment of $40.00");
    }

    #[test]
    fn overpayment_row_is_skipped() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100,\n\
                         pay,Car,150,\n\
                         pay,Car,100,\n");

        let car = debt(&store, "Car");
        assert!(car.is_paid());
        assert_eq!(car.payments().len(), 1);
    }

    #[test]
    fn unpay_reverses_latest_payment() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100,\n\
                         pay,Car,30,\n\
                         pay,Car,70,\n\
                         unpay,Car,,\n");

        let car = debt(&store, "Car");
        assert_eq!(car.remaining_amount(), dec!(70));
        assert_eq!(car.payments().len(), 1);
        assert_eq!(car.payments()[0].amount(), dec!(30));
    }

    #[test]
    fn delete_with_payments_is_refused() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100,\n\
                         create,Boat,100,\n\
                         pay,Car,30,\n\
                         delete,Car,,\n\
                         delete,Boat,,\n");

        assert_eq!(store.len(), 1);
        assert!(ledger::find_debt_by_name(&store, "Car").unwrap().is_some());
    }

    #[test]
    fn resize_and_rename() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100,\n\
                         pay,Car,30,\n\
                         resize,Car,200,\n\
                         rename,Car,,Family Car\n");

        let car = debt(&store, "Family Car");
        assert_eq!(car.initial_amount(), dec!(200));
        assert_eq!(car.remaining_amount(), dec!(170));
    }

    #[test]
    fn parse_with_whitespace_and_case() {
        let store = run("type,debt,amount,text\n CREATE , Car , 100 , \n");
        assert_eq!(debt(&store, "Car").initial_amount(), dec!(100));
    }

    #[test]
    fn skip_malformed_rows() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100,\n\
                         create,Bad,not-a-number,\n\
                         launch,Car,1,\n\
                         create,Boat,50,\n");

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn missing_trailing_fields_are_allowed() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100\n\
                         delete,Car\n");
        assert!(store.is_empty());
    }

    #[test]
    fn write_debts_report() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100,\n\
                         pay,Car,25.5,\n");

        let mut output = Vec::new();
        write_report(&store, Report::Debts, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        let mut lines = output.lines();
        assert_eq!(
            lines.next().unwrap(),
            "id,name,initial,remaining,paid,is_paid,payments"
        );
        let row = lines.next().unwrap();
        assert!(row.ends_with(",Car,100,74.5,25.5,false,1"), "{row}");
    }

    #[test]
    fn write_stats_report() {
        let store = run("type,debt,amount,text\n\
                         create,Car,100,\n\
                         create,Boat,300,\n\
                         pay,Car,100,\n");

        let mut output = Vec::new();
        write_report(&store, Report::Stats, &mut output).unwrap();
        let output = String::from_utf8(output).unwrap();

        let mut rdr = csv::Reader::from_reader(output.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        let record = rdr.records().next().unwrap().unwrap();
        let field = |name: &str| {
            let index = headers.iter().position(|h| h == name).unwrap();
            record.get(index).unwrap().to_string()
        };

        assert_eq!(field("total_debts"), "2");
        let amount = |name: &str| field(name).parse::<Decimal>().unwrap();

        assert_eq!(amount("total_paid"), dec!(100));
        assert_eq!(field("paid_count"), "1");
        assert_eq!(field("pending_count"), "1");
        assert_eq!(amount("average_debt_amount"), dec!(200));
        assert_eq!(field("total_payments"), "1");
    }
}
