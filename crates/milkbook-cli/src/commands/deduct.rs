use milkbook_core::DeductionInput;

use crate::cli_config::Settings;
use crate::commands::common::open_engine;
use crate::error::CliError;

pub async fn run_deduct(
    batch: &str,
    quantity: f64,
    reason: &str,
    settings: &Settings,
) -> Result<(), CliError> {
    let (engine, _signal) = open_engine(settings, false)?;
    let (record, view) = engine
        .add_deduction(batch, DeductionInput::new(reason, quantity))
        .await?;

    println!("{}", record.id);
    if let Some(total) = view.batch_totals.get(&record.batch_id) {
        println!("{} now at {:.2} L", total.batch_id, total.net_liters);
    }
    Ok(())
}
