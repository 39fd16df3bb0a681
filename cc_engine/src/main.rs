//! Coupled-cluster step runner
//!
//! Reads a YAML list of steps and runs them in order.

use cc_engine::app::CcApplication;
use color_eyre::eyre::Result;

fn main() -> Result<()> {
    color_eyre::install()?;
    CcApplication::from_cli()?.run()
}
