//! Providers Command
//!
//! Lists both fallback chains in order with credential state.

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::types::Result;

pub fn run(ctx: &CommandContext, format: &str) -> Result<()> {
    let report = ctx.studio()?.provider_status();

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let output = Output::new();
    output.section("Text chain");
    report.text.iter().for_each(|s| output.provider(s));
    output.section("Image chain");
    report.image.iter().for_each(|s| output.provider(s));
    Ok(())
}
