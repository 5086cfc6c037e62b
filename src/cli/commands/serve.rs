//! Serve Command
//!
//! Runs the HTTP API until Ctrl-C.

use crate::cli::CommandContext;
use crate::cli::ui::Output;
use crate::server::{self, AppState};
use crate::types::Result;

pub async fn run(ctx: CommandContext, host: Option<String>, port: Option<u16>) -> Result<()> {
    let host = host.unwrap_or_else(|| ctx.config.server.host.clone());
    let port = port.unwrap_or(ctx.config.server.port);

    let studio = ctx.studio()?;
    let report = studio.provider_status();

    let output = Output::new();
    output.header("Echo Studio");
    output.field("Address", &format!("http://{}:{}/api", host, port));
    for (label, statuses) in [("Text", &report.text), ("Image", &report.image)] {
        let ready = statuses.iter().filter(|s| s.configured).count();
        output.field(label, &format!("{}/{} providers configured", ready, statuses.len()));
    }
    if !report.text.iter().any(|s| s.configured) {
        output.warning("No text provider has a key; partner generation will fail.");
    }

    server::serve(&host, port, AppState::new(studio)).await
}
