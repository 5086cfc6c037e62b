//! Generation Commands
//!
//! Usage:
//!   echo-studio partner --answers answers.json [-o partner.json]
//!   echo-studio personality --answers answers.json [-o echo.json]
//!   echo-studio images --profile partner.json [--count 3] [--aspect-ratio 3:4]

use std::path::{Path, PathBuf};

use crate::ai::prompt::AspectRatio;
use crate::cli::ui::Output;
use crate::cli::{CommandContext, ProfileFile, read_answers, write_json};
use crate::types::Result;

pub async fn partner(ctx: &CommandContext, answers: &Path, out: Option<PathBuf>) -> Result<()> {
    let answers = read_answers(answers)?;
    let output = Output::new();
    output.info(&format!("Synthesizing partner from {} answers...", answers.len()));

    let outcome = ctx.studio()?.generate_partner(&answers).await?;

    output.success(&format!(
        "{} ({}) via {} in {} ms",
        outcome.partner.name, outcome.partner.tagline, outcome.model, outcome.generation_time_ms
    ));
    write_json(out.as_deref(), &outcome)
}

pub async fn personality(
    ctx: &CommandContext,
    answers: &Path,
    out: Option<PathBuf>,
) -> Result<()> {
    let answers = read_answers(answers)?;
    let output = Output::new();
    output.info(&format!("Synthesizing echo personality from {} answers...", answers.len()));

    let outcome = ctx.studio()?.generate_personality(&answers).await?;

    output.success(&format!(
        "{} via {} in {} ms",
        outcome.personality.name, outcome.model, outcome.generation_time_ms
    ));
    for line in outcome.profile.highlights() {
        output.field("·", &line);
    }
    output.field("Big Five", &outcome.profile.big_five.interpret());
    write_json(out.as_deref(), &outcome)
}

pub async fn images(
    ctx: &CommandContext,
    profile: &Path,
    count: Option<u8>,
    aspect_ratio: Option<AspectRatio>,
    out: Option<PathBuf>,
) -> Result<()> {
    let profile = ProfileFile::read(profile)?;
    let output = Output::new();
    output.info(&format!("Generating portraits of {}...", profile.subject().name()));

    let outcome = ctx
        .studio()?
        .generate_images(profile.subject(), count.map(i64::from), aspect_ratio)
        .await?;

    output.success(&format!(
        "{} image(s) from {} in {} ms",
        outcome.images.len(),
        outcome.used_model,
        outcome.generation_time_ms
    ));
    write_json(out.as_deref(), &outcome)
}
