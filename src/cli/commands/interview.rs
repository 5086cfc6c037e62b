//! Interview Command
//!
//! Terminal wizard over the partner question bank. Options are picked by
//! number; `:b` goes back, `:q` quits, an empty line skips optional questions.
//! With `--generate` the answers go straight into partner and portrait
//! generation.

use std::path::PathBuf;

use console::{Term, style};
use serde_json::json;

use crate::cli::ui::Output;
use crate::cli::{CommandContext, write_json};
use crate::interview::{InputType, InterviewSession, Question, QuestionBank};
use crate::studio::{GenerationState, GenerationStatus};
use crate::types::{Answer, AnswerValue, PortraitSubject, Result};

/// One line of wizard input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer(AnswerValue),
    Skip,
    Back,
    Quit,
}

/// Interpret a raw line for `question`; errors are shown and the question re-asked
pub fn parse_input(question: &Question, raw: &str) -> std::result::Result<Input, String> {
    let line = raw.trim();
    match line {
        ":q" => return Ok(Input::Quit),
        ":b" => return Ok(Input::Back),
        "" => return Ok(Input::Skip),
        _ => {}
    }

    let pick = |token: &str| -> std::result::Result<String, String> {
        token
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| question.options.get(i))
            .map(|o| o.value.clone())
            .ok_or_else(|| format!("'{}' is not an option (1-{})", token, question.options.len()))
    };

    match question.input_type {
        InputType::Text => Ok(Input::Answer(AnswerValue::Text(line.to_string()))),
        InputType::SingleChoice => Ok(Input::Answer(AnswerValue::Text(pick(line)?))),
        InputType::MultipleChoice => {
            let mut values: Vec<String> = Vec::new();
            for token in line
                .split(|c: char| c == ',' || c == '，' || c.is_whitespace())
                .filter(|t| !t.is_empty())
            {
                let value = pick(token)?;
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            Ok(Input::Answer(AnswerValue::Choices(values)))
        }
    }
}

fn render(output: &Output, session: &InterviewSession<'_>, question: &Question, total: usize) {
    output.progress(session.progress());
    output.header(&format!(
        "{}/{}  {}{}",
        session.current_index() + 1,
        total,
        question.text,
        if question.required { "" } else { " (optional)" }
    ));
    if let Some(description) = &question.description {
        output.info(description);
    }

    let current = session.answer_for(&question.id).map(|a| &a.answer);
    for (i, option) in question.options.iter().enumerate() {
        let chosen = current.is_some_and(|a| a.has_choice(&option.value));
        let marker = if chosen { style("●").green() } else { style("○").dim() };
        eprintln!("  {} {:>2}. {}", marker, i + 1, option.label);
    }

    let hint = match question.input_type {
        InputType::SingleChoice => "number".to_string(),
        InputType::MultipleChoice => "numbers, comma separated".to_string(),
        InputType::Text => question
            .placeholder
            .clone()
            .unwrap_or_else(|| "your answer".to_string()),
    };
    eprint!("{} ", style(format!("› {} (:b back, :q quit)", hint)).dim());
}

/// Walk the bank; `None` when the user quits
fn ask_all(term: &Term, output: &Output, bank: &QuestionBank) -> Result<Option<Vec<Answer>>> {
    let mut session = InterviewSession::new(bank);
    session.start();

    while let Some(question) = session.current_question() {
        render(output, &session, question, bank.len());

        match parse_input(question, &term.read_line()?) {
            Err(message) => {
                output.warning(&message);
                continue;
            }
            Ok(Input::Quit) => return Ok(None),
            Ok(Input::Back) => {
                session.previous();
                continue;
            }
            Ok(Input::Skip) => {}
            Ok(Input::Answer(value)) => session.answer(&question.id, value),
        }

        if !session.can_proceed() {
            output.warning("This question needs an answer.");
            continue;
        }

        if !session.is_last() {
            session.next();
            continue;
        }

        match session.complete() {
            Ok(()) => break,
            Err(e) => {
                output.warning(&e.to_string());
                let first_missing = session
                    .missing_required()
                    .first()
                    .and_then(|id| bank.questions().iter().position(|q| q.id == *id));
                if let Some(index) = first_missing {
                    session.set_current(index);
                }
            }
        }
    }

    Ok(Some(session.into_answers()))
}

pub async fn run(ctx: &CommandContext, out: Option<PathBuf>, generate: bool) -> Result<()> {
    let term = Term::stderr();
    let output = Output::new();
    let bank = QuestionBank::partner();

    output.section("Echo Studio · partner interview");
    let Some(answers) = ask_all(&term, &output, bank)? else {
        output.warning("Interview abandoned; nothing saved.");
        return Ok(());
    };
    output.success(&format!("{} answers recorded", answers.len()));

    if !generate {
        return write_json(out.as_deref(), &answers);
    }

    let studio = ctx.studio()?;
    let mut state = GenerationState::default();

    state.set_status(GenerationStatus::GeneratingPersonality);
    output.info("Synthesizing your partner...");
    let partner = studio.generate_partner(&answers).await?;
    state.set_personality(partner.legacy_personality.clone());
    output.success(&format!("{} · {}", partner.partner.name, partner.partner.tagline));

    state.set_status(GenerationStatus::GeneratingImages);
    output.info("Painting portraits...");
    match studio
        .generate_images(PortraitSubject::Partner(&partner.partner), None, None)
        .await
    {
        Ok(images) => {
            output.success(&format!("{} image(s) from {}", images.images.len(), images.used_model));
            state.set_images(images.images, images.used_model);
        }
        Err(e) => {
            output.error(&format!("Portraits failed: {}", e));
            state.set_error(e.to_string());
        }
    }

    if state.images.len() > 1 {
        for (i, url) in state.images.iter().enumerate() {
            output.field(&format!("{}", i + 1), url);
        }
        eprint!("{} ", style("› favourite image number").dim());
        let choice = term.read_line()?;
        let picked = choice
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .is_some_and(|i| state.select_image(i));
        if !picked {
            output.info("Keeping the first image.");
        }
    }

    write_json(
        out.as_deref(),
        &json!({
            "answers": answers,
            "partner": partner,
            "generation": state,
        }),
    )
}
