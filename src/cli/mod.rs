pub mod commands;
pub mod ui;
mod util;

pub use util::{CommandContext, ProfileFile, read_answers, read_json, write_json};
