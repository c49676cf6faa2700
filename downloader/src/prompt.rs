/// Interactive Add/Truncate question asked before a run.
use videy_shared::errors::{VideyError, VideyResult};

pub const OVERWRITE_QUESTION: &str =
    "Do you want to (A)dd new videos or (T)runcate downloads folder and start fresh? (A/T)";

/// Map an answer to "clear the download dir first?". Case-insensitive `a` / `t`.
pub fn parse_choice(answer: &str) -> VideyResult<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "a" => Ok(false),
        "t" => Ok(true),
        other => Err(VideyError::InvalidChoice(other.to_string())),
    }
}

/// Ask on the terminal whether to truncate the download directory.
pub async fn ask_overwrite() -> VideyResult<bool> {
    let answer = tokio::task::spawn_blocking(|| {
        dialoguer::Input::<String>::new()
            .with_prompt(OVERWRITE_QUESTION)
            .allow_empty(true)
            .interact_text()
    })
    .await
    .map_err(|e| VideyError::Prompt(e.to_string()))?
    .map_err(|e| VideyError::Prompt(e.to_string()))?;

    parse_choice(&answer)
}
