use anyhow::{Context, Result};
use std::path::Path;

use crate::core::flow;
use crate::core::questionnaire::{NewQuestionnaire, Questionnaire};
use crate::core::terminal;

/// Compiles a questionnaire JSON document offline. Fields other than
/// `title` and `questions` are ignored.
pub fn compile_file(input: &Path, output: Option<&Path>) -> Result<()> {
    let raw = std::fs::read_to_string(input)
        .with_context(|| format!("reading {}", input.display()))?;
    let parsed: NewQuestionnaire = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a valid questionnaire", input.display()))?;
    let script = flow::compile(&Questionnaire::create(parsed));

    match output {
        Some(path) => {
            std::fs::write(path, &script)
                .with_context(|| format!("writing {}", path.display()))?;
            terminal::print_success(&format!("Flow written to {}", path.display()));
        }
        None => println!("{}", script),
    }
    Ok(())
}
