//! Questionnaire to flow-script compilation.
//!
//! A questionnaire lowers into a strictly sequential script: a header that
//! sets up the answer state, one retry-until-satisfied block per question and
//! a closing line. The runtime that executes the script decides when a block's
//! stopping predicate holds; nothing here validates answers.
//!
//! Question text and the title are interpolated verbatim. Quote characters are
//! not escaped.

mod publisher;

use crate::core::questionnaire::{QuestionType, Questionnaire};

pub use publisher::{Clock, CompiledFlow, FlowPublisher, SystemClock, normalize_title};

#[cfg(test)]
pub(crate) use publisher::FixedClock;

pub const CLOSING_LINE: &str = "talk(\"Thank you for completing the questionnaire. Your responses have been recorded.\")";

/// Code-generation template for one question kind. New kinds get a new arm in
/// `block_template`; everything else about the block shape is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockTemplate {
    pub until: &'static str,
    pub ask: &'static str,
    pub field: &'static str,
    pub example: &'static str,
}

pub fn block_template(kind: &QuestionType) -> BlockTemplate {
    match kind {
        QuestionType::Rating => BlockTemplate {
            until: "User has provided a rating between 1 and 5",
            ask: "Based on the user's response, what rating did they give from 1 to 5?",
            field: "rating",
            example: "4",
        },
        QuestionType::OpenEnded | QuestionType::Other(_) => BlockTemplate {
            until: "User has provided an answer",
            ask: "What is the user's response ?",
            field: "message",
            example: "\"User response\"",
        },
    }
}

/// Binding and state key for the question at 0-based `index`.
pub fn question_id(index: usize) -> String {
    format!("q{}", index + 1)
}

pub fn compile(questionnaire: &Questionnaire) -> String {
    let mut lines: Vec<String> = Vec::new();
    lines.push("state = {}".to_string());
    lines.push(format!(
        "meta_prompt = \"You are conducting the questionnaire: {}\"",
        questionnaire.title
    ));
    lines.push(String::new());

    for (i, question) in questionnaire.questions.iter().enumerate() {
        let qid = question_id(i);
        let tpl = block_template(&question.kind);
        lines.push("loop:".to_string());
        lines.push(format!(
            "    {qid}_response = talk(\"{}\", True)",
            question.text
        ));
        lines.push(format!("until \"{}\":", tpl.until));
        lines.push(format!("    {qid}_answer = {qid}_response.ask("));
        lines.push(format!("        question=\"{}\",", tpl.ask));
        lines.push(format!(
            "        example={{\"{}\": {}}}",
            tpl.field, tpl.example
        ));
        lines.push("    )".to_string());
        lines.push(format!("state[\"{qid}\"] = {qid}_answer.{}", tpl.field));
        lines.push(String::new());
    }

    lines.push(CLOSING_LINE.to_string());
    lines.join("\n")
}
