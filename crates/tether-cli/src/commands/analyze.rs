//! /analyze command - ask about an HTTP exchange stored in files

use super::CommandResult;
use std::path::PathBuf;

pub struct AnalyzeCommand;

impl AnalyzeCommand {
    /// `args` is `<request-file> <response-file> <question...>`
    pub fn execute(args: &str) -> CommandResult {
        let mut parts = args.splitn(3, char::is_whitespace);
        let request = parts.next().filter(|s| !s.is_empty());
        let response = parts.next().filter(|s| !s.is_empty());
        let question = parts.next().map(str::trim).filter(|s| !s.is_empty());

        match (request, response, question) {
            (Some(request), Some(response), Some(question)) => CommandResult::Analyze {
                request: PathBuf::from(request),
                response: PathBuf::from(response),
                question: question.to_string(),
            },
            _ => CommandResult::Message(
                "Usage: /analyze <request-file> <response-file> <question>".to_string(),
            ),
        }
    }
}
