//! Prompt formatting for one-shot analysis of a request/response pair

/// An HTTP exchange already rendered to text by the host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    pub request: String,
    pub response: String,
}

impl Exchange {
    pub fn new(request: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            response: response.into(),
        }
    }

    /// Embed the exchange and a question into the analysis prompt
    pub fn prompt(&self, question: &str) -> String {
        format_prompt(&self.request, &self.response, question)
    }
}

/// Build the analysis prompt. Inputs are embedded verbatim.
pub fn format_prompt(request: &str, response: &str, question: &str) -> String {
    format!(
        "HTTP Request:\n{}\n\nHTTP Response:\n{}\n\nQuestion: {}\n",
        request, response, question
    )
}
