use std::fmt;
use std::str::FromStr;

/// Canned assists that can be run over note text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AiAction {
    /// Condense into 3-5 bullet points.
    Summarize,
    /// Rewrite for clarity while keeping the meaning.
    Improve,
    /// Brainstorm five ways to expand on the text.
    Ideas,
}

impl AiAction {
    pub const ALL: [AiAction; 3] = [Self::Summarize, Self::Improve, Self::Ideas];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Summarize => "summarize",
            Self::Improve => "improve",
            Self::Ideas => "ideas",
        }
    }

    /// Wrap `text` in this action's prompt template.
    pub fn prompt(&self, text: &str) -> String {
        match self {
            Self::Summarize => format!(
                "Please summarize the following text into 3-5 clear, concise bullet points:\n\n\
                 \"{text}\"\n\n\
                 Return only the bullet points without any additional text."
            ),
            Self::Improve => format!(
                "Rewrite the following text to be more clear, professional, and well-structured \
                 while preserving the original meaning:\n\n\
                 \"{text}\"\n\n\
                 Return only the improved version without any additional commentary."
            ),
            Self::Ideas => format!(
                "Based on the following text, generate 5 creative ideas or suggestions for \
                 expansion. Present each idea in one concise line:\n\n\
                 \"{text}\"\n\n\
                 Return only the numbered ideas without any additional text."
            ),
        }
    }
}

impl fmt::Display for AiAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "summarize" => Ok(Self::Summarize),
            "improve" => Ok(Self::Improve),
            "ideas" => Ok(Self::Ideas),
            other => Err(format!(
                "unknown action '{}', expected summarize, improve or ideas",
                other
            )),
        }
    }
}
