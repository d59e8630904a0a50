use thiserror::Error;

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("Model API error (status {status}): {message}")]
    ModelApi { status: u16, message: String },

    #[error("Model authentication failed: {0}")]
    Authentication(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model response: {0}")]
    InvalidResponse(String),

    #[error("Agent stopped after reaching the limit of {max_steps} steps")]
    StepLimit { max_steps: usize },

    #[error(
        "Agent appears to be stuck in a loop after {consecutive} consecutive tool calls. Please try rephrasing your query."
    )]
    LoopDetected { consecutive: usize },
}

impl AgentError {
    /// Maps a non-success model API status to an error.
    #[must_use]
    pub fn from_status(status: u16, body: &str) -> Self {
        match status {
            401 | 403 => Self::Authentication(body.to_string()),
            _ => Self::ModelApi {
                status,
                message: body.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loop_message_matches_user_facing_text() {
        let err = AgentError::LoopDetected { consecutive: 11 };
        assert_eq!(
            err.to_string(),
            "Agent appears to be stuck in a loop after 11 consecutive tool calls. Please try rephrasing your query."
        );
    }

    #[test]
    fn auth_statuses_are_classified() {
        assert!(matches!(AgentError::from_status(401, "bad key"), AgentError::Authentication(_)));
        assert!(matches!(
            AgentError::from_status(500, "boom"),
            AgentError::ModelApi { status: 500, .. }
        ));
    }
}
