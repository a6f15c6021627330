use thiserror::Error;

/// Failures the webhook pipeline can report.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Unauthorized chat ID")]
    Unauthorized,

    #[error("Malformed update: {0}")]
    MalformedUpdate(String),

    #[error("Missing configuration value: {0}")]
    ConfigurationMissing(&'static str),

    #[error("Failed to deliver chunk {chunk} of {total}: {reason}")]
    Delivery {
        chunk: usize,
        total: usize,
        reason: String,
    },
}

impl RelayError {
    /// Message returned to the webhook caller. Internal detail stays in the logs.
    pub fn public_message(&self) -> &'static str {
        match self {
            RelayError::Unauthorized => "Unauthorized chat ID",
            RelayError::MalformedUpdate(_) => "Malformed update",
            RelayError::ConfigurationMissing(_) => "Relay is not configured",
            RelayError::Delivery { .. } => "Failed to deliver reply",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_messages() {
        assert_eq!(
            RelayError::Unauthorized.public_message(),
            "Unauthorized chat ID"
        );
        assert_eq!(
            RelayError::MalformedUpdate("missing text".into()).public_message(),
            "Malformed update"
        );
    }

    #[test]
    fn test_delivery_display_names_chunk() {
        let err = RelayError::Delivery {
            chunk: 2,
            total: 3,
            reason: "timeout".into(),
        };
        assert_eq!(err.to_string(), "Failed to deliver chunk 2 of 3: timeout");
    }
}
