//! ModelConfig type for the LSTM architecture.
//!
//! Contains the shape parameters of the network. They are fixed at training
//! time and persisted alongside the weights.

use serde::{Deserialize, Serialize};

/// Configuration parameters for the LSTM model architecture.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Number of distinct symbols (input one-hot width and output classes).
    pub vocab_size: usize,

    /// Number of LSTM units.
    pub hidden_size: usize,

    /// Window length the model was trained on.
    pub sequence_length: usize,

    /// Dropout rate applied to the final hidden state during training.
    pub dropout: f32,
}

impl ModelConfig {
    /// Validates the configuration for consistency.
    ///
    /// Returns an error message if validation fails, None otherwise.
    pub fn validate(&self) -> Option<String> {
        if self.vocab_size == 0 {
            return Some("vocab_size must be > 0".to_string());
        }

        if self.hidden_size == 0 {
            return Some("hidden_size must be > 0".to_string());
        }

        if self.sequence_length == 0 {
            return Some("sequence_length must be > 0".to_string());
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Some(format!(
                "dropout must be in [0, 1), got {}",
                self.dropout
            ));
        }

        None
    }

    /// Returns the number of trainable parameters.
    pub fn parameter_count(&self) -> usize {
        let gates = 4 * self.hidden_size;
        gates * self.vocab_size
            + gates * self.hidden_size
            + gates
            + self.vocab_size * self.hidden_size
            + self.vocab_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_vocab(vocab_size: usize) -> ModelConfig {
        ModelConfig {
            vocab_size,
            hidden_size: 256,
            sequence_length: 64,
            dropout: 0.2,
        }
    }

    #[test]
    fn valid_config() {
        assert!(with_vocab(38).validate().is_none());
    }

    #[test]
    fn config_validation() {
        let mut config = with_vocab(10);
        config.dropout = 1.0;
        assert!(config.validate().is_some());

        let mut config = with_vocab(0);
        assert!(config.validate().is_some());
        config.vocab_size = 3;
        config.hidden_size = 0;
        assert!(config.validate().is_some());
    }

    #[test]
    fn parameter_count() {
        let config = ModelConfig {
            vocab_size: 3,
            hidden_size: 2,
            sequence_length: 4,
            dropout: 0.0,
        };
        // 8*3 + 8*2 + 8 + 3*2 + 3
        assert_eq!(config.parameter_count(), 24 + 16 + 8 + 6 + 3);
    }
}
