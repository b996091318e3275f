//! Seeded temperature-sampling loop.
//!
//! ```text
//! Seeded --step--> Generating --delimiter sampled--> Terminated(EndOfSequence)
//!                      |
//!                      +------max_steps reached----> Terminated(MaxLength)
//! ```
//!
//! The context starts as one window of delimiters followed by the seed, the
//! same shape a song start has in the training corpus.

use rand::Rng;

use crate::error::{MelodyError, Result};
use crate::models::{validate_temperature, NextSymbolModel, Probabilities};
use crate::preprocess::decode_song;
use crate::types::{Score, Symbol};
use crate::vocabulary::Vocabulary;

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The model sampled the song delimiter.
    EndOfSequence,
    /// `max_steps` symbols were sampled.
    MaxLength,
}

/// Generator lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    Seeded,
    Generating,
    Terminated(TerminationReason),
}

/// Sampling parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingOptions {
    /// Window length fed to the model.
    pub sequence_length: usize,
    pub temperature: f32,
    /// Maximum number of sampled symbols, the delimiter included.
    pub max_steps: usize,
}

/// A finished generation run.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMelody {
    /// Seed followed by the sampled symbols, without delimiters.
    pub symbols: Vec<Symbol>,
    pub seed_length: usize,
    /// Number of model draws, the terminating delimiter included.
    pub steps: usize,
    pub reason: TerminationReason,
}

impl GeneratedMelody {
    /// Symbols produced by the model.
    pub fn sampled(&self) -> &[Symbol] {
        &self.symbols[self.seed_length..]
    }

    /// Decodes the melody into a score.
    pub fn to_score(&self, time_step: f64) -> Result<Score> {
        decode_song(&self.symbols, time_step)
    }
}

/// Autoregressive sampler over a [`NextSymbolModel`].
pub struct MelodyGenerator<'a, M: NextSymbolModel + ?Sized> {
    model: &'a M,
    vocabulary: &'a Vocabulary,
    options: SamplingOptions,
    delimiter: usize,
    context: Vec<usize>,
    seed_length: usize,
    steps: usize,
    state: GeneratorState,
}

impl<'a, M: NextSymbolModel + ?Sized> MelodyGenerator<'a, M> {
    /// Validates the temperature and seed and primes the context.
    ///
    /// Fails with INVALID_TEMPERATURE before the model is touched, and with
    /// LOOKUP for a seed token outside the vocabulary.
    pub fn new(
        model: &'a M,
        vocabulary: &'a Vocabulary,
        seed: &str,
        options: SamplingOptions,
    ) -> Result<Self> {
        validate_temperature(options.temperature)?;

        if options.sequence_length == 0 {
            return Err(MelodyError::invalid_config("sequence_length must be > 0"));
        }
        if model.vocab_size() != vocabulary.len() {
            return Err(MelodyError::invalid_artifact(format!(
                "model predicts {} symbols but the vocabulary has {}",
                model.vocab_size(),
                vocabulary.len()
            )));
        }

        let delimiter = vocabulary.id_of(&Symbol::Delimiter)?;
        let seed_ids = seed
            .split_whitespace()
            .map(|token| vocabulary.id_of_token(token))
            .collect::<Result<Vec<_>>>()?;
        if seed_ids.contains(&delimiter) {
            return Err(MelodyError::invalid_config(
                "seed melody cannot contain the song delimiter",
            ));
        }

        let mut context = vec![delimiter; options.sequence_length];
        context.extend_from_slice(&seed_ids);

        Ok(Self {
            model,
            vocabulary,
            options,
            delimiter,
            context,
            seed_length: seed_ids.len(),
            steps: 0,
            state: GeneratorState::Seeded,
        })
    }

    pub fn state(&self) -> GeneratorState {
        self.state
    }

    /// Samples one symbol.
    ///
    /// Returns the appended symbol, or None once generation has terminated.
    pub fn step<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Result<Option<Symbol>> {
        if let GeneratorState::Terminated(_) = self.state {
            return Ok(None);
        }
        if self.steps >= self.options.max_steps {
            self.state = GeneratorState::Terminated(TerminationReason::MaxLength);
            return Ok(None);
        }
        self.state = GeneratorState::Generating;

        let start = self.context.len().saturating_sub(self.options.sequence_length);
        let probs = Probabilities::new(self.model.predict(&self.context[start..])?)?;
        if probs.len() != self.vocabulary.len() {
            return Err(MelodyError::invalid_artifact(format!(
                "model returned {} probabilities for {} symbols",
                probs.len(),
                self.vocabulary.len()
            )));
        }

        let id = probs.sample_with_temperature(self.options.temperature, rng)?;
        let symbol = self.vocabulary.symbol_of(id)?;
        self.steps += 1;

        if id == self.delimiter {
            self.state = GeneratorState::Terminated(TerminationReason::EndOfSequence);
            return Ok(None);
        }

        self.context.push(id);
        if self.steps >= self.options.max_steps {
            self.state = GeneratorState::Terminated(TerminationReason::MaxLength);
        }
        Ok(Some(symbol))
    }

    /// Samples until termination.
    pub fn run<R: Rng + ?Sized>(mut self, rng: &mut R) -> Result<GeneratedMelody> {
        while self.step(rng)?.is_some() {}
        self.finish()
    }

    fn finish(self) -> Result<GeneratedMelody> {
        let reason = match self.state {
            GeneratorState::Terminated(reason) => reason,
            _ => TerminationReason::MaxLength,
        };
        let melody_ids = &self.context[self.options.sequence_length..];
        let symbols = self.vocabulary.decode(melody_ids)?;
        tracing::debug!(
            seed = self.seed_length,
            sampled = symbols.len() - self.seed_length,
            reason = ?reason,
            "generation finished"
        );
        Ok(GeneratedMelody {
            symbols,
            seed_length: self.seed_length,
            steps: self.steps,
            reason,
        })
    }
}
