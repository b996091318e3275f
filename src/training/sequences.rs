//! Sliding-window training examples.

use ndarray::Array2;

use crate::error::{MelodyError, Result};

/// Borrowed view of every `(window, target)` pair in an id sequence.
///
/// Example `i` is `ids[i..i + N]` followed by `ids[i + N]`, so there are
/// `len - N` examples and none when the corpus is not longer than `N`.
#[derive(Debug, Clone, Copy)]
pub struct SequenceDataset<'a> {
    ids: &'a [usize],
    sequence_length: usize,
}

impl<'a> SequenceDataset<'a> {
    pub fn new(ids: &'a [usize], sequence_length: usize) -> Result<Self> {
        if sequence_length == 0 {
            return Err(MelodyError::invalid_config("sequence_length must be > 0"));
        }
        Ok(Self {
            ids,
            sequence_length,
        })
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Number of examples.
    pub fn len(&self) -> usize {
        self.ids.len().saturating_sub(self.sequence_length)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The `index`-th window and its target.
    pub fn get(&self, index: usize) -> Option<(&'a [usize], usize)> {
        if index >= self.len() {
            return None;
        }
        let end = index + self.sequence_length;
        Some((&self.ids[index..end], self.ids[end]))
    }

    /// Examples in corpus order.
    pub fn iter(&self) -> impl Iterator<Item = (&'a [usize], usize)> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }
}

/// One-hot expansion of a window, `[N, V]`.
pub fn one_hot(window: &[usize], vocab_size: usize) -> Result<Array2<f32>> {
    let mut encoded = Array2::zeros((window.len(), vocab_size));
    for (row, &id) in window.iter().enumerate() {
        if id >= vocab_size {
            return Err(MelodyError::unknown_id(id, vocab_size));
        }
        encoded[[row, id]] = 1.0;
    }
    Ok(encoded)
}
