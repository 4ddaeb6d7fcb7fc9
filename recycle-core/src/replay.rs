use crate::{error::ReCycleError, rng::with_rng};
use rand::Rng;

pub const DEFAULT_REPLAY_SIZE: usize = 50;

/// History of generated samples shown to the discriminators. Until the buffer is full every
/// sample passes through and is remembered. Afterwards each sample is, with probability one half,
/// swapped with a uniformly chosen stored one, which is returned in its place.
#[derive(Debug, Clone)]
pub struct ReplayBuffer<T> {
    data: Vec<T>,
    max_size: usize,
}

impl<T: Clone> ReplayBuffer<T> {
    pub fn new(max_size: usize) -> Result<Self, ReCycleError> {
        if max_size == 0 {
            return Err(ReCycleError::EmptyBuffer);
        }
        Ok(Self {
            data: Vec::with_capacity(max_size),
            max_size,
        })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.data.len() == self.max_size
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn push_and_pop(&mut self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        with_rng(|rng| {
            items
                .into_iter()
                .map(|item| self.exchange(item, &mut *rng))
                .collect()
        })
    }

    fn exchange(&mut self, item: T, rng: &mut impl Rng) -> T {
        if self.data.len() < self.max_size {
            self.data.push(item.clone());
            return item;
        }
        if rng.random_bool(0.5) {
            let idx = rng.random_range(0..self.max_size);
            std::mem::replace(&mut self.data[idx], item)
        } else {
            item
        }
    }
}

impl<T: Clone> Default for ReplayBuffer<T> {
    fn default() -> Self {
        Self {
            data: Vec::with_capacity(DEFAULT_REPLAY_SIZE),
            max_size: DEFAULT_REPLAY_SIZE,
        }
    }
}
