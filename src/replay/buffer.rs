//! Bounded experience buffer sampled during training
//!
//! Stores the most recent transitions; once full, each push evicts the oldest.

use crate::features::StateVector;
use crate::types::Action;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One observed transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Experience {
    pub state: StateVector,
    pub action: Action,
    pub reward: f32,
    pub next_state: StateVector,
    pub done: bool,
}

/// FIFO ring of experiences with uniform sampling without replacement.
pub struct ReplayBuffer {
    /// Maximum number of experiences to store
    capacity: usize,

    data: VecDeque<Experience>,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            data: VecDeque::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Add an experience, evicting the oldest one when full.
    pub fn push(&mut self, experience: Experience) {
        if self.capacity == 0 {
            return;
        }
        if self.data.len() == self.capacity {
            self.data.pop_front();
        }
        self.data.push_back(experience);
    }

    /// Draw `min(batch_size, len)` distinct experiences uniformly at random.
    ///
    /// An empty buffer yields an empty sample.
    pub fn sample<'a, R>(&'a self, rng: &mut R, batch_size: usize) -> Vec<&'a Experience>
    where
        R: Rng + ?Sized,
    {
        let amount = batch_size.min(self.data.len());
        rand::seq::index::sample(rng, self.data.len(), amount)
            .into_iter()
            .map(|idx| &self.data[idx])
            .collect()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    /// Iterate from oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    fn make_experience(reward: f32) -> Experience {
        Experience {
            state: StateVector::zeros(),
            action: Action::Join,
            reward,
            next_state: StateVector::zeros(),
            done: false,
        }
    }

    #[test]
    fn test_push_and_len() {
        let mut buffer = ReplayBuffer::new(3);
        assert!(buffer.is_empty());

        buffer.push(make_experience(1.0));
        buffer.push(make_experience(2.0));
        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.capacity(), 3);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut buffer = ReplayBuffer::new(2);
        buffer.push(make_experience(1.0));
        buffer.push(make_experience(2.0));
        buffer.push(make_experience(3.0));

        let rewards: Vec<f32> = buffer.iter().map(|e| e.reward).collect();
        assert_eq!(rewards, vec![2.0, 3.0]);
    }

    #[test]
    fn test_sample_empty_buffer() {
        let buffer = ReplayBuffer::new(5);
        let mut rng = StdRng::seed_from_u64(42);
        assert!(buffer.sample(&mut rng, 4).is_empty());
    }

    #[test]
    fn test_sample_clamps_to_len() {
        let mut buffer = ReplayBuffer::new(10);
        for i in 0..3 {
            buffer.push(make_experience(i as f32));
        }
        let mut rng = StdRng::seed_from_u64(42);
        let sample = buffer.sample(&mut rng, 64);
        assert_eq!(sample.len(), 3);
    }

    #[test]
    fn test_clear() {
        let mut buffer = ReplayBuffer::new(4);
        buffer.push(make_experience(1.0));
        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.capacity(), 4);
    }

    proptest! {
        #[test]
        fn prop_never_exceeds_capacity(capacity in 1usize..50, pushes in 0usize..200) {
            let mut buffer = ReplayBuffer::new(capacity);
            for i in 0..pushes {
                buffer.push(make_experience(i as f32));
            }
            prop_assert_eq!(buffer.len(), pushes.min(capacity));
            if pushes > 0 {
                let newest = buffer.iter().last().map(|e| e.reward);
                prop_assert_eq!(newest, Some((pushes - 1) as f32));
            }
            if pushes > capacity {
                let oldest = buffer.iter().next().map(|e| e.reward);
                prop_assert_eq!(oldest, Some((pushes - capacity) as f32));
            }
        }

        #[test]
        fn prop_sample_is_distinct(len in 0usize..40, batch in 0usize..60, seed in any::<u64>()) {
            let mut buffer = ReplayBuffer::new(64);
            for i in 0..len {
                buffer.push(make_experience(i as f32));
            }
            let mut rng = StdRng::seed_from_u64(seed);
            let sample = buffer.sample(&mut rng, batch);
            prop_assert_eq!(sample.len(), batch.min(len));

            let distinct: HashSet<u32> = sample.iter().map(|e| e.reward as u32).collect();
            prop_assert_eq!(distinct.len(), sample.len());
        }
    }
}
