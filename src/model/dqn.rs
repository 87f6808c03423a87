//! Double-DQN trainer
//!
//! The main network selects the next action, the target network evaluates it.
//! The target network only ever moves through the soft update.

use crate::config::ModelConfig;
use crate::features::{StateVector, STATE_SIZE};
use crate::model::network::{QNetwork, QOptimizer};
use crate::replay::ReplayBuffer;
use crate::types::Action;
use rand::Rng;
use tracing::debug;

/// Result of one completed training step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingStats {
    /// Mean-squared error of the batch before the update
    pub loss: f32,
    pub batch_size: usize,
    /// Training steps completed so far, this one included
    pub step: u64,
}

/// Main and target value networks with their optimizer
#[derive(Debug)]
pub struct DoubleDqn {
    main: QNetwork,
    target: QNetwork,
    optimizer: QOptimizer,
    gamma: f32,
    tau: f32,
    batch_size: usize,
    learning_rate: f32,
    train_steps: u64,
}

impl DoubleDqn {
    /// Fresh networks; the target starts as an exact copy of main
    pub fn new<R>(config: &ModelConfig, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let main = Self::fresh_network(config, rng);
        let target = main.clone();
        let optimizer = QOptimizer::adam(config.learning_rate);

        Self {
            main,
            target,
            optimizer,
            gamma: config.gamma,
            tau: config.tau,
            batch_size: config.batch_size,
            learning_rate: config.learning_rate,
            train_steps: 0,
        }
    }

    /// Untrained network with the configured architecture
    pub fn fresh_network<R>(config: &ModelConfig, rng: &mut R) -> QNetwork
    where
        R: Rng + ?Sized,
    {
        QNetwork::new(
            STATE_SIZE,
            &[config.hidden_units, config.hidden_units],
            Action::COUNT,
            rng,
        )
    }

    /// Layer widths every loaded network must match
    pub fn expected_shape(&self) -> Vec<usize> {
        self.main.shape()
    }

    /// Action values under the main network, indexed by [`Action::index`]
    pub fn q_values(&self, state: &StateVector) -> Vec<f32> {
        self.main.predict(state.as_slice())
    }

    /// Value of [`Action::Join`] under the main network
    pub fn join_value(&self, state: &StateVector) -> f32 {
        self.q_values(state)
            .get(Action::Join.index())
            .copied()
            .unwrap_or(0.0)
    }

    /// Run one Double-DQN update on a sampled batch.
    ///
    /// Returns `None` without touching the networks while the buffer holds
    /// fewer experiences than the batch size.
    pub fn train<R>(&mut self, buffer: &ReplayBuffer, rng: &mut R) -> Option<TrainingStats>
    where
        R: Rng + ?Sized,
    {
        if buffer.len() < self.batch_size {
            return None;
        }

        let batch = buffer.sample(rng, self.batch_size);
        let states: Vec<&[f32]> = batch.iter().map(|e| e.state.as_slice()).collect();
        let next_states: Vec<&[f32]> = batch.iter().map(|e| e.next_state.as_slice()).collect();

        let next_main = self.main.predict_batch(&next_states);
        let next_target = self.target.predict_batch(&next_states);
        let mut targets = self.main.predict_batch(&states);

        for (((experience, current), main_next), target_next) in batch
            .iter()
            .zip(targets.iter_mut())
            .zip(&next_main)
            .zip(&next_target)
        {
            let selected = argmax(main_next);
            let continuation = if experience.done { 0.0 } else { 1.0 };
            let target_value = experience.reward
                + continuation * self.gamma * target_next.get(selected).copied().unwrap_or(0.0);

            // Only the taken action is pushed toward the target
            if let Some(slot) = current.get_mut(experience.action.index()) {
                *slot = target_value;
            }
        }

        let loss = self.main.train_batch(&states, &targets, &mut self.optimizer);
        self.soft_update();
        self.train_steps += 1;

        debug!(
            "Training step {} - batch: {}, loss: {:.6}",
            self.train_steps,
            batch.len(),
            loss
        );

        Some(TrainingStats {
            loss,
            batch_size: batch.len(),
            step: self.train_steps,
        })
    }

    /// `target = tau * main + (1 - tau) * target`
    fn soft_update(&mut self) {
        // Both networks are built from the same config, so shapes always agree
        if let Err(e) = self.target.blend_from(&self.main, self.tau) {
            debug!("Skipping soft update: {}", e);
        }
    }

    /// Install loaded weights into both networks and reset the optimizer
    pub fn load_network(&mut self, network: QNetwork) -> crate::error::Result<()> {
        if network.shape() != self.main.shape() {
            return Err(crate::error::MatchmakingError::ModelError {
                message: format!(
                    "Expected network shape {:?}, got {:?}",
                    self.main.shape(),
                    network.shape()
                ),
            }
            .into());
        }

        self.optimizer = QOptimizer::adam(self.learning_rate);
        self.target = network.clone();
        self.main = network;
        Ok(())
    }

    pub fn main_network(&self) -> &QNetwork {
        &self.main
    }

    pub fn target_network(&self) -> &QNetwork {
        &self.target
    }

    pub fn train_steps(&self) -> u64 {
        self.train_steps
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }
}

/// Index of the largest value, first one on ties
fn argmax(values: &[f32]) -> usize {
    let mut best = 0;
    for (idx, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = idx;
        }
    }
    best
}
