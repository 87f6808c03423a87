//! Performance benchmarks for encoding, inference and training

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use squadmatch::config::{MatchingConfig, ModelConfig};
use squadmatch::features::encode_state;
use squadmatch::matching::MatchEngine;
use squadmatch::model::DoubleDqn;
use squadmatch::profile::{seed_demo_profiles, InMemoryProfileRepository};
use squadmatch::replay::{Experience, ReplayBuffer};
use squadmatch::types::{Action, MatchmakingRequest, Sport};
use std::sync::Arc;

fn filled_buffer(rng: &mut StdRng, size: usize) -> ReplayBuffer {
    let mut buffer = ReplayBuffer::new(size);
    for i in 0..size {
        let sport = Sport::ALL[i % Sport::ALL.len()];
        let state = encode_state(rng.random_range(1..=5), sport.name(), "Delhi", "Weekend Evenings", 0.5);
        let next_state = encode_state(rng.random_range(1..=5), sport.name(), "Delhi", "Weekend Evenings", 0.55);
        buffer.push(Experience {
            state,
            action: Action::Join,
            reward: if i % 2 == 0 { 1.0 } else { -1.0 },
            next_state,
            done: false,
        });
    }
    buffer
}

fn bench_encoding(c: &mut Criterion) {
    c.bench_function("encode_state", |b| {
        b.iter(|| {
            encode_state(
                black_box(4),
                black_box("Football"),
                black_box("Mumbai"),
                black_box("Weekday Evenings"),
                0.5,
            )
        })
    });
}

fn bench_inference(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let dqn = DoubleDqn::new(&ModelConfig::default(), &mut rng);
    let state = encode_state(3, "Tennis", "Pune", "Flexible", 0.5);

    c.bench_function("q_values", |b| b.iter(|| dqn.q_values(black_box(&state))));
}

fn bench_training(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let config = ModelConfig::default();
    let buffer = filled_buffer(&mut rng, 1_000);

    c.bench_function("train_step_batch_64", |b| {
        b.iter_batched(
            || {
                let mut init_rng = StdRng::seed_from_u64(11);
                (DoubleDqn::new(&config, &mut init_rng), init_rng)
            },
            |(mut dqn, mut rng)| dqn.train(&buffer, &mut rng),
            BatchSize::SmallInput,
        )
    });
}

fn bench_matchmaking(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let repository = Arc::new(InMemoryProfileRepository::new());
    seed_demo_profiles(repository.as_ref(), 200, &mut rng).unwrap();

    let model_config = ModelConfig {
        seed: Some(7),
        save_on_update: false,
        ..ModelConfig::default()
    };
    let mut engine = MatchEngine::new(repository, model_config, MatchingConfig::default());
    let request = MatchmakingRequest {
        player_id: "bench_player".to_string(),
        skill_level: 3,
        sport: "Football".to_string(),
        location: "Mumbai".to_string(),
        availability: "Weekend Evenings".to_string(),
    };

    c.bench_function("matchmake_200_profiles", |b| {
        b.iter(|| engine.matchmake(black_box(&request)).unwrap())
    });
}

criterion_group!(
    benches,
    bench_encoding,
    bench_inference,
    bench_training,
    bench_matchmaking
);
criterion_main!(benches);
