use duel::config::{ConvSpec, TrainerConfig};
use duel::env::{Environment, GridWorld};
use duel::error::DuelError;
use duel::layers::AdvantagePolicy;
use duel::metrics::EpisodeSummary;
use duel::optimizer::OptimizerKind;
use duel::sink::CsvSink;
use duel::trainer::Trainer;

fn gridworld_config(advantage: AdvantagePolicy) -> TrainerConfig {
    TrainerConfig {
        batch_size: 4,
        hidden_size: 16,
        layers: 1,
        train_repeat: 1,
        gamma: 0.9,
        tau: 0.01,
        episodes: 3,
        replay_size: 100,
        max_timesteps: 20,
        exploration: 0.3,
        advantage,
        conv: vec![ConvSpec::new(4, (2, 2), (2, 2))],
        display: false,
        seed: Some(17),
        ..TrainerConfig::default()
    }
}

#[test]
fn test_end_to_end_gridworld_with_csv() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("episodes.csv");

    let mut env = GridWorld::new(6, Some(17)).unwrap();
    let mut trainer = Trainer::new(gridworld_config(AdvantagePolicy::Avg), &env).unwrap();
    trainer.add_sink(CsvSink::create(&csv_path).unwrap());

    let average = trainer.run(&mut env).unwrap();
    assert!(average.is_finite());
    assert_eq!(trainer.stats().episodes(), 3);
    assert!(trainer.buffer().len() <= 60);
    assert!(trainer.total_train_steps() > 0);

    let text = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], EpisodeSummary::HEADER.join(","));
    for (i, line) in lines[1..].iter().enumerate() {
        let fields: Vec<&str> = line.split(',').collect();
        assert_eq!(fields.len(), 13);
        assert_eq!(fields[0], (i + 1).to_string());
        assert_eq!(fields[5], "0.3");
    }
    env.close().unwrap();
}

#[test]
fn test_every_policy_and_optimizer_trains() {
    for advantage in [AdvantagePolicy::Naive, AdvantagePolicy::Max, AdvantagePolicy::Avg] {
        for optimizer in [OptimizerKind::Adam, OptimizerKind::RMSProp] {
            let config = TrainerConfig {
                optimizer,
                episodes: 1,
                ..gridworld_config(advantage)
            };
            let mut env = GridWorld::new(6, Some(1)).unwrap();
            let mut trainer = Trainer::new(config, &env).unwrap();
            let summary = trainer.run_episode(&mut env, 1).unwrap();
            assert!(summary.episode_steps >= 1 && summary.episode_steps <= 20);
            if trainer.total_train_steps() > 0 {
                assert!(summary.meancost.is_finite(), "{} / {}", advantage, optimizer);
            }
        }
    }
}

#[test]
fn test_checkpoint_resumes_into_new_trainer() {
    let dir = tempfile::tempdir().unwrap();
    let weights = dir.path().join("weights.bin");

    let mut env = GridWorld::new(6, Some(5)).unwrap();
    let mut first = Trainer::new(gridworld_config(AdvantagePolicy::Max), &env).unwrap();
    first.run(&mut env).unwrap();
    first.save_weights(&weights).unwrap();

    let config = TrainerConfig { seed: Some(99), ..gridworld_config(AdvantagePolicy::Max) };
    let mut second = Trainer::new(config, &env).unwrap();
    second.load_weights(&weights).unwrap();

    let observation = env.reset().unwrap();
    let mut a = first.online().clone();
    let mut b = second.online().clone();
    assert_eq!(
        a.predict_one(observation.view()).unwrap(),
        b.predict_one(observation.view()).unwrap()
    );
}

#[test]
fn test_recording_writes_frames() {
    let dir = tempfile::tempdir().unwrap();
    let record_dir = dir.path().join("frames");
    let config = TrainerConfig {
        episodes: 1,
        max_timesteps: 5,
        record_dir: Some(record_dir.clone()),
        ..gridworld_config(AdvantagePolicy::Naive)
    };

    let mut env = GridWorld::new(6, Some(2)).unwrap();
    let mut trainer = Trainer::new(config, &env).unwrap();
    let summary = trainer.run_episode(&mut env, 1).unwrap();

    let frames = std::fs::read_dir(record_dir.join("episode_1")).unwrap().count();
    // The reset frame plus one per step.
    assert_eq!(frames, summary.episode_steps + 1);
}

#[test]
fn test_default_network_fits_default_grid() {
    let config = TrainerConfig {
        replay_size: 1000,
        display: false,
        seed: Some(3),
        ..TrainerConfig::default()
    };
    let env = GridWorld::new(16, Some(3)).unwrap();
    let trainer = Trainer::new(config, &env).unwrap();
    assert_eq!(trainer.online().num_actions(), 4);
    assert!(trainer.online().parameter_count() > 0);
}

#[test]
fn test_small_grid_rejected_by_default_network() {
    let config = TrainerConfig { display: false, seed: Some(3), ..TrainerConfig::default() };
    let env = GridWorld::new(6, Some(3)).unwrap();
    match Trainer::new(config, &env) {
        Err(DuelError::InvalidConfiguration { name, .. }) => assert_eq!(name, "observation_shape"),
        Err(other) => panic!("expected InvalidConfiguration, got {:?}", other),
        Ok(_) => panic!("a 6x6 grid should not fit the default conv stack"),
    }
}
