use crate::config::{ConvSpec, NetworkConfig, TrainerConfig};
use crate::error::DuelError;
use crate::layers::AdvantagePolicy;
use crate::optimizer::OptimizerKind;

fn rejected_field(config: &TrainerConfig) -> String {
    match config.validate() {
        Err(DuelError::InvalidConfiguration { name, .. }) => name,
        other => panic!("expected InvalidConfiguration, got {:?}", other),
    }
}

#[test]
fn test_default_config_is_valid() {
    let config = TrainerConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.batch_size, 32);
    assert_eq!(config.replay_size, 500_000);
    assert_eq!(config.advantage, AdvantagePolicy::Naive);
    assert_eq!(config.optimizer, OptimizerKind::Adam);
    assert_eq!(config.conv, ConvSpec::default_stack());
}

#[test]
fn test_gamma_must_be_below_one() {
    let config = TrainerConfig { gamma: 1.0, ..TrainerConfig::default() };
    assert_eq!(rejected_field(&config), "gamma");

    let config = TrainerConfig { gamma: 0.0, ..TrainerConfig::default() };
    assert!(config.validate().is_ok());
}

#[test]
fn test_tau_range() {
    let config = TrainerConfig { tau: 0.0, ..TrainerConfig::default() };
    assert_eq!(rejected_field(&config), "tau");

    let config = TrainerConfig { tau: 1.0, ..TrainerConfig::default() };
    assert!(config.validate().is_ok());
}

#[test]
fn test_exploration_range() {
    let config = TrainerConfig { exploration: 1.5, ..TrainerConfig::default() };
    assert_eq!(rejected_field(&config), "exploration");

    let config = TrainerConfig { exploration: 1.0, ..TrainerConfig::default() };
    assert!(config.validate().is_ok());
}

#[test]
fn test_zero_sizes_rejected() {
    let config = TrainerConfig { batch_size: 0, ..TrainerConfig::default() };
    assert_eq!(rejected_field(&config), "batch_size");

    let config = TrainerConfig { replay_size: 0, ..TrainerConfig::default() };
    assert_eq!(rejected_field(&config), "replay_size");

    let config = TrainerConfig { max_timesteps: 0, ..TrainerConfig::default() };
    assert_eq!(rejected_field(&config), "max_timesteps");
}

#[test]
fn test_learning_rate_override_must_be_positive() {
    let config = TrainerConfig { optimizer_lr: Some(-0.1), ..TrainerConfig::default() };
    assert_eq!(rejected_field(&config), "optimizer_lr");

    let config = TrainerConfig { optimizer_lr: Some(f32::NAN), ..TrainerConfig::default() };
    assert_eq!(rejected_field(&config), "optimizer_lr");
}

#[test]
fn test_zero_stride_rejected() {
    let config = TrainerConfig {
        conv: vec![ConvSpec::new(8, (3, 3), (0, 1))],
        ..TrainerConfig::default()
    };
    assert_eq!(rejected_field(&config), "conv");
}

#[test]
fn test_parse_closed_choices() {
    assert_eq!("max".parse::<AdvantagePolicy>().unwrap(), AdvantagePolicy::Max);
    assert_eq!("avg".parse::<AdvantagePolicy>().unwrap(), AdvantagePolicy::Avg);
    assert_eq!("naive".parse::<AdvantagePolicy>().unwrap(), AdvantagePolicy::Naive);
    assert_eq!("rmsprop".parse::<OptimizerKind>().unwrap(), OptimizerKind::RMSProp);
    assert_eq!("adam".parse::<OptimizerKind>().unwrap(), OptimizerKind::Adam);
}

#[test]
fn test_unknown_choices_rejected() {
    assert!(matches!(
        "mean".parse::<AdvantagePolicy>(),
        Err(DuelError::InvalidConfiguration { .. })
    ));
    assert!(matches!(
        "sgd".parse::<OptimizerKind>(),
        Err(DuelError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_choice_names_round_trip_through_display() {
    for policy in [AdvantagePolicy::Naive, AdvantagePolicy::Max, AdvantagePolicy::Avg] {
        assert_eq!(policy.to_string().parse::<AdvantagePolicy>().unwrap(), policy);
    }
    for kind in [OptimizerKind::Adam, OptimizerKind::RMSProp] {
        assert_eq!(kind.to_string().parse::<OptimizerKind>().unwrap(), kind);
    }
}

#[test]
fn test_network_config_from_trainer() {
    let config = TrainerConfig {
        hidden_size: 64,
        layers: 2,
        advantage: AdvantagePolicy::Max,
        optimizer: OptimizerKind::RMSProp,
        optimizer_lr: Some(0.0025),
        ..TrainerConfig::default()
    };
    let network = NetworkConfig::from_trainer(&config, [30, 40, 3], 5);
    assert_eq!(network.observation_shape, [30, 40, 3]);
    assert_eq!(network.num_actions, 5);
    assert_eq!(network.hidden_size, 64);
    assert_eq!(network.layers, 2);
    assert_eq!(network.advantage, AdvantagePolicy::Max);
    assert_eq!(network.optimizer, OptimizerKind::RMSProp);
    assert_eq!(network.learning_rate, Some(0.0025));
}

#[test]
fn test_default_conv_stack_needs_ten_pixels() {
    let config = TrainerConfig::default();
    assert!(NetworkConfig::from_trainer(&config, [10, 10, 3], 4).validate().is_ok());

    for side in 2..10 {
        let network = NetworkConfig::from_trainer(&config, [side, side, 3], 4);
        match network.validate() {
            Err(DuelError::InvalidConfiguration { name, .. }) => assert_eq!(name, "observation_shape"),
            other => panic!("expected InvalidConfiguration for {}x{}, got {:?}", side, side, other),
        }
    }
}

#[test]
fn test_observation_checked_per_axis() {
    let config = TrainerConfig::default();
    assert!(NetworkConfig::from_trainer(&config, [16, 8, 3], 4).validate().is_err());
    assert!(NetworkConfig::from_trainer(&config, [8, 16, 3], 4).validate().is_err());
    assert!(NetworkConfig::from_trainer(&config, [12, 30, 3], 4).validate().is_ok());
}

#[test]
fn test_config_serializes_to_json() {
    let config = TrainerConfig::default();
    let json = serde_json::to_string(&config).unwrap();
    assert!(json.contains("\"advantage\":\"naive\""));
    let back: TrainerConfig = serde_json::from_str(&json).unwrap();
    assert_eq!(back.conv, config.conv);
    assert_eq!(back.tau, config.tau);
}
