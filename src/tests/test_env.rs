use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::env::{Environment, GridWorld, GRID_ACTIONS};
use crate::error::DuelError;

#[test]
fn test_gridworld_rejects_tiny_grid() {
    assert!(matches!(
        GridWorld::new(1, None),
        Err(DuelError::InvalidConfiguration { .. })
    ));
}

#[test]
fn test_gridworld_observation_layout() {
    let mut env = GridWorld::new(5, Some(3)).unwrap();
    assert_eq!(env.observation_shape(), [5, 5, 3]);
    assert_eq!(env.num_actions(), GRID_ACTIONS);

    let obs = env.reset().unwrap();
    assert_eq!(obs.shape(), &[5, 5, 3]);

    let agent_pixels = obs.index_axis(ndarray::Axis(2), 0).iter().filter(|&&v| v == 255.0).count();
    let goal_pixels = obs.index_axis(ndarray::Axis(2), 1).iter().filter(|&&v| v == 255.0).count();
    assert_eq!(agent_pixels, 1);
    assert_eq!(goal_pixels, 1);
    assert_eq!(obs[[4, 4, 1]], 255.0);

    let (row, col) = env.agent_position();
    assert_eq!(obs[[row, col, 0]], 255.0);
    assert_ne!((row, col), env.goal_position());
    assert!(obs.iter().all(|&v| (0.0..=255.0).contains(&v)));
}

#[test]
fn test_gridworld_walls_block_movement() {
    let mut env = GridWorld::new(4, Some(0)).unwrap();
    env.reset().unwrap();
    env.set_agent_position((0, 0)).unwrap();

    let step = env.step(0).unwrap();
    assert_eq!(env.agent_position(), (0, 0));
    assert!(!step.done);
    assert!((step.reward - (-0.01)).abs() < 1e-7);

    env.step(2).unwrap();
    assert_eq!(env.agent_position(), (0, 0));

    env.step(1).unwrap();
    env.step(3).unwrap();
    assert_eq!(env.agent_position(), (1, 1));
}

#[test]
fn test_gridworld_goal_is_terminal() {
    let mut env = GridWorld::new(3, Some(0)).unwrap();
    env.reset().unwrap();
    env.set_agent_position((2, 1)).unwrap();

    let step = env.step(3).unwrap();
    assert!(step.done);
    assert_eq!(step.reward, 1.0);
    assert_eq!(step.info["distance"], 0.0);

    assert!(matches!(env.step(0), Err(DuelError::Environment(_))));
}

#[test]
fn test_gridworld_invalid_action() {
    let mut env = GridWorld::new(3, Some(0)).unwrap();
    env.reset().unwrap();
    assert!(matches!(env.step(GRID_ACTIONS), Err(DuelError::Environment(_))));
}

#[test]
fn test_gridworld_step_before_reset_fails() {
    let mut env = GridWorld::new(3, Some(0)).unwrap();
    assert!(env.step(0).is_err());
}

#[test]
fn test_gridworld_seeded_resets_repeat() {
    let mut a = GridWorld::new(8, Some(11)).unwrap();
    let mut b = GridWorld::new(8, Some(11)).unwrap();
    for _ in 0..10 {
        assert_eq!(a.reset().unwrap(), b.reset().unwrap());
    }
}

#[test]
fn test_sample_action_in_range() {
    let mut env = GridWorld::new(3, Some(0)).unwrap();
    let mut rng = StdRng::seed_from_u64(5);
    let mut seen = [false; GRID_ACTIONS];
    for _ in 0..200 {
        let action = env.sample_action(&mut rng);
        assert!(action < GRID_ACTIONS);
        seen[action] = true;
    }
    assert!(seen.iter().all(|&s| s));
}

#[test]
fn test_render_and_close() {
    let mut env = GridWorld::new(3, Some(0)).unwrap();
    env.reset().unwrap();
    assert!(env.render().is_ok());
    assert!(env.close().is_ok());
}
