#[cfg(test)]
mod property_tests {
    use duel::layers::AdvantagePolicy;
    use duel::network::blend;
    use duel::replay_buffer::{ReplayBuffer, Transition};
    use duel::trainer::td_target;
    use ndarray::{Array1, Array2, Array3};
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn transition(reward: f32) -> Transition {
        Transition {
            prior_observation: Array3::from_elem((1, 1, 1), reward),
            action: 0,
            reward,
            next_observation: Array3::from_elem((1, 1, 1), reward),
            terminal: false,
        }
    }

    // Rows of [v, a_1, ..., a_n] with n >= 1
    fn raw_outputs_strategy() -> impl Strategy<Value = Array2<f32>> {
        (1usize..=4, 2usize..=6).prop_flat_map(|(rows, cols)| {
            prop::collection::vec(-10.0f32..10.0, rows * cols)
                .prop_map(move |v| Array2::from_shape_vec((rows, cols), v).unwrap())
        })
    }

    proptest! {
        #[test]
        fn test_ring_buffer_keeps_most_recent(capacity in 1usize..20, inserts in 0usize..60) {
            let mut buffer = ReplayBuffer::new(capacity, [1, 1, 1]);
            for i in 0..inserts {
                buffer.push(transition(i as f32));
            }
            prop_assert_eq!(buffer.len(), inserts.min(capacity));

            let kept: Vec<f32> = buffer.iter_chronological().map(|t| t.reward).collect();
            let expected: Vec<f32> = (inserts.saturating_sub(capacity)..inserts).map(|i| i as f32).collect();
            prop_assert_eq!(kept, expected);
        }

        #[test]
        fn test_sample_is_aligned_and_bounded(
            inserts in 1usize..30,
            batch_size in 0usize..40,
            seed in any::<u64>()
        ) {
            let mut buffer = ReplayBuffer::new(16, [1, 1, 1]);
            for i in 0..inserts {
                buffer.push(transition(i as f32));
            }
            let mut rng = StdRng::seed_from_u64(seed);
            match buffer.sample(batch_size, &mut rng) {
                Ok(batch) => {
                    prop_assert!(batch_size <= buffer.len());
                    prop_assert_eq!(batch.len(), batch_size);
                    for row in 0..batch.len() {
                        prop_assert!(batch.indices[row] < buffer.len());
                        let stored = buffer.get(batch.indices[row]).unwrap();
                        prop_assert_eq!(stored.reward, batch.rewards[row]);
                        prop_assert_eq!(batch.prior_observations[[row, 0, 0, 0]], batch.rewards[row]);
                    }
                }
                Err(err) => {
                    prop_assert!(err.is_insufficient_data());
                    prop_assert!(batch_size > buffer.len());
                }
            }
        }

        #[test]
        fn test_policies_differ_by_row_constant(raw in raw_outputs_strategy()) {
            let naive = AdvantagePolicy::Naive.combine(raw.view()).unwrap();
            for policy in [AdvantagePolicy::Max, AdvantagePolicy::Avg] {
                let q = policy.combine(raw.view()).unwrap();
                let shift = &naive - &q;
                for row in shift.rows() {
                    for &s in row.iter() {
                        prop_assert!((s - row[0]).abs() < 1e-4);
                    }
                }
            }
        }

        #[test]
        fn test_max_policy_best_action_equals_value(raw in raw_outputs_strategy()) {
            let q = AdvantagePolicy::Max.combine(raw.view()).unwrap();
            for (raw_row, q_row) in raw.rows().into_iter().zip(q.rows()) {
                let best = q_row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
                prop_assert!((best - raw_row[0]).abs() < 1e-4);
                prop_assert!(q_row.iter().all(|&v| v <= raw_row[0] + 1e-4));
            }
        }

        #[test]
        fn test_avg_policy_mean_equals_value(raw in raw_outputs_strategy()) {
            let q = AdvantagePolicy::Avg.combine(raw.view()).unwrap();
            for (raw_row, q_row) in raw.rows().into_iter().zip(q.rows()) {
                prop_assert!((q_row.mean().unwrap() - raw_row[0]).abs() < 1e-4);
            }
        }

        #[test]
        fn test_blend_endpoints(
            online in prop::collection::vec(-100.0f32..100.0, 1..20),
            seed in any::<u64>()
        ) {
            let mut rng = StdRng::seed_from_u64(seed);
            let target: Array1<f32> = online.iter().map(|_| rand::Rng::gen_range(&mut rng, -100.0f32..100.0)).collect();
            let online = Array1::from_vec(online).into_dyn();
            let target = target.into_dyn();

            let mut copied = target.clone();
            blend(&mut copied, &online, 1.0);
            prop_assert_eq!(&copied, &online);

            let mut unchanged = target.clone();
            blend(&mut unchanged, &online, 0.0);
            prop_assert_eq!(&unchanged, &target);
        }

        #[test]
        fn test_terminal_target_ignores_bootstrap(
            reward in -100.0f32..100.0,
            max_next_q in -1000.0f32..1000.0,
            gamma in 0.0f32..1.0
        ) {
            prop_assert_eq!(td_target(reward, true, max_next_q, gamma), reward);
            let bootstrapped = td_target(reward, false, max_next_q, gamma);
            prop_assert!((bootstrapped - (reward + gamma * max_next_q)).abs() < 1e-3);
        }
    }
}
