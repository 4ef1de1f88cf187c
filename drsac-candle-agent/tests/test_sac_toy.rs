mod common;
use anyhow::Result;
use common::*;
use drsac_core::{
    record::BufferedRecorder, replay_buffer::SimpleReplayBuffer, Agent as _, Configurable,
    DefaultEvaluator, Evaluator, ExperienceBufferBase, Policy, Trainer, TrainerConfig,
};

const MAX_ENV_STEPS: usize = 4_000;
const WARMUP_PERIOD: usize = 500;
const OPT_INTERVAL: usize = 1;
const EVAL_INTERVAL: usize = 1_000;
const N_EPISODES_PER_EVAL: usize = 10;
const SEED: i64 = 42;

fn create_trainer() -> Result<Trainer<ToyEnv, SimpleReplayBuffer>> {
    let config = TrainerConfig::default()
        .max_env_steps(MAX_ENV_STEPS)
        .warmup_period(WARMUP_PERIOD)
        .opt_interval(OPT_INTERVAL)
        .eval_interval(EVAL_INTERVAL)
        .seed(SEED);
    Trainer::build(
        config,
        ToyEnvConfig::default(),
        create_replay_buffer_config(SEED as u64),
    )
}

#[test]
fn test_sac_toy() -> Result<()> {
    init_logger();

    let mut agent = Agent::build(create_agent_config().seed(SEED as u64))?;
    let mut evaluator = DefaultEvaluator::<ToyEnv>::new(
        &ToyEnvConfig::default(),
        SEED + 1_000,
        N_EPISODES_PER_EVAL,
    )?;

    // Uniformly random actions in [-1, 1]^2 score about -4.2 per episode
    agent.eval();
    let eval_return_init = evaluator.evaluate(&mut agent)?.get_scalar("eval_return")?;

    let mut recorder = BufferedRecorder::new();
    let mut trainer = create_trainer()?;
    let buffer = trainer.train(&mut agent, &mut recorder, &mut evaluator)?;
    assert_eq!(buffer.len(), MAX_ENV_STEPS);
    assert_eq!(agent.n_opts(), MAX_ENV_STEPS - WARMUP_PERIOD + 1);

    // Losses stay finite and the critic loss goes down
    let loss_critic = recorder.scalars("loss_critic");
    assert_eq!(loss_critic.len(), agent.n_opts());
    assert!(loss_critic.iter().all(|l| l.is_finite()));
    assert!(recorder.scalars("loss_actor").iter().all(|l| l.is_finite()));
    let q = loss_critic.len() / 4;
    let (first, last) = (mean(&loss_critic[..q]), mean(&loss_critic[3 * q..]));
    assert!(last < first, "loss_critic: {} -> {}", first, last);

    // The entropy coefficient stays positive
    assert!(recorder.scalars("ent_coef").iter().all(|&a| a > 0.0));

    // The trained policy reaches the target
    let eval_returns = recorder.scalars("eval_return");
    assert_eq!(eval_returns.len(), MAX_ENV_STEPS / EVAL_INTERVAL);
    agent.eval();
    let eval_return = evaluator.evaluate(&mut agent)?.get_scalar("eval_return")?;
    assert!(
        eval_return > -0.6,
        "eval_return: {} -> {}",
        eval_return_init,
        eval_return
    );
    assert!(eval_return > eval_return_init);

    Ok(())
}

#[test]
fn test_deterministic_in_eval_mode() -> Result<()> {
    init_logger();

    let mut agent = Agent::build(create_agent_config())?;
    let obs = [0.3f32, -0.2];

    agent.eval();
    assert!(!agent.is_train());
    let a1 = agent.sample(&obs)?;
    let a2 = agent.sample(&obs)?;
    assert_eq!(a1, a2);
    assert_eq!(a1.len(), DIM_ACT);
    assert!(a1.iter().all(|a| (-1.0..=1.0).contains(a)));

    agent.train();
    assert!(agent.is_train());
    for _ in 0..100 {
        let a = agent.sample(&obs)?;
        assert!(a.iter().all(|a| (-1.0..=1.0).contains(a)));
    }
    Ok(())
}
