mod common;
use anyhow::Result;
use common::*;
use drsac_candle_agent::{
    mlp::{Mlp, Mlp2, MlpConfig},
    sac::SacConfig,
};
use drsac_core::{
    error::DrsacError, record::NullRecorder, replay_buffer::SimpleReplayBuffer, Agent as _,
    Configurable, DefaultEvaluator, ReplayBufferBase, Trainer, TrainerConfig,
};
use tempdir::TempDir;

const OBS: [[f32; 2]; 3] = [[0.0, 0.0], [0.4, -0.1], [-0.5, 0.5]];

fn deterministic_actions(agent: &mut Agent) -> Result<Vec<Vec<f32>>> {
    OBS.iter()
        .map(|obs| agent.select_action(obs, true))
        .collect()
}

fn trained_agent() -> Result<Agent> {
    let mut agent = Agent::build(create_agent_config())?;
    let mut buffer = SimpleReplayBuffer::build(&create_replay_buffer_config(0))?;
    for i in 0..BATCH_SIZE {
        let x = i as f32 / BATCH_SIZE as f32 - 0.5;
        buffer.add(&[x, x], &[-x, x], -2.0 * x * x, &[x, -x], false);
    }
    for _ in 0..10 {
        agent.opt(&mut buffer)?;
    }
    Ok(agent)
}

#[test]
fn test_save_load() -> Result<()> {
    init_logger();

    let mut agent1 = trained_agent()?;
    let mut agent2 = Agent::build(create_agent_config())?;

    let dir = TempDir::new("sac_save_load")?;
    let paths = agent1.save(dir.path(), "Toy", 100)?;
    assert_eq!(paths.len(), 2);
    assert!(dir.path().join("Toy_actor100.pt").exists());
    assert!(dir.path().join("Toy_q_critic100.pt").exists());

    agent2.load(dir.path(), "Toy", 100)?;
    assert_eq!(
        deterministic_actions(&mut agent1)?,
        deterministic_actions(&mut agent2)?
    );

    // Nothing was saved under another step
    assert!(agent2.load(dir.path(), "Toy", 200).is_err());
    Ok(())
}

#[test]
fn test_save_load_params() -> Result<()> {
    init_logger();

    let mut agent1 = trained_agent()?;
    let mut agent2 = Agent::build(create_agent_config())?;

    let dir = TempDir::new("sac_params")?;
    let model_dir = dir.path().join("best");
    let paths = agent1.save_params(&model_dir)?;
    assert!(paths.iter().all(|p| p.exists()));

    agent2.load_params(&model_dir)?;
    assert_eq!(
        deterministic_actions(&mut agent1)?,
        deterministic_actions(&mut agent2)?
    );

    // Training continues from the loaded parameters
    let mut buffer = SimpleReplayBuffer::build(&create_replay_buffer_config(1))?;
    buffer.add(&[0.1, 0.2], &[0.1, 0.2], 0.0, &[0.2, 0.1], false);
    let record = agent2.opt_with_record(&mut buffer)?;
    assert!(record.get_scalar("loss_critic")?.is_finite());
    Ok(())
}

#[test]
fn test_config_yaml() -> Result<()> {
    let config = create_agent_config();
    let dir = TempDir::new("sac_config")?;
    let path = dir.path().join("sac.yaml");
    config.save(&path)?;

    let mut agent = Agent::build_from_path(&path)?;
    assert_eq!(agent.select_action(&OBS[1], true)?.len(), DIM_ACT);
    Ok(())
}

fn build_err(config: SacConfig<Mlp, Mlp2>) -> DrsacError {
    match Agent::build(config) {
        Ok(_) => panic!("the agent must not be built"),
        Err(e) => e
            .downcast::<DrsacError>()
            .unwrap_or_else(|e| panic!("unexpected error: {}", e)),
    }
}

#[test]
fn test_invalid_config() {
    // The actor does not take observations of dimension 3
    let config = create_agent_config().dims(3, DIM_ACT);
    match build_err(config) {
        DrsacError::DimensionMismatch {
            expected, actual, ..
        } => {
            assert_eq!(expected, 3);
            assert_eq!(actual, DIM_OBS);
        }
        e => panic!("unexpected error: {}", e),
    }

    let config = create_agent_config().critic_config(
        create_agent_config()
            .critic_config
            .q_config(MlpConfig::new(DIM_OBS as _, vec![8], 1, false)),
    );
    assert!(matches!(
        build_err(config),
        DrsacError::DimensionMismatch { .. }
    ));

    let config = create_agent_config().discount_factor(1.5);
    assert!(matches!(build_err(config), DrsacError::InvalidConfig(_)));

    let config = create_agent_config().batch_size(0);
    assert!(matches!(build_err(config), DrsacError::InvalidConfig(_)));
}

#[test]
fn test_empty_buffer() -> Result<()> {
    let mut agent = trained_agent()?;
    let mut buffer = SimpleReplayBuffer::build(&create_replay_buffer_config(0))?;
    let err = agent.opt(&mut buffer).err().map(|e| e.downcast::<DrsacError>());
    assert!(matches!(err, Some(Ok(DrsacError::EmptyReplayBuffer))));
    Ok(())
}

#[test]
fn test_trainer_saves_models() -> Result<()> {
    init_logger();

    let dir = TempDir::new("sac_trainer")?;
    let config = TrainerConfig::default()
        .max_env_steps(200)
        .warmup_period(BATCH_SIZE)
        .opt_interval(10)
        .eval_interval(50)
        .save_interval(100)
        .model_dir(dir.path().to_string_lossy());
    let mut trainer = Trainer::<ToyEnv, SimpleReplayBuffer>::build(
        config,
        ToyEnvConfig::default(),
        create_replay_buffer_config(0),
    )?;
    let mut agent = Agent::build(create_agent_config())?;
    let mut evaluator = DefaultEvaluator::<ToyEnv>::new(&ToyEnvConfig::default(), 100, 2)?;
    trainer.train(&mut agent, &mut NullRecorder::new(), &mut evaluator)?;

    for sub in ["best", "100", "200"].iter() {
        assert!(dir.path().join(sub).join("actor.pt").exists(), "{}", sub);
        assert!(dir.path().join(sub).join("critic.pt").exists(), "{}", sub);
    }

    // The best model can be loaded into a fresh agent
    let mut agent2 = Agent::build(create_agent_config())?;
    agent2.load_params(&dir.path().join("best"))?;
    Ok(())
}
