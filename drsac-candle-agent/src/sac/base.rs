use super::{EntCoef, GaussianActor, SacConfig, TwinCritic};
use crate::{
    lr_schedule::LrSchedule,
    model::{SubModel1, SubModel2},
    robust::RobustBackup,
    util::check_finite,
    TensorBatch,
};
use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use drsac_core::{
    record::{Record, RecordValue},
    Agent, Configurable, Policy, ReplayBufferBase, TransitionBatch,
};
use log::{info, trace};
use std::{
    collections::BTreeMap,
    fs,
    marker::PhantomData,
    path::{Path, PathBuf},
};

type ActMean = Tensor;
type ActLogStd = Tensor;

/// Soft actor critic (SAC) agent.
///
/// In the robust mode, a reward model and a dual optimizer produce the rewards
/// used in the Bellman target. See [`RobustBackup`].
///
/// An optimization step updates, in this order, the reward model and the dual
/// variable (robust mode only), the critics, the actor, the entropy
/// coefficient and the target networks.
pub struct Sac<Q, P, R>
where
    Q: SubModel2,
    P: SubModel1<Output = (ActMean, ActLogStd)>,
{
    critic: TwinCritic<Q>,
    actor: GaussianActor<P>,
    ent_coef: EntCoef,
    robust: Option<RobustBackup>,
    gamma: f64,
    n_updates_per_opt: usize,
    batch_size: usize,
    lr_schedule: LrSchedule,
    actor_lr: f64,
    critic_lr: f64,
    train: bool,
    n_opts: usize,
    device: Device,
    phantom: PhantomData<R>,
}

impl<Q, P, R> Sac<Q, P, R>
where
    Q: SubModel2,
    P: SubModel1<Output = (ActMean, ActLogStd)>,
    R: ReplayBufferBase,
    R::Batch: TransitionBatch,
{
    fn update(&mut self, batch: TensorBatch) -> Result<Record> {
        let TensorBatch {
            obs,
            act,
            next_obs,
            reward,
            not_done,
        } = batch;
        let mut record = Record::empty();

        // Reward in the Bellman target
        let reward = match self.robust.as_mut() {
            Some(robust) => {
                trace!("Robust reward");
                let (reward, record_robust) = robust.robust_reward(&obs, &act, &reward)?;
                record.merge_inplace(record_robust);
                reward
            }
            None => reward,
        };

        // Target
        let tgt = {
            let (next_act, next_log_p) = self.actor.forward(&next_obs, false, true)?;
            let next_log_p = next_log_p.ok_or_else(|| anyhow!("No log probability"))?;
            let next_q = self.critic.qvals_min_tgt(&next_obs, &next_act.detach())?;
            let alpha = self.ent_coef.alpha()?;
            let next_v = (next_q - alpha.broadcast_mul(&next_log_p.detach())?)?;
            (reward + ((not_done * self.gamma)? * next_v)?)?
        }
        .detach();
        debug_assert_eq!(tgt.dims(), [obs.dims()[0]]);
        let tgt_mean = tgt.mean_all()?.to_scalar::<f32>()?;

        // Critic
        trace!("Update critic");
        let loss_critic = self.critic.loss(&obs, &act, &tgt)?;
        let loss_critic_value = check_finite(&loss_critic, "loss_critic")?;
        self.critic.backward_step(&loss_critic)?;

        // Actor, through a frozen view of the critics
        trace!("Update actor");
        let (act_new, log_p) = self.actor.forward(&obs, false, true)?;
        let log_p = log_p.ok_or_else(|| anyhow!("No log probability"))?;
        let q = self.critic.qvals_min_frozen(&obs, &act_new)?;
        let alpha = self.ent_coef.alpha()?;
        let loss_actor = (alpha.broadcast_mul(&log_p)? - q)?.mean_all()?;
        let loss_actor_value = check_finite(&loss_actor, "loss_actor")?;
        self.actor.backward_step(&loss_actor)?;

        // Entropy coefficient
        self.ent_coef.update(&log_p.detach())?;

        // Target networks
        self.critic.soft_update()?;

        record.insert("loss_critic", RecordValue::Scalar(loss_critic_value));
        record.insert("loss_actor", RecordValue::Scalar(loss_actor_value));
        record.insert("target_mean", RecordValue::Scalar(tgt_mean));
        Ok(record)
    }

    fn apply_lr_schedule(&mut self) {
        self.actor
            .set_learning_rate(self.lr_schedule.lr(self.actor_lr, self.n_opts));
        self.critic
            .set_learning_rate(self.lr_schedule.lr(self.critic_lr, self.n_opts));
    }

    fn opt_(&mut self, buffer: &mut R) -> Result<Record> {
        let mut sums = BTreeMap::<String, f32>::new();

        for _ in 0..self.n_updates_per_opt {
            self.apply_lr_schedule();
            let batch = TensorBatch::from_batch(buffer.batch(self.batch_size)?, &self.device)?;
            let record = self.update(batch)?;
            for (k, v) in record.iter() {
                if let RecordValue::Scalar(v) = v {
                    *sums.entry(k.clone()).or_insert(0.0) += v;
                }
            }
            self.n_opts += 1;
        }

        let n = self.n_updates_per_opt as f32;
        let mut record = Record::empty();
        for (k, v) in sums.into_iter() {
            record.insert(k, RecordValue::Scalar(v / n));
        }
        record.insert("ent_coef", RecordValue::Scalar(self.ent_coef.alpha_scalar()?));

        Ok(record)
    }

    /// Returns an action in `[-1, 1]` for a single observation.
    pub fn select_action(&mut self, obs: &[f32], deterministic: bool) -> Result<Vec<f32>> {
        self.actor.select_action(obs, deterministic)
    }

    /// Number of parameter updates done so far.
    pub fn n_opts(&self) -> usize {
        self.n_opts
    }

    /// Returns `true` if the agent uses the robust reward backup.
    pub fn is_robust(&self) -> bool {
        self.robust.is_some()
    }

    /// Current learning rates of the actor and the critic.
    pub fn learning_rates(&self) -> (f64, f64) {
        (self.actor.learning_rate(), self.critic.learning_rate())
    }

    /// Current entropy coefficient.
    pub fn ent_coef(&self) -> Result<f32> {
        self.ent_coef.alpha_scalar()
    }

    fn paths(dir: &Path, tag: &str, step: usize) -> (PathBuf, PathBuf) {
        (
            dir.join(format!("{}_actor{}", tag, step)),
            dir.join(format!("{}_q_critic{}", tag, step)),
        )
    }

    /// Saves the parameters of the actor and the critic in `dir` with file names
    /// `{tag}_actor{step}.pt` and `{tag}_q_critic{step}.pt`.
    ///
    /// Target networks and optimizer states are not saved.
    pub fn save(&self, dir: impl AsRef<Path>, tag: &str, step: usize) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir.as_ref())?;
        let (actor_path, critic_path) = Self::paths(dir.as_ref(), tag, step);
        Ok(vec![
            self.actor.save(actor_path)?,
            self.critic.save(critic_path)?,
        ])
    }

    /// Loads the parameters saved with [`Sac::save`].
    ///
    /// The target networks are set to the loaded critic.
    pub fn load(&mut self, dir: impl AsRef<Path>, tag: &str, step: usize) -> Result<()> {
        let (actor_path, critic_path) = Self::paths(dir.as_ref(), tag, step);
        self.actor.load(actor_path)?;
        self.critic.load(critic_path)?;
        Ok(())
    }
}

impl<Q, P, R> Policy for Sac<Q, P, R>
where
    Q: SubModel2,
    P: SubModel1<Output = (ActMean, ActLogStd)>,
{
    /// Samples an action in the training mode, returns the deterministic
    /// action in the evaluation mode.
    fn sample(&mut self, obs: &[f32]) -> Result<Vec<f32>> {
        self.actor.select_action(obs, !self.train)
    }
}

impl<Q, P, R> Configurable for Sac<Q, P, R>
where
    Q: SubModel2,
    P: SubModel1<Output = (ActMean, ActLogStd)>,
{
    type Config = SacConfig<Q, P>;

    /// Constructs [`Sac`] agent.
    fn build(config: Self::Config) -> Result<Self> {
        config.check()?;
        let device = config.device.unwrap_or_default().build()?;
        let actor_lr = config.actor_config.opt_config.lr();
        let critic_lr = config.critic_config.opt_config.lr();
        let actor = GaussianActor::build(config.actor_config, device.clone(), config.seed)?;
        let critic = TwinCritic::build(config.critic_config, device.clone())?;
        let ent_coef = EntCoef::new(config.ent_coef_mode, config.action_dim, device.clone())?;
        let robust = match config.robust.as_ref() {
            Some(robust_config) => Some(RobustBackup::build(
                robust_config,
                config.state_dim + config.action_dim,
                config.batch_size,
                &device,
                config.seed.wrapping_add(1),
            )?),
            None => None,
        };
        info!(
            "Build SAC agent: state_dim = {}, action_dim = {}, robust = {}",
            config.state_dim,
            config.action_dim,
            robust.is_some()
        );

        Ok(Sac {
            critic,
            actor,
            ent_coef,
            robust,
            gamma: config.gamma,
            n_updates_per_opt: config.n_updates_per_opt,
            batch_size: config.batch_size,
            lr_schedule: config.lr_schedule,
            actor_lr,
            critic_lr,
            train: false,
            n_opts: 0,
            device,
            phantom: PhantomData,
        })
    }
}

impl<Q, P, R> Agent<R> for Sac<Q, P, R>
where
    Q: SubModel2,
    P: SubModel1<Output = (ActMean, ActLogStd)>,
    R: ReplayBufferBase,
    R::Batch: TransitionBatch,
{
    fn train(&mut self) {
        self.train = true;
    }

    fn eval(&mut self) {
        self.train = false;
    }

    fn is_train(&self) -> bool {
        self.train
    }

    fn opt_with_record(&mut self, buffer: &mut R) -> Result<Record> {
        self.opt_(buffer)
    }

    fn save_params(&self, path: &Path) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(path)?;
        let actor_path = self.actor.save(path.join("actor"))?;
        let critic_path = self.critic.save(path.join("critic"))?;
        Ok(vec![actor_path, critic_path])
    }

    fn load_params(&mut self, path: &Path) -> Result<()> {
        self.actor.load(path.join("actor"))?;
        self.critic.load(path.join("critic"))?;
        Ok(())
    }
}
