// PPO on Pendulum: continuous torque, Gaussian policy with learned log_std

use burn::backend::{ndarray::NdArrayDevice, Autodiff, NdArray};
use ppo_rl::{
    algo::ppo::{PPOConfig, PPO},
    env::Environment,
    gym::Pendulum,
    traits::TrainableAgent,
};
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::EnvFilter;

type PPOBackend = Autodiff<NdArray>;

const NUM_EPOCHS: usize = 100;
const EVAL_STEPS: usize = 200;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let device = NdArrayDevice::default();

    // Pendulum never terminates: 200 steps per episode, 10 episodes per epoch
    let config = PPOConfig::new()
        .with_max_episode_len(200)
        .with_steps_per_epoch(2000)
        .with_batch_size(200)
        .with_nb_optim_iters(10)
        .with_gamma(0.9)
        .with_seed(Some(1));

    let mut agent = PPO::<PPOBackend, _>::new(Pendulum::with_seed(1), config, &device)?;

    println!("Starting PPO training on Pendulum environment...");
    let history = agent.fit(NUM_EPOCHS)?;
    if let Some(last) = history.last() {
        println!(
            "last epoch: ep reward {:.1}, entropy {:.3}",
            last.avg_ep_reward, last.entropy
        );
    }

    // Roll out the trained policy once, without gradient tracking
    let policy = agent.agent().valid();
    let mut env = Pendulum::with_seed(123);
    let mut rng = StdRng::seed_from_u64(123);
    let mut state = env.reset()?;
    let mut total_reward = 0.0;
    for _ in 0..EVAL_STEPS {
        let out = policy.act(&state, &mut rng)?;
        let step = env.step(&out.action)?;
        total_reward += step.reward;
        state = step.next_state;
    }
    println!("evaluation reward over {EVAL_STEPS} steps: {total_reward:.1}");

    Ok(())
}
