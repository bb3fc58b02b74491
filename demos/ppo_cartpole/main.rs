// PPO on CartPole: discrete actions, categorical policy
//
// RUST_LOG=debug shows every segment close and optimisation step.

use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    config::Config,
};
use ppo_rl::{
    algo::ppo::{PPOConfig, PPO},
    gym::GymEnv,
    traits::TrainableAgent,
};
use tracing_subscriber::EnvFilter;

type PPOBackend = Autodiff<NdArray>;

const NUM_EPOCHS: usize = 50;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let device = NdArrayDevice::default();

    // Hidden layers use ReLU, output layers are linear
    let config = PPOConfig::new()
        .with_hidden_layers(vec![64, 64])
        .with_max_episode_len(500)
        .with_seed(Some(0));
    config.save("ppo_cartpole.json")?;

    let mut agent = PPO::<PPOBackend, GymEnv>::from_env_id("CartPole-v1", config, &device)?;

    // Rolling window over the last 10 epochs
    let mut window_rewards = Vec::new();
    for _ in 0..NUM_EPOCHS {
        let metrics = agent.fit_epoch()?;

        window_rewards.push(metrics.avg_ep_reward);
        if window_rewards.len() > 10 {
            window_rewards.remove(0);
        }
        let avg_reward = window_rewards.iter().sum::<f32>() / window_rewards.len() as f32;

        println!(
            "epoch {:>3} | steps {:>6} | ep reward {:>7.2} (avg10 {:>7.2}) | ep len {:>6.1} | actor {:>7.4} | critic {:>8.3} | kl {:>7.4} | clip {:>5.3}",
            agent.epoch(),
            agent.total_steps(),
            metrics.avg_ep_reward,
            avg_reward,
            metrics.avg_ep_len,
            metrics.loss_actor,
            metrics.loss_critic,
            metrics.approx_kl,
            metrics.clip_fraction,
        );
    }

    println!("Training complete!");
    Ok(())
}
