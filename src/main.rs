use clap::Parser;
use ndarray::array;
use ndarray_rand::rand::{Rng, SeedableRng, rngs::StdRng};
use sigmoid_sgd::{AcceptancePredicate, Network, SgdConfig, TrainingExample};
use std::{env, path::PathBuf, process::ExitCode};
use tracing::{error, info};
use tracing_subscriber::filter::EnvFilter;

/// Train a sigmoid network on the XOR function and report how many of the four cases it gets
/// within 0.1 of the right answer.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Layer sizes, input first. The input layer must have 2 neurons and the output layer 1.
    #[arg(long, value_delimiter = ',', default_value = "2,3,1")]
    sizes: Vec<usize>,

    /// Learning rate.
    #[arg(long, default_value_t = 3.0)]
    eta: f64,

    /// Examples per mini-batch.
    #[arg(long, default_value_t = 3)]
    batch_size: usize,

    /// Number of randomly drawn training examples per pass.
    #[arg(long, default_value_t = 10_000)]
    samples: usize,

    /// Number of passes over freshly drawn training data.
    #[arg(long, default_value_t = 1)]
    passes: usize,

    /// Seed for weight initialization and sampling.
    #[arg(long)]
    seed: Option<u64>,

    /// Write the trained parameters here (gzip-compressed if it ends in .gz).
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    if env::var("RUST_LOG").is_err() {
        // SAFETY: nothing else is running yet, so no other thread can be reading the environment.
        unsafe { env::set_var("RUST_LOG", "info") };
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> sigmoid_sgd::Result<()> {
    let seed = args.seed.unwrap_or_else(|| ndarray_rand::rand::thread_rng().r#gen());
    info!(seed, "seeding random number generator");
    let mut rng = StdRng::seed_from_u64(seed);

    let config = SgdConfig::new(args.eta, args.batch_size)?;
    let mut network = Network::new(args.sizes, &mut rng)?;

    let test_data: Vec<_> = (0..4)
        .map(|i| {
            let (x, y) = (i / 2, i % 2);
            TrainingExample::new(array![[x as f64, y as f64]], array![[(x ^ y) as f64]])
        })
        .collect();
    let within_tenth = |output: &ndarray::Array2<f64>, desired: &ndarray::Array2<f64>| {
        (output[[0, 0]] - desired[[0, 0]]).abs() < 0.1
    };

    for pass in 0..args.passes {
        let training_data: Vec<_> = (0..args.samples)
            .map(|_| {
                let (x, y) = (rng.gen_range(0..2u8), rng.gen_range(0..2u8));
                TrainingExample::new(array![[x as f64, y as f64]], array![[(x ^ y) as f64]])
            })
            .collect();

        let test: (&[TrainingExample], &dyn AcceptancePredicate) = (&test_data, &within_tenth);
        if let Some(evaluation) =
            network.stochastic_gradient_descent(&training_data, &config, Some(test))?
        {
            info!(pass, %evaluation, cost = network.total_cost(&test_data)?, "pass complete");
        }
    }

    if let Some(path) = args.output {
        network.save(path)?;
    }

    Ok(())
}
