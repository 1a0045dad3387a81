use anyhow::{anyhow, Result};
use clap::{arg, ArgMatches, Command};
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use sgld_algorithms::Sgld;
use sgld_nn::{
    Dataset, EpochPolicy, GpSampler, LearningRateSchedule, Network, Trainer, UncertaintyEstimate,
};
use sgld_structs::{
    config::TrainingSettings,
    report::{EstimateRecord, EvaluationReport, RunReport, TrainingData},
};
use sgld_utils::{dejsonify, jsonify, linspace, seed_for};
use std::{fs, path::PathBuf};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("sgld-runtime")
        .about("Trains SGLD ensembles and reports predictive uncertainty")
        .arg_required_else_help(true)
        .subcommand(
            Command::new("train")
                .about("Trains one chain per batch count and emits a JSON report")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                )
                .arg(
                    arg!(--output [OUTPUT] "If set, the report is written to this path")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(
            Command::new("generate_data")
                .about("Samples the synthetic training set and prints it as JSON")
                .arg(
                    arg!(<SETTINGS> "Settings json string or path to json file")
                        .value_parser(clap::value_parser!(String)),
                ),
        )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = cli().get_matches();

    if let Err(e) = match matches.subcommand() {
        Some(("train", sub_m)) => train(
            settings_arg(sub_m),
            sub_m.get_one::<PathBuf>("output").cloned(),
        ),
        Some(("generate_data", sub_m)) => generate_data(settings_arg(sub_m)),
        _ => Err(anyhow!("Invalid subcommand")),
    } {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn settings_arg(sub_m: &ArgMatches) -> String {
    sub_m.get_one::<String>("SETTINGS").unwrap().clone()
}

pub fn train(settings: String, output_file: Option<PathBuf>) -> Result<()> {
    let settings = load_settings(&settings)?;
    let dataset = sample_dataset(&settings)?;
    let query_points = linspace(
        settings.query_grid.start,
        settings.query_grid.end,
        settings.query_grid.num_points,
    );

    let mut reports = Vec::with_capacity(settings.num_batches.len());
    for &num_batches in &settings.num_batches {
        info!("Using {} batches", num_batches);
        reports.push(run_chain(&settings, &dataset, &query_points, num_batches)?);
    }

    let report = jsonify(&reports);
    if let Some(path) = output_file {
        fs::write(&path, report)?;
        println!("report written to: {:?}", path);
    } else {
        println!("{}", report);
    }
    Ok(())
}

pub fn generate_data(settings: String) -> Result<()> {
    let settings = load_settings(&settings)?;
    let dataset = sample_dataset(&settings)?;
    println!(
        "{}",
        jsonify(&TrainingData {
            x: dataset.xs(),
            y: dataset.ys(),
        })
    );
    Ok(())
}

fn run_chain(
    settings: &TrainingSettings,
    dataset: &Dataset,
    query_points: &[f32],
    num_batches: usize,
) -> Result<RunReport> {
    let mut rng = StdRng::from_seed(seed_for(
        &settings.seed,
        format!("chain/{}", num_batches).as_str(),
    ));
    let batches = dataset.batches(num_batches)?;
    let batches_per_epoch = batches.len();
    let num_epochs = settings.epochs()?;

    let policy = EpochPolicy {
        num_epochs,
        burnin_epochs: settings.burnin_epochs,
        mix_epochs: settings.mix_epochs,
        record_period: settings.record_period,
        eval_period: settings.eval_period,
    };
    if policy.expected_snapshots() < 2 {
        return Err(anyhow!(
            "{} epochs with burn-in {} and mixing interval {} collect {} snapshot(s), at least 2 are required",
            num_epochs,
            settings.burnin_epochs,
            settings.mix_epochs,
            policy.expected_snapshots()
        ));
    }
    let num_steps = num_epochs
        .checked_mul(batches_per_epoch)
        .ok_or_else(|| anyhow!("{} epochs of {} batches overflow", num_epochs, batches_per_epoch))?;
    let schedule = LearningRateSchedule::linear(
        settings.learning_rate.start,
        settings.learning_rate.end,
        num_steps,
    )?;
    let network = Network::new(
        dataset.input_dim(),
        dataset.output_dim(),
        settings.num_units,
        settings.init_log_noise,
        &mut rng,
    )?;

    let outcome = Trainer::new(
        network,
        Sgld::new(settings.weight_decay),
        schedule,
        policy,
        batches,
    )?
    .with_query_points(query_points.to_vec())
    .run(&mut rng)?;

    let final_estimates = outcome.ensemble.evaluate(query_points)?;
    info!(
        "Finished {} batches: {} snapshots, noise scale {:.4}",
        num_batches,
        outcome.ensemble.len(),
        outcome.network.noise_scale()
    );

    Ok(RunReport {
        num_batches,
        batch_size: dataset.len() / num_batches,
        batches_per_epoch,
        num_epochs,
        num_steps: outcome.num_steps,
        num_snapshots: outcome.ensemble.len(),
        final_log_noise: outcome.network.log_noise(),
        record_period: settings.record_period,
        epoch_losses: outcome.epoch_losses,
        batch_losses: outcome.batch_losses,
        evaluations: outcome
            .evaluations
            .iter()
            .map(|record| EvaluationReport {
                epoch: record.epoch,
                num_snapshots: record.num_snapshots,
                estimates: to_records(query_points, &record.estimates),
            })
            .collect(),
        final_estimates: to_records(query_points, &final_estimates),
    })
}

fn sample_dataset(settings: &TrainingSettings) -> Result<Dataset> {
    let data = &settings.data;
    let sampler = GpSampler {
        num_points: data.num_points,
        x_range: data.x_range,
        lengthscale: data.lengthscale,
        variance: data.variance,
        noise_std: data.noise_std,
        margin: data.margin,
    };
    let mut rng = StdRng::from_seed(seed_for(&settings.seed, "data"));
    let dataset = sampler.sample(&mut rng)?;
    info!("Sampled {} training points", dataset.len());
    Ok(dataset)
}

fn to_records(query_points: &[f32], estimates: &[UncertaintyEstimate]) -> Vec<EstimateRecord> {
    query_points
        .iter()
        .zip(estimates)
        .map(|(x, estimate)| EstimateRecord {
            x: *x,
            mean: estimate.mean,
            aleatoric: estimate.aleatoric,
            epistemic: estimate.epistemic,
            total: estimate.total,
        })
        .collect()
}

fn load_settings(settings: &str) -> Result<TrainingSettings> {
    let settings = if settings.ends_with(".json") {
        fs::read_to_string(settings)
            .map_err(|e| anyhow!("Failed to read settings file {}: {}", settings, e))?
    } else {
        settings.to_string()
    };

    let settings = dejsonify::<TrainingSettings>(&settings)
        .map_err(|e| anyhow!("Failed to parse settings: {}", e))?;
    settings.validate()?;
    Ok(settings)
}
