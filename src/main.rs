use anyhow::{bail, ensure, Context, Result};
use clap::Parser;
use rayon::ThreadPoolBuilder;
use tracing::info;
use tracing_subscriber::EnvFilter;

use plant_disease_rs::{
    report, Classifier, Config, FileOutcome, InputLayout, OrtBackend,
};

fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level())),
        )
        .with_writer(std::io::stderr)
        .init();

    ensure!(
        config.model_dir.is_dir(),
        "Model directory does not exist: {}",
        config.model_dir.display()
    );

    ensure!(
        config.max_sessions > 0,
        "--max-sessions must be at least 1, got {}",
        config.max_sessions
    );

    let variant = config.variant().context("Failed to load model variant")?;
    info!(
        artifact = variant.artifact(),
        classes = variant.expected_class_count(),
        "using model variant"
    );

    let backend = OrtBackend::new(&config.model_dir, config.device_id, config.max_sessions)?;
    let classifier = Classifier::new(backend, variant).with_progress(!config.json);

    if classifier.variant().input() == InputLayout::Scalar {
        let predictions = classifier
            .probe_scalar(config.value)
            .context("Scalar inference failed")?;
        print!("{}", report::render_text(&predictions));
        return Ok(());
    }

    let Some(input) = config.input.as_deref() else {
        bail!("An input image or directory is required for the {:?} variant", config.variant);
    };

    ThreadPoolBuilder::new()
        .num_threads(config.num_threads)
        .build_global()?;

    let outcomes = if input.is_dir() {
        classifier.classify_directory(input)?
    } else {
        ensure!(input.exists(), "Input does not exist: {}", input.display());
        let predictions = classifier
            .classify_file(input)
            .with_context(|| format!("Failed to classify image: {}", input.display()))?;
        match predictions {
            Some(predictions) => vec![FileOutcome::Classified {
                path: input.to_path_buf(),
                predictions,
            }],
            None => bail!("No readable image at {}", input.display()),
        }
    };

    let outcomes: Vec<FileOutcome> = outcomes
        .into_iter()
        .map(|outcome| outcome.truncated(config.top_k))
        .collect();

    if config.json {
        println!("{}", report::render_json(&outcomes)?);
    } else {
        print!("{}", report::render_outcomes_text(&outcomes));
    }

    Ok(())
}
