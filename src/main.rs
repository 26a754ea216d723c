//! elyte: Electrolyte Conductivity CLI Tool
//!
//! Runs the feature-selection and multi-model evaluation pipeline on a
//! dataset of electrolyte formulations and writes a JSON report.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use tracing_subscriber::EnvFilter;

use elyte::cli::{confirm_overwrite, resolve_config, Cli, Commands, ConfigOverrides};
use elyte::models::BackendKind;
use elyte::pipeline::{
    clean_table, evaluate_backends, extract_importance, fit_backend, load_dataset,
    load_dataset_with_stats, prepare_data, rank_by_correlation, recommend, select_features,
    PartitionedData, PipelineConfig, Ranking, TrainTestSplit,
};
use elyte::report::{
    display_comparison_table, display_ranking, display_recommendation, display_selected_features,
    display_warnings, export_run_report, AttributionEntry, RecommendationOutcome, ReportContext,
    ReportMetadata, RunReport, StageTimings, TimingInfo,
};
use elyte::utils::{
    create_spinner, finish_with_success, finish_with_warning, print_banner, print_completion,
    print_config, print_count, print_info, print_step_header, print_step_time, print_success,
    print_warning, RunSettings,
};

/// Rows shown in the correlation table
const CORRELATION_DISPLAY_ROWS: usize = 20;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Some(command) = &cli.command {
        return match command {
            Commands::Recommend {
                input,
                target,
                quantile,
                config,
                infer_schema_length,
            } => {
                let overrides = ConfigOverrides {
                    target: target.clone(),
                    quantile: *quantile,
                    ..Default::default()
                };
                let config = resolve_config(config.as_deref(), &overrides)?;
                run_recommend(input, &config, *infer_schema_length)
            }
            Commands::Config { output } => run_print_config(output.as_deref()),
        };
    }

    let input = cli.input.as_ref().ok_or_else(|| {
        anyhow::anyhow!("Input file is required. Use -i/--input to specify a file.")
    })?;
    let output_path = cli
        .output_path()
        .ok_or_else(|| anyhow::anyhow!("Could not derive a report path from the input"))?;
    let config = resolve_config(cli.config.as_deref(), &cli.overrides())?;

    if !confirm_overwrite(&output_path, cli.no_confirm)? {
        println!("Cancelled by user.");
        return Ok(());
    }

    run_pipeline(input, &output_path, &config, cli.infer_schema_length)
}

/// Stderr logging; `-v` turns on debug events from this crate
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_directives(verbose)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Default filter when `RUST_LOG` is unset
fn log_directives(verbose: bool) -> &'static str {
    if verbose {
        "warn,elyte=debug"
    } else {
        "warn"
    }
}

fn run_pipeline(
    input: &Path,
    output_path: &Path,
    config: &PipelineConfig,
    infer_schema_length: usize,
) -> Result<()> {
    let seed = config.split.seed;
    let top_k = config.selection.top_k;
    let mut timings = StageTimings::default();

    print_banner(env!("CARGO_PKG_VERSION"));
    print_config(&RunSettings {
        input,
        target: &config.data.target,
        output: output_path,
        seed,
        test_fraction: config.split.test_fraction,
        top_k,
        quantile: config.recommendation.quantile,
    });

    // Load
    let step_start = Instant::now();
    let spinner = create_spinner("Loading dataset...");
    let (df, rows, cols, memory_mb) = load_dataset_with_stats(input, infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    println!("\n    {} Dataset Statistics:", style("✧").cyan());
    println!("      Rows: {}", rows);
    println!("      Columns: {}", cols);
    println!("      Estimated memory: {:.2} MB", memory_mb);
    timings.load = step_start.elapsed();
    print_step_time(timings.load);

    // Step 1: Preprocessing
    print_step_header(1, "Preprocessing");
    let step_start = Instant::now();
    let prepared = prepare_data(&df, &config.data).context("Preprocessing failed")?;
    print_count(
        "model feature(s)",
        prepared.features.ncols(),
        Some(&format!(
            "({} numeric, {} categorical column(s) one-hot encoded)",
            prepared.encoder.numeric.len(),
            prepared.encoder.categorical.len()
        )),
    );
    print_info(&format!(
        "{} usable row(s), target transformed with log1p",
        prepared.features.nrows()
    ));
    display_warnings(&prepared.warnings);

    let split = TrainTestSplit::new(prepared.features.nrows(), config.split.test_fraction, seed)
        .context("Train/test split failed")?;
    let data = PartitionedData::new(&prepared.features, &prepared.log_target, &split);
    print_success(&format!(
        "Split {} train / {} test rows (seed {})",
        split.train.len(),
        split.test.len(),
        seed
    ));
    timings.preprocess = step_start.elapsed();
    print_step_time(timings.preprocess);

    // Step 2: Correlation ranking
    print_step_header(2, "Correlation Ranking");
    let step_start = Instant::now();
    let spinner = create_spinner("Calculating correlations...");
    let correlation =
        rank_by_correlation(&prepared.unimputed_features, &prepared.log_target)?;
    finish_with_success(&spinner, "Correlation ranking complete");
    display_ranking(
        "CORRELATION WITH log(1 + k)",
        &correlation,
        CORRELATION_DISPLAY_ROWS,
        "Pearson r",
    );
    timings.correlation = step_start.elapsed();
    print_step_time(timings.correlation);

    // Step 3: Attribution ranking per tree backend
    print_step_header(3, "Feature Attribution");
    let step_start = Instant::now();
    let mut attribution = Vec::new();
    for kind in BackendKind::ALL
        .into_iter()
        .filter(|k| k.supports_attribution())
    {
        let spinner = create_spinner(&format!("Fitting {} and computing SHAP values...", kind));
        let backend = fit_backend(kind, &data, &config.models, seed)
            .with_context(|| format!("Failed to fit {}", kind))?;
        let ranking = extract_importance(backend.as_ref(), &data.x_test)?;
        let split_importance = backend
            .attribution()
            .map(|a| a.split_importances())
            .transpose()?
            .unwrap_or_default();
        finish_with_success(&spinner, &format!("{} attribution complete", kind));

        display_ranking(
            &format!("{} MEAN |SHAP| (test set)", kind.label().to_uppercase()),
            &ranking,
            top_k,
            "mean |SHAP|",
        );
        attribution.push(AttributionEntry {
            backend: kind,
            ranking,
            split_importance,
        });
    }
    timings.importance = step_start.elapsed();
    print_step_time(timings.importance);

    // Step 4: Selection
    print_step_header(4, "Feature Selection");
    let rankings: Vec<&Ranking> = std::iter::once(&correlation)
        .chain(attribution.iter().map(|a| &a.ranking))
        .collect();
    let selected = select_features(&rankings, top_k, &prepared.features);
    display_selected_features(&selected, prepared.features.ncols());

    // Step 5: Evaluation
    print_step_header(5, "Model Evaluation");
    let step_start = Instant::now();
    let spinner = create_spinner("Training 3 backends on full and selected features...");
    let comparison = evaluate_backends(&data, &selected, &config.models, seed)
        .context("Model evaluation failed")?;
    finish_with_success(&spinner, "Evaluation complete");
    display_comparison_table(&comparison);
    timings.evaluation = step_start.elapsed();
    print_step_time(timings.evaluation);

    // Step 6: Recommendation
    print_step_header(6, "Recommendation");
    let step_start = Instant::now();
    let outcome = RecommendationOutcome::from_result(recommend(
        &prepared.clean,
        &config.recommendation,
    ))?;
    show_recommendation(&outcome);
    timings.recommendation = step_start.elapsed();
    print_step_time(timings.recommendation);

    // Report
    let step_start = Instant::now();
    let report = RunReport {
        metadata: ReportMetadata::new(&ReportContext {
            input_file: input,
            output_file: output_path,
            rows: prepared.features.nrows(),
            features: prepared.features.ncols(),
            train_rows: split.train.len(),
            test_rows: split.test.len(),
            settings: config,
        }),
        warnings: prepared.warnings.clone(),
        correlation,
        attribution,
        selected_features: selected,
        comparison,
        recommendation: outcome,
        timing: TimingInfo::from(&timings),
    };
    export_run_report(&report, output_path)?;
    timings.save = step_start.elapsed();
    print_success(&format!("Report saved to {}", output_path.display()));

    timings.display();
    print_completion();
    Ok(())
}

fn show_recommendation(outcome: &RecommendationOutcome) {
    match outcome {
        RecommendationOutcome::Available(rec) => display_recommendation(rec),
        RecommendationOutcome::Unavailable { reason } => {
            print_warning("no recommendation available");
            print_info(reason);
        }
    }
}

fn run_recommend(input: &Path, config: &PipelineConfig, infer_schema_length: usize) -> Result<()> {
    let spinner = create_spinner("Loading dataset...");
    let df = load_dataset(input, infer_schema_length)?;
    finish_with_success(&spinner, "Dataset loaded");

    let clean = clean_table(&df, &config.data).context("Preprocessing failed")?;
    display_warnings(&clean.warnings);

    let spinner = create_spinner("Selecting top-conductivity samples...");
    let outcome = RecommendationOutcome::from_result(recommend(&clean, &config.recommendation))?;
    match &outcome {
        RecommendationOutcome::Available(_) => finish_with_success(&spinner, "Subset selected"),
        RecommendationOutcome::Unavailable { .. } => finish_with_warning(&spinner, "Subset empty"),
    }
    show_recommendation(&outcome);
    Ok(())
}

fn run_print_config(output: Option<&Path>) -> Result<()> {
    let json = PipelineConfig::default().to_json_pretty()?;
    match output {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("Failed to write config to {}", path.display()))?;
            print_success(&format!("Default configuration written to {}", path.display()));
        }
        None => println!("{}", json),
    }
    Ok(())
}
