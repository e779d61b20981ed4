use anyhow::{Context, Result};
use cambiar::analysis::{analyze_configurations, analyze_terms};
use cambiar::case_study::CaseStudy;
use cambiar::cli::Cli;
use cambiar::config::{AnalysisConfig, CaseStudyConfig};
use cambiar::crossval::{analyze_precision, analyze_recall, PrecisionReport, RecallReport};
use cambiar::influence::InfluenceModelTable;
use cambiar::report;
use cambiar::workload::{analyze_frequency, build_sensitivity_matrix};
use clap::Parser;
use std::fs;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let config = AnalysisConfig::from_path(&cli.config)?;
    fs::create_dir_all(&cli.output)
        .with_context(|| format!("Failed to create output directory: {}", cli.output.display()))?;

    for case_study_config in &config.case_studies {
        if let Some(filter) = &cli.case_study {
            if filter != &case_study_config.name {
                continue;
            }
        }
        println!("Analyzing {}...", case_study_config.name);
        run_case_study(&cli, &config, case_study_config)
            .with_context(|| format!("Case study {} failed", case_study_config.name))?;
    }
    Ok(())
}

/// Run both analysis levels and the cross-validation for one case study.
///
/// Accumulators are created fresh here, so nothing leaks between case
/// studies.
fn run_case_study(cli: &Cli, config: &AnalysisConfig, case_config: &CaseStudyConfig) -> Result<()> {
    let input_dir = cli.input.join(&case_config.name);
    let output_dir = cli.output.join(&case_config.name);
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    let case_study = CaseStudy::load(&input_dir, case_config)?;
    let models_path = CaseStudy::models_path(&input_dir);
    let models = InfluenceModelTable::from_path(&models_path).with_context(|| {
        format!(
            "Missing learned influence models at {} (run the learner first)",
            models_path.display()
        )
    })?;

    let configuration_level = analyze_configurations(&case_study);
    let term_level = analyze_terms(&case_study, &models)?;
    info!(
        "{}: {} configuration changes, {} term changes",
        case_study.name,
        configuration_level.changes.total_changes(),
        term_level.changes.total_changes()
    );

    // Change-set artifacts for downstream tooling
    configuration_level
        .changes
        .write_json(&output_dir.join("changed_configurations.json"))?;
    term_level
        .changes
        .write_json(&output_dir.join("changed_options.json"))?;

    // Markdown summaries
    fs::write(
        output_dir.join("identified_changes.md"),
        report::identified_changes(&term_level),
    )?;
    fs::write(
        output_dir.join("config_changes.md"),
        report::config_changes(&configuration_level.changes),
    )?;
    fs::write(
        output_dir.join("error_rates.md"),
        report::error_rates(&case_study.name, &term_level.error_rates),
    )?;
    fs::write(
        output_dir.join("term_change_frequency.md"),
        report::change_frequency(&term_level.counters, "Terms [%]"),
    )?;
    fs::write(
        output_dir.join("configuration_change_frequency.md"),
        report::change_frequency(&configuration_level.counters, "Configurations"),
    )?;

    let matrix = build_sensitivity_matrix(&configuration_level, &case_study.workloads);
    fs::write(output_dir.join("clustering.csv"), matrix.to_csv())?;
    if !case_config.reference_workloads.is_empty() {
        if let Some((found, all)) = matrix.coverage(&case_config.reference_workloads) {
            println!(
                "Found changes by reference workloads: {} out of {} ({:.2}%)",
                found,
                all,
                found as f64 / all as f64 * 100.0
            );
        }
    }

    if let Some(frequency) = analyze_frequency(&configuration_level) {
        println!(
            "Average probability of picking a workload that identifies performance changes: {:.2}%",
            frequency.average_probability
        );
    }

    if !cli.skip_cross_validation {
        let precision = analyze_precision(
            &case_study,
            &term_level.changes,
            &configuration_level.changes,
            &models,
            &config.thresholds,
        );
        print_precision(&precision);

        let recall = analyze_recall(
            &case_study,
            &term_level.changes,
            &configuration_level.changes,
            &models,
            &config.thresholds,
        )?;
        print_recall(&recall);
    }
    Ok(())
}

fn print_precision(report: &PrecisionReport) {
    println!("Number of term changes: {}", report.total_changes);
    println!("Precision: {:.2}%", report.precision());
    println!(
        "Affected by different metric: {:.2}%",
        report.metric_change_share()
    );
    println!(
        "Affected by configuration space change: {:.2}%",
        report.configuration_space_change_share()
    );
    println!(
        "Affected by model with high error: {:.2}%",
        report.high_model_error_share()
    );
    println!(
        "Indicating low performance: {:.2}%",
        report.low_performance_share()
    );
    println!(
        "Precision with direction: {:.2}%",
        report.precision_with_direction()
    );
}

fn print_recall(report: &RecallReport) {
    println!(
        "Total number of configuration-level changes: {}",
        report.total_changes
    );
    println!("Recall: {:.2}%", report.recall());
    println!(
        "Affected by hidden coefficient swing: {:.2}%",
        report.coefficient_swing_share()
    );
    println!(
        "Affected by high error: {:.2}%",
        report.high_model_error_share()
    );
    println!("Recall with direction: {:.2}%", report.recall_with_direction());
}
