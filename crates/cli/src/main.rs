use anyhow::{Context, Result, anyhow};
use batch::{MeasureRunner, PatientOutcome, ProviderFilter, RunReport};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::Colorize;
use measures::{JsonLinesEmitter, Measure, MeasureCatalogue};
use records::PatientIndex;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// popmeasure - population-health quality measure engine
#[derive(Parser)]
#[command(name = "popmeasure")]
#[command(about = "Evaluate quality measures over patient records and emit per-provider flags", long_about = None)]
struct Cli {
    /// Path to the TOML measure catalogue
    #[arg(short, long, default_value = "measures.toml")]
    measures: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate measures over every patient and write emissions as JSON Lines
    Evaluate {
        /// Patient file, one JSON document per line
        #[arg(short, long)]
        patients: PathBuf,

        /// Evaluation date (YYYY-MM-DD); defaults to today
        #[arg(long)]
        as_of: Option<NaiveDate>,

        /// Only run these measure ids (repeatable)
        #[arg(long = "measure")]
        measure_ids: Vec<String>,

        /// Write emissions here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print every data-quality warning after the run
        #[arg(long)]
        show_warnings: bool,
    },

    /// Check the measure catalogue (and optionally a patient file) without evaluating
    Validate {
        /// Patient file to check as well
        #[arg(short, long)]
        patients: Option<PathBuf>,
    },

    /// Explain how one patient fares on each measure
    Patient {
        #[arg(short, long)]
        patients: PathBuf,

        /// Patient id
        #[arg(long)]
        id: String,

        #[arg(long)]
        as_of: Option<NaiveDate>,

        #[arg(long = "measure")]
        measure_ids: Vec<String>,
    },

    /// List the measures in the catalogue
    Measures,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let catalogue = MeasureCatalogue::load_from_file(&cli.measures)
        .with_context(|| format!("Failed to load measure catalogue {}", cli.measures.display()))?;

    // Dispatch to appropriate command handler
    match cli.command {
        Commands::Evaluate {
            patients,
            as_of,
            measure_ids,
            output,
            show_warnings,
        } => handle_evaluate(&catalogue, &patients, as_of, &measure_ids, output, show_warnings).await?,
        Commands::Validate { patients } => handle_validate(&catalogue, patients.as_deref())?,
        Commands::Patient {
            patients,
            id,
            as_of,
            measure_ids,
        } => handle_patient(&catalogue, &patients, &id, as_of, &measure_ids)?,
        Commands::Measures => handle_measures(&catalogue),
    }

    Ok(())
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

fn load_patients(path: &Path) -> Result<Arc<PatientIndex>> {
    eprintln!("Loading patients from {}...", path.display());
    let start = Instant::now();
    let index = PatientIndex::load_from_file(path)
        .with_context(|| format!("Failed to load patients from {}", path.display()))?;
    let (patients, entries, rejected) = index.counts();
    eprintln!(
        "{} Loaded {} patients ({} entries) in {:?}",
        "✓".green(),
        patients,
        entries,
        start.elapsed()
    );
    if rejected > 0 {
        eprintln!("{} {} lines rejected", "!".yellow(), rejected);
    }
    Ok(Arc::new(index))
}

fn build_runner(catalogue: &MeasureCatalogue, patients: Arc<PatientIndex>, as_of: Option<NaiveDate>) -> MeasureRunner {
    let provider_filter = ProviderFilter::new(catalogue.provider_groups().clone());
    MeasureRunner::new(patients, provider_filter, as_of.unwrap_or_else(today))
}

/// Handle the 'evaluate' command
async fn handle_evaluate(
    catalogue: &MeasureCatalogue,
    patients_path: &Path,
    as_of: Option<NaiveDate>,
    measure_ids: &[String],
    output: Option<PathBuf>,
    show_warnings: bool,
) -> Result<()> {
    let measures = catalogue.select(measure_ids)?;
    let patients = load_patients(patients_path)?;
    let runner = build_runner(catalogue, patients, as_of);

    let writer: Box<dyn Write> = match &output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let mut emitter = JsonLinesEmitter::new(writer);

    let report = runner.run(&measures, &mut emitter).await?;
    emitter.flush().context("Failed to flush emissions")?;
    report.log_summary();

    print_report(&report, show_warnings);
    if let Some(path) = output {
        eprintln!("{} Wrote {} emissions to {}", "✓".green(), emitter.written(), path.display());
    }
    Ok(())
}

/// Handle the 'validate' command
fn handle_validate(catalogue: &MeasureCatalogue, patients_path: Option<&Path>) -> Result<()> {
    let criteria: usize = catalogue.measures().iter().map(|m| m.criteria.len()).sum();
    eprintln!(
        "{} Catalogue OK: {} measures, {} criteria, {} provider groups",
        "✓".green(),
        catalogue.len(),
        criteria,
        catalogue.provider_groups().len()
    );

    if let Some(path) = patients_path {
        let index = load_patients(path)?;
        for rejected in index.rejected().iter().take(20) {
            eprintln!("  line {}: {}", rejected.line, rejected.error);
        }
        let missing_provider = index
            .patients()
            .iter()
            .filter(|p| p.require_provider().is_err())
            .count();
        if missing_provider > 0 {
            eprintln!(
                "{} {} patients have no primary care provider and will fail every measure",
                "!".yellow(),
                missing_provider
            );
        }
    }
    Ok(())
}

/// Handle the 'patient' command
fn handle_patient(
    catalogue: &MeasureCatalogue,
    patients_path: &Path,
    patient_id: &str,
    as_of: Option<NaiveDate>,
    measure_ids: &[String],
) -> Result<()> {
    let measures = catalogue.select(measure_ids)?;
    let patients = load_patients(patients_path)?;
    let patient = patients
        .get_patient(patient_id)
        .ok_or_else(|| anyhow!("Patient {} not found", patient_id))?
        .clone();
    let runner = build_runner(catalogue, patients, as_of);

    println!("{}", format!("Patient {}", patient.id).bold().blue());
    println!(
        "{}Provider: {}",
        "• ".green(),
        patient.provider_id.as_deref().unwrap_or("<none>")
    );
    println!(
        "{}Birthdate: {}",
        "• ".green(),
        patient
            .birthdate
            .map(|d| d.to_string())
            .unwrap_or_else(|| "<unknown>".to_string())
    );
    println!("{}Entries: {}", "• ".green(), patient.entry_count());

    for (measure, outcome) in runner.evaluate_one(patient_id, &measures)? {
        print_outcome(&measure, &outcome);
    }
    Ok(())
}

/// Handle the 'measures' command
fn handle_measures(catalogue: &MeasureCatalogue) {
    println!("{}", "Measures:".bold().blue());
    for measure in catalogue.measures() {
        println!("{} {}", measure.id.green(), measure.display_title());
        if let Some(age) = measure.age {
            println!("    age {}", age);
        }
        if let Some(group) = &measure.provider_group {
            println!("    providers in {}", group);
        }
        println!("    emits {} ({} boundaries)", measure.emit_as, measure.boundary);
        for criterion in &measure.criteria {
            println!(
                "    - {} [{}{}]: {}",
                criterion.name,
                criterion.category,
                if criterion.active { ", active" } else { "" },
                criterion.criterion
            );
        }
    }
}

fn print_outcome(measure: &Measure, outcome: &PatientOutcome) {
    let flag = |b: bool| if b { "yes".green() } else { "no".red() };
    match outcome {
        PatientOutcome::Evaluated(evaluation) => {
            let result = &evaluation.result;
            println!(
                "{} (as of {}): denominator {}, numerator {}",
                measure.id.bold(),
                result.evaluated_on,
                flag(result.in_denominator),
                flag(result.in_numerator)
            );
            for warning in &evaluation.warnings {
                println!("    {} {}", "!".yellow(), warning);
            }
        }
        PatientOutcome::Excluded { provider, .. } => {
            println!(
                "{}: provider {} is not in {}",
                measure.id.bold(),
                provider,
                measure.provider_group.as_deref().unwrap_or("<none>")
            );
        }
        PatientOutcome::Failed(error) => {
            println!("{}: {} {}", measure.id.bold(), "failed:".red(), error);
        }
    }
}

/// Helper function to print the run summary to stderr
fn print_report(report: &RunReport, show_warnings: bool) {
    eprintln!("{}", "Run summary:".bold().blue());
    for summary in &report.measures {
        eprintln!(
            "{} {}: {} evaluated, {} excluded, {} failed, {} warnings",
            "•".green(),
            summary.measure_id,
            summary.evaluated,
            summary.excluded,
            summary.failed,
            summary.warnings
        );
    }
    for failure in report.failures.iter().take(20) {
        eprintln!("  {} {} {}: {}", "✗".red(), failure.measure_id, failure.patient_id, failure.reason);
    }
    if report.failures.len() > 20 {
        eprintln!("  ... and {} more failures", report.failures.len() - 20);
    }
    if show_warnings {
        for warning in &report.warnings {
            eprintln!(
                "  {} {} {}: {}",
                "!".yellow(),
                warning.measure_id,
                warning.patient_id,
                warning.warning
            );
        }
    }
}
