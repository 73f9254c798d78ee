mod cli;
mod error;
mod eval;
mod scoring;
mod steps;

use anyhow::{bail, Context, Result};
use clap::Parser;
use cli::{Args, Command, EvalConfig};
use eval::{load_ratings, read_json, EvalRunner, TitleScoreAccumulator};
use scoring::{score_documents, CaseScore};
use serde_json::{json, Value};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let _subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match args.command {
        Command::Score(score_args) => {
            score_case(score_args).await?;
        }
        Command::Run(run_args) => {
            run_evaluation(run_args).await?;
        }
        Command::Rate(rate_args) => {
            rate_protocol(rate_args).await?;
        }
        Command::Init(init_args) => {
            generate_sample_config(init_args)?;
        }
    }

    Ok(())
}

async fn score_case(args: cli::ScoreArgs) -> Result<()> {
    info!(
        "Scoring {:?} against benchmark {:?}",
        args.ai, args.benchmark
    );

    let benchmark = read_json(&args.benchmark).await?;
    let ai = read_json(&args.ai).await?;
    let score = score_documents(&benchmark, &ai, args.duplicate_steps)
        .context("Failed to score model output")?;

    print_score(&score, args.prune)?;

    if let Some(output) = args.output {
        let content = serde_json::to_string_pretty(&score)?;
        tokio::fs::write(&output, content)
            .await
            .context(format!("Failed to write {:?}", output))?;
        println!("\nResults saved to: {:?}", output);
    }

    Ok(())
}

fn print_score(score: &CaseScore, prune: bool) -> Result<()> {
    println!("{:>6}  {:<10} {:<18} {:<10} {:<18} {}", "Step", "Benchmark", "Class", "AI", "AI Class", "Identification");
    for row in score.steps.rows() {
        let show = |v: Option<String>| v.unwrap_or_else(|| steps::NOT_APPLICABLE.to_string());
        println!(
            "{:>6}  {:<10} {:<18} {:<10} {:<18} {} ({})",
            row.step.to_string(),
            show(row.benchmark.map(|b| b.to_string())),
            show(row.benchmark_class.map(|c| c.to_string())),
            show(row.ai_response.map(|a| a.to_string())),
            show(row.ai_class.map(|c| c.to_string())),
            row.identification,
            row.classification
        );
    }

    let summary = if prune {
        score.filtered.clone()
    } else {
        Value::Object(score.summary.to_map())
    };
    println!("\n{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

async fn rate_protocol(args: cli::RateArgs) -> Result<()> {
    info!("Averaging protocol ratings from {:?}", args.ratings);

    let (sections, summary) = load_ratings(&args.ratings).await?;

    println!("Rated sections: {}", sections.len());
    for (name, value) in summary.named() {
        println!("  {:<20} {:.2}", name, value);
    }

    if let Some(output) = args.output {
        let content = serde_json::to_string_pretty(&json!({
            "sections": sections,
            "summary": summary,
        }))?;
        tokio::fs::write(&output, content)
            .await
            .context(format!("Failed to write {:?}", output))?;
        println!("\nResults saved to: {:?}", output);
    }

    Ok(())
}

async fn run_evaluation(args: cli::RunArgs) -> Result<()> {
    info!("Loading evaluation config from {:?}", args.config);

    let config = EvalConfig::load(&args.config)?;

    if args.dry_run {
        println!("Dry run mode - nothing will be scored");
        println!("\nConfiguration:");
        println!("  Name: {}", config.name);
        println!("  Cases: {}", config.cases.len());
        println!("  Title cases: {}", config.title_cases.len());
        println!("  Rating runs: {}", config.rating_runs().len());
        println!("  Total replicate runs: {}", config.replicate_runs().len());
        println!("\nCases:");
        for case in &config.cases {
            println!(
                "  - {}: {} replicate(s) against {:?}",
                case.id,
                case.ai_outputs.len(),
                case.benchmark
            );
        }
        return Ok(());
    }

    let output_dir = args
        .output
        .unwrap_or_else(|| config.settings.output_dir.clone());

    let runner = EvalRunner::new(config);
    let mut titles = TitleScoreAccumulator::default();
    let results = runner.run(args.parallelism, &mut titles).await?;

    print_results(&results);

    runner.save_results(&output_dir).await?;
    println!("\nResults saved to: {:?}", output_dir);

    if args.enforce_thresholds {
        if let Some(ref verdict) = results.verdict {
            if !verdict.passed {
                let failed: Vec<String> = verdict
                    .failures
                    .iter()
                    .map(|f| format!("{} {:.3} < {:.3}", f.metric, f.value, f.minimum))
                    .collect();
                bail!("Metric thresholds not met: {}", failed.join(", "));
            }
        }
        if let Some(ref evaluation) = results.titles {
            if !evaluation.passed {
                bail!(
                    "Title score {:.3} is below the threshold of {:.3}",
                    evaluation.overall_score,
                    evaluation.threshold
                );
            }
        }
    }

    Ok(())
}

fn print_results(results: &eval::EvaluationResults) {
    println!("\n{}", "=".repeat(60));
    println!("EVALUATION COMPLETE");
    println!("{}", "=".repeat(60));
    println!("\nSummary:");
    println!("  Total runs: {}", results.summary.total_runs);
    println!("  Completed: {}", results.summary.completed);
    println!("  Failed: {}", results.summary.failed);
    println!("  Unknown steps: {}", results.summary.unknown_steps);

    if let Some(ref aggregate) = results.aggregate {
        println!("\nSummary / All ({} replicates):", aggregate.num_replicates);
        for metric in ["accuracy", "precision", "recall", "f1_score", "classification_accuracy"] {
            println!("  {:<24} {:.3}", metric, aggregate.get(metric).unwrap_or(0.0));
        }
    }

    if !results.skill_recognition.is_empty() {
        println!("\nError recognition by skill:");
        for entry in &results.skill_recognition {
            println!("  {} ({} total)", entry.name, entry.total);
            for split in &entry.skills {
                println!(
                    "    {:<20} {} recognized / {} unrecognized",
                    split.skill.to_string(),
                    split.recognized,
                    split.unrecognized
                );
            }
        }
    }

    if let Some(ref titles) = results.titles {
        println!(
            "\nProtocol titles: mean ROUGE-1 {:.3} ({})",
            titles.overall_score,
            if titles.passed { "passed" } else { "failed" }
        );
    }

    if let Some(ref ratings) = results.rating_summary {
        println!("\nProtocol ratings (mean over completed runs):");
        for (name, value) in ratings.named() {
            println!("  {:<24} {:.2}", name, value);
        }
    }

    if let Some(ref verdict) = results.verdict {
        println!(
            "\nThresholds: {}",
            if verdict.passed { "met" } else { "not met" }
        );
    }
}

fn generate_sample_config(args: cli::InitArgs) -> Result<()> {
    let config = EvalConfig::sample();

    config.save(&args.output)?;
    println!("Generated sample config at: {:?}", args.output);

    Ok(())
}
