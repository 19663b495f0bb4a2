use clap::Parser;

use mail_triage::config::{EvalConfig, RetryConfig};
use mail_triage::evaluation::{CaseOutcome, evaluate, golden_cases};
use mail_triage::gemini_engine::{GeminiConfig, GeminiEngine};
use mail_triage::retrying_engine::RetryingEngine;
use mail_triage::validator::ResponseValidator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = EvalConfig::parse();
    mail_triage::init_tracing(config.log_json);

    let gemini = GeminiEngine::new(GeminiConfig::from(&config.gemini))?;
    println!("Starting evaluation on {}...", gemini.model());

    let engine = RetryingEngine::new(RetryConfig::from(&config.retry), gemini);
    let validator = ResponseValidator::new()?;
    let report = evaluate(&engine, &validator, &golden_cases()).await;

    for case in &report.cases {
        let latency = case.latency.as_secs_f64();
        match &case.outcome {
            CaseOutcome::Pass => {
                println!("PASS  {} ({latency:.2}s) - {:?}", case.description, case.expected)
            }
            CaseOutcome::Fail {
                actual,
                justification,
            } => {
                println!("FAIL  {} ({latency:.2}s)", case.description);
                println!("      expected: {:?}", case.expected);
                println!("      got:      {actual:?}");
                println!("      reason:   {justification}");
            }
            CaseOutcome::Error(e) => println!("ERROR {} ({latency:.2}s) - {e}", case.description),
        }
    }

    println!(
        "Final score: {:.1}% ({}/{})",
        report.accuracy(),
        report.passed(),
        report.cases.len()
    );

    if !report.all_passed() {
        anyhow::bail!("model behaviour has degraded against the golden dataset");
    }
    println!("Model is acting as defined.");
    Ok(())
}
