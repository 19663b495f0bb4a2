//! Golden-dataset check of the live model against the classification policy.

use std::time::{Duration, Instant};

use crate::engine::Engine;
use crate::prompt::build_prompt;
use crate::types::Category;
use crate::validator::ResponseValidator;

#[derive(Debug, Clone)]
pub struct GoldenCase {
    pub description: &'static str,
    pub input: &'static str,
    pub expected: Category,
}

pub fn golden_cases() -> Vec<GoldenCase> {
    vec![
        GoldenCase {
            description: "Critical Incident",
            input: "Hey team, the server is down, please fix ASAP.",
            expected: Category::Productive,
        },
        GoldenCase {
            description: "Obvious Spam",
            input: "Congratulations! You won a free iPhone. Click here.",
            expected: Category::Unproductive,
        },
        GoldenCase {
            description: "Social/Friendly",
            input: "Thanks for the lunch yesterday, it was great catching up.",
            expected: Category::Unproductive,
        },
        GoldenCase {
            description: "Deadline Work",
            input: "Please review the attached contract by Friday.",
            expected: Category::Productive,
        },
        GoldenCase {
            description: "Half Productive",
            input: "Olá, pessoal! Feliz natal e ano novo a todos!\n\
                    Antes de mais nada, parabéns ao time pela performance de vendas!\n\
                    Por favor, confirmem a lista de presença para o churrasco na casa da Márcia, vamos comemorar!\n\
                    Mas por favor, não esqueça de dar upload do relatório antes de sairmos. \
                    Isso precisa estar na mão do cliente amanhã cedo.\n\
                    Att, Katy Kat",
            expected: Category::Productive,
        },
    ]
}

#[derive(Debug)]
pub enum CaseOutcome {
    Pass,
    Fail {
        actual: Category,
        justification: String,
    },
    Error(String),
}

#[derive(Debug)]
pub struct CaseReport {
    pub description: &'static str,
    pub expected: Category,
    pub outcome: CaseOutcome,
    pub latency: Duration,
}

#[derive(Debug, Default)]
pub struct EvaluationReport {
    pub cases: Vec<CaseReport>,
}

impl EvaluationReport {
    pub fn passed(&self) -> usize {
        self.cases
            .iter()
            .filter(|case| matches!(case.outcome, CaseOutcome::Pass))
            .count()
    }

    /// Percentage of passing cases; an empty report scores zero.
    pub fn accuracy(&self) -> f64 {
        if self.cases.is_empty() {
            return 0.0;
        }
        self.passed() as f64 * 100.0 / self.cases.len() as f64
    }

    pub fn all_passed(&self) -> bool {
        !self.cases.is_empty() && self.passed() == self.cases.len()
    }
}

#[tracing::instrument(skip_all, fields(cases = cases.len()))]
pub async fn evaluate(
    engine: &(dyn Engine + Send + Sync),
    validator: &ResponseValidator,
    cases: &[GoldenCase],
) -> EvaluationReport {
    let mut report = EvaluationReport::default();

    for case in cases {
        let started = Instant::now();
        let outcome = match engine.classify(&build_prompt(case.input)).await {
            Err(e) => CaseOutcome::Error(e.to_string()),
            Ok(output) => match validator.validate(&output.text) {
                Err(e) => CaseOutcome::Error(e.to_string()),
                Ok(result) if result.category == case.expected => CaseOutcome::Pass,
                Ok(result) => CaseOutcome::Fail {
                    actual: result.category,
                    justification: result.justification,
                },
            },
        };

        tracing::debug!(case = case.description, ?outcome, "Evaluated golden case");
        report.cases.push(CaseReport {
            description: case.description,
            expected: case.expected,
            outcome,
            latency: started.elapsed(),
        });
    }

    report
}
