//! Scoring aggregator
//!
//! Rolls the full set of per-metric results into category (F/A/I/R),
//! principle (F1, A2, ...) and overall aggregates. Maturity means use a
//! floor rule: a mean strictly between 0 and 1 reports as 1, so a group with
//! any partial credit never reads as "no maturity at all".

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::models::{AssessmentSummary, EvaluationResult, TestStatus};

static PRINCIPLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(([FAIR])[0-9](\.[0-9])?)-").expect("valid principle regex"));

#[derive(Default)]
struct GroupAccumulator {
    earned: f64,
    total: f64,
    maturities: Vec<u8>,
    tests: u32,
    passed: u32,
}

impl GroupAccumulator {
    fn add(&mut self, result: &EvaluationResult) {
        self.earned += result.score.earned;
        self.total += result.score.total;
        self.maturities.push(result.maturity);
        self.tests += 1;
        if result.test_status == TestStatus::Pass {
            self.passed += 1;
        }
    }

    fn maturity(&self) -> f64 {
        if self.maturities.is_empty() {
            return 0.0;
        }
        let mean =
            self.maturities.iter().map(|m| *m as f64).sum::<f64>() / self.maturities.len() as f64;
        floor_round(mean)
    }
}

/// Round a maturity mean: strictly between 0 and 1 floors up to 1,
/// everything else rounds to the nearest integer.
fn floor_round(mean: f64) -> f64 {
    if mean > 0.0 && mean < 1.0 {
        1.0
    } else {
        mean.round()
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Aggregate all evaluation results of one session into a summary.
///
/// Results whose metric identifier does not parse into a FAIR principle are
/// ignored. The overall "FAIR" entries are always computed; categories absent
/// from the evaluated metric set simply do not contribute.
pub fn assessment_summary(results: &[EvaluationResult]) -> AssessmentSummary {
    let mut groups: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut category_maturity: BTreeMap<String, GroupAccumulator> = BTreeMap::new();
    let mut overall = GroupAccumulator::default();

    for result in results {
        let Some(caps) = PRINCIPLE_RE.captures(&result.metric_identifier) else {
            tracing::warn!(
                metric = %result.metric_identifier,
                "Metric identifier does not parse into a FAIR principle, skipping in summary"
            );
            continue;
        };
        let principle = caps[1].to_string();
        let category = caps[2].to_string();

        groups.entry(principle).or_default().add(result);
        category_maturity.entry(category).or_default().add(result);
        overall.add(result);
    }

    let mut summary = AssessmentSummary::default();

    let insert_group = |key: &str, acc: &GroupAccumulator, summary: &mut AssessmentSummary| {
        summary.score_earned.insert(key.to_string(), round2(acc.earned));
        summary.score_total.insert(key.to_string(), round2(acc.total));
        let percent = if acc.total > 0.0 {
            round2(acc.earned / acc.total * 100.0)
        } else {
            0.0
        };
        summary.score_percent.insert(key.to_string(), percent);
        summary.maturity.insert(key.to_string(), acc.maturity());
        summary.status_total.insert(key.to_string(), acc.tests);
        summary.status_passed.insert(key.to_string(), acc.passed);
    };

    for (key, acc) in &category_maturity {
        insert_group(key, acc, &mut summary);
    }
    for (key, acc) in &groups {
        insert_group(key, acc, &mut summary);
    }
    insert_group("FAIR", &overall, &mut summary);

    // overall maturity: mean of the four category maturities with the same
    // floor rule, kept at two decimals
    let category_sum: f64 = ["F", "A", "I", "R"]
        .iter()
        .filter_map(|c| summary.maturity.get(*c))
        .sum();
    let overall_maturity = category_sum / 4.0;
    summary.maturity.insert(
        "FAIR".to_string(),
        if overall_maturity > 0.0 && overall_maturity < 1.0 {
            1.0
        } else {
            round2(overall_maturity)
        },
    );

    summary
}
