//! Lexical evaluation of answer quality.
//!
//! The [`Evaluator`] scores a completed (question, answer, contexts) triple
//! with five independent metrics, all pure functions over normalized token
//! sets. No model or network call is involved: this is a deliberate design
//! choice that keeps evaluation fast and dependency-free, at the cost of
//! measuring lexical overlap rather than semantic entailment.
//!
//! Metric definitions (each in `[0, 1]`, absent if its inputs are missing):
//!
//! - **faithfulness** — fraction of answer sentences whose token set is
//!   more than half covered by the union of context tokens
//! - **answer_relevancy** — overlap coefficient of stopword-stripped
//!   question tokens within the answer, with a short-answer penalty
//! - **context_precision** — fraction of contexts sharing more than 30%
//!   of the question's tokens
//! - **context_recall** — fraction of ground-truth tokens present in the
//!   context union (requires ground truth)
//! - **answer_correctness** — token-multiset F1 between answer and ground
//!   truth (requires ground truth)

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::QualityThresholds;
use crate::error::{RagError, Result};

/// Question words and function words excluded from relevancy scoring.
const STOPWORDS: &[&str] = &[
    "what", "is", "the", "a", "an", "of", "in", "to", "how", "does", "do", "can", "who",
    "when", "where", "why", "which",
];

/// Answers shorter than this many characters take a relevancy penalty.
const SHORT_ANSWER_CHARS: usize = 20;

/// Qualitative label derived from the aggregate score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityLabel {
    /// Aggregate at or above the `excellent` threshold.
    Excellent,
    /// Aggregate at or above the `good` threshold.
    Good,
    /// Aggregate at or above the `fair` threshold.
    Fair,
    /// Everything below the `fair` threshold.
    Poor,
}

impl fmt::Display for QualityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            QualityLabel::Excellent => "Excellent",
            QualityLabel::Good => "Good",
            QualityLabel::Fair => "Fair",
            QualityLabel::Poor => "Poor",
        };
        f.write_str(label)
    }
}

/// Per-metric scores plus the aggregate and quality label for one triple.
///
/// A metric is `None` when its required inputs were not supplied; absent
/// metrics are excluded from the aggregate, never treated as zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    /// How much of the answer is lexically grounded in the contexts.
    pub faithfulness: Option<f32>,
    /// Token overlap between question and answer.
    pub answer_relevancy: Option<f32>,
    /// Fraction of contexts relevant to the question.
    pub context_precision: Option<f32>,
    /// Coverage of the ground truth by the contexts.
    pub context_recall: Option<f32>,
    /// Token-level F1 between answer and ground truth.
    pub answer_correctness: Option<f32>,
    /// Arithmetic mean of the metrics that were computable.
    pub aggregate: f32,
    /// Threshold mapping of the aggregate.
    pub quality_label: QualityLabel,
}

impl EvaluationResult {
    /// The metrics that were computable, in declaration order.
    pub fn present_metrics(&self) -> Vec<f32> {
        [
            self.faithfulness,
            self.answer_relevancy,
            self.context_precision,
            self.context_recall,
            self.answer_correctness,
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

/// Lexical answer-quality evaluator.
#[derive(Debug, Clone, Default)]
pub struct Evaluator {
    thresholds: QualityThresholds,
}

impl Evaluator {
    /// Create an evaluator with default quality thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an evaluator with custom quality-label cut points.
    pub fn with_thresholds(thresholds: QualityThresholds) -> Self {
        Self { thresholds }
    }

    /// Evaluate an answer against its question, retrieved contexts, and an
    /// optional ground truth.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EvaluationInput`] if the question or answer is
    /// empty after trimming, or no non-empty context was supplied. A missing
    /// ground truth is not an error; it only removes `context_recall` and
    /// `answer_correctness` from the metric set.
    pub fn evaluate(
        &self,
        question: &str,
        answer: &str,
        contexts: &[String],
        ground_truth: Option<&str>,
    ) -> Result<EvaluationResult> {
        if question.trim().is_empty() {
            return Err(RagError::EvaluationInput("question must not be empty".into()));
        }
        if answer.trim().is_empty() {
            return Err(RagError::EvaluationInput("answer must not be empty".into()));
        }
        let contexts: Vec<&str> =
            contexts.iter().map(|c| c.trim()).filter(|c| !c.is_empty()).collect();
        if contexts.is_empty() {
            return Err(RagError::EvaluationInput(
                "at least one non-empty context is required".into(),
            ));
        }
        let ground_truth = ground_truth.map(str::trim).filter(|gt| !gt.is_empty());

        let faithfulness = Some(faithfulness(answer, &contexts));
        let answer_relevancy = Some(answer_relevancy(question, answer));
        let context_precision = Some(context_precision(question, &contexts));
        let context_recall = ground_truth.map(|gt| context_recall(&contexts, gt));
        let answer_correctness = ground_truth.map(|gt| answer_correctness(answer, gt));

        let present: Vec<f32> = [
            faithfulness,
            answer_relevancy,
            context_precision,
            context_recall,
            answer_correctness,
        ]
        .into_iter()
        .flatten()
        .collect();
        let aggregate = round4(present.iter().sum::<f32>() / present.len() as f32);

        let quality_label = self.label(aggregate);
        info!(aggregate, %quality_label, "evaluation complete");

        Ok(EvaluationResult {
            faithfulness,
            answer_relevancy,
            context_precision,
            context_recall,
            answer_correctness,
            aggregate,
            quality_label,
        })
    }

    fn label(&self, aggregate: f32) -> QualityLabel {
        if aggregate >= self.thresholds.excellent {
            QualityLabel::Excellent
        } else if aggregate >= self.thresholds.good {
            QualityLabel::Good
        } else if aggregate >= self.thresholds.fair {
            QualityLabel::Fair
        } else {
            QualityLabel::Poor
        }
    }
}

// ── Metric implementations ─────────────────────────────────────────

/// Fraction of answer sentences whose tokens are >50% covered by the
/// union of context tokens.
fn faithfulness(answer: &str, contexts: &[&str]) -> f32 {
    let sentences = split_sentences(answer);
    if sentences.is_empty() {
        return 0.0;
    }

    let context_tokens: HashSet<String> =
        contexts.iter().flat_map(|c| tokenize(c)).collect();

    let supported = sentences
        .iter()
        .filter(|sentence| {
            let tokens: HashSet<String> = tokenize(sentence).into_iter().collect();
            if tokens.is_empty() {
                return false;
            }
            let overlap = tokens.intersection(&context_tokens).count();
            overlap as f32 / tokens.len() as f32 > 0.5
        })
        .count();

    round4(supported as f32 / sentences.len() as f32)
}

/// Overlap coefficient of stopword-stripped question tokens within the
/// answer, halved for very short answers. Neutral 0.5 when the question
/// has no content tokens.
fn answer_relevancy(question: &str, answer: &str) -> f32 {
    let mut q_tokens: HashSet<String> = tokenize(question).into_iter().collect();
    for stopword in STOPWORDS {
        q_tokens.remove(*stopword);
    }
    if q_tokens.is_empty() {
        return 0.5;
    }

    let a_tokens: HashSet<String> = tokenize(answer).into_iter().collect();
    let overlap = q_tokens.intersection(&a_tokens).count();
    let mut score = (overlap as f32 / q_tokens.len() as f32).min(1.0);

    if answer.chars().count() < SHORT_ANSWER_CHARS {
        score *= 0.5;
    }
    round4(score)
}

/// Fraction of contexts whose token overlap with the question exceeds 30%.
/// Neutral 0.5 when the question has no content tokens.
fn context_precision(question: &str, contexts: &[&str]) -> f32 {
    let q_tokens: HashSet<String> = tokenize(question).into_iter().collect();
    if q_tokens.is_empty() {
        return 0.5;
    }

    let relevant = contexts
        .iter()
        .filter(|ctx| {
            let ctx_tokens: HashSet<String> = tokenize(ctx).into_iter().collect();
            let overlap = q_tokens.intersection(&ctx_tokens).count();
            overlap as f32 / q_tokens.len() as f32 > 0.3
        })
        .count();

    round4(relevant as f32 / contexts.len() as f32)
}

/// Fraction of ground-truth tokens that appear in the context union.
/// Neutral 0.5 when the ground truth has no content tokens.
fn context_recall(contexts: &[&str], ground_truth: &str) -> f32 {
    let gt_tokens: HashSet<String> = tokenize(ground_truth).into_iter().collect();
    if gt_tokens.is_empty() {
        return 0.5;
    }

    let ctx_tokens: HashSet<String> =
        contexts.iter().flat_map(|c| tokenize(c)).collect();
    let overlap = gt_tokens.intersection(&ctx_tokens).count();
    round4((overlap as f32 / gt_tokens.len() as f32).min(1.0))
}

/// Token-multiset F1 between answer and ground truth.
fn answer_correctness(answer: &str, ground_truth: &str) -> f32 {
    let a_counts = token_counts(answer);
    let gt_counts = token_counts(ground_truth);

    let common: usize = a_counts
        .iter()
        .filter_map(|(token, &count)| gt_counts.get(token).map(|&gt| count.min(gt)))
        .sum();
    if common == 0 {
        return 0.0;
    }

    let precision = common as f32 / a_counts.values().sum::<usize>() as f32;
    let recall = common as f32 / gt_counts.values().sum::<usize>() as f32;
    round4(2.0 * precision * recall / (precision + recall))
}

// ── Tokenization ───────────────────────────────────────────────────

/// Lowercase alphabetic tokens of at least two characters.
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| word.len() >= 2)
        .map(str::to_string)
        .collect()
}

fn token_counts(text: &str) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for token in tokenize(text) {
        *counts.entry(token).or_insert(0) += 1;
    }
    counts
}

/// Split text on sentence-ending punctuation.
fn split_sentences(text: &str) -> Vec<&str> {
    text.split_inclusive(['.', '!', '?'])
        .map(str::trim)
        .filter(|s| !s.is_empty() && s.chars().any(char::is_alphabetic))
        .collect()
}

fn round4(value: f32) -> f32 {
    (value * 10_000.0).round() / 10_000.0
}
