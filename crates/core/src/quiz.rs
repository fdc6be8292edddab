use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Quiz;

/// One pass through a quiz: at most one answer per question.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizAttempt {
    answers: BTreeMap<usize, usize>,
    submitted: bool,
    score: Option<u8>,
}

impl QuizAttempt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answers(&self) -> &BTreeMap<usize, usize> {
        &self.answers
    }

    pub fn answer_for(&self, question: usize) -> Option<usize> {
        self.answers.get(&question).copied()
    }

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    pub fn score(&self) -> Option<u8> {
        self.score
    }

    /// Record or overwrite an answer. Returns false when nothing changed:
    /// already submitted, or indices outside the quiz.
    pub fn answer(&mut self, quiz: &Quiz, question: usize, option: usize) -> bool {
        if self.submitted {
            return false;
        }
        let Some(q) = quiz.questions.get(question) else {
            return false;
        };
        if option >= q.options.len() {
            return false;
        }
        self.answers.insert(question, option);
        true
    }

    /// Score the attempt. A second call returns the stored score untouched.
    pub fn submit(&mut self, quiz: &Quiz) -> u8 {
        if let (true, Some(score)) = (self.submitted, self.score) {
            return score;
        }

        let total = quiz.questions.len();
        let correct = self.correct_count(quiz);
        let score = if total == 0 {
            0
        } else {
            (100.0 * correct as f64 / total as f64).round() as u8
        };

        self.submitted = true;
        self.score = Some(score);
        score
    }

    pub fn correct_count(&self, quiz: &Quiz) -> usize {
        quiz.questions
            .iter()
            .enumerate()
            .filter(|(i, q)| self.answer_for(*i) == Some(q.correct_answer))
            .count()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
