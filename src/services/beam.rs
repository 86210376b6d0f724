//! Beam-search decoding over an arbitrary next-token scorer.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// EOS is suppressed while the sequence (decoder start token included)
    /// is shorter than this.
    pub min_length: usize,
    /// Hard cap on the sequence length, decoder start token included.
    pub max_length: usize,
    pub num_beams: usize,
    pub length_penalty: f64,
    pub early_stopping: bool,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            min_length: 100,
            max_length: crate::config::DEFAULT_MAX_SUMMARY_TOKENS,
            num_beams: 4,
            length_penalty: 2.0,
            early_stopping: true,
        }
    }
}

/// Scores the token that follows a decoder prefix.
pub trait DecoderStep {
    /// Unnormalized logits over the vocabulary.
    fn next_token_logits(&mut self, prefix: &[u32]) -> Result<Vec<f32>>;
}

impl<F> DecoderStep for F
where
    F: FnMut(&[u32]) -> Result<Vec<f32>>,
{
    fn next_token_logits(&mut self, prefix: &[u32]) -> Result<Vec<f32>> {
        self(prefix)
    }
}

#[derive(Debug, Clone)]
struct Beam {
    tokens: Vec<u32>,
    score: f64,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    beam: usize,
    token: u32,
    score: f64,
}

/// Finished sequences, capped at `num_beams`, scored with the length penalty.
struct Hypotheses {
    num_beams: usize,
    length_penalty: f64,
    early_stopping: bool,
    entries: Vec<(f64, Vec<u32>)>,
}

impl Hypotheses {
    fn new(params: &GenerationParams, num_beams: usize) -> Self {
        Self {
            num_beams,
            length_penalty: params.length_penalty,
            early_stopping: params.early_stopping,
            entries: Vec::with_capacity(num_beams + 1),
        }
    }

    fn normalized(&self, sum_logprobs: f64, generated_len: usize) -> f64 {
        sum_logprobs / (generated_len.max(1) as f64).powf(self.length_penalty)
    }

    fn worst_score(&self) -> f64 {
        self.entries
            .iter()
            .map(|(score, _)| *score)
            .fold(f64::INFINITY, f64::min)
    }

    fn add(&mut self, tokens: Vec<u32>, sum_logprobs: f64) {
        let score = self.normalized(sum_logprobs, tokens.len());
        if self.entries.len() < self.num_beams || score > self.worst_score() {
            self.entries.push((score, tokens));
            if self.entries.len() > self.num_beams {
                if let Some(worst) = self
                    .entries
                    .iter()
                    .enumerate()
                    .min_by(|a, b| a.1 .0.total_cmp(&b.1 .0))
                    .map(|(i, _)| i)
                {
                    self.entries.swap_remove(worst);
                }
            }
        }
    }

    fn is_done(&self, best_live: Option<&Beam>) -> bool {
        if self.entries.len() < self.num_beams {
            return false;
        }
        if self.early_stopping {
            return true;
        }
        match best_live {
            None => true,
            Some(beam) => {
                let reachable = self.normalized(beam.score, beam.tokens.len() - 1);
                self.worst_score() >= reachable
            }
        }
    }

    fn into_best(self) -> Option<Vec<u32>> {
        self.entries
            .into_iter()
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, tokens)| tokens)
    }
}

/// Runs beam search from `start_token` and returns the best sequence,
/// without the start token. The sequence ends in `eos_token` unless the
/// length cap was reached first.
pub fn beam_search<S>(
    step: &mut S,
    params: &GenerationParams,
    start_token: u32,
    eos_token: u32,
) -> Result<Vec<u32>>
where
    S: DecoderStep + ?Sized,
{
    let num_beams = params.num_beams.max(1);
    let mut hypotheses = Hypotheses::new(params, num_beams);
    let mut beams = vec![Beam {
        tokens: vec![start_token],
        score: 0.0,
    }];
    let mut done = false;

    while !beams.is_empty() {
        let cur_len = beams[0].tokens.len();
        if cur_len >= params.max_length {
            break;
        }

        let mut candidates = Vec::with_capacity(beams.len() * 2 * num_beams);
        for (beam_idx, beam) in beams.iter().enumerate() {
            let mut logits = step.next_token_logits(&beam.tokens)?;
            if cur_len < params.min_length {
                if let Some(logit) = logits.get_mut(eos_token as usize) {
                    *logit = f32::NEG_INFINITY;
                }
            }
            let logprobs = log_softmax(&logits);
            for (token, logprob) in top_k(&logprobs, 2 * num_beams) {
                candidates.push(Candidate {
                    beam: beam_idx,
                    token,
                    score: beam.score + f64::from(logprob),
                });
            }
        }
        candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
        candidates.truncate(2 * num_beams);

        let mut next = Vec::with_capacity(num_beams);
        for (rank, candidate) in candidates.into_iter().enumerate() {
            if !candidate.score.is_finite() {
                continue;
            }
            let parent = &beams[candidate.beam].tokens;
            if candidate.token == eos_token {
                if rank >= num_beams {
                    continue;
                }
                let mut generated = parent[1..].to_vec();
                generated.push(eos_token);
                hypotheses.add(generated, candidate.score);
            } else {
                let mut tokens = parent.clone();
                tokens.push(candidate.token);
                next.push(Beam {
                    tokens,
                    score: candidate.score,
                });
            }
            if next.len() == num_beams {
                break;
            }
        }

        beams = next;
        if hypotheses.is_done(beams.first()) {
            done = true;
            break;
        }
    }

    if !done {
        for beam in beams {
            hypotheses.add(beam.tokens[1..].to_vec(), beam.score);
        }
    }

    hypotheses
        .into_best()
        .ok_or_else(|| anyhow!("beam search produced no hypothesis"))
}

/// Numerically stable log-softmax. All-`-inf` input stays `-inf`.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits
        .iter()
        .copied()
        .filter(|x| x.is_finite())
        .fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return vec![f32::NEG_INFINITY; logits.len()];
    }
    let sum: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
    let log_sum = sum.ln();
    logits.iter().map(|&x| x - max - log_sum).collect()
}

fn top_k(values: &[f32], k: usize) -> Vec<(u32, f32)> {
    let mut indexed: Vec<(u32, f32)> = values
        .iter()
        .enumerate()
        .map(|(i, &v)| (i as u32, v))
        .collect();
    let k = k.min(indexed.len());
    if k == 0 {
        return Vec::new();
    }
    if k < indexed.len() {
        indexed.select_nth_unstable_by(k - 1, |a, b| b.1.total_cmp(&a.1));
        indexed.truncate(k);
    }
    indexed.sort_by(|a, b| b.1.total_cmp(&a.1));
    indexed
}
