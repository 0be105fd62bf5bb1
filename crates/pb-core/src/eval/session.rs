use std::collections::HashMap;

use chrono::Utc;

use crate::eval::{ResponseRecord, Sample, SampleUid, Score, UserId, WizardError};

// ---------------------------------------------------------------------------
// Phase — the wizard's coarse position in its linear walk
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    AwaitingUserId,
    Presenting,
    Submitted,
}

// ---------------------------------------------------------------------------
// SessionState — linear wizard over a fixed sample list
// ---------------------------------------------------------------------------

/// Walks a rater through a fixed sample list one at a time. The sample list
/// is immutable for the life of the session except through `restart`, the
/// index is clamped to the list bounds on every move, and responses are
/// keyed by sample uid so re-scoring replaces rather than duplicates.
#[derive(Debug)]
pub struct SessionState {
    samples: Vec<Sample>,
    current_idx: usize,
    responses: HashMap<SampleUid, ResponseRecord>,
    user_id: Option<UserId>,
    phase: Phase,
}

impl SessionState {
    pub fn new(samples: Vec<Sample>) -> Self {
        assert!(!samples.is_empty(), "session requires at least one sample");
        Self {
            samples,
            current_idx: 0,
            responses: HashMap::new(),
            user_id: None,
            phase: Phase::AwaitingUserId,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn current_idx(&self) -> usize {
        self.current_idx
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn current_sample(&self) -> &Sample {
        &self.samples[self.current_idx]
    }

    pub fn current_response(&self) -> Option<&ResponseRecord> {
        self.responses.get(&self.current_sample().uid)
    }

    pub fn scored_count(&self) -> usize {
        self.responses.len()
    }

    pub fn begin(&mut self, user_id: &str) -> Result<(), WizardError> {
        match self.phase {
            Phase::Presenting => return Err(WizardError::AlreadyStarted),
            Phase::Submitted => return Err(WizardError::AlreadySubmitted),
            Phase::AwaitingUserId => {}
        }

        let trimmed = user_id.trim();
        if trimmed.is_empty() {
            return Err(WizardError::EmptyUserId);
        }

        self.user_id = Some(UserId::new(trimmed));
        self.phase = Phase::Presenting;
        self.current_idx = 0;
        Ok(())
    }

    /// Records (or overwrites) the response for the current sample, then
    /// advances, clamped at the last sample.
    pub fn score(&mut self, score: Score) -> Result<(), WizardError> {
        let user_id = self.require_presenting()?.clone();

        let sample = &self.samples[self.current_idx];
        let record = ResponseRecord {
            user_id,
            row_number: sample.row,
            sample_uid: sample.uid.clone(),
            instruction_version: sample.template_version.clone(),
            instruction: sample.instruction.clone(),
            user_score: score,
            timestamp: Utc::now(),
            dataset: sample.dataset.clone(),
            split: sample.split.clone(),
            pair: sample.pair.clone(),
            var: sample.var,
        };
        self.responses.insert(sample.uid.clone(), record);

        self.advance();
        Ok(())
    }

    pub fn back(&mut self) -> Result<(), WizardError> {
        self.require_presenting()?;
        self.current_idx = self.current_idx.saturating_sub(1);
        Ok(())
    }

    /// Moves forward without re-scoring. Only allowed once the current
    /// sample holds a response.
    pub fn skip(&mut self) -> Result<(), WizardError> {
        self.require_presenting()?;

        let uid = &self.samples[self.current_idx].uid;
        if !self.responses.contains_key(uid) {
            return Err(WizardError::SkipUnscored { uid: uid.clone() });
        }

        self.advance();
        Ok(())
    }

    /// Installs a freshly generated sample list and wipes every response.
    /// Valid from any phase, including after submission.
    pub fn restart(&mut self, samples: Vec<Sample>) {
        assert!(!samples.is_empty(), "session requires at least one sample");
        self.samples = samples;
        self.responses.clear();
        self.current_idx = 0;
        self.phase = if self.user_id.is_some() {
            Phase::Presenting
        } else {
            Phase::AwaitingUserId
        };
    }

    pub fn ready_to_submit(&self) -> bool {
        self.phase == Phase::Presenting && self.current_idx + 1 == self.samples.len()
    }

    /// Collects the recorded responses in sample order for the sink.
    /// Unscored samples are omitted; no placeholder rows are produced.
    pub fn pending_rows(&self) -> Result<Vec<ResponseRecord>, WizardError> {
        match self.phase {
            Phase::AwaitingUserId => return Err(WizardError::NotStarted),
            Phase::Submitted => return Err(WizardError::AlreadySubmitted),
            Phase::Presenting => {}
        }
        if !self.ready_to_submit() {
            return Err(WizardError::SubmitNotReady {
                current: self.current_idx + 1,
                total: self.samples.len(),
            });
        }

        Ok(self
            .samples
            .iter()
            .filter_map(|sample| self.responses.get(&sample.uid).cloned())
            .collect())
    }

    /// Marks the session terminal after the sink reported success. Callers
    /// must not mark on sink failure so the session stays retryable.
    pub fn mark_submitted(&mut self) {
        self.phase = Phase::Submitted;
    }

    fn require_presenting(&self) -> Result<&UserId, WizardError> {
        match self.phase {
            Phase::AwaitingUserId => Err(WizardError::NotStarted),
            Phase::Submitted => Err(WizardError::AlreadySubmitted),
            Phase::Presenting => self.user_id.as_ref().ok_or(WizardError::NotStarted),
        }
    }

    fn advance(&mut self) {
        if self.current_idx + 1 < self.samples.len() {
            self.current_idx += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
