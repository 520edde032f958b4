//! Survey submissions: free-form answers keyed by survey id.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SurveySubmission {
    pub id: Uuid,
    pub survey_id: String,
    pub respondent_id: Option<Uuid>,
    pub answers: HashMap<String, serde_json::Value>,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct SurveyStore {
    submissions: DashMap<Uuid, SurveySubmission>,
}

impl SurveyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn submit(
        &self,
        survey_id: String,
        respondent_id: Option<Uuid>,
        answers: HashMap<String, serde_json::Value>,
    ) -> SurveySubmission {
        let submission = SurveySubmission {
            id: Uuid::new_v4(),
            survey_id,
            respondent_id,
            answers,
            submitted_at: Utc::now(),
        };
        self.submissions.insert(submission.id, submission.clone());
        metrics::counter!("catalog.survey_submissions").increment(1);
        submission
    }

    pub fn list_for_survey(&self, survey_id: &str) -> Vec<SurveySubmission> {
        let mut out: Vec<SurveySubmission> = self
            .submissions
            .iter()
            .filter(|r| r.value().survey_id == survey_id)
            .map(|r| r.value().clone())
            .collect();
        out.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        out
    }
}
