use serde::Deserialize;

use crate::error::AppError;

// What to do with the captured photo when face analysis fails: keep it so
// the user can retry analysis without retaking, or discard it and force a
// fresh capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AnalysisRetryPolicy {
    RetainPhoto,
    ForceRetake,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Configuration {
    pub result_limit: usize,
    pub intent_buffer_size: usize,
    pub completion_buffer_size: usize,
    pub retry_policy: AnalysisRetryPolicy,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            result_limit: 5,
            intent_buffer_size: 16,
            completion_buffer_size: 16,
            retry_policy: AnalysisRetryPolicy::RetainPhoto,
        }
    }
}

impl Configuration {
    // Defaults overridable from the environment, e.g. SMARTSPECS_RESULT_LIMIT=3.
    pub fn load() -> Result<Self, AppError> {
        let defaults = Configuration::default();
        let settings = config::Config::builder()
            .set_default("result_limit", defaults.result_limit as u64)?
            .set_default("intent_buffer_size", defaults.intent_buffer_size as u64)?
            .set_default(
                "completion_buffer_size",
                defaults.completion_buffer_size as u64,
            )?
            .set_default("retry_policy", "retain-photo")?
            .add_source(config::Environment::with_prefix("SMARTSPECS").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
