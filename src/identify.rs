use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

use base64::Engine;

use crate::{
    build_context_parts, build_identification_request, file_name_of, guess_image_media_type,
    CardRecord, ContentPart, ExamplePair, IdentificationResult, VisionModel,
};

pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;
pub(crate) const BASE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Passed to the retry callback before each backoff wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct RetryNotice {
    /// 1-based number of the retry about to happen.
    pub(crate) attempt: u32,
    pub(crate) max_retries: u32,
    pub(crate) delay: Duration,
}

/// Delay before retry number `retry` (1-based): base, 2x base, 4x base, ...
pub(crate) fn backoff_delay(base: Duration, retry: u32) -> Duration {
    let exponent = retry.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum IdentifyOutcome {
    Identified(CardRecord),
    /// Every attempt hit a retryable condition.
    Exhausted { attempts: u32, last_error: String },
    /// A non-retryable error ended the attempt sequence.
    Failed { attempts: u32, reason: String },
}

impl IdentifyOutcome {
    pub(crate) fn into_record(self) -> Option<CardRecord> {
        match self {
            IdentifyOutcome::Identified(card) => Some(card),
            _ => None,
        }
    }

    pub(crate) fn failure_reason(&self) -> Option<String> {
        match self {
            IdentifyOutcome::Identified(_) => None,
            IdentifyOutcome::Exhausted { attempts, .. } => {
                Some(format!("no valid answer after {attempts} attempts"))
            }
            IdentifyOutcome::Failed { reason, .. } => Some(reason.clone()),
        }
    }

    /// Report row for `file_name`, keeping the failure reason.
    pub(crate) fn into_result(self, file_name: String) -> IdentificationResult {
        let reason = self.failure_reason();
        match (self.into_record(), reason) {
            (Some(card), _) => IdentificationResult::identified(file_name, card),
            (None, reason) => IdentificationResult::not_identified(
                file_name,
                reason.unwrap_or_else(|| "not identified".to_string()),
            ),
        }
    }
}

pub(crate) struct Identifier<'a> {
    model: &'a dyn VisionModel,
    context: Vec<ContentPart>,
    base_delay: Duration,
    sleep: fn(Duration),
}

impl<'a> Identifier<'a> {
    /// Example context is encoded once here and reused for every image.
    pub(crate) fn new(model: &'a dyn VisionModel, examples: &[ExamplePair]) -> Self {
        Identifier {
            model,
            context: build_context_parts(examples),
            base_delay: BASE_RETRY_DELAY,
            sleep: thread::sleep,
        }
    }

    pub(crate) fn with_sleep(mut self, sleep: fn(Duration)) -> Self {
        self.sleep = sleep;
        self
    }

    pub(crate) fn identify(
        &self,
        image_path: &Path,
        max_retries: u32,
        on_retry: Option<&mut dyn FnMut(RetryNotice)>,
    ) -> Option<CardRecord> {
        self.identify_detailed(image_path, max_retries, on_retry)
            .into_record()
    }

    pub(crate) fn identify_detailed(
        &self,
        image_path: &Path,
        max_retries: u32,
        mut on_retry: Option<&mut dyn FnMut(RetryNotice)>,
    ) -> IdentifyOutcome {
        let file = file_name_of(image_path);
        let bytes = match fs::read(image_path) {
            Ok(bytes) => bytes,
            Err(err) => {
                tracing::error!(%file, error = %err, "cannot read image");
                return IdentifyOutcome::Failed {
                    attempts: 0,
                    reason: format!("cannot read image: {err}"),
                };
            }
        };
        let target = ContentPart::Image {
            media_type: guess_image_media_type(image_path).to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(&bytes),
        };
        let request = build_identification_request(&self.context, target);

        let mut attempts: u32 = 0;
        loop {
            attempts += 1;
            let retry_reason = match self.model.generate(&request) {
                Ok(text) => match CardRecord::from_model_text(&text) {
                    Ok(card) => return IdentifyOutcome::Identified(card),
                    Err(err) if err.is_retryable() => {
                        tracing::warn!(%file, attempt = attempts, error = %err, "model output failed validation");
                        err.to_string()
                    }
                    Err(err) => {
                        tracing::error!(%file, attempt = attempts, error = %err, "unusable model output");
                        return IdentifyOutcome::Failed {
                            attempts,
                            reason: err.to_string(),
                        };
                    }
                },
                Err(err) if err.is_rate_limit() => {
                    tracing::warn!(%file, attempt = attempts, "rate limited by model service");
                    err.to_string()
                }
                Err(err) => {
                    tracing::error!(%file, attempt = attempts, error = %err, "model call failed");
                    return IdentifyOutcome::Failed {
                        attempts,
                        reason: err.to_string(),
                    };
                }
            };

            let retries_used = attempts - 1;
            if retries_used >= max_retries {
                tracing::error!(%file, attempts, last_error = %retry_reason, "retries exhausted");
                return IdentifyOutcome::Exhausted {
                    attempts,
                    last_error: retry_reason,
                };
            }

            let notice = RetryNotice {
                attempt: retries_used + 1,
                max_retries,
                delay: backoff_delay(self.base_delay, retries_used + 1),
            };
            if let Some(callback) = on_retry.as_deref_mut() {
                callback(notice);
            }
            (self.sleep)(notice.delay);
        }
    }
}
