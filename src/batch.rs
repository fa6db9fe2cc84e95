use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::{file_name_of, IdentificationResult, IdentifyOutcome};

pub(crate) const DEFAULT_PACING: Duration = Duration::from_secs(1);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Identify `images` one at a time, in order.
///
/// `sleep(pacing)` runs before every image after the first. An error or panic
/// from `process` is recorded against that image and the loop moves on, so the
/// output always has one entry per input.
pub(crate) fn run_batch<P, S>(
    images: &[PathBuf],
    pacing: Duration,
    mut sleep: S,
    mut process: P,
) -> Vec<IdentificationResult>
where
    P: FnMut(usize, &Path) -> Result<IdentifyOutcome, Box<dyn std::error::Error>>,
    S: FnMut(Duration),
{
    let mut results = Vec::with_capacity(images.len());
    for (index, path) in images.iter().enumerate() {
        if index > 0 && !pacing.is_zero() {
            sleep(pacing);
        }
        let file_name = file_name_of(path);
        let result = match catch_unwind(AssertUnwindSafe(|| process(index, path))) {
            Ok(Ok(outcome)) => outcome.into_result(file_name),
            Ok(Err(err)) => {
                tracing::error!(file = %file_name, error = %err, "processing failed");
                IdentificationResult::not_identified(file_name, format!("error: {err}"))
            }
            Err(payload) => {
                let msg = panic_message(payload.as_ref());
                tracing::error!(file = %file_name, panic = %msg, "processing panicked");
                IdentificationResult::not_identified(file_name, format!("panic: {msg}"))
            }
        };
        results.push(result);
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{sample_card, Identification};
    use std::io;

    fn paths(names: &[&str]) -> Vec<PathBuf> {
        names.iter().map(|n| PathBuf::from(format!("cards/{n}"))).collect()
    }

    #[test]
    fn failure_in_the_middle_does_not_abort() {
        let images = paths(&["one.jpg", "two.jpg", "three.jpg"]);
        let results = run_batch(&images, Duration::ZERO, |_| {}, |index, path| {
            if index == 1 {
                return Err(io::Error::other("disk on fire").into());
            }
            let name = path.file_stem().unwrap().to_string_lossy().into_owned();
            Ok(IdentifyOutcome::Identified(sample_card(&name)))
        });

        assert_eq!(results.len(), 3);
        let names: Vec<&str> = results.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["one.jpg", "two.jpg", "three.jpg"]);
        assert_eq!(results[0].outcome.card().unwrap().card_name, "one");
        assert!(matches!(
            &results[1].outcome,
            Identification::NotIdentified { reason } if reason.contains("disk on fire")
        ));
        assert_eq!(results[2].outcome.card().unwrap().card_name, "three");
    }

    #[test]
    fn panic_is_contained() {
        let images = paths(&["a.png", "b.png"]);
        let results = run_batch(&images, Duration::ZERO, |_| {}, |index, _| {
            if index == 0 {
                panic!("model client exploded");
            }
            Ok(IdentifyOutcome::Identified(sample_card("Survivor")))
        });
        assert_eq!(results.len(), 2);
        assert!(matches!(
            &results[0].outcome,
            Identification::NotIdentified { reason } if reason.contains("model client exploded")
        ));
        assert!(results[1].outcome.card().is_some());
    }

    #[test]
    fn exhausted_outcome_keeps_reason() {
        let images = paths(&["blurry.jpg"]);
        let results = run_batch(&images, Duration::ZERO, |_| {}, |_, _| {
            Ok(IdentifyOutcome::Exhausted {
                attempts: 4,
                last_error: "schema".to_string(),
            })
        });
        assert_eq!(
            results[0].outcome,
            Identification::NotIdentified {
                reason: "no valid answer after 4 attempts".to_string()
            }
        );
    }

    #[test]
    fn pacing_runs_between_calls_only() {
        let images = paths(&["1.png", "2.png", "3.png"]);
        let mut waits = Vec::new();
        let results = run_batch(
            &images,
            Duration::from_secs(1),
            |d| waits.push(d),
            |_, _| Ok(IdentifyOutcome::Identified(sample_card("Paced"))),
        );
        assert_eq!(results.len(), 3);
        assert_eq!(waits, vec![Duration::from_secs(1); 2]);
    }

    #[test]
    fn empty_input_yields_no_results() {
        let results = run_batch(&[], Duration::from_secs(1), |_| panic!("no sleep expected"), |_, _| {
            unreachable!()
        });
        assert!(results.is_empty());
    }
}
