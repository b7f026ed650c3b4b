//! Shared test helpers for engine tests.

use cliplens_core::answerer::Answerer;
use cliplens_core::error::AnswererError;
use cliplens_core::field::{AcceptedSpec, AggKind, FieldSpec, MediaRequirement};
use cliplens_core::media::FrameRef;
use std::sync::Mutex;

/// A minimal field with no media requirement.
pub fn field(key: &str, description: &str, accepted: AcceptedSpec) -> FieldSpec {
    FieldSpec {
        key: key.into(),
        description: description.into(),
        accepted,
        aggregation: AggKind::First,
        media: MediaRequirement {
            frame_method: None,
            frame_policy: None,
            audio_key: None,
            splittable: false,
        },
    }
}

/// A field with an explicit aggregation kind.
pub fn agg_field(key: &str, accepted: AcceptedSpec, aggregation: AggKind) -> FieldSpec {
    FieldSpec { aggregation, ..field(key, "a question", accepted) }
}

/// `n` opaque frames with distinguishable payloads.
pub fn frames(n: usize) -> Vec<FrameRef> {
    (0..n).map(|i| FrameRef::from_b64(format!("frame{i}"))).collect()
}

/// A mock answerer that returns a sequence of scripted outcomes.
///
/// Each call to `answer` pops the next outcome in the queue. Panics if
/// more calls are made than outcomes provided.
pub struct SequentialMockAnswerer {
    responses: Mutex<Vec<Result<String, AnswererError>>>,
    call_count: Mutex<usize>,
}

impl SequentialMockAnswerer {
    pub fn new(responses: Vec<Result<String, AnswererError>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            call_count: Mutex::new(0),
        }
    }

    /// An answerer that returns the same JSON body for every call.
    pub fn repeating(body: &str, times: usize) -> Self {
        Self::new(vec![Ok(body.to_string()); times])
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

#[async_trait::async_trait]
impl Answerer for SequentialMockAnswerer {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn answer(
        &self,
        _fields: &[FieldSpec],
        _images: &[FrameRef],
        _transcript: &[String],
    ) -> Result<String, AnswererError> {
        let mut count = self.call_count.lock().unwrap();
        let responses = self.responses.lock().unwrap();

        if *count >= responses.len() {
            panic!(
                "SequentialMockAnswerer: no more responses (call #{}, have {})",
                *count,
                responses.len()
            );
        }

        let response = responses[*count].clone();
        *count += 1;
        response
    }
}
