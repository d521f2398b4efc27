//! Mock implementations of core port traits.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use wmdetect_core::ports::{
    Classifier, EventSink, ImageLoader, ProgressEvent, RawImage, ResultOutput, RunEvent,
};
use wmdetect_core::{DetectionOutcome, ImageRef, Label, LoadError, Prediction};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// One scripted answer of a [`ScriptedClassifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptedResponse {
    /// Return this prediction.
    Predict(Label, f32),
    /// Return an error with this message.
    Fail(String),
    /// Panic with this message.
    Panic(String),
}

/// Classifier that answers from a script, one response per call.
///
/// Once the script is exhausted every call gets the fallback response.
pub struct ScriptedClassifier {
    script: Mutex<VecDeque<ScriptedResponse>>,
    fallback: ScriptedResponse,
    calls: AtomicUsize,
}

impl ScriptedClassifier {
    /// Answers every call with the same prediction.
    #[must_use]
    pub fn always(label: Label, confidence: f32) -> Self {
        Self::sequence([]).with_fallback(ScriptedResponse::Predict(label, confidence))
    }

    /// Answers calls in order from `responses`, then `Clean` at 1.0.
    #[must_use]
    pub fn sequence(responses: impl IntoIterator<Item = ScriptedResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            fallback: ScriptedResponse::Predict(Label::Clean, 1.0),
            calls: AtomicUsize::new(0),
        }
    }

    /// Replaces the response used once the script runs out.
    #[must_use]
    pub fn with_fallback(mut self, fallback: ScriptedResponse) -> Self {
        self.fallback = fallback;
        self
    }

    /// Number of `classify` calls so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Classifier for ScriptedClassifier {
    fn classify(&self, _image: &RawImage) -> anyhow::Result<Prediction> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let response = lock(&self.script)
            .pop_front()
            .unwrap_or_else(|| self.fallback.clone());
        match response {
            ScriptedResponse::Predict(label, confidence) => Ok(Prediction::new(label, confidence)),
            ScriptedResponse::Fail(message) => Err(anyhow::anyhow!(message)),
            ScriptedResponse::Panic(message) => panic!("{message}"),
        }
    }
}

struct Gate {
    permits: usize,
    open: bool,
    started: usize,
}

/// Classifier whose calls block until the test lets them through.
///
/// Used to hold a run mid-batch, e.g. to cancel or resubmit while it is
/// active.
pub struct GatedClassifier {
    prediction: Prediction,
    gate: Mutex<Gate>,
    changed: Condvar,
}

impl GatedClassifier {
    /// Creates a closed gate. Every call eventually returns `prediction`.
    #[must_use]
    pub fn new(label: Label, confidence: f32) -> Self {
        Self {
            prediction: Prediction::new(label, confidence),
            gate: Mutex::new(Gate {
                permits: 0,
                open: false,
                started: 0,
            }),
            changed: Condvar::new(),
        }
    }

    /// Lets `n` more calls complete.
    pub fn release(&self, n: usize) {
        lock(&self.gate).permits += n;
        self.changed.notify_all();
    }

    /// Lets every current and future call complete.
    pub fn open(&self) {
        lock(&self.gate).open = true;
        self.changed.notify_all();
    }

    /// Number of calls that have entered `classify`.
    #[must_use]
    pub fn started(&self) -> usize {
        lock(&self.gate).started
    }

    /// Blocks until at least `n` calls have entered `classify`.
    ///
    /// Returns false if `timeout` elapsed first.
    pub fn wait_until_started(&self, n: usize, timeout: Duration) -> bool {
        let (gate, _) = self
            .changed
            .wait_timeout_while(lock(&self.gate), timeout, |g| g.started < n)
            .unwrap_or_else(PoisonError::into_inner);
        gate.started >= n
    }
}

impl Classifier for GatedClassifier {
    fn classify(&self, _image: &RawImage) -> anyhow::Result<Prediction> {
        let mut gate = lock(&self.gate);
        gate.started += 1;
        self.changed.notify_all();

        while !gate.open && gate.permits == 0 {
            gate = self
                .changed
                .wait(gate)
                .unwrap_or_else(PoisonError::into_inner);
        }
        if !gate.open {
            gate.permits -= 1;
        }
        Ok(self.prediction)
    }
}

enum LoadBehaviour {
    Image(RawImage),
    DecodeError(String),
    Panic,
}

/// In-memory `ImageLoader` keyed by path.
///
/// Unknown paths fail with `LoadError::NotFound`. Every call is recorded.
pub struct MockImageLoader {
    entries: HashMap<PathBuf, LoadBehaviour>,
    loads: Mutex<Vec<ImageRef>>,
}

impl MockImageLoader {
    /// Creates a loader that knows no images.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            loads: Mutex::new(Vec::new()),
        }
    }

    /// Serves `image` for `path`.
    #[must_use]
    pub fn with_image(mut self, path: impl Into<PathBuf>, image: RawImage) -> Self {
        self.entries.insert(path.into(), LoadBehaviour::Image(image));
        self
    }

    /// Fails `path` with a decode error.
    #[must_use]
    pub fn with_decode_error(mut self, path: impl Into<PathBuf>, reason: &str) -> Self {
        self.entries
            .insert(path.into(), LoadBehaviour::DecodeError(reason.to_string()));
        self
    }

    /// Panics when asked for `path`.
    #[must_use]
    pub fn with_panic(mut self, path: impl Into<PathBuf>) -> Self {
        self.entries.insert(path.into(), LoadBehaviour::Panic);
        self
    }

    /// Every image requested so far, in call order.
    #[must_use]
    pub fn loads(&self) -> Vec<ImageRef> {
        lock(&self.loads).clone()
    }
}

impl Default for MockImageLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageLoader for MockImageLoader {
    fn load(&self, image: &ImageRef) -> Result<RawImage, LoadError> {
        lock(&self.loads).push(image.clone());
        match self.entries.get(image.path()) {
            Some(LoadBehaviour::Image(raw)) => Ok(raw.clone()),
            Some(LoadBehaviour::DecodeError(reason)) => Err(LoadError::Decode {
                path: image.path().to_path_buf(),
                reason: reason.clone(),
            }),
            Some(LoadBehaviour::Panic) => panic!("loader exploded on {image}"),
            None => Err(LoadError::NotFound {
                path: image.path().to_path_buf(),
            }),
        }
    }
}

/// `EventSink` that records every event.
pub struct MockEventSink {
    events: Mutex<Vec<RunEvent>>,
    changed: Condvar,
}

impl MockEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            changed: Condvar::new(),
        }
    }

    /// All events received so far, in order.
    #[must_use]
    pub fn events(&self) -> Vec<RunEvent> {
        lock(&self.events).clone()
    }

    /// The `Progress` events received so far.
    #[must_use]
    pub fn progress(&self) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RunEvent::Progress(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Item outcomes received so far, with their batch positions.
    #[must_use]
    pub fn outcomes(&self) -> Vec<(usize, DetectionOutcome)> {
        self.events().iter().filter_map(RunEvent::outcome).collect()
    }

    /// Number of terminal events received.
    #[must_use]
    pub fn terminal_count(&self) -> usize {
        lock(&self.events).iter().filter(|e| e.is_terminal()).count()
    }

    /// The first terminal event, if one arrived.
    #[must_use]
    pub fn terminal(&self) -> Option<RunEvent> {
        lock(&self.events).iter().find(|e| e.is_terminal()).cloned()
    }

    /// Blocks until a terminal event arrives or `timeout` elapses.
    pub fn wait_for_terminal(&self, timeout: Duration) -> Option<RunEvent> {
        let (events, _) = self
            .changed
            .wait_timeout_while(lock(&self.events), timeout, |events| {
                !events.iter().any(RunEvent::is_terminal)
            })
            .unwrap_or_else(PoisonError::into_inner);
        events.iter().find(|e| e.is_terminal()).cloned()
    }
}

impl Default for MockEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for MockEventSink {
    fn on_event(&self, event: RunEvent) {
        lock(&self.events).push(event);
        self.changed.notify_all();
    }
}

/// Mock implementation of `ResultOutput` for testing.
///
/// Captures outcomes for later assertions.
pub struct MockResultOutput {
    outcomes: Mutex<Vec<DetectionOutcome>>,
    flush_count: AtomicUsize,
}

impl MockResultOutput {
    /// Creates a new mock output.
    #[must_use]
    pub fn new() -> Self {
        Self {
            outcomes: Mutex::new(Vec::new()),
            flush_count: AtomicUsize::new(0),
        }
    }

    /// Returns all captured outcomes.
    #[must_use]
    pub fn outcomes(&self) -> Vec<DetectionOutcome> {
        lock(&self.outcomes).clone()
    }

    /// Returns the number of times `flush()` was called.
    #[must_use]
    pub fn flush_count(&self) -> usize {
        self.flush_count.load(Ordering::SeqCst)
    }
}

impl Default for MockResultOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultOutput for MockResultOutput {
    fn write(&self, outcome: &DetectionOutcome) -> anyhow::Result<()> {
        lock(&self.outcomes).push(outcome.clone());
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        self.flush_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::sync::Arc;
    use std::thread;
    use wmdetect_core::{BatchSummary, Classification};

    fn blank() -> RgbImage {
        RgbImage::new(4, 4)
    }

    #[test]
    fn test_scripted_classifier_sequence_then_fallback() {
        let classifier = ScriptedClassifier::sequence([
            ScriptedResponse::Predict(Label::Watermarked, 0.9),
            ScriptedResponse::Fail("boom".into()),
        ]);

        let first = classifier.classify(&blank()).unwrap();
        assert_eq!(first.label, Label::Watermarked);
        assert!(classifier.classify(&blank()).is_err());
        assert_eq!(classifier.classify(&blank()).unwrap().label, Label::Clean);
        assert_eq!(classifier.call_count(), 3);
    }

    #[test]
    fn test_mock_loader_unknown_path_not_found() {
        let loader = MockImageLoader::new().with_image("known.png", blank());

        assert!(loader.load(&ImageRef::new("known.png")).is_ok());
        assert!(matches!(
            loader.load(&ImageRef::new("other.png")),
            Err(LoadError::NotFound { .. })
        ));
        assert_eq!(loader.loads().len(), 2);
    }

    #[test]
    fn test_gated_classifier_blocks_until_released() {
        let classifier = Arc::new(GatedClassifier::new(Label::Clean, 0.6));
        let worker = {
            let classifier = Arc::clone(&classifier);
            thread::spawn(move || classifier.classify(&blank()).unwrap())
        };

        assert!(classifier.wait_until_started(1, Duration::from_secs(5)));
        assert!(!worker.is_finished());
        classifier.release(1);

        let prediction = worker.join().unwrap();
        assert_eq!(prediction.label, Label::Clean);
    }

    #[test]
    fn test_mock_event_sink_terminal() {
        let sink = MockEventSink::new();
        sink.on_event(RunEvent::ItemResult {
            index: 0,
            result: Classification {
                image: ImageRef::new("a.png"),
                label: Label::Clean,
                confidence: 0.8,
            },
        });
        assert!(sink.terminal().is_none());

        sink.on_event(RunEvent::Completed {
            summary: BatchSummary::default(),
        });
        assert_eq!(sink.outcomes().len(), 1);
        assert_eq!(sink.terminal_count(), 1);
        assert!(sink.wait_for_terminal(Duration::from_millis(10)).is_some());
    }

    #[test]
    fn test_mock_result_output() {
        let output = MockResultOutput::new();
        let outcome = DetectionOutcome::Classified(Classification {
            image: ImageRef::new("test.jpg"),
            label: Label::Watermarked,
            confidence: 0.75,
        });

        output.write(&outcome).unwrap();
        output.flush().unwrap();

        assert_eq!(output.outcomes(), vec![outcome]);
        assert_eq!(output.flush_count(), 1);
    }
}
