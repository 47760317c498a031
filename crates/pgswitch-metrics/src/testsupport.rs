//! Recording metric fakes shared by the in-crate tests.

use std::sync::Arc;

use parking_lot::Mutex;

use pgswitch_core::Result;

use crate::builder::CollectorBuilder;
use crate::collector::{Counter, Histogram, QueryCollector};

type BoxCounterFactory = Box<dyn Fn(&[String]) -> Result<Box<dyn Counter>> + Send + Sync>;
type BoxHistogramFactory = Box<dyn Fn(&[String]) -> Result<Box<dyn Histogram>> + Send + Sync>;

/// Captures every counter increment and histogram observation.
#[derive(Clone, Default)]
pub struct Recorder {
    pub counters: Arc<Mutex<Vec<Vec<String>>>>,
    pub observations: Arc<Mutex<Vec<f64>>>,
    pub logged: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn counter_labels(&self) -> Vec<Vec<String>> {
        self.counters.lock().clone()
    }

    pub fn observations(&self) -> Vec<f64> {
        self.observations.lock().clone()
    }

    /// How many queries were reported (one counter increment each).
    pub fn track_count(&self) -> usize {
        self.counters.lock().len()
    }

    pub fn counter_factory(&self) -> BoxCounterFactory {
        let sink = self.counters.clone();
        Box::new(move |labels: &[String]| {
            Ok(Box::new(RecordingCounter {
                labels: labels.to_vec(),
                sink: sink.clone(),
            }) as Box<dyn Counter>)
        })
    }

    pub fn histogram_factory(&self) -> BoxHistogramFactory {
        let sink = self.observations.clone();
        Box::new(move |_labels: &[String]| {
            Ok(Box::new(RecordingHistogram { sink: sink.clone() }) as Box<dyn Histogram>)
        })
    }
}

struct RecordingCounter {
    labels: Vec<String>,
    sink: Arc<Mutex<Vec<Vec<String>>>>,
}

impl Counter for RecordingCounter {
    fn inc(&self) {
        self.sink.lock().push(self.labels.clone());
    }
}

struct RecordingHistogram {
    sink: Arc<Mutex<Vec<f64>>>,
}

impl Histogram for RecordingHistogram {
    fn observe(&self, value: f64) {
        self.sink.lock().push(value);
    }
}

/// A collector wired to `recorder` with the default labeler and logger.
pub fn recording_collector(recorder: &Recorder) -> QueryCollector {
    CollectorBuilder::new()
        .query_per_second(recorder.counter_factory())
        .latency(recorder.histogram_factory())
        .build()
        .expect("both factories provided")
}
