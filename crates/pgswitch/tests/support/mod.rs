//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;

use pgswitch_core::testing::{FakeBackend, Journal};
use pgswitch::{Counter, DynPool, Histogram, Instance, QueryCollector, Result};

/// Captures counter increments and histogram observations.
#[derive(Clone, Default)]
pub struct Recorder {
    pub counters: Arc<Mutex<Vec<Vec<String>>>>,
    pub observations: Arc<Mutex<Vec<f64>>>,
}

impl Recorder {
    pub fn counter_labels(&self) -> Vec<Vec<String>> {
        self.counters.lock().clone()
    }

    pub fn track_count(&self) -> usize {
        self.counters.lock().len()
    }

    pub fn collector(&self) -> QueryCollector {
        let counters = self.counters.clone();
        let observations = self.observations.clone();
        pgswitch::CollectorBuilder::new()
            .query_per_second(move |labels: &[String]| {
                Ok(Box::new(RecordingCounter {
                    labels: labels.to_vec(),
                    sink: counters.clone(),
                }) as Box<dyn Counter>)
            })
            .latency(move |_labels: &[String]| {
                Ok(Box::new(RecordingHistogram {
                    sink: observations.clone(),
                }) as Box<dyn Histogram>)
            })
            .build()
            .expect("both factories provided")
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

/// A single-pool instance over a recording backend.
pub fn single(journal: &Journal, name: &str) -> (DynPool, Arc<FakeBackend>) {
    let backend = Arc::new(FakeBackend::new(journal.clone(), name));
    let pool: DynPool = Arc::new(Instance::new(backend.clone()));
    (pool, backend)
}

/// Shorthand for constructor closures in builder calls.
pub fn ctor(pool: DynPool) -> impl FnOnce() -> Result<DynPool> + Send + 'static {
    move || Ok(pool)
}
