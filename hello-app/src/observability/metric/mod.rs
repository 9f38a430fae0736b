use opentelemetry::{
    metrics::{Meter, ObservableGauge},
    KeyValue,
};

use self::counter::{AttributedCounter, WithAttributes as _};

pub mod counter;
pub mod heap;
pub mod instance;

const METRIC_PREFIX: &str = "custom.metric.";

pub const NUMBER_OF_EXEC_NAME: &str = const_format::concatcp!(METRIC_PREFIX, "number.of.exec");
pub const NUMBER_OF_EXEC_DESC: &str = "Count the number of executions.";

pub const HEAP_MEMORY_NAME: &str = const_format::concatcp!(METRIC_PREFIX, "heap.memory");
pub const HEAP_MEMORY_DESC: &str = "Reports heap memory utilization.";

/// Instruments living as long as the process.
#[derive(Debug)]
pub struct HelloMetrics {
    number_of_exec: AttributedCounter<u64>,
    // Keeps the registered callback alive.
    _heap_memory: ObservableGauge<u64>,
}

impl HelloMetrics {
    pub fn new(meter: &Meter) -> Self {
        let number_of_exec = meter
            .u64_counter(NUMBER_OF_EXEC_NAME)
            .with_description(NUMBER_OF_EXEC_DESC)
            .build()
            .with_attributes([KeyValue::new(NUMBER_OF_EXEC_NAME, NUMBER_OF_EXEC_DESC)]);

        let heap_memory = meter
            .u64_observable_gauge(HEAP_MEMORY_NAME)
            .with_description(HEAP_MEMORY_DESC)
            .with_unit("By")
            .with_callback(|observer| {
                observer.observe(
                    heap::heap_allocated_bytes(),
                    &[KeyValue::new(HEAP_MEMORY_NAME, HEAP_MEMORY_DESC)],
                )
            })
            .build();

        Self {
            number_of_exec,
            _heap_memory: heap_memory,
        }
    }

    pub fn record_execution(&self) {
        self.number_of_exec.add(1);
    }
}
