use std::sync::Arc;

use opentelemetry::{metrics::Counter, KeyValue};

/// A counter which always reports the same attribute set.
#[derive(Debug, Clone)]
pub struct AttributedCounter<T> {
    pub inner: Counter<T>,

    pub attributes: Arc<[KeyValue]>,
}

impl<T> AttributedCounter<T> {
    pub fn add(&self, value: T) {
        self.inner.add(value, &self.attributes);
    }
}

pub trait WithAttributes<T> {
    fn with_attributes(self, attributes: impl IntoIterator<Item = KeyValue>)
        -> AttributedCounter<T>;
}

impl<T> WithAttributes<T> for Counter<T> {
    fn with_attributes(
        self,
        attributes: impl IntoIterator<Item = KeyValue>,
    ) -> AttributedCounter<T> {
        AttributedCounter {
            inner: self,
            attributes: attributes.into_iter().collect(),
        }
    }
}
