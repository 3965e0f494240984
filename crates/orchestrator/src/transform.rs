//! Pluggable stage logic

use async_trait::async_trait;
use spark_errors::TransformFailure;
use spark_types::{Payload, TransformerName};
use std::fmt;
use std::sync::Arc;

/// Stage logic invoked by the sequencer.
///
/// Implementations receive the previous stage's payload (or the fragment's
/// raw content for the first stage) and return the payload for the next.
#[async_trait]
pub trait Transform: Send + Sync {
    async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure>;
}

/// Transform backed by a synchronous closure
pub struct FnTransform<F> {
    f: F,
}

#[async_trait]
impl<F> Transform for FnTransform<F>
where
    F: Fn(&Payload) -> Result<Payload, TransformFailure> + Send + Sync,
{
    async fn apply(&self, input: &Payload) -> Result<Payload, TransformFailure> {
        (self.f)(input)
    }
}

/// Wrap a closure as a shareable transform
#[must_use]
pub fn from_fn<F>(f: F) -> Arc<dyn Transform>
where
    F: Fn(&Payload) -> Result<Payload, TransformFailure> + Send + Sync + 'static,
{
    Arc::new(FnTransform { f })
}

/// A transform bound to its unique name in the chain
#[derive(Clone)]
pub struct NamedTransform {
    pub name: TransformerName,
    pub transform: Arc<dyn Transform>,
}

impl NamedTransform {
    #[must_use]
    pub fn new(name: impl Into<TransformerName>, transform: Arc<dyn Transform>) -> Self {
        Self {
            name: name.into(),
            transform,
        }
    }
}

impl fmt::Debug for NamedTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NamedTransform")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
