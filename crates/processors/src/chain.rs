//! Processor chain - sequential batch processing

use ferry_core::Batch;

use crate::{Processor, ProcessorResult};

/// Processors applied in order
///
/// Every batch a processor emits is fed to the next one. The first error
/// stops the chain.
pub struct Chain {
    processors: Vec<Box<dyn Processor>>,
}

impl Chain {
    /// Create a chain
    pub fn new(processors: Vec<Box<dyn Processor>>) -> Self {
        Self { processors }
    }

    /// Create an empty chain (no-op)
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Number of processors
    #[inline]
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Whether the chain has no processors
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }

    /// Names of the processors, in order
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Run a batch through every processor
    pub async fn process(&self, batch: Batch) -> ProcessorResult<Vec<Batch>> {
        let mut current = vec![batch];
        for processor in &self.processors {
            let mut next = Vec::with_capacity(current.len());
            for batch in current {
                next.extend(processor.process(batch).await?);
            }
            if next.is_empty() {
                return Ok(next);
            }
            current = next;
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ferry_core::Part;

    use crate::ProcessorError;

    /// Splits every part into its own batch
    struct Split;

    #[async_trait]
    impl Processor for Split {
        async fn process(&self, batch: Batch) -> ProcessorResult<Vec<Batch>> {
            Ok(batch.into_parts().into_iter().map(Batch::single).collect())
        }

        fn name(&self) -> &'static str {
            "split"
        }
    }

    /// Drops batches whose first part is "drop"
    struct DropMarked;

    #[async_trait]
    impl Processor for DropMarked {
        async fn process(&self, batch: Batch) -> ProcessorResult<Vec<Batch>> {
            match batch.get(0) {
                Some(part) if part.data().as_ref() == b"drop" => Ok(Vec::new()),
                _ => Ok(vec![batch]),
            }
        }

        fn name(&self) -> &'static str {
            "drop_marked"
        }
    }

    struct Fail;

    #[async_trait]
    impl Processor for Fail {
        async fn process(&self, _batch: Batch) -> ProcessorResult<Vec<Batch>> {
            Err(ProcessorError::failed("broken"))
        }

        fn name(&self) -> &'static str {
            "fail"
        }
    }

    #[tokio::test]
    async fn test_empty_chain_passes_through() {
        let chain = Chain::empty();
        let out = chain.process(Batch::single("a")).await.unwrap();
        assert_eq!(out, vec![Batch::single("a")]);
    }

    #[tokio::test]
    async fn test_outputs_feed_next_processor() {
        let chain = Chain::new(vec![Box::new(Split), Box::new(DropMarked)]);
        assert_eq!(chain.names(), vec!["split", "drop_marked"]);

        let batch = Batch::new(vec![Part::from("a"), Part::from("drop"), Part::from("b")]);
        let out = chain.process(batch).await.unwrap();
        assert_eq!(out, vec![Batch::single("a"), Batch::single("b")]);
    }

    #[tokio::test]
    async fn test_empty_result_short_circuits() {
        let chain = Chain::new(vec![Box::new(DropMarked), Box::new(Fail)]);
        let out = chain.process(Batch::single("drop")).await.unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_error_stops_chain() {
        let chain = Chain::new(vec![Box::new(Fail), Box::new(Split)]);
        let err = chain.process(Batch::single("x")).await.unwrap_err();
        assert_eq!(err.to_string(), "processing failed: broken");
    }
}
