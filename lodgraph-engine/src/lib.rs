pub mod command;
pub mod detail;
pub mod mode;
pub mod scene;
pub mod segment;

pub mod errors {
    use lodgraph_core::errors::ShapeError;
    use thiserror::Error;

    use crate::segment::SegmentError;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("segment table is not initialized")]
        SegmentNotInitialized,
        #[error("no window segment for layer {0}")]
        MissingSegment(u32),
        #[error("invalid window segment for layer {layer}: {source}")]
        InvalidSegment {
            layer: u32,
            #[source]
            source: SegmentError,
        },
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("invalid node: {0}")]
        InvalidNode(String),
        #[error(transparent)]
        Shape(#[from] ShapeError),
    }
}
