// Module declarations
pub mod core;
pub mod models;

// Re-export the main pipeline surface
pub use crate::core::record::{
    FileRecordStore, MatrixData, MemoryRecordStore, RecordKey, RecordStore, SideChannelRecord,
};
pub use crate::core::watermark::{WatermarkEmbedder, WatermarkExtractor};
pub use crate::models::{ChaosParams, PipelineConfig, WatermarkError};
