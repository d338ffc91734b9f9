pub mod enrichment;
pub mod etl;
pub mod pacing;
pub mod pipeline;
pub mod table_io;

pub use crate::domain::model::{Record, Table, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage, TextGenerator};
pub use crate::utils::error::Result;
