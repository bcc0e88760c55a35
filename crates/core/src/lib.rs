pub mod config;
pub mod dataset;
pub mod error;
pub mod generate;
pub mod task;

pub use config::{ExperimentConfig, load_dotenv};
pub use dataset::{Chunk, Dataset, chunk_sum};
pub use error::CoreError;
pub use generate::{DatasetKind, generate};
pub use task::{Task, WorkProfile};
