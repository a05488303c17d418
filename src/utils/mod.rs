pub mod image_ops;
pub mod metrics;

// Re-export commonly used items
pub use image_ops::{normalize_to_jpeg, normalize_to_jpeg_async};
pub use metrics::Metrics;
