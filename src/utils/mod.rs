pub mod color;
pub mod exporter;
pub mod profiler;
pub mod rect;
pub mod vector;
