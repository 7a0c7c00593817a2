pub mod frame_filter;
pub mod pipeline_logger;
