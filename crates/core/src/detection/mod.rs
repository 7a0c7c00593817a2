pub mod detection;
pub mod landmarks;
pub mod raw_output;
