pub mod candidate_pool;
pub mod identity_tracker;
