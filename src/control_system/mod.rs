pub mod allocator;
pub mod intersection;
pub mod signal;
pub mod traffic_manager;
