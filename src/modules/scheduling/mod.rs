pub mod handlers;
pub mod routes;
mod service;

pub use service::{CreatedRequest, OverlapResponse, RequestView, SchedulingService, SlotDto, WindowDto};
