pub mod batches;
pub mod packaging;
pub mod requisitions;

pub use batches::BatchService;
pub use packaging::PackagingService;
pub use requisitions::RequisitionService;
