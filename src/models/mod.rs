pub mod batch_snapshot;
pub mod batch_status;
pub mod packaging;
pub mod requisition_status;

pub use batch_snapshot::{BatchSnapshot, SNAPSHOT_VERSION};
pub use batch_status::BatchStatus;
pub use packaging::{classify_packaging, PackagingType, DEFAULT_SLOT_COST};
pub use requisition_status::RequisitionStatus;
