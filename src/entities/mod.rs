pub mod delivery_batch;
pub mod driver;
pub mod requisition;
pub mod requisition_item;
pub mod requisition_packaging;
pub mod requisition_packaging_item;
pub mod slot_cost_config;
pub mod vehicle;
