//! Data models for milkbook

mod batch;
mod collection;
mod deduction;
mod id;

pub use batch::Batch;
pub use collection::{AlcoholTest, CollectionInput, CollectionRecord, Collector};
pub use deduction::{DeductionInput, DeductionRecord};
pub use id::{generate_id, IdGenerator, RecordId};
