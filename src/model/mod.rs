pub mod acquisition;
pub mod cohort;
pub mod kind;
pub mod loader;
pub mod slots;
pub mod tags;

pub use acquisition::{AcquisitionRecord, CtTechnique, LabelTags, Modality, PlanLinkage};
pub use cohort::{build_cohorts, Cohort, CohortKey};
pub use kind::TestKind;
pub use slots::{ImageSlot, SegmentSlot, SlotMap};
