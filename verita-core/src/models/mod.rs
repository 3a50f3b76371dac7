pub mod evidence;
pub mod media;
pub mod record;

pub use evidence::{ClaimUnit, EvidenceHit};
pub use media::{MediaAsset, MediaKind};
pub use record::{FactCheckRecord, FactCheckStatus};
