//! Service layer
//!
//! Reciprocity aggregation, slot selection, slot exclusivity, the
//! network ranking and visit recording. Services receive their stores through constructors
//! and are shared behind `Arc`.

pub mod exclusivity;
pub mod ranking;
pub mod reciprocity;
pub mod slot_selector;
pub mod visits;

pub use exclusivity::SlotExclusivityEnforcer;
pub use ranking::{RankingEntry, RankingService, SHUFFLE_POOL_SIZE};
pub use reciprocity::ReciprocityAggregator;
pub use slot_selector::{FeedSource, MAX_FEED_SITES_PER_SLOT, SlotSelector, merge_feed_items};
pub use visits::VisitRecorder;
