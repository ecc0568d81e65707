//! Timeline scheduling for trip itineraries.
//!
//! A [`TimelineStore`] keeps scheduled activities ordered by date and start
//! time, refuses double bookings within a day, suggests the next free slot
//! and derives budget and time [`Totals`]. Activities come from a
//! [`Catalog`] that is fed by JSON batches ([`feed`]); [`script`] replays
//! JSON-lines operation files against a store.

pub mod catalog;
pub mod clock;
pub mod error;
pub mod feed;
pub mod paths;
pub mod script;
pub mod settings;
pub mod timeline;
pub mod totals;

pub use catalog::{Catalog, CatalogActivity, IngestReport};
pub use error::{PlanError, PlanResult};
pub use settings::PlannerSettings;
pub use timeline::{EntryPatch, SubscriptionId, TimelineEntry, TimelineEvent, TimelineStore};
pub use totals::Totals;
