pub mod migrate;
pub mod trackers;

pub use migrate::migrate_trackers;
pub use trackers::PgTrackerStore;
