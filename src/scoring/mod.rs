pub mod badge;
pub mod progress;
pub mod engine;
pub mod store;

pub use badge::{BadgeTier, BadgeTierTable, category_badge_name, CATEGORY_BADGE_THRESHOLD};
pub use progress::{CategoryCounts, PlasticBadges, ProgressReport, UserProgress};
pub use engine::{ScoringEngine, POINTS_PER_ITEM};
pub use store::{LeaderboardEntry, MemoryProgressStore, ProgressStore, ScoringService, Versioned};
