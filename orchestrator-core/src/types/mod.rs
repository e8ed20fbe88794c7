//! Common data types shared across the orchestration core (`SPEC_FULL.md` §3).

mod decision;
mod episode;
mod pattern;
mod snapshot;
mod strategy;
mod working_memory;

pub use decision::{
    ActiveSprintRecommendation, AdjustmentEvidence, AppliedDecision, ConfidenceScores, Decision,
    DecisionSource, IntelligenceAdjustment, IntelligenceAdjustments, IntelligenceMetadata,
    RecommendationKind, RuleBasedDecision,
};
pub use episode::{ActionRecord, Episode, EpisodeOutcome, Perception, Reasoning};
pub use pattern::{
    PatternAnalysis, SimilarProject, SuccessIndicators, TrendDirection, VelocityTrends,
};
pub use snapshot::{
    ActiveSprint, Conflict, DataQualityReport, ProjectAnalysisSnapshot, TeamAvailability,
    TeamAvailabilityStatus,
};
pub use strategy::{Strategy, StrategyLifecycle};
pub use working_memory::WorkingMemorySession;
