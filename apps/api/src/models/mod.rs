pub mod candidate;
pub mod requirement;
pub mod shortlist;

pub use candidate::CandidateRecord;
pub use requirement::Requirement;
pub use shortlist::{
    Exclusion, MatchResult, MatchStage, MatchedCandidate, RankedCandidate, ScoreBreakdown,
};
