pub mod edge;
pub mod grouping;
pub mod kelly;
pub mod lifecycle;
pub mod markets;
pub mod poisson;
pub mod probability;
pub mod quotes;
pub mod ratings;

pub use edge::{EdgeAssessment, Signal, Verdict};
pub use kelly::StakePlan;
pub use lifecycle::Lifecycle;
pub use probability::ProbabilityModel;
pub use quotes::MarketQuoteBook;
