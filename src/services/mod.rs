pub mod acquisition;
pub use acquisition::{Acquisition, AcquisitionFailure, AcquisitionSettings, Partial};

pub mod anticipated;
pub use anticipated::{AnticipatedService, SeasonQuery};

pub mod overrides;
pub use overrides::{ManualOverrideEntry, OverrideIssue, OverrideRegistry};

pub mod ranking;
pub use ranking::{OverrideFailure, RankingEngine, RankingError, RankingSettings, WeekRanking};
