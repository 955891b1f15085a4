pub mod anime;
pub mod ranking;

pub use anime::{Page, Pagination, RemoteEpisode, RemoteTitle};
pub use ranking::{AnticipatedAnime, RankedEpisode};
