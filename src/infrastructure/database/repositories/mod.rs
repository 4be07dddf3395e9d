mod change_feed;
mod memory_match_repo;
mod sqlite_match_repo;

pub use change_feed::ChangeFeed;
pub use memory_match_repo::InMemoryMatchRepository;
pub use sqlite_match_repo::SqliteMatchRepository;
