pub mod cache_entries;

pub mod prelude {
    pub use super::cache_entries::Entity as CacheEntries;
}
