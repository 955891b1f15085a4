use crate::db::Store;

pub async fn cmd_cache_clear(store: &Store, key: Option<&str>) -> anyhow::Result<()> {
    let removed = store.cache_clear(key).await?;

    match key {
        Some(key) if removed == 0 => println!("No cache entry named {key}."),
        Some(key) => println!("Removed cache entry {key}."),
        None => {
            let remaining = store.cache_len().await?;
            println!("Removed {removed} cache entries ({remaining} left outside the namespace).");
        }
    }

    Ok(())
}

pub async fn cmd_cache_clear_all(store: &Store) -> anyhow::Result<()> {
    let removed = store.cache_clear_all().await?;
    println!("Cache wiped ({removed} entries).");
    Ok(())
}
