//! Database statistics.
//!
//! A quick summary of what the dashboard can see: users, engagements,
//! conversations, messages, and guardian links. Used by `convo stats` and
//! `GET /api/stats`.

use anyhow::Result;

use convo_inspector_core::store::DashboardStore;

use crate::config::Config;
use crate::sqlite_store;

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let store = sqlite_store::open(config).await?;
    let stats = store.stats().await;
    store.pool().close().await;
    let stats = stats?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Convo Inspector: Database Stats");
    println!("================================");
    println!();
    println!("  Database:       {}", config.db.path.display());
    println!("  Size:           {}", format_bytes(db_size));
    println!();
    println!("  Users:          {}", stats.users);
    println!("  Guardian links: {}", stats.guardian_links);
    println!("  Engagements:    {}", stats.engagements);
    println!("  Conversations:  {}", stats.conversations);
    println!("  Messages:       {}", stats.messages);
    println!();

    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }
}
