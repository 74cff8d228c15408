use std::time::Duration;

use anyhow::Context;
use reflexrs_config::Config;
use reflexrs_core::{PatternFilter, PatternRepo, SpaceRepo};
use tracing::info;

use super::open_store;

/// Strategy for applying time-based decay to every decay-enabled pattern.
///
/// The elapsed time is given in hours; 24 hours is one decay period.
#[derive(Debug, Clone, Copy)]
pub struct DecayStrategy;

impl super::CommandStrategy for DecayStrategy {
    type Input = f64;

    async fn execute(&self, hours: Self::Input) -> anyhow::Result<()> {
        let elapsed = hours_to_duration(hours)?;
        let config = Config::load()?;
        let store = open_store(&config).await?;

        info!("Decaying patterns by {hours}h");
        let changed = store.decay_all(elapsed).await?;
        println!("Decayed {changed} pattern(s)");
        Ok(())
    }
}

fn hours_to_duration(hours: f64) -> anyhow::Result<Duration> {
    Duration::try_from_secs_f64(hours * 3600.0)
        .with_context(|| format!("invalid decay window: {hours}h"))
}

/// Strategy for printing pattern totals and store counters.
#[derive(Debug, Clone, Copy)]
pub struct StatsStrategy;

impl super::CommandStrategy for StatsStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let store = open_store(&config).await?;

        let total = store.count_matching(&PatternFilter::new()).await?;
        println!("Patterns: {total}");

        for space in store.list_spaces().await? {
            let count = store
                .count_matching(&PatternFilter::new().space(space.id.clone()))
                .await?;
            println!("  {} ({}): {count}", space.name, space.id);
        }

        let strongest = store.top_by_strength(1).await?;
        if let Some(top) = strongest.first() {
            println!("Strongest: {} ({:.1})", top.trigger, top.strength);
        }
        println!();

        let stats = store.stats();
        println!("Store:");
        println!("  Reads: {}", stats.read_ops);
        println!("  Writes: {}", stats.write_ops);
        println!("  Lock Wait: {}ms", stats.lock_wait.as_millis());
        println!(
            "  Statements: {} hits, {} misses",
            stats.statement_hits, stats.statement_misses
        );
        match stats.cache {
            Some(cache) => println!(
                "  Cache: {} hits, {} misses ({:.0}%)",
                cache.hits,
                cache.misses,
                cache.hit_ratio * 100.0
            ),
            None => println!("  Cache: disabled"),
        }
        Ok(())
    }
}
