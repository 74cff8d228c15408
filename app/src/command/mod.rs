//! Static strategy pattern for CLI commands.
//!
//! Each command is a zero-sized strategy type with its own input, dispatched
//! statically from `main`.

use std::sync::Arc;

use reflexrs_config::Config;
use reflexrs_core::Pattern;
use reflexrs_memory::PatternStore;
use tracing::info;

mod add;
mod ask;
mod info;
mod init;
mod maintenance;
mod matching;
mod patterns;
mod version;

pub use add::{AddInput, AddStrategy};
pub use ask::{AskInput, AskStrategy};
pub use info::InfoStrategy;
pub use init::InitStrategy;
pub use maintenance::{DecayStrategy, StatsStrategy};
pub use matching::{MatchInput, MatchStrategy};
pub use patterns::{
    DeleteStrategy, ListInput, PatternsStrategy, PatternsView, ReinforceInput, ReinforceStrategy,
    SearchInput, ShowStrategy,
};
pub use version::VersionStrategy;

/// Core trait defining the contract for all command strategies.
///
/// # Design Principles
/// - **Static dispatch**: All calls are monomorphized at compile time
/// - **Type safety**: Each strategy defines its own input type via associated type
pub trait CommandStrategy: Send + Sync + 'static {
    /// The input type this strategy accepts.
    type Input;

    /// Execute the command with the given input.
    ///
    /// # Errors
    /// Returns an error if command execution fails.
    async fn execute(&self, input: Self::Input) -> anyhow::Result<()>;
}

/// Open the configured pattern store.
async fn open_store(config: &Config) -> anyhow::Result<Arc<PatternStore>> {
    info!("Opening pattern store");
    let store = PatternStore::connect(&config.database, &config.cache).await?;
    Ok(Arc::new(store))
}

/// Cut `s` to at most `max_chars` characters, marking the cut with `...`.
fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

fn print_row(pattern: &Pattern) {
    let marker = if pattern.is_active() { '*' } else { ' ' };
    println!(
        "{marker} {}  {:>5.1}  {}  =>  {}",
        pattern.id,
        pattern.strength,
        truncate(&pattern.trigger, 40),
        truncate(&pattern.response, 40)
    );
}

fn print_rows(patterns: &[Pattern]) {
    if patterns.is_empty() {
        println!("(no patterns)");
        return;
    }
    for pattern in patterns {
        print_row(pattern);
    }
}

fn print_detail(pattern: &Pattern) {
    println!("ID:         {}", pattern.id);
    println!("Trigger:    {}", pattern.trigger);
    println!("Response:   {}", pattern.response);
    println!(
        "Strength:   {:.1} (threshold {:.1}, {})",
        pattern.strength,
        pattern.threshold,
        if pattern.is_active() { "active" } else { "inactive" }
    );
    if pattern.decay_enabled {
        println!("Decay:      {:.3}/day", pattern.decay_rate);
    } else {
        println!("Decay:      off");
    }
    println!(
        "Counts:     reinforced {}, decayed {}",
        pattern.reinforce_count, pattern.decay_count
    );
    println!("Space:      {}", pattern.space_id);
    if !pattern.project.is_empty() {
        println!("Project:    {}", pattern.project);
    }
    if !pattern.tags.is_empty() {
        println!("Tags:       {}", pattern.tags.join(", "));
    }
    if let Some(used) = pattern.last_used_at {
        println!("Last used:  {used}");
    }
    println!("Created:    {}", pattern.created_at);
    println!("Updated:    {}", pattern.updated_at);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_text() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("", 3), "");
    }

    #[test]
    fn test_truncate_counts_characters() {
        assert_eq!(truncate("abcdefghij", 8), "abcde...");
        assert_eq!(truncate("日本語のテキストです", 6), "日本語...");
    }
}
