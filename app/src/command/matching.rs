use reflexrs_config::Config;
use reflexrs_core::{PatternFilter, PatternRepo, match_patterns};

use super::{open_store, truncate};

#[derive(Debug, Clone)]
pub struct MatchInput {
    pub text: String,
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
}

/// Strategy for ranking stored patterns against a piece of text.
///
/// Only reads: nothing is reinforced and no reply is produced.
#[derive(Debug, Clone, Copy)]
pub struct MatchStrategy;

impl super::CommandStrategy for MatchStrategy {
    type Input = MatchInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let store = open_store(&config).await?;

        let mut options = config.matching.clone();
        if let Some(threshold) = input.threshold {
            options = options.with_threshold(threshold);
        }
        if let Some(limit) = input.limit {
            options = options.with_limit(limit);
        }

        let filter = PatternFilter {
            space_id: config.reflex.default_space.clone(),
            limit: Some(config.reflex.candidate_limit),
            ..PatternFilter::default()
        };
        let candidates = store.list(&filter).await?;
        let results = match_patterns(&input.text, &candidates, &options);

        if results.is_empty() {
            println!("(no match)");
            return Ok(());
        }
        for result in results {
            println!(
                "{:>5.1}  {:<7}  {}{}  {}  =>  {}",
                result.confidence,
                result.branch.as_str(),
                if result.pattern.is_active() { '*' } else { ' ' },
                result.pattern.id,
                truncate(&result.pattern.trigger, 40),
                truncate(&result.pattern.response, 40)
            );
        }
        Ok(())
    }
}
