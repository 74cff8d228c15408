//! Read-side pattern commands plus delete and reinforce.

use reflexrs_config::Config;
use reflexrs_core::{PatternFilter, PatternRepo};

use super::{open_store, print_detail, print_rows};

#[derive(Debug, Clone)]
pub struct ListInput {
    pub space: Option<String>,
    pub project: Option<String>,
    pub min_strength: Option<f64>,
    pub limit: u64,
    pub offset: Option<u64>,
}

impl ListInput {
    fn filter(&self) -> PatternFilter {
        PatternFilter {
            space_id: self.space.clone(),
            project: self.project.clone(),
            min_strength: self.min_strength,
            limit: Some(self.limit),
            offset: self.offset,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SearchInput {
    pub query: String,
    pub space: Option<String>,
    pub limit: Option<u64>,
}

/// Which listing to print.
#[derive(Debug, Clone)]
pub enum PatternsView {
    List(ListInput),
    Search(SearchInput),
    Top(u64),
    Recent(u64),
}

/// Strategy for the listing commands: `list`, `search`, `top` and `recent`.
///
/// Active patterns are marked with `*`.
#[derive(Debug, Clone, Copy)]
pub struct PatternsStrategy;

impl super::CommandStrategy for PatternsStrategy {
    type Input = PatternsView;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let store = open_store(&config).await?;

        let patterns = match input {
            PatternsView::List(list) => {
                let filter = list.filter();
                let total = store
                    .count_matching(&PatternFilter {
                        limit: None,
                        offset: None,
                        ..filter.clone()
                    })
                    .await?;
                let page = store.list(&filter).await?;
                println!("{} of {total} patterns\n", page.len());
                page
            }
            PatternsView::Search(search) => {
                let filter = PatternFilter {
                    space_id: search.space,
                    limit: search.limit,
                    ..PatternFilter::default()
                };
                store.search_by_text(&search.query, &filter).await?
            }
            PatternsView::Top(limit) => store.top_by_strength(limit).await?,
            PatternsView::Recent(limit) => store.recently_used(limit).await?,
        };

        print_rows(&patterns);
        Ok(())
    }
}

/// Strategy for printing a single pattern.
#[derive(Debug, Clone, Copy)]
pub struct ShowStrategy;

impl super::CommandStrategy for ShowStrategy {
    type Input = String;

    async fn execute(&self, id: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let store = open_store(&config).await?;
        print_detail(&store.get(&id).await?);
        Ok(())
    }
}

/// Strategy for soft-deleting patterns. Several ids go through one batch.
#[derive(Debug, Clone, Copy)]
pub struct DeleteStrategy;

impl super::CommandStrategy for DeleteStrategy {
    type Input = Vec<String>;

    async fn execute(&self, ids: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let store = open_store(&config).await?;

        match ids.as_slice() {
            [id] => store.delete(id).await?,
            _ => store.delete_batch(&ids).await?,
        }
        println!("Deleted {} pattern(s)", ids.len());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ReinforceInput {
    pub id: String,
    pub amount: Option<f64>,
}

/// Strategy for manually reinforcing a pattern.
#[derive(Debug, Clone, Copy)]
pub struct ReinforceStrategy;

impl super::CommandStrategy for ReinforceStrategy {
    type Input = ReinforceInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let store = open_store(&config).await?;

        let amount = input.amount.unwrap_or(config.reflex.reinforce_amount);
        let pattern = store.reinforce(&input.id, amount).await?;
        println!(
            "{}: strength {:.1} ({})",
            pattern.id,
            pattern.strength,
            if pattern.is_active() { "active" } else { "inactive" }
        );
        Ok(())
    }
}
