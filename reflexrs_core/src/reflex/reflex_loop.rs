//! Reflex loop: answer from stored patterns, fall back to generation.

use std::io::Write;
use std::sync::{Arc, atomic::AtomicBool};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::matching::{Branch, MatchOptions, match_patterns};
use crate::{GenerateOptions, LLMProvider, LLMResponse, Pattern, PatternFilter, PatternRepo, Usage};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReflexConfig {
    /// Strength added to a pattern each time it fires.
    #[serde(default = "default_reinforce_amount")]
    pub reinforce_amount: f64,
    /// Space candidates are drawn from. `None` searches every space.
    #[serde(default)]
    pub space_id: Option<String>,
    /// Upper bound on candidates loaded per input.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: u64,
    /// Save generated replies as new (inactive) patterns.
    #[serde(default)]
    pub learn_generated: bool,
    #[serde(default)]
    pub matching: MatchOptions,
    #[serde(default)]
    pub generate: GenerateOptions,
}

const fn default_reinforce_amount() -> f64 {
    10.0
}
const fn default_candidate_limit() -> u64 {
    1000
}

impl Default for ReflexConfig {
    fn default() -> Self {
        Self {
            reinforce_amount: default_reinforce_amount(),
            space_id: None,
            candidate_limit: default_candidate_limit(),
            learn_generated: false,
            matching: MatchOptions::default(),
            generate: GenerateOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReplySource {
    /// An active pattern fired.
    Reflex {
        pattern_id: String,
        branch: Branch,
        confidence: f64,
    },
    /// No active pattern qualified; the provider answered.
    Generated {
        usage: Option<Usage>,
        /// Id of the pattern saved or reinforced for this input, if any.
        learned: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Reply {
    pub text: String,
    pub source: ReplySource,
}

pub struct ReflexLoop<P = Arc<dyn LLMProvider>, R = Arc<dyn PatternRepo>>
where
    P: Send + Sync,
    R: Send + Sync,
{
    provider: P,
    repo: R,
    config: ReflexConfig,
    running: Arc<AtomicBool>,
}

impl<P, R> ReflexLoop<P, R>
where
    P: LLMProvider + Send + Sync,
    R: PatternRepo + Send + Sync,
{
    pub fn new(provider: P, repo: R, config: ReflexConfig) -> Self {
        Self {
            provider,
            repo,
            config,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub const fn config(&self) -> &ReflexConfig {
        &self.config
    }

    pub async fn run_interactive(&self) -> anyhow::Result<()> {
        println!("reflexrs started. Type 'exit' to quit.\n");

        while self.running.load(std::sync::atomic::Ordering::Relaxed) {
            print!("> ");
            std::io::stdout().flush()?;

            let mut input = String::new();
            if std::io::stdin().read_line(&mut input)? == 0 {
                break;
            }
            let input = input.trim();

            if input == "exit" {
                break;
            }

            if input.is_empty() {
                continue;
            }

            match self.respond(input).await {
                Ok(reply) => println!("\n{}\n", reply.text),
                Err(e) => eprintln!("Error: {e}"),
            }
        }

        Ok(())
    }

    /// Answer `input`.
    ///
    /// The best match fires only when its pattern is active. A matched but
    /// inactive exact trigger is reinforced instead, so repeated inputs work
    /// their way up to auto-firing.
    pub async fn respond(&self, input: &str) -> anyhow::Result<Reply> {
        let input = input.trim();
        if input.is_empty() {
            anyhow::bail!("input must not be empty");
        }

        let candidates = self.candidates().await?;
        let options = self.config.matching.clone().with_limit(1);
        let top = match_patterns(input, &candidates, &options).into_iter().next();

        let mut pending_exact: Option<String> = None;
        if let Some(hit) = top {
            if hit.pattern.is_active() {
                info!(
                    "Reflex fired: pattern={} branch={} confidence={:.1}",
                    hit.pattern.id, hit.branch, hit.confidence
                );
                let text = hit.pattern.response.clone();
                let source = ReplySource::Reflex {
                    pattern_id: hit.pattern.id.clone(),
                    branch: hit.branch,
                    confidence: hit.confidence,
                };
                self.reinforce(&hit.pattern.id).await;
                return Ok(Reply { text, source });
            }
            debug!(
                "Best match {} below its threshold (strength={:.1}, threshold={:.1})",
                hit.pattern.id, hit.pattern.strength, hit.pattern.threshold
            );
            if hit.branch == Branch::Exact {
                pending_exact = Some(hit.pattern.id.clone());
            }
        }

        info!("No active pattern for input, falling back to provider");
        let response = self.provider.generate(input, &self.config.generate).await?;

        let learned = if let Some(id) = pending_exact {
            self.reinforce(&id).await;
            Some(id)
        } else if self.config.learn_generated {
            self.learn(input, &response).await
        } else {
            None
        };

        Ok(Reply {
            text: response.content,
            source: ReplySource::Generated {
                usage: response.usage,
                learned,
            },
        })
    }

    async fn candidates(&self) -> anyhow::Result<Vec<Pattern>> {
        let mut filter = PatternFilter::new().limit(self.config.candidate_limit);
        if let Some(space) = &self.config.space_id {
            filter = filter.space(space.clone());
        }
        let candidates = self.repo.list(&filter).await?;
        debug!("Loaded {} candidate patterns", candidates.len());
        Ok(candidates)
    }

    async fn reinforce(&self, id: &str) {
        match self.repo.reinforce(id, self.config.reinforce_amount).await {
            Ok(p) => debug!("Reinforced {} to strength {:.1}", p.id, p.strength),
            Err(e) => warn!("Failed to reinforce pattern {id}: {e}"),
        }
    }

    async fn learn(&self, input: &str, response: &LLMResponse) -> Option<String> {
        let mut pattern = Pattern::new(input, response.content.clone());
        if let Some(space) = &self.config.space_id {
            pattern = pattern.with_space(space.clone());
        }
        match self.repo.save(&pattern).await {
            Ok(saved) => {
                info!("Learned new pattern {} from generated reply", saved.id);
                Some(saved.id)
            }
            Err(e) => {
                warn!("Failed to learn pattern from generated reply: {e}");
                None
            }
        }
    }
}
