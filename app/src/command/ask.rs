use reflexrs_config::Config;
use reflexrs_core::{ReflexLoop, ReplySource};
use reflexrs_providers::ZhipuProvider;
use tracing::info;

use super::open_store;

/// Input parameters for the Ask command strategy.
#[derive(Debug, Clone)]
pub struct AskInput {
    /// Optional single message to send (non-interactive mode)
    pub message: Option<String>,
    /// Optional model override
    pub model: Option<String>,
}

/// Strategy for answering input through the reflex loop.
///
/// Stored patterns answer first; the Zhipu provider is only called when no
/// active pattern matches.
///
/// # Design
/// - Static dispatch: All method calls are monomorphized
/// - Stateless: Strategy holds no internal state, all input via `AskInput`
#[derive(Debug, Clone, Copy)]
pub struct AskStrategy;

impl super::CommandStrategy for AskStrategy {
    type Input = AskInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;

        let provider = ZhipuProvider::new(config.providers.zhipu.api_key.clone());
        let store = open_store(&config).await?;

        let mut reflex_config = config.reflex_config();
        if let Some(model) = input.model {
            reflex_config.generate.model = model;
        }
        info!("Using model {}", reflex_config.generate.model);

        let reflex = ReflexLoop::new(provider, store, reflex_config);

        match input.message {
            Some(msg) => {
                let reply = reflex.respond(&msg).await?;
                match &reply.source {
                    ReplySource::Reflex {
                        pattern_id,
                        branch,
                        confidence,
                    } => info!("Reflex {pattern_id} fired ({branch}, {confidence:.1})"),
                    ReplySource::Generated { learned, .. } => {
                        if let Some(id) = learned {
                            info!("Generated reply, learned pattern {id}");
                        }
                    }
                }
                println!("{}", reply.text);
            }
            None => {
                reflex.run_interactive().await?;
            }
        }

        Ok(())
    }
}
