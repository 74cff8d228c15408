mod schema;

pub use schema::{
    AgentDefaults, AgentsConfig, CONFIG_DIR_NAME, Config, ProviderConfig, ProvidersConfig,
    ReflexSettings,
};
