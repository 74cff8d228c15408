use reflexrs_config::Config;
use reflexrs_core::{Pattern, PatternRepo};

use super::{open_store, print_detail};

#[derive(Debug, Clone)]
pub struct AddInput {
    pub trigger: String,
    pub response: String,
    pub project: Option<String>,
    pub tags: Vec<String>,
    pub space: Option<String>,
    pub strength: Option<f64>,
    pub threshold: Option<f64>,
    pub decay_rate: Option<f64>,
}

impl AddInput {
    fn into_pattern(self, default_space: Option<&str>) -> Pattern {
        let mut pattern = Pattern::new(self.trigger, self.response).with_tags(self.tags);
        if let Some(project) = self.project {
            pattern = pattern.with_project(project);
        }
        if let Some(space) = self.space.as_deref().or(default_space) {
            pattern = pattern.with_space(space);
        }
        if let Some(strength) = self.strength {
            pattern = pattern.with_strength(strength);
        }
        if let Some(threshold) = self.threshold {
            pattern = pattern.with_threshold(threshold);
        }
        if let Some(rate) = self.decay_rate {
            pattern = pattern.with_decay_rate(rate);
        }
        pattern
    }
}

/// Strategy for teaching a new trigger/response pattern.
#[derive(Debug, Clone, Copy)]
pub struct AddStrategy;

impl super::CommandStrategy for AddStrategy {
    type Input = AddInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let config = Config::load()?;
        let store = open_store(&config).await?;

        let pattern = input.into_pattern(config.reflex.default_space.as_deref());
        let stored = store.save(&pattern).await?;
        print_detail(&stored);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> AddInput {
        AddInput {
            trigger: "deploy".to_string(),
            response: "make ship".to_string(),
            project: None,
            tags: vec!["ops".to_string()],
            space: None,
            strength: None,
            threshold: Some(30.0),
            decay_rate: None,
        }
    }

    #[test]
    fn test_into_pattern_applies_overrides() {
        let pattern = input().into_pattern(None);
        assert_eq!(pattern.trigger, "deploy");
        assert_eq!(pattern.tags, vec!["ops".to_string()]);
        assert!((pattern.threshold - 30.0).abs() < f64::EPSILON);
        assert!((pattern.strength - 0.0).abs() < f64::EPSILON);
        assert_eq!(pattern.space_id, "global");
    }

    #[test]
    fn test_explicit_space_beats_default() {
        let pattern = input().into_pattern(Some("work"));
        assert_eq!(pattern.space_id, "work");

        let mut explicit = input();
        explicit.space = Some("home".to_string());
        assert_eq!(explicit.into_pattern(Some("work")).space_id, "home");
    }
}
