use reflexrs_core::{Note, Pattern, Space};
use reflexrs_entities::{notes, patterns, spaces};
use sea_orm::{JsonValue, Set};

fn json_to_strings(val: &JsonValue) -> Vec<String> {
    val.as_array()
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default()
}

pub fn strings_to_json(items: &[String]) -> JsonValue {
    JsonValue::Array(items.iter().map(|s| JsonValue::from(s.as_str())).collect())
}

pub fn pattern_from_model(m: patterns::Model) -> Pattern {
    Pattern {
        tags: json_to_strings(&m.tags),
        connections: json_to_strings(&m.connections),
        id: m.id,
        trigger: m.trigger,
        response: m.response,
        strength: m.strength,
        threshold: m.threshold,
        decay_rate: m.decay_rate,
        decay_enabled: m.decay_enabled,
        reinforce_count: m.reinforce_count,
        decay_count: m.decay_count,
        last_used_at: m.last_used_at,
        project: m.project,
        space_id: m.space_id,
        user_id: m.user_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
        deleted_at: m.deleted_at,
    }
}

pub fn pattern_to_active(p: &Pattern) -> patterns::ActiveModel {
    patterns::ActiveModel {
        id: Set(p.id.clone()),
        trigger: Set(p.trigger.clone()),
        response: Set(p.response.clone()),
        strength: Set(p.strength),
        threshold: Set(p.threshold),
        decay_rate: Set(p.decay_rate),
        decay_enabled: Set(p.decay_enabled),
        reinforce_count: Set(p.reinforce_count),
        decay_count: Set(p.decay_count),
        last_used_at: Set(p.last_used_at),
        project: Set(p.project.clone()),
        tags: Set(strings_to_json(&p.tags)),
        connections: Set(strings_to_json(&p.connections)),
        space_id: Set(p.space_id.clone()),
        user_id: Set(p.user_id.clone()),
        created_at: Set(p.created_at),
        updated_at: Set(p.updated_at),
        deleted_at: Set(p.deleted_at),
    }
}

pub fn space_from_model(m: spaces::Model) -> Space {
    Space {
        id: m.id,
        name: m.name,
        description: m.description,
        created_at: m.created_at,
        updated_at: m.updated_at,
        deleted_at: m.deleted_at,
    }
}

pub fn space_to_active(s: &Space) -> spaces::ActiveModel {
    spaces::ActiveModel {
        id: Set(s.id.clone()),
        name: Set(s.name.clone()),
        description: Set(s.description.clone()),
        created_at: Set(s.created_at),
        updated_at: Set(s.updated_at),
        deleted_at: Set(s.deleted_at),
    }
}

pub fn note_from_model(m: notes::Model) -> Note {
    Note {
        tags: json_to_strings(&m.tags),
        id: m.id,
        space_id: m.space_id,
        pattern_id: m.pattern_id,
        title: m.title,
        content: m.content,
        created_at: m.created_at,
        updated_at: m.updated_at,
        deleted_at: m.deleted_at,
    }
}

pub fn note_to_active(n: &Note) -> notes::ActiveModel {
    notes::ActiveModel {
        id: Set(n.id.clone()),
        space_id: Set(n.space_id.clone()),
        pattern_id: Set(n.pattern_id.clone()),
        title: Set(n.title.clone()),
        content: Set(n.content.clone()),
        tags: Set(strings_to_json(&n.tags)),
        created_at: Set(n.created_at),
        updated_at: Set(n.updated_at),
        deleted_at: Set(n.deleted_at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_string_json_entries_are_skipped() {
        let val = serde_json::json!(["a", 1, null, "b"]);
        assert_eq!(json_to_strings(&val), vec!["a", "b"]);
        assert!(json_to_strings(&serde_json::json!({"k": "v"})).is_empty());
    }

    #[test]
    fn pattern_model_round_trip_keeps_lists() {
        let p = Pattern::new("hello", "hi").with_tags(["greeting", "en"]);
        let active = pattern_to_active(&p);
        let model = patterns::Model {
            id: p.id.clone(),
            trigger: p.trigger.clone(),
            response: p.response.clone(),
            strength: p.strength,
            threshold: p.threshold,
            decay_rate: p.decay_rate,
            decay_enabled: p.decay_enabled,
            reinforce_count: 0,
            decay_count: 0,
            last_used_at: None,
            project: String::new(),
            tags: active.tags.clone().unwrap(),
            connections: active.connections.clone().unwrap(),
            space_id: p.space_id.clone(),
            user_id: None,
            created_at: p.created_at,
            updated_at: p.updated_at,
            deleted_at: None,
        };
        assert_eq!(pattern_from_model(model), p);
    }
}
