use serde::{Deserialize, Serialize};

/// A configured initiator of workflow executions.
///
/// Triggers only start executions; they carry no execution-time state.
/// Scheduled and event delivery mechanics live outside the engine, so the
/// configuration is captured but never interpreted here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDef {
  pub id: String,
  #[serde(flatten)]
  pub trigger_type: TriggerType,
  #[serde(default)]
  pub config: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerType {
  Manual,
  Scheduled {
    /// Cron expression.
    schedule: String,
  },
  Event {
    event_type: String,
  },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_trigger_type_flattens_into_def() {
    let trigger: TriggerDef = serde_json::from_value(serde_json::json!({
      "id": "trigger_1",
      "type": "scheduled",
      "schedule": "0 * * * *"
    }))
    .unwrap();

    assert!(matches!(
      trigger.trigger_type,
      TriggerType::Scheduled { ref schedule } if schedule == "0 * * * *"
    ));
  }

  #[test]
  fn test_manual_trigger_round_trip() {
    let trigger = TriggerDef {
      id: "trigger_1".to_string(),
      trigger_type: TriggerType::Manual,
      config: serde_json::Map::new(),
    };

    let json = serde_json::to_value(&trigger).unwrap();
    assert_eq!(json["type"], "manual");

    let back: TriggerDef = serde_json::from_value(json).unwrap();
    assert_eq!(back, trigger);
  }
}
