//! JSON report for CI systems

use super::{Reporter, ScenarioResult};
use crate::common::Result;

/// Renders the full result as pretty-printed JSON
pub struct JsonReporter;

impl Reporter for JsonReporter {
    fn render(&self, result: &ScenarioResult) -> Result<String> {
        Ok(serde_json::to_string_pretty(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::tests::failed_result;
    use serde_json::Value;

    #[test]
    fn test_json_record_shape() {
        let json = JsonReporter.render(&failed_result()).unwrap();
        let v: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(v["scenario"], "messaging");
        assert_eq!(v["status"], "failed");
        assert_eq!(v["elapsed_ms"], 20_430);
        assert_eq!(v["steps"].as_array().unwrap().len(), 2);
        assert!(v["steps"][0].get("diagnostic").is_none());

        let failed = &v["steps"][1];
        assert_eq!(failed["status"], "timed_out");
        assert_eq!(failed["elapsed_ms"], 20_000);
        assert_eq!(failed["diagnostic"]["kind"], "timed_out");
        assert_eq!(
            failed["diagnostic"]["evidence"][0],
            "location: http://localhost:3000/login"
        );
        assert!(v.get("teardown_error").is_none());
    }
}
