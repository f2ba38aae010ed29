use serde_json::Value;
use tracing::debug;

const JOB_POSTING: &str = "JobPosting";

/// True when any JSON-LD block describes a job posting. Blocks that fail to
/// parse are skipped.
pub fn has_job_posting<S: AsRef<str>>(blocks: &[S]) -> bool {
    blocks.iter().any(|block| {
        match serde_json::from_str::<Value>(block.as_ref()) {
            Ok(value) => describes_job_posting(&value),
            Err(e) => {
                debug!("Skipping unparseable JSON-LD block: {}", e);
                false
            }
        }
    })
}

fn describes_job_posting(value: &Value) -> bool {
    match value {
        Value::Array(items) => items.iter().any(describes_job_posting),
        Value::Object(map) => {
            let typed = match map.get("@type") {
                Some(Value::String(t)) => t == JOB_POSTING,
                Some(Value::Array(types)) => types.iter().any(|t| t == JOB_POSTING),
                _ => false,
            };
            typed
                || map.get("jobPosting").is_some_and(is_truthy)
                || map.get("@graph").is_some_and(describes_job_posting)
        }
        _ => false,
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_job_posting() {
        assert!(has_job_posting(&[r#"{"@context":"https://schema.org","@type":"JobPosting"}"#]));
    }

    #[test]
    fn broken_block_does_not_hide_later_match() {
        let blocks = [r#"{"@type": "JobPosting""#, r#"{"@type":"JobPosting","title":"x"}"#];
        assert!(has_job_posting(&blocks));
    }

    #[test]
    fn nested_forms() {
        assert!(has_job_posting(&[r#"{"jobPosting": {"title": "x"}}"#]));
        assert!(has_job_posting(&[r#"[{"@type":"Organization"},{"@type":"JobPosting"}]"#]));
        assert!(has_job_posting(&[r#"{"@graph":[{"@type":["Thing","JobPosting"]}]}"#]));
    }

    #[test]
    fn other_types_do_not_match() {
        assert!(!has_job_posting(&[r#"{"@type":"Article"}"#]));
        assert!(!has_job_posting(&[r#"{"jobPosting": null}"#]));
        assert!(!has_job_posting(&[r#"{"jobPosting": ""}"#]));
        assert!(!has_job_posting::<&str>(&[]));
    }
}
