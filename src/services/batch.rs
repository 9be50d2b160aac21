use crate::services::prediction::PredictionService;
use crate::utils::error::Result;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

#[derive(Debug, Clone, Deserialize)]
pub struct BatchRow {
    pub location: String,
    pub severity: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoredRow {
    pub location: String,
    pub severity: String,
    pub risk_score: f64,
}

/// 讀取 `location,severity` CSV，寫出 `location,severity,risk_score`
pub fn score_csv<R: Read, W: Write>(
    service: &PredictionService,
    input: R,
    output: W,
) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(input);
    let rows = reader
        .deserialize::<BatchRow>()
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let count = rows.len();
    tracing::info!("📥 Read {} rows for batch scoring", count);

    let pairs: Vec<(&str, &str)> = rows
        .iter()
        .map(|row| (row.location.as_str(), row.severity.as_str()))
        .collect();
    let scores = service.score_batch(&pairs);

    let mut writer = csv::Writer::from_writer(output);
    for (row, risk_score) in rows.into_iter().zip(scores) {
        writer.serialize(ScoredRow {
            location: row.location,
            severity: row.severity,
            risk_score,
        })?;
    }
    writer.flush()?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::fs::LocalArtifactStore;
    use crate::ml::ModelCache;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> PredictionService {
        let store = LocalArtifactStore::new(dir.path());
        PredictionService::new(Arc::new(ModelCache::new(Arc::new(store), "json")))
    }

    #[test]
    fn test_score_csv_with_model() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("risk_model.json"),
            r#"{"type": "linear", "weights": [0.25, 0.0], "bias": 0.0}"#,
        )
        .unwrap();

        let input = "location,severity\nhighway,critical\n urban , low \n";
        let mut output = Vec::new();
        let count = score_csv(&service(&dir), input.as_bytes(), &mut output).unwrap();

        assert_eq!(count, 2);
        let text = String::from_utf8(output).unwrap();
        assert_eq!(
            text,
            "location,severity,risk_score\nhighway,critical,1.0\nurban,low,0.25\n"
        );
    }

    #[test]
    fn test_score_csv_without_model_uses_default() {
        let dir = TempDir::new().unwrap();
        let mut output = Vec::new();
        score_csv(
            &service(&dir),
            "location,severity\nrural,high\n".as_bytes(),
            &mut output,
        )
        .unwrap();

        let text = String::from_utf8(output).unwrap();
        assert!(text.ends_with("rural,high,0.5\n"));
    }

    #[test]
    fn test_score_csv_rejects_missing_columns() {
        let dir = TempDir::new().unwrap();
        let mut output = Vec::new();
        let result = score_csv(&service(&dir), "place\nhighway\n".as_bytes(), &mut output);
        assert!(result.is_err());
    }
}
