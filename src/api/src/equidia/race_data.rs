//! Per-race download of the main result and its five supplementary categories.

use serde_json::Value;

use super::http::{FetchFailure, JsonSource};
use super::Endpoint;
use crate::outcome::DownloadOutcome;
use crate::types::{Category, RaceKey, RaceRecord};

/// Merged record of one race plus the outcome of each request
#[derive(Debug)]
pub struct RaceDownload {
    pub record: RaceRecord,
    pub outcomes: Vec<DownloadOutcome>,
}

impl RaceDownload {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }
}

/// Issue all six requests for `key` and merge whatever succeeded.
///
/// Every category is requested even when earlier ones fail. When the main
/// result is missing the record starts from an empty object.
pub async fn download_race<S: JsonSource>(source: &S, base_url: &str, key: &RaceKey) -> RaceDownload {
    let mut record = RaceRecord::new(key.clone());
    let mut outcomes = Vec::with_capacity(Category::ALL.len());

    for category in Category::ALL {
        let url = Endpoint::Race {
            date: key.date,
            code: key.code,
            category,
        }
        .url(base_url);

        let result = match source.get_json(&url).await {
            Ok(body) => merge(&mut record, category, body),
            Err(e) => Err(e),
        };

        outcomes.push(DownloadOutcome {
            key: key.clone(),
            category,
            result,
        });
    }

    RaceDownload { record, outcomes }
}

fn merge(record: &mut RaceRecord, category: Category, body: Value) -> Result<(), FetchFailure> {
    match (category, body) {
        (Category::MainResults, Value::Object(fields)) => {
            record.set_main(fields);
            Ok(())
        }
        (Category::MainResults, _) => Err(FetchFailure::InvalidBody(
            "main result is not a JSON object".to_string(),
        )),
        (category, body) => {
            record.insert_category(category, body);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equidia::http::mock::ScriptedSource;
    use crate::equidia::BASE_URL;
    use crate::types::RaceCode;
    use chrono::NaiveDate;
    use serde_json::json;

    fn key() -> RaceKey {
        RaceKey {
            date: NaiveDate::from_ymd_opt(2019, 12, 1).unwrap(),
            track: "Vincennes".to_string(),
            code: RaceCode::new(1, 1),
        }
    }

    fn parsed(download: &RaceDownload) -> Value {
        serde_json::from_str(&download.record.to_json_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_all_categories_merged() {
        let source = ScriptedSource::new(Ok(json!({})))
            .on("/v2/courses/2019-12-01/R1/C1", Ok(json!({"id": 42})));

        let download = download_race(&source, BASE_URL, &key()).await;

        assert_eq!(
            parsed(&download),
            json!({"id": 42, "odds": {}, "pronos": {}, "tracking": {}, "notule": {}, "rapports": {}})
        );
        assert_eq!(download.succeeded(), 6);
        assert_eq!(download.failed(), 0);
    }

    #[tokio::test]
    async fn test_six_distinct_requests() {
        let source = ScriptedSource::new(Err(FetchFailure::Status(503)));

        let download = download_race(&source, BASE_URL, &key()).await;

        let counts = source.request_counts();
        assert_eq!(source.requests().len(), 6);
        assert_eq!(counts.len(), 6);
        assert!(counts.values().all(|&n| n == 1));
        assert_eq!(download.outcomes.len(), 6);
        assert_eq!(download.failed(), 6);
        assert_eq!(
            source.requests()[0],
            "https://api.equidia.fr/api/public/v2/courses/2019-12-01/R1/C1"
        );
    }

    #[tokio::test]
    async fn test_failed_category_is_omitted() {
        let source = ScriptedSource::new(Ok(json!({"x": 1})))
            .on("/v2/courses/2019-12-01/R1/C1", Ok(json!({"id": 7, "name": "Prix"})))
            .on("/pronostic", Err(FetchFailure::Status(404)))
            .on("/v2/tracking/2019-12-01/R1/C1", Err(FetchFailure::Transport("reset".into())));

        let download = download_race(&source, BASE_URL, &key()).await;
        let record = parsed(&download);

        assert_eq!(record["id"], json!(7));
        assert_eq!(record["name"], json!("Prix"));
        assert!(record.get("pronos").is_none());
        assert!(record.get("tracking").is_none());
        assert_eq!(record["odds"], json!({"x": 1}));
        assert_eq!(record["notule"], json!({"x": 1}));
        assert_eq!(record["rapports"], json!({"x": 1}));

        let failed: Vec<_> = download
            .outcomes
            .iter()
            .filter(|o| !o.is_success())
            .map(|o| (o.category, o.status()))
            .collect();
        assert_eq!(
            failed,
            vec![(Category::Pronos, Some(404)), (Category::Tracking, None)]
        );
    }

    #[tokio::test]
    async fn test_main_failure_keeps_categories() {
        let source = ScriptedSource::new(Ok(json!([])))
            .on("/v2/courses/2019-12-01/R1/C1", Err(FetchFailure::Status(500)));

        let download = download_race(&source, BASE_URL, &key()).await;

        assert_eq!(
            parsed(&download),
            json!({"odds": [], "pronos": [], "tracking": [], "notule": [], "rapports": []})
        );
        assert_eq!(download.outcomes[0].category, Category::MainResults);
        assert_eq!(download.outcomes[0].status(), Some(500));
    }

    #[tokio::test]
    async fn test_main_result_must_be_object() {
        let source = ScriptedSource::new(Ok(json!({})))
            .on("/v2/courses/2019-12-01/R1/C1", Ok(json!([1, 2, 3])));

        let download = download_race(&source, BASE_URL, &key()).await;

        assert!(matches!(
            download.outcomes[0].result,
            Err(FetchFailure::InvalidBody(_))
        ));
        assert_eq!(download.record.payload().len(), 5);
    }
}
