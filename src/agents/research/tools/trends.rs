use super::ToolsConfig;
use crate::tool::Tool;
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

const HOST_LANGUAGE: &str = "en-US";
const TIMEZONE_OFFSET: &str = "360";
const MAX_KEYWORDS: usize = 5;

/// Search-interest statistics from the unofficial Google Trends API.
pub struct TrendsTool {
    client: Client,
    base_url: String,
    warmed_up: AtomicBool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendStats {
    pub current_value: i64,
    pub average: f64,
    pub max: i64,
    pub min: i64,
    pub trend: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterestOverTime {
    pub status: String,
    pub keywords: Vec<String>,
    pub timeframe: String,
    pub trends: BTreeMap<String, TrendStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedQuery {
    pub query: String,
    pub value: i64,
    pub formatted_value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelatedQueries {
    pub status: String,
    pub keyword: String,
    pub top: Vec<RelatedQuery>,
    pub rising: Vec<RelatedQuery>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordComparison {
    pub keyword: String,
    pub average_interest: f64,
    pub current: i64,
    pub peak: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub status: String,
    pub keywords: Vec<String>,
    pub timeframe: String,
    pub comparison: Vec<KeywordComparison>,
    pub winner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionInterest {
    pub region: String,
    pub interest: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionalInterest {
    pub status: String,
    pub keyword: String,
    pub top_regions: Vec<RegionInterest>,
}

#[derive(Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum TrendsParams {
    InterestOverTime {
        keywords: Vec<String>,
        #[serde(default = "default_timeframe")]
        timeframe: String,
    },
    RelatedQueries {
        keyword: String,
    },
    CompareKeywords {
        keywords: Vec<String>,
        #[serde(default = "default_compare_timeframe")]
        timeframe: String,
    },
    RegionalInterest {
        keyword: String,
    },
}

fn default_timeframe() -> String {
    "today 12-m".to_string()
}

fn default_compare_timeframe() -> String {
    "today 3-m".to_string()
}

#[derive(Debug, Clone, Deserialize)]
struct Widget {
    id: String,
    token: String,
    request: Value,
}

#[derive(Deserialize)]
struct ExplorePayload {
    #[serde(default)]
    widgets: Vec<Widget>,
}

impl TrendsTool {
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        Ok(Self {
            client: config.http_client()?,
            base_url: config.trends_url.trim_end_matches('/').to_string(),
            warmed_up: AtomicBool::new(false),
        })
    }

    pub async fn interest_over_time(
        &self,
        keywords: &[String],
        timeframe: &str,
    ) -> Result<InterestOverTime> {
        let keywords = limit_keywords(keywords)?;
        let widgets = self.explore(&keywords, timeframe).await?;
        let widget = find_widget(&widgets, "TIMESERIES")?;
        let data = self.widget_data("multiline", widget).await?;
        let series = parse_timeline(&data, keywords.len());

        Ok(interest_from_series(keywords, timeframe, &series))
    }

    pub async fn related_queries(&self, keyword: &str) -> Result<RelatedQueries> {
        let keywords = vec![keyword.to_string()];
        let widgets = self.explore(&keywords, &default_timeframe()).await?;
        let widget = find_widget(&widgets, "RELATED_QUERIES")?;
        let data = self.widget_data("relatedsearches", widget).await?;
        let (top, rising) = parse_ranked_lists(&data);

        Ok(RelatedQueries {
            status: "success".to_string(),
            keyword: keyword.to_string(),
            top,
            rising,
        })
    }

    pub async fn compare_keywords(&self, keywords: &[String], timeframe: &str) -> Result<Comparison> {
        let keywords = limit_keywords(keywords)?;
        let widgets = self.explore(&keywords, timeframe).await?;
        let widget = find_widget(&widgets, "TIMESERIES")?;
        let data = self.widget_data("multiline", widget).await?;
        let series = parse_timeline(&data, keywords.len());

        Ok(compare_from_series(keywords, timeframe, &series))
    }

    pub async fn regional_interest(&self, keyword: &str) -> Result<RegionalInterest> {
        let keywords = vec![keyword.to_string()];
        let widgets = self.explore(&keywords, &default_timeframe()).await?;
        let mut widget = find_widget(&widgets, "GEO_MAP")?.clone();
        if let Some(request) = widget.request.as_object_mut() {
            request.insert("resolution".to_string(), json!("COUNTRY"));
            request.insert("includeLowSearchVolumeGeos".to_string(), json!(true));
        }
        let data = self.widget_data("comparedgeo", &widget).await?;
        let top_regions = parse_geo_map(&data, 10);

        Ok(RegionalInterest {
            status: if top_regions.is_empty() { "no_data" } else { "success" }.to_string(),
            keyword: keyword.to_string(),
            top_regions,
        })
    }

    /// Pick up the session cookie Google Trends expects before API calls.
    async fn warm_up(&self) {
        if self.warmed_up.load(Ordering::SeqCst) {
            return;
        }

        match self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("geo", "US")])
            .send()
            .await
        {
            Ok(_) => self.warmed_up.store(true, Ordering::SeqCst),
            Err(e) => log::debug!("Trends cookie warm-up failed: {}", e),
        }
    }

    async fn explore(&self, keywords: &[String], timeframe: &str) -> Result<Vec<Widget>> {
        self.warm_up().await;

        let comparison_items: Vec<Value> = keywords
            .iter()
            .map(|keyword| json!({"keyword": keyword, "geo": "", "time": timeframe}))
            .collect();
        let req = json!({
            "comparisonItem": comparison_items,
            "category": 0,
            "property": ""
        });

        let body = self
            .get_api(
                &format!("{}/trends/api/explore", self.base_url),
                &[("req", req.to_string()), ("tz", TIMEZONE_OFFSET.to_string())],
            )
            .await?;

        let payload: ExplorePayload = serde_json::from_str(strip_json_prefix(&body)?)?;
        Ok(payload.widgets)
    }

    async fn widget_data(&self, kind: &str, widget: &Widget) -> Result<Value> {
        let body = self
            .get_api(
                &format!("{}/trends/api/widgetdata/{}", self.base_url, kind),
                &[
                    ("req", widget.request.to_string()),
                    ("token", widget.token.clone()),
                    ("tz", TIMEZONE_OFFSET.to_string()),
                ],
            )
            .await?;

        Ok(serde_json::from_str(strip_json_prefix(&body)?)?)
    }

    async fn get_api(&self, url: &str, params: &[(&str, String)]) -> Result<String> {
        let response = self
            .client
            .get(url)
            .query(&[("hl", HOST_LANGUAGE)])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("Google Trends returned status {}", status));
        }

        Ok(response.text().await?)
    }
}

fn limit_keywords(keywords: &[String]) -> Result<Vec<String>> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
        .take(MAX_KEYWORDS)
        .collect();

    if keywords.is_empty() {
        return Err(anyhow!("At least one keyword is required"));
    }
    Ok(keywords)
}

fn find_widget<'a>(widgets: &'a [Widget], id: &str) -> Result<&'a Widget> {
    widgets
        .iter()
        .find(|widget| widget.id.starts_with(id))
        .ok_or_else(|| anyhow!("Google Trends did not return a {} widget", id))
}

/// Drop the anti-hijacking prefix (`)]}',`) Google puts before its JSON.
pub fn strip_json_prefix(body: &str) -> Result<&str> {
    body.find('{')
        .map(|start| &body[start..])
        .ok_or_else(|| anyhow!("Google Trends response contained no JSON"))
}

/// One value series per keyword from a `multiline` widget response.
pub fn parse_timeline(data: &Value, keyword_count: usize) -> Vec<Vec<i64>> {
    let mut series = vec![Vec::new(); keyword_count];

    let points = data["default"]["timelineData"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    for point in points {
        if let Some(values) = point["value"].as_array() {
            for (i, value) in values.iter().take(keyword_count).enumerate() {
                series[i].push(value.as_i64().unwrap_or(0));
            }
        }
    }

    series
}

pub fn summarize_series(values: &[i64]) -> Option<TrendStats> {
    let current_value = *values.last()?;
    let average = values.iter().sum::<i64>() as f64 / values.len() as f64;
    let max = values.iter().copied().max()?;
    let min = values.iter().copied().min()?;

    Some(TrendStats {
        current_value,
        average,
        max,
        min,
        trend: if current_value as f64 > average {
            "rising"
        } else {
            "falling"
        }
        .to_string(),
    })
}

fn interest_from_series(keywords: Vec<String>, timeframe: &str, series: &[Vec<i64>]) -> InterestOverTime {
    let trends: BTreeMap<String, TrendStats> = keywords
        .iter()
        .zip(series)
        .filter_map(|(keyword, values)| summarize_series(values).map(|s| (keyword.clone(), s)))
        .collect();

    InterestOverTime {
        status: if trends.is_empty() { "no_data" } else { "success" }.to_string(),
        keywords,
        timeframe: timeframe.to_string(),
        trends,
    }
}

fn compare_from_series(keywords: Vec<String>, timeframe: &str, series: &[Vec<i64>]) -> Comparison {
    let mut comparison: Vec<KeywordComparison> = keywords
        .iter()
        .zip(series)
        .filter_map(|(keyword, values)| {
            summarize_series(values).map(|stats| KeywordComparison {
                keyword: keyword.clone(),
                average_interest: stats.average,
                current: stats.current_value,
                peak: stats.max,
            })
        })
        .collect();

    comparison.sort_by(|a, b| b.average_interest.total_cmp(&a.average_interest));

    Comparison {
        status: if comparison.is_empty() { "no_data" } else { "success" }.to_string(),
        winner: comparison.first().map(|c| c.keyword.clone()),
        keywords,
        timeframe: timeframe.to_string(),
        comparison,
    }
}

/// Top and rising query lists from a `relatedsearches` widget response, 10 each.
pub fn parse_ranked_lists(data: &Value) -> (Vec<RelatedQuery>, Vec<RelatedQuery>) {
    let lists = data["default"]["rankedList"]
        .as_array()
        .cloned()
        .unwrap_or_default();

    let ranked = |index: usize| -> Vec<RelatedQuery> {
        lists
            .get(index)
            .and_then(|list| list["rankedKeyword"].as_array())
            .map(|items| {
                items
                    .iter()
                    .take(10)
                    .map(|item| RelatedQuery {
                        query: item["query"].as_str().unwrap_or_default().to_string(),
                        value: item["value"].as_i64().unwrap_or(0),
                        formatted_value: item["formattedValue"]
                            .as_str()
                            .unwrap_or_default()
                            .to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    };

    (ranked(0), ranked(1))
}

pub fn parse_geo_map(data: &Value, limit: usize) -> Vec<RegionInterest> {
    let mut regions: Vec<RegionInterest> = data["default"]["geoMapData"]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .map(|entry| RegionInterest {
                    region: entry["geoName"].as_str().unwrap_or_default().to_string(),
                    interest: entry["value"][0].as_i64().unwrap_or(0),
                })
                .collect()
        })
        .unwrap_or_default();

    regions.sort_by(|a, b| b.interest.cmp(&a.interest));
    regions.truncate(limit);
    regions
}

#[async_trait::async_trait]
impl Tool for TrendsTool {
    fn name(&self) -> &str {
        "trends"
    }

    fn description(&self) -> &str {
        "Google Trends analysis: interest over time, related queries, keyword comparison and regional interest."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["interest_over_time", "related_queries", "compare_keywords", "regional_interest"],
                    "description": "Which analysis to run"
                },
                "keywords": {
                    "type": "array",
                    "items": {"type": "string"},
                    "description": "Keywords to analyze, at most 5 are used (interest_over_time, compare_keywords)"
                },
                "keyword": {
                    "type": "string",
                    "description": "Single keyword (related_queries, regional_interest)"
                },
                "timeframe": {
                    "type": "string",
                    "description": "Time period such as 'today 12-m', 'today 3-m' or 'now 7-d'"
                }
            },
            "required": ["action"]
        })
    }

    async fn execute(&self, arguments: &str) -> Result<String> {
        let params: TrendsParams = serde_json::from_str(arguments)?;

        let output = match params {
            TrendsParams::InterestOverTime { keywords, timeframe } => {
                serde_json::to_value(self.interest_over_time(&keywords, &timeframe).await?)?
            }
            TrendsParams::RelatedQueries { keyword } => {
                serde_json::to_value(self.related_queries(&keyword).await?)?
            }
            TrendsParams::CompareKeywords { keywords, timeframe } => {
                serde_json::to_value(self.compare_keywords(&keywords, &timeframe).await?)?
            }
            TrendsParams::RegionalInterest { keyword } => {
                serde_json::to_value(self.regional_interest(&keyword).await?)?
            }
        };

        Ok(serde_json::to_string_pretty(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_is_stripped() {
        let body = ")]}',\n{\"default\": {}}";
        assert_eq!(strip_json_prefix(body).unwrap(), "{\"default\": {}}");
        assert!(strip_json_prefix(")]}'").is_err());
    }

    #[test]
    fn rising_when_last_point_beats_mean() {
        let stats = summarize_series(&[10, 20, 30, 80]).unwrap();
        assert_eq!(stats.current_value, 80);
        assert_eq!(stats.average, 35.0);
        assert_eq!(stats.max, 80);
        assert_eq!(stats.min, 10);
        assert_eq!(stats.trend, "rising");

        assert_eq!(summarize_series(&[50, 50]).unwrap().trend, "falling");
        assert!(summarize_series(&[]).is_none());
    }

    #[test]
    fn timeline_splits_per_keyword() {
        let data = json!({"default": {"timelineData": [
            {"time": "1", "value": [10, 70]},
            {"time": "2", "value": [30, 50]},
            {"time": "3", "value": [50, 30]}
        ]}});
        let series = parse_timeline(&data, 2);
        assert_eq!(series, vec![vec![10, 30, 50], vec![70, 50, 30]]);

        let interest = interest_from_series(
            vec!["dog walking".into(), "pet sitting".into()],
            "today 12-m",
            &series,
        );
        assert_eq!(interest.status, "success");
        assert_eq!(interest.trends["dog walking"].trend, "rising");
        assert_eq!(interest.trends["pet sitting"].trend, "falling");
    }

    #[test]
    fn empty_timeline_means_no_data() {
        let series = parse_timeline(&json!({"default": {"timelineData": []}}), 1);
        let interest = interest_from_series(vec!["x".into()], "today 12-m", &series);
        assert_eq!(interest.status, "no_data");
        assert!(interest.trends.is_empty());
    }

    #[test]
    fn comparison_is_ranked_by_average() {
        let series = vec![vec![10, 10], vec![60, 40], vec![20, 90]];
        let comparison = compare_from_series(
            vec!["a".into(), "b".into(), "c".into()],
            "today 3-m",
            &series,
        );
        let order: Vec<&str> = comparison.comparison.iter().map(|c| c.keyword.as_str()).collect();
        assert_eq!(order, vec!["c", "b", "a"]);
        assert_eq!(comparison.winner.as_deref(), Some("c"));
        assert_eq!(comparison.comparison[0].peak, 90);
    }

    #[test]
    fn ranked_lists_are_top_then_rising() {
        let data = json!({"default": {"rankedList": [
            {"rankedKeyword": [{"query": "dog walker near me", "value": 100, "formattedValue": "100"}]},
            {"rankedKeyword": [{"query": "dog walking app", "value": 250, "formattedValue": "+250%"}]}
        ]}});
        let (top, rising) = parse_ranked_lists(&data);
        assert_eq!(top[0].query, "dog walker near me");
        assert_eq!(rising[0].formatted_value, "+250%");

        let (top, rising) = parse_ranked_lists(&json!({}));
        assert!(top.is_empty() && rising.is_empty());
    }

    #[test]
    fn geo_map_sorted_and_limited() {
        let data = json!({"default": {"geoMapData": [
            {"geoName": "Canada", "value": [40]},
            {"geoName": "United States", "value": [100]},
            {"geoName": "Ireland", "value": [65]}
        ]}});
        let regions = parse_geo_map(&data, 2);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].region, "United States");
        assert_eq!(regions[1].interest, 65);
    }

    #[test]
    fn keywords_are_capped_at_five() {
        let many: Vec<String> = (0..8).map(|i| format!("kw{}", i)).collect();
        assert_eq!(limit_keywords(&many).unwrap().len(), 5);
        assert!(limit_keywords(&[" ".to_string()]).is_err());
    }
}
