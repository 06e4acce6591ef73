//! Filtering, projection, sorting, and truncation of raw GitHub records.
//!
//! GitHub returns loosely shaped JSON. Everything the tools hand back to the
//! model goes through a [`Projection`] so the payload stays small and stable,
//! and list-like results are additionally ranked by star count via [`shape`].

use serde_json::{Map, Value};

use crate::error::{EasyGithubError, Result};

/// Where a star count may live in a record. `stars` covers records that have
/// already been projected, which keeps shaping idempotent.
const STAR_POINTERS: [&str; 2] = ["/stargazers_count", "/stars"];

/// One output key and the JSON pointers it is read from. The first non-null
/// hit wins.
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub key: &'static str,
    pub sources: &'static [&'static str],
}

impl Field {
    pub const fn new(key: &'static str, sources: &'static [&'static str]) -> Self {
        Self { key, sources }
    }

    fn read(&self, record: &Value) -> Value {
        self.sources
            .iter()
            .filter_map(|pointer| record.pointer(pointer))
            .find(|value| !value.is_null())
            .cloned()
            .unwrap_or(Value::Null)
    }
}

const NAME: Field = Field::new("name", &["/name"]);
const URL: Field = Field::new("url", &["/html_url", "/url"]);
const DESCRIPTION: Field = Field::new("description", &["/description"]);
const STARS: Field = Field::new("stars", &STAR_POINTERS);

/// The set of fields kept from each record.
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    fields: &'static [Field],
}

impl Projection {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    /// `{name, url, stars}`
    pub const REPO_LISTING: Projection = Projection::new(&[NAME, URL, STARS]);

    /// `{name, url, description, stars}`
    pub const REPO_LISTING_DESCRIBED: Projection =
        Projection::new(&[NAME, URL, DESCRIPTION, STARS]);

    /// Search hits of any type. Users have a `login`, issues a `title`, and
    /// commits only a `sha` rather than a `name`. Topics describe themselves
    /// in `short_description`, commits in their message.
    pub const SEARCH_HIT: Projection = Projection::new(&[
        Field::new("name", &["/name", "/login", "/title", "/sha"]),
        Field::new(
            "description",
            &["/description", "/short_description", "/commit/message"],
        ),
        URL,
        STARS,
    ]);

    pub const USER_PROFILE: Projection = Projection::new(&[
        Field::new("login", &["/login"]),
        NAME,
        Field::new("bio", &["/bio"]),
        Field::new("company", &["/company"]),
        Field::new("location", &["/location"]),
        Field::new("blog", &["/blog"]),
        URL,
        Field::new("public_repos", &["/public_repos"]),
        Field::new("followers", &["/followers"]),
        Field::new("following", &["/following"]),
        Field::new("created_at", &["/created_at"]),
    ]);

    pub const REPO_DETAILS: Projection = Projection::new(&[
        NAME,
        Field::new("full_name", &["/full_name"]),
        DESCRIPTION,
        URL,
        Field::new("language", &["/language"]),
        Field::new("topics", &["/topics"]),
        Field::new("license", &["/license/spdx_id"]),
        Field::new("default_branch", &["/default_branch"]),
        STARS,
        Field::new("forks", &["/forks_count"]),
        Field::new("open_issues", &["/open_issues_count"]),
        Field::new("archived", &["/archived"]),
        Field::new("created_at", &["/created_at"]),
        Field::new("updated_at", &["/updated_at"]),
    ]);

    pub const ISSUE: Projection = Projection::new(&[
        Field::new("number", &["/number"]),
        Field::new("title", &["/title"]),
        Field::new("state", &["/state"]),
        Field::new("author", &["/user/login"]),
        URL,
        Field::new("comments", &["/comments"]),
        Field::new("created_at", &["/created_at"]),
    ]);

    pub const PULL_REQUEST: Projection = Projection::new(&[
        Field::new("number", &["/number"]),
        Field::new("title", &["/title"]),
        Field::new("state", &["/state"]),
        Field::new("author", &["/user/login"]),
        URL,
        Field::new("head", &["/head/ref"]),
        Field::new("base", &["/base/ref"]),
        Field::new("draft", &["/draft"]),
        Field::new("created_at", &["/created_at"]),
    ]);

    pub const CREATED_ISSUE: Projection = Projection::new(&[
        Field::new("number", &["/number"]),
        Field::new("title", &["/title"]),
        Field::new("state", &["/state"]),
        URL,
    ]);

    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.key)
    }

    /// Keep exactly this projection's keys. Missing or null sources become `null`.
    pub fn apply(&self, record: &Value) -> Value {
        let map: Map<String, Value> = self
            .fields
            .iter()
            .map(|field| (field.key.to_string(), field.read(record)))
            .collect();
        Value::Object(map)
    }
}

/// Star count of a raw or projected record. Missing or non-numeric counts
/// are treated as zero.
pub fn star_count(record: &Value) -> u64 {
    STAR_POINTERS
        .iter()
        .find_map(|pointer| record.pointer(pointer))
        .and_then(Value::as_u64)
        .unwrap_or(0)
}

/// Filter to records with at least `threshold` stars, project them, sort by
/// stars descending and keep the first `top`.
///
/// The sort is stable: records with equal star counts keep their input order.
pub fn shape(records: &[Value], threshold: u64, top: usize, projection: &Projection) -> Vec<Value> {
    if top == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(u64, Value)> = records
        .iter()
        .map(|record| (star_count(record), record))
        .filter(|(stars, _)| *stars >= threshold)
        .map(|(stars, record)| (stars, projection.apply(record)))
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked.truncate(top);
    ranked.into_iter().map(|(_, record)| record).collect()
}

/// [`shape`] over an undecoded payload. `null` counts as no records; any
/// other non-array payload is a format error.
pub fn shape_value(
    payload: &Value,
    threshold: u64,
    top: usize,
    projection: &Projection,
) -> Result<Vec<Value>> {
    match payload {
        Value::Array(records) => Ok(shape(records, threshold, top, projection)),
        Value::Null => Ok(Vec::new()),
        other => Err(EasyGithubError::Format(format!(
            "expected a list of records, got {}",
            json_kind(other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn names(records: &[Value]) -> Vec<&str> {
        records
            .iter()
            .map(|r| r["name"].as_str().unwrap_or(""))
            .collect()
    }

    fn sample() -> Vec<Value> {
        vec![
            json!({"name": "a", "html_url": "https://github.com/o/a", "stargazers_count": 5, "fork": false}),
            json!({"name": "b", "html_url": "https://github.com/o/b", "stargazers_count": 20, "fork": true}),
            json!({"name": "c", "html_url": "https://github.com/o/c", "stargazers_count": 1}),
            json!({"name": "d", "html_url": "https://github.com/o/d"}),
        ]
    }

    #[test]
    fn test_threshold_and_top_scenario() {
        let records = vec![
            json!({"name": "a", "stars": 5}),
            json!({"name": "b", "stars": 20}),
            json!({"name": "c", "stars": 1}),
        ];
        let fields = Projection::new(&[NAME, STARS]);
        let result = shape(&records, 2, 1, &fields);
        assert_eq!(result, vec![json!({"name": "b", "stars": 20})]);
    }

    #[test]
    fn test_full_result_is_sorted_permutation() {
        let records = sample();
        let result = shape(&records, 0, records.len(), &Projection::REPO_LISTING);
        assert_eq!(result.len(), records.len());
        assert_eq!(names(&result), vec!["b", "a", "c", "d"]);
        let stars: Vec<u64> = result.iter().map(star_count).collect();
        assert!(stars.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn test_threshold_keeps_exactly_qualifying_records() {
        let records = sample();
        for threshold in [0, 1, 2, 5, 6, 20, 21] {
            let result = shape(&records, threshold, usize::MAX, &Projection::REPO_LISTING);
            assert!(result.iter().all(|r| star_count(r) >= threshold));
            let qualifying = records.iter().filter(|r| star_count(r) >= threshold).count();
            assert_eq!(result.len(), qualifying, "threshold {threshold}");
        }
    }

    #[test]
    fn test_missing_star_count_counts_as_zero() {
        let records = sample();
        let result = shape(&records, 0, 10, &Projection::REPO_LISTING);
        let d = result.iter().find(|r| r["name"] == "d").unwrap();
        assert_eq!(d["stars"], Value::Null);
        assert_eq!(star_count(d), 0);

        let result = shape(&records, 1, 10, &Projection::REPO_LISTING);
        assert!(!names(&result).contains(&"d"));
    }

    #[test]
    fn test_top_bounds_length() {
        let records = sample();
        for top in 0..6 {
            let result = shape(&records, 0, top, &Projection::REPO_LISTING);
            assert!(result.len() <= top);
        }
        assert!(shape(&records, 0, 0, &Projection::REPO_LISTING).is_empty());
    }

    #[test]
    fn test_ties_keep_input_order() {
        let records = vec![
            json!({"name": "first", "stargazers_count": 3}),
            json!({"name": "top", "stargazers_count": 9}),
            json!({"name": "second", "stargazers_count": 3}),
            json!({"name": "third", "stargazers_count": 3}),
        ];
        let result = shape(&records, 0, 10, &Projection::REPO_LISTING);
        assert_eq!(names(&result), vec!["top", "first", "second", "third"]);
    }

    #[test]
    fn test_shaping_is_idempotent() {
        let records = sample();
        let once = shape(&records, 1, 2, &Projection::REPO_LISTING);
        let twice = shape(&once, 1, 2, &Projection::REPO_LISTING);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_projection_keeps_only_named_fields() {
        let records = sample();
        let result = shape(&records, 0, 1, &Projection::REPO_LISTING_DESCRIBED);
        let keys: Vec<&String> = result[0].as_object().unwrap().keys().collect();
        assert_eq!(keys.len(), 4);
        assert_eq!(result[0]["url"], "https://github.com/o/b");
        assert_eq!(result[0]["description"], Value::Null);
        assert!(result[0].get("fork").is_none());
    }

    #[test]
    fn test_search_hit_names_users_by_login() {
        let user = json!({"login": "octocat", "html_url": "https://github.com/octocat"});
        let hit = Projection::SEARCH_HIT.apply(&user);
        assert_eq!(hit["name"], "octocat");
        assert_eq!(hit["url"], "https://github.com/octocat");
    }

    #[test]
    fn test_search_hit_commits_and_topics() {
        let commit = json!({
            "sha": "bb4cc8d",
            "html_url": "https://github.com/o/r/commit/bb4cc8d",
            "commit": {"message": "Fix parser on empty input"}
        });
        let hit = Projection::SEARCH_HIT.apply(&commit);
        assert_eq!(hit["name"], "bb4cc8d");
        assert_eq!(hit["description"], "Fix parser on empty input");
        assert_eq!(hit["url"], "https://github.com/o/r/commit/bb4cc8d");

        let topic = json!({
            "name": "rust",
            "display_name": "Rust",
            "short_description": "A systems programming language.",
            "description": null
        });
        let hit = Projection::SEARCH_HIT.apply(&topic);
        assert_eq!(hit["name"], "rust");
        assert_eq!(hit["description"], "A systems programming language.");
        assert_eq!(hit["url"], Value::Null);
    }

    #[test]
    fn test_nested_sources() {
        let issue = json!({"number": 7, "title": "Broken", "user": {"login": "hubot"}});
        let projected = Projection::ISSUE.apply(&issue);
        assert_eq!(projected["author"], "hubot");
        assert_eq!(projected["number"], 7);
        assert_eq!(Projection::ISSUE.keys().count(), 7);
    }

    #[test]
    fn test_shape_value_null_is_empty() {
        let result = shape_value(&Value::Null, 0, 10, &Projection::REPO_LISTING).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_shape_value_rejects_non_array() {
        let payload = json!({"message": "Not Found"});
        let err = shape_value(&payload, 0, 10, &Projection::REPO_LISTING).unwrap_err();
        assert!(matches!(err, EasyGithubError::Format(_)));
        assert!(err.to_string().contains("an object"));
    }
}
