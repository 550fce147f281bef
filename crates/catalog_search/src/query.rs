//! Composes the DNF (disjunction of view tag groups, conjunction within a
//! group) bool-filter query sent to the search backend.

use serde_json::{
    json,
    Value,
};

pub fn build_query(
    team_id: &str,
    anchor: i64,
    view_groups: &[Vec<String>],
    user_tags: &[String],
    name: &str,
) -> Value {
    let mut filters: Vec<Value> = vec![json!({"term": {"team_id": team_id}})];

    if anchor > 0 {
        filters.push(json!({"range": {"updated_timestamp": {"lte": anchor}}}));
    }

    if !view_groups.is_empty() {
        let should: Vec<Value> = view_groups
            .iter()
            .filter(|group| !group.is_empty())
            .map(|group| {
                let must: Vec<Value> = group
                    .iter()
                    .map(|tag| json!({"term": {"tag_ids": tag}}))
                    .collect();
                json!({"bool": {"filter": must}})
            })
            .collect();
        if !should.is_empty() {
            filters.push(json!({"bool": {"should": should, "minimum_should_match": 1}}));
        }
    }

    for tag in user_tags {
        filters.push(json!({"term": {"tag_ids": tag}}));
    }

    if !name.is_empty() {
        filters.push(json!({"wildcard": {"name": {"value": format!("*{name}*"), "case_insensitive": true}}}));
    }

    json!({"bool": {"filter": filters}})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_query_only_filters_team_and_anchor() {
        let query = build_query("team1", 100, &[], &[], "");
        assert_eq!(
            query,
            json!({"bool": {"filter": [
                {"term": {"team_id": "team1"}},
                {"range": {"updated_timestamp": {"lte": 100}}},
            ]}})
        );
    }

    #[test]
    fn view_groups_become_a_should_disjunction() {
        let groups = vec![vec!["a".to_string(), "b".to_string()], vec!["c".to_string()]];
        let query = build_query("team1", 0, &groups, &[], "");
        let should = &query["bool"]["filter"][1]["bool"]["should"];
        assert_eq!(should.as_array().unwrap().len(), 2);
    }
}
