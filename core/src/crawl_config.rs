//! Per-target crawl configuration schema.
//!
//! One JSON document per target tells the crawler where to start, what to
//! skip, and which identifier patterns to lift into relationships. The
//! crawler itself lives outside this workspace; it honors the same upsert
//! contract as the correlation engine when it writes extracted facts.

use anyhow::{anyhow, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtraRelationshipRule {
    pub name: String,
    pub regex: String,
    /// When set, all matches of this sub-pattern collapse into a single
    /// relationship instead of one per match.
    #[serde(default)]
    pub rollup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipRule {
    pub name: String,
    #[serde(rename = "triggeridentifierregex")]
    pub trigger_identifier_regex: String,
    #[serde(rename = "extrarelationships", default)]
    pub extra_relationships: Vec<ExtraRelationshipRule>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub onion: String,
    pub base: String,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<RelationshipRule>,
}

impl CrawlConfig {
    pub fn from_json(raw: &str) -> Result<CrawlConfig> {
        let cc: CrawlConfig = serde_json::from_str(raw)?;
        cc.validate()?;
        Ok(cc)
    }

    /// Compile every pattern once so malformed configs fail at load time
    /// rather than mid-crawl.
    fn validate(&self) -> Result<()> {
        for rule in &self.relationships {
            Regex::new(&rule.trigger_identifier_regex)
                .map_err(|e| anyhow!("rule {:?}: bad trigger regex: {}", rule.name, e))?;
            for extra in &rule.extra_relationships {
                Regex::new(&extra.regex)
                    .map_err(|e| anyhow!("rule {:?}/{:?}: bad regex: {}", rule.name, extra.name, e))?;
            }
        }
        Ok(())
    }

    pub fn relationship_rule(&self, name: &str) -> Result<&RelationshipRule> {
        self.relationships
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| anyhow!("could not find relationship rule {:?}", name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "onion": "abc.onion",
        "base": "/forum",
        "exclude": ["/logout"],
        "relationships": [{
            "name": "user",
            "triggeridentifierregex": "/user/([0-9]+)",
            "extrarelationships": [
                {"name": "username", "regex": "<b>([^<]+)</b>", "rollup": false},
                {"name": "forum-software", "regex": "powered by ([a-z]+)", "rollup": true}
            ]
        }]
    }"#;

    #[test]
    fn parses_full_document() {
        let cc = CrawlConfig::from_json(SAMPLE).unwrap();
        assert_eq!(cc.onion, "abc.onion");
        assert_eq!(cc.exclude, vec!["/logout"]);
        let rule = cc.relationship_rule("user").unwrap();
        assert_eq!(rule.extra_relationships.len(), 2);
        assert!(rule.extra_relationships[1].rollup);
    }

    #[test]
    fn missing_rule_is_an_error() {
        let cc = CrawlConfig::from_json(SAMPLE).unwrap();
        assert!(cc.relationship_rule("nope").is_err());
    }

    #[test]
    fn rejects_bad_regex() {
        let raw = r#"{"onion":"x.onion","base":"/","relationships":
            [{"name":"broken","triggeridentifierregex":"(unclosed"}]}"#;
        assert!(CrawlConfig::from_json(raw).is_err());
    }
}
