use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Difficulty tag carried by every lab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Beginner,
    Intermediate,
    Advanced,
}

/// One vulnerability lab known to the achievement rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LabEntry {
    pub id: String,
    pub category: String,
    pub difficulty: Difficulty,
}

impl LabEntry {
    fn new(id: &str, category: &str, difficulty: Difficulty) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
            difficulty,
        }
    }
}

/// Labs and tools the rules quantify over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Catalog {
    #[serde(default)]
    pub labs: Vec<LabEntry>,
    #[serde(default)]
    pub tools: Vec<String>,
}

impl Default for Catalog {
    fn default() -> Self {
        use Difficulty::*;
        Self {
            labs: vec![
                LabEntry::new("sql-injection-1", "sql-injection", Beginner),
                LabEntry::new("sql-injection-2", "sql-injection", Intermediate),
                LabEntry::new("sql-injection-blind", "sql-injection", Advanced),
                LabEntry::new("xss-reflected", "xss", Beginner),
                LabEntry::new("xss-stored", "xss", Intermediate),
                LabEntry::new("xss-dom", "xss", Advanced),
                LabEntry::new("csrf-basic", "csrf", Beginner),
                LabEntry::new("command-injection", "command-injection", Advanced),
            ],
            tools: [
                "nmap",
                "burp-suite",
                "sqlmap",
                "wireshark",
                "metasploit",
                "hashcat",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl Catalog {
    pub fn labs_in_category<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.labs
            .iter()
            .filter(move |l| l.category == category)
            .map(|l| l.id.as_str())
    }

    pub fn labs_with_difficulty(&self, difficulty: Difficulty) -> impl Iterator<Item = &str> + '_ {
        self.labs
            .iter()
            .filter(move |l| l.difficulty == difficulty)
            .map(|l| l.id.as_str())
    }

    pub fn tool_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.tools.iter().map(String::as_str)
    }

    pub fn lab_count(&self) -> usize {
        self.labs.len()
    }

    /// Number of catalog labs present in `completed`.
    pub fn completed_lab_count(&self, completed: &BTreeSet<String>) -> usize {
        self.labs.iter().filter(|l| completed.contains(&l.id)).count()
    }

    /// Ids must be non-empty and unique per kind.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for lab in &self.labs {
            if lab.id.trim().is_empty() || lab.category.trim().is_empty() {
                return Err("catalog lab with empty id or category".into());
            }
            if !seen.insert(lab.id.as_str()) {
                return Err(format!("duplicate lab id in catalog: {}", lab.id));
            }
        }
        let mut seen = HashSet::new();
        for tool in &self.tools {
            if tool.trim().is_empty() {
                return Err("catalog tool with empty id".into());
            }
            if !seen.insert(tool.as_str()) {
                return Err(format!("duplicate tool id in catalog: {tool}"));
            }
        }
        Ok(())
    }
}
