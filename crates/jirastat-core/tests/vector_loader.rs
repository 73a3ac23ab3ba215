//! JSON test vector loader shared by changelog tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::collections::BTreeMap;
use std::fs;

use serde::Deserialize;

use jirastat_core::Issue;

#[derive(Debug, Deserialize)]
pub struct TestVector {
    pub description: String,
    pub issue: Issue,
    /// Expected seconds per exited status.
    #[serde(default)]
    pub expect: Option<BTreeMap<String, u64>>,
    #[serde(default)]
    pub expect_error: Option<ExpectError>,
}

#[derive(Debug, Deserialize)]
pub struct ExpectError {
    pub code: String,
    #[serde(default)]
    pub entry: Option<usize>,
}

pub fn load(name: &str) -> TestVector {
    let s = fs::read_to_string(format!("tests/vectors/{name}")).unwrap();
    serde_json::from_str(&s).unwrap_or_else(|e| panic!("bad vector {name}: {e}"))
}
