//! Claim JSON report written by certsuite

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};

use super::TestCaseStatus;
use crate::error::{QeError, Result};

pub const CLAIM_FILE: &str = "claim.json";

#[derive(Debug, Clone, Deserialize)]
pub struct ClaimRoot {
    pub claim: Claim,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Claim {
    #[serde(default)]
    pub results: BTreeMap<String, ResultEntry>,
    #[serde(default)]
    pub versions: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub metadata: ClaimMetadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimMetadata {
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
}

/// Older claims store a one-element array per test id
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ResultEntry {
    Single(TestCaseResult),
    List(Vec<TestCaseResult>),
}

impl ResultEntry {
    pub fn result(&self) -> Option<&TestCaseResult> {
        match self {
            ResultEntry::Single(r) => Some(r),
            ResultEntry::List(list) => list.first(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub state: String,
    #[serde(default)]
    pub skip_reason: String,
    /// JSON document listing compliant and non-compliant objects
    #[serde(default)]
    pub check_details: String,
    #[serde(rename = "testID", default)]
    pub test_id: Option<TestId>,
    #[serde(default)]
    pub failure_reason: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TestId {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub suite: String,
    #[serde(default)]
    pub tags: String,
}

/// One object certsuite reported on
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct ReportObject {
    pub object_type: String,
    #[serde(default)]
    pub object_fields_keys: Vec<String>,
    #[serde(default)]
    pub object_fields_values: Vec<String>,
}

impl ReportObject {
    /// Value recorded under `key`, e.g. "Namespace" or "Reason"
    pub fn field(&self, key: &str) -> Option<&str> {
        self.object_fields_keys
            .iter()
            .position(|k| k == key)
            .and_then(|i| self.object_fields_values.get(i))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct CheckDetails {
    #[serde(rename = "CompliantObjectsOut", default, deserialize_with = "null_as_empty")]
    pub compliant: Vec<ReportObject>,
    #[serde(rename = "NonCompliantObjectsOut", default, deserialize_with = "null_as_empty")]
    pub non_compliant: Vec<ReportObject>,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Claim {
    pub fn result(&self, test_case: &str) -> Option<&TestCaseResult> {
        self.results.get(test_case).and_then(ResultEntry::result)
    }

    pub fn test_cases(&self) -> impl Iterator<Item = (&str, &TestCaseResult)> {
        self.results
            .iter()
            .filter_map(|(id, entry)| entry.result().map(|r| (id.as_str(), r)))
    }
}

pub fn parse_str(raw: &str) -> Result<Claim> {
    let root: ClaimRoot = serde_json::from_str(raw)?;
    Ok(root.claim)
}

pub async fn parse_file(path: &Path) -> Result<Claim> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_str(&raw)
}

fn not_found(test_case: &str) -> QeError {
    QeError::TestCaseNotFound {
        test_case: test_case.to_string(),
        report: CLAIM_FILE.to_string(),
    }
}

/// Status recorded for `test_case`
pub fn test_case_status(claim: &Claim, test_case: &str) -> Result<TestCaseStatus> {
    let result = claim.result(test_case).ok_or_else(|| not_found(test_case))?;
    TestCaseStatus::parse(&result.state)
}

/// Compliant and non-compliant objects for `test_case`; empty details parse as empty lists
pub fn check_details(claim: &Claim, test_case: &str) -> Result<CheckDetails> {
    let result = claim.result(test_case).ok_or_else(|| not_found(test_case))?;
    if result.check_details.trim().is_empty() {
        return Ok(CheckDetails::default());
    }
    Ok(serde_json::from_str(&result.check_details)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn claim_json() -> String {
        let details = json!({
            "CompliantObjectsOut": [{
                "ObjectType": "Pod",
                "ObjectFieldsKeys": ["Reason", "Namespace", "PodName"],
                "ObjectFieldsValues": ["HostNetwork is not set", "ac-tests-1", "acdeployment-1"]
            }],
            "NonCompliantObjectsOut": null
        });

        json!({
            "claim": {
                "metadata": { "startTime": "2024-05-01 10:00:00 +0000 UTC", "endTime": "2024-05-01 10:01:00 +0000 UTC" },
                "versions": { "certSuite": "v5.2.0", "k8s": "v1.28.3" },
                "results": {
                    "access-control-host-network": {
                        "state": "passed",
                        "skipReason": "",
                        "checkDetails": details.to_string(),
                        "testID": { "id": "access-control-host-network", "suite": "access-control", "tags": "common" }
                    },
                    "lifecycle-pod-scheduling": [{
                        "state": "skipped",
                        "skipReason": "no pods with node selectors",
                        "checkDetails": ""
                    }]
                }
            }
        })
        .to_string()
    }

    #[test]
    fn test_map_and_array_result_shapes() {
        let claim = parse_str(&claim_json()).unwrap();

        assert_eq!(
            test_case_status(&claim, "access-control-host-network").unwrap(),
            TestCaseStatus::Passed
        );
        assert_eq!(
            test_case_status(&claim, "lifecycle-pod-scheduling").unwrap(),
            TestCaseStatus::Skipped
        );
        assert_eq!(
            claim.result("lifecycle-pod-scheduling").unwrap().skip_reason,
            "no pods with node selectors"
        );
        assert_eq!(claim.test_cases().count(), 2);
    }

    #[test]
    fn test_check_details() {
        let claim = parse_str(&claim_json()).unwrap();

        let details = check_details(&claim, "access-control-host-network").unwrap();
        assert!(details.non_compliant.is_empty());
        assert_eq!(details.compliant.len(), 1);
        assert_eq!(details.compliant[0].field("Namespace"), Some("ac-tests-1"));
        assert_eq!(details.compliant[0].field("Missing"), None);

        let empty = check_details(&claim, "lifecycle-pod-scheduling").unwrap();
        assert_eq!(empty, CheckDetails::default());
    }

    #[test]
    fn test_missing_test_case() {
        let claim = parse_str(&claim_json()).unwrap();
        assert!(matches!(
            test_case_status(&claim, "observability-crd-status"),
            Err(QeError::TestCaseNotFound { .. })
        ));
    }

    #[test]
    fn test_metadata() {
        let claim = parse_str(&claim_json()).unwrap();
        assert_eq!(
            claim.metadata.start_time.as_deref(),
            Some("2024-05-01 10:00:00 +0000 UTC")
        );
        assert_eq!(claim.versions["certSuite"], "v5.2.0");
    }
}
