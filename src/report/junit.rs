//! JUnit XML report written by certsuite
//!
//! Certsuite names test cases by their id (`access-control-host-network`);
//! older Ginkgo-based runs wrap the id as `[It] access-control
//! access-control-host-network [common, ...]`. Both are matched.

use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::Deserialize;
use tracing::warn;

use super::TestCaseStatus;
use crate::error::{QeError, Result};

pub const JUNIT_FILE: &str = "cnf-certification-tests_junit.xml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JunitReport {
    #[serde(rename = "testsuite", default)]
    pub testsuites: Vec<Testsuite>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Testsuite {
    #[serde(rename = "@name", default)]
    pub name: String,
    #[serde(rename = "testcase", default)]
    pub testcases: Vec<Testcase>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Testcase {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(rename = "@classname", default)]
    pub classname: Option<String>,
    #[serde(rename = "@status", default)]
    pub status: Option<String>,
    #[serde(rename = "@time", default)]
    pub time: Option<String>,
    #[serde(default)]
    pub failure: Option<Outcome>,
    #[serde(default)]
    pub error: Option<Outcome>,
    #[serde(default)]
    pub skipped: Option<Outcome>,
}

/// Body of a `failure`, `error` or `skipped` element
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Outcome {
    #[serde(rename = "@message", default)]
    pub message: Option<String>,
    #[serde(rename = "$text", default)]
    pub text: Option<String>,
}

impl Testcase {
    /// Child elements win over the status attribute; no marker at all means
    /// passed, an unrecognised attribute (`pending`, `timedout`...) means error
    pub fn status(&self) -> TestCaseStatus {
        if self.failure.is_some() {
            TestCaseStatus::Failed
        } else if self.error.is_some() {
            TestCaseStatus::Error
        } else if self.skipped.is_some() {
            TestCaseStatus::Skipped
        } else {
            match self.status.as_deref() {
                None => TestCaseStatus::Passed,
                Some(raw) => TestCaseStatus::parse(raw).unwrap_or_else(|_| {
                    warn!(test_case = %self.name, status = raw, "Unrecognised JUnit status");
                    TestCaseStatus::Error
                }),
            }
        }
    }

    pub fn matches(&self, test_case: &str) -> bool {
        self.name == test_case || self.name.split_whitespace().any(|token| token == test_case)
    }
}

impl JunitReport {
    pub fn testcases(&self) -> impl Iterator<Item = &Testcase> {
        self.testsuites.iter().flat_map(|s| s.testcases.iter())
    }

    pub fn find(&self, test_case: &str) -> Option<&Testcase> {
        self.testcases().find(|tc| tc.matches(test_case))
    }
}

/// Parse a report whose root is either `<testsuites>` or a single `<testsuite>`
pub fn parse_str(xml: &str) -> Result<JunitReport> {
    if root_element(xml)?.as_deref() == Some("testsuites") {
        Ok(quick_xml::de::from_str(xml)?)
    } else {
        let suite: Testsuite = quick_xml::de::from_str(xml)?;
        Ok(JunitReport {
            testsuites: vec![suite],
        })
    }
}

/// Local name of the first element, skipping the declaration and comments
fn root_element(xml: &str) -> Result<Option<String>> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().map_err(quick_xml::DeError::from)? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(Some(
                    String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
                ))
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

pub async fn parse_file(path: &Path) -> Result<JunitReport> {
    let raw = tokio::fs::read_to_string(path).await?;
    parse_str(&raw)
}

/// Status recorded for `test_case`
pub fn test_case_status(report: &JunitReport, test_case: &str) -> Result<TestCaseStatus> {
    report
        .find(test_case)
        .map(Testcase::status)
        .ok_or_else(|| QeError::TestCaseNotFound {
            test_case: test_case.to_string(),
            report: JUNIT_FILE.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    const REPORT: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<testsuites tests="4" disabled="0" errors="0" failures="1" time="12.5">
  <testsuite name="CNF Certification Test Suite" package="" tests="4">
    <properties>
      <property name="SuiteSucceeded" value="false"></property>
    </properties>
    <testcase name="access-control-host-network" classname="CNF Certification Test Suite" status="passed" time="0.1">
      <system-err>ok</system-err>
    </testcase>
    <testcase name="access-control-host-pid" classname="CNF Certification Test Suite" status="failed" time="0.2">
      <failure message="pod uses host PID" type="failed">non compliant</failure>
    </testcase>
    <testcase name="[It] lifecycle lifecycle-liveness-probe [common, lifecycle]" status="skipped" time="0">
      <skipped message="skipped: no pods"></skipped>
    </testcase>
    <testcase name="networking-icmpv4-connectivity" status="error" time="0">
      <error message="panic"></error>
    </testcase>
  </testsuite>
</testsuites>"#;

    #[test]
    fn test_statuses_from_children() {
        let report = parse_str(REPORT).unwrap();
        assert_eq!(report.testcases().count(), 4);

        assert_eq!(
            test_case_status(&report, "access-control-host-network").unwrap(),
            TestCaseStatus::Passed
        );
        assert_eq!(
            test_case_status(&report, "access-control-host-pid").unwrap(),
            TestCaseStatus::Failed
        );
        assert_eq!(
            test_case_status(&report, "networking-icmpv4-connectivity").unwrap(),
            TestCaseStatus::Error
        );
    }

    #[test]
    fn test_ginkgo_style_name_matches_token() {
        let report = parse_str(REPORT).unwrap();
        assert_eq!(
            test_case_status(&report, "lifecycle-liveness-probe").unwrap(),
            TestCaseStatus::Skipped
        );
        // substrings of a token do not match
        assert!(report.find("lifecycle-liveness").is_none());
    }

    #[test]
    fn test_failure_message() {
        let report = parse_str(REPORT).unwrap();
        let tc = report.find("access-control-host-pid").unwrap();
        let failure = tc.failure.as_ref().unwrap();
        assert_eq!(failure.message.as_deref(), Some("pod uses host PID"));
        assert_eq!(failure.text.as_deref(), Some("non compliant"));
    }

    #[test]
    fn test_missing_test_case() {
        let report = parse_str(REPORT).unwrap();
        let err = test_case_status(&report, "platform-alteration-boot-params").unwrap_err();
        assert!(matches!(err, QeError::TestCaseNotFound { .. }));
    }

    #[test]
    fn test_single_testsuite_root() {
        let report = parse_str(
            r#"<testsuite name="s"><testcase name="observability-crd-status"></testcase></testsuite>"#,
        )
        .unwrap();
        assert_eq!(
            test_case_status(&report, "observability-crd-status").unwrap(),
            TestCaseStatus::Passed
        );
    }

    #[test]
    fn test_unknown_status_attribute_is_not_passed() {
        let report = parse_str(
            r#"<testsuite name="s">
  <testcase name="tc-pending" status="pending"></testcase>
  <testcase name="tc-timedout" status="timedout"></testcase>
  <testcase name="tc-plain"></testcase>
</testsuite>"#,
        )
        .unwrap();

        assert_eq!(test_case_status(&report, "tc-pending").unwrap(), TestCaseStatus::Error);
        assert_eq!(test_case_status(&report, "tc-timedout").unwrap(), TestCaseStatus::Error);
        assert_eq!(test_case_status(&report, "tc-plain").unwrap(), TestCaseStatus::Passed);
    }

    #[test]
    fn test_single_testsuite_mentioning_testsuites() {
        let report = parse_str(
            r#"<?xml version="1.0"?>
<!-- merged from <testsuites> by the runner -->
<testsuite name="merged">
  <testcase name="observability-termination-policy" status="failed"></testcase>
</testsuite>"#,
        )
        .unwrap();

        assert_eq!(report.testsuites.len(), 1);
        assert_eq!(
            test_case_status(&report, "observability-termination-policy").unwrap(),
            TestCaseStatus::Failed
        );
    }
}
