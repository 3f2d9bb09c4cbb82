//! Reading certsuite's reports and checking verdicts
//!
//! Every run leaves two reports in its output directory: the JUnit XML
//! file and the claim JSON file. A scenario passes only when both record
//! the expected status for its test case.

pub mod claim;
pub mod junit;

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{info, instrument, warn};

use crate::error::{QeError, Result};

pub use claim::CLAIM_FILE;
pub use junit::JUNIT_FILE;

/// Verdict certsuite records for one test case
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Display,
    EnumString,
    EnumIter,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum TestCaseStatus {
    Passed,
    Failed,
    Skipped,
    Error,
}

impl TestCaseStatus {
    pub fn parse(raw: &str) -> Result<Self> {
        Self::from_str(raw.trim()).map_err(|_| QeError::InvalidStatus(raw.to_string()))
    }
}

/// Check that both reports in `report_dir` record `expected` for `test_case`
#[instrument]
pub async fn verify_test_case(
    report_dir: &Path,
    test_case: &str,
    expected: TestCaseStatus,
) -> Result<()> {
    let junit_report = junit::parse_file(&report_dir.join(JUNIT_FILE)).await?;
    check(
        test_case,
        expected,
        junit::test_case_status(&junit_report, test_case)?,
        JUNIT_FILE,
    )?;

    let claim = claim::parse_file(&report_dir.join(CLAIM_FILE)).await?;
    check(
        test_case,
        expected,
        claim::test_case_status(&claim, test_case)?,
        CLAIM_FILE,
    )?;

    info!(test_case, status = %expected, "Verdict verified");
    Ok(())
}

fn check(
    test_case: &str,
    expected: TestCaseStatus,
    actual: TestCaseStatus,
    report: &str,
) -> Result<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(QeError::StatusMismatch {
            test_case: test_case.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
            report: report.to_string(),
        })
    }
}

/// Per-status counts of a report directory
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub counts: BTreeMap<TestCaseStatus, usize>,
    pub test_cases: BTreeMap<String, TestCaseStatus>,
}

impl Summary {
    pub fn count(&self, status: TestCaseStatus) -> usize {
        self.counts.get(&status).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    fn record(&mut self, test_case: &str, status: TestCaseStatus) {
        *self.counts.entry(status).or_default() += 1;
        self.test_cases.insert(test_case.to_string(), status);
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} test case(s):", self.total())?;
        for status in TestCaseStatus::iter() {
            write!(f, " {}={}", status, self.count(status))?;
        }
        Ok(())
    }
}

/// Summarize the claim file, falling back to the JUnit file when no claim exists.
///
/// States outside the four verdicts are counted as errors.
pub async fn summarize(report_dir: &Path) -> Result<Summary> {
    let mut summary = Summary::default();

    let claim_path = report_dir.join(CLAIM_FILE);
    if tokio::fs::try_exists(&claim_path).await? {
        let claim = claim::parse_file(&claim_path).await?;
        for (id, result) in claim.test_cases() {
            let status = TestCaseStatus::parse(&result.state).unwrap_or_else(|_| {
                warn!(test_case = id, state = %result.state, "Unrecognised claim state");
                TestCaseStatus::Error
            });
            summary.record(id, status);
        }
    } else {
        let report = junit::parse_file(&report_dir.join(JUNIT_FILE)).await?;
        for tc in report.testcases() {
            summary.record(&tc.name, tc.status());
        }
    }

    Ok(summary)
}
