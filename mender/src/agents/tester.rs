//! Tester agent: generates self-contained unit tests for a change set.

use anyhow::Result;
use tracing::{debug, instrument};

use crate::core::types::{ChangeSet, GeneratedTest, TestSuite};
use crate::model::prompt::PromptEngine;
use crate::model::{Model, ModelRequest, complete_structured};

const TEST_SUITE_SCHEMA: &str = include_str!("../../schemas/test_suite.schema.json");

/// Ask the model for tests covering `change_set`.
///
/// An empty suite is a valid reply and means the changes have nothing
/// executable to verify.
#[instrument(skip_all, fields(changes = change_set.changes.len()))]
pub fn generate_tests<M: Model>(model: &M, change_set: &ChangeSet) -> Result<Vec<GeneratedTest>> {
    let prompt = PromptEngine::new().render_tester(change_set)?;
    let suite: TestSuite =
        complete_structured(model, &ModelRequest::new(prompt), TEST_SUITE_SCHEMA)?;
    debug!(tests = suite.tests.len(), "test suite received");
    Ok(suite.tests)
}
