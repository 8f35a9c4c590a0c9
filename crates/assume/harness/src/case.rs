//! Tests, fixtures and suites.

use crate::error::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Body of a phase: a test function, a fixture setup or a fixture teardown.
pub type PhaseFn = Arc<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// A function-scoped fixture: its setup runs in the setup phase of every test
/// that uses it, and its teardown in that test's teardown phase.
#[derive(Clone)]
pub struct Fixture {
    name: String,
    setup: PhaseFn,
    teardown: Option<PhaseFn>,
}

impl Fixture {
    pub fn new<F>(name: impl Into<String>, setup: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            setup: Arc::new(setup),
            teardown: None,
        }
    }

    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(teardown));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn setup(&self) -> anyhow::Result<()> {
        (self.setup)()
    }

    pub(crate) fn teardown(&self) -> anyhow::Result<()> {
        match self.teardown {
            Some(ref teardown) => teardown(),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Fixture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fixture")
            .field("name", &self.name)
            .field("teardown", &self.teardown.is_some())
            .finish()
    }
}

/// Expected-failure mark
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XFail {
    pub reason: String,

    /// Run the test body at all
    pub run: bool,

    /// An unexpected pass fails the test
    pub strict: bool,
}

impl XFail {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            run: true,
            strict: false,
        }
    }

    pub fn run(mut self, run: bool) -> Self {
        self.run = run;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }
}

/// A single test: a body plus the fixtures it requests and its marks.
#[derive(Clone)]
pub struct TestCase {
    name: String,
    fixtures: Vec<String>,
    body: PhaseFn,
    xfail: Option<XFail>,
    skip: Option<String>,
}

impl TestCase {
    pub fn new<F>(name: impl Into<String>, body: F) -> Self
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            fixtures: Vec::new(),
            body: Arc::new(body),
            xfail: None,
            skip: None,
        }
    }

    /// Request a fixture; fixtures are set up in request order
    pub fn uses(mut self, fixture: impl Into<String>) -> Self {
        self.fixtures.push(fixture.into());
        self
    }

    /// Mark as expected to fail
    pub fn xfail(self, reason: impl Into<String>) -> Self {
        self.xfail_with(XFail::new(reason))
    }

    pub fn xfail_with(mut self, xfail: XFail) -> Self {
        self.xfail = Some(xfail);
        self
    }

    /// Mark as skipped; no phase runs
    pub fn skip(mut self, reason: impl Into<String>) -> Self {
        self.skip = Some(reason.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fixtures(&self) -> &[String] {
        &self.fixtures
    }

    pub fn xfail_mark(&self) -> Option<&XFail> {
        self.xfail.as_ref()
    }

    pub fn skip_reason(&self) -> Option<&str> {
        self.skip.as_deref()
    }

    pub(crate) fn call(&self) -> anyhow::Result<()> {
        (self.body)()
    }
}

impl fmt::Debug for TestCase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestCase")
            .field("name", &self.name)
            .field("fixtures", &self.fixtures)
            .field("xfail", &self.xfail)
            .field("skip", &self.skip)
            .finish()
    }
}

/// A named collection of tests and the fixtures they draw on.
#[derive(Debug, Clone)]
pub struct Suite {
    name: String,
    fixtures: BTreeMap<String, Fixture>,
    tests: Vec<TestCase>,
}

impl Suite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fixtures: BTreeMap::new(),
            tests: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tests(&self) -> &[TestCase] {
        &self.tests
    }

    pub fn add_fixture(&mut self, fixture: Fixture) -> HarnessResult<()> {
        if self.fixtures.contains_key(fixture.name()) {
            return Err(HarnessError::DuplicateFixture(fixture.name().to_string()));
        }
        self.fixtures.insert(fixture.name().to_string(), fixture);
        Ok(())
    }

    pub fn add_test(&mut self, test: TestCase) -> HarnessResult<()> {
        if self.tests.iter().any(|t| t.name() == test.name()) {
            return Err(HarnessError::DuplicateTest(self.test_id(&test)));
        }
        self.tests.push(test);
        Ok(())
    }

    pub fn with_fixture(mut self, fixture: Fixture) -> HarnessResult<Self> {
        self.add_fixture(fixture)?;
        Ok(self)
    }

    pub fn with_test(mut self, test: TestCase) -> HarnessResult<Self> {
        self.add_test(test)?;
        Ok(self)
    }

    /// Identity used in reports: `suite::test`
    pub fn test_id(&self, test: &TestCase) -> String {
        format!("{}::{}", self.name, test.name())
    }

    /// Check that every requested fixture exists
    pub fn validate(&self) -> HarnessResult<()> {
        for test in &self.tests {
            self.resolve(test)?;
        }
        Ok(())
    }

    pub(crate) fn resolve(&self, test: &TestCase) -> HarnessResult<Vec<&Fixture>> {
        test.fixtures()
            .iter()
            .map(|name| {
                self.fixtures
                    .get(name)
                    .ok_or_else(|| HarnessError::UnknownFixture {
                        test: self.test_id(test),
                        fixture: name.clone(),
                    })
            })
            .collect()
    }
}
