//! Test registry: the registration model feeding discovery.
//!
//! Suites describe themselves as [`FixtureDescriptor`]s (one per test
//! class) holding [`MethodDescriptor`]s classified into the six recognized
//! roles. Classification happens exactly once, at registration; the
//! scheduler dispatches on the stored [`MethodRole`] tag and never
//! re-inspects markers at run time.

use crate::result::EnsayarResult;
use crate::settings::MethodMarker;
use crate::step::{TestContext, TestCoroutine};
use std::sync::{Arc, Mutex, OnceLock};

/// The six recognized method roles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MethodRole {
    /// Synchronous test body
    SyncTest,
    /// Frame-cooperative test body
    AsyncTest,
    /// Per-test setup
    SetUp,
    /// Per-test teardown
    TearDown,
    /// Class-level setup, once per run pass
    OneTimeSetUp,
    /// Class-level teardown, once per run pass
    OneTimeTearDown,
}

impl MethodRole {
    /// Whether this role contributes a leaf node to the tree
    #[must_use]
    pub const fn is_test(self) -> bool {
        matches!(self, Self::SyncTest | Self::AsyncTest)
    }
}

/// A synchronous invokable: fixtures and sync test bodies
pub type FixtureFn = Box<dyn FnMut(&mut TestContext) -> EnsayarResult<()> + Send>;

/// Factory producing a fresh coroutine for each run of an async test
pub type CoroutineFactory = Box<dyn FnMut() -> Box<dyn TestCoroutine> + Send>;

/// Invokable body of a registered method
pub enum MethodBody {
    /// Runs to completion in a single step
    Sync(FixtureFn),
    /// Resumed step-by-step across frame ticks
    Coroutine(CoroutineFactory),
}

impl std::fmt::Debug for MethodBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(_) => write!(f, "Sync(..)"),
            Self::Coroutine(_) => write!(f, "Coroutine(..)"),
        }
    }
}

/// One registered method of a test class
#[derive(Debug)]
pub struct MethodDescriptor {
    /// Method name (tree leaf segment for test roles)
    pub name: String,
    /// Classified role
    pub role: MethodRole,
    /// Declared markers, source order
    pub markers: Vec<MethodMarker>,
    /// Inheritance depth of the declaring class: 0 = base-most
    pub declaring_depth: usize,
    /// Invokable body
    pub body: MethodBody,
}

impl MethodDescriptor {
    fn new(name: impl Into<String>, role: MethodRole, body: MethodBody) -> Self {
        Self {
            name: name.into(),
            role,
            markers: Vec::new(),
            declaring_depth: 0,
            body,
        }
    }

    /// A synchronous test method
    #[must_use]
    pub fn test(
        name: impl Into<String>,
        body: impl FnMut(&mut TestContext) -> EnsayarResult<()> + Send + 'static,
    ) -> Self {
        Self::new(name, MethodRole::SyncTest, MethodBody::Sync(Box::new(body)))
    }

    /// A frame-cooperative test method
    #[must_use]
    pub fn async_test(
        name: impl Into<String>,
        factory: impl FnMut() -> Box<dyn TestCoroutine> + Send + 'static,
    ) -> Self {
        Self::new(
            name,
            MethodRole::AsyncTest,
            MethodBody::Coroutine(Box::new(factory)),
        )
    }

    /// Per-test setup
    #[must_use]
    pub fn set_up(
        name: impl Into<String>,
        body: impl FnMut(&mut TestContext) -> EnsayarResult<()> + Send + 'static,
    ) -> Self {
        Self::new(name, MethodRole::SetUp, MethodBody::Sync(Box::new(body)))
    }

    /// Per-test teardown
    #[must_use]
    pub fn tear_down(
        name: impl Into<String>,
        body: impl FnMut(&mut TestContext) -> EnsayarResult<()> + Send + 'static,
    ) -> Self {
        Self::new(name, MethodRole::TearDown, MethodBody::Sync(Box::new(body)))
    }

    /// Class-level setup, once per run pass
    #[must_use]
    pub fn one_time_set_up(
        name: impl Into<String>,
        body: impl FnMut(&mut TestContext) -> EnsayarResult<()> + Send + 'static,
    ) -> Self {
        Self::new(
            name,
            MethodRole::OneTimeSetUp,
            MethodBody::Sync(Box::new(body)),
        )
    }

    /// Class-level teardown, once per run pass
    #[must_use]
    pub fn one_time_tear_down(
        name: impl Into<String>,
        body: impl FnMut(&mut TestContext) -> EnsayarResult<()> + Send + 'static,
    ) -> Self {
        Self::new(
            name,
            MethodRole::OneTimeTearDown,
            MethodBody::Sync(Box::new(body)),
        )
    }

    /// Attach a marker (declaration order preserved)
    #[must_use]
    pub fn with_marker(mut self, marker: MethodMarker) -> Self {
        self.markers.push(marker);
        self
    }

    /// Set the inheritance depth of the declaring class
    #[must_use]
    pub const fn at_depth(mut self, depth: usize) -> Self {
        self.declaring_depth = depth;
        self
    }
}

/// One registered test class
#[derive(Debug)]
pub struct FixtureDescriptor {
    /// Owning assembly/plugin name, checked against the denylist
    pub assembly: String,
    /// Full type path: dotted namespaces, `+`-separated nested classes
    pub type_path: String,
    /// Base-class chain, base-most first
    pub base_chain: Vec<String>,
    /// Abstract classes contribute no node
    pub is_abstract: bool,
    /// Class-level ignore reason propagated to methods
    pub class_ignore: Option<String>,
    /// Registered methods
    pub methods: Vec<MethodDescriptor>,
}

impl FixtureDescriptor {
    /// Describe a test class
    #[must_use]
    pub fn new(assembly: impl Into<String>, type_path: impl Into<String>) -> Self {
        Self {
            assembly: assembly.into(),
            type_path: type_path.into(),
            base_chain: Vec::new(),
            is_abstract: false,
            class_ignore: None,
            methods: Vec::new(),
        }
    }

    /// Append a base class (base-most first)
    #[must_use]
    pub fn with_base(mut self, name: impl Into<String>) -> Self {
        self.base_chain.push(name.into());
        self
    }

    /// Mark the class abstract
    #[must_use]
    pub const fn abstract_class(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Ignore every method of the class with a default reason
    #[must_use]
    pub fn ignored(mut self, reason: impl Into<String>) -> Self {
        self.class_ignore = Some(reason.into());
        self
    }

    /// Register a method
    #[must_use]
    pub fn method(mut self, method: MethodDescriptor) -> Self {
        self.methods.push(method);
        self
    }

    /// Whether the class declares at least one test method
    #[must_use]
    pub fn has_tests(&self) -> bool {
        self.methods.iter().any(|m| m.role.is_test())
    }

    /// Whether the class derives from the named base (or is it)
    #[must_use]
    pub fn derives_from(&self, base: &str) -> bool {
        self.type_path == base || self.base_chain.iter().any(|b| b == base)
    }
}

/// Stable reference from a tree leaf back to its registered body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodRef {
    /// Index of the fixture in the registry it was built from
    pub fixture: usize,
    /// Index of the method in that fixture
    pub method: usize,
}

/// All registered fixtures for one discovery pass
#[derive(Debug, Default)]
pub struct TestRegistry {
    fixtures: Vec<FixtureDescriptor>,
}

impl TestRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry engine integrations register into
    pub fn global() -> Arc<Mutex<Self>> {
        static GLOBAL: OnceLock<Arc<Mutex<TestRegistry>>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(Mutex::new(Self::new())))
            .clone()
    }

    /// Register a fixture, returning its index
    pub fn register(&mut self, fixture: FixtureDescriptor) -> usize {
        self.fixtures.push(fixture);
        self.fixtures.len() - 1
    }

    /// All registered fixtures
    #[must_use]
    pub fn fixtures(&self) -> &[FixtureDescriptor] {
        &self.fixtures
    }

    /// Fixture by index
    #[must_use]
    pub fn fixture(&self, index: usize) -> Option<&FixtureDescriptor> {
        self.fixtures.get(index)
    }

    /// Mutable fixture access, used by the scheduler to invoke bodies
    pub fn fixture_mut(&mut self, index: usize) -> Option<&mut FixtureDescriptor> {
        self.fixtures.get_mut(index)
    }

    /// Resolve a method reference to its descriptor
    pub fn method_mut(&mut self, reference: MethodRef) -> Option<&mut MethodDescriptor> {
        self.fixtures
            .get_mut(reference.fixture)
            .and_then(|f| f.methods.get_mut(reference.method))
    }

    /// Number of registered fixtures
    #[must_use]
    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    /// Whether the registry is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}
