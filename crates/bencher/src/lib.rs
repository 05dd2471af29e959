#[derive(Debug, Copy, Clone)]
pub struct TestCase {
    name: &'static str,
    group: TestGroup,
    shape: TableShape,
}

impl TestCase {
    pub fn new(name: &'static str, group: TestGroup, shape: TableShape) -> Self {
        Self { name, group, shape }
    }

    pub fn small(name: &'static str, shape: TableShape) -> Self {
        Self::new(name, TestGroup::Small, shape)
    }

    pub fn normal(name: &'static str, shape: TableShape) -> Self {
        Self::new(name, TestGroup::Normal, shape)
    }

    pub fn large(name: &'static str, shape: TableShape) -> Self {
        Self::new(name, TestGroup::Large, shape)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn group(&self) -> TestGroup {
        self.group
    }

    pub fn shape(&self) -> &TableShape {
        &self.shape
    }
}

/// Size of a generated route table: `resources` resource families, each registered at
/// `versions` versions.
#[derive(Debug, Copy, Clone)]
pub struct TableShape {
    resources: usize,
    versions: usize,
}

impl TableShape {
    pub const fn new(resources: usize, versions: usize) -> Self {
        Self { resources, versions }
    }

    pub fn resources(&self) -> usize {
        self.resources
    }

    pub fn versions(&self) -> usize {
        self.versions
    }

    /// Every resource registers a list, a get and a nested route per version.
    pub fn route_count(&self) -> usize {
        self.resources * self.versions * 3
    }
}

#[derive(Clone, Copy, Debug)]
pub enum TestGroup {
    Small,
    Normal,
    Large,
}
