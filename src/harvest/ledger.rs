/// Per-board set of identifiers already persisted or claimed this session
///
/// Seeded from the output table's identifier column when a board starts and
/// only ever grows. Discovery consults it to skip posts stored by earlier
/// runs; the orchestrator claims each identifier here before extracting it.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    ids: std::collections::HashSet<String>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a ledger already holding `existing`
    pub fn seeded<I>(existing: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let mut ledger = Self::new();
        ledger.seed_from(existing);
        ledger
    }

    /// Adds identifiers read from a persisted table
    pub fn seed_from<I>(&mut self, existing: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.ids.extend(existing);
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    /// Claims an identifier; returns false if it was already present
    pub fn add(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        self.ids.insert(id.to_string())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
