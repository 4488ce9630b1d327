use super::samples::{
    SampleNote, QUICK_NOTE, QUICK_QUERY, QUICK_SEARCH_K, SAMPLE_NOTES, SAMPLE_QUERIES, SEARCH_K,
};
use super::{MemoryConnector, MemoryOptions, MemorySystem};
use crate::error::Result;
use crate::report::{truncate, Outcome, Reporter};

const ID_PREVIEW: usize = 12;
const RESULT_PREVIEW: usize = 60;
const CONTENT_PREVIEW: usize = 80;
const KEYWORD_PREVIEW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmokeMode {
    /// Four sample notes, three queries, one read-back
    Full,
    /// One note and one query
    Quick,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SmokeSummary {
    pub inserted_ids: Vec<String>,
    pub failed_inserts: usize,
    pub queries_failed: usize,
    pub read_ok: Option<bool>,
}

impl SmokeSummary {
    pub fn is_clean(&self) -> bool {
        self.failed_inserts == 0 && self.queries_failed == 0 && self.read_ok != Some(false)
    }
}

pub struct SmokeTester<'a> {
    connector: &'a dyn MemoryConnector,
    options: MemoryOptions,
    mode: SmokeMode,
}

impl<'a> SmokeTester<'a> {
    pub fn new(connector: &'a dyn MemoryConnector, options: MemoryOptions, mode: SmokeMode) -> Self {
        Self { connector, options, mode }
    }

    /// Only initialization errors are returned; per-operation failures
    /// are recorded on the reporter and the run continues.
    pub async fn run(&self, reporter: &mut Reporter) -> Result<SmokeSummary> {
        let memory = self.initialize(reporter).await?;

        if self.mode == SmokeMode::Quick {
            reporter.section("2. Running quick test...");
        }

        Ok(self.exercise(memory.as_ref(), reporter).await)
    }

    /// Runs the note operations against an already initialized memory system
    pub async fn exercise(&self, memory: &dyn MemorySystem, reporter: &mut Reporter) -> SmokeSummary {
        match self.mode {
            SmokeMode::Full => self.run_full(memory, reporter).await,
            SmokeMode::Quick => self.run_quick(memory, reporter).await,
        }
    }

    async fn initialize(&self, reporter: &mut Reporter) -> Result<Box<dyn MemorySystem>> {
        reporter.section("1. Initializing A-mem system...");
        if self.options.backend.backend.is_some() {
            reporter.plain(format!("   Using {}", self.options.backend.describe()));
        } else {
            reporter.plain("   No LLM configured - using basic keyword extraction");
        }

        match self.connector.connect(&self.options).await {
            Ok(memory) => {
                reporter.ok("Memory system initialized");
                reporter.record("memory init", Outcome::Passed);
                Ok(memory)
            }
            Err(err) => {
                reporter.fail(format!("Failed to initialize: {}", err));
                reporter.trace(&err);
                reporter.record("memory init", Outcome::Failed(err.chain()));
                Err(err)
            }
        }
    }

    async fn run_full(&self, memory: &dyn MemorySystem, reporter: &mut Reporter) -> SmokeSummary {
        let mut summary = SmokeSummary::default();

        reporter.section("2. Adding test memories...");
        for (index, note) in SAMPLE_NOTES.iter().enumerate() {
            insert_note(memory, index + 1, note, &mut summary, reporter).await;
        }

        reporter.section("3. Testing semantic search...");
        for query in SAMPLE_QUERIES {
            run_query(memory, query, SEARCH_K, &mut summary, reporter).await;
        }

        reporter.section("4. Testing memory retrieval...");
        match summary.inserted_ids.first().cloned() {
            Some(id) => read_back(memory, &id, &mut summary, reporter).await,
            None => {
                reporter.warn("No memories were added, skipping retrieval");
                reporter.record("read", Outcome::Warned("nothing to read".to_string()));
            }
        }

        summary
    }

    async fn run_quick(&self, memory: &dyn MemorySystem, reporter: &mut Reporter) -> SmokeSummary {
        let mut summary = SmokeSummary::default();

        insert_note(memory, 1, &QUICK_NOTE, &mut summary, reporter).await;
        run_query(memory, QUICK_QUERY, QUICK_SEARCH_K, &mut summary, reporter).await;

        summary
    }
}

async fn insert_note(
    memory: &dyn MemorySystem,
    number: usize,
    note: &SampleNote,
    summary: &mut SmokeSummary,
    reporter: &mut Reporter,
) {
    let step = format!("insert note {}", number);
    match memory.add_note(note.content, &note.tags()).await {
        Ok(id) => {
            reporter.ok(format!("Memory {} added: {}...", number, truncate(&id, ID_PREVIEW)));
            reporter.record(step, Outcome::Passed);
            summary.inserted_ids.push(id);
        }
        Err(err) => {
            reporter.fail(format!("Failed to add memory {}: {}", number, err));
            reporter.record(step, Outcome::Failed(err.to_string()));
            summary.failed_inserts += 1;
        }
    }
}

async fn run_query(
    memory: &dyn MemorySystem,
    query: &str,
    k: usize,
    summary: &mut SmokeSummary,
    reporter: &mut Reporter,
) {
    let step = format!("search '{}'", query);
    match memory.search_agentic(query, k).await {
        Ok(results) => {
            reporter.plain("");
            reporter.plain(format!("   Query: '{}'", query));
            reporter.plain(format!("   Found {} results:", results.len()));
            for result in &results {
                reporter.plain(format!("     - {}...", truncate(&result.content, RESULT_PREVIEW)));
            }
            reporter.record(step, Outcome::Passed);
        }
        Err(err) => {
            reporter.fail(format!("Search failed for '{}': {}", query, err));
            reporter.record(step, Outcome::Failed(err.to_string()));
            summary.queries_failed += 1;
        }
    }
}

async fn read_back(
    memory: &dyn MemorySystem,
    id: &str,
    summary: &mut SmokeSummary,
    reporter: &mut Reporter,
) {
    match memory.read(id).await {
        Ok(note) => {
            reporter.ok("Retrieved memory:");
            reporter.detail(format!("Content: {}...", truncate(&note.content, CONTENT_PREVIEW)));

            if let Some(keywords) = note.keywords.as_ref().filter(|keywords| !keywords.is_empty()) {
                let shown: Vec<&str> =
                    keywords.iter().take(KEYWORD_PREVIEW).map(String::as_str).collect();
                reporter.detail(format!("Keywords: {}", shown.join(", ")));
            }
            if let Some(tags) = note.tags.as_ref().filter(|tags| !tags.is_empty()) {
                reporter.detail(format!("Tags: {}", tags.join(", ")));
            }
            if let Some(links) = &note.links {
                reporter.detail(format!("Links: {} connections", links.len()));
            }

            reporter.record("read", Outcome::Passed);
            summary.read_ok = Some(true);
        }
        Err(err) => {
            reporter.fail(format!("Retrieval failed: {}", err));
            reporter.record("read", Outcome::Failed(err.to_string()));
            summary.read_ok = Some(false);
        }
    }
}
