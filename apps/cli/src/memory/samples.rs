//! Fixed notes and queries used by the smoke test.

pub struct SampleNote {
    pub content: &'static str,
    pub tags: &'static [&'static str],
}

impl SampleNote {
    pub fn tags(&self) -> Vec<String> {
        self.tags.iter().map(|tag| tag.to_string()).collect()
    }
}

pub const SAMPLE_NOTES: [SampleNote; 4] = [
    SampleNote {
        content: "Decided to integrate A-mem into the Memory Layer project for advanced memory management",
        tags: &["decision", "architecture"],
    },
    SampleNote {
        content: "A-mem uses Zettelkasten principles to create interconnected knowledge networks",
        tags: &["fact", "knowledge"],
    },
    SampleNote {
        content: "Memory Layer provides privacy-first local memory for AI assistants",
        tags: &["fact", "feature"],
    },
    SampleNote {
        content: "Implemented vector embeddings using sentence-transformers for semantic search",
        tags: &["implementation", "technical"],
    },
];

pub const SAMPLE_QUERIES: [&str; 3] =
    ["architecture decisions", "technical implementation", "Zettelkasten"];

pub const QUICK_NOTE: SampleNote = SampleNote {
    content: "A-mem test with Ollama - setup successful!",
    tags: &["test", "setup"],
};

pub const QUICK_QUERY: &str = "test";

/// Results requested per query
pub const SEARCH_K: usize = 2;
pub const QUICK_SEARCH_K: usize = 1;
