use crate::error::Result;
use crate::memory::{SmokeMode, SmokeTester};
use crate::report::Reporter;
use crate::state::AppState;

pub async fn smoke_test(state: &AppState, quick: bool, reporter: &mut Reporter) -> Result<()> {
    let options = state.memory_options();
    let mode = if quick { SmokeMode::Quick } else { SmokeMode::Full };

    reporter.banner("🧪 Testing A-mem Basic Functionality");
    if options.backend.backend.is_none() {
        reporter.warn("No LLM API key found. Set OPENAI_API_KEY or ANTHROPIC_API_KEY");
        reporter.detail("For testing, you can use Ollama locally:");
        reporter.detail("export OLLAMA_HOST='http://localhost:11434'");
        reporter.detail("export OLLAMA_MODEL='llama3.2'");
    }

    let summary = SmokeTester::new(state.connector(), options.clone(), mode).run(reporter).await?;

    if mode == SmokeMode::Full {
        reporter.section("5. Reflection");
        if options.backend.backend.is_some() {
            reporter.detail("Reflection needs several related memories; query it manually, e.g.");
            reporter.detail("reflect('What are the key technical decisions?')");
        } else {
            reporter.warn("Skipping reflection check - requires an LLM backend");
        }
    }

    reporter.plain("");
    reporter.rule();
    if summary.is_clean() && reporter.failures() == 0 {
        reporter.plain("✅ All tests passed!");
    } else {
        reporter.plain(format!(
            "❌ Some tests failed ({} insert, {} search)",
            summary.failed_inserts, summary.queries_failed
        ));
    }

    Ok(())
}
