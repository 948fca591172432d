//! Prompt loop: read a symptom description, print recommendations, repeat
//! until `quit` or end of input.
use std::borrow::Cow;
use std::io::{self, BufRead, Write};

use tracing::{info, warn};

use crate::retrieval::{display, RetrievalOrchestrator};

pub const PROMPT: &str = "Please describe your symptoms: ";

pub async fn run_session<R, W>(
    orchestrator: &RetrievalOrchestrator,
    mut input: R,
    mut output: W,
) -> io::Result<()>
where
    R: BufRead,
    W: Write,
{
    writeln!(output, "Welcome to the Healthcare Information Assistant!")?;
    writeln!(output, "Enter 'quit' to exit the program.")?;

    let mut buf = Vec::new();
    let mut handled = 0usize;
    loop {
        write!(output, "\n{}", PROMPT)?;
        output.flush()?;

        buf.clear();
        if input.read_until(b'\n', &mut buf)? == 0 {
            writeln!(output)?;
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if let Cow::Owned(_) = line {
            warn!("Input line was not valid UTF-8; invalid bytes replaced");
        }
        let query = line.trim();
        if query.eq_ignore_ascii_case("quit") {
            break;
        }
        if query.is_empty() {
            continue;
        }

        writeln!(output, "\nSearching cached medications...")?;
        let outcome = orchestrator.retrieve(query).await;
        display::write_outcome(&mut output, &outcome)?;
        display::write_disclaimer(&mut output)?;
        handled += 1;
    }

    info!("Interactive session ended after {} queries", handled);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::embedding::HashingEmbedder;
    use crate::retrieval::OrchestratorConfig;
    use crate::test_support::{record, store_with, StubLabelSource};

    fn orchestrator(source: Arc<StubLabelSource>) -> RetrievalOrchestrator {
        let store = store_with(Arc::new(HashingEmbedder::new(384)));
        RetrievalOrchestrator::new(Arc::new(store), source, OrchestratorConfig::default())
    }

    async fn transcript(orchestrator: &RetrievalOrchestrator, input: &str) -> String {
        let mut out = Vec::new();
        run_session(orchestrator, input.as_bytes(), &mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[tokio::test]
    async fn test_quit_ends_session_without_searching() {
        let source = Arc::new(StubLabelSource::default());
        let retrieval = orchestrator(source.clone());

        let text = transcript(&retrieval, "QUIT\nmigraine\n").await;
        assert!(text.starts_with("Welcome to the Healthcare Information Assistant!"));
        assert_eq!(text.matches(PROMPT).count(), 1);
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_query_prints_results_and_disclaimer() {
        let source = Arc::new(StubLabelSource::with_records(vec![record(
            "Migrin",
            "migrinol",
            "treats migraine headaches",
        )]));
        let retrieval = orchestrator(source.clone());

        let text = transcript(&retrieval, "\nmigraine\n").await;
        assert!(text.contains("Recommended Medications (from newly cached data):"));
        assert!(text.contains("Medication: Migrin"));
        assert!(text.contains(display::DISCLAIMER[1]));
        // blank line skipped, then EOF
        assert_eq!(text.matches(PROMPT).count(), 3);
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_invalid_utf8_line_does_not_end_session() {
        let source = Arc::new(StubLabelSource::default());
        let retrieval = orchestrator(source.clone());

        let mut out = Vec::new();
        let input: &[u8] = b"caf\xe9 headache\nmigraine\nquit\n";
        run_session(&retrieval, input, &mut out).await.unwrap();

        // both lines reach the label source, the lossy one included
        assert_eq!(source.calls(), 2);
        assert_eq!(*source.last_terms.lock().unwrap(), vec!["migraine".to_string()]);
        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.matches(PROMPT).count(), 3);
    }

    #[tokio::test]
    async fn test_no_results_message() {
        let retrieval = orchestrator(Arc::new(StubLabelSource::default()));
        let text = transcript(&retrieval, "zzz\nquit\n").await;
        assert!(text.contains(display::NO_RESULTS_MESSAGE));
        assert!(text.contains(display::DISCLAIMER[0]));
    }
}
