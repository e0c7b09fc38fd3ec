use proptest::prelude::*;
use quill_engine::config::Config;
use quill_engine::drafting::{ProposalAssembler, SectionRegistry, SectionSpec};
use quill_engine::retrieval::SearchQuery;

// Any combination of knob values survives a serialize/parse cycle.
proptest! {
    #[test]
    fn test_config_parsing_round_trip(
        log_level in "error|warn|info|debug|trace",
        provider in "ollama|openai|anthropic",
        queries in 1..=20usize,
        depth in 0..=5u32,
        attempts in proptest::option::of(1..=5u32),
        vector_results in 1..=10usize,
        client_id in "[a-z0-9-]{0,12}",
    ) {
        // Build a baseline config by parsing a minimal TOML template
        let baseline_toml = r#"
[core]
log_level = "info"
output_dir = "~/.quill/proposals"

[llm]
planner = ["openai"]
writer = ["openai"]
grader = ["openai"]

[retrieval]
endpoint = "http://localhost:6333"
collection = "documents"
max_vector_results = 5

[drafting]
number_of_queries = 10
max_search_depth = 2

[client]
client_id = "acme"
client_name = "Acme Community Fund"
user_name = "Dana"
"#;
        let mut config: Config = toml::from_str(baseline_toml)
            .expect("Failed to parse baseline config");

        config.core.log_level = log_level;
        config.llm.writer = vec![provider];
        config.drafting.number_of_queries = queries;
        config.drafting.max_search_depth = depth;
        config.drafting.max_retrieval_attempts = attempts;
        config.retrieval.max_vector_results = vector_results;
        config.client.client_id = client_id;

        // Serialize the config object to TOML
        let toml_string = toml::to_string(&config).expect("Failed to serialize Config to string");

        // Parse it back to a struct
        let parsed: Config = toml::from_str(&toml_string).expect("Failed to deserialize TOML to Config");

        // Assert all mutated values are strictly equivalent
        prop_assert_eq!(config.core.log_level, parsed.core.log_level);
        prop_assert_eq!(config.llm.writer, parsed.llm.writer);
        prop_assert_eq!(config.drafting.number_of_queries, parsed.drafting.number_of_queries);
        prop_assert_eq!(config.drafting.max_search_depth, parsed.drafting.max_search_depth);
        prop_assert_eq!(config.drafting.max_retrieval_attempts, parsed.drafting.max_retrieval_attempts);
        prop_assert_eq!(config.retrieval.max_vector_results, parsed.retrieval.max_vector_results);
        prop_assert_eq!(config.client.client_id, parsed.client.client_id);
    }
}

// Query normalization trims once and stays put: constructing from already
// normalized text changes nothing, and both the bare-string and object
// wire forms land on the same value.
proptest! {
    #[test]
    fn test_query_normalization_is_idempotent(
        core in "[a-zA-Z0-9][a-zA-Z0-9 ]{0,20}",
        lead in "[ ]{0,3}",
        trail in "[ ]{0,3}",
    ) {
        let padded = format!("{}{}{}", lead, core, trail);
        let query = SearchQuery::new(&padded);

        prop_assert_eq!(query.as_str(), padded.trim());
        let renormalized = SearchQuery::new(query.as_str());
        prop_assert_eq!(renormalized.as_str(), query.as_str());
        prop_assert!(!query.is_empty());

        let bare: SearchQuery = serde_json::from_str(&serde_json::to_string(&padded).unwrap())
            .expect("bare string form should deserialize");
        let object_json = format!(
            "{{\"search_query\": {}}}",
            serde_json::to_string(&padded).unwrap()
        );
        let object: SearchQuery =
            serde_json::from_str(&object_json).expect("object form should deserialize");

        prop_assert_eq!(&bare, &query);
        prop_assert_eq!(&object, &query);
    }
}

// Assembly is pure prefixed concatenation, so the same sections always
// produce byte-identical output and the count tracks every append.
proptest! {
    #[test]
    fn test_assembly_is_deterministic_concatenation(
        contents in proptest::collection::vec("[a-zA-Z0-9 .,]{1,40}", 0..6),
    ) {
        let mut assembler = ProposalAssembler::new();
        let mut again = ProposalAssembler::new();
        let mut expected = String::new();

        for content in &contents {
            assembler.append(content);
            again.append(content);
            expected.push_str("\n\n");
            expected.push_str(content);
        }

        prop_assert_eq!(assembler.sections(), contents.len());
        prop_assert_eq!(assembler.assembled(), expected.as_str());
        prop_assert_eq!(assembler.into_text(), again.into_text());
    }
}

// Claiming visits exactly the research sections, in presentation order,
// and the registry reports remaining work iff a non-research section
// is left unwritten.
proptest! {
    #[test]
    fn test_registry_claims_research_sections_in_order(
        flags in proptest::collection::vec(any::<bool>(), 0..8),
    ) {
        let specs: Vec<SectionSpec> = flags
            .iter()
            .enumerate()
            .map(|(i, &requires_research)| {
                SectionSpec::new(format!("Section {}", i), "brief", requires_research)
            })
            .collect();
        let mut registry = SectionRegistry::new(specs);

        let mut claimed = Vec::new();
        while let Some(index) = registry.claim_next() {
            claimed.push(index);
            registry.complete_active().expect("claimed section must be active");
        }

        let expected: Vec<usize> = flags
            .iter()
            .enumerate()
            .filter_map(|(i, &requires_research)| requires_research.then_some(i))
            .collect();

        prop_assert_eq!(claimed, expected);
        prop_assert_eq!(
            registry.has_unwritten_sections(),
            flags.iter().any(|&requires_research| !requires_research)
        );
    }
}

#[test]
fn test_config_parsing_is_fast() {
    use std::time::Instant;

    // Config parsing sits on the startup path, keep it well under 100ms
    let start = Instant::now();

    let toml_str = r#"
[core]
log_level = "debug"
output_dir = "~/.quill/proposals"

[llm]
planner = ["anthropic", "ollama"]
writer = ["openai", "ollama"]
grader = ["ollama"]

[llm.ollama]
base_url = "http://localhost:11434"
model = "llama3.1:8b"

[llm.openai]
base_url = "https://api.openai.com/v1"
model = "gpt-4o-mini"

[retrieval]
endpoint = "http://localhost:6333"
collection = "grant_docs"
max_vector_results = 5
context_document_ids = ["doc-1", "doc-2"]

[drafting]
number_of_queries = 10
max_search_depth = 2

[client]
client_id = "prairie-health"
client_name = "Prairie Health Network"
user_name = "Dana"
about_client = "A rural health nonprofit"
"#;

    let config: Config = toml::from_str(toml_str).expect("Failed to parse config");
    let elapsed = start.elapsed();

    assert_eq!(config.llm.planner, vec!["anthropic", "ollama"]);
    assert_eq!(config.retrieval.context_document_ids.len(), 2);
    assert!(
        elapsed.as_millis() < 100,
        "Config parsing took {}ms, expected under 100ms",
        elapsed.as_millis()
    );
}
