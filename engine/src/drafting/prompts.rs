//! Prompt templates for the drafting pipeline
//!
//! Each function renders one instruction template. Structured-output
//! templates spell out the exact JSON shape the callers tolerant-parse.

use crate::drafting::types::{ProposalContext, SectionSpec};

/// Instructions for planning the proposal's sections
///
/// The model returns a JSON array of section objects; `research` controls
/// whether the section goes through the research loop or is synthesized
/// from the finished proposal at the end.
pub fn plan_sections(ctx: &ProposalContext) -> String {
    format!(
        "You are a senior grant architect collaborating with {user}.\n\
         {user} is writing a grant proposal for {client}.\n\n\
         <project_idea>\n{idea}\n</project_idea>\n\n\
         <funding_requirements>\n{requirements}\n</funding_requirements>\n\n\
         <proposal_structure>\n{structure}\n</proposal_structure>\n\n\
         <about_{client}>\n{about}\n</about_{client}>\n\n\
         Plan the sections of the proposal. For each section provide:\n\
         - \"name\": a clear, professional title aligned with funder terminology\n\
         - \"description\": the section brief, covering four parts: essential content \
         (required information and deliverables), strategic alignment (fit with the \
         client's mission and the funding priorities), guiding questions, and evidence \
         requirements (data points, metrics, examples)\n\
         - \"research\": true when the section needs supporting documents, false for \
         sections synthesized from the rest of the proposal (introductions, summaries, \
         conclusions)\n\n\
         Build a logical flow between sections and cover every funder requirement.\n\n\
         Output ONLY a JSON array of section objects, no markdown, no explanation:\n\
         [{{\"name\": \"...\", \"description\": \"...\", \"research\": true}}]",
        user = ctx.user_name,
        client = ctx.client_name,
        idea = ctx.project_idea,
        requirements = ctx.funding_requirements,
        structure = ctx.proposal_structure,
        about = ctx.about_client,
    )
}

/// Instructions for generating a section's search queries
pub fn write_queries(
    section_description: &str,
    number_of_queries: usize,
    ctx: &ProposalContext,
) -> String {
    format!(
        "You are helping {user} gather information for a grant proposal section \
         written for {client}.\n\n\
         <section_description>\n{description}\n</section_description>\n\n\
         Generate {count} search queries covering the section description. Queries \
         should be specific enough to avoid generic results, diverse enough to cover \
         every aspect of the brief, and focused on material about {client}.\n\n\
         Output ONLY a JSON array:\n\
         [{{\"search_query\": \"...\"}}]",
        user = ctx.user_name,
        client = ctx.client_name,
        description = section_description,
        count = number_of_queries,
    )
}

/// Instructions for grading one document against one query
pub fn grade_document(question: &str, document: &str) -> String {
    format!(
        "You are assessing the relevance of a retrieved document to a question.\n\
         A document is relevant if it contains keywords or semantic meaning related \
         to the question, or information that gives context to its answer. Otherwise \
         it is not relevant.\n\n\
         <document>\n{document}\n</document>\n\n\
         <question>\n{question}\n</question>\n\n\
         Give a binary score indicating whether the document is relevant.\n\
         Output ONLY JSON: {{\"binary_score\": \"yes\"}} or {{\"binary_score\": \"no\"}}"
    )
}

/// Instructions for drafting (or redrafting) a section
pub fn write_section(
    section: &SectionSpec,
    current_draft: &str,
    source_text: &str,
    ctx: &ProposalContext,
) -> String {
    format!(
        "You are a senior grant writer with extensive experience securing funding \
         across government, foundation, and corporate grants.\n\n\
         Writer: {user}\n\
         Client: {client}\n\
         Section: {name}\n\n\
         <section_description>\n{description}\n</section_description>\n\n\
         <current_draft>\n{draft}\n</current_draft>\n\n\
         <supporting_materials>\n{materials}\n</supporting_materials>\n\n\
         <proposal_structure>\n{structure}\n</proposal_structure>\n\n\
         <funding_requirements>\n{requirements}\n</funding_requirements>\n\n\
         <project_idea>\n{idea}\n</project_idea>\n\n\
         If the current draft is empty, write the section fresh: a clear narrative \
         from problem to solution to impact, grounded in the supporting materials. \
         If a draft exists, revise it: preserve its strong elements, fill gaps in \
         logic or evidence, and strengthen alignment with the funding priorities.\n\n\
         Style: authoritative but accessible, active voice, evidence first, short \
         paragraphs with clear topic sentences. Use ## headers, quantify impacts, \
         and cite the supporting materials where they back a claim.\n\n\
         Output the polished section text only, no preamble.",
        user = ctx.user_name,
        client = ctx.client_name,
        name = section.name,
        description = section.description,
        draft = current_draft,
        materials = source_text,
        structure = ctx.proposal_structure,
        requirements = ctx.funding_requirements,
        idea = ctx.project_idea,
    )
}

/// Instructions for grading a drafted section against its brief
pub fn grade_section(section_topic: &str, section_content: &str) -> String {
    format!(
        "Review a proposal section relative to its brief.\n\n\
         <section_topic>\n{topic}\n</section_topic>\n\n\
         <section_content>\n{content}\n</section_content>\n\n\
         Evaluate whether the section adequately covers the brief, checking accuracy \
         and depth. If it fails any criterion, generate specific follow-up search \
         queries to gather the missing information.\n\n\
         Output ONLY JSON:\n\
         {{\"grade\": \"pass\", \"follow_up_queries\": []}} or\n\
         {{\"grade\": \"fail\", \"follow_up_queries\": [{{\"search_query\": \"...\"}}]}}",
        topic = section_topic,
        content = section_content,
    )
}

/// Instructions for writing a non-research section from the finished proposal
///
/// Introductions and conclusions synthesize the rest of the document rather
/// than retrieved sources.
pub fn write_final_section(section: &SectionSpec, report_content: &str) -> String {
    format!(
        "You are an expert writer crafting a section that synthesizes the rest of a \
         grant proposal.\n\n\
         Section: {name}\n\n\
         <section_topic>\n{topic}\n</section_topic>\n\n\
         <available_proposal_content>\n{content}\n</available_proposal_content>\n\n\
         For an introduction: 50-100 words, # title, a clear narrative arc for the \
         core motivation, no lists or tables.\n\
         For a conclusion or summary: 100-150 words, ## title, at most one structural \
         element (a focused table or short list) if it distills the proposal's points, \
         ending with concrete next steps or implications.\n\n\
         Use concrete details over general statements and make every word count.\n\
         Output the section text only, no word counts, no preamble.",
        name = section.name,
        topic = section.description,
        content = report_content,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ProposalContext {
        ProposalContext {
            project_idea: "Mobile health clinics".to_string(),
            funding_requirements: "HRSA rural health program".to_string(),
            proposal_structure: "Standard federal structure".to_string(),
            user_name: "Dana".to_string(),
            client_name: "Prairie Health".to_string(),
            about_client: "A rural nonprofit".to_string(),
        }
    }

    #[test]
    fn test_plan_sections_embeds_context() {
        let prompt = plan_sections(&ctx());
        assert!(prompt.contains("Mobile health clinics"));
        assert!(prompt.contains("HRSA rural health program"));
        assert!(prompt.contains("Prairie Health"));
        assert!(prompt.contains("JSON array"));
    }

    #[test]
    fn test_write_queries_embeds_count_and_description() {
        let prompt = write_queries("Document the need for care access", 7, &ctx());
        assert!(prompt.contains("Generate 7 search queries"));
        assert!(prompt.contains("Document the need for care access"));
        assert!(prompt.contains("search_query"));
    }

    #[test]
    fn test_grade_document_embeds_both_sides() {
        let prompt = grade_document("county uninsured rate", "Census table 5 shows...");
        assert!(prompt.contains("county uninsured rate"));
        assert!(prompt.contains("Census table 5 shows..."));
        assert!(prompt.contains("binary_score"));
    }

    #[test]
    fn test_write_section_embeds_draft_and_materials() {
        let spec = SectionSpec::new("Statement of Need", "Show the access gap", true);
        let prompt = write_section(&spec, "previous draft text", "doc bodies here", &ctx());
        assert!(prompt.contains("Statement of Need"));
        assert!(prompt.contains("Show the access gap"));
        assert!(prompt.contains("previous draft text"));
        assert!(prompt.contains("doc bodies here"));
    }

    #[test]
    fn test_grade_section_spells_out_both_shapes() {
        let prompt = grade_section("Show the access gap", "The county has...");
        assert!(prompt.contains("\"grade\": \"pass\""));
        assert!(prompt.contains("\"grade\": \"fail\""));
        assert!(prompt.contains("follow_up_queries"));
    }

    #[test]
    fn test_write_final_section_embeds_report() {
        let spec = SectionSpec::new("Executive Summary", "Summarize the ask", false);
        let prompt = write_final_section(&spec, "assembled proposal body");
        assert!(prompt.contains("Executive Summary"));
        assert!(prompt.contains("assembled proposal body"));
    }
}
