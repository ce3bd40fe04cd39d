// Shared prompt fragments.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting fragments.

/// Opening line for every ESG analysis prompt.
pub const ESG_ANALYST_PREAMBLE: &str =
    "You are an expert ESG compliance analyst specializing in Malaysian sustainability frameworks.";

/// Closing instruction that anchors the model in the SME context.
pub const SME_CONTEXT_INSTRUCTION: &str =
    "Consider Malaysian ESG standards and SME context. \
    Ensure every suggestion is practical for businesses with limited resources.";
