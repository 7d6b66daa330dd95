//! Instruction prompts sent alongside the uploaded image.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing how the model is asked for a
//!    dialect requires editing exactly one place.
//!
//! 2. **Testability** — unit tests can inspect prompts directly without
//!    calling a real VLM, making prompt regressions easy to catch.
//!
//! Callers can override the prompt via [`crate::config::DiagramConfig::instruction`];
//! the constants here are used only when no override is provided.

use crate::config::Dialect;

/// Instruction for PlantUML output.
pub const PLANTUML_INSTRUCTION: &str = "Analyze this image and create a PlantUML text definition. \
Return only the PlantUML code without any explanation or markdown formatting.";

/// Instruction for Mermaid output.
///
/// Mermaid has many diagram kinds; the model is asked to pick one rather
/// than defaulting to a flowchart.
pub const MERMAID_INSTRUCTION: &str = "Analyze this image and create a Mermaid diagram definition. \
Return only the Mermaid code without any explanation or markdown formatting. \
Choose the appropriate diagram type (flowchart, sequence, class, state, etc.) based on what you see in the image.";

/// Instruction for ZenUML output.
///
/// Models rarely know ZenUML, so the prompt includes a syntax sample.
pub const ZENUML_INSTRUCTION: &str = "Analyze this image and create a ZenUML sequence diagram definition. \
ZenUML uses a simplified syntax for sequence diagrams. \
Return only the ZenUML code without any explanation or markdown formatting. \
Use ZenUML syntax like: A.method() { B.method2() { return } return }";

/// Default instruction for a dialect.
pub fn instruction_for(dialect: Dialect) -> &'static str {
    match dialect {
        Dialect::PlantUml => PLANTUML_INSTRUCTION,
        Dialect::Mermaid => MERMAID_INSTRUCTION,
        Dialect::ZenUml => ZENUML_INSTRUCTION,
    }
}
