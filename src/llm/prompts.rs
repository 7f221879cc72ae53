//! Review prompt text.
//!
//! The instruction part is always sent first. The code section of the
//! checklist is only included when the record carries a snippet.

/// Placeholder for unset screen name / URL / language.
const NOT_AVAILABLE: &str = "N/A";

const REVIEW_ROLE: &str =
    "You are a senior UI/UX designer and frontend engineer reviewing a product screen.";

const DESIGN_CHECKLIST: &str = r#"Cover each of these areas:

1.  **First Impression**
    *   What the screen is for and whether that is obvious at a glance.
    *   Whether the primary action stands out.
    *   Overall visual coherence.

2.  **Layout and Composition**
    *   Alignment, balance and grouping of elements.
    *   Visual hierarchy: do the important elements lead?
    *   Spacing and whitespace.
    *   Likely problems at other viewport sizes.

3.  **Visual Design**
    *   Color palette and contrast.
    *   Typography: readability, scale, consistency.
    *   Icons and imagery: clarity and relevance.

4.  **Usability and Interaction**
    *   How discoverable navigation and controls are.
    *   Clarity of calls to action.
    *   Visible feedback and state.
    *   Points where a user is likely to hesitate or get stuck.

5.  **Accessibility (visual)**
    *   Contrast of text and interactive elements.
    *   Legible font sizes.
    *   Touch target sizes where relevant.
"#;

const SUGGESTIONS_NO_CODE: &str = r#"
6.  **Improvement Suggestions**
    *   Concrete, specific changes to layout, spacing, typography and color.
    *   Utility classes or structural changes where they help.
    *   Order them by expected impact.
"#;

const RESPONSE_FORMAT: &str = "Format the review in Markdown with headings and bullet points. Put class suggestions or code examples in fenced code blocks. Be specific and constructive.";

/// Build the instruction text for one review.
pub fn build_review_prompt(
    screen_name: Option<&str>,
    url: Option<&str>,
    code_language: Option<&str>,
    has_code: bool,
) -> String {
    let mut prompt = String::new();
    prompt.push_str(REVIEW_ROLE);
    prompt.push('\n');
    if has_code {
        prompt.push_str("Review the attached screenshot together with the code snippet that implements it.\n");
    } else {
        prompt.push_str("Review the attached screenshot.\n");
    }
    prompt.push_str(&format!(
        "Screen Name: \"{}\"\nIntended URL: \"{}\"\n\n",
        screen_name.unwrap_or(NOT_AVAILABLE),
        url.unwrap_or(NOT_AVAILABLE)
    ));
    if has_code {
        prompt.push_str(&format!(
            "The code is written in {}.\n\n",
            code_language.unwrap_or("the language used by the UI")
        ));
    }

    prompt.push_str(DESIGN_CHECKLIST);
    if has_code {
        prompt.push_str(&code_review_section(code_language.unwrap_or(NOT_AVAILABLE)));
    } else {
        prompt.push_str(SUGGESTIONS_NO_CODE);
    }
    prompt.push('\n');
    prompt.push_str(RESPONSE_FORMAT);
    prompt.push('\n');
    prompt
}

fn code_review_section(language: &str) -> String {
    format!(
        r#"
6.  **Code Review ({language})**
    *   Structure and readability.
    *   Idiomatic use of the framework: components, props, state, styling utilities.
    *   Performance concerns or anti-patterns.
    *   Semantic markup.
    *   How faithfully the code produces what the screenshot shows.

7.  **Improvement Suggestions**
    *   Concrete UI/UX changes.
    *   Refactorings or specific code changes.
    *   Order them by expected impact.
"#
    )
}

/// Trailing text part carrying the snippet as a fenced block.
pub fn build_code_part(snippet: &str, code_language: Option<&str>) -> String {
    format!(
        "\n\nCode Snippet ({}):\n```{}\n{}\n```",
        code_language.unwrap_or(NOT_AVAILABLE),
        code_language.unwrap_or("plaintext"),
        snippet
    )
}
