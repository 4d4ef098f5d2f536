//! Prompt for grounded answers

/// Build the answer prompt for `query` over `context`
pub fn answer_prompt(query: &str, context: &str) -> String {
    format!(
        r#"You are a helpful agricultural advisor. Answer the user's question based on the crop information provided below.

CROP INFORMATION:
{context}

USER QUESTION: {query}

INSTRUCTIONS:
- Answer based ONLY on the information provided above
- If the information covers specific varieties, explain how they differ from the main crop
- Be conversational and helpful
- Include specific numbers (fertilizer rates, yields, pH ranges) when available
- Keep your response concise but informative

ANSWER:"#,
        context = context,
        query = query.trim()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_grounds_answer_in_context() {
        let prompt = answer_prompt("  How much nitrogen for rice? ", "# Rice\n## Rice");
        assert!(prompt.contains("CROP INFORMATION:\n# Rice\n## Rice\n"));
        assert!(prompt.contains("USER QUESTION: How much nitrogen for rice?\n"));
        assert!(prompt.contains("based ONLY on the information provided above"));
        assert!(prompt.contains("varieties"));
        assert!(prompt.ends_with("ANSWER:"));
    }
}
