//! Prompt templates sent to the hosted model.

/// Answer the model gives when a question has no support in the transcript
pub const QA_REFUSAL: &str = "I cannot answer this question based on the transcript content";

/// Sales-call analysis prompt. Asks for reasoning in `<thinking>` and the result in `<json>`.
pub fn sales_analysis(transcript: &str) -> String {
    format!(
        r#"You are an expert sales analyst specializing in the EdTech industry, focusing on online training and courses. Your task is to analyze sales call transcripts and generate a JSON summary of each interaction to evaluate lead quality and prioritize follow-ups.

Analyze the following sales call transcript and generate a JSON summary of the interaction:

<transcript>
{transcript}
</transcript>

Instructions:
1. Carefully read the transcript.
2. Identify and extract key elements such as:
   - Lead's interest level
   - Specific needs or pain points
   - Budget considerations
   - Decision-making authority
   - Timeline for decision
   - Any objections raised
   - Agreed-upon next steps
3. Based on these elements, assign a lead score between 0 and 100, with higher scores indicating higher potential.
4. Generate a JSON object summarizing the key aspects of the interaction according to the specified structure.

Important guidelines:
- Confidentiality: Omit all specific personal data like names, phone numbers, and email addresses.
- Character limit: Restrict each text field to a maximum of 100 characters.
- Maintain a professional tone in your summary.

Output format:
Generate a JSON object with the following structure:
<json>
{{
  "leadAnalysis": {{
    "interestLevel": "High or Medium or Low",
    "needsOrPainPoints": "Brief description of the lead's needs or pain points",
    "budget": "Lead's budget considerations",
    "decisionAuthority": true or false,
    "decisionTimeline": "Lead's timeline for making a decision",
    "objections": ["List of any objections raised by the lead"],
    "nextSteps": "Agreed-upon next steps"
  }},
  "leadScore": lead_score,
  "status": "COMPLETE",
  "ambiguities": ["List of any unclear or vague points in the conversation"]
}}
</json>

Before generating the JSON, please analyze the transcript within <thinking> tags. Include your identification of the interest level, needs or pain points, budget, decision authority, decision timeline, objections, next steps, and any ambiguities. Then, provide your JSON output within <json> tags.
"#
    )
}

/// Question-answering prompt restricted to the transcript's content
pub fn transcript_question(transcript: &str, question: &str) -> String {
    format!(
        r#"You are an AI assistant helping to answer questions about a transcript.
Please answer the following question based solely on the information provided in the transcript.

Transcript:
<transcript>
{transcript}
</transcript>

Question: {question}

Instructions:
1. Answer the question specifically based on the information in the transcript
2. If the answer cannot be found in the transcript, respond with "{QA_REFUSAL}"
3. Keep the answer concise and relevant
4. Do not make assumptions beyond what is explicitly stated in the transcript
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sales_analysis_embeds_transcript_once() {
        let prompt = sales_analysis("We need a Python course for 20 people.");
        assert_eq!(prompt.matches("We need a Python course for 20 people.").count(), 1);
        assert!(prompt.contains("\"leadScore\": lead_score"));
        assert!(prompt.contains("maximum of 100 characters"));
    }

    #[test]
    fn test_sales_analysis_is_deterministic() {
        assert_eq!(sales_analysis("abc"), sales_analysis("abc"));
    }

    #[test]
    fn test_transcript_question_includes_refusal_sentence() {
        let prompt = transcript_question("Hello {question}", "What is the budget?");
        assert!(prompt.contains("Hello {question}"));
        assert!(prompt.contains("Question: What is the budget?"));
        assert!(prompt.contains(QA_REFUSAL));
    }
}
