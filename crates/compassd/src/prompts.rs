//! Prompt assembly for guidance generation.
//!
//! Prompts are built from the typed request only; raw profile fields
//! never reach this module.

use compass_common::{ChatMessage, GuidanceRequest};

/// System prompt shared by every provider driver.
pub const GUIDANCE_SYSTEM_PROMPT: &str = r#"You are a careers counsellor for South African high-school students.
Write a short, encouraging guidance narrative for the student described below.

=== RULES (MANDATORY) ===
1. Ground every recommendation in the marks and interests provided.
2. When citing admission scores, bursary deadlines or salaries, state them plainly so they can be checked.
3. Never ask for, guess, or repeat a student's name, school, or home town.
4. Prefer concrete next steps over generalities.
5. Keep the answer under six paragraphs."#;

/// Build the message list for one generation attempt. The correction
/// block is present only on the single revision attempt.
pub fn build_messages(request: &GuidanceRequest) -> Vec<ChatMessage> {
    let mut user = format!(
        "Student profile:\n{}\n\nQuestion: {}",
        request.profile.summary(),
        request.query
    );

    if let Some(correction) = &request.correction {
        user.push_str("\n\nA previous draft had problems. Correct all of the following and answer again:\n");
        user.push_str(correction);
    }

    vec![
        ChatMessage::system(GUIDANCE_SYSTEM_PROMPT),
        ChatMessage::user(user),
    ]
}
