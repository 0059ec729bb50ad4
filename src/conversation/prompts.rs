//! Extraction prompts and per-step reply prompts.
//!
//! Every prompt is a pure function of its inputs so the same profile always
//! produces the same instruction text.

use std::collections::BTreeSet;

use super::state::Lifestyle;

/// Shared directive for every non-greeting reply.
const SPEAK_DIRECTLY: &str = "Reply as the assistant, speaking directly to the user. \
Do not describe what you are doing. Do not start your response with a greeting \
(like 'Hi', 'Hey', 'Hello', etc.).";

const JSON_ONLY: &str = "Respond with ONLY valid JSON, no explanation or markdown formatting.";

fn list_or_none(items: &BTreeSet<String>) -> String {
    if items.is_empty() {
        "none yet".to_string()
    } else {
        items.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Ask for the user's interests as a JSON array of strings.
pub fn interests_extraction_prompt(message: &str) -> String {
    format!(
        "Extract a concise list of user interests or hobbies from the following message.\n\
         Message: \"{message}\"\n\
         Return a JSON array of short strings. Return [] if none are mentioned.\n\
         Example output: [\"reading\", \"music\", \"sports\"]\n\
         {JSON_ONLY}"
    )
}

/// Ask for the user's dislikes as a JSON array of strings.
pub fn dislikes_extraction_prompt(message: &str) -> String {
    format!(
        "Extract a concise list of activities or hobbies the user dislikes or wants to avoid \
         from the following message.\n\
         Message: \"{message}\"\n\
         Return a JSON array of short strings. Return [] if none are mentioned.\n\
         Example output: [\"sports\", \"social activities\"]\n\
         {JSON_ONLY}"
    )
}

/// Ask for lifestyle facts as a JSON object restricted to three keys.
pub fn lifestyle_extraction_prompt(message: &str) -> String {
    format!(
        "Extract the user's lifestyle information (time availability, budget, space) from the \
         following message.\n\
         Message: \"{message}\"\n\
         Return a JSON object using only the keys \"time_availability\", \"budget\" and \"space\", \
         and include a key only if it is mentioned. Use short string values.\n\
         Example output: {{\"time_availability\": \"limited\", \"budget\": \"flexible\", \"space\": \"ample\"}}\n\
         {JSON_ONLY}"
    )
}

pub fn greeting_prompt(message: &str) -> String {
    format!(
        "The user just said: \"{message}\"\n\
         You are a friendly hobby discovery assistant. Reply as the assistant, speaking directly \
         to the user. Do not describe what you are doing. Generate a short, warm greeting that:\n\
         1. Responds to their message\n\
         2. Introduces yourself as a hobby discovery assistant\n\
         3. Explains you'll help them find hobbies that match their interests and lifestyle\n\
         4. Asks them to share what activities they enjoy or are curious about\n\
         5. Gives 2-3 examples (e.g. creative, physical, learning, social)\n\
         6. Keeps it very concise and encouraging"
    )
}

/// Enough interests collected: acknowledge and move on to dislikes.
pub fn ask_dislikes_prompt(message: &str, interests: &BTreeSet<String>) -> String {
    format!(
        "The user mentioned: \"{message}\"\n\
         Current interests: {interests}\n\
         {SPEAK_DIRECTLY} Generate a short, friendly response that:\n\
         1. Acknowledges their interests\n\
         2. Asks about things they DON'T like or want to avoid\n\
         3. Keeps it concise",
        interests = list_or_none(interests),
    )
}

/// Not enough interests yet: ask for more.
pub fn ask_more_interests_prompt(message: &str, interests: &BTreeSet<String>) -> String {
    format!(
        "The user mentioned: \"{message}\"\n\
         Current interests: {interests}\n\
         {SPEAK_DIRECTLY} Generate a short, friendly response that:\n\
         1. Acknowledges what they shared\n\
         2. Asks for more interests in different areas\n\
         3. Keeps it concise",
        interests = list_or_none(interests),
    )
}

pub fn ask_lifestyle_prompt(
    message: &str,
    interests: &BTreeSet<String>,
    dislikes: &BTreeSet<String>,
) -> String {
    format!(
        "The user mentioned: \"{message}\"\n\
         Dislikes: {dislikes}\n\
         Interests: {interests}\n\
         {SPEAK_DIRECTLY} Generate a short response that:\n\
         1. Acknowledges their dislikes\n\
         2. Asks about their lifestyle (time, budget, space)\n\
         3. Keeps it concise and understanding",
        dislikes = list_or_none(dislikes),
        interests = list_or_none(interests),
    )
}

/// The recommendation turn: three hobbies fitted to the whole profile.
pub fn suggestions_prompt(
    message: &str,
    interests: &BTreeSet<String>,
    dislikes: &BTreeSet<String>,
    lifestyle: &Lifestyle,
) -> String {
    format!(
        "The user mentioned: \"{message}\"\n\
         Lifestyle: {lifestyle}\n\
         Interests: {interests}\n\
         Dislikes: {dislikes}\n\
         {SPEAK_DIRECTLY} Now generate 3 short, distinct hobby suggestions that:\n\
         1. Match their interests\n\
         2. Avoid their dislikes\n\
         3. Fit their lifestyle\n\
         4. Include why each hobby suits them (1 line each)\n\
         5. Mention how to get started (1 line each)\n\
         Format as a concise, friendly response with clear, numbered recommendations.",
        interests = list_or_none(interests),
        dislikes = list_or_none(dislikes),
    )
}

pub fn followup_prompt(
    message: &str,
    interests: &BTreeSet<String>,
    dislikes: &BTreeSet<String>,
    lifestyle: &Lifestyle,
) -> String {
    format!(
        "The user's follow-up: \"{message}\"\n\
         Profile: Interests: {interests}; Dislikes: {dislikes}; Lifestyle: {lifestyle}\n\
         {SPEAK_DIRECTLY} Generate a short, helpful response that:\n\
         1. Addresses their question or concern\n\
         2. Provides more hobby suggestions if asked\n\
         3. Offers practical advice (1-2 lines)\n\
         4. Keeps it concise and supportive",
        interests = list_or_none(interests),
        dislikes = list_or_none(dislikes),
    )
}
