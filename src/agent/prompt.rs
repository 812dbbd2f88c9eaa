use crate::scene::model::{Animation, ElementKind};

const INSTRUCTIONS: &str = "\
You turn lecture transcripts into storyboards for short animated explainer videos.
Reply with a single JSON object and nothing else. The object has this shape:

{
  \"title\": string,
  \"description\": string,
  \"scenes\": [
    {
      \"scene_id\": positive integer, unique,
      \"duration\": seconds, greater than 0,
      \"narration\": string,
      \"animation_type\": string,
      \"elements\": [
        {
          \"type\": one of TYPES,
          \"content\": string (required for text and equation),
          \"position\": [x, y, z],
          \"color\": a colour name such as WHITE, BLUE, YELLOW, or #RRGGBB,
          \"animation\": one of ANIMATIONS,
          \"scale\": number greater than 0
        }
      ]
    }
  ]
}

Keep scenes short. Use equation elements for formulas written in LaTeX.";

/// Prompt sent to the model for `transcript`.
pub fn storyboard_prompt(transcript: &str) -> String {
    let types = ElementKind::NAMES.join(", ");
    let animations = Animation::ALL
        .iter()
        .map(|a| a.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let instructions = INSTRUCTIONS
        .replace("TYPES", &types)
        .replace("ANIMATIONS", &animations);
    format!("{instructions}\n\nTranscript:\n{}\n", transcript.trim())
}

/// Follow-up prompt after the model's previous answer was unusable.
pub fn retry_prompt(transcript: &str, problem: &str) -> String {
    format!(
        "{}\nYour previous answer could not be used: {problem}\nAnswer again with JSON only.\n",
        storyboard_prompt(transcript)
    )
}
