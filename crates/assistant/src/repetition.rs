use shared::chat::Message;

/// Minimum length of the longer utterance before containment counts
const MIN_CONTAINMENT_CHARS: usize = 10;

/// True when the two most recent user messages look like the same question.
///
/// Exact match after trimming and lower-casing, or one containing the other
/// when the longer one exceeds ten characters. Deliberately crude.
pub fn is_repeating(messages: &[Message]) -> bool {
    let mut user_texts = messages.iter().rev().filter(|m| m.is_user());
    let (Some(last), Some(previous)) = (user_texts.next(), user_texts.next()) else {
        return false;
    };

    let last = last.text.trim().to_lowercase();
    let previous = previous.text.trim().to_lowercase();
    if last == previous {
        return true;
    }

    let (longer, shorter) = if last.chars().count() >= previous.chars().count() {
        (&last, &previous)
    } else {
        (&previous, &last)
    };
    longer.chars().count() > MIN_CONTAINMENT_CHARS && longer.contains(shorter.as_str())
}
