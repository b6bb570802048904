//! Canned replies for greetings and goodbyes, answered without the model.
//!
//! Only messages that consist of nothing but a greeting or farewell count;
//! "hi, who is alice?" is a real question and goes to the agent.

/// Kinds of small talk with a canned reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmallTalk {
    Hello,
    HowAreYou,
    GoodMorning,
    Greeting,
    Goodbye,
}

const HELLOS: &[&str] = &["hello", "hi", "hey", "howdy"];
const GREETINGS: &[&str] = &["good afternoon", "good evening"];
const GOODBYES: &[&str] = &["bye", "goodbye", "see you", "see you later", "farewell", "take care"];
const LEADING: &[&str] = &["ok", "okay", "thanks", "thank you", "well"];
const TRAILING: &[&str] = &["there", "everyone", "all", "again", "then", "now", "friend"];

impl SmallTalk {
    /// Classify `message`, or `None` when it is more than small talk.
    pub fn detect(message: &str) -> Option<Self> {
        let text = normalize(message);
        let text = strip_affixes(&text);

        if text.is_empty() {
            return None;
        }
        if HELLOS.contains(&text) {
            return Some(SmallTalk::Hello);
        }
        if text == "how are you" || HELLOS.iter().any(|h| text == format!("{h} how are you")) {
            return Some(SmallTalk::HowAreYou);
        }
        if text == "good morning" || text == "morning" {
            return Some(SmallTalk::GoodMorning);
        }
        if GREETINGS.contains(&text) {
            return Some(SmallTalk::Greeting);
        }
        if GOODBYES.contains(&text) {
            return Some(SmallTalk::Goodbye);
        }
        None
    }

    pub fn reply(&self) -> &'static str {
        match self {
            SmallTalk::Hello => {
                "Hello! I'm your autonomous customer support agent. How can I help you today?"
            }
            SmallTalk::HowAreYou => {
                "I'm functioning well, thank you! I'm here to help you with any questions \
                 using my available tools."
            }
            SmallTalk::GoodMorning => "Good morning! What can I assist you with today?",
            SmallTalk::Greeting => "I'm here to help! How can I assist you today?",
            SmallTalk::Goodbye => "Goodbye! Thank you for chatting with me. Have a great day!",
        }
    }

    pub fn is_goodbye(&self) -> bool {
        matches!(self, SmallTalk::Goodbye)
    }
}

/// Lowercase words with punctuation dropped and whitespace collapsed.
fn normalize(message: &str) -> String {
    message
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '\'' { c } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_affixes(text: &str) -> &str {
    let mut text = text;
    for lead in LEADING {
        if let Some(rest) = text.strip_prefix(lead).and_then(|r| r.strip_prefix(' ')) {
            text = rest;
            break;
        }
    }
    for trail in TRAILING {
        if let Some(rest) = text.strip_suffix(trail).and_then(|r| r.strip_suffix(' ')) {
            text = rest;
            break;
        }
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_greetings() {
        assert_eq!(SmallTalk::detect("Hello!"), Some(SmallTalk::Hello));
        assert_eq!(SmallTalk::detect("hey there"), Some(SmallTalk::Hello));
        assert_eq!(SmallTalk::detect("How are you?"), Some(SmallTalk::HowAreYou));
        assert_eq!(SmallTalk::detect("Good morning"), Some(SmallTalk::GoodMorning));
        assert_eq!(SmallTalk::detect("good evening, everyone"), Some(SmallTalk::Greeting));
    }

    #[test]
    fn test_goodbyes() {
        assert_eq!(SmallTalk::detect("bye"), Some(SmallTalk::Goodbye));
        assert_eq!(SmallTalk::detect("Thanks, goodbye!"), Some(SmallTalk::Goodbye));
        assert_eq!(SmallTalk::detect("see you later"), Some(SmallTalk::Goodbye));
        assert!(SmallTalk::Goodbye.is_goodbye());
    }

    #[test]
    fn test_questions_are_not_small_talk() {
        assert_eq!(SmallTalk::detect("hi, who is alice?"), None);
        assert_eq!(SmallTalk::detect("this is about shipping"), None);
        assert_eq!(SmallTalk::detect("what is your refund policy"), None);
        assert_eq!(SmallTalk::detect("   "), None);
    }

    #[test]
    fn test_replies() {
        assert_eq!(
            SmallTalk::Hello.reply(),
            "Hello! I'm your autonomous customer support agent. How can I help you today?"
        );
        assert_eq!(
            SmallTalk::Goodbye.reply(),
            "Goodbye! Thank you for chatting with me. Have a great day!"
        );
    }
}
