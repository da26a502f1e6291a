//! Outbound reply model and the static reply templates.
//!
//! Bodies are Telegram HTML. Every reply carries the same ordered action set so
//! the keyboard stays stable across the whole conversation.

/// Which template produced a reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReplyKind {
    Welcome,
    Help,
    Rules,
    About,
    CheckPrompt,
    Stats,
    Corrected,
    AlreadyCorrect,
    Validation,
    GuardRejected,
    Unavailable,
}

/// Follow-up actions offered under every reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplyAction {
    CheckGrammar,
    ViewRules,
    Help,
    About,
}

impl ReplyAction {
    /// Display order of the keyboard.
    pub const ALL: [ReplyAction; 4] = [
        ReplyAction::CheckGrammar,
        ReplyAction::ViewRules,
        ReplyAction::Help,
        ReplyAction::About,
    ];

    pub fn id(self) -> &'static str {
        match self {
            ReplyAction::CheckGrammar => "check",
            ReplyAction::ViewRules => "rules",
            ReplyAction::Help => "help",
            ReplyAction::About => "about",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ReplyAction::CheckGrammar => "Check Grammar",
            ReplyAction::ViewRules => "View Rules",
            ReplyAction::Help => "Help",
            ReplyAction::About => "About",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.id() == id)
    }

    pub fn button(self) -> ActionButton {
        ActionButton {
            label: self.label().to_string(),
            action_id: self.id().to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActionButton {
    pub label: String,
    pub action_id: String,
}

/// A structured outbound message: HTML body plus follow-up actions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reply {
    pub kind: ReplyKind,
    pub body: String,
    pub actions: Vec<ActionButton>,
}

impl Reply {
    /// Build a reply with the standard action set.
    pub fn new(kind: ReplyKind, body: impl Into<String>) -> Self {
        Self {
            kind,
            body: body.into(),
            actions: standard_actions(),
        }
    }
}

pub fn standard_actions() -> Vec<ActionButton> {
    ReplyAction::ALL.into_iter().map(ReplyAction::button).collect()
}

// ============== Static Templates ==============

pub fn welcome() -> Reply {
    Reply::new(
        ReplyKind::Welcome,
        "🎓 <b>Smart Grammar Checker Bot</b> 🤖\n\
\n\
I'll help you improve your English grammar instantly! 📚\n\
\n\
<b>How to use:</b>\n\
1. Send me any English sentence\n\
2. I'll correct it and explain the mistakes\n\
3. Learn from the example sentences\n\
\n\
Ready? Send me a sentence! 🚀",
    )
}

pub fn help() -> Reply {
    Reply::new(
        ReplyKind::Help,
        "🆘 <b>Help Guide</b>\n\
\n\
<b>Commands:</b>\n\
/start - Start the bot\n\
/help - Show this help message\n\
/rules - Common grammar topics\n\
/about - About this bot\n\
/stats - Your grammar statistics\n\
\n\
<b>Simply type</b> any English sentence and I'll check it automatically!\n\
\n\
<b>Tip:</b> Practice regularly to improve your grammar skills! 💪",
    )
}

pub fn rules() -> Reply {
    Reply::new(
        ReplyKind::Rules,
        "📚 <b>Common Grammar Topics</b>\n\
\n\
🔹 <b>Subject-Verb Agreement</b>\n\
❌ He play football\n\
✅ He plays football\n\
\n\
🔹 <b>Tense Consistency</b>\n\
❌ I am go to school\n\
✅ I am going to school\n\
\n\
🔹 <b>Verb Forms</b>\n\
❌ They was happy\n\
✅ They were happy\n\
\n\
🔹 <b>Auxiliary Verbs</b>\n\
❌ Do she like music?\n\
✅ Does she like music?",
    )
}

pub fn about() -> Reply {
    Reply::new(
        ReplyKind::About,
        "🤖 <b>Grammar Checker</b>\n\
Corrections, explanations and examples powered by an external grammar service.",
    )
}

/// Placeholder for `/stats`; no history is kept.
pub fn stats() -> Reply {
    Reply::new(
        ReplyKind::Stats,
        "📊 <b>Grammar Statistics</b> (Coming Soon!)\n\
\n\
Per-user progress tracking is not available yet. Keep practicing! 🚀",
    )
}

pub fn check_prompt() -> Reply {
    Reply::new(ReplyKind::CheckPrompt, "📝 Send me a sentence to check!")
}

pub fn empty_input() -> Reply {
    Reply::new(
        ReplyKind::Validation,
        "✍️ Please send me a sentence to check.",
    )
}

pub fn not_english() -> Reply {
    Reply::new(
        ReplyKind::Validation,
        "🌍 Please send text in English for grammar checking!",
    )
}

pub fn guard_rejected() -> Reply {
    Reply::new(
        ReplyKind::GuardRejected,
        "⏳ You're sending sentences a bit fast. Please wait a moment and try again.",
    )
}

pub fn unavailable() -> Reply {
    Reply::new(
        ReplyKind::Unavailable,
        "⚠️ Grammar correction is temporarily unavailable. Please try again later.",
    )
}
