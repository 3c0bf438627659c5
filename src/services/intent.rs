/// Closed set of things a participant can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// `/start` greeting.
    Start,
    /// Ask to join the roster.
    Register,
    /// Leave the roster.
    Unregister,
    /// Show the roster.
    List,
    /// Answer "yes" to a pending question.
    ConfirmYes,
    /// Answer "no" to a pending question.
    ConfirmNo,
    /// Anything else.
    Unrecognized,
}

impl Intent {
    /// Button labels for the main keyboard, one row each.
    pub const MAIN_KEYBOARD: &'static [&'static [Intent]] =
        &[&[Intent::Register, Intent::Unregister], &[Intent::List]];
    /// Button labels for the yes/no keyboard.
    pub const CONFIRM_KEYBOARD: &'static [&'static [Intent]] =
        &[&[Intent::ConfirmYes, Intent::ConfirmNo]];

    /// Map raw message text to an intent.
    ///
    /// Keyboard labels match exactly; typed commands are accepted as well, with
    /// an optional `@botname` suffix.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(intent) = [
            Intent::Register,
            Intent::Unregister,
            Intent::List,
            Intent::ConfirmYes,
            Intent::ConfirmNo,
        ]
        .into_iter()
        .find(|intent| intent.label() == Some(text))
        {
            return intent;
        }

        let Some(command) = text.strip_prefix('/') else {
            return Intent::Unrecognized;
        };
        let command = command.split_whitespace().next().unwrap_or_default();
        let command = command.split('@').next().unwrap_or_default();
        match command.to_ascii_lowercase().as_str() {
            "start" | "help" => Intent::Start,
            "register" | "join" => Intent::Register,
            "unregister" | "leave" => Intent::Unregister,
            "list" | "players" => Intent::List,
            "yes" => Intent::ConfirmYes,
            "no" => Intent::ConfirmNo,
            _ => Intent::Unrecognized,
        }
    }

    /// Keyboard label for intents that have a button.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Intent::Register => Some("📥 Register"),
            Intent::Unregister => Some("📤 Unregister"),
            Intent::List => Some("📋 Player list"),
            Intent::ConfirmYes => Some("✅ Yes"),
            Intent::ConfirmNo => Some("❌ No"),
            Intent::Start | Intent::Unrecognized => None,
        }
    }
}
