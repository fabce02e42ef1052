use crate::i18n::{self, Translate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Greeting {
    Morning,
    Afternoon,
    Evening,
}

impl Greeting {
    /// `hour` is the local wall-clock hour, 0-23.
    pub fn for_hour(hour: u32) -> Self {
        match hour {
            0..=11 => Greeting::Morning,
            12..=17 => Greeting::Afternoon,
            _ => Greeting::Evening,
        }
    }

    pub fn message_key(&self) -> &'static str {
        match self {
            Greeting::Morning => "goodMorning",
            Greeting::Afternoon => "goodAfternoon",
            Greeting::Evening => "goodEvening",
        }
    }
}

/// "Good morning, ada!"
pub fn greeting_line(hour: u32, username: &str, tr: &dyn Translate) -> String {
    format!("{}, {username}!", tr.translate(Greeting::for_hour(hour).message_key()))
}

/// "Profile: Work"
pub fn profile_line(profile_name: &str, tr: &dyn Translate) -> String {
    format!("{}: {profile_name}", tr.translate(i18n::PROFILE_LABEL))
}
