#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Cafe,
    Office,
    School,
    Hospital,
    Gym,
    PostOffice,
    HardwareStore,
    Church,
    Bakery,
    Library,
    Arcade,
    TechConference,
    Chatroom,
}

impl Theme {
    /// Identifier the game server expects.
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Cafe => "cafe",
            Theme::Office => "office",
            Theme::School => "school",
            Theme::Hospital => "hospital",
            Theme::Gym => "gym",
            Theme::PostOffice => "postoffice",
            Theme::HardwareStore => "hardware",
            Theme::Church => "church",
            Theme::Bakery => "bakery",
            Theme::Library => "library",
            Theme::Arcade => "arcade",
            Theme::TechConference => "tech-conference",
            Theme::Chatroom => "chatroom",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "cafe" => Some(Theme::Cafe),
            "office" => Some(Theme::Office),
            "school" => Some(Theme::School),
            "hospital" => Some(Theme::Hospital),
            "gym" => Some(Theme::Gym),
            "postoffice" | "post-office" => Some(Theme::PostOffice),
            "hardware" | "hardware-store" => Some(Theme::HardwareStore),
            "church" => Some(Theme::Church),
            "bakery" => Some(Theme::Bakery),
            "library" => Some(Theme::Library),
            "arcade" => Some(Theme::Arcade),
            "tech-conference" => Some(Theme::TechConference),
            "chatroom" => Some(Theme::Chatroom),
            _ => None,
        }
    }

    pub fn all() -> Vec<Theme> {
        vec![
            Theme::Cafe,
            Theme::Office,
            Theme::School,
            Theme::Hospital,
            Theme::Gym,
            Theme::PostOffice,
            Theme::HardwareStore,
            Theme::Church,
            Theme::Bakery,
            Theme::Library,
            Theme::Arcade,
            Theme::TechConference,
            Theme::Chatroom,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Theme::Cafe => "Cafe",
            Theme::Office => "Office",
            Theme::School => "School",
            Theme::Hospital => "Hospital",
            Theme::Gym => "Gym",
            Theme::PostOffice => "Post Office",
            Theme::HardwareStore => "Hardware Store",
            Theme::Church => "Church",
            Theme::Bakery => "Bakery",
            Theme::Library => "Library",
            Theme::Arcade => "Arcade",
            Theme::TechConference => "GenAI Tech Conference",
            Theme::Chatroom => "Internet Chatroom",
        }
    }
}

impl std::fmt::Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
