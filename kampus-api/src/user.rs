use std::{fmt, str::FromStr};

use crate::Subgroup;

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Theme, String> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            s => Err(format!("unknown theme {s:?}, expected light or dark")),
        }
    }
}

/// What the device remembers about whoever is logged in
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub email: String,
    pub nickname: String,
    pub avatar: String,
    pub subgroup: Subgroup,
    #[serde(default)]
    pub theme: Theme,
}

impl UserProfile {
    pub fn new(email: &str, nickname: &str) -> UserProfile {
        UserProfile {
            email: String::from(email),
            nickname: String::from(nickname),
            avatar: String::from("🎓"),
            subgroup: Subgroup::One,
            theme: Theme::Light,
        }
    }

    pub fn viewer(&self) -> Viewer {
        Viewer {
            name: self.nickname.clone(),
            avatar: self.avatar.clone(),
            subgroup: self.subgroup,
        }
    }

    pub fn validate(&self) -> Result<(), crate::Error> {
        crate::validate_string(&self.email)?;
        crate::validate_content(&self.nickname)?;
        crate::validate_string(&self.avatar)
    }
}

/// The person looking at the lists and acting on them.
///
/// Identity is the display nickname and is trusted as-is.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Viewer {
    pub name: String,
    pub avatar: String,
    pub subgroup: Subgroup,
}

impl Viewer {
    pub fn new(name: &str, subgroup: Subgroup) -> Viewer {
        Viewer {
            name: String::from(name),
            avatar: String::new(),
            subgroup,
        }
    }
}

impl fmt::Display for Viewer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
