use std::{collections::BTreeSet, fmt, str::FromStr};

use chrono::Utc;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::{DocumentId, Error, Fields, Time};

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(transparent)]
pub struct HomeworkId(pub String);

impl From<&HomeworkId> for DocumentId {
    fn from(id: &HomeworkId) -> DocumentId {
        DocumentId(id.0.clone())
    }
}

impl fmt::Display for HomeworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One half of a student group
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Subgroup {
    One,
    Two,
}

impl Subgroup {
    pub fn number(&self) -> u8 {
        match self {
            Subgroup::One => 1,
            Subgroup::Two => 2,
        }
    }

    pub fn from_number(n: u64) -> Option<Subgroup> {
        match n {
            1 => Some(Subgroup::One),
            2 => Some(Subgroup::Two),
            _ => None,
        }
    }
}

impl fmt::Display for Subgroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

impl FromStr for Subgroup {
    type Err = String;

    fn from_str(s: &str) -> Result<Subgroup, String> {
        s.parse::<u64>()
            .ok()
            .and_then(Subgroup::from_number)
            .ok_or_else(|| format!("subgroup must be 1 or 2, got {s:?}"))
    }
}

impl Serialize for Subgroup {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Subgroup {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Subgroup, D::Error> {
        let n = u64::deserialize(d)?;
        Subgroup::from_number(n)
            .ok_or_else(|| de::Error::invalid_value(de::Unexpected::Unsigned(n), &"1 or 2"))
    }
}

/// Who a homework item is meant for.
///
/// Stored as `1`, `2` or `null`; the string `"all"` and a missing field are
/// also accepted as `Everyone`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum Audience {
    #[default]
    Everyone,
    Subgroup(Subgroup),
}

impl Audience {
    pub fn includes(&self, subgroup: Subgroup) -> bool {
        match self {
            Audience::Everyone => true,
            Audience::Subgroup(s) => *s == subgroup,
        }
    }
}

impl FromStr for Audience {
    type Err = String;

    fn from_str(s: &str) -> Result<Audience, String> {
        match s {
            "all" => Ok(Audience::Everyone),
            s => s.parse().map(Audience::Subgroup),
        }
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self {
            Audience::Everyone => s.serialize_none(),
            Audience::Subgroup(g) => s.serialize_some(g),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Audience, D::Error> {
        struct AudienceVisitor;

        impl<'de> de::Visitor<'de> for AudienceVisitor {
            type Value = Audience;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("1, 2, \"all\" or null")
            }

            fn visit_unit<E: de::Error>(self) -> Result<Audience, E> {
                Ok(Audience::Everyone)
            }

            fn visit_none<E: de::Error>(self) -> Result<Audience, E> {
                Ok(Audience::Everyone)
            }

            fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Audience, D::Error> {
                d.deserialize_any(self)
            }

            fn visit_u64<E: de::Error>(self, n: u64) -> Result<Audience, E> {
                Subgroup::from_number(n)
                    .map(Audience::Subgroup)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(n), &self))
            }

            fn visit_i64<E: de::Error>(self, n: i64) -> Result<Audience, E> {
                match u64::try_from(n) {
                    Ok(n) => self.visit_u64(n),
                    Err(_) => Err(E::invalid_value(de::Unexpected::Signed(n), &self)),
                }
            }

            fn visit_str<E: de::Error>(self, s: &str) -> Result<Audience, E> {
                s.parse()
                    .map_err(|_| E::invalid_value(de::Unexpected::Str(s), &self))
            }
        }

        d.deserialize_option(AudienceVisitor)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeworkItem {
    pub id: HomeworkId,
    pub subject: String,
    pub description: String,
    pub deadline: Time,

    #[serde(default)]
    pub subgroup: Audience,

    /// if false, only `added_by` gets to see this item
    pub is_public: bool,
    pub added_by: String,

    /// Nicknames of the viewers who marked this item done
    #[serde(default)]
    pub completed_by: BTreeSet<String>,

    /// Written for older clients, never read: completion is per-viewer
    #[serde(default)]
    pub completed: bool,

    pub created_at: Time,
}

impl HomeworkItem {
    pub fn is_completed_by(&self, viewer: &str) -> bool {
        self.completed_by.contains(viewer)
    }

    pub fn is_visible_to(&self, viewer: &str) -> bool {
        self.is_public || self.added_by == viewer
    }

    pub fn expires_at(&self) -> Time {
        self.deadline + chrono::Duration::days(1)
    }

    /// Expired items are deleted by whoever observes them first
    pub fn is_expired(&self, now: Time) -> bool {
        HomeworkItem::deadline_expired(self.deadline, now)
    }

    pub fn deadline_expired(deadline: Time, now: Time) -> bool {
        now - deadline > chrono::Duration::days(1)
    }

    /// The `deadline` field of a stored document, readable even when the rest
    /// of the document is not
    pub fn stored_deadline(fields: &Fields) -> Option<Time> {
        fields.get("deadline")?.as_str()?.parse().ok()
    }

    /// The completion set with `viewer` flipped in or out
    pub fn toggled_completion(&self, viewer: &str) -> BTreeSet<String> {
        let mut res = self.completed_by.clone();
        if !res.remove(viewer) {
            res.insert(String::from(viewer));
        }
        res
    }
}

/// Which items to show depending on the viewer's own completion status
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum CompletionFilter {
    #[default]
    Active,
    Completed,
    All,
}

impl CompletionFilter {
    pub fn matches(&self, item: &HomeworkItem, viewer: &str) -> bool {
        match self {
            CompletionFilter::Active => !item.is_completed_by(viewer),
            CompletionFilter::Completed => item.is_completed_by(viewer),
            CompletionFilter::All => true,
        }
    }
}

impl FromStr for CompletionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<CompletionFilter, String> {
        match s {
            "active" => Ok(CompletionFilter::Active),
            "completed" => Ok(CompletionFilter::Completed),
            "all" => Ok(CompletionFilter::All),
            s => Err(format!("unknown filter {s:?}, expected active, completed or all")),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHomework {
    pub subject: String,
    pub description: String,
    pub deadline: Time,
    pub subgroup: Audience,
    pub is_public: bool,
    pub added_by: String,
}

impl NewHomework {
    pub fn validate(&self) -> Result<(), Error> {
        crate::validate_content(&self.subject)?;
        crate::validate_string(&self.description)?;
        crate::validate_content(&self.added_by)
    }

    /// Full document for the store, with the bookkeeping fields every new item starts with
    pub fn into_fields(self, now: Time) -> Fields {
        let mut fields = crate::store::to_fields(&self);
        fields.insert(String::from("createdAt"), serde_json::json!(now));
        fields.insert(String::from("completed"), serde_json::Value::Bool(false));
        fields.insert(String::from("completedBy"), serde_json::json!([]));
        fields
    }

    pub fn new(added_by: &str, subject: &str, deadline: Time) -> NewHomework {
        NewHomework {
            subject: String::from(subject),
            description: String::new(),
            deadline,
            subgroup: Audience::Everyone,
            is_public: true,
            added_by: String::from(added_by),
        }
    }
}

impl HomeworkItem {
    pub fn stub(id: &str, added_by: &str, deadline: Time) -> HomeworkItem {
        HomeworkItem {
            id: HomeworkId(String::from(id)),
            subject: String::from("stub"),
            description: String::new(),
            deadline,
            subgroup: Audience::Everyone,
            is_public: true,
            added_by: String::from(added_by),
            completed_by: BTreeSet::new(),
            completed: false,
            created_at: Utc::now(),
        }
    }
}
