use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};

use crate::api::UserProfile;

/// Key the logged-in profile lives under
pub const PROFILE_KEY: &str = "user_v2";

/// Device-local key/value storage, values being JSON
pub trait Storage {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>>;
    fn set_raw(&mut self, key: &str, value: serde_json::Value) -> anyhow::Result<()>;
    fn delete(&mut self, key: &str) -> anyhow::Result<()>;

    fn get<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get_raw(key)? {
            None => Ok(None),
            Some(v) => serde_json::from_value(v)
                .with_context(|| format!("parsing stored value for key {key:?}"))
                .map(Some),
        }
    }

    fn set<T: Serialize>(&mut self, key: &str, value: &T) -> anyhow::Result<()> {
        let value = serde_json::to_value(value)
            .with_context(|| format!("serializing value for key {key:?}"))?;
        self.set_raw(key, value)
    }
}

/// Storage backed by one JSON object in a file, rewritten on every change
#[derive(Clone, Debug)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> FileStorage {
        FileStorage { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> anyhow::Result<BTreeMap<String, serde_json::Value>> {
        let data = match std::fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(e).with_context(|| format!("reading {:?}", self.path));
            }
        };
        serde_json::from_slice(&data).with_context(|| format!("parsing {:?}", self.path))
    }

    fn save(&self, values: &BTreeMap<String, serde_json::Value>) -> anyhow::Result<()> {
        let data = serde_json::to_vec_pretty(values).context("serializing storage")?;
        std::fs::write(&self.path, data).with_context(|| format!("writing {:?}", self.path))
    }
}

impl Storage for FileStorage {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.load()?.remove(key))
    }

    fn set_raw(&mut self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let mut values = self.load()?;
        values.insert(String::from(key), value);
        self.save(&values)
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        let mut values = self.load()?;
        if values.remove(key).is_some() {
            self.save(&values)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStorage(BTreeMap<String, serde_json::Value>);

impl Storage for MemoryStorage {
    fn get_raw(&self, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
        Ok(self.0.get(key).cloned())
    }

    fn set_raw(&mut self, key: &str, value: serde_json::Value) -> anyhow::Result<()> {
        self.0.insert(String::from(key), value);
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.0.remove(key);
        Ok(())
    }
}

/// The stored profile, if someone is logged in on this device. A profile
/// that no longer parses counts as logged out.
pub fn load_profile(storage: &impl Storage) -> anyhow::Result<Option<UserProfile>> {
    match storage.get::<UserProfile>(PROFILE_KEY) {
        Ok(profile) => Ok(profile),
        Err(err) if storage.get_raw(PROFILE_KEY).is_ok() => {
            tracing::warn!(?err, "ignoring unreadable stored profile");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

pub fn save_profile(storage: &mut impl Storage, profile: &UserProfile) -> anyhow::Result<()> {
    profile.validate().context("validating profile")?;
    storage.set(PROFILE_KEY, profile)?;
    tracing::info!(nickname = %profile.nickname, "saved profile");
    Ok(())
}

/// Logout
pub fn clear_profile(storage: &mut impl Storage) -> anyhow::Result<()> {
    storage.delete(PROFILE_KEY)
}
