//! Reading the launcher's `minecraftinstance.json`
//!
//! `baseModLoader.versionJson` is itself a JSON document encoded as a string.

use crate::error::{Error, Result};
use crate::files::read_json;
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const INSTANCE_FILE: &str = "minecraftinstance.json";

/// Parsed instance descriptor
#[derive(Debug, Clone)]
pub struct InstanceDescriptor {
    root: Value,
    version_json: Option<Value>,
}

impl InstanceDescriptor {
    /// Load the descriptor beside a modpack, `Ok(None)` when there is none
    pub fn load(modpack_root: &Path) -> Result<Option<Self>> {
        let file = modpack_root.join(INSTANCE_FILE);
        if !file.is_file() {
            return Ok(None);
        }
        let root: Value = read_json(&file).map_err(|e| Error::unreadable(&file, e))?;
        let version_json = match non_blank(root.pointer("/baseModLoader/versionJson")) {
            Some(raw) => Some(
                serde_json::from_str(raw).map_err(|e| Error::unreadable(&file, e))?,
            ),
            None => None,
        };
        Ok(Some(Self { root, version_json }))
    }

    fn nested(&self, key: &str) -> Option<&str> {
        self.version_json
            .as_ref()
            .and_then(|v| non_blank(v.get(key)))
    }

    /// Version whose client jar holds the vanilla loot tables
    pub fn vanilla_version(&self) -> Option<&str> {
        self.nested("inheritsFrom")
            .or_else(|| non_blank(self.root.get("gameVersion")))
    }

    /// Game version used to choose the datapack format
    pub fn game_version(&self) -> Option<&str> {
        non_blank(self.root.pointer("/baseModLoader/minecraftVersion"))
            .or_else(|| self.nested("inheritsFrom"))
            .or_else(|| self.nested("id"))
            .or_else(|| non_blank(self.root.get("minecraftVersion")))
    }
}

fn non_blank(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Launcher install directory: `<modpack>/../../Install`
pub fn install_dir(modpack_root: &Path) -> Option<PathBuf> {
    let install = modpack_root.parent()?.parent()?.join("Install");
    install.is_dir().then_some(install)
}

/// Locate the vanilla client jar for a modpack, if the launcher layout allows
pub fn vanilla_jar(modpack_root: &Path) -> Option<PathBuf> {
    let instance = match InstanceDescriptor::load(modpack_root) {
        Ok(Some(instance)) => instance,
        Ok(None) => return None,
        Err(e) => {
            debug!("Unable to resolve minecraft jar for {}: {}", modpack_root.display(), e);
            return None;
        }
    };
    let version = instance.vanilla_version()?;
    let jar = install_dir(modpack_root)?
        .join("versions")
        .join(version)
        .join(format!("{version}.jar"));
    jar.is_file().then_some(jar)
}
