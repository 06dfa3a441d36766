//! Persistent library of reusable stamps and signatures.
//!
//! Layout under the library root, per kind (`stamps`, `signatures`):
//!
//! ```text
//! <root>/stamps/<uuid>.png
//! <root>/stamps_metadata.json
//! ```
//!
//! Images are normalized to RGBA PNG on import. The metadata file is
//! rewritten after every mutation.

use std::collections::BTreeMap;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::color::TintColor;
use crate::constants::{DEFAULT_STAMP_CATEGORIES, GENERAL_CATEGORY};
use crate::drop::{DragPayload, DropMetadata};
use crate::error::LibraryError;
use crate::model::AnnotationKind;

/// Identifier of a library item (a UUID string).
pub type ItemId = String;

/// Metadata for one stored image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryItem {
    pub name: String,
    pub category: String,
    /// File name inside the kind's directory
    pub file: String,
    pub original_width: u32,
    pub original_height: u32,
    pub aspect_ratio: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tint_color: Option<TintColor>,
}

impl LibraryItem {
    pub fn metadata(&self) -> DropMetadata {
        DropMetadata {
            aspect_ratio: self.aspect_ratio,
            original_width: self.original_width,
            original_height: self.original_height,
            tint_color: self.tint_color,
        }
    }
}

/// On-disk shape of `<kind>s_metadata.json`, minus the kind-specific key.
#[derive(Debug, Default)]
struct LibraryFile {
    items: BTreeMap<ItemId, LibraryItem>,
    categories: BTreeMap<String, Vec<ItemId>>,
}

/// Stamps or signatures stored under one root directory.
#[derive(Debug)]
pub struct Library {
    kind: AnnotationKind,
    items_dir: PathBuf,
    metadata_path: PathBuf,
    data: LibraryFile,
}

impl Library {
    /// Open (creating if needed) the library for `kind` under `root`.
    ///
    /// An unreadable metadata file is logged and replaced by an empty library.
    pub fn open(root: &Path, kind: AnnotationKind) -> Result<Self, LibraryError> {
        let dir_name = dir_name(kind);
        let items_dir = root.join(dir_name);
        let metadata_path = root.join(format!("{dir_name}_metadata.json"));
        fs::create_dir_all(&items_dir)?;

        let fresh = !metadata_path.exists();
        let data = if fresh {
            LibraryFile::default()
        } else {
            match read_metadata(&metadata_path, dir_name) {
                Ok(data) => data,
                Err(e) => {
                    log::warn!(
                        "⚠️ Could not read {}: {}; starting empty",
                        metadata_path.display(),
                        e
                    );
                    LibraryFile::default()
                }
            }
        };

        let mut library = Self {
            kind,
            items_dir,
            metadata_path,
            data,
        };
        let defaults: &[&str] = match kind {
            AnnotationKind::Stamp if fresh => DEFAULT_STAMP_CATEGORIES,
            _ => &[GENERAL_CATEGORY],
        };
        for category in defaults {
            library
                .data
                .categories
                .entry((*category).to_string())
                .or_default();
        }
        if fresh {
            library.save_metadata()?;
        }
        log::info!(
            "📚 {} library: {} items in {} categories",
            kind.name(),
            library.len(),
            library.data.categories.len()
        );
        Ok(library)
    }

    pub fn kind(&self) -> AnnotationKind {
        self.kind
    }

    pub fn metadata_path(&self) -> &Path {
        &self.metadata_path
    }

    pub fn len(&self) -> usize {
        self.data.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.items.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&LibraryItem> {
        self.data.items.get(id)
    }

    /// Category names, "General" first.
    pub fn categories(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.data.categories.keys().map(String::as_str).collect();
        names.sort_by_key(|name| (*name != GENERAL_CATEGORY, *name));
        names
    }

    /// Items in one category, or all items, grouped by category.
    pub fn list_items(&self, category: Option<&str>) -> Vec<(&str, &LibraryItem)> {
        let categories = match category {
            Some(name) => vec![name],
            None => self.categories(),
        };
        categories
            .into_iter()
            .filter_map(|name| self.data.categories.get(name))
            .flatten()
            .filter_map(|id| {
                self.data
                    .items
                    .get_key_value(id)
                    .map(|(id, item)| (id.as_str(), item))
            })
            .collect()
    }

    /// Store an image. Returns the new item's id.
    pub fn add(&mut self, bytes: &[u8], name: &str, category: &str) -> Result<ItemId, LibraryError> {
        let image = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = image.dimensions();
        let id = uuid::Uuid::new_v4().to_string();
        let file = format!("{id}.png");
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        fs::write(self.items_dir.join(&file), png)?;

        let category = if category.trim().is_empty() {
            GENERAL_CATEGORY
        } else {
            category
        };
        self.data
            .categories
            .entry(category.to_string())
            .or_default()
            .push(id.clone());
        self.data.items.insert(
            id.clone(),
            LibraryItem {
                name: name.to_string(),
                category: category.to_string(),
                file,
                original_width: width,
                original_height: height,
                aspect_ratio: width as f32 / height as f32,
                tint_color: None,
            },
        );
        self.save_metadata()?;
        log::info!("➕ Added {} '{}' ({})", self.kind.name(), name, id);
        Ok(id)
    }

    /// Import an image file from disk.
    pub fn import_file(
        &mut self,
        path: &Path,
        name: &str,
        category: &str,
    ) -> Result<ItemId, LibraryError> {
        let bytes = fs::read(path)?;
        self.add(&bytes, name, category)
    }

    /// Returns `Ok(false)` if `id` is unknown.
    pub fn rename(&mut self, id: &str, new_name: &str) -> Result<bool, LibraryError> {
        let Some(item) = self.data.items.get_mut(id) else {
            return Ok(false);
        };
        item.name = new_name.to_string();
        self.save_metadata()?;
        Ok(true)
    }

    /// Set or clear the item's default tint.
    pub fn update_color(&mut self, id: &str, color: Option<TintColor>) -> Result<bool, LibraryError> {
        let Some(item) = self.data.items.get_mut(id) else {
            return Ok(false);
        };
        item.tint_color = color;
        self.save_metadata()?;
        Ok(true)
    }

    /// Delete an item and its image file.
    pub fn delete(&mut self, id: &str) -> Result<bool, LibraryError> {
        let Some(item) = self.data.items.remove(id) else {
            return Ok(false);
        };
        let path = self.items_dir.join(&item.file);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        if let Some(ids) = self.data.categories.get_mut(&item.category) {
            ids.retain(|other| other != id);
        }
        self.save_metadata()?;
        log::info!("🗑️ Deleted {} '{}'", self.kind.name(), item.name);
        Ok(true)
    }

    /// Image bytes and metadata of an item.
    pub fn item_data(&self, id: &str) -> Result<(Vec<u8>, &LibraryItem), LibraryError> {
        let item = self
            .data
            .items
            .get(id)
            .ok_or_else(|| LibraryError::ItemNotFound(id.to_string()))?;
        let path = self.items_dir.join(&item.file);
        if !path.exists() {
            return Err(LibraryError::MissingFile { path });
        }
        Ok((fs::read(path)?, item))
    }

    /// Drag payload for placing an item on a page.
    pub fn to_payload(&self, id: &str) -> Result<DragPayload, LibraryError> {
        let (bytes, item) = self.item_data(id)?;
        Ok(DragPayload::new(self.kind, bytes, item.name.clone()).with_metadata(&item.metadata()))
    }

    /// Returns `Ok(false)` if the category already exists.
    pub fn add_category(&mut self, name: &str) -> Result<bool, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::invalid_category("name is empty"));
        }
        if self.data.categories.contains_key(name) {
            return Ok(false);
        }
        self.data.categories.insert(name.to_string(), Vec::new());
        self.save_metadata()?;
        Ok(true)
    }

    /// Remove a category, moving its items to "General".
    pub fn remove_category(&mut self, name: &str) -> Result<bool, LibraryError> {
        if name == GENERAL_CATEGORY {
            return Err(LibraryError::invalid_category(
                "the General category cannot be removed",
            ));
        }
        let Some(ids) = self.data.categories.remove(name) else {
            return Ok(false);
        };
        for id in &ids {
            if let Some(item) = self.data.items.get_mut(id) {
                item.category = GENERAL_CATEGORY.to_string();
            }
        }
        self.data
            .categories
            .entry(GENERAL_CATEGORY.to_string())
            .or_default()
            .extend(ids);
        self.save_metadata()?;
        Ok(true)
    }

    fn save_metadata(&self) -> Result<(), LibraryError> {
        let mut root = serde_json::Map::new();
        root.insert(
            dir_name(self.kind).to_string(),
            serde_json::to_value(&self.data.items)?,
        );
        root.insert(
            "categories".to_string(),
            serde_json::to_value(&self.data.categories)?,
        );
        let json = serde_json::to_string_pretty(&serde_json::Value::Object(root))?;
        fs::write(&self.metadata_path, json)?;
        Ok(())
    }
}

fn dir_name(kind: AnnotationKind) -> &'static str {
    match kind {
        AnnotationKind::Stamp => "stamps",
        AnnotationKind::Signature => "signatures",
    }
}

fn read_metadata(path: &Path, items_key: &str) -> Result<LibraryFile, LibraryError> {
    let text = fs::read_to_string(path)?;
    let mut value: serde_json::Value = serde_json::from_str(&text)?;
    let items = match value.get_mut(items_key).map(serde_json::Value::take) {
        Some(items) => serde_json::from_value(items)?,
        None => BTreeMap::new(),
    };
    let categories = match value.get_mut("categories").map(serde_json::Value::take) {
        Some(categories) => serde_json::from_value(categories)?,
        None => BTreeMap::new(),
    };
    Ok(LibraryFile { items, categories })
}
