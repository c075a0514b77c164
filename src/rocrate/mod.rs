// src/rocrate/mod.rs

//! Minimal RO-Crate 1.1 model
//!
//! A crate is a flat JSON-LD `@graph` of entities, each identified by `@id`.
//! Data entities (`File`, `Dataset`) are paths relative to the crate root;
//! contextual entities (people, languages, parameters) use `#fragment` or
//! absolute URL identifiers. Entities reference each other with
//! `{"@id": ...}` objects.
//!
//! Data entities remember their source on disk. [`RoCrate::write`] copies
//! every source that is not already at its destination below the crate root
//! and then serializes `ro-crate-metadata.json`.

mod writer;

pub use writer::WriteSummary;

use crate::error::{Error, Result};
use crate::filesystem::path::sanitize_path;
use chrono::{DateTime, Local};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Name of the metadata descriptor at the crate root
pub const METADATA_FILE: &str = "ro-crate-metadata.json";

/// JSON-LD context of RO-Crate 1.1
pub const CONTEXT_URL: &str = "https://w3id.org/ro/crate/1.1/context";

/// RO-Crate 1.1 specification
pub const RO_CRATE_PROFILE: &str = "https://w3id.org/ro/crate/1.1";

/// Workflow RO-Crate 1.0 profile
pub const WORKFLOW_CRATE_PROFILE: &str = "https://w3id.org/workflowhub/workflow-ro-crate/1.0";

/// Identifier of the root dataset
pub const ROOT_ID: &str = "./";

/// Reference another entity by identifier
pub fn reference(id: &str) -> Value {
    json!({ "@id": id })
}

/// A node of the crate graph
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    id: String,
    properties: Map<String, Value>,
}

impl Entity {
    /// Create an entity with one or more `@type`s
    pub fn new(id: impl Into<String>, types: &[&str]) -> Self {
        let mut properties = Map::new();
        let type_value = match types {
            [single] => Value::String(single.to_string()),
            many => Value::Array(many.iter().map(|t| Value::String(t.to_string())).collect()),
        };
        properties.insert("@type".to_string(), type_value);
        Self {
            id: id.into(),
            properties,
        }
    }

    /// Builder form of [`Entity::set`]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reference to this entity
    pub fn reference(&self) -> Value {
        reference(&self.id)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Set a property, replacing any previous value
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    /// Append to a property, turning a single value into a list
    pub fn append_to(&mut self, key: &str, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        match self.properties.get_mut(key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let previous = existing.take();
                *existing = Value::Array(vec![previous, value]);
            }
            None => {
                self.properties.insert(key.to_string(), Value::Array(vec![value]));
            }
        }
        self
    }

    /// The entity's `@type`s
    pub fn types(&self) -> Vec<&str> {
        match self.properties.get("@type") {
            Some(Value::String(t)) => vec![t.as_str()],
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn has_type(&self, type_name: &str) -> bool {
        self.types().contains(&type_name)
    }

    /// JSON-LD node with `@id` first
    pub fn to_json(&self) -> Value {
        let mut node = Map::new();
        node.insert("@id".to_string(), Value::String(self.id.clone()));
        for (key, value) in &self.properties {
            node.insert(key.clone(), value.clone());
        }
        Value::Object(node)
    }
}

/// What a data entity is backed by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    File,
    Directory,
}

/// On-disk source of a data entity
#[derive(Debug, Clone)]
struct DataSource {
    id: String,
    path: PathBuf,
    kind: SourceKind,
}

/// An RO-Crate under construction
#[derive(Debug, Clone)]
pub struct RoCrate {
    entities: Vec<Entity>,
    sources: Vec<DataSource>,
}

impl Default for RoCrate {
    fn default() -> Self {
        Self::new()
    }
}

impl RoCrate {
    /// Create a crate holding only the metadata descriptor and root dataset
    pub fn new() -> Self {
        Self::published_at(Local::now())
    }

    /// As [`RoCrate::new`], with an explicit `datePublished`
    pub fn published_at(date: DateTime<Local>) -> Self {
        let descriptor = Entity::new(METADATA_FILE, &["CreativeWork"])
            .with("about", reference(ROOT_ID))
            .with("conformsTo", reference(RO_CRATE_PROFILE));
        let root = Entity::new(ROOT_ID, &["Dataset"])
            .with("datePublished", date.to_rfc3339());

        Self {
            entities: vec![descriptor, root],
            sources: Vec::new(),
        }
    }

    /// Add an entity, replacing any entity with the same identifier
    ///
    /// Returns a reference to the added entity.
    pub fn add(&mut self, entity: Entity) -> Value {
        let reference = entity.reference();
        match self.entities.iter_mut().find(|e| e.id == entity.id) {
            Some(existing) => *existing = entity,
            None => self.entities.push(entity),
        }
        reference
    }

    pub fn get(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// The metadata descriptor, always the first entity
    pub fn descriptor_mut(&mut self) -> &mut Entity {
        &mut self.entities[0]
    }

    /// The root dataset, always the second entity
    pub fn root_dataset(&self) -> &Entity {
        &self.entities[1]
    }

    pub fn root_dataset_mut(&mut self) -> &mut Entity {
        &mut self.entities[1]
    }

    /// Add a `File` copied from `source` to `dest` below the crate root
    ///
    /// The file is listed in the root dataset's `hasPart`.
    pub fn add_file(
        &mut self,
        source: impl Into<PathBuf>,
        dest: impl AsRef<Path>,
        types: &[&str],
    ) -> Result<&mut Entity> {
        let id = data_entity_id(dest.as_ref(), false)?;
        let mut all_types = vec!["File"];
        all_types.extend(types.iter().copied().filter(|t| *t != "File"));
        self.add_data_entity(Entity::new(id, &all_types), source.into(), SourceKind::File)
    }

    /// Add a `Dataset` for the directory `source`, placed at `dest`
    pub fn add_directory(
        &mut self,
        source: impl Into<PathBuf>,
        dest: impl AsRef<Path>,
    ) -> Result<&mut Entity> {
        let id = data_entity_id(dest.as_ref(), true)?;
        self.add_data_entity(
            Entity::new(id, &["Dataset"]),
            source.into(),
            SourceKind::Directory,
        )
    }

    fn add_data_entity(
        &mut self,
        entity: Entity,
        path: PathBuf,
        kind: SourceKind,
    ) -> Result<&mut Entity> {
        let id = entity.id.clone();
        self.root_dataset_mut().append_to("hasPart", reference(&id));
        self.sources.retain(|s| s.id != id);
        self.sources.push(DataSource {
            id: id.clone(),
            path,
            kind,
        });
        self.add(entity);
        self.get_mut(&id)
            .ok_or_else(|| Error::InvalidPath(format!("entity {} vanished", id)))
    }

    /// Add a workflow file
    ///
    /// A main workflow becomes the root dataset's `mainEntity` and makes the
    /// descriptor declare the Workflow RO-Crate profile.
    pub fn add_workflow(
        &mut self,
        source: impl Into<PathBuf>,
        dest: impl AsRef<Path>,
        main: bool,
        language: Value,
    ) -> Result<Value> {
        let entity = self.add_file(
            source,
            dest,
            &["SoftwareSourceCode", "ComputationalWorkflow"],
        )?;
        entity.set("programmingLanguage", language);
        let workflow = entity.reference();

        if main {
            self.root_dataset_mut().set("mainEntity", workflow.clone());
            let descriptor = self.descriptor_mut();
            let declared = descriptor
                .get("conformsTo")
                .is_some_and(|v| v.to_string().contains(WORKFLOW_CRATE_PROFILE));
            if !declared {
                descriptor.append_to("conformsTo", reference(WORKFLOW_CRATE_PROFILE));
            }
        }

        Ok(workflow)
    }

    /// Source files of the workflow and parameter entities, for validation
    pub fn file_sources(&self) -> impl Iterator<Item = &Path> {
        self.sources
            .iter()
            .filter(|s| s.kind == SourceKind::File)
            .map(|s| s.path.as_path())
    }

    /// The full JSON-LD document
    pub fn to_json_ld(&self) -> Value {
        json!({
            "@context": CONTEXT_URL,
            "@graph": self.entities.iter().map(Entity::to_json).collect::<Vec<_>>(),
        })
    }
}

/// Identifier of a data entity at `dest` below the crate root
///
/// Directories get a trailing slash.
fn data_entity_id(dest: &Path, directory: bool) -> Result<String> {
    let relative = sanitize_path(dest)?;
    let mut id = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    if directory {
        id.push('/');
    }
    Ok(id)
}

/// Destination of a directory inside a crate
///
/// A directory already below the crate root keeps its relative location;
/// anything else is placed at the root under its own name.
pub fn dataset_dest(crate_root: &Path, dir: &Path) -> Result<PathBuf> {
    match dir.strip_prefix(crate_root) {
        Ok(relative) if !relative.as_os_str().is_empty() => Ok(relative.to_path_buf()),
        _ => dir
            .file_name()
            .map(PathBuf::from)
            .ok_or_else(|| Error::InvalidPath(format!("{} has no file name", dir.display()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_crate_skeleton() {
        let crate_ = RoCrate::new();
        let doc = crate_.to_json_ld();

        assert_eq!(doc["@context"], CONTEXT_URL);
        let graph = doc["@graph"].as_array().unwrap();
        assert_eq!(graph[0]["@id"], METADATA_FILE);
        assert_eq!(graph[0]["about"]["@id"], ROOT_ID);
        assert_eq!(graph[1]["@id"], ROOT_ID);
        assert_eq!(graph[1]["@type"], "Dataset");
        assert!(graph[1]["datePublished"].is_string());
    }

    #[test]
    fn test_published_at() {
        use chrono::TimeZone;

        let date = Local.with_ymd_and_hms(2024, 3, 5, 14, 7, 0).unwrap();
        let crate_ = RoCrate::published_at(date);
        assert_eq!(
            crate_.root_dataset().get("datePublished"),
            Some(&Value::String(date.to_rfc3339()))
        );
    }

    #[test]
    fn test_add_replaces_same_id() {
        let mut crate_ = RoCrate::new();
        crate_.add(Entity::new("#bash", &["ComputerLanguage"]).with("name", "bash"));
        crate_.add(Entity::new("#bash", &["ComputerLanguage"]).with("name", "Bash"));

        assert_eq!(crate_.entities().len(), 3);
        assert_eq!(crate_.get("#bash").unwrap().get("name").unwrap(), "Bash");
    }

    #[test]
    fn test_append_to() {
        let mut entity = Entity::new("#wf", &["File"]);
        entity.append_to("input", reference("#a"));
        entity.append_to("input", reference("#b"));
        assert_eq!(entity.get("input").unwrap().as_array().unwrap().len(), 2);

        entity.set("url", "https://example.org");
        entity.append_to("url", "https://mirror.example.org");
        assert_eq!(
            entity.get("url").unwrap(),
            &json!(["https://example.org", "https://mirror.example.org"])
        );
    }

    #[test]
    fn test_entity_types() {
        let entity = Entity::new("x", &["File", "SoftwareSourceCode"]);
        assert_eq!(entity.types(), vec!["File", "SoftwareSourceCode"]);
        assert!(entity.has_type("File"));
        assert!(!entity.has_type("Dataset"));
        assert_eq!(entity.to_json()["@id"], "x");
    }

    #[test]
    fn test_add_file_and_directory_ids() {
        let mut crate_ = RoCrate::new();
        crate_
            .add_file("/tmp/params.json", "/params/./params.json", &[])
            .unwrap();
        crate_.add_directory("/data/src/images", "images").unwrap();

        assert!(crate_.get("params/params.json").unwrap().has_type("File"));
        assert!(crate_.get("images/").unwrap().has_type("Dataset"));
        assert_eq!(
            crate_.root_dataset().get("hasPart").unwrap(),
            &json!([{"@id": "params/params.json"}, {"@id": "images/"}])
        );
        assert!(crate_.add_file("/tmp/x", "../x", &[]).is_err());
    }

    #[test]
    fn test_add_main_workflow() {
        let mut crate_ = RoCrate::new();
        let bash = crate_.add(Entity::new("#bash", &["ComputerLanguage"]));
        let wf = crate_
            .add_workflow("/repo/batchconvert", "batchconvert", true, bash)
            .unwrap();

        assert_eq!(wf, reference("batchconvert"));
        assert_eq!(crate_.root_dataset().get("mainEntity").unwrap(), &wf);
        let entity = crate_.get("batchconvert").unwrap();
        assert_eq!(
            entity.types(),
            vec!["File", "SoftwareSourceCode", "ComputationalWorkflow"]
        );

        let doc = crate_.to_json_ld();
        assert_eq!(
            doc["@graph"][0]["conformsTo"],
            json!([{"@id": RO_CRATE_PROFILE}, {"@id": WORKFLOW_CRATE_PROFILE}])
        );
    }

    #[test]
    fn test_dataset_dest() {
        let root = Path::new("/data/src");
        assert_eq!(
            dataset_dest(root, Path::new("/data/src/deep/converted")).unwrap(),
            PathBuf::from("deep/converted")
        );
        assert_eq!(
            dataset_dest(root, Path::new("/elsewhere/raw")).unwrap(),
            PathBuf::from("raw")
        );
    }
}
