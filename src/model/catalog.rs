use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub type Id = String;

/// Root of the notes catalog as persisted in `notes-data.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub semesters: Vec<Semester>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Semester {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    #[serde(default)]
    pub branches: Vec<Branch>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    #[serde(default)]
    pub subjects: Vec<Subject>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: Id,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub materials: Vec<Material>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Material {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    pub path: String,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub material_type: String,
    // Entries added by the watcher may omit these
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub size: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub upload_date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub download_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Level of the catalog hierarchy, used to report which lookup failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogLevel {
    Semester,
    Branch,
    Subject,
}

impl fmt::Display for CatalogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CatalogLevel::Semester => "Semester",
            CatalogLevel::Branch => "Branch",
            CatalogLevel::Subject => "Subject",
        };
        f.write_str(name)
    }
}

/// Accepts ids stored either as JSON strings or numbers and normalizes them
/// to their string form, so `1` and `"1"` compare equal after load.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<Id, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

/// Optional variant of [`deserialize_id`] for request bodies where the
/// field may be absent or null.
pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<Id>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

impl CatalogDocument {
    pub fn find_semester_mut(&mut self, id: &str) -> Option<&mut Semester> {
        self.semesters.iter_mut().find(|s| s.id == id)
    }

    /// Walk semester → branch → subject, reporting the first level that
    /// does not exist.
    pub fn resolve_subject_mut(
        &mut self,
        semester_id: &str,
        branch_id: &str,
        subject_id: &str,
    ) -> Result<&mut Subject, CatalogLevel> {
        self.find_semester_mut(semester_id)
            .ok_or(CatalogLevel::Semester)?
            .find_branch_mut(branch_id)
            .ok_or(CatalogLevel::Branch)?
            .find_subject_mut(subject_id)
            .ok_or(CatalogLevel::Subject)
    }
}

impl Semester {
    pub fn find_branch_mut(&mut self, id: &str) -> Option<&mut Branch> {
        self.branches.iter_mut().find(|b| b.id == id)
    }
}

impl Branch {
    pub fn find_subject_mut(&mut self, id: &str) -> Option<&mut Subject> {
        self.subjects.iter_mut().find(|s| s.id == id)
    }
}

impl Subject {
    pub fn has_material_path(&self, forms: &[&str]) -> bool {
        self.materials
            .iter()
            .any(|m| forms.iter().any(|form| m.path == *form))
    }

    pub fn add_material(&mut self, material: Material) {
        self.materials.push(material);
    }

    /// Removes every material whose path equals `path` exactly and returns
    /// how many were removed.
    pub fn remove_material(&mut self, path: &str) -> usize {
        let before = self.materials.len();
        self.materials.retain(|m| m.path != path);
        before - self.materials.len()
    }
}

/// Folder name derived from a subject name: lower-cased, spaces replaced
/// with hyphens.
pub fn subject_folder_name(name: &str) -> String {
    name.replace(' ', "-").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> CatalogDocument {
        serde_json::from_value(json!({
            "semesters": [
                {
                    "id": 1,
                    "name": "First",
                    "branches": [
                        {
                            "id": "cse",
                            "name": "Computer Science",
                            "subjects": [
                                {
                                    "id": "ds",
                                    "name": "Data Structures",
                                    "materials": [
                                        {
                                            "title": "Trees",
                                            "description": "Binary trees",
                                            "path": "/data/notes/semester-1/cse/data-structures/trees.pdf",
                                            "type": "pdf",
                                            "size": "12KB",
                                            "uploadDate": "2024-01-02",
                                            "downloadUrl": "/api/download?path=/data/notes/semester-1/cse/data-structures/trees.pdf",
                                            "thumbnail": null
                                        }
                                    ]
                                },
                                { "id": "os", "name": "Operating Systems" }
                            ]
                        }
                    ]
                }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_numeric_ids_normalize_to_strings() {
        let mut doc = sample();
        assert_eq!(doc.semesters[0].id, "1");
        assert!(doc.find_semester_mut("1").is_some());
        assert!(doc.find_semester_mut("2").is_none());
    }

    #[test]
    fn test_resolve_reports_failing_level() {
        let mut doc = sample();
        assert!(doc.resolve_subject_mut("1", "cse", "ds").is_ok());
        assert_eq!(
            doc.resolve_subject_mut("9", "cse", "ds").unwrap_err(),
            CatalogLevel::Semester
        );
        assert_eq!(
            doc.resolve_subject_mut("1", "ece", "ds").unwrap_err(),
            CatalogLevel::Branch
        );
        assert_eq!(
            doc.resolve_subject_mut("1", "cse", "math").unwrap_err(),
            CatalogLevel::Subject
        );
    }

    #[test]
    fn test_missing_materials_default_to_empty() {
        let mut doc = sample();
        let subject = doc.resolve_subject_mut("1", "cse", "os").unwrap();
        assert!(subject.materials.is_empty());
    }

    #[test]
    fn test_remove_material_exact_match_only() {
        let mut doc = sample();
        let subject = doc.resolve_subject_mut("1", "cse", "ds").unwrap();
        assert_eq!(
            subject.remove_material("../data/notes/semester-1/cse/data-structures/trees.pdf"),
            0
        );
        assert_eq!(
            subject.remove_material("/data/notes/semester-1/cse/data-structures/trees.pdf"),
            1
        );
        assert!(subject.materials.is_empty());
    }

    #[test]
    fn test_folder_name_is_idempotent() {
        let once = subject_folder_name("Data Structures And Algorithms");
        assert_eq!(once, "data-structures-and-algorithms");
        assert_eq!(subject_folder_name(&once), once);
    }

    #[test]
    fn test_extra_fields_survive_round_trip() {
        let doc = sample();
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["semesters"][0]["id"], json!("1"));
        assert_eq!(value["semesters"][0]["name"], json!("First"));
        assert_eq!(
            value["semesters"][0]["branches"][0]["subjects"][0]["materials"][0]["thumbnail"],
            Value::Null
        );
        assert_eq!(
            value["semesters"][0]["branches"][0]["subjects"][0]["materials"][0]["uploadDate"],
            json!("2024-01-02")
        );
    }

    #[test]
    fn test_sparse_watcher_entries_load_and_stay_sparse() {
        let doc: CatalogDocument = serde_json::from_value(json!({
            "semesters": [{
                "id": "1",
                "branches": [{
                    "id": "cse",
                    "subjects": [{
                        "id": "misc",
                        "materials": [{
                            "title": "Dropped in",
                            "path": "../data/notes/semester-1/cse/misc/dropped.pdf",
                            "type": "pdf"
                        }]
                    }]
                }]
            }]
        }))
        .unwrap();

        let subject = &doc.semesters[0].branches[0].subjects[0];
        assert_eq!(subject.name, "");
        assert_eq!(subject.materials[0].size, "");
        assert_eq!(subject.materials[0].upload_date, "");

        let value = serde_json::to_value(&doc).unwrap();
        let material = &value["semesters"][0]["branches"][0]["subjects"][0]["materials"][0];
        assert_eq!(
            material,
            &json!({
                "title": "Dropped in",
                "path": "../data/notes/semester-1/cse/misc/dropped.pdf",
                "type": "pdf"
            })
        );
    }
}
