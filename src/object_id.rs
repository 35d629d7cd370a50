use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use crate::constants::layout::OBJECT_ID_LEN;
use crate::project::Project;

/// Identifier of a record inside the `objects` dictionary
///
/// Existing files may use identifiers of any shape; the ones we generate are
/// always 24 uppercase hexadecimal characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(value: impl Into<String>) -> Self {
        ObjectId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        ObjectId(value.to_string())
    }
}

/// Hands out fresh identifiers that collide neither with the descriptor nor
/// with each other
pub struct IdGenerator {
    taken: HashSet<String>,
}

impl IdGenerator {
    pub fn new<'a>(existing: impl IntoIterator<Item = &'a ObjectId>) -> Self {
        IdGenerator {
            taken: existing.into_iter().map(|id| id.0.clone()).collect(),
        }
    }

    /// Generator that avoids every identifier already in `project`
    pub fn for_project(project: &Project) -> Self {
        Self::new(project.ids())
    }

    pub fn next_id(&mut self) -> ObjectId {
        loop {
            let candidate = Uuid::new_v4().simple().to_string()[..OBJECT_ID_LEN].to_uppercase();
            if self.taken.insert(candidate.clone()) {
                return ObjectId(candidate);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_24_uppercase_hex() {
        let mut ids = IdGenerator::new(std::iter::empty());
        let id = ids.next_id();
        assert_eq!(id.as_str().len(), 24);
        assert!(id
            .as_str()
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let existing = [ObjectId::from("A1000001")];
        let mut ids = IdGenerator::new(existing.iter());
        let generated: HashSet<ObjectId> = (0..500).map(|_| ids.next_id()).collect();
        assert_eq!(generated.len(), 500);
        assert!(!generated.contains(&existing[0]));
    }
}
