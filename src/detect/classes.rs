use anyhow::{anyhow, Result};

pub const CAR_CLASS: u32 = 0;
pub const AMBULANCE_CLASS: u32 = 1;

/// How the signal logic treats a class.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClassKind {
    /// Emergency vehicle; overrides count reporting.
    Priority,
    /// Anything else the model reports. Counted as a vehicle.
    Ordinary,
}

/// Explicit class-id table: labels by id plus the priority class.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassMap {
    names: Vec<String>,
    priority: u32,
}

impl Default for ClassMap {
    fn default() -> Self {
        Self {
            names: vec!["car".to_string(), "ambulance".to_string()],
            priority: AMBULANCE_CLASS,
        }
    }
}

impl ClassMap {
    pub fn new(names: Vec<String>, priority: u32) -> Result<Self> {
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(anyhow!("class names must not be empty"));
        }
        if priority as usize >= names.len() {
            return Err(anyhow!(
                "priority class {} has no entry in the class table ({} names)",
                priority,
                names.len()
            ));
        }
        Ok(Self { names, priority })
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn kind(&self, class_id: u32) -> ClassKind {
        if class_id == self.priority {
            ClassKind::Priority
        } else {
            ClassKind::Ordinary
        }
    }

    /// Label for a class id; unknown ids get `class_<id>`.
    pub fn label(&self, class_id: u32) -> String {
        self.names
            .get(class_id as usize)
            .cloned()
            .unwrap_or_else(|| format!("class_{}", class_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_marks_ambulance_priority() {
        let classes = ClassMap::default();
        assert_eq!(classes.kind(AMBULANCE_CLASS), ClassKind::Priority);
        assert_eq!(classes.kind(CAR_CLASS), ClassKind::Ordinary);
        assert_eq!(classes.label(CAR_CLASS), "car");
        assert_eq!(classes.label(AMBULANCE_CLASS), "ambulance");
    }

    #[test]
    fn unknown_ids_are_ordinary() {
        let classes = ClassMap::default();
        assert_eq!(classes.kind(7), ClassKind::Ordinary);
        assert_eq!(classes.label(7), "class_7");
    }

    #[test]
    fn priority_must_be_in_table() {
        assert!(ClassMap::new(vec!["car".into()], 1).is_err());
        assert!(ClassMap::new(vec!["car".into(), " ".into()], 0).is_err());
        let classes = ClassMap::new(vec!["ambulance".into(), "car".into(), "bus".into()], 0).unwrap();
        assert_eq!(classes.kind(0), ClassKind::Priority);
        assert_eq!(classes.kind(2), ClassKind::Ordinary);
    }
}
