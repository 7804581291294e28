//! Fixed code dictionaries from the HMIS data standard.

/// HUD project type codes.
pub const PROJECT_TYPES: &[(i64, &str)] = &[
    (1, "Emergency Shelter"),
    (2, "Transitional Housing"),
    (3, "PH - Permanent Supportive Housing"),
    (4, "Street Outreach"),
    (6, "Services Only"),
    (7, "Other"),
    (8, "Safe Haven"),
    (9, "PH - Housing Only"),
    (10, "PH - Housing with Services"),
    (11, "Day Shelter"),
    (12, "Homelessness Prevention"),
    (13, "PH - Rapid Re-Housing"),
    (14, "Coordinated Assessment"),
];

/// Disability type codes. The names become column prefixes after pivoting.
pub const DISABILITY_TYPES: &[(i64, &str)] = &[
    (5, "Physical"),
    (6, "Developmental"),
    (7, "ChronicHealth"),
    (8, "HIVAIDS"),
    (9, "MentalHealth"),
    (10, "SubstanceAbuse"),
];

fn lookup(table: &'static [(i64, &'static str)], code: i64) -> Option<&'static str> {
    table
        .iter()
        .find(|(candidate, _)| *candidate == code)
        .map(|(_, name)| *name)
}

pub fn project_type_name(code: i64) -> Option<&'static str> {
    lookup(PROJECT_TYPES, code)
}

pub fn disability_type_name(code: i64) -> Option<&'static str> {
    lookup(DISABILITY_TYPES, code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn project_types() {
        assert_eq!(project_type_name(1), Some("Emergency Shelter"));
        assert_eq!(project_type_name(13), Some("PH - Rapid Re-Housing"));
        assert_eq!(project_type_name(5), None);
    }

    #[test]
    fn disability_types() {
        assert_eq!(disability_type_name(5), Some("Physical"));
        assert_eq!(disability_type_name(8), Some("HIVAIDS"));
        assert_eq!(disability_type_name(11), None);
    }
}
