//! Collection metadata: the queryable capability each resource exposes to
//! the query engine.
//!
//! A [`Collection`] describes a resource table well enough for the engine
//! to filter, project, sort, window, count, and populate it: column list,
//! JSONB document fields (filterable through dot paths), default hidden
//! fields (secrets that `select` cannot reveal), the creation-time column
//! used for the default sort, and the declared relations.

/// A relation another collection can be populated from.
#[derive(Debug, Clone, Copy)]
pub struct Relation {
    /// Name under which resolved documents are embedded.
    pub field: &'static str,

    /// Table the related documents live in.
    pub target_table: &'static str,

    /// Field on the parent document holding the join value.
    pub local_key: &'static str,

    /// Field on the related document matched against `local_key`.
    pub foreign_key: &'static str,

    /// True when the relation resolves to a single document.
    pub singular: bool,
}

/// Per-collection capability and projection policy.
#[derive(Debug, Clone, Copy)]
pub struct Collection {
    /// Resource name (used in error messages).
    pub name: &'static str,

    /// Backing table.
    pub table: &'static str,

    /// All queryable columns, in storage order.
    pub columns: &'static [&'static str],

    /// JSONB columns whose interior is addressed with dot paths.
    pub document_fields: &'static [&'static str],

    /// Columns excluded from every projection, even when selected.
    pub hidden_fields: &'static [&'static str],

    /// Creation-time column, used for the default sort.
    pub created_field: &'static str,

    /// Relations available for population.
    pub relations: &'static [Relation],
}

impl Collection {
    /// Look up a declared relation by its embed name.
    pub fn relation(&self, field: &str) -> Option<&Relation> {
        self.relations.iter().find(|r| r.field == field)
    }

    /// True when `column` is one of this collection's plain columns.
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(&column)
    }

    /// True when `column` is a JSONB document field.
    pub fn is_document_field(&self, column: &str) -> bool {
        self.document_fields.contains(&column)
    }

    /// True when `column` is hidden by the projection policy.
    pub fn is_hidden(&self, column: &str) -> bool {
        self.hidden_fields.contains(&column)
    }
}

/// Bootcamps: the root resource.
pub static BOOTCAMPS: Collection = Collection {
    name: "bootcamp",
    table: "bootcamp",
    columns: &[
        "id",
        "user_id",
        "name",
        "slug",
        "description",
        "website",
        "phone",
        "email",
        "address",
        "location",
        "careers",
        "housing",
        "job_assistance",
        "job_guarantee",
        "accept_gi",
        "average_rating",
        "average_cost",
        "created_at",
    ],
    document_fields: &["location", "careers"],
    hidden_fields: &[],
    created_field: "created_at",
    relations: &[
        Relation {
            field: "courses",
            target_table: "course",
            local_key: "id",
            foreign_key: "bootcamp_id",
            singular: false,
        },
        Relation {
            field: "reviews",
            target_table: "review",
            local_key: "id",
            foreign_key: "bootcamp_id",
            singular: false,
        },
    ],
};

/// Courses offered by a bootcamp.
pub static COURSES: Collection = Collection {
    name: "course",
    table: "course",
    columns: &[
        "id",
        "bootcamp_id",
        "user_id",
        "title",
        "description",
        "weeks",
        "tuition",
        "minimum_skill",
        "scholarship_available",
        "created_at",
    ],
    document_fields: &[],
    hidden_fields: &[],
    created_field: "created_at",
    relations: &[Relation {
        field: "bootcamp",
        target_table: "bootcamp",
        local_key: "bootcamp_id",
        foreign_key: "id",
        singular: true,
    }],
};

/// Reviews left on a bootcamp.
pub static REVIEWS: Collection = Collection {
    name: "review",
    table: "review",
    columns: &[
        "id",
        "bootcamp_id",
        "user_id",
        "title",
        "body",
        "rating",
        "created_at",
    ],
    document_fields: &[],
    hidden_fields: &[],
    created_field: "created_at",
    relations: &[Relation {
        field: "bootcamp",
        target_table: "bootcamp",
        local_key: "bootcamp_id",
        foreign_key: "id",
        singular: true,
    }],
};

/// User accounts. The password hash is hidden from every projection.
pub static USERS: Collection = Collection {
    name: "user",
    table: "users",
    columns: &["id", "name", "email", "password", "role", "created_at"],
    document_fields: &[],
    hidden_fields: &["password"],
    created_field: "created_at",
    relations: &[],
};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn relation_lookup_by_embed_name() {
        let rel = BOOTCAMPS.relation("courses").unwrap();
        assert_eq!(rel.target_table, "course");
        assert_eq!(rel.foreign_key, "bootcamp_id");
        assert!(!rel.singular);

        assert!(BOOTCAMPS.relation("nonexistent").is_none());
    }

    #[test]
    fn course_bootcamp_relation_is_singular() {
        let rel = COURSES.relation("bootcamp").unwrap();
        assert!(rel.singular);
        assert_eq!(rel.local_key, "bootcamp_id");
        assert_eq!(rel.foreign_key, "id");
    }

    #[test]
    fn user_password_is_hidden() {
        assert!(USERS.is_hidden("password"));
        assert!(!USERS.is_hidden("email"));
    }

    #[test]
    fn bootcamp_document_fields() {
        assert!(BOOTCAMPS.is_document_field("location"));
        assert!(BOOTCAMPS.is_document_field("careers"));
        assert!(!BOOTCAMPS.is_document_field("name"));
    }
}
