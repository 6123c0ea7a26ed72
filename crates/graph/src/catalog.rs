//! Type catalog: entity shapes and the operations the API accepts.
//!
//! Everything here is static data. The resolution layer and both store
//! implementations are driven entirely by these declarations: scalar field
//! lists (with nullability and uniqueness), relation definitions (foreign
//! key placement and cardinality), SQL naming, and the query/mutation
//! operation lists.
//!
//! Field names are the API-facing camelCase names; `column` carries the
//! snake_case SQL name for the Postgres store.

/// Scalar field types supported by the catalog.
///
/// `Decimal` values travel as strings on the wire (exact representation);
/// `DateTime` values as RFC 3339 strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scalar {
    /// Surrogate key, `i32` in the store.
    Id,
    /// UTF-8 text.
    Text,
    /// Boolean flag.
    Bool,
    /// 32-bit integer.
    Int,
    /// Arbitrary-precision decimal (money).
    Decimal,
    /// UTC timestamp.
    DateTime,
}

/// A scalar field declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    /// API-facing field name (camelCase).
    pub name: &'static str,
    /// SQL column name (snake_case).
    pub column: &'static str,
    /// Scalar type of the field.
    pub ty: Scalar,
    /// Whether an absent value is a legal resolution result. A non-nullable
    /// field that cannot be populated for an existing record is a data
    /// integrity fault, never a valid empty result.
    pub nullable: bool,
    /// Whether the store enforces uniqueness for this field.
    pub unique: bool,
}

impl FieldDef {
    /// The identity field shared by every entity.
    const fn id() -> Self {
        Self {
            name: "id",
            column: "id",
            ty: Scalar::Id,
            nullable: false,
            unique: true,
        }
    }

    const fn required(name: &'static str, column: &'static str, ty: Scalar) -> Self {
        Self {
            name,
            column,
            ty,
            nullable: false,
            unique: false,
        }
    }

    const fn optional(name: &'static str, column: &'static str, ty: Scalar) -> Self {
        Self {
            name,
            column,
            ty,
            nullable: true,
            unique: false,
        }
    }

    const fn unique(name: &'static str, column: &'static str, ty: Scalar) -> Self {
        Self {
            name,
            column,
            ty,
            nullable: false,
            unique: true,
        }
    }
}

/// How a relation field is derived from foreign references.
///
/// Relation fields are never stored inline: a many-to-one relation reads the
/// foreign key on the owning record, a one-to-many relation collects the
/// records on the target side whose foreign key points back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    /// This entity holds the foreign key; resolves to zero or one target.
    ManyToOne {
        /// Record key carrying the foreign key value.
        fk_field: &'static str,
        /// SQL column for the foreign key.
        fk_column: &'static str,
        /// Whether the reference may legitimately be absent.
        nullable: bool,
    },
    /// The target entity holds the foreign key; resolves to a collection.
    OneToMany {
        /// Record key on the *target* carrying the foreign key.
        fk_field: &'static str,
        /// SQL column on the target for the foreign key.
        fk_column: &'static str,
    },
}

/// A relation field declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    /// API-facing field name.
    pub name: &'static str,
    /// Entity the relation resolves to.
    pub target: Entity,
    /// Foreign key placement and cardinality.
    pub kind: RelationKind,
}

/// The entities the API exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Entity {
    User,
    Post,
    Category,
    Customer,
    Employee,
    Supplier,
    Product,
    Shipper,
    Order,
    OrderDetail,
}

const USER_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::unique("email", "email", Scalar::Text),
    FieldDef::optional("name", "name", Scalar::Text),
];

const POST_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::required("title", "title", Scalar::Text),
    FieldDef::optional("content", "content", Scalar::Text),
    FieldDef::required("published", "published", Scalar::Bool),
];

const CATEGORY_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::required("name", "name", Scalar::Text),
    FieldDef::required("description", "description", Scalar::Text),
];

const CUSTOMER_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::required("customerName", "customer_name", Scalar::Text),
    FieldDef::required("contactName", "contact_name", Scalar::Text),
    FieldDef::required("address", "address", Scalar::Text),
    FieldDef::required("city", "city", Scalar::Text),
    FieldDef::required("postalCode", "postal_code", Scalar::Text),
    FieldDef::required("country", "country", Scalar::Text),
];

const EMPLOYEE_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::required("lastName", "last_name", Scalar::Text),
    FieldDef::required("firstName", "first_name", Scalar::Text),
    FieldDef::required("birthDate", "birth_date", Scalar::DateTime),
    FieldDef::required("photo", "photo", Scalar::Text),
    FieldDef::required("notes", "notes", Scalar::Text),
];

// The source schema declared contactName twice; collapsed to one field.
const SUPPLIER_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::required("name", "name", Scalar::Text),
    FieldDef::required("contactName", "contact_name", Scalar::Text),
    FieldDef::required("address", "address", Scalar::Text),
    FieldDef::required("city", "city", Scalar::Text),
    FieldDef::required("postalCode", "postal_code", Scalar::Text),
    FieldDef::required("country", "country", Scalar::Text),
    FieldDef::required("phone", "phone", Scalar::Text),
];

const PRODUCT_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::required("name", "name", Scalar::Text),
    FieldDef::required("price", "price", Scalar::Decimal),
    FieldDef::required("description", "description", Scalar::Text),
    FieldDef::required("excerpt", "excerpt", Scalar::Text),
    FieldDef::required("unit", "unit", Scalar::Text),
];

const SHIPPER_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::required("shipperName", "shipper_name", Scalar::Text),
    FieldDef::required("phone", "phone", Scalar::Text),
];

const ORDER_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::required("orderDate", "order_date", Scalar::DateTime),
];

const ORDER_DETAIL_FIELDS: &[FieldDef] = &[
    FieldDef::id(),
    FieldDef::optional("quantity", "quantity", Scalar::Int),
];

const USER_RELATIONS: &[RelationDef] = &[RelationDef {
    name: "posts",
    target: Entity::Post,
    kind: RelationKind::OneToMany {
        fk_field: "authorId",
        fk_column: "author_id",
    },
}];

const POST_RELATIONS: &[RelationDef] = &[RelationDef {
    name: "author",
    target: Entity::User,
    kind: RelationKind::ManyToOne {
        fk_field: "authorId",
        fk_column: "author_id",
        nullable: true,
    },
}];

const CUSTOMER_RELATIONS: &[RelationDef] = &[RelationDef {
    name: "orders",
    target: Entity::Order,
    kind: RelationKind::OneToMany {
        fk_field: "customerId",
        fk_column: "customer_id",
    },
}];

const PRODUCT_RELATIONS: &[RelationDef] = &[
    RelationDef {
        name: "category",
        target: Entity::Category,
        kind: RelationKind::ManyToOne {
            fk_field: "categoryId",
            fk_column: "category_id",
            nullable: true,
        },
    },
    RelationDef {
        name: "supplier",
        target: Entity::Supplier,
        kind: RelationKind::ManyToOne {
            fk_field: "supplierId",
            fk_column: "supplier_id",
            nullable: true,
        },
    },
];

// The source schema declared customer/employee as collections on Order.
// Remodeled as single nullable references; nothing in the original store
// supported more than one customer or employee per order.
const ORDER_RELATIONS: &[RelationDef] = &[
    RelationDef {
        name: "shipper",
        target: Entity::Shipper,
        kind: RelationKind::ManyToOne {
            fk_field: "shipperId",
            fk_column: "shipper_id",
            nullable: false,
        },
    },
    RelationDef {
        name: "customer",
        target: Entity::Customer,
        kind: RelationKind::ManyToOne {
            fk_field: "customerId",
            fk_column: "customer_id",
            nullable: true,
        },
    },
    RelationDef {
        name: "employee",
        target: Entity::Employee,
        kind: RelationKind::ManyToOne {
            fk_field: "employeeId",
            fk_column: "employee_id",
            nullable: true,
        },
    },
];

const ORDER_DETAIL_RELATIONS: &[RelationDef] = &[
    RelationDef {
        name: "order",
        target: Entity::Order,
        kind: RelationKind::ManyToOne {
            fk_field: "orderId",
            fk_column: "order_id",
            nullable: true,
        },
    },
    RelationDef {
        name: "product",
        target: Entity::Product,
        kind: RelationKind::ManyToOne {
            fk_field: "productId",
            fk_column: "product_id",
            nullable: true,
        },
    },
];

impl Entity {
    /// Every entity in the catalog.
    pub const ALL: [Self; 10] = [
        Self::User,
        Self::Post,
        Self::Category,
        Self::Customer,
        Self::Employee,
        Self::Supplier,
        Self::Product,
        Self::Shipper,
        Self::Order,
        Self::OrderDetail,
    ];

    /// Type name as it appears in the API.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Post => "Post",
            Self::Category => "Category",
            Self::Customer => "Customer",
            Self::Employee => "Employee",
            Self::Supplier => "Supplier",
            Self::Product => "Product",
            Self::Shipper => "Shipper",
            Self::Order => "Order",
            Self::OrderDetail => "OrderDetail",
        }
    }

    /// SQL table name.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::User => "users",
            Self::Post => "posts",
            Self::Category => "categories",
            Self::Customer => "customers",
            Self::Employee => "employees",
            Self::Supplier => "suppliers",
            Self::Product => "products",
            Self::Shipper => "shippers",
            Self::Order => "orders",
            Self::OrderDetail => "order_details",
        }
    }

    /// Declared scalar fields.
    #[must_use]
    pub const fn fields(self) -> &'static [FieldDef] {
        match self {
            Self::User => USER_FIELDS,
            Self::Post => POST_FIELDS,
            Self::Category => CATEGORY_FIELDS,
            Self::Customer => CUSTOMER_FIELDS,
            Self::Employee => EMPLOYEE_FIELDS,
            Self::Supplier => SUPPLIER_FIELDS,
            Self::Product => PRODUCT_FIELDS,
            Self::Shipper => SHIPPER_FIELDS,
            Self::Order => ORDER_FIELDS,
            Self::OrderDetail => ORDER_DETAIL_FIELDS,
        }
    }

    /// Declared relation fields.
    #[must_use]
    pub const fn relations(self) -> &'static [RelationDef] {
        match self {
            Self::User => USER_RELATIONS,
            Self::Post => POST_RELATIONS,
            Self::Customer => CUSTOMER_RELATIONS,
            Self::Product => PRODUCT_RELATIONS,
            Self::Order => ORDER_RELATIONS,
            Self::OrderDetail => ORDER_DETAIL_RELATIONS,
            Self::Category | Self::Employee | Self::Supplier | Self::Shipper => &[],
        }
    }

    /// Look up a scalar field by API name.
    #[must_use]
    pub fn field(self, name: &str) -> Option<&'static FieldDef> {
        self.fields().iter().find(|def| def.name == name)
    }

    /// Look up a relation field by API name.
    #[must_use]
    pub fn relation(self, name: &str) -> Option<&'static RelationDef> {
        self.relations().iter().find(|def| def.name == name)
    }
}

/// Query operations the API accepts. No side effects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryOp {
    /// All published posts.
    Feed,
    /// A single post by identity, or null.
    Post,
    /// The full unfiltered collection of one entity.
    Collection(Entity),
}

impl QueryOp {
    /// Parse a root query field name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "feed" => Some(Self::Feed),
            "post" => Some(Self::Post),
            "categories" => Some(Self::Collection(Entity::Category)),
            "customers" => Some(Self::Collection(Entity::Customer)),
            "employees" => Some(Self::Collection(Entity::Employee)),
            "suppliers" => Some(Self::Collection(Entity::Supplier)),
            "products" => Some(Self::Collection(Entity::Product)),
            "shippers" => Some(Self::Collection(Entity::Shipper)),
            "orders" => Some(Self::Collection(Entity::Order)),
            "orderDetails" => Some(Self::Collection(Entity::OrderDetail)),
            _ => None,
        }
    }
}

/// Mutation operations the API accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationOp {
    /// Create a user, optionally with nested draft posts.
    CreateUser,
    /// Create an unpublished post, optionally linked to an author by email.
    CreateDraft,
    /// Flip a post's published flag to true. Idempotent.
    Publish,
}

impl MutationOp {
    /// Parse a root mutation field name.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "createUser" => Some(Self::CreateUser),
            "createDraft" => Some(Self::CreateDraft),
            "publish" => Some(Self::Publish),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_entity_has_an_id_field() {
        for entity in Entity::ALL {
            let id = entity.field("id").expect("missing id field");
            assert_eq!(id.ty, Scalar::Id);
            assert!(!id.nullable);
            assert!(id.unique);
        }
    }

    #[test]
    fn test_supplier_contact_name_declared_once() {
        let count = Entity::Supplier
            .fields()
            .iter()
            .filter(|def| def.name == "contactName")
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_user_email_is_unique() {
        let email = Entity::User.field("email").expect("missing email");
        assert!(email.unique);
        assert!(!email.nullable);
    }

    #[test]
    fn test_post_author_and_user_posts_share_fk() {
        let author = Entity::Post.relation("author").expect("missing author");
        let posts = Entity::User.relation("posts").expect("missing posts");
        assert_eq!(author.target, Entity::User);
        assert_eq!(posts.target, Entity::Post);

        let RelationKind::ManyToOne { fk_field: a, .. } = author.kind else {
            panic!("author should be many-to-one");
        };
        let RelationKind::OneToMany { fk_field: b, .. } = posts.kind else {
            panic!("posts should be one-to-many");
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_order_shipper_required() {
        let shipper = Entity::Order.relation("shipper").expect("missing shipper");
        assert!(matches!(
            shipper.kind,
            RelationKind::ManyToOne {
                nullable: false,
                ..
            }
        ));
    }

    #[test]
    fn test_query_op_parse() {
        assert_eq!(QueryOp::parse("feed"), Some(QueryOp::Feed));
        assert_eq!(QueryOp::parse("post"), Some(QueryOp::Post));
        assert_eq!(
            QueryOp::parse("orderDetails"),
            Some(QueryOp::Collection(Entity::OrderDetail))
        );
        assert_eq!(
            QueryOp::parse("orders"),
            Some(QueryOp::Collection(Entity::Order))
        );
        assert_eq!(QueryOp::parse("nonsense"), None);
    }

    #[test]
    fn test_mutation_op_parse() {
        assert_eq!(MutationOp::parse("createUser"), Some(MutationOp::CreateUser));
        assert_eq!(
            MutationOp::parse("createDraft"),
            Some(MutationOp::CreateDraft)
        );
        assert_eq!(MutationOp::parse("publish"), Some(MutationOp::Publish));
        assert_eq!(MutationOp::parse("deletePost"), None);
    }

    #[test]
    fn test_unknown_field_lookup() {
        assert!(Entity::Shipper.field("speed").is_none());
        assert!(Entity::Shipper.relation("orders").is_none());
    }
}
