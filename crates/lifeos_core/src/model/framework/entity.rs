//! Entity and link declaration contracts.
//!
//! # Responsibility
//! - Describe the structural role of each entity kind.
//! - Declare owning, containing and referencing links used by traversal.
//!
//! # Invariants
//! - Trunks and stubs are unique per parent (enforced through `unique_key`).
//! - Owning and containing links cascade archive/remove; `RefsMany` never does.
//!
//! # See also
//! - `service::traversal` for the cascade walkers.

use crate::model::framework::base::EntityId;
use crate::model::framework::context::DomainContext;
use crate::model::framework::event::{ArchivalReason, EntityHeader};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Structural role of an entity inside its ownership tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityStructure {
    Root,
    Trunk,
    Stub,
    Branch,
    Leaf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    OwnsOne,
    OwnsAtMostOne,
    OwnsMany,
    ContainsOne,
    ContainsMany,
    RefsMany,
}

impl LinkKind {
    pub fn cascades(self) -> bool {
        !matches!(self, Self::RefsMany)
    }
}

/// How a child finds its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefResolver {
    /// Child's structural parent is the owner.
    Parent,
    /// Child's indexed field holds the owner id.
    IsRefId(&'static str),
    /// Child's indexed list field contains the owner id.
    IsOneOfRefId(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkDescriptor {
    pub kind: LinkKind,
    pub child_kind: &'static str,
    pub resolver: RefResolver,
    /// Extra `(indexed_field, value)` equalities a child must match.
    pub filters: &'static [(&'static str, &'static str)],
}

impl LinkDescriptor {
    pub const fn new(kind: LinkKind, child_kind: &'static str, resolver: RefResolver) -> Self {
        Self {
            kind,
            child_kind,
            resolver,
            filters: &[],
        }
    }

    pub const fn with_filters(mut self, filters: &'static [(&'static str, &'static str)]) -> Self {
        self.filters = filters;
        self
    }
}

pub const fn owns_one(child_kind: &'static str, resolver: RefResolver) -> LinkDescriptor {
    LinkDescriptor::new(LinkKind::OwnsOne, child_kind, resolver)
}

pub const fn owns_at_most_one(child_kind: &'static str, resolver: RefResolver) -> LinkDescriptor {
    LinkDescriptor::new(LinkKind::OwnsAtMostOne, child_kind, resolver)
}

pub const fn owns_many(child_kind: &'static str, resolver: RefResolver) -> LinkDescriptor {
    LinkDescriptor::new(LinkKind::OwnsMany, child_kind, resolver)
}

pub const fn contains_one(child_kind: &'static str) -> LinkDescriptor {
    LinkDescriptor::new(LinkKind::ContainsOne, child_kind, RefResolver::Parent)
}

pub const fn contains_many(child_kind: &'static str) -> LinkDescriptor {
    LinkDescriptor::new(LinkKind::ContainsMany, child_kind, RefResolver::Parent)
}

pub const fn refs_many(child_kind: &'static str, resolver: RefResolver) -> LinkDescriptor {
    LinkDescriptor::new(LinkKind::RefsMany, child_kind, resolver)
}

/// Indexed `(field, value)` pair persisted next to an entity for generic lookups.
pub type IndexField = (&'static str, String);

/// A persisted, versioned, archivable domain object.
pub trait Entity: Clone + Debug + Serialize + DeserializeOwned + 'static {
    const KIND: &'static str;
    const STRUCTURE: EntityStructure;
    /// Whether the entity is published to the free-text index.
    const SEARCHABLE: bool = false;

    fn header(&self) -> &EntityHeader;

    fn header_mut(&mut self) -> &mut EntityHeader;

    /// Structural parent; `None` only for roots.
    fn parent_ref_id(&self) -> Option<EntityId>;

    fn display_name(&self) -> String {
        Self::KIND.replace('_', " ")
    }

    fn index_fields(&self) -> Vec<IndexField> {
        Vec::new()
    }

    fn unique_key(&self) -> Option<String> {
        match Self::STRUCTURE {
            EntityStructure::Trunk | EntityStructure::Stub => {
                self.parent_ref_id().map(|parent| format!("parent:{parent}"))
            }
            _ => None,
        }
    }

    fn links() -> &'static [LinkDescriptor] {
        &[]
    }

    fn is_safe_to_archive(&self) -> bool {
        true
    }

    fn ref_id(&self) -> EntityId {
        self.header().ref_id
    }

    fn version(&self) -> i64 {
        self.header().version
    }

    fn is_archived(&self) -> bool {
        self.header().archived
    }

    /// Idempotent over already archived entities.
    fn mark_archived(mut self, ctx: &DomainContext, reason: ArchivalReason) -> Self {
        self.header_mut().record_archive(ctx, reason);
        self
    }

    /// Archives a live entity or moves an archived one onto `reason`.
    fn mark_archived_for(mut self, ctx: &DomainContext, reason: ArchivalReason) -> Self {
        if !self.header_mut().record_archive(ctx, reason) {
            self.header_mut().restamp_archival(ctx, reason);
        }
        self
    }
}

/// Exactly one per parent.
pub trait TrunkEntity: Entity {}

/// Branch or leaf: any non-structural, user-visible entity.
pub trait CrownEntity: Entity {}

/// Expands to the `header`/`header_mut` accessors for a struct with a `header` field.
macro_rules! entity_header {
    () => {
        fn header(&self) -> &$crate::model::framework::event::EntityHeader {
            &self.header
        }

        fn header_mut(&mut self) -> &mut $crate::model::framework::event::EntityHeader {
            &mut self.header
        }
    };
}

pub(crate) use entity_header;

/// Declares a trunk whose only state is its parent id.
macro_rules! simple_trunk {
    (
        $(#[$meta:meta])*
        $name:ident($kind:literal, $parent:ident),
        links = $links:expr
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
        pub struct $name {
            #[serde(skip)]
            pub header: $crate::model::framework::event::EntityHeader,
            pub $parent: $crate::model::framework::base::EntityId,
        }

        impl $name {
            pub fn new(
                ctx: &$crate::model::framework::context::DomainContext,
                $parent: $crate::model::framework::base::EntityId,
            ) -> Self {
                let args = ctx.frame().arg(stringify!($parent), &$parent).finish();
                Self {
                    header: $crate::model::framework::event::EntityHeader::new_created(
                        ctx,
                        concat!("new_", $kind),
                        args,
                    ),
                    $parent,
                }
            }
        }

        impl $crate::model::framework::entity::Entity for $name {
            const KIND: &'static str = $kind;
            const STRUCTURE: $crate::model::framework::entity::EntityStructure =
                $crate::model::framework::entity::EntityStructure::Trunk;

            $crate::model::framework::entity::entity_header!();

            fn parent_ref_id(&self) -> Option<$crate::model::framework::base::EntityId> {
                Some(self.$parent)
            }

            fn links() -> &'static [$crate::model::framework::entity::LinkDescriptor] {
                const LINKS: &[$crate::model::framework::entity::LinkDescriptor] = $links;
                LINKS
            }
        }

        impl $crate::model::framework::entity::TrunkEntity for $name {}
    };
}

pub(crate) use simple_trunk;

/// Index helpers.
pub fn id_field(field: &'static str, id: EntityId) -> IndexField {
    (field, id.to_string())
}

pub fn opt_id_field(field: &'static str, id: Option<EntityId>) -> Option<IndexField> {
    id.map(|id| id_field(field, id))
}
