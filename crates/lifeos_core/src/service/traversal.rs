//! Generic walkers over the declared link graph.
//!
//! # Responsibility
//! - Load an entity together with the children one of its links resolves to.
//! - Archive or remove an entity and everything it owns or contains.
//!
//! # Invariants
//! - Cascades visit children before their parent (leaves first).
//! - `RefsMany` links are never followed by a cascade.
//! - A cascaded archive stamps every descendant with the caller's reason,
//!   including descendants archived earlier for another reason.
//! - The destroyer tolerates descendants that are already gone.

use crate::model::framework::{
    ArchivalReason, CrownEntity, DomainContext, Entity, EntityId, InputValidationError, LinkDescriptor,
};
use crate::repo::{DomainUnitOfWork, EntityRepository, RepoError, RepoResult};
use crate::service::catalog::EntityCatalog;
use crate::service::progress::ProgressReporter;
use std::collections::BTreeSet;

/// Loads `ref_id` as `E`.
pub fn generic_loader<E: Entity>(
    uow: &DomainUnitOfWork<'_>,
    ref_id: EntityId,
    allow_archived: bool,
) -> RepoResult<E> {
    uow.get_for::<E>().load_by_id(ref_id, allow_archived)
}

/// Loads `ref_id` as `E` and the `C` children its first link to `C` resolves.
pub fn generic_loader_with<E: Entity, C: Entity>(
    uow: &DomainUnitOfWork<'_>,
    ref_id: EntityId,
    allow_archived: bool,
) -> RepoResult<(E, Vec<C>)> {
    let entity = generic_loader::<E>(uow, ref_id, allow_archived)?;
    let children = load_linked::<E, C>(uow, &entity, allow_archived)?;
    Ok((entity, children))
}

/// Like [`generic_loader_with`] for two child kinds.
pub fn generic_loader_with2<E: Entity, C1: Entity, C2: Entity>(
    uow: &DomainUnitOfWork<'_>,
    ref_id: EntityId,
    allow_archived: bool,
) -> RepoResult<(E, Vec<C1>, Vec<C2>)> {
    let entity = generic_loader::<E>(uow, ref_id, allow_archived)?;
    let first = load_linked::<E, C1>(uow, &entity, allow_archived)?;
    let second = load_linked::<E, C2>(uow, &entity, allow_archived)?;
    Ok((entity, first, second))
}

/// Children of kind `C` reachable from `owner` through the links it declares.
pub fn load_linked<E: Entity, C: Entity>(
    uow: &DomainUnitOfWork<'_>,
    owner: &E,
    allow_archived: bool,
) -> RepoResult<Vec<C>> {
    let repo = uow.get_for::<C>();
    let mut children = Vec::new();
    for link in E::links().iter().filter(|link| link.child_kind == C::KIND) {
        for child_id in resolve_children(uow, link, owner.ref_id(), allow_archived)? {
            if let Some(child) = repo.load_optional(child_id, allow_archived)? {
                children.push(child);
            }
        }
    }
    Ok(children)
}

fn resolve_children(
    uow: &DomainUnitOfWork<'_>,
    link: &LinkDescriptor,
    owner_ref_id: EntityId,
    include_archived: bool,
) -> RepoResult<Vec<EntityId>> {
    uow.generic().find_child_ids(
        link.child_kind,
        link.resolver,
        owner_ref_id,
        link.filters,
        include_archived,
    )
}

/// Archives one crown entity and everything it owns.
///
/// # Errors
/// - `InputValidation` when the entity refuses archival (`is_safe_to_archive`).
pub fn generic_crown_archiver<E: CrownEntity>(
    uow: &DomainUnitOfWork<'_>,
    catalog: &EntityCatalog,
    ctx: &DomainContext,
    ref_id: EntityId,
    reason: ArchivalReason,
    reporter: &ProgressReporter,
) -> RepoResult<usize> {
    let entity = uow.get_for::<E>().load_by_id(ref_id, true)?;
    if !entity.is_safe_to_archive() {
        return Err(RepoError::InputValidation(InputValidationError::new(format!(
            "{} {} cannot be archived",
            E::KIND.replace('_', " "),
            ref_id
        ))));
    }
    generic_full_archiver(uow, catalog, ctx, E::KIND, ref_id, reason, reporter)
}

/// Removes one crown entity and everything it owns.
pub fn generic_crown_remover<E: CrownEntity>(
    uow: &DomainUnitOfWork<'_>,
    catalog: &EntityCatalog,
    ref_id: EntityId,
    reporter: &ProgressReporter,
) -> RepoResult<usize> {
    let entity = uow.get_for::<E>().load_by_id(ref_id, true)?;
    if !entity.is_safe_to_archive() {
        return Err(RepoError::InputValidation(InputValidationError::new(format!(
            "{} {} cannot be removed",
            E::KIND.replace('_', " "),
            ref_id
        ))));
    }
    generic_destroyer(uow, catalog, E::KIND, ref_id, reporter)
}

/// Archives `ref_id` of `kind` after all of its cascading descendants.
///
/// Returns how many entities changed.
pub fn generic_full_archiver(
    uow: &DomainUnitOfWork<'_>,
    catalog: &EntityCatalog,
    ctx: &DomainContext,
    kind: &str,
    ref_id: EntityId,
    reason: ArchivalReason,
    reporter: &ProgressReporter,
) -> RepoResult<usize> {
    let mut visited = BTreeSet::new();
    archive_walk(uow, catalog, ctx, kind, ref_id, reason, reporter, &mut visited)
}

#[allow(clippy::too_many_arguments)]
fn archive_walk(
    uow: &DomainUnitOfWork<'_>,
    catalog: &EntityCatalog,
    ctx: &DomainContext,
    kind: &str,
    ref_id: EntityId,
    reason: ArchivalReason,
    reporter: &ProgressReporter,
    visited: &mut BTreeSet<EntityId>,
) -> RepoResult<usize> {
    if !visited.insert(ref_id) {
        return Ok(0);
    }
    let ops = catalog.get(kind)?;
    let mut changed = 0;
    for link in (ops.links)().iter().filter(|link| link.kind.cascades()) {
        for child_id in resolve_children(uow, link, ref_id, true)? {
            changed += archive_walk(uow, catalog, ctx, link.child_kind, child_id, reason, reporter, visited)?;
        }
    }
    if (ops.archive)(uow, ctx, ref_id, reason, reporter)? {
        changed += 1;
    }
    Ok(changed)
}

/// Removes `ref_id` of `kind` after all of its cascading descendants.
///
/// Used by account close and test resets. Returns how many entities went away.
pub fn generic_destroyer(
    uow: &DomainUnitOfWork<'_>,
    catalog: &EntityCatalog,
    kind: &str,
    ref_id: EntityId,
    reporter: &ProgressReporter,
) -> RepoResult<usize> {
    let mut visited = BTreeSet::new();
    remove_walk(uow, catalog, kind, ref_id, reporter, &mut visited)
}

/// Removes everything `ref_id` of `kind` cascades to, keeping the entity itself.
pub fn generic_children_destroyer(
    uow: &DomainUnitOfWork<'_>,
    catalog: &EntityCatalog,
    kind: &str,
    ref_id: EntityId,
    reporter: &ProgressReporter,
) -> RepoResult<usize> {
    let mut visited = BTreeSet::from([ref_id]);
    let ops = catalog.get(kind)?;
    let mut removed = 0;
    for link in (ops.links)().iter().filter(|link| link.kind.cascades()) {
        for child_id in resolve_children(uow, link, ref_id, true)? {
            removed += remove_walk(uow, catalog, link.child_kind, child_id, reporter, &mut visited)?;
        }
    }
    Ok(removed)
}

fn remove_walk(
    uow: &DomainUnitOfWork<'_>,
    catalog: &EntityCatalog,
    kind: &str,
    ref_id: EntityId,
    reporter: &ProgressReporter,
    visited: &mut BTreeSet<EntityId>,
) -> RepoResult<usize> {
    if !visited.insert(ref_id) {
        return Ok(0);
    }
    let ops = catalog.get(kind)?;
    let mut removed = 0;
    for link in (ops.links)().iter().filter(|link| link.kind.cascades()) {
        for child_id in resolve_children(uow, link, ref_id, true)? {
            removed += remove_walk(uow, catalog, link.child_kind, child_id, reporter, visited)?;
        }
    }
    if (ops.remove)(uow, ref_id, reporter)? {
        removed += 1;
    }
    Ok(removed)
}
