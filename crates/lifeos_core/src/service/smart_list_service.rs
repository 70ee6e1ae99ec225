//! Smart lists with tagged items.
//!
//! # Invariants
//! - Tag names are unique per list, ignoring case.
//! - Items only carry tags of their own list.
//! - Removing a tag strips it from every item first.

use crate::model::framework::{Entity, EntityId, EntityName, UpdateAction};
use crate::model::smart_list::{SmartList, SmartListCollection, SmartListItem, SmartListTag};
use crate::model::values::Url;
use crate::repo::{EntityRepository, RefFilter};
use crate::service::{ServiceError, ServiceResult, ServiceScope};
use std::collections::BTreeSet;

pub fn create_smart_list(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    name: EntityName,
) -> ServiceResult<SmartList> {
    let collection: SmartListCollection = scope.trunk(workspace_ref_id)?;
    let list = scope
        .uow
        .get_for::<SmartList>()
        .create(SmartList::new_smart_list(scope.ctx, collection.ref_id(), name))?;
    scope.reporter.mark_created(&list);
    Ok(list)
}

pub fn update_smart_list(
    scope: ServiceScope<'_, '_>,
    smart_list_ref_id: EntityId,
    name: UpdateAction<EntityName>,
) -> ServiceResult<SmartList> {
    let repo = scope.uow.get_for::<SmartList>();
    let list = repo.save(repo.load_by_id(smart_list_ref_id, false)?.update(scope.ctx, name))?;
    scope.reporter.mark_updated(&list);
    Ok(list)
}

pub fn archive_smart_list(scope: ServiceScope<'_, '_>, smart_list_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<SmartList>(smart_list_ref_id)
}

/// Removes tags, items and their notes, then the list's note and the list.
pub fn remove_smart_list(scope: ServiceScope<'_, '_>, smart_list_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<SmartList>(smart_list_ref_id)
}

pub fn create_tag(
    scope: ServiceScope<'_, '_>,
    smart_list_ref_id: EntityId,
    tag_name: EntityName,
) -> ServiceResult<SmartListTag> {
    scope.uow.get_for::<SmartList>().load_by_id(smart_list_ref_id, false)?;
    let tag = scope
        .uow
        .get_for::<SmartListTag>()
        .create(SmartListTag::new_smart_list_tag(scope.ctx, smart_list_ref_id, tag_name))?;
    scope.reporter.mark_created(&tag);
    Ok(tag)
}

pub fn remove_tag(scope: ServiceScope<'_, '_>, tag_ref_id: EntityId) -> ServiceResult<usize> {
    let tag = scope.uow.get_for::<SmartListTag>().load_by_id(tag_ref_id, true)?;
    let items = scope.uow.get_for::<SmartListItem>();
    let tagged = items.find_all_generic(
        Some(tag.smart_list_ref_id),
        true,
        &[RefFilter::eq("tags_ref_id", tag_ref_id)],
    )?;
    let mut changed = 0;
    for item in tagged {
        let item = items.save(item.without_tag(scope.ctx, tag_ref_id))?;
        scope.reporter.mark_updated(&item);
        changed += 1;
    }
    Ok(changed + scope.remove::<SmartListTag>(tag_ref_id)?)
}

fn check_tags(
    scope: ServiceScope<'_, '_>,
    smart_list_ref_id: EntityId,
    tags_ref_id: &[EntityId],
) -> ServiceResult<Vec<EntityId>> {
    let unique: BTreeSet<EntityId> = tags_ref_id.iter().copied().collect();
    let tags = scope
        .uow
        .get_for::<SmartListTag>()
        .find_all(smart_list_ref_id, false, Some(&unique.iter().copied().collect::<Vec<_>>()))?;
    if tags.len() != unique.len() {
        return Err(ServiceError::invariant(format!(
            "smart list {smart_list_ref_id} does not own all of the requested tags"
        )));
    }
    Ok(unique.into_iter().collect())
}

pub fn create_item(
    scope: ServiceScope<'_, '_>,
    smart_list_ref_id: EntityId,
    name: EntityName,
    is_done: bool,
    tags_ref_id: &[EntityId],
    url: Option<Url>,
) -> ServiceResult<SmartListItem> {
    scope.uow.get_for::<SmartList>().load_by_id(smart_list_ref_id, false)?;
    let tags = check_tags(scope, smart_list_ref_id, tags_ref_id)?;
    let item = scope.uow.get_for::<SmartListItem>().create(SmartListItem::new_smart_list_item(
        scope.ctx,
        smart_list_ref_id,
        name,
        is_done,
        tags,
        url,
    ))?;
    scope.reporter.mark_created(&item);
    Ok(item)
}

pub fn update_item(
    scope: ServiceScope<'_, '_>,
    item_ref_id: EntityId,
    name: UpdateAction<EntityName>,
    is_done: UpdateAction<bool>,
    tags_ref_id: UpdateAction<Vec<EntityId>>,
    url: UpdateAction<Option<Url>>,
) -> ServiceResult<SmartListItem> {
    let repo = scope.uow.get_for::<SmartListItem>();
    let item = repo.load_by_id(item_ref_id, false)?;
    let tags_ref_id = match tags_ref_id.value() {
        Some(tags) => UpdateAction::change_to(check_tags(scope, item.smart_list_ref_id, tags)?),
        None => UpdateAction::do_nothing(),
    };
    let item = repo.save(item.update(scope.ctx, name, is_done, tags_ref_id, url))?;
    scope.reporter.mark_updated(&item);
    Ok(item)
}

pub fn archive_item(scope: ServiceScope<'_, '_>, item_ref_id: EntityId) -> ServiceResult<usize> {
    scope.archive::<SmartListItem>(item_ref_id)
}

pub fn remove_item(scope: ServiceScope<'_, '_>, item_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<SmartListItem>(item_ref_id)
}

#[cfg(test)]
mod tests {
    use super::{create_item, create_smart_list, create_tag, remove_smart_list, remove_tag};
    use crate::model::framework::{Entity, EntityId};
    use crate::model::smart_list::SmartListItem;
    use crate::repo::{EntityRepository, RepoError};
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{ChangeKind, EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    #[test]
    fn removing_a_tag_untags_items() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let list = create_smart_list(scope, seeded.workspace.ref_id(), "Books".parse().expect("name"))
            .expect("list");
        let scifi = create_tag(scope, list.ref_id(), "SciFi".parse().expect("name")).expect("tag");
        assert!(matches!(
            create_tag(scope, list.ref_id(), "scifi".parse().expect("name")),
            Err(ServiceError::Repo(RepoError::EntityAlreadyExists { .. }))
        ));
        let item = create_item(
            scope,
            list.ref_id(),
            "Dune".parse().expect("name"),
            false,
            &[scifi.ref_id(), scifi.ref_id()],
            None,
        )
        .expect("item");
        assert_eq!(item.tags_ref_id, vec![scifi.ref_id()]);
        assert!(matches!(
            create_item(
                scope,
                list.ref_id(),
                "Emma".parse().expect("name"),
                false,
                &[EntityId::from_raw(9999)],
                None
            ),
            Err(ServiceError::InvariantViolation(_))
        ));

        remove_tag(scope, scifi.ref_id()).expect("remove tag");
        let item = uow
            .get_for::<SmartListItem>()
            .load_by_id(item.ref_id(), false)
            .expect("item");
        assert!(item.tags_ref_id.is_empty());
    }

    #[test]
    fn removing_a_list_removes_items_and_tags() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let list = create_smart_list(scope, seeded.workspace.ref_id(), "Films".parse().expect("name"))
            .expect("list");
        let tag = create_tag(scope, list.ref_id(), "Noir".parse().expect("name")).expect("tag");
        create_item(scope, list.ref_id(), "Laura".parse().expect("name"), true, &[tag.ref_id()], None)
            .expect("item");
        reporter.reset();

        assert_eq!(remove_smart_list(scope, list.ref_id()).expect("remove"), 3);
        assert_eq!(reporter.count_of(ChangeKind::Removed, SmartListItem::KIND), 1);
    }
}
