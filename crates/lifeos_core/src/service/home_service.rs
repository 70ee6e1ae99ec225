//! Home screen tabs and widgets.
//!
//! # Invariants
//! - The config lists every live tab exactly once, under the tab's target.
//! - Live widgets of one tab never share a cell.

use crate::model::framework::{Entity, EntityId, EntityName, UpdateAction};
use crate::model::home::{HomeConfig, HomeTab, HomeWidget, WidgetGeometry};
use crate::model::values::{HomeTabTarget, WidgetType};
use crate::repo::EntityRepository;
use crate::service::{ServiceError, ServiceResult, ServiceScope};

#[derive(Debug, Clone)]
pub struct HomeTabView {
    pub tab: HomeTab,
    pub widgets: Vec<HomeWidget>,
}

pub fn create_tab(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    target: HomeTabTarget,
    name: EntityName,
) -> ServiceResult<HomeTab> {
    let config: HomeConfig = scope.trunk(workspace_ref_id)?;
    let tab = scope
        .uow
        .get_for::<HomeTab>()
        .create(HomeTab::new_home_tab(scope.ctx, config.ref_id(), target, name))?;
    scope.reporter.mark_created(&tab);
    let config = scope
        .uow
        .get_for::<HomeConfig>()
        .save(config.add_tab(scope.ctx, target, tab.ref_id()))?;
    scope.reporter.mark_updated(&config);
    Ok(tab)
}

pub fn update_tab(
    scope: ServiceScope<'_, '_>,
    tab_ref_id: EntityId,
    name: UpdateAction<EntityName>,
) -> ServiceResult<HomeTab> {
    let repo = scope.uow.get_for::<HomeTab>();
    let tab = repo.save(repo.load_by_id(tab_ref_id, false)?.update(scope.ctx, name))?;
    scope.reporter.mark_updated(&tab);
    Ok(tab)
}

fn drop_from_config(scope: ServiceScope<'_, '_>, workspace_ref_id: EntityId, tab: &HomeTab) -> ServiceResult<()> {
    let config: HomeConfig = scope.trunk(workspace_ref_id)?;
    let config = scope
        .uow
        .get_for::<HomeConfig>()
        .save(config.remove_tab(scope.ctx, tab.target, tab.ref_id()))?;
    scope.reporter.mark_updated(&config);
    Ok(())
}

pub fn archive_tab(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    tab_ref_id: EntityId,
) -> ServiceResult<usize> {
    let tab = scope.uow.get_for::<HomeTab>().load_by_id(tab_ref_id, false)?;
    drop_from_config(scope, workspace_ref_id, &tab)?;
    scope.archive::<HomeTab>(tab_ref_id)
}

pub fn remove_tab(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    tab_ref_id: EntityId,
) -> ServiceResult<usize> {
    let tab = scope.uow.get_for::<HomeTab>().load_by_id(tab_ref_id, true)?;
    drop_from_config(scope, workspace_ref_id, &tab)?;
    scope.remove::<HomeTab>(tab_ref_id)
}

fn check_free(
    scope: ServiceScope<'_, '_>,
    tab: &HomeTab,
    geometry: &WidgetGeometry,
    moving: Option<EntityId>,
) -> ServiceResult<()> {
    let widgets = scope
        .uow
        .get_for::<HomeWidget>()
        .find_all(tab.ref_id(), false, None)?;
    let collision = widgets
        .iter()
        .filter(|widget| Some(widget.ref_id()) != moving)
        .find(|widget| widget.geometry.overlaps(geometry));
    if let Some(widget) = collision {
        return Err(ServiceError::invariant(format!(
            "widget would overlap widget {} on tab {}",
            widget.ref_id(),
            tab.ref_id()
        )));
    }
    Ok(())
}

pub fn create_widget(
    scope: ServiceScope<'_, '_>,
    tab_ref_id: EntityId,
    the_type: WidgetType,
    geometry: WidgetGeometry,
) -> ServiceResult<HomeWidget> {
    let tab = scope.uow.get_for::<HomeTab>().load_by_id(tab_ref_id, false)?;
    let widget = HomeWidget::new_home_widget(scope.ctx, &tab, the_type, geometry)?;
    check_free(scope, &tab, &geometry, None)?;
    let widget = scope.uow.get_for::<HomeWidget>().create(widget)?;
    scope.reporter.mark_created(&widget);
    Ok(widget)
}

pub fn move_widget(
    scope: ServiceScope<'_, '_>,
    widget_ref_id: EntityId,
    geometry: WidgetGeometry,
) -> ServiceResult<HomeWidget> {
    let repo = scope.uow.get_for::<HomeWidget>();
    let widget = repo.load_by_id(widget_ref_id, false)?;
    let tab = scope.uow.get_for::<HomeTab>().load_by_id(widget.home_tab_ref_id, false)?;
    let widget = widget.move_and_resize(scope.ctx, &tab, geometry)?;
    check_free(scope, &tab, &geometry, Some(widget_ref_id))?;
    let widget = repo.save(widget)?;
    scope.reporter.mark_updated(&widget);
    Ok(widget)
}

pub fn remove_widget(scope: ServiceScope<'_, '_>, widget_ref_id: EntityId) -> ServiceResult<usize> {
    scope.remove::<HomeWidget>(widget_ref_id)
}

/// Live tabs of one target in configured order, each with its widgets.
pub fn load_home(
    scope: ServiceScope<'_, '_>,
    workspace_ref_id: EntityId,
    target: HomeTabTarget,
) -> ServiceResult<Vec<HomeTabView>> {
    let config: HomeConfig = scope.trunk(workspace_ref_id)?;
    let tab_repo = scope.uow.get_for::<HomeTab>();
    let widget_repo = scope.uow.get_for::<HomeWidget>();
    let mut views = Vec::new();
    for tab_ref_id in config.tabs_for(target) {
        let Some(tab) = tab_repo.load_optional(*tab_ref_id, false)? else {
            continue;
        };
        let mut widgets = widget_repo.find_all(tab.ref_id(), false, None)?;
        widgets.sort_by_key(|widget| (widget.geometry.row, widget.geometry.col));
        views.push(HomeTabView { tab, widgets });
    }
    Ok(views)
}

#[cfg(test)]
mod tests {
    use super::{create_tab, create_widget, load_home, move_widget, remove_tab};
    use crate::model::framework::Entity;
    use crate::model::home::WidgetGeometry;
    use crate::model::values::{HomeTabTarget, WidgetDimension, WidgetType};
    use crate::service::test_support::{ctx_at, domain_conn, seeded_workspace, uow};
    use crate::service::{EntityCatalog, ProgressReporter, ServiceError, ServiceScope};

    fn at(row: u32, col: u32, dimension: WidgetDimension) -> WidgetGeometry {
        WidgetGeometry { row, col, dimension }
    }

    #[test]
    fn widgets_never_overlap_on_a_tab() {
        let conn = domain_conn();
        let uow = uow(&conn);
        let ctx = ctx_at("2024-03-04T09:00:00Z");
        let catalog = EntityCatalog::standard();
        let reporter = ProgressReporter::new();
        let scope = ServiceScope::new(&uow, &ctx, &catalog, &reporter);
        let seeded = seeded_workspace(scope);
        let ws = seeded.workspace.ref_id();

        let tab = create_tab(scope, ws, HomeTabTarget::BigScreen, "Today".parse().expect("name")).expect("tab");
        let motd = create_widget(scope, tab.ref_id(), WidgetType::Motd, at(0, 0, WidgetDimension::Dim1x3))
            .expect("widget");
        assert!(matches!(
            create_widget(scope, tab.ref_id(), WidgetType::Motd, at(0, 2, WidgetDimension::Dim1x1)),
            Err(ServiceError::InvariantViolation(_))
        ));
        create_widget(scope, tab.ref_id(), WidgetType::Motd, at(1, 0, WidgetDimension::Dim1x1)).expect("widget");
        move_widget(scope, motd.ref_id(), at(0, 1, WidgetDimension::Dim1x2)).expect("move onto itself");
        assert!(matches!(
            move_widget(scope, motd.ref_id(), at(1, 0, WidgetDimension::Dim1x1)),
            Err(ServiceError::InvariantViolation(_))
        ));

        let home = load_home(scope, ws, HomeTabTarget::BigScreen).expect("home");
        assert_eq!(home.len(), 1);
        assert_eq!(home[0].widgets.len(), 2);
        assert_eq!(remove_tab(scope, ws, tab.ref_id()).expect("remove"), 3);
        assert!(load_home(scope, ws, HomeTabTarget::BigScreen).expect("home").is_empty());
    }
}
